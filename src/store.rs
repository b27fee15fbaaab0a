//! The layout store: the only mutator of a [`LayoutState`].
//!
//! [`LayoutStore`] executes [`LayoutOperation`]s with a two-tier policy:
//!
//! 1. The operation is first offered to the injected [`LayoutAuthority`].
//!    If it answers, its state is adopted verbatim.  If it refuses the
//!    operation ([`AuthorityError::Rejected`]) the operation fails.
//! 2. Any other authority error means "unreachable": the operation runs
//!    locally through [`apply_local`] and, when the layout actually changed,
//!    a debounced save of the whole layout is scheduled.  A newer local
//!    mutation replaces the pending save instead of queueing another.
//!
//! Failures never panic and never block: the public surface answers with
//! `bool` / `Option` and logs the reason.

use crate::config::Config;
use crate::layout::{GridConfig, LayoutState, WidgetConstraints, WidgetRegistry};
use crate::migration;
use crate::operation::{apply_local, generate_id, LayoutError, LayoutOperation, WidgetSlot};
use crate::traits::{AuthorityError, CancelToken, LayoutAuthority, LayoutExecutor, Scheduler};
use log::{debug, info, warn};
use serde_json::Value;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Default delay between the last local mutation and its save.
pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_millis(250);

/// Owns the committed layout and applies operations to it.
///
/// The authority is shared with the scheduled save callbacks, hence the
/// `Rc`.
///
/// # Typical usage
///
/// ```ignore
/// let authority = Rc::new(FileAuthority::passive(path));
/// let mut store = LayoutStore::new(authority, ManualScheduler::new());
/// store.load();
/// let id = store.add_widget("clock", WidgetSlot::default());
/// ```
pub struct LayoutStore<A: LayoutAuthority + 'static, S: Scheduler> {
    authority: Rc<A>,
    scheduler: S,
    registry: WidgetRegistry,
    state: LayoutState,
    save_delay: Duration,
    /// Cleared by the save callback once it has run.
    pending_save: Rc<Cell<Option<CancelToken>>>,
}

impl<A: LayoutAuthority + 'static, S: Scheduler> LayoutStore<A, S> {
    /// An empty canonical layout with the built-in registry.  Call
    /// [`load`](Self::load) to pick up the persisted dashboard.
    pub fn new(authority: Rc<A>, scheduler: S) -> Self {
        Self {
            authority,
            scheduler,
            registry: WidgetRegistry::builtin(),
            state: LayoutState::default(),
            save_delay: DEFAULT_SAVE_DELAY,
            pending_save: Rc::new(Cell::new(None)),
        }
    }

    /// Build a store using the grid, registry overrides, and save delay from
    /// `config`.
    pub fn from_config(authority: Rc<A>, scheduler: S, config: &Config) -> Self {
        let mut store = Self::new(authority, scheduler)
            .with_registry(config.registry())
            .with_save_delay(config.persistence.save_debounce());
        store.state = LayoutState::empty(config.grid);
        store
    }

    pub fn with_registry(mut self, registry: WidgetRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_save_delay(mut self, delay: Duration) -> Self {
        self.save_delay = delay;
        self
    }

    /// The committed layout.
    pub fn state(&self) -> &LayoutState {
        &self.state
    }

    pub fn registry(&self) -> &WidgetRegistry {
        &self.registry
    }

    pub fn authority(&self) -> &A {
        &self.authority
    }

    /// Whether a debounced save is waiting to run.
    pub fn has_pending_save(&self) -> bool {
        self.pending_save.get().is_some()
    }

    /// Load the persisted dashboard, migrating and repairing it as needed.
    ///
    /// With nothing saved yet the first-run dashboard is used.  When the
    /// authority cannot be read the current layout is kept.
    pub fn load(&mut self) -> &LayoutState {
        match self.authority.load_dashboard() {
            Ok(loaded) => {
                let result = migration::migrate(loaded, &self.registry);
                let needs_save = result.needs_save();
                self.state = result.state;
                if needs_save {
                    info!("persisting migrated layout");
                    self.save_now();
                }
            }
            Err(AuthorityError::NotFound) => {
                info!("no saved dashboard, using defaults");
                let grid = if self.state.grid.columns > 0 && self.state.grid.rows > 0 {
                    self.state.grid
                } else {
                    GridConfig::default()
                };
                let mut state = LayoutState::with_default_widgets(grid);
                state.normalize(&self.registry);
                self.state = state;
            }
            Err(e) => warn!("failed to load dashboard, keeping current layout: {}", e),
        }
        &self.state
    }

    /// Apply `op`.  Returns `false` when it was rejected; the layout is then
    /// unchanged.
    pub fn apply_operation(&mut self, op: LayoutOperation) -> bool {
        let kind = op.kind();
        match self.execute(op) {
            Ok(()) => true,
            Err(e) => {
                debug!("{} rejected: {}", kind, e);
                false
            }
        }
    }

    /// Apply `op`, reporting why it was rejected.
    pub fn execute(&mut self, op: LayoutOperation) -> Result<(), LayoutError> {
        let op = self.with_generated_id(op);

        match self.authority.apply_layout_operation(&op) {
            Ok(state) => {
                debug!("{} applied by layout authority", op.kind());
                self.cancel_pending_save();
                self.state = state;
                return Ok(());
            }
            Err(AuthorityError::Rejected(reason)) => return Err(LayoutError::Rejected(reason)),
            Err(e) => debug!("{} computed locally: {}", op.kind(), e),
        }

        let next = apply_local(&self.state, &op, &self.registry)?;
        if next != self.state {
            self.state = next;
            self.schedule_save();
        }
        Ok(())
    }

    /// Add a widget of `widget_type`.  Returns the new widget's id.
    pub fn add_widget(&mut self, widget_type: &str, slot: WidgetSlot) -> Option<String> {
        let id = match &slot.id {
            Some(id) => id.clone(),
            None => generate_id(&self.state, widget_type),
        };
        let op = LayoutOperation::AddWidget {
            widget_type: widget_type.to_string(),
            layout: WidgetSlot {
                id: Some(id.clone()),
                ..slot
            },
        };
        self.apply_operation(op).then_some(id)
    }

    pub fn move_widget(&mut self, id: &str, x: u32, y: u32) -> bool {
        self.apply_operation(LayoutOperation::MoveWidget {
            id: id.to_string(),
            x,
            y,
        })
    }

    pub fn resize_widget(
        &mut self,
        id: &str,
        width: u32,
        height: u32,
        x: Option<u32>,
        y: Option<u32>,
    ) -> bool {
        self.apply_operation(LayoutOperation::ResizeWidget {
            id: id.to_string(),
            width,
            height,
            x,
            y,
        })
    }

    pub fn remove_widget(&mut self, id: &str) -> bool {
        self.apply_operation(LayoutOperation::RemoveWidget { id: id.to_string() })
    }

    pub fn set_widget_lock(&mut self, id: &str, locked: bool) -> bool {
        self.apply_operation(LayoutOperation::SetWidgetLock {
            id: id.to_string(),
            locked,
        })
    }

    pub fn update_widget_settings(&mut self, id: &str, settings: Value) -> bool {
        self.apply_operation(LayoutOperation::SetWidgetSettings {
            id: id.to_string(),
            settings,
        })
    }

    /// Replace the whole layout, e.g. from an import.  The layout is
    /// repaired first and then saved like any local mutation.
    pub fn replace_state(&mut self, mut state: LayoutState) {
        state.normalize(&self.registry);
        if state != self.state {
            self.state = state;
            self.schedule_save();
        }
    }

    /// Cancel the pending debounced save and write the layout right away.
    pub fn flush(&mut self) {
        if self.has_pending_save() {
            self.cancel_pending_save();
            self.save_now();
        }
    }

    /// `addWidget` without an id gets one generated here so the caller and
    /// a remote authority agree on it.
    fn with_generated_id(&self, op: LayoutOperation) -> LayoutOperation {
        match op {
            LayoutOperation::AddWidget {
                widget_type,
                mut layout,
            } => {
                if layout.id.is_none() {
                    layout.id = Some(generate_id(&self.state, &widget_type));
                }
                LayoutOperation::AddWidget {
                    widget_type,
                    layout,
                }
            }
            other => other,
        }
    }

    fn schedule_save(&mut self) {
        self.cancel_pending_save();
        let authority = Rc::clone(&self.authority);
        let pending = Rc::clone(&self.pending_save);
        let payload = self.state.clone();
        let token = self.scheduler.schedule_after(
            self.save_delay,
            Box::new(move || {
                pending.set(None);
                if let Err(e) = authority.save_dashboard(&payload) {
                    warn!("failed to save dashboard: {}", e);
                } else {
                    debug!("saved dashboard ({} widgets)", payload.widgets.len());
                }
            }),
        );
        self.pending_save.set(Some(token));
    }

    fn cancel_pending_save(&mut self) {
        if let Some(token) = self.pending_save.take() {
            self.scheduler.cancel(token);
        }
    }

    fn save_now(&self) {
        if let Err(e) = self.authority.save_dashboard(&self.state) {
            warn!("failed to save dashboard: {}", e);
        }
    }
}

impl<A: LayoutAuthority + 'static, S: Scheduler> LayoutExecutor for LayoutStore<A, S> {
    fn state(&self) -> &LayoutState {
        &self.state
    }

    fn constraints_for(&self, widget_type: &str) -> WidgetConstraints {
        self.registry.constraints_for(widget_type)
    }

    fn move_widget(&mut self, id: &str, x: u32, y: u32) -> bool {
        LayoutStore::move_widget(self, id, x, y)
    }

    fn resize_widget(&mut self, id: &str, width: u32, height: u32, x: Option<u32>, y: Option<u32>) -> bool {
        LayoutStore::resize_widget(self, id, width, height, x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Rect, WidgetLayout};
    use crate::scheduler::ManualScheduler;
    use serde_json::json;
    use std::cell::RefCell;

    //  Scripted authority

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Mode {
        /// `apply_layout_operation` is unreachable.
        Offline,
        /// Computes operations itself, like an authoritative backend.
        Remote,
        /// Refuses every operation.
        Rejecting,
    }

    #[derive(Debug)]
    struct ScriptedAuthority {
        mode: Mode,
        stored: RefCell<Option<LayoutState>>,
        saves: RefCell<Vec<LayoutState>>,
        fail_saves: bool,
    }

    impl ScriptedAuthority {
        fn new(mode: Mode) -> Self {
            Self {
                mode,
                stored: RefCell::new(None),
                saves: RefCell::new(Vec::new()),
                fail_saves: false,
            }
        }

        fn with_stored(self, state: LayoutState) -> Self {
            *self.stored.borrow_mut() = Some(state);
            self
        }

        fn save_count(&self) -> usize {
            self.saves.borrow().len()
        }
    }

    impl LayoutAuthority for ScriptedAuthority {
        fn load_dashboard(&self) -> Result<LayoutState, AuthorityError> {
            self.stored.borrow().clone().ok_or(AuthorityError::NotFound)
        }

        fn save_dashboard(&self, state: &LayoutState) -> Result<(), AuthorityError> {
            if self.fail_saves {
                return Err(AuthorityError::Unavailable("disk full".into()));
            }
            self.saves.borrow_mut().push(state.clone());
            *self.stored.borrow_mut() = Some(state.clone());
            Ok(())
        }

        fn apply_layout_operation(&self, op: &LayoutOperation) -> Result<LayoutState, AuthorityError> {
            match self.mode {
                Mode::Offline => Err(AuthorityError::Unavailable("offline".into())),
                Mode::Rejecting => Err(AuthorityError::Rejected("read-only dashboard".into())),
                Mode::Remote => {
                    let current = self.stored.borrow().clone().unwrap_or_default();
                    let next = apply_local(&current, op, &WidgetRegistry::builtin())
                        .map_err(|e| AuthorityError::Rejected(e.to_string()))?;
                    *self.stored.borrow_mut() = Some(next.clone());
                    Ok(next)
                }
            }
        }
    }

    type TestStore = LayoutStore<ScriptedAuthority, Rc<ManualScheduler>>;

    fn make_store(authority: ScriptedAuthority) -> (TestStore, Rc<ScriptedAuthority>, Rc<ManualScheduler>) {
        let authority = Rc::new(authority);
        let clock = Rc::new(ManualScheduler::new());
        let store = LayoutStore::new(Rc::clone(&authority), Rc::clone(&clock));
        (store, authority, clock)
    }

    fn offline_with(widgets: &[(&str, Rect)]) -> (TestStore, Rc<ScriptedAuthority>, Rc<ManualScheduler>) {
        let mut state = LayoutState::default();
        for (id, rect) in widgets {
            state.widgets.push(WidgetLayout::new(*id, "note", *rect));
        }
        let (mut store, authority, clock) =
            make_store(ScriptedAuthority::new(Mode::Offline).with_stored(state));
        store.load();
        (store, authority, clock)
    }

    fn rect_of<A: LayoutAuthority, S: Scheduler>(store: &LayoutStore<A, S>, id: &str) -> Rect {
        store.state().find(id).map(|w| w.rect()).unwrap_or_default()
    }

    //  Scenarios

    #[test]
    fn add_clock_to_empty_grid() {
        let (mut store, _, _) = offline_with(&[]);
        let id = store.add_widget("clock", WidgetSlot::default()).unwrap();
        assert_eq!(id, "clock-1");
        assert_eq!(rect_of(&store, &id), Rect::new(0, 0, 4, 2));
    }

    #[test]
    fn move_pushes_neighbour_along() {
        let (mut store, _, _) = offline_with(&[("a", Rect::new(0, 0, 4, 2)), ("b", Rect::new(4, 0, 4, 2))]);
        assert!(store.move_widget("a", 4, 0));
        assert_eq!(rect_of(&store, "a"), Rect::new(4, 0, 4, 2));
        assert_eq!(rect_of(&store, "b"), Rect::new(8, 0, 4, 2));
    }

    #[test]
    fn blocked_move_changes_nothing() {
        let mut state = LayoutState::empty(GridConfig::new(8, 2));
        state.widgets.push(WidgetLayout::new("a", "note", Rect::new(0, 0, 4, 2)));
        state.widgets.push(WidgetLayout::new("b", "note", Rect::new(4, 0, 4, 2)));
        let (mut store, authority, clock) =
            make_store(ScriptedAuthority::new(Mode::Offline).with_stored(state.clone()));
        store.load();
        assert!(!store.move_widget("a", 2, 0));
        assert_eq!(store.state(), &state);
        clock.run_all();
        assert_eq!(authority.save_count(), 0);
    }

    #[test]
    fn resize_into_neighbour_is_rejected() {
        let (mut store, _, _) = offline_with(&[("a", Rect::new(0, 0, 4, 4)), ("b", Rect::new(4, 0, 4, 4))]);
        assert!(!store.resize_widget("a", 8, 4, None, None));
        assert_eq!(rect_of(&store, "a"), Rect::new(0, 0, 4, 4));
    }

    #[test]
    fn lock_blocks_move_until_cleared() {
        let (mut store, _, _) = offline_with(&[("a", Rect::new(0, 0, 4, 2))]);
        assert!(store.set_widget_lock("a", true));
        assert!(!store.move_widget("a", 6, 0));
        assert!(!store.resize_widget("a", 6, 2, None, None));
        assert!(store.set_widget_lock("a", false));
        assert!(store.move_widget("a", 6, 0));
        assert_eq!(rect_of(&store, "a"), Rect::new(6, 0, 4, 2));
    }

    #[test]
    fn move_to_current_position_is_a_noop_success() {
        let (mut store, authority, clock) = offline_with(&[("a", Rect::new(2, 2, 4, 2))]);
        let before = store.state().clone();
        assert!(store.move_widget("a", 2, 2));
        assert_eq!(store.state(), &before);
        assert!(!store.has_pending_save());
        clock.run_all();
        assert_eq!(authority.save_count(), 0);
    }

    //  Persistence

    #[test]
    fn saves_are_debounced_and_coalesced() {
        let (mut store, authority, clock) = offline_with(&[("a", Rect::new(0, 0, 2, 2))]);
        assert!(store.move_widget("a", 1, 0));
        clock.advance(Duration::from_millis(100));
        assert!(store.move_widget("a", 2, 0));
        clock.advance(Duration::from_millis(100));
        assert!(store.move_widget("a", 3, 0));

        clock.advance(Duration::from_millis(249));
        assert_eq!(authority.save_count(), 0);
        clock.advance(Duration::from_millis(1));
        assert_eq!(authority.save_count(), 1);
        assert_eq!(authority.saves.borrow()[0].find("a").unwrap().x, 3);
        assert_eq!(clock.pending_count(), 0);
    }

    #[test]
    fn failed_save_is_logged_and_retried_on_next_mutation() {
        let mut authority = ScriptedAuthority::new(Mode::Offline);
        authority.fail_saves = true;
        let (mut store, authority, clock) = make_store(authority);
        store.load();
        assert!(store.remove_widget("clock-demo"));
        clock.run_all();
        assert_eq!(authority.save_count(), 0);
        assert_eq!(store.state().widgets.len(), 1);
        assert!(store.add_widget("clock", WidgetSlot::default()).is_some());
        assert!(store.has_pending_save());
    }

    #[test]
    fn first_run_uses_default_dashboard() {
        let (mut store, authority, _) = make_store(ScriptedAuthority::new(Mode::Offline));
        let state = store.load().clone();
        let ids: Vec<&str> = state.widgets.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, ["notifications-demo", "clock-demo"]);
        assert_eq!(authority.save_count(), 0);
    }

    #[test]
    fn legacy_layout_is_migrated_and_saved_immediately() {
        let mut legacy = LayoutState::empty(GridConfig::new(5, 4));
        legacy.widgets.push(WidgetLayout::new("a", "note", Rect::new(1, 1, 1, 1)));
        let (mut store, authority, _) =
            make_store(ScriptedAuthority::new(Mode::Offline).with_stored(legacy));
        store.load();
        assert!(store.state().grid.is_canonical());
        assert_eq!(rect_of(&store, "a"), Rect::new(5, 3, 5, 3));
        assert_eq!(authority.save_count(), 1);
    }

    #[test]
    fn persist_and_reload_round_trip() {
        let (mut store, authority, clock) = offline_with(&[]);
        store.add_widget("clock", WidgetSlot::at(10, 4, 5, 3));
        store.update_widget_settings("clock-1", json!({ "timeFormat": "24h" }));
        clock.run_all();

        let saved = authority.stored.borrow().clone().unwrap();
        let (mut reloaded, _, _) =
            make_store(ScriptedAuthority::new(Mode::Offline).with_stored(saved));
        reloaded.load();
        assert_eq!(reloaded.state(), store.state());
    }

    #[test]
    fn flush_writes_pending_save_once() {
        let (mut store, authority, clock) = offline_with(&[("a", Rect::new(0, 0, 2, 2))]);
        store.move_widget("a", 5, 5);
        store.flush();
        assert_eq!(authority.save_count(), 1);
        clock.run_all();
        assert_eq!(authority.save_count(), 1);
    }

    //  Remote authority

    #[test]
    fn remote_state_is_adopted_and_cancels_local_save() {
        let (mut store, authority, clock) = make_store(ScriptedAuthority::new(Mode::Remote));
        store.load();
        store.replace_state(LayoutState::default());
        assert!(store.has_pending_save());
        *authority.stored.borrow_mut() = Some(LayoutState::default());

        let id = store.add_widget("clock", WidgetSlot::default()).unwrap();
        assert_eq!(store.state().find(&id).map(|w| w.rect()), Some(Rect::new(0, 0, 4, 2)));
        assert!(!store.has_pending_save());
        assert_eq!(clock.run_all(), 0);
    }

    #[test]
    fn rejection_by_authority_does_not_fall_back() {
        let (mut store, _, _) = make_store(ScriptedAuthority::new(Mode::Rejecting));
        store.load();
        let before = store.state().clone();
        assert!(!store.remove_widget("clock-demo"));
        assert_eq!(store.state(), &before);
        assert!(matches!(
            store.execute(LayoutOperation::RemoveWidget { id: "clock-demo".into() }),
            Err(LayoutError::Rejected(_))
        ));
    }

    #[test]
    fn generated_id_is_sent_to_authority() {
        let (mut store, authority, _) = make_store(ScriptedAuthority::new(Mode::Remote));
        assert!(store.apply_operation(LayoutOperation::AddWidget {
            widget_type: "mail".into(),
            layout: WidgetSlot::default(),
        }));
        let stored = authority.stored.borrow().clone().unwrap();
        assert!(stored.contains("mail-1"));
    }

    //  Registry and config

    #[test]
    fn config_overrides_constraints() {
        let config: Config = serde_json::from_str(
            r#"{ "grid": { "columns": 12, "rows": 6 },
                 "widgets": { "note": { "min_width": 1, "min_height": 1, "max_width": 2, "max_height": 2 } } }"#,
        )
        .unwrap();
        let authority = Rc::new(ScriptedAuthority::new(Mode::Offline));
        let mut store = LayoutStore::from_config(authority, ManualScheduler::new(), &config);
        let id = store.add_widget("note", WidgetSlot::at(0, 0, 5, 5)).unwrap();
        assert_eq!(rect_of(&store, &id), Rect::new(0, 0, 2, 2));
        assert_eq!(store.state().grid, GridConfig::new(12, 6));
    }

    #[test]
    fn committed_state_always_satisfies_invariants() {
        let (mut store, _, _) = offline_with(&[]);
        for _ in 0..12 {
            store.add_widget("clock", WidgetSlot::default());
        }
        store.move_widget("clock-1", 10, 5);
        store.resize_widget("clock-2", 8, 4, None, None);
        store.move_widget("clock-7", 0, 0);
        store.state().check_invariants(store.registry()).unwrap();
    }
}
