//! Resizing widgets by their edge and corner handles.
//!
//! Resizing is two-phase.  [`begin_resize`](ResizeController::begin_resize)
//! arms a widget (the editor shows its handles) without touching any
//! pointer.  A later press on one of the eight [`Handle`]s captures the
//! pointer and fixes which edges move; the opposite edges stay anchored at
//! the widget's original rectangle for the whole session.
//!
//! Unlike dragging, nothing is applied while the pointer moves.  The preview
//! rectangle is recomputed on every move and committed once on release,
//! unless it is unchanged or collides with another widget.

use crate::geometry::GridGeometry;
use crate::layout::{clamp_axis, Footprint, GridConfig, Rect, WidgetConstraints};
use crate::placement;
use crate::traits::{LayoutExecutor, PointerCapture, PointerId};
use log::debug;
use serde::{Deserialize, Serialize};

/// A resize handle, named by compass direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handle {
    N,
    S,
    E,
    W,
    NE,
    NW,
    SE,
    SW,
}

impl Handle {
    pub const ALL: [Handle; 8] = [
        Handle::N,
        Handle::S,
        Handle::E,
        Handle::W,
        Handle::NE,
        Handle::NW,
        Handle::SE,
        Handle::SW,
    ];

    fn moves_left(self) -> bool {
        matches!(self, Handle::W | Handle::NW | Handle::SW)
    }

    fn moves_right(self) -> bool {
        matches!(self, Handle::E | Handle::NE | Handle::SE)
    }

    fn moves_top(self) -> bool {
        matches!(self, Handle::N | Handle::NE | Handle::NW)
    }

    fn moves_bottom(self) -> bool {
        matches!(self, Handle::S | Handle::SE | Handle::SW)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizePhase {
    Idle,
    /// Handles shown, no pointer captured.
    Armed,
    Resizing,
}

/// How a resize session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeOutcome {
    Committed,
    /// The preview matched the original rectangle.
    Unchanged,
    /// The preview overlapped another widget or broke a size limit.
    Blocked,
    /// The store refused the resize.
    Rejected,
    /// The release did not belong to the active session.
    Ignored,
}

#[derive(Debug)]
struct ResizeSession {
    widget_id: String,
    baseline: Rect,
    constraints: WidgetConstraints,
    grab: Option<(Handle, PointerId)>,
    candidate: Rect,
    blocked: bool,
}

/// Drives widget resizes from handle interactions.
pub struct ResizeController<C: PointerCapture> {
    capture: C,
    session: Option<ResizeSession>,
}

impl<C: PointerCapture> ResizeController<C> {
    pub fn new(capture: C) -> Self {
        Self {
            capture,
            session: None,
        }
    }

    pub fn phase(&self) -> ResizePhase {
        match &self.session {
            None => ResizePhase::Idle,
            Some(s) if s.grab.is_some() => ResizePhase::Resizing,
            Some(_) => ResizePhase::Armed,
        }
    }

    pub fn active_widget(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.widget_id.as_str())
    }

    pub fn active_handle(&self) -> Option<Handle> {
        self.session.as_ref().and_then(|s| s.grab).map(|(h, _)| h)
    }

    /// The rectangle to draw as the resize preview.
    pub fn preview(&self) -> Option<Rect> {
        self.session.as_ref().map(|s| s.candidate)
    }

    /// Whether the preview cannot be applied.
    pub fn is_blocked(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.blocked)
    }

    /// Arm `widget_id` for resizing.  Replaces an armed session on another
    /// widget but never one that holds a pointer.
    pub fn begin_resize<E: LayoutExecutor>(&mut self, executor: &E, widget_id: &str) -> bool {
        if self.phase() == ResizePhase::Resizing {
            return false;
        }
        let widget = match executor.state().find(widget_id) {
            Some(w) if !w.locked => w,
            Some(_) => {
                debug!("resize refused: {} is locked", widget_id);
                return false;
            }
            None => return false,
        };
        let baseline = widget.rect();
        self.session = Some(ResizeSession {
            widget_id: widget_id.to_string(),
            baseline,
            constraints: executor.constraints_for(&widget.widget_type),
            grab: None,
            candidate: baseline,
            blocked: false,
        });
        true
    }

    /// Press on `handle` of the armed widget.  The session is cancelled if
    /// the widget was removed, locked, moved or resized since it was armed.
    pub fn pointer_down<E: LayoutExecutor>(
        &mut self,
        executor: &E,
        widget_id: &str,
        handle: Handle,
        pointer: PointerId,
    ) -> bool {
        match &self.session {
            Some(s) if s.widget_id == widget_id && s.grab.is_none() => {}
            _ => return false,
        }
        if !self.matches_baseline(executor) {
            debug!("{} changed since resize was armed", widget_id);
            self.cancel_resize();
            return false;
        }
        if !self.capture.acquire(widget_id, pointer) {
            return false;
        }
        if let Some(session) = self.session.as_mut() {
            session.grab = Some((handle, pointer));
        }
        true
    }

    /// Recompute the preview from the pointer position.  Returns the new
    /// preview, or `None` if the event was ignored or the session ended
    /// because the widget went away.
    pub fn pointer_move<E: LayoutExecutor>(
        &mut self,
        executor: &E,
        geometry: &GridGeometry,
        pointer: PointerId,
        px: f64,
        py: f64,
    ) -> Option<Rect> {
        let (handle, widget_id) = match &self.session {
            Some(ResizeSession {
                grab: Some((handle, held)),
                widget_id,
                ..
            }) if *held == pointer => (*handle, widget_id.clone()),
            _ => return None,
        };
        if !self.matches_baseline(executor) {
            debug!("{} changed during resize", widget_id);
            self.cancel_resize();
            return None;
        }

        let cell = geometry.cell_from_point(px, py, Footprint::new(1, 1));
        let grid = geometry.grid();
        let session = self.session.as_mut()?;
        let c = session.constraints;
        let base = session.baseline;

        let (x, width) = resize_axis(
            base.x,
            base.width,
            cell.col,
            handle.moves_left(),
            handle.moves_right(),
            (c.min_width, c.max_width),
            grid.columns,
        );
        let (y, height) = resize_axis(
            base.y,
            base.height,
            cell.row,
            handle.moves_top(),
            handle.moves_bottom(),
            (c.min_height, c.max_height),
            grid.rows,
        );
        let candidate = Rect::new(x, y, width, height);

        session.candidate = candidate;
        session.blocked = !fits(executor, &session.widget_id, &candidate, &c, &grid);
        Some(candidate)
    }

    /// Release: commit the preview unless it is unchanged or blocked.  The
    /// session ends either way.
    pub fn pointer_up<E: LayoutExecutor>(&mut self, executor: &mut E, pointer: PointerId) -> ResizeOutcome {
        match &self.session {
            Some(ResizeSession {
                grab: Some((_, held)),
                ..
            }) if *held == pointer => {}
            _ => return ResizeOutcome::Ignored,
        }
        let session = match self.session.take() {
            Some(s) => s,
            None => return ResizeOutcome::Ignored,
        };
        self.capture.release(&session.widget_id, pointer);

        let rect = session.candidate;
        if rect == session.baseline {
            return ResizeOutcome::Unchanged;
        }
        if session.blocked {
            return ResizeOutcome::Blocked;
        }
        if executor.resize_widget(&session.widget_id, rect.width, rect.height, Some(rect.x), Some(rect.y)) {
            ResizeOutcome::Committed
        } else {
            ResizeOutcome::Rejected
        }
    }

    /// Leave resize mode without committing.
    pub fn cancel_resize(&mut self) {
        if let Some(session) = self.session.take() {
            if let Some((_, pointer)) = session.grab {
                self.capture.release(&session.widget_id, pointer);
            }
        }
    }

    /// Escape key.  Returns `true` if a session was cancelled.
    pub fn on_escape(&mut self) -> bool {
        let active = self.session.is_some();
        self.cancel_resize();
        active
    }

    /// Whether the session's widget still exists unlocked, at its baseline
    /// rectangle and with the same limits.
    fn matches_baseline<E: LayoutExecutor>(&self, executor: &E) -> bool {
        let Some(session) = &self.session else {
            return false;
        };
        match executor.state().find(&session.widget_id) {
            Some(w) => {
                !w.locked
                    && w.rect() == session.baseline
                    && executor.constraints_for(&w.widget_type) == session.constraints
            }
            None => false,
        }
    }
}

/// New `(start, length)` along one axis.  The edge opposite to the moving
/// one stays at its baseline; `cell` is the track under the pointer.
fn resize_axis(
    start: u32,
    length: u32,
    cell: u32,
    moves_start: bool,
    moves_end: bool,
    (min, max): (u32, u32),
    tracks: u32,
) -> (u32, u32) {
    let end = start + length;
    if moves_end {
        let wanted = (cell + 1).saturating_sub(start);
        let len = clamp_axis(wanted, min, max).min(tracks.saturating_sub(start));
        (start, len)
    } else if moves_start {
        let wanted = end.saturating_sub(cell);
        let len = clamp_axis(wanted, min, max).min(end);
        (end - len, len)
    } else {
        (start, length)
    }
}

fn fits<E: LayoutExecutor>(
    executor: &E,
    id: &str,
    candidate: &Rect,
    constraints: &WidgetConstraints,
    grid: &GridConfig,
) -> bool {
    constraints.admits(candidate.footprint())
        && placement::in_bounds(grid, candidate)
        && !executor
            .state()
            .widgets
            .iter()
            .filter(|w| w.id != id)
            .any(|w| placement::overlaps(&w.rect(), candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DetachedAuthority;
    use crate::capture::SessionRegistry;
    use crate::geometry::PixelRect;
    use crate::layout::{LayoutState, WidgetLayout};
    use crate::operation::WidgetSlot;
    use crate::scheduler::ManualScheduler;
    use crate::store::LayoutStore;
    use std::rc::Rc;

    type Store = LayoutStore<DetachedAuthority, ManualScheduler>;

    fn store_with(widgets: &[(&str, &str, Rect)]) -> Store {
        let mut store = LayoutStore::new(Rc::new(DetachedAuthority), ManualScheduler::new());
        let mut state = LayoutState::default();
        for (id, ty, rect) in widgets {
            state.widgets.push(WidgetLayout::new(*id, *ty, *rect));
        }
        store.replace_state(state);
        store
    }

    /// 100px square cells on the canonical grid.
    fn geometry() -> GridGeometry {
        GridGeometry::new(GridConfig::default(), PixelRect::new(0.0, 0.0, 2400.0, 1200.0))
    }

    /// Centre of cell `(col, row)`.
    fn at(col: u32, row: u32) -> (f64, f64) {
        (col as f64 * 100.0 + 50.0, row as f64 * 100.0 + 50.0)
    }

    fn rect_of(store: &Store, id: &str) -> Rect {
        store.state().find(id).map(|w| w.rect()).unwrap_or_default()
    }

    #[test]
    fn east_handle_into_neighbour_is_blocked() {
        let mut store = store_with(&[("a", "note", Rect::new(0, 0, 4, 4)), ("b", "note", Rect::new(4, 0, 4, 4))]);
        let geo = geometry();
        let mut resize = ResizeController::new(SessionRegistry::new());

        assert!(resize.begin_resize(&store, "a"));
        assert_eq!(resize.phase(), ResizePhase::Armed);
        assert!(resize.pointer_down(&store, "a", Handle::E, 1));

        let (px, py) = at(7, 2);
        assert_eq!(resize.pointer_move(&store, &geo, 1, px, py), Some(Rect::new(0, 0, 8, 4)));
        assert!(resize.is_blocked());

        assert_eq!(resize.pointer_up(&mut store, 1), ResizeOutcome::Blocked);
        assert_eq!(rect_of(&store, "a"), Rect::new(0, 0, 4, 4));
        assert_eq!(resize.phase(), ResizePhase::Idle);
    }

    #[test]
    fn south_east_handle_commits() {
        let mut store = store_with(&[("a", "note", Rect::new(2, 2, 2, 2))]);
        let geo = geometry();
        let mut resize = ResizeController::new(SessionRegistry::new());
        resize.begin_resize(&store, "a");
        resize.pointer_down(&store, "a", Handle::SE, 7);
        let (px, py) = at(5, 4);
        resize.pointer_move(&store, &geo, 7, px, py);
        assert!(!resize.is_blocked());
        assert_eq!(resize.pointer_up(&mut store, 7), ResizeOutcome::Committed);
        assert_eq!(rect_of(&store, "a"), Rect::new(2, 2, 4, 3));
    }

    #[test]
    fn north_west_handle_keeps_bottom_right_anchored() {
        let mut store = store_with(&[("a", "note", Rect::new(6, 6, 2, 2))]);
        let geo = geometry();
        let mut resize = ResizeController::new(SessionRegistry::new());
        resize.begin_resize(&store, "a");
        resize.pointer_down(&store, "a", Handle::NW, 1);
        let (px, py) = at(3, 4);
        assert_eq!(resize.pointer_move(&store, &geo, 1, px, py), Some(Rect::new(3, 4, 5, 4)));
        assert_eq!(resize.pointer_up(&mut store, 1), ResizeOutcome::Committed);
        let r = rect_of(&store, "a");
        assert_eq!((r.right(), r.bottom()), (8, 8));
    }

    #[test]
    fn shrinking_clamps_to_minimum() {
        let store = store_with(&[("c", "clock", Rect::new(4, 4, 6, 4))]);
        let geo = geometry();
        let mut resize = ResizeController::new(SessionRegistry::new());
        resize.begin_resize(&store, "c");
        resize.pointer_down(&store, "c", Handle::W, 1);
        // Dragging the west edge far past the east edge.
        let (px, py) = at(20, 5);
        assert_eq!(resize.pointer_move(&store, &geo, 1, px, py), Some(Rect::new(7, 4, 3, 4)));
        resize.pointer_down(&store, "c", Handle::N, 1);
        assert_eq!(resize.active_handle(), Some(Handle::W));
    }

    #[test]
    fn growing_clamps_to_maximum_and_grid() {
        let store = store_with(&[("c", "clock", Rect::new(20, 0, 3, 2))]);
        let geo = geometry();
        let mut resize = ResizeController::new(SessionRegistry::new());
        resize.begin_resize(&store, "c");
        resize.pointer_down(&store, "c", Handle::SE, 1);
        let (px, py) = at(23, 11);
        assert_eq!(resize.pointer_move(&store, &geo, 1, px, py), Some(Rect::new(20, 0, 4, 8)));
    }

    #[test]
    fn unchanged_release_does_nothing() {
        let mut store = store_with(&[("a", "note", Rect::new(0, 0, 4, 4))]);
        let mut resize = ResizeController::new(SessionRegistry::new());
        resize.begin_resize(&store, "a");
        resize.pointer_down(&store, "a", Handle::E, 1);
        let (px, py) = at(3, 0);
        resize.pointer_move(&store, &geometry(), 1, px, py);
        assert_eq!(resize.pointer_up(&mut store, 1), ResizeOutcome::Unchanged);
    }

    #[test]
    fn locked_widget_cannot_be_armed() {
        let mut store = store_with(&[("a", "note", Rect::new(0, 0, 4, 4))]);
        store.set_widget_lock("a", true);
        let mut resize = ResizeController::new(SessionRegistry::new());
        assert!(!resize.begin_resize(&store, "a"));
        assert!(!resize.pointer_down(&store, "a", Handle::E, 1));
    }

    #[test]
    fn escape_and_removal_cancel_without_commit() {
        let mut store = store_with(&[("a", "note", Rect::new(0, 0, 4, 4))]);
        let geo = geometry();
        let capture = Rc::new(SessionRegistry::new());
        let mut resize = ResizeController::new(Rc::clone(&capture));

        resize.begin_resize(&store, "a");
        resize.pointer_down(&store, "a", Handle::E, 1);
        let (px, py) = at(9, 0);
        resize.pointer_move(&store, &geo, 1, px, py);
        assert!(resize.on_escape());
        assert_eq!(capture.active_sessions(), 0);
        assert_eq!(rect_of(&store, "a"), Rect::new(0, 0, 4, 4));

        resize.begin_resize(&store, "a");
        resize.pointer_down(&store, "a", Handle::E, 1);
        store.remove_widget("a");
        assert_eq!(resize.pointer_move(&store, &geo, 1, px, py), None);
        assert_eq!(resize.phase(), ResizePhase::Idle);
        assert_eq!(capture.active_sessions(), 0);
    }

    #[test]
    fn handle_press_after_widget_changed_cancels() {
        let mut store = store_with(&[("note-1", "note", Rect::new(0, 0, 4, 4))]);
        let capture = Rc::new(SessionRegistry::new());
        let mut resize = ResizeController::new(Rc::clone(&capture));

        // Removed and re-added under the same id elsewhere.
        resize.begin_resize(&store, "note-1");
        store.remove_widget("note-1");
        store.add_widget("note", WidgetSlot::at(10, 5, 2, 2));
        assert!(store.state().contains("note-1"));
        assert!(!resize.pointer_down(&store, "note-1", Handle::E, 1));
        assert_eq!(resize.phase(), ResizePhase::Idle);
        assert_eq!(capture.active_sessions(), 0);

        // Moved after arming.
        resize.begin_resize(&store, "note-1");
        store.move_widget("note-1", 0, 0);
        assert!(!resize.pointer_down(&store, "note-1", Handle::E, 1));
        assert_eq!(resize.phase(), ResizePhase::Idle);

        // Locked after arming.
        resize.begin_resize(&store, "note-1");
        store.set_widget_lock("note-1", true);
        assert!(!resize.pointer_down(&store, "note-1", Handle::E, 1));
        assert_eq!(resize.phase(), ResizePhase::Idle);
        assert_eq!(rect_of(&store, "note-1"), Rect::new(0, 0, 2, 2));
    }

    #[test]
    fn drag_session_excludes_resize_on_same_widget() {
        let store = store_with(&[("a", "note", Rect::new(0, 0, 4, 4))]);
        let capture = Rc::new(SessionRegistry::new());
        assert!(capture.acquire("a", 1));
        let mut resize = ResizeController::new(Rc::clone(&capture));
        assert!(resize.begin_resize(&store, "a"));
        assert!(!resize.pointer_down(&store, "a", Handle::E, 2));
        assert_eq!(resize.phase(), ResizePhase::Armed);
    }

    #[test]
    fn handle_names_on_the_wire() {
        assert_eq!(serde_json::to_string(&Handle::NE).unwrap(), "\"ne\"");
        assert_eq!(Handle::ALL.len(), 8);
    }
}
