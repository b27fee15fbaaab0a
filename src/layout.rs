//! Dashboard layout data model.
//!
//! A [`LayoutState`] is a `columns × rows` grid ([`GridConfig`]) with an
//! ordered list of [`WidgetLayout`]s placed on it.  Every widget occupies a
//! half-open rectangle of cells: `[x, x + width) × [y, y + height)`.
//!
//! Size limits are per widget type and come from the [`WidgetRegistry`].
//! Types the registry does not know fall back to a permissive default.

use crate::operation::LayoutError;
use crate::placement;
use crate::settings::WidgetSettings;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Canonical grid width in columns.
pub const CANONICAL_COLUMNS: u32 = 24;
/// Canonical grid height in rows.
pub const CANONICAL_ROWS: u32 = 12;
/// Schema version written into every persisted [`LayoutState`].
pub const LAYOUT_VERSION: u32 = 1;
/// Largest accepted grid dimension when loading.
pub const MAX_GRID_TRACKS: u32 = 100;

/// Grid dimensions in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridConfig {
    pub columns: u32,
    pub rows: u32,
}

impl GridConfig {
    pub fn new(columns: u32, rows: u32) -> Self {
        Self { columns, rows }
    }

    /// Total number of cells; the length of a row-major scan.
    pub fn cell_count(&self) -> u32 {
        self.columns * self.rows
    }

    /// Whether this is the canonical 24×12 grid.
    pub fn is_canonical(&self) -> bool {
        self.columns == CANONICAL_COLUMNS && self.rows == CANONICAL_ROWS
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self::new(CANONICAL_COLUMNS, CANONICAL_ROWS)
    }
}

/// A grid cell `(col, row)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cell {
    pub col: u32,
    pub row: u32,
}

impl Cell {
    pub fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }
}

/// A widget's size in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Footprint {
    pub width: u32,
    pub height: u32,
}

impl Footprint {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle in cell units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge, saturating at `u32::MAX`.
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge, saturating at `u32::MAX`.
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn origin(&self) -> Cell {
        Cell::new(self.x, self.y)
    }

    pub fn footprint(&self) -> Footprint {
        Footprint::new(self.width, self.height)
    }

    /// The same footprint moved to `(x, y)`.
    pub fn at(&self, x: u32, y: u32) -> Self {
        Self { x, y, ..*self }
    }
}

/// Per-type size limits, in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetConstraints {
    pub min_width: u32,
    pub min_height: u32,
    pub max_width: u32,
    pub max_height: u32,
}

impl WidgetConstraints {
    pub const fn new(min_width: u32, min_height: u32, max_width: u32, max_height: u32) -> Self {
        Self {
            min_width,
            min_height,
            max_width,
            max_height,
        }
    }

    /// Limits applied to widget types the registry does not know.
    pub const FALLBACK: WidgetConstraints = WidgetConstraints::new(2, 2, 12, 12);

    /// Clamp `size` into `[min, max]` per axis, then shrink it to fit the
    /// grid.  The result may still be below the minimum when the grid itself
    /// is smaller than the minimum; [`admits`](Self::admits) catches that.
    pub fn clamp(&self, size: Footprint, grid: &GridConfig) -> Footprint {
        Footprint::new(
            clamp_axis(size.width, self.min_width, self.max_width).min(grid.columns),
            clamp_axis(size.height, self.min_height, self.max_height).min(grid.rows),
        )
    }

    /// Whether `size` satisfies both axis ranges.
    pub fn admits(&self, size: Footprint) -> bool {
        (self.min_width..=self.max_width).contains(&size.width)
            && (self.min_height..=self.max_height).contains(&size.height)
    }
}

/// `value.clamp(min, max)` that tolerates a misconfigured `min > max`
/// instead of panicking; `max` wins.
pub(crate) fn clamp_axis(value: u32, min: u32, max: u32) -> u32 {
    value.max(min).min(max)
}

/// Constraint and default-size table keyed by widget type.
#[derive(Debug, Clone)]
pub struct WidgetRegistry {
    entries: HashMap<String, RegistryEntry>,
}

#[derive(Debug, Clone, Copy)]
struct RegistryEntry {
    constraints: WidgetConstraints,
    default_size: Footprint,
}

impl WidgetRegistry {
    /// An empty registry: every type uses [`WidgetConstraints::FALLBACK`].
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// The built-in widget types.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        let wide = WidgetConstraints::new(6, 4, 24, 12);
        registry.register("notifications", wide, Footprint::new(6, 4));
        registry.register("mail", wide, Footprint::new(6, 4));
        registry.register(
            "clock",
            WidgetConstraints::new(3, 2, 12, 8),
            Footprint::new(4, 2),
        );
        registry
    }

    /// Register or replace a type with an explicit default size.
    pub fn register(
        &mut self,
        widget_type: impl Into<String>,
        constraints: WidgetConstraints,
        default_size: Footprint,
    ) {
        self.entries.insert(
            widget_type.into(),
            RegistryEntry {
                constraints,
                default_size,
            },
        );
    }

    /// Override only the constraints of a type, keeping its default size
    /// when one is known (clamped into the new limits).
    pub fn set_constraints(&mut self, widget_type: &str, constraints: WidgetConstraints) {
        let previous = self.default_size(widget_type);
        let default_size = Footprint::new(
            clamp_axis(previous.width, constraints.min_width, constraints.max_width),
            clamp_axis(previous.height, constraints.min_height, constraints.max_height),
        );
        self.register(widget_type, constraints, default_size);
    }

    pub fn constraints_for(&self, widget_type: &str) -> WidgetConstraints {
        self.entries
            .get(widget_type)
            .map(|e| e.constraints)
            .unwrap_or(WidgetConstraints::FALLBACK)
    }

    /// Size used by `addWidget` when the caller gives none: the registered
    /// default, or the type's minimum.
    pub fn default_size(&self, widget_type: &str) -> Footprint {
        match self.entries.get(widget_type) {
            Some(entry) => entry.default_size,
            None => Footprint::new(
                WidgetConstraints::FALLBACK.min_width,
                WidgetConstraints::FALLBACK.min_height,
            ),
        }
    }

    pub fn is_known(&self, widget_type: &str) -> bool {
        self.entries.contains_key(widget_type)
    }
}

impl Default for WidgetRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// One widget placed on the grid.
///
/// `settings` is typed by `widget_type`; on the wire it is an opaque JSON
/// object (see [`WidgetRecord`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WidgetRecord", into = "WidgetRecord")]
pub struct WidgetLayout {
    pub id: String,
    pub widget_type: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub locked: bool,
    pub settings: WidgetSettings,
}

impl WidgetLayout {
    /// An unlocked widget with the default settings for its type.
    pub fn new(
        id: impl Into<String>,
        widget_type: impl Into<String>,
        rect: Rect,
    ) -> Self {
        let widget_type = widget_type.into();
        let settings = WidgetSettings::defaults_for(&widget_type);
        Self {
            id: id.into(),
            widget_type,
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            locked: false,
            settings,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn footprint(&self) -> Footprint {
        Footprint::new(self.width, self.height)
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.x = rect.x;
        self.y = rect.y;
        self.width = rect.width;
        self.height = rect.height;
    }
}

/// Persisted / wire form of a [`WidgetLayout`].
///
/// `settings` stays an untyped JSON value here; converting into a
/// [`WidgetLayout`] runs it through the per-type sanitizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetRecord {
    pub id: String,
    pub widget_type: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
}

impl From<WidgetRecord> for WidgetLayout {
    fn from(record: WidgetRecord) -> Self {
        let settings = WidgetSettings::sanitize(&record.widget_type, record.settings);
        Self {
            id: record.id,
            widget_type: record.widget_type,
            x: record.x,
            y: record.y,
            width: record.width,
            height: record.height,
            locked: record.locked,
            settings,
        }
    }
}

impl From<WidgetLayout> for WidgetRecord {
    fn from(widget: WidgetLayout) -> Self {
        let settings = widget.settings.to_value();
        Self {
            id: widget.id,
            widget_type: widget.widget_type,
            x: widget.x,
            y: widget.y,
            width: widget.width,
            height: widget.height,
            locked: widget.locked,
            settings,
        }
    }
}

/// The complete dashboard layout.
///
/// `widgets` keeps insertion order; push-resolution walks it in this order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutState {
    pub grid: GridConfig,
    pub widgets: Vec<WidgetLayout>,
    /// Schema version.  Files written before versioning load as `0`.
    #[serde(default)]
    pub version: u32,
}

impl LayoutState {
    /// An empty layout on `grid`.
    pub fn empty(grid: GridConfig) -> Self {
        Self {
            grid,
            widgets: Vec::new(),
            version: LAYOUT_VERSION,
        }
    }

    /// The first-run dashboard: a notifications panel in the top-left corner
    /// and a clock in the top-right corner.
    pub fn with_default_widgets(grid: GridConfig) -> Self {
        let mut state = Self::empty(grid);
        state.widgets = vec![
            WidgetLayout::new("notifications-demo", "notifications", Rect::new(0, 0, 6, 4)),
            WidgetLayout::new(
                "clock-demo",
                "clock",
                Rect::new(grid.columns.saturating_sub(4), 0, 4, 2),
            ),
        ];
        state
    }

    pub fn find(&self, id: &str) -> Option<&WidgetLayout> {
        self.widgets.iter().find(|w| w.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut WidgetLayout> {
        self.widgets.iter_mut().find(|w| w.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.widgets.iter().position(|w| w.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Check every committed-state invariant: bounds, size limits, id
    /// uniqueness, and pairwise non-overlap.
    pub fn check_invariants(&self, registry: &WidgetRegistry) -> Result<(), LayoutError> {
        let mut seen = HashSet::new();
        for (i, widget) in self.widgets.iter().enumerate() {
            if !seen.insert(widget.id.as_str()) {
                return Err(LayoutError::DuplicateId(widget.id.clone()));
            }
            if !placement::in_bounds(&self.grid, &widget.rect()) {
                return Err(LayoutError::OutOfBounds(widget.id.clone()));
            }
            let constraints = registry.constraints_for(&widget.widget_type);
            if !constraints.admits(widget.footprint()) {
                return Err(LayoutError::InvalidSize {
                    id: widget.id.clone(),
                    width: widget.width,
                    height: widget.height,
                });
            }
            if let Some(other) = self.widgets[..i]
                .iter()
                .find(|other| placement::overlaps(&other.rect(), &widget.rect()))
            {
                return Err(LayoutError::Collision {
                    id: widget.id.clone(),
                    with: other.id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Repair a loaded layout so it satisfies every invariant.
    ///
    /// A grid with a zero dimension becomes the canonical grid and oversized
    /// grids are capped at [`MAX_GRID_TRACKS`].
    /// Duplicate ids are dropped (first occurrence kept), sizes are clamped
    /// to the type's limits and the grid, positions are clamped into bounds,
    /// and widgets that still collide with an earlier widget are moved to the
    /// first free slot, or dropped when none exists.  Returns one message per
    /// fix applied.
    pub fn normalize(&mut self, registry: &WidgetRegistry) -> Vec<String> {
        let mut fixes = Vec::new();

        if self.grid.columns == 0 || self.grid.rows == 0 {
            fixes.push(format!(
                "grid {}x{} has a zero dimension, using {}x{}",
                self.grid.columns, self.grid.rows, CANONICAL_COLUMNS, CANONICAL_ROWS
            ));
            self.grid = GridConfig::default();
        }
        if self.grid.columns > MAX_GRID_TRACKS || self.grid.rows > MAX_GRID_TRACKS {
            let clamped = GridConfig::new(
                self.grid.columns.min(MAX_GRID_TRACKS),
                self.grid.rows.min(MAX_GRID_TRACKS),
            );
            fixes.push(format!(
                "grid {}x{} is too large, using {}x{}",
                self.grid.columns, self.grid.rows, clamped.columns, clamped.rows
            ));
            self.grid = clamped;
        }
        let grid = self.grid;

        let mut seen = HashSet::new();
        let mut placed: Vec<WidgetLayout> = Vec::with_capacity(self.widgets.len());
        for mut widget in self.widgets.drain(..) {
            if !seen.insert(widget.id.clone()) {
                fixes.push(format!("dropped duplicate widget id {}", widget.id));
                continue;
            }

            let constraints = registry.constraints_for(&widget.widget_type);
            let size = constraints.clamp(widget.footprint(), &grid);
            if !constraints.admits(size) {
                fixes.push(format!(
                    "dropped {}: {} does not fit a {}x{} grid",
                    widget.id, widget.widget_type, grid.columns, grid.rows
                ));
                continue;
            }
            if size != widget.footprint() {
                fixes.push(format!(
                    "resized {} from {}x{} to {}x{}",
                    widget.id, widget.width, widget.height, size.width, size.height
                ));
            }
            let x = widget.x.min(grid.columns - size.width);
            let y = widget.y.min(grid.rows - size.height);
            if (x, y) != (widget.x, widget.y) {
                fixes.push(format!(
                    "moved {} from ({}, {}) into bounds at ({}, {})",
                    widget.id, widget.x, widget.y, x, y
                ));
            }
            widget.set_rect(Rect::new(x, y, size.width, size.height));

            let occupied: Vec<Rect> = placed.iter().map(|w| w.rect()).collect();
            if occupied
                .iter()
                .any(|r| placement::overlaps(r, &widget.rect()))
            {
                match placement::first_free_slot(&grid, &occupied, size) {
                    Some(cell) => {
                        fixes.push(format!(
                            "relocated overlapping {} to ({}, {})",
                            widget.id, cell.col, cell.row
                        ));
                        widget.x = cell.col;
                        widget.y = cell.row;
                    }
                    None => {
                        fixes.push(format!("dropped {}: no free slot", widget.id));
                        continue;
                    }
                }
            }
            placed.push(widget);
        }
        self.widgets = placed;

        for fix in &fixes {
            warn!("normalize: {}", fix);
        }
        fixes
    }
}

impl Default for LayoutState {
    fn default() -> Self {
        Self::empty(GridConfig::default())
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::WidgetSettings;

    fn widget(id: &str, ty: &str, x: u32, y: u32, w: u32, h: u32) -> WidgetLayout {
        WidgetLayout::new(id, ty, Rect::new(x, y, w, h))
    }

    #[test]
    fn default_grid_is_canonical() {
        let g = GridConfig::default();
        assert!(g.is_canonical());
        assert_eq!(g.cell_count(), 288);
    }

    #[test]
    fn unknown_type_uses_fallback_constraints() {
        let reg = WidgetRegistry::builtin();
        assert_eq!(reg.constraints_for("cpu-monitor"), WidgetConstraints::FALLBACK);
        assert_eq!(reg.default_size("cpu-monitor"), Footprint::new(2, 2));
        assert!(!reg.is_known("cpu-monitor"));
    }

    #[test]
    fn builtin_clock_limits() {
        let reg = WidgetRegistry::builtin();
        let c = reg.constraints_for("clock");
        assert_eq!((c.min_width, c.min_height, c.max_width, c.max_height), (3, 2, 12, 8));
        assert_eq!(reg.default_size("clock"), Footprint::new(4, 2));
    }

    #[test]
    fn set_constraints_keeps_default_size_within_limits() {
        let mut reg = WidgetRegistry::builtin();
        reg.set_constraints("clock", WidgetConstraints::new(5, 3, 10, 6));
        assert_eq!(reg.default_size("clock"), Footprint::new(5, 3));
    }

    #[test]
    fn clamp_respects_limits_and_grid() {
        let c = WidgetConstraints::new(2, 2, 12, 12);
        let grid = GridConfig::new(8, 6);
        assert_eq!(c.clamp(Footprint::new(1, 20), &grid), Footprint::new(2, 6));
        assert_eq!(c.clamp(Footprint::new(30, 3), &grid), Footprint::new(8, 3));
    }

    #[test]
    fn default_dashboard_satisfies_invariants() {
        let state = LayoutState::with_default_widgets(GridConfig::default());
        assert_eq!(state.widgets.len(), 2);
        assert_eq!(state.find("clock-demo").map(|w| w.x), Some(20));
        state.check_invariants(&WidgetRegistry::builtin()).unwrap();
    }

    #[test]
    fn check_invariants_reports_overlap() {
        let mut state = LayoutState::default();
        state.widgets.push(widget("a", "note", 0, 0, 4, 4));
        state.widgets.push(widget("b", "note", 2, 2, 4, 4));
        let err = state.check_invariants(&WidgetRegistry::builtin()).unwrap_err();
        assert!(matches!(err, LayoutError::Collision { .. }));
    }

    #[test]
    fn touching_edges_are_not_an_overlap() {
        let mut state = LayoutState::default();
        state.widgets.push(widget("a", "note", 0, 0, 4, 4));
        state.widgets.push(widget("b", "note", 4, 0, 4, 4));
        state.widgets.push(widget("c", "note", 0, 4, 4, 4));
        state.check_invariants(&WidgetRegistry::builtin()).unwrap();
    }

    #[test]
    fn normalize_dedups_clamps_and_relocates() {
        let reg = WidgetRegistry::builtin();
        let mut state = LayoutState::default();
        state.widgets.push(widget("a", "note", 0, 0, 4, 4));
        state.widgets.push(widget("a", "note", 10, 0, 4, 4));
        state.widgets.push(widget("wide", "note", 22, 0, 30, 1));
        state.widgets.push(widget("over", "note", 1, 1, 2, 2));

        let fixes = state.normalize(&reg);
        assert!(!fixes.is_empty());
        assert_eq!(state.widgets.len(), 3);

        let wide = state.find("wide").unwrap();
        assert_eq!((wide.width, wide.height), (12, 2));
        assert_eq!(wide.x, 12);

        let over = state.find("over").unwrap();
        assert_eq!((over.x, over.y), (4, 0));
        state.check_invariants(&reg).unwrap();
    }

    #[test]
    fn normalize_fixes_zero_grid() {
        let mut state = LayoutState::empty(GridConfig::new(0, 5));
        let fixes = state.normalize(&WidgetRegistry::builtin());
        assert_eq!(fixes.len(), 1);
        assert!(state.grid.is_canonical());
    }

    #[test]
    fn normalize_caps_oversized_grid() {
        let mut state = LayoutState::empty(GridConfig::new(1000, 12));
        state.normalize(&WidgetRegistry::builtin());
        assert_eq!(state.grid, GridConfig::new(100, 12));
    }

    #[test]
    fn normalize_clean_state_reports_nothing() {
        let mut state = LayoutState::with_default_widgets(GridConfig::default());
        let before = state.clone();
        assert!(state.normalize(&WidgetRegistry::builtin()).is_empty());
        assert_eq!(state, before);
    }

    #[test]
    fn widget_round_trips_through_json() {
        let mut state = LayoutState::with_default_widgets(GridConfig::default());
        state.widgets[0].locked = true;
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"widgetType\":\"clock\""));
        let back: LayoutState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn missing_locked_and_settings_default() {
        let json = r#"{"id":"n1","widgetType":"note","x":1,"y":2,"width":3,"height":4}"#;
        let w: WidgetLayout = serde_json::from_str(json).unwrap();
        assert!(!w.locked);
        assert_eq!(w.settings, WidgetSettings::default());
        assert_eq!(w.rect(), Rect::new(1, 2, 3, 4));
    }
}
