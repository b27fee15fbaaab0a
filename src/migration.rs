//! Upgrading persisted layouts to the canonical grid.
//!
//! Two legacy grid shapes exist in the wild: the original 5×4 dashboard and
//! a short-lived 12×24 (columns × rows) portrait layout.  Both are rescaled
//! onto 24×12 with fixed per-axis factors, each coordinate rounded to the
//! nearest cell, and the result normalized.

use crate::layout::{GridConfig, LayoutState, WidgetRegistry, LAYOUT_VERSION};
use log::{info, warn};

/// Known legacy grids and their `(scale_x, scale_y)` factors.
const LEGACY_GRIDS: [(GridConfig, f64, f64); 2] = [
    (GridConfig { columns: 5, rows: 4 }, 4.8, 3.0),
    (GridConfig { columns: 12, rows: 24 }, 2.0, 0.5),
];

/// Scale factors for `grid`, if it is a known legacy shape.
pub fn legacy_scale(grid: GridConfig) -> Option<(f64, f64)> {
    LEGACY_GRIDS
        .iter()
        .find(|(legacy, _, _)| *legacy == grid)
        .map(|&(_, sx, sy)| (sx, sy))
}

/// Result of [`migrate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Migrated {
    pub state: LayoutState,
    /// The layout was rescaled or its schema version bumped; callers persist
    /// it immediately.
    pub migrated: bool,
    /// Normalization fixes applied after rescaling.
    pub fixes: Vec<String>,
}

impl Migrated {
    /// Whether the loaded layout differs from what is on disk.
    pub fn needs_save(&self) -> bool {
        self.migrated || !self.fixes.is_empty()
    }
}

/// Bring a freshly loaded layout up to date and make it satisfy every
/// invariant.
pub fn migrate(mut state: LayoutState, registry: &WidgetRegistry) -> Migrated {
    let mut migrated = false;

    if let Some((sx, sy)) = legacy_scale(state.grid) {
        info!(
            "migrating {}x{} layout to {}",
            state.grid.columns,
            state.grid.rows,
            describe(GridConfig::default())
        );
        for widget in &mut state.widgets {
            widget.x = scale(widget.x, sx);
            widget.y = scale(widget.y, sy);
            widget.width = scale(widget.width, sx);
            widget.height = scale(widget.height, sy);
        }
        state.grid = GridConfig::default();
        migrated = true;
    }

    if state.version < LAYOUT_VERSION {
        info!("upgrading layout schema {} -> {}", state.version, LAYOUT_VERSION);
        state.version = LAYOUT_VERSION;
        migrated = true;
    } else if state.version > LAYOUT_VERSION {
        warn!(
            "layout schema {} is newer than supported {}, loading anyway",
            state.version, LAYOUT_VERSION
        );
    }

    let fixes = state.normalize(registry);
    Migrated {
        state,
        migrated,
        fixes,
    }
}

fn scale(value: u32, factor: f64) -> u32 {
    (value as f64 * factor).round() as u32
}

fn describe(grid: GridConfig) -> String {
    format!("{}x{}", grid.columns, grid.rows)
}
