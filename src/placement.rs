//! Placement rules: overlap and bounds tests, free-slot search, and
//! push-resolution of drag moves.
//!
//! Everything here is a pure function over rectangles and widget lists.

use crate::layout::{Cell, Footprint, GridConfig, Rect, WidgetLayout};
use log::debug;

/// Half-open rectangle intersection.  Rectangles that only share an edge do
/// not overlap.
pub fn overlaps(a: &Rect, b: &Rect) -> bool {
    !(a.x >= b.right() || a.right() <= b.x || a.y >= b.bottom() || a.bottom() <= b.y)
}

/// Whether `rect` is non-empty and lies entirely inside the grid.
pub fn in_bounds(grid: &GridConfig, rect: &Rect) -> bool {
    rect.width >= 1
        && rect.height >= 1
        && rect.right() <= grid.columns
        && rect.bottom() <= grid.rows
}

/// Whether a rectangle of `size` at `cell` is in bounds and clear of every
/// rectangle in `placed`.
fn fits(grid: &GridConfig, placed: &[Rect], cell: Cell, size: Footprint) -> bool {
    let candidate = Rect::new(cell.col, cell.row, size.width, size.height);
    in_bounds(grid, &candidate) && !placed.iter().any(|r| overlaps(r, &candidate))
}

/// Row-major scan of every cell starting at index `start`, wrapping around
/// to index 0, returning the first position where `size` fits.
fn scan_from(grid: &GridConfig, placed: &[Rect], size: Footprint, start: u32) -> Option<Cell> {
    let total = grid.cell_count();
    if total == 0 {
        return None;
    }
    (0..total)
        .map(|k| (start + k) % total)
        .map(|index| Cell::new(index % grid.columns, index / grid.columns))
        .find(|&cell| fits(grid, placed, cell, size))
}

/// First position, scanning row-major from `(0, 0)`, where a rectangle of
/// `size` is in bounds and overlaps nothing in `placed`.
pub fn first_free_slot(grid: &GridConfig, placed: &[Rect], size: Footprint) -> Option<Cell> {
    scan_from(grid, placed, size, 0)
}

/// Place `moving_id` at `desired` and relocate every widget it displaces.
///
/// Remaining widgets are visited in list order.  A widget whose current
/// rectangle is clear of everything placed so far stays put; otherwise it
/// goes to the first free cell found by a row-major scan that starts at its
/// own origin and wraps.  Only widgets already placed in this pass count as
/// obstacles.  Locked widgets never move: displacing one fails the pass.
///
/// Returns `None` when `desired` is out of bounds, `moving_id` is unknown, or
/// any displaced widget has nowhere to go.  The input list is never modified;
/// on success the returned list has the same ids in the same order with only
/// `x`/`y` changed.
pub fn push_resolve(
    grid: &GridConfig,
    widgets: &[WidgetLayout],
    moving_id: &str,
    desired: Cell,
) -> Option<Vec<WidgetLayout>> {
    let moving = widgets.iter().find(|w| w.id == moving_id)?;
    let moved = moving.rect().at(desired.col, desired.row);
    if !in_bounds(grid, &moved) {
        debug!("push_resolve: {} out of bounds at {:?}", moving_id, desired);
        return None;
    }

    let mut placed = vec![moved];
    let mut positions: Vec<Cell> = Vec::with_capacity(widgets.len());
    for widget in widgets {
        if widget.id == moving_id {
            positions.push(desired);
            continue;
        }
        let rect = widget.rect();
        if !placed.iter().any(|p| overlaps(p, &rect)) {
            placed.push(rect);
            positions.push(rect.origin());
            continue;
        }
        if widget.locked {
            debug!("push_resolve: locked {} is in the way", widget.id);
            return None;
        }
        let start = rect.y * grid.columns + rect.x;
        let Some(cell) = scan_from(grid, &placed, rect.footprint(), start) else {
            debug!("push_resolve: no slot for displaced {}", widget.id);
            return None;
        };
        placed.push(rect.at(cell.col, cell.row));
        positions.push(cell);
    }

    Some(
        widgets
            .iter()
            .zip(positions)
            .map(|(widget, cell)| WidgetLayout {
                x: cell.col,
                y: cell.row,
                ..widget.clone()
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(id: &str, x: u32, y: u32, width: u32, height: u32) -> WidgetLayout {
        WidgetLayout::new(id, "note", Rect::new(x, y, width, height))
    }

    fn pos(widgets: &[WidgetLayout], id: &str) -> (u32, u32) {
        let w = widgets.iter().find(|w| w.id == id).unwrap();
        (w.x, w.y)
    }

    #[test]
    fn overlap_is_half_open() {
        let a = Rect::new(0, 0, 4, 2);
        assert!(overlaps(&a, &Rect::new(3, 1, 2, 2)));
        assert!(!overlaps(&a, &Rect::new(4, 0, 4, 2)));
        assert!(!overlaps(&a, &Rect::new(0, 2, 4, 2)));
        assert!(overlaps(&a, &a));
    }

    #[test]
    fn bounds_check() {
        let grid = GridConfig::new(24, 12);
        assert!(in_bounds(&grid, &Rect::new(20, 10, 4, 2)));
        assert!(!in_bounds(&grid, &Rect::new(21, 10, 4, 2)));
        assert!(!in_bounds(&grid, &Rect::new(0, 11, 1, 2)));
        assert!(!in_bounds(&grid, &Rect::new(0, 0, 0, 1)));
        assert!(!in_bounds(&grid, &Rect::new(u32::MAX, 0, 2, 2)));
        assert!(!in_bounds(&grid, &Rect::new(0, u32::MAX - 1, 2, 2)));
    }

    #[test]
    fn first_free_slot_on_empty_grid_is_origin() {
        let grid = GridConfig::default();
        assert_eq!(first_free_slot(&grid, &[], Footprint::new(4, 2)), Some(Cell::new(0, 0)));
    }

    #[test]
    fn first_free_slot_skips_occupied_cells_row_major() {
        let grid = GridConfig::new(8, 4);
        let placed = [Rect::new(0, 0, 4, 2), Rect::new(4, 0, 3, 2)];
        assert_eq!(
            first_free_slot(&grid, &placed, Footprint::new(2, 2)),
            Some(Cell::new(0, 2))
        );
        assert_eq!(
            first_free_slot(&grid, &placed, Footprint::new(1, 1)),
            Some(Cell::new(7, 0))
        );
    }

    #[test]
    fn first_free_slot_full_grid() {
        let grid = GridConfig::new(4, 2);
        let placed = [Rect::new(0, 0, 4, 2)];
        assert_eq!(first_free_slot(&grid, &placed, Footprint::new(1, 1)), None);
    }

    #[test]
    fn push_moves_displaced_widget_to_next_slot_from_its_origin() {
        let grid = GridConfig::default();
        let widgets = vec![w("a", 0, 0, 4, 2), w("b", 4, 0, 4, 2)];
        let out = push_resolve(&grid, &widgets, "a", Cell::new(4, 0)).unwrap();
        assert_eq!(pos(&out, "a"), (4, 0));
        assert_eq!(pos(&out, "b"), (8, 0));
        assert_eq!(out.iter().map(|w| w.id.as_str()).collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn push_scan_wraps_around() {
        // 8x2 grid: b at the bottom-right must wrap to the start.
        let grid = GridConfig::new(8, 2);
        let widgets = vec![w("a", 0, 1, 2, 1), w("b", 6, 1, 2, 1)];
        let out = push_resolve(&grid, &widgets, "a", Cell::new(6, 1)).unwrap();
        assert_eq!(pos(&out, "b"), (0, 0));
    }

    #[test]
    fn push_fails_atomically_when_no_slot() {
        let grid = GridConfig::new(8, 2);
        let widgets = vec![w("a", 0, 0, 4, 2), w("b", 4, 0, 4, 2)];
        assert!(push_resolve(&grid, &widgets, "a", Cell::new(2, 0)).is_none());
        // Input untouched.
        assert_eq!(pos(&widgets, "a"), (0, 0));
        assert_eq!(pos(&widgets, "b"), (4, 0));
    }

    #[test]
    fn push_rejects_out_of_bounds_target() {
        let grid = GridConfig::new(8, 2);
        let widgets = vec![w("a", 0, 0, 4, 2)];
        assert!(push_resolve(&grid, &widgets, "a", Cell::new(5, 0)).is_none());
    }

    #[test]
    fn push_keeps_non_conflicting_widgets() {
        let grid = GridConfig::default();
        let widgets = vec![w("a", 0, 0, 2, 2), w("b", 10, 10, 2, 2), w("c", 4, 0, 2, 2)];
        let out = push_resolve(&grid, &widgets, "a", Cell::new(0, 4)).unwrap();
        assert_eq!(pos(&out, "b"), (10, 10));
        assert_eq!(pos(&out, "c"), (4, 0));
    }

    #[test]
    fn push_never_resizes() {
        let grid = GridConfig::default();
        let widgets = vec![w("a", 0, 0, 4, 2), w("b", 4, 0, 3, 3)];
        let out = push_resolve(&grid, &widgets, "a", Cell::new(4, 0)).unwrap();
        let b = out.iter().find(|w| w.id == "b").unwrap();
        assert_eq!((b.width, b.height), (3, 3));
    }

    #[test]
    fn push_refuses_to_displace_locked_widget() {
        let grid = GridConfig::default();
        let mut widgets = vec![w("a", 0, 0, 4, 2), w("b", 4, 0, 4, 2)];
        widgets[1].locked = true;
        assert!(push_resolve(&grid, &widgets, "a", Cell::new(4, 0)).is_none());
    }

    #[test]
    fn push_in_place_is_identity() {
        let grid = GridConfig::default();
        let widgets = vec![w("a", 0, 0, 4, 2), w("b", 4, 0, 4, 2)];
        let out = push_resolve(&grid, &widgets, "a", Cell::new(0, 0)).unwrap();
        assert_eq!(out, widgets);
    }
}
