//! Pixel ⇄ cell conversion for the rendered grid.
//!
//! The grid is drawn inside a bounding box with uniform padding and a fixed
//! gap between tracks.  Tracks are either uniform,
//! `(inner − gaps) / count`, or user-sized: a per-column / per-row list of
//! pixel widths set by dragging the divider handles.
//!
//! Both directions walk the same track layout, so a preview drawn with
//! [`GridGeometry::pixel_rect_from_cell`] always covers the cell that
//! [`GridGeometry::cell_from_point`] would report for a point inside it.

use crate::layout::{Cell, Footprint, GridConfig};

/// A rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// Track sizes along one axis.
#[derive(Debug, Clone, PartialEq)]
enum Tracks {
    Uniform,
    Custom(Vec<f64>),
}

/// Geometry of the rendered grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridGeometry {
    grid: GridConfig,
    bounds: PixelRect,
    padding: f64,
    gap: f64,
    columns: Tracks,
    rows: Tracks,
}

impl GridGeometry {
    /// Uniform tracks, no padding, no gap.
    pub fn new(grid: GridConfig, bounds: PixelRect) -> Self {
        Self {
            grid,
            bounds,
            padding: 0.0,
            gap: 0.0,
            columns: Tracks::Uniform,
            rows: Tracks::Uniform,
        }
    }

    pub fn with_padding(mut self, padding: f64) -> Self {
        self.padding = padding.max(0.0);
        self
    }

    pub fn with_gap(mut self, gap: f64) -> Self {
        self.gap = gap.max(0.0);
        self
    }

    /// Use custom column widths.  Ignored unless there is exactly one entry
    /// per column.
    pub fn with_column_tracks(mut self, widths: Vec<f64>) -> Self {
        self.columns = custom_tracks(widths, self.grid.columns);
        self
    }

    /// Use custom row heights.  Ignored unless there is exactly one entry
    /// per row.
    pub fn with_row_tracks(mut self, heights: Vec<f64>) -> Self {
        self.rows = custom_tracks(heights, self.grid.rows);
        self
    }

    pub fn grid(&self) -> GridConfig {
        self.grid
    }

    /// The content box: bounds minus padding.
    fn content(&self) -> PixelRect {
        PixelRect::new(
            self.bounds.left + self.padding,
            self.bounds.top + self.padding,
            (self.bounds.width - 2.0 * self.padding).max(0.0),
            (self.bounds.height - 2.0 * self.padding).max(0.0),
        )
    }

    /// The cell under `(px, py)`, clamped so a widget of `footprint` placed
    /// there stays fully inside the grid.
    pub fn cell_from_point(&self, px: f64, py: f64, footprint: Footprint) -> Cell {
        let content = self.content();
        let local_x = (px - content.left).clamp(0.0, content.width);
        let local_y = (py - content.top).clamp(0.0, content.height);

        let col = track_index(&self.columns, local_x, content.width, self.grid.columns, self.gap);
        let row = track_index(&self.rows, local_y, content.height, self.grid.rows, self.gap);

        Cell::new(
            col.min(self.grid.columns.saturating_sub(footprint.width)),
            row.min(self.grid.rows.saturating_sub(footprint.height)),
        )
    }

    /// Pixel rectangle covered by a widget of `footprint` at `cell`,
    /// including the gaps between its tracks.
    pub fn pixel_rect_from_cell(&self, cell: Cell, footprint: Footprint) -> PixelRect {
        let content = self.content();
        let (left, width) = span(
            &self.columns,
            cell.col,
            footprint.width,
            content.width,
            self.grid.columns,
            self.gap,
        );
        let (top, height) = span(
            &self.rows,
            cell.row,
            footprint.height,
            content.height,
            self.grid.rows,
            self.gap,
        );
        PixelRect::new(content.left + left, content.top + top, width, height)
    }
}

fn custom_tracks(sizes: Vec<f64>, count: u32) -> Tracks {
    if sizes.len() == count as usize && sizes.iter().all(|s| s.is_finite() && *s >= 0.0) {
        Tracks::Custom(sizes)
    } else {
        Tracks::Uniform
    }
}

/// Width of one uniform track.
fn uniform_track(inner: f64, count: u32, gap: f64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let gaps = gap * count.saturating_sub(1) as f64;
    ((inner - gaps) / count as f64).max(0.0)
}

/// Size of track `index` along an axis.
fn track_size(tracks: &Tracks, index: u32, inner: f64, count: u32, gap: f64) -> f64 {
    match tracks {
        Tracks::Custom(sizes) => sizes.get(index as usize).copied().unwrap_or(0.0),
        Tracks::Uniform => uniform_track(inner, count, gap),
    }
}

/// Index of the track containing `offset`.  A point in the gap after a track
/// belongs to that track.
fn track_index(tracks: &Tracks, offset: f64, inner: f64, count: u32, gap: f64) -> u32 {
    if count == 0 {
        return 0;
    }
    let mut end = 0.0;
    for index in 0..count {
        end += track_size(tracks, index, inner, count, gap) + gap;
        if offset < end {
            return index;
        }
    }
    count - 1
}

/// `(start, length)` of `len` tracks beginning at `start_index`.
fn span(tracks: &Tracks, start_index: u32, len: u32, inner: f64, count: u32, gap: f64) -> (f64, f64) {
    let start: f64 = (0..start_index.min(count))
        .map(|i| track_size(tracks, i, inner, count, gap) + gap)
        .sum();
    let end_index = start_index.saturating_add(len).min(count);
    let covered = end_index.saturating_sub(start_index);
    let tracks_len: f64 = (start_index..end_index)
        .map(|i| track_size(tracks, i, inner, count, gap))
        .sum();
    let gaps = gap * covered.saturating_sub(1) as f64;
    (start, tracks_len + gaps)
}
