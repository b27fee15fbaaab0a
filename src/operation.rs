//! Layout operations and their in-memory execution.
//!
//! [`LayoutOperation`] is the closed set of mutations a [`LayoutState`] can
//! undergo.  It doubles as the wire format sent to a layout authority and
//! accepted on the command line, tagged by `"type"`:
//!
//! ```json
//! {"type":"addWidget","widgetType":"clock","layout":{"x":0,"y":0}}
//! {"type":"moveWidget","id":"clock-1","x":4,"y":0}
//! {"type":"resizeWidget","id":"clock-1","width":6,"height":3}
//! {"type":"setWidgetLock","id":"clock-1","locked":true}
//! ```
//!
//! [`apply_local`] is the reference semantics: a pure function from the
//! current state and an operation to the next state or a [`LayoutError`].

use crate::layout::{Cell, Footprint, LayoutState, Rect, WidgetLayout, WidgetRegistry};
use crate::placement;
use crate::settings::WidgetSettings;
use crate::validation::{validate_widget_id, validate_widget_type};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Why an operation was rejected.  The layout is unchanged in every case.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("widget not found: {0}")]
    UnknownId(String),
    #[error("widget id already in use: {0}")]
    DuplicateId(String),
    #[error("widget is locked: {0}")]
    Locked(String),
    #[error("widget {0} would leave the grid")]
    OutOfBounds(String),
    #[error("widget {id} cannot be {width}x{height}")]
    InvalidSize { id: String, width: u32, height: u32 },
    #[error("widget {id} would overlap {with}")]
    Collision { id: String, with: String },
    #[error("no free slot for widget {0}")]
    NoFreeSlot(String),
    #[error("invalid {field}: {message}")]
    Invalid { field: &'static str, message: String },
    #[error("rejected by layout authority: {0}")]
    Rejected(String),
}

/// Requested placement for `addWidget`.  Every field is optional: a missing
/// id is generated, a missing size uses the type's default, and a missing or
/// occupied position falls back to the first free slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSlot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
}

impl WidgetSlot {
    /// A slot at an explicit position and size.
    pub fn at(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }
}

/// Every mutation the layout store accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum LayoutOperation {
    AddWidget {
        widget_type: String,
        #[serde(default)]
        layout: WidgetSlot,
    },
    MoveWidget {
        id: String,
        x: u32,
        y: u32,
    },
    ResizeWidget {
        id: String,
        width: u32,
        height: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        x: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        y: Option<u32>,
    },
    RemoveWidget {
        id: String,
    },
    SetWidgetLock {
        id: String,
        locked: bool,
    },
    SetWidgetSettings {
        id: String,
        settings: Value,
    },
}

impl LayoutOperation {
    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            LayoutOperation::AddWidget { .. } => "addWidget",
            LayoutOperation::MoveWidget { .. } => "moveWidget",
            LayoutOperation::ResizeWidget { .. } => "resizeWidget",
            LayoutOperation::RemoveWidget { .. } => "removeWidget",
            LayoutOperation::SetWidgetLock { .. } => "setWidgetLock",
            LayoutOperation::SetWidgetSettings { .. } => "setWidgetSettings",
        }
    }

    /// The widget this operation targets, if already known.
    pub fn widget_id(&self) -> Option<&str> {
        match self {
            LayoutOperation::AddWidget { layout, .. } => layout.id.as_deref(),
            LayoutOperation::MoveWidget { id, .. }
            | LayoutOperation::ResizeWidget { id, .. }
            | LayoutOperation::RemoveWidget { id }
            | LayoutOperation::SetWidgetLock { id, .. }
            | LayoutOperation::SetWidgetSettings { id, .. } => Some(id),
        }
    }
}

/// Smallest `"{widget_type}-{n}"` (n ≥ 1) not used by any widget in `state`.
pub fn generate_id(state: &LayoutState, widget_type: &str) -> String {
    (1u64..)
        .map(|n| format!("{}-{}", widget_type, n))
        .find(|candidate| !state.contains(candidate))
        .unwrap_or_else(|| widget_type.to_string())
}

/// Execute `op` against `state` in memory.
pub fn apply_local(
    state: &LayoutState,
    op: &LayoutOperation,
    registry: &WidgetRegistry,
) -> Result<LayoutState, LayoutError> {
    let mut next = state.clone();
    match op {
        LayoutOperation::AddWidget {
            widget_type,
            layout,
        } => {
            let widget = place_new_widget(state, widget_type, layout, registry)?;
            next.widgets.push(widget);
        }

        LayoutOperation::MoveWidget { id, x, y } => {
            let widget = movable(state, id)?;
            let x = (*x).min(state.grid.columns.saturating_sub(widget.width));
            let y = (*y).min(state.grid.rows.saturating_sub(widget.height));
            next.widgets =
                placement::push_resolve(&state.grid, &state.widgets, id, Cell::new(x, y))
                    .ok_or_else(|| LayoutError::NoFreeSlot(id.clone()))?;
        }

        LayoutOperation::ResizeWidget {
            id,
            width,
            height,
            x,
            y,
        } => {
            let widget = movable(state, id)?;
            let rect = resized_rect(state, widget, Footprint::new(*width, *height), *x, *y, registry)?;
            if let Some(other) = state
                .widgets
                .iter()
                .filter(|other| other.id != *id)
                .find(|other| placement::overlaps(&other.rect(), &rect))
            {
                return Err(LayoutError::Collision {
                    id: id.clone(),
                    with: other.id.clone(),
                });
            }
            if let Some(target) = next.find_mut(id) {
                target.set_rect(rect);
            }
        }

        LayoutOperation::RemoveWidget { id } => {
            let index = state
                .position(id)
                .ok_or_else(|| LayoutError::UnknownId(id.clone()))?;
            next.widgets.remove(index);
        }

        LayoutOperation::SetWidgetLock { id, locked } => {
            let target = next
                .find_mut(id)
                .ok_or_else(|| LayoutError::UnknownId(id.clone()))?;
            target.locked = *locked;
        }

        LayoutOperation::SetWidgetSettings { id, settings } => {
            let target = next
                .find_mut(id)
                .ok_or_else(|| LayoutError::UnknownId(id.clone()))?;
            target.settings = WidgetSettings::sanitize(&target.widget_type, Some(settings.clone()));
        }
    }
    Ok(next)
}

/// Look up `id` and refuse locked widgets.
fn movable<'a>(state: &'a LayoutState, id: &str) -> Result<&'a WidgetLayout, LayoutError> {
    let widget = state
        .find(id)
        .ok_or_else(|| LayoutError::UnknownId(id.to_string()))?;
    if widget.locked {
        return Err(LayoutError::Locked(id.to_string()));
    }
    Ok(widget)
}

fn place_new_widget(
    state: &LayoutState,
    widget_type: &str,
    slot: &WidgetSlot,
    registry: &WidgetRegistry,
) -> Result<WidgetLayout, LayoutError> {
    validate_widget_type(widget_type)?;
    let id = match &slot.id {
        Some(id) => id.clone(),
        None => generate_id(state, widget_type),
    };
    validate_widget_id(&id)?;
    if state.contains(&id) {
        return Err(LayoutError::DuplicateId(id));
    }

    let constraints = registry.constraints_for(widget_type);
    let default_size = registry.default_size(widget_type);
    let requested = Footprint::new(
        slot.width.unwrap_or(default_size.width),
        slot.height.unwrap_or(default_size.height),
    );
    let size = constraints.clamp(requested, &state.grid);
    if !constraints.admits(size) {
        return Err(LayoutError::InvalidSize {
            id,
            width: size.width,
            height: size.height,
        });
    }

    let occupied: Vec<Rect> = state.widgets.iter().map(|w| w.rect()).collect();
    let explicit = match (slot.x, slot.y) {
        (Some(x), Some(y)) if x < state.grid.columns && y < state.grid.rows => {
            Some(Rect::new(x, y, size.width, size.height))
        }
        _ => None,
    };
    let rect = match explicit {
        Some(rect)
            if placement::in_bounds(&state.grid, &rect)
                && !occupied.iter().any(|r| placement::overlaps(r, &rect)) =>
        {
            rect
        }
        _ => {
            let cell = placement::first_free_slot(&state.grid, &occupied, size)
                .ok_or_else(|| LayoutError::NoFreeSlot(id.clone()))?;
            Rect::new(cell.col, cell.row, size.width, size.height)
        }
    };

    Ok(WidgetLayout {
        id,
        widget_type: widget_type.to_string(),
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: rect.height,
        locked: slot.locked.unwrap_or(false),
        settings: WidgetSettings::sanitize(widget_type, slot.settings.clone()),
    })
}

/// Clamp a requested resize to the type's limits and to the grid, anchored
/// at `(x, y)` or the widget's current origin.
fn resized_rect(
    state: &LayoutState,
    widget: &WidgetLayout,
    requested: Footprint,
    x: Option<u32>,
    y: Option<u32>,
    registry: &WidgetRegistry,
) -> Result<Rect, LayoutError> {
    let x = x.unwrap_or(widget.x);
    let y = y.unwrap_or(widget.y);
    if x >= state.grid.columns || y >= state.grid.rows {
        return Err(LayoutError::OutOfBounds(widget.id.clone()));
    }
    let constraints = registry.constraints_for(&widget.widget_type);
    let clamped = constraints.clamp(requested, &state.grid);
    let size = Footprint::new(
        clamped.width.min(state.grid.columns - x),
        clamped.height.min(state.grid.rows - y),
    );
    if !constraints.admits(size) {
        return Err(LayoutError::InvalidSize {
            id: widget.id.clone(),
            width: size.width,
            height: size.height,
        });
    }
    Ok(Rect::new(x, y, size.width, size.height))
}
