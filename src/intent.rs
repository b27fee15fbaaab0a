//! The contract with widget renderers.
//!
//! The engine never looks inside a widget.  A renderer is handed
//! [`RendererProps`] (its id, footprint, settings, and how it is being shown)
//! and may answer with [`WidgetIntent`]s, which the store turns into layout
//! operations on the renderer's behalf.

use crate::layout::{Footprint, WidgetLayout};
use crate::operation::LayoutOperation;
use crate::store::LayoutStore;
use crate::traits::{LayoutAuthority, Scheduler};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How a widget is currently presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderMode {
    /// Normal dashboard view.
    #[default]
    Dashboard,
    /// The layout editor is open: handles and drag ghosts are shown.
    Editing,
    /// Thumbnail in the widget picker.
    Preview,
}

/// Everything a renderer receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RendererProps {
    pub widget_id: String,
    pub size: Footprint,
    /// The sanitized settings as a JSON object.
    pub settings: Value,
    pub mode: RenderMode,
}

impl RendererProps {
    pub fn for_widget(widget: &WidgetLayout, mode: RenderMode) -> Self {
        Self {
            widget_id: widget.id.clone(),
            size: widget.footprint(),
            settings: widget
                .settings
                .to_value()
                .unwrap_or_else(|| Value::Object(Map::new())),
            mode,
        }
    }
}

/// A request emitted by a renderer about its own widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WidgetIntent {
    /// Change the footprint, keeping the top-left corner.
    RequestResize { width: u32, height: u32 },
    RequestRemove,
    /// Merge `settings` over the widget's current settings.
    RequestSettingsChange { settings: Map<String, Value> },
    RequestLock { locked: bool },
}

impl WidgetIntent {
    /// The operation that fulfils this intent for `widget`.
    pub fn to_operation(&self, widget: &WidgetLayout) -> LayoutOperation {
        let id = widget.id.clone();
        match self {
            WidgetIntent::RequestResize { width, height } => LayoutOperation::ResizeWidget {
                id,
                width: *width,
                height: *height,
                x: None,
                y: None,
            },
            WidgetIntent::RequestRemove => LayoutOperation::RemoveWidget { id },
            WidgetIntent::RequestSettingsChange { settings } => {
                let mut merged = match widget.settings.to_value() {
                    Some(Value::Object(map)) => map,
                    _ => Map::new(),
                };
                for (key, value) in settings {
                    merged.insert(key.clone(), value.clone());
                }
                LayoutOperation::SetWidgetSettings {
                    id,
                    settings: Value::Object(merged),
                }
            }
            WidgetIntent::RequestLock { locked } => LayoutOperation::SetWidgetLock {
                id,
                locked: *locked,
            },
        }
    }
}

impl<A: LayoutAuthority + 'static, S: Scheduler> LayoutStore<A, S> {
    /// Props for every widget, in layout order.
    pub fn renderer_props(&self, mode: RenderMode) -> Vec<RendererProps> {
        self.state()
            .widgets
            .iter()
            .map(|w| RendererProps::for_widget(w, mode))
            .collect()
    }

    /// Act on an intent emitted by the renderer of `widget_id`.
    pub fn handle_intent(&mut self, widget_id: &str, intent: &WidgetIntent) -> bool {
        let op = match self.state().find(widget_id) {
            Some(widget) => intent.to_operation(widget),
            None => {
                debug!("intent from unknown widget {} ignored", widget_id);
                return false;
            }
        };
        self.apply_operation(op)
    }
}
