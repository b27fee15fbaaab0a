//! Per-widget-type settings.
//!
//! On the wire a widget's settings are an opaque JSON object.  Inside the
//! engine they are a [`WidgetSettings`] value: a typed schema for widget
//! types the engine knows how to validate, and [`WidgetSettings::Unknown`]
//! for everything else, which keeps the object verbatim.
//!
//! [`WidgetSettings::sanitize`] is the single entry point from untyped JSON.
//! For a known type it validates every documented field, substitutes the
//! default for fields that are missing or fail their type check, and keeps
//! keys it does not recognise so newer renderers can round-trip them.

use crate::layout::Footprint;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Typed settings, keyed by widget type.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetSettings {
    /// Settings of a `clock` widget.
    Clock(ClockSettings),
    /// Any other widget type; the object is kept as-is.
    Unknown(Map<String, Value>),
}

impl WidgetSettings {
    /// Default settings for a freshly added widget of `widget_type`.
    pub fn defaults_for(widget_type: &str) -> Self {
        Self::sanitize(widget_type, None)
    }

    /// Validate raw settings for `widget_type`.
    ///
    /// `None`, `null` and non-object values are treated as an empty object.
    pub fn sanitize(widget_type: &str, raw: Option<Value>) -> Self {
        let map = match raw {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                warn!(
                    "settings for {} are not an object ({}), discarding",
                    widget_type, other
                );
                Map::new()
            }
        };
        match widget_type {
            "clock" => WidgetSettings::Clock(ClockSettings::from_map(map)),
            _ => WidgetSettings::Unknown(map),
        }
    }

    /// JSON form for persistence and renderers.  Empty settings serialize as
    /// `None` so the field is omitted.
    pub fn to_value(&self) -> Option<Value> {
        match self {
            WidgetSettings::Clock(clock) => serde_json::to_value(clock).ok(),
            WidgetSettings::Unknown(map) if map.is_empty() => None,
            WidgetSettings::Unknown(map) => Some(Value::Object(map.clone())),
        }
    }
}

impl Default for WidgetSettings {
    fn default() -> Self {
        WidgetSettings::Unknown(Map::new())
    }
}

//  Clock

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeFormat {
    #[serde(rename = "12h")]
    TwelveHour,
    #[serde(rename = "24h")]
    TwentyFourHour,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFormat {
    Long,
    Short,
    Numeric,
    #[serde(rename = "none")]
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutStyle {
    Stacked,
    Inline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSizeMode {
    Auto,
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateFrequency {
    Second,
    Minute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClickBehavior {
    OpenSystemClock,
    #[serde(rename = "none")]
    Ignore,
}

/// Settings of the `clock` widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockSettings {
    pub time_format: TimeFormat,
    pub show_seconds: bool,
    pub date_format: DateFormat,
    pub layout_style: LayoutStyle,
    pub alignment: Alignment,
    pub font_size_mode: FontSizeMode,
    pub timezone: String,
    pub update_frequency: UpdateFrequency,
    pub click_behavior: ClickBehavior,
    /// Smallest footprint the renderer lays out properly.
    pub min_grid_size: Footprint,
    /// Keys this version does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            time_format: TimeFormat::TwelveHour,
            show_seconds: true,
            date_format: DateFormat::Long,
            layout_style: LayoutStyle::Stacked,
            alignment: Alignment::Center,
            font_size_mode: FontSizeMode::Auto,
            timezone: "system".to_string(),
            update_frequency: UpdateFrequency::Second,
            click_behavior: ClickBehavior::OpenSystemClock,
            min_grid_size: Footprint::new(3, 2),
            extra: Map::new(),
        }
    }
}

impl ClockSettings {
    fn from_map(mut map: Map<String, Value>) -> Self {
        let d = Self::default();
        let settings = Self {
            time_format: take_field(&mut map, "timeFormat", d.time_format),
            show_seconds: take_field(&mut map, "showSeconds", d.show_seconds),
            date_format: take_field(&mut map, "dateFormat", d.date_format),
            layout_style: take_field(&mut map, "layoutStyle", d.layout_style),
            alignment: take_field(&mut map, "alignment", d.alignment),
            font_size_mode: take_field(&mut map, "fontSizeMode", d.font_size_mode),
            timezone: take_field(&mut map, "timezone", d.timezone),
            update_frequency: take_field(&mut map, "updateFrequency", d.update_frequency),
            click_behavior: take_field(&mut map, "clickBehavior", d.click_behavior),
            min_grid_size: take_field(&mut map, "minGridSize", d.min_grid_size),
            extra: Map::new(),
        };
        Self { extra: map, ..settings }
    }
}

/// Remove `key` from `map` and parse it, falling back to `default` when it
/// is absent or has the wrong shape.
fn take_field<T: DeserializeOwned>(map: &mut Map<String, Value>, key: &str, default: T) -> T {
    match map.remove(key) {
        Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
            debug!("invalid settings field {}: {}, using default", key, e);
            default
        }),
        None => default,
    }
}
