//! Input checks for identifiers that arrive from outside the engine.

use crate::operation::LayoutError;

const MAX_ID_LEN: usize = 100;
const MAX_TYPE_LEN: usize = 50;

/// Widget ids are 1–100 characters of alphanumerics, `-` and `_`.
pub fn validate_widget_id(id: &str) -> Result<(), LayoutError> {
    if id.is_empty() {
        return Err(invalid("id", "must not be empty"));
    }
    if id.chars().count() > MAX_ID_LEN {
        return Err(invalid("id", "too long (max 100 characters)"));
    }
    if !id.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
        return Err(invalid(
            "id",
            "must contain only alphanumeric characters, hyphens, and underscores",
        ));
    }
    Ok(())
}

/// Widget types are 1–50 characters.
pub fn validate_widget_type(widget_type: &str) -> Result<(), LayoutError> {
    if widget_type.is_empty() {
        return Err(invalid("widgetType", "must not be empty"));
    }
    if widget_type.chars().count() > MAX_TYPE_LEN {
        return Err(invalid("widgetType", "too long (max 50 characters)"));
    }
    Ok(())
}

fn invalid(field: &'static str, message: &str) -> LayoutError {
    LayoutError::Invalid {
        field,
        message: message.to_string(),
    }
}
