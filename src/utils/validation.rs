//! Field-level form validation with every failure reported at once.

use serde_json::json;
use shelf_http::error::AppError;

/// Accumulates `{"field", "error"}` entries for a 422 response.
#[derive(Debug, Default)]
pub struct FieldErrors {
    details: Vec<serde_json::Value>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, error: impl Into<String>) {
        self.details
            .push(json!({ "field": field, "error": error.into() }));
    }

    /// Trim `value` and check it is non-empty and, when `max_chars` is set,
    /// no longer than that many characters.
    pub fn required_text(&mut self, field: &str, value: &str, max_chars: Option<usize>) -> String {
        let value = value.trim();
        if value.is_empty() {
            self.push(field, "required");
        } else if let Some(max) = max_chars {
            if value.chars().count() > max {
                self.push(field, format!("at most {} characters", max));
            }
        }
        value.to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    /// `Ok(())` when nothing failed, else a validation error naming every
    /// failing field.
    pub fn finish(self, form: &str) -> Result<(), AppError> {
        if self.details.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(
                self.details,
                format!("{} form is invalid", form),
            ))
        }
    }
}

/// Describe one form field for GET form views.
pub fn field(name: &str, kind: &str, max_chars: Option<usize>) -> serde_json::Value {
    json!({
        "name": name,
        "type": kind,
        "required": true,
        "max_length": max_chars,
    })
}
