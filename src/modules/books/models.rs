use serde::{Deserialize, Serialize};
use shelf_db::{Book, BookChanges, Review, CATEGORY_MAX_CHARS, TITLE_MAX_CHARS};
use shelf_http::error::AppError;

use crate::utils::validation::{field, FieldErrors};

/// Submitted book fields, for both create and update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BookForm {
    pub title: String,
    pub text: String,
    pub category: String,
}

impl BookForm {
    pub fn validate(self) -> Result<BookChanges, AppError> {
        let mut errors = FieldErrors::new();
        let title = errors.required_text("title", &self.title, Some(TITLE_MAX_CHARS));
        let text = errors.required_text("text", &self.text, None);
        let category = errors.required_text("category", &self.category, Some(CATEGORY_MAX_CHARS));
        errors.finish("book")?;

        Ok(BookChanges {
            title,
            text,
            category,
        })
    }

    pub fn descriptor() -> serde_json::Value {
        serde_json::json!({
            "fields": [
                field("title", "string", Some(TITLE_MAX_CHARS)),
                field("text", "string", None),
                field("category", "string", Some(CATEGORY_MAX_CHARS)),
            ]
        })
    }
}

/// Detail view: the book, its reviews, and their mean rate.
#[derive(Debug, Clone, Serialize)]
pub struct BookDetail {
    pub book: Book,
    pub reviews: Vec<Review>,
    pub avg_rating: Option<f64>,
}

/// GET context for the update and delete forms.
#[derive(Debug, Clone, Serialize)]
pub struct BookFormContext {
    pub book: Book,
    pub form: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn valid_form_is_trimmed() {
        let form = BookForm {
            title: " Dune ".to_string(),
            text: "Spice.".to_string(),
            category: "fiction ".to_string(),
        };
        let changes = form.validate().unwrap();
        assert_eq!(changes.title, "Dune");
        assert_eq!(changes.category, "fiction");
    }

    #[test]
    fn empty_form_reports_all_fields() {
        match BookForm::default().validate() {
            Err(AppError::Validation { details, .. }) => assert_eq!(details.len(), 3),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn overlong_title_is_rejected() {
        let form = BookForm {
            title: "t".repeat(TITLE_MAX_CHARS + 1),
            text: "body".to_string(),
            category: "c".to_string(),
        };
        assert_eq!(
            form.validate().unwrap_err().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
