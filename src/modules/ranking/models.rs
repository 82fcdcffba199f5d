use serde::{Deserialize, Serialize};
use shelf_db::{Book, BookId, RATE_RANGE, TITLE_MAX_CHARS};
use shelf_http::{error::AppError, pagination::PageMeta};

use super::aggregate::RankedBook;
use crate::utils::validation::{field, FieldErrors};

/// Submitted review fields. `book` overrides the book named in the path.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReviewForm {
    pub book: Option<u64>,
    pub title: String,
    pub text: String,
    pub rate: Option<i64>,
}

/// A review form that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidReview {
    pub book: BookId,
    pub title: String,
    pub text: String,
    pub rate: u8,
}

impl ReviewForm {
    /// The book this form targets, given the one named in the path.
    pub fn target(&self, path_book: BookId) -> BookId {
        self.book.map(BookId).unwrap_or(path_book)
    }

    pub fn validate(self, path_book: BookId) -> Result<ValidReview, AppError> {
        let book = self.target(path_book);
        let mut errors = FieldErrors::new();
        let title = errors.required_text("title", &self.title, Some(TITLE_MAX_CHARS));
        let text = errors.required_text("text", &self.text, None);

        let rate = match self.rate {
            None => {
                errors.push("rate", "required");
                0
            }
            Some(rate) => match u8::try_from(rate) {
                Ok(rate) if RATE_RANGE.contains(&rate) => rate,
                _ => {
                    errors.push(
                        "rate",
                        format!("must be between {} and {}", RATE_RANGE.start(), RATE_RANGE.end()),
                    );
                    0
                }
            },
        };
        errors.finish("review")?;

        Ok(ValidReview {
            book,
            title,
            text,
            rate,
        })
    }

    pub fn descriptor() -> serde_json::Value {
        let mut rate = field("rate", "integer", None);
        rate["minimum"] = (*RATE_RANGE.start()).into();
        rate["maximum"] = (*RATE_RANGE.end()).into();

        serde_json::json!({
            "fields": [
                field("title", "string", Some(TITLE_MAX_CHARS)),
                field("text", "string", None),
                rate,
            ]
        })
    }
}

/// GET context for the review form.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewFormContext {
    pub book: Book,
    pub form: serde_json::Value,
}

/// Index view: every book newest first, plus one page of the ranking.
#[derive(Debug, Clone, Serialize)]
pub struct IndexView {
    pub object_list: Vec<Book>,
    pub ranking: Vec<RankedBook>,
    pub page: PageMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(rate: Option<i64>) -> ReviewForm {
        ReviewForm {
            book: None,
            title: "Great".to_string(),
            text: "Loved it".to_string(),
            rate,
        }
    }

    #[test]
    fn path_book_is_the_default_target() {
        let review = form(Some(4)).validate(BookId(7)).unwrap();
        assert_eq!(review.book, BookId(7));
        assert_eq!(review.rate, 4);
    }

    #[test]
    fn form_book_overrides_path() {
        let mut submitted = form(Some(4));
        submitted.book = Some(2);
        assert_eq!(submitted.target(BookId(7)), BookId(2));
    }

    #[test]
    fn rate_must_be_present_and_on_scale() {
        for rate in [None, Some(0), Some(6), Some(-1), Some(300)] {
            match form(rate).validate(BookId(1)) {
                Err(AppError::Validation { details, .. }) => {
                    assert_eq!(details.len(), 1);
                    assert_eq!(details[0]["field"], "rate");
                }
                other => panic!("rate {:?} should fail, got {:?}", rate, other),
            }
        }
        assert!(form(Some(1)).validate(BookId(1)).is_ok());
        assert!(form(Some(5)).validate(BookId(1)).is_ok());
    }

    #[test]
    fn review_title_shares_the_book_title_limit() {
        let mut submitted = form(Some(3));
        submitted.title = "r".repeat(TITLE_MAX_CHARS);
        assert!(submitted.clone().validate(BookId(1)).is_ok());

        submitted.title.push('r');
        match submitted.validate(BookId(1)) {
            Err(AppError::Validation { details, .. }) => assert_eq!(details[0]["field"], "title"),
            other => panic!("overlong title should fail, got {:?}", other),
        }
    }
}
