use async_trait::async_trait;
use shelf_kernel::Migration;
use thiserror::Error;

use crate::models::{Book, BookChanges, BookId, NewBook, NewReview, Review};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DbError {
    /// A review referenced a book that does not exist.
    #[error("book {0} does not exist")]
    MissingBook(BookId),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("unsupported database endpoint '{0}'")]
    UnsupportedEndpoint(String),

    #[error("database backend failed: {0}")]
    Backend(String),
}

/// Persistence seam for books and their reviews.
///
/// Every call is atomic with respect to every other call on the same store.
/// Listing order is part of the contract: books newest first, reviews by
/// ascending id.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_book(&self, book: NewBook) -> Result<Book, DbError>;

    async fn find_book(&self, id: BookId) -> Result<Option<Book>, DbError>;

    /// All books, descending id.
    async fn list_books(&self) -> Result<Vec<Book>, DbError>;

    /// Replace the editable fields. `None` when the book does not exist.
    async fn update_book(&self, id: BookId, changes: BookChanges)
        -> Result<Option<Book>, DbError>;

    /// Remove the book and its reviews, returning the removed book.
    async fn delete_book(&self, id: BookId) -> Result<Option<Book>, DbError>;

    /// Fails with [`DbError::MissingBook`] without writing anything when the
    /// referenced book is absent.
    async fn insert_review(&self, review: NewReview) -> Result<Review, DbError>;

    async fn reviews_for_book(&self, book: BookId) -> Result<Vec<Review>, DbError>;

    async fn list_reviews(&self) -> Result<Vec<Review>, DbError>;

    /// Run the `(module, migration)` pairs the store has not seen yet, in
    /// order, and return how many ran. Schemaless stores have nothing to do.
    async fn apply_migrations(&self, _migrations: &[(String, Migration)]) -> Result<usize, DbError> {
        Ok(0)
    }
}
