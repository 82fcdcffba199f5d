use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::{
    Book, BookChanges, BookId, NewBook, NewReview, Review, ReviewId, RATE_RANGE,
};
use crate::store::{CatalogStore, DbError};

#[derive(Default)]
struct Tables {
    books: BTreeMap<BookId, Book>,
    reviews: BTreeMap<ReviewId, Review>,
    last_book_id: u64,
    last_review_id: u64,
}

/// In-process backend behind the `memory://` endpoint. Writers are
/// serialized by a single lock, so concurrent edits resolve last-write-wins.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn insert_book(&self, book: NewBook) -> Result<Book, DbError> {
        let mut tables = self.tables.write().await;
        tables.last_book_id += 1;
        let id = BookId(tables.last_book_id);

        let book = Book {
            id,
            title: book.title,
            text: book.text,
            category: book.category,
            owner: book.owner,
        };
        tables.books.insert(id, book.clone());
        Ok(book)
    }

    async fn find_book(&self, id: BookId) -> Result<Option<Book>, DbError> {
        Ok(self.tables.read().await.books.get(&id).cloned())
    }

    async fn list_books(&self) -> Result<Vec<Book>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables.books.values().rev().cloned().collect())
    }

    async fn update_book(
        &self,
        id: BookId,
        changes: BookChanges,
    ) -> Result<Option<Book>, DbError> {
        let mut tables = self.tables.write().await;
        let Some(book) = tables.books.get_mut(&id) else {
            return Ok(None);
        };

        book.title = changes.title;
        book.text = changes.text;
        book.category = changes.category;
        Ok(Some(book.clone()))
    }

    async fn delete_book(&self, id: BookId) -> Result<Option<Book>, DbError> {
        let mut tables = self.tables.write().await;
        let removed = tables.books.remove(&id);
        if removed.is_some() {
            tables.reviews.retain(|_, review| review.book != id);
        }
        Ok(removed)
    }

    async fn insert_review(&self, review: NewReview) -> Result<Review, DbError> {
        if !RATE_RANGE.contains(&review.rate) {
            return Err(DbError::Constraint(format!(
                "review.rate {} outside {}..={}",
                review.rate,
                RATE_RANGE.start(),
                RATE_RANGE.end()
            )));
        }

        let mut tables = self.tables.write().await;
        if !tables.books.contains_key(&review.book) {
            return Err(DbError::MissingBook(review.book));
        }

        tables.last_review_id += 1;
        let id = ReviewId(tables.last_review_id);
        let review = Review {
            id,
            book: review.book,
            title: review.title,
            text: review.text,
            rate: review.rate,
            author: review.author,
        };
        tables.reviews.insert(id, review.clone());
        Ok(review)
    }

    async fn reviews_for_book(&self, book: BookId) -> Result<Vec<Review>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables
            .reviews
            .values()
            .filter(|review| review.book == book)
            .cloned()
            .collect())
    }

    async fn list_reviews(&self) -> Result<Vec<Review>, DbError> {
        Ok(self.tables.read().await.reviews.values().cloned().collect())
    }
}
