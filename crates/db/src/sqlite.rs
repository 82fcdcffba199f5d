//! SQLite backend behind `sqlite:` endpoints. The schema is whatever the
//! registered modules migrate; each migration runs once and is recorded in
//! `shelf_migrations`.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use shelf_kernel::Migration;
use sqlx::{
    error::ErrorKind,
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow},
    Row,
};

use crate::models::{Book, BookChanges, BookId, NewBook, NewReview, Review, ReviewId};
use crate::store::{CatalogStore, DbError};
use shelf_authz::UserId;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open `url` lazily; nothing connects until the first query. The pool
    /// holds a single long-lived connection so `:memory:` databases survive
    /// between calls and writers are serialized.
    pub fn connect_lazy(url: &str) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(backend)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_lazy_with(options);

        Ok(Self { pool })
    }
}

fn backend(err: sqlx::Error) -> DbError {
    match err.as_database_error().map(|db| db.kind()) {
        Some(ErrorKind::CheckViolation | ErrorKind::NotNullViolation | ErrorKind::UniqueViolation) => {
            DbError::Constraint(err.to_string())
        }
        _ => DbError::Backend(err.to_string()),
    }
}

/// SQLite keys are signed; an id past `i64::MAX` cannot exist.
fn key(id: BookId) -> Option<i64> {
    i64::try_from(id.0).ok()
}

fn decode<T, U>(value: T) -> Result<U, sqlx::Error>
where
    U: TryFrom<T, Error = std::num::TryFromIntError>,
{
    U::try_from(value).map_err(|err| sqlx::Error::Decode(Box::new(err)))
}

fn book_from_row(row: &SqliteRow) -> Result<Book, sqlx::Error> {
    Ok(Book {
        id: BookId(decode(row.try_get::<i64, _>("id")?)?),
        title: row.try_get("title")?,
        text: row.try_get("text")?,
        category: row.try_get("category")?,
        owner: UserId::new(row.try_get::<String, _>("owner")?),
    })
}

fn review_from_row(row: &SqliteRow) -> Result<Review, sqlx::Error> {
    Ok(Review {
        id: ReviewId(decode(row.try_get::<i64, _>("id")?)?),
        book: BookId(decode(row.try_get::<i64, _>("book")?)?),
        title: row.try_get("title")?,
        text: row.try_get("text")?,
        rate: decode(row.try_get::<i64, _>("rate")?)?,
        author: UserId::new(row.try_get::<String, _>("author")?),
    })
}

fn collect<T>(
    rows: Vec<SqliteRow>,
    map: fn(&SqliteRow) -> Result<T, sqlx::Error>,
) -> Result<Vec<T>, DbError> {
    rows.iter().map(map).collect::<Result<_, _>>().map_err(backend)
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn insert_book(&self, book: NewBook) -> Result<Book, DbError> {
        let row = sqlx::query(
            "INSERT INTO book (title, text, category, owner) VALUES (?, ?, ?, ?) \
             RETURNING id, title, text, category, owner",
        )
        .bind(book.title)
        .bind(book.text)
        .bind(book.category)
        .bind(book.owner.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        book_from_row(&row).map_err(backend)
    }

    async fn find_book(&self, id: BookId) -> Result<Option<Book>, DbError> {
        let Some(key) = key(id) else {
            return Ok(None);
        };
        let row = sqlx::query("SELECT id, title, text, category, owner FROM book WHERE id = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.as_ref().map(book_from_row).transpose().map_err(backend)
    }

    async fn list_books(&self) -> Result<Vec<Book>, DbError> {
        let rows = sqlx::query("SELECT id, title, text, category, owner FROM book ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        collect(rows, book_from_row)
    }

    async fn update_book(
        &self,
        id: BookId,
        changes: BookChanges,
    ) -> Result<Option<Book>, DbError> {
        let Some(key) = key(id) else {
            return Ok(None);
        };
        let row = sqlx::query(
            "UPDATE book SET title = ?, text = ?, category = ? WHERE id = ? \
             RETURNING id, title, text, category, owner",
        )
        .bind(changes.title)
        .bind(changes.text)
        .bind(changes.category)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.as_ref().map(book_from_row).transpose().map_err(backend)
    }

    async fn delete_book(&self, id: BookId) -> Result<Option<Book>, DbError> {
        let Some(key) = key(id) else {
            return Ok(None);
        };
        // Reviews go with the book through `ON DELETE CASCADE`.
        let row = sqlx::query(
            "DELETE FROM book WHERE id = ? RETURNING id, title, text, category, owner",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.as_ref().map(book_from_row).transpose().map_err(backend)
    }

    async fn insert_review(&self, review: NewReview) -> Result<Review, DbError> {
        let book = review.book;
        let Some(book_key) = key(book) else {
            return Err(DbError::MissingBook(book));
        };

        let row = sqlx::query(
            "INSERT INTO review (book, title, text, rate, author) VALUES (?, ?, ?, ?, ?) \
             RETURNING id, book, title, text, rate, author",
        )
        .bind(book_key)
        .bind(review.title)
        .bind(review.text)
        .bind(i64::from(review.rate))
        .bind(review.author.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match err.as_database_error().map(|db| db.kind()) {
            Some(ErrorKind::ForeignKeyViolation) => DbError::MissingBook(book),
            _ => backend(err),
        })?;

        review_from_row(&row).map_err(backend)
    }

    async fn reviews_for_book(&self, book: BookId) -> Result<Vec<Review>, DbError> {
        let Some(key) = key(book) else {
            return Ok(Vec::new());
        };
        let rows = sqlx::query(
            "SELECT id, book, title, text, rate, author FROM review WHERE book = ? ORDER BY id",
        )
        .bind(key)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        collect(rows, review_from_row)
    }

    async fn list_reviews(&self) -> Result<Vec<Review>, DbError> {
        let rows = sqlx::query("SELECT id, book, title, text, rate, author FROM review ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        collect(rows, review_from_row)
    }

    async fn apply_migrations(&self, migrations: &[(String, Migration)]) -> Result<usize, DbError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS shelf_migrations (
                module TEXT NOT NULL,
                id     TEXT NOT NULL,
                PRIMARY KEY (module, id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        let mut applied = 0;
        for (module, migration) in migrations {
            let mut tx = self.pool.begin().await.map_err(backend)?;

            let recorded: Option<i64> =
                sqlx::query_scalar("SELECT 1 FROM shelf_migrations WHERE module = ? AND id = ?")
                    .bind(module.as_str())
                    .bind(migration.id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(backend)?;
            if recorded.is_some() {
                tx.rollback().await.map_err(backend)?;
                continue;
            }

            sqlx::Executor::execute(&mut *tx, sqlx::raw_sql(migration.up))
                .await
                .map_err(backend)?;
            sqlx::query("INSERT INTO shelf_migrations (module, id) VALUES (?, ?)")
                .bind(module.as_str())
                .bind(migration.id)
                .execute(&mut *tx)
                .await
                .map_err(backend)?;
            tx.commit().await.map_err(backend)?;

            tracing::info!(target: "shelf-db", module = %module, migration = migration.id, "migration applied");
            applied += 1;
        }

        Ok(applied)
    }
}
