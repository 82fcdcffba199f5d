//! Project-specific utilities live here.

pub mod validation;

use shelf_db::DbError;
use shelf_http::error::AppError;

/// Map a store failure onto the HTTP taxonomy. A dangling book reference is
/// the caller's mistake; anything else is ours.
pub fn store_error(err: DbError) -> AppError {
    match err {
        DbError::MissingBook(id) => AppError::not_found(format!("book {} not found", id)),
        other => AppError::Internal(anyhow::Error::new(other).context("catalog store failed")),
    }
}
