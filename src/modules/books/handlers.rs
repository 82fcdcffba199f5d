//! Catalog handlers: one function per operation, sharing the caller
//! extractor and the ownership guard instead of a view hierarchy.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use shelf_authz::{authorize_owner, Identity};
use shelf_db::{Book, BookId, NewBook};
use shelf_http::{
    error::AppError,
    extract::{Authenticated, FormBody, PathId, SeeOther},
    pagination::{Page, PageQuery, Paginator},
};

use super::models::{BookDetail, BookForm, BookFormContext};
use super::{detail_path, list_path, CatalogState};
use crate::modules::ranking::aggregate::mean_rating;
use crate::utils::store_error;

type Catalog = State<Arc<CatalogState>>;

pub(super) async fn health_check() -> &'static str {
    "books module is healthy"
}

/// Books newest first, one page at a time.
pub(super) async fn list_books(
    State(state): Catalog,
    Authenticated(_caller): Authenticated,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<Book>>, AppError> {
    let books = state.store.list_books().await.map_err(store_error)?;
    let page = Paginator::new(books.len(), state.page_size).paginate(books, query.number())?;
    Ok(Json(page))
}

pub(super) async fn create_form(
    Authenticated(_caller): Authenticated,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "form": BookForm::descriptor() }))
}

pub(super) async fn create_book(
    State(state): Catalog,
    Authenticated(caller): Authenticated,
    FormBody(form): FormBody<BookForm>,
) -> Result<SeeOther, AppError> {
    let fields = form.validate()?;
    let book = state
        .store
        .insert_book(NewBook {
            title: fields.title,
            text: fields.text,
            category: fields.category,
            owner: caller.user,
        })
        .await
        .map_err(store_error)?;

    tracing::info!(book_id = %book.id, owner = %book.owner, "book created");
    Ok(SeeOther::to(list_path()).with_id(book.id.0))
}

pub(super) async fn book_detail(
    State(state): Catalog,
    Authenticated(_caller): Authenticated,
    PathId(id): PathId,
) -> Result<Json<BookDetail>, AppError> {
    let id = BookId(id);
    let book = find_book(&state, id).await?;
    let reviews = state
        .store
        .reviews_for_book(id)
        .await
        .map_err(store_error)?;

    Ok(Json(BookDetail {
        avg_rating: mean_rating(&reviews),
        book,
        reviews,
    }))
}

pub(super) async fn update_form(
    State(state): Catalog,
    Authenticated(caller): Authenticated,
    PathId(id): PathId,
) -> Result<Json<BookFormContext>, AppError> {
    let book = find_owned_book(&state, BookId(id), &caller).await?;
    Ok(Json(BookFormContext {
        book,
        form: BookForm::descriptor(),
    }))
}

pub(super) async fn update_book(
    State(state): Catalog,
    Authenticated(caller): Authenticated,
    PathId(id): PathId,
    FormBody(form): FormBody<BookForm>,
) -> Result<SeeOther, AppError> {
    let id = BookId(id);
    find_owned_book(&state, id, &caller).await?;
    let changes = form.validate()?;

    let book = state
        .store
        .update_book(id, changes)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found(id))?;

    tracing::info!(book_id = %book.id, actor = %caller.user, "book updated");
    Ok(SeeOther::to(detail_path(book.id)).with_id(book.id.0))
}

pub(super) async fn delete_confirm(
    State(state): Catalog,
    Authenticated(caller): Authenticated,
    PathId(id): PathId,
) -> Result<Json<BookFormContext>, AppError> {
    let book = find_owned_book(&state, BookId(id), &caller).await?;
    Ok(Json(BookFormContext {
        book,
        form: serde_json::json!({ "fields": [] }),
    }))
}

pub(super) async fn delete_book(
    State(state): Catalog,
    Authenticated(caller): Authenticated,
    PathId(id): PathId,
) -> Result<SeeOther, AppError> {
    let id = BookId(id);
    find_owned_book(&state, id, &caller).await?;

    let removed = state
        .store
        .delete_book(id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found(id))?;

    tracing::info!(book_id = %removed.id, actor = %caller.user, "book deleted");
    Ok(SeeOther::to(list_path()).with_id(removed.id.0))
}

fn not_found(id: BookId) -> AppError {
    AppError::not_found(format!("book {} not found", id))
}

async fn find_book(state: &CatalogState, id: BookId) -> Result<Book, AppError> {
    state
        .store
        .find_book(id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found(id))
}

/// Load the book and refuse callers other than its owner. Runs before any
/// mutation so a denied request changes nothing.
async fn find_owned_book(
    state: &CatalogState,
    id: BookId,
    caller: &Identity,
) -> Result<Book, AppError> {
    let book = find_book(state, id).await?;
    authorize_owner(caller, &book.owner, format!("book {}", id))?;
    Ok(book)
}
