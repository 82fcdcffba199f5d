use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use shelf_db::{BookId, NewReview};
use shelf_http::{
    error::AppError,
    extract::{Authenticated, FormBody, PathId, SeeOther},
    pagination::{PageQuery, Paginator},
};

use super::aggregate::rank_books;
use super::models::{IndexView, ReviewForm, ReviewFormContext};
use super::RankingState;
use crate::modules::books::detail_path;
use crate::utils::store_error;

type Ranking = State<Arc<RankingState>>;

pub(super) async fn health_check() -> &'static str {
    "ranking module is healthy"
}

/// Plain listing plus one page of the rating ranking, recomputed per call.
pub(super) async fn index(
    State(state): Ranking,
    Authenticated(_caller): Authenticated,
    Query(query): Query<PageQuery>,
) -> Result<Json<IndexView>, AppError> {
    let books = state.store.list_books().await.map_err(store_error)?;
    let reviews = state.store.list_reviews().await.map_err(store_error)?;

    let ranked = rank_books(books.clone(), &reviews);
    let page = Paginator::new(ranked.len(), state.page_size).paginate(ranked, query.number())?;

    Ok(Json(IndexView {
        object_list: books,
        ranking: page.items,
        page: page.meta,
    }))
}

pub(super) async fn review_form(
    State(state): Ranking,
    Authenticated(_caller): Authenticated,
    PathId(book_id): PathId,
) -> Result<Json<ReviewFormContext>, AppError> {
    let book_id = BookId(book_id);
    let book = state
        .store
        .find_book(book_id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| AppError::not_found(format!("book {} not found", book_id)))?;

    Ok(Json(ReviewFormContext {
        book,
        form: ReviewForm::descriptor(),
    }))
}

pub(super) async fn create_review(
    State(state): Ranking,
    Authenticated(caller): Authenticated,
    PathId(book_id): PathId,
    FormBody(form): FormBody<ReviewForm>,
) -> Result<SeeOther, AppError> {
    let target = form.target(BookId(book_id));
    if state
        .store
        .find_book(target)
        .await
        .map_err(store_error)?
        .is_none()
    {
        return Err(AppError::not_found(format!("book {} not found", target)));
    }

    let review = form.validate(BookId(book_id))?;

    // The store re-checks the reference, so a book deleted since the lookup
    // still yields 404 and nothing is written.
    let review = state
        .store
        .insert_review(NewReview {
            book: review.book,
            title: review.title,
            text: review.text,
            rate: review.rate,
            author: caller.user,
        })
        .await
        .map_err(store_error)?;

    tracing::info!(
        review_id = %review.id,
        book_id = %review.book,
        author = %review.author,
        rate = review.rate,
        "review created"
    );
    Ok(SeeOther::to(detail_path(review.book)).with_id(review.book.0))
}
