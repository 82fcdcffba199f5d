//! Rating aggregation. Pure functions over already loaded records, so the
//! ordering rules can be tested without a store.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;
use shelf_db::{Book, BookId, Review};

/// Arithmetic mean of the reviews' rates; `None` for no reviews.
pub fn mean_rating<'a>(reviews: impl IntoIterator<Item = &'a Review>) -> Option<f64> {
    let (sum, count) = reviews
        .into_iter()
        .fold((0u64, 0u64), |(sum, count), review| {
            (sum + u64::from(review.rate), count + 1)
        });

    (count > 0).then(|| sum as f64 / count as f64)
}

/// A book annotated with its derived rating.
#[derive(Debug, Clone, Serialize)]
pub struct RankedBook {
    #[serde(flatten)]
    pub book: Book,
    pub avg_rating: Option<f64>,
    pub review_count: usize,
}

/// Ranking order: higher mean first, unreviewed books last, equal means by
/// ascending id.
pub fn ranking_order(a: &RankedBook, b: &RankedBook) -> Ordering {
    let by_rating = match (a.avg_rating, b.avg_rating) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_rating.then_with(|| a.book.id.cmp(&b.book.id))
}

/// Annotate every book with the mean of its reviews and sort into ranking
/// order. Reviews of books not in `books` are ignored.
pub fn rank_books(books: Vec<Book>, reviews: &[Review]) -> Vec<RankedBook> {
    let mut by_book: HashMap<BookId, Vec<&Review>> = HashMap::new();
    for review in reviews {
        by_book.entry(review.book).or_default().push(review);
    }

    let mut ranked: Vec<RankedBook> = books
        .into_iter()
        .map(|book| {
            let own = by_book.get(&book.id).map(Vec::as_slice).unwrap_or_default();
            RankedBook {
                avg_rating: mean_rating(own.iter().copied()),
                review_count: own.len(),
                book,
            }
        })
        .collect();

    ranked.sort_by(ranking_order);
    ranked
}
