use std::fmt;

use serde::{Deserialize, Serialize};
use shelf_authz::UserId;

/// System-assigned book identifier. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(pub u64);

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// System-assigned review identifier. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(pub u64);

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lowest and highest accepted review rate.
pub const RATE_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// Longest book or review title, in characters.
pub const TITLE_MAX_CHARS: usize = 100;

/// Longest book category, in characters.
pub const CATEGORY_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub text: String,
    pub category: String,
    /// Creating user; fixed at insert
    pub owner: UserId,
}

#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub text: String,
    pub category: String,
    pub owner: UserId,
}

/// Editable book fields. The owner is deliberately absent.
#[derive(Debug, Clone)]
pub struct BookChanges {
    pub title: String,
    pub text: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub book: BookId,
    pub title: String,
    pub text: String,
    pub rate: u8,
    pub author: UserId,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub book: BookId,
    pub title: String,
    pub text: String,
    pub rate: u8,
    pub author: UserId,
}
