//! Caller identity and ownership guards.
//!
//! Credentials are verified upstream; this crate only reads the identity the
//! authenticator forwards in a trusted header, and answers "may this caller
//! mutate that record".

use std::fmt;

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque user reference as forwarded by the authenticator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The verified caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user: UserId,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthzError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("user '{actor}' does not own {resource}")]
    Forbidden { actor: UserId, resource: String },
}

/// Read the caller from `header`. Missing, non-UTF-8, or blank values mean
/// the request is unauthenticated.
pub fn resolve_identity(headers: &HeaderMap, header: &str) -> Result<Identity, AuthzError> {
    let value = headers
        .get(header)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(AuthzError::Unauthenticated)?;

    Ok(Identity {
        user: UserId::new(value),
    })
}

/// Allow the mutation only when `identity` is the recorded owner.
pub fn authorize_owner(
    identity: &Identity,
    owner: &UserId,
    resource: impl fmt::Display,
) -> Result<(), AuthzError> {
    if &identity.user == owner {
        return Ok(());
    }

    tracing::warn!(
        actor = %identity.user,
        owner = %owner,
        %resource,
        "ownership check denied"
    );
    Err(AuthzError::Forbidden {
        actor: identity.user.clone(),
        resource: resource.to_string(),
    })
}
