//! Request extractors and response helpers shared by module handlers.

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use shelf_authz::{AuthzError, Identity};

use crate::error::AppError;

/// The caller of a request that passed the identity middleware.
///
/// Handlers take this instead of re-reading headers; extraction fails with
/// `401` when the middleware found no identity.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Identity);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(Authenticated)
            .ok_or_else(|| AuthzError::Unauthenticated.into())
    }
}

/// JSON form body whose decoding failures surface as validation errors.
#[derive(Debug, Clone)]
pub struct FormBody<T>(pub T);

impl<T, S> FromRequest<S> for FormBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(AppError::validation(
                vec![json!({"field": "body", "error": rejection.body_text()})],
                "form body could not be decoded",
            )),
        }
    }
}

/// Numeric record id taken from the route's single path parameter.
///
/// A segment that is not an unsigned integer cannot name any record, so it is
/// rejected as `404` rather than as a malformed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathId(pub u64);

impl<S> FromRequestParts<S> for PathId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                AppError::Internal(anyhow::anyhow!(
                    "path id extraction failed: {}",
                    rejection.body_text()
                ))
            })?;

        raw.parse::<u64>()
            .map(PathId)
            .map_err(|_| AppError::not_found(format!("no record with id '{}'", raw)))
    }
}

/// `303 See Other` pointing the client at the next view, with a JSON body
/// naming the same target.
#[derive(Debug, Clone)]
pub struct SeeOther {
    pub location: String,
    pub id: Option<u64>,
}

impl SeeOther {
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }
}

impl IntoResponse for SeeOther {
    fn into_response(self) -> Response {
        let body = json!({ "location": self.location, "id": self.id });
        (
            StatusCode::SEE_OTHER,
            [(header::LOCATION, self.location)],
            Json(body),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get, Router};
    use serde::Deserialize;
    use shelf_authz::UserId;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize)]
    struct RatingForm {
        #[allow(dead_code)]
        rate: u8,
    }

    #[tokio::test]
    async fn authenticated_reads_identity_extension() {
        let mut request = Request::new(Body::empty());
        request.extensions_mut().insert(Identity {
            user: UserId::new("alice"),
        });
        let (mut parts, _) = request.into_parts();

        let Authenticated(identity) = Authenticated::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(identity.user, UserId::new("alice"));
    }

    #[tokio::test]
    async fn missing_identity_is_unauthorized() {
        let (mut parts, _) = Request::new(Body::empty()).into_parts();
        let err = Authenticated::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn undecodable_body_is_a_validation_error() {
        let request = axum::http::Request::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"rate": "five"}"#))
            .unwrap();

        let err = FormBody::<RatingForm>::from_request(request, &()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    async fn fetch_id(uri: &str) -> (StatusCode, serde_json::Value) {
        let router = Router::new().route(
            "/records/{id}",
            get(|PathId(id): PathId| async move { id.to_string() }),
        );
        let response = router
            .oneshot(axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(&bytes).into()));
        (status, body)
    }

    #[tokio::test]
    async fn numeric_path_id_is_extracted() {
        let (status, body) = fetch_id("/records/42").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::Value::from(42));
    }

    #[tokio::test]
    async fn non_numeric_path_id_is_not_found() {
        for uri in ["/records/abc", "/records/-1", "/records/99999999999999999999"] {
            let (status, body) = fetch_id(uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body["error"]["code"], "not_found", "{uri}");
        }
    }

    #[test]
    fn see_other_sets_location() {
        let response = SeeOther::to("/api/books/7").with_id(7).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/api/books/7");
    }
}
