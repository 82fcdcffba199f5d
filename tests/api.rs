use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use shelf_db::MemoryStore;
use shelf_kernel::settings::Settings;
use tower::ServiceExt;

const USER_HEADER: &str = "x-shelf-user";

struct TestApp {
    router: Router,
}

struct Reply {
    status: StatusCode,
    location: Option<String>,
    body: Value,
}

impl TestApp {
    fn with_page_size(page_size: usize) -> Self {
        let mut settings = Settings::default();
        settings.pagination.page_size = page_size;

        let registry = shelf_app::build_registry(&settings, Arc::new(MemoryStore::new()));
        let router = shelf_http::build_router(&registry, &settings).unwrap();
        Self { router }
    }

    fn new() -> Self {
        Self::with_page_size(10)
    }

    async fn send(&self, method: Method, uri: &str, user: Option<&str>, body: Option<Value>) -> Reply {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            request = request.header(USER_HEADER, user);
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|value| value.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        Reply {
            status,
            location,
            body,
        }
    }

    async fn get(&self, uri: &str, user: &str) -> Reply {
        self.send(Method::GET, uri, Some(user), None).await
    }

    async fn post(&self, uri: &str, user: &str, body: Value) -> Reply {
        self.send(Method::POST, uri, Some(user), Some(body)).await
    }

    async fn create_book(&self, user: &str, title: &str) -> u64 {
        let reply = self
            .post(
                "/api/books/create",
                user,
                json!({"title": title, "text": "body", "category": "tech"}),
            )
            .await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        reply.body["id"].as_u64().unwrap()
    }

    async fn review(&self, user: &str, book: u64, rate: i64) -> Reply {
        self.post(
            &format!("/api/ranking/books/{book}/reviews"),
            user,
            json!({"title": "review", "text": "thoughts", "rate": rate}),
        )
        .await
    }
}

#[tokio::test]
async fn create_then_detail_round_trips() {
    let app = TestApp::new();
    let reply = app
        .post(
            "/api/books/create",
            "alice",
            json!({"title": "Dune", "text": "Spice must flow", "category": "fiction"}),
        )
        .await;

    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location.as_deref(), Some("/api/books"));
    let id = reply.body["id"].as_u64().unwrap();

    let detail = app.get(&format!("/api/books/{id}"), "bob").await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.body["book"]["title"], "Dune");
    assert_eq!(detail.body["book"]["text"], "Spice must flow");
    assert_eq!(detail.body["book"]["category"], "fiction");
    assert_eq!(detail.body["book"]["owner"], "alice");
    assert_eq!(detail.body["reviews"], json!([]));
    assert_eq!(detail.body["avg_rating"], Value::Null);
}

#[tokio::test]
async fn requests_without_identity_are_unauthorized() {
    let app = TestApp::new();
    for uri in ["/api/books", "/api/ranking", "/api/books/create"] {
        let reply = app.send(Method::GET, uri, None, None).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(reply.body["error"]["code"], "unauthorized");
    }

    let reply = app
        .send(
            Method::POST,
            "/api/books/create",
            None,
            Some(json!({"title": "t", "text": "b", "category": "c"})),
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn detail_of_missing_book_is_not_found() {
    let app = TestApp::new();
    let reply = app.get("/api/books/404", "alice").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["error"]["code"], "not_found");
}

#[tokio::test]
async fn detail_lists_only_the_books_own_reviews() {
    let app = TestApp::new();
    let a = app.create_book("alice", "A").await;
    let b = app.create_book("alice", "B").await;
    app.review("bob", a, 2).await;
    app.review("carol", b, 5).await;
    app.review("dave", a, 4).await;

    let detail = app.get(&format!("/api/books/{a}"), "bob").await;
    let reviews = detail.body["reviews"].as_array().unwrap();
    assert_eq!(reviews.len(), 2);
    assert!(reviews.iter().all(|review| review["book"] == json!(a)));
    assert_eq!(detail.body["avg_rating"], json!(3.0));
}

#[tokio::test]
async fn non_owner_cannot_update_or_delete() {
    let app = TestApp::new();
    let id = app.create_book("alice", "Original").await;

    let update = app
        .post(
            &format!("/api/books/{id}/update"),
            "mallory",
            json!({"title": "Hijacked", "text": "x", "category": "y"}),
        )
        .await;
    assert_eq!(update.status, StatusCode::FORBIDDEN);
    assert_eq!(update.body["error"]["code"], "forbidden");

    let delete = app
        .post(&format!("/api/books/{id}/delete"), "mallory", json!({}))
        .await;
    assert_eq!(delete.status, StatusCode::FORBIDDEN);

    assert_eq!(
        app.get(&format!("/api/books/{id}/update"), "mallory").await.status,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.get(&format!("/api/books/{id}/delete"), "mallory").await.status,
        StatusCode::FORBIDDEN
    );

    let detail = app.get(&format!("/api/books/{id}"), "alice").await;
    assert_eq!(detail.body["book"]["title"], "Original");
}

#[tokio::test]
async fn owner_update_is_persisted() {
    let app = TestApp::new();
    let id = app.create_book("alice", "Draft").await;

    let form = app.get(&format!("/api/books/{id}/update"), "alice").await;
    assert_eq!(form.status, StatusCode::OK);
    assert_eq!(form.body["book"]["title"], "Draft");

    let reply = app
        .post(
            &format!("/api/books/{id}/update"),
            "alice",
            json!({"title": "Final", "text": "done", "category": "essay"}),
        )
        .await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location, Some(format!("/api/books/{id}")));

    let detail = app.get(&format!("/api/books/{id}"), "bob").await;
    assert_eq!(detail.body["book"]["title"], "Final");
    assert_eq!(detail.body["book"]["owner"], "alice");
}

#[tokio::test]
async fn update_checks_existence_then_ownership_then_fields() {
    let app = TestApp::new();
    let id = app.create_book("alice", "Draft").await;
    let blank = json!({"title": "", "text": "", "category": ""});

    let missing = app.post("/api/books/999/update", "alice", blank.clone()).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let foreign = app
        .post(&format!("/api/books/{id}/update"), "bob", blank.clone())
        .await;
    assert_eq!(foreign.status, StatusCode::FORBIDDEN);

    let invalid = app.post(&format!("/api/books/{id}/update"), "alice", blank).await;
    assert_eq!(invalid.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(invalid.body["error"]["details"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn owner_delete_cascades_to_reviews() {
    let app = TestApp::new();
    let id = app.create_book("alice", "Doomed").await;
    app.review("bob", id, 3).await;

    let confirm = app.get(&format!("/api/books/{id}/delete"), "alice").await;
    assert_eq!(confirm.status, StatusCode::OK);

    let reply = app
        .post(&format!("/api/books/{id}/delete"), "alice", json!({}))
        .await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location.as_deref(), Some("/api/books"));

    assert_eq!(
        app.get(&format!("/api/books/{id}"), "alice").await.status,
        StatusCode::NOT_FOUND
    );
    let index = app.get("/api/ranking", "alice").await;
    assert_eq!(index.body["ranking"], json!([]));
    assert_eq!(index.body["page"]["count"], 0);
}

#[tokio::test]
async fn invalid_book_form_is_rejected() {
    let app = TestApp::new();
    let reply = app
        .post(
            "/api/books/create",
            "alice",
            json!({"title": "   ", "text": "body", "category": "tech"}),
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        reply.body["error"]["details"],
        json!([{"field": "title", "error": "required"}])
    );

    let list = app.get("/api/books", "alice").await;
    assert_eq!(list.body["count"], 0);
}

#[tokio::test]
async fn review_redirects_to_book_detail() {
    let app = TestApp::new();
    let id = app.create_book("alice", "Reviewed").await;

    let form = app
        .get(&format!("/api/ranking/books/{id}/reviews"), "bob")
        .await;
    assert_eq!(form.status, StatusCode::OK);
    assert_eq!(form.body["book"]["id"], json!(id));

    let reply = app.review("bob", id, 5).await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location, Some(format!("/api/books/{id}")));

    let detail = app.get(&format!("/api/books/{id}"), "bob").await;
    assert_eq!(detail.body["reviews"][0]["author"], "bob");
    assert_eq!(detail.body["reviews"][0]["rate"], 5);
}

#[tokio::test]
async fn review_of_missing_book_is_not_found_and_not_stored() {
    let app = TestApp::new();
    let id = app.create_book("alice", "Only").await;

    let reply = app.review("bob", 999, 4).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(
        app.get("/api/ranking/books/999/reviews", "bob").await.status,
        StatusCode::NOT_FOUND
    );

    let index = app.get("/api/ranking", "bob").await;
    assert_eq!(index.body["ranking"][0]["id"], json!(id));
    assert_eq!(index.body["ranking"][0]["review_count"], 0);
}

#[tokio::test]
async fn review_rate_out_of_scale_is_rejected() {
    let app = TestApp::new();
    let id = app.create_book("alice", "Rated").await;
    let reply = app.review("bob", id, 9).await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(reply.body["error"]["details"][0]["field"], "rate");
}

#[tokio::test]
async fn duplicate_reviews_by_one_user_are_kept() {
    let app = TestApp::new();
    let id = app.create_book("alice", "Popular").await;
    app.review("bob", id, 1).await;
    app.review("bob", id, 5).await;

    let detail = app.get(&format!("/api/books/{id}"), "bob").await;
    assert_eq!(detail.body["reviews"].as_array().unwrap().len(), 2);
    assert_eq!(detail.body["avg_rating"], json!(3.0));
}

#[tokio::test]
async fn index_ranks_by_mean_with_unreviewed_last() {
    let app = TestApp::new();
    let a = app.create_book("alice", "A").await;
    let c = app.create_book("alice", "C").await;
    let d = app.create_book("alice", "D").await;
    app.review("bob", a, 2).await;
    app.review("bob", a, 4).await;
    app.review("bob", c, 5).await;

    let index = app.get("/api/ranking", "bob").await;
    assert_eq!(index.status, StatusCode::OK);

    let ranked: Vec<u64> = index.body["ranking"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ranked, vec![c, a, d]);
    assert_eq!(index.body["ranking"][0]["avg_rating"], json!(5.0));
    assert_eq!(index.body["ranking"][1]["avg_rating"], json!(3.0));
    assert_eq!(index.body["ranking"][2]["avg_rating"], Value::Null);

    let plain: Vec<u64> = index.body["object_list"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["id"].as_u64().unwrap())
        .collect();
    assert_eq!(plain, vec![d, c, a]);
}

#[tokio::test]
async fn list_pages_are_exhaustive_and_strict() {
    let app = TestApp::with_page_size(2);
    let mut created = Vec::new();
    for title in ["one", "two", "three", "four", "five"] {
        created.push(app.create_book("alice", title).await);
    }
    created.reverse();

    let mut seen = Vec::new();
    for page in 1..=3 {
        let reply = app.get(&format!("/api/books?page={page}"), "alice").await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["number"], page);
        assert_eq!(reply.body["num_pages"], 3);
        seen.extend(
            reply.body["items"]
                .as_array()
                .unwrap()
                .iter()
                .map(|book| book["id"].as_u64().unwrap()),
        );
    }
    assert_eq!(seen, created);

    let past = app.get("/api/books?page=4", "alice").await;
    assert_eq!(past.status, StatusCode::NOT_FOUND);
    assert_eq!(past.body["error"]["code"], "page_out_of_range");

    let last = app.get("/api/books?page=last", "alice").await;
    assert_eq!(last.body["number"], 3);
    assert_eq!(last.body["has_next"], false);
}

#[tokio::test]
async fn index_page_defaults_to_first_and_rejects_overflow() {
    let app = TestApp::with_page_size(2);
    for title in ["one", "two", "three"] {
        app.create_book("alice", title).await;
    }

    for uri in ["/api/ranking", "/api/ranking?page=oops"] {
        let reply = app.get(uri, "alice").await;
        assert_eq!(reply.status, StatusCode::OK, "{uri}");
        assert_eq!(reply.body["page"]["number"], 1);
        assert_eq!(reply.body["ranking"].as_array().unwrap().len(), 2);
        assert_eq!(reply.body["object_list"].as_array().unwrap().len(), 3);
    }

    let second = app.get("/api/ranking?page=2", "alice").await;
    assert_eq!(second.body["ranking"].as_array().unwrap().len(), 1);
    assert_eq!(second.body["page"]["has_previous"], true);

    let overflow = app.get("/api/ranking?page=3", "alice").await;
    assert_eq!(overflow.status, StatusCode::NOT_FOUND);
    assert_eq!(overflow.body["error"]["code"], "page_out_of_range");
}

#[tokio::test]
async fn page_numbers_wider_than_i64_are_out_of_range() {
    let app = TestApp::new();
    app.create_book("alice", "Only").await;

    for uri in [
        "/api/ranking?page=99999999999999999999",
        "/api/ranking?page=-99999999999999999999",
        "/api/books?page=99999999999999999999",
    ] {
        let reply = app.get(uri, "alice").await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(reply.body["error"]["code"], "page_out_of_range", "{uri}");
    }
}

#[tokio::test]
async fn non_numeric_ids_are_not_found() {
    let app = TestApp::new();
    app.create_book("alice", "Numbered").await;

    for uri in [
        "/api/books/abc",
        "/api/books/-1/update",
        "/api/books/1.5/delete",
        "/api/ranking/books/abc/reviews",
    ] {
        let reply = app.get(uri, "alice").await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(reply.body["error"]["code"], "not_found", "{uri}");
    }

    let reply = app
        .post(
            "/api/books/abc/update",
            "alice",
            json!({"title": "t", "text": "b", "category": "c"}),
        )
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["error"]["code"], "not_found");
}

#[tokio::test]
async fn undecodable_form_is_a_validation_error() {
    let app = TestApp::new();
    let id = app.create_book("alice", "Typed").await;
    let reply = app
        .post(
            &format!("/api/ranking/books/{id}/reviews"),
            "bob",
            json!({"title": "t", "text": "b", "rate": "five"}),
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(reply.body["error"]["details"][0]["field"], "body");
}

#[tokio::test]
async fn openapi_document_lists_module_routes() {
    let app = TestApp::new();
    let reply = app
        .send(Method::GET, "/docs/openapi.json", None, None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body["paths"]["/api/books/{id}/update"]["post"].is_object());
    assert!(reply.body["paths"]["/api/ranking"]["get"].is_object());
}
