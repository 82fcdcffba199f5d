//! Review creation and the rating ranking.

pub mod aggregate;
mod handlers;
pub mod models;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{routing::get, Router};
use shelf_db::SharedStore;
use shelf_kernel::{settings::PaginationSettings, InitCtx, Migration, Module};

pub const MODULE_NAME: &str = "ranking";

pub struct RankingState {
    pub store: SharedStore,
    pub page_size: usize,
}

pub struct RankingModule {
    state: Arc<RankingState>,
}

impl RankingModule {
    pub fn new(store: SharedStore, pagination: &PaginationSettings) -> Self {
        Self {
            state: Arc::new(RankingState {
                store,
                page_size: pagination.page_size,
            }),
        }
    }
}

#[async_trait]
impl Module for RankingModule {
    fn name(&self) -> &'static str {
        MODULE_NAME
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            page_size = self.state.page_size,
            "ranking module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(handlers::index))
            .route("/health", get(handlers::health_check))
            .route(
                "/books/{book_id}/reviews",
                get(handlers::review_form).post(handlers::create_review),
            )
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            serde_json::json!({
                "description": description,
                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } } }
            })
        };
        let book_id = serde_json::json!({
            "name": "book_id", "in": "path", "required": true,
            "schema": { "type": "integer", "format": "int64" }
        });

        Some(serde_json::json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "Books newest first plus one page ranked by mean review rate",
                        "tags": ["Ranking"],
                        "parameters": [{
                            "name": "page", "in": "query", "required": false,
                            "schema": { "type": "string" }
                        }],
                        "responses": {
                            "200": {
                                "description": "Index view",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/IndexView" } } }
                            },
                            "401": error("No caller identity"),
                            "404": error("Page out of range")
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Ranking health check",
                        "tags": ["Ranking"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": { "text/plain": { "schema": { "type": "string" } } }
                            }
                        }
                    }
                },
                "/books/{book_id}/reviews": {
                    "get": {
                        "summary": "Review form for a book",
                        "tags": ["Ranking"],
                        "parameters": [book_id.clone()],
                        "responses": {
                            "200": { "description": "Book and form descriptor" },
                            "401": error("No caller identity"),
                            "404": error("Book not found")
                        }
                    },
                    "post": {
                        "summary": "Review a book as the caller",
                        "tags": ["Ranking"],
                        "parameters": [book_id],
                        "requestBody": {
                            "required": true,
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ReviewForm" } } }
                        },
                        "responses": {
                            "303": {
                                "description": "Redirect to the book detail",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Redirect" } } }
                            },
                            "401": error("No caller identity"),
                            "404": error("Book not found"),
                            "422": error("Invalid form")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Review": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer", "format": "int64" },
                            "book": { "type": "integer", "format": "int64" },
                            "title": { "type": "string", "maxLength": shelf_db::TITLE_MAX_CHARS },
                            "text": { "type": "string" },
                            "rate": { "type": "integer", "minimum": 1, "maximum": 5 },
                            "author": { "type": "string" }
                        },
                        "required": ["id", "book", "title", "text", "rate", "author"]
                    },
                    "ReviewForm": {
                        "type": "object",
                        "properties": {
                            "book": { "type": "integer", "format": "int64", "description": "Overrides the path book" },
                            "title": { "type": "string" },
                            "text": { "type": "string" },
                            "rate": { "type": "integer", "minimum": 1, "maximum": 5 }
                        },
                        "required": ["title", "text", "rate"]
                    },
                    "IndexView": {
                        "type": "object",
                        "properties": {
                            "object_list": { "type": "array", "items": { "$ref": "#/components/schemas/Book" } },
                            "ranking": {
                                "type": "array",
                                "items": {
                                    "allOf": [
                                        { "$ref": "#/components/schemas/Book" },
                                        {
                                            "type": "object",
                                            "properties": {
                                                "avg_rating": { "type": ["number", "null"] },
                                                "review_count": { "type": "integer" }
                                            }
                                        }
                                    ]
                                }
                            },
                            "page": { "type": "object" }
                        }
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE review (
                    id     INTEGER PRIMARY KEY AUTOINCREMENT,
                    book   INTEGER      NOT NULL REFERENCES book (id) ON DELETE CASCADE,
                    title  VARCHAR(100) NOT NULL CHECK (title <> ''),
                    text   TEXT         NOT NULL CHECK (text <> ''),
                    rate   SMALLINT     NOT NULL CHECK (rate BETWEEN 1 AND 5),
                    author TEXT         NOT NULL
                );
                CREATE INDEX review_book_idx ON review (book);
                "#,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "ranking module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "ranking module stopped");
        Ok(())
    }
}

/// Create the ranking module over `store`
pub fn create_module(store: SharedStore, pagination: &PaginationSettings) -> Arc<dyn Module> {
    Arc::new(RankingModule::new(store, pagination))
}
