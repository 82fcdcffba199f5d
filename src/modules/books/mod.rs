//! Catalog manager: create, read, update, and delete books. Only a book's
//! creator may change or remove it.

mod handlers;
pub mod models;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{routing::get, Router};
use shelf_db::{BookId, SharedStore};
use shelf_http::router::module_path;
use shelf_kernel::{settings::PaginationSettings, InitCtx, Migration, Module};

pub const MODULE_NAME: &str = "books";

/// Shared state behind every catalog handler
pub struct CatalogState {
    pub store: SharedStore,
    pub page_size: usize,
}

pub struct BooksModule {
    state: Arc<CatalogState>,
}

impl BooksModule {
    pub fn new(store: SharedStore, pagination: &PaginationSettings) -> Self {
        Self {
            state: Arc::new(CatalogState {
                store,
                page_size: pagination.page_size,
            }),
        }
    }
}

/// Where the list view lives
pub fn list_path() -> String {
    module_path(MODULE_NAME, "/")
}

/// Where a book's detail view lives
pub fn detail_path(id: BookId) -> String {
    module_path(MODULE_NAME, &format!("/{}", id))
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        MODULE_NAME
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            page_size = self.state.page_size,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(handlers::list_books))
            .route("/health", get(handlers::health_check))
            .route(
                "/create",
                get(handlers::create_form).post(handlers::create_book),
            )
            .route("/{id}", get(handlers::book_detail))
            .route(
                "/{id}/update",
                get(handlers::update_form).post(handlers::update_book),
            )
            .route(
                "/{id}/delete",
                get(handlers::delete_confirm).post(handlers::delete_book),
            )
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let book_id = serde_json::json!({
            "name": "id", "in": "path", "required": true,
            "schema": { "type": "integer", "format": "int64" }
        });
        let error = |description: &str| {
            serde_json::json!({
                "description": description,
                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } } }
            })
        };
        let redirect = serde_json::json!({
            "description": "Redirect to the next view",
            "headers": { "Location": { "schema": { "type": "string" } } },
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Redirect" } } }
        });
        let form_body = serde_json::json!({
            "required": true,
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/BookForm" } } }
        });

        Some(serde_json::json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books, newest first",
                        "tags": ["Books"],
                        "parameters": [{
                            "name": "page", "in": "query", "required": false,
                            "schema": { "type": "string" }
                        }],
                        "responses": {
                            "200": {
                                "description": "One page of books",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/BookPage" } } }
                            },
                            "401": error("No caller identity"),
                            "404": error("Page out of range")
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Books health check",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": { "text/plain": { "schema": { "type": "string" } } }
                            }
                        }
                    }
                },
                "/create": {
                    "get": {
                        "summary": "Empty book form",
                        "tags": ["Books"],
                        "responses": { "200": { "description": "Form descriptor" }, "401": error("No caller identity") }
                    },
                    "post": {
                        "summary": "Create a book owned by the caller",
                        "tags": ["Books"],
                        "requestBody": form_body.clone(),
                        "responses": {
                            "303": redirect.clone(),
                            "401": error("No caller identity"),
                            "422": error("Invalid form")
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Book with its reviews and mean rating",
                        "tags": ["Books"],
                        "parameters": [book_id.clone()],
                        "responses": {
                            "200": {
                                "description": "Book detail",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/BookDetail" } } }
                            },
                            "401": error("No caller identity"),
                            "404": error("Book not found")
                        }
                    }
                },
                "/{id}/update": {
                    "get": {
                        "summary": "Current values for the owner's edit form",
                        "tags": ["Books"],
                        "parameters": [book_id.clone()],
                        "responses": {
                            "200": { "description": "Book and form descriptor" },
                            "401": error("No caller identity"),
                            "403": error("Caller does not own the book"),
                            "404": error("Book not found")
                        }
                    },
                    "post": {
                        "summary": "Replace title, text, and category",
                        "tags": ["Books"],
                        "parameters": [book_id.clone()],
                        "requestBody": form_body,
                        "responses": {
                            "303": redirect.clone(),
                            "401": error("No caller identity"),
                            "403": error("Caller does not own the book"),
                            "404": error("Book not found"),
                            "422": error("Invalid form")
                        }
                    }
                },
                "/{id}/delete": {
                    "get": {
                        "summary": "Delete confirmation context",
                        "tags": ["Books"],
                        "parameters": [book_id.clone()],
                        "responses": {
                            "200": { "description": "Book to be deleted" },
                            "401": error("No caller identity"),
                            "403": error("Caller does not own the book"),
                            "404": error("Book not found")
                        }
                    },
                    "post": {
                        "summary": "Delete the book and its reviews",
                        "tags": ["Books"],
                        "parameters": [book_id],
                        "responses": {
                            "303": redirect,
                            "401": error("No caller identity"),
                            "403": error("Caller does not own the book"),
                            "404": error("Book not found")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer", "format": "int64" },
                            "title": { "type": "string", "maxLength": shelf_db::TITLE_MAX_CHARS },
                            "text": { "type": "string" },
                            "category": { "type": "string", "maxLength": shelf_db::CATEGORY_MAX_CHARS },
                            "owner": { "type": "string", "description": "Creating user" }
                        },
                        "required": ["id", "title", "text", "category", "owner"]
                    },
                    "BookForm": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "text": { "type": "string" },
                            "category": { "type": "string" }
                        },
                        "required": ["title", "text", "category"]
                    },
                    "BookPage": {
                        "type": "object",
                        "properties": {
                            "items": { "type": "array", "items": { "$ref": "#/components/schemas/Book" } },
                            "number": { "type": "integer" },
                            "num_pages": { "type": "integer" },
                            "count": { "type": "integer" },
                            "has_previous": { "type": "boolean" },
                            "has_next": { "type": "boolean" }
                        }
                    },
                    "BookDetail": {
                        "type": "object",
                        "properties": {
                            "book": { "$ref": "#/components/schemas/Book" },
                            "reviews": { "type": "array", "items": { "$ref": "#/components/schemas/Review" } },
                            "avg_rating": { "type": ["number", "null"] }
                        }
                    },
                    "Redirect": {
                        "type": "object",
                        "properties": {
                            "location": { "type": "string" },
                            "id": { "type": ["integer", "null"] }
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
                CREATE TABLE book (
                    id       INTEGER PRIMARY KEY AUTOINCREMENT,
                    title    VARCHAR(100) NOT NULL CHECK (title <> ''),
                    text     TEXT         NOT NULL CHECK (text <> ''),
                    category VARCHAR(100) NOT NULL CHECK (category <> ''),
                    owner    TEXT         NOT NULL
                );
                CREATE INDEX book_owner_idx ON book (owner);
                "#,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create the catalog module over `store`
pub fn create_module(store: SharedStore, pagination: &PaginationSettings) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(store, pagination))
}
