#![cfg_attr(docsrs, feature(doc_cfg))]
//! bulkedit lets the clients of a web API apply several create, update and delete actions to the
//! sub-resources of an endpoint with a single request, all or nothing.
//!
//! The library API is inspired by [Axum's](https://docs.rs/axum/latest/axum/): endpoints are
//! assembled from plain functions that declare what they need from the request through
//! [extractors](`extract`).
//!
//! # Features
//!
//! - Bulk edits call the same endpoints a client would call directly. Validation, permission
//!   checks and business logic of each endpoint apply to every action.
//! - Actions are validated before anything is applied and applied in order within one transaction.
//! - Actions may only target sub-resources of the endpoint receiving the batch. The policy can be
//!   replaced.
//! - The identity of the caller is established once and shared by every action.
//! - Observable. The library uses the [tracing crate](https://crates.io/crates/tracing) for logging.
//!
//! # Endpoints
//!
//! A [View](`endpoint::View`) serves each request method with a handler function. Handlers receive
//! [extractors](`extract`) as arguments and return anything that can be turned
//! [into a response](`response::IntoResponse`). Views are assigned to routes on a
//! [Router](`routing::Router`).
//!
//! # Bulk edits
//!
//! Installing a [BulkEdit](`bulk::BulkEdit`) on a view makes it accept PATCH requests with a list
//! of actions as body. For every action the target URL is resolved to the endpoint serving it, and
//! the endpoint is called with a synthetic request carrying the action value.
//!
//! ```rust
//! use bulkedit::app::App;
//! use bulkedit::bulk::BulkEdit;
//! use bulkedit::endpoint::View;
//! use bulkedit::error::Error;
//! use bulkedit::extract::{Args, Json, Res};
//! use bulkedit::method::Method;
//! use bulkedit::request::RawRequest;
//! use bulkedit::response::status;
//! use bulkedit::routing::Router;
//! use bulkedit::store::Store;
//! use serde_json::{json, Value};
//!
//! fn create(store: Res<Store>, Json(value): Json<Value>) -> Result<u16, Error> {
//!     let id = value["id"].as_u64().unwrap_or_default();
//!     store.insert(&format!("/flobbits/{id}"), value)?;
//!     Ok(status::CREATED)
//! }
//!
//! fn delete(store: Res<Store>, Args(id): Args<u64>) -> Result<u16, Error> {
//!     if !store.remove(&format!("/flobbits/{id}"))? {
//!         return Err(Error::reject(status::NOT_FOUND, json!({"detail": "Not found."})));
//!     }
//!     Ok(status::NO_CONTENT)
//! }
//!
//! let store = Store::new(json!({ "flobbits": {} })).unwrap();
//! let router = Router::new()
//!     .endpoint("/flobbits/", View::new().post(create).bulk_edit(BulkEdit::new()))
//!     .endpoint("/flobbits/{flobbit_id}/", View::new().delete(delete));
//! let app = App::new(router)
//!     .resource(store.clone())
//!     .transactions(store.clone());
//!
//! let request = RawRequest::new(Method::Patch, "http://testserver/flobbits/")
//!     .unwrap()
//!     .with_json(&json!([
//!         { "action": "create", "value": { "id": 1 } },
//!         { "action": "delete", "url": "/flobbits/2/" },
//!     ]));
//!
//! // the delete fails, nothing is applied
//! let response = app.handle(request).unwrap();
//! assert_eq!(response.status, 404);
//! assert!(!store.contains("/flobbits/1").unwrap());
//! ```
//!
//! # Transactions
//!
//! Bulk edits run inside a transaction of the [transaction layer](`store::Atomic`) configured on
//! the [App](`app::App`). The in-memory [Store](`store::Store`) is provided as an example
//! implementation.

pub mod app;
pub mod bulk;
pub mod endpoint;
pub mod error;
pub mod extract;
pub mod method;
pub mod request;
pub mod response;
pub mod result;
pub mod routing;
pub mod store;
