//! Arbor - JSON HTTP APIs driven by a declarative route tree.
//!
//! An XML structure document describes the URL space as a tree: element names
//! are path segments, `params` lists the path parameters a node owns and
//! `child-ns` scopes the handler type names of its descendants. Every node maps
//! to a handler type by name; requests walk the tree, run each matched
//! handler's pre-dispatch hook and are served by the last one.
//!
//! # Features
//! - Literal-first path resolution with per-node parameter binding
//! - Verb dispatch with `_PARAMS` variants when a handler owns bound parameters
//! - Declarative body schemas: required/optional typed fields, validation and filtering
//! - OpenAPI 3 description generated from the same tree and handler metadata
//! - Axum adapter with request ids, CORS, compression and body limits
//! - Route tree hot-reload, metrics and structured tracing via `tracing`
//!
//! # Quick Example
//! ```no_run
//! use arbor::{ApiInfo, ApiRequest, ControllerRegistry, RouteTree, Router};
//! use http::Method;
//!
//! # fn main() -> eyre::Result<()> {
//! let tree = RouteTree::parse(arbor::demo::STRUCTURE, "Controllers")?;
//! let registry: ControllerRegistry = arbor::demo::registry("Controllers");
//! let router = Router::new(tree, &registry).with_info(ApiInfo::default());
//!
//! let response = router.handle(ApiRequest::new(Method::GET, "/api/houses"));
//! assert_eq!(response.body, "List Houses");
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! `core` holds the I/O-free domain (tree, router, dispatch contract, schema,
//! documentation). `ports` declares the traits the outside world implements and
//! `adapters` provides the axum and file-system implementations.
//!
//! # Error Handling
//! Request-path failures are [`ApiError`] values mapped to HTTP responses in
//! exactly one place, [`ApiResponse::from_result`]. Startup and wiring code
//! returns `eyre::Result<T>` with context attached through `WrapErr`.
pub mod config;
pub mod demo;
pub mod metrics;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate and embedders
pub use crate::{
    adapters::{FileRouteSource, HttpHandler, build_app},
    core::{
        ApiError, ApiInfo, ApiRequest, ApiResponse, ApiResult, Controller, ControllerRegistry,
        DocGenerator, Endpoints, Exchange, RouteTree, Router,
    },
    ports::RouteSource,
    utils::GracefulShutdown,
};
