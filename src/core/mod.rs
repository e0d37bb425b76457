pub mod controller;
pub mod error;
pub mod exchange;
pub mod openapi;
pub mod registry;
pub mod response;
pub mod route_tree;
pub mod router;
pub mod schema;

pub use controller::{Controller, DispatchMethod, EndpointMeta, Endpoints, HandlerMetadata, Verb};
pub use error::{ApiError, ApiResult};
pub use exchange::{ApiRequest, Exchange};
pub use openapi::{ApiInfo, DocGenerator, DocsController, OpenApiDocument};
pub use registry::ControllerRegistry;
pub use response::ApiResponse;
pub use route_tree::{RouteNode, RouteTree, RouteTreeError, RouterParams};
pub use router::Router;
pub use schema::{FieldType, Schema, SchemaError, SchemaErrors};
