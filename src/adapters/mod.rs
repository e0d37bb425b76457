pub mod http_handler;
pub mod middleware;
pub mod route_sources;

/// Re-export commonly used types from adapters
pub use http_handler::{HttpHandler, build_app};
pub use middleware::*;
pub use route_sources::FileRouteSource;
