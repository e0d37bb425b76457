//! A small "houses" API built on the route tree.
//!
//! Used by the binary when no other controllers are linked in, and by the
//! integration tests as a realistic fixture.
pub mod floors;
pub mod houses;

use crate::core::{
    openapi::{ApiInfo, DocsController},
    registry::ControllerRegistry,
    route_tree::{NAMESPACE_SEPARATOR, RouteTree, RouteTreeError},
    router::Router,
};

pub use floors::Floors;
pub use houses::{HouseId, Houses};

/// Structure document matching the demo controllers.
pub const STRUCTURE: &str = include_str!("../../config/structure.xml");

/// Register the demo controllers under `namespace`.
pub fn registry(namespace: &str) -> ControllerRegistry {
    let name = |parts: &[&str]| {
        std::iter::once(namespace)
            .chain(parts.iter().copied())
            .collect::<Vec<_>>()
            .join(NAMESPACE_SEPARATOR)
    };

    ControllerRegistry::new()
        .with::<Houses>(name(&["Houses"]))
        .with::<Floors>(name(&["Houses", "Floors"]))
        .with::<DocsController>(name(&["Openapi"]))
}

/// Router over the bundled structure document.
pub fn router(namespace: &str, info: ApiInfo) -> Result<Router, RouteTreeError> {
    let tree = RouteTree::parse(STRUCTURE, namespace)?;
    Ok(Router::new(tree, &registry(namespace)).with_info(info))
}
