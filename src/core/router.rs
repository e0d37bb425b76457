//! Route-tree driven dispatch.
//!
//! A [`Router`] owns an immutable [`RouteTree`] and the handler registration
//! bound to each of its nodes. It holds no per-request state: every call to
//! [`Router::dispatch`] builds its own handler chain and [`Exchange`], so one
//! router can be shared by any number of concurrent requests.
use std::{iter, sync::Arc};

use serde_json::Value;

use crate::core::{
    controller::{Handler, HandlerMetadata},
    error::{ApiError, ApiResult},
    exchange::{ApiRequest, Exchange},
    openapi::ApiInfo,
    registry::{ControllerRegistry, Registration},
    response::ApiResponse,
    route_tree::{RouteNode, RouteTree, RouterParams, duplicate_handler_names},
};

/// One handler instance in a dispatch chain.
struct ChainLink {
    name: String,
    handler: Box<dyn Handler>,
    own_params: RouterParams,
}

pub struct Router {
    tree: Arc<RouteTree>,
    bindings: Vec<Option<Arc<Registration>>>,
    info: ApiInfo,
}

impl Router {
    /// Bind every tree node to its registered handler type, if any.
    pub fn new(tree: impl Into<Arc<RouteTree>>, registry: &ControllerRegistry) -> Self {
        let tree = tree.into();
        let mut bindings = vec![None; tree.len()];

        for node in tree.nodes() {
            match registry.get(node.handler_name()) {
                Some(registration) => bindings[node.id()] = Some(registration.clone()),
                None => tracing::debug!(
                    node = node.name(),
                    handler = node.handler_name(),
                    "No handler registered for node"
                ),
            }
        }

        for name in duplicate_handler_names(&tree) {
            tracing::debug!(handler = name, "Handler type is bound to more than one node");
        }

        let bound: Vec<&str> = tree.nodes().iter().map(|n| n.handler_name()).collect();
        for name in registry.names() {
            if !bound.contains(&name) {
                tracing::warn!(handler = name, "Registered handler matches no route node");
            }
        }

        Self {
            tree,
            bindings,
            info: ApiInfo::default(),
        }
    }

    /// Title and version reported by the API description.
    pub fn with_info(mut self, info: ApiInfo) -> Self {
        self.info = info;
        self
    }

    pub fn tree(&self) -> &RouteTree {
        &self.tree
    }

    pub fn info(&self) -> &ApiInfo {
        &self.info
    }

    /// Registration bound to `node`.
    pub fn binding(&self, node: &RouteNode) -> Option<&Registration> {
        self.bindings
            .get(node.id())
            .and_then(|b| b.as_deref())
    }

    pub fn metadata(&self, node: &RouteNode) -> Option<&HandlerMetadata> {
        self.binding(node).map(Registration::metadata)
    }

    /// Resolve the request path, run pre-dispatch hooks root-most first and
    /// serve the terminal handler.
    ///
    /// Nodes without a registered handler are skipped. The terminal handler is
    /// the last instantiated one. A failing hook aborts the chain.
    pub fn dispatch(&self, request: ApiRequest) -> ApiResult<Value> {
        let resolution = self.tree.resolve(&request.path)?;

        let mut chain: Vec<ChainLink> = resolution
            .matched
            .into_iter()
            .filter_map(|matched| {
                self.binding(matched.node).map(|registration| ChainLink {
                    name: registration.name().to_string(),
                    handler: registration.instantiate(),
                    own_params: matched.own_params,
                })
            })
            .collect();

        let Some(mut terminal) = chain.pop() else {
            return Err(ApiError::NoHandler { path: request.path });
        };

        tracing::debug!(
            path = %request.path,
            handler = %terminal.name,
            chain = chain.len() + 1,
            "Resolved dispatch chain"
        );

        let mut exchange = Exchange::new(self, request, resolution.params);

        for link in chain.iter_mut().chain(iter::once(&mut terminal)) {
            if link.handler.has_pre_serve() {
                tracing::trace!(handler = %link.name, "Running pre-serve hook");
                exchange.set_own_params(link.own_params.clone());
                link.handler.pre_serve(&mut exchange)?;
            }
        }

        exchange.set_own_params(terminal.own_params);
        terminal.handler.serve(&mut exchange)
    }

    /// [`Router::dispatch`] wrapped by the response layer.
    pub fn handle(&self, request: ApiRequest) -> ApiResponse {
        ApiResponse::from_result(self.dispatch(request))
    }
}
