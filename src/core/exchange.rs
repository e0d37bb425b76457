//! Per-request state shared by every handler in a dispatch chain.
use http::{Extensions, Method};
use serde_json::{Map, Value};

use crate::core::{
    controller::{DispatchMethod, Verb},
    error::{ApiError, ApiResult},
    route_tree::RouterParams,
    router::Router,
};

/// Transport-independent request as seen by the router.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Request target; a query string, if any, is ignored by routing.
    pub path: String,
    pub body: Vec<u8>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_json(self, value: &Value) -> Self {
        self.with_body(value.to_string())
    }
}

/// Request-scoped context handed to hooks and verb operations.
///
/// The body is parsed lazily on first access and cached for the rest of the
/// request; when the endpoint declares a schema the cache holds the filtered
/// body by the time the operation runs.
pub struct Exchange<'r> {
    router: &'r Router,
    method: Method,
    path: String,
    raw_body: Vec<u8>,
    body: Option<Map<String, Value>>,
    params: RouterParams,
    own_params: RouterParams,
    extensions: Extensions,
}

impl<'r> Exchange<'r> {
    pub(crate) fn new(router: &'r Router, request: ApiRequest, params: RouterParams) -> Self {
        Self {
            router,
            method: request.method,
            path: request.path,
            raw_body: request.body,
            body: None,
            params,
            own_params: RouterParams::new(),
            extensions: Extensions::new(),
        }
    }

    /// Router serving this request, e.g. to describe the API it exposes.
    pub fn router(&self) -> &'r Router {
        self.router
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The decoded JSON object body; an empty body is an empty object.
    pub fn body(&mut self) -> ApiResult<&Map<String, Value>> {
        if self.body.is_none() {
            self.body = Some(parse_body(&self.raw_body)?);
        }
        Ok(self.body.get_or_insert_with(Map::new))
    }

    /// One body field, or `default` when absent.
    pub fn body_field(&mut self, name: &str, default: Value) -> ApiResult<Value> {
        Ok(self.body()?.get(name).cloned().unwrap_or(default))
    }

    pub(crate) fn replace_body(&mut self, body: Map<String, Value>) {
        self.body = Some(body);
    }

    /// Parameters bound while the current handler's node was the active node.
    pub fn own_router_params(&self) -> &RouterParams {
        &self.own_params
    }

    /// Every parameter bound along the path.
    pub fn router_params(&self) -> &RouterParams {
        &self.params
    }

    /// A bound path parameter, or `default` when the path did not bind it.
    pub fn router_param<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.params.get(name).map(String::as_str).unwrap_or(default)
    }

    /// Typed values hooks hand to later handlers in the chain.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    pub(crate) fn set_own_params(&mut self, own: RouterParams) {
        self.own_params = own;
    }

    /// The verb, suffixed with `_PARAMS` iff the current handler owns at least
    /// one bound parameter.
    pub fn dispatch_method(&self) -> ApiResult<DispatchMethod> {
        let verb = Verb::from_method(&self.method).ok_or_else(|| ApiError::NotImplemented {
            method: self.method.to_string(),
        })?;
        Ok(DispatchMethod {
            verb,
            with_params: !self.own_params.is_empty(),
        })
    }
}

fn parse_body(raw: &[u8]) -> ApiResult<Map<String, Value>> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    match serde_json::from_slice::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::MalformedBody(
            "request body must be a JSON object".to_string(),
        )),
        Err(e) => Err(ApiError::MalformedBody(e.to_string())),
    }
}
