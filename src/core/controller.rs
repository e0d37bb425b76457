//! The dispatch contract every handler type implements.
//!
//! A controller declares, once per type, an [`Endpoints`] table: the operation
//! bound to each [`DispatchMethod`], the metadata describing it, and an optional
//! pre-dispatch hook. The router drives controllers only through the
//! object-safe [`Handler`] trait, so presence of a verb or a hook is a table
//! lookup rather than a runtime probe.
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    str::FromStr,
    sync::Arc,
};

use serde_json::Value;

use crate::core::{
    error::{ApiError, ApiResult},
    exchange::Exchange,
    schema::Schema,
};

/// Suffix marking the dispatch method used when a handler owns bound path params.
pub const PARAMS_SUFFIX: &str = "_PARAMS";

/// HTTP verbs a controller can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verb {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl Verb {
    pub const ALL: [Verb; 5] = [Verb::Get, Verb::Post, Verb::Patch, Verb::Put, Verb::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Patch => "PATCH",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
        }
    }

    /// Title-cased name, e.g. `Get`.
    pub fn title(&self) -> &'static str {
        match self {
            Verb::Get => "Get",
            Verb::Post => "Post",
            Verb::Patch => "Patch",
            Verb::Put => "Put",
            Verb::Delete => "Delete",
        }
    }

    pub fn from_method(method: &http::Method) -> Option<Self> {
        method.as_str().parse().ok()
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verb::ALL
            .into_iter()
            .find(|verb| verb.as_str() == s)
            .ok_or_else(|| format!("unknown verb '{s}'"))
    }
}

/// A verb plus whether the `_PARAMS` variant is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DispatchMethod {
    pub verb: Verb,
    pub with_params: bool,
}

impl DispatchMethod {
    pub const fn plain(verb: Verb) -> Self {
        Self {
            verb,
            with_params: false,
        }
    }

    pub const fn with_params(verb: Verb) -> Self {
        Self {
            verb,
            with_params: true,
        }
    }
}

impl fmt::Display for DispatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.with_params {
            write!(f, "{}{PARAMS_SUFFIX}", self.verb)
        } else {
            write!(f, "{}", self.verb)
        }
    }
}

impl FromStr for DispatchMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_suffix(PARAMS_SUFFIX) {
            Some(verb) => Ok(DispatchMethod::with_params(verb.parse()?)),
            None => Ok(DispatchMethod::plain(s.parse()?)),
        }
    }
}

/// Documentation and validation metadata for one dispatch method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    /// Schema the JSON request body must satisfy before the operation runs.
    pub body: Option<Schema>,
}

impl EndpointMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn body(mut self, schema: Schema) -> Self {
        self.body = Some(schema);
        self
    }
}

/// Static description of a handler type: which dispatch methods it implements,
/// their metadata and whether it has a pre-dispatch hook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerMetadata {
    pub implemented: BTreeSet<DispatchMethod>,
    pub methods: BTreeMap<DispatchMethod, EndpointMeta>,
    pub pre_serve: bool,
}

impl HandlerMetadata {
    pub fn implements(&self, method: DispatchMethod) -> bool {
        self.implemented.contains(&method)
    }

    pub fn meta(&self, method: DispatchMethod) -> Option<&EndpointMeta> {
        self.methods.get(&method)
    }
}

/// A verb operation bound to a controller type.
pub type Action<C> = fn(&mut C, &mut Exchange<'_>) -> ApiResult<Value>;

/// A pre-dispatch hook. Returning an error aborts the request.
pub type Hook<C> = fn(&mut C, &mut Exchange<'_>) -> ApiResult<()>;

/// Dispatch table of a controller type.
pub struct Endpoints<C> {
    actions: BTreeMap<DispatchMethod, Action<C>>,
    meta: BTreeMap<DispatchMethod, EndpointMeta>,
    pre_serve: Option<Hook<C>>,
}

impl<C> Default for Endpoints<C> {
    fn default() -> Self {
        Self {
            actions: BTreeMap::new(),
            meta: BTreeMap::new(),
            pre_serve: None,
        }
    }
}

impl<C> Endpoints<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `action` to an explicit dispatch method.
    pub fn on(mut self, method: DispatchMethod, action: Action<C>) -> Self {
        self.actions.insert(method, action);
        self
    }

    pub fn get(self, action: Action<C>) -> Self {
        self.on(DispatchMethod::plain(Verb::Get), action)
    }

    pub fn post(self, action: Action<C>) -> Self {
        self.on(DispatchMethod::plain(Verb::Post), action)
    }

    pub fn patch(self, action: Action<C>) -> Self {
        self.on(DispatchMethod::plain(Verb::Patch), action)
    }

    pub fn put(self, action: Action<C>) -> Self {
        self.on(DispatchMethod::plain(Verb::Put), action)
    }

    pub fn delete(self, action: Action<C>) -> Self {
        self.on(DispatchMethod::plain(Verb::Delete), action)
    }

    pub fn get_params(self, action: Action<C>) -> Self {
        self.on(DispatchMethod::with_params(Verb::Get), action)
    }

    pub fn post_params(self, action: Action<C>) -> Self {
        self.on(DispatchMethod::with_params(Verb::Post), action)
    }

    pub fn patch_params(self, action: Action<C>) -> Self {
        self.on(DispatchMethod::with_params(Verb::Patch), action)
    }

    pub fn put_params(self, action: Action<C>) -> Self {
        self.on(DispatchMethod::with_params(Verb::Put), action)
    }

    pub fn delete_params(self, action: Action<C>) -> Self {
        self.on(DispatchMethod::with_params(Verb::Delete), action)
    }

    /// Attach metadata to a dispatch method.
    pub fn describe(mut self, method: DispatchMethod, meta: EndpointMeta) -> Self {
        self.meta.insert(method, meta);
        self
    }

    pub fn pre_serve(mut self, hook: Hook<C>) -> Self {
        self.pre_serve = Some(hook);
        self
    }

    pub fn metadata(&self) -> HandlerMetadata {
        HandlerMetadata {
            implemented: self.actions.keys().copied().collect(),
            methods: self.meta.clone(),
            pre_serve: self.pre_serve.is_some(),
        }
    }
}

/// Implemented by every handler type reachable from the route tree.
///
/// A fresh instance is created with `Default` for each request that passes
/// through the type's node.
pub trait Controller: Default + Send + Sized + 'static {
    fn endpoints() -> Endpoints<Self>;
}

/// Object-safe view of a controller instance used by the router.
pub trait Handler: Send {
    fn has_pre_serve(&self) -> bool;

    fn pre_serve(&mut self, exchange: &mut Exchange<'_>) -> ApiResult<()>;

    /// Run the dispatch contract: pick the dispatch method, validate and filter
    /// the body when a schema is declared, then invoke the operation.
    fn serve(&mut self, exchange: &mut Exchange<'_>) -> ApiResult<Value>;
}

/// A controller instance paired with its type's shared dispatch table.
pub(crate) struct Bound<C> {
    controller: C,
    endpoints: Arc<Endpoints<C>>,
}

impl<C: Controller> Bound<C> {
    pub(crate) fn new(endpoints: Arc<Endpoints<C>>) -> Self {
        Self {
            controller: C::default(),
            endpoints,
        }
    }
}

impl<C: Controller> Handler for Bound<C> {
    fn has_pre_serve(&self) -> bool {
        self.endpoints.pre_serve.is_some()
    }

    fn pre_serve(&mut self, exchange: &mut Exchange<'_>) -> ApiResult<()> {
        match self.endpoints.pre_serve {
            Some(hook) => hook(&mut self.controller, exchange),
            None => Ok(()),
        }
    }

    fn serve(&mut self, exchange: &mut Exchange<'_>) -> ApiResult<Value> {
        let method = exchange.dispatch_method()?;

        let schema = self
            .endpoints
            .meta
            .get(&method)
            .and_then(|meta| meta.body.as_ref());
        if let Some(schema) = schema {
            let filtered = {
                let body = exchange.body()?;
                if let Err(errors) = schema.validate(body) {
                    crate::metrics::increment_validation_failures();
                    tracing::debug!(%method, ?errors, "Request body failed validation");
                    return Err(ApiError::Validation(errors));
                }
                schema.filter(body)
            };
            exchange.replace_body(filtered);
        }

        let action = self
            .endpoints
            .actions
            .get(&method)
            .copied()
            .ok_or_else(|| ApiError::NotImplemented {
                method: method.to_string(),
            })?;

        action(&mut self.controller, exchange)
    }
}
