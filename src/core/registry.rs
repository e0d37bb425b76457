//! Handler-type registry.
//!
//! Maps the handler type names computed by the route tree to controller
//! factories. The registry is filled at process start; the router then binds it
//! to tree nodes once, so requests never look types up by name.
use std::{collections::HashMap, fmt, sync::Arc};

use crate::core::controller::{Bound, Controller, Endpoints, Handler, HandlerMetadata};

type Factory = Arc<dyn Fn() -> Box<dyn Handler> + Send + Sync>;

/// A registered handler type.
pub struct Registration {
    name: String,
    metadata: HandlerMetadata,
    factory: Factory,
}

impl Registration {
    fn of<C: Controller>(name: String) -> Self {
        let endpoints: Arc<Endpoints<C>> = Arc::new(C::endpoints());
        let metadata = endpoints.metadata();
        let factory: Factory =
            Arc::new(move || Box::new(Bound::<C>::new(endpoints.clone())) as Box<dyn Handler>);

        Self {
            name,
            metadata,
            factory,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &HandlerMetadata {
        &self.metadata
    }

    /// A fresh handler instance for one request.
    pub fn instantiate(&self) -> Box<dyn Handler> {
        (self.factory)()
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Handler type name to registration.
#[derive(Debug, Clone, Default)]
pub struct ControllerRegistry {
    entries: HashMap<String, Arc<Registration>>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `C` under `name`, replacing any earlier registration.
    pub fn register<C: Controller>(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        if self.entries.contains_key(&name) {
            tracing::warn!(handler = %name, "Replacing existing handler registration");
        }
        self.entries
            .insert(name.clone(), Arc::new(Registration::of::<C>(name)));
        self
    }

    /// Builder form of [`ControllerRegistry::register`].
    pub fn with<C: Controller>(mut self, name: impl Into<String>) -> Self {
        self.register::<C>(name);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Registration>> {
        self.entries.get(name)
    }

    pub fn metadata(&self, name: &str) -> Option<&HandlerMetadata> {
        self.entries.get(name).map(|r| r.metadata())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
