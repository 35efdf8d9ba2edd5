use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use anyhow::{bail, Context as _};
use parking_lot::Mutex;
use tracing::info;

use crate::container::mapper::Mapper;
use crate::container::wrapper::{HandlerFactory, HandlerWrapper};

/// The application container: a registry of routes and their handlers.
///
/// Routes are added before startup; [`Context::startup`] then builds the
/// URL mapper and eagerly loads every handler registered with
/// `load_on_startup >= 0`, failing fast if any of them fails to
/// initialize. After startup the route table is immutable.
///
/// The context also carries an attribute map that handlers can use to share
/// state, reached through the `ContainerAware` injection.
#[derive(Default)]
pub struct Context {
    routes: Mutex<Vec<(String, Arc<HandlerWrapper>)>>,
    mapper: OnceLock<Mapper>,
    attributes: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl Context {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a handler under a URL pattern.
    ///
    /// `load_on_startup >= 0` loads the handler during [`Context::startup`];
    /// a negative value defers loading to the first matching request.
    pub fn add_route(
        &self,
        pattern: impl Into<String>,
        load_on_startup: i32,
        factory: HandlerFactory,
    ) {
        let pattern = pattern.into();
        let wrapper = Arc::new(HandlerWrapper::new(
            pattern.clone(),
            load_on_startup,
            factory,
        ));
        self.routes.lock().push((pattern, wrapper));
    }

    /// Builds the mapper and eagerly loads `load_on_startup` handlers.
    ///
    /// Any eager handler failing to initialize aborts startup with an
    /// error. Calling startup twice is an error.
    pub fn startup(self: &Arc<Self>) -> anyhow::Result<()> {
        let routes = std::mem::take(&mut *self.routes.lock());

        info!("Eager loading handlers");
        let mut mapper = Mapper::new();
        for (pattern, wrapper) in &routes {
            if wrapper.eager() {
                wrapper
                    .load(self)
                    .with_context(|| format!("startup load failed for {pattern}"))?;
            }
            mapper.add(pattern, wrapper.clone());
        }

        if self.mapper.set(mapper).is_err() {
            bail!("context already started");
        }
        Ok(())
    }

    /// Resolves a request path to its handler wrapper. Returns `None` before
    /// startup or when no pattern matches.
    pub fn resolve(&self, path: &str) -> Option<Arc<HandlerWrapper>> {
        self.mapper.get()?.resolve(path)
    }

    /// Destroys every registered handler. Loaded handlers get their
    /// `destroy` callback; unloaded ones just transition to destroyed.
    pub fn shutdown_all(&self) {
        if let Some(mapper) = self.mapper.get() {
            for wrapper in mapper.wrappers() {
                wrapper.destroy();
            }
        }
    }

    pub fn set_attribute(&self, name: impl Into<String>, value: impl Any + Send + Sync) {
        self.attributes.lock().insert(name.into(), Arc::new(value));
    }

    pub fn attribute<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let value = self.attributes.lock().get(name).cloned()?;
        value.downcast::<T>().ok()
    }
}
