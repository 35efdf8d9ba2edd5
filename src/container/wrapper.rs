use std::sync::Arc;

use anyhow::{bail, Context as _};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::container::context::Context;
use crate::http::request::Request;
use crate::http::response::Response;

/// An application handler, the unit of request processing.
///
/// Implementations are shared across worker threads, so `service` takes
/// `&self`; any mutable state belongs behind the handler's own locks (or in
/// the session).
pub trait Handler: Send + Sync {
    /// Called once, after construction and before the first `service` call.
    fn init(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Handles one request, filling in the response.
    fn service(&self, request: &mut Request, response: &mut Response) -> anyhow::Result<()>;

    /// Called once when the container shuts the handler down.
    fn destroy(&self) {}

    /// Handlers that need a reference to their owning [`Context`] return
    /// `Some(self)` here; the wrapper injects the context before `init`.
    fn as_container_aware(&self) -> Option<&dyn ContainerAware> {
        None
    }
}

/// Callback interface for handlers that want their owning context injected
/// during loading.
pub trait ContainerAware {
    fn set_container(&self, context: Arc<Context>);
}

/// Factory that builds a fresh handler instance when the wrapper loads.
pub type HandlerFactory = Box<dyn Fn() -> Box<dyn Handler> + Send + Sync>;

enum State {
    Unloaded,
    Loaded(Arc<dyn Handler>),
    Destroyed,
}

/// Lifecycle wrapper around a single handler registration.
///
/// The wrapped handler moves UNLOADED → LOADED → DESTROYED. Loading is
/// idempotent and happens either eagerly at context startup (for
/// `load_on_startup >= 0`) or lazily on the first request. A destroyed
/// wrapper never serves again.
pub struct HandlerWrapper {
    name: String,
    load_on_startup: i32,
    factory: HandlerFactory,
    state: RwLock<State>,
}

impl HandlerWrapper {
    pub fn new(name: impl Into<String>, load_on_startup: i32, factory: HandlerFactory) -> Self {
        Self {
            name: name.into(),
            load_on_startup,
            factory,
            state: RwLock::new(State::Unloaded),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this handler loads at context startup.
    pub fn eager(&self) -> bool {
        self.load_on_startup >= 0
    }

    pub fn is_loaded(&self) -> bool {
        matches!(*self.state.read(), State::Loaded(_))
    }

    /// Instantiates and initializes the handler if it is not loaded yet.
    ///
    /// On `init` failure the wrapper stays unloaded and the error
    /// propagates; a later call may retry. Returns an error if the wrapper
    /// was already destroyed.
    pub fn load(&self, context: &Arc<Context>) -> anyhow::Result<()> {
        let mut state = self.state.write();
        match *state {
            State::Loaded(_) => return Ok(()),
            State::Destroyed => bail!("handler {} is destroyed", self.name),
            State::Unloaded => {}
        }

        let handler: Arc<dyn Handler> = Arc::from((self.factory)());
        if let Some(aware) = handler.as_container_aware() {
            aware.set_container(context.clone());
        }
        handler
            .init()
            .with_context(|| format!("failed to initialize handler {}", self.name))?;

        debug!("Loaded handler {}", self.name);
        *state = State::Loaded(handler);
        Ok(())
    }

    /// Dispatches a request to the handler, loading it first if needed.
    pub fn service(
        &self,
        context: &Arc<Context>,
        request: &mut Request,
        response: &mut Response,
    ) -> anyhow::Result<()> {
        let handler = match &*self.state.read() {
            State::Loaded(handler) => Some(handler.clone()),
            _ => None,
        };
        let handler = match handler {
            Some(handler) => handler,
            None => {
                self.load(context)?;
                match &*self.state.read() {
                    State::Loaded(handler) => handler.clone(),
                    _ => bail!("handler {} unavailable after load", self.name),
                }
            }
        };

        handler.service(request, response)
    }

    /// Destroys the handler if it was loaded. Idempotent; an unloaded
    /// wrapper transitions straight to destroyed without callbacks.
    pub fn destroy(&self) {
        let mut state = self.state.write();
        if let State::Loaded(handler) = &*state {
            handler.destroy();
            info!("Destroyed handler {}", self.name);
        }
        *state = State::Destroyed;
    }
}
