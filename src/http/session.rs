//! Session management.
//!
//! Sessions are identified by an opaque id carried in the `JSESSIONID` cookie
//! and live in a [`SessionStore`] shared by every connection of a server
//! instance. The store is an explicitly constructed, injected dependency —
//! there is no process-wide singleton.

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

/// Name of the cookie that carries the session id.
pub const SESSION_COOKIE: &str = "JSESSIONID";

/// A single client session: an opaque id plus an attribute map.
///
/// Attribute values are arbitrary (`Any`) and shared by `Arc`, mirroring a
/// servlet session's `Object` attributes. The attribute map itself is locked
/// internally; callers are still expected to serialize higher-level access to
/// one session (one in-flight request per client at a time).
pub struct Session {
    id: String,
    attributes: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl Session {
    fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_attribute(&self, name: impl Into<String>, value: impl Any + Send + Sync) {
        self.attributes.lock().insert(name.into(), Arc::new(value));
    }

    /// Retrieves an attribute, downcast to the requested type.
    ///
    /// Returns `None` if the attribute is absent or of a different type.
    pub fn attribute<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let value = self.attributes.lock().get(name).cloned()?;
        value.downcast::<T>().ok()
    }

    pub fn remove_attribute(&self, name: &str) {
        self.attributes.lock().remove(name);
    }

    /// Number of attributes currently set.
    pub fn attribute_count(&self) -> usize {
        self.attributes.lock().len()
    }
}

/// Concurrent id → session map with get-or-create semantics.
///
/// Safe for simultaneous get/insert/remove from any thread. Two racing
/// `get_or_create(id, true)` calls for the same id always observe the same
/// [`Session`] instance: creation re-checks under the write lock.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the session for `id`.
    ///
    /// If absent and `create` is true, a new session is inserted and
    /// returned. If absent and `create` is false, returns `None` with no
    /// side effect.
    pub fn get_or_create(&self, id: &str, create: bool) -> Option<Arc<Session>> {
        if let Some(session) = self.sessions.read().get(id) {
            return Some(session.clone());
        }
        if !create {
            return None;
        }

        let mut sessions = self.sessions.write();
        let session = sessions
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Session::new(id)));
        Some(session.clone())
    }

    /// Removes the session unconditionally; no-op if absent.
    pub fn remove(&self, id: &str) {
        self.sessions.write().remove(id);
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Generates a fresh random session id (32 hex characters).
pub fn generate_session_id() -> String {
    let raw: [u8; 16] = rand::random();
    let mut id = String::with_capacity(raw.len() * 2);
    for byte in raw {
        let _ = write!(id, "{byte:02x}");
    }
    id
}
