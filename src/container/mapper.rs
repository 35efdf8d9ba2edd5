use std::collections::HashMap;
use std::sync::Arc;

use crate::container::wrapper::HandlerWrapper;

/// Maps request paths to handler wrappers by URL pattern.
///
/// Patterns follow the servlet conventions and are tried in priority order:
///
/// 1. Exact match (`/user/create`)
/// 2. Prefix match (`/user/*`), longest matching prefix winning
/// 3. Extension match (`*.jsp`)
/// 4. Default match (the `/` pattern)
///
/// Built once at context startup and read-only afterwards, so lookups need
/// no locking.
#[derive(Default)]
pub struct Mapper {
    exact: HashMap<String, Arc<HandlerWrapper>>,
    prefix: HashMap<String, Arc<HandlerWrapper>>,
    extension: HashMap<String, Arc<HandlerWrapper>>,
    default_match: Option<Arc<HandlerWrapper>>,
}

impl Mapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pattern. The pattern's shape decides which table it
    /// lands in; a later registration of the same pattern replaces the
    /// earlier one.
    pub fn add(&mut self, pattern: &str, wrapper: Arc<HandlerWrapper>) {
        if pattern == "/" {
            self.default_match = Some(wrapper);
        } else if let Some(prefix) = pattern.strip_suffix("/*") {
            self.prefix.insert(prefix.to_string(), wrapper);
        } else if let Some(extension) = pattern.strip_prefix("*.") {
            self.extension.insert(extension.to_string(), wrapper);
        } else {
            self.exact.insert(pattern.to_string(), wrapper);
        }
    }

    /// Resolves a request path to its handler, or `None` when nothing
    /// matches and no default pattern is registered.
    pub fn resolve(&self, path: &str) -> Option<Arc<HandlerWrapper>> {
        if let Some(wrapper) = self.exact.get(path) {
            return Some(wrapper.clone());
        }

        let mut best: Option<(&str, &Arc<HandlerWrapper>)> = None;
        for (prefix, wrapper) in &self.prefix {
            if path.starts_with(prefix.as_str())
                && best.map(|(b, _)| prefix.len() > b.len()).unwrap_or(true)
            {
                best = Some((prefix, wrapper));
            }
        }
        if let Some((_, wrapper)) = best {
            return Some(wrapper.clone());
        }

        if let Some(idx) = path.rfind('.') {
            if let Some(wrapper) = self.extension.get(&path[idx + 1..]) {
                return Some(wrapper.clone());
            }
        }

        self.default_match.clone()
    }

    /// Every registered wrapper, across all pattern tables. A wrapper
    /// registered under several patterns appears once per pattern.
    pub fn wrappers(&self) -> impl Iterator<Item = &Arc<HandlerWrapper>> {
        self.exact
            .values()
            .chain(self.prefix.values())
            .chain(self.extension.values())
            .chain(self.default_match.iter())
    }
}
