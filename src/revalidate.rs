//! Invalidation signals returned by mutations
//!
//! Actions never reach into the presentation layer. Each mutation returns a
//! [`Revalidation`] naming the routes whose rendered state is now stale, and
//! the caller decides what to do with it, for instance by applying it to a
//! [`RouteCache`].

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use tracing::debug;

/// A route of the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route(String);

impl Route {
    pub fn new(path: &str) -> Self {
        Self(path.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Routes a mutation made stale
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Revalidation {
    routes: Vec<Route>,
}

impl Revalidation {
    pub fn route(route: Route) -> Self {
        Self {
            routes: vec![route],
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn invalidates(&self, route: &Route) -> bool {
        self.routes.contains(route)
    }
}

/// The result of a mutation together with what it invalidated
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation<T> {
    pub value: T,
    pub revalidate: Revalidation,
}

impl<T> Mutation<T> {
    pub fn new(value: T, revalidate: Revalidation) -> Self {
        Self { value, revalidate }
    }

    /// Apply the signal to a cache and return the value
    pub fn apply<V>(self, cache: &RouteCache<V>) -> T {
        cache.apply(&self.revalidate);
        self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Rendered state keyed by route
#[derive(Debug)]
pub struct RouteCache<V> {
    entries: RwLock<HashMap<Route, V>>,
}

impl<V> Default for RouteCache<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<V: Clone> RouteCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, route: &Route) -> Option<V> {
        self.entries.read().ok()?.get(route).cloned()
    }

    pub fn insert(&self, route: Route, value: V) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(route, value);
        }
    }
}

impl<V> RouteCache<V> {
    /// Evict every route named by the signal
    pub fn apply(&self, revalidation: &Revalidation) {
        if let Ok(mut entries) = self.entries.write() {
            for route in revalidation.routes() {
                if entries.remove(route).is_some() {
                    debug!(%route, "route revalidated");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applying_a_mutation_evicts_its_route() {
        let cache = RouteCache::new();
        let dashboard = Route::new("/dashboard");
        let home = Route::new("/");
        cache.insert(dashboard.clone(), "rendered dashboard".to_string());
        cache.insert(home.clone(), "rendered home".to_string());

        let value = Mutation::new(42, Revalidation::route(dashboard.clone())).apply(&cache);

        assert_eq!(value, 42);
        assert!(cache.get(&dashboard).is_none());
        assert_eq!(cache.get(&home).as_deref(), Some("rendered home"));
    }
}
