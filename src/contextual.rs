//! Context-switched dependency maps.
//!
//! A [`ContextualDependencyMap`] keeps one root map plus an isolated
//! child map per context label. Switching context re-points
//! registration and resolution at the child for that label; child maps
//! are seeded from the root's registrations with all caches reset, so
//! singleton factories run once *per context*. Useful when the same
//! keys must resolve differently per tenant, language, or environment.

use crate::error::Result;
use crate::key::DependencyKey;
use crate::map::{DependencyMap, Resolver};
use crate::provider::AnyValue;
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::{Arc, RwLock};

#[cfg(feature = "logging")]
use tracing::debug;

/// A dependency map whose active bindings depend on a selected context.
///
/// # Examples
///
/// ```rust
/// use keywire::{ContextualDependencyMap, DependencyKey};
///
/// let deps = ContextualDependencyMap::new();
/// deps.root().instance("locale", "en".to_string());
///
/// deps.context("es");
/// deps.instance("locale", "es".to_string());
///
/// let key = DependencyKey::named("locale");
/// assert_eq!(*deps.active().resolve_as::<String>(&key).unwrap(), "es");
///
/// deps.context_none();
/// assert_eq!(*deps.active().resolve_as::<String>(&key).unwrap(), "en");
/// ```
pub struct ContextualDependencyMap {
    root: Arc<DependencyMap>,
    contexts: DashMap<String, Arc<DependencyMap>, RandomState>,
    active: RwLock<Option<Arc<DependencyMap>>>,
}

impl ContextualDependencyMap {
    /// Create a contextual map with an empty root and no active context.
    pub fn new() -> Self {
        Self {
            root: Arc::new(DependencyMap::new()),
            contexts: DashMap::with_hasher(RandomState::new()),
            active: RwLock::new(None),
        }
    }

    /// The root map, active whenever no context is selected.
    #[inline]
    pub fn root(&self) -> &Arc<DependencyMap> {
        &self.root
    }

    /// The currently active map: the selected context's child map, or
    /// the root when no context is selected.
    pub fn active(&self) -> Arc<DependencyMap> {
        self.active
            .read()
            .expect("context lock poisoned")
            .clone()
            .unwrap_or_else(|| Arc::clone(&self.root))
    }

    /// Switch to the context `label`, creating its child map on first
    /// use. Returns the selected map.
    ///
    /// A new child map is seeded with the root's registrations; each
    /// provider's caches start fresh, so singletons are constructed
    /// once per context.
    pub fn context(&self, label: impl Into<String>) -> Arc<DependencyMap> {
        let label = label.into();

        let map = self
            .contexts
            .entry(label.clone())
            .or_insert_with(|| {
                #[cfg(feature = "logging")]
                debug!(
                    target: "keywire",
                    context = %label,
                    "Initializing dependency map for new context"
                );

                let child = DependencyMap::with_capacity(self.root.len());
                self.root.for_each_fresh(|key, provider| {
                    child.register(key, provider);
                });
                Arc::new(child)
            })
            .clone();

        #[cfg(feature = "logging")]
        debug!(target: "keywire", context = %label, "Switched dependency map context");

        *self.active.write().expect("context lock poisoned") = Some(Arc::clone(&map));
        map
    }

    /// Deselect any context, re-activating the root map.
    pub fn context_none(&self) -> Arc<DependencyMap> {
        *self.active.write().expect("context lock poisoned") = None;
        Arc::clone(&self.root)
    }

    /// Drop every context map and re-activate the root.
    ///
    /// Suited to test teardown: per-context singleton state goes away
    /// with the maps.
    pub fn reset(&self) {
        self.contexts.clear();
        self.context_none();

        #[cfg(feature = "logging")]
        debug!(target: "keywire", "Reset all dependency map contexts");
    }

    // Registration conveniences targeting the active map.

    /// Bind a precomputed value in the active map.
    #[inline]
    pub fn instance<T: Send + Sync + 'static>(&self, key: impl Into<DependencyKey>, value: T) {
        self.active().instance(key, value);
    }

    /// Bind a factory constructor in the active map.
    #[inline]
    pub fn factory<T, F>(&self, key: impl Into<DependencyKey>, make: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&DependencyMap) -> T + Send + Sync + 'static,
    {
        self.active().factory(key, make);
    }

    /// Bind a singleton constructor in the active map.
    #[inline]
    pub fn singleton<T, F>(&self, key: impl Into<DependencyKey>, make: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&DependencyMap) -> T + Send + Sync + 'static,
    {
        self.active().singleton(key, make);
    }
}

impl Default for ContextualDependencyMap {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ContextualDependencyMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextualDependencyMap")
            .field("root_bindings", &self.root.len())
            .field("contexts", &self.contexts.len())
            .finish()
    }
}

impl Resolver for ContextualDependencyMap {
    #[inline]
    fn resolve_key(&self, key: &DependencyKey) -> Result<AnyValue> {
        self.active().resolve(key)
    }

    #[inline]
    fn contains_key(&self, key: &DependencyKey) -> bool {
        self.active().contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::injector::{CallArgs, Injector, Signature};
    use crate::Key;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn values_differ_per_context() {
        let deps = ContextualDependencyMap::new();
        deps.root().instance("greeting", "hello".to_string());

        deps.context("es");
        deps.instance("greeting", "hola".to_string());

        let key = DependencyKey::named("greeting");
        assert_eq!(*deps.resolve_key(&key).unwrap().downcast::<String>().unwrap(), "hola");

        deps.context_none();
        assert_eq!(
            *deps.resolve_key(&key).unwrap().downcast::<String>().unwrap(),
            "hello"
        );
    }

    #[test]
    fn singleton_runs_once_per_context() {
        static CALLS: AtomicU32 = AtomicU32::new(0);

        let deps = ContextualDependencyMap::new();
        deps.root()
            .singleton("conn", |_| CALLS.fetch_add(1, Ordering::SeqCst));

        let key = DependencyKey::named("conn");

        deps.context("a");
        deps.resolve_key(&key).unwrap();
        deps.resolve_key(&key).unwrap();

        deps.context("b");
        deps.resolve_key(&key).unwrap();

        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn context_seeded_from_root_is_isolated() {
        let deps = ContextualDependencyMap::new();
        deps.root().instance("shared", 1u32);

        deps.context("a");
        deps.instance("only_a", 2u32);

        // Child sees the seeded root binding plus its own.
        assert!(deps.contains_key(&DependencyKey::named("shared")));
        assert!(deps.contains_key(&DependencyKey::named("only_a")));

        // Root never sees context-local bindings.
        deps.context_none();
        assert!(!deps.contains_key(&DependencyKey::named("only_a")));
    }

    #[test]
    fn reselecting_a_context_keeps_its_state() {
        let deps = ContextualDependencyMap::new();
        deps.context("a");
        deps.instance("marker", 7u32);

        deps.context("b");
        deps.context("a");
        assert!(deps.contains_key(&DependencyKey::named("marker")));
    }

    #[test]
    fn reset_drops_contexts() {
        let deps = ContextualDependencyMap::new();
        deps.context("a");
        deps.instance("marker", 7u32);

        deps.reset();
        deps.context("a");
        assert!(!deps.contains_key(&DependencyKey::named("marker")));
    }

    #[test]
    fn injector_follows_active_context() {
        let deps = Arc::new(ContextualDependencyMap::new());
        deps.root().instance("locale", "en".to_string());

        let inject = Injector::bind_resolver(Arc::clone(&deps) as Arc<dyn Resolver>);
        let op = inject.wrap(
            Signature::new().inject("locale", Key::new("locale")),
            |args| (*args.get::<String>("locale").unwrap()).clone(),
        );

        assert_eq!(op.call(CallArgs::new()).unwrap(), "en");

        deps.context("es");
        deps.instance("locale", "es".to_string());
        assert_eq!(op.call(CallArgs::new()).unwrap(), "es");
    }
}
