//! The dependency registry.
//!
//! [`DependencyMap`] owns the key→provider bindings and all lifecycle
//! state. Registration silently overwrites — re-binding a key is the
//! deliberate override mechanism, not an accident — and replacing a
//! singleton discards its cached value along with the old provider.

use crate::error::{DiError, Result};
use crate::key::DependencyKey;
use crate::provider::{AnyValue, Provider, ProviderFn};
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Anything the injector can resolve dependencies from.
///
/// The seam between [`Injector`](crate::Injector) and the map flavours:
/// [`DependencyMap`], [`ContextualDependencyMap`](crate::ContextualDependencyMap)
/// and [`PatchedDependencyMap`](crate::PatchedDependencyMap) all
/// implement it.
pub trait Resolver: Send + Sync {
    /// Resolve `key` to a value via its provider.
    fn resolve_key(&self, key: &DependencyKey) -> Result<AnyValue>;

    /// Membership test. No side effects, never constructs.
    fn contains_key(&self, key: &DependencyKey) -> bool;
}

/// Registry mapping dependency keys to providers.
///
/// Thread-safe: wrapped operations sharing one map may resolve
/// concurrently, and singleton construction happens at most once even
/// under concurrent first use.
///
/// # Examples
///
/// ```rust
/// use keywire::{DependencyMap, Key};
///
/// let deps = DependencyMap::new();
/// deps.instance(Key::new("greeting"), "hello".to_string());
///
/// let value = deps.resolve_as::<String>(&Key::new("greeting").into()).unwrap();
/// assert_eq!(*value, "hello");
/// ```
pub struct DependencyMap {
    providers: DashMap<DependencyKey, Provider, RandomState>,
}

impl DependencyMap {
    /// Create an empty map.
    ///
    /// Uses 8 shards: DI registries rarely hold more than a few dozen
    /// bindings, so the DashMap default of `num_cpus * 4` shards only
    /// slows creation down.
    #[inline]
    pub fn new() -> Self {
        Self {
            providers: DashMap::with_capacity_and_hasher_and_shard_amount(
                0,
                RandomState::new(),
                8,
            ),
        }
    }

    /// Create a map with pre-allocated capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            providers: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                RandomState::new(),
                8,
            ),
        }
    }

    /// Build an all-instance map from literal key→value pairs.
    ///
    /// The convenience form for binding a handful of fixed values, as
    /// used by [`Injector::bind_values`](crate::Injector::bind_values).
    pub fn from_values<K, I>(pairs: I) -> Self
    where
        K: Into<DependencyKey>,
        I: IntoIterator<Item = (K, AnyValue)>,
    {
        let map = Self::new();
        for (key, value) in pairs {
            map.register(key, Provider::Instance(value));
        }
        map
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Bind `key` to a provider, overwriting any existing binding.
    ///
    /// Replacing a singleton discards its cached value; the old
    /// provider is dropped wholesale.
    pub fn register(&self, key: impl Into<DependencyKey>, provider: Provider) {
        let key = key.into();

        #[cfg(feature = "logging")]
        debug!(
            target: "keywire",
            key = %key,
            lifetime = provider.kind(),
            "Registering dependency"
        );

        self.providers.insert(key, provider);
    }

    /// Bind `key` to a precomputed value.
    #[inline]
    pub fn instance<T: Send + Sync + 'static>(&self, key: impl Into<DependencyKey>, value: T) {
        self.register(key, Provider::instance(value));
    }

    /// Bind `key` to a constructor invoked on every resolution.
    #[inline]
    pub fn factory<T, F>(&self, key: impl Into<DependencyKey>, make: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&DependencyMap) -> T + Send + Sync + 'static,
    {
        self.register(key, Provider::factory(erase(make)));
    }

    /// Bind `key` to a fallible constructor invoked on every resolution.
    ///
    /// A constructor failure surfaces as
    /// [`DiError::ConstructionFailed`] with the original error attached.
    pub fn try_factory<T, E, F>(&self, key: impl Into<DependencyKey>, make: F)
    where
        T: Send + Sync + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
        F: Fn(&DependencyMap) -> std::result::Result<T, E> + Send + Sync + 'static,
    {
        let key = key.into();
        self.register(key.clone(), Provider::factory(erase_try(key, make)));
    }

    /// Bind `key` to a constructor invoked at most once.
    #[inline]
    pub fn singleton<T, F>(&self, key: impl Into<DependencyKey>, make: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&DependencyMap) -> T + Send + Sync + 'static,
    {
        self.register(key, Provider::singleton(erase(make)));
    }

    /// Bind `key` to a fallible constructor invoked at most once.
    ///
    /// A failed construction does not mark the singleton as
    /// constructed; the next resolution retries.
    pub fn try_singleton<T, E, F>(&self, key: impl Into<DependencyKey>, make: F)
    where
        T: Send + Sync + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
        F: Fn(&DependencyMap) -> std::result::Result<T, E> + Send + Sync + 'static,
    {
        let key = key.into();
        self.register(key.clone(), Provider::singleton(erase_try(key, make)));
    }

    /// Bind `key` to a constructor invoked at most once per thread.
    #[inline]
    pub fn thread_scoped<T, F>(&self, key: impl Into<DependencyKey>, make: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&DependencyMap) -> T + Send + Sync + 'static,
    {
        self.register(key, Provider::thread_scoped(erase(make)));
    }

    /// Bind `key` to a fallible constructor invoked at most once per thread.
    pub fn try_thread_scoped<T, E, F>(&self, key: impl Into<DependencyKey>, make: F)
    where
        T: Send + Sync + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
        F: Fn(&DependencyMap) -> std::result::Result<T, E> + Send + Sync + 'static,
    {
        let key = key.into();
        self.register(key.clone(), Provider::thread_scoped(erase_try(key, make)));
    }

    /// Bind the type `T` itself as the key for a precomputed value.
    #[inline]
    pub fn put<T: Send + Sync + 'static>(&self, value: T) {
        self.instance(DependencyKey::of::<T>(), value);
    }

    /// Start a fluent batch registration.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use keywire::DependencyMap;
    ///
    /// let deps = DependencyMap::new();
    /// deps.register_batch()
    ///     .instance("host", "localhost".to_string())
    ///     .instance("port", 5432u16)
    ///     .done();
    ///
    /// assert_eq!(deps.len(), 2);
    /// ```
    #[inline]
    pub fn register_batch(&self) -> BatchBuilder<'_> {
        BatchBuilder {
            map: self,
            #[cfg(feature = "logging")]
            count: 0,
        }
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve `key` to a value via its provider.
    ///
    /// Instance providers return the stored value; factories construct
    /// a fresh one; singletons construct at most once and return the
    /// cached value thereafter. Fails with
    /// [`DiError::UnknownDependency`] when `key` has no binding.
    ///
    /// Constructors receive this map and may resolve collaborators
    /// from it, but must not register new providers while resolution
    /// is in flight.
    pub fn resolve(&self, key: &DependencyKey) -> Result<AnyValue> {
        let Some(provider) = self.providers.get(key) else {
            #[cfg(feature = "logging")]
            debug!(target: "keywire", key = %key, "Dependency not found");
            return Err(DiError::UnknownDependency { key: key.clone() });
        };

        #[cfg(feature = "logging")]
        trace!(
            target: "keywire",
            key = %key,
            lifetime = provider.kind(),
            "Resolving dependency"
        );

        provider.resolve(self)
    }

    /// Resolve `key` and downcast to `T`.
    ///
    /// Fails with [`DiError::TypeMismatch`] when the provider's value
    /// is of a different type.
    pub fn resolve_as<T: Send + Sync + 'static>(&self, key: &DependencyKey) -> Result<Arc<T>> {
        self.resolve(key)?
            .downcast::<T>()
            .map_err(|_| DiError::type_mismatch::<T>(key))
    }

    /// Resolve the value bound under the type key of `T`.
    #[inline]
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.resolve_as::<T>(&DependencyKey::of::<T>())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Membership test. Never triggers construction.
    #[inline]
    pub fn contains(&self, key: &DependencyKey) -> bool {
        self.providers.contains_key(key)
    }

    /// Membership test for the type key of `T`.
    #[inline]
    pub fn contains_type<T: Send + Sync + 'static>(&self) -> bool {
        self.contains(&DependencyKey::of::<T>())
    }

    /// Whether `key` is bound to a singleton whose value has been
    /// constructed. Never triggers construction.
    pub fn is_constructed(&self, key: &DependencyKey) -> bool {
        self.providers
            .get(key)
            .map(|p| p.is_constructed())
            .unwrap_or(false)
    }

    /// Remove the binding for `key`. Returns whether a binding existed.
    pub fn remove(&self, key: &DependencyKey) -> bool {
        let removed = self.providers.remove(key).is_some();

        #[cfg(feature = "logging")]
        if removed {
            debug!(target: "keywire", key = %key, "Removed dependency binding");
        }

        removed
    }

    /// Number of bindings.
    #[inline]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the map has no bindings.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Drop all bindings, including cached singleton values.
    pub fn clear(&self) {
        #[cfg(feature = "logging")]
        debug!(
            target: "keywire",
            bindings_removed = self.providers.len(),
            "Cleared dependency map"
        );

        self.providers.clear();
    }

    /// Snapshot of all bound keys, in no particular order.
    pub fn keys(&self) -> Vec<DependencyKey> {
        self.providers.iter().map(|r| r.key().clone()).collect()
    }

    /// Visit every binding with a fresh (cache-reset) copy of its
    /// provider. Used to seed contextual child maps.
    pub(crate) fn for_each_fresh(&self, mut f: impl FnMut(DependencyKey, Provider)) {
        for entry in self.providers.iter() {
            f(entry.key().clone(), entry.value().fresh());
        }
    }
}

impl Default for DependencyMap {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DependencyMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyMap")
            .field("bindings", &self.len())
            .finish()
    }
}

impl Resolver for DependencyMap {
    #[inline]
    fn resolve_key(&self, key: &DependencyKey) -> Result<AnyValue> {
        self.resolve(key)
    }

    #[inline]
    fn contains_key(&self, key: &DependencyKey) -> bool {
        self.contains(key)
    }
}

/// Erase an infallible constructor into a [`ProviderFn`].
fn erase<T, F>(make: F) -> ProviderFn
where
    T: Send + Sync + 'static,
    F: Fn(&DependencyMap) -> T + Send + Sync + 'static,
{
    Arc::new(move |deps| Ok(Arc::new(make(deps)) as AnyValue))
}

/// Erase a fallible constructor, attaching `key` to any failure.
fn erase_try<T, E, F>(key: DependencyKey, make: F) -> ProviderFn
where
    T: Send + Sync + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
    F: Fn(&DependencyMap) -> std::result::Result<T, E> + Send + Sync + 'static,
{
    Arc::new(move |deps| {
        make(deps)
            .map(|value| Arc::new(value) as AnyValue)
            .map_err(|e| DiError::construction(key.clone(), e))
    })
}

/// Fluent batch registration builder.
///
/// Chainable registration for setting up a map in one expression.
pub struct BatchBuilder<'a> {
    map: &'a DependencyMap,
    #[cfg(feature = "logging")]
    count: usize,
}

impl<'a> BatchBuilder<'a> {
    /// Bind a precomputed value and continue the chain.
    #[inline]
    pub fn instance<T: Send + Sync + 'static>(
        self,
        key: impl Into<DependencyKey>,
        value: T,
    ) -> Self {
        self.map.instance(key, value);
        self.bump()
    }

    /// Bind a factory constructor and continue the chain.
    #[inline]
    pub fn factory<T, F>(self, key: impl Into<DependencyKey>, make: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&DependencyMap) -> T + Send + Sync + 'static,
    {
        self.map.factory(key, make);
        self.bump()
    }

    /// Bind a singleton constructor and continue the chain.
    #[inline]
    pub fn singleton<T, F>(self, key: impl Into<DependencyKey>, make: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&DependencyMap) -> T + Send + Sync + 'static,
    {
        self.map.singleton(key, make);
        self.bump()
    }

    /// Bind a thread-scoped constructor and continue the chain.
    #[inline]
    pub fn thread_scoped<T, F>(self, key: impl Into<DependencyKey>, make: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&DependencyMap) -> T + Send + Sync + 'static,
    {
        self.map.thread_scoped(key, make);
        self.bump()
    }

    /// Finish the batch.
    #[inline]
    pub fn done(self) {
        #[cfg(feature = "logging")]
        debug!(
            target: "keywire",
            bindings_registered = self.count,
            "Batch registration completed"
        );
    }

    #[inline]
    fn bump(self) -> Self {
        Self {
            map: self.map,
            #[cfg(feature = "logging")]
            count: self.count + 1,
        }
    }
}

/// Build an all-instance [`DependencyMap`] from a literal mapping.
///
/// # Examples
///
/// ```rust
/// use keywire::{dependencies, DependencyKey};
///
/// let deps = dependencies! {
///     "host" => "localhost".to_string(),
///     "port" => 5432u16,
/// };
///
/// assert!(deps.contains(&DependencyKey::named("host")));
/// ```
#[macro_export]
macro_rules! dependencies {
    ( $( $key:expr => $value:expr ),* $(,)? ) => {{
        let map = $crate::DependencyMap::new();
        $( map.instance($key, $value); )*
        map
    }};
}
