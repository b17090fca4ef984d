//! Provider variants describing how a dependency's value is produced.
//!
//! A [`Provider`] is the registered recipe for one dependency key:
//!
//! - [`Provider::Instance`] — a precomputed value, returned unchanged
//! - [`Provider::Factory`] — constructor runs on every resolution
//! - [`Provider::Singleton`] — constructor runs at most once, result cached
//! - [`Provider::ThreadScoped`] — constructor runs at most once per thread
//!
//! Constructors receive the [`DependencyMap`] they are registered in so
//! they may resolve their own dependencies. They must not register new
//! providers while resolution is in flight.

use crate::error::Result;
use crate::map::DependencyMap;
use ahash::RandomState;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::any::Any;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// A type-erased dependency value as stored in and returned by the registry.
pub type AnyValue = Arc<dyn Any + Send + Sync>;

/// A type-erased, fallible constructor.
///
/// Infallible constructors are wrapped into this shape at registration
/// time; fallible ones carry their key so a failure surfaces as
/// [`DiError::ConstructionFailed`](crate::DiError::ConstructionFailed).
pub type ProviderFn = Arc<dyn Fn(&DependencyMap) -> Result<AnyValue> + Send + Sync>;

/// The registered recipe for producing a dependency's value.
pub enum Provider {
    /// Precomputed value; resolution returns it unchanged, every time.
    Instance(AnyValue),

    /// Constructor invoked fresh on every resolution, no caching.
    Factory(ProviderFn),

    /// Constructor invoked at most once; the result is cached and
    /// shared. A failed construction leaves the cell empty so the next
    /// resolution retries.
    Singleton {
        /// The constructor.
        init: ProviderFn,
        /// Memoization cell; empty until the first successful construction.
        cell: OnceCell<AnyValue>,
    },

    /// Constructor invoked at most once per thread; each thread gets
    /// its own cached value.
    ThreadScoped {
        /// The constructor.
        init: ProviderFn,
        /// Per-thread cache.
        cache: DashMap<ThreadId, AnyValue, RandomState>,
    },
}

impl Provider {
    /// Wrap a precomputed value.
    #[inline]
    pub fn instance<T: Send + Sync + 'static>(value: T) -> Self {
        Self::Instance(Arc::new(value) as AnyValue)
    }

    /// Wrap a constructor that runs on every resolution.
    #[inline]
    pub fn factory(init: ProviderFn) -> Self {
        Self::Factory(init)
    }

    /// Wrap a constructor that runs at most once.
    #[inline]
    pub fn singleton(init: ProviderFn) -> Self {
        Self::Singleton {
            init,
            cell: OnceCell::new(),
        }
    }

    /// Wrap a constructor that runs at most once per thread.
    #[inline]
    pub fn thread_scoped(init: ProviderFn) -> Self {
        Self::ThreadScoped {
            init,
            cache: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Produce this provider's value.
    ///
    /// `deps` is the map the provider is registered in; constructors
    /// receive it so they can resolve collaborators.
    pub fn resolve(&self, deps: &DependencyMap) -> Result<AnyValue> {
        match self {
            Self::Instance(value) => Ok(Arc::clone(value)),
            Self::Factory(init) => init(deps),
            Self::Singleton { init, cell } => {
                // get_or_try_init holds its lock only across the
                // check-and-construct sequence; a failed init leaves
                // the cell unconstructed.
                cell.get_or_try_init(|| init(deps)).map(Arc::clone)
            }
            Self::ThreadScoped { init, cache } => {
                let id = thread::current().id();
                if let Some(value) = cache.get(&id) {
                    return Ok(Arc::clone(&value));
                }
                let value = init(deps)?;
                cache.insert(id, Arc::clone(&value));
                Ok(value)
            }
        }
    }

    /// Clone the recipe with all caches reset.
    ///
    /// Used to seed contextual child maps: the constructor is shared,
    /// but singleton and per-thread state starts fresh.
    pub fn fresh(&self) -> Self {
        match self {
            Self::Instance(value) => Self::Instance(Arc::clone(value)),
            Self::Factory(init) => Self::Factory(Arc::clone(init)),
            Self::Singleton { init, .. } => Self::singleton(Arc::clone(init)),
            Self::ThreadScoped { init, .. } => Self::thread_scoped(Arc::clone(init)),
        }
    }

    /// Short lifecycle label for logging.
    #[inline]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Instance(_) => "instance",
            Self::Factory(_) => "factory",
            Self::Singleton { .. } => "singleton",
            Self::ThreadScoped { .. } => "thread",
        }
    }

    /// Whether the singleton cache has been populated.
    ///
    /// `false` for every non-singleton variant. Never triggers
    /// construction.
    #[inline]
    pub fn is_constructed(&self) -> bool {
        match self {
            Self::Singleton { cell, .. } => cell.get().is_some(),
            _ => false,
        }
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("kind", &self.kind())
            .finish()
    }
}
