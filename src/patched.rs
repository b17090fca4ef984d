//! Test-time overlay over a dependency map.
//!
//! A [`PatchedDependencyMap`] sits in front of any [`Resolver`] and
//! answers from its own patch set first, falling back to the target.
//! The point is swapping fakes in under a wrapped operation without
//! touching the global registration state, then throwing the overlay
//! away.

use crate::error::Result;
use crate::key::DependencyKey;
use crate::map::{DependencyMap, Resolver};
use crate::provider::AnyValue;
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

/// An overlay of instance overrides in front of a target resolver.
///
/// # Examples
///
/// ```rust
/// use keywire::{DependencyKey, DependencyMap, PatchedDependencyMap};
/// use std::sync::Arc;
///
/// let real = DependencyMap::new();
/// real.instance("url", "postgres://prod".to_string());
///
/// let patched = PatchedDependencyMap::new(Arc::new(real));
/// patched.patch("url", "sqlite::memory:".to_string());
///
/// let key = DependencyKey::named("url");
/// let url = patched.resolve_as::<String>(&key).unwrap();
/// assert_eq!(*url, "sqlite::memory:");
/// ```
pub struct PatchedDependencyMap {
    target: Arc<dyn Resolver>,
    patched: DashMap<DependencyKey, AnyValue, RandomState>,
}

impl PatchedDependencyMap {
    /// Overlay on top of `target`.
    pub fn new(target: Arc<dyn Resolver>) -> Self {
        Self {
            target,
            patched: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Convenience: overlay on top of an owned [`DependencyMap`].
    pub fn over(map: DependencyMap) -> Self {
        Self::new(Arc::new(map))
    }

    /// Override `key` with a fixed value, shadowing the target's
    /// binding (or lack of one).
    pub fn patch<T: Send + Sync + 'static>(&self, key: impl Into<DependencyKey>, value: T) {
        let key = key.into();

        #[cfg(feature = "logging")]
        debug!(target: "keywire", key = %key, "Patching dependency");

        self.patched.insert(key, Arc::new(value) as AnyValue);
    }

    /// Remove the patch for `key`, restoring the target's behavior.
    /// Returns whether a patch existed.
    pub fn unpatch(&self, key: &DependencyKey) -> bool {
        self.patched.remove(key).is_some()
    }

    /// Drop every patch.
    pub fn clear(&self) {
        self.patched.clear();
    }

    /// Number of active patches.
    #[inline]
    pub fn patch_count(&self) -> usize {
        self.patched.len()
    }

    /// The underlying target resolver.
    #[inline]
    pub fn target(&self) -> &Arc<dyn Resolver> {
        &self.target
    }

    /// Resolve and downcast, patch set first.
    pub fn resolve_as<T: Send + Sync + 'static>(&self, key: &DependencyKey) -> Result<Arc<T>> {
        self.resolve_key(key)?
            .downcast::<T>()
            .map_err(|_| crate::DiError::type_mismatch::<T>(key))
    }
}

impl Resolver for PatchedDependencyMap {
    fn resolve_key(&self, key: &DependencyKey) -> Result<AnyValue> {
        if let Some(value) = self.patched.get(key) {
            return Ok(Arc::clone(&value));
        }
        self.target.resolve_key(key)
    }

    fn contains_key(&self, key: &DependencyKey) -> bool {
        self.patched.contains_key(key) || self.target.contains_key(key)
    }
}

impl std::fmt::Debug for PatchedDependencyMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchedDependencyMap")
            .field("patches", &self.patched.len())
            .finish_non_exhaustive()
    }
}
