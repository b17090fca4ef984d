//! # Keywire - Keyed Dependency Injection for Rust
//!
//! A small dependency-injection toolkit built around two pieces: a
//! keyed provider registry and a call wrapper that supplies missing
//! arguments from it.
//!
//! ## Features
//!
//! - 🔑 **Keyed registry** - bind dependencies to named tokens or types
//! - 🏭 **Lifecycles** - instances, per-resolution factories, memoized
//!   singletons, thread-scoped values
//! - 🔒 **Concurrent** - `DashMap` registry, at-most-once singleton
//!   construction under concurrent first use
//! - 🪄 **Transparent wrapping** - wrapped operations keep their call
//!   shape; callers override any dependency at the call site
//! - 🧪 **Test-friendly** - patched overlays and per-context maps swap
//!   fakes in without touching global registrations
//! - 📊 **Observable** - optional tracing integration with JSON or
//!   pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use keywire::{CallArgs, DependencyMap, Injector, Key, Signature};
//!
//! #[derive(Clone)]
//! struct Database { url: String }
//!
//! let deps = DependencyMap::new();
//! deps.singleton("db", |_| Database { url: "postgres://localhost".into() });
//!
//! let inject = Injector::bind(deps);
//!
//! // Declare which parameters are injection points; the rest are
//! // ordinary arguments.
//! let list_users = inject.wrap(
//!     Signature::new().required("limit").inject("db", Key::new("db")),
//!     |args| {
//!         let limit = *args.get::<usize>("limit").unwrap();
//!         let db = args.get::<Database>("db").unwrap();
//!         format!("{} users from {}", limit, db.url)
//!     },
//! );
//!
//! // The dependency is supplied automatically...
//! let out = list_users.call(CallArgs::new().pos(10usize)).unwrap();
//! assert_eq!(out, "10 users from postgres://localhost");
//!
//! // ...unless the caller overrides it explicitly.
//! let out = list_users
//!     .call(
//!         CallArgs::new()
//!             .pos(10usize)
//!             .kw("db", Database { url: "sqlite::memory:".into() }),
//!     )
//!     .unwrap();
//! assert_eq!(out, "10 users from sqlite::memory:");
//! ```
//!
//! ## Provider Lifecycles
//!
//! ```rust
//! use keywire::DependencyMap;
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! static COUNTER: AtomicU64 = AtomicU64::new(0);
//!
//! let deps = DependencyMap::new();
//!
//! // Instance - a fixed value
//! deps.instance("config", "settings.cfg".to_string());
//!
//! // Factory - constructed on every resolution
//! deps.factory("request_id", |_| COUNTER.fetch_add(1, Ordering::SeqCst));
//!
//! // Singleton - constructed at most once, then shared
//! deps.singleton("pool", |_| vec![0u8; 1024]);
//!
//! // Thread-scoped - constructed at most once per thread
//! deps.thread_scoped("rng_state", |_| 42u64);
//! ```

mod contextual;
mod error;
mod injector;
mod key;
#[cfg(feature = "logging")]
pub mod logging;
mod map;
mod patched;
mod provider;

pub use contextual::ContextualDependencyMap;
pub use error::{DiError, Result};
pub use injector::{ArgSet, CallArgs, Injector, Signature, Wrapped, erased};
pub use key::{DependencyKey, Key};
pub use map::{BatchBuilder, DependencyMap, Resolver};
pub use patched::PatchedDependencyMap;
pub use provider::{AnyValue, Provider, ProviderFn};

// Re-export tracing macros for convenience when logging is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        CallArgs, ContextualDependencyMap, DependencyKey, DependencyMap, DiError, Injector, Key,
        PatchedDependencyMap, Resolver, Result, Signature,
    };
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Shareable hashing function, the shape a `"hash"` capability
    /// would have in an application.
    type HashFn = Arc<dyn Fn(&str) -> u64 + Send + Sync>;

    fn djb2(subject: &str) -> u64 {
        subject
            .bytes()
            .fold(5381u64, |h, b| h.wrapping_mul(33).wrapping_add(b as u64))
    }

    #[test]
    fn hasher_end_to_end() {
        static BUILDS: AtomicU32 = AtomicU32::new(0);

        let deps = DependencyMap::new();
        deps.singleton("hash", |_| {
            BUILDS.fetch_add(1, Ordering::SeqCst);
            Arc::new(djb2) as HashFn
        });

        let inject = Injector::bind(deps);
        let hasher = inject.wrap(
            Signature::new().required("subject").inject("hash", Key::new("hash")),
            |args| {
                let subject = args.get::<String>("subject").unwrap();
                let hash = args.cloned::<HashFn>("hash").unwrap();
                hash(&subject)
            },
        );

        // Resolves the singleton once, hashes through it.
        let digest = hasher
            .call(CallArgs::new().pos("foobarbaz".to_string()))
            .unwrap();
        assert_eq!(digest, djb2("foobarbaz"));

        hasher
            .call(CallArgs::new().pos("again".to_string()))
            .unwrap();
        assert_eq!(BUILDS.load(Ordering::SeqCst), 1);

        // An explicit hash function bypasses resolution entirely.
        let custom: HashFn = Arc::new(|subject| subject.len() as u64);
        let digest = hasher
            .call(CallArgs::new().pos("x".to_string()).kw("hash", custom))
            .unwrap();
        assert_eq!(digest, 1);
        assert_eq!(BUILDS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reregistered_instance_seen_by_following_calls() {
        #[derive(Clone)]
        struct Conn {
            url: String,
        }

        let deps = Arc::new(DependencyMap::new());
        deps.put(Conn { url: "a".into() });

        let inject = Injector::bind_resolver(Arc::clone(&deps) as Arc<dyn Resolver>);
        let op = inject.wrap(
            Signature::new().inject("conn", DependencyKey::of::<Conn>()),
            |args| args.get::<Conn>("conn").unwrap().url.clone(),
        );

        assert_eq!(op.call(CallArgs::new()).unwrap(), "a");

        deps.put(Conn { url: "b".into() });
        assert_eq!(op.call(CallArgs::new()).unwrap(), "b");
    }

    #[test]
    fn concurrent_first_use_constructs_singleton_once() {
        static BUILDS: AtomicU32 = AtomicU32::new(0);

        let deps = Arc::new(DependencyMap::new());
        deps.singleton("hash", |_| {
            BUILDS.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(5));
            Arc::new(djb2) as HashFn
        });

        let inject = Injector::bind_resolver(Arc::clone(&deps) as Arc<dyn Resolver>);
        let op = Arc::new(inject.wrap(
            Signature::new().required("subject").inject("hash", Key::new("hash")),
            |args| {
                let subject = args.get::<String>("subject").unwrap();
                let hash = args.cloned::<HashFn>("hash").unwrap();
                hash(&subject)
            },
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let op = Arc::clone(&op);
                std::thread::spawn(move || {
                    op.call(CallArgs::new().pos("foobarbaz".to_string())).unwrap()
                })
            })
            .collect();

        let expected = djb2("foobarbaz");
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
        assert_eq!(BUILDS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn patched_overlay_swaps_fake_under_wrapped_operation() {
        let real = DependencyMap::new();
        real.instance("url", "postgres://prod".to_string());

        let patched = Arc::new(PatchedDependencyMap::over(real));
        let inject = Injector::bind_resolver(Arc::clone(&patched) as Arc<dyn Resolver>);
        let op = inject.wrap(
            Signature::new().inject("url", Key::new("url")),
            |args| (*args.get::<String>("url").unwrap()).clone(),
        );

        assert_eq!(op.call(CallArgs::new()).unwrap(), "postgres://prod");

        patched.patch("url", "sqlite::memory:".to_string());
        assert_eq!(op.call(CallArgs::new()).unwrap(), "sqlite::memory:");

        patched.clear();
        assert_eq!(op.call(CallArgs::new()).unwrap(), "postgres://prod");
    }

    #[test]
    fn shared_map_constructs_singleton_across_wrapped_operations() {
        static BUILDS: AtomicU32 = AtomicU32::new(0);

        let deps = Arc::new(DependencyMap::new());
        deps.singleton("conn", |_| {
            BUILDS.fetch_add(1, Ordering::SeqCst);
            "shared".to_string()
        });

        let inject = Injector::bind_resolver(Arc::clone(&deps) as Arc<dyn Resolver>);
        let first = inject.wrap(
            Signature::new().inject("conn", Key::new("conn")),
            |args| (*args.get::<String>("conn").unwrap()).clone(),
        );
        let second = inject.wrap(
            Signature::new().inject("conn", Key::new("conn")),
            |args| args.get::<String>("conn").unwrap().len(),
        );

        assert_eq!(first.call(CallArgs::new()).unwrap(), "shared");
        assert_eq!(second.call(CallArgs::new()).unwrap(), 6);
        assert_eq!(BUILDS.load(Ordering::SeqCst), 1);
    }
}
