//! Call wrapping: operations that self-supply their dependencies.
//!
//! An [`Injector`] is bound to a resolver once. [`Injector::wrap`] takes
//! a declared [`Signature`] and a delegate, classifies the injectable
//! parameters a single time at wrap time, and returns a [`Wrapped`]
//! operation. Each call merges caller-supplied arguments with resolved
//! dependencies and delegates; an explicit caller argument always
//! suppresses injection for its slot.
//!
//! ```rust
//! use keywire::{CallArgs, DependencyMap, Injector, Signature};
//!
//! let deps = DependencyMap::new();
//! deps.instance("greeting", "hello".to_string());
//!
//! let inject = Injector::bind(deps);
//! let greet = inject.wrap(
//!     Signature::new().required("name").inject("greeting", "greeting"),
//!     |args| {
//!         let name = args.get::<String>("name").unwrap();
//!         let greeting = args.get::<String>("greeting").unwrap();
//!         format!("{greeting}, {name}")
//!     },
//! );
//!
//! let out = greet.call(CallArgs::new().pos("world".to_string())).unwrap();
//! assert_eq!(out, "hello, world");
//! ```

use crate::error::{DiError, Result};
use crate::key::DependencyKey;
use crate::map::{DependencyMap, Resolver};
use crate::provider::AnyValue;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Erase a value into the registry's type-erased form.
#[inline]
pub fn erased<T: Send + Sync + 'static>(value: T) -> AnyValue {
    Arc::new(value) as AnyValue
}

/// How a parameter was declared at the operation's definition site.
enum Decl {
    /// No default; the caller must supply it.
    Required,
    /// Ordinary literal default, used when the caller omits the argument.
    Default(AnyValue),
    /// The default identifies a dependency key — an injection point.
    Inject(DependencyKey),
}

struct Param {
    name: &'static str,
    decl: Decl,
}

/// The declared parameter list of an operation, in call order.
///
/// This is the explicit replacement for default-value reflection: each
/// parameter states its name and whether its default is a literal value
/// or a dependency key.
#[derive(Default)]
pub struct Signature {
    params: Vec<Param>,
}

impl Signature {
    /// An empty signature.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a parameter with no default.
    pub fn required(mut self, name: &'static str) -> Self {
        self.params.push(Param {
            name,
            decl: Decl::Required,
        });
        self
    }

    /// Declare a parameter with a literal default value.
    pub fn with_default<T: Send + Sync + 'static>(mut self, name: &'static str, value: T) -> Self {
        self.params.push(Param {
            name,
            decl: Decl::Default(erased(value)),
        });
        self
    }

    /// Declare an injection point: a parameter whose default is the
    /// value resolved for `key`.
    pub fn inject(mut self, name: &'static str, key: impl Into<DependencyKey>) -> Self {
        self.params.push(Param {
            name,
            decl: Decl::Inject(key.into()),
        });
        self
    }

    /// Number of declared parameters.
    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether no parameters are declared.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Arguments supplied by the caller of a wrapped operation.
///
/// Positional arguments fill parameter slots in declaration order;
/// keyword arguments fill by name. Either form in an injectable slot
/// suppresses injection for that call.
#[derive(Default)]
pub struct CallArgs {
    positional: Vec<AnyValue>,
    keyword: Vec<(&'static str, AnyValue)>,
}

impl CallArgs {
    /// No arguments.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn pos<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.positional.push(erased(value));
        self
    }

    /// Supply an argument by parameter name.
    pub fn kw<T: Send + Sync + 'static>(mut self, name: &'static str, value: T) -> Self {
        self.keyword.push((name, erased(value)));
        self
    }
}

/// The merged argument set a delegate receives: one value per declared
/// parameter, in declaration order.
pub struct ArgSet {
    values: Vec<(&'static str, AnyValue)>,
}

impl ArgSet {
    /// The value for parameter `name`, downcast to `T`.
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        let value = self
            .values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| Arc::clone(v))
            .ok_or_else(|| DiError::UnknownParameter {
                name: name.to_string(),
            })?;
        value
            .downcast::<T>()
            .map_err(|_| DiError::type_mismatch::<T>(format!("parameter '{name}'")))
    }

    /// Owned copy of the value for parameter `name`.
    pub fn cloned<T: Clone + Send + Sync + 'static>(&self, name: &str) -> Result<T> {
        self.get::<T>(name).map(|arc| (*arc).clone())
    }

    /// Number of parameters in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The per-slot injection plan, computed once at wrap time.
enum Slot {
    /// Ordinary call-time argument passing; nothing to inject.
    Caller,
    /// Literal default used when the caller omits the argument.
    Literal(AnyValue),
    /// Resolve this key when the caller omits the argument.
    Inject(DependencyKey),
}

struct Planned {
    name: &'static str,
    slot: Slot,
}

/// Produces wrapped operations over one bound resolver.
///
/// Immutable after [`bind`](Injector::bind); cloning shares the binding.
#[derive(Clone)]
pub struct Injector {
    deps: Arc<dyn Resolver>,
}

impl Injector {
    /// Bind an injector over a [`DependencyMap`].
    #[inline]
    pub fn bind(map: DependencyMap) -> Self {
        Self::bind_resolver(Arc::new(map))
    }

    /// Bind an injector over any resolver (a shared map, a contextual
    /// map, a patched overlay).
    #[inline]
    pub fn bind_resolver(deps: Arc<dyn Resolver>) -> Self {
        Self { deps }
    }

    /// Bind an injector over a literal key→value collection, wrapped
    /// in an all-instance [`DependencyMap`].
    ///
    /// See also the [`dependencies!`](crate::dependencies) macro for
    /// mixed value types.
    pub fn bind_values<K, I>(pairs: I) -> Self
    where
        K: Into<DependencyKey>,
        I: IntoIterator<Item = (K, AnyValue)>,
    {
        Self::bind(DependencyMap::from_values(pairs))
    }

    /// The bound resolver.
    #[inline]
    pub fn resolver(&self) -> &Arc<dyn Resolver> {
        &self.deps
    }

    /// Wrap `operation` so that its injectable parameters are supplied
    /// from the bound resolver at call time.
    ///
    /// Classification happens here, once: a parameter declared with
    /// [`Signature::inject`] is an injection point if its key is a
    /// named token (always presumed to denote a dependency) or a type
    /// key currently present in the bound map. A type key absent at
    /// wrap time degrades to ordinary argument passing. The
    /// classification is cached on the returned [`Wrapped`] and never
    /// recomputed per call.
    pub fn wrap<F, R>(&self, signature: Signature, operation: F) -> Wrapped<F>
    where
        F: Fn(ArgSet) -> R,
    {
        let plan: Vec<Planned> = signature
            .params
            .into_iter()
            .map(|param| {
                let slot = match param.decl {
                    Decl::Required => Slot::Caller,
                    Decl::Default(value) => Slot::Literal(value),
                    Decl::Inject(key) => {
                        if key.is_named() || self.deps.contains_key(&key) {
                            Slot::Inject(key)
                        } else {
                            // Type key not bound at wrap time: treat
                            // the slot as an ordinary argument.
                            Slot::Caller
                        }
                    }
                };
                Planned {
                    name: param.name,
                    slot,
                }
            })
            .collect();

        #[cfg(feature = "logging")]
        {
            let injectable = plan
                .iter()
                .filter(|p| matches!(p.slot, Slot::Inject(_)))
                .count();
            if injectable == 0 {
                debug!(
                    target: "keywire",
                    "No injectable parameters found; the wrapper is a pass-through"
                );
            } else {
                debug!(
                    target: "keywire",
                    params = plan.len(),
                    injectable,
                    "Wrapped operation"
                );
            }
        }

        Wrapped {
            op: operation,
            plan: plan.into(),
            deps: Arc::clone(&self.deps),
        }
    }
}

impl std::fmt::Debug for Injector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injector").finish_non_exhaustive()
    }
}

/// An operation wrapped with transparent dependency injection.
///
/// Stateless across calls except via the bound map's own caches.
pub struct Wrapped<F> {
    op: F,
    plan: Arc<[Planned]>,
    deps: Arc<dyn Resolver>,
}

impl<F, R> Wrapped<F>
where
    F: Fn(ArgSet) -> R,
{
    /// Invoke the operation.
    ///
    /// For every injectable parameter the caller did not supply, the
    /// dependency is resolved from the bound map — possibly triggering
    /// one-time singleton construction visible to every wrapped
    /// operation sharing that map. Caller-supplied values win
    /// unconditionally; no resolution happens for those slots.
    ///
    /// The delegate's result propagates unchanged inside `Ok`; the
    /// `Err` cases are resolution and call-shape failures raised
    /// before the delegate runs.
    pub fn call(&self, args: CallArgs) -> Result<R> {
        let CallArgs {
            positional,
            keyword,
        } = args;

        if positional.len() > self.plan.len() {
            return Err(DiError::TooManyArguments {
                expected: self.plan.len(),
                given: positional.len(),
            });
        }

        let mut filled: Vec<Option<AnyValue>> =
            self.plan.iter().map(|_| None).collect();
        for (index, value) in positional.into_iter().enumerate() {
            filled[index] = Some(value);
        }
        for (name, value) in keyword {
            let index = self
                .plan
                .iter()
                .position(|p| p.name == name)
                .ok_or_else(|| DiError::UnknownParameter {
                    name: name.to_string(),
                })?;
            if filled[index].is_some() {
                return Err(DiError::DuplicateArgument {
                    name: self.plan[index].name,
                });
            }
            filled[index] = Some(value);
        }

        let mut values = Vec::with_capacity(self.plan.len());
        for (planned, supplied) in self.plan.iter().zip(filled) {
            let value = match supplied {
                Some(value) => value,
                None => match &planned.slot {
                    Slot::Inject(key) => {
                        #[cfg(feature = "logging")]
                        trace!(
                            target: "keywire",
                            param = planned.name,
                            key = %key,
                            "Injecting parameter"
                        );
                        self.deps.resolve_key(key)?
                    }
                    Slot::Literal(default) => Arc::clone(default),
                    Slot::Caller => {
                        return Err(DiError::MissingArgument { name: planned.name });
                    }
                },
            };
            values.push((planned.name, value));
        }

        Ok((self.op)(ArgSet { values }))
    }

    /// Names of the parameters classified as injection points.
    pub fn injectable_params(&self) -> Vec<&'static str> {
        self.plan
            .iter()
            .filter(|p| matches!(p.slot, Slot::Inject(_)))
            .map(|p| p.name)
            .collect()
    }
}

impl<F> std::fmt::Debug for Wrapped<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wrapped")
            .field("params", &self.plan.len())
            .finish_non_exhaustive()
    }
}
