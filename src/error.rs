//! Error types for dependency resolution and call wrapping.

use crate::key::DependencyKey;
use thiserror::Error;

/// Errors surfaced by the registry and by wrapped operations.
///
/// Resolution errors (`UnknownDependency`, `ConstructionFailed`,
/// `TypeMismatch`) come from the [`DependencyMap`](crate::DependencyMap);
/// the call-shape errors come from [`Wrapped::call`](crate::Wrapped::call)
/// before the delegate runs. Failures of the delegate itself are never
/// translated into this type.
#[derive(Error, Debug)]
pub enum DiError {
    /// No provider is bound for the key.
    #[error("no provider registered for dependency {key}")]
    UnknownDependency {
        /// The key that was looked up.
        key: DependencyKey,
    },

    /// A factory or singleton constructor failed.
    ///
    /// For a singleton the cache stays empty; the next resolution
    /// retries construction.
    #[error("failed to construct dependency {key}")]
    ConstructionFailed {
        /// The key whose constructor failed.
        key: DependencyKey,
        /// The constructor's own error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A resolved or supplied value was not of the requested type.
    #[error("value for {what} is not of type {expected}")]
    TypeMismatch {
        /// Key or parameter name the value was looked up under.
        what: String,
        /// The type the caller asked for.
        expected: &'static str,
    },

    /// A required parameter was neither supplied nor injectable.
    #[error("missing argument for parameter '{name}'")]
    MissingArgument {
        /// Declared parameter name.
        name: &'static str,
    },

    /// A parameter received both a positional and a keyword value.
    #[error("got multiple values for parameter '{name}'")]
    DuplicateArgument {
        /// Declared parameter name.
        name: &'static str,
    },

    /// A keyword argument named a parameter not in the signature.
    #[error("unknown parameter '{name}'")]
    UnknownParameter {
        /// The name the caller used.
        name: String,
    },

    /// More positional arguments than declared parameters.
    #[error("too many positional arguments: expected at most {expected}, got {given}")]
    TooManyArguments {
        /// Number of declared parameters.
        expected: usize,
        /// Number of positional arguments supplied.
        given: usize,
    },
}

impl DiError {
    /// An `UnknownDependency` for `key`.
    #[inline]
    pub fn unknown(key: impl Into<DependencyKey>) -> Self {
        Self::UnknownDependency { key: key.into() }
    }

    /// A `ConstructionFailed` for `key`.
    #[inline]
    pub fn construction(
        key: impl Into<DependencyKey>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ConstructionFailed {
            key: key.into(),
            source: source.into(),
        }
    }

    /// A `TypeMismatch` where the value for `what` was expected to be `T`.
    #[inline]
    pub fn type_mismatch<T>(what: impl std::fmt::Display) -> Self {
        Self::TypeMismatch {
            what: what.to_string(),
            expected: std::any::type_name::<T>(),
        }
    }
}

/// Result type alias for registry and wrapper operations.
pub type Result<T> = std::result::Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_mentions_key() {
        let err = DiError::unknown("hash");
        assert_eq!(
            err.to_string(),
            "no provider registered for dependency 'hash'"
        );
    }

    #[test]
    fn construction_carries_source() {
        use std::error::Error;

        let err = DiError::construction("db", "connection refused");
        assert!(err.source().is_some());
        assert_eq!(err.source().unwrap().to_string(), "connection refused");
    }

    #[test]
    fn type_mismatch_names_expected_type() {
        let err = DiError::type_mismatch::<u32>("'hash'");
        assert!(err.to_string().contains("u32"));
    }
}
