//! Error types for change watching
//!
//! Provides error handling for:
//! - Proxy type generation (sealed types, non-overridable properties)
//! - Proxy instantiation (unmatched constructor signatures)
//! - Value store operations gated by access mode
//! - Typed reads of values stored under another type

use crate::access::AccessMode;
use crate::property::PropertyId;

/// Broad classification callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid argument; raised at generation or first instantiation, never retried
    Argument,
    /// Operation forbidden by the handle's access mode
    AccessViolation,
    /// Value was never set
    NotFound,
    /// Operation not supported by this store (history disabled)
    Unsupported,
}

/// Main change-watch error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WatchError {
    /// Base type is declared sealed and cannot be proxied
    #[error("type {type_name} is sealed and cannot be proxied")]
    SealedType { type_name: &'static str },

    /// A writable property has a non-overridable mutator
    #[error("the property {property} must be overridable to be tracked")]
    NonOverridableProperty {
        type_name: &'static str,
        property: &'static str,
    },

    /// No base constructor matches the supplied argument types
    #[error("type {type_name} has no constructor taking ({signature})")]
    NoMatchingConstructor {
        type_name: &'static str,
        signature: &'static str,
    },

    /// Requested access mode is looser than the source handle's
    #[error("access mode {requested} is less restrictive than {current}")]
    LooserAccessMode {
        current: AccessMode,
        requested: AccessMode,
    },

    /// Property identity does not belong to the bound type
    #[error("property {property} is not declared on {type_name}")]
    UnknownProperty {
        type_name: &'static str,
        property: String,
    },

    /// Stored value is not of the requested type
    #[error("value of {property} is not a {expected}")]
    TypeMismatch {
        property: PropertyId,
        expected: &'static str,
    },

    /// Cached proxy type has an unexpected concrete type
    #[error("cached proxy type for {type_name} has an unexpected type")]
    CacheTypeMismatch { type_name: &'static str },

    /// Operation forbidden by the access mode
    #[error("cannot {operation} on a watcher with access mode {mode}")]
    AccessViolation {
        mode: AccessMode,
        operation: &'static str,
    },

    /// No current value for the property
    #[error("no value set for {property}")]
    NotFound { property: PropertyId },

    /// History operation on a store built without history logging
    #[error("history logging is disabled for this watcher")]
    HistoryDisabled,
}

impl WatchError {
    /// Classify the error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SealedType { .. }
            | Self::NonOverridableProperty { .. }
            | Self::NoMatchingConstructor { .. }
            | Self::LooserAccessMode { .. }
            | Self::UnknownProperty { .. }
            | Self::TypeMismatch { .. }
            | Self::CacheTypeMismatch { .. } => ErrorKind::Argument,
            Self::AccessViolation { .. } => ErrorKind::AccessViolation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::HistoryDisabled => ErrorKind::Unsupported,
        }
    }

    /// Check if the caller is expected to branch on this error rather than abort
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::AccessViolation | ErrorKind::NotFound)
    }

    /// Create access violation error
    #[inline]
    pub(crate) fn access_violation(mode: AccessMode, operation: &'static str) -> Self {
        Self::AccessViolation { mode, operation }
    }
}

/// Result type alias for change-watch operations
pub type WatchResult<T> = Result<T, WatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sealed_type_display() {
        let err = WatchError::SealedType { type_name: "Foo" };
        assert_eq!(err.to_string(), "type Foo is sealed and cannot be proxied");
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn non_overridable_names_property() {
        let err = WatchError::NonOverridableProperty {
            type_name: "Foo",
            property: "age",
        };
        assert!(err.to_string().contains("age"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn access_violation_is_recoverable() {
        let err = WatchError::access_violation(AccessMode::NoSet, "set");
        assert_eq!(err.kind(), ErrorKind::AccessViolation);
        assert!(err.is_recoverable());
        assert_eq!(
            err.to_string(),
            "cannot set on a watcher with access mode NoSet"
        );
    }

    #[test]
    fn history_disabled_is_unsupported() {
        assert_eq!(WatchError::HistoryDisabled.kind(), ErrorKind::Unsupported);
    }
}
