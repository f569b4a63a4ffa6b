//! Property identities and typed property tokens
//!
//! [`PropertyId`] is the canonical, structurally compared key a value store
//! is indexed by. [`Property<T, V>`] is the typed reference emitted by
//! `#[derive(Tracked)]` as an associated constant of the declaring type;
//! resolving it to a [`PropertyId`] is a constant lookup.

use crate::error::{WatchError, WatchResult};
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

/// Type-erased tracked value
pub type Value = Arc<dyn Any + Send + Sync>;

/// Stable identity of one property on one declaring type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyId {
    declaring_type: &'static str,
    name: &'static str,
    value_type: &'static str,
}

impl PropertyId {
    /// Create identity
    ///
    /// # Arguments
    /// - `declaring_type`: fully qualified name of the declaring type
    /// - `name`: property name
    /// - `value_type`: name of the property's value type
    #[inline]
    #[must_use]
    pub const fn new(
        declaring_type: &'static str,
        name: &'static str,
        value_type: &'static str,
    ) -> Self {
        Self {
            declaring_type,
            name,
            value_type,
        }
    }

    /// Declaring type name
    #[inline]
    #[must_use]
    pub const fn declaring_type(&self) -> &'static str {
        self.declaring_type
    }

    /// Property name
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Value type name
    #[inline]
    #[must_use]
    pub const fn value_type(&self) -> &'static str {
        self.value_type
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self
            .declaring_type
            .rsplit("::")
            .next()
            .unwrap_or(self.declaring_type);
        write!(f, "{}.{}", short, self.name)
    }
}

/// Typed reference to a property of `T` holding values of type `V`
///
/// Carries the base mutator, i.e. the plain assignment the property
/// performs on an untracked instance.
pub struct Property<T, V> {
    id: PropertyId,
    set: fn(&mut T, V),
}

impl<T, V> Property<T, V> {
    /// Create property token
    #[inline]
    #[must_use]
    pub const fn new(id: PropertyId, set: fn(&mut T, V)) -> Self {
        Self { id, set }
    }

    /// Resolve to the property's identity
    #[inline]
    #[must_use]
    pub const fn id(&self) -> PropertyId {
        self.id
    }

    /// Property name
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.id.name
    }

    /// Run the base mutator on `target`
    #[inline]
    pub fn apply_base(&self, target: &mut T, value: V) {
        (self.set)(target, value);
    }
}

impl<T, V> Clone for Property<T, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, V> Copy for Property<T, V> {}

impl<T, V> fmt::Debug for Property<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property").field("id", &self.id).finish()
    }
}

impl<T, V> PartialEq for Property<T, V> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T, V> Eq for Property<T, V> {}

/// Downcast a stored value, cloning it out
///
/// # Errors
/// Returns [`WatchError::TypeMismatch`] if the value is not a `V`.
pub fn downcast_value<V: Clone + 'static>(property: PropertyId, value: &Value) -> WatchResult<V> {
    value
        .downcast_ref::<V>()
        .cloned()
        .ok_or_else(|| WatchError::TypeMismatch {
            property,
            expected: type_name::<V>(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Sample {
        label: String,
    }

    fn set_label(target: &mut Sample, value: String) {
        target.label = value;
    }

    const LABEL: Property<Sample, String> = Property::new(
        PropertyId::new("demo::Sample", "label", "String"),
        set_label,
    );

    #[test]
    fn identity_is_structural() {
        let a = PropertyId::new("demo::Sample", "label", "String");
        let b = PropertyId::new("demo::Sample", "label", "String");
        let c = PropertyId::new("demo::Other", "label", "String");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(LABEL.id(), a);
    }

    #[test]
    fn display_uses_short_type_name() {
        assert_eq!(LABEL.id().to_string(), "Sample.label");
    }

    #[test]
    fn apply_base_assigns() {
        let mut sample = Sample::default();
        LABEL.apply_base(&mut sample, "hello".to_string());
        assert_eq!(sample.label, "hello");
    }

    #[test]
    fn downcast_rejects_wrong_type() {
        let value: Value = Arc::new(42_i32);
        assert_eq!(downcast_value::<i32>(LABEL.id(), &value), Ok(42));
        let err = downcast_value::<String>(LABEL.id(), &value).unwrap_err();
        assert!(matches!(err, WatchError::TypeMismatch { .. }));
    }
}
