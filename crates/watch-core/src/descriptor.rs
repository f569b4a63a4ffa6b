//! Base type descriptions
//!
//! A [`Trackable`] type describes itself through constant tables: its
//! properties (with their base mutators) and its constructors. The tables
//! are emitted by `#[derive(Tracked)]` and are what the proxy type factory
//! generates proxy types from.
//!
//! # Mutator dispatch
//!
//! Writes go through [`Assign<T>`]. A plain `T` assigns directly. A
//! [`Proxy<T>`](crate::Proxy) assigns, then records. An [`Init<T>`] handed to
//! a base constructor assigns, then records only when a store is attached,
//! which is exactly the case while a proxy is being constructed.

use crate::error::{WatchError, WatchResult};
use crate::property::{downcast_value, Property, PropertyId, Value};
use crate::view::TypedView;
use std::any::{Any, TypeId};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// A type whose properties can be tracked
///
/// Implemented by `#[derive(Tracked)]`. `Default` plays the role of the
/// zero-initialized allocation a constructor body runs against.
pub trait Trackable: Default + 'static {
    /// Fully qualified type name
    const TYPE_NAME: &'static str;

    /// Sealed types cannot be proxied
    const SEALED: bool;

    /// Property table
    const PROPERTIES: &'static [PropertyDescriptor<Self>];

    /// Constructor table
    const CONSTRUCTORS: &'static [ConstructorDescriptor<Self>];

    /// Look up a property by identity
    #[must_use]
    fn property(id: PropertyId) -> Option<&'static PropertyDescriptor<Self>> {
        Self::PROPERTIES.iter().find(|p| p.id() == id)
    }

    /// Look up a property by name
    #[must_use]
    fn property_named(name: &str) -> Option<&'static PropertyDescriptor<Self>> {
        Self::PROPERTIES.iter().find(|p| p.id().name() == name)
    }
}

/// Runtime description of one writable property
pub struct PropertyDescriptor<T> {
    id: PropertyId,
    overridable: bool,
    apply: fn(&mut T, &Value) -> WatchResult<()>,
    read: fn(&T) -> Value,
}

impl<T> PropertyDescriptor<T> {
    /// Describe a property whose mutator a proxy may override
    #[must_use]
    pub const fn overridable(
        id: PropertyId,
        apply: fn(&mut T, &Value) -> WatchResult<()>,
        read: fn(&T) -> Value,
    ) -> Self {
        Self {
            id,
            overridable: true,
            apply,
            read,
        }
    }

    /// Describe a property whose mutator is sealed
    #[must_use]
    pub const fn sealed(
        id: PropertyId,
        apply: fn(&mut T, &Value) -> WatchResult<()>,
        read: fn(&T) -> Value,
    ) -> Self {
        Self {
            id,
            overridable: false,
            apply,
            read,
        }
    }

    /// Property identity
    #[inline]
    #[must_use]
    pub const fn id(&self) -> PropertyId {
        self.id
    }

    /// Whether a proxy may override the mutator
    #[inline]
    #[must_use]
    pub const fn is_overridable(&self) -> bool {
        self.overridable
    }

    /// Run the base mutator with a type-erased value
    ///
    /// # Errors
    /// Returns [`WatchError::TypeMismatch`] if `value` has the wrong type.
    pub fn apply(&self, target: &mut T, value: &Value) -> WatchResult<()> {
        (self.apply)(target, value)
    }

    /// Read the current field value off an instance
    #[must_use]
    pub fn read(&self, target: &T) -> Value {
        (self.read)(target)
    }
}

impl<T> fmt::Debug for PropertyDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("id", &self.id)
            .field("overridable", &self.overridable)
            .finish()
    }
}

/// Boxed constructor arguments (a tuple)
pub type ConstructorArgs = Box<dyn Any + Send>;

/// Runtime description of one constructor
///
/// A constructor is an initializer run against `T::default()` through an
/// [`Init`] context. Its signature is the `TypeId` of its argument tuple.
pub struct ConstructorDescriptor<T> {
    name: &'static str,
    params: &'static [&'static str],
    signature: fn() -> TypeId,
    invoke: fn(&mut Init<'_, T>, ConstructorArgs) -> WatchResult<()>,
}

impl<T> ConstructorDescriptor<T> {
    /// Describe constructor
    ///
    /// # Arguments
    /// - `name`: initializer name
    /// - `params`: parameter type names, for diagnostics
    /// - `signature`: `TypeId::of` the argument tuple
    /// - `invoke`: unpacks the tuple and runs the initializer
    #[must_use]
    pub const fn new(
        name: &'static str,
        params: &'static [&'static str],
        signature: fn() -> TypeId,
        invoke: fn(&mut Init<'_, T>, ConstructorArgs) -> WatchResult<()>,
    ) -> Self {
        Self {
            name,
            params,
            signature,
            invoke,
        }
    }

    /// Initializer name
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Parameter type names
    #[inline]
    #[must_use]
    pub const fn params(&self) -> &'static [&'static str] {
        self.params
    }

    /// Whether this constructor takes the argument tuple `A`
    #[must_use]
    pub fn accepts<A: Any>(&self) -> bool {
        (self.signature)() == TypeId::of::<A>()
    }

    /// Run the initializer
    ///
    /// # Errors
    /// Propagates the initializer's error.
    pub fn invoke(&self, init: &mut Init<'_, T>, args: ConstructorArgs) -> WatchResult<()> {
        (self.invoke)(init, args)
    }
}

impl<T> fmt::Debug for ConstructorDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

/// Find the constructor of `T` taking the argument tuple `A`
pub(crate) fn find_constructor<T, A: Any>(
    constructors: &'static [ConstructorDescriptor<T>],
) -> Option<&'static ConstructorDescriptor<T>> {
    constructors.iter().find(|c| c.accepts::<A>())
}

/// Unpack boxed constructor arguments
///
/// # Errors
/// Returns [`WatchError::NoMatchingConstructor`] if the box does not hold `A`.
pub fn downcast_args<T: Trackable, A: Any>(args: ConstructorArgs) -> WatchResult<A> {
    args.downcast::<A>()
        .map(|boxed| *boxed)
        .map_err(|_| WatchError::NoMatchingConstructor {
            type_name: T::TYPE_NAME,
            signature: std::any::type_name::<A>(),
        })
}

/// Write access to a property of `T`, routed through the active dispatch
pub trait Assign<T> {
    /// Assign `value` to `property`
    fn assign<V>(&mut self, property: &Property<T, V>, value: V)
    where
        V: Clone + Send + Sync + 'static;
}

impl<T: Trackable> Assign<T> for T {
    fn assign<V>(&mut self, property: &Property<T, V>, value: V)
    where
        V: Clone + Send + Sync + 'static,
    {
        property.apply_base(self, value);
    }
}

/// Construction context handed to base constructors
///
/// When a proxy is being constructed its store is already attached, so
/// every assignment the constructor body makes is tracked even though the
/// object is not fully constructed yet. That ordering is deliberate and
/// observable; constructors should not rely on it being otherwise.
///
/// `DerefMut` reaches the value itself for skipped fields. Writes made that
/// way bypass the store, so tracked fields must still go through the setters.
pub struct Init<'a, T> {
    target: &'a mut T,
    store: Option<&'a TypedView<T>>,
}

impl<'a, T: Trackable> Init<'a, T> {
    pub(crate) fn untracked(target: &'a mut T) -> Self {
        Self {
            target,
            store: None,
        }
    }

    pub(crate) fn tracked(target: &'a mut T, store: &'a TypedView<T>) -> Self {
        Self {
            target,
            store: Some(store),
        }
    }

    /// Whether assignments are being recorded
    #[inline]
    #[must_use]
    pub fn is_tracked(&self) -> bool {
        self.store.is_some()
    }
}

impl<T> Deref for Init<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.target
    }
}

impl<T> DerefMut for Init<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.target
    }
}

impl<T: Trackable> Assign<T> for Init<'_, T> {
    fn assign<V>(&mut self, property: &Property<T, V>, value: V)
    where
        V: Clone + Send + Sync + 'static,
    {
        match self.store {
            Some(store) => {
                let recorded = value.clone();
                property.apply_base(self.target, value);
                store.store().commit(property.id(), Arc::new(recorded));
            }
            None => property.apply_base(self.target, value),
        }
    }
}

/// Construct a plain, untracked `T` through one of its constructors
///
/// # Errors
/// Returns [`WatchError::NoMatchingConstructor`] if no constructor takes `A`.
pub fn construct<T: Trackable, A: Any + Send>(args: A) -> WatchResult<T> {
    let constructor = find_constructor::<T, A>(T::CONSTRUCTORS).ok_or(
        WatchError::NoMatchingConstructor {
            type_name: T::TYPE_NAME,
            signature: std::any::type_name::<A>(),
        },
    )?;
    let mut target = T::default();
    constructor.invoke(&mut Init::untracked(&mut target), Box::new(args))?;
    Ok(target)
}

/// Helper for derived `apply` functions
///
/// # Errors
/// Returns [`WatchError::TypeMismatch`] if `value` is not a `V`.
pub fn apply_erased<T, V>(property: &Property<T, V>, target: &mut T, value: &Value) -> WatchResult<()>
where
    V: Clone + 'static,
{
    let value = downcast_value::<V>(property.id(), value)?;
    property.apply_base(target, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tracked;

    #[derive(Debug, Default, Tracked)]
    #[tracked(constructor(with_count(u32)))]
    struct Counter {
        count: u32,
        label: String,
        #[tracked(skip)]
        origin: u32,
    }

    impl Counter {
        fn with_count(this: &mut Init<'_, Self>, count: u32) {
            this.origin = count;
            this.set_count(count);
            this.set_label(format!("counter {count}"));
        }
    }

    #[test]
    fn derive_emits_property_table() {
        let names: Vec<_> = Counter::PROPERTIES.iter().map(|p| p.id().name()).collect();
        assert_eq!(names, vec!["count", "label"]);
        assert!(Counter::PROPERTIES.iter().all(PropertyDescriptor::is_overridable));
        assert!(!Counter::SEALED);
        assert_eq!(Counter::property(Counter::COUNT.id()).map(|p| p.id()), Some(Counter::COUNT.id()));
        assert!(Counter::property_named("missing").is_none());
    }

    #[test]
    fn plain_setters_assign_directly() {
        let mut counter = Counter::default();
        counter.set_count(3);
        assert_eq!(counter.count, 3);
    }

    #[test]
    fn construct_runs_initializer_untracked() {
        let counter: Counter = construct((5_u32,)).unwrap();
        assert_eq!(counter.count, 5);
        assert_eq!(counter.label, "counter 5");
        assert_eq!(counter.origin, 5);
    }

    #[test]
    fn tracked_init_records_setters_only() {
        let store = TypedView::<Counter>::new(false);
        let mut counter = Counter::default();
        {
            let mut init = Init::tracked(&mut counter, &store);
            assert!(init.is_tracked());
            init.origin = 11;
            init.set_count(2);
        }

        assert_eq!(counter.origin, 11);
        assert_eq!(counter.count, 2);
        assert_eq!(store.get(&Counter::COUNT).unwrap(), 2);
        let recorded: Vec<_> = store.values().map(|(id, _)| id).collect();
        assert_eq!(recorded, vec![Counter::COUNT.id()]);
    }

    #[test]
    fn construct_rejects_unknown_signature() {
        let err = construct::<Counter, _>(("five",)).unwrap_err();
        assert!(matches!(err, WatchError::NoMatchingConstructor { .. }));
    }

    #[test]
    fn declared_constructor_replaces_default() {
        assert_eq!(Counter::CONSTRUCTORS.len(), 1);
        assert_eq!(Counter::CONSTRUCTORS[0].params(), &["u32"]);
        assert!(construct::<Counter, _>(()).is_err());
    }

    #[test]
    fn erased_apply_checks_type() {
        let mut counter = Counter::default();
        let descriptor = Counter::property(Counter::COUNT.id()).unwrap();

        descriptor.apply(&mut counter, &(Arc::new(9_u32) as Value)).unwrap();
        assert_eq!(counter.count, 9);

        let err = descriptor
            .apply(&mut counter, &(Arc::new("nine") as Value))
            .unwrap_err();
        assert!(matches!(err, WatchError::TypeMismatch { .. }));
    }

    #[test]
    fn read_snapshots_field() {
        let counter = Counter {
            count: 4,
            label: "x".into(),
            origin: 0,
        };
        let descriptor = Counter::property(Counter::LABEL.id()).unwrap();
        let value = descriptor.read(&counter);
        assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("x"));
    }
}
