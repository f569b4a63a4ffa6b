//! Typed facade over a value store
//!
//! [`TypedView<T>`] binds a [`ValueStore`] to one trackable type and accepts
//! [`Property<T, V>`] tokens instead of raw identities.

use crate::access::AccessMode;
use crate::descriptor::{PropertyDescriptor, Trackable};
use crate::error::{WatchError, WatchResult};
use crate::property::{downcast_value, Property, PropertyId};
use crate::store::{PropertyChange, SubscriptionId, ValueStore, Values};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Value store bound to the properties of `T`
pub struct TypedView<T> {
    store: ValueStore,
    _type: PhantomData<fn() -> T>,
}

impl<T: Trackable> TypedView<T> {
    /// Create an empty `ReadWrite` view
    #[must_use]
    pub fn new(log_history: bool) -> Self {
        Self::from_store(ValueStore::new(log_history))
    }

    /// Bind an existing store handle
    #[must_use]
    pub fn from_store(store: ValueStore) -> Self {
        Self {
            store,
            _type: PhantomData,
        }
    }

    /// Create a view seeded with every property value of `initial`
    #[must_use]
    pub fn from_instance(initial: &T, log_history: bool) -> Self {
        let view = Self::new(log_history);
        for descriptor in T::PROPERTIES {
            view.store.commit(descriptor.id(), descriptor.read(initial));
        }
        view
    }

    /// Underlying store handle
    #[inline]
    #[must_use]
    pub fn store(&self) -> &ValueStore {
        &self.store
    }

    /// Access mode of this handle
    #[inline]
    #[must_use]
    pub fn access_mode(&self) -> AccessMode {
        self.store.access_mode()
    }

    /// Whether history is being logged
    #[inline]
    #[must_use]
    pub fn logs_history(&self) -> bool {
        self.store.logs_history()
    }

    /// Resolve a property name of `T` to its identity
    ///
    /// # Errors
    /// Returns [`WatchError::UnknownProperty`] if `T` has no such property.
    pub fn resolve_name(&self, name: &str) -> WatchResult<PropertyId> {
        T::property_named(name)
            .map(PropertyDescriptor::id)
            .ok_or_else(|| WatchError::UnknownProperty {
                type_name: T::TYPE_NAME,
                property: name.to_string(),
            })
    }

    /// Create a view sharing this view's store
    ///
    /// # Errors
    /// Returns [`WatchError::LooserAccessMode`] if `mode` is less restrictive.
    pub fn reference_copy(&self, mode: AccessMode) -> WatchResult<Self> {
        self.store.reference_copy(mode).map(Self::from_store)
    }

    /// Record a value
    ///
    /// # Errors
    /// Returns [`WatchError::AccessViolation`] unless the mode is `ReadWrite`.
    pub fn set<V>(&self, property: &Property<T, V>, value: V) -> WatchResult<&Self>
    where
        V: Send + Sync + 'static,
    {
        self.store.set(property.id(), Arc::new(value))?;
        Ok(self)
    }

    /// Record a value only if none is present
    ///
    /// # Errors
    /// Returns [`WatchError::AccessViolation`] if a write is needed and the
    /// mode forbids it.
    pub fn set_if_empty<V>(&self, property: &Property<T, V>, value: V) -> WatchResult<&Self>
    where
        V: Send + Sync + 'static,
    {
        self.store.set_if_empty(property.id(), Arc::new(value))?;
        Ok(self)
    }

    /// Current value
    ///
    /// # Errors
    /// Returns [`WatchError::NotFound`] if unset, or
    /// [`WatchError::TypeMismatch`] if stored under another type.
    pub fn get<V>(&self, property: &Property<T, V>) -> WatchResult<V>
    where
        V: Clone + 'static,
    {
        let value = self.store.get(property.id())?;
        downcast_value(property.id(), &value)
    }

    /// Current value, if one of type `V` is present
    #[must_use]
    pub fn try_get<V>(&self, property: &Property<T, V>) -> Option<V>
    where
        V: Clone + 'static,
    {
        self.store
            .try_get(property.id())
            .and_then(|value| value.downcast_ref::<V>().cloned())
    }

    /// Whether the property has a current value
    #[must_use]
    pub fn has_value<V>(&self, property: &Property<T, V>) -> bool {
        self.store.has_value(property.id())
    }

    /// Remove all current values
    ///
    /// # Errors
    /// Returns [`WatchError::AccessViolation`] under `ReadOnly`.
    pub fn clear(&self) -> WatchResult<&Self> {
        self.store.clear()?;
        Ok(self)
    }

    /// Remove one current value
    ///
    /// # Errors
    /// Returns [`WatchError::AccessViolation`] under `ReadOnly`.
    pub fn clear_property<V>(&self, property: &Property<T, V>) -> WatchResult<&Self> {
        self.store.clear_property(property.id())?;
        Ok(self)
    }

    /// Values written to a property, oldest first
    ///
    /// # Errors
    /// Returns [`WatchError::HistoryDisabled`] if history is not logged, or
    /// [`WatchError::TypeMismatch`] if an entry is not a `V`.
    pub fn history<V>(&self, property: &Property<T, V>) -> WatchResult<TypedHistory<V>>
    where
        V: Clone + 'static,
    {
        let entries = self
            .store
            .history(property.id())?
            .map(|value| downcast_value(property.id(), &value))
            .collect::<WatchResult<Vec<V>>>()?;
        Ok(TypedHistory {
            inner: entries.into_iter(),
        })
    }

    /// Remove all history entries
    ///
    /// # Errors
    /// See [`ValueStore::clear_history`].
    pub fn clear_history(&self) -> WatchResult<&Self> {
        self.store.clear_history()?;
        Ok(self)
    }

    /// Remove history entries of one property
    ///
    /// # Errors
    /// See [`ValueStore::clear_history`].
    pub fn clear_property_history<V>(&self, property: &Property<T, V>) -> WatchResult<&Self> {
        self.store.clear_property_history(property.id())?;
        Ok(self)
    }

    /// Snapshot of all current values
    #[must_use]
    pub fn values(&self) -> Values {
        self.store.values()
    }

    /// Register a change listener
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&PropertyChange) + Send + Sync + 'static,
    {
        self.store.subscribe(listener)
    }

    /// Remove a change listener
    pub fn unsubscribe(&self, subscription: SubscriptionId) -> bool {
        self.store.unsubscribe(subscription)
    }

    /// Apply every stored value onto `target` through its base mutator
    ///
    /// # Errors
    /// Returns [`WatchError::UnknownProperty`] for a stored identity that is
    /// not a property of `T`, or [`WatchError::TypeMismatch`]. Values applied
    /// before the failing one stay applied.
    pub fn load_to_instance<'t>(&self, target: &'t mut T) -> WatchResult<&'t mut T> {
        for (id, value) in self.values() {
            let descriptor = T::property(id).ok_or_else(|| WatchError::UnknownProperty {
                type_name: T::TYPE_NAME,
                property: id.to_string(),
            })?;
            descriptor.apply(target, &value)?;
        }
        Ok(target)
    }
}

impl<T> fmt::Debug for TypedView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedView").field("store", &self.store).finish()
    }
}

/// Typed history of one property, oldest first
#[derive(Debug, Clone)]
pub struct TypedHistory<V> {
    inner: std::vec::IntoIter<V>,
}

impl<V> Iterator for TypedHistory<V> {
    type Item = V;

    fn next(&mut self) -> Option<V> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> ExactSizeIterator for TypedHistory<V> {}
