//! Proxy instances
//!
//! A [`Proxy<T>`] owns a base value and its embedded, write-once
//! `ReadWrite` store. Reads go through `Deref`; writes go through the
//! generated setters trait (via [`Assign<T>`]), which run the base mutator
//! first and record second, so the store never holds a value the field does
//! not.

use crate::access::AccessMode;
use crate::descriptor::{Assign, Trackable};
use crate::error::{WatchError, WatchResult};
use crate::factory::ProxyType;
use crate::property::Property;
use crate::view::TypedView;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Instance of a generated proxy type
pub struct Proxy<T: Trackable> {
    target: T,
    store: TypedView<T>,
    proxy_type: Arc<ProxyType<T>>,
}

impl<T: Trackable> Proxy<T> {
    pub(crate) fn from_parts(target: T, store: TypedView<T>, proxy_type: Arc<ProxyType<T>>) -> Self {
        Self {
            target,
            store,
            proxy_type,
        }
    }

    /// Generated type this instance belongs to
    #[inline]
    #[must_use]
    pub fn proxy_type(&self) -> &Arc<ProxyType<T>> {
        &self.proxy_type
    }

    /// `NoSet` view onto the embedded store
    ///
    /// The view can read and clear tracked state but never write it, so the
    /// store only ever changes through the proxy's own setters.
    #[must_use]
    pub fn watcher(&self) -> TypedView<T> {
        TypedView::from_store(self.store_copy(AccessMode::NoSet))
    }

    /// View onto the embedded store with an explicit mode
    ///
    /// # Errors
    /// Returns [`WatchError::LooserAccessMode`] for `ReadWrite`.
    pub fn watcher_with(&self, mode: AccessMode) -> WatchResult<TypedView<T>> {
        AccessMode::NoSet.validate_transition(mode)?;
        Ok(TypedView::from_store(self.store_copy(mode)))
    }

    /// Re-apply a snapshot through the tracked setters
    ///
    /// Unlike [`TypedView::load_to_instance`], every applied value is
    /// recorded in this proxy's store.
    ///
    /// # Errors
    /// Returns [`WatchError::UnknownProperty`] for a snapshot identity this
    /// proxy does not track, or [`WatchError::TypeMismatch`].
    pub fn load_from(&mut self, snapshot: &TypedView<T>) -> WatchResult<&mut Self> {
        for (id, value) in snapshot.values() {
            let descriptor =
                self.proxy_type
                    .override_for(id)
                    .ok_or_else(|| WatchError::UnknownProperty {
                        type_name: T::TYPE_NAME,
                        property: id.to_string(),
                    })?;
            descriptor.apply(&mut self.target, &value)?;
            self.store.store().commit(id, value);
        }
        Ok(self)
    }

    /// Release the base value; the embedded store goes with the proxy
    #[must_use]
    pub fn into_inner(self) -> T {
        self.target
    }

    /// Base value, mutable without tracking
    pub(crate) fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    /// Embedded `ReadWrite` store
    pub(crate) fn embedded(&self) -> &TypedView<T> {
        &self.store
    }

    fn store_copy(&self, mode: AccessMode) -> crate::store::ValueStore {
        self.store.store().narrowed(mode)
    }
}

impl<T: Trackable> Deref for Proxy<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.target
    }
}

impl<T: Trackable> Assign<T> for Proxy<T> {
    fn assign<V>(&mut self, property: &Property<T, V>, value: V)
    where
        V: Clone + Send + Sync + 'static,
    {
        let recorded = value.clone();
        property.apply_base(&mut self.target, value);
        self.store.store().commit(property.id(), Arc::new(recorded));
    }
}

impl<T: Trackable + fmt::Debug> fmt::Debug for Proxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("type", &self.proxy_type.name())
            .field("target", &self.target)
            .field("store", &self.store)
            .finish()
    }
}
