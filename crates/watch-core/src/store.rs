//! Value store: current values, optional history, access-mode gating
//!
//! A [`ValueStore`] is a handle onto shared backing maps. Reference copies
//! alias the same backing and carry their own, equal-or-stricter
//! [`AccessMode`]. Each operation takes the backing lock once, so it either
//! fully succeeds or fails without partial mutation. Interleaving of writes
//! from several threads onto one store is left to the caller.

use crate::access::AccessMode;
use crate::error::{WatchError, WatchResult};
use crate::property::{PropertyId, Value};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Notification delivered after a successful `set`
#[derive(Clone)]
pub struct PropertyChange {
    /// Property written
    pub property: PropertyId,
    /// Value written
    pub value: Value,
}

impl fmt::Debug for PropertyChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyChange")
            .field("property", &self.property)
            .finish_non_exhaustive()
    }
}

/// Change listener
pub type Listener = Arc<dyn Fn(&PropertyChange) + Send + Sync>;

/// Handle returned by [`ValueStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Backing {
    values: IndexMap<PropertyId, Value>,
    history: Option<HashMap<PropertyId, Vec<Value>>>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

/// Current-value map and optional history log for one tracked object
pub struct ValueStore {
    backing: Arc<RwLock<Backing>>,
    mode: AccessMode,
    log_history: bool,
}

impl ValueStore {
    /// Create an empty `ReadWrite` store
    #[must_use]
    pub fn new(log_history: bool) -> Self {
        let backing = Backing {
            history: log_history.then(HashMap::new),
            ..Backing::default()
        };
        Self {
            backing: Arc::new(RwLock::new(backing)),
            mode: AccessMode::ReadWrite,
            log_history,
        }
    }

    /// Access mode of this handle
    #[inline]
    #[must_use]
    pub fn access_mode(&self) -> AccessMode {
        self.mode
    }

    /// Whether history is being logged
    #[inline]
    #[must_use]
    pub fn logs_history(&self) -> bool {
        self.log_history
    }

    /// Create a handle sharing this store's backing, typically with a stricter mode
    ///
    /// # Errors
    /// Returns [`WatchError::LooserAccessMode`] when `mode` is less restrictive
    /// than this handle's mode.
    pub fn reference_copy(&self, mode: AccessMode) -> WatchResult<Self> {
        self.mode.validate_transition(mode)?;
        Ok(Self {
            backing: Arc::clone(&self.backing),
            mode,
            log_history: self.log_history,
        })
    }

    /// Handle sharing this store's backing, never looser than this one
    ///
    /// A requested mode below this handle's own is clamped up to it.
    pub(crate) fn narrowed(&self, mode: AccessMode) -> Self {
        Self {
            backing: Arc::clone(&self.backing),
            mode: mode.max(self.mode),
            log_history: self.log_history,
        }
    }

    /// Whether both handles alias the same backing
    #[inline]
    #[must_use]
    pub fn shares_backing_with(&self, other: &ValueStore) -> bool {
        Arc::ptr_eq(&self.backing, &other.backing)
    }

    /// Record a value
    ///
    /// # Errors
    /// Returns [`WatchError::AccessViolation`] unless the mode is `ReadWrite`.
    pub fn set(&self, property: PropertyId, value: Value) -> WatchResult<&Self> {
        self.ensure_settable()?;
        self.commit(property, value);
        Ok(self)
    }

    /// Record a value only if none is present
    ///
    /// A present value makes this a no-op, whatever the mode.
    ///
    /// # Errors
    /// Returns [`WatchError::AccessViolation`] if a write is needed and the
    /// mode forbids it.
    pub fn set_if_empty(&self, property: PropertyId, value: Value) -> WatchResult<&Self> {
        let mut backing = self.backing.write();
        if backing.values.contains_key(&property) {
            return Ok(self);
        }
        self.ensure_settable()?;
        Self::write_value(&mut backing, property, Arc::clone(&value));
        drop(backing);
        self.notify(property, value);
        Ok(self)
    }

    /// Current value
    ///
    /// # Errors
    /// Returns [`WatchError::NotFound`] if the property has no value.
    pub fn get(&self, property: PropertyId) -> WatchResult<Value> {
        self.try_get(property)
            .ok_or(WatchError::NotFound { property })
    }

    /// Current value, if any
    #[must_use]
    pub fn try_get(&self, property: PropertyId) -> Option<Value> {
        self.backing.read().values.get(&property).cloned()
    }

    /// Whether the property has a current value
    #[must_use]
    pub fn has_value(&self, property: PropertyId) -> bool {
        self.backing.read().values.contains_key(&property)
    }

    /// Number of properties with a current value
    #[must_use]
    pub fn len(&self) -> usize {
        self.backing.read().values.len()
    }

    /// Whether no property has a current value
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backing.read().values.is_empty()
    }

    /// Snapshot of all current values
    ///
    /// Properties come in first-write order.
    #[must_use]
    pub fn values(&self) -> Values {
        let entries: Vec<_> = self
            .backing
            .read()
            .values
            .iter()
            .map(|(id, value)| (*id, Arc::clone(value)))
            .collect();
        Values {
            inner: entries.into_iter(),
        }
    }

    /// Remove all current values; history is kept
    ///
    /// # Errors
    /// Returns [`WatchError::AccessViolation`] under `ReadOnly`.
    pub fn clear(&self) -> WatchResult<&Self> {
        self.ensure_clearable("clear")?;
        self.backing.write().values.clear();
        Ok(self)
    }

    /// Remove one current value; history is kept
    ///
    /// # Errors
    /// Returns [`WatchError::AccessViolation`] under `ReadOnly`.
    pub fn clear_property(&self, property: PropertyId) -> WatchResult<&Self> {
        self.ensure_clearable("clear")?;
        self.backing.write().values.shift_remove(&property);
        Ok(self)
    }

    /// Values written to a property, oldest first
    ///
    /// A property never written yields an empty history.
    ///
    /// # Errors
    /// Returns [`WatchError::HistoryDisabled`] if history is not logged.
    pub fn history(&self, property: PropertyId) -> WatchResult<History> {
        let backing = self.backing.read();
        let log = backing.history.as_ref().ok_or(WatchError::HistoryDisabled)?;
        let entries = log.get(&property).cloned().unwrap_or_default();
        Ok(History {
            inner: entries.into_iter(),
        })
    }

    /// Remove all history entries
    ///
    /// # Errors
    /// Returns [`WatchError::AccessViolation`] under `ReadOnly`, or
    /// [`WatchError::HistoryDisabled`] if history is not logged.
    pub fn clear_history(&self) -> WatchResult<&Self> {
        self.ensure_clearable("clear history")?;
        self.backing
            .write()
            .history
            .as_mut()
            .ok_or(WatchError::HistoryDisabled)?
            .clear();
        Ok(self)
    }

    /// Remove history entries of one property
    ///
    /// # Errors
    /// Same as [`ValueStore::clear_history`].
    pub fn clear_property_history(&self, property: PropertyId) -> WatchResult<&Self> {
        self.ensure_clearable("clear history")?;
        self.backing
            .write()
            .history
            .as_mut()
            .ok_or(WatchError::HistoryDisabled)?
            .remove(&property);
        Ok(self)
    }

    /// Register a listener called after every successful `set`
    ///
    /// Listeners are shared by all reference copies and run in registration
    /// order on the writing thread, before `set` returns.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&PropertyChange) + Send + Sync + 'static,
    {
        let mut backing = self.backing.write();
        let id = SubscriptionId(backing.next_subscription);
        backing.next_subscription += 1;
        backing.listeners.push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener; returns whether it was registered
    pub fn unsubscribe(&self, subscription: SubscriptionId) -> bool {
        let mut backing = self.backing.write();
        let before = backing.listeners.len();
        backing.listeners.retain(|(id, _)| *id != subscription);
        backing.listeners.len() != before
    }

    /// Write without consulting the access mode
    ///
    /// Only the owner of the `ReadWrite` store (a proxy, or a constructor
    /// context it hands out) records through this path.
    pub(crate) fn commit(&self, property: PropertyId, value: Value) {
        Self::write_value(&mut self.backing.write(), property, Arc::clone(&value));
        tracing::trace!("Recorded {}", property);
        self.notify(property, value);
    }

    /// Drop every current value and history entry
    pub(crate) fn reset(&self) {
        let mut backing = self.backing.write();
        backing.values.clear();
        if let Some(log) = backing.history.as_mut() {
            log.clear();
        }
    }

    fn write_value(backing: &mut Backing, property: PropertyId, value: Value) {
        if let Some(log) = backing.history.as_mut() {
            log.entry(property).or_default().push(Arc::clone(&value));
        }
        backing.values.insert(property, value);
    }

    fn notify(&self, property: PropertyId, value: Value) {
        let listeners: Vec<Listener> = self
            .backing
            .read()
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        if listeners.is_empty() {
            return;
        }
        let change = PropertyChange { property, value };
        for listener in listeners {
            listener(&change);
        }
    }

    fn ensure_settable(&self) -> WatchResult<()> {
        if self.mode.allows_set() {
            Ok(())
        } else {
            Err(WatchError::access_violation(self.mode, "set"))
        }
    }

    fn ensure_clearable(&self, operation: &'static str) -> WatchResult<()> {
        if self.mode.allows_clear() {
            Ok(())
        } else {
            Err(WatchError::access_violation(self.mode, operation))
        }
    }
}

impl fmt::Debug for ValueStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backing = self.backing.read();
        f.debug_struct("ValueStore")
            .field("mode", &self.mode)
            .field("log_history", &self.log_history)
            .field("properties", &backing.values.keys().collect::<Vec<_>>())
            .field("listeners", &backing.listeners.len())
            .finish()
    }
}

/// Iterator over `(property, value)` pairs taken from a store
#[derive(Debug, Clone)]
pub struct Values {
    inner: std::vec::IntoIter<(PropertyId, Value)>,
}

impl Iterator for Values {
    type Item = (PropertyId, Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Values {}

/// Iterator over the historical values of one property, oldest first
///
/// Cloning restarts iteration from the clone's position.
#[derive(Debug, Clone)]
pub struct History {
    inner: std::vec::IntoIter<Value>,
}

impl Iterator for History {
    type Item = Value;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for History {}

impl DoubleEndedIterator for History {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::downcast_value;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use parking_lot::Mutex;

    const NAME: PropertyId = PropertyId::new("tests::Person", "name", "String");
    const AGE: PropertyId = PropertyId::new("tests::Person", "age", "i32");

    fn text(value: &str) -> Value {
        Arc::new(value.to_string())
    }

    fn read_text(value: &Value) -> String {
        downcast_value::<String>(NAME, value).unwrap()
    }

    #[test]
    fn set_then_get() {
        let store = ValueStore::new(false);
        store.set(NAME, text("Ann")).unwrap();

        assert!(store.has_value(NAME));
        assert_eq!(read_text(&store.get(NAME).unwrap()), "Ann");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn narrowed_never_loosens() {
        let store = ValueStore::new(true);
        let no_set = store.narrowed(AccessMode::NoSet);
        assert_eq!(no_set.access_mode(), AccessMode::NoSet);
        assert!(no_set.shares_backing_with(&store));
        assert!(no_set.logs_history());

        let read_only = no_set.narrowed(AccessMode::ReadOnly);
        assert_eq!(read_only.narrowed(AccessMode::ReadWrite).access_mode(), AccessMode::ReadOnly);
        assert_eq!(no_set.narrowed(AccessMode::ReadWrite).access_mode(), AccessMode::NoSet);
        assert!(no_set.narrowed(AccessMode::ReadWrite).set(NAME, text("x")).is_err());
    }

    #[test]
    fn set_chains() {
        let store = ValueStore::new(false);
        store
            .set(NAME, text("Ann"))
            .and_then(|s| s.set(AGE, Arc::new(12_i32)))
            .unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = ValueStore::new(false);
        assert_eq!(
            store.get(NAME).unwrap_err(),
            WatchError::NotFound { property: NAME }
        );
        assert!(store.try_get(NAME).is_none());
    }

    #[test]
    fn history_records_every_write() {
        let store = ValueStore::new(true);
        store.set(NAME, text("A")).unwrap();
        store.set(NAME, text("B")).unwrap();

        let history: Vec<String> = store.history(NAME).unwrap().map(|v| read_text(&v)).collect();
        assert_eq!(history, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(read_text(&store.get(NAME).unwrap()), "B");
    }

    #[test]
    fn history_is_restartable() {
        let store = ValueStore::new(true);
        store.set(NAME, text("A")).unwrap();

        let history = store.history(NAME).unwrap();
        assert_eq!(history.clone().count(), 1);
        assert_eq!(history.count(), 1);
    }

    #[test]
    fn history_of_unwritten_property_is_empty() {
        let store = ValueStore::new(true);
        assert_eq!(store.history(AGE).unwrap().len(), 0);
    }

    #[test]
    fn history_disabled_is_unsupported() {
        let store = ValueStore::new(false);
        store.set(NAME, text("A")).unwrap();
        assert_eq!(store.history(NAME).unwrap_err(), WatchError::HistoryDisabled);
        assert_eq!(store.clear_history().unwrap_err(), WatchError::HistoryDisabled);
    }

    #[test]
    fn clear_history_keeps_values() {
        let store = ValueStore::new(true);
        store.set(NAME, text("Zeroth")).unwrap();
        store.clear_history().unwrap();
        store.set(NAME, text("First")).unwrap();
        store.set(NAME, text("Second")).unwrap();

        let history: Vec<String> = store.history(NAME).unwrap().map(|v| read_text(&v)).collect();
        assert_eq!(history, vec!["First".to_string(), "Second".to_string()]);

        store.clear_property_history(NAME).unwrap();
        assert_eq!(store.history(NAME).unwrap().len(), 0);
        assert_eq!(read_text(&store.get(NAME).unwrap()), "Second");
    }

    #[test]
    fn clear_keeps_history() {
        let store = ValueStore::new(true);
        store.set(NAME, text("A")).unwrap();
        store.set(AGE, Arc::new(3_i32)).unwrap();
        store.clear_property(AGE).unwrap();
        assert!(!store.has_value(AGE));
        assert!(store.has_value(NAME));

        store.clear().unwrap();
        assert!(store.is_empty());
        assert_eq!(store.history(NAME).unwrap().len(), 1);
    }

    #[test]
    fn set_if_empty_only_writes_once() {
        let store = ValueStore::new(true);
        store.set_if_empty(NAME, text("first")).unwrap();
        store.set_if_empty(NAME, text("second")).unwrap();

        assert_eq!(read_text(&store.get(NAME).unwrap()), "first");
        assert_eq!(store.history(NAME).unwrap().len(), 1);
    }

    #[test]
    fn set_if_empty_on_no_set_copy() {
        let store = ValueStore::new(false);
        store.set(NAME, text("Ann")).unwrap();
        let copy = store.reference_copy(AccessMode::NoSet).unwrap();

        assert!(copy.set_if_empty(NAME, text("Bob")).is_ok());
        assert_eq!(
            copy.set_if_empty(AGE, Arc::new(1_i32)).unwrap_err().kind(),
            crate::ErrorKind::AccessViolation
        );
    }

    #[test]
    fn no_set_copy_reads_and_clears() {
        let store = ValueStore::new(true);
        store.set(NAME, text("Ann")).unwrap();
        let copy = store.reference_copy(AccessMode::NoSet).unwrap();

        assert_eq!(
            copy.set(NAME, text("Bob")).unwrap_err(),
            WatchError::access_violation(AccessMode::NoSet, "set")
        );
        assert_eq!(read_text(&copy.get(NAME).unwrap()), "Ann");
        assert_eq!(copy.history(NAME).unwrap().len(), 1);
        copy.clear_history().unwrap();
        copy.clear().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn read_only_copy_rejects_mutation() {
        let store = ValueStore::new(true);
        let copy = store.reference_copy(AccessMode::ReadOnly).unwrap();

        assert!(copy.set(NAME, text("x")).is_err());
        assert!(copy.clear().is_err());
        assert!(copy.clear_property(NAME).is_err());
        assert_eq!(
            copy.clear_history().unwrap_err().kind(),
            crate::ErrorKind::AccessViolation
        );
    }

    #[test]
    fn copies_share_backing() {
        let store = ValueStore::new(false);
        let copy = store.reference_copy(AccessMode::ReadOnly).unwrap();
        assert!(copy.shares_backing_with(&store));

        store.set(NAME, text("late")).unwrap();
        assert_eq!(read_text(&copy.get(NAME).unwrap()), "late");
    }

    #[test]
    fn copy_cannot_loosen_mode() {
        let store = ValueStore::new(false);
        let read_only = store.reference_copy(AccessMode::ReadOnly).unwrap();
        let err = read_only.reference_copy(AccessMode::ReadWrite).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Argument);

        let no_set = store.reference_copy(AccessMode::NoSet).unwrap();
        assert!(no_set.reference_copy(AccessMode::ReadWrite).is_err());
        assert!(no_set.reference_copy(AccessMode::ReadOnly).is_ok());
    }

    #[test]
    fn listeners_fire_in_order_after_set() {
        let store = ValueStore::new(false);
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&log);
        store.subscribe(move |change| first.lock().push(("first", change.property)));
        let second = Arc::clone(&log);
        store.subscribe(move |change| second.lock().push(("second", change.property)));

        store.set(NAME, text("Ann")).unwrap();
        store.clear().unwrap();

        assert_eq!(*log.lock(), vec![("first", NAME), ("second", NAME)]);
    }

    #[test]
    fn listener_can_read_store() {
        let store = Arc::new(ValueStore::new(false));
        let seen = Arc::new(AtomicUsize::new(0));

        let reader = Arc::clone(&store);
        let counter = Arc::clone(&seen);
        store.subscribe(move |change| {
            if reader.has_value(change.property) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        store.set(NAME, text("Ann")).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let store = ValueStore::new(false);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let id = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.set(NAME, text("a")).unwrap();
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.set(NAME, text("b")).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listeners_are_shared_with_copies() {
        let store = ValueStore::new(false);
        let copy = store.reference_copy(AccessMode::ReadOnly).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        copy.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.set(AGE, Arc::new(7_i32)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_set_does_not_notify() {
        let store = ValueStore::new(false);
        let copy = store.reference_copy(AccessMode::NoSet).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(copy.set(NAME, text("x")).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(store.is_empty());
    }

    proptest! {
        #[test]
        fn prop_history_ends_with_current_value(writes in prop::collection::vec(any::<i32>(), 1..20)) {
            let store = ValueStore::new(true);
            for w in &writes {
                store.set(AGE, Arc::new(*w)).unwrap();
            }

            let history: Vec<i32> = store
                .history(AGE)
                .unwrap()
                .map(|v| downcast_value::<i32>(AGE, &v).unwrap())
                .collect();
            let current = downcast_value::<i32>(AGE, &store.get(AGE).unwrap()).unwrap();

            prop_assert_eq!(&history, &writes);
            prop_assert_eq!(history.last().copied(), Some(current));
        }
    }
}
