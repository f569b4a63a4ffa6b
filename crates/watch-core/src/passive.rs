//! Passive watcher facade
//!
//! [`PassiveWatcher<T>`] pairs a freshly constructed proxy with a
//! `ReadOnly` handle onto its store: callers write through the instance and
//! observe through the watcher, and nothing else can write the store.

use crate::access::AccessMode;
use crate::config::WatchConfig;
use crate::descriptor::Trackable;
use crate::error::WatchResult;
use crate::factory::ProxyFactory;
use crate::proxy::Proxy;
use crate::view::TypedView;
use std::fmt;

/// A proxy instance plus a read-only view of what it tracked
pub struct PassiveWatcher<T: Trackable> {
    instance: Proxy<T>,
    watcher: TypedView<T>,
    config: WatchConfig,
}

impl<T: Trackable> PassiveWatcher<T> {
    /// Create a watcher around a default-constructed proxy
    ///
    /// # Errors
    /// Fails if no proxy type can be generated for `T`, or if `T` declares
    /// constructors but no parameterless one.
    pub fn new(log_history: bool) -> WatchResult<Self> {
        Self::with_config(WatchConfig::new().with_history(log_history))
    }

    /// Create a watcher from explicit configuration
    ///
    /// # Errors
    /// See [`PassiveWatcher::new`].
    pub fn with_config(config: WatchConfig) -> WatchResult<Self> {
        let instance = ProxyFactory::global()
            .get_or_create::<T>(config.log_history)?
            .instantiate(())?;
        let watcher = TypedView::from_store(
            instance
                .embedded()
                .store()
                .reference_copy(AccessMode::ReadOnly)?,
        );
        Ok(Self {
            instance,
            watcher,
            config,
        })
    }

    /// Create a watcher seeded from a snapshot
    ///
    /// The snapshot is applied to the fresh instance, then the store is
    /// emptied, so only writes made after seeding are tracked.
    ///
    /// # Errors
    /// See [`PassiveWatcher::new`]; also fails if the snapshot holds a value
    /// `T` cannot accept.
    pub fn from_snapshot(snapshot: &TypedView<T>, log_history: bool) -> WatchResult<Self> {
        Self::seeded(snapshot, WatchConfig::new().with_history(log_history))
    }

    /// Create a watcher seeded from a snapshot with explicit configuration
    ///
    /// With `record_seed` set the snapshot goes through the tracked setters
    /// and stays recorded.
    ///
    /// # Errors
    /// See [`PassiveWatcher::from_snapshot`].
    pub fn seeded(snapshot: &TypedView<T>, config: WatchConfig) -> WatchResult<Self> {
        let mut watcher = Self::with_config(config)?;
        if config.record_seed {
            watcher.instance.load_from(snapshot)?;
        } else {
            snapshot.load_to_instance(watcher.instance.target_mut())?;
            watcher.instance.embedded().store().reset();
        }
        tracing::debug!(
            "Seeded {} with {} values",
            watcher.instance.proxy_type().name(),
            snapshot.values().len()
        );
        Ok(watcher)
    }

    /// The tracked instance
    #[inline]
    #[must_use]
    pub fn instance(&self) -> &Proxy<T> {
        &self.instance
    }

    /// The tracked instance, for writing through its setters
    #[inline]
    pub fn instance_mut(&mut self) -> &mut Proxy<T> {
        &mut self.instance
    }

    /// Read-only view of tracked state
    #[inline]
    #[must_use]
    pub fn watcher(&self) -> &TypedView<T> {
        &self.watcher
    }

    /// Configuration this watcher was built with
    #[inline]
    #[must_use]
    pub fn config(&self) -> WatchConfig {
        self.config
    }

    /// Release the proxy
    #[must_use]
    pub fn into_instance(self) -> Proxy<T> {
        self.instance
    }
}

impl<T: Trackable + fmt::Debug> fmt::Debug for PassiveWatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassiveWatcher")
            .field("instance", &self.instance)
            .field("config", &self.config)
            .finish()
    }
}
