//! Proxy type factory
//!
//! Generates, caches and returns [`ProxyType`]s keyed by
//! `(base type, history flag)`.
//!
//! Concurrent callers asking for the same key may each run generation
//! speculatively; publication goes through a single `entry().or_insert()`
//! so every caller ends up with the same winning `Arc<ProxyType<T>>`.

use crate::descriptor::{find_constructor, ConstructorDescriptor, PropertyDescriptor, Trackable};
use crate::error::{WatchError, WatchResult};
use crate::property::PropertyId;
use crate::proxy::Proxy;
use crate::view::TypedView;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static GLOBAL: Lazy<ProxyFactory> = Lazy::new(ProxyFactory::new);

/// Generation serial shared by all factories
static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

/// Cache key: base type plus history flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProxyKey {
    base: TypeId,
    log_history: bool,
}

impl ProxyKey {
    /// Create key for base type `T`
    #[inline]
    #[must_use]
    pub fn new<T: Trackable>(log_history: bool) -> Self {
        Self {
            base: TypeId::of::<T>(),
            log_history,
        }
    }

    /// Base type id
    #[inline]
    #[must_use]
    pub fn base(&self) -> TypeId {
        self.base
    }

    /// History flag
    #[inline]
    #[must_use]
    pub fn log_history(&self) -> bool {
        self.log_history
    }
}

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FactoryStats {
    /// Published proxy types
    pub entry_count: usize,
}

/// A generated proxy type for base type `T`
///
/// Holds the override table (every tracked property), the forwarded
/// constructor table and the configuration of the embedded store.
pub struct ProxyType<T: Trackable> {
    key: ProxyKey,
    name: String,
    serial: u64,
    overrides: Vec<&'static PropertyDescriptor<T>>,
    constructors: &'static [ConstructorDescriptor<T>],
}

impl<T: Trackable> ProxyType<T> {
    /// Cache key
    #[inline]
    #[must_use]
    pub fn key(&self) -> ProxyKey {
        self.key
    }

    /// Generated type name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base type name
    #[inline]
    #[must_use]
    pub fn base_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    /// Whether instances log history
    #[inline]
    #[must_use]
    pub fn logs_history(&self) -> bool {
        self.key.log_history
    }

    /// Generation serial, unique per published or discarded generation
    #[inline]
    #[must_use]
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Identities of the overridden properties
    pub fn tracked_properties(&self) -> impl Iterator<Item = PropertyId> + '_ {
        self.overrides.iter().map(|p| p.id())
    }

    /// Whether writes to `property` are tracked
    #[must_use]
    pub fn tracks(&self, property: PropertyId) -> bool {
        self.overrides.iter().any(|p| p.id() == property)
    }

    /// Forwarded constructors, with the base signatures
    #[inline]
    #[must_use]
    pub fn constructors(&self) -> &'static [ConstructorDescriptor<T>] {
        self.constructors
    }

    /// Constructor taking the argument tuple `A`, if any
    #[must_use]
    pub fn constructor_for<A: Any>(&self) -> Option<&'static ConstructorDescriptor<T>> {
        find_constructor::<T, A>(self.constructors)
    }

    pub(crate) fn override_for(&self, property: PropertyId) -> Option<&'static PropertyDescriptor<T>> {
        self.overrides.iter().copied().find(|p| p.id() == property)
    }

    /// Instantiate through the constructor taking `args`
    ///
    /// The embedded store is built first and the base constructor body runs
    /// afterwards with the store attached, so assignments it makes are
    /// already tracked.
    ///
    /// # Errors
    /// Returns [`WatchError::NoMatchingConstructor`] if no base constructor
    /// takes `A`, or whatever the constructor body returns.
    pub fn instantiate<A: Any + Send>(self: &Arc<Self>, args: A) -> WatchResult<Proxy<T>> {
        let constructor = self.constructor_for::<A>().ok_or(WatchError::NoMatchingConstructor {
            type_name: T::TYPE_NAME,
            signature: type_name::<A>(),
        })?;

        let store = TypedView::<T>::new(self.logs_history());
        let mut target = T::default();
        constructor.invoke(
            &mut crate::descriptor::Init::tracked(&mut target, &store),
            Box::new(args),
        )?;

        tracing::debug!("Instantiated {} via {}", self.name, constructor.name());
        Ok(Proxy::from_parts(target, store, Arc::clone(self)))
    }
}

impl<T: Trackable> fmt::Debug for ProxyType<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyType")
            .field("name", &self.name)
            .field("serial", &self.serial)
            .field("overrides", &self.overrides.len())
            .field("constructors", &self.constructors.len())
            .finish()
    }
}

/// Run the generation algorithm for `T`
fn generate<T: Trackable>(log_history: bool) -> WatchResult<ProxyType<T>> {
    if T::SEALED {
        return Err(WatchError::SealedType {
            type_name: T::TYPE_NAME,
        });
    }

    let overrides = T::PROPERTIES
        .iter()
        .map(|property| {
            if property.is_overridable() {
                Ok(property)
            } else {
                Err(WatchError::NonOverridableProperty {
                    type_name: T::TYPE_NAME,
                    property: property.id().name(),
                })
            }
        })
        .collect::<WatchResult<Vec<_>>>()?;

    let short = T::TYPE_NAME.rsplit("::").next().unwrap_or(T::TYPE_NAME);
    let name = if log_history {
        format!("{short}Proxy<history>")
    } else {
        format!("{short}Proxy")
    };

    Ok(ProxyType {
        key: ProxyKey::new::<T>(log_history),
        name,
        serial: NEXT_SERIAL.fetch_add(1, Ordering::Relaxed),
        overrides,
        constructors: T::CONSTRUCTORS,
    })
}

/// Concurrent get-or-create cache of proxy types
///
/// There is one factory per process, reached through
/// [`ProxyFactory::global`], so each key has exactly one proxy type for the
/// lifetime of the process.
#[derive(Debug)]
pub struct ProxyFactory {
    types: DashMap<ProxyKey, Arc<dyn Any + Send + Sync>>,
}

impl ProxyFactory {
    fn new() -> Self {
        Self {
            types: DashMap::new(),
        }
    }

    /// Process-wide factory
    #[inline]
    #[must_use]
    pub fn global() -> &'static ProxyFactory {
        &GLOBAL
    }

    /// Get the proxy type for `(T, log_history)`, generating it on first use
    ///
    /// # Errors
    /// Returns [`WatchError::SealedType`] or
    /// [`WatchError::NonOverridableProperty`] when `T` cannot be proxied.
    pub fn get_or_create<T: Trackable>(&self, log_history: bool) -> WatchResult<Arc<ProxyType<T>>> {
        let key = ProxyKey::new::<T>(log_history);

        // Check cache first
        if let Some(cached) = self.types.get(&key) {
            let cached = Arc::clone(cached.value());
            return Self::downcast::<T>(cached);
        }

        let generated = generate::<T>(log_history).map_err(|e| {
            tracing::warn!("Proxy generation for {} failed: {}", T::TYPE_NAME, e);
            e
        })?;
        let serial = generated.serial;
        let candidate: Arc<dyn Any + Send + Sync> = Arc::new(generated);

        // Publish; a concurrent winner takes precedence
        let published = Arc::clone(self.types.entry(key).or_insert(candidate).value());
        let winner = Self::downcast::<T>(published)?;

        if winner.serial == serial {
            tracing::debug!("Generated proxy type {}", winner.name);
        } else {
            tracing::debug!("Discarded duplicate generation of {}", winner.name);
        }
        Ok(winner)
    }

    /// Whether a proxy type for `(T, log_history)` has been published
    #[must_use]
    pub fn contains<T: Trackable>(&self, log_history: bool) -> bool {
        self.types.contains_key(&ProxyKey::new::<T>(log_history))
    }

    /// Get cache statistics
    #[inline]
    #[must_use]
    pub fn stats(&self) -> FactoryStats {
        FactoryStats {
            entry_count: self.types.len(),
        }
    }

    fn downcast<T: Trackable>(entry: Arc<dyn Any + Send + Sync>) -> WatchResult<Arc<ProxyType<T>>> {
        entry
            .downcast::<ProxyType<T>>()
            .map_err(|_| WatchError::CacheTypeMismatch {
                type_name: T::TYPE_NAME,
            })
    }
}

/// Get the proxy type for `(T, log_history)` from the process-wide factory
///
/// # Errors
/// See [`ProxyFactory::get_or_create`].
pub fn proxy_type<T: Trackable>(log_history: bool) -> WatchResult<Arc<ProxyType<T>>> {
    ProxyFactory::global().get_or_create::<T>(log_history)
}
