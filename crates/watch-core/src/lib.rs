//! Watch Core - transparent change tracking
//!
//! Records every write made to the properties of a plain struct without the
//! struct knowing about it:
//! - `#[derive(Tracked)]` describes a struct's properties and constructors
//! - [`ProxyFactory`] generates and caches one proxy type per
//!   `(base type, history flag)` key
//! - [`Proxy<T>`] routes writes through the base mutator, then into an
//!   embedded [`ValueStore`]
//! - [`TypedView<T>`] reads, clears and replays tracked state under an
//!   [`AccessMode`]
//!
//! # Example
//!
//! ```rust
//! use watch_core::prelude::*;
//!
//! #[derive(Debug, Default, Tracked)]
//! struct Foo {
//!     name: String,
//!     age: i32,
//! }
//!
//! # fn main() -> watch_core::WatchResult<()> {
//! let mut watched = PassiveWatcher::<Foo>::new(true)?;
//! watched.instance_mut().set_name("A".to_string());
//! watched.instance_mut().set_name("B".to_string());
//!
//! let history: Vec<String> = watched.watcher().history(&Foo::NAME)?.collect();
//! assert_eq!(history, ["A", "B"]);
//! assert!(!watched.watcher().has_value(&Foo::AGE));
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

// Lets the derive's `::watch_core::` paths resolve inside this crate.
extern crate self as watch_core;

pub mod access;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod factory;
pub mod passive;
pub mod property;
pub mod proxy;
pub mod store;
pub mod view;

// Re-exports for convenience
pub use access::AccessMode;
pub use config::WatchConfig;
pub use descriptor::{
    apply_erased, construct, downcast_args, Assign, ConstructorArgs, ConstructorDescriptor, Init,
    PropertyDescriptor, Trackable,
};
pub use error::{ErrorKind, WatchError, WatchResult};
pub use factory::{proxy_type, FactoryStats, ProxyFactory, ProxyKey, ProxyType};
pub use passive::PassiveWatcher;
pub use property::{downcast_value, Property, PropertyId, Value};
pub use proxy::Proxy;
pub use store::{History, Listener, PropertyChange, SubscriptionId, ValueStore, Values};
pub use view::{TypedHistory, TypedView};
pub use watch_macros::Tracked;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Watch Core
    pub use crate::{
        AccessMode, Assign, Init, PassiveWatcher, Property, Proxy, ProxyFactory, Trackable,
        Tracked, TypedView, WatchConfig, WatchError, WatchResult,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
