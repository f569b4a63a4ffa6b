//! Testing utilities for the watch workspace
//!
//! Shared fixtures and helpers.

#![allow(missing_docs)]

use parking_lot::Mutex;
use std::sync::Arc;
use watch_core::{proxy_type, Init, PropertyChange, PropertyId, Proxy, Trackable, TypedView};

#[derive(Debug, Default, Clone, PartialEq, watch_core::Tracked)]
pub struct BasicPoco {
    pub string_value: String,
    pub int_value: i32,
}

#[derive(Debug, Default, Clone, PartialEq, watch_core::Tracked)]
#[tracked(constructor(with_int(i32)))]
pub struct BasicPocoWithConstructor {
    pub string_value: String,
    pub int_value: i32,
}

impl BasicPocoWithConstructor {
    fn with_int(this: &mut Init<'_, Self>, value: i32) {
        this.set_int_value(value);
    }
}

#[derive(Debug, Default, Clone, PartialEq, watch_core::Tracked)]
#[tracked(constructor(empty()), constructor(with_age(i32)))]
pub struct Foo {
    pub name: String,
    pub age: i32,
}

impl Foo {
    fn empty(_this: &mut Init<'_, Self>) {}

    fn with_age(this: &mut Init<'_, Self>, age: i32) {
        this.set_age(age);
    }
}

#[derive(Debug, Default, watch_core::Tracked)]
#[tracked(sealed)]
pub struct SealedPoco {
    pub value: i32,
}

#[derive(Debug, Default, watch_core::Tracked)]
pub struct FixedPoco {
    pub open: i32,
    #[tracked(sealed)]
    pub locked: i32,
}

/// Base mutator with a side effect the tracked write must not skip
#[derive(Debug, Default, watch_core::Tracked)]
pub struct Audited {
    #[tracked(setter = write_balance)]
    pub balance: i64,
    #[tracked(skip)]
    pub writes: Vec<i64>,
}

impl Audited {
    fn write_balance(&mut self, balance: i64) {
        self.writes.push(balance);
        self.balance = balance;
    }
}

/// Untracked key assigned during construction
#[derive(Debug, Default, watch_core::Tracked)]
#[tracked(constructor(with_id(u64)))]
pub struct Keyed {
    #[tracked(skip)]
    pub id: u64,
    pub label: String,
}

impl Keyed {
    fn with_id(this: &mut Init<'_, Self>, id: u64) {
        this.id = id;
        this.set_label(format!("item-{id}"));
    }
}

#[derive(Debug, Default, watch_core::Tracked)]
pub struct Renamed {
    #[tracked(rename = "DisplayName")]
    pub display_name: String,
}

/// Default-constructed proxy of the process-wide type for `T`
pub fn fresh_proxy<T: Trackable>(log_history: bool) -> Proxy<T> {
    proxy_type::<T>(log_history)
        .unwrap()
        .instantiate(())
        .unwrap()
}

/// Names of the properties currently holding a value, in first-write order
pub fn value_names<T: Trackable>(view: &TypedView<T>) -> Vec<&'static str> {
    view.values().map(|(id, _)| id.name()).collect()
}

/// Record every change notification a view delivers
pub fn record_changes<T: Trackable>(view: &TypedView<T>) -> Arc<Mutex<Vec<PropertyId>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    view.subscribe(move |change: &PropertyChange| {
        sink.lock().push(change.property);
    });
    seen
}
