//! Watch Derive Macros
//!
//! This crate provides `#[derive(Tracked)]`, which describes a struct to
//! `watch-core`: its writable properties, their base mutators, and its
//! constructors. Proxy types are generated from that description.
//!
//! # Example
//!
//! ```ignore
//! use watch_core::{Init, Tracked};
//!
//! #[derive(Debug, Default, Tracked)]
//! #[tracked(constructor(with_age(i32)))]
//! struct Foo {
//!     name: String,
//!     age: i32,
//!     #[tracked(skip)]
//!     scratch: Vec<u8>,
//! }
//!
//! impl Foo {
//!     fn with_age(this: &mut Init<'_, Self>, age: i32) {
//!         this.set_age(age);
//!     }
//! }
//! ```

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod attrs;
mod codegen;

/// Derive a trackable type description
///
/// # Container Attributes
///
/// - `#[tracked(sealed)]` - the type cannot be proxied
/// - `#[tracked(constructor(name(Type, ...)))]` - forward the initializer
///   `fn name(this: &mut Init<'_, Self>, ...)`; repeatable. Without any, a
///   parameterless constructor running `Default` is forwarded.
///
/// # Field Attributes
///
/// - `#[tracked(skip)]` - not a tracked property
/// - `#[tracked(sealed)]` - the property's mutator cannot be overridden
/// - `#[tracked(setter = method)]` - base mutator `fn method(&mut self, V)`
///   replacing plain assignment
/// - `#[tracked(rename = "Name")]` - property name used in identities
///
/// # Generated Code
///
/// - One `Property<Self, V>` associated constant per tracked field, named
///   after the field in upper case
/// - A `Trackable` impl with the property and constructor tables
/// - A `<Type>Setters` trait with one `set_<field>` method, implemented for
///   everything that can assign to the type
///
/// Tracked field types must be `Clone + Send + Sync + 'static`.
#[proc_macro_derive(Tracked, attributes(tracked))]
pub fn derive_tracked(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match codegen::expand(&input) {
        Ok(output) => output.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
