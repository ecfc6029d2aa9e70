//! Immutable record types over a dynamic value model.
//!
//! A [`RecordType`](records::RecordType) is a named, ordered set of
//! components. Its instances are frozen at construction: no path, direct,
//! reflective or through a variable handle, can write a component. Classes
//! are provided alongside as the mutable contrast case.

extern crate self as records_rs;

pub mod access;
pub mod annotations;
pub mod classes;
pub mod decl;
pub mod exceptions;
pub mod handles;
pub mod records;
pub mod reflect;
pub mod registry;
pub mod symbols;
pub mod value;

#[cfg(feature = "derive")]
pub use records_rs_macros::Record;

#[doc(hidden)]
pub use inventory;
