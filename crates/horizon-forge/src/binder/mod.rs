//! Property and reference binding.
//!
//! The property binder turns a node's property values into setter calls on
//! the object built for it. The reference binder hands named objects to the
//! caller fields of the same name.

mod property;
mod reference;

pub(crate) use property::{PropertyBinder, PropertyContext, coerce_value};
pub(crate) use reference::bind_reference;
