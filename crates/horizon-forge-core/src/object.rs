//! Object model for Horizon Forge.
//!
//! Anything the builder constructs, and any caller it binds into, is an
//! [`Object`]: a `'static`, thread-safe value. Built objects are handled
//! through [`ObjectRef`], a cheaply clonable shared handle that can be
//! downcast back to its concrete type.
//!
//! # Key Types
//!
//! - [`Object`] - Marker trait implemented for every `Any + Send + Sync` type
//! - [`ObjectRef`] - Shared, type-erased handle to a built object
//! - [`object_cast`] - Safe downcast of a `&dyn Object`

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Base trait for every object the builder can construct or bind into.
///
/// Implemented automatically for all `Any + Send + Sync` types.
pub trait Object: Any + Send + Sync {
    /// View this object as `&dyn Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Convert a shared handle into an `Arc<dyn Any>` for downcasting.
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// The Rust type name of the concrete object, for diagnostics.
    fn object_type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync> Object for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn object_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// A shared, type-erased handle to a built object.
///
/// Two handles are [`same_object`](Self::same_object) when they point at the
/// same allocation.
#[derive(Clone)]
pub struct ObjectRef(Arc<dyn Object>);

impl ObjectRef {
    /// Wrap a freshly constructed object.
    pub fn new<T: Object>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Wrap an object that is already shared.
    pub fn from_arc<T: Object>(value: Arc<T>) -> Self {
        Self(value)
    }

    /// View the object as `&dyn Object`.
    pub fn as_object(&self) -> &dyn Object {
        &*self.0
    }

    /// View the object as `&dyn Any`.
    pub fn as_any(&self) -> &dyn Any {
        self.as_object().as_any()
    }

    /// The `TypeId` of the concrete object.
    pub fn type_id(&self) -> TypeId {
        self.as_any().type_id()
    }

    /// The Rust type name of the concrete object.
    pub fn type_name(&self) -> &'static str {
        self.as_object().object_type_name()
    }

    /// Borrow the object as `T`, if it is one.
    pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Get a typed shared handle, if the object is a `T`.
    pub fn downcast<T: Object>(&self) -> Option<Arc<T>> {
        <dyn Object>::into_any_arc(self.0.clone()).downcast::<T>().ok()
    }

    /// Whether the object is a `T`.
    pub fn is<T: Object>(&self) -> bool {
        self.type_id() == TypeId::of::<T>()
    }

    /// Whether both handles point at the same object.
    pub fn same_object(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: Object> From<Arc<T>> for ObjectRef {
    fn from(value: Arc<T>) -> Self {
        Self::from_arc(value)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectRef").field(&self.type_name()).finish()
    }
}

/// Safe downcast of a `&dyn Object`.
pub fn object_cast<T: Object>(obj: &dyn Object) -> Option<&T> {
    obj.as_any().downcast_ref::<T>()
}

static_assertions::assert_impl_all!(ObjectRef: Send, Sync);
