//! Interior-mutable value holders for built objects and callers.
//!
//! Built objects are shared (`Arc`) as soon as they are constructed, so every
//! property setter receives `&self`. Two holders cover the common cases:
//!
//! - [`Property<T>`]: a reactive value with change detection, the usual
//!   backing store for a widget property.
//! - [`Bound<T>`]: an initially empty slot a caller declares for each named
//!   node it wants injected by the reference binder.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_forge_core::property::{Bound, Property};
//!
//! struct Button {
//!     text: Property<String>,
//! }
//!
//! struct LoginPanel {
//!     btn_ok: Bound<Arc<Button>>,
//! }
//!
//! let panel = LoginPanel { btn_ok: Bound::new() };
//! assert!(panel.btn_ok.get().is_none());
//!
//! panel.btn_ok.set(Arc::new(Button { text: Property::new("OK".into()) }));
//! assert_eq!(panel.btn_ok.get().unwrap().text.get(), "OK");
//! ```

use std::fmt;

use parking_lot::RwLock;

/// A reactive property that tracks changes.
///
/// `set()` compares with the current value and reports whether it changed,
/// so the owner can decide whether to emit a notification signal.
pub struct Property<T> {
    value: RwLock<T>,
}

impl<T: Clone> Property<T> {
    /// Create a new property with an initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Access the value through a closure without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.value.read())
    }

    /// Set the value without change detection.
    pub fn set_silent(&self, value: T) {
        *self.value.write() = value;
    }
}

impl<T: Clone + PartialEq> Property<T> {
    /// Set the value, returning `true` if the value changed.
    pub fn set(&self, value: T) -> bool {
        let mut current = self.value.write();
        if *current != value {
            *current = value;
            true
        } else {
            false
        }
    }
}

impl<T: Clone + Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Property").field(&*self.value.read()).finish()
    }
}

/// A slot that is filled in once an object with a matching name is built.
///
/// Callers declare `Bound<Arc<ConcreteType>>` for exact-type injection or
/// `Bound<ObjectRef>` for capability-typed injection.
///
/// [`ObjectRef`]: crate::object::ObjectRef
pub struct Bound<T> {
    slot: RwLock<Option<T>>,
}

impl<T: Clone> Bound<T> {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// Create a slot that already holds a value.
    ///
    /// Callers use this to hand pre-built instances to the builder; a node
    /// whose type name matches the field name adopts the instance.
    pub fn with_value(value: T) -> Self {
        Self {
            slot: RwLock::new(Some(value)),
        }
    }

    /// The bound value, if any.
    pub fn get(&self) -> Option<T> {
        self.slot.read().clone()
    }

    /// Whether a value has been bound.
    pub fn is_bound(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Replace the bound value.
    pub fn set(&self, value: T) {
        *self.slot.write() = Some(value);
    }

    /// Remove the bound value.
    pub fn clear(&self) -> Option<T> {
        self.slot.write().take()
    }
}

impl<T: Clone> Default for Bound<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Bound<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bound")
            .field("bound", &self.slot.read().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_property_set_detects_change() {
        let prop = Property::new(10);

        assert!(!prop.set(10));
        assert!(prop.set(20));
        assert_eq!(prop.get(), 20);
    }

    #[test]
    fn test_property_with_closure() {
        let prop = Property::new(vec![1, 2, 3]);
        let sum: i32 = prop.with(|v| v.iter().sum());
        assert_eq!(sum, 6);
    }

    #[test]
    fn test_property_thread_safe() {
        let prop = Arc::new(Property::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let prop = prop.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        prop.set_silent(i);
                        let _ = prop.get();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn test_bound_lifecycle() {
        let slot: Bound<Arc<String>> = Bound::new();
        assert!(!slot.is_bound());

        slot.set(Arc::new("first".to_string()));
        assert_eq!(slot.get().as_deref().map(String::as_str), Some("first"));

        assert!(slot.clear().is_some());
        assert!(slot.get().is_none());
    }

    #[test]
    fn test_bound_with_value() {
        let slot = Bound::with_value(5);
        assert_eq!(slot.get(), Some(5));
    }
}
