//! Events delivered to handler methods.
//!
//! Every handler invocation receives an [`Event`]: the event type that fired,
//! the built object that fired it and an optional payload. Background steps
//! receive a [`BackgroundEvent`] payload instead of the originating one.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::object::{Object, ObjectRef};
use crate::task::BackgroundEvent;

/// The name of an event class.
///
/// Handler methods declare which event type they accept. [`EventType::ANY`]
/// accepts every event.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventType(Cow<'static, str>);

impl EventType {
    /// Accepts any event.
    pub const ANY: EventType = EventType(Cow::Borrowed("Event"));
    /// Fired by buttons, menu items and text fields on activation.
    pub const ACTION: EventType = EventType(Cow::Borrowed("ActionEvent"));
    /// Fired when a value-holding object changes.
    pub const CHANGE: EventType = EventType(Cow::Borrowed("ChangeEvent"));
    /// Delivered to handlers running on the background lane.
    pub const BACKGROUND: EventType = EventType(Cow::Borrowed("BackgroundEvent"));

    /// A custom event type.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// The event type name.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Whether a handler declared for `self` can receive an `other` event.
    pub fn accepts(&self, other: &EventType) -> bool {
        *self == Self::ANY || self == other
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventType({})", self.0)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extra data carried by an event.
#[derive(Clone, Default)]
pub enum EventPayload {
    /// No payload.
    #[default]
    None,
    /// Progress and cancellation handle of a background step.
    Background(BackgroundEvent),
    /// Arbitrary data supplied by whoever fired the event.
    Custom(Arc<dyn Any + Send + Sync>),
}

impl fmt::Debug for EventPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Background(event) => f.debug_tuple("Background").field(event).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// An event fired by a built object.
#[derive(Clone, Debug)]
pub struct Event {
    event_type: EventType,
    source: ObjectRef,
    payload: EventPayload,
}

impl Event {
    /// Create an event without payload.
    pub fn new(event_type: EventType, source: ObjectRef) -> Self {
        Self {
            event_type,
            source,
            payload: EventPayload::None,
        }
    }

    /// Shorthand for an [`EventType::ACTION`] event.
    pub fn action(source: impl Into<ObjectRef>) -> Self {
        Self::new(EventType::ACTION, source.into())
    }

    /// Attach custom data to the event.
    pub fn with_payload<T: Any + Send + Sync>(mut self, payload: T) -> Self {
        self.payload = EventPayload::Custom(Arc::new(payload));
        self
    }

    /// A copy of this event retyped for the background lane.
    pub fn to_background(&self, background: BackgroundEvent) -> Self {
        Self {
            event_type: EventType::BACKGROUND,
            source: self.source.clone(),
            payload: EventPayload::Background(background),
        }
    }

    /// The event type.
    pub fn event_type(&self) -> &EventType {
        &self.event_type
    }

    /// The object that fired the event.
    pub fn source(&self) -> &ObjectRef {
        &self.source
    }

    /// The source as a concrete type, if it is one.
    pub fn source_as<T: Object>(&self) -> Option<Arc<T>> {
        self.source.downcast::<T>()
    }

    /// The payload.
    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    /// The background handle, for events delivered to background handlers.
    pub fn background(&self) -> Option<&BackgroundEvent> {
        match &self.payload {
            EventPayload::Background(event) => Some(event),
            _ => None,
        }
    }

    /// Custom payload as `T`, if present and of that type.
    pub fn custom<T: Any + Send + Sync>(&self) -> Option<&T> {
        match &self.payload {
            EventPayload::Custom(data) => data.downcast_ref::<T>(),
            _ => None,
        }
    }
}
