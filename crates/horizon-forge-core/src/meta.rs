//! Meta-object system for caller introspection.
//!
//! The builder binds named objects into caller fields and resolves handler
//! tokens against caller methods. Rust has no runtime reflection, so every
//! caller type describes itself once through [`Caller::meta_object`]. The
//! resulting [`MetaObject`] is cached process-wide by `TypeId`.
//!
//! # Fields
//!
//! - [`MetaObjectBuilder::field`] declares a `Bound<Arc<T>>` field that only
//!   accepts objects of exactly type `T`.
//! - [`MetaObjectBuilder::field_as`] declares a `Bound<ObjectRef>` field that
//!   accepts any object whose registered type is, or extends, a capability name.
//!
//! # Methods
//!
//! A method name may be declared with several signatures. They are ranked in
//! a fixed preference order, best first:
//!
//! 1. `(source, event)`
//! 2. `(event)`
//! 3. `(source)`
//! 4. `()`
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_forge_core::meta::{Caller, MetaObject};
//! use horizon_forge_core::property::Bound;
//!
//! struct Button;
//!
//! #[derive(Default)]
//! struct LoginPanel {
//!     btn_ok: Bound<Arc<Button>>,
//! }
//!
//! impl Caller for LoginPanel {
//!     fn meta_object() -> MetaObject {
//!         MetaObject::builder::<Self>("LoginPanel")
//!             .field("btnOk", |panel| &panel.btn_ok)
//!             .method("save", |_panel| true)
//!             .build()
//!     }
//! }
//!
//! let meta = MetaObject::of::<LoginPanel>();
//! assert!(meta.field("btnOk").is_some());
//! assert!(meta.method("save").is_some());
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::error::ObjectError;
use crate::event::{Event, EventType};
use crate::object::{Object, ObjectRef};
use crate::property::Bound;
use crate::task::BackgroundTaskDescriptor;

/// A type the builder can bind objects into and resolve handlers against.
pub trait Caller: Object {
    /// Describe the fields and methods of this type.
    ///
    /// Called once per type; the result is cached.
    fn meta_object() -> MetaObject
    where
        Self: Sized;
}

/// The result of a handler invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HandlerOutcome {
    /// Continue with the next step of the chain.
    #[default]
    Continue,
    /// Stop the chain. Returned for `false`.
    Abort,
    /// Stop the chain with an error.
    Failed(String),
}

impl HandlerOutcome {
    /// Whether the chain continues after this outcome.
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }
}

impl From<()> for HandlerOutcome {
    fn from(_: ()) -> Self {
        Self::Continue
    }
}

impl From<bool> for HandlerOutcome {
    fn from(value: bool) -> Self {
        if value { Self::Continue } else { Self::Abort }
    }
}

impl<T, E> From<Result<T, E>> for HandlerOutcome
where
    T: Into<HandlerOutcome>,
    E: fmt::Display,
{
    fn from(value: Result<T, E>) -> Self {
        match value {
            Ok(inner) => inner.into(),
            Err(err) => Self::Failed(err.to_string()),
        }
    }
}

/// The declared type of a caller field or a handler's source parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredType {
    /// Exactly one concrete Rust type.
    Concrete {
        /// Its `TypeId`.
        type_id: TypeId,
        /// Its Rust type name.
        type_name: &'static str,
    },
    /// Any object whose registered type is, or extends, this name.
    Capability(String),
}

impl DeclaredType {
    /// The declared type for `T`.
    pub fn of<T: 'static>() -> Self {
        Self::Concrete {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Whether `object` is acceptable. `is_a` answers capability checks.
    pub fn accepts(&self, object: &ObjectRef, is_a: &dyn Fn(&ObjectRef, &str) -> bool) -> bool {
        match self {
            Self::Concrete { type_id, .. } => object.type_id() == *type_id,
            Self::Capability(name) => is_a(object, name),
        }
    }

    /// A readable name for error messages.
    pub fn display_name(&self) -> &str {
        match self {
            Self::Concrete { type_name, .. } => type_name,
            Self::Capability(name) => name,
        }
    }
}

type FieldGetter = Arc<dyn Fn(&dyn Any) -> Result<Option<ObjectRef>, ObjectError> + Send + Sync>;
type FieldSetter = Arc<dyn Fn(&dyn Any, &ObjectRef) -> Result<(), ObjectError> + Send + Sync>;

/// A caller field the reference binder can fill.
#[derive(Clone)]
pub struct FieldMeta {
    name: String,
    declared: DeclaredType,
    get: FieldGetter,
    set: FieldSetter,
}

impl FieldMeta {
    /// The field name as nodes refer to it.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared type of the field.
    pub fn declared_type(&self) -> &DeclaredType {
        &self.declared
    }

    /// Read the field on `caller`.
    pub fn get(&self, caller: &dyn Any) -> Result<Option<ObjectRef>, ObjectError> {
        (self.get)(caller)
    }

    /// Assign `value` to the field on `caller`.
    ///
    /// Compatibility must be checked with [`DeclaredType::accepts`] first;
    /// a concrete field still rejects a mismatched object.
    pub fn set(&self, caller: &dyn Any, value: &ObjectRef) -> Result<(), ObjectError> {
        (self.set)(caller, value)
    }
}

impl fmt::Debug for FieldMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMeta")
            .field("name", &self.name)
            .field("declared", &self.declared.display_name())
            .finish()
    }
}

type NoArgsFn = Arc<dyn Fn(&dyn Any) -> HandlerOutcome + Send + Sync>;
type EventFn = Arc<dyn Fn(&dyn Any, &Event) -> HandlerOutcome + Send + Sync>;
type SourceFn = Arc<dyn Fn(&dyn Any, &ObjectRef) -> HandlerOutcome + Send + Sync>;
type SourceEventFn = Arc<dyn Fn(&dyn Any, &ObjectRef, &Event) -> HandlerOutcome + Send + Sync>;

/// One callable signature of a handler method.
#[derive(Clone)]
pub enum Invocable {
    /// `(source, event)`.
    SourceAndEvent {
        /// Accepted source type.
        source: DeclaredType,
        /// Accepted event type.
        event: EventType,
        /// The call.
        call: SourceEventFn,
    },
    /// `(event)`.
    Event {
        /// Accepted event type.
        event: EventType,
        /// The call.
        call: EventFn,
    },
    /// `(source)`.
    Source {
        /// Accepted source type.
        source: DeclaredType,
        /// The call.
        call: SourceFn,
    },
    /// `()`.
    NoArgs {
        /// The call.
        call: NoArgsFn,
    },
}

impl Invocable {
    /// Preference rank, 1 is best.
    pub fn rank(&self) -> u8 {
        match self {
            Self::SourceAndEvent { .. } => 1,
            Self::Event { .. } => 2,
            Self::Source { .. } => 3,
            Self::NoArgs { .. } => 4,
        }
    }

    /// Short signature name for logs and errors.
    pub fn signature(&self) -> &'static str {
        match self {
            Self::SourceAndEvent { .. } => "(source, event)",
            Self::Event { .. } => "(event)",
            Self::Source { .. } => "(source)",
            Self::NoArgs { .. } => "()",
        }
    }

    /// Whether this signature can receive `event_type` fired by `source`.
    pub fn accepts(
        &self,
        source: &ObjectRef,
        event_type: &EventType,
        is_a: &dyn Fn(&ObjectRef, &str) -> bool,
    ) -> bool {
        match self {
            Self::SourceAndEvent { source: declared, event, .. } => {
                event.accepts(event_type) && declared.accepts(source, is_a)
            }
            Self::Event { event, .. } => event.accepts(event_type),
            Self::Source { source: declared, .. } => declared.accepts(source, is_a),
            Self::NoArgs { .. } => true,
        }
    }

    /// Invoke on `caller` with `event`; the source is the event's source.
    pub fn invoke(&self, caller: &dyn Any, event: &Event) -> HandlerOutcome {
        match self {
            Self::SourceAndEvent { call, .. } => call(caller, event.source(), event),
            Self::Event { call, .. } => call(caller, event),
            Self::Source { call, .. } => call(caller, event.source()),
            Self::NoArgs { call } => call(caller),
        }
    }
}

impl fmt::Debug for Invocable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.signature())
    }
}

static BACKGROUND_EVENT: EventType = EventType::BACKGROUND;

/// A named handler method with all its declared signatures.
#[derive(Clone, Debug)]
pub struct MethodMeta {
    name: String,
    overloads: Vec<Invocable>,
    background: Option<BackgroundTaskDescriptor>,
}

impl MethodMeta {
    /// The method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All declared signatures in declaration order.
    pub fn overloads(&self) -> &[Invocable] {
        &self.overloads
    }

    /// The background descriptor, if the method runs off the UI thread.
    pub fn background(&self) -> Option<&BackgroundTaskDescriptor> {
        self.background.as_ref()
    }

    /// The event type the method is resolved against for a fired event.
    ///
    /// Background methods always receive a background event.
    pub fn effective_event_type<'a>(&self, fired: &'a EventType) -> &'a EventType {
        if self.background.is_some() {
            &BACKGROUND_EVENT
        } else {
            fired
        }
    }

    /// Index of the best signature accepting `event_type` from `source`.
    pub fn select(
        &self,
        source: &ObjectRef,
        event_type: &EventType,
        is_a: &dyn Fn(&ObjectRef, &str) -> bool,
    ) -> Option<usize> {
        let event_type = self.effective_event_type(event_type);
        self.overloads
            .iter()
            .enumerate()
            .filter(|(_, inv)| inv.accepts(source, event_type, is_a))
            .min_by_key(|(_, inv)| inv.rank())
            .map(|(index, _)| index)
    }
}

/// The introspection record of one caller type.
pub struct MetaObject {
    type_name: String,
    type_id: TypeId,
    rust_name: &'static str,
    fields: IndexMap<String, FieldMeta>,
    methods: IndexMap<String, MethodMeta>,
}

static INTROSPECTION_CACHE: OnceLock<RwLock<HashMap<TypeId, Arc<MetaObject>>>> = OnceLock::new();

fn introspection_cache() -> &'static RwLock<HashMap<TypeId, Arc<MetaObject>>> {
    INTROSPECTION_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

impl MetaObject {
    /// Start describing caller type `C`.
    pub fn builder<C: Object>(type_name: impl Into<String>) -> MetaObjectBuilder<C> {
        MetaObjectBuilder {
            meta: MetaObject {
                type_name: type_name.into(),
                type_id: TypeId::of::<C>(),
                rust_name: std::any::type_name::<C>(),
                fields: IndexMap::new(),
                methods: IndexMap::new(),
            },
            last_method: None,
            _caller: std::marker::PhantomData,
        }
    }

    /// The cached meta-object of `C`, introspecting it on first use.
    pub fn of<C: Caller>() -> Arc<MetaObject> {
        let type_id = TypeId::of::<C>();
        if let Some(meta) = introspection_cache().read().get(&type_id) {
            return meta.clone();
        }
        let meta = Arc::new(C::meta_object());
        tracing::debug!(
            target: "horizon_forge_core::meta",
            caller = %meta.type_name,
            fields = meta.fields.len(),
            methods = meta.methods.len(),
            "introspected caller type"
        );
        introspection_cache().write().entry(type_id).or_insert(meta).clone()
    }

    /// The declared type name of the caller.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The Rust `TypeId` of the caller.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// A declared field by name.
    pub fn field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.get(name)
    }

    /// All declared fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldMeta> {
        self.fields.values()
    }

    /// A declared method by name.
    pub fn method(&self, name: &str) -> Option<&MethodMeta> {
        self.methods.get(name)
    }

    /// All declared methods in declaration order.
    pub fn methods(&self) -> impl Iterator<Item = &MethodMeta> {
        self.methods.values()
    }

    fn receiver<'a, C: 'static>(rust_name: &'static str, caller: &'a dyn Any) -> Result<&'a C, ObjectError> {
        caller
            .downcast_ref::<C>()
            .ok_or(ObjectError::WrongReceiver { expected: rust_name })
    }
}

impl fmt::Debug for MetaObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaObject")
            .field("type_name", &self.type_name)
            .field("rust_name", &self.rust_name)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Fluent builder for a [`MetaObject`].
pub struct MetaObjectBuilder<C> {
    meta: MetaObject,
    last_method: Option<String>,
    _caller: std::marker::PhantomData<fn(&C)>,
}

impl<C: Object> MetaObjectBuilder<C> {
    /// Declare a field holding exactly objects of type `T`.
    pub fn field<T, F>(mut self, name: impl Into<String>, access: F) -> Self
    where
        T: Object,
        F: Fn(&C) -> &Bound<Arc<T>> + Send + Sync + 'static,
    {
        let rust_name = self.meta.rust_name;
        let access = Arc::new(access);
        let get_access = access.clone();
        let field = FieldMeta {
            name: name.into(),
            declared: DeclaredType::of::<T>(),
            get: Arc::new(move |caller| {
                let caller = MetaObject::receiver::<C>(rust_name, caller)?;
                Ok(get_access(caller).get().map(ObjectRef::from))
            }),
            set: Arc::new(move |caller, value| {
                let caller = MetaObject::receiver::<C>(rust_name, caller)?;
                let typed = value.downcast::<T>().ok_or_else(|| ObjectError::TypeMismatch {
                    expected: std::any::type_name::<T>().to_string(),
                    got: value.type_name(),
                })?;
                access(caller).set(typed);
                Ok(())
            }),
        };
        self.meta.fields.insert(field.name.clone(), field);
        self
    }

    /// Declare a field holding any object of the named capability.
    pub fn field_as<F>(mut self, name: impl Into<String>, capability: impl Into<String>, access: F) -> Self
    where
        F: Fn(&C) -> &Bound<ObjectRef> + Send + Sync + 'static,
    {
        let rust_name = self.meta.rust_name;
        let access = Arc::new(access);
        let get_access = access.clone();
        let field = FieldMeta {
            name: name.into(),
            declared: DeclaredType::Capability(capability.into()),
            get: Arc::new(move |caller| {
                let caller = MetaObject::receiver::<C>(rust_name, caller)?;
                Ok(get_access(caller).get())
            }),
            set: Arc::new(move |caller, value| {
                let caller = MetaObject::receiver::<C>(rust_name, caller)?;
                access(caller).set(value.clone());
                Ok(())
            }),
        };
        self.meta.fields.insert(field.name.clone(), field);
        self
    }

    /// Declare a `()` handler.
    pub fn method<R, F>(self, name: impl Into<String>, f: F) -> Self
    where
        R: Into<HandlerOutcome>,
        F: Fn(&C) -> R + Send + Sync + 'static,
    {
        let rust_name = self.meta.rust_name;
        let call: NoArgsFn = Arc::new(move |caller| match MetaObject::receiver::<C>(rust_name, caller) {
            Ok(caller) => f(caller).into(),
            Err(err) => HandlerOutcome::Failed(err.to_string()),
        });
        self.push(name.into(), Invocable::NoArgs { call })
    }

    /// Declare an `(event)` handler.
    pub fn method_with_event<R, F>(self, name: impl Into<String>, event: EventType, f: F) -> Self
    where
        R: Into<HandlerOutcome>,
        F: Fn(&C, &Event) -> R + Send + Sync + 'static,
    {
        let rust_name = self.meta.rust_name;
        let call: EventFn = Arc::new(move |caller, ev| match MetaObject::receiver::<C>(rust_name, caller) {
            Ok(caller) => f(caller, ev).into(),
            Err(err) => HandlerOutcome::Failed(err.to_string()),
        });
        self.push(name.into(), Invocable::Event { event, call })
    }

    /// Declare a `(source)` handler taking a concrete source type.
    pub fn method_with_source<S, R, F>(self, name: impl Into<String>, f: F) -> Self
    where
        S: Object,
        R: Into<HandlerOutcome>,
        F: Fn(&C, &S) -> R + Send + Sync + 'static,
    {
        let rust_name = self.meta.rust_name;
        let call: SourceFn = Arc::new(move |caller, source| {
            match (MetaObject::receiver::<C>(rust_name, caller), source.downcast_ref::<S>()) {
                (Ok(caller), Some(source)) => f(caller, source).into(),
                (Err(err), _) => HandlerOutcome::Failed(err.to_string()),
                (_, None) => HandlerOutcome::Failed(mismatch::<S>(source)),
            }
        });
        self.push(name.into(), Invocable::Source { source: DeclaredType::of::<S>(), call })
    }

    /// Declare a `(source)` handler taking any object of a capability.
    pub fn method_with_source_as<R, F>(self, name: impl Into<String>, capability: impl Into<String>, f: F) -> Self
    where
        R: Into<HandlerOutcome>,
        F: Fn(&C, &ObjectRef) -> R + Send + Sync + 'static,
    {
        let rust_name = self.meta.rust_name;
        let call: SourceFn = Arc::new(move |caller, source| match MetaObject::receiver::<C>(rust_name, caller) {
            Ok(caller) => f(caller, source).into(),
            Err(err) => HandlerOutcome::Failed(err.to_string()),
        });
        self.push(
            name.into(),
            Invocable::Source { source: DeclaredType::Capability(capability.into()), call },
        )
    }

    /// Declare a `(source, event)` handler taking a concrete source type.
    pub fn method_with_source_and_event<S, R, F>(self, name: impl Into<String>, event: EventType, f: F) -> Self
    where
        S: Object,
        R: Into<HandlerOutcome>,
        F: Fn(&C, &S, &Event) -> R + Send + Sync + 'static,
    {
        let rust_name = self.meta.rust_name;
        let call: SourceEventFn = Arc::new(move |caller, source, ev| {
            match (MetaObject::receiver::<C>(rust_name, caller), source.downcast_ref::<S>()) {
                (Ok(caller), Some(source)) => f(caller, source, ev).into(),
                (Err(err), _) => HandlerOutcome::Failed(err.to_string()),
                (_, None) => HandlerOutcome::Failed(mismatch::<S>(source)),
            }
        });
        self.push(
            name.into(),
            Invocable::SourceAndEvent { source: DeclaredType::of::<S>(), event, call },
        )
    }

    /// Declare a `(source, event)` handler taking any object of a capability.
    pub fn method_with_source_as_and_event<R, F>(
        self,
        name: impl Into<String>,
        capability: impl Into<String>,
        event: EventType,
        f: F,
    ) -> Self
    where
        R: Into<HandlerOutcome>,
        F: Fn(&C, &ObjectRef, &Event) -> R + Send + Sync + 'static,
    {
        let rust_name = self.meta.rust_name;
        let call: SourceEventFn = Arc::new(move |caller, source, ev| {
            match MetaObject::receiver::<C>(rust_name, caller) {
                Ok(caller) => f(caller, source, ev).into(),
                Err(err) => HandlerOutcome::Failed(err.to_string()),
            }
        });
        self.push(
            name.into(),
            Invocable::SourceAndEvent {
                source: DeclaredType::Capability(capability.into()),
                event,
                call,
            },
        )
    }

    /// Run the most recently declared method on the background lane.
    ///
    /// The descriptor's `method` is replaced by the method's name.
    pub fn in_background(mut self, descriptor: BackgroundTaskDescriptor) -> Self {
        match self.last_method.as_deref().and_then(|name| self.meta.methods.get_mut(name)) {
            Some(method) => {
                method.background = Some(descriptor.for_method(&method.name));
            }
            None => {
                tracing::warn!(
                    target: "horizon_forge_core::meta",
                    caller = %self.meta.type_name,
                    "in_background() called before any method was declared"
                );
            }
        }
        self
    }

    /// Finish the meta-object.
    pub fn build(self) -> MetaObject {
        self.meta
    }

    fn push(mut self, name: String, invocable: Invocable) -> Self {
        self.meta
            .methods
            .entry(name.clone())
            .or_insert_with(|| MethodMeta {
                name: name.clone(),
                overloads: Vec::new(),
                background: None,
            })
            .overloads
            .push(invocable);
        self.last_method = Some(name);
        self
    }
}

fn mismatch<S: 'static>(source: &ObjectRef) -> String {
    ObjectError::TypeMismatch {
        expected: std::any::type_name::<S>().to_string(),
        got: source.type_name(),
    }
    .to_string()
}

/// A caller instance paired with its meta-object.
#[derive(Clone)]
pub struct CallerRef {
    object: ObjectRef,
    meta: Arc<MetaObject>,
}

impl CallerRef {
    /// Wrap a shared caller.
    pub fn new<C: Caller>(caller: Arc<C>) -> Self {
        Self {
            object: ObjectRef::from(caller),
            meta: MetaObject::of::<C>(),
        }
    }

    /// The caller as a type-erased object.
    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    /// The caller's meta-object.
    pub fn meta(&self) -> &MetaObject {
        &self.meta
    }

    /// The caller's declared type name.
    pub fn type_name(&self) -> &str {
        self.meta.type_name()
    }

    /// The caller as `&dyn Any`, the receiver meta-object closures expect.
    pub fn receiver(&self) -> &dyn Any {
        self.object.as_any()
    }
}

impl fmt::Debug for CallerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CallerRef").field(&self.meta.type_name).finish()
    }
}

static_assertions::assert_impl_all!(MetaObject: Send, Sync);
static_assertions::assert_impl_all!(CallerRef: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Button;
    struct Label;

    #[derive(Default)]
    struct Form {
        btn: Bound<Arc<Button>>,
        any: Bound<ObjectRef>,
        hits: AtomicUsize,
    }

    impl Caller for Form {
        fn meta_object() -> MetaObject {
            MetaObject::builder::<Self>("Form")
                .field("btn", |f| &f.btn)
                .field_as("any", "Component", |f| &f.any)
                .method("click", |f| {
                    f.hits.fetch_add(1, Ordering::SeqCst);
                })
                .method_with_event("click", EventType::ACTION, |f, _ev| {
                    f.hits.fetch_add(10, Ordering::SeqCst);
                })
                .method_with_source::<Button, _, _>("click", |f, _b| {
                    f.hits.fetch_add(100, Ordering::SeqCst);
                })
                .method_with_source_and_event::<Button, _, _>("click", EventType::ACTION, |f, _b, _ev| {
                    f.hits.fetch_add(1000, Ordering::SeqCst);
                })
                .method("save", |_| Ok::<_, String>(false))
                .in_background(BackgroundTaskDescriptor::new("ignored").cancelable(true))
                .build()
        }
    }

    fn no_capabilities(_: &ObjectRef, _: &str) -> bool {
        false
    }

    #[test]
    fn test_introspection_is_cached() {
        let a = MetaObject::of::<Form>();
        let b = MetaObject::of::<Form>();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.type_name(), "Form");
    }

    #[test]
    fn test_signature_preference() {
        let meta = MetaObject::of::<Form>();
        let click = meta.method("click").unwrap();

        let button = ObjectRef::new(Button);
        let label = ObjectRef::new(Label);

        let best = click.select(&button, &EventType::ACTION, &no_capabilities).unwrap();
        assert_eq!(click.overloads()[best].rank(), 1);

        // A label cannot be the source of the typed overloads.
        let best = click.select(&label, &EventType::ACTION, &no_capabilities).unwrap();
        assert_eq!(click.overloads()[best].rank(), 2);

        let best = click.select(&button, &EventType::CHANGE, &no_capabilities).unwrap();
        assert_eq!(click.overloads()[best].rank(), 3);

        let best = click.select(&label, &EventType::CHANGE, &no_capabilities).unwrap();
        assert_eq!(click.overloads()[best].rank(), 4);
    }

    #[test]
    fn test_invoke_routes_to_caller() {
        let form = Arc::new(Form::default());
        let caller = CallerRef::new(form.clone());
        let click = caller.meta().method("click").unwrap();

        let event = Event::action(Arc::new(Button));
        let index = click.select(event.source(), event.event_type(), &no_capabilities).unwrap();
        let outcome = click.overloads()[index].invoke(caller.receiver(), &event);

        assert_eq!(outcome, HandlerOutcome::Continue);
        assert_eq!(form.hits.load(Ordering::SeqCst), 1000);
    }

    #[test]
    fn test_outcome_conversions() {
        assert_eq!(HandlerOutcome::from(()), HandlerOutcome::Continue);
        assert_eq!(HandlerOutcome::from(false), HandlerOutcome::Abort);
        assert_eq!(HandlerOutcome::from(Ok::<bool, String>(true)), HandlerOutcome::Continue);
        assert_eq!(
            HandlerOutcome::from(Err::<(), _>("disk full")),
            HandlerOutcome::Failed("disk full".into())
        );
    }

    #[test]
    fn test_background_descriptor_takes_method_name() {
        let meta = MetaObject::of::<Form>();
        let save = meta.method("save").unwrap();
        let descriptor = save.background().unwrap();
        assert_eq!(descriptor.method, "save");
        assert!(descriptor.cancelable);
        assert_eq!(save.effective_event_type(&EventType::ACTION), &EventType::BACKGROUND);
        assert!(meta.method("click").unwrap().background().is_none());
    }

    #[test]
    fn test_concrete_field_rejects_other_types() {
        let form = Arc::new(Form::default());
        let caller = CallerRef::new(form.clone());
        let field = caller.meta().field("btn").unwrap();

        let label = ObjectRef::new(Label);
        assert!(!field.declared_type().accepts(&label, &no_capabilities));
        assert!(field.set(caller.receiver(), &label).is_err());

        let button = ObjectRef::new(Button);
        assert!(field.declared_type().accepts(&button, &no_capabilities));
        field.set(caller.receiver(), &button).unwrap();
        assert!(form.btn.is_bound());
        assert!(field.get(caller.receiver()).unwrap().unwrap().same_object(&button));
    }

    #[test]
    fn test_capability_field_uses_is_a() {
        let form = Arc::new(Form::default());
        let caller = CallerRef::new(form.clone());
        let field = caller.meta().field("any").unwrap();
        let label = ObjectRef::new(Label);

        assert!(!field.declared_type().accepts(&label, &no_capabilities));
        assert!(field.declared_type().accepts(&label, &|_, name| name == "Component"));
        field.set(caller.receiver(), &label).unwrap();
        assert!(form.any.get().unwrap().same_object(&label));
    }

    #[test]
    fn test_wrong_receiver_fails() {
        let meta = MetaObject::of::<Form>();
        let field = meta.field("btn").unwrap();
        let not_a_form = Label;
        assert_eq!(
            field.get(&not_a_form).unwrap_err(),
            ObjectError::WrongReceiver { expected: std::any::type_name::<Form>() }
        );
    }
}
