//! The type registry: constructible types, their properties and constants.
//!
//! Every type a document may name is described once by a [`TypeDescriptor`]
//! and registered before the first build. Descriptors are immutable after
//! registration and shared read-only between builds.
//!
//! # Example
//!
//! ```
//! use horizon_forge::registry::{TypeDescriptor, TypeRegistry, VirtualProperty};
//! use horizon_forge_core::Property;
//!
//! #[derive(Default)]
//! struct Label {
//!     text: Property<String>,
//!     width: Property<i64>,
//!     height: Property<i64>,
//! }
//!
//! let registry = TypeRegistry::new();
//! registry
//!     .register(
//!         TypeDescriptor::builder::<Label>("JLabel", Label::default)
//!             .extends("Component")
//!             .localized("text", |l, v| { l.text.set(v); })
//!             .int("width", |l, v| { l.width.set(v); })
//!             .int("height", |l, v| { l.height.set(v); })
//!             .virtual_property("size", VirtualProperty::size("width", "height"))
//!             .reader("text", |l| l.text.get().into())
//!             .build(),
//!     )
//!     .unwrap();
//!
//! let label = registry.get("JLabel").unwrap();
//! assert!(label.setter("TEXT").is_some());
//! assert!(registry.type_is_a("JLabel", "Component"));
//! ```

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use horizon_forge_core::meta::CallerRef;
use horizon_forge_core::{EventType, Object, ObjectRef};

use crate::error::{BuildError, RegistryError};
use crate::handler::EventHandler;
use crate::node::Value;

/// Every object is an `Object`.
pub const ROOT_TYPE: &str = "Object";

/// Normalize a property name for lenient lookup.
///
/// Lowercases and drops `_` and `-`, so `background_color`, `backgroundColor`
/// and `Background-Color` all match.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// The lowerCamelCase form of a constant name.
///
/// `TOP_LEFT` becomes `topLeft`; `TopLeft` becomes `topLeft`; `center`
/// stays as is.
pub fn lower_camel_case(name: &str) -> String {
    let shouty = name.contains('_') || !name.chars().any(|c| c.is_lowercase());
    if !shouty {
        let mut chars = name.chars();
        return match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        };
    }

    let mut out = String::with_capacity(name.len());
    for (i, part) in name.split('_').filter(|p| !p.is_empty()).enumerate() {
        let lower = part.to_lowercase();
        if i == 0 {
            out.push_str(&lower);
        } else {
            let mut chars = lower.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    out
}

/// A named set of integer constants (an enum or a group of int constants).
///
/// Documents may use either the declared name or its lowerCamelCase form.
#[derive(Debug, Clone)]
pub struct ConstantSet {
    name: String,
    values: IndexMap<String, i64>,
    tokens: HashMap<String, String>,
}

impl ConstantSet {
    /// Create a set, rejecting constants that normalize to the same token.
    pub fn new<'a, I>(name: impl Into<String>, constants: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (&'a str, i64)>,
    {
        let name = name.into();
        let values: IndexMap<String, i64> = constants
            .into_iter()
            .map(|(constant, value)| (constant.to_string(), value))
            .collect();

        let mut tokens: HashMap<String, String> = HashMap::new();
        for declared in values.keys() {
            for token in [declared.clone(), lower_camel_case(declared)] {
                match tokens.get(&token) {
                    Some(existing) if existing != declared => {
                        return Err(RegistryError::AmbiguousConstant {
                            set: name,
                            token,
                            first: existing.clone(),
                            second: declared.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        tokens.insert(token, declared.clone());
                    }
                }
            }
        }

        Ok(Self { name, values, tokens })
    }

    /// The set name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve a declared or lowerCamelCase constant name.
    pub fn resolve(&self, token: &str) -> Option<i64> {
        self.tokens
            .get(token)
            .and_then(|declared| self.values.get(declared))
            .copied()
    }

    /// The declared constant name for a value.
    pub fn name_of(&self, value: i64) -> Option<&str> {
        self.values
            .iter()
            .find(|(_, v)| **v == value)
            .map(|(k, _)| k.as_str())
    }

    /// Declared constant names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// The parameter kind a property setter expects.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    /// Plain string.
    Str,
    /// String resolved through the resource resolver.
    Localized,
    /// Integer.
    Int,
    /// Floating point number.
    Float,
    /// Boolean.
    Bool,
    /// A constant of the named [`ConstantSet`].
    Constant(String),
    /// A list of the given item kind.
    List(Box<ParamKind>),
    /// A nested value object.
    Map,
    /// A handler chain fired for the given event type.
    Event(EventType),
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str => f.write_str("string"),
            Self::Localized => f.write_str("localized string"),
            Self::Int => f.write_str("integer"),
            Self::Float => f.write_str("float"),
            Self::Bool => f.write_str("boolean"),
            Self::Constant(set) => write!(f, "constant of {set}"),
            Self::List(item) => write!(f, "list of {item}"),
            Self::Map => f.write_str("map"),
            Self::Event(event) => write!(f, "handler for {event}"),
        }
    }
}

/// A coerced value handed to a setter.
#[derive(Clone, Debug)]
pub enum PropertyValue {
    /// String or localized string.
    Str(String),
    /// Integer or constant.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Coerced list items.
    List(Vec<PropertyValue>),
    /// Nested value object.
    Map(IndexMap<String, Value>),
    /// Resolved handler chain.
    Handler(EventHandler),
}

type SetterFn = Arc<dyn Fn(&dyn Any, PropertyValue) -> Result<(), String> + Send + Sync>;
type ReaderFn = Arc<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;
type AttachFn = Arc<dyn Fn(&dyn Any, &ObjectRef) -> Result<(), String> + Send + Sync>;
type ExpandFn = Arc<dyn Fn(&Value) -> Result<Vec<(String, Value)>, String> + Send + Sync>;
type ConstructFn = Arc<dyn Fn() -> ObjectRef + Send + Sync>;

/// A property setter of a registered type.
#[derive(Clone)]
pub struct PropertySetter {
    name: String,
    kind: ParamKind,
    apply: SetterFn,
}

impl PropertySetter {
    /// The declared property name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parameter kind.
    pub fn kind(&self) -> &ParamKind {
        &self.kind
    }

    /// Call the setter on `target`.
    pub fn apply(&self, target: &ObjectRef, value: PropertyValue) -> Result<(), String> {
        (self.apply)(target.as_any(), value)
    }
}

impl fmt::Debug for PropertySetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.kind)
    }
}

/// A property that expands into several real setter calls.
#[derive(Clone)]
pub struct VirtualProperty {
    expand: ExpandFn,
}

impl VirtualProperty {
    /// A custom expansion rule.
    pub fn new<F>(expand: F) -> Self
    where
        F: Fn(&Value) -> Result<Vec<(String, Value)>, String> + Send + Sync + 'static,
    {
        Self {
            expand: Arc::new(expand),
        }
    }

    /// Expand `"WxH"` or `[w, h]` into the two given integer properties.
    pub fn size(width: &str, height: &str) -> Self {
        let (width, height) = (width.to_string(), height.to_string());
        Self::new(move |value| {
            let (w, h) = parse_pair(value)?;
            Ok(vec![
                (width.clone(), Value::Int(w)),
                (height.clone(), Value::Int(h)),
            ])
        })
    }

    /// Expand the value into setter name/value pairs.
    pub fn expand(&self, value: &Value) -> Result<Vec<(String, Value)>, String> {
        (self.expand)(value)
    }
}

impl fmt::Debug for VirtualProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VirtualProperty")
    }
}

fn parse_pair(value: &Value) -> Result<(i64, i64), String> {
    match value {
        Value::Str(text) | Value::Reference(text) => {
            let (w, h) = text
                .split_once(['x', 'X'])
                .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{text}'"))?;
            let w = w.trim().parse::<i64>().map_err(|e| format!("width: {e}"))?;
            let h = h.trim().parse::<i64>().map_err(|e| format!("height: {e}"))?;
            Ok((w, h))
        }
        Value::List(items) => match items.as_slice() {
            [Value::Int(w), Value::Int(h)] => Ok((*w, *h)),
            _ => Err("expected a list of two integers".to_string()),
        },
        other => Err(format!("expected WIDTHxHEIGHT or [w, h], got {}", other.kind_name())),
    }
}

/// Describes one constructible type.
pub struct TypeDescriptor {
    type_name: String,
    type_id: TypeId,
    rust_name: &'static str,
    supertypes: Vec<String>,
    construct: ConstructFn,
    setters: IndexMap<String, PropertySetter>,
    readers: IndexMap<String, ReaderFn>,
    virtuals: IndexMap<String, VirtualProperty>,
    attach: Option<AttachFn>,
    normalized: HashMap<String, String>,
    /// First pair of setter names sharing a normalized token: (token, first, second).
    collision: Option<(String, String, String)>,
}

impl TypeDescriptor {
    /// Start describing type `T`, constructed by `construct`.
    pub fn builder<T: Object>(
        type_name: impl Into<String>,
        construct: impl Fn() -> T + Send + Sync + 'static,
    ) -> TypeDescriptorBuilder<T> {
        TypeDescriptorBuilder {
            descriptor: TypeDescriptor {
                type_name: type_name.into(),
                type_id: TypeId::of::<T>(),
                rust_name: std::any::type_name::<T>(),
                supertypes: Vec::new(),
                construct: Arc::new(move || ObjectRef::new(construct())),
                setters: IndexMap::new(),
                readers: IndexMap::new(),
                virtuals: IndexMap::new(),
                attach: None,
                normalized: HashMap::new(),
                collision: None,
            },
            _type: std::marker::PhantomData,
        }
    }

    /// The registered type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The Rust `TypeId` of constructed objects.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Directly declared supertype and capability names.
    pub fn supertypes(&self) -> &[String] {
        &self.supertypes
    }

    /// Construct a new instance.
    pub fn construct(&self) -> ObjectRef {
        (self.construct)()
    }

    /// Look up a setter: exact name first, then normalized.
    pub fn setter(&self, name: &str) -> Option<&PropertySetter> {
        self.setters.get(name).or_else(|| {
            self.normalized
                .get(&normalize_name(name))
                .and_then(|declared| self.setters.get(declared))
        })
    }

    /// Look up a virtual property: exact name first, then normalized.
    pub fn virtual_property(&self, name: &str) -> Option<&VirtualProperty> {
        self.virtuals.get(name).or_else(|| {
            let wanted = normalize_name(name);
            self.virtuals
                .iter()
                .find(|(declared, _)| normalize_name(declared) == wanted)
                .map(|(_, v)| v)
        })
    }

    /// Read a property value from `target`.
    pub fn read(&self, target: &ObjectRef, property: &str) -> Option<Value> {
        let reader = self.readers.get(property).or_else(|| {
            let wanted = normalize_name(property);
            self.readers
                .iter()
                .find(|(declared, _)| normalize_name(declared) == wanted)
                .map(|(_, r)| r)
        })?;
        reader(target.as_any())
    }

    /// Whether the type has a reader for `property`.
    pub fn can_read(&self, property: &str) -> bool {
        let wanted = normalize_name(property);
        self.readers.keys().any(|declared| normalize_name(declared) == wanted)
    }

    /// Whether the type accepts child objects.
    pub fn accepts_children(&self) -> bool {
        self.attach.is_some()
    }

    /// Attach a built child to `parent`.
    pub fn attach_child(&self, parent: &ObjectRef, child: &ObjectRef) -> Result<(), String> {
        match &self.attach {
            Some(attach) => attach(parent.as_any(), child),
            None => Err(format!("type '{}' cannot hold children", self.type_name)),
        }
    }

    /// All setters in declaration order.
    pub fn setters(&self) -> impl Iterator<Item = &PropertySetter> {
        self.setters.values()
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("rust_name", &self.rust_name)
            .field("supertypes", &self.supertypes)
            .field("setters", &self.setters.values().collect::<Vec<_>>())
            .finish()
    }
}

/// Fluent builder for a [`TypeDescriptor`].
pub struct TypeDescriptorBuilder<T> {
    descriptor: TypeDescriptor,
    _type: std::marker::PhantomData<fn(&T)>,
}

impl<T: Object> TypeDescriptorBuilder<T> {
    /// Declare a supertype or capability name.
    pub fn extends(mut self, supertype: impl Into<String>) -> Self {
        self.descriptor.supertypes.push(supertype.into());
        self
    }

    /// Declare a setter of any kind from a raw [`PropertyValue`] closure.
    pub fn setter<F>(mut self, name: impl Into<String>, kind: ParamKind, f: F) -> Self
    where
        F: Fn(&T, PropertyValue) -> Result<(), String> + Send + Sync + 'static,
    {
        let name = name.into();
        let rust_name = self.descriptor.rust_name;
        let apply: SetterFn = Arc::new(move |target, value| {
            let target = target
                .downcast_ref::<T>()
                .ok_or_else(|| format!("setter of {rust_name} applied to another type"))?;
            f(target, value)
        });
        self.descriptor
            .setters
            .insert(name.clone(), PropertySetter { name, kind, apply });
        self
    }

    /// Declare a plain string property.
    pub fn string<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&T, String) + Send + Sync + 'static,
    {
        self.setter(name, ParamKind::Str, move |t, v| match v {
            PropertyValue::Str(s) => {
                f(t, s);
                Ok(())
            }
            other => Err(unexpected("string", &other)),
        })
    }

    /// Declare a string property resolved through the resource resolver.
    pub fn localized<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&T, String) + Send + Sync + 'static,
    {
        self.setter(name, ParamKind::Localized, move |t, v| match v {
            PropertyValue::Str(s) => {
                f(t, s);
                Ok(())
            }
            other => Err(unexpected("string", &other)),
        })
    }

    /// Declare an integer property.
    pub fn int<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&T, i64) + Send + Sync + 'static,
    {
        self.setter(name, ParamKind::Int, move |t, v| match v {
            PropertyValue::Int(i) => {
                f(t, i);
                Ok(())
            }
            other => Err(unexpected("integer", &other)),
        })
    }

    /// Declare a floating point property.
    pub fn float<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&T, f64) + Send + Sync + 'static,
    {
        self.setter(name, ParamKind::Float, move |t, v| match v {
            PropertyValue::Float(x) => {
                f(t, x);
                Ok(())
            }
            other => Err(unexpected("float", &other)),
        })
    }

    /// Declare a boolean property.
    pub fn bool<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&T, bool) + Send + Sync + 'static,
    {
        self.setter(name, ParamKind::Bool, move |t, v| match v {
            PropertyValue::Bool(b) => {
                f(t, b);
                Ok(())
            }
            other => Err(unexpected("boolean", &other)),
        })
    }

    /// Declare a property taking a constant of the named set.
    pub fn constant<F>(self, name: impl Into<String>, set: impl Into<String>, f: F) -> Self
    where
        F: Fn(&T, i64) + Send + Sync + 'static,
    {
        self.setter(name, ParamKind::Constant(set.into()), move |t, v| match v {
            PropertyValue::Int(i) => {
                f(t, i);
                Ok(())
            }
            other => Err(unexpected("constant", &other)),
        })
    }

    /// Declare a multi-valued property.
    pub fn list<F>(self, name: impl Into<String>, item: ParamKind, f: F) -> Self
    where
        F: Fn(&T, Vec<PropertyValue>) + Send + Sync + 'static,
    {
        self.setter(name, ParamKind::List(Box::new(item)), move |t, v| match v {
            PropertyValue::List(items) => {
                f(t, items);
                Ok(())
            }
            other => Err(unexpected("list", &other)),
        })
    }

    /// Declare a property taking a nested value object.
    pub fn map<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&T, IndexMap<String, Value>) -> Result<(), String> + Send + Sync + 'static,
    {
        self.setter(name, ParamKind::Map, move |t, v| match v {
            PropertyValue::Map(entries) => f(t, entries),
            other => Err(unexpected("map", &other)),
        })
    }

    /// Declare an event property whose value is a handler chain.
    pub fn event<F>(self, name: impl Into<String>, event: EventType, f: F) -> Self
    where
        F: Fn(&T, EventHandler) + Send + Sync + 'static,
    {
        self.setter(name, ParamKind::Event(event), move |t, v| match v {
            PropertyValue::Handler(handler) => {
                f(t, handler);
                Ok(())
            }
            other => Err(unexpected("handler", &other)),
        })
    }

    /// Declare a virtual property.
    pub fn virtual_property(mut self, name: impl Into<String>, rule: VirtualProperty) -> Self {
        self.descriptor.virtuals.insert(name.into(), rule);
        self
    }

    /// Declare a property reader, used by validation and data binding.
    pub fn reader<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        let reader: ReaderFn = Arc::new(move |target| target.downcast_ref::<T>().map(&f));
        self.descriptor.readers.insert(name.into(), reader);
        self
    }

    /// Declare how built children are attached.
    pub fn children<F>(mut self, f: F) -> Self
    where
        F: Fn(&T, &ObjectRef) -> Result<(), String> + Send + Sync + 'static,
    {
        let rust_name = self.descriptor.rust_name;
        self.descriptor.attach = Some(Arc::new(move |parent, child| {
            let parent = parent
                .downcast_ref::<T>()
                .ok_or_else(|| format!("child attacher of {rust_name} applied to another type"))?;
            f(parent, child)
        }));
        self
    }

    /// Finish the descriptor.
    ///
    /// Two setters normalizing to the same token are reported when the
    /// descriptor is registered.
    pub fn build(mut self) -> TypeDescriptor {
        let mut normalized: HashMap<String, String> = HashMap::new();
        for declared in self.descriptor.setters.keys() {
            let token = normalize_name(declared);
            match normalized.get(&token) {
                Some(first) => {
                    tracing::warn!(
                        target: "horizon_forge::build",
                        type_name = %self.descriptor.type_name,
                        first = %first,
                        second = %declared,
                        "setters share a normalized name"
                    );
                    if self.descriptor.collision.is_none() {
                        self.descriptor.collision = Some((token, first.clone(), declared.clone()));
                    }
                }
                None => {
                    normalized.insert(token, declared.clone());
                }
            }
        }
        self.descriptor.normalized = normalized;
        self.descriptor
    }
}

fn unexpected(expected: &str, got: &PropertyValue) -> String {
    format!("expected {expected}, got {got:?}")
}

/// How a node's type name was resolved.
#[derive(Debug, Clone)]
pub enum ResolvedType {
    /// A registered type; a new instance is constructed.
    Registered(Arc<TypeDescriptor>),
    /// An instance held by a caller field of that name.
    ///
    /// The descriptor is present when the instance's type is registered, so
    /// properties can still be applied.
    CallerInstance {
        /// The existing instance.
        instance: ObjectRef,
        /// The caller type that declared the field.
        caller: String,
        /// Descriptor of the instance's type, if registered.
        descriptor: Option<Arc<TypeDescriptor>>,
    },
}

/// The set of constructible types and constant sets known to an engine.
///
/// Registration happens at configuration time; builds only read.
pub struct TypeRegistry {
    types: RwLock<IndexMap<String, Arc<TypeDescriptor>>>,
    by_type_id: RwLock<HashMap<TypeId, String>>,
    constants: RwLock<HashMap<String, Arc<ConstantSet>>>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            types: RwLock::new(IndexMap::new()),
            by_type_id: RwLock::new(HashMap::new()),
            constants: RwLock::new(HashMap::new()),
        }
    }

    /// Register a type descriptor.
    ///
    /// Constant sets a descriptor refers to must be registered first.
    pub fn register(&self, descriptor: TypeDescriptor) -> Result<(), RegistryError> {
        if let Some((token, first, second)) = &descriptor.collision {
            return Err(RegistryError::AmbiguousProperty {
                type_name: descriptor.type_name.clone(),
                token: token.clone(),
                first: first.clone(),
                second: second.clone(),
            });
        }
        for setter in descriptor.setters.values() {
            if let Some(set) = constant_set_of(&setter.kind) {
                if !self.constants.read().contains_key(set) {
                    return Err(RegistryError::UnknownConstantSet {
                        type_name: descriptor.type_name.clone(),
                        property: setter.name.clone(),
                        set: set.to_string(),
                    });
                }
            }
        }

        let mut types = self.types.write();
        if types.contains_key(&descriptor.type_name) {
            return Err(RegistryError::DuplicateType(descriptor.type_name.clone()));
        }
        tracing::debug!(
            target: "horizon_forge::build",
            type_name = %descriptor.type_name,
            rust_type = descriptor.rust_name,
            setters = descriptor.setters.len(),
            "registered type"
        );
        // The first registration of a Rust type wins the reverse lookup.
        self.by_type_id
            .write()
            .entry(descriptor.type_id)
            .or_insert_with(|| descriptor.type_name.clone());
        types.insert(descriptor.type_name.clone(), Arc::new(descriptor));
        Ok(())
    }

    /// Register a constant set.
    pub fn register_constants(&self, set: ConstantSet) -> Result<(), RegistryError> {
        let mut constants = self.constants.write();
        if constants.contains_key(set.name()) {
            return Err(RegistryError::DuplicateConstantSet(set.name().to_string()));
        }
        constants.insert(set.name().to_string(), Arc::new(set));
        Ok(())
    }

    /// A registered descriptor by exact type name.
    pub fn get(&self, type_name: &str) -> Option<Arc<TypeDescriptor>> {
        self.types.read().get(type_name).cloned()
    }

    /// Whether a type name is registered.
    pub fn contains(&self, type_name: &str) -> bool {
        self.types.read().contains_key(type_name)
    }

    /// Registered type names in registration order.
    pub fn type_names(&self) -> Vec<String> {
        self.types.read().keys().cloned().collect()
    }

    /// The descriptor of an object's concrete type, if registered.
    pub fn descriptor_for(&self, object: &ObjectRef) -> Option<Arc<TypeDescriptor>> {
        let name = self.by_type_id.read().get(&object.type_id()).cloned()?;
        self.get(&name)
    }

    /// A registered constant set.
    pub fn constants(&self, set: &str) -> Option<Arc<ConstantSet>> {
        self.constants.read().get(set).cloned()
    }

    /// Whether the registered type `type_name` is, or extends, `capability`.
    ///
    /// Supertypes are followed transitively through registered descriptors;
    /// every type is an [`ROOT_TYPE`].
    pub fn type_is_a(&self, type_name: &str, capability: &str) -> bool {
        if type_name == capability || capability == ROOT_TYPE {
            return true;
        }
        let types = self.types.read();
        let mut pending = vec![type_name.to_string()];
        let mut seen = HashSet::new();
        while let Some(current) = pending.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(descriptor) = types.get(&current) {
                for supertype in &descriptor.supertypes {
                    if supertype == capability {
                        return true;
                    }
                    pending.push(supertype.clone());
                }
            }
        }
        false
    }

    /// Whether `object`'s registered type is, or extends, `capability`.
    ///
    /// Objects of unregistered types only satisfy [`ROOT_TYPE`].
    pub fn is_a(&self, object: &ObjectRef, capability: &str) -> bool {
        if capability == ROOT_TYPE {
            return true;
        }
        let name = self.by_type_id.read().get(&object.type_id()).cloned();
        match name {
            Some(name) => self.type_is_a(&name, capability),
            None => false,
        }
    }

    /// The registered type name of `object`, or its Rust type name.
    pub fn display_type(&self, object: &ObjectRef) -> String {
        self.by_type_id
            .read()
            .get(&object.type_id())
            .cloned()
            .unwrap_or_else(|| object.type_name().to_string())
    }

    /// Resolve a node's type name.
    ///
    /// Registered types win; otherwise a caller field of that name holding
    /// an instance is used, searching callers innermost first.
    pub fn resolve(
        &self,
        type_name: &str,
        callers: &[CallerRef],
        node: &impl fmt::Display,
    ) -> Result<ResolvedType, BuildError> {
        if let Some(descriptor) = self.get(type_name) {
            return Ok(ResolvedType::Registered(descriptor));
        }

        for caller in callers {
            let Some(field) = caller.meta().field(type_name) else {
                continue;
            };
            let instance = field
                .get(caller.receiver())
                .map_err(horizon_forge_core::ForgeError::from)?;
            if let Some(instance) = instance {
                tracing::trace!(
                    target: "horizon_forge::build",
                    type_name,
                    caller = caller.type_name(),
                    "type resolved to caller-held instance"
                );
                return Ok(ResolvedType::CallerInstance {
                    descriptor: self.descriptor_for(&instance),
                    instance,
                    caller: caller.type_name().to_string(),
                });
            }
        }

        Err(BuildError::unknown_type(type_name, node))
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.type_names())
            .field("constant_sets", &self.constants.read().len())
            .finish()
    }
}

fn constant_set_of(kind: &ParamKind) -> Option<&str> {
    match kind {
        ParamKind::Constant(set) => Some(set),
        ParamKind::List(item) => constant_set_of(item),
        _ => None,
    }
}

static_assertions::assert_impl_all!(TypeRegistry: Send, Sync);
