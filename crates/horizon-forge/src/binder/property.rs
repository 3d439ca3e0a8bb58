//! Applying node properties to built objects.
//!
//! Properties are applied in declaration order. Each value is coerced to the
//! setter's [`ParamKind`] before the setter runs; virtual properties expand
//! into several plain setter calls first.

use std::fmt;

use horizon_forge_core::logging::targets;
use horizon_forge_core::meta::CallerRef;
use horizon_forge_core::{EventType, ObjectRef};

use crate::error::BuildError;
use crate::handler::{EventHandler, HandlerResolver, HandlerToken, ResultSlot};
use crate::node::{NAME_PROPERTY, Node, NodePath, Value};
use crate::registry::{ParamKind, PropertySetter, PropertyValue, TypeDescriptor, TypeRegistry};
use crate::resource::ResourceScope;

/// Everything property coercion needs from the running build.
pub(crate) struct PropertyContext<'a> {
    pub(crate) registry: &'a TypeRegistry,
    pub(crate) resolver: &'a HandlerResolver,
    pub(crate) resources: &'a ResourceScope,
    pub(crate) callers: &'a [CallerRef],
    pub(crate) result: &'a ResultSlot,
}

/// Applies the properties of one node.
pub(crate) struct PropertyBinder<'a, 'cx> {
    cx: &'a PropertyContext<'cx>,
    target: &'a ObjectRef,
    descriptor: &'a TypeDescriptor,
    node: &'a NodePath,
}

impl<'a, 'cx> PropertyBinder<'a, 'cx> {
    pub(crate) fn new(
        cx: &'a PropertyContext<'cx>,
        target: &'a ObjectRef,
        descriptor: &'a TypeDescriptor,
        node: &'a NodePath,
    ) -> Self {
        Self {
            cx,
            target,
            descriptor,
            node,
        }
    }

    /// Apply every property of `node` except its build name.
    ///
    /// The name is still handed to a `name` setter when the type declares one.
    pub(crate) fn apply_all(&self, node: &Node) -> Result<(), BuildError> {
        for (property, value) in node.properties() {
            if property == NAME_PROPERTY && self.descriptor.setter(NAME_PROPERTY).is_none() {
                continue;
            }
            self.apply(property, value)?;
        }
        Ok(())
    }

    /// Apply one property, expanding virtual properties.
    pub(crate) fn apply(&self, property: &str, value: &Value) -> Result<(), BuildError> {
        if let Some(setter) = self.descriptor.setter(property) {
            return self.apply_setter(setter, property, value);
        }

        if let Some(rule) = self.descriptor.virtual_property(property) {
            let expanded = rule
                .expand(value)
                .map_err(|message| BuildError::coercion(self.node, property, value, "virtual property", message))?;
            tracing::trace!(
                target: targets::BINDER,
                property,
                expanded = expanded.len(),
                "virtual property expanded"
            );
            for (name, value) in expanded {
                let setter = self
                    .descriptor
                    .setter(&name)
                    .ok_or_else(|| BuildError::unknown_property(self.node, self.descriptor.type_name(), &name))?;
                self.apply_setter(setter, &name, &value)?;
            }
            return Ok(());
        }

        Err(BuildError::unknown_property(self.node, self.descriptor.type_name(), property))
    }

    fn apply_setter(&self, setter: &PropertySetter, property: &str, value: &Value) -> Result<(), BuildError> {
        let coerced = self.coerce(value, setter.kind(), property)?;
        setter
            .apply(self.target, coerced)
            .map_err(|message| BuildError::coercion(self.node, property, value, setter.kind().to_string(), message))
    }

    fn coerce(&self, value: &Value, kind: &ParamKind, property: &str) -> Result<PropertyValue, BuildError> {
        if let ParamKind::Event(event_type) = kind {
            return self.resolve_handler(value, event_type, property).map(PropertyValue::Handler);
        }
        coerce_value(value, kind, self.cx.registry, self.cx.resources)
            .map_err(|message| BuildError::coercion(self.node, property, value, kind.to_string(), message))
    }

    fn resolve_handler(&self, value: &Value, event_type: &EventType, property: &str) -> Result<EventHandler, BuildError> {
        let token = HandlerToken::parse(value)
            .map_err(|message| BuildError::coercion(self.node, property, value, "handler chain", message))?;
        let steps = self
            .cx
            .resolver
            .resolve_chain(&token, self.target, event_type, self.cx.callers, self.node)?;
        tracing::debug!(
            target: targets::BINDER,
            node = %self.node,
            property,
            chain = %token,
            "handler chain resolved"
        );
        Ok(EventHandler::new(
            steps,
            event_type.clone(),
            format!("{}.{property}", self.node),
            self.cx.result.clone(),
        ))
    }
}

impl fmt::Debug for PropertyBinder<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyBinder")
            .field("node", &self.node.to_string())
            .field("type_name", &self.descriptor.type_name())
            .finish()
    }
}

/// Coerce a scalar, list or map value to `kind`. Event kinds are not handled here.
pub(crate) fn coerce_value(
    value: &Value,
    kind: &ParamKind,
    registry: &TypeRegistry,
    resources: &ResourceScope,
) -> Result<PropertyValue, String> {
    match (kind, value) {
        (ParamKind::Str, Value::Str(text) | Value::Reference(text)) => Ok(PropertyValue::Str(text.clone())),
        (ParamKind::Str, Value::Int(_) | Value::Float(_) | Value::Bool(_)) => Ok(PropertyValue::Str(value.to_text())),

        (ParamKind::Localized, Value::Str(key) | Value::Reference(key)) => {
            Ok(PropertyValue::Str(resources.lookup(key)))
        }

        (ParamKind::Int, Value::Int(n)) => Ok(PropertyValue::Int(*n)),
        (ParamKind::Int, Value::Float(x)) if x.fract() == 0.0 => {
            // i64::MAX as f64 rounds up to 2^63, which is already out of range.
            if *x >= i64::MIN as f64 && *x < i64::MAX as f64 {
                Ok(PropertyValue::Int(*x as i64))
            } else {
                Err(format!("{x} is out of range for an integer"))
            }
        }
        (ParamKind::Int, Value::Str(text)) => text
            .trim()
            .parse::<i64>()
            .map(PropertyValue::Int)
            .map_err(|e| e.to_string()),

        (ParamKind::Float, Value::Float(x)) => Ok(PropertyValue::Float(*x)),
        (ParamKind::Float, Value::Int(n)) => Ok(PropertyValue::Float(*n as f64)),
        (ParamKind::Float, Value::Str(text)) => text
            .trim()
            .parse::<f64>()
            .map(PropertyValue::Float)
            .map_err(|e| e.to_string()),

        (ParamKind::Bool, Value::Bool(b)) => Ok(PropertyValue::Bool(*b)),
        (ParamKind::Bool, Value::Str(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(PropertyValue::Bool(true)),
            "false" => Ok(PropertyValue::Bool(false)),
            _ => Err("expected true or false".to_string()),
        },

        (ParamKind::Constant(set_name), Value::Str(token) | Value::Reference(token)) => {
            let set = registry
                .constants(set_name)
                .ok_or_else(|| format!("constant set '{set_name}' is not registered"))?;
            set.resolve(token.trim()).map(PropertyValue::Int).ok_or_else(|| {
                let known: Vec<_> = set.names().collect();
                format!("'{token}' is not one of [{}]", known.join(", "))
            })
        }
        (ParamKind::Constant(set_name), Value::Int(n)) => {
            let set = registry
                .constants(set_name)
                .ok_or_else(|| format!("constant set '{set_name}' is not registered"))?;
            match set.name_of(*n) {
                Some(_) => Ok(PropertyValue::Int(*n)),
                None => Err(format!("{n} is not a value of {set_name}")),
            }
        }

        (ParamKind::List(item), Value::List(items)) => items
            .iter()
            .map(|v| coerce_value(v, item, registry, resources))
            .collect::<Result<Vec<_>, _>>()
            .map(PropertyValue::List),
        (ParamKind::List(item), scalar) => coerce_value(scalar, item, registry, resources).map(|v| PropertyValue::List(vec![v])),

        (ParamKind::Map, Value::Map(entries)) => Ok(PropertyValue::Map(entries.clone())),

        (kind, value) => Err(format!("a {} cannot be used as {kind}", value.kind_name())),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, OnceLock};

    use horizon_forge_core::Property;
    use parking_lot::Mutex;

    use super::*;
    use crate::command::CommandRegistry;
    use crate::registry::{ConstantSet, VirtualProperty};
    use crate::resource::{ResourceBundle, ResourceResolver};

    #[derive(Default)]
    struct Window {
        title: Property<String>,
        width: Property<i64>,
        height: Property<i64>,
        opacity: Property<f64>,
        resizable: Property<bool>,
        close_operation: Property<i64>,
        tags: Mutex<Vec<String>>,
    }

    fn registry() -> TypeRegistry {
        let registry = TypeRegistry::new();
        registry
            .register_constants(ConstantSet::new("CloseOperation", [("EXIT_ON_CLOSE", 3), ("DISPOSE_ON_CLOSE", 2)]).unwrap())
            .unwrap();
        registry
            .register(
                TypeDescriptor::builder::<Window>("JFrame", Window::default)
                    .localized("title", |w, v| {
                        w.title.set(v);
                    })
                    .int("width", |w, v| {
                        w.width.set(v);
                    })
                    .int("height", |w, v| {
                        w.height.set(v);
                    })
                    .float("opacity", |w, v| {
                        w.opacity.set(v);
                    })
                    .bool("resizable", |w, v| {
                        w.resizable.set(v);
                    })
                    .constant("defaultCloseOperation", "CloseOperation", |w, v| {
                        w.close_operation.set(v);
                    })
                    .list("tags", ParamKind::Str, |w, items| {
                        *w.tags.lock() = items
                            .into_iter()
                            .filter_map(|item| match item {
                                PropertyValue::Str(s) => Some(s),
                                _ => None,
                            })
                            .collect();
                    })
                    .virtual_property("size", VirtualProperty::size("width", "height"))
                    .build(),
            )
            .unwrap();
        registry
    }

    struct Fixture {
        registry: Arc<TypeRegistry>,
        resolver: HandlerResolver,
        resources: ResourceScope,
        slot: ResultSlot,
    }

    impl Fixture {
        fn new() -> Self {
            let registry = Arc::new(registry());
            let resolver = HandlerResolver::new(registry.clone(), Arc::new(CommandRegistry::new()));
            let bundles = Arc::new(ResourceResolver::new());
            bundles.add_global_bundle(ResourceBundle::from_pairs("app", [("title.main", "Main Window")]));
            Self {
                registry,
                resolver,
                resources: ResourceScope::new(bundles, Vec::new(), Vec::new()),
                slot: Arc::new(OnceLock::new()),
            }
        }

        fn apply(&self, node: &Node) -> Result<Arc<Window>, BuildError> {
            let cx = PropertyContext {
                registry: &self.registry,
                resolver: &self.resolver,
                resources: &self.resources,
                callers: &[],
                result: &self.slot,
            };
            let descriptor = self.registry.get("JFrame").unwrap();
            let target = descriptor.construct();
            let path = NodePath::root(node);
            PropertyBinder::new(&cx, &target, &descriptor, &path).apply_all(node)?;
            Ok(target.downcast::<Window>().unwrap())
        }
    }

    #[test]
    fn test_coerces_every_kind() {
        let node = Node::new("JFrame")
            .with("name", "frmMain")
            .with("title", "title.main")
            .with("width", "640")
            .with("opacity", 1)
            .with("resizable", "TRUE")
            .with("defaultCloseOperation", "exitOnClose")
            .with("tags", "single");

        let window = Fixture::new().apply(&node).unwrap();
        assert_eq!(window.title.get(), "Main Window");
        assert_eq!(window.width.get(), 640);
        assert_eq!(window.opacity.get(), 1.0);
        assert!(window.resizable.get());
        assert_eq!(window.close_operation.get(), 3);
        assert_eq!(*window.tags.lock(), ["single"]);
    }

    #[test]
    fn test_numeric_constant_and_whole_float() {
        let node = Node::new("JFrame")
            .with("defaultCloseOperation", Value::Int(2))
            .with("width", Value::Float(1024.0));

        let window = Fixture::new().apply(&node).unwrap();
        assert_eq!(window.close_operation.get(), 2);
        assert_eq!(window.width.get(), 1024);
    }

    #[test]
    fn test_virtual_size_and_normalized_names() {
        let node = Node::new("JFrame").with("size", "800x600").with("default_close_operation", "DISPOSE_ON_CLOSE");

        let window = Fixture::new().apply(&node).unwrap();
        assert_eq!((window.width.get(), window.height.get()), (800, 600));
        assert_eq!(window.close_operation.get(), 2);
    }

    #[test]
    fn test_unknown_property_names_node() {
        let Err(err) = Fixture::new().apply(&Node::new("JFrame").with("colour", "red")) else {
            panic!("unknown property accepted");
        };
        assert!(matches!(err, BuildError::UnknownProperty { ref property, .. } if property == "colour"));
    }

    #[test]
    fn test_coercion_failures() {
        let fixture = Fixture::new();
        for (property, value) in [
            ("width", Value::from("wide")),
            ("width", Value::Float(1.5)),
            ("width", Value::Float(1e20)),
            ("height", Value::Float(-1e20)),
            ("resizable", Value::from("maybe")),
            ("defaultCloseOperation", Value::from("HIDE_ON_CLOSE")),
            ("defaultCloseOperation", Value::Int(999)),
        ] {
            let Err(err) = fixture.apply(&Node::new("JFrame").with(property, value)) else {
                panic!("{property} accepted an invalid value");
            };
            assert!(matches!(err, BuildError::Coercion { .. }), "{property}: {err}");
        }
    }
}
