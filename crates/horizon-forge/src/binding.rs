//! Data binding between built objects.
//!
//! Each property of a `bind` node copies one readable property into one
//! settable property:
//!
//! ```text
//! bind:
//!   lblGreeting.text: txtUser.text
//!   txtUser.text:     model.userName
//! ```
//!
//! The source object is looked up by build name first, then as a caller
//! field holding an instance. Both ends are checked while the document is
//! built; the value is copied once at the end of the build and again on
//! every [`BuildResult::refresh_bindings`](crate::BuildResult::refresh_bindings).

use std::fmt;

use horizon_forge_core::logging::targets;
use horizon_forge_core::meta::CallerRef;
use horizon_forge_core::{ForgeError, ObjectRef};

use crate::binder::coerce_value;
use crate::error::BuildError;
use crate::node::Value;
use crate::registry::{ParamKind, TypeRegistry};
use crate::resource::ResourceScope;
use crate::validation::split_target;

#[derive(Clone)]
enum BindingSource {
    Named(ObjectRef),
    CallerField { caller: CallerRef, field: String },
}

impl BindingSource {
    fn object(&self) -> Result<Option<ObjectRef>, ForgeError> {
        match self {
            Self::Named(object) => Ok(Some(object.clone())),
            Self::CallerField { caller, field } => match caller.meta().field(field) {
                Some(meta) => Ok(meta.get(caller.receiver())?),
                None => Ok(None),
            },
        }
    }
}

/// One established `target <- source` binding.
#[derive(Clone)]
pub struct DataBinding {
    target_path: String,
    source_path: String,
    target: ObjectRef,
    target_property: String,
    source: BindingSource,
    source_property: String,
}

impl DataBinding {
    /// Check and establish a binding.
    ///
    /// `lookup` resolves build names; callers are searched for a source
    /// field when no built object has the source name.
    pub(crate) fn establish<F>(
        target_path: &str,
        source: &Value,
        lookup: F,
        callers: &[CallerRef],
        registry: &TypeRegistry,
    ) -> Result<Self, BuildError>
    where
        F: Fn(&str) -> Option<ObjectRef>,
    {
        let source_path = source.as_str().unwrap_or_default().trim().to_string();
        let invalid = |message: String| BuildError::invalid_binding(target_path, source_path.as_str(), message);

        if source.as_str().is_none() {
            return Err(invalid(format!("expected 'object.property', got {}", source.kind_name())));
        }
        let (target_name, target_property) =
            split_target(target_path).ok_or_else(|| invalid("target must be 'object.property'".to_string()))?;
        let (source_name, source_property) =
            split_target(&source_path).ok_or_else(|| invalid("source must be 'object.property'".to_string()))?;

        let target = lookup(target_name).ok_or_else(|| invalid(format!("no object named '{target_name}'")))?;
        let target_descriptor = registry
            .descriptor_for(&target)
            .ok_or_else(|| invalid(format!("'{target_name}' is not of a registered type")))?;
        let setter = target_descriptor.setter(target_property).ok_or_else(|| {
            invalid(format!(
                "type '{}' has no property '{target_property}'",
                target_descriptor.type_name()
            ))
        })?;
        if matches!(setter.kind(), ParamKind::Event(_)) {
            return Err(invalid(format!("'{target_property}' is an event property")));
        }

        let source = match lookup(source_name) {
            Some(object) => BindingSource::Named(object),
            None => {
                let caller = callers
                    .iter()
                    .find(|caller| caller.meta().field(source_name).is_some())
                    .ok_or_else(|| invalid(format!("no object or caller field named '{source_name}'")))?;
                BindingSource::CallerField {
                    caller: caller.clone(),
                    field: source_name.to_string(),
                }
            }
        };
        let source_object = source
            .object()
            .map_err(|err| invalid(err.to_string()))?
            .ok_or_else(|| invalid(format!("caller field '{source_name}' holds no object")))?;
        let readable = registry
            .descriptor_for(&source_object)
            .is_some_and(|descriptor| descriptor.can_read(source_property));
        if !readable {
            return Err(invalid(format!(
                "'{source_property}' of '{source_name}' ({}) cannot be read",
                registry.display_type(&source_object)
            )));
        }

        Ok(Self {
            target_path: target_path.to_string(),
            source_path: source_path.clone(),
            target,
            target_property: target_property.to_string(),
            source,
            source_property: source_property.to_string(),
        })
    }

    /// The bound `object.property`.
    pub fn target(&self) -> &str {
        &self.target_path
    }

    /// The `object.property` the value is read from.
    pub fn source(&self) -> &str {
        &self.source_path
    }

    /// Copy the current source value into the target.
    pub(crate) fn copy(&self, registry: &TypeRegistry, resources: &ResourceScope) -> Result<(), BuildError> {
        let invalid = |message: String| BuildError::invalid_binding(&self.target_path, &self.source_path, message);

        let source = self
            .source
            .object()
            .map_err(|err| invalid(err.to_string()))?
            .ok_or_else(|| invalid("the source object is gone".to_string()))?;
        let value = registry
            .descriptor_for(&source)
            .and_then(|descriptor| descriptor.read(&source, &self.source_property))
            .ok_or_else(|| invalid("the source property cannot be read".to_string()))?;

        let descriptor = registry
            .descriptor_for(&self.target)
            .ok_or_else(|| invalid("the target type is not registered".to_string()))?;
        let setter = descriptor
            .setter(&self.target_property)
            .ok_or_else(|| invalid("the target property has no setter".to_string()))?;
        let coerced = coerce_value(&value, setter.kind(), registry, resources).map_err(&invalid)?;
        setter.apply(&self.target, coerced).map_err(&invalid)?;

        tracing::trace!(
            target: targets::BINDER,
            target_path = %self.target_path,
            source_path = %self.source_path,
            "binding copied"
        );
        Ok(())
    }
}

impl fmt::Debug for DataBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataBinding({} <- {})", self.target_path, self.source_path)
    }
}
