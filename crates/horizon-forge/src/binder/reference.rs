//! Binding named objects into caller fields.

use horizon_forge_core::logging::targets;
use horizon_forge_core::meta::CallerRef;
use horizon_forge_core::{ForgeError, ObjectRef};

use crate::error::BuildError;
use crate::registry::TypeRegistry;

/// Assign `object` to the caller field called `name`.
///
/// Callers are searched innermost first and the first one declaring such a
/// field decides: a compatible field is assigned, an incompatible one fails
/// the build. Returns the caller type the object was bound into, or `None`
/// when no caller declares the field.
pub(crate) fn bind_reference(
    name: &str,
    object: &ObjectRef,
    callers: &[CallerRef],
    registry: &TypeRegistry,
) -> Result<Option<String>, BuildError> {
    let Some((caller, field)) = callers
        .iter()
        .find_map(|caller| caller.meta().field(name).map(|field| (caller, field)))
    else {
        tracing::trace!(target: targets::BINDER, name, "no caller field for named object");
        return Ok(None);
    };

    let is_a = |object: &ObjectRef, capability: &str| registry.is_a(object, capability);
    if !field.declared_type().accepts(object, &is_a) {
        return Err(BuildError::IncompatibleReference {
            name: name.to_string(),
            actual: registry.display_type(object),
            caller: caller.type_name().to_string(),
            field: field.name().to_string(),
            declared: field.declared_type().display_name().to_string(),
        });
    }

    field.set(caller.receiver(), object).map_err(ForgeError::from)?;
    tracing::debug!(
        target: targets::BINDER,
        name,
        caller = caller.type_name(),
        "object bound to caller field"
    );
    Ok(Some(caller.type_name().to_string()))
}
