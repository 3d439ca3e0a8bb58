//! Error types for the builder engine.

use horizon_forge_core::ForgeError;

/// Result type alias for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Errors that abort a build.
///
/// Every variant names the node path (or rule/binding target) it was raised
/// for, so wiring mistakes can be traced back to the document.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// No registered type and no caller field matches the node's type name.
    #[error("Unknown type '{type_name}' at {node}")]
    UnknownType { type_name: String, node: String },

    /// The node's type has no setter or virtual property of that name.
    #[error("Unknown property '{property}' on type '{type_name}' at {node}")]
    UnknownProperty {
        node: String,
        type_name: String,
        property: String,
    },

    /// A handler token matches no method signature or command.
    #[error("Cannot resolve handler '{token}' for {event} at {node}; searched {searched}")]
    UnresolvedHandler {
        token: String,
        event: String,
        node: String,
        searched: String,
    },

    /// A caller field with the object's name exists but has an incompatible type.
    #[error(
        "Object '{name}' of type '{actual}' cannot be assigned to field '{field}' of {caller} declared as '{declared}'"
    )]
    IncompatibleReference {
        name: String,
        actual: String,
        caller: String,
        field: String,
        declared: String,
    },

    /// A property value cannot be converted to the setter's parameter kind.
    #[error("Cannot convert {value} to {expected} for property '{property}' at {node}: {message}")]
    Coercion {
        node: String,
        property: String,
        value: String,
        expected: String,
        message: String,
    },

    /// Two nodes in one build declare the same name.
    #[error("Duplicate name '{name}' at {node}")]
    DuplicateName { name: String, node: String },

    /// The node is structurally invalid.
    #[error("Invalid node at {node}: {message}")]
    InvalidNode { node: String, message: String },

    /// A validation rule cannot be registered.
    #[error("Invalid validation rule for '{target}': {message}")]
    InvalidValidationRule { target: String, message: String },

    /// A data binding cannot be established.
    #[error("Invalid binding '{target}' <- '{source_path}': {message}")]
    InvalidBinding {
        target: String,
        source_path: String,
        message: String,
    },

    /// A resource bundle cannot be loaded.
    #[error("Invalid resource bundle '{bundle}': {source}")]
    InvalidBundle {
        bundle: String,
        #[source]
        source: toml::de::Error,
    },

    /// An engine configuration document is malformed.
    #[error("Invalid engine configuration: {message}")]
    InvalidConfig { message: String },

    /// The type registry rejected a registration.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A core facility (thread pool, dispatcher, object access) failed.
    #[error("Engine setup failed: {0}")]
    Setup(#[from] ForgeError),
}

impl BuildError {
    /// Create an unknown type error.
    pub fn unknown_type(type_name: impl Into<String>, node: impl ToString) -> Self {
        Self::UnknownType {
            type_name: type_name.into(),
            node: node.to_string(),
        }
    }

    /// Create an unknown property error.
    pub fn unknown_property(
        node: impl ToString,
        type_name: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        Self::UnknownProperty {
            node: node.to_string(),
            type_name: type_name.into(),
            property: property.into(),
        }
    }

    /// Create a coercion error.
    pub fn coercion(
        node: impl ToString,
        property: impl Into<String>,
        value: impl ToString,
        expected: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Coercion {
            node: node.to_string(),
            property: property.into(),
            value: value.to_string(),
            expected: expected.into(),
            message: message.into(),
        }
    }

    /// Create an invalid node error.
    pub fn invalid_node(node: impl ToString, message: impl Into<String>) -> Self {
        Self::InvalidNode {
            node: node.to_string(),
            message: message.into(),
        }
    }

    /// Create an invalid validation rule error.
    pub fn invalid_rule(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValidationRule {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create an invalid binding error.
    pub fn invalid_binding(
        target: impl Into<String>,
        source_path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidBinding {
            target: target.into(),
            source_path: source_path.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while configuring the type registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Two descriptors were registered under one type name.
    #[error("Type '{0}' is already registered")]
    DuplicateType(String),

    /// Two constant sets were registered under one name.
    #[error("Constant set '{0}' is already registered")]
    DuplicateConstantSet(String),

    /// Two constants of one set normalize to the same token.
    #[error("Constants '{first}' and '{second}' of set '{set}' both normalize to '{token}'")]
    AmbiguousConstant {
        set: String,
        token: String,
        first: String,
        second: String,
    },

    /// Two setters of one type normalize to the same property name.
    #[error("Properties '{first}' and '{second}' of type '{type_name}' both normalize to '{token}'")]
    AmbiguousProperty {
        type_name: String,
        token: String,
        first: String,
        second: String,
    },

    /// A property refers to a constant set that was never registered.
    #[error("Property '{property}' of type '{type_name}' uses unknown constant set '{set}'")]
    UnknownConstantSet {
        type_name: String,
        property: String,
        set: String,
    },
}

/// Errors that stop a running handler chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    /// A handler returned an error.
    #[error("Handler '{method}' failed: {message}")]
    HandlerFailed { method: String, message: String },

    /// A handler panicked.
    #[error("Handler '{method}' panicked: {message}")]
    HandlerPanicked { method: String, message: String },

    /// A background handler failed or panicked on its worker.
    #[error("Background task '{method}' failed: {message}")]
    BackgroundFailed { method: String, message: String },

    /// The build result owning the chain no longer exists.
    #[error("The build result owning this handler chain was dropped")]
    ResultDropped,
}
