//! Horizon Forge - a declarative object-graph builder.
//!
//! The engine takes an already-parsed [`Node`] tree and:
//!
//! - instantiates every node through a [`TypeRegistry`] of constructible types
//! - applies properties, coercing values and resolving localized strings
//! - binds named objects into fields of the calling object
//! - resolves event handler chains against caller methods and `$commands`
//! - runs handler steps marked as background work on a worker pool, keeping
//!   the chain ordered
//! - registers validation rules and data bindings declared in the tree
//!
//! # Handler Chain Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use horizon_forge::{ChainOutcome, Engine, EventHandler, Node, TypeDescriptor};
//! use horizon_forge_core::{Bound, Caller, EventType, MetaObject, Property};
//!
//! #[derive(Default)]
//! struct Button {
//!     on_action: Bound<EventHandler>,
//! }
//!
//! #[derive(Default)]
//! struct Dialog {
//!     saved: Property<bool>,
//! }
//!
//! impl Dialog {
//!     fn save(&self) -> bool {
//!         self.saved.set(true);
//!         true
//!     }
//! }
//!
//! impl Caller for Dialog {
//!     fn meta_object() -> MetaObject {
//!         MetaObject::builder::<Dialog>("Dialog")
//!             .method("save", Dialog::save)
//!             .build()
//!     }
//! }
//!
//! let engine = Engine::builder()
//!     .register_type(
//!         TypeDescriptor::builder::<Button>("JButton", Button::default)
//!             .event("onAction", EventType::ACTION, |button, handler| button.on_action.set(handler))
//!             .build(),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let dialog = Arc::new(Dialog::default());
//! let tree = Node::new("JButton").with("name", "btnSave").with("onAction", "save");
//! let result = engine.build(dialog.clone(), &tree, Vec::new()).unwrap();
//!
//! let button = result.get_as::<Button>("btnSave").unwrap();
//! let handler = button.on_action.get().unwrap();
//! let status = handler.fire_from(result.get("btnSave").unwrap().clone());
//! assert_eq!(status.outcome(), Some(ChainOutcome::Completed));
//! assert!(dialog.saved.get());
//! ```

pub mod background;
mod binder;
pub mod binding;
pub mod build;
pub mod command;
pub mod error;
pub mod handler;
pub mod logging;
pub mod node;
pub mod registry;
pub mod resource;
pub mod result;
pub mod validation;

pub use background::BackgroundListener;
pub use binding::DataBinding;
pub use build::{BuildListener, Engine, EngineBuilder, EngineConfig};
pub use command::{
    AutoPrompt, CONFIRM_COMMAND, Command, CommandRegistry, ConfirmCommand, Prompt, VALIDATE_COMMAND,
    ValidateCommand,
};
pub use error::{BuildError, ChainError, RegistryError, Result};
pub use handler::{
    ChainOutcome, ChainStatus, ChainStep, ChainTicket, EventHandler, HandlerResolver, HandlerToken,
};
pub use logging::{NodeTreeDebug, TreeFormatOptions, TreeStyle};
pub use node::{Node, NodePath, Value};
pub use registry::{
    ConstantSet, ParamKind, PropertySetter, PropertyValue, ResolvedType, TypeDescriptor,
    TypeDescriptorBuilder, TypeRegistry, VirtualProperty,
};
pub use resource::{ResourceBundle, ResourceResolver, ResourceScope};
pub use result::BuildResult;
pub use validation::{Constraint, ValidationMessage, ValidationRule, ValueValidator};
