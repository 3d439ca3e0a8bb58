//! The build orchestrator.
//!
//! An [`Engine`] holds everything a build reads: the type registry, the
//! command registry, resource bundles, the prompt and the UI dispatcher.
//! Configure it through [`EngineBuilder`] before the first build; afterwards
//! it is shared read-only and may be cloned freely.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use horizon_forge::{Engine, Node, TypeDescriptor, Value};
//! use horizon_forge_core::{Caller, MetaObject, Property};
//!
//! #[derive(Default)]
//! struct Label {
//!     text: Property<String>,
//! }
//!
//! #[derive(Default)]
//! struct Screen;
//!
//! impl Caller for Screen {
//!     fn meta_object() -> MetaObject {
//!         MetaObject::builder::<Screen>("Screen").build()
//!     }
//! }
//!
//! let engine = Engine::builder()
//!     .register_type(
//!         TypeDescriptor::builder::<Label>("JLabel", Label::default)
//!             .string("text", |label, text| {
//!                 label.text.set(text);
//!             })
//!             .reader("text", |label| Value::Str(label.text.get()))
//!             .build(),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let tree = Node::new("JLabel").with("name", "lblTitle").with("text", "Hello");
//! let result = engine.build(Arc::new(Screen), &tree, Vec::new()).unwrap();
//! assert_eq!(result.get_as::<Label>("lblTitle").unwrap().text.get(), "Hello");
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use parking_lot::RwLock;

use horizon_forge_core::logging::targets;
use horizon_forge_core::meta::CallerRef;
use horizon_forge_core::{
    Caller, DirectDispatcher, ForgeError, ObjectRef, PerfSpan, ThreadPool, ThreadPoolConfig, UiDispatcher,
    ui_dispatcher,
};

use crate::background::{BackgroundListener, WorkerPool};
use crate::binder::{PropertyBinder, PropertyContext, bind_reference};
use crate::binding::DataBinding;
use crate::command::{AutoPrompt, Command, CommandRegistry, Prompt};
use crate::error::{BuildError, Result};
use crate::handler::{HandlerResolver, ResultSlot};
use crate::node::{BIND_NODE, NAME_PROPERTY, Node, NodePath, VALIDATE_NODE};
use crate::registry::{ConstantSet, ResolvedType, TypeDescriptor, TypeRegistry};
use crate::resource::{ResourceBundle, ResourceResolver, ResourceScope};
use crate::result::{BuildResult, ResultInner};
use crate::validation::{ValidationRule, split_target};

/// Observer of build lifecycles.
pub trait BuildListener: Send + Sync {
    /// A build is about to walk its tree.
    fn started(&self, caller: &CallerRef) {
        let _ = caller;
    }

    /// A build finished successfully.
    fn ended(&self, root: &ObjectRef) {
        let _ = root;
    }
}

/// Engine settings.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Wrap missing resource keys in `#` so they stand out.
    pub mark_invalid_resources: bool,
    /// A dedicated worker pool for background steps. `None` uses the global pool.
    pub thread_pool: Option<ThreadPoolConfig>,
}

impl EngineConfig {
    /// Read settings from a TOML document.
    ///
    /// ```toml
    /// mark_invalid_resources = true
    ///
    /// [thread_pool]
    /// threads = 2
    /// thread_name = "forge-bg"
    /// stack_size = 1048576
    /// ```
    ///
    /// Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let invalid = |message: String| BuildError::InvalidConfig { message };
        let table: toml::Table = text.parse().map_err(|err: toml::de::Error| invalid(err.to_string()))?;

        let mut config = Self::default();
        if let Some(value) = table.get("mark_invalid_resources") {
            config.mark_invalid_resources = value
                .as_bool()
                .ok_or_else(|| invalid("'mark_invalid_resources' must be a boolean".to_string()))?;
        }

        if let Some(value) = table.get("thread_pool") {
            let pool = value
                .as_table()
                .ok_or_else(|| invalid("'thread_pool' must be a table".to_string()))?;
            let mut pool_config = ThreadPoolConfig::default();
            if let Some(threads) = pool.get("threads") {
                let threads = threads
                    .as_integer()
                    .and_then(|n| usize::try_from(n).ok())
                    .filter(|n| *n > 0)
                    .ok_or_else(|| invalid("'thread_pool.threads' must be a positive integer".to_string()))?;
                pool_config.num_threads = Some(threads);
            }
            if let Some(name) = pool.get("thread_name") {
                pool_config.thread_name = name
                    .as_str()
                    .ok_or_else(|| invalid("'thread_pool.thread_name' must be a string".to_string()))?
                    .to_string();
            }
            if let Some(size) = pool.get("stack_size") {
                let size = size
                    .as_integer()
                    .and_then(|n| usize::try_from(n).ok())
                    .ok_or_else(|| invalid("'thread_pool.stack_size' must be a positive integer".to_string()))?;
                pool_config.stack_size = Some(size);
            }
            config.thread_pool = Some(pool_config);
        }

        Ok(config)
    }
}

/// State shared by an engine, its clones and every result it built.
pub(crate) struct EngineShared {
    pub(crate) config: EngineConfig,
    pub(crate) registry: Arc<TypeRegistry>,
    pub(crate) commands: Arc<CommandRegistry>,
    pub(crate) resolver: HandlerResolver,
    pub(crate) resources: Arc<ResourceResolver>,
    pool: WorkerPool,
    dispatcher: Option<Arc<dyn UiDispatcher>>,
    prompt: Arc<dyn Prompt>,
    build_listeners: RwLock<Vec<Arc<dyn BuildListener>>>,
    background_listeners: RwLock<Vec<Arc<dyn BackgroundListener>>>,
}

impl EngineShared {
    pub(crate) fn pool(&self) -> std::result::Result<&ThreadPool, ForgeError> {
        self.pool.get()
    }

    /// The configured dispatcher, else the installed one, else direct execution.
    pub(crate) fn dispatcher(&self) -> Arc<dyn UiDispatcher> {
        self.dispatcher
            .clone()
            .or_else(ui_dispatcher)
            .unwrap_or_else(|| Arc::new(DirectDispatcher))
    }

    pub(crate) fn prompt(&self) -> &dyn Prompt {
        self.prompt.as_ref()
    }

    pub(crate) fn background_listeners(&self) -> Vec<Arc<dyn BackgroundListener>> {
        self.background_listeners.read().clone()
    }
}

/// Builder for an [`Engine`].
///
/// Registration errors are kept until [`build`](Self::build), which reports
/// the first one.
pub struct EngineBuilder {
    config: EngineConfig,
    registry: TypeRegistry,
    commands: CommandRegistry,
    resources: ResourceResolver,
    dispatcher: Option<Arc<dyn UiDispatcher>>,
    prompt: Option<Arc<dyn Prompt>>,
    build_listeners: Vec<Arc<dyn BuildListener>>,
    background_listeners: Vec<Arc<dyn BackgroundListener>>,
    error: Option<BuildError>,
}

impl EngineBuilder {
    /// A builder with default settings, the built-in commands and no types.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            registry: TypeRegistry::new(),
            commands: CommandRegistry::new(),
            resources: ResourceResolver::new(),
            dispatcher: None,
            prompt: None,
            build_listeners: Vec::new(),
            background_listeners: Vec::new(),
            error: None,
        }
    }

    /// Replace all settings.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Wrap missing resource keys in `#`.
    pub fn mark_invalid_resources(mut self, mark: bool) -> Self {
        self.config.mark_invalid_resources = mark;
        self
    }

    /// Run background steps on a dedicated pool.
    pub fn thread_pool(mut self, config: ThreadPoolConfig) -> Self {
        self.config.thread_pool = Some(config);
        self
    }

    /// Register a constant set. Register sets before the types using them.
    pub fn register_constants(mut self, set: ConstantSet) -> Self {
        if let Err(err) = self.registry.register_constants(set) {
            self.error.get_or_insert(err.into());
        }
        self
    }

    /// Register a type.
    pub fn register_type(mut self, descriptor: TypeDescriptor) -> Self {
        if let Err(err) = self.registry.register(descriptor) {
            self.error.get_or_insert(err.into());
        }
        self
    }

    /// Register or replace a command.
    pub fn command(self, token: &str, command: impl Command + 'static) -> Self {
        self.commands.register(token, command);
        self
    }

    /// Add a bundle searched by every build.
    pub fn global_bundle(self, bundle: ResourceBundle) -> Self {
        self.resources.add_global_bundle(bundle);
        self
    }

    /// Add a bundle searched by builds involving `caller_type`.
    pub fn class_bundle(self, caller_type: impl Into<String>, bundle: ResourceBundle) -> Self {
        self.resources.add_class_bundle(caller_type, bundle);
        self
    }

    /// The prompt for `$confirm` and `$validate`. Defaults to [`AutoPrompt::yes`].
    pub fn prompt(mut self, prompt: Arc<dyn Prompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// The dispatcher background steps hand results back through.
    ///
    /// Without one, the dispatcher installed with
    /// [`install_ui_dispatcher`](horizon_forge_core::install_ui_dispatcher) is
    /// used, and without that, results run on the worker thread.
    pub fn ui_dispatcher(mut self, dispatcher: Arc<dyn UiDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Add a build listener.
    pub fn build_listener(mut self, listener: Arc<dyn BuildListener>) -> Self {
        self.build_listeners.push(listener);
        self
    }

    /// Add a listener notified for background steps of every build.
    pub fn background_listener(mut self, listener: Arc<dyn BackgroundListener>) -> Self {
        self.background_listeners.push(listener);
        self
    }

    /// Create the engine.
    pub fn build(self) -> Result<Engine> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let pool = WorkerPool::from_config(self.config.thread_pool.clone())?;
        self.resources.set_mark_invalid(self.config.mark_invalid_resources);

        let registry = Arc::new(self.registry);
        let commands = Arc::new(self.commands);
        tracing::debug!(
            target: targets::BUILD,
            types = registry.type_names().len(),
            commands = commands.tokens().len(),
            pool = ?pool,
            "engine created"
        );

        Ok(Engine {
            shared: Arc::new(EngineShared {
                resolver: HandlerResolver::new(registry.clone(), commands.clone()),
                config: self.config,
                registry,
                commands,
                resources: Arc::new(self.resources),
                pool,
                dispatcher: self.dispatcher,
                prompt: self.prompt.unwrap_or_else(|| Arc::new(AutoPrompt::yes())),
                build_listeners: RwLock::new(self.build_listeners),
                background_listeners: RwLock::new(self.background_listeners),
            }),
        })
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("config", &self.config)
            .field("types", &self.registry.type_names())
            .field("commands", &self.commands.tokens())
            .field("error", &self.error)
            .finish()
    }
}

/// Builds object graphs from node trees.
#[derive(Clone)]
pub struct Engine {
    shared: Arc<EngineShared>,
}

impl Engine {
    /// Start configuring an engine.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// The engine settings.
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// The registered types.
    pub fn registry(&self) -> &TypeRegistry {
        &self.shared.registry
    }

    /// The registered commands.
    pub fn commands(&self) -> &CommandRegistry {
        &self.shared.commands
    }

    /// The resource bundles.
    pub fn resources(&self) -> &ResourceResolver {
        &self.shared.resources
    }

    /// The handler resolver and its signature cache.
    pub fn handler_resolver(&self) -> &HandlerResolver {
        &self.shared.resolver
    }

    /// Add a build listener.
    pub fn add_build_listener(&self, listener: Arc<dyn BuildListener>) {
        self.shared.build_listeners.write().push(listener);
    }

    /// Add a listener notified for background steps of every build.
    pub fn add_background_listener(&self, listener: Arc<dyn BackgroundListener>) {
        self.shared.background_listeners.write().push(listener);
    }

    /// Build `tree` for `caller`.
    ///
    /// `extra_bundles` are searched after the caller's class bundles and
    /// before the global ones.
    pub fn build<C: Caller>(&self, caller: Arc<C>, tree: &Node, extra_bundles: Vec<ResourceBundle>) -> Result<BuildResult> {
        self.build_with_callers(vec![CallerRef::new(caller)], tree, extra_bundles)
    }

    /// Build `tree` for `caller`, with the callers of `parent` as its ancestors.
    ///
    /// Fields and methods of `caller` shadow those of the ancestors.
    pub fn build_nested<C: Caller>(
        &self,
        parent: &BuildResult,
        caller: Arc<C>,
        tree: &Node,
        extra_bundles: Vec<ResourceBundle>,
    ) -> Result<BuildResult> {
        let mut callers = vec![CallerRef::new(caller)];
        callers.extend(parent.callers().iter().cloned());
        self.build_with_callers(callers, tree, extra_bundles)
    }

    #[tracing::instrument(
        target = "horizon_forge::build",
        name = "horizon_forge::build",
        skip_all,
        fields(caller = callers[0].type_name(), root = tree.type_name())
    )]
    fn build_with_callers(
        &self,
        callers: Vec<CallerRef>,
        tree: &Node,
        extra_bundles: Vec<ResourceBundle>,
    ) -> Result<BuildResult> {
        let _perf = PerfSpan::new("build");
        let shared = &self.shared;

        let listeners = shared.build_listeners.read().clone();
        for listener in &listeners {
            listener.started(&callers[0]);
        }

        let resources = ResourceScope::new(
            shared.resources.clone(),
            callers.iter().map(|caller| caller.type_name().to_string()).collect(),
            extra_bundles.into_iter().map(Arc::new).collect(),
        );
        let slot: ResultSlot = Arc::new(OnceLock::new());

        let cx = PropertyContext {
            registry: &shared.registry,
            resolver: &shared.resolver,
            resources: &resources,
            callers: &callers,
            result: &slot,
        };
        let mut walk = TreeWalk {
            cx: &cx,
            objects: IndexMap::new(),
            reserved: Vec::new(),
        };

        let root_path = NodePath::root(tree);
        if tree.is_reserved() {
            return Err(BuildError::invalid_node(&root_path, "the root node cannot be a reserved node"));
        }
        let root = walk.build_node(tree, &root_path)?;
        let TreeWalk { objects, reserved, .. } = walk;

        let lookup = |name: &str| objects.get(name).cloned();
        let mut bindings = Vec::new();
        for (path, node) in reserved.iter().filter(|(_, node)| node.type_name() == BIND_NODE) {
            tracing::debug!(target: targets::BUILD, node = %path, bindings = node.properties().len(), "bind pass");
            for (target, source) in node.properties() {
                let binding = DataBinding::establish(target, source, lookup, &callers, &shared.registry)?;
                binding.copy(&shared.registry, &resources)?;
                bindings.push(binding);
            }
        }

        let mut rules = Vec::new();
        for (path, node) in reserved.iter().filter(|(_, node)| node.type_name() == VALIDATE_NODE) {
            tracing::debug!(target: targets::BUILD, node = %path, rules = node.properties().len(), "validate pass");
            for (target, value) in node.properties() {
                let rule = ValidationRule::parse(target, value)?;
                check_rule_target(target, &objects, &shared.registry)?;
                rules.push(rule);
            }
        }

        let inner = Arc::new(ResultInner {
            shared: self.shared.clone(),
            root: root.clone(),
            callers,
            objects,
            tree: tree.clone(),
            resources,
            rules: RwLock::new(rules),
            background_listeners: RwLock::new(Vec::new()),
            bindings,
        });
        // The slot is fresh, so the first set always succeeds.
        let _ = slot.set(Arc::downgrade(&inner));
        let result = BuildResult::from_inner(inner);

        for listener in &listeners {
            listener.ended(&root);
        }
        tracing::debug!(
            target: targets::BUILD,
            objects = result.len(),
            rules = result.validators().len(),
            bindings = result.bindings().len(),
            "build finished"
        );
        Ok(result)
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.shared.config)
            .field("types", &self.shared.registry.type_names())
            .field("commands", &self.shared.commands.tokens())
            .finish()
    }
}

/// Mutable state of one top-down walk.
struct TreeWalk<'a, 'cx> {
    cx: &'a PropertyContext<'cx>,
    objects: IndexMap<String, ObjectRef>,
    /// `bind` and `validate` nodes found below the root.
    reserved: Vec<(NodePath, &'a Node)>,
}

impl<'a> TreeWalk<'a, '_> {
    fn build_node(&mut self, node: &'a Node, path: &NodePath) -> Result<ObjectRef> {
        let registry = self.cx.registry;
        let (object, descriptor) = match registry.resolve(node.type_name(), self.cx.callers, path)? {
            ResolvedType::Registered(descriptor) => (descriptor.construct(), Some(descriptor)),
            ResolvedType::CallerInstance {
                instance,
                descriptor,
                ..
            } => (instance, descriptor),
        };
        tracing::trace!(target: targets::BUILD, node = %path, "object created");

        let name = match node.property(NAME_PROPERTY) {
            None => None,
            Some(value) => Some(
                value
                    .as_str()
                    .ok_or_else(|| BuildError::invalid_node(path, format!("'name' must be a string, got {}", value.kind_name())))?,
            ),
        };
        if let Some(name) = name {
            if self.objects.contains_key(name) {
                return Err(BuildError::DuplicateName {
                    name: name.to_string(),
                    node: path.to_string(),
                });
            }
            self.objects.insert(name.to_string(), object.clone());
        }

        match &descriptor {
            Some(descriptor) => PropertyBinder::new(self.cx, &object, descriptor, path).apply_all(node)?,
            None => {
                if let Some(property) = node.properties().keys().find(|key| key.as_str() != NAME_PROPERTY) {
                    return Err(BuildError::unknown_property(path, registry.display_type(&object), property));
                }
            }
        }

        for (index, child) in node.children().iter().enumerate() {
            let child_path = path.child(child, index);
            if child.is_reserved() {
                if path.depth() != 1 {
                    return Err(BuildError::invalid_node(
                        &child_path,
                        format!("'{}' nodes are only allowed directly below the root", child.type_name()),
                    ));
                }
                if !child.children().is_empty() {
                    return Err(BuildError::invalid_node(&child_path, "reserved nodes cannot have children"));
                }
                self.reserved.push((child_path, child));
                continue;
            }

            let built = self.build_node(child, &child_path)?;
            let attach = match &descriptor {
                Some(descriptor) if descriptor.accepts_children() => descriptor.attach_child(&object, &built),
                _ => Err(format!("type '{}' does not accept children", registry.display_type(&object))),
            };
            attach.map_err(|message| BuildError::invalid_node(&child_path, message))?;
        }

        if let Some(name) = name {
            bind_reference(name, &object, self.cx.callers, registry)?;
        }
        Ok(object)
    }
}

fn check_rule_target(target: &str, objects: &IndexMap<String, ObjectRef>, registry: &TypeRegistry) -> Result<()> {
    let (object, property) =
        split_target(target).ok_or_else(|| BuildError::invalid_rule(target, "expected 'object.property'"))?;
    let built = objects
        .get(object)
        .ok_or_else(|| BuildError::invalid_rule(target, format!("no object named '{object}'")))?;
    if !registry.descriptor_for(built).is_some_and(|descriptor| descriptor.can_read(property)) {
        return Err(BuildError::invalid_rule(
            target,
            format!("'{property}' of '{object}' cannot be read"),
        ));
    }
    Ok(())
}

static_assertions::assert_impl_all!(Engine: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            mark_invalid_resources = true

            [thread_pool]
            threads = 2
            thread_name = "forge-bg"
            "#,
        )
        .unwrap();

        assert!(config.mark_invalid_resources);
        let pool = config.thread_pool.unwrap();
        assert_eq!(pool.num_threads, Some(2));
        assert_eq!(pool.thread_name, "forge-bg");
        assert_eq!(pool.stack_size, None);
    }

    #[test]
    fn test_config_defaults_and_errors() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert!(!config.mark_invalid_resources);
        assert!(config.thread_pool.is_none());

        assert!(matches!(
            EngineConfig::from_toml_str("mark_invalid_resources = 1"),
            Err(BuildError::InvalidConfig { .. })
        ));
        assert!(EngineConfig::from_toml_str("[thread_pool]\nthreads = 0").is_err());
        assert!(EngineConfig::from_toml_str("not toml =").is_err());
    }

    #[test]
    fn test_builder_defers_registration_errors() {
        let result = Engine::builder()
            .register_type(TypeDescriptor::builder::<u8>("Byte", || 0).build())
            .register_type(TypeDescriptor::builder::<u16>("Byte", || 0).build())
            .build();
        assert!(matches!(result, Err(BuildError::Registry(_))));
    }

    #[test]
    fn test_builder_applies_settings() {
        let engine = Engine::builder()
            .mark_invalid_resources(true)
            .command("audit", |_: &BuildResult, _: &ObjectRef| true)
            .build()
            .unwrap();

        assert!(engine.resources().is_mark_invalid());
        assert!(engine.commands().contains("$audit"));
        assert!(engine.commands().contains("$validate"));
    }
}
