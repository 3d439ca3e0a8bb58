//! The queryable outcome of a build.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use horizon_forge_core::logging::targets;
use horizon_forge_core::meta::CallerRef;
use horizon_forge_core::{Object, ObjectRef};

use crate::background::BackgroundListener;
use crate::binding::DataBinding;
use crate::build::EngineShared;
use crate::command::Prompt;
use crate::error::BuildError;
use crate::logging::NodeTreeDebug;
use crate::node::Node;
use crate::resource::ResourceScope;
use crate::validation::{self, ValidationMessage, ValidationRule, ValueValidator, split_target};

pub(crate) struct ResultInner {
    pub(crate) shared: Arc<EngineShared>,
    pub(crate) root: ObjectRef,
    /// Innermost caller first.
    pub(crate) callers: Vec<CallerRef>,
    pub(crate) objects: IndexMap<String, ObjectRef>,
    pub(crate) tree: Node,
    pub(crate) resources: ResourceScope,
    pub(crate) rules: RwLock<Vec<ValidationRule>>,
    pub(crate) background_listeners: RwLock<Vec<Arc<dyn BackgroundListener>>>,
    pub(crate) bindings: Vec<DataBinding>,
}

/// The objects of one build, by name, plus everything registered with them.
///
/// Cloning is cheap; clones share the same validators and listeners.
/// Event handlers created by the build hold the result weakly, so chains
/// fired after every clone is dropped fail with
/// [`ChainError::ResultDropped`](crate::ChainError::ResultDropped).
#[derive(Clone)]
pub struct BuildResult(Arc<ResultInner>);

impl BuildResult {
    pub(crate) fn from_inner(inner: Arc<ResultInner>) -> Self {
        Self(inner)
    }

    pub(crate) fn shared(&self) -> &EngineShared {
        &self.0.shared
    }

    /// The object built for the root node.
    pub fn root(&self) -> &ObjectRef {
        &self.0.root
    }

    /// The caller the build was started for.
    pub fn caller(&self) -> &CallerRef {
        // A build always has at least its own caller.
        &self.0.callers[0]
    }

    /// The caller chain, innermost first.
    pub fn callers(&self) -> &[CallerRef] {
        &self.0.callers
    }

    /// The object built for the node named `name`.
    pub fn get(&self, name: &str) -> Option<&ObjectRef> {
        self.0.objects.get(name)
    }

    /// The object named `name`, if it has type `T`.
    pub fn get_as<T: Object>(&self, name: &str) -> Option<Arc<T>> {
        self.get(name)?.downcast::<T>()
    }

    /// Every build name, in build order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.objects.keys().map(String::as_str)
    }

    /// Number of named objects.
    pub fn len(&self) -> usize {
        self.0.objects.len()
    }

    /// Whether no node was named.
    pub fn is_empty(&self) -> bool {
        self.0.objects.is_empty()
    }

    /// The node tree this result was built from.
    pub fn tree(&self) -> &Node {
        &self.0.tree
    }

    /// Resource lookup scoped to this build's callers and extra bundles.
    pub fn resources(&self) -> &ResourceScope {
        &self.0.resources
    }

    /// The prompt used by the built-in commands.
    pub fn prompt(&self) -> &dyn Prompt {
        self.0.shared.prompt()
    }

    /// Run every validation rule against the current property values.
    ///
    /// Returns an empty list when nothing failed.
    pub fn validate(&self) -> Vec<ValidationMessage> {
        // Cloned so custom validators may register more rules.
        let rules = self.0.rules.read().clone();
        let objects = &self.0.objects;
        validation::validate_all(
            &rules,
            |name| objects.get(name).cloned(),
            &self.0.shared.registry,
            &self.0.resources,
        )
    }

    /// The registered validation rules in declaration order.
    pub fn validators(&self) -> Vec<ValidationRule> {
        self.0.rules.read().clone()
    }

    /// Append a custom validator for `object.property`.
    ///
    /// The validator joins the rule already registered for that target, or
    /// starts a new rule at the end of the list.
    pub fn add_validator(&self, target: &str, validator: impl ValueValidator + 'static) -> Result<(), BuildError> {
        let (object, property) = self.check_target(target)?;
        let validator: Arc<dyn ValueValidator> = Arc::new(validator);

        let mut rules = self.0.rules.write();
        match rules
            .iter_mut()
            .find(|rule| rule.object_name() == object && rule.property_name() == property)
        {
            Some(rule) => rule.push_validator(validator),
            None => {
                let mut rule = ValidationRule::new(object, property);
                rule.push_validator(validator);
                rules.push(rule);
            }
        }
        tracing::debug!(target: targets::VALIDATION, target_path = target, "custom validator added");
        Ok(())
    }

    /// Append a complete rule.
    pub fn add_rule(&self, rule: ValidationRule) -> Result<(), BuildError> {
        self.check_target(&rule.target())?;
        self.0.rules.write().push(rule);
        Ok(())
    }

    /// Observe background steps of chains built by this result.
    pub fn add_background_listener(&self, listener: Arc<dyn BackgroundListener>) {
        self.0.background_listeners.write().push(listener);
    }

    /// Engine-wide listeners followed by this result's own.
    pub(crate) fn background_listeners(&self) -> Vec<Arc<dyn BackgroundListener>> {
        let mut listeners = self.0.shared.background_listeners();
        listeners.extend(self.0.background_listeners.read().iter().cloned());
        listeners
    }

    /// The data bindings established by `bind` nodes.
    pub fn bindings(&self) -> &[DataBinding] {
        &self.0.bindings
    }

    /// Copy every bound source value into its target again.
    pub fn refresh_bindings(&self) -> Result<(), BuildError> {
        for binding in &self.0.bindings {
            binding.copy(&self.0.shared.registry, &self.0.resources)?;
        }
        Ok(())
    }

    /// The source tree rendered with default [`NodeTreeDebug`] options.
    pub fn debug_tree(&self) -> String {
        NodeTreeDebug::new().format(&self.0.tree)
    }

    fn check_target<'t>(&self, target: &'t str) -> Result<(&'t str, &'t str), BuildError> {
        let (object, property) =
            split_target(target).ok_or_else(|| BuildError::invalid_rule(target, "expected 'object.property'"))?;
        let Some(built) = self.get(object) else {
            return Err(BuildError::invalid_rule(target, format!("no object named '{object}'")));
        };
        let readable = self
            .0
            .shared
            .registry
            .descriptor_for(built)
            .is_some_and(|descriptor| descriptor.can_read(property));
        if !readable {
            return Err(BuildError::invalid_rule(
                target,
                format!("'{property}' of '{object}' cannot be read"),
            ));
        }
        Ok((object, property))
    }
}

impl fmt::Debug for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildResult")
            .field("caller", &self.caller().type_name())
            .field("names", &self.0.objects.keys().collect::<Vec<_>>())
            .field("rules", &self.0.rules.read().len())
            .field("bindings", &self.0.bindings)
            .finish()
    }
}

static_assertions::assert_impl_all!(BuildResult: Send, Sync);
