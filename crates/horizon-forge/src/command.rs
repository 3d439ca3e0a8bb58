//! Commands: reusable `$name` steps of handler chains.
//!
//! A command receives the build result and the object that fired the event,
//! and returns whether the chain continues. Two commands are always
//! available:
//!
//! - `$validate` validates the whole build and reports failures through the
//!   engine's [`Prompt`]; the chain continues only when nothing failed.
//! - `$confirm` asks a yes/no question through the [`Prompt`].

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};

use horizon_forge_core::ObjectRef;
use horizon_forge_core::logging::targets;

use crate::handler::COMMAND_PREFIX;
use crate::result::BuildResult;
use crate::validation::ValidationMessage;

/// Token of the validation command.
pub const VALIDATE_COMMAND: &str = "$validate";
/// Token of the confirmation command.
pub const CONFIRM_COMMAND: &str = "$confirm";

/// A chain step implemented outside any caller.
pub trait Command: Send + Sync {
    /// Run the command; `false` stops the chain.
    fn execute(&self, result: &BuildResult, source: &ObjectRef) -> bool;
}

impl<F> Command for F
where
    F: Fn(&BuildResult, &ObjectRef) -> bool + Send + Sync,
{
    fn execute(&self, result: &BuildResult, source: &ObjectRef) -> bool {
        self(result, source)
    }
}

/// The user-facing side of commands: questions and validation reports.
pub trait Prompt: Send + Sync {
    /// Ask a yes/no question.
    fn confirm(&self, title: &str, question: &str) -> bool;

    /// Show validation failures.
    fn report_validation(&self, title: &str, messages: &[ValidationMessage]);
}

/// A prompt that answers every question the same way and records what it saw.
///
/// Used for headless builds and tests.
#[derive(Debug)]
pub struct AutoPrompt {
    answer: bool,
    questions: Mutex<Vec<(String, String)>>,
    reports: Mutex<Vec<Vec<ValidationMessage>>>,
}

impl AutoPrompt {
    /// A prompt answering `answer`.
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            questions: Mutex::new(Vec::new()),
            reports: Mutex::new(Vec::new()),
        }
    }

    /// A prompt that always agrees.
    pub fn yes() -> Self {
        Self::new(true)
    }

    /// A prompt that always declines.
    pub fn no() -> Self {
        Self::new(false)
    }

    /// Every `(title, question)` asked so far.
    pub fn questions(&self) -> Vec<(String, String)> {
        self.questions.lock().clone()
    }

    /// Every validation report shown so far.
    pub fn reports(&self) -> Vec<Vec<ValidationMessage>> {
        self.reports.lock().clone()
    }
}

impl Prompt for AutoPrompt {
    fn confirm(&self, title: &str, question: &str) -> bool {
        self.questions.lock().push((title.to_string(), question.to_string()));
        self.answer
    }

    fn report_validation(&self, title: &str, messages: &[ValidationMessage]) {
        tracing::debug!(target: targets::VALIDATION, title, failures = messages.len(), "validation report");
        self.reports.lock().push(messages.to_vec());
    }
}

/// Runs validation over the whole build.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidateCommand;

impl Command for ValidateCommand {
    fn execute(&self, result: &BuildResult, _source: &ObjectRef) -> bool {
        let messages = result.validate();
        if messages.is_empty() {
            return true;
        }
        let title = result.resources().lookup("title.validationErrors");
        result.prompt().report_validation(&title, &messages);
        false
    }
}

/// Asks a yes/no question; both texts are resource keys or literal text.
#[derive(Debug, Clone)]
pub struct ConfirmCommand {
    title: String,
    question: String,
}

impl ConfirmCommand {
    /// A confirmation with the given title and question.
    pub fn new(title: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            question: question.into(),
        }
    }
}

impl Default for ConfirmCommand {
    fn default() -> Self {
        Self::new("title.confirmation", "question.confirm")
    }
}

impl Command for ConfirmCommand {
    fn execute(&self, result: &BuildResult, _source: &ObjectRef) -> bool {
        let resources = result.resources();
        let title = resources.resolve_or_literal(&self.title);
        let question = resources.resolve_or_literal(&self.question);
        result.prompt().confirm(&title, &question)
    }
}

/// Named commands available to handler chains.
pub struct CommandRegistry {
    commands: RwLock<IndexMap<String, Arc<dyn Command>>>,
}

impl CommandRegistry {
    /// A registry with `$validate` and `$confirm`.
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.register(VALIDATE_COMMAND, ValidateCommand);
        registry.register(CONFIRM_COMMAND, ConfirmCommand::default());
        registry
    }

    /// A registry without any command.
    pub fn empty() -> Self {
        Self {
            commands: RwLock::new(IndexMap::new()),
        }
    }

    /// Register `command` under `token`, replacing an earlier one.
    ///
    /// The `$` prefix is added when missing.
    pub fn register(&self, token: &str, command: impl Command + 'static) -> Option<Arc<dyn Command>> {
        self.register_arc(token, Arc::new(command))
    }

    /// Register a shared command.
    pub fn register_arc(&self, token: &str, command: Arc<dyn Command>) -> Option<Arc<dyn Command>> {
        let token = canonical(token);
        tracing::trace!(target: targets::HANDLER, token = %token, "command registered");
        self.commands.write().insert(token, command)
    }

    /// The command registered under `token`.
    pub fn get(&self, token: &str) -> Option<Arc<dyn Command>> {
        self.commands.read().get(&canonical(token)).cloned()
    }

    /// Whether `token` is registered.
    pub fn contains(&self, token: &str) -> bool {
        self.commands.read().contains_key(&canonical(token))
    }

    /// Registered tokens in registration order.
    pub fn tokens(&self) -> Vec<String> {
        self.commands.read().keys().cloned().collect()
    }

    /// Run the command registered under `token`; `None` if there is none.
    pub fn invoke(&self, token: &str, result: &BuildResult, source: &ObjectRef) -> Option<bool> {
        let command = self.get(token)?;
        Some(command.execute(result, source))
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("tokens", &self.tokens())
            .finish()
    }
}

fn canonical(token: &str) -> String {
    let token = token.trim();
    if token.starts_with(COMMAND_PREFIX) {
        token.to_string()
    } else {
        format!("{COMMAND_PREFIX}{token}")
    }
}

static_assertions::assert_impl_all!(CommandRegistry: Send, Sync);
static_assertions::assert_impl_all!(AutoPrompt: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_commands_registered() {
        let registry = CommandRegistry::new();
        assert_eq!(registry.tokens(), [VALIDATE_COMMAND, CONFIRM_COMMAND]);
        assert!(registry.contains("validate"));
        assert!(CommandRegistry::empty().tokens().is_empty());
    }

    #[test]
    fn test_register_replaces_and_prefixes() {
        let registry = CommandRegistry::new();
        assert!(registry.register("audit", |_: &BuildResult, _: &ObjectRef| true).is_none());
        assert!(registry.contains("$audit"));
        assert!(registry.register("$confirm", |_: &BuildResult, _: &ObjectRef| false).is_some());
        assert_eq!(registry.tokens().len(), 3);
    }

    #[test]
    fn test_auto_prompt_records() {
        let prompt = AutoPrompt::no();
        assert!(!prompt.confirm("Confirmation", "Are you sure?"));
        prompt.report_validation("Errors", &[]);

        assert_eq!(
            prompt.questions(),
            [("Confirmation".to_string(), "Are you sure?".to_string())]
        );
        assert_eq!(prompt.reports().len(), 1);
    }
}
