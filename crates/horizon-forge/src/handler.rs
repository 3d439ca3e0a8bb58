//! Handler tokens, their resolution and handler chain execution.
//!
//! An event property holds a handler chain: one token or a list of tokens.
//! A token is either a method name, resolved against the caller chain, or a
//! `$name` command, resolved through the command registry. Every token is
//! resolved while the document is built, so a misspelled handler fails the
//! build instead of the first click.
//!
//! Firing a chain runs its steps strictly in order. A step returning `false`
//! stops the chain. A background step suspends the chain until its worker
//! finishes; the remaining steps then continue on the UI dispatcher.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use parking_lot::{Condvar, Mutex, RwLock};

use horizon_forge_core::logging::targets;
use horizon_forge_core::meta::{CallerRef, HandlerOutcome, Invocable};
use horizon_forge_core::{BackgroundTaskDescriptor, Event, EventType, ObjectRef};

use crate::command::{Command, CommandRegistry};
use crate::error::{BuildError, ChainError};
use crate::node::Value;
use crate::registry::TypeRegistry;
use crate::result::{BuildResult, ResultInner};

/// Prefix marking a command token.
pub const COMMAND_PREFIX: char = '$';

/// One symbolic entry of a handler chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerToken {
    /// A caller method name.
    Method(String),
    /// A command name, including its `$` prefix.
    Command(String),
    /// A nested chain.
    Chain(Vec<HandlerToken>),
}

impl HandlerToken {
    /// Parse an event property value.
    ///
    /// Strings and references become single tokens; lists become chains.
    pub fn parse(value: &Value) -> Result<Self, String> {
        match value {
            Value::Str(text) | Value::Reference(text) => {
                let text = text.trim();
                if text.is_empty() {
                    Err("empty handler name".to_string())
                } else if text.starts_with(COMMAND_PREFIX) {
                    Ok(Self::Command(text.to_string()))
                } else {
                    Ok(Self::Method(text.to_string()))
                }
            }
            Value::List(items) if items.is_empty() => Err("empty handler list".to_string()),
            Value::List(items) => items
                .iter()
                .map(Self::parse)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Chain),
            other => Err(format!("expected a handler name or list, got {}", other.kind_name())),
        }
    }

    /// The method and command tokens in execution order, nested chains flattened.
    pub fn flatten(&self) -> Vec<&HandlerToken> {
        match self {
            Self::Chain(items) => items.iter().flat_map(HandlerToken::flatten).collect(),
            leaf => vec![leaf],
        }
    }
}

impl fmt::Display for HandlerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Method(name) | Self::Command(name) => f.write_str(name),
            Self::Chain(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// A resolved step of a handler chain.
#[derive(Clone)]
pub enum ChainStep {
    /// A caller method.
    Method {
        /// The method name.
        name: String,
        /// The caller the method was found on.
        caller: CallerRef,
        /// The selected signature.
        invocable: Invocable,
        /// Present when the method runs on the background lane.
        background: Option<BackgroundTaskDescriptor>,
    },
    /// A registered command.
    Command {
        /// The command token, including `$`.
        name: String,
        /// The command.
        command: Arc<dyn Command>,
    },
}

impl ChainStep {
    /// The token this step was resolved from.
    pub fn name(&self) -> &str {
        match self {
            Self::Method { name, .. } | Self::Command { name, .. } => name,
        }
    }

    /// Whether the step runs on the background lane.
    pub fn is_background(&self) -> bool {
        matches!(self, Self::Method { background: Some(_), .. })
    }
}

impl fmt::Debug for ChainStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Method {
                name,
                caller,
                invocable,
                background,
            } => f
                .debug_struct("Method")
                .field("name", name)
                .field("caller", &caller.type_name())
                .field("signature", &invocable.signature())
                .field("background", &background.is_some())
                .finish(),
            Self::Command { name, .. } => f.debug_struct("Command").field("name", name).finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResolutionKey {
    caller: TypeId,
    token: String,
    source: TypeId,
    event: EventType,
}

/// Resolves handler tokens to chain steps.
///
/// Signature selection is cached per caller type, token, source type and
/// event type.
pub struct HandlerResolver {
    registry: Arc<TypeRegistry>,
    commands: Arc<CommandRegistry>,
    cache: RwLock<HashMap<ResolutionKey, Option<usize>>>,
}

impl HandlerResolver {
    /// Create a resolver over a type registry and command registry.
    pub fn new(registry: Arc<TypeRegistry>, commands: Arc<CommandRegistry>) -> Self {
        Self {
            registry,
            commands,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Number of cached signature selections.
    pub fn cached_resolutions(&self) -> usize {
        self.cache.read().len()
    }

    /// Resolve one method or command token.
    ///
    /// Callers are searched innermost first; the first caller declaring a
    /// method of that name decides.
    pub fn resolve(
        &self,
        token: &HandlerToken,
        source: &ObjectRef,
        event_type: &EventType,
        callers: &[CallerRef],
        node: &impl fmt::Display,
    ) -> Result<ChainStep, BuildError> {
        let unresolved = |searched: String| BuildError::UnresolvedHandler {
            token: token.to_string(),
            event: event_type.to_string(),
            node: node.to_string(),
            searched,
        };

        match token {
            HandlerToken::Command(name) => {
                let command = self
                    .commands
                    .get(name)
                    .ok_or_else(|| unresolved("the command registry".to_string()))?;
                Ok(ChainStep::Command {
                    name: name.clone(),
                    command,
                })
            }
            HandlerToken::Method(name) => {
                let Some(caller) = callers.iter().find(|c| c.meta().method(name).is_some()) else {
                    let searched: Vec<_> = callers.iter().map(CallerRef::type_name).collect();
                    return Err(unresolved(format!("callers [{}]", searched.join(", "))));
                };
                let Some(method) = caller.meta().method(name) else {
                    return Err(unresolved(caller.type_name().to_string()));
                };

                let key = ResolutionKey {
                    caller: caller.meta().type_id(),
                    token: name.clone(),
                    source: source.type_id(),
                    event: event_type.clone(),
                };
                let cached = self.cache.read().get(&key).copied();
                let selected = match cached {
                    Some(selected) => selected,
                    None => {
                        let is_a = |object: &ObjectRef, capability: &str| self.registry.is_a(object, capability);
                        let selected = method.select(source, event_type, &is_a);
                        self.cache.write().insert(key, selected);
                        selected
                    }
                };

                let index = selected.ok_or_else(|| {
                    unresolved(format!(
                        "{} (no signature of '{name}' accepts {event_type} from {})",
                        caller.type_name(),
                        self.registry.display_type(source)
                    ))
                })?;
                let invocable = method.overloads()[index].clone();
                tracing::trace!(
                    target: targets::HANDLER,
                    token = %name,
                    caller = caller.type_name(),
                    signature = invocable.signature(),
                    "handler resolved"
                );

                Ok(ChainStep::Method {
                    name: name.clone(),
                    caller: caller.clone(),
                    invocable,
                    background: method.background().cloned(),
                })
            }
            HandlerToken::Chain(_) => {
                let mut steps = self.resolve_chain(token, source, event_type, callers, node)?;
                match steps.len() {
                    1 => Ok(steps.remove(0)),
                    _ => Err(unresolved("a nested chain where one step was expected".to_string())),
                }
            }
        }
    }

    /// Resolve every token of a chain, nested chains flattened.
    pub fn resolve_chain(
        &self,
        token: &HandlerToken,
        source: &ObjectRef,
        event_type: &EventType,
        callers: &[CallerRef],
        node: &impl fmt::Display,
    ) -> Result<Vec<ChainStep>, BuildError> {
        token
            .flatten()
            .into_iter()
            .map(|leaf| self.resolve(leaf, source, event_type, callers, node))
            .collect()
    }
}

impl fmt::Debug for HandlerResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerResolver")
            .field("cached_resolutions", &self.cached_resolutions())
            .finish()
    }
}

/// Final outcome of a handler chain run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Every step ran.
    Completed,
    /// A step returned `false`, a command declined or a background task was cancelled.
    Aborted,
    /// A step failed.
    Failed(ChainError),
}

/// Status returned when firing a handler chain.
#[derive(Debug, Clone)]
pub enum ChainStatus {
    /// Every step ran synchronously.
    Completed,
    /// A synchronous step stopped the chain.
    Aborted,
    /// A synchronous step failed.
    Failed(ChainError),
    /// A background step is running; the ticket resolves when the chain ends.
    Pending(ChainTicket),
}

impl ChainStatus {
    /// Whether a background step is still running.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// The outcome, if the chain has finished.
    pub fn outcome(&self) -> Option<ChainOutcome> {
        match self {
            Self::Completed => Some(ChainOutcome::Completed),
            Self::Aborted => Some(ChainOutcome::Aborted),
            Self::Failed(err) => Some(ChainOutcome::Failed(err.clone())),
            Self::Pending(ticket) => ticket.outcome(),
        }
    }

    /// The ticket of a pending chain.
    pub fn ticket(&self) -> Option<&ChainTicket> {
        match self {
            Self::Pending(ticket) => Some(ticket),
            _ => None,
        }
    }
}

impl From<ChainOutcome> for ChainStatus {
    fn from(outcome: ChainOutcome) -> Self {
        match outcome {
            ChainOutcome::Completed => Self::Completed,
            ChainOutcome::Aborted => Self::Aborted,
            ChainOutcome::Failed(err) => Self::Failed(err),
        }
    }
}

#[derive(Default)]
struct TicketInner {
    outcome: Mutex<Option<ChainOutcome>>,
    ready: Condvar,
}

/// Completion handle of a chain suspended on a background step.
#[derive(Clone, Default)]
pub struct ChainTicket {
    inner: Arc<TicketInner>,
}

impl ChainTicket {
    /// Whether the chain has finished.
    pub fn is_finished(&self) -> bool {
        self.inner.outcome.lock().is_some()
    }

    /// The outcome, if finished.
    pub fn outcome(&self) -> Option<ChainOutcome> {
        self.inner.outcome.lock().clone()
    }

    /// Block until the chain finishes.
    ///
    /// With a [`QueuedDispatcher`](horizon_forge_core::QueuedDispatcher) the
    /// remaining steps only run while the UI thread pumps it, so waiting on
    /// the UI thread itself never returns. Poll [`is_finished`](Self::is_finished)
    /// between pumps instead.
    pub fn wait(&self) -> ChainOutcome {
        let mut outcome = self.inner.outcome.lock();
        loop {
            if let Some(done) = outcome.as_ref() {
                return done.clone();
            }
            self.inner.ready.wait(&mut outcome);
        }
    }

    /// Block up to `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<ChainOutcome> {
        let mut outcome = self.inner.outcome.lock();
        if outcome.is_none() {
            self.inner.ready.wait_for(&mut outcome, timeout);
        }
        outcome.clone()
    }

    pub(crate) fn resolve(&self, result: ChainOutcome) {
        let mut outcome = self.inner.outcome.lock();
        if outcome.is_none() {
            *outcome = Some(result);
            self.inner.ready.notify_all();
        }
    }
}

impl fmt::Debug for ChainTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainTicket")
            .field("outcome", &*self.inner.outcome.lock())
            .finish()
    }
}

/// Filled in once the build that resolved a handler has produced its result.
pub(crate) type ResultSlot = Arc<OnceLock<Weak<ResultInner>>>;

struct HandlerInner {
    steps: Arc<[ChainStep]>,
    event_type: EventType,
    origin: String,
    result: ResultSlot,
}

/// A resolved handler chain attached to an event property.
///
/// Widgets keep the handler and call [`fire`](Self::fire) when the event
/// occurs. The handler holds its build result weakly.
#[derive(Clone)]
pub struct EventHandler {
    inner: Arc<HandlerInner>,
}

impl EventHandler {
    pub(crate) fn new(steps: Vec<ChainStep>, event_type: EventType, origin: String, result: ResultSlot) -> Self {
        Self {
            inner: Arc::new(HandlerInner {
                steps: steps.into(),
                event_type,
                origin,
                result,
            }),
        }
    }

    /// The resolved steps in execution order.
    pub fn steps(&self) -> &[ChainStep] {
        &self.inner.steps
    }

    /// The event type the chain was resolved for.
    pub fn event_type(&self) -> &EventType {
        &self.inner.event_type
    }

    /// Fire the chain with an event of the resolved type from `source`.
    pub fn fire_from(&self, source: impl Into<ObjectRef>) -> ChainStatus {
        self.fire(Event::new(self.inner.event_type.clone(), source.into()))
    }

    /// Run the chain.
    pub fn fire(&self, event: Event) -> ChainStatus {
        let Some(result) = self.inner.result.get().and_then(Weak::upgrade) else {
            tracing::warn!(
                target: targets::HANDLER,
                origin = %self.inner.origin,
                "handler fired after its build result was dropped"
            );
            return ChainStatus::Failed(ChainError::ResultDropped);
        };

        tracing::debug!(
            target: targets::HANDLER,
            origin = %self.inner.origin,
            event = %event.event_type(),
            steps = self.inner.steps.len(),
            "firing handler chain"
        );

        ChainRun {
            steps: self.inner.steps.clone(),
            event,
            result: BuildResult::from_inner(result),
            ticket: None,
        }
        .run_from(0)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandler")
            .field("origin", &self.inner.origin)
            .field("event_type", &self.inner.event_type)
            .field("steps", &self.inner.steps)
            .finish()
    }
}

/// What a background step tells the suspended chain.
pub(crate) enum StepResult {
    Continue,
    Stop(ChainOutcome),
}

/// One execution of a chain, possibly resumed after background steps.
pub(crate) struct ChainRun {
    steps: Arc<[ChainStep]>,
    event: Event,
    result: BuildResult,
    ticket: Option<ChainTicket>,
}

impl ChainRun {
    pub(crate) fn run_from(self, start: usize) -> ChainStatus {
        let _span = tracing::debug_span!(target: targets::HANDLER, "horizon_forge::chain", start).entered();

        for index in start..self.steps.len() {
            let step = &self.steps[index];
            match step {
                ChainStep::Method {
                    name,
                    caller,
                    invocable,
                    background: Some(descriptor),
                } => {
                    let ticket = self.ticket.clone().unwrap_or_default();
                    let launch = crate::background::BackgroundLaunch {
                        method: name.clone(),
                        caller: caller.clone(),
                        invocable: invocable.clone(),
                        descriptor: descriptor.clone(),
                        event: self.event.clone(),
                    };
                    let resume = ChainRun {
                        steps: self.steps.clone(),
                        event: self.event.clone(),
                        result: self.result.clone(),
                        ticket: Some(ticket.clone()),
                    };
                    crate::background::launch(&self.result, launch, move |step_result| match step_result {
                        StepResult::Continue => {
                            resume.run_from(index + 1);
                        }
                        StepResult::Stop(outcome) => {
                            resume.finish(outcome);
                        }
                    });
                    return ChainStatus::Pending(ticket);
                }
                ChainStep::Method {
                    name,
                    caller,
                    invocable,
                    background: None,
                } => match invoke_guarded(name, caller, invocable, &self.event) {
                    Ok(HandlerOutcome::Continue) => {}
                    Ok(HandlerOutcome::Abort) => {
                        tracing::debug!(target: targets::HANDLER, step = %name, "handler returned false, chain aborted");
                        return self.finish(ChainOutcome::Aborted);
                    }
                    Ok(HandlerOutcome::Failed(message)) => {
                        let err = ChainError::HandlerFailed {
                            method: name.clone(),
                            message,
                        };
                        tracing::error!(target: targets::HANDLER, error = %err, "handler failed");
                        return self.finish(ChainOutcome::Failed(err));
                    }
                    Err(err) => {
                        tracing::error!(target: targets::HANDLER, error = %err, "handler panicked");
                        return self.finish(ChainOutcome::Failed(err));
                    }
                },
                ChainStep::Command { name, command } => {
                    let executed = catch_unwind(AssertUnwindSafe(|| command.execute(&self.result, self.event.source())));
                    match executed {
                        Ok(true) => {}
                        Ok(false) => {
                            tracing::debug!(target: targets::HANDLER, command = %name, "command declined, chain aborted");
                            return self.finish(ChainOutcome::Aborted);
                        }
                        Err(payload) => {
                            let err = ChainError::HandlerPanicked {
                                method: name.clone(),
                                message: panic_message(payload.as_ref()),
                            };
                            tracing::error!(target: targets::HANDLER, error = %err, "command panicked");
                            return self.finish(ChainOutcome::Failed(err));
                        }
                    }
                }
            }
        }

        self.finish(ChainOutcome::Completed)
    }

    fn finish(self, outcome: ChainOutcome) -> ChainStatus {
        if let Some(ticket) = &self.ticket {
            ticket.resolve(outcome.clone());
        }
        outcome.into()
    }
}

/// Invoke a handler, turning a panic into a [`ChainError`].
pub(crate) fn invoke_guarded(
    name: &str,
    caller: &CallerRef,
    invocable: &Invocable,
    event: &Event,
) -> Result<HandlerOutcome, ChainError> {
    catch_unwind(AssertUnwindSafe(|| invocable.invoke(caller.receiver(), event))).map_err(|payload| {
        ChainError::HandlerPanicked {
            method: name.to_string(),
            message: panic_message(payload.as_ref()),
        }
    })
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}
