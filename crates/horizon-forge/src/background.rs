//! Background execution of handler steps.
//!
//! A method declared with [`in_background`](horizon_forge_core::MetaObjectBuilder::in_background)
//! runs on a worker thread. The chain around it stays ordered: steps before
//! it have finished when it starts, and steps after it only start once the
//! worker has returned. The continuation and every listener callback run on
//! the UI dispatcher.
//!
//! For one run, listeners observe:
//!
//! 1. `started`, on the thread that fired the chain, before the worker starts
//! 2. `progress`, through the dispatcher, whenever the worker reports
//! 3. `ended`, through the dispatcher, after the worker returned
//!
//! followed by the rest of the chain.
//!
//! A step counts as cancelled only if the worker acknowledged the request
//! with [`BackgroundEvent::acknowledge_cancel`]; the chain then aborts. A
//! request the worker never observed leaves its normal result in charge.

use horizon_forge_core::logging::targets;
use horizon_forge_core::meta::{CallerRef, HandlerOutcome, Invocable};
use horizon_forge_core::{
    BackgroundEvent, BackgroundTaskDescriptor, ConnectionType, Event, ForgeError, ProgressUpdate,
    QueuedInvocation, ThreadPool, ThreadPoolConfig,
};

use crate::error::ChainError;
use crate::handler::{ChainOutcome, StepResult, invoke_guarded};
use crate::result::BuildResult;

/// Observer of background step runs.
///
/// A progress dialog is the typical listener: shown in `started`, updated in
/// `progress` and closed in `ended`. Cancellation is requested through
/// [`BackgroundEvent::request_cancel`].
pub trait BackgroundListener: Send + Sync {
    /// The step is about to start on a worker.
    fn started(&self, event: &BackgroundEvent);

    /// The worker returned, whatever the outcome.
    fn ended(&self, event: &BackgroundEvent);

    /// The worker reported progress.
    fn progress(&self, event: &BackgroundEvent, update: &ProgressUpdate) {
        let _ = (event, update);
    }
}

/// Where background steps run.
pub(crate) enum WorkerPool {
    /// The process-wide pool.
    Global,
    /// A pool owned by one engine.
    Owned(ThreadPool),
}

impl WorkerPool {
    pub(crate) fn from_config(config: Option<ThreadPoolConfig>) -> Result<Self, ForgeError> {
        match config {
            Some(config) => ThreadPool::new(config).map(Self::Owned),
            None => Ok(Self::Global),
        }
    }

    pub(crate) fn get(&self) -> Result<&ThreadPool, ForgeError> {
        match self {
            Self::Global => ThreadPool::global(),
            Self::Owned(pool) => Ok(pool),
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => f.write_str("WorkerPool::Global"),
            Self::Owned(pool) => f.debug_tuple("WorkerPool::Owned").field(pool).finish(),
        }
    }
}

/// A resolved background step ready to launch.
pub(crate) struct BackgroundLaunch {
    pub(crate) method: String,
    pub(crate) caller: CallerRef,
    pub(crate) invocable: Invocable,
    pub(crate) descriptor: BackgroundTaskDescriptor,
    pub(crate) event: Event,
}

/// Start a background step; `continuation` receives its result on the UI dispatcher.
pub(crate) fn launch<C>(result: &BuildResult, launch: BackgroundLaunch, continuation: C)
where
    C: FnOnce(StepResult) + Send + 'static,
{
    let BackgroundLaunch {
        method,
        caller,
        invocable,
        descriptor,
        event,
    } = launch;

    let pool = match result.shared().pool() {
        Ok(pool) => pool,
        Err(err) => {
            tracing::error!(target: targets::BACKGROUND, method = %method, error = %err, "no worker pool available");
            continuation(StepResult::Stop(ChainOutcome::Failed(ChainError::BackgroundFailed {
                method,
                message: err.to_string(),
            })));
            return;
        }
    };

    let background = BackgroundEvent::new(descriptor);
    background.set_progress_message(result.resources().lookup(&background.descriptor().progress_message_key));

    let listeners = result.background_listeners();
    let dispatcher = result.shared().dispatcher();

    let relay = {
        let listeners = listeners.clone();
        let dispatcher = dispatcher.clone();
        let background = background.clone();
        move |update: &ProgressUpdate| {
            let listeners = listeners.clone();
            let background = background.clone();
            let update = update.clone();
            dispatcher.dispatch(QueuedInvocation::new(move || {
                for listener in &listeners {
                    listener.progress(&background, &update);
                }
            }));
        }
    };
    let relay_id = background.on_progress().connect_with_type(relay, ConnectionType::Direct);

    tracing::debug!(
        target: targets::BACKGROUND,
        method = %method,
        cancelable = background.descriptor().cancelable,
        blocking = background.descriptor().blocking,
        "starting background step"
    );
    for listener in &listeners {
        listener.started(&background);
    }

    let worker_event = event.to_background(background.clone());
    let worker_method = method.clone();
    let task = move || {
        let _span = tracing::info_span!(target: targets::BACKGROUND, "horizon_forge::background", method = %worker_method).entered();
        invoke_guarded(&worker_method, &caller, &invocable, &worker_event)
    };

    let finish = move |outcome: Option<Result<HandlerOutcome, ChainError>>| {
        background.cancel_status().complete();
        background.on_progress().disconnect(relay_id);
        for listener in &listeners {
            listener.ended(&background);
        }

        let step = if background.was_cancelled() {
            tracing::debug!(target: targets::BACKGROUND, method = %method, "background step cancelled, chain aborted");
            StepResult::Stop(ChainOutcome::Aborted)
        } else {
            match outcome {
                Some(Ok(HandlerOutcome::Continue)) => StepResult::Continue,
                Some(Ok(HandlerOutcome::Abort)) => StepResult::Stop(ChainOutcome::Aborted),
                Some(Ok(HandlerOutcome::Failed(message))) => background_failed(&method, message),
                Some(Err(ChainError::HandlerPanicked { message, .. })) => background_failed(&method, message),
                Some(Err(err)) => StepResult::Stop(ChainOutcome::Failed(err)),
                None => background_failed(&method, "worker panicked".to_string()),
            }
        };
        continuation(step);
    };

    pool.spawn_with_callback(dispatcher, task, finish);
}

fn background_failed(method: &str, message: String) -> StepResult {
    let err = ChainError::BackgroundFailed {
        method: method.to_string(),
        message,
    };
    tracing::error!(target: targets::BACKGROUND, error = %err, "background step failed");
    StepResult::Stop(ChainOutcome::Failed(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_pool_from_config() {
        let pool = WorkerPool::from_config(Some(ThreadPoolConfig::with_threads(1))).unwrap();
        assert_eq!(pool.get().unwrap().num_threads(), 1);
        assert!(matches!(WorkerPool::from_config(None).unwrap(), WorkerPool::Global));
    }

    #[test]
    fn test_failure_becomes_background_failed() {
        match background_failed("save", "disk full".into()) {
            StepResult::Stop(ChainOutcome::Failed(ChainError::BackgroundFailed { method, message })) => {
                assert_eq!(method, "save");
                assert_eq!(message, "disk full");
            }
            _ => panic!("expected a background failure"),
        }
    }
}
