//! Error types for Horizon Forge core systems.

use std::fmt;

use crate::cancel::CancelState;

/// The main error type for core operations.
#[derive(Debug)]
pub enum ForgeError {
    /// Thread pool related error.
    ThreadPool(ThreadPoolError),
    /// Cancellation state related error.
    Cancel(CancelStateError),
    /// Object or field related error.
    Object(ObjectError),
    /// A UI dispatcher has already been installed for this process.
    DispatcherAlreadyInstalled,
}

impl fmt::Display for ForgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThreadPool(err) => write!(f, "Thread pool error: {err}"),
            Self::Cancel(err) => write!(f, "Cancel state error: {err}"),
            Self::Object(err) => write!(f, "Object error: {err}"),
            Self::DispatcherAlreadyInstalled => {
                write!(f, "A UI dispatcher has already been installed")
            }
        }
    }
}

impl std::error::Error for ForgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ThreadPool(err) => Some(err),
            Self::Cancel(err) => Some(err),
            Self::Object(err) => Some(err),
            Self::DispatcherAlreadyInstalled => None,
        }
    }
}

/// Thread pool specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadPoolError {
    /// The underlying rayon pool could not be created.
    CreationFailed(String),
}

impl fmt::Display for ThreadPoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreationFailed(msg) => write!(f, "Failed to create thread pool: {msg}"),
        }
    }
}

impl std::error::Error for ThreadPoolError {}

/// Errors raised by the forward-only cancellation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelStateError {
    /// A transition would move the state backwards.
    Regression {
        /// The state the task was in.
        from: CancelState,
        /// The rejected target state.
        to: CancelState,
    },
    /// Cancellation was requested on a task that is not cancelable.
    NotCancelable,
}

impl fmt::Display for CancelStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regression { from, to } => {
                write!(f, "Cancel state cannot move from {from} back to {to}")
            }
            Self::NotCancelable => write!(f, "Task is not cancelable"),
        }
    }
}

impl std::error::Error for CancelStateError {}

/// Errors raised when reading or assigning object fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectError {
    /// The object is not of the type the field declares.
    TypeMismatch {
        /// The declared type name.
        expected: String,
        /// The actual type name.
        got: &'static str,
    },
    /// The meta-object was asked to operate on an instance of another type.
    WrongReceiver {
        /// The type the meta-object describes.
        expected: &'static str,
    },
}

impl fmt::Display for ObjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch { expected, got } => {
                write!(f, "Type mismatch: expected {expected}, got {got}")
            }
            Self::WrongReceiver { expected } => {
                write!(f, "Meta-object for {expected} used on a different type")
            }
        }
    }
}

impl std::error::Error for ObjectError {}

impl From<ThreadPoolError> for ForgeError {
    fn from(err: ThreadPoolError) -> Self {
        Self::ThreadPool(err)
    }
}

impl From<CancelStateError> for ForgeError {
    fn from(err: CancelStateError) -> Self {
        Self::Cancel(err)
    }
}

impl From<ObjectError> for ForgeError {
    fn from(err: ObjectError) -> Self {
        Self::Object(err)
    }
}

/// A specialized Result type for core operations.
pub type Result<T> = std::result::Result<T, ForgeError>;
