//! Logging and tracing facilities for Horizon Forge.
//!
//! Horizon Forge uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt::init();
//!
//!     // Build your object graphs...
//! }
//! ```
//!
//! Every subsystem logs under one of the [`targets`], so output can be
//! filtered per subsystem, e.g. `RUST_LOG=horizon_forge::handler=debug`.

/// Span names used throughout Horizon Forge for tracing.
pub mod span_names {
    /// A complete build invocation.
    pub const BUILD: &str = "horizon_forge::build";
    /// A handler chain run.
    pub const CHAIN: &str = "horizon_forge::chain";
    /// A background task.
    pub const BACKGROUND: &str = "horizon_forge::background";
    /// A validation pass.
    pub const VALIDATION: &str = "horizon_forge::validation";
}

/// Target names for log filtering.
pub mod targets {
    /// Core plumbing target.
    pub const CORE: &str = "horizon_forge_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_forge_core::signal";
    /// UI dispatch target.
    pub const DISPATCH: &str = "horizon_forge_core::dispatch";
    /// Meta-object and introspection target.
    pub const META: &str = "horizon_forge_core::meta";
    /// Build orchestration target.
    pub const BUILD: &str = "horizon_forge::build";
    /// Property and reference binding target.
    pub const BINDER: &str = "horizon_forge::binder";
    /// Handler resolution and chain execution target.
    pub const HANDLER: &str = "horizon_forge::handler";
    /// Background dispatch target.
    pub const BACKGROUND: &str = "horizon_forge::background";
    /// Resource lookup target.
    pub const RESOURCE: &str = "horizon_forge::resource";
    /// Validation target.
    pub const VALIDATION: &str = "horizon_forge::validation";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// Useful for tracking the duration of a build or a validation pass.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "horizon_forge::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

/// Trace-level event under the core target.
#[macro_export]
macro_rules! forge_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "horizon_forge_core", $($arg)*)
    };
}

/// Debug-level event under the core target.
#[macro_export]
macro_rules! forge_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "horizon_forge_core", $($arg)*)
    };
}

/// Warn-level event under the core target.
#[macro_export]
macro_rules! forge_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "horizon_forge_core", $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_span() {
        let _span = PerfSpan::new("test_operation");
        forge_trace!(step = 1, "inside perf span");
    }

    #[test]
    fn test_targets_are_namespaced() {
        for target in [targets::BUILD, targets::HANDLER, targets::BACKGROUND] {
            assert!(target.starts_with("horizon_forge::"));
        }
        assert!(targets::SIGNAL.starts_with(targets::CORE));
    }
}
