//! Logging facilities for Launchpad.
//!
//! Launchpad uses the `tracing` crate for instrumentation and never installs
//! a subscriber itself. To see logs, install one in the application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("launchpad::detach=debug,launchpad=info")
//!     .init();
//! ```

/// Target names for log filtering.
pub mod targets {
    /// Host window lifecycle.
    pub const HOST: &str = "launchpad::host";
    /// Surface creation, layout and relocation.
    pub const VIEW: &str = "launchpad::view";
    /// Detach/reattach state machine.
    pub const DETACH: &str = "launchpad::detach";
    /// Surface registry bookkeeping.
    pub const REGISTRY: &str = "launchpad::registry";
    /// UI command boundary.
    pub const CONTROL: &str = "launchpad::control";
    /// Native event routing.
    pub const ROUTER: &str = "launchpad::router";
    /// Signal emission.
    pub const SIGNAL: &str = "launchpad::signal";
    /// Failed consistency checks.
    pub const INVARIANT: &str = "launchpad::invariant";
}

/// Span names used for operations that span several awaited native calls.
pub mod span_names {
    pub const DETACH: &str = "detach";
    pub const REATTACH: &str = "reattach";
    pub const RELOCATE: &str = "relocate";
    pub const DESTROY_HOST: &str = "destroy_host";
}

/// The span that correlates every log line of one operation.
///
/// Async operations attach it with `tracing::Instrument` so that it is only
/// entered while the operation is actually being polled.
pub fn operation_span(operation: &'static str, subject: &str) -> tracing::Span {
    tracing::info_span!(target: "launchpad::operation", "operation", operation, subject)
}

/// Guard that keeps an [`operation_span`] entered for a synchronous operation.
pub struct OperationSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl OperationSpan {
    /// Enter a span for `operation` on `subject`.
    pub fn new(operation: &'static str, subject: &str) -> Self {
        Self {
            span: operation_span(operation, subject).entered(),
        }
    }
}
