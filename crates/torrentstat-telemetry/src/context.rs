//! Span helpers shared by the binary and the collection loop.
//!
//! # Design
//! - An application-level span carries mode and build SHA for every event.
//! - Each collection cycle gets its own span so retries and writes group together.

use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Guard that keeps the application-level span entered for the lifetime of the process.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter the application-level tracing span for the lifetime of the guard.
    #[must_use]
    pub fn new(mode: impl Into<String>) -> Self {
        let mode = mode.into();
        let span: &'static Span = Box::leak(Box::new(
            tracing::info_span!("app", mode = %mode, build_sha = %build_sha()),
        ));
        let guard = span.enter();
        Self { _guard: guard }
    }
}

/// Record a new application mode (e.g. `collecting`, `shutdown`) on the active span.
pub fn record_app_mode(mode: &str) {
    Span::current().record("mode", tracing::field::display(mode));
}

/// Span wrapping a single collection cycle.
#[must_use]
pub fn cycle_span(cycle: u64) -> Span {
    tracing::info_span!("cycle", cycle, points = tracing::field::Empty)
}

/// Record the number of points produced on a cycle span.
pub fn record_cycle_points(span: &Span, points: usize) {
    span.record("points", points);
}
