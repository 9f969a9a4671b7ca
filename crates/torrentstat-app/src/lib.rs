#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Deluge to InfluxDB collector.
//!
//! Layout: `caller.rs` (bounded retry), `fetcher.rs` (status polling),
//! `builder.rs` (point construction), `collector.rs` (the loop),
//! `bootstrap.rs` (process wiring), `error.rs` (`AppError`).

/// Process wiring and shutdown handling.
pub mod bootstrap;
/// Status to point conversion.
pub mod builder;
/// Retry wrapper around the RPC client.
pub mod caller;
/// Collection loop.
pub mod collector;
/// Application error types.
pub mod error;
/// Status polling.
pub mod fetcher;

pub use bootstrap::{run_app, run_app_with};
pub use builder::{build_points, build_points_at};
pub use caller::{ResilientCaller, RetryOutcome, RetryPolicy};
pub use collector::{Collector, CollectorReport, CycleOutcome};
pub use error::{AppError, AppResult};
pub use fetcher::{FetchError, STATUS_METHOD, StatsFetcher};
