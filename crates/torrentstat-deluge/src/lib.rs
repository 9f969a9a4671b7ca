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

//! Deluge adapter for the torrentstat collector.
//!
//! Talks to the daemon through the Web UI JSON-RPC gateway and exposes it as a
//! [`torrentstat_core::RpcClient`].

/// Web UI session and reconnect handling.
pub mod client;
mod envelope;

pub use client::DelugeWebClient;
