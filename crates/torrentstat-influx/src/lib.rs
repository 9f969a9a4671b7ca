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

//! InfluxDB sink for the torrentstat collector.

pub mod line_protocol;
pub mod sink;

pub use line_protocol::{encode_batch, encode_point};
pub use sink::InfluxSink;
