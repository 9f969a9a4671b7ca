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

//! Collector-agnostic torrent status model and collaborator traits.
//!
//! Layout: `model/` (field lists, stat values, raw batches, points), `service/`
//! (RPC client and point sink traits), `error.rs` (shared error types).

pub mod error;
pub mod model;
pub mod service;

pub use error::{
    FieldListError, RpcError, RpcResult, SinkError, SinkResult, StatusDecodeError,
};
pub use model::{
    DEFAULT_FIELDS, FieldList, MEASUREMENT, Point, PointBatch, RawStatusBatch, StatMap, StatValue,
    TAG_HASH, TAG_NAME,
};
pub use service::{PointSink, RpcClient};
