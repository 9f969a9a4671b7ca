//! Torrent status types flowing through the collector pipeline.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::error::{FieldListError, StatusDecodeError};

/// Measurement name attached to every point produced by the collector.
pub const MEASUREMENT: &str = "torrent";
/// Tag key carrying the torrent identifier.
pub const TAG_HASH: &str = "hash";
/// Tag key (and stat name) carrying the torrent display name.
pub const TAG_NAME: &str = "name";

/// Stat names requested when no override is configured.
///
/// See the libtorrent `torrent_status` reference for the meaning of each entry;
/// `all_time_upload` is not exposed by Deluge, `total_uploaded` stands in for it.
pub const DEFAULT_FIELDS: [&str; 7] = [
    "name",
    "ratio",
    "progress",
    "all_time_download",
    "total_uploaded",
    "num_peers",
    "num_seeds",
];

/// Ordered, de-duplicated list of stat names requested on every poll.
///
/// Cloning is cheap; the names are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldList {
    names: Arc<[String]>,
}

impl FieldList {
    /// Build a field list from the supplied names.
    ///
    /// Duplicates are dropped keeping the first occurrence, and `name` is prepended
    /// when missing because every point is tagged with it.
    ///
    /// # Errors
    ///
    /// Returns an error when no names are supplied or when a name is blank.
    pub fn new<I, S>(names: I) -> Result<Self, FieldListError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ordered: Vec<String> = Vec::new();
        for (index, name) in names.into_iter().enumerate() {
            let name = name.into();
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(FieldListError::BlankName { index });
            }
            if !ordered.iter().any(|existing| existing == trimmed) {
                ordered.push(trimmed.to_string());
            }
        }
        if ordered.is_empty() {
            return Err(FieldListError::Empty);
        }
        if !ordered.iter().any(|name| name == TAG_NAME) {
            ordered.insert(0, TAG_NAME.to_string());
        }
        Ok(Self {
            names: ordered.into(),
        })
    }

    /// Stat names in request order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of stat names requested.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the list is empty; lists built by `new` or `default` never are.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Whether `name` is part of the list.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|candidate| candidate == name)
    }

    /// Render the list as the JSON array expected by `core.get_torrents_status`.
    #[must_use]
    pub fn to_rpc_arg(&self) -> Value {
        Value::Array(self.names.iter().cloned().map(Value::String).collect())
    }
}

impl Default for FieldList {
    fn default() -> Self {
        Self {
            names: DEFAULT_FIELDS.iter().map(ToString::to_string).collect(),
        }
    }
}

/// A single stat value reported by the daemon.
#[derive(Debug, Clone, PartialEq)]
pub enum StatValue {
    /// Textual stat such as the torrent name or state.
    Text(String),
    /// Integral stat such as byte counters or peer counts.
    Integer(i64),
    /// Fractional stat such as ratio or progress.
    Float(f64),
    /// Flag stat such as `is_finished`.
    Boolean(bool),
}

impl StatValue {
    /// Convert a decoded JSON value; `None` for nulls, arrays, and objects.
    ///
    /// Integers beyond the `i64` range degrade to floats.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(Self::Text(text.clone())),
            Value::Number(number) => number
                .as_i64()
                .map(Self::Integer)
                .or_else(|| number.as_f64().map(Self::Float)),
            Value::Bool(flag) => Some(Self::Boolean(*flag)),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Borrow the text payload when the value is textual.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for StatValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for StatValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for StatValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for StatValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for StatValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// Stats reported for one torrent, keyed by stat name.
pub type StatMap = BTreeMap<String, StatValue>;

/// Per-torrent stats returned by one poll, keyed by torrent identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawStatusBatch {
    entries: BTreeMap<String, StatMap>,
}

impl RawStatusBatch {
    /// Create an empty batch.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Decode the JSON result of `core.get_torrents_status`.
    ///
    /// A `null` result decodes to an empty batch. Stat values that are not
    /// scalars are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error when the result or one of its entries is not an object.
    pub fn from_rpc_value(value: &Value) -> Result<Self, StatusDecodeError> {
        let torrents = match value {
            Value::Object(torrents) => torrents,
            Value::Null => return Ok(Self::new()),
            other => {
                return Err(StatusDecodeError::NotAnObject {
                    kind: json_kind(other),
                });
            }
        };

        let mut batch = Self::new();
        for (id, entry) in torrents {
            let Value::Object(raw_stats) = entry else {
                return Err(StatusDecodeError::EntryNotObject { id: id.clone() });
            };
            let mut stats = StatMap::new();
            for (stat_name, raw_value) in raw_stats {
                match StatValue::from_json(raw_value) {
                    Some(stat) => {
                        stats.insert(stat_name.clone(), stat);
                    }
                    None => debug!(
                        torrent = %id,
                        stat = %stat_name,
                        kind = json_kind(raw_value),
                        "dropping non-scalar stat value"
                    ),
                }
            }
            batch.entries.insert(id.clone(), stats);
        }
        Ok(batch)
    }

    /// Stats recorded for `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&StatMap> {
        self.entries.get(id)
    }

    /// Number of torrents in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the batch holds no torrents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate torrents in ascending identifier order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, StatMap> {
        self.entries.iter()
    }
}

impl IntoIterator for RawStatusBatch {
    type Item = (String, StatMap);
    type IntoIter = btree_map::IntoIter<String, StatMap>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a RawStatusBatch {
    type Item = (&'a String, &'a StatMap);
    type IntoIter = btree_map::Iter<'a, String, StatMap>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, StatMap)> for RawStatusBatch {
    fn from_iter<T: IntoIterator<Item = (K, StatMap)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().map(|(id, stats)| (id.into(), stats)).collect(),
        }
    }
}

/// One normalised time-series observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    /// Measurement the point belongs to.
    pub measurement: String,
    /// Capture instant shared by every point of a batch.
    pub timestamp: DateTime<Utc>,
    /// Indexed dimensions.
    pub tags: BTreeMap<String, String>,
    /// Observed values.
    pub fields: StatMap,
}

impl Point {
    /// Look up a tag value.
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Look up a field value.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&StatValue> {
        self.fields.get(key)
    }
}

/// Points produced by one collection cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointBatch {
    points: Vec<Point>,
}

impl PointBatch {
    /// Create an empty batch.
    #[must_use]
    pub const fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Borrow the points in batch order.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of points in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the batch holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate the points in batch order.
    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.points.iter()
    }
}

impl From<Vec<Point>> for PointBatch {
    fn from(points: Vec<Point>) -> Self {
        Self { points }
    }
}

impl FromIterator<Point> for PointBatch {
    fn from_iter<T: IntoIterator<Item = Point>>(iter: T) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PointBatch {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
