//! Flattening of per-torrent status into time-series points.
//!
//! # Design
//! - One point per torrent, all sharing the capture instant of the batch.
//! - `hash` and `name` are tags; every stat, `name` included, is a field.
//! - A torrent without a textual name is tagged with its identifier instead.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use torrentstat_core::{
    MEASUREMENT, Point, PointBatch, RawStatusBatch, StatMap, StatValue, TAG_HASH, TAG_NAME,
};
use tracing::warn;

/// Build points stamped with the current instant.
#[must_use]
pub fn build_points(batch: RawStatusBatch) -> PointBatch {
    build_points_at(batch, Utc::now())
}

/// Build points stamped with `timestamp`.
#[must_use]
pub fn build_points_at(batch: RawStatusBatch, timestamp: DateTime<Utc>) -> PointBatch {
    batch
        .into_iter()
        .map(|(id, stats)| build_point(id, stats, timestamp))
        .collect()
}

fn build_point(id: String, stats: StatMap, timestamp: DateTime<Utc>) -> Point {
    let name = match stats.get(TAG_NAME).and_then(StatValue::as_text) {
        Some(name) => name.to_string(),
        None => {
            warn!(torrent = %id, "torrent has no textual name; tagging with its hash");
            id.clone()
        }
    };

    let tags = BTreeMap::from([
        (TAG_HASH.to_string(), id),
        (TAG_NAME.to_string(), name),
    ]);
    Point {
        measurement: MEASUREMENT.to_string(),
        timestamp,
        tags,
        fields: stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(entries: &[(&str, StatValue)]) -> StatMap {
        entries
            .iter()
            .map(|(key, value)| ((*key).to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn single_torrent_becomes_one_tagged_point() {
        let fields = stats(&[
            ("name", StatValue::from("Ubuntu.iso")),
            ("ratio", StatValue::from(1.5)),
            ("progress", StatValue::from(100.0)),
        ]);
        let raw: RawStatusBatch = [("abc123", fields.clone())].into_iter().collect();
        let now = Utc::now();

        let batch = build_points_at(raw, now);

        assert_eq!(batch.len(), 1);
        let point = &batch.points()[0];
        assert_eq!(point.measurement, "torrent");
        assert_eq!(point.timestamp, now);
        assert_eq!(point.tag("hash"), Some("abc123"));
        assert_eq!(point.tag("name"), Some("Ubuntu.iso"));
        assert_eq!(point.tags.len(), 2);
        assert_eq!(point.fields, fields);
    }

    #[test]
    fn every_point_shares_the_batch_timestamp() {
        let raw: RawStatusBatch = (0..5)
            .map(|index| {
                (
                    format!("hash{index}"),
                    stats(&[("name", StatValue::from(format!("t{index}")))]),
                )
            })
            .collect();

        let batch = build_points(raw);

        assert_eq!(batch.len(), 5);
        let first = batch.points()[0].timestamp;
        assert!(batch.iter().all(|point| point.timestamp == first));
        assert!(
            batch
                .iter()
                .all(|point| point.tag("hash").is_some() && point.tag("name").is_some())
        );
    }

    #[test]
    fn empty_status_builds_an_empty_batch() {
        assert!(build_points(RawStatusBatch::new()).is_empty());
    }

    #[test]
    fn missing_name_falls_back_to_the_identifier() {
        let raw: RawStatusBatch = [
            ("nameless", stats(&[("ratio", StatValue::from(0.5))])),
            ("numeric", stats(&[("name", StatValue::from(7_i64))])),
        ]
        .into_iter()
        .collect();

        let batch = build_points(raw);

        let tags: Vec<_> = batch
            .iter()
            .map(|point| (point.tag("hash"), point.tag("name")))
            .collect();
        assert_eq!(
            tags,
            vec![
                (Some("nameless"), Some("nameless")),
                (Some("numeric"), Some("numeric")),
            ]
        );
        assert!(batch.points()[0].field("name").is_none());
        assert_eq!(
            batch.points()[1].field("name"),
            Some(&StatValue::from(7_i64))
        );
    }
}
