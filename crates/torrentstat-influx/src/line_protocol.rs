//! InfluxDB line-protocol encoding.
//!
//! One line per point: `measurement,tag=value field=value timestamp`, with
//! nanosecond timestamps. Tags with empty values and non-finite floats are
//! omitted; a point left without fields is skipped. Line breaks in names, keys,
//! and tag values are written as spaces so a point never spans two lines.

use torrentstat_core::{Point, PointBatch, SinkError, SinkResult, StatValue};
use tracing::debug;

/// Encode every point of `batch`, one line each, separated by newlines.
///
/// # Errors
///
/// Returns an error when a timestamp cannot be expressed in nanoseconds.
pub fn encode_batch(batch: &PointBatch) -> SinkResult<String> {
    let mut body = String::new();
    for point in batch {
        let Some(line) = encode_point(point)? else {
            debug!(
                measurement = %point.measurement,
                "skipping point without encodable fields"
            );
            continue;
        };
        if !body.is_empty() {
            body.push('\n');
        }
        body.push_str(&line);
    }
    Ok(body)
}

/// Encode a single point; `None` when it has no encodable field.
///
/// # Errors
///
/// Returns an error when the timestamp cannot be expressed in nanoseconds.
pub fn encode_point(point: &Point) -> SinkResult<Option<String>> {
    let nanos = point
        .timestamp
        .timestamp_nanos_opt()
        .ok_or_else(|| SinkError::Encode {
            reason: "timestamp_out_of_range",
            value: Some(point.timestamp.to_rfc3339()),
        })?;

    let mut fields = Vec::with_capacity(point.fields.len());
    for (key, value) in &point.fields {
        if let Some(rendered) = field_value(value) {
            fields.push(format!("{}={rendered}", escape_key(key)));
        }
    }
    if fields.is_empty() {
        return Ok(None);
    }

    let mut line = escape_measurement(&point.measurement);
    for (key, value) in &point.tags {
        if key.is_empty() || value.is_empty() {
            continue;
        }
        line.push(',');
        line.push_str(&escape_key(key));
        line.push('=');
        line.push_str(&escape_key(value));
    }
    line.push(' ');
    line.push_str(&fields.join(","));
    line.push(' ');
    line.push_str(&nanos.to_string());
    Ok(Some(line))
}

fn field_value(value: &StatValue) -> Option<String> {
    match value {
        StatValue::Text(text) => Some(format!("\"{}\"", escape_string(text))),
        StatValue::Integer(number) => Some(format!("{number}i")),
        StatValue::Float(number) if number.is_finite() => Some(number.to_string()),
        StatValue::Float(_) => None,
        StatValue::Boolean(flag) => Some(flag.to_string()),
    }
}

fn escape_measurement(value: &str) -> String {
    escape_token(value, &[',', ' '])
}

fn escape_key(value: &str) -> String {
    escape_token(value, &[',', '=', ' '])
}

fn escape_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '"' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Escape an unquoted token. Line breaks become spaces, and a backslash that
/// would otherwise pair with the next delimiter is doubled.
fn escape_token(value: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(value.len());
    let mut chars = value
        .chars()
        .map(|ch| if matches!(ch, '\n' | '\r') { ' ' } else { ch })
        .peekable();
    while let Some(ch) = chars.next() {
        let dangling = ch == '\\' && chars.peek().is_none_or(|next| special.contains(next));
        if dangling || special.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::BTreeMap;
    use torrentstat_core::StatMap;

    fn instant() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 5).single().unwrap_or_default()
    }

    fn point(tags: &[(&str, &str)], fields: StatMap) -> Point {
        Point {
            measurement: "torrent".to_string(),
            timestamp: instant(),
            tags: tags
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<BTreeMap<_, _>>(),
            fields,
        }
    }

    #[test]
    fn encodes_each_value_kind() -> SinkResult<()> {
        let fields = StatMap::from([
            ("name".to_string(), StatValue::from("Ubuntu.iso")),
            ("num_peers".to_string(), StatValue::from(4_i64)),
            ("ratio".to_string(), StatValue::from(1.5)),
            ("is_finished".to_string(), StatValue::from(true)),
        ]);
        let line = encode_point(&point(&[("hash", "abc"), ("name", "Ubuntu.iso")], fields))?;
        assert_eq!(
            line.as_deref(),
            Some(
                "torrent,hash=abc,name=Ubuntu.iso \
                 is_finished=true,name=\"Ubuntu.iso\",num_peers=4i,ratio=1.5 \
                 1700000000000000005"
            )
        );
        Ok(())
    }

    #[test]
    fn escapes_special_characters() -> SinkResult<()> {
        let fields = StatMap::from([(
            "name".to_string(),
            StatValue::from("say \"hi\" \\o/"),
        )]);
        let line = encode_point(&point(&[("name", "a b,c=d")], fields))?;
        assert_eq!(
            line.as_deref(),
            Some("torrent,name=a\\ b\\,c\\=d name=\"say \\\"hi\\\" \\\\o/\" 1700000000000000005")
        );
        Ok(())
    }

    #[test]
    fn tag_values_never_break_the_line() -> SinkResult<()> {
        let ratio = || StatMap::from([("ratio".to_string(), StatValue::from(1.5))]);

        let multiline = encode_point(&point(
            &[("hash", "abc"), ("name", "Show.S01\nE02")],
            ratio(),
        ))?;
        assert_eq!(
            multiline.as_deref(),
            Some("torrent,hash=abc,name=Show.S01\\ E02 ratio=1.5 1700000000000000005")
        );

        let trailing = encode_point(&point(
            &[("hash", "abc"), ("name", "trailing\\")],
            ratio(),
        ))?;
        assert_eq!(
            trailing.as_deref(),
            Some("torrent,hash=abc,name=trailing\\\\ ratio=1.5 1700000000000000005")
        );

        let before_space = encode_point(&point(&[("name", "a\\ b")], ratio()))?;
        assert_eq!(
            before_space.as_deref(),
            Some("torrent,name=a\\\\\\ b ratio=1.5 1700000000000000005")
        );
        Ok(())
    }

    #[test]
    fn field_keys_never_break_the_line() -> SinkResult<()> {
        let fields = StatMap::from([("up\r\nloaded".to_string(), StatValue::from(3_i64))]);
        let line = encode_point(&point(&[("hash", "abc")], fields))?;
        assert_eq!(
            line.as_deref(),
            Some("torrent,hash=abc up\\ \\ loaded=3i 1700000000000000005")
        );
        Ok(())
    }

    #[test]
    fn drops_empty_tags_and_non_finite_floats() -> SinkResult<()> {
        let fields = StatMap::from([
            ("ratio".to_string(), StatValue::from(f64::INFINITY)),
            ("progress".to_string(), StatValue::from(100.0)),
        ]);
        let line = encode_point(&point(&[("hash", "abc"), ("name", "")], fields))?;
        assert_eq!(
            line.as_deref(),
            Some("torrent,hash=abc progress=100 1700000000000000005")
        );

        let only_nan = StatMap::from([("ratio".to_string(), StatValue::from(f64::NAN))]);
        assert_eq!(encode_point(&point(&[("hash", "abc")], only_nan))?, None);
        Ok(())
    }

    #[test]
    fn batch_joins_lines_and_skips_empty_points() -> SinkResult<()> {
        let batch = PointBatch::from(vec![
            point(
                &[("hash", "a")],
                StatMap::from([("ratio".to_string(), StatValue::from(1_i64))]),
            ),
            point(&[("hash", "b")], StatMap::new()),
            point(
                &[("hash", "c")],
                StatMap::from([("ratio".to_string(), StatValue::from(2_i64))]),
            ),
        ]);
        assert_eq!(
            encode_batch(&batch)?,
            "torrent,hash=a ratio=1i 1700000000000000005\ntorrent,hash=c ratio=2i 1700000000000000005"
        );
        assert_eq!(encode_batch(&PointBatch::new())?, "");
        Ok(())
    }

    #[test]
    fn out_of_range_timestamps_are_rejected() {
        let mut far = point(
            &[("hash", "a")],
            StatMap::from([("ratio".to_string(), StatValue::from(1_i64))]),
        );
        far.timestamp = DateTime::<Utc>::MAX_UTC;
        assert!(matches!(
            encode_point(&far),
            Err(SinkError::Encode {
                reason: "timestamp_out_of_range",
                ..
            })
        ));
    }
}
