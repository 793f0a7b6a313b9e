//! Decoder for InfluxDB 1.x JSON query responses.
//!
//! The `/query` endpoint answers with an envelope of the form
//!
//! ```text
//! {"results": [{"statement_id": 0,
//!               "series": [{"name": "cpu", "tags": {...},
//!                           "columns": ["time", ...],
//!                           "values": [[...], ...]}]}]}
//! ```
//!
//! Each series is decoded into rows of a caller-chosen [`InfluxRow`] type by
//! resolving every column against the row's [`Schema`](crate::row::Schema)
//! once, then filling one row per `values` entry.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value as Json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::error::{Error, Result};
use crate::row::{ColumnTarget, InfluxRow};
use crate::types::{Precision, QueryResult, ResultSet, Series};
use crate::value::{FieldKind, Value};

/// Raw response envelope.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    results: Vec<RawResult>,
    error: Option<String>,
}

/// Raw result of one statement.
#[derive(Debug, Deserialize)]
struct RawResult {
    #[serde(default)]
    statement_id: usize,
    #[serde(default)]
    series: Vec<RawSeries>,
    error: Option<String>,
    #[serde(default)]
    partial: bool,
}

/// Raw series.
#[derive(Debug, Deserialize)]
struct RawSeries {
    #[serde(default)]
    name: String,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<Json>>,
    #[serde(default)]
    partial: bool,
}

/// Decode a complete (non-chunked) query response.
///
/// `precision` is the `epoch` the query was sent with; `None` means the
/// server formatted times as RFC 3339 strings.
///
/// # Errors
///
/// - [`Error::Influx`] if the envelope itself carries an error. Errors of
///   individual statements are kept in [`QueryResult::error`] instead.
/// - [`Error::TypeMismatch`] if a column cannot be stored in `R`.
/// - [`Error::Serialization`] if the body is not a result envelope.
pub fn parse_result_set<R: InfluxRow>(
    body: &[u8],
    precision: Option<Precision>,
) -> Result<ResultSet<R>> {
    parse_result_set_with_kinds(body, precision, &BTreeMap::new())
}

/// Decode a complete query response, using `field_kinds` to type the
/// columns that land in a dynamic field map.
///
/// JSON does not tell `3` the float from `3` the integer, so without a
/// hint such a column is decoded by its literal shape. Declared field
/// members always use their own type.
pub fn parse_result_set_with_kinds<R: InfluxRow>(
    body: &[u8],
    precision: Option<Precision>,
    field_kinds: &BTreeMap<String, FieldKind>,
) -> Result<ResultSet<R>> {
    let envelope: RawEnvelope = serde_json::from_slice(body)?;
    decode_envelope(envelope, precision, field_kinds)
}

/// Extract the `error` message of an error response body, if it has one.
pub(crate) fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<RawEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
}

/// Async parser for chunked query responses.
///
/// With `chunked=true` InfluxDB writes one JSON envelope per line, each
/// holding part of a statement's rows. This parser reads those lines from
/// an async reader and yields decoded [`QueryResult`]s one at a time,
/// without buffering the whole response.
///
/// Use [`ResultSet::push_chunk`] to reassemble the pieces.
pub struct ChunkedResponseParser<B, R> {
    lines: Lines<B>,
    precision: Option<Precision>,
    field_kinds: BTreeMap<String, FieldKind>,
    pending: VecDeque<QueryResult<R>>,
}

impl<B, R> ChunkedResponseParser<B, R>
where
    B: AsyncBufRead + Unpin,
    R: InfluxRow,
{
    /// Create a new parser from an async buffered reader.
    pub fn new(reader: B, precision: Option<Precision>) -> Self {
        Self {
            lines: reader.lines(),
            precision,
            field_kinds: BTreeMap::new(),
            pending: VecDeque::new(),
        }
    }

    /// Type hints for dynamic field columns; see [`parse_result_set_with_kinds`].
    pub fn with_field_kinds(mut self, field_kinds: BTreeMap<String, FieldKind>) -> Self {
        self.field_kinds = field_kinds;
        self
    }

    /// Parse and return the next result chunk.
    ///
    /// Returns:
    /// - `Ok(Some(result))` - Successfully decoded a chunk
    /// - `Ok(None)` - End of stream (EOF)
    /// - `Err(e)` - Read, parse or decode error
    pub async fn next(&mut self) -> Result<Option<QueryResult<R>>> {
        loop {
            if let Some(result) = self.pending.pop_front() {
                return Ok(Some(result));
            }

            let line = match self.lines.next_line().await? {
                Some(line) => line,
                None => return Ok(None),
            };
            if line.trim().is_empty() {
                continue;
            }

            let envelope: RawEnvelope = serde_json::from_str(&line)?;
            let set = decode_envelope::<R>(envelope, self.precision, &self.field_kinds)?;
            self.pending.extend(set.results);
        }
    }
}

fn decode_envelope<R: InfluxRow>(
    envelope: RawEnvelope,
    precision: Option<Precision>,
    field_kinds: &BTreeMap<String, FieldKind>,
) -> Result<ResultSet<R>> {
    if let Some(message) = envelope.error {
        return Err(Error::Influx {
            status: None,
            message,
        });
    }

    let results = envelope
        .results
        .into_iter()
        .map(|raw| decode_result(raw, precision, field_kinds))
        .collect::<Result<Vec<_>>>()?;

    Ok(ResultSet { results })
}

fn decode_result<R: InfluxRow>(
    raw: RawResult,
    precision: Option<Precision>,
    field_kinds: &BTreeMap<String, FieldKind>,
) -> Result<QueryResult<R>> {
    let series = raw
        .series
        .into_iter()
        .map(|s| decode_series(s, precision, field_kinds))
        .collect::<Result<Vec<_>>>()?;

    Ok(QueryResult {
        statement_id: raw.statement_id,
        series,
        error: raw.error,
        partial: raw.partial,
    })
}

fn decode_series<R: InfluxRow>(
    raw: RawSeries,
    precision: Option<Precision>,
    field_kinds: &BTreeMap<String, FieldKind>,
) -> Result<Series<R>> {
    let schema = R::schema();

    if !raw.values.is_empty() {
        if let Some(missing) = schema
            .required_field_names()
            .find(|name| !raw.columns.iter().any(|c| c == name))
        {
            return Err(Error::type_mismatch(
                missing,
                "column is missing from the response but the field is not nullable",
            ));
        }
    }

    let targets: Vec<ColumnTarget<'_, R>> =
        raw.columns.iter().map(|c| schema.resolve(c)).collect();

    let mut rows = Vec::with_capacity(raw.values.len());
    for values in raw.values {
        if values.len() != raw.columns.len() {
            return Err(Error::ColumnMismatch {
                expected: raw.columns.len(),
                actual: values.len(),
            });
        }

        let mut row = R::default();
        for (key, value) in &raw.tags {
            schema.apply_series_tag(&mut row, key, value);
        }

        for ((column, target), value) in raw.columns.iter().zip(&targets).zip(values) {
            match target {
                ColumnTarget::Timestamp(binding) => {
                    if let Some(time) = parse_time(&value, precision, column)? {
                        binding.assign(&mut row, time);
                    }
                }
                ColumnTarget::Tag(binding) => match value {
                    Json::Null => binding.assign(&mut row, None),
                    Json::String(s) => binding.assign(&mut row, Some(s)),
                    other => {
                        return Err(Error::type_mismatch(
                            column,
                            format!("expected a string tag value, found {}", json_type(&other)),
                        ));
                    }
                },
                ColumnTarget::Field(binding) => {
                    let v = coerce(&value, binding.kind(), column)?;
                    if v.is_null() && binding.is_required() {
                        return Err(Error::type_mismatch(
                            column,
                            "null value for a field that is not nullable",
                        ));
                    }
                    if !binding.assign(&mut row, v) {
                        return Err(Error::type_mismatch(
                            column,
                            format!("value {} does not fit the field member", value),
                        ));
                    }
                }
                ColumnTarget::DynamicField(map) => {
                    let v = match field_kinds.get(column) {
                        Some(kind) => coerce(&value, *kind, column)?,
                        None => infer(&value, column)?,
                    };
                    if !v.is_null() {
                        map.insert(&mut row, column, v);
                    }
                }
                ColumnTarget::Ignored => {}
            }
        }

        rows.push(row);
    }

    Ok(Series {
        name: raw.name,
        tags: raw.tags,
        rows,
        partial: raw.partial,
    })
}

/// Parse the `time` column: RFC 3339 text, or an integer in `precision`.
fn parse_time(
    value: &Json,
    precision: Option<Precision>,
    column: &str,
) -> Result<Option<DateTime<Utc>>> {
    match value {
        Json::Null => Ok(None),
        Json::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| {
                Error::type_mismatch(column, format!("invalid RFC3339 timestamp '{}': {}", s, e))
            }),
        Json::Number(n) => {
            let precision = precision.unwrap_or_default();
            n.as_i64()
                .and_then(|count| precision.to_datetime(count))
                .map(Some)
                .ok_or_else(|| {
                    Error::type_mismatch(
                        column,
                        format!("invalid epoch timestamp {} in precision '{}'", n, precision),
                    )
                })
        }
        other => Err(Error::type_mismatch(
            column,
            format!("expected a timestamp, found {}", json_type(other)),
        )),
    }
}

/// Convert a JSON value to a field value of the declared kind.
fn coerce(value: &Json, kind: FieldKind, column: &str) -> Result<Value> {
    let converted = match (value, kind) {
        (Json::Null, _) => Some(Value::Null),
        (Json::Number(n), FieldKind::Integer) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(integral))
            .map(Value::Integer),
        (Json::Number(n), FieldKind::Float) => n.as_f64().map(Value::from),
        (Json::String(s), FieldKind::String) => Some(Value::String(s.clone())),
        (Json::Bool(b), FieldKind::Boolean) => Some(Value::Boolean(*b)),
        _ => None,
    };

    converted.ok_or_else(|| {
        Error::type_mismatch(
            column,
            format!("expected {}, found {} {}", kind, json_type(value), value),
        )
    })
}

/// Convert a JSON value without a declared kind, going by its literal shape.
fn infer(value: &Json, column: &str) -> Result<Value> {
    match value {
        Json::Null => Ok(Value::Null),
        Json::Bool(b) => Ok(Value::Boolean(*b)),
        Json::String(s) => Ok(Value::String(s.clone())),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Ok(Value::Integer(i)),
            None => n.as_f64().map(Value::from).ok_or_else(|| {
                Error::type_mismatch(column, format!("unsupported number {}", n))
            }),
        },
        other => Err(Error::type_mismatch(
            column,
            format!("unsupported value type {}", json_type(other)),
        )),
    }
}

/// A float that holds an exact i64.
fn integral(f: f64) -> Option<i64> {
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn json_type(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::DynamicRow;
    use crate::row::fixtures::{ComputerInfo, Reading};

    fn body(value: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn test_typed_rows_with_rfc3339_time() {
        let response = body(serde_json::json!({
            "results": [{
                "statement_id": 0,
                "series": [{
                    "name": "computerInfo",
                    "columns": ["time", "cpu", "host", "ram", "region"],
                    "values": [
                        ["2013-01-01T01:01:01Z", 0.25, "ma-lt", 1024, "west-eu"],
                        ["2013-01-01T01:01:02.5Z", null, "surface-book", 2048, null]
                    ]
                }]
            }]
        }));

        let set = parse_result_set::<ComputerInfo>(&response, None).unwrap();
        assert!(set.succeeded());
        assert_eq!(set.results.len(), 1);

        let series = &set.results[0].series[0];
        assert_eq!(series.name, "computerInfo");
        assert_eq!(series.rows.len(), 2);

        let first = &series.rows[0];
        assert_eq!(
            first.timestamp,
            Some(DateTime::parse_from_rfc3339("2013-01-01T01:01:01Z").unwrap().with_timezone(&Utc))
        );
        assert_eq!(first.cpu, Some(0.25));
        assert_eq!(first.ram, Some(1024));
        assert_eq!(first.host.as_deref(), Some("ma-lt"));
        assert_eq!(first.region.as_deref(), Some("west-eu"));

        let second = &series.rows[1];
        assert_eq!(second.cpu, None);
        assert_eq!(second.region, None);
        assert_eq!(
            second.timestamp.unwrap().timestamp_millis(),
            first.timestamp.unwrap().timestamp_millis() + 1500
        );
    }

    #[test]
    fn test_epoch_time_uses_query_precision() {
        let response = body(serde_json::json!({
            "results": [{"series": [{
                "name": "computerInfo",
                "columns": ["time", "ram"],
                "values": [[1_262_307_661_000_i64, 1]]
            }]}]
        }));

        let set =
            parse_result_set::<ComputerInfo>(&response, Some(Precision::Millisecond)).unwrap();
        let row = &set.results[0].series[0].rows[0];
        assert_eq!(row.timestamp, DateTime::from_timestamp(1_262_307_661, 0));

        // Without an epoch the server sends nanoseconds.
        let set = parse_result_set::<ComputerInfo>(&response, None).unwrap();
        let row = &set.results[0].series[0].rows[0];
        assert_eq!(row.timestamp.unwrap().timestamp_nanos_opt(), Some(1_262_307_661_000));
    }

    #[test]
    fn test_integral_number_into_float_field() {
        // InfluxDB serializes the float 2.0 as `2`.
        let response = body(serde_json::json!({
            "results": [{"series": [{
                "name": "computerInfo",
                "columns": ["time", "cpu"],
                "values": [["2013-01-01T00:00:00Z", 2]]
            }]}]
        }));
        let set = parse_result_set::<ComputerInfo>(&response, None).unwrap();
        assert_eq!(set.results[0].series[0].rows[0].cpu, Some(2.0));
    }

    #[test]
    fn test_fractional_number_into_integer_field_fails() {
        let response = body(serde_json::json!({
            "results": [{"series": [{
                "name": "computerInfo",
                "columns": ["time", "ram"],
                "values": [["2013-01-01T00:00:00Z", 1.5]]
            }]}]
        }));
        let err = parse_result_set::<ComputerInfo>(&response, None).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { ref column, .. } if column == "ram"));
    }

    #[test]
    fn test_string_into_float_field_fails() {
        let response = body(serde_json::json!({
            "results": [{"series": [{
                "name": "computerInfo",
                "columns": ["time", "cpu"],
                "values": [["2013-01-01T00:00:00Z", "high"]]
            }]}]
        }));
        assert!(matches!(
            parse_result_set::<ComputerInfo>(&response, None),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_required_field_null_fails() {
        let response = body(serde_json::json!({
            "results": [{"series": [{
                "name": "readings",
                "columns": ["time", "sensor", "value"],
                "values": [["2013-01-01T00:00:00Z", "s1", null]]
            }]}]
        }));
        let err = parse_result_set::<Reading>(&response, None).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { ref column, .. } if column == "value"));
    }

    #[test]
    fn test_required_field_missing_column_fails() {
        let response = body(serde_json::json!({
            "results": [{"series": [{
                "name": "readings",
                "columns": ["time", "sensor", "note"],
                "values": [["2013-01-01T00:00:00Z", "s1", "hi"]]
            }]}]
        }));
        assert!(matches!(
            parse_result_set::<Reading>(&response, None),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_optional_members_decode_as_none() {
        let response = body(serde_json::json!({
            "results": [{"series": [{
                "name": "readings",
                "columns": ["time", "note", "ok", "sensor", "value"],
                "values": [["2013-01-01T00:00:00Z", null, true, "s1", 3]]
            }]}]
        }));
        let set = parse_result_set::<Reading>(&response, None).unwrap();
        let row = &set.results[0].series[0].rows[0];
        assert_eq!(row.sensor, "s1");
        assert_eq!(row.value, 3.0);
        assert_eq!(row.note, None);
        assert_eq!(row.ok, Some(true));
    }

    #[test]
    fn test_group_by_tags_are_applied() {
        let response = body(serde_json::json!({
            "results": [{"series": [
                {
                    "name": "computerInfo",
                    "tags": {"host": "ma-lt"},
                    "columns": ["time", "ram"],
                    "values": [["2013-01-01T00:00:00Z", 1]]
                },
                {
                    "name": "computerInfo",
                    "tags": {"host": "surface-book"},
                    "columns": ["time", "ram"],
                    "values": [["2013-01-01T00:00:00Z", 2]]
                }
            ]}]
        }));
        let set = parse_result_set::<ComputerInfo>(&response, None).unwrap();
        let series = &set.results[0].series;
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].tags.get("host").map(String::as_str), Some("surface-book"));
        assert_eq!(series[1].rows[0].host.as_deref(), Some("surface-book"));
        assert_eq!(series[1].rows[0].ram, Some(2));
    }

    #[test]
    fn test_empty_group_by_tag_is_unset() {
        let response = body(serde_json::json!({
            "results": [{"series": [{
                "name": "computerInfo",
                "tags": {"host": "ma-lt", "region": ""},
                "columns": ["time", "ram"],
                "values": [["2013-01-01T00:00:00Z", 1]]
            }]}]
        }));

        let typed = parse_result_set::<ComputerInfo>(&response, None).unwrap();
        let row = typed.rows().next().unwrap();
        assert_eq!(row.host.as_deref(), Some("ma-lt"));
        assert_eq!(row.region, None);

        let dynamic = parse_result_set::<DynamicRow>(&response, None).unwrap();
        let row = dynamic.rows().next().unwrap();
        assert_eq!(row.get_tag("host"), Some("ma-lt"));
        assert_eq!(row.get_tag("region"), None);
    }

    #[test]
    fn test_dynamic_field_kinds() {
        // InfluxDB writes the float 3.0 as 3.
        let response = body(serde_json::json!({
            "results": [{"series": [{
                "name": "sensors",
                "columns": ["time", "reading", "count", "label"],
                "values": [["2013-01-01T00:00:00Z", 3, 7, "ok"]]
            }]}]
        }));

        let inferred = parse_result_set::<DynamicRow>(&response, None).unwrap();
        let row = inferred.rows().next().unwrap();
        assert_eq!(row.get_field("reading"), Some(&Value::Integer(3)));

        let kinds = BTreeMap::from([
            ("reading".to_string(), FieldKind::Float),
            ("count".to_string(), FieldKind::Integer),
        ]);
        let set = parse_result_set_with_kinds::<DynamicRow>(&response, None, &kinds).unwrap();
        let read = set.rows().next().unwrap();

        let written = DynamicRow::new()
            .with_timestamp(read.timestamp.unwrap())
            .field("reading", 3.0)
            .field("count", 7_i64)
            .field("label", "ok");
        assert_eq!(read, &written);
        assert_eq!(
            crate::line_protocol::encode_row("sensors", read, Precision::Second).unwrap(),
            "sensors count=7i,label=\"ok\",reading=3 1356998400"
        );

        let kinds = BTreeMap::from([("label".to_string(), FieldKind::Float)]);
        let err = parse_result_set_with_kinds::<DynamicRow>(&response, None, &kinds).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[tokio::test]
    async fn test_chunked_parser_field_kinds() {
        let chunk = r#"{"results":[{"series":[{"name":"m","columns":["time","v"],"values":[[0,2]]}]}]}"#;
        let kinds = BTreeMap::from([("v".to_string(), FieldKind::Float)]);
        let mut parser = ChunkedResponseParser::<_, DynamicRow>::new(chunk.as_bytes(), None)
            .with_field_kinds(kinds);

        let result = parser.next().await.unwrap().unwrap();
        let row = result.rows().next().unwrap();
        assert_eq!(row.get_field("v"), Some(&Value::from(2.0)));
        assert!(parser.next().await.unwrap().is_none());
    }

    #[test]
    fn test_dynamic_rows() {
        let response = body(serde_json::json!({
            "results": [{"series": [{
                "name": "computerInfo",
                "tags": {"region": "asia"},
                "columns": ["time", "cpu", "host", "ram", "up", "gone"],
                "values": [["2012-01-01T01:01:01Z", 0.5, "ma-lt", 2048, true, null]]
            }]}]
        }));
        let set = parse_result_set::<DynamicRow>(&response, None).unwrap();
        let row = &set.results[0].series[0].rows[0];

        assert!(row.timestamp.is_some());
        assert_eq!(row.get_tag("region"), Some("asia"));
        assert_eq!(row.get_field("cpu"), Some(&Value::from(0.5)));
        assert_eq!(row.get_field("host"), Some(&Value::from("ma-lt")));
        assert_eq!(row.get_field("ram"), Some(&Value::Integer(2048)));
        assert_eq!(row.get_field("up"), Some(&Value::Boolean(true)));
        assert_eq!(row.get_field("gone"), None);
        assert!(row.get_field("time").is_none());
    }

    #[test]
    fn test_partial_failure_is_per_result() {
        let response = body(serde_json::json!({
            "results": [
                {"statement_id": 0, "series": [{
                    "name": "computerInfo",
                    "columns": ["time", "ram"],
                    "values": [["2013-01-01T00:00:00Z", 1]]
                }]},
                {"statement_id": 1, "error": "measurement not found"}
            ]
        }));
        let set = parse_result_set::<ComputerInfo>(&response, None).unwrap();
        assert_eq!(set.results.len(), 2);
        assert!(set.results[0].succeeded());
        assert_eq!(set.results[0].rows().count(), 1);
        assert!(!set.results[1].succeeded());
        assert_eq!(set.results[1].error.as_deref(), Some("measurement not found"));
    }

    #[test]
    fn test_envelope_error() {
        let response = br#"{"error":"error parsing query: found EOF"}"#;
        let err = parse_result_set::<DynamicRow>(response, None).unwrap_err();
        assert_eq!(err.influx_message(), Some("error parsing query: found EOF"));
    }

    #[test]
    fn test_empty_result() {
        let response = br#"{"results":[{"statement_id":0}]}"#;
        let set = parse_result_set::<ComputerInfo>(response, None).unwrap();
        assert!(set.succeeded());
        assert!(set.results[0].series.is_empty());
    }

    #[test]
    fn test_column_mismatch() {
        let response = body(serde_json::json!({
            "results": [{"series": [{
                "name": "m",
                "columns": ["time", "ram"],
                "values": [["2013-01-01T00:00:00Z"]]
            }]}]
        }));
        assert!(matches!(
            parse_result_set::<ComputerInfo>(&response, None),
            Err(Error::ColumnMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            parse_result_set::<DynamicRow>(b"not json", None),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(r#"{"error":"database not found: \"nope\""}"#).as_deref(),
            Some(r#"database not found: "nope""#)
        );
        assert_eq!(error_message("Bad Gateway"), None);
    }

    #[tokio::test]
    async fn test_chunked_parser() {
        let chunks = concat!(
            r#"{"results":[{"statement_id":0,"series":[{"name":"computerInfo","columns":["time","ram"],"values":[["2013-01-01T00:00:00Z",1],["2013-01-01T00:00:01Z",2]],"partial":true}],"partial":true}]}"#,
            "\n",
            r#"{"results":[{"statement_id":0,"series":[{"name":"computerInfo","columns":["time","ram"],"values":[["2013-01-01T00:00:02Z",3]]}]}]}"#,
            "\n",
            "\n",
        );

        let mut parser = ChunkedResponseParser::<_, ComputerInfo>::new(chunks.as_bytes(), None);
        let mut set = ResultSet::new();
        let mut count = 0;
        while let Some(result) = parser.next().await.unwrap() {
            count += 1;
            set.push_chunk(result);
        }

        assert_eq!(count, 2);
        assert_eq!(set.results.len(), 1);
        assert_eq!(set.results[0].series.len(), 1);
        let rams: Vec<_> = set.rows().map(|r| r.ram.unwrap()).collect();
        assert_eq!(rams, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_chunked_parser_error_chunk() {
        let chunks = "{\"error\":\"query interrupted\"}\n";
        let mut parser = ChunkedResponseParser::<_, DynamicRow>::new(chunks.as_bytes(), None);
        let err = parser.next().await.unwrap_err();
        assert_eq!(err.influx_message(), Some("query interrupted"));
    }
}
