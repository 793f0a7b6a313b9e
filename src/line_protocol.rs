//! Line protocol encoder.
//!
//! Turns rows into the text format accepted by the `/write` endpoint:
//!
//! ```text
//! measurement,tag1=val1,tag2=val2 field1=1i,field2="two" 1262307661000000000
//! ```
//!
//! Tags are sorted by key, null tags and fields are left out, and special
//! characters are backslash-escaped according to where they appear.

use std::borrow::Cow;
use std::fmt;

use crate::error::{Error, Result};
use crate::row::{InfluxRow, Schema};
use crate::types::Precision;
use crate::value::Value;

// https://docs.influxdata.com/influxdb/v1/write_protocols/line_protocol_reference/#special-characters
const COMMA_SPACE: &[char] = &[',', ' '];
const COMMA_EQ_SPACE: &[char] = &[',', '=', ' '];
const QUOTE_BACKSLASH: &[char] = &['"', '\\'];

/// Encode `rows` as newline-separated line protocol, one line per row.
///
/// Timestamps are written as whole units of `precision`, which must match
/// the precision the body is sent with.
///
/// # Errors
///
/// [`Error::Encoding`] if the measurement or any key is empty, a row has no
/// non-null field, a float is not finite, or a timestamp cannot be
/// represented in `precision`. Nothing is returned for the valid rows.
pub fn encode_rows<R: InfluxRow>(
    measurement: &str,
    rows: &[R],
    precision: Precision,
) -> Result<String> {
    validate_name("measurement name", measurement)?;

    let schema = R::schema();
    let mut out = String::with_capacity(rows.len() * 64);

    for (index, row) in rows.iter().enumerate() {
        let line = Line::new(measurement, schema, row, precision).map_err(|e| match e {
            Error::Encoding { message } => Error::encoding(format!("row {}: {}", index, message)),
            other => other,
        })?;

        if index > 0 {
            out.push('\n');
        }
        out.push_str(&line.to_string());
    }

    Ok(out)
}

/// Encode a single row as one line of line protocol (without trailing newline).
pub fn encode_row<R: InfluxRow>(
    measurement: &str,
    row: &R,
    precision: Precision,
) -> Result<String> {
    encode_rows(measurement, std::slice::from_ref(row), precision)
}

/// A validated row, ready to be formatted.
struct Line<'a> {
    measurement: &'a str,
    tags: Vec<(&'a str, &'a str)>,
    fields: Vec<(&'a str, Cow<'a, Value>)>,
    timestamp: Option<i64>,
}

impl<'a> Line<'a> {
    fn new<R>(
        measurement: &'a str,
        schema: &'a Schema<R>,
        row: &'a R,
        precision: Precision,
    ) -> Result<Self> {
        let mut tags = schema.tags_of(row);
        for (key, value) in &tags {
            validate_name("tag key", key)?;
            if value.contains('\n') {
                return Err(Error::encoding(format!(
                    "tag '{}' contains a newline",
                    key
                )));
            }
            if value.ends_with('\\') {
                return Err(Error::encoding(format!(
                    "tag '{}' ends with a backslash",
                    key
                )));
            }
        }
        // An empty tag value means the tag is absent.
        tags.retain(|(_, value)| !value.is_empty());
        // Keeping the tags sorted improves performance on the server side
        tags.sort_by(|a, b| a.0.cmp(b.0));

        let fields = schema.fields_of(row);
        if fields.is_empty() {
            return Err(Error::encoding("no non-null fields"));
        }
        for (key, value) in &fields {
            validate_name("field key", key)?;
            match &**value {
                Value::Float(f) if !f.is_finite() => {
                    return Err(Error::encoding(format!(
                        "field '{}' is not a finite number: {}",
                        key, f
                    )));
                }
                Value::String(s) if s.contains('\n') => {
                    return Err(Error::encoding(format!(
                        "field '{}' contains a newline",
                        key
                    )));
                }
                _ => {}
            }
        }

        let timestamp = match schema.timestamp_of(row) {
            Some(time) => Some(precision.to_timestamp(&time).ok_or_else(|| {
                Error::encoding(format!(
                    "timestamp {} cannot be represented in precision '{}'",
                    time.to_rfc3339(),
                    precision
                ))
            })?),
            None => None,
        };

        Ok(Self {
            measurement,
            tags,
            fields,
            timestamp,
        })
    }
}

impl fmt::Display for Line<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Escaped(self.measurement, COMMA_SPACE))?;

        for (k, v) in &self.tags {
            write!(
                f,
                ",{}={}",
                Escaped(k, COMMA_EQ_SPACE),
                Escaped(v, COMMA_EQ_SPACE)
            )?;
        }

        for (i, (k, v)) in self.fields.iter().enumerate() {
            let d = if i == 0 { " " } else { "," };
            write!(f, "{}{}={}", d, Escaped(k, COMMA_EQ_SPACE), FieldValue(v))?;
        }

        if let Some(ts) = self.timestamp {
            write!(f, " {}", ts)?;
        }

        Ok(())
    }
}

fn validate_name(what: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::encoding(format!("{} is empty", what)));
    }
    if name.contains('\n') {
        return Err(Error::encoding(format!(
            "{} '{}' contains a newline",
            what,
            name.escape_default()
        )));
    }
    // A trailing backslash would escape the delimiter that follows.
    if name.ends_with('\\') {
        return Err(Error::encoding(format!(
            "{} '{}' ends with a backslash",
            what,
            name.escape_default()
        )));
    }
    Ok(())
}

/// Writes a string with every delimiter prefixed by a backslash.
struct Escaped<'a>(&'a str, &'static [char]);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut last = 0;

        for (idx, delim) in self.0.match_indices(self.1) {
            let s = &self.0[last..idx];
            write!(f, r#"{}\{}"#, s, delim)?;
            last = idx + delim.len();
        }

        f.write_str(&self.0[last..])
    }
}

struct FieldValue<'a>(&'a Value);

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::Integer(v) => write!(f, "{}i", v),
            Value::Float(v) => write!(f, "{}", v.into_inner()),
            Value::String(v) => write!(f, r#""{}""#, Escaped(v, QUOTE_BACKSLASH)),
            Value::Boolean(v) => write!(f, "{}", v),
            // Null fields are filtered out before formatting.
            Value::Null => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;
    use crate::row::DynamicRow;
    use crate::row::fixtures::ComputerInfo;

    const ALL_THE_DELIMITERS: &str = r#"alpha,beta=delta gamma"epsilon\zeta"#;

    fn info(secs: i64, cpu: Option<f64>, ram: Option<i64>) -> ComputerInfo {
        ComputerInfo {
            timestamp: DateTime::from_timestamp(secs, 0),
            host: Some("ma-lt".to_string()),
            region: Some("west-eu".to_string()),
            cpu,
            ram,
        }
    }

    #[test]
    fn test_typed_row() {
        let line = encode_row(
            "computerInfo",
            &info(1_262_307_661, Some(0.5), Some(1024)),
            Precision::Second,
        )
        .unwrap();
        assert_eq!(
            line,
            "computerInfo,host=ma-lt,region=west-eu cpu=0.5,ram=1024i 1262307661"
        );
    }

    #[test]
    fn test_null_fields_and_tags_are_omitted() {
        let mut row = info(1, None, Some(7));
        row.region = None;
        let line = encode_row("computerInfo", &row, Precision::Second).unwrap();
        assert_eq!(line, "computerInfo,host=ma-lt ram=7i 1");
    }

    #[test]
    fn test_nanosecond_timestamp() {
        let line = encode_row("m", &info(1_262_307_661, Some(1.0), None), Precision::Nanosecond)
            .unwrap();
        assert!(line.ends_with(" cpu=1 1262307661000000000"), "{}", line);
    }

    #[test]
    fn test_tags_are_sorted() {
        let row = DynamicRow::new()
            .tag("zone", "b")
            .tag("app", "a")
            .tag("host", "h")
            .field("v", 1_i64);
        let line = encode_row("m", &row, Precision::Second).unwrap();
        assert_eq!(line, "m,app=a,host=h,zone=b v=1i");
    }

    #[test]
    fn test_empty_tag_value_is_omitted() {
        let row = DynamicRow::new().tag("host", "").field("v", true);
        assert_eq!(encode_row("m", &row, Precision::Second).unwrap(), "m v=true");
    }

    #[test]
    fn test_field_types() {
        let row = DynamicRow::new()
            .field("b", false)
            .field("f", 42.0)
            .field("i", -3_i64)
            .field("s", "hello");
        assert_eq!(
            encode_row("m", &row, Precision::Second).unwrap(),
            r#"m b=false,f=42,i=-3i,s="hello""#
        );
    }

    #[test]
    fn test_special_characters_are_escaped() {
        let row = DynamicRow::new()
            .tag(ALL_THE_DELIMITERS, ALL_THE_DELIMITERS)
            .field(ALL_THE_DELIMITERS, ALL_THE_DELIMITERS);
        let line = encode_row(ALL_THE_DELIMITERS, &row, Precision::Second).unwrap();

        let measurement = r#"alpha\,beta=delta\ gamma"epsilon\zeta"#;
        let key = r#"alpha\,beta\=delta\ gamma"epsilon\zeta"#;
        let string_field = r#""alpha,beta=delta gamma\"epsilon\\zeta""#;
        assert_eq!(
            line,
            format!("{measurement},{key}={key} {key}={string_field}")
        );
    }

    #[test]
    fn test_line_count_matches_row_count() {
        let rows: Vec<_> = (0..500)
            .map(|i| info(1_262_307_661 + i, Some(0.1 * i as f64), Some(i)))
            .collect();
        let body = encode_rows("computerInfo", &rows, Precision::Nanosecond).unwrap();

        let lines: Vec<_> = body.split('\n').collect();
        assert_eq!(lines.len(), rows.len());
        for (i, line) in lines.iter().enumerate() {
            assert!(!line.is_empty());
            assert!(line.starts_with("computerInfo,host=ma-lt,region=west-eu "));
            let expected_ts = (1_262_307_661 + i as i64) * 1_000_000_000;
            assert!(line.ends_with(&format!(" {}", expected_ts)));
        }
    }

    #[test]
    fn test_empty_rows_encode_to_empty_body() {
        let rows: Vec<DynamicRow> = Vec::new();
        assert_eq!(encode_rows("m", &rows, Precision::Second).unwrap(), "");
    }

    #[test]
    fn test_row_without_fields_fails() {
        let rows = vec![info(1, Some(0.1), None), info(2, None, None)];
        let err = encode_rows("computerInfo", &rows, Precision::Second).unwrap_err();
        match err {
            Error::Encoding { message } => {
                assert!(message.starts_with("row 1:"), "{}", message);
                assert!(message.contains("no non-null fields"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_empty_keys_fail() {
        let row = DynamicRow::new().field("", 1_i64);
        assert!(matches!(
            encode_row("m", &row, Precision::Second),
            Err(Error::Encoding { .. })
        ));

        let row = DynamicRow::new().tag("", "x").field("v", 1_i64);
        assert!(matches!(
            encode_row("m", &row, Precision::Second),
            Err(Error::Encoding { .. })
        ));

        let row = DynamicRow::new().field("v", 1_i64);
        assert!(matches!(
            encode_row("", &row, Precision::Second),
            Err(Error::Encoding { .. })
        ));
    }

    #[test]
    fn test_non_finite_float_fails() {
        let row = DynamicRow::new().field("v", f64::NAN);
        assert!(matches!(
            encode_row("m", &row, Precision::Second),
            Err(Error::Encoding { .. })
        ));
    }

    #[test]
    fn test_newline_in_tag_fails() {
        let row = DynamicRow::new().tag("host", "a\nb").field("v", 1_i64);
        assert!(matches!(
            encode_row("m", &row, Precision::Second),
            Err(Error::Encoding { .. })
        ));
    }

    #[test]
    fn test_newline_in_string_field_fails() {
        let rows = vec![
            DynamicRow::new().field("msg", "a\nb"),
            DynamicRow::new().field("v", 1_i64),
        ];
        let err = encode_rows("m", &rows, Precision::Second).unwrap_err();
        match err {
            Error::Encoding { message } => assert!(message.starts_with("row 0:"), "{}", message),
            other => panic!("unexpected error: {:?}", other),
        }

        // Escaped newline text is fine.
        let row = DynamicRow::new().field("msg", r"a\nb");
        assert_eq!(
            encode_row("m", &row, Precision::Second).unwrap(),
            r#"m msg="a\\nb""#
        );
    }

    #[test]
    fn test_trailing_backslash_fails() {
        let row = DynamicRow::new()
            .tag("path", r"C:\temp\")
            .tag("zone", "a")
            .field("v", 1_i64);
        assert!(matches!(
            encode_row("m", &row, Precision::Second),
            Err(Error::Encoding { .. })
        ));

        let row = DynamicRow::new().tag(r"dir\", "a").field("v", 1_i64);
        assert!(matches!(
            encode_row("m", &row, Precision::Second),
            Err(Error::Encoding { .. })
        ));

        let row = DynamicRow::new().field(r"v\", 1_i64);
        assert!(matches!(
            encode_row("m", &row, Precision::Second),
            Err(Error::Encoding { .. })
        ));

        let row = DynamicRow::new().field("v", 1_i64);
        assert!(matches!(
            encode_row(r"m\", &row, Precision::Second),
            Err(Error::Encoding { .. })
        ));

        // Backslashes elsewhere pass through.
        let row = DynamicRow::new().tag("path", r"C:\temp").field("v", 1_i64);
        assert_eq!(
            encode_row("m", &row, Precision::Second).unwrap(),
            r"m,path=C:\temp v=1i"
        );
    }

    #[test]
    fn test_out_of_range_nanosecond_timestamp_fails() {
        let row = DynamicRow::new()
            .with_timestamp(DateTime::from_timestamp(20_000_000_000, 0).unwrap())
            .field("v", 1_i64);
        assert!(matches!(
            encode_row("m", &row, Precision::Nanosecond),
            Err(Error::Encoding { .. })
        ));
        assert!(encode_row("m", &row, Precision::Second).is_ok());
    }

    #[test]
    fn test_each_line_has_one_field_section() {
        let row = DynamicRow::new()
            .tag("host", "a b")
            .field("msg", "x y z")
            .field("v", 1_i64);
        let line = encode_row("m", &row, Precision::Second).unwrap();
        assert_eq!(line, r#"m,host=a\ b msg="x y z",v=1i"#);
    }
}
