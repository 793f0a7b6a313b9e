//! Core types shared by writes and queries.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};

/// Unit of the integer timestamps exchanged with InfluxDB.
///
/// Used as the `precision` of a write and the `epoch` of a query. The two
/// must match if timestamps are to come back the way they were written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Precision {
    /// Nanoseconds since the Unix epoch.
    #[default]
    #[serde(rename = "ns")]
    Nanosecond,
    /// Microseconds since the Unix epoch.
    #[serde(rename = "u")]
    Microsecond,
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "ms")]
    Millisecond,
    /// Seconds since the Unix epoch.
    #[serde(rename = "s")]
    Second,
    /// Minutes since the Unix epoch.
    #[serde(rename = "m")]
    Minute,
    /// Hours since the Unix epoch.
    #[serde(rename = "h")]
    Hour,
}

impl Precision {
    /// The parameter value InfluxDB expects for this precision.
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Nanosecond => "ns",
            Precision::Microsecond => "u",
            Precision::Millisecond => "ms",
            Precision::Second => "s",
            Precision::Minute => "m",
            Precision::Hour => "h",
        }
    }

    /// Number of whole units since the epoch, floored.
    ///
    /// Returns `None` for nanosecond precision outside the years 1677-2262.
    pub fn to_timestamp(&self, time: &DateTime<Utc>) -> Option<i64> {
        match self {
            Precision::Nanosecond => time.timestamp_nanos_opt(),
            Precision::Microsecond => Some(time.timestamp_micros()),
            Precision::Millisecond => Some(time.timestamp_millis()),
            Precision::Second => Some(time.timestamp()),
            Precision::Minute => Some(time.timestamp().div_euclid(60)),
            Precision::Hour => Some(time.timestamp().div_euclid(3600)),
        }
    }

    /// Inverse of [`Precision::to_timestamp`].
    pub fn to_datetime(&self, count: i64) -> Option<DateTime<Utc>> {
        match self {
            Precision::Nanosecond => Some(DateTime::from_timestamp_nanos(count)),
            Precision::Microsecond => DateTime::from_timestamp_micros(count),
            Precision::Millisecond => DateTime::from_timestamp_millis(count),
            Precision::Second => DateTime::from_timestamp(count, 0),
            Precision::Minute => count
                .checked_mul(60)
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            Precision::Hour => count
                .checked_mul(3600)
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        }
    }
}

impl FromStr for Precision {
    type Err = Error;

    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        match input {
            "ns" | "n" => Ok(Self::Nanosecond),
            "u" | "us" | "µ" => Ok(Self::Microsecond),
            "ms" => Ok(Self::Millisecond),
            "s" => Ok(Self::Second),
            "m" => Ok(Self::Minute),
            "h" => Ok(Self::Hour),
            _ => Err(Error::Parse {
                message: format!("Unknown precision: {}", input),
            }),
        }
    }
}

impl std::fmt::Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Write acknowledgement level for clustered InfluxDB deployments.
///
/// Passed through to the server untouched; single-node servers ignore it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    /// Any node, including hinted handoff.
    Any,
    /// A single data node.
    One,
    /// A majority of data nodes.
    Quorum,
    /// Every data node.
    All,
}

impl Consistency {
    /// The parameter value InfluxDB expects for this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Consistency::Any => "any",
            Consistency::One => "one",
            Consistency::Quorum => "quorum",
            Consistency::All => "all",
        }
    }
}

impl FromStr for Consistency {
    type Err = Error;

    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        match input {
            "any" => Ok(Self::Any),
            "one" => Ok(Self::One),
            "quorum" => Ok(Self::Quorum),
            "all" => Ok(Self::All),
            _ => Err(Error::Parse {
                message: format!("Unknown consistency level: {}", input),
            }),
        }
    }
}

impl std::fmt::Display for Consistency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decoded response of a query request: one [`QueryResult`] per statement.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultSet<R> {
    /// Results in statement order.
    pub results: Vec<QueryResult<R>>,
}

impl<R> Default for ResultSet<R> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
        }
    }
}

impl<R> ResultSet<R> {
    /// Create an empty result set.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if no statement reported an error.
    pub fn succeeded(&self) -> bool {
        self.results.iter().all(QueryResult::succeeded)
    }

    /// Error message of the first failed statement, if any.
    pub fn first_error(&self) -> Option<&str> {
        self.results.iter().find_map(|r| r.error.as_deref())
    }

    /// Turns the first statement error into [`Error::Influx`].
    pub fn ensure_success(self) -> Result<Self> {
        match self.first_error() {
            Some(message) => Err(Error::Influx {
                status: None,
                message: message.to_string(),
            }),
            None => Ok(self),
        }
    }

    /// Iterates over every row of every series of every statement.
    pub fn rows(&self) -> impl Iterator<Item = &R> {
        self.results.iter().flat_map(QueryResult::rows)
    }

    /// Appends a result decoded from one chunk of a chunked response.
    ///
    /// A chunk continuing the previous (partial) statement is merged into
    /// it, and a series continuing the previous (partial) series has its
    /// rows appended.
    pub fn push_chunk(&mut self, chunk: QueryResult<R>) {
        match self.results.last_mut() {
            Some(last) if last.partial && last.statement_id == chunk.statement_id => {
                last.merge(chunk)
            }
            _ => self.results.push(chunk),
        }
    }
}

/// Outcome of a single statement.
///
/// A failed statement carries its error here instead of failing the whole
/// request, so the other statements of a multi-statement query stay usable.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryResult<R> {
    /// Zero-based index of the statement within the query.
    pub statement_id: usize,
    /// Series produced by the statement.
    pub series: Vec<Series<R>>,
    /// Error reported by the server for this statement.
    pub error: Option<String>,
    /// More chunks follow for this statement.
    pub partial: bool,
}

impl<R> QueryResult<R> {
    /// True if the statement did not report an error.
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// Turns a statement error into [`Error::Influx`].
    pub fn into_result(self) -> Result<Self> {
        match self.error {
            Some(message) => Err(Error::Influx {
                status: None,
                message,
            }),
            None => Ok(self),
        }
    }

    /// Iterates over the rows of every series.
    pub fn rows(&self) -> impl Iterator<Item = &R> {
        self.series.iter().flat_map(|s| s.rows.iter())
    }

    fn merge(&mut self, chunk: QueryResult<R>) {
        self.partial = chunk.partial;
        if self.error.is_none() {
            self.error = chunk.error;
        }

        for series in chunk.series {
            match self.series.last_mut() {
                Some(last)
                    if last.partial && last.name == series.name && last.tags == series.tags =>
                {
                    last.partial = series.partial;
                    last.rows.extend(series.rows);
                }
                _ => self.series.push(series),
            }
        }
    }
}

/// Rows sharing a measurement and a set of GROUP BY tag values.
#[derive(Clone, Debug, PartialEq)]
pub struct Series<R> {
    /// Measurement name (or the name InfluxDB gives a SHOW result).
    pub name: String,
    /// GROUP BY tag values of this series.
    pub tags: BTreeMap<String, String>,
    /// Decoded rows in response order.
    pub rows: Vec<R>,
    /// More rows follow in the next chunk.
    pub partial: bool,
}
