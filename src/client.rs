//! InfluxDB 1.x HTTP client.
//!
//! This module provides the main `Client` type for writing rows to and
//! reading rows from an InfluxDB 1.x server.

use std::pin::Pin;

use async_stream::stream;
use futures::{Stream, TryStreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::Serialize;
use tokio_util::io::StreamReader;

use crate::config::{ClientBuilder, Credentials, QueryOptions, WriteOptions};
use crate::error::{Error, Result};
use crate::line_protocol::encode_rows;
use crate::parser::{ChunkedResponseParser, error_message, parse_result_set_with_kinds};
use crate::row::{DynamicRow, InfluxRow};
use crate::types::{Consistency, Precision, QueryResult, ResultSet};

/// InfluxDB 1.x client.
///
/// Cheap to clone; clones share the underlying connection pool. Calls are
/// independent of each other and may run concurrently.
///
/// # Example
///
/// ```ignore
/// use influxdb_rows::{Client, DynamicRow};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = Client::new("http://localhost:8086")?;
///     client.create_database_if_not_exists("metrics").await?;
///
///     let rows = vec![
///         DynamicRow::new()
///             .with_timestamp(chrono::Utc::now())
///             .tag("host", "ma-lt")
///             .field("cpu", 0.42),
///     ];
///     client.write("metrics", "computerInfo", &rows).await?;
///
///     let result = client
///         .read::<DynamicRow>("metrics", "SELECT * FROM computerInfo")
///         .await?;
///     for row in result.rows() {
///         println!("{:?}", row);
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Clone, Debug)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    credentials: Option<Credentials>,
    write_options: WriteOptions,
    query_options: QueryOptions,
}

/// Query string of a `/write` request.
#[derive(Debug, Serialize)]
struct WriteParams<'a> {
    db: &'a str,
    precision: Precision,
    #[serde(skip_serializing_if = "Option::is_none")]
    consistency: Option<Consistency>,
    #[serde(rename = "rp", skip_serializing_if = "Option::is_none")]
    retention_policy: Option<&'a str>,
}

/// Query string of a `/query` request.
#[derive(Debug, Serialize)]
struct QueryParams<'a> {
    q: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    db: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    epoch: Option<Precision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chunked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chunk_size: Option<usize>,
}

impl Client {
    /// Create a new InfluxDB client with default settings.
    ///
    /// # Arguments
    ///
    /// * `url` - Base URL of the InfluxDB server (e.g., "http://localhost:8086")
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the provided URL is invalid.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        ClientBuilder::new(url).build()
    }

    /// Create a new client with a custom reqwest client.
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_http_client(http: reqwest::Client, url: impl Into<String>) -> Result<Self> {
        ClientBuilder::new(url).http_client(http).build()
    }

    /// Start configuring a client.
    pub fn builder(url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(url)
    }

    pub(crate) fn from_parts(
        http: reqwest::Client,
        base_url: Url,
        credentials: Option<Credentials>,
        write_options: WriteOptions,
        query_options: QueryOptions,
    ) -> Self {
        Self {
            http,
            base_url,
            credentials,
            write_options,
            query_options,
        }
    }

    /// Get the base URL.
    pub fn url(&self) -> &Url {
        &self.base_url
    }

    /// Options used by [`Client::write`].
    pub fn write_options(&self) -> &WriteOptions {
        &self.write_options
    }

    /// Options used by [`Client::read`].
    pub fn query_options(&self) -> &QueryOptions {
        &self.query_options
    }

    /// Build the full URL for an API endpoint, keeping any base path prefix.
    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let prefix = self.base_url.path().trim_end_matches('/');
        url.set_path(&format!("{}{}", prefix, path));
        url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.http.request(method, self.endpoint(path));
        match &self.credentials {
            Some(c) => request.basic_auth(&c.username, Some(c.password())),
            None => request,
        }
    }

    /// Check that the server is up.
    ///
    /// Returns the server version reported in the `X-Influxdb-Version` header.
    pub async fn ping(&self) -> Result<Option<String>> {
        let response = self.request(Method::GET, "/ping").send().await?;
        let response = check_response(response).await?;

        Ok(response
            .headers()
            .get("X-Influxdb-Version")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string))
    }

    /// Write rows to `measurement` using the client's default
    /// [`WriteOptions`].
    ///
    /// All rows are encoded before anything is sent, so an invalid row
    /// fails the call with [`Error::Encoding`] and nothing is written.
    pub async fn write<R: InfluxRow>(&self, db: &str, measurement: &str, rows: &[R]) -> Result<()> {
        self.write_with_options(db, measurement, rows, &self.write_options)
            .await
    }

    /// Write rows to `measurement` with explicit [`WriteOptions`].
    ///
    /// Writing an empty slice is a no-op.
    pub async fn write_with_options<R: InfluxRow>(
        &self,
        db: &str,
        measurement: &str,
        rows: &[R],
        options: &WriteOptions,
    ) -> Result<()> {
        require_name("database", db)?;
        require_name("measurement", measurement)?;

        if rows.is_empty() {
            log::debug!("nothing to write to '{}'.'{}'", db, measurement);
            return Ok(());
        }

        let body = encode_rows(measurement, rows, options.precision)?;
        log::debug!(
            "writing {} rows to '{}'.'{}' ({} bytes)",
            rows.len(),
            db,
            measurement,
            body.len()
        );

        self.write_line_protocol(db, body, options).await
    }

    /// Write pre-encoded line protocol.
    ///
    /// Timestamps in `body` must be in `options.precision`.
    pub async fn write_line_protocol(
        &self,
        db: &str,
        body: impl Into<String>,
        options: &WriteOptions,
    ) -> Result<()> {
        require_name("database", db)?;

        let params = WriteParams {
            db,
            precision: options.precision,
            consistency: options.consistency,
            retention_policy: options.retention_policy.as_deref(),
        };

        let response = self
            .request(Method::POST, "/write")
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .query(&params)
            .body(body.into())
            .send()
            .await?;

        check_response(response).await?;
        Ok(())
    }

    /// Run a read-only query and decode every series into rows of type `R`,
    /// using the client's default [`QueryOptions`].
    ///
    /// Statement errors are reported per result; see [`ResultSet::succeeded`].
    pub async fn read<R: InfluxRow>(&self, db: &str, query: &str) -> Result<ResultSet<R>> {
        self.read_with_options(db, query, &self.query_options).await
    }

    /// Run a read-only query with explicit [`QueryOptions`].
    ///
    /// With a `chunk_size` the response is read chunk by chunk and
    /// reassembled before returning.
    pub async fn read_with_options<R: InfluxRow>(
        &self,
        db: &str,
        query: &str,
        options: &QueryOptions,
    ) -> Result<ResultSet<R>> {
        require_name("database", db)?;
        self.fetch(Method::GET, Some(db), query, options).await
    }

    /// Run a read-only query in chunked mode and return results as an
    /// async stream.
    ///
    /// Each item is one chunk: a [`QueryResult`] holding at most
    /// `chunk_size` rows (the server default when unset). Results with
    /// `partial == true` are continued by the next item; feed items to
    /// [`ResultSet::push_chunk`] to reassemble them.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use futures::StreamExt;
    ///
    /// let options = QueryOptions::new().chunk_size(10_000);
    /// let mut stream = client
    ///     .read_stream::<DynamicRow>("metrics", "SELECT * FROM computerInfo", &options)
    ///     .await?;
    ///
    /// let mut count = 0;
    /// while let Some(result) = stream.next().await {
    ///     count += result?.rows().count();
    /// }
    /// println!("Processed {} rows", count);
    /// ```
    pub async fn read_stream<R>(
        &self,
        db: &str,
        query: &str,
        options: &QueryOptions,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<QueryResult<R>>> + Send>>>
    where
        R: InfluxRow + Send,
    {
        require_name("database", db)?;

        let response = self.send_query(Method::GET, Some(db), query, options, true).await?;

        // Convert the response body to an async reader
        let reader = StreamReader::new(response.bytes_stream().map_err(std::io::Error::other));

        let mut parser = ChunkedResponseParser::<_, R>::new(reader, options.precision)
            .with_field_kinds(options.field_kinds.clone());

        let s = stream! {
            loop {
                match parser.next().await {
                    Ok(Some(result)) => yield Ok(result),
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(s))
    }

    /// Run statements that change server state (`CREATE`, `DROP`, ...).
    ///
    /// Sent as a POST, as InfluxDB requires for these statements. `db` is
    /// optional because most administrative statements name their target.
    pub async fn execute(&self, db: Option<&str>, query: &str) -> Result<ResultSet<DynamicRow>> {
        self.fetch(Method::POST, db, query, &QueryOptions::default())
            .await
    }

    /// Send a query and decode the whole response.
    pub(crate) async fn fetch<R: InfluxRow>(
        &self,
        method: Method,
        db: Option<&str>,
        query: &str,
        options: &QueryOptions,
    ) -> Result<ResultSet<R>> {
        let chunked = options.chunk_size.is_some();
        let response = self.send_query(method, db, query, options, chunked).await?;

        if chunked {
            let reader = StreamReader::new(response.bytes_stream().map_err(std::io::Error::other));
            let mut parser = ChunkedResponseParser::<_, R>::new(reader, options.precision)
                .with_field_kinds(options.field_kinds.clone());
            let mut set = ResultSet::new();
            while let Some(result) = parser.next().await? {
                set.push_chunk(result);
            }
            return Ok(set);
        }

        let body = response.bytes().await?;
        parse_result_set_with_kinds(&body, options.precision, &options.field_kinds)
    }

    async fn send_query(
        &self,
        method: Method,
        db: Option<&str>,
        query: &str,
        options: &QueryOptions,
        chunked: bool,
    ) -> Result<Response> {
        if query.trim().is_empty() {
            return Err(Error::invalid_argument("query is empty"));
        }

        let params = QueryParams {
            q: query,
            db,
            epoch: options.precision,
            chunked: chunked.then_some(true),
            chunk_size: if chunked { options.chunk_size } else { None },
        };

        log::debug!("{} /query db={:?}: {}", method, db, query);

        let response = self
            .request(method, "/query")
            .header(ACCEPT, "application/json")
            .query(&params)
            .send()
            .await?;

        check_response(response).await
    }
}

fn require_name(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::invalid_argument(format!("{} name is empty", what)));
    }
    Ok(())
}

/// Turn a non-2xx response into [`Error::Influx`].
async fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await?;
    let message = error_message(&text).unwrap_or_else(|| {
        if text.trim().is_empty() {
            status.canonical_reason().unwrap_or("unknown error").to_string()
        } else {
            text.trim().to_string()
        }
    });

    log::warn!("InfluxDB responded with {}: {}", status, message);

    Err(Error::Influx {
        status: Some(status),
        message,
    })
}
