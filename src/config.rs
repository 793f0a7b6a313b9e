//! Client configuration: connection settings and per-request defaults.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Url;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::types::{Consistency, Precision};
use crate::value::FieldKind;

/// Environment variable holding the server URL.
pub const ENV_URL: &str = "INFLUXDB_URL";
/// Environment variable holding the user name.
pub const ENV_USERNAME: &str = "INFLUXDB_USERNAME";
/// Environment variable holding the password.
pub const ENV_PASSWORD: &str = "INFLUXDB_PASSWORD";

/// Parameters of a write request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Unit of the timestamps in the body. Defaults to nanoseconds.
    pub precision: Precision,
    /// Acknowledgement level; left to the server when `None`.
    pub consistency: Option<Consistency>,
    /// Target retention policy; the database default when `None`.
    pub retention_policy: Option<String>,
}

impl WriteOptions {
    /// Options with server defaults and nanosecond precision.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timestamp precision.
    pub fn precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    /// Set the consistency level.
    pub fn consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = Some(consistency);
        self
    }

    /// Set the retention policy.
    pub fn retention_policy(mut self, retention_policy: impl Into<String>) -> Self {
        self.retention_policy = Some(retention_policy.into());
        self
    }
}

/// Parameters of a query request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Ask for integer timestamps in this unit instead of RFC 3339 strings.
    pub precision: Option<Precision>,
    /// Ask the server to stream results in chunks of this many rows.
    pub chunk_size: Option<usize>,
    /// Types of columns decoded into a dynamic field map, by column name.
    pub field_kinds: BTreeMap<String, FieldKind>,
}

impl QueryOptions {
    /// Options with RFC 3339 timestamps and no chunking.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request integer timestamps in `precision`.
    pub fn precision(mut self, precision: Precision) -> Self {
        self.precision = Some(precision);
        self
    }

    /// Request chunked responses of at most `chunk_size` rows per chunk.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    /// Decode the dynamic field `name` as `kind` instead of going by the
    /// shape of the JSON number.
    pub fn field_kind(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.field_kinds.insert(name.into(), kind);
        self
    }

    /// Replace all dynamic field type hints, e.g. with the result of
    /// [`Client::field_kinds`].
    pub fn field_kinds(mut self, field_kinds: BTreeMap<String, FieldKind>) -> Self {
        self.field_kinds = field_kinds;
        self
    }
}

/// User name and password, sent as HTTP basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User name.
    pub username: String,
    password: String,
}

impl Credentials {
    /// Create credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The password.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Incrementally configures a [`Client`].
///
/// # Example
///
/// ```no_run
/// use std::collections::BTreeMap;
/// use std::time::Duration;
///
/// use influxdb_rows::{Client, Consistency, Precision, WriteOptions};
///
/// # fn main() -> influxdb_rows::Result<()> {
/// let client = Client::builder("http://localhost:8086")
///     .credentials("admin", "secret")
///     .timeout(Duration::from_secs(30))
///     .write_options(
///         WriteOptions::new()
///             .precision(Precision::Millisecond)
///             .consistency(Consistency::One),
///     )
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ClientBuilder {
    url: String,
    credentials: Option<Credentials>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    http: Option<reqwest::Client>,
    write_options: WriteOptions,
    query_options: QueryOptions,
}

impl ClientBuilder {
    /// Start configuring a client for the server at `url`
    /// (e.g., "http://localhost:8086").
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            credentials: None,
            timeout: None,
            connect_timeout: None,
            http: None,
            write_options: WriteOptions::default(),
            query_options: QueryOptions::default(),
        }
    }

    /// Configure from `INFLUXDB_URL`, `INFLUXDB_USERNAME` and
    /// `INFLUXDB_PASSWORD`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `INFLUXDB_URL` is not set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = lookup(ENV_URL)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| Error::invalid_argument(format!("{} is not set", ENV_URL)))?;

        let mut builder = Self::new(url);
        if let Some(username) = lookup(ENV_USERNAME) {
            let password = lookup(ENV_PASSWORD).unwrap_or_default();
            builder = builder.credentials(username, password);
        }
        Ok(builder)
    }

    /// Authenticate every request with these credentials.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Total timeout of each request. Ignored with a custom HTTP client.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Connect timeout of each request. Ignored with a custom HTTP client.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Use a preconfigured reqwest client (proxies, TLS settings, ...).
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Options used by [`Client::write`].
    pub fn write_options(mut self, options: WriteOptions) -> Self {
        self.write_options = options;
        self
    }

    /// Options used by [`Client::read`].
    pub fn query_options(mut self, options: QueryOptions) -> Self {
        self.query_options = options;
        self
    }

    /// Create the client.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidUrl`] if the URL does not parse or is not http(s);
    /// [`Error::Transport`] if the HTTP client cannot be constructed.
    pub fn build(self) -> Result<Client> {
        let base_url = parse_base_url(&self.url)?;

        let http = match self.http {
            Some(http) => {
                if self.timeout.is_some() || self.connect_timeout.is_some() {
                    log::warn!("timeouts are ignored when a custom HTTP client is supplied");
                }
                http
            }
            None => {
                let mut builder = reqwest::Client::builder();
                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }
                if let Some(timeout) = self.connect_timeout {
                    builder = builder.connect_timeout(timeout);
                }
                builder.build()?
            }
        };

        Ok(Client::from_parts(
            http,
            base_url,
            self.credentials,
            self.write_options,
            self.query_options,
        ))
    }
}

fn parse_base_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(Error::InvalidUrl {
            url: url.to_string(),
            message: format!("unsupported scheme '{}'", other),
        }),
    }
}
