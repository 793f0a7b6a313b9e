//! Database administration: `SHOW`, `CREATE` and `DROP` statements.
//!
//! These are plain InfluxQL queries against `/query`; the helpers here quote
//! identifiers, pick GET or POST as InfluxDB requires, and decode the `SHOW`
//! results into small row types.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::Duration;
use go_parse_duration::parse_duration;
use reqwest::Method;

use crate::client::Client;
use crate::config::QueryOptions;
use crate::error::{Error, Result};
use crate::row::{InfluxRow, Schema};
use crate::types::QueryResult;
use crate::value::FieldKind;

/// One row of `SHOW DATABASES`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DatabaseRow {
    /// Database name.
    pub name: String,
}

impl InfluxRow for DatabaseRow {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<DatabaseRow>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::<Self>::builder()
                .required_field("name", |r| r.name.clone(), |r, v| r.name = v)
                .build()
        })
    }
}

/// One row of `SHOW MEASUREMENTS`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MeasurementRow {
    /// Measurement name.
    pub name: String,
}

impl InfluxRow for MeasurementRow {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<MeasurementRow>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::<Self>::builder()
                .required_field("name", |r| r.name.clone(), |r, v| r.name = v)
                .build()
        })
    }
}

/// One row of `SHOW RETENTION POLICIES`.
///
/// Durations are kept as the server prints them (`168h0m0s`); use
/// [`RetentionPolicyRow::duration`] and
/// [`RetentionPolicyRow::shard_group_duration`] to parse them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RetentionPolicyRow {
    pub name: String,
    pub duration: String,
    pub shard_group_duration: String,
    pub replica_n: Option<i64>,
    pub default: bool,
}

impl RetentionPolicyRow {
    /// How long data is kept. `None` means forever (`0s`).
    pub fn duration(&self) -> Result<Option<Duration>> {
        let duration = parse_go_duration("duration", &self.duration)?;
        Ok((duration != Duration::zero()).then_some(duration))
    }

    /// Time range covered by each shard group.
    pub fn shard_group_duration(&self) -> Result<Duration> {
        parse_go_duration("shardGroupDuration", &self.shard_group_duration)
    }
}

impl InfluxRow for RetentionPolicyRow {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<RetentionPolicyRow>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::<Self>::builder()
                .required_field("name", |r| r.name.clone(), |r, v| r.name = v)
                .required_field("duration", |r| r.duration.clone(), |r, v| r.duration = v)
                .required_field(
                    "shardGroupDuration",
                    |r| r.shard_group_duration.clone(),
                    |r, v| r.shard_group_duration = v,
                )
                .field("replicaN", |r| r.replica_n, |r, v| r.replica_n = v)
                .required_field("default", |r| r.default, |r, v| r.default = v)
                .build()
        })
    }
}

/// One row of `SHOW FIELD KEYS`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldKeyRow {
    pub field_key: String,
    pub field_type: String,
}

impl FieldKeyRow {
    /// The field type as a [`FieldKind`].
    pub fn kind(&self) -> Result<FieldKind> {
        self.field_type.parse()
    }
}

impl InfluxRow for FieldKeyRow {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<FieldKeyRow>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::<Self>::builder()
                .required_field("fieldKey", |r| r.field_key.clone(), |r, v| r.field_key = v)
                .required_field("fieldType", |r| r.field_type.clone(), |r, v| r.field_type = v)
                .build()
        })
    }
}

fn parse_go_duration(column: &str, s: &str) -> Result<Duration> {
    let nanos = parse_duration(s).map_err(|_| Error::Parse {
        message: format!("Invalid duration '{}' for column '{}'", s, column),
    })?;
    Ok(Duration::nanoseconds(nanos))
}

/// Quote an identifier for use in InfluxQL.
pub fn quote_identifier(name: &str) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('"');
    for c in name.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

impl Client {
    /// List the databases on the server.
    pub async fn show_databases(&self) -> Result<QueryResult<DatabaseRow>> {
        self.show(None, "SHOW DATABASES").await
    }

    /// True if a database named `name` exists.
    pub async fn database_exists(&self, name: &str) -> Result<bool> {
        let databases = self.show_databases().await?;
        Ok(databases.rows().any(|db| db.name == name))
    }

    /// Create a database.
    ///
    /// # Errors
    ///
    /// [`Error::Influx`] if the database already exists. InfluxDB 1.x itself
    /// accepts a duplicate `CREATE DATABASE` silently, so existence is
    /// checked first.
    pub async fn create_database(&self, name: &str) -> Result<()> {
        require_identifier("database", name)?;

        if self.database_exists(name).await? {
            return Err(Error::Influx {
                status: None,
                message: format!("database already exists: {}", name),
            });
        }

        self.run(None, &format!("CREATE DATABASE {}", quote_identifier(name)))
            .await
    }

    /// Create a database unless it already exists.
    pub async fn create_database_if_not_exists(&self, name: &str) -> Result<()> {
        require_identifier("database", name)?;

        if self.database_exists(name).await? {
            log::debug!("database '{}' already exists", name);
            return Ok(());
        }

        self.run(None, &format!("CREATE DATABASE {}", quote_identifier(name)))
            .await
    }

    /// Drop a database and all of its data.
    pub async fn drop_database(&self, name: &str) -> Result<()> {
        require_identifier("database", name)?;
        self.run(None, &format!("DROP DATABASE {}", quote_identifier(name)))
            .await
    }

    /// Drop a database if it exists.
    pub async fn drop_database_if_exists(&self, name: &str) -> Result<()> {
        require_identifier("database", name)?;

        if !self.database_exists(name).await? {
            log::debug!("database '{}' does not exist", name);
            return Ok(());
        }

        self.drop_database(name).await
    }

    /// List the measurements of a database.
    pub async fn show_measurements(&self, db: &str) -> Result<QueryResult<MeasurementRow>> {
        require_identifier("database", db)?;
        self.show(Some(db), "SHOW MEASUREMENTS").await
    }

    /// List the retention policies of a database.
    pub async fn show_retention_policies(
        &self,
        db: &str,
    ) -> Result<QueryResult<RetentionPolicyRow>> {
        require_identifier("database", db)?;
        let query = format!("SHOW RETENTION POLICIES ON {}", quote_identifier(db));
        self.show(Some(db), &query).await
    }

    /// List the field keys of a measurement and their types.
    pub async fn show_field_keys(
        &self,
        db: &str,
        measurement: &str,
    ) -> Result<QueryResult<FieldKeyRow>> {
        require_identifier("database", db)?;
        require_identifier("measurement", measurement)?;
        let query = format!("SHOW FIELD KEYS FROM {}", quote_identifier(measurement));
        self.show(Some(db), &query).await
    }

    /// Field types of a measurement, ready for [`QueryOptions::field_kinds`].
    ///
    /// Reading [`DynamicRow`](crate::row::DynamicRow)s with these hints
    /// keeps float fields that hold whole numbers as floats.
    pub async fn field_kinds(
        &self,
        db: &str,
        measurement: &str,
    ) -> Result<BTreeMap<String, FieldKind>> {
        let keys = self.show_field_keys(db, measurement).await?;
        keys.rows()
            .map(|row| row.kind().map(|kind| (row.field_key.clone(), kind)))
            .collect()
    }

    /// Drop a measurement and all of its series.
    pub async fn drop_measurement(&self, db: &str, measurement: &str) -> Result<()> {
        require_identifier("database", db)?;
        require_identifier("measurement", measurement)?;
        let query = format!("DROP MEASUREMENT {}", quote_identifier(measurement));
        self.run(Some(db), &query).await
    }

    /// Run a single `SHOW` statement; a statement error becomes `Err`.
    async fn show<R: InfluxRow>(&self, db: Option<&str>, query: &str) -> Result<QueryResult<R>> {
        let set = self
            .fetch::<R>(Method::GET, db, query, &QueryOptions::default())
            .await?;

        let result = set.results.into_iter().next().unwrap_or(QueryResult {
            statement_id: 0,
            series: Vec::new(),
            error: None,
            partial: false,
        });
        result.into_result()
    }

    async fn run(&self, db: Option<&str>, query: &str) -> Result<()> {
        log::debug!("{}", query);
        self.execute(db, query).await?.ensure_success()?;
        Ok(())
    }
}

fn require_identifier(what: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_argument(format!("{} name is empty", what)));
    }
    Ok(())
}
