//! # influxdb-rows
//!
//! Async client for InfluxDB 1.x that writes and reads strongly-typed rows.
//!
//! A row type describes once how its members map onto the timestamp, tag and
//! field columns of a measurement. The same description drives both
//! directions:
//!
//! ```ignore
//! // Encoded to line protocol and POSTed to /write
//! client.write("metrics", "computerInfo", &rows).await?;
//!
//! // Query results decoded straight into the same type
//! let result = client.read::<ComputerInfo>("metrics", "SELECT * FROM computerInfo").await?;
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::OnceLock;
//!
//! use chrono::{DateTime, Utc};
//! use influxdb_rows::{Client, InfluxRow, Schema};
//!
//! #[derive(Debug, Default)]
//! struct ComputerInfo {
//!     timestamp: Option<DateTime<Utc>>,
//!     host: Option<String>,
//!     cpu: Option<f64>,
//!     ram: Option<i64>,
//! }
//!
//! impl InfluxRow for ComputerInfo {
//!     fn schema() -> &'static Schema<Self> {
//!         static SCHEMA: OnceLock<Schema<ComputerInfo>> = OnceLock::new();
//!         SCHEMA.get_or_init(|| {
//!             Schema::<Self>::builder()
//!                 .timestamp(|r| r.timestamp, |r, t| r.timestamp = Some(t))
//!                 .tag("host", |r| r.host.as_deref(), |r, v| r.host = v)
//!                 .field("cpu", |r| r.cpu, |r, v| r.cpu = v)
//!                 .field("ram", |r| r.ram, |r, v| r.ram = v)
//!                 .build()
//!         })
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new("http://localhost:8086")?;
//!     client.create_database_if_not_exists("metrics").await?;
//!
//!     let rows = vec![ComputerInfo {
//!         timestamp: Some(Utc::now()),
//!         host: Some("ma-lt".to_string()),
//!         cpu: Some(0.42),
//!         ram: None,
//!     }];
//!     client.write("metrics", "computerInfo", &rows).await?;
//!
//!     let result = client
//!         .read::<ComputerInfo>("metrics", "SELECT * FROM computerInfo WHERE time > now() - 1h")
//!         .await?;
//!     for row in result.rows() {
//!         println!("{:?}", row);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Explicit schemas**: column mapping through accessor functions, no
//!   runtime reflection
//! - **Dynamic rows**: [`DynamicRow`] for measurements without a Rust type
//! - **Partial failures**: each statement of a multi-statement query keeps its
//!   own error
//! - **Chunked queries**: large results can be streamed chunk by chunk
//! - **Error handling**: All errors are returned as Results, no panics

pub mod admin;
pub mod client;
pub mod config;
pub mod error;
pub mod line_protocol;
pub mod parser;
pub mod row;
pub mod types;
pub mod value;

// Re-export main types at crate root
pub use admin::{DatabaseRow, FieldKeyRow, MeasurementRow, RetentionPolicyRow, quote_identifier};
pub use client::Client;
pub use config::{ClientBuilder, Credentials, QueryOptions, WriteOptions};
pub use error::{Error, Result};
pub use row::{DynamicRow, InfluxRow, Schema, SchemaBuilder};
pub use types::{Consistency, Precision, QueryResult, ResultSet, Series};
pub use value::{FieldKind, FieldType, Value};

// Re-export encoder and decoder for advanced use cases
pub use line_protocol::{encode_row, encode_rows};
pub use parser::{ChunkedResponseParser, parse_result_set, parse_result_set_with_kinds};
