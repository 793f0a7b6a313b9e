//! Row model: how a Rust type maps onto timestamp, tag and field columns.
//!
//! A row type describes itself once through a [`Schema`], a table of
//! accessor/mutator functions keyed by column name. The line protocol
//! encoder reads rows through the accessors and the response decoder fills
//! rows through the mutators; neither needs to know the concrete type.
//!
//! ```
//! use std::sync::OnceLock;
//!
//! use chrono::{DateTime, Utc};
//! use influxdb_rows::{InfluxRow, Schema};
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
//! ```

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};

use crate::value::{FieldKind, FieldType, Value};

/// A type that can be written to and read from InfluxDB.
pub trait InfluxRow: Default + 'static {
    /// Column mapping of this row type. Build it once and cache it.
    fn schema() -> &'static Schema<Self>;
}

/// Column mapping of a row type.
///
/// Built with [`Schema::builder`].
pub struct Schema<R> {
    timestamp: Option<TimestampBinding<R>>,
    tags: Vec<TagBinding<R>>,
    fields: Vec<FieldBinding<R>>,
    dynamic_tags: Option<MapBinding<R, String>>,
    dynamic_fields: Option<MapBinding<R, Value>>,
}

pub(crate) struct TimestampBinding<R> {
    get: fn(&R) -> Option<DateTime<Utc>>,
    set: fn(&mut R, DateTime<Utc>),
}

impl<R> TimestampBinding<R> {
    pub(crate) fn assign(&self, row: &mut R, time: DateTime<Utc>) {
        (self.set)(row, time)
    }
}

pub(crate) struct TagBinding<R> {
    name: String,
    get: fn(&R) -> Option<&str>,
    set: fn(&mut R, Option<String>),
}

impl<R> TagBinding<R> {
    pub(crate) fn assign(&self, row: &mut R, value: Option<String>) {
        (self.set)(row, value)
    }
}

type ValueGetter<R> = Box<dyn Fn(&R) -> Value + Send + Sync>;
type ValueSetter<R> = Box<dyn Fn(&mut R, Value) -> bool + Send + Sync>;

pub(crate) struct FieldBinding<R> {
    name: String,
    kind: FieldKind,
    required: bool,
    get: ValueGetter<R>,
    set: ValueSetter<R>,
}

impl<R> FieldBinding<R> {
    pub(crate) fn kind(&self) -> FieldKind {
        self.kind
    }

    pub(crate) fn is_required(&self) -> bool {
        self.required
    }

    /// Stores `value`; returns false if the member cannot hold it.
    pub(crate) fn assign(&self, row: &mut R, value: Value) -> bool {
        (self.set)(row, value)
    }
}

pub(crate) struct MapBinding<R, V> {
    get: fn(&R) -> &BTreeMap<String, V>,
    get_mut: fn(&mut R) -> &mut BTreeMap<String, V>,
}

impl<R, V> MapBinding<R, V> {
    pub(crate) fn insert(&self, row: &mut R, key: &str, value: V) {
        (self.get_mut)(row).insert(key.to_string(), value);
    }
}

/// Where a response column lands in a row.
pub(crate) enum ColumnTarget<'s, R> {
    Timestamp(&'s TimestampBinding<R>),
    Tag(&'s TagBinding<R>),
    Field(&'s FieldBinding<R>),
    DynamicField(&'s MapBinding<R, Value>),
    Ignored,
}

impl<R> Schema<R> {
    /// Start describing a row type.
    pub fn builder() -> SchemaBuilder<R> {
        SchemaBuilder {
            schema: Schema {
                timestamp: None,
                tags: Vec::new(),
                fields: Vec::new(),
                dynamic_tags: None,
                dynamic_fields: None,
            },
        }
    }

    /// True if the row type carries a timestamp member.
    pub fn has_timestamp(&self) -> bool {
        self.timestamp.is_some()
    }

    /// Names of the declared tag members, in declaration order.
    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|t| t.name.as_str())
    }

    /// Names of the declared field members, in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Declared type of a field member.
    pub fn field_kind(&self, name: &str) -> Option<FieldKind> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.kind)
    }

    pub(crate) fn required_field_names(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
    }

    pub(crate) fn timestamp_of(&self, row: &R) -> Option<DateTime<Utc>> {
        self.timestamp.as_ref().and_then(|t| (t.get)(row))
    }

    /// Non-null tags of `row`: declared members first, then the dynamic map.
    pub(crate) fn tags_of<'a>(&'a self, row: &'a R) -> Vec<(&'a str, &'a str)> {
        let mut tags: Vec<(&str, &str)> = self
            .tags
            .iter()
            .filter_map(|t| (t.get)(row).map(|v| (t.name.as_str(), v)))
            .collect();

        if let Some(dynamic) = &self.dynamic_tags {
            tags.extend((dynamic.get)(row).iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }

        tags
    }

    /// Non-null fields of `row`: declared members first, then the dynamic map.
    pub(crate) fn fields_of<'a>(&'a self, row: &'a R) -> Vec<(&'a str, Cow<'a, Value>)> {
        let mut fields: Vec<(&str, Cow<'a, Value>)> = self
            .fields
            .iter()
            .map(|f| (f.name.as_str(), Cow::<Value>::Owned((f.get)(row))))
            .filter(|(_, v)| !v.is_null())
            .collect();

        if let Some(dynamic) = &self.dynamic_fields {
            fields.extend(
                (dynamic.get)(row)
                    .iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| (k.as_str(), Cow::Borrowed(v))),
            );
        }

        fields
    }

    /// Find the member receiving the response column `column`.
    pub(crate) fn resolve(&self, column: &str) -> ColumnTarget<'_, R> {
        if column == "time" {
            if let Some(ts) = &self.timestamp {
                return ColumnTarget::Timestamp(ts);
            }
        }
        if let Some(tag) = self.tags.iter().find(|t| t.name == column) {
            return ColumnTarget::Tag(tag);
        }
        if let Some(field) = self.fields.iter().find(|f| f.name == column) {
            return ColumnTarget::Field(field);
        }
        match &self.dynamic_fields {
            Some(dynamic) if column != "time" => ColumnTarget::DynamicField(dynamic),
            _ => ColumnTarget::Ignored,
        }
    }

    /// Store a GROUP BY tag of a series on `row`.
    ///
    /// InfluxDB reports a tag the series lacks as an empty string; it is
    /// left unset.
    pub(crate) fn apply_series_tag(&self, row: &mut R, key: &str, value: &str) {
        if value.is_empty() {
            return;
        }
        if let Some(tag) = self.tags.iter().find(|t| t.name == key) {
            tag.assign(row, Some(value.to_string()));
        } else if let Some(dynamic) = &self.dynamic_tags {
            dynamic.insert(row, key, value.to_string());
        }
    }
}

impl<R> std::fmt::Debug for Schema<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("timestamp", &self.timestamp.is_some())
            .field("tags", &self.tag_names().collect::<Vec<_>>())
            .field(
                "fields",
                &self
                    .fields
                    .iter()
                    .map(|b| (b.name.as_str(), b.kind))
                    .collect::<Vec<_>>(),
            )
            .field("dynamic_tags", &self.dynamic_tags.is_some())
            .field("dynamic_fields", &self.dynamic_fields.is_some())
            .finish()
    }
}

/// Incrementally constructs a [`Schema`].
pub struct SchemaBuilder<R> {
    schema: Schema<R>,
}

impl<R: 'static> SchemaBuilder<R> {
    /// Map the `time` column.
    pub fn timestamp(
        mut self,
        get: fn(&R) -> Option<DateTime<Utc>>,
        set: fn(&mut R, DateTime<Utc>),
    ) -> Self {
        self.schema.timestamp = Some(TimestampBinding { get, set });
        self
    }

    /// Map a tag column. A `None` value is left out of the written line.
    pub fn tag(
        mut self,
        name: impl Into<String>,
        get: fn(&R) -> Option<&str>,
        set: fn(&mut R, Option<String>),
    ) -> Self {
        self.schema.tags.push(TagBinding {
            name: name.into(),
            get,
            set,
        });
        self
    }

    /// Map a nullable field column of type `T`.
    ///
    /// `T` decides how JSON numbers in this column are decoded.
    pub fn field<T: FieldType + 'static>(
        mut self,
        name: impl Into<String>,
        get: fn(&R) -> Option<T>,
        set: fn(&mut R, Option<T>),
    ) -> Self {
        self.schema.fields.push(FieldBinding {
            name: name.into(),
            kind: T::KIND,
            required: false,
            get: Box::new(move |row| get(row).map_or(Value::Null, T::into_value)),
            set: Box::new(move |row, value| {
                if value.is_null() {
                    set(row, None);
                    return true;
                }
                match T::from_value(value) {
                    Some(v) => {
                        set(row, Some(v));
                        true
                    }
                    None => false,
                }
            }),
        });
        self
    }

    /// Map a field column of type `T` that must always be present.
    ///
    /// A null in this column fails decoding with a type mismatch.
    pub fn required_field<T: FieldType + 'static>(
        mut self,
        name: impl Into<String>,
        get: fn(&R) -> T,
        set: fn(&mut R, T),
    ) -> Self {
        self.schema.fields.push(FieldBinding {
            name: name.into(),
            kind: T::KIND,
            required: true,
            get: Box::new(move |row| get(row).into_value()),
            set: Box::new(move |row, value| match T::from_value(value) {
                Some(v) => {
                    set(row, v);
                    true
                }
                None => false,
            }),
        });
        self
    }

    /// Catch-all map for tags without a declared member.
    pub fn dynamic_tags(
        mut self,
        get: fn(&R) -> &BTreeMap<String, String>,
        get_mut: fn(&mut R) -> &mut BTreeMap<String, String>,
    ) -> Self {
        self.schema.dynamic_tags = Some(MapBinding { get, get_mut });
        self
    }

    /// Catch-all map for fields and unmatched response columns.
    pub fn dynamic_fields(
        mut self,
        get: fn(&R) -> &BTreeMap<String, Value>,
        get_mut: fn(&mut R) -> &mut BTreeMap<String, Value>,
    ) -> Self {
        self.schema.dynamic_fields = Some(MapBinding { get, get_mut });
        self
    }

    /// Finish building the schema.
    pub fn build(self) -> Schema<R> {
        self.schema
    }
}

/// An untyped row: a timestamp plus ordered tag and field maps.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DynamicRow {
    /// Point in time of the row.
    pub timestamp: Option<DateTime<Utc>>,
    /// Tag name to value.
    pub tags: BTreeMap<String, String>,
    /// Field name to value.
    pub fields: BTreeMap<String, Value>,
}

impl DynamicRow {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Set a tag, replacing any existing tag of the same name.
    pub fn tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(name.into(), value.into());
        self
    }

    /// Set a field, replacing any existing field of the same name.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Get a tag value by name.
    pub fn get_tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }

    /// Get a field value by name.
    pub fn get_field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

impl InfluxRow for DynamicRow {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<DynamicRow>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::<Self>::builder()
                .timestamp(|r| r.timestamp, |r, t| r.timestamp = Some(t))
                .dynamic_tags(|r| &r.tags, |r| &mut r.tags)
                .dynamic_fields(|r| &r.fields, |r| &mut r.fields)
                .build()
        })
    }
}
