//! Record mapping: static schema descriptors and the [`Record`] trait.
//!
//! Schemas are declared as `static` data and checked once when a
//! repository is built, so a bad mapping fails at startup instead of in
//! the middle of a write.

use chrono::NaiveDateTime;

use crate::error::NadoError;
use crate::results::Row;
use crate::snowflake;
use crate::types::SqlValue;

/// Static metadata for one mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMeta {
    pub name: &'static str,
    /// Upper bound on the stringified value length.
    pub length: usize,
    /// Reject NULL for this field before writing.
    pub required: bool,
    /// Whether the field maps to a real column. Transient fields travel
    /// with the record but are never written or selected.
    pub exists: bool,
}

impl FieldMeta {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        FieldMeta {
            name,
            length: 64,
            required: false,
            exists: true,
        }
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub const fn length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    /// Mark the field as carried on the record but not persisted.
    #[must_use]
    pub const fn transient(mut self) -> Self {
        self.exists = false;
        self
    }
}

/// The five base columns every managed record carries, in column order.
/// Schemas list these ahead of their own fields.
pub const BASE_FIELDS: [FieldMeta; 5] = [
    FieldMeta::new("id").length(20),
    FieldMeta::new("version").required().length(11),
    FieldMeta::new("deleted").required().length(4),
    FieldMeta::new("create_time").length(20),
    FieldMeta::new("modify_time").length(20),
];

/// Static description of a mapped table.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub table: &'static str,
    pub primary_key: &'static str,
    pub fields: &'static [FieldMeta],
}

impl TableSchema {
    /// Registration-time sanity check.
    ///
    /// # Errors
    ///
    /// `MappingError` for an empty table name, a primary key that is not
    /// a persisted field, or duplicate field names.
    pub fn check(&self) -> Result<(), NadoError> {
        if self.table.is_empty() {
            return Err(NadoError::MappingError(
                "table name must not be empty".to_string(),
            ));
        }
        let pk_ok = self
            .fields
            .iter()
            .any(|f| f.name == self.primary_key && f.exists);
        if !pk_ok {
            return Err(NadoError::MappingError(format!(
                "primary key {} is not a persisted field of {}",
                self.primary_key, self.table
            )));
        }
        for (i, f) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|other| other.name == f.name) {
                return Err(NadoError::MappingError(format!(
                    "duplicate field {} in schema for {}",
                    f.name, self.table
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Persisted fields only, schema order.
    pub fn existing_fields(&self) -> impl Iterator<Item = &FieldMeta> {
        self.fields.iter().filter(|f| f.exists)
    }
}

/// The base columns shared by all managed records: surrogate id,
/// optimistic-lock version, soft-delete flag, and audit timestamps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseRecord {
    pub id: Option<i64>,
    pub version: i64,
    pub deleted: bool,
    pub create_time: Option<NaiveDateTime>,
    pub modify_time: Option<NaiveDateTime>,
}

impl BaseRecord {
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Fill `id` from the process-wide snowflake generator, spinning
    /// through tick exhaustion. Records with an id keep it.
    pub fn assign_id(&mut self) {
        if self.id.is_none() {
            self.id = Some(snowflake::next_id_blocking());
        }
    }

    /// The base columns as row values, in [`BASE_FIELDS`] order.
    #[must_use]
    pub fn base_row(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("id", self.id.into()),
            ("version", SqlValue::Int(self.version)),
            ("deleted", SqlValue::Int(i64::from(self.deleted))),
            ("create_time", self.create_time.into()),
            ("modify_time", self.modify_time.into()),
        ]
    }

    /// Read the base columns back out of a result row. Missing columns
    /// fall back to defaults so partial selects still map.
    #[must_use]
    pub fn from_row(row: &Row) -> BaseRecord {
        BaseRecord {
            id: row.get("id").and_then(|v| v.as_int()).copied(),
            version: row
                .get("version")
                .and_then(|v| v.as_int())
                .copied()
                .unwrap_or(0),
            deleted: row
                .get("deleted")
                .and_then(|v| v.as_int())
                .copied()
                .unwrap_or(0)
                != 0,
            create_time: row.get("create_time").and_then(SqlValue::as_timestamp),
            modify_time: row.get("modify_time").and_then(SqlValue::as_timestamp),
        }
    }
}

/// A struct mapped to a table, carrying [`BaseRecord`] plus its own
/// fields.
///
/// `to_row` yields every schema field in schema order (persisted and
/// transient alike); repositories filter on the schema when building
/// statements.
pub trait Record: Sized + Send {
    /// Static schema; checked once at repository construction.
    fn schema() -> &'static TableSchema;

    fn base(&self) -> &BaseRecord;

    fn base_mut(&mut self) -> &mut BaseRecord;

    /// All schema fields as name/value pairs, in schema order.
    fn to_row(&self) -> Vec<(&'static str, SqlValue)>;

    /// Rebuild a record from a result row.
    ///
    /// # Errors
    ///
    /// `MappingError` when the row cannot be converted.
    fn from_row(row: &Row) -> Result<Self, NadoError>;

    /// Check this record's values against the schema.
    ///
    /// # Errors
    ///
    /// `ValidationError` naming the offending field.
    fn validate(&self) -> Result<(), NadoError> {
        validate_row(Self::schema(), &self.to_row())
    }
}

/// Validate a row against a schema: stringified scalar values must fit
/// the declared length, and required persisted fields must not be NULL.
/// Zero and empty values skip the length check.
///
/// # Errors
///
/// `ValidationError` naming the field; `MappingError` for a field the
/// schema does not know.
pub fn validate_row(
    schema: &TableSchema,
    row: &[(&'static str, SqlValue)],
) -> Result<(), NadoError> {
    for (name, value) in row {
        let Some(meta) = schema.field(name) else {
            return Err(NadoError::MappingError(format!(
                "field {} is not in the schema for {}",
                name, schema.table
            )));
        };
        let rendered_len = match value {
            SqlValue::Text(s) if !s.is_empty() => Some(s.chars().count()),
            SqlValue::Int(i) if *i != 0 => Some(i.to_string().len()),
            SqlValue::Float(f) if *f != 0.0 => Some(f.to_string().len()),
            SqlValue::Decimal(d) => Some(d.len()),
            SqlValue::Bool(true) => Some(1),
            _ => None,
        };
        if let Some(len) = rendered_len {
            if len > meta.length {
                return Err(NadoError::ValidationError(format!(
                    "[{name}] length out of bounds"
                )));
            }
        }
        if meta.exists && meta.required && value.is_null() {
            return Err(NadoError::ValidationError(format!(
                "[{name}] must not be null"
            )));
        }
    }
    Ok(())
}
