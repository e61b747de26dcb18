//! In-memory schema and record definitions.
//!
//! A [`Schema`] owns an ordered field list plus an arena of [`Record`]
//! definitions. Record-type fields and record-array fields refer to arena
//! entries by index, so a record can be defined once and referenced by any
//! number of array fields.

use sha1::{Digest as _, Sha1};
use thiserror::Error;

use crate::digest::Digest;
use crate::types::ValueType;

/// Errors reported by the schema builder operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// Field names must be non-empty.
    #[error("field name must not be empty")]
    EmptyName,

    /// Field names are unique within their schema or record.
    #[error("duplicate field name: {0}")]
    DuplicateField(String),

    /// The value type is not allowed for this kind of field.
    #[error("{value_type} is not valid for a {expected} field")]
    InvalidFieldType {
        /// The type that was supplied.
        value_type: ValueType,
        /// What the operation expected.
        expected: &'static str,
    },

    /// A record index did not name a record in this schema.
    #[error("no record at index {0}")]
    InvalidRecordIndex(usize),
}

/// One named, typed slot within a schema or record definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    name: String,
    units: Option<String>,
    value_type: ValueType,
    is_meta: bool,
    count: u32,
    record: Option<usize>,
}

impl FieldDef {
    fn new(name: &str, units: Option<&str>, value_type: ValueType, count: u32) -> Self {
        Self {
            name: name.to_owned(),
            units: units.filter(|u| !u.is_empty()).map(str::to_owned),
            value_type,
            is_meta: false,
            count,
            record: None,
        }
    }

    /// The field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The unit string, if one was declared.
    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    /// The field's value type.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Whether this field is metadata rather than sampled data.
    pub fn is_meta(&self) -> bool {
        self.is_meta
    }

    /// Element count for arrays, heap size in bytes for lists, member count
    /// for record types, 1 for scalars.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Arena index of the referenced record, for record-type and
    /// record-array fields.
    pub fn record_index(&self) -> Option<usize> {
        self.record
    }
}

/// A named, self-contained ordered sequence of field definitions describing
/// the shape of one structured value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    name: String,
    fields: Vec<FieldDef>,
}

impl Record {
    /// Create an empty record definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// The record's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The record's members, in definition order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Number of members.
    pub fn card(&self) -> usize {
        self.fields.len()
    }

    /// Add a member of scalar or scalar-array type.
    ///
    /// `count` is the element count for array members and is ignored for
    /// scalars. Returns the member index.
    pub fn add_member(
        &mut self,
        name: &str,
        units: Option<&str>,
        value_type: ValueType,
        count: u32,
    ) -> Result<usize, SchemaError> {
        check_name(name, &self.fields)?;
        let count = if value_type.is_scalar() {
            1
        } else if value_type.is_scalar_array() {
            count
        } else {
            return Err(SchemaError::InvalidFieldType {
                value_type,
                expected: "record member",
            });
        };
        self.fields.push(FieldDef::new(name, units, value_type, count));
        Ok(self.fields.len() - 1)
    }
}

/// A named, ordered collection of field definitions describing a metric
/// set's structure. Insertion order is wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    name: String,
    fields: Vec<FieldDef>,
    records: Vec<Record>,
}

fn check_name(name: &str, fields: &[FieldDef]) -> Result<(), SchemaError> {
    if name.is_empty() {
        return Err(SchemaError::EmptyName);
    }
    if fields.iter().any(|f| f.name == name) {
        return Err(SchemaError::DuplicateField(name.to_owned()));
    }
    Ok(())
}

impl Schema {
    /// Create an empty schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            records: Vec::new(),
        }
    }

    /// The schema's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The schema's fields, in definition order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Number of fields.
    pub fn card(&self) -> usize {
        self.fields.len()
    }

    /// The record definition at `index` in the record arena.
    pub fn record(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    /// Resolve a record-type field by name to its arena index.
    pub fn record_index_by_name(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .find(|f| f.value_type == ValueType::RecordType && f.name == name)
            .and_then(|f| f.record)
    }

    /// Add a scalar data metric. Returns the field index.
    pub fn add_metric(
        &mut self,
        name: &str,
        units: Option<&str>,
        value_type: ValueType,
    ) -> Result<usize, SchemaError> {
        self.push_scalar(name, units, value_type, false)
    }

    /// Add a scalar metadata metric. Returns the field index.
    pub fn add_meta(
        &mut self,
        name: &str,
        units: Option<&str>,
        value_type: ValueType,
    ) -> Result<usize, SchemaError> {
        self.push_scalar(name, units, value_type, true)
    }

    fn push_scalar(
        &mut self,
        name: &str,
        units: Option<&str>,
        value_type: ValueType,
        is_meta: bool,
    ) -> Result<usize, SchemaError> {
        check_name(name, &self.fields)?;
        if !value_type.is_scalar() {
            return Err(SchemaError::InvalidFieldType {
                value_type,
                expected: "scalar",
            });
        }
        let mut field = FieldDef::new(name, units, value_type, 1);
        field.is_meta = is_meta;
        self.fields.push(field);
        Ok(self.fields.len() - 1)
    }

    /// Add a fixed-length data array of `count` elements. `value_type` is
    /// the array variant (e.g. [`ValueType::U32Array`]). Returns the field
    /// index.
    pub fn add_array(
        &mut self,
        name: &str,
        units: Option<&str>,
        value_type: ValueType,
        count: u32,
    ) -> Result<usize, SchemaError> {
        self.push_array(name, units, value_type, count, false)
    }

    /// Add a fixed-length metadata array. Returns the field index.
    pub fn add_meta_array(
        &mut self,
        name: &str,
        units: Option<&str>,
        value_type: ValueType,
        count: u32,
    ) -> Result<usize, SchemaError> {
        self.push_array(name, units, value_type, count, true)
    }

    fn push_array(
        &mut self,
        name: &str,
        units: Option<&str>,
        value_type: ValueType,
        count: u32,
        is_meta: bool,
    ) -> Result<usize, SchemaError> {
        check_name(name, &self.fields)?;
        if !value_type.is_scalar_array() {
            return Err(SchemaError::InvalidFieldType {
                value_type,
                expected: "array",
            });
        }
        let mut field = FieldDef::new(name, units, value_type, count);
        field.is_meta = is_meta;
        self.fields.push(field);
        Ok(self.fields.len() - 1)
    }

    /// Add a heap-backed list field with `heap_sz` bytes of declared heap.
    /// Returns the field index.
    pub fn add_list(
        &mut self,
        name: &str,
        units: Option<&str>,
        heap_sz: u32,
    ) -> Result<usize, SchemaError> {
        check_name(name, &self.fields)?;
        self.fields
            .push(FieldDef::new(name, units, ValueType::List, heap_sz));
        Ok(self.fields.len() - 1)
    }

    /// Register `record` as a record-type field of this schema, which takes
    /// ownership of it. Returns the record's arena index, for use with
    /// [`add_record_array`](Schema::add_record_array).
    pub fn add_record(&mut self, record: Record) -> Result<usize, SchemaError> {
        check_name(&record.name, &self.fields)?;
        let mut field = FieldDef::new(
            &record.name,
            None,
            ValueType::RecordType,
            record.card() as u32,
        );
        let index = self.records.len();
        field.record = Some(index);
        self.fields.push(field);
        self.records.push(record);
        Ok(index)
    }

    /// Add a fixed-length array of `count` instances of the record at arena
    /// index `record`. Returns the field index.
    pub fn add_record_array(
        &mut self,
        name: &str,
        record: usize,
        count: u32,
    ) -> Result<usize, SchemaError> {
        check_name(name, &self.fields)?;
        if record >= self.records.len() {
            return Err(SchemaError::InvalidRecordIndex(record));
        }
        let mut field = FieldDef::new(name, None, ValueType::RecordArray, count);
        field.record = Some(record);
        self.fields.push(field);
        Ok(self.fields.len() - 1)
    }

    /// The schema's structural content digest.
    ///
    /// Computed over the schema name and, per field in order, the field name
    /// and its numeric type tag, recursing into record definitions. Unit
    /// strings, lengths and the metadata flag do not contribute: two schemas
    /// with the same shape hash identically regardless of annotation.
    pub fn digest(&self) -> Digest {
        let mut hasher = Sha1::new();
        hasher.update(self.name.as_bytes());
        for field in &self.fields {
            hasher.update(field.name.as_bytes());
            hasher.update(field.value_type.code().to_le_bytes());
            if field.value_type == ValueType::RecordType {
                if let Some(record) = field.record.and_then(|i| self.records.get(i)) {
                    for member in &record.fields {
                        hasher.update(member.name.as_bytes());
                        hasher.update(member.value_type.code().to_le_bytes());
                    }
                }
            }
        }
        let bytes: [u8; 20] = hasher.finalize().into();
        Digest::from(bytes)
    }
}
