//! Conversion between schema definitions and their canonical JSON wire form.
//!
//! A schema is encoded as `{"type": "record", "name": …, "fields": […]}`.
//! Scalar fields carry their wire type name directly; fixed arrays are
//! `{"type": "array", "items": <element>, "len": n}`; lists declare a
//! `heap_sz`; nested record types encode recursively; record arrays name
//! their element record in `items` and `record_type`. `units` and `is_meta`
//! appear only when set.
//!
//! Decoding is order-dependent: a record array may only reference a record
//! type declared by an earlier field. Failures abort the decode; a partially
//! built schema is never returned.

use serde_json::{Map, Value};

use crate::error::RegistryError;
use crate::schema::{FieldDef, Record, Schema};
use crate::types::ValueType;

/// Encode a schema into its canonical JSON object.
pub fn schema_to_json(schema: &Schema) -> Result<Value, RegistryError> {
    let mut fields = Vec::with_capacity(schema.card());
    for field in schema.fields() {
        fields.push(field_to_json(schema, field)?);
    }

    let mut obj = Map::new();
    obj.insert("type".to_owned(), Value::from("record"));
    obj.insert("name".to_owned(), Value::from(schema.name()));
    obj.insert("fields".to_owned(), Value::Array(fields));
    Ok(Value::Object(obj))
}

/// Decode a schema from a JSON value.
///
/// Accepts either the schema object directly or an object wrapping it under
/// a `schema` key. Requires a string `name` and a `fields` array.
pub fn schema_from_json(value: &Value) -> Result<Schema, RegistryError> {
    let obj = value
        .as_object()
        .ok_or_else(|| RegistryError::invalid_format("schema must be a JSON object"))?;
    let obj = match obj.get("schema") {
        Some(inner) => inner
            .as_object()
            .ok_or_else(|| RegistryError::invalid_format("`schema` key must hold an object"))?,
        None => obj,
    };

    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| RegistryError::invalid_format("schema requires a string `name`"))?;
    let fields = obj
        .get("fields")
        .and_then(Value::as_array)
        .ok_or_else(|| RegistryError::invalid_format("schema requires a `fields` array"))?;

    let mut schema = Schema::new(name);
    for field in fields {
        add_field_from_json(&mut schema, field)?;
    }
    Ok(schema)
}

fn field_to_json(schema: &Schema, field: &FieldDef) -> Result<Value, RegistryError> {
    let mut obj = Map::new();
    obj.insert("name".to_owned(), Value::from(field.name()));

    match field.value_type() {
        vt if vt.is_scalar() => {
            obj.insert("type".to_owned(), Value::from(vt.wire_name()?));
        }
        vt if vt.is_scalar_array() => {
            obj.insert("type".to_owned(), Value::from("array"));
            obj.insert("items".to_owned(), Value::from(vt.wire_name()?));
            obj.insert("len".to_owned(), Value::from(field.count()));
        }
        ValueType::List => {
            obj.insert("type".to_owned(), Value::from("list"));
            obj.insert("heap_sz".to_owned(), Value::from(field.count()));
        }
        ValueType::RecordType => {
            let record = field
                .record_index()
                .and_then(|idx| schema.record(idx))
                .expect("record fields always reference an arena entry");
            // units / is_meta are not attached to a record-type field.
            return record_to_json(schema, record);
        }
        ValueType::RecordArray => {
            let record = field
                .record_index()
                .and_then(|idx| schema.record(idx))
                .expect("record-array fields always reference an arena entry");
            obj.insert("type".to_owned(), Value::from("array"));
            obj.insert("items".to_owned(), Value::from(record.name()));
            obj.insert("len".to_owned(), Value::from(field.count()));
            obj.insert("record_type".to_owned(), Value::from(record.name()));
        }
        other => return Err(RegistryError::InvalidType(other.to_string())),
    }

    if let Some(units) = field.units() {
        obj.insert("units".to_owned(), Value::from(units));
    }
    if field.is_meta() {
        obj.insert("is_meta".to_owned(), Value::from(true));
    }

    Ok(Value::Object(obj))
}

fn record_to_json(schema: &Schema, record: &Record) -> Result<Value, RegistryError> {
    let mut members = Vec::with_capacity(record.card());
    for member in record.fields() {
        members.push(field_to_json(schema, member)?);
    }

    let mut obj = Map::new();
    obj.insert("name".to_owned(), Value::from(record.name()));
    obj.insert("type".to_owned(), Value::from("record"));
    obj.insert("fields".to_owned(), Value::Array(members));
    Ok(Value::Object(obj))
}

/// The wire type of one field object, resolved against the catalog and the
/// records the enclosing schema has declared so far.
enum ResolvedType {
    Scalar(ValueType),
    Array(ValueType, u32),
    List { heap_sz: u32 },
    Record,
    RecordArray { record_name: String, len: u32 },
}

fn resolve_field_type(
    schema: &Schema,
    obj: &Map<String, Value>,
) -> Result<ResolvedType, RegistryError> {
    let type_name = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| RegistryError::invalid_format("field requires a string `type`"))?;

    if type_name == "array" {
        let items = obj
            .get("items")
            .and_then(Value::as_str)
            .ok_or_else(|| RegistryError::invalid_format("array field requires a string `items`"))?;
        let len = u32_key(obj, "len")?;

        return match ValueType::from_wire(items) {
            Ok(ValueType::RecordType) => {
                // `items: "record"` carries the element record in `record_type`.
                let record_name = obj
                    .get("record_type")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        RegistryError::invalid_format(
                            "record array requires a string `record_type`",
                        )
                    })?;
                Ok(ResolvedType::RecordArray {
                    record_name: record_name.to_owned(),
                    len,
                })
            }
            Ok(element) => match element.promote_to_array() {
                Some(array) => Ok(ResolvedType::Array(array, len)),
                None => Err(RegistryError::invalid_format(format!(
                    "`{items}` is not a valid array element type"
                ))),
            },
            Err(err) => {
                // `items` may instead name a record declared earlier.
                let record_name = obj
                    .get("record_type")
                    .and_then(Value::as_str)
                    .unwrap_or(items);
                if obj.contains_key("record_type")
                    || schema.record_index_by_name(record_name).is_some()
                {
                    Ok(ResolvedType::RecordArray {
                        record_name: record_name.to_owned(),
                        len,
                    })
                } else {
                    Err(err)
                }
            }
        };
    }

    match ValueType::from_wire(type_name)? {
        ValueType::List => Ok(ResolvedType::List {
            heap_sz: u32_key(obj, "heap_sz")?,
        }),
        ValueType::RecordType => Ok(ResolvedType::Record),
        vt if vt.is_scalar() => Ok(ResolvedType::Scalar(vt)),
        other => Err(RegistryError::invalid_format(format!(
            "`{other}` cannot appear as a field type"
        ))),
    }
}

fn add_field_from_json(schema: &mut Schema, value: &Value) -> Result<(), RegistryError> {
    let obj = value
        .as_object()
        .ok_or_else(|| RegistryError::invalid_format("field must be a JSON object"))?;
    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| RegistryError::invalid_format("field requires a string `name`"))?;
    let units = obj.get("units").and_then(Value::as_str);
    let is_meta = obj.get("is_meta").and_then(Value::as_bool).unwrap_or(false);

    match resolve_field_type(schema, obj)? {
        ResolvedType::Scalar(vt) => {
            if is_meta {
                schema.add_meta(name, units, vt)?;
            } else {
                schema.add_metric(name, units, vt)?;
            }
        }
        ResolvedType::Array(vt, len) => {
            if is_meta {
                schema.add_meta_array(name, units, vt, len)?;
            } else {
                schema.add_array(name, units, vt, len)?;
            }
        }
        ResolvedType::List { heap_sz } => {
            schema.add_list(name, units, heap_sz)?;
        }
        ResolvedType::Record => {
            let members = obj.get("fields").and_then(Value::as_array).ok_or_else(|| {
                RegistryError::invalid_format("record field requires a `fields` array")
            })?;
            let record = record_from_json(name, members)?;
            schema.add_record(record)?;
        }
        ResolvedType::RecordArray { record_name, len } => {
            let index = schema.record_index_by_name(&record_name).ok_or_else(|| {
                RegistryError::invalid_format(format!(
                    "record type `{record_name}` is not defined by an earlier field"
                ))
            })?;
            schema.add_record_array(name, index, len)?;
        }
    }

    Ok(())
}

fn record_from_json(name: &str, members: &[Value]) -> Result<Record, RegistryError> {
    let mut record = Record::new(name);
    for value in members {
        let obj = value
            .as_object()
            .ok_or_else(|| RegistryError::invalid_format("record member must be a JSON object"))?;
        let member_name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RegistryError::invalid_format("record member requires a string `name`"))?;
        let units = obj.get("units").and_then(Value::as_str);
        let type_name = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| RegistryError::invalid_format("record member requires a string `type`"))?;

        let (value_type, count) = if type_name == "array" {
            let items = obj.get("items").and_then(Value::as_str).ok_or_else(|| {
                RegistryError::invalid_format("array member requires a string `items`")
            })?;
            let len = u32_key(obj, "len")?;
            let array = ValueType::from_wire(items)?
                .promote_to_array()
                .filter(|a| a.is_scalar_array())
                .ok_or_else(|| {
                    RegistryError::invalid_format(format!(
                        "record member `{member_name}` may not be an array of `{items}`"
                    ))
                })?;
            (array, len)
        } else {
            let vt = ValueType::from_wire(type_name)?;
            if !vt.is_scalar() {
                return Err(RegistryError::invalid_format(format!(
                    "record member `{member_name}` must be a scalar or a scalar array"
                )));
            }
            (vt, 1)
        };

        record.add_member(member_name, units, value_type, count)?;
    }
    Ok(record)
}

fn u32_key(obj: &Map<String, Value>, key: &str) -> Result<u32, RegistryError> {
    obj.get(key)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| {
            RegistryError::invalid_format(format!("field requires an unsigned integer `{key}`"))
        })
}
