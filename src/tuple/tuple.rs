use std::fmt;
use std::sync::Arc;

use bytes::{Buf, BufMut};

use crate::common::{RecordId, Result, TarnError};

use super::{Schema, Value};

/// Represents a single row/tuple in a table.
///
/// A tuple holds one value per field of its schema, plus the [`RecordId`] of the
/// slot it currently occupies on disk. The record id is set by the storage layer
/// when the tuple is placed on a page and cleared when it is deleted; a freshly
/// built tuple has none.
///
/// ## Tuple Binary Format
///
/// ```text
/// +-----------+-----------+-----+-------------+
/// | Field 0   | Field 1   | ... | Field N-1   |
/// | (w0 bytes)| (w1 bytes)|     | (wN-1 bytes)|
/// +-----------+-----------+-----+-------------+
/// ```
///
/// Each field is written in schema order using its type's fixed-width
/// little-endian encoding, so the encoded size is always `schema.size()`.
#[derive(Debug, Clone)]
pub struct Tuple {
    /// The schema defining the structure of this tuple
    schema: Arc<Schema>,

    /// The values for each field (in schema order)
    values: Vec<Value>,

    /// Where the tuple lives on disk, if anywhere
    record_id: Option<RecordId>,
}

impl Tuple {
    /// Creates a new freestanding tuple with the given schema and values.
    pub fn new(schema: Arc<Schema>, values: Vec<Value>) -> Result<Self> {
        if values.len() != schema.field_count() {
            return Err(TarnError::InvalidArgument(format!(
                "expected {} values, got {}",
                schema.field_count(),
                values.len()
            )));
        }

        for (i, (value, field)) in values.iter().zip(schema.fields()).enumerate() {
            if !value.fits(field.data_type()) {
                return Err(TarnError::InvalidArgument(format!(
                    "value {} does not fit field {} of type {}",
                    value,
                    i,
                    field.data_type()
                )));
            }
        }

        Ok(Self {
            schema,
            values,
            record_id: None,
        })
    }

    /// Decodes a tuple from exactly `schema.size()` bytes.
    /// Returns None if any field fails to decode.
    pub fn from_bytes(schema: Arc<Schema>, mut data: &[u8]) -> Option<Self> {
        if data.len() != schema.size() {
            return None;
        }

        let values = schema
            .fields()
            .map(|field| Value::decode(&mut data, field.data_type()))
            .collect::<Option<Vec<_>>>()?;

        Some(Self {
            schema,
            values,
            record_id: None,
        })
    }

    /// Returns the schema of this tuple.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the value at the given field index.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the value for the given field name.
    pub fn value_by_name(&self, name: &str) -> Option<&Value> {
        self.schema
            .field_index(name)
            .and_then(|i| self.values.get(i))
    }

    /// Returns all values in this tuple.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Replaces the value at the given field index.
    pub fn set_value(&mut self, index: usize, value: Value) -> Result<()> {
        let data_type = *self.schema.field_type(index)?;
        if !value.fits(&data_type) {
            return Err(TarnError::InvalidArgument(format!(
                "value {} does not fit field {} of type {}",
                value, index, data_type
            )));
        }
        self.values[index] = value;
        Ok(())
    }

    /// Returns the number of fields/values in this tuple.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this tuple has no fields.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns where this tuple lives on disk, if it has been placed.
    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }

    /// Appends the encoded tuple to `buf`.
    pub fn write_to<B: BufMut>(&self, buf: &mut B) {
        for (value, field) in self.values.iter().zip(self.schema.fields()) {
            let encoded = value.encode(field.data_type(), buf);
            debug_assert!(encoded.is_some(), "value {} does not match its field type", value);
        }
    }

    /// Serializes the tuple to bytes for storage.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.schema.size());
        self.write_to(&mut bytes);
        bytes
    }

    /// Reads a tuple of the given schema from the front of `buf`.
    pub fn read_from<B: Buf>(schema: Arc<Schema>, buf: &mut B) -> Option<Self> {
        if buf.remaining() < schema.size() {
            return None;
        }
        let mut raw = vec![0u8; schema.size()];
        buf.copy_to_slice(&mut raw);
        Self::from_bytes(schema, &raw)
    }
}

/// Tuples compare by schema and values; where they live on disk is ignored.
impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema && self.values == other.values
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}

/// Builder for constructing tuples fluently.
pub struct TupleBuilder {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl TupleBuilder {
    /// Creates a new tuple builder for the given schema.
    pub fn new(schema: Arc<Schema>) -> Self {
        let count = schema.field_count();
        Self {
            schema,
            values: Vec::with_capacity(count),
        }
    }

    /// Appends the value for the next field.
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.values.push(value.into());
        self
    }

    /// Builds the tuple.
    pub fn build(self) -> Result<Tuple> {
        Tuple::new(self.schema, self.values)
    }
}
