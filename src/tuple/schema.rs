use std::fmt;
use std::sync::Arc;

use crate::common::{Result, TarnError};

use super::DataType;

/// A single field of a tuple schema: a type and an optional name.
#[derive(Debug, Clone)]
pub struct Field {
    data_type: DataType,
    name: Option<String>,
}

impl Field {
    /// Creates a named field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            data_type,
            name: Some(name.into()),
        }
    }

    /// Creates a field without a name.
    pub fn unnamed(data_type: DataType) -> Self {
        Self {
            data_type,
            name: None,
        }
    }

    /// Returns the field name, if it has one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the field data type.
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Returns the number of bytes this field occupies in a tuple.
    pub fn size(&self) -> usize {
        self.data_type.size()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name.as_deref().unwrap_or("null"), self.data_type)
    }
}

/// Describes the layout of every tuple in a table.
///
/// A schema is a non-empty, immutable, ordered list of fields. All fields are
/// fixed width, so every tuple of the schema serializes to exactly
/// [`Schema::size`] bytes. Two schemas are equal when their field types line up
/// position by position; names do not take part in equality.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Ordered list of fields
    fields: Vec<Field>,

    /// Sum of the field widths
    size: usize,
}

impl Schema {
    /// Creates a new schema from a list of fields.
    pub fn new(fields: Vec<Field>) -> Result<Self> {
        if fields.is_empty() {
            return Err(TarnError::InvalidArgument(
                "schema must have at least one field".into(),
            ));
        }

        let size = fields.iter().map(Field::size).sum();
        Ok(Self { fields, size })
    }

    /// Creates a schema of unnamed fields from a list of types.
    pub fn from_types(types: &[DataType]) -> Result<Self> {
        Self::new(types.iter().copied().map(Field::unnamed).collect())
    }

    /// Creates a schema builder for fluent construction.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Concatenates two schemas, fields of `first` before fields of `second`.
    pub fn merge(first: &Schema, second: &Schema) -> Schema {
        let mut fields = first.fields.clone();
        fields.extend(second.fields.iter().cloned());
        Schema {
            size: first.size + second.size,
            fields,
        }
    }

    /// Returns the number of fields in the schema.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Returns the field at the given index.
    pub fn field(&self, index: usize) -> Result<&Field> {
        self.fields
            .get(index)
            .ok_or(TarnError::FieldIndexOutOfRange {
                index,
                len: self.fields.len(),
            })
    }

    /// Returns the name of the field at the given index.
    pub fn field_name(&self, index: usize) -> Result<Option<&str>> {
        self.field(index).map(Field::name)
    }

    /// Returns the type of the field at the given index.
    pub fn field_type(&self, index: usize) -> Result<&DataType> {
        self.field(index).map(Field::data_type)
    }

    /// Returns the index of the first field with the given name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == Some(name))
    }

    /// Returns an iterator over all fields.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Returns the size in bytes of one tuple of this schema.
    pub fn size(&self) -> usize {
        self.size
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|(a, b)| a.data_type == b.data_type)
    }
}

impl Eq for Schema {}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", field)?;
        }
        Ok(())
    }
}

/// Builder for constructing schemas fluently.
pub struct SchemaBuilder {
    fields: Vec<Field>,
}

impl SchemaBuilder {
    /// Creates a new schema builder.
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Adds a named field.
    pub fn field(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.fields.push(Field::new(name, data_type));
        self
    }

    /// Adds an unnamed field.
    pub fn unnamed(mut self, data_type: DataType) -> Self {
        self.fields.push(Field::unnamed(data_type));
        self
    }

    /// Builds the schema.
    pub fn build(self) -> Result<Schema> {
        Schema::new(self.fields)
    }

    /// Builds the schema wrapped in an Arc for shared ownership.
    pub fn build_arc(self) -> Result<Arc<Schema>> {
        self.build().map(Arc::new)
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
