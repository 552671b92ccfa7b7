use std::fmt;

use serde::{Deserialize, Serialize};

use super::field::Field;

/// Metadata associated with structs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructTypeMeta {
    pub fields: Vec<Field>,
}

impl StructTypeMeta {
    pub fn new(fields: impl IntoIterator<Item = Field>) -> Self {
        StructTypeMeta {
            fields: fields.into_iter().collect(),
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// Metadata associated with lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListTypeMeta {
    pub datatype: Box<DataType>,
}

/// Types a column in a row may have.
///
/// Nullability is tracked on the field/attribute, not on the type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Constant null columns.
    Null,
    Boolean,
    Int32,
    Int64,
    Float64,
    Utf8,
    List(ListTypeMeta),
    Struct(StructTypeMeta),
}

impl DataType {
    pub fn list(inner: DataType) -> Self {
        DataType::List(ListTypeMeta {
            datatype: Box::new(inner),
        })
    }

    pub fn struct_type(fields: impl IntoIterator<Item = Field>) -> Self {
        DataType::Struct(StructTypeMeta::new(fields))
    }

    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int32 | Self::Int64 | Self::Float64)
    }

    pub const fn is_integer(&self) -> bool {
        matches!(self, Self::Int32 | Self::Int64)
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn try_get_struct_meta(&self) -> Option<&StructTypeMeta> {
        match self {
            Self::Struct(meta) => Some(meta),
            _ => None,
        }
    }

    /// Check if a value of type `self` can be read where `other` is expected.
    ///
    /// Struct field names are not compared, only their positions and types.
    /// The null type is compatible with everything.
    pub fn is_compatible_with(&self, other: &DataType) -> bool {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => true,
            (Self::List(a), Self::List(b)) => a.datatype.is_compatible_with(&b.datatype),
            (Self::Struct(a), Self::Struct(b)) => {
                a.fields.len() == b.fields.len()
                    && a.fields
                        .iter()
                        .zip(&b.fields)
                        .all(|(a, b)| a.datatype.is_compatible_with(&b.datatype))
            }
            (a, b) => a == b,
        }
    }

    /// Get the type two numeric inputs should be widened to before an
    /// arithmetic or comparison operation.
    pub fn common_numeric(a: &DataType, b: &DataType) -> Option<DataType> {
        Some(match (a, b) {
            (Self::Null, other) | (other, Self::Null) if other.is_numeric() => other.clone(),
            (Self::Float64, b) if b.is_numeric() => Self::Float64,
            (a, Self::Float64) if a.is_numeric() => Self::Float64,
            (Self::Int64, b) if b.is_integer() => Self::Int64,
            (a, Self::Int64) if a.is_integer() => Self::Int64,
            (Self::Int32, Self::Int32) => Self::Int32,
            _ => return None,
        })
    }

    /// Type both sides of a set operation (or a comparison) can be read as.
    pub fn common_type(a: &DataType, b: &DataType) -> Option<DataType> {
        if a == b {
            return Some(a.clone());
        }
        match (a, b) {
            (Self::Null, other) | (other, Self::Null) => Some(other.clone()),
            _ => Self::common_numeric(a, b),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean => write!(f, "boolean"),
            Self::Int32 => write!(f, "int"),
            Self::Int64 => write!(f, "bigint"),
            Self::Float64 => write!(f, "double"),
            Self::Utf8 => write!(f, "string"),
            Self::List(meta) => write!(f, "array<{}>", meta.datatype),
            Self::Struct(meta) => {
                write!(f, "struct<")?;
                for (idx, field) in meta.fields.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}:{}", field.name, field.datatype)?;
                }
                write!(f, ">")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_widening() {
        assert_eq!(
            Some(DataType::Int64),
            DataType::common_numeric(&DataType::Int32, &DataType::Int64)
        );
        assert_eq!(
            Some(DataType::Float64),
            DataType::common_numeric(&DataType::Int64, &DataType::Float64)
        );
        assert_eq!(
            None,
            DataType::common_numeric(&DataType::Utf8, &DataType::Int64)
        );
    }

    #[test]
    fn struct_compat_ignores_names() {
        let a = DataType::struct_type([
            Field::new("a", DataType::Int32, false),
            Field::new("b", DataType::Utf8, true),
        ]);
        let b = DataType::struct_type([
            Field::new("x", DataType::Int32, true),
            Field::new("y", DataType::Utf8, true),
        ]);
        assert!(a.is_compatible_with(&b));

        let c = DataType::struct_type([Field::new("x", DataType::Int32, true)]);
        assert!(!a.is_compatible_with(&c));
    }

    #[test]
    fn display_nested() {
        let dt = DataType::struct_type([
            Field::new("name", DataType::Utf8, true),
            Field::new("tags", DataType::list(DataType::Utf8), true),
        ]);
        assert_eq!("struct<name:string,tags:array<string>>", dt.to_string());
    }
}
