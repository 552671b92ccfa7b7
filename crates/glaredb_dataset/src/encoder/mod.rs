//! Conversion between domain values and rows.
//!
//! A type describes its row layout through [`Encodable::shape`]. Encoders for
//! a type then move through three stages:
//!
//! - [`UnresolvedEncoder`]: the type's shape, not tied to any plan.
//! - [`ResolvedEncoder`]: the shape matched against the output attributes of
//!   a plan, with counts and types checked.
//! - [`BoundEncoder`]: the matched attributes turned into ordinals of the
//!   physical row, ready to decode rows.

pub mod bound;
pub mod product;
pub mod resolved;
pub mod unresolved;

pub use bound::BoundEncoder;
pub use resolved::ResolvedEncoder;
pub use unresolved::UnresolvedEncoder;

use crate::arrays::datatype::DataType;
use crate::arrays::field::Field;
use crate::arrays::row::Row;
use crate::arrays::scalar::ScalarValue;
use crate::errors::{Result, execution};

/// Row layout of an encodable type.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// A single column. Binds positionally to a single attribute.
    Flat(Field),
    /// One column per named member. Binds by name. Members that aren't flat
    /// are nested structs.
    Product(Vec<Field>),
    /// Any number of columns of any type, bound positionally.
    Dynamic,
}

impl Shape {
    /// Number of columns, if known.
    pub fn width(&self) -> Option<usize> {
        match self {
            Self::Flat(_) => Some(1),
            Self::Product(fields) => Some(fields.len()),
            Self::Dynamic => None,
        }
    }
}

/// Types that can be stored in a dataset.
///
/// Implemented for primitives, `Option`, `Vec`, tuples and [`Row`]. Structs
/// can implement it with the [`product_encoder`](crate::product_encoder)
/// macro.
pub trait Encodable: Sized + Send + Sync + 'static {
    fn shape() -> Shape;

    /// Encode into one value per column of the shape.
    fn encode(&self) -> Vec<ScalarValue>;

    /// Decode from one value per column of the shape.
    fn decode(values: Vec<ScalarValue>) -> Result<Self>;

    fn is_flat() -> bool {
        matches!(Self::shape(), Shape::Flat(_))
    }

    /// Type of this value when stored as a single nested column.
    ///
    /// Returns `None` for dynamic shapes which can nest any struct.
    fn nested_datatype() -> Option<DataType> {
        match Self::shape() {
            Shape::Flat(field) => Some(field.datatype),
            Shape::Product(fields) => Some(DataType::struct_type(fields)),
            Shape::Dynamic => None,
        }
    }

    fn nested_nullable() -> bool {
        match Self::shape() {
            Shape::Flat(field) => field.nullable,
            _ => false,
        }
    }

    /// Encode as a single value, a struct for anything that isn't flat.
    fn encode_nested(&self) -> ScalarValue {
        let mut values = self.encode();
        if Self::is_flat() && values.len() == 1 {
            values.pop().unwrap_or(ScalarValue::Null)
        } else {
            ScalarValue::Struct(values)
        }
    }

    fn decode_nested(value: ScalarValue) -> Result<Self> {
        if Self::is_flat() {
            return Self::decode(vec![value]);
        }
        match value {
            ScalarValue::Struct(values) => Self::decode(values),
            other => Err(execution!(
                "Expected struct value to decode {}, got '{other}'",
                std::any::type_name::<Self>()
            )),
        }
    }
}

/// Check if values of type `from` can be read as `to` without losing
/// information.
pub fn can_up_cast(from: &DataType, to: &DataType) -> bool {
    match (from, to) {
        (a, b) if a == b => true,
        (DataType::Null, _) => true,
        (DataType::Int32, DataType::Int64 | DataType::Float64) => true,
        (DataType::Int64, DataType::Float64) => true,
        (DataType::List(a), DataType::List(b)) => can_up_cast(&a.datatype, &b.datatype),
        // Members with a dynamic shape nest as an empty struct, which takes
        // any struct.
        (DataType::Struct(_), DataType::Struct(b)) if b.fields.is_empty() => true,
        (DataType::Struct(a), DataType::Struct(b)) => {
            a.fields.len() == b.fields.len()
                && a.fields
                    .iter()
                    .zip(&b.fields)
                    .all(|(a, b)| can_up_cast(&a.datatype, &b.datatype))
        }
        _ => false,
    }
}

fn single_value<T>(values: Vec<ScalarValue>) -> Result<ScalarValue> {
    let mut iter = values.into_iter();
    match (iter.next(), iter.next()) {
        (Some(v), None) => Ok(v),
        _ => Err(execution!(
            "Expected exactly one value to decode {}",
            std::any::type_name::<T>()
        )),
    }
}

fn unexpected<T>(value: &ScalarValue) -> crate::errors::DatasetError {
    if value.is_null() {
        execution!(
            "Null value appeared in non-nullable field of type {}",
            std::any::type_name::<T>()
        )
    } else {
        execution!(
            "Cannot decode '{value}' as {}",
            std::any::type_name::<T>()
        )
    }
}

macro_rules! impl_flat_encodable {
    ($ty:ty, $datatype:expr, |$v:ident| $decode:expr) => {
        impl Encodable for $ty {
            fn shape() -> Shape {
                Shape::Flat(Field::new("value", $datatype, false))
            }

            fn encode(&self) -> Vec<ScalarValue> {
                vec![ScalarValue::from(self.clone())]
            }

            fn decode(values: Vec<ScalarValue>) -> Result<Self> {
                let $v = single_value::<Self>(values)?;
                $decode
            }
        }
    };
}

impl_flat_encodable!(bool, DataType::Boolean, |v| match v {
    ScalarValue::Boolean(b) => Ok(b),
    other => Err(unexpected::<bool>(&other)),
});

impl_flat_encodable!(i32, DataType::Int32, |v| match v {
    ScalarValue::Int32(i) => Ok(i),
    ScalarValue::Int64(i) => i32::try_from(i).map_err(|_| execution!("{i} out of range for i32")),
    other => Err(unexpected::<i32>(&other)),
});

impl_flat_encodable!(i64, DataType::Int64, |v| match v {
    ScalarValue::Int32(i) => Ok(i as i64),
    ScalarValue::Int64(i) => Ok(i),
    other => Err(unexpected::<i64>(&other)),
});

impl_flat_encodable!(f64, DataType::Float64, |v| match v {
    ScalarValue::Int32(i) => Ok(i as f64),
    ScalarValue::Int64(i) => Ok(i as f64),
    ScalarValue::Float64(f) => Ok(f),
    other => Err(unexpected::<f64>(&other)),
});

impl_flat_encodable!(String, DataType::Utf8, |v| match v {
    ScalarValue::Utf8(s) => Ok(s),
    other => Err(unexpected::<String>(&other)),
});

impl<T: Encodable> Encodable for Option<T> {
    fn shape() -> Shape {
        match T::shape() {
            Shape::Flat(field) => Shape::Flat(Field {
                nullable: true,
                ..field
            }),
            Shape::Product(fields) => Shape::Product(
                fields
                    .into_iter()
                    .map(|f| Field {
                        nullable: true,
                        ..f
                    })
                    .collect(),
            ),
            Shape::Dynamic => Shape::Dynamic,
        }
    }

    fn encode(&self) -> Vec<ScalarValue> {
        match self {
            Some(v) => v.encode(),
            None => vec![ScalarValue::Null; T::shape().width().unwrap_or(0)],
        }
    }

    /// All null values decode to `None`.
    fn decode(values: Vec<ScalarValue>) -> Result<Self> {
        if values.iter().all(|v| v.is_null()) {
            return Ok(None);
        }
        T::decode(values).map(Some)
    }

    fn nested_nullable() -> bool {
        true
    }

    fn encode_nested(&self) -> ScalarValue {
        match self {
            Some(v) => v.encode_nested(),
            None => ScalarValue::Null,
        }
    }

    /// Null and structs of only nulls decode to `None`, the latter being
    /// what the missing side of an outer join produces.
    fn decode_nested(value: ScalarValue) -> Result<Self> {
        match value {
            ScalarValue::Null => Ok(None),
            ScalarValue::Struct(values) if values.iter().all(|v| v.is_null()) => Ok(None),
            other => T::decode_nested(other).map(Some),
        }
    }
}

impl<T: Encodable> Encodable for Vec<T> {
    fn shape() -> Shape {
        let inner = T::nested_datatype().unwrap_or(DataType::Null);
        Shape::Flat(Field::new("value", DataType::list(inner), false))
    }

    fn encode(&self) -> Vec<ScalarValue> {
        vec![ScalarValue::List(
            self.iter().map(|v| v.encode_nested()).collect(),
        )]
    }

    fn decode(values: Vec<ScalarValue>) -> Result<Self> {
        match single_value::<Self>(values)? {
            ScalarValue::List(vals) => vals.into_iter().map(T::decode_nested).collect(),
            other => Err(unexpected::<Self>(&other)),
        }
    }
}

impl Encodable for Row {
    fn shape() -> Shape {
        Shape::Dynamic
    }

    fn encode(&self) -> Vec<ScalarValue> {
        self.values().to_vec()
    }

    fn decode(values: Vec<ScalarValue>) -> Result<Self> {
        Ok(Row::new(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_round_trip() {
        assert_eq!(42, i32::decode(42.encode()).unwrap());
        assert_eq!("a".to_string(), String::decode("a".to_string().encode()).unwrap());
        assert_eq!(Some(1.5), Option::<f64>::decode(Some(1.5).encode()).unwrap());
        assert_eq!(None, Option::<i64>::decode(None::<i64>.encode()).unwrap());
        assert_eq!(
            vec![Some(1), None],
            Vec::<Option<i32>>::decode(vec![Some(1), None].encode()).unwrap()
        );
    }

    #[test]
    fn null_into_non_nullable() {
        let err = i32::decode(vec![ScalarValue::Null]).unwrap_err();
        assert!(err.is_execution());
        assert!(err.message().contains("Null value"));
    }

    #[test]
    fn up_casts() {
        assert!(can_up_cast(&DataType::Int32, &DataType::Int64));
        assert!(!can_up_cast(&DataType::Int64, &DataType::Int32));
        assert!(!can_up_cast(&DataType::Utf8, &DataType::Int32));
        assert!(can_up_cast(&DataType::Null, &DataType::Utf8));

        let pair = DataType::struct_type([
            Field::new("k", DataType::Int32, false),
            Field::new("v", DataType::Utf8, true),
        ]);
        assert!(can_up_cast(&pair, &DataType::struct_type([])));
        assert!(!can_up_cast(&DataType::struct_type([]), &pair));
        assert!(!can_up_cast(&DataType::Int32, &DataType::struct_type([])));
    }

    #[test]
    fn row_pairs_accept_any_struct() {
        let member = <(Row, Row)>::shape();
        let Shape::Product(fields) = member else {
            panic!("expected product shape");
        };
        let nested = DataType::struct_type([Field::new("k", DataType::Int32, false)]);
        assert!(
            fields
                .iter()
                .all(|field| can_up_cast(&nested, &field.datatype))
        );
    }
}
