//! Encoders for tuples and user defined structs.

use super::{Encodable, Shape};
use crate::arrays::datatype::DataType;
use crate::arrays::field::Field;
use crate::arrays::scalar::ScalarValue;
use crate::errors::{Result, execution};

/// Field describing a member of a product type.
///
/// Flat members keep their type, anything else becomes a nested struct.
/// Dynamic members become an empty struct, accepting a struct of any
/// columns.
pub fn member_field<T: Encodable>(name: &str) -> Field {
    Field::new(
        name,
        T::nested_datatype().unwrap_or(DataType::struct_type([])),
        T::nested_nullable(),
    )
}

/// Check the number of values matches a product's member count.
pub fn check_member_count<T>(values: &[ScalarValue], expected: usize) -> Result<()> {
    if values.len() != expected {
        return Err(execution!(
            "Expected {expected} values to decode {}, got {}",
            std::any::type_name::<T>(),
            values.len()
        ));
    }
    Ok(())
}

macro_rules! impl_tuple_encodable {
    ($(($t:ident, $idx:tt, $name:literal)),+) => {
        impl<$($t: Encodable),+> Encodable for ($($t,)+) {
            fn shape() -> Shape {
                Shape::Product(vec![$(member_field::<$t>($name)),+])
            }

            fn encode(&self) -> Vec<ScalarValue> {
                vec![$(self.$idx.encode_nested()),+]
            }

            fn decode(values: Vec<ScalarValue>) -> Result<Self> {
                const WIDTH: usize = [$($idx),+].len();
                check_member_count::<Self>(&values, WIDTH)?;
                let mut iter = values.into_iter();
                Ok(($(
                    $t::decode_nested(iter.next().unwrap_or(ScalarValue::Null))?,
                )+))
            }
        }
    };
}

impl_tuple_encodable!((A, 0, "_1"), (B, 1, "_2"));
impl_tuple_encodable!((A, 0, "_1"), (B, 1, "_2"), (C, 2, "_3"));
impl_tuple_encodable!((A, 0, "_1"), (B, 1, "_2"), (C, 2, "_3"), (D, 3, "_4"));

/// Implement [`Encodable`] for a struct, one column per field.
///
/// ```text
/// struct Person { name: String, age: i32 }
/// product_encoder!(Person { name: String, age: i32 });
/// ```
#[macro_export]
macro_rules! product_encoder {
    ($ty:ident { $($field:ident : $fty:ty),+ $(,)? }) => {
        impl $crate::encoder::Encodable for $ty {
            fn shape() -> $crate::encoder::Shape {
                $crate::encoder::Shape::Product(vec![
                    $($crate::encoder::product::member_field::<$fty>(stringify!($field))),+
                ])
            }

            fn encode(&self) -> Vec<$crate::arrays::scalar::ScalarValue> {
                vec![$($crate::encoder::Encodable::encode_nested(&self.$field)),+]
            }

            fn decode(
                values: Vec<$crate::arrays::scalar::ScalarValue>,
            ) -> $crate::errors::Result<Self> {
                const WIDTH: usize = [$(stringify!($field)),+].len();
                $crate::encoder::product::check_member_count::<Self>(&values, WIDTH)?;
                let mut iter = values.into_iter();
                Ok($ty {
                    $($field: <$fty as $crate::encoder::Encodable>::decode_nested(
                        iter.next().unwrap_or($crate::arrays::scalar::ScalarValue::Null),
                    )?),+
                })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Person {
        name: String,
        age: Option<i32>,
    }

    crate::product_encoder!(Person {
        name: String,
        age: Option<i32>,
    });

    #[test]
    fn struct_shape() {
        assert_eq!(
            Shape::Product(vec![
                Field::new("name", DataType::Utf8, false),
                Field::new("age", DataType::Int32, true),
            ]),
            Person::shape()
        );
    }

    #[test]
    fn struct_round_trip() {
        let p = Person {
            name: "a".to_string(),
            age: None,
        };
        assert_eq!(p, Person::decode(p.encode()).unwrap());
    }

    #[test]
    fn tuple_nests_products() {
        let p = Person {
            name: "a".to_string(),
            age: Some(30),
        };
        let values = (p.clone(), 4_i64).encode();
        assert_eq!(
            vec![
                ScalarValue::Struct(vec!["a".into(), 30.into()]),
                ScalarValue::Int64(4)
            ],
            values
        );
        assert_eq!((p, 4), <(Person, i64)>::decode(values).unwrap());

        match <(Person, i64)>::shape() {
            Shape::Product(fields) => {
                assert_eq!("_1", fields[0].name);
                assert!(matches!(fields[0].datatype, DataType::Struct(_)));
                assert_eq!(DataType::Int64, fields[1].datatype);
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }
}
