use std::marker::PhantomData;

use super::Encodable;
use crate::arrays::row::Row;
use crate::arrays::scalar::ScalarValue;
use crate::errors::{Result, execution};
use crate::expr::attribute::Attribute;

/// Encoder reading and writing values at fixed row ordinals.
#[derive(Debug)]
pub struct BoundEncoder<T> {
    /// Row ordinal for each column of the shape.
    ordinals: Vec<usize>,
    /// Width of the rows this encoder reads.
    row_width: usize,
    flat: bool,
    attributes: Vec<Attribute>,
    _type: PhantomData<fn() -> T>,
}

impl<T: Encodable> BoundEncoder<T> {
    pub(crate) fn new(
        ordinals: Vec<usize>,
        row_width: usize,
        flat: bool,
        attributes: Vec<Attribute>,
    ) -> Self {
        BoundEncoder {
            ordinals,
            row_width,
            flat,
            attributes,
            _type: PhantomData,
        }
    }

    /// If `T` is stored as a single column.
    pub fn is_flat(&self) -> bool {
        self.flat
    }

    pub fn bound_attribute_count(&self) -> usize {
        self.ordinals.len()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn decode(&self, row: &Row) -> Result<T> {
        let values = self
            .ordinals
            .iter()
            .map(|&idx| {
                row.get(idx).cloned().ok_or_else(|| {
                    execution!(
                        "Row of width {} is missing ordinal {idx}, expected width {}",
                        row.len(),
                        self.row_width
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;
        T::decode(values)
    }

    pub fn decode_rows(&self, rows: impl IntoIterator<Item = Row>) -> Result<Vec<T>> {
        rows.into_iter().map(|row| self.decode(&row)).collect()
    }

    /// Encode a value into a row laid out like the rows this encoder reads.
    pub fn encode(&self, value: &T) -> Row {
        let mut row = vec![ScalarValue::Null; self.row_width];
        for (&idx, value) in self.ordinals.iter().zip(value.encode()) {
            if let Some(slot) = row.get_mut(idx) {
                *slot = value;
            }
        }
        Row::new(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::datatype::DataType;
    use crate::encoder::UnresolvedEncoder;
    use crate::logical::resolver::case_insensitive_match;

    #[derive(Debug, Clone, PartialEq)]
    struct Person {
        name: String,
        age: i32,
    }

    crate::product_encoder!(Person { name: String, age: i32 });

    #[test]
    fn bind_product_by_name() {
        // Columns in a different order than the struct fields.
        let output = vec![
            Attribute::new("AGE", DataType::Int32, false),
            Attribute::new("name", DataType::Utf8, true),
        ];
        let encoder = UnresolvedEncoder::<Person>::new()
            .resolve(&output, case_insensitive_match)
            .unwrap()
            .bind();

        assert_eq!(2, encoder.bound_attribute_count());
        assert!(!encoder.is_flat());

        let row = crate::row![30, "a"];
        let person = encoder.decode(&row).unwrap();
        assert_eq!(
            Person {
                name: "a".to_string(),
                age: 30
            },
            person
        );
        assert_eq!(row, encoder.encode(&person));
    }

    #[test]
    fn flat_width_mismatch() {
        let output = vec![
            Attribute::new("a", DataType::Int32, false),
            Attribute::new("b", DataType::Int32, false),
        ];
        let err = UnresolvedEncoder::<i32>::new()
            .resolve(&output, case_insensitive_match)
            .unwrap_err();
        assert!(err.is_analysis());
        assert!(err.message().contains("does not line up"));
    }

    #[test]
    fn incompatible_type() {
        let output = vec![Attribute::new("value", DataType::Utf8, false)];
        let err = UnresolvedEncoder::<i64>::new()
            .resolve(&output, case_insensitive_match)
            .unwrap_err();
        assert!(err.message().contains("Cannot up cast"));

        let output = vec![Attribute::new("value", DataType::Int32, false)];
        let encoder = UnresolvedEncoder::<i64>::new()
            .resolve(&output, case_insensitive_match)
            .unwrap()
            .bind();
        assert_eq!(7_i64, encoder.decode(&crate::row![7]).unwrap());
    }

    #[test]
    fn missing_product_member() {
        let output = vec![
            Attribute::new("name", DataType::Utf8, true),
            Attribute::new("height", DataType::Int32, true),
        ];
        let err = UnresolvedEncoder::<Person>::new()
            .resolve(&output, case_insensitive_match)
            .unwrap_err();
        assert!(err.message().contains("Cannot resolve 'age'"));
    }

    #[test]
    fn dynamic_rows() {
        let output = vec![
            Attribute::new("a", DataType::Int32, false),
            Attribute::new("b", DataType::Utf8, false),
        ];
        let encoder = UnresolvedEncoder::<Row>::new()
            .resolve(&output, case_insensitive_match)
            .unwrap()
            .bind();
        let row = crate::row![1, "x"];
        assert_eq!(row, encoder.decode(&row).unwrap());
        assert_eq!(row, encoder.encode(&row));
    }
}
