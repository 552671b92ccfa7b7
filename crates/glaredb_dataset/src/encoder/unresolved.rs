use std::marker::PhantomData;

use super::resolved::ResolvedEncoder;
use super::{Encodable, Shape, can_up_cast};
use crate::arrays::field::{Field, Schema};
use crate::errors::{DatasetError, Result, analysis};
use crate::expr::attribute::Attribute;
use crate::logical::resolver::NameMatcher;

/// Encoder knowing only the shape of `T`.
#[derive(Debug)]
pub struct UnresolvedEncoder<T> {
    shape: Shape,
    _type: PhantomData<fn() -> T>,
}

impl<T: Encodable> Default for UnresolvedEncoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Encodable> UnresolvedEncoder<T> {
    pub fn new() -> Self {
        UnresolvedEncoder {
            shape: T::shape(),
            _type: PhantomData,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Schema of rows produced by encoding values of `T`.
    ///
    /// Errors for dynamic shapes, which need an explicit schema.
    pub fn schema(&self) -> Result<Schema> {
        match &self.shape {
            Shape::Flat(field) => Ok(Schema::new([field.clone()])),
            Shape::Product(fields) => Ok(Schema::new(fields.iter().cloned())),
            Shape::Dynamic => Err(DatasetError::InvalidArgument(format!(
                "Cannot derive a schema for {}, provide one explicitly",
                std::any::type_name::<T>()
            ))),
        }
    }

    /// Match the shape of `T` against the output of a plan.
    ///
    /// Flat shapes need exactly one attribute. Product shapes need exactly one
    /// attribute per member, matched by name. Every matched attribute must be
    /// readable as the member's type.
    pub fn resolve(self, output: &[Attribute], matcher: NameMatcher) -> Result<ResolvedEncoder<T>> {
        let attributes = match &self.shape {
            Shape::Flat(field) => {
                if output.len() != 1 {
                    return Err(self.width_mismatch(output));
                }
                check_up_cast(&output[0], field)?;
                vec![output[0].clone()]
            }
            Shape::Product(fields) => {
                if output.len() != fields.len() {
                    return Err(self.width_mismatch(output));
                }
                let mut attributes = Vec::with_capacity(fields.len());
                for field in fields {
                    let matches: Vec<_> = output
                        .iter()
                        .filter(|attr| matcher(&attr.name, &field.name))
                        .collect();
                    let attr = match matches.as_slice() {
                        [attr] => *attr,
                        [] => {
                            return Err(analysis!(
                                "Cannot resolve '{}' given input columns: [{}]",
                                field.name,
                                output_names(output)
                            ));
                        }
                        _ => {
                            return Err(analysis!(
                                "Reference '{}' is ambiguous when binding {}",
                                field.name,
                                std::any::type_name::<T>()
                            ));
                        }
                    };
                    check_up_cast(attr, field)?;
                    attributes.push(attr.clone());
                }
                attributes
            }
            Shape::Dynamic => output.to_vec(),
        };

        Ok(ResolvedEncoder::new(self.shape, attributes, output.to_vec()))
    }

    fn width_mismatch(&self, output: &[Attribute]) -> DatasetError {
        let types: Vec<_> = output
            .iter()
            .map(|attr| format!("{}:{}", attr.name, attr.datatype))
            .collect();
        analysis!(
            "Try to map struct<{}> to {}, but failed as the number of fields does not line up.",
            types.join(","),
            std::any::type_name::<T>()
        )
    }
}

fn check_up_cast(attr: &Attribute, field: &Field) -> Result<()> {
    if !can_up_cast(&attr.datatype, &field.datatype) {
        return Err(analysis!(
            "Cannot up cast `{}` from {} to {}",
            attr.name,
            attr.datatype,
            field.datatype
        ));
    }
    Ok(())
}

fn output_names(output: &[Attribute]) -> String {
    output
        .iter()
        .map(|attr| attr.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
