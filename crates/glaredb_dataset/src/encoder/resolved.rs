use std::marker::PhantomData;

use super::bound::BoundEncoder;
use super::{Encodable, Shape};
use crate::expr::attribute::Attribute;

/// Encoder matched against the output of a specific plan.
#[derive(Debug)]
pub struct ResolvedEncoder<T> {
    shape: Shape,
    /// Attribute matched for each column of the shape, in shape order.
    attributes: Vec<Attribute>,
    /// Full output of the plan.
    output: Vec<Attribute>,
    _type: PhantomData<fn() -> T>,
}

impl<T: Encodable> ResolvedEncoder<T> {
    pub(crate) fn new(shape: Shape, attributes: Vec<Attribute>, output: Vec<Attribute>) -> Self {
        ResolvedEncoder {
            shape,
            attributes,
            output,
            _type: PhantomData,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Compile attribute matches into row ordinals.
    pub fn bind(self) -> BoundEncoder<T> {
        let ordinals = self
            .attributes
            .iter()
            .map(|attr| {
                self.output
                    .iter()
                    .position(|out| out.same_ref(attr))
                    // Matched attributes come from the output, so this only
                    // falls through for duplicated ids.
                    .unwrap_or_default()
            })
            .collect();

        BoundEncoder::new(
            ordinals,
            self.output.len(),
            matches!(self.shape, Shape::Flat(_)),
            self.attributes,
        )
    }
}
