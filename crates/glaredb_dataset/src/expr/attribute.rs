use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::arrays::datatype::DataType;
use crate::arrays::field::Field;

static NEXT_ATTRIBUTE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique identifier for an attribute.
///
/// Identifiers are handed out when an attribute is first produced (a relation
/// is created, an expression is aliased, ...) and never depend on where the
/// attribute sits in a plan. Two attributes with the same name from different
/// branches of a join are told apart only by their ids.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct AttributeId(pub u64);

impl AttributeId {
    pub fn next() -> Self {
        AttributeId(NEXT_ATTRIBUTE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A resolved output column of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    pub id: AttributeId,
    pub name: String,
    pub datatype: DataType,
    pub nullable: bool,
    /// Relation alias this attribute can be referenced through, e.g. the `l`
    /// in `l.key`.
    pub qualifier: Option<String>,
}

impl Attribute {
    /// Create a new attribute with a fresh id.
    pub fn new(name: impl Into<String>, datatype: DataType, nullable: bool) -> Self {
        Attribute {
            id: AttributeId::next(),
            name: name.into(),
            datatype,
            nullable,
            qualifier: None,
        }
    }

    pub fn from_field(field: &Field) -> Self {
        Self::new(field.name.clone(), field.datatype.clone(), field.nullable)
    }

    /// Check if this refers to the same attribute as `other`, regardless of
    /// naming or qualifiers.
    pub fn same_ref(&self, other: &Attribute) -> bool {
        self.id == other.id
    }

    /// Same attribute, new identity.
    pub fn with_new_id(&self) -> Self {
        Attribute {
            id: AttributeId::next(),
            ..self.clone()
        }
    }

    pub fn with_qualifier(&self, qualifier: Option<String>) -> Self {
        Attribute {
            qualifier,
            ..self.clone()
        }
    }

    pub fn with_nullable(&self, nullable: bool) -> Self {
        Attribute {
            nullable,
            ..self.clone()
        }
    }

    pub fn to_field(&self) -> Field {
        Field::new(self.name.clone(), self.datatype.clone(), self.nullable)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.id)
    }
}

/// Check if two attribute lists share any identifier.
pub fn shares_ids(left: &[Attribute], right: &[Attribute]) -> bool {
    left.iter().any(|l| right.iter().any(|r| l.same_ref(r)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = Attribute::new("a", DataType::Int32, false);
        let b = Attribute::new("a", DataType::Int32, false);
        assert!(!a.same_ref(&b));
        assert!(a.same_ref(&a.with_qualifier(Some("t".to_string()))));
        assert!(!a.same_ref(&a.with_new_id()));
    }

    #[test]
    fn detect_shared_ids() {
        let a = Attribute::new("a", DataType::Int32, false);
        let b = Attribute::new("b", DataType::Int32, false);
        assert!(!shares_ids(&[a.clone()], &[b.clone()]));
        assert!(shares_ids(&[a.clone(), b.clone()], &[b]));
    }
}
