use std::fmt;

use super::operator::{LogicalNode, Node};
use crate::arrays::datatype::DataType;
use crate::errors::{Result, analysis};
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::Expression;
use crate::expr::attribute::Attribute;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOpKind {
    Union,
    Except,
    Intersect,
}

impl fmt::Display for SetOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Union => write!(f, "UNION"),
            Self::Except => write!(f, "EXCEPT"),
            Self::Intersect => write!(f, "INTERSECT"),
        }
    }
}

/// Positional set operation over two inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalSetop {
    pub kind: SetOpKind,
    /// Keep duplicates.
    pub all: bool,
}

impl LogicalSetop {
    pub fn is_union(&self) -> bool {
        self.kind == SetOpKind::Union
    }
}

impl Explainable for LogicalSetop {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("SetOp")
            .with_value("kind", self.kind)
            .with_value("all", self.all)
    }
}

impl LogicalNode for Node<LogicalSetop> {
    fn name(&self) -> &'static str {
        "SetOp"
    }

    /// Output takes its names and ids from the left input, widening types and
    /// nullability over both inputs.
    fn output(&self) -> Result<Vec<Attribute>> {
        let [left, right] = self.get_two_children_exact()?;
        let left = left.output()?;
        let right = right.output()?;

        if left.len() != right.len() {
            return Err(analysis!(
                "{} can only be performed on inputs with the same number of columns, but the first input has {} columns and the second input has {} columns",
                self.node.kind,
                left.len(),
                right.len()
            ));
        }

        left.into_iter()
            .zip(right)
            .enumerate()
            .map(|(idx, (l, r))| {
                let datatype = common_set_type(&l.datatype, &r.datatype).ok_or_else(|| {
                    analysis!(
                        "{} can only be performed on inputs with compatible column types. {} <> {} at column {idx}",
                        self.node.kind,
                        r.datatype,
                        l.datatype
                    )
                })?;
                let nullable = match self.node.kind {
                    SetOpKind::Union => l.nullable || r.nullable,
                    SetOpKind::Intersect => l.nullable && r.nullable,
                    SetOpKind::Except => l.nullable,
                };
                Ok(Attribute {
                    datatype,
                    nullable,
                    ..l
                })
            })
            .collect()
    }

    fn for_each_expr<F>(&self, _func: &mut F) -> Result<()>
    where
        F: FnMut(&Expression) -> Result<()>,
    {
        Ok(())
    }

    fn for_each_expr_mut<F>(&mut self, _func: &mut F) -> Result<()>
    where
        F: FnMut(&mut Expression) -> Result<()>,
    {
        Ok(())
    }
}

fn common_set_type(a: &DataType, b: &DataType) -> Option<DataType> {
    if let Some(common) = DataType::common_type(a, b) {
        return Some(common);
    }
    // Structs and lists line up positionally, names come from the left.
    if a.is_compatible_with(b) {
        return Some(a.clone());
    }
    None
}
