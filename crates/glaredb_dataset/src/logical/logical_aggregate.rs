use super::logical_project::named_output;
use super::operator::{LogicalNode, Node};
use crate::errors::Result;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::Expression;
use crate::expr::attribute::Attribute;

/// Group the input and compute aggregates per group.
///
/// `output_exprs` is the full output list. Each entry is either built only
/// from grouping expressions or contains aggregates. No grouping expressions
/// means a single global group.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalAggregate {
    pub group_exprs: Vec<Expression>,
    pub output_exprs: Vec<Expression>,
}

impl Explainable for LogicalAggregate {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Aggregate")
            .with_values("groups", &self.group_exprs)
            .with_values("output", &self.output_exprs)
    }
}

impl LogicalNode for Node<LogicalAggregate> {
    fn name(&self) -> &'static str {
        "Aggregate"
    }

    fn output(&self) -> Result<Vec<Attribute>> {
        named_output(&self.node.output_exprs)
    }

    fn for_each_expr<F>(&self, func: &mut F) -> Result<()>
    where
        F: FnMut(&Expression) -> Result<()>,
    {
        for expr in self.node.group_exprs.iter().chain(&self.node.output_exprs) {
            func(expr)?;
        }
        Ok(())
    }

    fn for_each_expr_mut<F>(&mut self, func: &mut F) -> Result<()>
    where
        F: FnMut(&mut Expression) -> Result<()>,
    {
        for expr in self
            .node
            .group_exprs
            .iter_mut()
            .chain(&mut self.node.output_exprs)
        {
            func(expr)?;
        }
        Ok(())
    }
}
