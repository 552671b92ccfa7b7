use super::operator::{LogicalNode, Node};
use crate::errors::Result;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::Expression;
use crate::expr::attribute::Attribute;

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalFilter {
    pub filter: Expression,
}

impl Explainable for LogicalFilter {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Filter").with_value("predicate", &self.filter)
    }
}

impl LogicalNode for Node<LogicalFilter> {
    fn name(&self) -> &'static str {
        "Filter"
    }

    fn output(&self) -> Result<Vec<Attribute>> {
        self.get_one_child_exact()?.output()
    }

    fn for_each_expr<F>(&self, func: &mut F) -> Result<()>
    where
        F: FnMut(&Expression) -> Result<()>,
    {
        func(&self.node.filter)
    }

    fn for_each_expr_mut<F>(&mut self, func: &mut F) -> Result<()>
    where
        F: FnMut(&mut Expression) -> Result<()>,
    {
        func(&mut self.node.filter)
    }
}
