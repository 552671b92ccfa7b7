use super::operator::{LogicalNode, Node};
use crate::errors::Result;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::Expression;
use crate::expr::attribute::Attribute;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLimit {
    pub limit: usize,
}

impl Explainable for LogicalLimit {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Limit").with_value("limit", self.limit)
    }
}

impl LogicalNode for Node<LogicalLimit> {
    fn name(&self) -> &'static str {
        "Limit"
    }

    fn output(&self) -> Result<Vec<Attribute>> {
        self.get_one_child_exact()?.output()
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
