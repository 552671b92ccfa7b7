use super::operator::{LogicalNode, Node};
use crate::errors::Result;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::Expression;
use crate::expr::attribute::Attribute;
use crate::expr::sort_expr::SortExpr;

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalOrder {
    pub exprs: Vec<SortExpr>,
    /// Sort across all partitions if true, otherwise sort each partition
    /// independently.
    pub global: bool,
}

impl Explainable for LogicalOrder {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Order")
            .with_values("expressions", &self.exprs)
            .with_value("global", self.global)
    }
}

impl LogicalNode for Node<LogicalOrder> {
    fn name(&self) -> &'static str {
        "Order"
    }

    fn output(&self) -> Result<Vec<Attribute>> {
        self.get_one_child_exact()?.output()
    }

    fn for_each_expr<F>(&self, func: &mut F) -> Result<()>
    where
        F: FnMut(&Expression) -> Result<()>,
    {
        for sort in &self.node.exprs {
            func(&sort.expr)?;
        }
        Ok(())
    }

    fn for_each_expr_mut<F>(&mut self, func: &mut F) -> Result<()>
    where
        F: FnMut(&mut Expression) -> Result<()>,
    {
        for sort in &mut self.node.exprs {
            func(&mut sort.expr)?;
        }
        Ok(())
    }
}
