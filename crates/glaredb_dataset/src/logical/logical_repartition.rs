use super::operator::{LogicalNode, Node};
use crate::errors::Result;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::Expression;
use crate::expr::attribute::Attribute;

/// Change the number of partitions of the input.
///
/// With `shuffle` rows are redistributed, by hash of `partition_exprs` when
/// given, round robin otherwise. Without `shuffle` adjacent partitions are
/// merged and the partition count can only go down.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalRepartition {
    pub num_partitions: usize,
    pub shuffle: bool,
    pub partition_exprs: Vec<Expression>,
}

impl Explainable for LogicalRepartition {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        let ent = ExplainEntry::new("Repartition")
            .with_value("partitions", self.num_partitions)
            .with_value("shuffle", self.shuffle);
        if self.partition_exprs.is_empty() {
            ent
        } else {
            ent.with_values("keys", &self.partition_exprs)
        }
    }
}

impl LogicalNode for Node<LogicalRepartition> {
    fn name(&self) -> &'static str {
        "Repartition"
    }

    fn output(&self) -> Result<Vec<Attribute>> {
        self.get_one_child_exact()?.output()
    }

    fn for_each_expr<F>(&self, func: &mut F) -> Result<()>
    where
        F: FnMut(&Expression) -> Result<()>,
    {
        for expr in &self.node.partition_exprs {
            func(expr)?;
        }
        Ok(())
    }

    fn for_each_expr_mut<F>(&mut self, func: &mut F) -> Result<()>
    where
        F: FnMut(&mut Expression) -> Result<()>,
    {
        for expr in &mut self.node.partition_exprs {
            func(expr)?;
        }
        Ok(())
    }
}
