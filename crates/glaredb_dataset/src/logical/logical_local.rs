use std::sync::Arc;

use super::operator::{LogicalNode, Node};
use crate::arrays::row::Row;
use crate::errors::Result;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable, attribute_names};
use crate::expr::Expression;
use crate::expr::attribute::Attribute;

/// Rows held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalLocalRelation {
    pub output: Vec<Attribute>,
    pub rows: Arc<Vec<Row>>,
    /// Number of partitions rows are split into when read.
    pub partitions: usize,
}

impl Explainable for LogicalLocalRelation {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("LocalRelation")
            .with_values("output", attribute_names(conf, &self.output))
            .with_verbose_value(conf, "rows", self.rows.len())
            .with_verbose_value(conf, "partitions", self.partitions)
    }
}

impl LogicalNode for Node<LogicalLocalRelation> {
    fn name(&self) -> &'static str {
        "LocalRelation"
    }

    fn output(&self) -> Result<Vec<Attribute>> {
        Ok(self.node.output.clone())
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
