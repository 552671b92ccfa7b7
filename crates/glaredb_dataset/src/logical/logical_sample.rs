use super::operator::{LogicalNode, Node};
use crate::errors::Result;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::Expression;
use crate::expr::attribute::Attribute;

/// Sample rows whose random draw falls in `[lower_bound, upper_bound)`.
///
/// Each partition draws from its own generator seeded from `seed` and the
/// partition index, so the same input always produces the same sample.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalSample {
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub with_replacement: bool,
    pub seed: u64,
}

impl Explainable for LogicalSample {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Sample")
            .with_value("lower_bound", self.lower_bound)
            .with_value("upper_bound", self.upper_bound)
            .with_value("with_replacement", self.with_replacement)
            .with_value("seed", self.seed)
    }
}

impl LogicalNode for Node<LogicalSample> {
    fn name(&self) -> &'static str {
        "Sample"
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
