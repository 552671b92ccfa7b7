use super::operator::{LogicalNode, Node};
use crate::errors::Result;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::Expression;
use crate::expr::attribute::Attribute;

/// Explode a list valued expression into one output row per element.
///
/// Output is the input columns followed by `element`.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalGenerate {
    pub generator: Expression,
    pub element: Attribute,
    /// Emit a row with a null element for null or empty lists.
    pub outer: bool,
}

impl Explainable for LogicalGenerate {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Generate")
            .with_value("generator", &self.generator)
            .with_value("element", &self.element.name)
            .with_value("outer", self.outer)
    }
}

impl LogicalNode for Node<LogicalGenerate> {
    fn name(&self) -> &'static str {
        "Generate"
    }

    fn output(&self) -> Result<Vec<Attribute>> {
        let mut output = self.get_one_child_exact()?.output()?;
        output.push(self.node.element.clone());
        Ok(output)
    }

    fn for_each_expr<F>(&self, func: &mut F) -> Result<()>
    where
        F: FnMut(&Expression) -> Result<()>,
    {
        func(&self.node.generator)
    }

    fn for_each_expr_mut<F>(&mut self, func: &mut F) -> Result<()>
    where
        F: FnMut(&mut Expression) -> Result<()>,
    {
        func(&mut self.node.generator)
    }
}
