use super::operator::{LogicalNode, Node};
use crate::errors::{Result, internal};
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable, attribute_names};
use crate::expr::Expression;
use crate::expr::attribute::Attribute;

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalProject {
    /// Named output expressions.
    ///
    /// Analysis names every expression, either as a column reference or an
    /// alias.
    pub projections: Vec<Expression>,
}

/// Get the attributes produced by a list of named expressions.
pub(crate) fn named_output(exprs: &[Expression]) -> Result<Vec<Attribute>> {
    exprs
        .iter()
        .map(|expr| {
            expr.try_as_attribute()?
                .ok_or_else(|| internal!("Unnamed expression in output: {expr}"))
        })
        .collect()
}

impl Explainable for LogicalProject {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        let ent = ExplainEntry::new("Project").with_values("projections", &self.projections);
        match named_output(&self.projections) {
            Ok(output) if conf.verbose => ent.with_values("output", attribute_names(conf, &output)),
            _ => ent,
        }
    }
}

impl LogicalNode for Node<LogicalProject> {
    fn name(&self) -> &'static str {
        "Project"
    }

    fn output(&self) -> Result<Vec<Attribute>> {
        named_output(&self.node.projections)
    }

    fn for_each_expr<F>(&self, func: &mut F) -> Result<()>
    where
        F: FnMut(&Expression) -> Result<()>,
    {
        for expr in &self.node.projections {
            func(expr)?;
        }
        Ok(())
    }

    fn for_each_expr_mut<F>(&mut self, func: &mut F) -> Result<()>
    where
        F: FnMut(&mut Expression) -> Result<()>,
    {
        for expr in &mut self.node.projections {
            func(expr)?;
        }
        Ok(())
    }
}
