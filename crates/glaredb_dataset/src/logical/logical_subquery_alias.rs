use super::operator::{LogicalNode, Node};
use crate::errors::Result;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::Expression;
use crate::expr::attribute::Attribute;

/// Makes the input's columns addressable as `alias.column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalSubqueryAlias {
    pub alias: String,
}

impl Explainable for LogicalSubqueryAlias {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("SubqueryAlias").with_value("alias", &self.alias)
    }
}

impl LogicalNode for Node<LogicalSubqueryAlias> {
    fn name(&self) -> &'static str {
        "SubqueryAlias"
    }

    fn output(&self) -> Result<Vec<Attribute>> {
        Ok(self
            .get_one_child_exact()?
            .output()?
            .iter()
            .map(|attr| attr.with_qualifier(Some(self.node.alias.clone())))
            .collect())
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
