use std::fmt;
use std::sync::Arc;

use super::operator::{LogicalNode, Node};
use crate::arrays::row::Row;
use crate::errors::Result;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable, attribute_names};
use crate::expr::Expression;
use crate::expr::attribute::Attribute;

type RowFn = dyn Fn(&Row) -> Result<Vec<Row>> + Send + Sync;

/// Opaque function from one input row to any number of output rows.
#[derive(Clone)]
pub struct RowFunction {
    pub name: &'static str,
    func: Arc<RowFn>,
}

impl RowFunction {
    pub fn new<F>(name: &'static str, func: F) -> Self
    where
        F: Fn(&Row) -> Result<Vec<Row>> + Send + Sync + 'static,
    {
        RowFunction {
            name,
            func: Arc::new(func),
        }
    }

    pub fn call(&self, row: &Row) -> Result<Vec<Row>> {
        (self.func)(row)
    }
}

impl fmt::Debug for RowFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Functions are only equal to themselves.
impl PartialEq for RowFunction {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

/// Apply a typed function to every row.
///
/// When `passthrough` is set the output is the input's attributes, otherwise
/// the function produces rows matching `output`.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalMapRows {
    pub function: RowFunction,
    pub output: Vec<Attribute>,
    pub passthrough: bool,
}

impl Explainable for LogicalMapRows {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        let ent = ExplainEntry::new("MapRows").with_value("function", self.function.name);
        if self.passthrough {
            ent
        } else {
            ent.with_values("output", attribute_names(conf, &self.output))
        }
    }
}

impl LogicalNode for Node<LogicalMapRows> {
    fn name(&self) -> &'static str {
        "MapRows"
    }

    fn output(&self) -> Result<Vec<Attribute>> {
        if self.node.passthrough {
            self.get_one_child_exact()?.output()
        } else {
            Ok(self.node.output.clone())
        }
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
