use std::fmt;
use std::sync::Arc;

use super::operator::{LogicalNode, Node};
use crate::arrays::row::Row;
use crate::errors::Result;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable, attribute_names};
use crate::expr::Expression;
use crate::expr::attribute::Attribute;

type CommandFn = dyn Fn() -> Result<Vec<Row>> + Send + Sync;

/// Side effecting function run by a command.
#[derive(Clone)]
pub struct CommandEffect(Arc<CommandFn>);

impl CommandEffect {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn() -> Result<Vec<Row>> + Send + Sync + 'static,
    {
        CommandEffect(Arc::new(func))
    }

    pub fn run(&self) -> Result<Vec<Row>> {
        (self.0)()
    }
}

impl fmt::Debug for CommandEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CommandEffect").finish_non_exhaustive()
    }
}

impl PartialEq for CommandEffect {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A plan with external side effects (DDL, inserts, ...).
///
/// Datasets wrapping a command run it once when the dataset is created and
/// keep the result.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalCommand {
    pub name: String,
    pub effect: CommandEffect,
    pub output: Vec<Attribute>,
}

impl Explainable for LogicalCommand {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Command")
            .with_value("name", &self.name)
            .with_values("output", attribute_names(conf, &self.output))
    }
}

impl LogicalNode for Node<LogicalCommand> {
    fn name(&self) -> &'static str {
        "Command"
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
