use std::fmt;

use serde::{Deserialize, Serialize};

use super::explainable::{ExplainConfig, ExplainEntry};
use crate::logical::operator::LogicalOperator;

/// A plan rendered for display.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExplainNode {
    pub entry: ExplainEntry,
    pub children: Vec<ExplainNode>,
}

impl ExplainNode {
    /// Walk a logical plan, stopping after `max_depth` levels.
    ///
    /// Truncated subtrees are replaced with a single "..." entry.
    pub fn walk_logical(config: ExplainConfig, plan: &LogicalOperator, max_depth: usize) -> Self {
        let entry = plan.explain_entry(config);
        if max_depth <= 1 {
            let children = if plan.children().is_empty() {
                Vec::new()
            } else {
                vec![ExplainNode {
                    entry: ExplainEntry::new("..."),
                    children: Vec::new(),
                }]
            };
            return ExplainNode { entry, children };
        }

        let children = plan
            .children()
            .iter()
            .map(|child| Self::walk_logical(config, child, max_depth - 1))
            .collect();

        ExplainNode { entry, children }
    }

    fn fmt_indent(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        writeln!(f, "{:indent$}{}", "", self.entry, indent = indent * 2)?;
        for child in &self.children {
            child.fmt_indent(f, indent + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for ExplainNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indent(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::arrays::datatype::DataType;
    use crate::expr::attribute::Attribute;
    use crate::expr::{column, lit};
    use crate::logical::builder::PlanBuilder;
    use crate::logical::logical_local::LogicalLocalRelation;
    use crate::logical::operator::Node;
    use crate::logical::resolver::case_insensitive_match;

    #[test]
    fn explain_tree() {
        let a = Attribute::new("a", DataType::Int32, true);
        let output = vec![a.clone()];
        let plan = Arc::new(LogicalOperator::LocalRelation(Node::new(
            LogicalLocalRelation {
                output: output.clone(),
                rows: Arc::new(Vec::new()),
                partitions: 1,
            },
            Vec::new(),
        )));
        let filter = PlanBuilder::new(&plan, &output, case_insensitive_match)
            .filter(crate::expr::eq(column(&a), lit(1)));

        let conf = ExplainConfig { verbose: false };
        let explained = ExplainNode::walk_logical(conf, &filter, 64).to_string();
        assert_eq!(
            "Filter (predicate = (a = 1))\n  LocalRelation (output = [a])\n",
            explained
        );

        let truncated = ExplainNode::walk_logical(conf, &filter, 1).to_string();
        assert_eq!("Filter (predicate = (a = 1))\n  ...\n", truncated);
    }
}
