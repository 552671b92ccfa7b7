use std::sync::Arc;

use super::logical_aggregate::LogicalAggregate;
use super::logical_command::LogicalCommand;
use super::logical_filter::LogicalFilter;
use super::logical_generate::LogicalGenerate;
use super::logical_join::LogicalJoin;
use super::logical_limit::LogicalLimit;
use super::logical_local::LogicalLocalRelation;
use super::logical_map::LogicalMapRows;
use super::logical_order::LogicalOrder;
use super::logical_project::LogicalProject;
use super::logical_range::LogicalRange;
use super::logical_repartition::LogicalRepartition;
use super::logical_sample::LogicalSample;
use super::logical_setop::LogicalSetop;
use super::logical_subquery_alias::LogicalSubqueryAlias;
use crate::errors::{Result, internal};
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::Expression;
use crate::expr::attribute::Attribute;

/// Common operations across all logical nodes in a plan.
///
/// For individual operators, this should be implemented on `Node<T>` and not
/// `T`.
///
/// This is implemented on `LogicalOperator` for convenience.
pub trait LogicalNode {
    /// Name of the operator.
    fn name(&self) -> &'static str;

    /// Attributes produced by this operator.
    ///
    /// Only meaningful for resolved plans. Unresolved expressions produce an
    /// error.
    fn output(&self) -> Result<Vec<Attribute>>;

    fn for_each_expr<F>(&self, func: &mut F) -> Result<()>
    where
        F: FnMut(&Expression) -> Result<()>;

    fn for_each_expr_mut<F>(&mut self, func: &mut F) -> Result<()>
    where
        F: FnMut(&mut Expression) -> Result<()>;
}

/// Wrapper around nodes in the logical plan.
///
/// Children are reference counted so that every transformation can wrap the
/// previous plan without copying it.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<N> {
    /// Node specific logic.
    pub node: N,
    /// Inputs to this node.
    pub children: Vec<Arc<LogicalOperator>>,
}

impl<N> Node<N> {
    pub fn new(node: N, children: Vec<Arc<LogicalOperator>>) -> Self {
        Node { node, children }
    }

    pub fn into_inner(self) -> N {
        self.node
    }

    pub fn get_one_child_exact(&self) -> Result<&Arc<LogicalOperator>> {
        if self.children.len() != 1 {
            return Err(internal!(
                "Expected 1 child to operator, have {}",
                self.children.len()
            ));
        }
        Ok(&self.children[0])
    }

    pub fn get_two_children_exact(&self) -> Result<[&Arc<LogicalOperator>; 2]> {
        if self.children.len() != 2 {
            return Err(internal!(
                "Expected 2 children to operator, have {}",
                self.children.len()
            ));
        }
        Ok([&self.children[0], &self.children[1]])
    }

    /// Outputs of all children concatenated.
    pub fn children_output(&self) -> Result<Vec<Attribute>> {
        let mut output = Vec::new();
        for child in &self.children {
            output.extend(child.output()?);
        }
        Ok(output)
    }
}

impl<N> AsRef<N> for Node<N> {
    fn as_ref(&self) -> &N {
        &self.node
    }
}

impl<N> AsMut<N> for Node<N> {
    fn as_mut(&mut self) -> &mut N {
        &mut self.node
    }
}

impl<N> Explainable for Node<N>
where
    N: Explainable,
{
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        self.node.explain_entry(conf)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogicalOperator {
    Project(Node<LogicalProject>),
    Filter(Node<LogicalFilter>),
    Join(Node<LogicalJoin>),
    Aggregate(Node<LogicalAggregate>),
    Order(Node<LogicalOrder>),
    SetOp(Node<LogicalSetop>),
    Limit(Node<LogicalLimit>),
    Sample(Node<LogicalSample>),
    Repartition(Node<LogicalRepartition>),
    Generate(Node<LogicalGenerate>),
    SubqueryAlias(Node<LogicalSubqueryAlias>),
    LocalRelation(Node<LogicalLocalRelation>),
    Range(Node<LogicalRange>),
    MapRows(Node<LogicalMapRows>),
    Command(Node<LogicalCommand>),
}

macro_rules! dispatch {
    ($self:expr, $n:ident => $body:expr) => {
        match $self {
            LogicalOperator::Project($n) => $body,
            LogicalOperator::Filter($n) => $body,
            LogicalOperator::Join($n) => $body,
            LogicalOperator::Aggregate($n) => $body,
            LogicalOperator::Order($n) => $body,
            LogicalOperator::SetOp($n) => $body,
            LogicalOperator::Limit($n) => $body,
            LogicalOperator::Sample($n) => $body,
            LogicalOperator::Repartition($n) => $body,
            LogicalOperator::Generate($n) => $body,
            LogicalOperator::SubqueryAlias($n) => $body,
            LogicalOperator::LocalRelation($n) => $body,
            LogicalOperator::Range($n) => $body,
            LogicalOperator::MapRows($n) => $body,
            LogicalOperator::Command($n) => $body,
        }
    };
}

impl LogicalOperator {
    pub fn children(&self) -> &[Arc<LogicalOperator>] {
        dispatch!(self, n => &n.children)
    }

    pub fn children_mut(&mut self) -> &mut Vec<Arc<LogicalOperator>> {
        dispatch!(self, n => &mut n.children)
    }

    /// Replaces the children in the operator by running them through `modify`.
    pub fn modify_replace_children<F>(&mut self, modify: &mut F) -> Result<()>
    where
        F: FnMut(Arc<LogicalOperator>) -> Result<Arc<LogicalOperator>>,
    {
        let children = self.children_mut();
        let mut new_children = Vec::with_capacity(children.len());

        for child in children.drain(..) {
            new_children.push(modify(child)?);
        }

        *children = new_children;

        Ok(())
    }

    /// Check if this plan has side effects that must run exactly once.
    ///
    /// True for commands, and for unions made only of commands.
    pub fn is_eager_command(&self) -> bool {
        match self {
            Self::Command(_) => true,
            Self::SetOp(n) if n.node.is_union() => {
                n.children.iter().all(|child| child.is_eager_command())
            }
            _ => false,
        }
    }

    /// Check if every expression in the plan is resolved.
    pub fn is_resolved(&self) -> bool {
        let mut resolved = true;
        let walked = self.for_each_expr(&mut |expr| {
            resolved &= expr.is_resolved();
            Ok(())
        });
        walked.is_ok() && resolved && self.children().iter().all(|c| c.is_resolved())
    }

    pub fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        dispatch!(self, n => n.explain_entry(conf))
    }
}

impl LogicalNode for LogicalOperator {
    fn name(&self) -> &'static str {
        dispatch!(self, n => n.name())
    }

    fn output(&self) -> Result<Vec<Attribute>> {
        dispatch!(self, n => n.output())
    }

    fn for_each_expr<F>(&self, func: &mut F) -> Result<()>
    where
        F: FnMut(&Expression) -> Result<()>,
    {
        dispatch!(self, n => n.for_each_expr(func))
    }

    fn for_each_expr_mut<F>(&mut self, func: &mut F) -> Result<()>
    where
        F: FnMut(&mut Expression) -> Result<()>,
    {
        dispatch!(self, n => n.for_each_expr_mut(func))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::datatype::DataType;
    use crate::expr::{column, lit};
    use crate::functions::col;
    use crate::logical::logical_local::LogicalLocalRelation;
    use crate::logical::logical_project::LogicalProject;

    fn project(child: &Arc<LogicalOperator>, projections: Vec<Expression>) -> LogicalOperator {
        LogicalOperator::Project(Node::new(
            LogicalProject { projections },
            vec![child.clone()],
        ))
    }

    #[test]
    fn resolved_only_when_every_expression_is() {
        let attr = Attribute::new("a", DataType::Int32, true);
        let local = Arc::new(LogicalOperator::LocalRelation(Node::new(
            LogicalLocalRelation {
                output: vec![attr.clone()],
                rows: Arc::new(Vec::new()),
                partitions: 1,
            },
            Vec::new(),
        )));
        assert!(local.is_resolved());

        assert!(project(&local, vec![column(&attr), lit(1)]).is_resolved());
        assert!(!project(&local, vec![col("a").into_expr()]).is_resolved());

        let unresolved = Arc::new(project(&local, vec![col("a").into_expr()]));
        assert!(!project(&unresolved, vec![column(&attr)]).is_resolved());
    }
}
