//! Rewriting of trivially true self-join conditions.
//!
//! Joining a dataset with itself using a condition built from columns of the
//! same dataset, e.g. `df.col("k") == df.col("k")`, produces a condition whose
//! two sides reference the same attribute. Once analysis has given the right
//! side fresh attribute ids, such a condition is always true and the join
//! would degrade into a cartesian product. The rewrite here re-resolves each
//! side of those comparisons by name against its own join input.

use tracing::debug;

use super::operator::{LogicalNode, LogicalOperator};
use super::resolver::{ColumnResolver, NameMatcher};
use crate::errors::{Result, internal};
use crate::expr::Expression;
use crate::expr::attribute::{Attribute, shares_ids};
use crate::expr::comparison_expr::ComparisonExpr;

/// Check if a join between inputs with these outputs needs disambiguation.
pub fn needs_disambiguation(left: &[Attribute], right: &[Attribute]) -> bool {
    shares_ids(left, right)
}

/// Rewrite equality comparisons in the condition of an analyzed join whose
/// two sides reference the same attribute.
///
/// Only `=` and `<=>` between two plain column references are rewritten,
/// anywhere in the condition. Everything else is left untouched.
pub fn disambiguate_self_join(
    analyzed: &LogicalOperator,
    matcher: NameMatcher,
) -> Result<LogicalOperator> {
    let join = match analyzed {
        LogicalOperator::Join(join) => join,
        other => {
            return Err(internal!(
                "Expected join for self-join disambiguation, got {}",
                other.name()
            ));
        }
    };

    let condition = match &join.node.condition {
        Some(condition) => condition.clone(),
        None => return Ok(analyzed.clone()),
    };

    let [left, right] = join.get_two_children_exact()?;
    let left_output = left.output()?;
    let right_output = right.output()?;
    let left_resolver = ColumnResolver::new(&left_output, matcher);
    let right_resolver = ColumnResolver::new(&right_output, matcher);

    let mut rewrites = 0;
    let condition = condition.transform_up(&mut |expr| match expr {
        Expression::Comparison(cmp) if cmp.op.is_equality() => {
            match (cmp.left.as_ref(), cmp.right.as_ref()) {
                (Expression::Column(a), Expression::Column(b)) if a.same_ref(b) => {
                    rewrites += 1;
                    Ok(Expression::Comparison(ComparisonExpr {
                        left: Box::new(left_resolver.resolve_one(&a.name)?),
                        right: Box::new(right_resolver.resolve_one(&b.name)?),
                        op: cmp.op,
                    }))
                }
                _ => Ok(Expression::Comparison(cmp)),
            }
        }
        other => Ok(other),
    })?;

    debug!(%rewrites, "disambiguated self-join condition");

    let mut join = join.clone();
    join.node.condition = Some(condition);
    Ok(LogicalOperator::Join(join))
}
