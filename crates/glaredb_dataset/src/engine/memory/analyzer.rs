//! Resolution and validation of logical plans.

use std::collections::HashMap;
use std::sync::Arc;

use ahash::RandomState;
use tracing::trace;

use crate::arrays::datatype::DataType;
use crate::arrays::scalar::ScalarValue;
use crate::engine::AnalyzerOptions;
use crate::errors::{Result, analysis};
use crate::expr::Expression;
use crate::expr::attribute::{Attribute, AttributeId, shares_ids};
use crate::logical::logical_aggregate::LogicalAggregate;
use crate::logical::operator::{LogicalNode, LogicalOperator, Node};
use crate::logical::resolver::{
    ColumnResolver,
    NameMatcher,
    name_matcher,
    resolve_expression,
    resolve_output_list,
};

type IdMapping = HashMap<AttributeId, AttributeId, RandomState>;

/// Resolves names in a plan bottom up, then checks every node is well formed.
///
/// Analyzing an already analyzed plan produces the same plan.
#[derive(Debug, Clone, Copy)]
pub struct Analyzer {
    matcher: NameMatcher,
}

impl Analyzer {
    pub fn new(options: &AnalyzerOptions) -> Self {
        Analyzer {
            matcher: name_matcher(options.case_sensitive),
        }
    }

    pub fn analyze(&self, plan: &LogicalOperator) -> Result<LogicalOperator> {
        let mut plan = plan.clone();
        plan.modify_replace_children(&mut |child| Ok(Arc::new(self.analyze(&child)?)))?;

        if let LogicalOperator::Join(join) = &mut plan {
            let [left, right] = join.get_two_children_exact()?;
            if shares_ids(&left.output()?, &right.output()?) {
                trace!("re-instancing right side of join with conflicting attributes");
                let mut mapping = IdMapping::default();
                let right = reinstance(right, &mut mapping)?;
                join.children[1] = Arc::new(right);
            }
        }

        self.resolve_node(&mut plan)?;
        check_node(&plan)?;

        Ok(plan)
    }

    fn resolve_node(&self, plan: &mut LogicalOperator) -> Result<()> {
        let input = children_output(plan)?;
        let resolver = ColumnResolver::new(&input, self.matcher);

        match &mut *plan {
            LogicalOperator::Project(project) => {
                let projections = std::mem::take(&mut project.node.projections);
                project.node.projections = resolve_output_list(projections, &resolver)?;
            }
            LogicalOperator::Aggregate(agg) => {
                let groups = std::mem::take(&mut agg.node.group_exprs);
                agg.node.group_exprs = groups
                    .into_iter()
                    .map(|expr| Ok(strip_alias(resolve_expression(expr, &resolver)?)))
                    .collect::<Result<_>>()?;
                let outputs = std::mem::take(&mut agg.node.output_exprs);
                agg.node.output_exprs = resolve_output_list(outputs, &resolver)?;
            }
            other => other.for_each_expr_mut(&mut |expr| {
                let owned = std::mem::replace(expr, Expression::Literal(ScalarValue::Null));
                *expr = strip_alias(resolve_expression(owned, &resolver)?);
                Ok(())
            })?,
        }

        // Pick up qualifiers and nullability from the (possibly changed)
        // children.
        plan.for_each_expr_mut(&mut |expr| {
            let owned = std::mem::replace(expr, Expression::Literal(ScalarValue::Null));
            *expr = owned.transform_up(&mut |expr| {
                Ok(match expr {
                    Expression::Column(attr) => match input.iter().find(|a| a.same_ref(&attr)) {
                        Some(found) => Expression::Column(found.clone()),
                        None => Expression::Column(attr),
                    },
                    other => other,
                })
            })?;
            Ok(())
        })?;

        // A projection computing aggregates is a global aggregate.
        let converted = match &mut *plan {
            LogicalOperator::Project(project)
                if project
                    .node
                    .projections
                    .iter()
                    .any(|expr| expr.contains_aggregate()) =>
            {
                Some(LogicalOperator::Aggregate(Node::new(
                    LogicalAggregate {
                        group_exprs: Vec::new(),
                        output_exprs: std::mem::take(&mut project.node.projections),
                    },
                    std::mem::take(&mut project.children),
                )))
            }
            _ => None,
        };
        if let Some(converted) = converted {
            *plan = converted;
        }

        Ok(())
    }
}

fn children_output(plan: &LogicalOperator) -> Result<Vec<Attribute>> {
    let mut output = Vec::new();
    for child in plan.children() {
        output.extend(child.output()?);
    }
    Ok(output)
}

fn strip_alias(expr: Expression) -> Expression {
    match expr {
        Expression::Alias(alias) => *alias.child,
        other => other,
    }
}

fn attribute_list(attrs: &[Attribute]) -> String {
    attrs
        .iter()
        .map(|attr| attr.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn check_node(plan: &LogicalOperator) -> Result<()> {
    let input = children_output(plan)?;

    plan.for_each_expr(&mut |expr| {
        expr.datatype()?;
        Ok(())
    })?;

    let mut missing: Vec<Attribute> = Vec::new();
    plan.for_each_expr(&mut |expr| {
        for attr in expr.references() {
            let found = input.iter().any(|a| a.same_ref(&attr));
            if !found && !missing.iter().any(|m| m.same_ref(&attr)) {
                missing.push(attr);
            }
        }
        Ok(())
    })?;
    if !missing.is_empty() {
        return Err(analysis!(
            "Resolved attribute(s) {} missing from {} in operator {}",
            attribute_list(&missing),
            attribute_list(&input),
            plan.name()
        ));
    }

    match plan {
        LogicalOperator::Filter(filter) => {
            check_predicate("filter expression", &filter.node.filter)?;
            check_no_aggregate(plan.name(), &filter.node.filter)?;
        }
        LogicalOperator::Join(join) => {
            if let Some(condition) = &join.node.condition {
                check_predicate("join condition", condition)?;
                check_no_aggregate(plan.name(), condition)?;
            }
        }
        LogicalOperator::Aggregate(agg) => {
            for group in &agg.node.group_exprs {
                if group.contains_aggregate() {
                    return Err(analysis!(
                        "aggregate functions are not allowed in GROUP BY, but found {group}"
                    ));
                }
            }
            for expr in &agg.node.output_exprs {
                check_grouped(expr, &agg.node.group_exprs)?;
            }
        }
        LogicalOperator::Generate(generate) => {
            let datatype = generate.node.generator.datatype()?;
            if !matches!(datatype, DataType::List(_)) {
                return Err(analysis!(
                    "Input to function explode should be array type, not {datatype}"
                ));
            }
        }
        LogicalOperator::SetOp(_) => {
            plan.output()?;
        }
        other => other.for_each_expr(&mut |expr| check_no_aggregate(other.name(), expr))?,
    }

    Ok(())
}

fn check_predicate(what: &str, expr: &Expression) -> Result<()> {
    let datatype = expr.datatype()?;
    if !matches!(datatype, DataType::Boolean | DataType::Null) {
        return Err(analysis!(
            "{what} '{expr}' of type {datatype} is not a boolean"
        ));
    }
    Ok(())
}

fn check_no_aggregate(operator: &str, expr: &Expression) -> Result<()> {
    if expr.contains_aggregate() {
        return Err(analysis!(
            "Aggregate functions are not allowed in {operator}: {expr}"
        ));
    }
    Ok(())
}

/// Check that every column in an aggregate output is either grouped on or
/// inside an aggregate function.
fn check_grouped(expr: &Expression, groups: &[Expression]) -> Result<()> {
    if groups.contains(expr) {
        return Ok(());
    }
    match expr {
        Expression::Aggregate(agg) => {
            if agg.input.contains_aggregate() {
                return Err(analysis!(
                    "It is not allowed to use an aggregate function in the argument of another aggregate function: {expr}"
                ));
            }
            Ok(())
        }
        Expression::Column(_) => Err(analysis!(
            "expression '{expr}' is neither present in the group by, nor is it an aggregate function. Add to group by or wrap in first() if you don't care which value you get."
        )),
        other => other.for_each_child(&mut |child| check_grouped(child, groups)),
    }
}

fn remap(attr: Attribute, mapping: &IdMapping) -> Attribute {
    match mapping.get(&attr.id) {
        Some(id) => Attribute { id: *id, ..attr },
        None => attr,
    }
}

fn fresh_ids(attrs: &[Attribute], mapping: &mut IdMapping) -> Vec<Attribute> {
    attrs
        .iter()
        .map(|attr| {
            let fresh = attr.with_new_id();
            mapping.insert(attr.id, fresh.id);
            fresh
        })
        .collect()
}

/// Copy an analyzed plan, giving every attribute it produces a new id.
///
/// References to re-instanced attributes are updated through `mapping`.
fn reinstance(plan: &LogicalOperator, mapping: &mut IdMapping) -> Result<LogicalOperator> {
    let mut plan = plan.clone();
    plan.modify_replace_children(&mut |child| Ok(Arc::new(reinstance(&child, mapping)?)))?;

    plan.for_each_expr_mut(&mut |expr| {
        let owned = std::mem::replace(expr, Expression::Literal(ScalarValue::Null));
        *expr = owned.transform_up(&mut |expr| {
            Ok(match expr {
                Expression::Column(attr) => Expression::Column(remap(attr, mapping)),
                Expression::ResolvedStar(attrs) => Expression::ResolvedStar(
                    attrs.into_iter().map(|attr| remap(attr, mapping)).collect(),
                ),
                Expression::Alias(mut alias) => {
                    let id = AttributeId::next();
                    mapping.insert(alias.id, id);
                    alias.id = id;
                    Expression::Alias(alias)
                }
                other => other,
            })
        })?;
        Ok(())
    })?;

    match &mut plan {
        LogicalOperator::LocalRelation(local) => {
            local.node.output = fresh_ids(&local.node.output, mapping);
        }
        LogicalOperator::Range(range) => {
            let fresh = range.node.output.with_new_id();
            mapping.insert(range.node.output.id, fresh.id);
            range.node.output = fresh;
        }
        LogicalOperator::Generate(generate) => {
            let fresh = generate.node.element.with_new_id();
            mapping.insert(generate.node.element.id, fresh.id);
            generate.node.element = fresh;
        }
        LogicalOperator::MapRows(map) if !map.node.passthrough => {
            map.node.output = fresh_ids(&map.node.output, mapping);
        }
        LogicalOperator::Command(command) => {
            command.node.output = fresh_ids(&command.node.output, mapping);
        }
        _ => (),
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::row::Row;
    use crate::expr::aggregate_expr::AggregateFunction;
    use crate::expr::{aggregate, column, eq, lit};
    use crate::functions::col;
    use crate::logical::builder::PlanBuilder;
    use crate::logical::logical_join::JoinType;
    use crate::logical::logical_local::LogicalLocalRelation;
    use crate::logical::resolver::case_insensitive_match;

    fn analyzer() -> Analyzer {
        Analyzer::new(&AnalyzerOptions {
            case_sensitive: false,
        })
    }

    fn local(names: &[&str]) -> Arc<LogicalOperator> {
        let output = names
            .iter()
            .map(|name| Attribute::new(*name, DataType::Int32, false))
            .collect();
        Arc::new(LogicalOperator::LocalRelation(Node::new(
            LogicalLocalRelation {
                output,
                rows: Arc::new(Vec::<Row>::new()),
                partitions: 1,
            },
            Vec::new(),
        )))
    }

    #[test]
    fn resolve_projection_by_name() {
        let plan = local(&["a", "b"]);
        let output = plan.output().unwrap();
        let project = PlanBuilder::new(&plan, &output, case_insensitive_match)
            .project(vec![col("B").into_expr()]);

        let analyzed = analyzer().analyze(&project).unwrap();
        let got = analyzed.output().unwrap();
        assert_eq!(1, got.len());
        assert!(got[0].same_ref(&output[1]));
    }

    #[test]
    fn analysis_is_idempotent() {
        let plan = local(&["a"]);
        let output = plan.output().unwrap();
        let project = PlanBuilder::new(&plan, &output, case_insensitive_match)
            .project(vec![(col("a") + 1).alias("b").into_expr()]);

        let first = analyzer().analyze(&project).unwrap();
        let second = analyzer().analyze(&first).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn self_join_gets_distinct_ids() {
        let plan = local(&["k"]);
        let output = plan.output().unwrap();
        let join = PlanBuilder::new(&plan, &output, case_insensitive_match).join(
            &plan,
            JoinType::Inner,
            None,
        );

        let analyzed = analyzer().analyze(&join).unwrap();
        let got = analyzed.output().unwrap();
        assert_eq!(2, got.len());
        assert!(!got[0].same_ref(&got[1]));
        assert_eq!("k", got[1].name);
    }

    #[test]
    fn non_boolean_filter() {
        let plan = local(&["a"]);
        let output = plan.output().unwrap();
        let filter = PlanBuilder::new(&plan, &output, case_insensitive_match)
            .filter(column(&output[0]));

        let err = analyzer().analyze(&filter).unwrap_err();
        assert!(err.is_analysis());
        assert!(err.message().contains("is not a boolean"));
    }

    #[test]
    fn missing_reference() {
        let plan = local(&["a"]);
        let other = Attribute::new("z", DataType::Int32, false);
        let output = plan.output().unwrap();
        let filter = PlanBuilder::new(&plan, &output, case_insensitive_match)
            .filter(eq(column(&other), lit(1)));

        let err = analyzer().analyze(&filter).unwrap_err();
        assert!(err.message().contains("missing from"));
    }

    #[test]
    fn ungrouped_column_in_aggregate() {
        let plan = local(&["k", "v"]);
        let output = plan.output().unwrap();
        let agg = PlanBuilder::new(&plan, &output, case_insensitive_match).aggregate(
            vec![column(&output[0])],
            vec![
                column(&output[1]),
                aggregate(AggregateFunction::Sum, column(&output[1]), false).alias("s"),
            ],
        );

        let err = analyzer().analyze(&agg).unwrap_err();
        assert!(err.message().contains("neither present in the group by"));
    }

    #[test]
    fn project_with_aggregates_becomes_aggregate() {
        let plan = local(&["v"]);
        let output = plan.output().unwrap();
        let project = PlanBuilder::new(&plan, &output, case_insensitive_match)
            .project(vec![crate::functions::count_star().into_expr()]);

        let analyzed = analyzer().analyze(&project).unwrap();
        assert!(matches!(analyzed, LogicalOperator::Aggregate(_)));
        assert_eq!("count(1)", analyzed.output().unwrap()[0].name);
    }
}
