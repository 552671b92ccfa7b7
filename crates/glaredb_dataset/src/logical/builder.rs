//! Pure plan construction for dataset transformations.
//!
//! Every function here takes the current plan and produces a new plan node
//! wrapping it. Nothing is analyzed or executed.

use std::sync::Arc;

use super::logical_aggregate::LogicalAggregate;
use super::logical_filter::LogicalFilter;
use super::logical_generate::LogicalGenerate;
use super::logical_join::{JoinType, LogicalJoin};
use super::logical_limit::LogicalLimit;
use super::logical_map::{LogicalMapRows, RowFunction};
use super::logical_order::LogicalOrder;
use super::logical_project::LogicalProject;
use super::logical_repartition::LogicalRepartition;
use super::logical_sample::LogicalSample;
use super::logical_setop::{LogicalSetop, SetOpKind};
use super::logical_subquery_alias::LogicalSubqueryAlias;
use super::operator::{LogicalOperator, Node};
use super::resolver::{ColumnResolver, NameMatcher, resolve_expression};
use crate::arrays::datatype::DataType;
use crate::arrays::row::Row;
use crate::arrays::scalar::ScalarValue;
use crate::errors::{DatasetError, Result, analysis, internal};
use crate::expr::aggregate_expr::AggregateFunction;
use crate::expr::attribute::Attribute;
use crate::expr::sort_expr::SortExpr;
use crate::expr::{Expression, aggregate, and_all, cast, eq};

/// Statistics computed by `describe`, in output order.
pub const DESCRIBE_STATISTICS: [&str; 5] = ["count", "mean", "stddev", "min", "max"];

/// Builds new plans on top of an analyzed plan.
#[derive(Debug, Clone, Copy)]
pub struct PlanBuilder<'a> {
    plan: &'a Arc<LogicalOperator>,
    output: &'a [Attribute],
    matcher: NameMatcher,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(
        plan: &'a Arc<LogicalOperator>,
        output: &'a [Attribute],
        matcher: NameMatcher,
    ) -> Self {
        PlanBuilder {
            plan,
            output,
            matcher,
        }
    }

    pub fn resolver(&self) -> ColumnResolver<'a> {
        ColumnResolver::new(self.output, self.matcher)
    }

    /// An equivalent plan, used for transformations that turn out to be
    /// no-ops.
    pub fn unchanged(&self) -> LogicalOperator {
        self.plan.as_ref().clone()
    }

    fn wrap<N>(&self, node: N) -> Node<N> {
        Node::new(node, vec![self.plan.clone()])
    }

    pub fn project(&self, projections: Vec<Expression>) -> LogicalOperator {
        LogicalOperator::Project(self.wrap(LogicalProject { projections }))
    }

    pub fn filter(&self, filter: Expression) -> LogicalOperator {
        LogicalOperator::Filter(self.wrap(LogicalFilter { filter }))
    }

    /// Add or replace columns.
    ///
    /// An existing column with a matching name is replaced in place, keeping
    /// its position. Names without an existing column are appended in the
    /// order given.
    pub fn with_columns(&self, names: &[String], exprs: Vec<Expression>) -> Result<LogicalOperator> {
        if names.len() != exprs.len() {
            return Err(DatasetError::InvalidArgument(format!(
                "The size of column names: {} isn't equal to the size of columns: {}",
                names.len(),
                exprs.len()
            )));
        }

        for (idx, name) in names.iter().enumerate() {
            if names[idx + 1..].iter().any(|other| (self.matcher)(name, other)) {
                return Err(analysis!(
                    "Found duplicate column(s) when adding columns: `{name}`"
                ));
            }
        }

        let mut projections = Vec::with_capacity(self.output.len() + names.len());
        for attr in self.output {
            let replacement = names
                .iter()
                .zip(&exprs)
                .find(|(name, _)| (self.matcher)(&attr.name, name));
            match replacement {
                Some((name, expr)) => projections.push(expr.clone().alias(name.clone())),
                None => projections.push(Expression::Column(attr.clone())),
            }
        }

        for (name, expr) in names.iter().zip(exprs) {
            let exists = self.output.iter().any(|attr| (self.matcher)(&attr.name, name));
            if !exists {
                projections.push(expr.alias(name.clone()));
            }
        }

        Ok(self.project(projections))
    }

    /// Rename a column. No-op if nothing matches `existing`.
    pub fn with_column_renamed(&self, existing: &str, new_name: &str) -> LogicalOperator {
        let found = self
            .output
            .iter()
            .any(|attr| (self.matcher)(&attr.name, existing));
        if !found {
            return self.unchanged();
        }

        let projections = self
            .output
            .iter()
            .map(|attr| {
                let col = Expression::Column(attr.clone());
                if (self.matcher)(&attr.name, existing) {
                    col.alias(new_name)
                } else {
                    col
                }
            })
            .collect();

        self.project(projections)
    }

    /// Drop all columns matching any of the names. No-op if nothing matches.
    pub fn drop_names(&self, names: &[&str]) -> LogicalOperator {
        self.retain(|attr| !names.iter().any(|name| (self.matcher)(&attr.name, name)))
    }

    /// Drop the attribute `expr` refers to. No-op if it doesn't refer to any
    /// output attribute.
    pub fn drop_expression(&self, expr: &Expression) -> LogicalOperator {
        match expr {
            Expression::Column(target) => self.retain(|attr| !attr.same_ref(target)),
            _ => self.unchanged(),
        }
    }

    fn retain(&self, keep: impl Fn(&Attribute) -> bool) -> LogicalOperator {
        let remaining: Vec<_> = self.output.iter().filter(|attr| keep(attr)).collect();
        if remaining.len() == self.output.len() {
            return self.unchanged();
        }
        self.project(
            remaining
                .into_iter()
                .map(|attr| Expression::Column(attr.clone()))
                .collect(),
        )
    }

    /// Remove rows that are duplicates when only looking at the named
    /// columns.
    ///
    /// Planned as grouping on the named columns, keeping the first value of
    /// every other column in each group.
    pub fn drop_duplicates(&self, names: &[&str]) -> Result<LogicalOperator> {
        let mut group_attrs: Vec<&Attribute> = Vec::new();
        for name in names {
            let matches: Vec<_> = self
                .output
                .iter()
                .filter(|attr| (self.matcher)(&attr.name, name))
                .collect();
            if matches.is_empty() {
                return Err(self.resolver().not_found(name));
            }
            for attr in matches {
                if !group_attrs.iter().any(|g| g.same_ref(attr)) {
                    group_attrs.push(attr);
                }
            }
        }

        let output_exprs = self
            .output
            .iter()
            .map(|attr| {
                let col = Expression::Column(attr.clone());
                if group_attrs.iter().any(|g| g.same_ref(attr)) {
                    col
                } else {
                    aggregate(AggregateFunction::First, col, false).alias(attr.name.clone())
                }
            })
            .collect();

        let group_exprs = self
            .output
            .iter()
            .filter(|attr| group_attrs.iter().any(|g| g.same_ref(attr)))
            .map(|attr| Expression::Column(attr.clone()))
            .collect();

        Ok(LogicalOperator::Aggregate(self.wrap(LogicalAggregate {
            group_exprs,
            output_exprs,
        })))
    }

    /// Remove duplicate rows.
    pub fn distinct(&self) -> LogicalOperator {
        let cols: Vec<_> = self
            .output
            .iter()
            .map(|attr| Expression::Column(attr.clone()))
            .collect();
        LogicalOperator::Aggregate(self.wrap(LogicalAggregate {
            group_exprs: cols.clone(),
            output_exprs: cols,
        }))
    }

    /// Rename every column.
    pub fn to_df(&self, names: &[&str]) -> Result<LogicalOperator> {
        if names.len() != self.output.len() {
            let old: Vec<_> = self.output.iter().map(|a| a.name.as_str()).collect();
            return Err(DatasetError::InvalidArgument(format!(
                "The number of columns doesn't match.\nOld column names ({}): {}\nNew column names ({}): {}",
                old.len(),
                old.join(", "),
                names.len(),
                names.join(", ")
            )));
        }

        Ok(self.project(
            self.output
                .iter()
                .zip(names)
                .map(|(attr, name)| Expression::Column(attr.clone()).alias(*name))
                .collect(),
        ))
    }

    pub fn subquery_alias(&self, alias: impl Into<String>) -> LogicalOperator {
        LogicalOperator::SubqueryAlias(self.wrap(LogicalSubqueryAlias {
            alias: alias.into(),
        }))
    }

    pub fn join(
        &self,
        right: &Arc<LogicalOperator>,
        join_type: JoinType,
        condition: Option<Expression>,
    ) -> LogicalOperator {
        LogicalOperator::Join(Node::new(
            LogicalJoin {
                join_type,
                condition,
            },
            vec![self.plan.clone(), right.clone()],
        ))
    }

    /// Join on equality of same-named columns, keeping one copy of each
    /// join column.
    ///
    /// Join columns come first, followed by the remaining left then right
    /// columns. A full outer join coalesces both sides of each join column.
    pub fn join_using(
        &self,
        right: &Arc<LogicalOperator>,
        right_output: &[Attribute],
        names: &[&str],
        join_type: JoinType,
    ) -> Result<LogicalOperator> {
        let left_resolver = self.resolver();
        let right_resolver = ColumnResolver::new(right_output, self.matcher);

        let mut keys = Vec::with_capacity(names.len());
        for name in names {
            let left = resolve_top_attribute(&left_resolver, name, "left")?;
            let right = resolve_top_attribute(&right_resolver, name, "right")?;
            keys.push((left, right));
        }

        let condition = and_all(keys.iter().map(|(l, r)| {
            eq(Expression::Column(l.clone()), Expression::Column(r.clone()))
        }));
        let join = self.join(right, join_type, condition);

        let mut projections: Vec<Expression> = keys
            .iter()
            .map(|(l, r)| match join_type {
                JoinType::FullOuter => Expression::Coalesce(vec![
                    Expression::Column(l.clone()),
                    Expression::Column(r.clone()),
                ])
                .alias(l.name.clone()),
                JoinType::RightOuter => Expression::Column(r.clone()),
                _ => Expression::Column(l.clone()),
            })
            .collect();

        let is_key = |attr: &Attribute| {
            keys.iter()
                .any(|(l, r)| l.same_ref(attr) || r.same_ref(attr))
        };
        projections.extend(
            self.output
                .iter()
                .filter(|attr| !is_key(attr))
                .map(|attr| Expression::Column(attr.clone())),
        );
        if !join_type.is_left_only() {
            projections.extend(
                right_output
                    .iter()
                    .filter(|attr| !is_key(attr))
                    .map(|attr| Expression::Column(attr.clone())),
            );
        }

        Ok(LogicalOperator::Project(Node::new(
            LogicalProject { projections },
            vec![Arc::new(join)],
        )))
    }

    pub fn set_op(&self, right: &Arc<LogicalOperator>, kind: SetOpKind, all: bool) -> LogicalOperator {
        LogicalOperator::SetOp(Node::new(
            LogicalSetop { kind, all },
            vec![self.plan.clone(), right.clone()],
        ))
    }

    pub fn limit(&self, limit: usize) -> LogicalOperator {
        LogicalOperator::Limit(self.wrap(LogicalLimit { limit }))
    }

    pub fn order(&self, exprs: Vec<SortExpr>, global: bool) -> LogicalOperator {
        LogicalOperator::Order(self.wrap(LogicalOrder { exprs, global }))
    }

    /// Sort on every output column, ascending.
    pub fn order_all(&self) -> LogicalOperator {
        self.order(
            self.output
                .iter()
                .map(|attr| SortExpr::asc(Expression::Column(attr.clone())))
                .collect(),
            true,
        )
    }

    pub fn sample(
        &self,
        lower_bound: f64,
        upper_bound: f64,
        with_replacement: bool,
        seed: u64,
    ) -> LogicalOperator {
        LogicalOperator::Sample(self.wrap(LogicalSample {
            lower_bound,
            upper_bound,
            with_replacement,
            seed,
        }))
    }

    pub fn repartition(
        &self,
        num_partitions: usize,
        shuffle: bool,
        partition_exprs: Vec<Expression>,
    ) -> Result<LogicalOperator> {
        if num_partitions == 0 {
            return Err(DatasetError::InvalidArgument(format!(
                "Number of partitions ({num_partitions}) must be positive."
            )));
        }
        Ok(LogicalOperator::Repartition(self.wrap(LogicalRepartition {
            num_partitions,
            shuffle,
            partition_exprs,
        })))
    }

    /// Explode a list column into one row per element, appending the element
    /// as a new column.
    pub fn generate(
        &self,
        generator: Expression,
        element_name: &str,
        outer: bool,
    ) -> Result<LogicalOperator> {
        let generator = resolve_expression(generator, &self.resolver())?;
        let element_type = match generator.datatype()? {
            DataType::List(meta) => *meta.datatype,
            other => {
                return Err(analysis!(
                    "Input to function explode should be array type, not {other}"
                ));
            }
        };
        let element = Attribute::new(element_name, element_type, true);

        Ok(LogicalOperator::Generate(self.wrap(LogicalGenerate {
            generator,
            element,
            outer,
        })))
    }

    /// Group by `groups` computing `aggregates`. Grouping columns are part of
    /// the output, ahead of the aggregates.
    pub fn aggregate(&self, groups: Vec<Expression>, aggregates: Vec<Expression>) -> LogicalOperator {
        let output_exprs = groups.iter().cloned().chain(aggregates).collect();
        LogicalOperator::Aggregate(self.wrap(LogicalAggregate {
            group_exprs: groups,
            output_exprs,
        }))
    }

    pub fn map_rows(
        &self,
        function: RowFunction,
        output: Vec<Attribute>,
        passthrough: bool,
    ) -> LogicalOperator {
        LogicalOperator::MapRows(self.wrap(LogicalMapRows {
            function,
            output,
            passthrough,
        }))
    }

    /// Single global aggregate computing every describe statistic for every
    /// column.
    ///
    /// Output is ordered by statistic first, then by column, every value cast
    /// to a string.
    pub fn describe_aggregate(&self, columns: &[Attribute]) -> Result<LogicalOperator> {
        for attr in columns {
            if matches!(attr.datatype, DataType::List(_) | DataType::Struct(_)) {
                return Err(analysis!(
                    "Cannot describe column '{}' of type {}",
                    attr.name,
                    attr.datatype
                ));
            }
        }

        let mut aggregates = Vec::with_capacity(DESCRIBE_STATISTICS.len() * columns.len());
        for stat in DESCRIBE_STATISTICS {
            for attr in columns {
                let col = Expression::Column(attr.clone());
                let numeric = if attr.datatype.is_numeric() {
                    col.clone()
                } else {
                    cast(col.clone(), DataType::Float64)
                };
                let agg = match stat {
                    "count" => aggregate(AggregateFunction::Count, col, false),
                    "mean" => aggregate(AggregateFunction::Avg, numeric, false),
                    "stddev" => aggregate(AggregateFunction::StddevSamp, numeric, false),
                    "min" => aggregate(AggregateFunction::Min, col, false),
                    "max" => aggregate(AggregateFunction::Max, col, false),
                    other => return Err(internal!("Unknown describe statistic: {other}")),
                };
                aggregates.push(cast(agg, DataType::Utf8).alias(format!("{stat}({})", attr.name)));
            }
        }

        Ok(self.aggregate(Vec::new(), aggregates))
    }
}

/// Slice the flat describe aggregate into one row per statistic.
///
/// Each row starts with the statistic name followed by the value for each
/// column.
pub fn pivot_describe(flat: &Row, num_columns: usize) -> Result<Vec<Row>> {
    if flat.len() != DESCRIBE_STATISTICS.len() * num_columns {
        return Err(internal!(
            "Unexpected describe aggregate width: {}, expected {}",
            flat.len(),
            DESCRIBE_STATISTICS.len() * num_columns
        ));
    }

    if num_columns == 0 {
        return Ok(DESCRIBE_STATISTICS
            .iter()
            .map(|stat| Row::new(vec![ScalarValue::from(*stat)]))
            .collect());
    }

    Ok(flat
        .values()
        .chunks(num_columns)
        .zip(DESCRIBE_STATISTICS)
        .map(|(chunk, stat)| {
            std::iter::once(ScalarValue::from(stat))
                .chain(chunk.iter().cloned())
                .collect()
        })
        .collect())
}

fn resolve_top_attribute(resolver: &ColumnResolver, name: &str, side: &str) -> Result<Attribute> {
    match resolver.resolve_parts(&[name.to_string()])? {
        Some(Expression::Column(attr)) => Ok(attr),
        _ => Err(analysis!(
            "USING column `{name}` cannot be resolved on the {side} side of the join. The {side}-side columns: [{}]",
            resolver
                .output
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::lit;
    use crate::logical::logical_local::LogicalLocalRelation;
    use crate::logical::operator::LogicalNode;
    use crate::logical::resolver::case_insensitive_match;

    fn relation(output: Vec<Attribute>) -> Arc<LogicalOperator> {
        Arc::new(LogicalOperator::LocalRelation(Node::new(
            LogicalLocalRelation {
                output,
                rows: Arc::new(Vec::new()),
                partitions: 1,
            },
            Vec::new(),
        )))
    }

    fn names(plan: &LogicalOperator) -> Vec<String> {
        plan.output().unwrap().into_iter().map(|a| a.name).collect()
    }

    #[test]
    fn with_column_replaces_in_place() {
        let output = vec![
            Attribute::new("name", DataType::Utf8, true),
            Attribute::new("age", DataType::Int32, true),
            Attribute::new("city", DataType::Utf8, true),
        ];
        let plan = relation(output.clone());
        let builder = PlanBuilder::new(&plan, &output, case_insensitive_match);

        let replaced = builder
            .with_columns(&["AGE".to_string()], vec![lit(1)])
            .unwrap();
        assert_eq!(vec!["name", "AGE", "city"], names(&replaced));

        let appended = builder
            .with_columns(&["height".to_string()], vec![lit(1)])
            .unwrap();
        assert_eq!(vec!["name", "age", "city", "height"], names(&appended));
    }

    #[test]
    fn drop_missing_is_noop() {
        let output = vec![Attribute::new("a", DataType::Int32, true)];
        let plan = relation(output.clone());
        let builder = PlanBuilder::new(&plan, &output, case_insensitive_match);

        assert_eq!(*plan, builder.drop_names(&["nope"]));
        assert_eq!(Vec::<String>::new(), names(&builder.drop_names(&["A"])));
    }

    #[test]
    fn drop_duplicates_groups_and_takes_first() {
        let output = vec![
            Attribute::new("k", DataType::Int32, true),
            Attribute::new("v", DataType::Int32, true),
        ];
        let plan = relation(output.clone());
        let builder = PlanBuilder::new(&plan, &output, case_insensitive_match);

        let plan = builder.drop_duplicates(&["k"]).unwrap();
        match &plan {
            LogicalOperator::Aggregate(agg) => {
                assert_eq!(1, agg.node.group_exprs.len());
                assert_eq!("first(v) AS v", agg.node.output_exprs[1].to_string());
            }
            other => panic!("unexpected plan: {other:?}"),
        }
        assert_eq!(vec!["k", "v"], names(&plan));

        let err = builder.drop_duplicates(&["missing"]).unwrap_err();
        assert!(err.is_analysis());
    }

    #[test]
    fn to_df_count_mismatch() {
        let output = vec![
            Attribute::new("a", DataType::Int32, true),
            Attribute::new("b", DataType::Int32, true),
        ];
        let plan = relation(output.clone());
        let builder = PlanBuilder::new(&plan, &output, case_insensitive_match);

        let err = builder.to_df(&["x"]).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(vec!["x", "y"], names(&builder.to_df(&["x", "y"]).unwrap()));
    }

    #[test]
    fn join_using_output_order() {
        let left = vec![
            Attribute::new("id", DataType::Int32, true),
            Attribute::new("l", DataType::Int32, true),
        ];
        let right = vec![
            Attribute::new("r", DataType::Int32, true),
            Attribute::new("ID", DataType::Int32, true),
        ];
        let left_plan = relation(left.clone());
        let right_plan = relation(right.clone());
        let builder = PlanBuilder::new(&left_plan, &left, case_insensitive_match);

        let plan = builder
            .join_using(&right_plan, &right, &["id"], JoinType::Inner)
            .unwrap();
        assert_eq!(vec!["id", "l", "r"], names(&plan));

        let plan = builder
            .join_using(&right_plan, &right, &["id"], JoinType::LeftSemi)
            .unwrap();
        assert_eq!(vec!["id", "l"], names(&plan));
    }

    #[test]
    fn pivot_describe_chunks() {
        let flat = Row::new(
            (0..10)
                .map(|v| ScalarValue::Utf8(v.to_string()))
                .collect(),
        );
        let rows = pivot_describe(&flat, 2).unwrap();
        assert_eq!(5, rows.len());
        assert_eq!(crate::row!["count", "0", "1"], rows[0]);
        assert_eq!(crate::row!["max", "8", "9"], rows[4]);

        let rows = pivot_describe(&Row::empty(), 0).unwrap();
        assert_eq!(crate::row!["stddev"], rows[2]);
    }
}
