use super::{DataFrame, Dataset};
use crate::encoder::Encodable;
use crate::errors::{Result, analysis};
use crate::expr::aggregate_expr::AggregateFunction;
use crate::expr::column::Column;
use crate::expr::{Expression, aggregate};
use crate::functions::count_star;

/// A dataset grouped by a set of expressions, waiting for aggregates.
#[derive(Debug)]
pub struct GroupedData<T> {
    dataset: Dataset<T>,
    groups: Vec<Expression>,
}

impl<T: Encodable> GroupedData<T> {
    pub(crate) fn new(dataset: Dataset<T>, groups: Vec<Expression>) -> Self {
        GroupedData { dataset, groups }
    }

    /// Compute `aggregates` per group. The output has the grouping columns
    /// followed by the aggregates.
    pub fn agg(&self, aggregates: impl IntoIterator<Item = Column>) -> Result<DataFrame> {
        let plan = self.dataset.builder().aggregate(
            self.groups.clone(),
            aggregates.into_iter().map(Column::into_expr).collect(),
        );
        self.dataset.derive(plan)
    }

    /// Number of rows per group, in a column named "count".
    pub fn count(&self) -> Result<DataFrame> {
        self.agg([count_star().alias("count")])
    }

    /// Sum of the named numeric columns, every numeric column if none are
    /// named.
    pub fn sum(&self, names: &[&str]) -> Result<DataFrame> {
        self.numeric_agg(AggregateFunction::Sum, names)
    }

    pub fn avg(&self, names: &[&str]) -> Result<DataFrame> {
        self.numeric_agg(AggregateFunction::Avg, names)
    }

    pub fn mean(&self, names: &[&str]) -> Result<DataFrame> {
        self.avg(names)
    }

    pub fn min(&self, names: &[&str]) -> Result<DataFrame> {
        self.numeric_agg(AggregateFunction::Min, names)
    }

    pub fn max(&self, names: &[&str]) -> Result<DataFrame> {
        self.numeric_agg(AggregateFunction::Max, names)
    }

    fn numeric_agg(&self, function: AggregateFunction, names: &[&str]) -> Result<DataFrame> {
        let inputs: Vec<Expression> = if names.is_empty() {
            self.dataset
                .output
                .iter()
                .filter(|attr| attr.datatype.is_numeric())
                .map(|attr| Expression::Column(attr.clone()))
                .collect()
        } else {
            let resolver = self.dataset.builder().resolver();
            names
                .iter()
                .map(|name| {
                    let expr = match resolver.resolve_one(name)? {
                        Expression::Alias(alias) => *alias.child,
                        other => other,
                    };
                    if !expr.datatype()?.is_numeric() {
                        return Err(analysis!(
                            "\"{name}\" is not a numeric column. Aggregation function can only be applied on a numeric column."
                        ));
                    }
                    Ok(expr)
                })
                .collect::<Result<_>>()?
        };

        self.agg(
            inputs
                .into_iter()
                .map(|input| Column::new(aggregate(function, input, false))),
        )
    }
}

impl<T> Clone for GroupedData<T> {
    fn clone(&self) -> Self {
        GroupedData {
            dataset: self.dataset.clone(),
            groups: self.groups.clone(),
        }
    }
}
