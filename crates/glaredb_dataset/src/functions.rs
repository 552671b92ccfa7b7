//! Constructors for columns and aggregates.

use crate::arrays::scalar::ScalarValue;
use crate::expr::aggregate_expr::AggregateFunction;
use crate::expr::column::Column;
use crate::expr::{Expression, UnresolvedColumn, aggregate};
use crate::logical::resolver::parse_attribute_name;

/// Reference a column by name.
///
/// Dotted names address nested struct fields, `*` selects every column and
/// `t.*` every column of the relation aliased as `t`. Backticks quote names
/// containing dots.
pub fn col(name: &str) -> Column {
    if name == "*" {
        return Column::new(Expression::UnresolvedStar(None));
    }
    if let Some(qualifier) = name.strip_suffix(".*") {
        return Column::new(Expression::UnresolvedStar(Some(qualifier.to_string())));
    }
    Column::new(Expression::UnresolvedColumn(UnresolvedColumn {
        name_parts: parse_attribute_name(name),
    }))
}

pub fn lit(value: impl Into<ScalarValue>) -> Column {
    Column::new(Expression::Literal(value.into()))
}

fn agg(function: AggregateFunction, input: impl Into<Column>, distinct: bool) -> Column {
    Column::new(aggregate(function, input.into().into_expr(), distinct))
}

pub fn count(input: impl Into<Column>) -> Column {
    agg(AggregateFunction::Count, input, false)
}

/// Count all rows, `count(1)`.
pub fn count_star() -> Column {
    agg(AggregateFunction::Count, lit(1), false)
}

pub fn count_distinct(input: impl Into<Column>) -> Column {
    agg(AggregateFunction::Count, input, true)
}

pub fn sum(input: impl Into<Column>) -> Column {
    agg(AggregateFunction::Sum, input, false)
}

pub fn avg(input: impl Into<Column>) -> Column {
    agg(AggregateFunction::Avg, input, false)
}

pub fn mean(input: impl Into<Column>) -> Column {
    avg(input)
}

pub fn min(input: impl Into<Column>) -> Column {
    agg(AggregateFunction::Min, input, false)
}

pub fn max(input: impl Into<Column>) -> Column {
    agg(AggregateFunction::Max, input, false)
}

pub fn first(input: impl Into<Column>) -> Column {
    agg(AggregateFunction::First, input, false)
}

/// Sample standard deviation.
pub fn stddev(input: impl Into<Column>) -> Column {
    agg(AggregateFunction::StddevSamp, input, false)
}

pub fn coalesce(inputs: impl IntoIterator<Item = Column>) -> Column {
    Column::new(Expression::Coalesce(
        inputs.into_iter().map(Column::into_expr).collect(),
    ))
}

/// Build a struct column from named columns.
pub fn struct_(fields: impl IntoIterator<Item = (impl Into<String>, Column)>) -> Column {
    Column::new(Expression::CreateStruct(
        fields
            .into_iter()
            .map(|(name, col)| (name.into(), col.into_expr()))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn col_variants() {
        assert_eq!(Expression::UnresolvedStar(None), col("*").into_expr());
        assert_eq!(
            Expression::UnresolvedStar(Some("t".to_string())),
            col("t.*").into_expr()
        );
        assert_eq!(
            Expression::UnresolvedColumn(UnresolvedColumn {
                name_parts: vec!["a".to_string(), "b".to_string()]
            }),
            col("a.b").into_expr()
        );
        assert_eq!(
            Expression::UnresolvedColumn(UnresolvedColumn {
                name_parts: vec!["a.b".to_string()]
            }),
            col("`a.b`").into_expr()
        );
    }

    #[test]
    fn aggregate_display() {
        assert_eq!("count(1)", count_star().to_string());
        assert_eq!("count(DISTINCT k)", count_distinct(col("k")).to_string());
        assert_eq!("sum(v)", sum(col("v")).to_string());
    }
}
