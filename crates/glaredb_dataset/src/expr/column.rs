use std::fmt;
use std::ops;

use super::arith_expr::ArithOperator;
use super::comparison_expr::ComparisonOperator;
use super::conjunction_expr::ConjunctionOperator;
use super::sort_expr::SortExpr;
use super::{CastExpr, Expression, GetFieldExpr, arith, compare, conjunction};
use crate::arrays::datatype::DataType;
use crate::arrays::scalar::ScalarValue;

/// User facing handle to an expression.
///
/// Columns are built with `col`/`lit`, from a dataset with `Dataset::col`, or
/// with operators on other columns. A column obtained from a dataset is
/// already resolved and refers to an attribute by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    expr: Expression,
}

impl Column {
    pub fn new(expr: Expression) -> Self {
        Column { expr }
    }

    pub fn expr(&self) -> &Expression {
        &self.expr
    }

    pub fn into_expr(self) -> Expression {
        self.expr
    }

    fn compare(self, op: ComparisonOperator, other: impl Into<Column>) -> Column {
        Column::new(compare(op, self.expr, other.into().expr))
    }

    pub fn equal_to(self, other: impl Into<Column>) -> Column {
        self.compare(ComparisonOperator::Eq, other)
    }

    pub fn not_equal(self, other: impl Into<Column>) -> Column {
        self.compare(ComparisonOperator::NotEq, other)
    }

    /// Null safe equality, `<=>`.
    pub fn eq_null_safe(self, other: impl Into<Column>) -> Column {
        self.compare(ComparisonOperator::EqNullSafe, other)
    }

    pub fn gt(self, other: impl Into<Column>) -> Column {
        self.compare(ComparisonOperator::Gt, other)
    }

    pub fn geq(self, other: impl Into<Column>) -> Column {
        self.compare(ComparisonOperator::GtEq, other)
    }

    pub fn lt(self, other: impl Into<Column>) -> Column {
        self.compare(ComparisonOperator::Lt, other)
    }

    pub fn leq(self, other: impl Into<Column>) -> Column {
        self.compare(ComparisonOperator::LtEq, other)
    }

    pub fn and(self, other: impl Into<Column>) -> Column {
        Column::new(conjunction(
            ConjunctionOperator::And,
            self.expr,
            other.into().expr,
        ))
    }

    pub fn or(self, other: impl Into<Column>) -> Column {
        Column::new(conjunction(
            ConjunctionOperator::Or,
            self.expr,
            other.into().expr,
        ))
    }

    pub fn is_null(self) -> Column {
        Column::new(Expression::IsNull(Box::new(self.expr)))
    }

    pub fn is_not_null(self) -> Column {
        Column::new(Expression::IsNotNull(Box::new(self.expr)))
    }

    pub fn alias(self, name: impl Into<String>) -> Column {
        Column::new(self.expr.alias(name))
    }

    pub fn cast(self, to: DataType) -> Column {
        Column::new(Expression::Cast(CastExpr {
            child: Box::new(self.expr),
            to,
        }))
    }

    /// Extract a field from a struct column.
    pub fn get_field(self, field: impl Into<String>) -> Column {
        Column::new(Expression::GetField(GetFieldExpr {
            child: Box::new(self.expr),
            field: field.into(),
        }))
    }

    pub fn asc(self) -> SortExpr {
        SortExpr::asc(self.expr)
    }

    pub fn asc_nulls_last(self) -> SortExpr {
        SortExpr {
            nulls_first: false,
            ..SortExpr::asc(self.expr)
        }
    }

    pub fn desc(self) -> SortExpr {
        SortExpr::desc(self.expr)
    }

    pub fn desc_nulls_first(self) -> SortExpr {
        SortExpr {
            nulls_first: true,
            ..SortExpr::desc(self.expr)
        }
    }
}

impl From<Expression> for Column {
    fn from(value: Expression) -> Self {
        Column::new(value)
    }
}

impl From<Column> for Expression {
    fn from(value: Column) -> Self {
        value.expr
    }
}

macro_rules! impl_literal_column {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Column {
                fn from(value: $ty) -> Self {
                    Column::new(Expression::Literal(ScalarValue::from(value)))
                }
            }
        )*
    };
}

impl_literal_column!(bool, i32, i64, f64, &str, String, ScalarValue);

macro_rules! impl_arith_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<T: Into<Column>> ops::$trait<T> for Column {
            type Output = Column;

            fn $method(self, rhs: T) -> Column {
                Column::new(arith($op, self.expr, rhs.into().expr))
            }
        }
    };
}

impl_arith_op!(Add, add, ArithOperator::Add);
impl_arith_op!(Sub, sub, ArithOperator::Sub);
impl_arith_op!(Mul, mul, ArithOperator::Mul);
impl_arith_op!(Div, div, ArithOperator::Div);
impl_arith_op!(Rem, rem, ArithOperator::Rem);

impl ops::Neg for Column {
    type Output = Column;

    fn neg(self) -> Column {
        Column::new(Expression::Negate(Box::new(self.expr)))
    }
}

impl ops::Not for Column {
    type Output = Column;

    fn not(self) -> Column {
        Column::new(Expression::Not(Box::new(self.expr)))
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::col;

    #[test]
    fn operators_build_expressions() {
        let c = (col("age") + 1).gt(35).and(!col("deleted"));
        assert_eq!("(((age + 1) > 35) AND (NOT deleted))", c.to_string());
    }

    #[test]
    fn sort_defaults() {
        let asc = col("a").asc();
        assert!(!asc.desc);
        assert!(asc.nulls_first);

        let desc = col("a").desc();
        assert!(desc.desc);
        assert!(!desc.nulls_first);
    }
}
