use std::fmt;

use super::Expression;
use super::column::Column;

#[derive(Debug, Clone, PartialEq)]
pub struct SortExpr {
    pub expr: Expression,
    pub desc: bool,
    pub nulls_first: bool,
}

impl SortExpr {
    /// Ascending, nulls first.
    pub fn asc(expr: Expression) -> Self {
        SortExpr {
            expr,
            desc: false,
            nulls_first: true,
        }
    }

    /// Descending, nulls last.
    pub fn desc(expr: Expression) -> Self {
        SortExpr {
            expr,
            desc: true,
            nulls_first: false,
        }
    }
}

impl From<Column> for SortExpr {
    fn from(value: Column) -> Self {
        SortExpr::asc(value.into_expr())
    }
}

impl From<&str> for SortExpr {
    fn from(value: &str) -> Self {
        SortExpr::asc(crate::functions::col(value).into_expr())
    }
}

impl fmt::Display for SortExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.expr,
            if self.desc { "DESC" } else { "ASC" },
            if self.nulls_first {
                "NULLS FIRST"
            } else {
                "NULLS LAST"
            }
        )
    }
}
