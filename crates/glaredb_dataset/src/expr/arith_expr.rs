use std::fmt;

use super::Expression;
use crate::arrays::datatype::DataType;
use crate::errors::{Result, analysis};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOperator {
    Add,
    Sub,
    Mul,
    /// Always produces a double.
    Div,
    Rem,
}

impl fmt::Display for ArithOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "+"),
            Self::Sub => write!(f, "-"),
            Self::Mul => write!(f, "*"),
            Self::Div => write!(f, "/"),
            Self::Rem => write!(f, "%"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArithExpr {
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub op: ArithOperator,
}

impl ArithExpr {
    pub fn datatype(&self) -> Result<DataType> {
        let left = self.left.datatype()?;
        let right = self.right.datatype()?;

        let common = DataType::common_numeric(&left, &right).ok_or_else(|| {
            analysis!(
                "Cannot apply '{}' to {} and {} in '{}'",
                self.op,
                left,
                right,
                self
            )
        })?;

        Ok(match self.op {
            ArithOperator::Div => DataType::Float64,
            _ => common,
        })
    }
}

impl fmt::Display for ArithExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.left, self.op, self.right)
    }
}
