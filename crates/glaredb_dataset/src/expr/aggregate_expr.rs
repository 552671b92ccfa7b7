use std::fmt;

use super::Expression;
use crate::arrays::datatype::DataType;
use crate::errors::{Result, analysis};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    /// Count of non-null inputs.
    Count,
    Sum,
    Avg,
    Min,
    Max,
    /// First value seen in the group, nulls included.
    First,
    /// Sample standard deviation.
    StddevSamp,
}

impl AggregateFunction {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
            Self::First => "first",
            Self::StddevSamp => "stddev_samp",
        }
    }

    pub fn return_type(&self, input: &DataType) -> Result<DataType> {
        Ok(match self {
            Self::Count => DataType::Int64,
            Self::Sum => match input {
                DataType::Int32 | DataType::Int64 | DataType::Null => DataType::Int64,
                DataType::Float64 => DataType::Float64,
                other => return Err(analysis!("Cannot sum input of type {other}")),
            },
            Self::Avg | Self::StddevSamp => {
                if !(input.is_numeric() || input.is_null()) {
                    return Err(analysis!(
                        "Function '{}' requires a numeric input, got {input}",
                        self.name()
                    ));
                }
                DataType::Float64
            }
            Self::Min | Self::Max | Self::First => input.clone(),
        })
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateExpr {
    pub function: AggregateFunction,
    pub input: Box<Expression>,
    pub distinct: bool,
}

impl AggregateExpr {
    pub fn datatype(&self) -> Result<DataType> {
        self.function.return_type(&self.input.datatype()?)
    }

    pub fn nullable(&self) -> bool {
        !matches!(self.function, AggregateFunction::Count)
    }
}

impl fmt::Display for AggregateExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.distinct {
            write!(f, "{}(DISTINCT {})", self.function, self.input)
        } else {
            write!(f, "{}({})", self.function, self.input)
        }
    }
}
