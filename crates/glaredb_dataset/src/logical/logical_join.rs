use std::fmt;

use super::operator::{LogicalNode, Node};
use crate::errors::{DatasetError, Result};
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::Expression;
use crate::expr::attribute::Attribute;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    /// Standard INNER join.
    Inner,
    /// Standard LEFT join.
    LeftOuter,
    /// Standard RIGHT join.
    RightOuter,
    /// Standard full/outer join.
    FullOuter,
    /// Emit left rows with at least one match on the right.
    LeftSemi,
    /// Emit left rows with no match on the right.
    LeftAnti,
    /// Cartesian product, no condition.
    Cross,
}

impl JoinType {
    /// If this join only produces columns from the left side.
    pub const fn is_left_only(&self) -> bool {
        matches!(self, Self::LeftSemi | Self::LeftAnti)
    }

    pub const fn left_nullable(&self) -> bool {
        matches!(self, Self::RightOuter | Self::FullOuter)
    }

    pub const fn right_nullable(&self) -> bool {
        matches!(self, Self::LeftOuter | Self::FullOuter)
    }
}

impl std::str::FromStr for JoinType {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.to_ascii_lowercase().replace('_', "");
        Ok(match normalized.as_str() {
            "inner" => Self::Inner,
            "left" | "leftouter" => Self::LeftOuter,
            "right" | "rightouter" => Self::RightOuter,
            "outer" | "full" | "fullouter" => Self::FullOuter,
            "semi" | "leftsemi" => Self::LeftSemi,
            "anti" | "leftanti" => Self::LeftAnti,
            "cross" => Self::Cross,
            _ => {
                return Err(DatasetError::InvalidArgument(format!(
                    "Unsupported join type '{s}'. Supported join types include: 'inner', 'outer', 'full', 'fullouter', 'full_outer', 'leftouter', 'left', 'left_outer', 'rightouter', 'right', 'right_outer', 'leftsemi', 'left_semi', 'semi', 'leftanti', 'left_anti', 'anti', 'cross'."
                )));
            }
        })
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner => write!(f, "INNER"),
            Self::LeftOuter => write!(f, "LEFT"),
            Self::RightOuter => write!(f, "RIGHT"),
            Self::FullOuter => write!(f, "FULL"),
            Self::LeftSemi => write!(f, "LEFT SEMI"),
            Self::LeftAnti => write!(f, "LEFT ANTI"),
            Self::Cross => write!(f, "CROSS"),
        }
    }
}

/// Join two inputs on an arbitrary condition.
///
/// No condition means every left row is paired with every right row before
/// applying the join type's rules.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalJoin {
    pub join_type: JoinType,
    pub condition: Option<Expression>,
}

impl Explainable for LogicalJoin {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        let ent = ExplainEntry::new("Join").with_value("join_type", self.join_type);
        match &self.condition {
            Some(condition) => ent.with_value("condition", condition),
            None => ent,
        }
    }
}

impl LogicalNode for Node<LogicalJoin> {
    fn name(&self) -> &'static str {
        "Join"
    }

    fn output(&self) -> Result<Vec<Attribute>> {
        let [left, right] = self.get_two_children_exact()?;
        let join_type = self.node.join_type;

        let left = left
            .output()?
            .into_iter()
            .map(|attr| {
                if join_type.left_nullable() {
                    attr.with_nullable(true)
                } else {
                    attr
                }
            });

        if join_type.is_left_only() {
            return Ok(left.collect());
        }

        let right = right.output()?.into_iter().map(|attr| {
            if join_type.right_nullable() {
                attr.with_nullable(true)
            } else {
                attr
            }
        });

        Ok(left.chain(right).collect())
    }

    fn for_each_expr<F>(&self, func: &mut F) -> Result<()>
    where
        F: FnMut(&Expression) -> Result<()>,
    {
        if let Some(condition) = &self.node.condition {
            func(condition)?;
        }
        Ok(())
    }

    fn for_each_expr_mut<F>(&mut self, func: &mut F) -> Result<()>
    where
        F: FnMut(&mut Expression) -> Result<()>,
    {
        if let Some(condition) = &mut self.node.condition {
            func(condition)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_join_types() {
        assert_eq!(JoinType::LeftOuter, "left_outer".parse().unwrap());
        assert_eq!(JoinType::FullOuter, "outer".parse().unwrap());
        assert_eq!(JoinType::LeftAnti, "ANTI".parse().unwrap());
        assert!("sideways".parse::<JoinType>().unwrap_err().is_invalid_argument());
    }
}
