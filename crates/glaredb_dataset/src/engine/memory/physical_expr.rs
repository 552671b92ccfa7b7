use std::cmp::Ordering;

use crate::arrays::datatype::DataType;
use crate::arrays::row::Row;
use crate::arrays::scalar::ScalarValue;
use crate::errors::{Result, execution, internal};
use crate::expr::Expression;
use crate::expr::arith_expr::ArithOperator;
use crate::expr::attribute::Attribute;
use crate::expr::comparison_expr::ComparisonOperator;
use crate::expr::conjunction_expr::ConjunctionOperator;

/// Expression compiled against the physical layout of its input rows.
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicalExpr {
    Column(usize),
    Literal(ScalarValue),
    Comparison {
        op: ComparisonOperator,
        left: Box<PhysicalExpr>,
        right: Box<PhysicalExpr>,
    },
    Arith {
        op: ArithOperator,
        /// Output type, determines integer vs float arithmetic.
        datatype: DataType,
        left: Box<PhysicalExpr>,
        right: Box<PhysicalExpr>,
    },
    Conjunction {
        op: ConjunctionOperator,
        left: Box<PhysicalExpr>,
        right: Box<PhysicalExpr>,
    },
    Not(Box<PhysicalExpr>),
    Negate(Box<PhysicalExpr>),
    IsNull(Box<PhysicalExpr>),
    IsNotNull(Box<PhysicalExpr>),
    Cast {
        child: Box<PhysicalExpr>,
        to: DataType,
    },
    GetField {
        child: Box<PhysicalExpr>,
        idx: usize,
    },
    CreateStruct(Vec<PhysicalExpr>),
    Coalesce(Vec<PhysicalExpr>),
}

/// Compile an expression, mapping column references to their position in
/// `input`.
pub fn compile(expr: &Expression, input: &[Attribute]) -> Result<PhysicalExpr> {
    compile_with(expr, &mut |expr| match expr {
        Expression::Column(attr) => input
            .iter()
            .position(|a| a.same_ref(attr))
            .map(|idx| Some(PhysicalExpr::Column(idx)))
            .ok_or_else(|| internal!("Missing column {attr} in input")),
        _ => Ok(None),
    })
}

/// Compile an expression, letting `bind` replace any subexpression before
/// it's compiled.
///
/// Every column reference must be replaced by `bind`.
pub fn compile_with<F>(expr: &Expression, bind: &mut F) -> Result<PhysicalExpr>
where
    F: FnMut(&Expression) -> Result<Option<PhysicalExpr>>,
{
    if let Some(bound) = bind(expr)? {
        return Ok(bound);
    }

    let child = |expr: &Expression, bind: &mut F| -> Result<Box<PhysicalExpr>> {
        Ok(Box::new(compile_with(expr, bind)?))
    };

    Ok(match expr {
        Expression::Column(attr) => return Err(internal!("Unbound column {attr}")),
        Expression::UnresolvedColumn(_)
        | Expression::UnresolvedStar(_)
        | Expression::ResolvedStar(_) => {
            return Err(internal!("Cannot compile unresolved expression {expr}"));
        }
        Expression::Aggregate(agg) => {
            return Err(internal!("Unexpected aggregate outside of aggregation: {agg}"));
        }
        Expression::Literal(value) => PhysicalExpr::Literal(value.clone()),
        Expression::Alias(alias) => compile_with(&alias.child, bind)?,
        Expression::Comparison(cmp) => PhysicalExpr::Comparison {
            op: cmp.op,
            left: child(&cmp.left, bind)?,
            right: child(&cmp.right, bind)?,
        },
        Expression::Arith(arith) => PhysicalExpr::Arith {
            op: arith.op,
            datatype: arith.datatype()?,
            left: child(&arith.left, bind)?,
            right: child(&arith.right, bind)?,
        },
        Expression::Conjunction(conj) => PhysicalExpr::Conjunction {
            op: conj.op,
            left: child(&conj.left, bind)?,
            right: child(&conj.right, bind)?,
        },
        Expression::Not(expr) => PhysicalExpr::Not(child(expr, bind)?),
        Expression::Negate(expr) => PhysicalExpr::Negate(child(expr, bind)?),
        Expression::IsNull(expr) => PhysicalExpr::IsNull(child(expr, bind)?),
        Expression::IsNotNull(expr) => PhysicalExpr::IsNotNull(child(expr, bind)?),
        Expression::Cast(cast) => PhysicalExpr::Cast {
            child: child(&cast.child, bind)?,
            to: cast.to.clone(),
        },
        Expression::GetField(get) => PhysicalExpr::GetField {
            idx: get.field_position()?.0,
            child: child(&get.child, bind)?,
        },
        Expression::CreateStruct(fields) => PhysicalExpr::CreateStruct(
            fields
                .iter()
                .map(|(_, expr)| compile_with(expr, bind))
                .collect::<Result<_>>()?,
        ),
        Expression::Coalesce(exprs) => PhysicalExpr::Coalesce(
            exprs
                .iter()
                .map(|expr| compile_with(expr, bind))
                .collect::<Result<_>>()?,
        ),
    })
}

impl PhysicalExpr {
    pub fn eval(&self, row: &Row) -> Result<ScalarValue> {
        Ok(match self {
            Self::Column(idx) => row.try_get(*idx)?.clone(),
            Self::Literal(value) => value.clone(),
            Self::Comparison { op, left, right } => {
                compare_values(*op, &left.eval(row)?, &right.eval(row)?)
            }
            Self::Arith {
                op,
                datatype,
                left,
                right,
            } => arith_values(*op, datatype, &left.eval(row)?, &right.eval(row)?)?,
            Self::Conjunction { op, left, right } => {
                let left = try_as_bool(&left.eval(row)?)?;
                match (op, left) {
                    (ConjunctionOperator::And, Some(false)) => return Ok(false.into()),
                    (ConjunctionOperator::Or, Some(true)) => return Ok(true.into()),
                    _ => (),
                }
                let right = try_as_bool(&right.eval(row)?)?;
                let out = match op {
                    ConjunctionOperator::And => match (left, right) {
                        (_, Some(false)) => Some(false),
                        (Some(true), Some(true)) => Some(true),
                        _ => None,
                    },
                    ConjunctionOperator::Or => match (left, right) {
                        (_, Some(true)) => Some(true),
                        (Some(false), Some(false)) => Some(false),
                        _ => None,
                    },
                };
                out.into()
            }
            Self::Not(child) => try_as_bool(&child.eval(row)?)?.map(|b| !b).into(),
            Self::Negate(child) => match child.eval(row)? {
                ScalarValue::Null => ScalarValue::Null,
                ScalarValue::Int32(v) => ScalarValue::Int32(v.wrapping_neg()),
                ScalarValue::Int64(v) => ScalarValue::Int64(v.wrapping_neg()),
                ScalarValue::Float64(v) => ScalarValue::Float64(-v),
                other => return Err(execution!("Cannot negate '{other}'")),
            },
            Self::IsNull(child) => child.eval(row)?.is_null().into(),
            Self::IsNotNull(child) => (!child.eval(row)?.is_null()).into(),
            Self::Cast { child, to } => child.eval(row)?.cast_to(to)?,
            Self::GetField { child, idx } => match child.eval(row)? {
                ScalarValue::Null => ScalarValue::Null,
                ScalarValue::Struct(mut values) if *idx < values.len() => values.swap_remove(*idx),
                other => return Err(execution!("Cannot extract field {idx} from '{other}'")),
            },
            Self::CreateStruct(exprs) => ScalarValue::Struct(
                exprs
                    .iter()
                    .map(|expr| expr.eval(row))
                    .collect::<Result<_>>()?,
            ),
            Self::Coalesce(exprs) => {
                for expr in exprs {
                    let value = expr.eval(row)?;
                    if !value.is_null() {
                        return Ok(value);
                    }
                }
                ScalarValue::Null
            }
        })
    }

    /// Evaluate as a predicate. Null is false.
    pub fn eval_predicate(&self, row: &Row) -> Result<bool> {
        Ok(matches!(self.eval(row)?, ScalarValue::Boolean(true)))
    }
}

fn try_as_bool(value: &ScalarValue) -> Result<Option<bool>> {
    match value {
        ScalarValue::Null => Ok(None),
        ScalarValue::Boolean(b) => Ok(Some(*b)),
        other => Err(execution!("Expected a boolean, got '{other}'")),
    }
}

fn compare_values(op: ComparisonOperator, left: &ScalarValue, right: &ScalarValue) -> ScalarValue {
    if op == ComparisonOperator::EqNullSafe {
        let eq = match (left.is_null(), right.is_null()) {
            (true, true) => true,
            (false, false) => left == right,
            _ => false,
        };
        return eq.into();
    }

    if left.is_null() || right.is_null() {
        return ScalarValue::Null;
    }

    let ord = left.cmp(right);
    let result = match op {
        ComparisonOperator::Eq | ComparisonOperator::EqNullSafe => ord == Ordering::Equal,
        ComparisonOperator::NotEq => ord != Ordering::Equal,
        ComparisonOperator::Lt => ord == Ordering::Less,
        ComparisonOperator::LtEq => ord != Ordering::Greater,
        ComparisonOperator::Gt => ord == Ordering::Greater,
        ComparisonOperator::GtEq => ord != Ordering::Less,
    };
    result.into()
}

/// Integer arithmetic wraps on overflow, division and remainder by zero
/// produce null.
fn arith_values(
    op: ArithOperator,
    datatype: &DataType,
    left: &ScalarValue,
    right: &ScalarValue,
) -> Result<ScalarValue> {
    if left.is_null() || right.is_null() {
        return Ok(ScalarValue::Null);
    }

    if op == ArithOperator::Div || datatype == &DataType::Float64 {
        let a = left.try_as_f64()?;
        let b = right.try_as_f64()?;
        return Ok(match op {
            ArithOperator::Add => ScalarValue::Float64(a + b),
            ArithOperator::Sub => ScalarValue::Float64(a - b),
            ArithOperator::Mul => ScalarValue::Float64(a * b),
            ArithOperator::Div | ArithOperator::Rem if b == 0.0 => ScalarValue::Null,
            ArithOperator::Div => ScalarValue::Float64(a / b),
            ArithOperator::Rem => ScalarValue::Float64(a % b),
        });
    }

    let a = left.try_as_i64()?;
    let b = right.try_as_i64()?;
    let value = match op {
        ArithOperator::Add => a.wrapping_add(b),
        ArithOperator::Sub => a.wrapping_sub(b),
        ArithOperator::Mul => a.wrapping_mul(b),
        ArithOperator::Div | ArithOperator::Rem if b == 0 => return Ok(ScalarValue::Null),
        ArithOperator::Div => a.wrapping_div(b),
        ArithOperator::Rem => a.wrapping_rem(b),
    };

    match datatype {
        DataType::Int32 => {
            // Recompute in 32 bits so overflow wraps at the narrower width.
            let (a, b) = (a as i32, b as i32);
            Ok(ScalarValue::Int32(match op {
                ArithOperator::Add => a.wrapping_add(b),
                ArithOperator::Sub => a.wrapping_sub(b),
                ArithOperator::Mul => a.wrapping_mul(b),
                ArithOperator::Div => a.wrapping_div(b),
                ArithOperator::Rem => a.wrapping_rem(b),
            }))
        }
        DataType::Int64 => Ok(ScalarValue::Int64(value)),
        other => Err(internal!("Unexpected arithmetic output type {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{arith, column, compare, lit};

    #[test]
    fn three_valued_logic() {
        let null = || Box::new(PhysicalExpr::Literal(ScalarValue::Null));
        let t = || Box::new(PhysicalExpr::Literal(true.into()));
        let f = || Box::new(PhysicalExpr::Literal(false.into()));
        let row = Row::empty();

        let and = |left, right| PhysicalExpr::Conjunction {
            op: ConjunctionOperator::And,
            left,
            right,
        };
        assert_eq!(ScalarValue::Null, and(null(), t()).eval(&row).unwrap());
        assert_eq!(ScalarValue::Boolean(false), and(null(), f()).eval(&row).unwrap());

        let or = |left, right| PhysicalExpr::Conjunction {
            op: ConjunctionOperator::Or,
            left,
            right,
        };
        assert_eq!(ScalarValue::Boolean(true), or(null(), t()).eval(&row).unwrap());
        assert_eq!(ScalarValue::Null, or(null(), f()).eval(&row).unwrap());
    }

    #[test]
    fn null_safe_equality() {
        assert_eq!(
            ScalarValue::Boolean(true),
            compare_values(ComparisonOperator::EqNullSafe, &ScalarValue::Null, &ScalarValue::Null)
        );
        assert_eq!(
            ScalarValue::Boolean(false),
            compare_values(ComparisonOperator::EqNullSafe, &ScalarValue::Null, &1.into())
        );
        assert_eq!(
            ScalarValue::Null,
            compare_values(ComparisonOperator::Eq, &ScalarValue::Null, &1.into())
        );
    }

    #[test]
    fn compile_and_eval() {
        let a = Attribute::new("a", DataType::Int32, false);
        let b = Attribute::new("b", DataType::Int64, false);
        let input = vec![a.clone(), b.clone()];

        let expr = compare(
            ComparisonOperator::Gt,
            arith(ArithOperator::Add, column(&a), column(&b)),
            lit(10),
        );
        let physical = compile(&expr, &input).unwrap();

        assert_eq!(
            ScalarValue::Boolean(true),
            physical.eval(&crate::row![5, 6_i64]).unwrap()
        );
        assert_eq!(
            ScalarValue::Boolean(false),
            physical.eval(&crate::row![5, 5_i64]).unwrap()
        );
    }

    #[test]
    fn division() {
        let a = Attribute::new("a", DataType::Int32, false);
        let input = vec![a.clone()];

        let div = compile(&arith(ArithOperator::Div, column(&a), lit(2)), &input).unwrap();
        assert_eq!(ScalarValue::Float64(2.5), div.eval(&crate::row![5]).unwrap());

        let by_zero = compile(&arith(ArithOperator::Div, column(&a), lit(0)), &input).unwrap();
        assert_eq!(ScalarValue::Null, by_zero.eval(&crate::row![5]).unwrap());

        let overflow = compile(&arith(ArithOperator::Add, column(&a), lit(1)), &input).unwrap();
        assert_eq!(
            ScalarValue::Int32(i32::MIN),
            overflow.eval(&crate::row![i32::MAX]).unwrap()
        );
    }
}
