use std::collections::HashSet;

use ahash::RandomState;

use crate::arrays::datatype::DataType;
use crate::arrays::scalar::ScalarValue;
use crate::errors::Result;
use crate::expr::aggregate_expr::{AggregateExpr, AggregateFunction};

#[derive(Debug, Clone, PartialEq)]
enum Accumulator {
    Count(i64),
    SumInt(Option<i64>),
    SumFloat(Option<f64>),
    Avg { sum: f64, count: i64 },
    Min(Option<ScalarValue>),
    Max(Option<ScalarValue>),
    /// Outer option tracks if a value's been seen, the value itself may be
    /// null.
    First(Option<ScalarValue>),
    /// Running variance using Welford's method.
    Stddev { count: i64, mean: f64, m2: f64 },
}

/// State for a single aggregate in a single group.
#[derive(Debug, Clone)]
pub struct AggregateState {
    acc: Accumulator,
    /// Values already seen for distinct aggregates.
    seen: Option<HashSet<ScalarValue, RandomState>>,
}

impl AggregateState {
    pub fn try_new(agg: &AggregateExpr) -> Result<Self> {
        let acc = match agg.function {
            AggregateFunction::Count => Accumulator::Count(0),
            AggregateFunction::Sum => match agg.datatype()? {
                DataType::Float64 => Accumulator::SumFloat(None),
                _ => Accumulator::SumInt(None),
            },
            AggregateFunction::Avg => Accumulator::Avg { sum: 0.0, count: 0 },
            AggregateFunction::Min => Accumulator::Min(None),
            AggregateFunction::Max => Accumulator::Max(None),
            AggregateFunction::First => Accumulator::First(None),
            AggregateFunction::StddevSamp => Accumulator::Stddev {
                count: 0,
                mean: 0.0,
                m2: 0.0,
            },
        };

        Ok(AggregateState {
            acc,
            seen: agg.distinct.then(HashSet::default),
        })
    }

    pub fn update(&mut self, value: ScalarValue) -> Result<()> {
        if let Some(seen) = &mut self.seen {
            if !seen.insert(value.clone()) {
                return Ok(());
            }
        }

        if let Accumulator::First(first) = &mut self.acc {
            if first.is_none() {
                *first = Some(value);
            }
            return Ok(());
        }

        if value.is_null() {
            return Ok(());
        }

        match &mut self.acc {
            Accumulator::Count(count) => *count += 1,
            Accumulator::SumInt(sum) => {
                *sum = Some(sum.unwrap_or(0).wrapping_add(value.try_as_i64()?));
            }
            Accumulator::SumFloat(sum) => *sum = Some(sum.unwrap_or(0.0) + value.try_as_f64()?),
            Accumulator::Avg { sum, count } => {
                *sum += value.try_as_f64()?;
                *count += 1;
            }
            Accumulator::Min(min) => {
                if min.as_ref().is_none_or(|min| &value < min) {
                    *min = Some(value);
                }
            }
            Accumulator::Max(max) => {
                if max.as_ref().is_none_or(|max| &value > max) {
                    *max = Some(value);
                }
            }
            Accumulator::Stddev { count, mean, m2 } => {
                let x = value.try_as_f64()?;
                *count += 1;
                let delta = x - *mean;
                *mean += delta / *count as f64;
                *m2 += delta * (x - *mean);
            }
            Accumulator::First(_) => (),
        }

        Ok(())
    }

    pub fn finalize(self) -> ScalarValue {
        match self.acc {
            Accumulator::Count(count) => ScalarValue::Int64(count),
            Accumulator::SumInt(sum) => sum.into(),
            Accumulator::SumFloat(sum) => sum.into(),
            Accumulator::Avg { count: 0, .. } => ScalarValue::Null,
            Accumulator::Avg { sum, count } => ScalarValue::Float64(sum / count as f64),
            Accumulator::Min(v) | Accumulator::Max(v) | Accumulator::First(v) => {
                v.unwrap_or(ScalarValue::Null)
            }
            Accumulator::Stddev { count, m2, .. } if count >= 2 => {
                ScalarValue::Float64((m2 / (count - 1) as f64).sqrt())
            }
            Accumulator::Stddev { .. } => ScalarValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::aggregate;
    use crate::expr::attribute::Attribute;
    use crate::expr::column;

    fn state(function: AggregateFunction, distinct: bool) -> AggregateState {
        let attr = Attribute::new("v", DataType::Int32, true);
        match aggregate(function, column(&attr), distinct) {
            crate::expr::Expression::Aggregate(agg) => AggregateState::try_new(&agg).unwrap(),
            other => panic!("unexpected: {other:?}"),
        }
    }

    fn run(mut state: AggregateState, values: &[ScalarValue]) -> ScalarValue {
        for v in values {
            state.update(v.clone()).unwrap();
        }
        state.finalize()
    }

    #[test]
    fn count_skips_nulls() {
        let values = [1.into(), ScalarValue::Null, 1.into()];
        assert_eq!(
            ScalarValue::Int64(2),
            run(state(AggregateFunction::Count, false), &values)
        );
        assert_eq!(
            ScalarValue::Int64(1),
            run(state(AggregateFunction::Count, true), &values)
        );
    }

    #[test]
    fn empty_inputs() {
        assert_eq!(ScalarValue::Int64(0), run(state(AggregateFunction::Count, false), &[]));
        assert_eq!(ScalarValue::Null, run(state(AggregateFunction::Sum, false), &[]));
        assert_eq!(ScalarValue::Null, run(state(AggregateFunction::Avg, false), &[]));
        assert_eq!(ScalarValue::Null, run(state(AggregateFunction::Max, false), &[]));
    }

    #[test]
    fn first_keeps_nulls() {
        let values = [ScalarValue::Null, 2.into()];
        assert_eq!(
            ScalarValue::Null,
            run(state(AggregateFunction::First, false), &values)
        );
    }

    #[test]
    fn sample_stddev() {
        let values = [2.into(), 4.into(), 4.into(), 4.into(), 5.into(), 5.into(), 7.into(), 9.into()];
        let got = run(state(AggregateFunction::StddevSamp, false), &values)
            .try_as_f64()
            .unwrap();
        assert!((got - 2.138089935299395).abs() < 1e-9);

        assert_eq!(
            ScalarValue::Null,
            run(state(AggregateFunction::StddevSamp, false), &[1.into()])
        );
    }
}
