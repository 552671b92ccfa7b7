//! Deterministic sampling and splitting of plans.

use std::sync::Arc;

use super::builder::PlanBuilder;
use super::operator::LogicalOperator;
use super::resolver::NameMatcher;
use crate::errors::{DatasetError, Result};
use crate::expr::attribute::Attribute;

/// Validate weights and compute the cumulative bounds of each split.
///
/// Returns one more bound than there are weights, starting at 0 and ending at
/// 1.
pub fn split_bounds(weights: &[f64]) -> Result<Vec<f64>> {
    if weights.is_empty() {
        return Err(DatasetError::InvalidArgument(
            "Weights must not be empty".to_string(),
        ));
    }
    if let Some(w) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(DatasetError::InvalidArgument(format!(
            "Weights must be nonnegative, got {w}"
        )));
    }
    let sum: f64 = weights.iter().sum();
    if sum <= 0.0 {
        return Err(DatasetError::InvalidArgument(format!(
            "Sum of weights must be positive, but got {sum}"
        )));
    }

    let mut bounds = Vec::with_capacity(weights.len() + 1);
    bounds.push(0.0);
    let mut running = 0.0;
    for w in weights {
        running += w / sum;
        bounds.push(running);
    }
    // Guard against rounding leaving the last bound just under 1.
    if let Some(last) = bounds.last_mut() {
        *last = 1.0;
    }

    Ok(bounds)
}

/// Build one plan per weight, each sampling a disjoint range of the same
/// random draws.
///
/// The input is totally ordered on all of its columns first so that every
/// split sees rows in the same order no matter how often, or in what order,
/// the splits are executed.
pub fn random_split_plans(
    plan: &Arc<LogicalOperator>,
    output: &[Attribute],
    matcher: NameMatcher,
    weights: &[f64],
    seed: u64,
) -> Result<Vec<LogicalOperator>> {
    let bounds = split_bounds(weights)?;

    let sorted = Arc::new(PlanBuilder::new(plan, output, matcher).order_all());
    let builder = PlanBuilder::new(&sorted, output, matcher);

    Ok(bounds
        .windows(2)
        .map(|w| builder.sample(w[0], w[1], false, seed))
        .collect())
}

/// Validate a sampling fraction.
pub fn validate_fraction(fraction: f64, with_replacement: bool) -> Result<()> {
    if !fraction.is_finite() || fraction < 0.0 {
        return Err(DatasetError::InvalidArgument(format!(
            "Sampling fraction ({fraction}) must be nonnegative"
        )));
    }
    if !with_replacement && fraction > 1.0 {
        return Err(DatasetError::InvalidArgument(format!(
            "Sampling fraction ({fraction}) must be on interval [0, 1] without replacement"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::datatype::DataType;
    use crate::logical::logical_local::LogicalLocalRelation;
    use crate::logical::operator::Node;
    use crate::logical::resolver::case_insensitive_match;

    #[test]
    fn bounds_normalized() {
        assert_eq!(vec![0.0, 0.25, 1.0], split_bounds(&[1.0, 3.0]).unwrap());
        assert_eq!(vec![0.0, 0.5, 0.5, 1.0], split_bounds(&[1.0, 0.0, 1.0]).unwrap());
    }

    #[test]
    fn invalid_weights() {
        assert!(split_bounds(&[]).unwrap_err().is_invalid_argument());
        assert!(split_bounds(&[1.0, -1.0]).unwrap_err().is_invalid_argument());
        assert!(split_bounds(&[0.0, 0.0]).unwrap_err().is_invalid_argument());
        assert!(split_bounds(&[f64::NAN]).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn splits_share_sorted_input() {
        let output = vec![Attribute::new("a", DataType::Int32, true)];
        let plan = Arc::new(LogicalOperator::LocalRelation(Node::new(
            LogicalLocalRelation {
                output: output.clone(),
                rows: Arc::new(Vec::new()),
                partitions: 2,
            },
            Vec::new(),
        )));

        let splits =
            random_split_plans(&plan, &output, case_insensitive_match, &[0.5, 0.5], 42).unwrap();
        assert_eq!(2, splits.len());

        let inputs: Vec<_> = splits
            .iter()
            .map(|split| match split {
                LogicalOperator::Sample(sample) => {
                    assert_eq!(42, sample.node.seed);
                    assert!(!sample.node.with_replacement);
                    sample.children[0].clone()
                }
                other => panic!("unexpected: {other:?}"),
            })
            .collect();

        assert!(Arc::ptr_eq(&inputs[0], &inputs[1]));
        assert!(matches!(inputs[0].as_ref(), LogicalOperator::Order(o) if o.node.global));
    }
}
