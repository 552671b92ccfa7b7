use super::operator::{LogicalNode, Node};
use crate::arrays::row::Row;
use crate::arrays::scalar::ScalarValue;
use crate::errors::Result;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable, attribute_names};
use crate::expr::Expression;
use crate::expr::attribute::Attribute;

/// Arithmetic sequence of `i64` values, generated when read.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalRange {
    pub start: i64,
    pub end: i64,
    /// Never 0.
    pub step: i64,
    pub output: Attribute,
    pub partitions: usize,
}

impl LogicalRange {
    /// Number of values in the sequence.
    pub fn len(&self) -> u64 {
        let (span, step) = if self.step > 0 && self.start < self.end {
            (self.end.abs_diff(self.start), self.step.unsigned_abs())
        } else if self.step < 0 && self.start > self.end {
            (self.start.abs_diff(self.end), self.step.unsigned_abs())
        } else {
            return 0;
        };
        span.div_ceil(step)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows for the values at positions `[from, to)` of the sequence.
    pub fn rows(&self, from: u64, to: u64) -> impl Iterator<Item = Row> + '_ {
        let to = to.min(self.len());
        (from..to).map(move |idx| {
            // Positions below `len` stay within `[start, end)`, so this never
            // overflows.
            let value = i128::from(self.start) + i128::from(idx) * i128::from(self.step);
            Row::new(vec![ScalarValue::Int64(value as i64)])
        })
    }
}

impl Explainable for LogicalRange {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Range")
            .with_values("output", attribute_names(conf, std::slice::from_ref(&self.output)))
            .with_value("start", self.start)
            .with_value("end", self.end)
            .with_value("step", self.step)
            .with_verbose_value(conf, "partitions", self.partitions)
    }
}

impl LogicalNode for Node<LogicalRange> {
    fn name(&self) -> &'static str {
        "Range"
    }

    fn output(&self) -> Result<Vec<Attribute>> {
        Ok(vec![self.node.output.clone()])
    }

    fn for_each_expr<F>(&self, _func: &mut F) -> Result<()>
    where
        F: FnMut(&Expression) -> Result<()>,
    {
        Ok(())
    }

    fn for_each_expr_mut<F>(&mut self, _func: &mut F) -> Result<()>
    where
        F: FnMut(&mut Expression) -> Result<()>,
    {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::datatype::DataType;

    fn range(start: i64, end: i64, step: i64) -> LogicalRange {
        LogicalRange {
            start,
            end,
            step,
            output: Attribute::new("id", DataType::Int64, false),
            partitions: 1,
        }
    }

    fn values(range: &LogicalRange, from: u64, to: u64) -> Vec<i64> {
        range
            .rows(from, to)
            .map(|row| row.get(0).unwrap().try_as_i64().unwrap())
            .collect()
    }

    #[test]
    fn lengths() {
        assert_eq!(3, range(0, 5, 2).len());
        assert_eq!(2, range(3, 1, -1).len());
        assert_eq!(0, range(5, 0, 1).len());
        assert_eq!(0, range(0, 5, -1).len());
        assert_eq!(i64::MAX as u64, range(0, i64::MAX, 1).len());
        assert_eq!(u64::MAX, range(i64::MIN, i64::MAX, 1).len());
        assert_eq!(2, range(i64::MAX, i64::MIN, i64::MIN).len());
    }

    #[test]
    fn rows_in_bounds() {
        assert_eq!(vec![0, 2, 4], values(&range(0, 5, 2), 0, 10));
        assert_eq!(vec![2, 4], values(&range(0, 5, 2), 1, 3));
        assert_eq!(vec![0, 1, 2], values(&range(0, i64::MAX, 1), 0, 3));
        assert_eq!(vec![i64::MAX - 1], values(&range(i64::MAX - 3, i64::MAX, 2), 1, 5));
        assert_eq!(vec![3, 0, -3], values(&range(3, -4, -3), 0, 10));
        assert_eq!(vec![i64::MAX, -1], values(&range(i64::MAX, i64::MIN, i64::MIN), 0, 10));
    }
}
