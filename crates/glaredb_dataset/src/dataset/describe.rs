use std::iter;

use super::{DataFrame, Dataset};
use crate::arrays::datatype::DataType;
use crate::arrays::field::{Field, Schema};
use crate::encoder::Encodable;
use crate::errors::{Result, analysis, internal};
use crate::expr::Expression;
use crate::expr::attribute::Attribute;
use crate::instrument::run_instrumented;
use crate::logical::builder::pivot_describe;

impl<T: Encodable> Dataset<T> {
    /// Compute basic statistics for the named columns, or every numeric
    /// column if none are named.
    ///
    /// The result has a "summary" column naming the statistic (count, mean,
    /// stddev, min, max) followed by one string column per described column.
    /// This is an action, statistics are computed when this is called.
    pub fn describe(&self, names: &[&str]) -> Result<DataFrame> {
        let columns: Vec<Attribute> = if names.is_empty() {
            self.output
                .iter()
                .filter(|attr| attr.datatype.is_numeric())
                .cloned()
                .collect()
        } else {
            let resolver = self.builder().resolver();
            names
                .iter()
                .map(|name| match resolver.resolve_one(name)? {
                    Expression::Column(attr) => Ok(attr),
                    other => Err(analysis!("Cannot describe nested field '{other}'")),
                })
                .collect::<Result<_>>()?
        };

        let plan = self.builder().describe_aggregate(&columns)?;
        let analyzed = self.session.analyze(&plan)?;

        let flat = run_instrumented(&self.session, "describe", &analyzed.plan, |prepared| {
            prepared
                .execute()?
                .into_iter()
                .flatten()
                .next()
                .ok_or_else(|| internal!("Describe aggregate produced no rows"))
        })?;
        let rows = pivot_describe(&flat, columns.len())?;

        let schema = Schema::new(
            iter::once(Field::new("summary", DataType::Utf8, false)).chain(
                columns
                    .iter()
                    .map(|attr| Field::new(attr.name.clone(), DataType::Utf8, true)),
            ),
        );
        self.session.create_dataframe(rows, schema)
    }
}

#[cfg(test)]
mod tests {
    use crate::arrays::datatype::DataType;
    use crate::arrays::field::{Field, Schema};
    use crate::arrays::scalar::ScalarValue;
    use crate::row;
    use crate::session::DatasetSession;

    #[test]
    fn describe_numeric_columns() {
        let session = DatasetSession::local();
        let df = session
            .create_dataframe(
                vec![row!["a", 1], row!["b", 3]],
                Schema::new([
                    Field::new("name", DataType::Utf8, false),
                    Field::new("v", DataType::Int32, true),
                ]),
            )
            .unwrap();

        let described = df.describe(&[]).unwrap();
        assert_eq!(vec!["summary", "v"], described.columns());

        let rows = described.collect().unwrap();
        assert_eq!(5, rows.len());
        assert_eq!(row!["count", "2"], rows[0]);
        assert_eq!(row!["min", "1"], rows[3]);
        assert_eq!(row!["max", "3"], rows[4]);
        assert_ne!(&ScalarValue::Null, rows[2].get(1).unwrap());

        let described = df.describe(&["name"]).unwrap();
        assert_eq!(row!["max", "b"], described.collect().unwrap()[4]);

        assert!(df.describe(&["missing"]).unwrap_err().is_analysis());
    }
}
