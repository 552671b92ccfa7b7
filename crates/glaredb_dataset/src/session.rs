//! Session owning the collaborators every dataset uses.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::arrays::datatype::DataType;
use crate::arrays::field::Schema;
use crate::arrays::row::Row;
use crate::arrays::scalar::ScalarValue;
use crate::cache::{CacheManager, CachedData, MemoryCacheManager};
use crate::config::DatasetConfig;
use crate::dataset::{DataFrame, Dataset};
use crate::encoder::{Encodable, UnresolvedEncoder};
use crate::engine::memory::MemoryQueryEngine;
use crate::engine::{AnalyzedPlan, AnalyzerOptions, ExecutionId, QueryEngine};
use crate::errors::{DatasetError, Result};
use crate::expr::attribute::Attribute;
use crate::listener::{ExecutionListenerManager, QueryExecutionListener};
use crate::logical::logical_command::{CommandEffect, LogicalCommand};
use crate::logical::logical_local::LogicalLocalRelation;
use crate::logical::logical_range::LogicalRange;
use crate::logical::operator::{LogicalNode, LogicalOperator, Node};
use crate::logical::resolver::{NameMatcher, name_matcher};
use crate::parser::{ExpressionParser, SqlExpressionParser};

/// Entry point for creating datasets.
///
/// Cheap to clone. Clones share the engine, cache, listeners and
/// configuration.
#[derive(Debug, Clone)]
pub struct DatasetSession {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    engine: Arc<dyn QueryEngine>,
    parser: Arc<dyn ExpressionParser>,
    cache: Arc<dyn CacheManager>,
    listeners: ExecutionListenerManager,
    config: RwLock<DatasetConfig>,
}

impl DatasetSession {
    pub fn new(
        engine: Arc<dyn QueryEngine>,
        parser: Arc<dyn ExpressionParser>,
        cache: Arc<dyn CacheManager>,
        config: DatasetConfig,
    ) -> Self {
        DatasetSession {
            inner: Arc::new(SessionInner {
                engine,
                parser,
                cache,
                listeners: ExecutionListenerManager::new(),
                config: RwLock::new(config),
            }),
        }
    }

    /// Session backed by the in-memory engine and cache.
    pub fn local() -> Self {
        let config = DatasetConfig::default();
        debug!(?config, "creating local dataset session");
        Self::new(
            Arc::new(MemoryQueryEngine),
            Arc::new(SqlExpressionParser),
            Arc::new(MemoryCacheManager::new()),
            config,
        )
    }

    pub(crate) fn engine(&self) -> &dyn QueryEngine {
        self.inner.engine.as_ref()
    }

    pub(crate) fn parser(&self) -> &dyn ExpressionParser {
        self.inner.parser.as_ref()
    }

    pub(crate) fn cache(&self) -> &dyn CacheManager {
        self.inner.cache.as_ref()
    }

    pub fn listeners(&self) -> &ExecutionListenerManager {
        &self.inner.listeners
    }

    pub fn register_listener(&self, listener: Arc<dyn QueryExecutionListener>) {
        self.inner.listeners.register(listener)
    }

    pub fn unregister_listener(&self, listener: &Arc<dyn QueryExecutionListener>) -> bool {
        self.inner.listeners.unregister(listener)
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> DatasetConfig {
        self.inner.config.read().clone()
    }

    pub fn set_config(&self, name: &str, value: impl Into<ScalarValue>) -> Result<()> {
        self.inner.config.write().set_from_scalar(name, value.into())
    }

    pub fn get_config(&self, name: &str) -> Result<ScalarValue> {
        self.inner.config.read().get_as_scalar(name)
    }

    pub fn reset_config(&self, name: &str) -> Result<()> {
        self.inner.config.write().reset(name)
    }

    pub(crate) fn matcher(&self) -> NameMatcher {
        name_matcher(self.inner.config.read().case_sensitive)
    }

    pub(crate) fn default_partitions(&self) -> usize {
        usize::try_from(self.inner.config.read().default_partitions).unwrap_or(1)
    }

    pub(crate) fn analyze(&self, plan: &LogicalOperator) -> Result<AnalyzedPlan> {
        let options = AnalyzerOptions {
            case_sensitive: self.inner.config.read().case_sensitive,
        };
        self.engine().analyze(plan, &options)
    }

    /// Create a dataset from values.
    ///
    /// Errors if `T` doesn't describe its columns up front, as is the case for
    /// `Row`. Use `create_dataframe` for rows.
    pub fn create_dataset<T: Encodable>(
        &self,
        values: impl IntoIterator<Item = T>,
    ) -> Result<Dataset<T>> {
        let schema = UnresolvedEncoder::<T>::new().schema()?;
        let rows = values
            .into_iter()
            .map(|value| Row::new(value.encode()))
            .collect();
        Dataset::new(self.clone(), self.local_relation(&schema, rows))
    }

    /// Create a dataframe from rows matching `schema`.
    ///
    /// Values are cast to the types of the schema.
    pub fn create_dataframe(&self, rows: Vec<Row>, schema: Schema) -> Result<DataFrame> {
        let rows = rows
            .into_iter()
            .map(|row| conform_row(row, &schema))
            .collect::<Result<Vec<_>>>()?;
        Dataset::new(self.clone(), self.local_relation(&schema, rows))
    }

    /// Dataset of `i64` values in `[start, end)` incremented by `step`, in a
    /// column named "id".
    ///
    /// Values are generated when the dataset is read. A limit directly on the
    /// range only generates the values it keeps, so `head` works on ranges
    /// far too large to collect.
    pub fn range(&self, start: i64, end: i64, step: i64) -> Result<Dataset<i64>> {
        if step == 0 {
            return Err(DatasetError::InvalidArgument(
                "The step of range must not be 0".to_string(),
            ));
        }

        let range = LogicalRange {
            start,
            end,
            step,
            output: Attribute::new("id", DataType::Int64, false),
            partitions: self.default_partitions(),
        };
        Dataset::new(
            self.clone(),
            LogicalOperator::Range(Node::new(range, Vec::new())),
        )
    }

    /// Dataframe wrapping a command with side effects.
    ///
    /// The command runs once, when this is called. The returned dataframe
    /// holds the rows the command produced and never runs it again.
    pub fn command<F>(&self, name: impl Into<String>, schema: Schema, effect: F) -> Result<DataFrame>
    where
        F: Fn() -> Result<Vec<Row>> + Send + Sync + 'static,
    {
        let command = LogicalCommand {
            name: name.into(),
            effect: CommandEffect::new(effect),
            output: schema.fields.iter().map(Attribute::from_field).collect(),
        };
        Dataset::new(
            self.clone(),
            LogicalOperator::Command(Node::new(command, Vec::new())),
        )
    }

    fn local_relation(&self, schema: &Schema, rows: Vec<Row>) -> LogicalOperator {
        LogicalOperator::LocalRelation(Node::new(
            LogicalLocalRelation {
                output: schema.fields.iter().map(Attribute::from_field).collect(),
                rows: Arc::new(rows),
                partitions: self.default_partitions(),
            },
            Vec::new(),
        ))
    }

    /// Replace cached subtrees of `plan` with their materialized rows,
    /// materializing any that haven't been used yet.
    pub(crate) fn with_cached_data(
        &self,
        plan: &Arc<LogicalOperator>,
    ) -> Result<Arc<LogicalOperator>> {
        if self.cache().is_empty() {
            return Ok(plan.clone());
        }
        self.substitute_cached(plan)
    }

    fn substitute_cached(&self, plan: &Arc<LogicalOperator>) -> Result<Arc<LogicalOperator>> {
        let lookup = match self.cache().lookup(plan) {
            Some(lookup) => lookup,
            None => return self.substitute_cached_children(plan),
        };

        let data = match lookup.data {
            Some(data) => data,
            None => {
                let uncached = self.substitute_cached_children(plan)?;
                let prepared = self.engine().prepare(uncached, ExecutionId::next())?;
                let partitions = prepared.execute()?;
                let data = CachedData {
                    partitions: partitions.len().max(1),
                    rows: Arc::new(partitions.into_iter().flatten().collect()),
                };
                debug!(level = %lookup.level, rows = data.rows.len(), "materialized cached plan");
                self.cache().fill(plan, data.clone());
                data
            }
        };

        Ok(Arc::new(LogicalOperator::LocalRelation(Node::new(
            LogicalLocalRelation {
                output: plan.output()?,
                rows: data.rows,
                partitions: data.partitions,
            },
            Vec::new(),
        ))))
    }

    fn substitute_cached_children(
        &self,
        plan: &Arc<LogicalOperator>,
    ) -> Result<Arc<LogicalOperator>> {
        if plan.children().is_empty() {
            return Ok(plan.clone());
        }
        let mut plan = plan.as_ref().clone();
        plan.modify_replace_children(&mut |child| self.substitute_cached(&child))?;
        Ok(Arc::new(plan))
    }
}

fn conform_row(row: Row, schema: &Schema) -> Result<Row> {
    if row.len() != schema.num_fields() {
        return Err(DatasetError::InvalidArgument(format!(
            "Row has {} values, but schema {schema} has {} fields",
            row.len(),
            schema.num_fields()
        )));
    }
    row.into_values()
        .into_iter()
        .zip(&schema.fields)
        .map(|(value, field)| {
            if value.is_null() && !field.nullable {
                return Err(DatasetError::InvalidArgument(format!(
                    "Null value for non-nullable field '{}'",
                    field.name
                )));
            }
            value.cast_to(&field.datatype)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::field::Field;
    use crate::row;

    #[test]
    fn config_set_get_reset() {
        let session = DatasetSession::local();
        assert_eq!(
            ScalarValue::Boolean(false),
            session.get_config("case_sensitive").unwrap()
        );

        session.set_config("case_sensitive", true).unwrap();
        assert!(session.config().case_sensitive);

        session.reset_config("case_sensitive").unwrap();
        assert!(!session.config().case_sensitive);

        let err = session.set_config("no_such_setting", 1).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn create_dataframe_checks_rows() {
        let session = DatasetSession::local();
        let schema = Schema::new([
            Field::new("a", DataType::Int64, true),
            Field::new("b", DataType::Utf8, false),
        ]);

        let df = session
            .create_dataframe(vec![row![1, "x"]], schema.clone())
            .unwrap();
        assert_eq!(vec![row![1_i64, "x"]], df.collect().unwrap());

        let err = session
            .create_dataframe(vec![row![1]], schema.clone())
            .unwrap_err();
        assert!(err.is_invalid_argument());

        let err = session
            .create_dataframe(vec![row![1, ScalarValue::Null]], schema)
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn range_values() {
        let session = DatasetSession::local();
        assert_eq!(vec![0, 2, 4], session.range(0, 5, 2).unwrap().collect().unwrap());
        assert_eq!(vec![3, 2], session.range(3, 1, -1).unwrap().collect().unwrap());
        assert!(session.range(0, 1, 0).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn range_generates_lazily() {
        let session = DatasetSession::local();
        let huge = session.range(0, i64::MAX, 1).unwrap();
        assert_eq!(vec![0, 1, 2], huge.head(3).unwrap());
        assert_eq!(vec![0, 1, 2], huge.limit(3).unwrap().collect().unwrap());
        assert_eq!(Some(0), huge.first().unwrap());
        assert!(huge.explain(false).starts_with("Range"));

        let err = huge.collect().unwrap_err();
        assert!(err.is_execution(), "{err}");

        let down = session.range(i64::MAX, i64::MIN, i64::MIN).unwrap();
        assert_eq!(vec![i64::MAX, -1], down.collect().unwrap());
        assert_eq!(vec![10, 7], session.range(10, 5, -3).unwrap().head(5).unwrap());
        assert!(session.range(5, 10, -1).unwrap().collect().unwrap().is_empty());
    }
}
