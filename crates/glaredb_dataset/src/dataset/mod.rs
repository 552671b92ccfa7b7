//! Typed, lazily evaluated collections.
//!
//! A [`Dataset`] holds an analyzed plan and an encoder bound to that plan's
//! output. Transformations build a new plan on top of the current one and
//! return a new dataset without executing anything. Actions execute the plan
//! through the session's query engine and decode the resulting rows.

mod describe;
mod grouped;

pub use grouped::GroupedData;

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::arrays::field::Schema;
use crate::arrays::row::Row;
use crate::cache::StorageLevel;
use crate::encoder::{BoundEncoder, Encodable, UnresolvedEncoder};
use crate::engine::AnalyzedPlan;
use crate::errors::{DatasetError, Result, analysis, internal};
use crate::explain::explainable::ExplainConfig;
use crate::explain::node::ExplainNode;
use crate::expr::aggregate_expr::AggregateFunction;
use crate::expr::attribute::Attribute;
use crate::expr::column::Column;
use crate::expr::sort_expr::SortExpr;
use crate::expr::{Expression, aggregate, lit};
use crate::functions::col;
use crate::instrument::run_instrumented;
use crate::logical::builder::PlanBuilder;
use crate::logical::logical_join::JoinType;
use crate::logical::logical_local::LogicalLocalRelation;
use crate::logical::logical_map::RowFunction;
use crate::logical::logical_project::LogicalProject;
use crate::logical::logical_setop::SetOpKind;
use crate::logical::operator::{LogicalNode, LogicalOperator, Node};
use crate::logical::resolver::{NameMatcher, resolve_expression};
use crate::logical::self_join::{disambiguate_self_join, needs_disambiguation};
use crate::logical::split::{random_split_plans, validate_fraction};
use crate::session::DatasetSession;

/// Untyped dataset, one [`Row`] per record.
pub type DataFrame = Dataset<Row>;

/// A lazily evaluated collection of `T`.
pub struct Dataset<T> {
    session: DatasetSession,
    plan: Arc<LogicalOperator>,
    output: Vec<Attribute>,
    encoder: Arc<BoundEncoder<T>>,
}

impl<T> Clone for Dataset<T> {
    fn clone(&self) -> Self {
        Dataset {
            session: self.session.clone(),
            plan: self.plan.clone(),
            output: self.output.clone(),
            encoder: self.encoder.clone(),
        }
    }
}

impl<T> fmt::Debug for Dataset<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("type", &std::any::type_name::<T>())
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

impl<T: Encodable> Dataset<T> {
    /// Analyze `plan` and bind an encoder for `T` to its output.
    ///
    /// Plans made of side effecting commands are executed here, once, and
    /// the dataset wraps their result instead.
    pub(crate) fn new(session: DatasetSession, plan: LogicalOperator) -> Result<Self> {
        let analyzed = session.analyze(&plan)?;
        let analyzed = if analyzed.plan.is_eager_command() {
            materialize_command(&session, analyzed)?
        } else {
            analyzed
        };
        Self::from_analyzed(session, analyzed)
    }

    fn from_analyzed(session: DatasetSession, analyzed: AnalyzedPlan) -> Result<Self> {
        let encoder = UnresolvedEncoder::<T>::new()
            .resolve(&analyzed.output, session.matcher())?
            .bind();
        Ok(Dataset {
            session,
            plan: analyzed.plan,
            output: analyzed.output,
            encoder: Arc::new(encoder),
        })
    }

    fn derive<U: Encodable>(&self, plan: LogicalOperator) -> Result<Dataset<U>> {
        Dataset::new(self.session.clone(), plan)
    }

    fn builder(&self) -> PlanBuilder<'_> {
        PlanBuilder::new(&self.plan, &self.output, self.session.matcher())
    }

    fn matcher(&self) -> NameMatcher {
        self.session.matcher()
    }

    pub fn session(&self) -> &DatasetSession {
        &self.session
    }

    /// The analyzed plan.
    pub fn plan(&self) -> &Arc<LogicalOperator> {
        &self.plan
    }

    pub fn output(&self) -> &[Attribute] {
        &self.output
    }

    pub fn encoder(&self) -> &BoundEncoder<T> {
        &self.encoder
    }

    pub fn schema(&self) -> Schema {
        Schema::new(self.output.iter().map(Attribute::to_field))
    }

    pub fn columns(&self) -> Vec<String> {
        self.output.iter().map(|attr| attr.name.clone()).collect()
    }

    /// Reference a column of this dataset.
    ///
    /// Unlike [`col`], the returned column is bound to this dataset's
    /// attributes, so it keeps referring to this dataset's column when used
    /// in a join with another dataset having a column of the same name.
    pub fn col(&self, name: &str) -> Result<Column> {
        if name == "*" {
            return Ok(Column::new(Expression::ResolvedStar(self.output.clone())));
        }
        Ok(Column::new(
            self.builder().resolver().resolve_one(name)?,
        ))
    }

    /// Render the analyzed plan.
    pub fn explain(&self, verbose: bool) -> String {
        let depth = usize::try_from(self.session.config().max_explain_depth).unwrap_or(usize::MAX);
        ExplainNode::walk_logical(ExplainConfig { verbose }, &self.plan, depth).to_string()
    }

    pub fn select(&self, columns: impl IntoIterator<Item = Column>) -> Result<DataFrame> {
        let projections = columns.into_iter().map(Column::into_expr).collect();
        self.derive(self.builder().project(projections))
    }

    pub fn select_names(&self, names: &[&str]) -> Result<DataFrame> {
        self.select(names.iter().map(|name| col(name)))
    }

    /// Select SQL expressions, e.g. `"age + 1 AS next"`.
    pub fn select_expr(&self, exprs: &[&str]) -> Result<DataFrame> {
        let projections = exprs
            .iter()
            .map(|expr| self.session.parser().parse_select_item(expr))
            .collect::<Result<Vec<_>>>()?;
        self.derive(self.builder().project(projections))
    }

    pub fn filter(&self, condition: Column) -> Result<Self> {
        self.derive(self.builder().filter(condition.into_expr()))
    }

    /// Filter using a SQL predicate, e.g. `"age > 35"`.
    pub fn filter_expr(&self, condition: &str) -> Result<Self> {
        let condition = self.session.parser().parse_expression(condition)?;
        self.derive(self.builder().filter(condition))
    }

    /// Add a column, or replace the existing column with the same name
    /// keeping its position.
    pub fn with_column(&self, name: &str, column: Column) -> Result<DataFrame> {
        self.with_columns([(name, column)])
    }

    pub fn with_columns<S: Into<String>>(
        &self,
        columns: impl IntoIterator<Item = (S, Column)>,
    ) -> Result<DataFrame> {
        let (names, exprs): (Vec<String>, Vec<Expression>) = columns
            .into_iter()
            .map(|(name, column)| (name.into(), column.into_expr()))
            .unzip();
        self.derive(self.builder().with_columns(&names, exprs)?)
    }

    /// Rename a column. Does nothing if the column doesn't exist.
    pub fn with_column_renamed(&self, existing: &str, new_name: &str) -> Result<DataFrame> {
        self.derive(self.builder().with_column_renamed(existing, new_name))
    }

    /// Drop columns by name. Names not matching any column are ignored.
    pub fn drop(&self, names: &[&str]) -> Result<DataFrame> {
        self.derive(self.builder().drop_names(names))
    }

    /// Drop the column `column` refers to. Does nothing if it doesn't refer
    /// to a column of this dataset.
    pub fn drop_column(&self, column: Column) -> Result<DataFrame> {
        let builder = self.builder();
        let plan = match resolve_expression(column.into_expr(), &builder.resolver()) {
            Ok(expr) => builder.drop_expression(&expr),
            Err(e) if e.is_analysis() => builder.unchanged(),
            Err(e) => return Err(e),
        };
        self.derive(plan)
    }

    /// Remove rows that are equal on the named columns, keeping one row per
    /// distinct combination. No names considers all columns.
    pub fn drop_duplicates(&self, names: &[&str]) -> Result<Self> {
        if names.is_empty() {
            return self.distinct();
        }
        self.derive(self.builder().drop_duplicates(names)?)
    }

    pub fn distinct(&self) -> Result<Self> {
        self.derive(self.builder().distinct())
    }

    /// Rename all columns. The number of names must match the number of
    /// columns.
    pub fn to_df(&self, names: &[&str]) -> Result<DataFrame> {
        self.derive(self.builder().to_df(names)?)
    }

    /// View as untyped rows.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        self.as_::<Row>()
    }

    /// View the same plan as a dataset of `U`.
    pub fn as_<U: Encodable>(&self) -> Result<Dataset<U>> {
        Dataset::from_analyzed(
            self.session.clone(),
            AnalyzedPlan {
                plan: self.plan.clone(),
                output: self.output.clone(),
            },
        )
    }

    /// Qualify every column with `alias`, allowing references like
    /// `alias.column`.
    pub fn alias(&self, alias: &str) -> Result<Self> {
        self.derive(self.builder().subquery_alias(alias))
    }

    pub fn limit(&self, n: usize) -> Result<Self> {
        self.derive(self.builder().limit(n))
    }

    /// Sort all rows.
    pub fn sort<S: Into<SortExpr>>(&self, exprs: impl IntoIterator<Item = S>) -> Result<Self> {
        let exprs = exprs.into_iter().map(Into::into).collect();
        self.derive(self.builder().order(exprs, true))
    }

    pub fn order_by<S: Into<SortExpr>>(&self, exprs: impl IntoIterator<Item = S>) -> Result<Self> {
        self.sort(exprs)
    }

    /// Sort rows within each partition.
    pub fn sort_within_partitions<S: Into<SortExpr>>(
        &self,
        exprs: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        let exprs = exprs.into_iter().map(Into::into).collect();
        self.derive(self.builder().order(exprs, false))
    }

    /// Sample a fraction of rows.
    ///
    /// Without replacement, `fraction` is the probability of each row being
    /// kept. With replacement it's the expected number of times each row is
    /// chosen. A random seed is picked if none is given.
    pub fn sample(&self, fraction: f64, with_replacement: bool, seed: Option<u64>) -> Result<Self> {
        validate_fraction(fraction, with_replacement)?;
        let seed = seed.unwrap_or_else(rand::random);
        self.derive(self.builder().sample(0.0, fraction, with_replacement, seed))
    }

    /// Split randomly into datasets with sizes proportional to `weights`.
    ///
    /// Splits are disjoint and together contain every row exactly once, no
    /// matter how many times or in which order they're executed.
    pub fn random_split(&self, weights: &[f64], seed: Option<u64>) -> Result<Vec<Self>> {
        let seed = seed.unwrap_or_else(rand::random);
        random_split_plans(&self.plan, &self.output, self.matcher(), weights, seed)?
            .into_iter()
            .map(|plan| self.derive(plan))
            .collect()
    }

    /// Shuffle rows round robin into `num_partitions` partitions.
    pub fn repartition(&self, num_partitions: usize) -> Result<Self> {
        self.derive(self.builder().repartition(num_partitions, true, Vec::new())?)
    }

    /// Hash partition rows on `columns` into `num_partitions` partitions.
    pub fn repartition_by(
        &self,
        num_partitions: usize,
        columns: impl IntoIterator<Item = Column>,
    ) -> Result<Self> {
        let exprs = columns.into_iter().map(Column::into_expr).collect();
        self.derive(self.builder().repartition(num_partitions, true, exprs)?)
    }

    /// Reduce the number of partitions without shuffling.
    pub fn coalesce(&self, num_partitions: usize) -> Result<Self> {
        self.derive(self.builder().repartition(num_partitions, false, Vec::new())?)
    }

    /// One row per element of the list `column`, with the element appended
    /// as `name`. Rows with null or empty lists are dropped.
    pub fn explode(&self, column: Column, name: &str) -> Result<DataFrame> {
        self.derive(self.builder().generate(column.into_expr(), name, false)?)
    }

    /// Like `explode`, but rows with null or empty lists are kept with a null
    /// element.
    pub fn explode_outer(&self, column: Column, name: &str) -> Result<DataFrame> {
        self.derive(self.builder().generate(column.into_expr(), name, true)?)
    }

    /// Inner join on `condition`.
    pub fn join<U: Encodable>(&self, right: &Dataset<U>, condition: Column) -> Result<DataFrame> {
        self.join_type(right, condition, JoinType::Inner)
    }

    pub fn join_type<U: Encodable>(
        &self,
        right: &Dataset<U>,
        condition: Column,
        join_type: JoinType,
    ) -> Result<DataFrame> {
        let analyzed = self.analyzed_join(right, join_type, Some(condition.into_expr()))?;
        Dataset::from_analyzed(self.session.clone(), analyzed)
    }

    /// Join on a SQL condition, e.g. `"l.id = r.id"`.
    pub fn join_expr<U: Encodable>(
        &self,
        right: &Dataset<U>,
        condition: &str,
        join_type: JoinType,
    ) -> Result<DataFrame> {
        let condition = self.session.parser().parse_expression(condition)?;
        let analyzed = self.analyzed_join(right, join_type, Some(condition))?;
        Dataset::from_analyzed(self.session.clone(), analyzed)
    }

    /// Join on equality of the named columns, which must exist on both
    /// sides. The output has a single copy of each of those columns.
    pub fn join_using<U: Encodable>(
        &self,
        right: &Dataset<U>,
        names: &[&str],
        join_type: JoinType,
    ) -> Result<DataFrame> {
        let (right_plan, right_output) = if needs_disambiguation(&self.output, &right.output) {
            // Bind names against the copy of the right side analysis gives
            // fresh ids.
            let analyzed = self
                .session
                .analyze(&self.builder().join(&right.plan, JoinType::Cross, None))?;
            let [_, right_plan] = join_children(&analyzed.plan)?;
            (right_plan.clone(), right_plan.output()?)
        } else {
            (right.plan.clone(), right.output.clone())
        };

        let plan = self
            .builder()
            .join_using(&right_plan, &right_output, names, join_type)?;
        self.derive(plan)
    }

    pub fn cross_join<U: Encodable>(&self, right: &Dataset<U>) -> Result<DataFrame> {
        self.derive(self.builder().join(&right.plan, JoinType::Cross, None))
    }

    /// Join producing pairs of the two datasets' values.
    ///
    /// Each side becomes one column of the result, `_1` and `_2`. A side
    /// stored as a single column keeps that column, other sides are nested
    /// into a struct. For outer joins, use `Option` for the side that may be
    /// missing.
    pub fn join_with<U: Encodable>(
        &self,
        right: &Dataset<U>,
        condition: Column,
        join_type: JoinType,
    ) -> Result<Dataset<(T, U)>> {
        if matches!(join_type, JoinType::LeftSemi | JoinType::LeftAnti) {
            return Err(DatasetError::InvalidArgument(format!(
                "Invalid join type in join_with: {join_type}"
            )));
        }

        let analyzed = self.analyzed_join(right, join_type, Some(condition.into_expr()))?;
        let [left_plan, _] = join_children(&analyzed.plan)?;
        let left_len = left_plan.output()?.len();
        if left_len > analyzed.output.len() {
            return Err(internal!("Join output narrower than its left input"));
        }
        let (left_output, right_output) = analyzed.output.split_at(left_len);

        let projections = vec![
            tuple_member::<T>(left_output, self.matcher())?.alias("_1"),
            tuple_member::<U>(right_output, self.matcher())?.alias("_2"),
        ];
        let plan = LogicalOperator::Project(Node::new(
            LogicalProject { projections },
            vec![analyzed.plan],
        ));
        self.derive(plan)
    }

    /// Analyze a join, rewriting trivially true conditions of self-joins
    /// when enabled.
    fn analyzed_join<U: Encodable>(
        &self,
        right: &Dataset<U>,
        join_type: JoinType,
        condition: Option<Expression>,
    ) -> Result<AnalyzedPlan> {
        let plan = self.builder().join(&right.plan, join_type, condition);
        let analyzed = self.session.analyze(&plan)?;

        if !self.session.config().self_join_auto_resolve_ambiguity
            || !needs_disambiguation(&self.output, &right.output)
        {
            return Ok(analyzed);
        }

        debug!("join inputs share attributes, checking condition for ambiguity");
        let plan = disambiguate_self_join(&analyzed.plan, self.matcher())?;
        Ok(AnalyzedPlan {
            plan: Arc::new(plan),
            output: analyzed.output,
        })
    }

    /// Rows of both datasets, keeping duplicates. Columns are matched by
    /// position.
    pub fn union(&self, other: &Dataset<T>) -> Result<Self> {
        self.set_op(other, SetOpKind::Union, true)
    }

    /// Distinct rows present in both datasets.
    pub fn intersect(&self, other: &Dataset<T>) -> Result<Self> {
        self.set_op(other, SetOpKind::Intersect, false)
    }

    pub fn intersect_all(&self, other: &Dataset<T>) -> Result<Self> {
        self.set_op(other, SetOpKind::Intersect, true)
    }

    /// Distinct rows of this dataset not present in `other`.
    pub fn except(&self, other: &Dataset<T>) -> Result<Self> {
        self.set_op(other, SetOpKind::Except, false)
    }

    pub fn except_all(&self, other: &Dataset<T>) -> Result<Self> {
        self.set_op(other, SetOpKind::Except, true)
    }

    fn set_op(&self, other: &Dataset<T>, kind: SetOpKind, all: bool) -> Result<Self> {
        self.derive(self.builder().set_op(&other.plan, kind, all))
    }

    pub fn group_by(&self, columns: impl IntoIterator<Item = Column>) -> GroupedData<T> {
        GroupedData::new(
            self.clone(),
            columns.into_iter().map(Column::into_expr).collect(),
        )
    }

    pub fn group_by_names(&self, names: &[&str]) -> GroupedData<T> {
        self.group_by(names.iter().map(|name| col(name)))
    }

    /// Aggregate over all rows.
    pub fn agg(&self, aggregates: impl IntoIterator<Item = Column>) -> Result<DataFrame> {
        self.group_by(Vec::new()).agg(aggregates)
    }

    pub fn map<U, F>(&self, func: F) -> Result<Dataset<U>>
    where
        U: Encodable,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        self.map_values("map", move |value| Ok(vec![func(value)]))
    }

    /// Like `map`, failing the action if `func` fails.
    pub fn try_map<U, F>(&self, func: F) -> Result<Dataset<U>>
    where
        U: Encodable,
        F: Fn(T) -> Result<U> + Send + Sync + 'static,
    {
        self.map_values("try_map", move |value| Ok(vec![func(value)?]))
    }

    pub fn flat_map<U, I, F>(&self, func: F) -> Result<Dataset<U>>
    where
        U: Encodable,
        I: IntoIterator<Item = U>,
        F: Fn(T) -> I + Send + Sync + 'static,
    {
        self.map_values("flat_map", move |value| Ok(func(value).into_iter().collect()))
    }

    /// Keep values for which `func` returns true.
    pub fn filter_fn<F>(&self, func: F) -> Result<Self>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let encoder = self.encoder.clone();
        let function = RowFunction::new("filter", move |row| {
            let value = encoder.decode(row)?;
            Ok(if func(&value) {
                vec![row.clone()]
            } else {
                Vec::new()
            })
        });
        self.derive(self.builder().map_rows(function, Vec::new(), true))
    }

    fn map_values<U, F>(&self, name: &'static str, func: F) -> Result<Dataset<U>>
    where
        U: Encodable,
        F: Fn(T) -> Result<Vec<U>> + Send + Sync + 'static,
    {
        let schema = UnresolvedEncoder::<U>::new().schema()?;
        let output = schema.fields.iter().map(Attribute::from_field).collect();
        let encoder = self.encoder.clone();
        let function = RowFunction::new(name, move |row| {
            let value = encoder.decode(row)?;
            Ok(func(value)?
                .into_iter()
                .map(|out| Row::new(out.encode()))
                .collect())
        });
        self.derive(self.builder().map_rows(function, output, false))
    }

    /// Cache this dataset's rows the first time they're computed.
    pub fn persist(&self, level: StorageLevel) -> Self {
        self.session.cache().cache_query(&self.plan, level);
        self.clone()
    }

    pub fn cache(&self) -> Self {
        self.persist(StorageLevel::MemoryAndDisk)
    }

    pub fn unpersist(&self, blocking: bool) -> Self {
        self.session.cache().try_uncache_query(&self.plan, blocking);
        self.clone()
    }

    pub fn storage_level(&self) -> StorageLevel {
        self.session
            .cache()
            .lookup(&self.plan)
            .map(|lookup| lookup.level)
            .unwrap_or(StorageLevel::None)
    }

    /// Execute and decode every value.
    pub fn collect(&self) -> Result<Vec<T>> {
        self.collect_plan("collect", &self.plan)
    }

    /// First `n` values.
    pub fn head(&self, n: usize) -> Result<Vec<T>> {
        let plan = Arc::new(self.builder().limit(n));
        self.collect_plan("head", &plan)
    }

    pub fn take(&self, n: usize) -> Result<Vec<T>> {
        self.head(n)
    }

    /// The first value, `None` if the dataset is empty.
    pub fn first(&self) -> Result<Option<T>> {
        Ok(self.head(1)?.into_iter().next())
    }

    fn collect_plan(&self, action: &str, plan: &Arc<LogicalOperator>) -> Result<Vec<T>> {
        run_instrumented(&self.session, action, plan, |prepared| {
            let partitions = prepared.execute()?;
            self.encoder.decode_rows(partitions.into_iter().flatten())
        })
    }

    pub fn count(&self) -> Result<u64> {
        let plan = self.builder().aggregate(
            Vec::new(),
            vec![aggregate(AggregateFunction::Count, lit(1), false).alias("count")],
        );
        let analyzed = self.session.analyze(&plan)?;
        run_instrumented(&self.session, "count", &analyzed.plan, |prepared| {
            let partitions = prepared.execute()?;
            let row = partitions
                .iter()
                .flatten()
                .next()
                .ok_or_else(|| internal!("Count produced no rows"))?;
            let count = row.try_get(0)?.try_as_i64()?;
            u64::try_from(count).map_err(|_| internal!("Negative count: {count}"))
        })
    }

    /// Call `func` with every value.
    pub fn foreach<F>(&self, mut func: F) -> Result<()>
    where
        F: FnMut(T) -> Result<()>,
    {
        run_instrumented(&self.session, "foreach", &self.plan, |prepared| {
            for row in prepared.execute()?.into_iter().flatten() {
                func(self.encoder.decode(&row)?)?;
            }
            Ok(())
        })
    }

    /// Call `func` with the values of each partition.
    pub fn foreach_partition<F>(&self, mut func: F) -> Result<()>
    where
        F: FnMut(Vec<T>) -> Result<()>,
    {
        run_instrumented(&self.session, "foreachPartition", &self.plan, |prepared| {
            for partition in prepared.execute()? {
                func(self.encoder.decode_rows(partition)?)?;
            }
            Ok(())
        })
    }
}

fn materialize_command(session: &DatasetSession, analyzed: AnalyzedPlan) -> Result<AnalyzedPlan> {
    let partitions = run_instrumented(session, "command", &analyzed.plan, |prepared| {
        prepared.execute()
    })?;
    let num_partitions = partitions.len().max(1);
    let rows: Vec<Row> = partitions.into_iter().flatten().collect();
    debug!(rows = rows.len(), "materialized command");

    let plan = LogicalOperator::LocalRelation(Node::new(
        LogicalLocalRelation {
            output: analyzed.output.clone(),
            rows: Arc::new(rows),
            partitions: num_partitions,
        },
        Vec::new(),
    ));
    Ok(AnalyzedPlan {
        plan: Arc::new(plan),
        output: analyzed.output,
    })
}

fn join_children(plan: &LogicalOperator) -> Result<[&Arc<LogicalOperator>; 2]> {
    match plan {
        LogicalOperator::Join(join) => join.get_two_children_exact(),
        other => Err(internal!("Expected analyzed join, got {}", other.name())),
    }
}

/// Expression producing one side of a `join_with` pair.
///
/// Flat types use their single column directly, anything else is nested into
/// a struct with members in the order `X` declares them.
fn tuple_member<X: Encodable>(output: &[Attribute], matcher: NameMatcher) -> Result<Expression> {
    let resolved = UnresolvedEncoder::<X>::new().resolve(output, matcher)?;
    let attrs = resolved.attributes();
    if X::is_flat() {
        return match attrs {
            [attr] => Ok(Expression::Column(attr.clone())),
            _ => Err(analysis!(
                "Expected a single column for {}",
                std::any::type_name::<X>()
            )),
        };
    }
    Ok(Expression::CreateStruct(
        attrs
            .iter()
            .map(|attr| (attr.name.clone(), Expression::Column(attr.clone())))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::datatype::DataType;
    use crate::arrays::field::Field;
    use crate::functions::{col, lit, sum};
    use crate::row;

    fn people(session: &DatasetSession) -> DataFrame {
        session
            .create_dataframe(
                vec![row!["a", 30], row!["b", 40], row!["c", 50]],
                Schema::new([
                    Field::new("name", DataType::Utf8, false),
                    Field::new("age", DataType::Int32, true),
                ]),
            )
            .unwrap()
    }

    #[test]
    fn transformations_are_lazy_and_typed() {
        let session = DatasetSession::local();
        let df = people(&session);

        let ages = df.select_names(&["age"]).unwrap().as_::<i32>().unwrap();
        assert_eq!(vec![30, 40, 50], ages.collect().unwrap());

        let err = df.as_::<i32>().unwrap_err();
        assert!(err.is_analysis());
    }

    #[test]
    fn column_handles_resolve_eagerly() {
        let session = DatasetSession::local();
        let df = people(&session);

        assert!(matches!(df.col("AGE").unwrap().expr(), Expression::Column(_)));
        assert!(df.col("missing").unwrap_err().is_analysis());
    }

    #[test]
    fn select_expr_and_aliases() {
        let session = DatasetSession::local();
        let df = people(&session)
            .select_expr(&["name", "age + 1 AS next"])
            .unwrap();
        assert_eq!(vec!["name", "next"], df.columns());
        assert_eq!(
            Some(row!["a", 31]),
            df.first().unwrap()
        );
    }

    #[test]
    fn count_and_agg() {
        let session = DatasetSession::local();
        let df = people(&session);
        assert_eq!(3, df.count().unwrap());
        assert_eq!(0, df.filter(col("age").gt(100)).unwrap().count().unwrap());

        let total = df.agg([sum(col("age"))]).unwrap();
        assert_eq!(vec!["sum(age)"], total.columns());
        assert_eq!(vec![row![120_i64]], total.collect().unwrap());
    }

    #[test]
    fn sample_rejects_bad_fraction() {
        let session = DatasetSession::local();
        let err = people(&session).sample(1.5, false, Some(1)).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn map_and_filter_fn() {
        let session = DatasetSession::local();
        let ds = session.create_dataset(vec![1_i64, 2, 3, 4]).unwrap();

        let doubled = ds.map(|v| v * 2).unwrap();
        let mut out = doubled.collect().unwrap();
        out.sort_unstable();
        assert_eq!(vec![2, 4, 6, 8], out);

        let even = ds.filter_fn(|v| v % 2 == 0).unwrap();
        let mut out = even.collect().unwrap();
        out.sort_unstable();
        assert_eq!(vec![2, 4], out);

        let words = session
            .create_dataset(vec!["a b".to_string(), "c".to_string()])
            .unwrap()
            .flat_map(|s| s.split(' ').map(str::to_string).collect::<Vec<_>>())
            .unwrap();
        assert_eq!(3, words.count().unwrap());
    }

    #[test]
    fn explain_plan() {
        let session = DatasetSession::local();
        let df = people(&session).filter(col("age").gt(lit(35))).unwrap();
        let explained = df.explain(false);
        assert!(explained.starts_with("Filter"));
        assert!(explained.contains("LocalRelation"));
    }

    #[test]
    fn persist_tracks_storage_level() {
        let session = DatasetSession::local();
        let df = people(&session);
        assert_eq!(StorageLevel::None, df.storage_level());

        let cached = df.cache();
        assert_eq!(StorageLevel::MemoryAndDisk, df.storage_level());
        assert_eq!(2, cached.filter(col("age").gt(35)).unwrap().count().unwrap());

        df.unpersist(true);
        assert_eq!(StorageLevel::None, df.storage_level());
    }
}
