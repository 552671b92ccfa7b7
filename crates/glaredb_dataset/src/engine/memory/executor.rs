//! Row at a time interpreter for analyzed plans.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use ahash::RandomState;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::aggregate::AggregateState;
use super::physical_expr::{PhysicalExpr, compile, compile_with};
use crate::arrays::row::Row;
use crate::arrays::scalar::ScalarValue;
use crate::engine::{ExecutionMetrics, OperatorMetrics};
use crate::errors::{Result, execution};
use crate::expr::Expression;
use crate::expr::attribute::Attribute;
use crate::expr::sort_expr::SortExpr;
use crate::logical::logical_aggregate::LogicalAggregate;
use crate::logical::logical_join::{JoinType, LogicalJoin};
use crate::logical::logical_local::LogicalLocalRelation;
use crate::logical::logical_order::LogicalOrder;
use crate::logical::logical_range::LogicalRange;
use crate::logical::logical_repartition::LogicalRepartition;
use crate::logical::logical_sample::LogicalSample;
use crate::logical::logical_setop::{LogicalSetop, SetOpKind};
use crate::logical::operator::{LogicalNode, LogicalOperator, Node};

/// Rows of each partition.
pub type Partitions = Vec<Vec<Row>>;

#[derive(Debug, Default)]
pub struct Executor {
    metrics: Vec<OperatorMetrics>,
}

impl Executor {
    pub fn into_metrics(self) -> ExecutionMetrics {
        ExecutionMetrics {
            operators: self.metrics,
        }
    }

    pub fn execute(&mut self, plan: &LogicalOperator) -> Result<Partitions> {
        let slot = self.metrics.len();
        self.metrics.push(OperatorMetrics {
            operator: plan.name().to_string(),
            output_rows: 0,
        });

        let partitions = match plan {
            LogicalOperator::Project(project) => {
                let input = project.get_one_child_exact()?.output()?;
                let exprs = project
                    .node
                    .projections
                    .iter()
                    .map(|expr| compile(expr, &input))
                    .collect::<Result<Vec<_>>>()?;
                let child = self.execute(project.get_one_child_exact()?)?;
                map_partitions(child, |row| {
                    let row = exprs.iter().map(|expr| expr.eval(&row)).collect::<Result<Row>>()?;
                    Ok(vec![row])
                })?
            }
            LogicalOperator::Filter(filter) => {
                let input = filter.get_one_child_exact()?.output()?;
                let predicate = compile(&filter.node.filter, &input)?;
                let child = self.execute(filter.get_one_child_exact()?)?;
                map_partitions(child, |row| {
                    Ok(if predicate.eval_predicate(&row)? {
                        vec![row]
                    } else {
                        Vec::new()
                    })
                })?
            }
            LogicalOperator::Join(join) => self.execute_join(join)?,
            LogicalOperator::Aggregate(agg) => self.execute_aggregate(agg)?,
            LogicalOperator::Order(order) => self.execute_order(order)?,
            LogicalOperator::SetOp(setop) => self.execute_setop(setop)?,
            LogicalOperator::Limit(limit) => {
                let child = match limit.get_one_child_exact()?.as_ref() {
                    // Only generate the values that are kept.
                    LogicalOperator::Range(range) => {
                        let rows: Vec<Row> = range.node.rows(0, limit.node.limit as u64).collect();
                        self.record_leaf(range.name(), &rows);
                        vec![rows]
                    }
                    other => self.execute(other)?,
                };
                vec![child.into_iter().flatten().take(limit.node.limit).collect()]
            }
            LogicalOperator::Sample(sample) => {
                let child = self.execute(sample.get_one_child_exact()?)?;
                child
                    .into_iter()
                    .enumerate()
                    .map(|(idx, rows)| sample_partition(rows, &sample.node, idx))
                    .collect()
            }
            LogicalOperator::Repartition(repartition) => self.execute_repartition(repartition)?,
            LogicalOperator::Generate(generate) => {
                let input = generate.get_one_child_exact()?.output()?;
                let generator = compile(&generate.node.generator, &input)?;
                let outer = generate.node.outer;
                let child = self.execute(generate.get_one_child_exact()?)?;
                map_partitions(child, |row| {
                    let elements = match generator.eval(&row)? {
                        ScalarValue::List(elements) if !elements.is_empty() => elements,
                        ScalarValue::List(_) | ScalarValue::Null => {
                            if outer {
                                vec![ScalarValue::Null]
                            } else {
                                Vec::new()
                            }
                        }
                        other => return Err(execution!("Cannot explode non-list value '{other}'")),
                    };
                    Ok(elements
                        .into_iter()
                        .map(|element| {
                            let mut values = row.values().to_vec();
                            values.push(element);
                            Row::new(values)
                        })
                        .collect())
                })?
            }
            LogicalOperator::SubqueryAlias(alias) => self.execute(alias.get_one_child_exact()?)?,
            LogicalOperator::LocalRelation(local) => scan_local(&local.node),
            LogicalOperator::Range(range) => scan_range(&range.node)?,
            LogicalOperator::MapRows(map) => {
                let width = map.output()?.len();
                let function = map.node.function.clone();
                let child = self.execute(map.get_one_child_exact()?)?;
                map_partitions(child, |row| {
                    let rows = function.call(&row)?;
                    check_widths(&rows, width, function.name)?;
                    Ok(rows)
                })?
            }
            LogicalOperator::Command(command) => {
                let rows = command.node.effect.run()?;
                check_widths(&rows, command.node.output.len(), &command.node.name)?;
                vec![rows]
            }
        };

        if let Some(metrics) = self.metrics.get_mut(slot) {
            metrics.output_rows = partitions.iter().map(|p| p.len() as u64).sum();
        }

        Ok(partitions)
    }

    fn record_leaf(&mut self, operator: &str, rows: &[Row]) {
        self.metrics.push(OperatorMetrics {
            operator: operator.to_string(),
            output_rows: rows.len() as u64,
        });
    }

    fn execute_join(&mut self, join: &Node<LogicalJoin>) -> Result<Partitions> {
        let [left, right] = join.get_two_children_exact()?;
        let left_width = left.output()?.len();
        let right_width = right.output()?.len();
        let input = join.children_output()?;
        let condition = join
            .node
            .condition
            .as_ref()
            .map(|condition| compile(condition, &input))
            .transpose()?;

        let left_partitions = self.execute(left)?;
        let right_rows: Vec<Row> = self.execute(right)?.into_iter().flatten().collect();

        let join_type = join.node.join_type;
        let left_nulls = Row::new(vec![ScalarValue::Null; left_width]);
        let right_nulls = Row::new(vec![ScalarValue::Null; right_width]);
        let mut right_matched = vec![false; right_rows.len()];

        let mut partitions = Vec::with_capacity(left_partitions.len() + 1);
        for partition in left_partitions {
            let mut out = Vec::new();
            for left_row in partition {
                let mut matched = false;
                for (idx, right_row) in right_rows.iter().enumerate() {
                    let joined = left_row.concat(right_row);
                    let is_match = match &condition {
                        Some(condition) => condition.eval_predicate(&joined)?,
                        None => true,
                    };
                    if !is_match {
                        continue;
                    }
                    matched = true;
                    right_matched[idx] = true;
                    if join_type.is_left_only() {
                        break;
                    }
                    out.push(joined);
                }

                match join_type {
                    JoinType::LeftSemi if matched => out.push(left_row),
                    JoinType::LeftAnti if !matched => out.push(left_row),
                    JoinType::LeftOuter | JoinType::FullOuter if !matched => {
                        out.push(left_row.concat(&right_nulls))
                    }
                    _ => (),
                }
            }
            partitions.push(out);
        }

        if join_type.left_nullable() {
            partitions.push(
                right_rows
                    .iter()
                    .zip(&right_matched)
                    .filter(|(_, matched)| !**matched)
                    .map(|(row, _)| left_nulls.concat(row))
                    .collect(),
            );
        }

        Ok(partitions)
    }

    /// Hash aggregate, groups are emitted in order of first appearance.
    fn execute_aggregate(&mut self, agg: &Node<LogicalAggregate>) -> Result<Partitions> {
        let child = agg.get_one_child_exact()?;
        let input = child.output()?;
        let group_exprs = &agg.node.group_exprs;

        let groups = group_exprs
            .iter()
            .map(|expr| compile(expr, &input))
            .collect::<Result<Vec<_>>>()?;

        // Output expressions are evaluated against rows made of the group
        // values followed by the aggregate results.
        let mut aggregates = Vec::new();
        let outputs = agg
            .node
            .output_exprs
            .iter()
            .map(|expr| {
                compile_with(expr, &mut |expr| {
                    if let Some(idx) = group_exprs.iter().position(|group| group == expr) {
                        return Ok(Some(PhysicalExpr::Column(idx)));
                    }
                    match expr {
                        Expression::Aggregate(aggregate) => {
                            aggregates.push(aggregate.clone());
                            Ok(Some(PhysicalExpr::Column(
                                group_exprs.len() + aggregates.len() - 1,
                            )))
                        }
                        Expression::Column(attr) => Err(execution!(
                            "Column {attr} is neither grouped nor aggregated"
                        )),
                        _ => Ok(None),
                    }
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let inputs = aggregates
            .iter()
            .map(|aggregate| compile(&aggregate.input, &input))
            .collect::<Result<Vec<_>>>()?;
        let new_states = || {
            aggregates
                .iter()
                .map(AggregateState::try_new)
                .collect::<Result<Vec<_>>>()
        };

        let mut index: HashMap<Vec<ScalarValue>, usize, RandomState> = HashMap::default();
        let mut states: Vec<(Vec<ScalarValue>, Vec<AggregateState>)> = Vec::new();

        for row in self.execute(child)?.into_iter().flatten() {
            let key = groups
                .iter()
                .map(|group| group.eval(&row))
                .collect::<Result<Vec<_>>>()?;
            let idx = match index.get(&key) {
                Some(idx) => *idx,
                None => {
                    index.insert(key.clone(), states.len());
                    states.push((key, new_states()?));
                    states.len() - 1
                }
            };
            for (state, input) in states[idx].1.iter_mut().zip(&inputs) {
                state.update(input.eval(&row)?)?;
            }
        }

        // A global aggregate always produces a row.
        if groups.is_empty() && states.is_empty() {
            states.push((Vec::new(), new_states()?));
        }

        let rows = states
            .into_iter()
            .map(|(key, states)| {
                let mut values = key;
                values.extend(states.into_iter().map(AggregateState::finalize));
                let grouped = Row::new(values);
                outputs
                    .iter()
                    .map(|output| output.eval(&grouped))
                    .collect::<Result<Row>>()
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(vec![rows])
    }

    fn execute_order(&mut self, order: &Node<LogicalOrder>) -> Result<Partitions> {
        let child = order.get_one_child_exact()?;
        let input = child.output()?;
        let keys = order
            .node
            .exprs
            .iter()
            .map(|sort| compile(&sort.expr, &input))
            .collect::<Result<Vec<_>>>()?;

        let partitions = self.execute(child)?;
        if order.node.global {
            let rows = partitions.into_iter().flatten().collect();
            Ok(vec![sort_rows(rows, &keys, &order.node.exprs)?])
        } else {
            partitions
                .into_iter()
                .map(|rows| sort_rows(rows, &keys, &order.node.exprs))
                .collect()
        }
    }

    fn execute_setop(&mut self, setop: &Node<LogicalSetop>) -> Result<Partitions> {
        let output = setop.output()?;
        let [left, right] = setop.get_two_children_exact()?;
        let left_output = left.output()?;
        let right_output = right.output()?;

        let left = cast_partitions(self.execute(left)?, &left_output, &output)?;
        let right = cast_partitions(self.execute(right)?, &right_output, &output)?;

        let LogicalSetop { kind, all } = setop.node;
        if kind == SetOpKind::Union && all {
            return Ok(left.into_iter().chain(right).collect());
        }

        let left = left.into_iter().flatten();
        let right = right.into_iter().flatten();

        let rows = match (kind, all) {
            (SetOpKind::Union, _) => dedup(left.chain(right)),
            (SetOpKind::Intersect, false) => {
                let right = row_counts(right);
                dedup(left.filter(|row| right.contains_key(row)))
            }
            (SetOpKind::Except, false) => {
                let right = row_counts(right);
                dedup(left.filter(|row| !right.contains_key(row)))
            }
            (SetOpKind::Intersect, true) => {
                let mut right = row_counts(right);
                left.filter(|row| match right.get_mut(row) {
                    Some(count) if *count > 0 => {
                        *count -= 1;
                        true
                    }
                    _ => false,
                })
                .collect()
            }
            (SetOpKind::Except, true) => {
                let mut right = row_counts(right);
                left.filter(|row| match right.get_mut(row) {
                    Some(count) if *count > 0 => {
                        *count -= 1;
                        false
                    }
                    _ => true,
                })
                .collect()
            }
        };

        Ok(vec![rows])
    }

    fn execute_repartition(&mut self, repartition: &Node<LogicalRepartition>) -> Result<Partitions> {
        let child = repartition.get_one_child_exact()?;
        let input = child.output()?;
        let keys = repartition
            .node
            .partition_exprs
            .iter()
            .map(|expr| compile(expr, &input))
            .collect::<Result<Vec<_>>>()?;
        let partitions = self.execute(child)?;
        let n = repartition.node.num_partitions;

        if !repartition.node.shuffle {
            // Merge adjacent partitions, never increasing the count.
            if partitions.len() <= n {
                return Ok(partitions);
            }
            let len = partitions.len();
            let mut out: Partitions = vec![Vec::new(); n];
            for (idx, rows) in partitions.into_iter().enumerate() {
                out[idx * n / len].extend(rows);
            }
            return Ok(out);
        }

        let mut out: Partitions = vec![Vec::new(); n];
        if keys.is_empty() {
            for (idx, row) in partitions.into_iter().flatten().enumerate() {
                out[idx % n].push(row);
            }
        } else {
            let state = RandomState::with_seeds(0, 0, 0, 0);
            for row in partitions.into_iter().flatten() {
                let key = keys
                    .iter()
                    .map(|key| key.eval(&row))
                    .collect::<Result<Vec<_>>>()?;
                let hash = state.hash_one(&key);
                out[(hash % n as u64) as usize].push(row);
            }
        }

        Ok(out)
    }
}

fn map_partitions<F>(partitions: Partitions, mut func: F) -> Result<Partitions>
where
    F: FnMut(Row) -> Result<Vec<Row>>,
{
    partitions
        .into_iter()
        .map(|rows| {
            let mut out = Vec::with_capacity(rows.len());
            for row in rows {
                out.extend(func(row)?);
            }
            Ok(out)
        })
        .collect()
}

fn check_widths(rows: &[Row], width: usize, producer: &str) -> Result<()> {
    if let Some(row) = rows.iter().find(|row| row.len() != width) {
        return Err(execution!(
            "'{producer}' produced a row with {} values, expected {width}",
            row.len()
        ));
    }
    Ok(())
}

/// Split local rows into contiguous chunks, one per partition.
fn scan_local(local: &LogicalLocalRelation) -> Partitions {
    let num_partitions = local.partitions.max(1);
    let chunk_size = local.rows.len().div_ceil(num_partitions).max(1);
    let mut partitions: Partitions = local
        .rows
        .chunks(chunk_size)
        .map(|chunk| chunk.to_vec())
        .collect();
    partitions.resize_with(num_partitions, Vec::new);
    partitions
}

/// Generate range values, split into contiguous chunks per partition.
fn scan_range(range: &LogicalRange) -> Result<Partitions> {
    let len = range.len();
    let num_partitions = range.partitions.max(1) as u64;
    let chunk_size = len.div_ceil(num_partitions).max(1);

    let mut partitions = Vec::with_capacity(num_partitions as usize);
    for idx in 0..num_partitions {
        let from = idx.saturating_mul(chunk_size).min(len);
        let to = from.saturating_add(chunk_size).min(len);
        let mut rows: Vec<Row> = Vec::new();
        usize::try_from(to - from)
            .ok()
            .and_then(|count| rows.try_reserve_exact(count).ok())
            .ok_or_else(|| execution!("Range of {len} values is too large to materialize"))?;
        rows.extend(range.rows(from, to));
        partitions.push(rows);
    }
    Ok(partitions)
}

fn sample_partition(rows: Vec<Row>, sample: &LogicalSample, partition_idx: usize) -> Vec<Row> {
    let mut rng = ChaCha8Rng::seed_from_u64(sample.seed.wrapping_add(partition_idx as u64));

    if sample.with_replacement {
        let mean = sample.upper_bound - sample.lower_bound;
        let mut out = Vec::new();
        for row in rows {
            for _ in 0..poisson(&mut rng, mean) {
                out.push(row.clone());
            }
        }
        return out;
    }

    let range = sample.lower_bound..sample.upper_bound;
    rows.into_iter()
        .filter(|_| range.contains(&rng.random::<f64>()))
        .collect()
}

/// Draw from a poisson distribution using Knuth's method.
fn poisson(rng: &mut impl Rng, mean: f64) -> u64 {
    if mean <= 0.0 {
        return 0;
    }
    let limit = (-mean).exp();
    let mut count = 0;
    let mut product = rng.random::<f64>();
    while product > limit {
        count += 1;
        product *= rng.random::<f64>();
    }
    count
}

fn sort_rows(rows: Vec<Row>, keys: &[PhysicalExpr], sorts: &[SortExpr]) -> Result<Vec<Row>> {
    let mut keyed = rows
        .into_iter()
        .map(|row| {
            let values = keys
                .iter()
                .map(|key| key.eval(&row))
                .collect::<Result<Vec<_>>>()?;
            Ok((values, row))
        })
        .collect::<Result<Vec<_>>>()?;

    // Stable, equal keys keep their input order.
    keyed.sort_by(|(a, _), (b, _)| compare_sort_keys(a, b, sorts));

    Ok(keyed.into_iter().map(|(_, row)| row).collect())
}

fn compare_sort_keys(a: &[ScalarValue], b: &[ScalarValue], sorts: &[SortExpr]) -> Ordering {
    for ((a, b), sort) in a.iter().zip(b).zip(sorts) {
        let ord = match (a.is_null(), b.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) if sort.nulls_first => Ordering::Less,
            (true, false) => Ordering::Greater,
            (false, true) if sort.nulls_first => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) if sort.desc => b.cmp(a),
            (false, false) => a.cmp(b),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn cast_partitions(partitions: Partitions, from: &[Attribute], to: &[Attribute]) -> Result<Partitions> {
    let casts: Vec<_> = from
        .iter()
        .zip(to)
        .map(|(from, to)| (from.datatype != to.datatype).then_some(&to.datatype))
        .collect();
    if casts.iter().all(Option::is_none) {
        return Ok(partitions);
    }

    map_partitions(partitions, |row| {
        let row = row
            .into_values()
            .into_iter()
            .zip(&casts)
            .map(|(value, cast)| match cast {
                Some(datatype) => value.cast_to(datatype),
                None => Ok(value),
            })
            .collect::<Result<Row>>()?;
        Ok(vec![row])
    })
}

fn row_counts(rows: impl Iterator<Item = Row>) -> HashMap<Row, usize, RandomState> {
    let mut counts: HashMap<Row, usize, RandomState> = HashMap::default();
    for row in rows {
        *counts.entry(row).or_default() += 1;
    }
    counts
}

/// Remove duplicate rows, keeping the first occurrence.
fn dedup(rows: impl Iterator<Item = Row>) -> Vec<Row> {
    let mut seen: HashSet<Row, RandomState> = HashSet::default();
    rows.filter(|row| seen.insert(row.clone())).collect()
}
