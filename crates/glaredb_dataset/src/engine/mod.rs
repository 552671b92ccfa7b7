//! Query engine the datasets hand their plans to.
//!
//! Analysis and execution are collaborators of the dataset layer: datasets
//! only build plans, ask for them to be analyzed, and bracket execution with
//! instrumentation.

pub mod memory;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::arrays::row::Row;
use crate::errors::Result;
use crate::expr::attribute::Attribute;
use crate::logical::operator::LogicalOperator;

static NEXT_EXECUTION_ID: AtomicU64 = AtomicU64::new(1);

/// Monotonically increasing id assigned to every action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExecutionId(pub u64);

impl ExecutionId {
    pub fn next() -> Self {
        ExecutionId(NEXT_EXECUTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerOptions {
    pub case_sensitive: bool,
}

/// Output of analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedPlan {
    /// Fully resolved plan.
    pub plan: Arc<LogicalOperator>,
    /// Attributes produced by the plan.
    pub output: Vec<Attribute>,
}

/// Rows produced by a single operator during execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorMetrics {
    pub operator: String,
    pub output_rows: u64,
}

/// Metrics for all operators in a prepared query, in plan pre-order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    pub operators: Vec<OperatorMetrics>,
}

impl ExecutionMetrics {
    /// Rows output by the root of the plan.
    pub fn output_rows(&self) -> Option<u64> {
        self.operators.first().map(|m| m.output_rows)
    }
}

pub trait QueryEngine: fmt::Debug + Sync + Send {
    /// Resolve every reference in the plan and compute its output.
    ///
    /// Must be free of side effects, and analyzing an analyzed plan must
    /// produce an equivalent plan with the same output attributes.
    fn analyze(&self, plan: &LogicalOperator, options: &AnalyzerOptions) -> Result<AnalyzedPlan>;

    /// Prepare an analyzed plan for execution.
    fn prepare(
        &self,
        plan: Arc<LogicalOperator>,
        execution_id: ExecutionId,
    ) -> Result<Box<dyn PreparedQuery>>;
}

/// A plan ready to run.
pub trait PreparedQuery: fmt::Debug + Sync + Send {
    fn execution_id(&self) -> ExecutionId;

    /// Clear metrics from any previous run.
    fn reset_metrics(&self);

    /// Run the plan, returning rows for each output partition.
    fn execute(&self) -> Result<Vec<Vec<Row>>>;

    fn metrics(&self) -> ExecutionMetrics;
}
