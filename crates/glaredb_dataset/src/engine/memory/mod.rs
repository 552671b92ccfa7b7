//! In-memory query engine.
//!
//! Interprets plans row by row over partitions held in memory. Meant for
//! tests and embedding, not for large inputs.

pub mod aggregate;
pub mod analyzer;
pub mod executor;
pub mod physical_expr;

use std::sync::Arc;

use analyzer::Analyzer;
use executor::Executor;
use parking_lot::Mutex;
use tracing::trace;

use super::{
    AnalyzedPlan,
    AnalyzerOptions,
    ExecutionId,
    ExecutionMetrics,
    PreparedQuery,
    QueryEngine,
};
use crate::arrays::row::Row;
use crate::errors::{Result, internal};
use crate::logical::operator::{LogicalNode, LogicalOperator};

#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryQueryEngine;

impl QueryEngine for MemoryQueryEngine {
    fn analyze(&self, plan: &LogicalOperator, options: &AnalyzerOptions) -> Result<AnalyzedPlan> {
        let analyzed = Analyzer::new(options).analyze(plan)?;
        let output = analyzed.output()?;
        Ok(AnalyzedPlan {
            plan: Arc::new(analyzed),
            output,
        })
    }

    fn prepare(
        &self,
        plan: Arc<LogicalOperator>,
        execution_id: ExecutionId,
    ) -> Result<Box<dyn PreparedQuery>> {
        if !plan.is_resolved() {
            return Err(internal!("Cannot prepare an unresolved plan"));
        }
        Ok(Box::new(MemoryPreparedQuery {
            plan,
            execution_id,
            metrics: Mutex::new(ExecutionMetrics::default()),
        }))
    }
}

#[derive(Debug)]
pub struct MemoryPreparedQuery {
    plan: Arc<LogicalOperator>,
    execution_id: ExecutionId,
    metrics: Mutex<ExecutionMetrics>,
}

impl PreparedQuery for MemoryPreparedQuery {
    fn execution_id(&self) -> ExecutionId {
        self.execution_id
    }

    fn reset_metrics(&self) {
        *self.metrics.lock() = ExecutionMetrics::default();
    }

    fn execute(&self) -> Result<Vec<Vec<Row>>> {
        trace!(execution_id = %self.execution_id, "executing plan");
        let mut executor = Executor::default();
        let result = executor.execute(&self.plan);
        *self.metrics.lock() = executor.into_metrics();
        result
    }

    fn metrics(&self) -> ExecutionMetrics {
        self.metrics.lock().clone()
    }
}
