//! Bracketing of actions with timing and listener callbacks.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, debug_span};

use crate::engine::{ExecutionId, ExecutionMetrics, PreparedQuery};
use crate::errors::Result;
use crate::listener::{ExecutionStatus, QueryExecutionInfo};
use crate::logical::operator::LogicalOperator;
use crate::session::DatasetSession;

/// Run an action against `plan`.
///
/// The plan is prepared with a fresh execution id and handed to `func` which
/// executes it and produces the action's result. Listeners registered with
/// the session receive exactly one success or failure callback. The result
/// of `func`, including any error, is returned unchanged.
pub(crate) fn run_instrumented<R, F>(
    session: &DatasetSession,
    action: &str,
    plan: &Arc<LogicalOperator>,
    func: F,
) -> Result<R>
where
    F: FnOnce(&dyn PreparedQuery) -> Result<R>,
{
    let execution_id = ExecutionId::next();
    let span = debug_span!("action", %action, %execution_id);
    let _guard = span.enter();

    let started_at = Utc::now();
    let start = Instant::now();

    let mut metrics = ExecutionMetrics::default();
    let result = session
        .with_cached_data(plan)
        .and_then(|plan| session.engine().prepare(plan, execution_id))
        .and_then(|prepared| {
            prepared.reset_metrics();
            let out = func(prepared.as_ref());
            metrics = prepared.metrics();
            out
        });

    let elapsed = start.elapsed();
    let duration_nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);

    let status = match &result {
        Ok(_) => ExecutionStatus::Success,
        Err(_) => ExecutionStatus::Fail,
    };
    let info = QueryExecutionInfo {
        execution_id,
        plan: plan.clone(),
        started_at,
        finished_at: Utc::now(),
        status,
        metrics,
    };
    debug!(status = status.as_str(), %duration_nanos, output_rows = ?info.metrics.output_rows(), "action finished");

    match &result {
        Ok(_) => session
            .listeners()
            .dispatch_success(action, &info, duration_nanos),
        Err(e) => session.listeners().dispatch_failure(action, &info, e),
    }

    result
}
