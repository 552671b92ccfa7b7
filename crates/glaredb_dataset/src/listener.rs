//! Listeners notified when actions complete.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::error;

use crate::engine::{ExecutionId, ExecutionMetrics};
use crate::errors::DatasetError;
use crate::logical::operator::LogicalOperator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Success,
    Fail,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Fail => "fail",
        }
    }
}

/// Details of a single action execution.
#[derive(Debug, Clone)]
pub struct QueryExecutionInfo {
    pub execution_id: ExecutionId,
    /// The plan that was executed.
    pub plan: Arc<LogicalOperator>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: ExecutionStatus,
    /// Per operator metrics. Empty if the plan failed before execution
    /// started.
    pub metrics: ExecutionMetrics,
}

/// Receives a callback for every action run in a session.
///
/// Callbacks run synchronously on the thread running the action, after the
/// action has completed.
pub trait QueryExecutionListener: Sync + Send {
    /// Called when an action succeeds. `duration_nanos` is the wall clock
    /// time spent executing.
    fn on_success(&self, action: &str, info: &QueryExecutionInfo, duration_nanos: u64);

    /// Called when an action fails with the error that will be returned to
    /// the caller.
    fn on_failure(&self, action: &str, info: &QueryExecutionInfo, error: &DatasetError);
}

type Listeners = Arc<Vec<Arc<dyn QueryExecutionListener>>>;

/// Set of listeners registered with a session.
///
/// Registration replaces the list instead of mutating it, so dispatch always
/// sees a complete list even when registrations happen concurrently.
#[derive(Default)]
pub struct ExecutionListenerManager {
    listeners: RwLock<Listeners>,
}

impl ExecutionListenerManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: Arc<dyn QueryExecutionListener>) {
        let mut listeners = self.listeners.write();
        let mut updated = listeners.as_ref().clone();
        updated.push(listener);
        *listeners = Arc::new(updated);
    }

    /// Remove a previously registered listener. Returns false if it wasn't
    /// registered.
    pub fn unregister(&self, listener: &Arc<dyn QueryExecutionListener>) -> bool {
        let mut listeners = self.listeners.write();
        let updated: Vec<_> = listeners
            .iter()
            .filter(|l| !Arc::ptr_eq(l, listener))
            .cloned()
            .collect();
        let removed = updated.len() != listeners.len();
        *listeners = Arc::new(updated);
        removed
    }

    pub fn clear(&self) {
        *self.listeners.write() = Arc::new(Vec::new());
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Listeners {
        self.listeners.read().clone()
    }

    pub fn dispatch_success(&self, action: &str, info: &QueryExecutionInfo, duration_nanos: u64) {
        for listener in self.snapshot().iter() {
            let result = catch_unwind(AssertUnwindSafe(|| {
                listener.on_success(action, info, duration_nanos)
            }));
            if result.is_err() {
                error!(%action, execution_id = %info.execution_id, "listener panicked in on_success");
            }
        }
    }

    pub fn dispatch_failure(&self, action: &str, info: &QueryExecutionInfo, err: &DatasetError) {
        for listener in self.snapshot().iter() {
            let result = catch_unwind(AssertUnwindSafe(|| {
                listener.on_failure(action, info, err)
            }));
            if result.is_err() {
                error!(%action, execution_id = %info.execution_id, %err, "listener panicked in on_failure");
            }
        }
    }
}

impl fmt::Debug for ExecutionListenerManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionListenerManager")
            .field("listeners", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::arrays::datatype::DataType;
    use crate::expr::attribute::Attribute;
    use crate::logical::logical_local::LogicalLocalRelation;
    use crate::logical::operator::Node;

    #[derive(Default)]
    struct Recording {
        events: Mutex<Vec<String>>,
    }

    impl QueryExecutionListener for Recording {
        fn on_success(&self, action: &str, _info: &QueryExecutionInfo, _duration_nanos: u64) {
            self.events.lock().push(format!("success:{action}"));
        }

        fn on_failure(&self, action: &str, _info: &QueryExecutionInfo, error: &DatasetError) {
            self.events
                .lock()
                .push(format!("failure:{action}:{}", error.message()));
        }
    }

    struct Panicking;

    impl QueryExecutionListener for Panicking {
        fn on_success(&self, _action: &str, _info: &QueryExecutionInfo, _duration_nanos: u64) {
            panic!("listener bug");
        }

        fn on_failure(&self, _action: &str, _info: &QueryExecutionInfo, _error: &DatasetError) {
            panic!("listener bug");
        }
    }

    fn info() -> QueryExecutionInfo {
        let now = Utc::now();
        QueryExecutionInfo {
            execution_id: ExecutionId::next(),
            plan: Arc::new(LogicalOperator::LocalRelation(Node::new(
                LogicalLocalRelation {
                    output: vec![Attribute::new("a", DataType::Int32, true)],
                    rows: Arc::new(Vec::new()),
                    partitions: 1,
                },
                Vec::new(),
            ))),
            started_at: now,
            finished_at: now,
            status: ExecutionStatus::Success,
            metrics: ExecutionMetrics::default(),
        }
    }

    #[test]
    fn dispatch_to_registered() {
        let manager = ExecutionListenerManager::new();
        let recording = Arc::new(Recording::default());
        let listener: Arc<dyn QueryExecutionListener> = recording.clone();
        manager.register(Arc::new(Panicking));
        manager.register(listener.clone());

        manager.dispatch_success("collect", &info(), 10);
        manager.dispatch_failure("count", &info(), &DatasetError::Execution("boom".to_string()));
        assert_eq!(
            vec!["success:collect".to_string(), "failure:count:boom".to_string()],
            *recording.events.lock()
        );

        assert!(manager.unregister(&listener));
        assert!(!manager.unregister(&listener));
        manager.dispatch_success("collect", &info(), 10);
        assert_eq!(2, recording.events.lock().len());

        manager.clear();
        assert!(manager.is_empty());
    }
}
