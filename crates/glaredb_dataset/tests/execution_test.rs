mod setup;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use glaredb_dataset::engine::ExecutionMetrics;
use glaredb_dataset::listener::{ExecutionStatus, QueryExecutionInfo};
use glaredb_dataset::{
    DataType,
    DatasetError,
    Field,
    QueryExecutionListener,
    Schema,
    StorageLevel,
    row,
};
use parking_lot::Mutex;
use setup::{Event, RecordingListener, people, session};

#[test]
fn listener_sees_each_action() {
    let session = session();
    let listener = RecordingListener::register(&session);
    let df = people(&session);

    // Transformations don't notify.
    let df = df.select_names(&["name"]).unwrap();
    assert!(listener.take().is_empty());

    df.collect().unwrap();
    df.count().unwrap();
    df.first().unwrap();

    let actions = vec![
        Event::Success {
            action: "collect".to_string(),
        },
        Event::Success {
            action: "count".to_string(),
        },
        Event::Success {
            action: "head".to_string(),
        },
    ];
    assert_eq!(actions, listener.take());
}

#[test]
fn listener_sees_failure_with_original_error() {
    let session = session();
    let listener = RecordingListener::register(&session);

    let ds = session.create_dataset(vec![1_i64, 2, 3]).unwrap();
    let failing = ds
        .try_map(|v| {
            if v == 2 {
                Err(DatasetError::Execution("boom".to_string()))
            } else {
                Ok(v)
            }
        })
        .unwrap();

    let err = failing.collect().unwrap_err();
    assert_eq!(DatasetError::Execution("boom".to_string()), err);
    assert_eq!(
        vec![Event::Failure {
            action: "collect".to_string(),
            error: err,
        }],
        listener.take()
    );
}

#[derive(Debug)]
struct PanickingListener;

impl QueryExecutionListener for PanickingListener {
    fn on_success(&self, _action: &str, _info: &QueryExecutionInfo, _duration_nanos: u64) {
        panic!("listener panic");
    }

    fn on_failure(&self, _action: &str, _info: &QueryExecutionInfo, _error: &DatasetError) {
        panic!("listener panic");
    }
}

#[test]
fn panicking_listener_does_not_affect_result() {
    let session = session();
    session.register_listener(Arc::new(PanickingListener));
    let recording = RecordingListener::register(&session);

    let df = people(&session);
    assert_eq!(2, df.count().unwrap());
    assert_eq!(1, recording.take().len());
}

#[test]
fn unregistered_listener_not_called() {
    let session = session();
    let recording = RecordingListener::register(&session);
    let as_dyn: Arc<dyn QueryExecutionListener> = recording.clone();

    assert!(session.unregister_listener(&as_dyn));
    assert!(!session.unregister_listener(&as_dyn));

    people(&session).collect().unwrap();
    assert!(recording.take().is_empty());
}

#[derive(Debug, Default)]
struct MetricsListener {
    metrics: Mutex<Vec<(ExecutionStatus, ExecutionMetrics)>>,
}

impl QueryExecutionListener for MetricsListener {
    fn on_success(&self, _action: &str, info: &QueryExecutionInfo, _duration_nanos: u64) {
        self.metrics
            .lock()
            .push((info.status, info.metrics.clone()));
    }

    fn on_failure(&self, _action: &str, info: &QueryExecutionInfo, _error: &DatasetError) {
        self.metrics
            .lock()
            .push((info.status, info.metrics.clone()));
    }
}

#[test]
fn listener_receives_operator_metrics() {
    let session = session();
    let listener = Arc::new(MetricsListener::default());
    session.register_listener(listener.clone());

    people(&session)
        .filter_expr("age > 35")
        .unwrap()
        .collect()
        .unwrap();

    let metrics = listener.metrics.lock().clone();
    assert_eq!(1, metrics.len());
    let (status, metrics) = &metrics[0];
    assert_eq!(ExecutionStatus::Success, *status);
    assert_eq!(Some(1), metrics.output_rows());

    let json = serde_json::to_value(metrics).unwrap();
    let operators = json["operators"].as_array().unwrap();
    assert_eq!(metrics.operators.len(), operators.len());
    assert_eq!(serde_json::json!(1), operators[0]["output_rows"]);
}

#[test]
fn command_runs_once() {
    let session = session();
    let runs = Arc::new(AtomicUsize::new(0));

    let counter = runs.clone();
    let df = session
        .command(
            "insert",
            Schema::new([Field::new("inserted", DataType::Int64, false)]),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(vec![row![5_i64]])
            },
        )
        .unwrap();
    assert_eq!(1, runs.load(Ordering::SeqCst));

    assert_eq!(vec![row![5_i64]], df.collect().unwrap());
    assert_eq!(1, df.count().unwrap());
    assert_eq!(1, df.select_names(&["inserted"]).unwrap().count().unwrap());
    assert_eq!(1, runs.load(Ordering::SeqCst));
}

#[test]
fn command_failure_reported_at_construction() {
    let session = session();
    let listener = RecordingListener::register(&session);

    let err = session
        .command("fails", Schema::new(Vec::<Field>::new()), || {
            Err(DatasetError::Execution("nope".to_string()))
        })
        .unwrap_err();

    assert_eq!(DatasetError::Execution("nope".to_string()), err);
    assert_eq!(
        vec![Event::Failure {
            action: "command".to_string(),
            error: err,
        }],
        listener.take()
    );
}

#[test]
fn cached_plan_materialized_once() {
    let session = session();
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = calls.clone();
    let ds = session
        .create_dataset(vec![1_i64, 2, 3])
        .unwrap()
        .map(move |v| {
            counter.fetch_add(1, Ordering::SeqCst);
            v * 10
        })
        .unwrap()
        .cache();
    assert_eq!(StorageLevel::MemoryAndDisk, ds.storage_level());
    assert_eq!(0, calls.load(Ordering::SeqCst));

    let mut values = ds.collect().unwrap();
    values.sort();
    assert_eq!(vec![10, 20, 30], values);
    assert_eq!(3, ds.count().unwrap());
    assert_eq!(2, ds.filter_fn(|v| *v > 10).unwrap().count().unwrap());
    assert_eq!(3, calls.load(Ordering::SeqCst));

    let ds = ds.unpersist(true);
    assert_eq!(StorageLevel::None, ds.storage_level());
    ds.collect().unwrap();
    assert_eq!(6, calls.load(Ordering::SeqCst));
}

#[test]
fn describe_numeric_columns() {
    let session = session();
    let listener = RecordingListener::register(&session);

    let summary = people(&session).describe(&[]).unwrap();
    assert_eq!(vec!["summary", "age"], summary.columns());
    assert_eq!(
        vec![Event::Success {
            action: "describe".to_string(),
        }],
        listener.take()
    );

    let rows = summary.collect().unwrap();
    assert_eq!(5, rows.len());
    assert_eq!(row!["count", "2"], rows[0]);
    assert_eq!(row!["min", "30"], rows[3]);
    assert_eq!(row!["max", "40"], rows[4]);
}
