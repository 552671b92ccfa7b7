#![allow(dead_code)]

use std::sync::Arc;

use glaredb_dataset::listener::QueryExecutionInfo;
use glaredb_dataset::{
    DataFrame,
    DataType,
    DatasetError,
    DatasetSession,
    Field,
    QueryExecutionListener,
    Schema,
    row,
};
use parking_lot::Mutex;

pub fn session() -> DatasetSession {
    logutil::init_test();
    DatasetSession::local()
}

/// `(name: string, age: int)`.
pub fn people(session: &DatasetSession) -> DataFrame {
    session
        .create_dataframe(
            vec![row!["a", 30], row!["b", 40]],
            Schema::new([
                Field::new("name", DataType::Utf8, false),
                Field::new("age", DataType::Int32, true),
            ]),
        )
        .unwrap()
}

/// `(k: int, v: string)` with unique keys.
pub fn keyed(session: &DatasetSession) -> DataFrame {
    session
        .create_dataframe(
            vec![row![1, "x"], row![2, "y"], row![3, "z"]],
            Schema::new([
                Field::new("k", DataType::Int32, false),
                Field::new("v", DataType::Utf8, false),
            ]),
        )
        .unwrap()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Success { action: String },
    Failure { action: String, error: DatasetError },
}

#[derive(Debug, Default)]
pub struct RecordingListener {
    pub events: Mutex<Vec<Event>>,
}

impl RecordingListener {
    pub fn register(session: &DatasetSession) -> Arc<RecordingListener> {
        let listener = Arc::new(RecordingListener::default());
        session.register_listener(listener.clone());
        listener
    }

    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl QueryExecutionListener for RecordingListener {
    fn on_success(&self, action: &str, info: &QueryExecutionInfo, _duration_nanos: u64) {
        assert!(info.finished_at >= info.started_at);
        self.events.lock().push(Event::Success {
            action: action.to_string(),
        });
    }

    fn on_failure(&self, action: &str, _info: &QueryExecutionInfo, error: &DatasetError) {
        self.events.lock().push(Event::Failure {
            action: action.to_string(),
            error: error.clone(),
        });
    }
}
