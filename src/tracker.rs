//! Task lifecycle bookkeeping.
//!
//! One [`TaskRecord`] per track-level unit of work, held in a shared
//! [`TaskStore`] handle that the orchestrator's caller owns and injects.
//! The store is pure bookkeeping: the pipeline is the only writer, any
//! number of readers may poll concurrently, and a reader always sees a
//! complete record, never a partially-written one.

use std::{
    collections::HashMap,
    fmt,
    path::PathBuf,
    sync::{Arc, PoisonError, RwLock},
};

use uuid::Uuid;

/// Lifecycle state of one track-level task.
///
/// Transitions are strictly monotonic along the declaration order, with
/// a fault at any stage jumping directly to `Failed`. Terminal states
/// are never left.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum TaskState {
    #[default]
    Pending,
    Resolving,
    Searching,
    Fetching,
    Tagging,
    Completed,
    Failed,
}

impl TaskState {
    /// Whether this state ends the task's lifecycle.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// The coarse status vocabulary used towards transport layers.
    #[must_use]
    pub fn status_label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolving | Self::Searching | Self::Fetching | Self::Tagging => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Resolving => "resolving",
            Self::Searching => "searching",
            Self::Fetching => "fetching",
            Self::Tagging => "tagging",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Snapshot of one submitted unit of work.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskRecord {
    pub id: Uuid,

    pub state: TaskState,

    /// Display strings, filled in once metadata is known.
    pub track: String,
    pub artist: String,

    /// Where the fetched audio file landed, once it exists. Kept even
    /// when a later tagging step fails.
    pub file_path: Option<PathBuf>,

    /// Human-readable cause, set when `state` is `Failed`.
    pub error: Option<String>,

    /// For playlist submissions: the independent child track tasks.
    /// Purely advisory, no parent-state aggregation happens.
    pub children: Vec<Uuid>,
}

/// Shared, cloneable handle to the record store.
///
/// Cloning is cheap and every clone observes the same records.
#[derive(Clone, Default)]
pub struct TaskStore {
    records: Arc<RwLock<HashMap<Uuid, TaskRecord>>>,
}

impl TaskStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new record in `Pending` state and returns its ID.
    #[must_use]
    pub fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        let record = TaskRecord {
            id,
            ..TaskRecord::default()
        };

        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, record);

        id
    }

    /// Returns a snapshot of the record, or `None` for an unknown ID.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<TaskRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Snapshots of all records, in no particular order.
    #[must_use]
    pub fn all(&self) -> Vec<TaskRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Mutates a record in place under the write lock.
    ///
    /// Records in a terminal state are frozen: the closure is not run
    /// for them. Returns `false` for an unknown ID.
    pub fn update<F>(&self, id: Uuid, mutate: F) -> bool
    where
        F: FnOnce(&mut TaskRecord),
    {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);

        match records.get_mut(&id) {
            Some(record) => {
                if !record.state.is_terminal() {
                    mutate(record);
                }
                true
            }
            None => false,
        }
    }

    /// Advances a record to a later state.
    ///
    /// Regressions are ignored so transitions stay monotonic no matter
    /// how call sites interleave.
    pub fn advance(&self, id: Uuid, state: TaskState) -> bool {
        self.update(id, |record| {
            if state > record.state {
                trace!("task {id}: {} -> {state}", record.state);
                record.state = state;
            }
        })
    }

    /// Marks a record as failed with a human-readable cause.
    pub fn fail(&self, id: Uuid, cause: impl fmt::Display) -> bool {
        self.update(id, |record| {
            record.state = TaskState::Failed;
            record.error = Some(cause.to_string());
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_get() {
        let store = TaskStore::new();
        let id = store.create();

        let record = store.get(id).unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.state, TaskState::Pending);
        assert!(record.error.is_none());
    }

    #[test]
    fn unknown_id_is_not_found() {
        let store = TaskStore::new();
        assert!(store.get(Uuid::new_v4()).is_none());
        assert!(!store.advance(Uuid::new_v4(), TaskState::Resolving));
    }

    #[test]
    fn states_advance_monotonically() {
        let store = TaskStore::new();
        let id = store.create();

        assert!(store.advance(id, TaskState::Resolving));
        assert!(store.advance(id, TaskState::Searching));

        // A regression is ignored, not applied.
        assert!(store.advance(id, TaskState::Resolving));
        assert_eq!(store.get(id).unwrap().state, TaskState::Searching);
    }

    #[test]
    fn terminal_states_are_frozen() {
        let store = TaskStore::new();
        let id = store.create();

        store.advance(id, TaskState::Completed);
        store.fail(id, "too late");
        store.advance(id, TaskState::Failed);

        let record = store.get(id).unwrap();
        assert_eq!(record.state, TaskState::Completed);
        assert!(record.error.is_none());

        let failed = store.create();
        store.fail(failed, "no matching audio found");
        store.advance(failed, TaskState::Completed);
        assert_eq!(store.get(failed).unwrap().state, TaskState::Failed);
    }

    #[test]
    fn failure_records_cause() {
        let store = TaskStore::new();
        let id = store.create();

        store.fail(id, "unsupported URL");
        let record = store.get(id).unwrap();
        assert_eq!(record.state, TaskState::Failed);
        assert_eq!(record.error.as_deref(), Some("unsupported URL"));
    }

    #[test]
    fn status_labels() {
        assert_eq!(TaskState::Pending.status_label(), "pending");
        assert_eq!(TaskState::Searching.status_label(), "processing");
        assert_eq!(TaskState::Completed.status_label(), "completed");
        assert_eq!(TaskState::Failed.status_label(), "failed");
    }

    #[test]
    fn concurrent_updates_never_tear() {
        let store = TaskStore::new();
        let id = store.create();

        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for state in [
                    TaskState::Resolving,
                    TaskState::Searching,
                    TaskState::Fetching,
                    TaskState::Tagging,
                    TaskState::Completed,
                ] {
                    store.advance(id, state);
                }
            })
        };

        // Readers must always observe a complete record with a valid state.
        for _ in 0..100 {
            if let Some(record) = store.get(id) {
                assert_eq!(record.id, id);
            }
        }

        writer.join().unwrap();
        assert_eq!(store.get(id).unwrap().state, TaskState::Completed);
    }
}
