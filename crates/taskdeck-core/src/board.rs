use std::cell::{Ref, RefCell};

use taskdeck_shared::{TaskDraft, TaskPatch};
use tracing::{info, instrument, warn};

use crate::client::TaskStore;
use crate::view::{TableEvent, TaskTable};

/// Drives a [`TaskTable`] against a [`TaskStore`].
///
/// Remote calls are awaited without holding a borrow of the table, so input
/// events can still be dispatched while a request is in flight. A local
/// mutation is applied only once its remote call has returned, and results
/// that come back after [`TaskBoard::unmount`] are dropped.
pub struct TaskBoard<S> {
    store: S,
    table: RefCell<TaskTable>,
}

impl<S: TaskStore> TaskBoard<S> {
    pub fn new(store: S) -> Self {
        Self::with_table(store, TaskTable::default())
    }

    pub fn with_table(store: S, table: TaskTable) -> Self {
        Self {
            store,
            table: RefCell::new(table),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read access to the table. Do not hold the guard across an `.await`.
    pub fn table(&self) -> Ref<'_, TaskTable> {
        self.table.borrow()
    }

    pub fn dispatch(&self, event: TableEvent) -> bool {
        self.table.borrow_mut().apply(event)
    }

    /// Fetches the full list and replaces the local collection with it.
    /// Returns whether the fetch succeeded and was applied.
    #[instrument(skip(self))]
    pub async fn load(&self) -> bool {
        if !self.dispatch(TableEvent::LoadStarted) {
            return false;
        }
        let result = self.store.list_tasks().await;
        let ok = result.is_ok();
        self.dispatch(TableEvent::LoadFinished(result)) && ok
    }

    pub async fn refresh(&self) -> bool {
        info!("refreshing task list");
        self.load().await
    }

    #[instrument(skip(self, draft))]
    pub async fn submit_create(&self, draft: TaskDraft) -> bool {
        let result = self.store.create_task(&draft).await;
        let ok = result.is_ok();
        self.dispatch(TableEvent::Created(result)) && ok
    }

    /// Sends `patch` for the task targeted by the open edit modal.
    #[instrument(skip(self, patch))]
    pub async fn submit_edit(&self, patch: TaskPatch) -> bool {
        let target = self.table().ui().edit_target().cloned();
        let Some(id) = target else {
            warn!("no task is open for editing");
            return false;
        };

        let result = self.store.update_task(&id, &patch).await;
        let ok = result.is_ok();
        self.dispatch(TableEvent::Updated(result)) && ok
    }

    /// Deletes the task targeted by the open delete confirmation.
    #[instrument(skip(self))]
    pub async fn confirm_delete(&self) -> bool {
        let target = self.table().ui().delete_target().cloned();
        let Some(id) = target else {
            warn!("no task is pending deletion");
            return false;
        };

        let result = self.store.delete_task(&id).await;
        let ok = result.is_ok();
        self.dispatch(TableEvent::Deleted { id, result }) && ok
    }

    pub fn unmount(&self) {
        self.dispatch(TableEvent::Unmounted);
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use taskdeck_shared::{Task, TaskId};
    use tokio::sync::Notify;

    use super::*;
    use crate::error::{StoreError, StoreResult};
    use crate::memory::MemoryTaskStore;
    use crate::ui_state::Modal;

    fn draft(who: &str, priority: &str) -> TaskDraft {
        TaskDraft {
            assigned_to: who.to_string(),
            status: "Open".to_string(),
            priority: priority.to_string(),
            ..TaskDraft::default()
        }
    }

    fn seeded(count: usize) -> Vec<Task> {
        (1..=count)
            .map(|id| draft(&format!("user-{id}"), "Low").into_task(TaskId::new(id.to_string())))
            .collect()
    }

    /// Fails every call with a network-free remote error.
    struct DownStore;

    #[async_trait]
    impl TaskStore for DownStore {
        async fn list_tasks(&self) -> StoreResult<Vec<Task>> {
            Err(StoreError::remote(502, "bad gateway"))
        }

        async fn create_task(&self, _draft: &TaskDraft) -> StoreResult<Task> {
            Err(StoreError::remote(502, "bad gateway"))
        }

        async fn update_task(&self, _id: &TaskId, _patch: &TaskPatch) -> StoreResult<Task> {
            Err(StoreError::remote(502, "bad gateway"))
        }

        async fn delete_task(&self, _id: &TaskId) -> StoreResult<()> {
            Err(StoreError::remote(502, "bad gateway"))
        }
    }

    /// Holds `list_tasks` until released.
    struct GatedStore {
        inner: MemoryTaskStore,
        release: Notify,
    }

    #[async_trait]
    impl TaskStore for GatedStore {
        async fn list_tasks(&self) -> StoreResult<Vec<Task>> {
            self.release.notified().await;
            self.inner.list_tasks().await
        }

        async fn create_task(&self, draft: &TaskDraft) -> StoreResult<Task> {
            self.inner.create_task(draft).await
        }

        async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> StoreResult<Task> {
            self.inner.update_task(id, patch).await
        }

        async fn delete_task(&self, id: &TaskId) -> StoreResult<()> {
            self.inner.delete_task(id).await
        }
    }

    #[tokio::test]
    async fn create_appends_after_remote_confirms() {
        let board = TaskBoard::new(MemoryTaskStore::with_tasks(seeded(2)));
        assert!(board.load().await);

        board.dispatch(TableEvent::OpenCreate);
        assert!(board.submit_create(draft("Dee", "High")).await);

        let table = board.table();
        assert_eq!(table.tasks().len(), 3);
        assert_eq!(table.tasks().as_slice()[2].assigned_to, "Dee");
        assert_eq!(table.ui().modal(), &Modal::Closed);
        assert_eq!(board.store().snapshot().len(), 3);
    }

    #[tokio::test]
    async fn update_round_trip_matches_server_value() {
        let board = TaskBoard::new(MemoryTaskStore::with_tasks(seeded(4)));
        board.load().await;

        let id = TaskId::from("3");
        board.dispatch(TableEvent::OpenEdit(id.clone()));
        let patch = TaskPatch {
            status: Some("Done".to_string()),
            ..TaskPatch::default()
        };
        assert!(board.submit_edit(patch).await);

        let server = board
            .store()
            .snapshot()
            .into_iter()
            .find(|task| task.id == id)
            .expect("server copy");
        let table = board.table();
        assert_eq!(table.tasks().len(), 4);
        assert_eq!(table.tasks().get(&id), Some(&server));
        assert_eq!(table.tasks().as_slice()[2].id, id);
    }

    #[tokio::test]
    async fn delete_removes_only_that_task() {
        let board = TaskBoard::new(MemoryTaskStore::with_tasks(seeded(7)));
        board.load().await;

        board.dispatch(TableEvent::ToggleActions(TaskId::from("5")));
        board.dispatch(TableEvent::OpenDelete(TaskId::from("5")));
        assert_eq!(board.table().ui().dropdown(), None);
        assert!(board.confirm_delete().await);

        let table = board.table();
        let ids: Vec<&str> = table.tasks().as_slice().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3", "4", "6", "7"]);
        assert_eq!(table.ui().modal(), &Modal::Closed);
    }

    #[tokio::test]
    async fn failures_leave_collection_untouched() {
        let board = TaskBoard::with_table(DownStore, TaskTable::default());
        assert!(!board.load().await);
        assert!(board.table().error().is_some());
        assert!(!board.table().is_loading());

        board.dispatch(TableEvent::OpenCreate);
        assert!(!board.submit_create(draft("Eve", "Low")).await);
        assert_eq!(board.table().ui().modal(), &Modal::Create);
        assert!(board.table().tasks().is_empty());
        assert!(board.table().notice().is_some());
    }

    #[tokio::test]
    async fn mutations_without_target_are_noops() {
        let board = TaskBoard::new(MemoryTaskStore::with_tasks(seeded(1)));
        board.load().await;
        assert!(!board.submit_edit(TaskPatch::default()).await);
        assert!(!board.confirm_delete().await);
        assert_eq!(board.store().snapshot().len(), 1);
    }

    #[tokio::test]
    async fn input_during_pending_load_is_kept() {
        let board = TaskBoard::new(GatedStore {
            inner: MemoryTaskStore::with_tasks(seeded(15)),
            release: Notify::new(),
        });

        let (loaded, ()) = tokio::join!(board.load(), async {
            board.dispatch(TableEvent::QueryChanged("user-1".to_string()));
            assert!(board.table().is_loading());
            board.store().release.notify_one();
        });

        assert!(loaded);
        let table = board.table();
        assert_eq!(table.query().as_str(), "user-1");
        // user-1, user-10..user-15
        assert_eq!(table.page().matching, 7);
    }

    #[tokio::test]
    async fn completion_after_unmount_is_discarded() {
        let board = TaskBoard::new(GatedStore {
            inner: MemoryTaskStore::with_tasks(seeded(3)),
            release: Notify::new(),
        });

        let (loaded, ()) = tokio::join!(board.load(), async {
            board.unmount();
            board.store().release.notify_one();
        });

        assert!(!loaded);
        assert!(board.table().tasks().is_empty());
        assert!(!board.table().is_mounted());
    }
}
