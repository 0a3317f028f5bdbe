use async_trait::async_trait;
use parking_lot::Mutex;
use taskdeck_shared::{Task, TaskDraft, TaskId, TaskPatch};
use tracing::debug;
use uuid::Uuid;

use crate::client::TaskStore;
use crate::error::{StoreError, StoreResult};

/// In-process `TaskStore`. Identifiers are minted here, the way the remote
/// store assigns them, and unknown ids answer with a 404 like the API does.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    tasks: Mutex<Vec<Task>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
        }
    }

    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.lock().clone()
    }
}

fn not_found(id: &TaskId) -> StoreError {
    StoreError::remote(404, format!("Task not found: {id}"))
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        Ok(self.snapshot())
    }

    async fn create_task(&self, draft: &TaskDraft) -> StoreResult<Task> {
        let id = TaskId::new(Uuid::new_v4().simple().to_string());
        let task = draft.clone().into_task(id);
        self.tasks.lock().push(task.clone());
        debug!(id = %task.id, "memory store created task");
        Ok(task)
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> StoreResult<Task> {
        let mut tasks = self.tasks.lock();
        let task = tasks
            .iter_mut()
            .find(|task| &task.id == id)
            .ok_or_else(|| not_found(id))?;
        patch.apply_to(task);
        Ok(task.clone())
    }

    async fn delete_task(&self, id: &TaskId) -> StoreResult<()> {
        let mut tasks = self.tasks.lock();
        let before = tasks.len();
        tasks.retain(|task| &task.id != id);
        if tasks.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(who: &str) -> TaskDraft {
        TaskDraft {
            assigned_to: who.to_string(),
            status: "Open".to_string(),
            priority: "Low".to_string(),
            ..TaskDraft::default()
        }
    }

    #[tokio::test]
    async fn assigns_distinct_identifiers() {
        let store = MemoryTaskStore::new();
        let a = store.create_task(&draft("a")).await.expect("create a");
        let b = store.create_task(&draft("b")).await.expect("create b");
        assert_ne!(a.id, b.id);
        assert_eq!(store.list_tasks().await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn unknown_ids_report_remote_not_found() {
        let store = MemoryTaskStore::new();
        let missing = TaskId::from("nope");

        let err = store
            .update_task(&missing, &TaskPatch::default())
            .await
            .expect_err("update should fail");
        assert!(matches!(err, StoreError::Remote { status: 404, .. }));

        let err = store.delete_task(&missing).await.expect_err("delete should fail");
        assert_eq!(err.kind(), "remote");
    }
}
