use taskdeck_shared::{Task, TaskId};
use tracing::trace;

/// Local copy of the remote task list, in the order the store returned it.
///
/// Mutations here are purely local. Callers apply them only after the
/// matching remote call succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskCollection {
    tasks: Vec<Task>,
}

impl TaskCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.get(id).is_some()
    }

    /// Appends without dedup or sorting.
    pub fn add_local(&mut self, task: Task) {
        trace!(id = %task.id, "appending task");
        self.tasks.push(task);
    }

    /// Replaces the task with the same identifier in place. Returns `false`
    /// when no such task exists; the collection is left untouched then.
    pub fn replace_local(&mut self, task: Task) -> bool {
        match self.tasks.iter_mut().find(|existing| existing.id == task.id) {
            Some(slot) => {
                *slot = task;
                true
            }
            None => false,
        }
    }

    /// Removes the task with this identifier, keeping the relative order of
    /// the rest. Returns the removed task, if any.
    pub fn remove_local(&mut self, id: &TaskId) -> Option<Task> {
        let idx = self.tasks.iter().position(|task| &task.id == id)?;
        Some(self.tasks.remove(idx))
    }

    pub fn reset(&mut self, tasks: Vec<Task>) {
        trace!(count = tasks.len(), "resetting collection");
        self.tasks = tasks;
    }
}

impl From<Vec<Task>> for TaskCollection {
    fn from(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }
}

#[cfg(test)]
mod tests {
    use taskdeck_shared::TaskDraft;

    use super::*;

    fn task(id: u32) -> Task {
        TaskDraft {
            assigned_to: format!("user-{id}"),
            status: "Open".to_string(),
            priority: "Medium".to_string(),
            ..TaskDraft::default()
        }
        .into_task(TaskId::new(id.to_string()))
    }

    fn ids(collection: &TaskCollection) -> Vec<String> {
        collection
            .as_slice()
            .iter()
            .map(|task| task.id.to_string())
            .collect()
    }

    #[test]
    fn add_local_appends_at_end_without_dedup() {
        let mut collection = TaskCollection::from(vec![task(2), task(1)]);
        collection.add_local(task(3));
        collection.add_local(task(3));
        assert_eq!(ids(&collection), ["2", "1", "3", "3"]);
    }

    #[test]
    fn replace_local_keeps_position_and_length() {
        let mut collection = TaskCollection::from((1..=4).map(task).collect::<Vec<_>>());
        let mut updated = task(3);
        updated.status = "Done".to_string();

        assert!(collection.replace_local(updated.clone()));
        assert_eq!(collection.len(), 4);
        assert_eq!(ids(&collection), ["1", "2", "3", "4"]);
        assert_eq!(collection.get(&TaskId::from("3")), Some(&updated));
    }

    #[test]
    fn replace_local_missing_id_is_noop() {
        let mut collection = TaskCollection::from(vec![task(1)]);
        let before = collection.clone();
        assert!(!collection.replace_local(task(9)));
        assert_eq!(collection, before);
    }

    #[test]
    fn remove_local_preserves_relative_order() {
        let mut collection = TaskCollection::from((1..=7).map(task).collect::<Vec<_>>());
        let removed = collection.remove_local(&TaskId::from("5"));

        assert_eq!(removed.map(|task| task.id), Some(TaskId::from("5")));
        assert_eq!(collection.len(), 6);
        assert!(!collection.contains(&TaskId::from("5")));
        assert_eq!(ids(&collection), ["1", "2", "3", "4", "6", "7"]);
        assert!(collection.remove_local(&TaskId::from("5")).is_none());
    }

    #[test]
    fn reset_replaces_everything() {
        let mut collection = TaskCollection::from(vec![task(1), task(2)]);
        collection.reset(vec![task(8)]);
        assert_eq!(ids(&collection), ["8"]);
        collection.reset(vec![]);
        assert!(collection.is_empty());
    }
}
