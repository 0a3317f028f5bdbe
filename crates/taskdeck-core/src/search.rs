use taskdeck_shared::Task;
use tracing::trace;

/// Free-text query matched against assignee, status, priority and comments.
///
/// Matching is a case-insensitive substring test. The text is kept exactly
/// as typed: no trimming, and whitespace anywhere in it is significant.
#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct SearchQuery {
  raw:    String,
  folded: String
}

impl SearchQuery {
  pub fn new(
    raw: impl Into<String>
  ) -> Self {
    let raw = raw.into();
    let folded = raw.to_lowercase();
    Self {
      raw,
      folded
    }
  }

  pub fn as_str(&self) -> &str {
    &self.raw
  }

  pub fn is_empty(&self) -> bool {
    self.raw.is_empty()
  }

  pub fn matches(
    &self,
    task: &Task
  ) -> bool {
    if self.folded.is_empty() {
      return true;
    }

    contains_folded(
      &task.assigned_to,
      &self.folded
    ) || contains_folded(
      &task.status,
      &self.folded
    ) || contains_folded(
      &task.priority,
      &self.folded
    ) || task.comments.iter().any(
      |comment| {
        contains_folded(
          comment,
          &self.folded
        )
      }
    )
  }
}

fn contains_folded(
  haystack: &str,
  folded_needle: &str
) -> bool {
  haystack
    .to_lowercase()
    .contains(folded_needle)
}

/// The filtered view: tasks matching `query`, in collection order.
#[tracing::instrument(skip(
  tasks, query
), fields(q = %query.as_str()))]
pub fn filter_tasks<'a>(
  tasks: &'a [Task],
  query: &SearchQuery
) -> Vec<&'a Task> {
  let out: Vec<&Task> = tasks
    .iter()
    .filter(|task| query.matches(task))
    .collect();
  trace!(
    total = tasks.len(),
    matched = out.len(),
    "filtered tasks"
  );
  out
}
