use taskdeck_shared::{Task, TaskId};
use tracing::{debug, error, warn};

use crate::collection::TaskCollection;
use crate::error::StoreResult;
use crate::pagination::{PageNav, PageSize, Pager};
use crate::search::{SearchQuery, filter_tasks};
use crate::ui_state::{Modal, TransientUi};

/// Everything that can happen to the task table: user input and the
/// completion of remote calls.
#[derive(Debug)]
pub enum TableEvent {
    QueryChanged(String),
    PageSizeChanged(PageSize),
    Navigate(PageNav),
    GoToPage(usize),
    ToggleActions(TaskId),
    OpenCreate,
    OpenEdit(TaskId),
    OpenDelete(TaskId),
    CloseModal,
    DismissNotice,
    LoadStarted,
    LoadFinished(StoreResult<Vec<Task>>),
    Created(StoreResult<Task>),
    Updated(StoreResult<Task>),
    Deleted { id: TaskId, result: StoreResult<()> },
    Unmounted,
}

impl TableEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::QueryChanged(_) => "query_changed",
            Self::PageSizeChanged(_) => "page_size_changed",
            Self::Navigate(_) => "navigate",
            Self::GoToPage(_) => "go_to_page",
            Self::ToggleActions(_) => "toggle_actions",
            Self::OpenCreate => "open_create",
            Self::OpenEdit(_) => "open_edit",
            Self::OpenDelete(_) => "open_delete",
            Self::CloseModal => "close_modal",
            Self::DismissNotice => "dismiss_notice",
            Self::LoadStarted => "load_started",
            Self::LoadFinished(_) => "load_finished",
            Self::Created(_) => "created",
            Self::Updated(_) => "updated",
            Self::Deleted { .. } => "deleted",
            Self::Unmounted => "unmounted",
        }
    }
}

/// One rendered page of the filtered view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView<'a> {
    pub number: usize,
    pub total_pages: usize,
    pub size: PageSize,
    pub matching: usize,
    pub total_tasks: usize,
    pub rows: Vec<&'a Task>,
}

impl PageView<'_> {
    pub fn is_first(&self) -> bool {
        self.number == 1
    }

    pub fn is_last(&self) -> bool {
        self.number >= self.total_pages
    }

    /// Task shown on the 1-based `row` of this page.
    pub fn row(&self, row: usize) -> Option<&Task> {
        row.checked_sub(1).and_then(|idx| self.rows.get(idx)).copied()
    }
}

/// State container for the task table. Every transition goes through
/// [`TaskTable::apply`].
#[derive(Debug, Clone)]
pub struct TaskTable {
    tasks: TaskCollection,
    query: SearchQuery,
    pager: Pager,
    ui: TransientUi,
    loading: bool,
    error: Option<String>,
    notice: Option<String>,
    mounted: bool,
}

impl Default for TaskTable {
    fn default() -> Self {
        Self::new(PageSize::DEFAULT)
    }
}

impl TaskTable {
    pub fn new(page_size: PageSize) -> Self {
        Self {
            tasks: TaskCollection::new(),
            query: SearchQuery::default(),
            pager: Pager::new(page_size),
            ui: TransientUi::default(),
            loading: false,
            error: None,
            notice: None,
            mounted: true,
        }
    }

    pub fn tasks(&self) -> &TaskCollection {
        &self.tasks
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    pub fn ui(&self) -> &TransientUi {
        &self.ui
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Failure of the last list fetch.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Failure of the last create, update or delete.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn filtered(&self) -> Vec<&Task> {
        filter_tasks(self.tasks.as_slice(), &self.query)
    }

    pub fn page(&self) -> PageView<'_> {
        let filtered = self.filtered();
        let rows = self.pager.slice(&filtered).to_vec();
        PageView {
            number: self.pager.page(),
            total_pages: self.pager.total_pages(filtered.len()),
            size: self.pager.size(),
            matching: filtered.len(),
            total_tasks: self.tasks.len(),
            rows,
        }
    }

    pub fn editing_task(&self) -> Option<&Task> {
        self.ui.edit_target().and_then(|id| self.tasks.get(id))
    }

    pub fn deleting_task(&self) -> Option<&Task> {
        self.ui.delete_target().and_then(|id| self.tasks.get(id))
    }

    /// Applies one event. Returns `false` when the event was discarded
    /// because the view has been torn down.
    pub fn apply(&mut self, event: TableEvent) -> bool {
        if !self.mounted {
            debug!(event = event.name(), "view unmounted, discarding event");
            return false;
        }
        debug!(event = event.name(), "applying table event");

        match event {
            TableEvent::QueryChanged(raw) => {
                self.query = SearchQuery::new(raw);
                self.view_changed();
            }
            TableEvent::PageSizeChanged(size) => {
                let count = self.filtered().len();
                self.pager.set_size(size, count);
            }
            TableEvent::Navigate(nav) => {
                let count = self.filtered().len();
                self.pager.navigate(nav, count);
            }
            TableEvent::GoToPage(page) => {
                let count = self.filtered().len();
                self.pager.go_to(page, count);
            }
            TableEvent::ToggleActions(id) => self.ui.toggle_dropdown(id),
            TableEvent::OpenCreate => self.ui.open_create(),
            TableEvent::OpenEdit(id) => {
                if self.tasks.contains(&id) {
                    self.ui.open_edit(id);
                } else {
                    warn!(id = %id, "cannot edit unknown task");
                }
            }
            TableEvent::OpenDelete(id) => {
                if self.tasks.contains(&id) {
                    self.ui.open_delete(id);
                } else {
                    warn!(id = %id, "cannot delete unknown task");
                }
            }
            TableEvent::CloseModal => self.ui.close_modal(),
            TableEvent::DismissNotice => self.notice = None,
            TableEvent::LoadStarted => {
                self.loading = true;
                self.error = None;
            }
            TableEvent::LoadFinished(result) => {
                self.loading = false;
                match result {
                    Ok(tasks) => {
                        debug!(count = tasks.len(), "loaded tasks");
                        self.tasks.reset(tasks);
                        self.view_changed();
                    }
                    Err(err) => {
                        error!(error = %err, kind = err.kind(), "error fetching tasks");
                        self.error = Some(err.to_string());
                    }
                }
            }
            TableEvent::Created(result) => match result {
                Ok(task) => {
                    self.tasks.add_local(task);
                    self.view_changed();
                    if self.ui.modal() == &Modal::Create {
                        self.ui.close_modal();
                    }
                    self.notice = None;
                }
                Err(err) => {
                    error!(error = %err, kind = err.kind(), "error creating task");
                    self.notice = Some(format!("could not create task: {err}"));
                }
            },
            TableEvent::Updated(result) => match result {
                Ok(task) => {
                    let id = task.id.clone();
                    if !self.tasks.replace_local(task) {
                        warn!(id = %id, "updated task is not in the local collection");
                    }
                    self.view_changed();
                    if self.ui.edit_target() == Some(&id) {
                        self.ui.close_modal();
                    }
                    self.notice = None;
                }
                Err(err) => {
                    error!(error = %err, kind = err.kind(), "error updating task");
                    self.notice = Some(format!("could not update task: {err}"));
                }
            },
            TableEvent::Deleted { id, result } => {
                match result {
                    Ok(()) => {
                        if self.tasks.remove_local(&id).is_none() {
                            warn!(id = %id, "deleted task is not in the local collection");
                        }
                        self.view_changed();
                        self.notice = None;
                    }
                    Err(err) => {
                        error!(id = %id, error = %err, kind = err.kind(), "error deleting task");
                        self.notice = Some(format!("could not delete task: {err}"));
                    }
                }
                if self.ui.delete_target() == Some(&id) {
                    self.ui.close_modal();
                }
            }
            TableEvent::Unmounted => self.mounted = false,
        }

        true
    }

    /// The filtered view is recomputed from scratch on every read; the only
    /// thing to fix up when its inputs change is the page number.
    fn view_changed(&mut self) {
        self.pager.reset();
    }
}
