use taskdeck_shared::TaskId;

/// The one modal that may be open over the table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Modal {
    #[default]
    Closed,
    Create,
    Edit(TaskId),
    ConfirmDelete(TaskId),
}

/// Ephemeral view state: open modal, its target, and the expanded action
/// dropdown. None of this is part of the task data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransientUi {
    modal: Modal,
    dropdown: Option<TaskId>,
}

impl TransientUi {
    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    pub fn dropdown(&self) -> Option<&TaskId> {
        self.dropdown.as_ref()
    }

    pub fn is_dropdown_open(&self, id: &TaskId) -> bool {
        self.dropdown.as_ref() == Some(id)
    }

    /// Task targeted by the open edit or delete modal.
    pub fn target(&self) -> Option<&TaskId> {
        match &self.modal {
            Modal::Edit(id) | Modal::ConfirmDelete(id) => Some(id),
            Modal::Closed | Modal::Create => None,
        }
    }

    pub fn edit_target(&self) -> Option<&TaskId> {
        match &self.modal {
            Modal::Edit(id) => Some(id),
            _ => None,
        }
    }

    pub fn delete_target(&self) -> Option<&TaskId> {
        match &self.modal {
            Modal::ConfirmDelete(id) => Some(id),
            _ => None,
        }
    }

    /// Opening the row that is already open closes it; opening another row
    /// closes the previous one.
    pub fn toggle_dropdown(&mut self, id: TaskId) {
        if self.dropdown.as_ref() == Some(&id) {
            self.dropdown = None;
        } else {
            self.dropdown = Some(id);
        }
    }

    pub fn close_dropdown(&mut self) {
        self.dropdown = None;
    }

    pub fn open_create(&mut self) {
        self.modal = Modal::Create;
    }

    pub fn open_edit(&mut self, id: TaskId) {
        self.modal = Modal::Edit(id);
        self.dropdown = None;
    }

    pub fn open_delete(&mut self, id: TaskId) {
        self.modal = Modal::ConfirmDelete(id);
        self.dropdown = None;
    }

    pub fn close_modal(&mut self) {
        self.modal = Modal::Closed;
    }
}
