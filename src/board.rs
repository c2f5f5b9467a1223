use crate::{reorder, sort};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ── Entity types ──────────────────────────────────────────────

/// Task ids are creation timestamps in milliseconds, bumped when two
/// tasks land in the same millisecond.
pub type TaskId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Sort rank, High first.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }
}

/// A committed task. Owned by exactly one column at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
}

/// The add-task form before commit: everything but the id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, due_date: NaiveDate) -> Self {
        TaskDraft {
            title: title.into(),
            due_date: Some(due_date),
            ..TaskDraft::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnColor {
    Red,
    Yellow,
    Green,
    Blue,
    Purple,
    Orange,
    Pink,
    Gray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Priority,
    DueDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Field and direction travel together: a column is either sorted by
/// something in some direction, or not sorted at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub field: SortField,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub title: String,
    pub color: ColumnColor,
    /// Display order, top to bottom.
    pub tasks: Vec<Task>,
    pub sort: Option<SortState>,
    /// Task order captured by the first sort since the last manual
    /// arrangement. Present exactly when `sort` is.
    pub original_order: Option<Vec<TaskId>>,
}

impl Column {
    pub fn new(id: impl Into<String>, title: impl Into<String>, color: ColumnColor) -> Self {
        Column {
            id: id.into(),
            title: title.into(),
            color,
            tasks: Vec::new(),
            sort: None,
            original_order: None,
        }
    }

    pub fn task(&self, task_id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn task_ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(|t| t.id).collect()
    }
}

// ── Errors ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("title is required")]
    TitleRequired,
    #[error("due date is required")]
    DueDateRequired,
    #[error("column not found: {id}")]
    ColumnNotFound { id: String },
    #[error("task not found: {id}")]
    TaskNotFound { id: TaskId },
    #[error("no task at index {index} in column {column} ({len} tasks)")]
    IndexOutOfRange {
        column: String,
        index: usize,
        len: usize,
    },
    #[error("no task ids left above {last}")]
    TaskIdsExhausted { last: TaskId },
    #[error("changes not saved: {0}")]
    Persistence(#[from] crate::persist::SaveFileError),
}

impl BoardError {
    /// Missing or invalid user input. Nothing was mutated.
    pub fn is_validation(&self) -> bool {
        matches!(self, BoardError::TitleRequired | BoardError::DueDateRequired)
    }

    /// The target column, task or index does not exist. Nothing was mutated.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BoardError::ColumnNotFound { .. }
                | BoardError::TaskNotFound { .. }
                | BoardError::IndexOutOfRange { .. }
        )
    }
}

// ── The Board ──────────────────────────────────────────────────

/// One user's columns, left to right.
///
/// Every mutation validates before it touches anything, so a failed
/// call leaves the board exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    columns: Vec<Column>,
    /// Highest task id seen or issued. New ids always exceed it.
    last_task_id: TaskId,
}

impl Board {
    /// Rebuild a board from stored columns.
    pub fn from_columns(columns: Vec<Column>) -> Self {
        let last_task_id = columns
            .iter()
            .flat_map(|c| c.tasks.iter().map(|t| t.id))
            .max()
            .unwrap_or(0);
        Board {
            columns,
            last_task_id,
        }
    }

    /// The board a user gets before they have saved anything.
    pub fn default_board() -> Self {
        Board::from_columns(vec![
            Column::new("todo", "To Do", ColumnColor::Red),
            Column::new("progress", "In Progress", ColumnColor::Yellow),
            Column::new("completed", "Completed", ColumnColor::Green),
            Column::new("delivered", "Delivered", ColumnColor::Blue),
        ])
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, column_id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == column_id)
    }

    /// The column currently owning `task_id`.
    pub fn column_of_task(&self, task_id: TaskId) -> Option<&Column> {
        self.columns.iter().find(|c| c.task(task_id).is_some())
    }

    pub fn total_task_count(&self) -> usize {
        self.columns.iter().map(|c| c.tasks.len()).sum()
    }

    fn column_index(&self, column_id: &str) -> Result<usize, BoardError> {
        self.columns
            .iter()
            .position(|c| c.id == column_id)
            .ok_or_else(|| BoardError::ColumnNotFound {
                id: column_id.to_string(),
            })
    }

    fn column_mut(&mut self, column_id: &str) -> Result<&mut Column, BoardError> {
        let idx = self.column_index(column_id)?;
        Ok(&mut self.columns[idx])
    }

    fn next_task_id(&mut self) -> Result<TaskId, BoardError> {
        let floor = self
            .last_task_id
            .checked_add(1)
            .ok_or(BoardError::TaskIdsExhausted { last: self.last_task_id })?;
        let id = Utc::now().timestamp_millis().max(floor);
        self.last_task_id = id;
        Ok(id)
    }

    // ── Tasks ──────────────────────────────────────────────────

    /// Commit a draft at the end of a column.
    pub fn create_task(&mut self, column_id: &str, draft: TaskDraft) -> Result<Task, BoardError> {
        if draft.title.trim().is_empty() {
            return Err(BoardError::TitleRequired);
        }
        let Some(due_date) = draft.due_date else {
            return Err(BoardError::DueDateRequired);
        };
        let idx = self.column_index(column_id)?;

        let task = Task {
            id: self.next_task_id()?,
            title: draft.title,
            description: draft.description,
            priority: draft.priority,
            due_date: Some(due_date),
        };
        self.columns[idx].tasks.push(task.clone());
        Ok(task)
    }

    /// Replace a task by id, wherever it lives. Its position is kept.
    pub fn update_task(&mut self, updated: Task) -> Result<Task, BoardError> {
        if updated.title.trim().is_empty() {
            return Err(BoardError::TitleRequired);
        }
        let slot = self
            .columns
            .iter_mut()
            .flat_map(|c| c.tasks.iter_mut())
            .find(|t| t.id == updated.id)
            .ok_or(BoardError::TaskNotFound { id: updated.id })?;

        *slot = updated.clone();
        Ok(updated)
    }

    /// Remove a task from a column. Returns false if it was not there.
    pub fn delete_task(&mut self, column_id: &str, task_id: TaskId) -> Result<bool, BoardError> {
        let column = self.column_mut(column_id)?;
        let before = column.tasks.len();
        column.tasks.retain(|t| t.id != task_id);
        Ok(column.tasks.len() != before)
    }

    /// Empty a column. Returns how many tasks were discarded.
    pub fn clear_column(&mut self, column_id: &str) -> Result<usize, BoardError> {
        let column = self.column_mut(column_id)?;
        Ok(std::mem::take(&mut column.tasks).len())
    }

    // ── Columns ────────────────────────────────────────────────

    /// Insert a new, empty column. `position` is clamped to the end.
    pub fn create_column(
        &mut self,
        title: &str,
        color: ColumnColor,
        position: usize,
    ) -> Result<Column, BoardError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(BoardError::TitleRequired);
        }

        let column = Column::new(format!("col-{}", Uuid::new_v4().simple()), title, color);
        let position = position.min(self.columns.len());
        self.columns.insert(position, column.clone());
        Ok(column)
    }

    /// Rename, recolor and reposition a column in one step. Tasks and
    /// sort state are untouched. Returns the column's new index.
    pub fn update_column(
        &mut self,
        column_id: &str,
        title: &str,
        color: ColumnColor,
        position: usize,
    ) -> Result<usize, BoardError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(BoardError::TitleRequired);
        }
        let idx = self.column_index(column_id)?;

        let mut column = self.columns.remove(idx);
        column.title = title.to_string();
        column.color = color;
        let position = position.min(self.columns.len());
        self.columns.insert(position, column);
        Ok(position)
    }

    /// Drop a column and every task in it. Unknown ids are a no-op.
    pub fn delete_column(&mut self, column_id: &str) -> Option<Column> {
        let idx = self.columns.iter().position(|c| c.id == column_id)?;
        Some(self.columns.remove(idx))
    }

    // ── Drag and drop ──────────────────────────────────────────

    /// Apply a drop: the task at `from_index` in `from_column` lands at
    /// `to_index` in `to_column` (the same column for a plain reorder).
    ///
    /// A manual drop replaces any active sort on the columns it touches.
    pub fn move_task(
        &mut self,
        from_column: &str,
        from_index: usize,
        to_column: &str,
        to_index: usize,
    ) -> Result<TaskId, BoardError> {
        let src = self.column_index(from_column)?;
        let dst = self.column_index(to_column)?;

        let landed = if src == dst {
            reorder::move_within(&mut self.columns[src].tasks, from_index, to_index)
        } else {
            let (source, target) = reorder::pair_mut(&mut self.columns, src, dst);
            reorder::transfer(&mut source.tasks, from_index, &mut target.tasks, to_index)
        }
        .map_err(|e| BoardError::IndexOutOfRange {
            column: from_column.to_string(),
            index: e.index,
            len: e.len,
        })?;
        let task_id = self.columns[dst].tasks[landed].id;

        sort::clear_sort(&mut self.columns[src]);
        sort::clear_sort(&mut self.columns[dst]);
        Ok(task_id)
    }

    // ── Sorting ────────────────────────────────────────────────

    pub fn sort_column(&mut self, column_id: &str, field: SortField) -> Result<SortState, BoardError> {
        let column = self.column_mut(column_id)?;
        Ok(sort::sort_column(column, field))
    }

    /// Back to the manual order. Returns false if the column was not sorted.
    pub fn reset_sort(&mut self, column_id: &str) -> Result<bool, BoardError> {
        let column = self.column_mut(column_id)?;
        Ok(sort::reset_sort(column))
    }
}

// ── Tests ──────────────────────────────────────────────────────
