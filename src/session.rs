//! One signed-in user's board for the lifetime of a session.
//!
//! A session is opened after authentication, loads the user's board once,
//! and writes the whole board back after every mutation. Each operation
//! either commits in memory and on disk, or leaves both untouched.
//!
//! With nobody signed in the board still works, but nothing is saved.

use crate::auth::{Identity, UserId};
use crate::board::{
    Board, BoardError, Column, ColumnColor, SortField, SortState, Task, TaskDraft, TaskId,
};
use crate::persist::{BoardStore, SaveFileError};
use tracing::{debug, info, warn};

pub struct BoardSession<S, I> {
    board: Board,
    store: S,
    identity: I,
    /// The user whose board was loaded. Saves only ever go to this key.
    user_id: Option<UserId>,
}

impl<S: BoardStore, I: Identity> BoardSession<S, I> {
    /// Resolve the current user and load their board, or the default board
    /// if they have none (or nobody is signed in).
    pub fn open(store: S, identity: I) -> Result<Self, BoardError> {
        let user_id = identity.current_user_id()?;
        let board = load_or_default(&store, user_id)?;
        info!(
            user_id = ?user_id,
            columns = board.columns().len(),
            tasks = board.total_task_count(),
            "board session opened"
        );
        Ok(BoardSession {
            board,
            store,
            identity,
            user_id,
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    /// Throw away the in-memory board and load the stored one again.
    pub fn reload(&mut self) -> Result<(), BoardError> {
        self.board = load_or_default(&self.store, self.user_id)?;
        Ok(())
    }

    /// Delete the stored board and start over from the default board.
    pub fn clear_board(&mut self) -> Result<(), BoardError> {
        if let Some(user_id) = self.saving_as()? {
            self.store.clear(user_id)?;
        }
        self.board = Board::default_board();
        info!(user_id = ?self.user_id, "board cleared");
        Ok(())
    }

    // ── Tasks ──────────────────────────────────────────────────

    pub fn create_task(&mut self, column_id: &str, draft: TaskDraft) -> Result<Task, BoardError> {
        self.mutate("create task", |board| board.create_task(column_id, draft))
    }

    pub fn update_task(&mut self, task: Task) -> Result<Task, BoardError> {
        self.mutate("update task", |board| board.update_task(task))
    }

    /// Returns false if the column did not hold the task.
    pub fn delete_task(&mut self, column_id: &str, task_id: TaskId) -> Result<bool, BoardError> {
        self.mutate("delete task", |board| board.delete_task(column_id, task_id))
    }

    pub fn clear_column(&mut self, column_id: &str) -> Result<usize, BoardError> {
        self.mutate("clear column", |board| board.clear_column(column_id))
    }

    // ── Columns ────────────────────────────────────────────────

    pub fn create_column(
        &mut self,
        title: &str,
        color: ColumnColor,
        position: usize,
    ) -> Result<Column, BoardError> {
        self.mutate("create column", |board| board.create_column(title, color, position))
    }

    pub fn update_column(
        &mut self,
        column_id: &str,
        title: &str,
        color: ColumnColor,
        position: usize,
    ) -> Result<usize, BoardError> {
        self.mutate("update column", |board| {
            board.update_column(column_id, title, color, position)
        })
    }

    /// Returns the removed column, tasks and all, or None if it did not exist.
    pub fn delete_column(&mut self, column_id: &str) -> Result<Option<Column>, BoardError> {
        self.mutate("delete column", |board| Ok(board.delete_column(column_id)))
    }

    // ── Drag and drop, sorting ─────────────────────────────────

    pub fn move_task(
        &mut self,
        from_column: &str,
        from_index: usize,
        to_column: &str,
        to_index: usize,
    ) -> Result<TaskId, BoardError> {
        self.mutate("move task", |board| {
            board.move_task(from_column, from_index, to_column, to_index)
        })
    }

    pub fn sort_column(&mut self, column_id: &str, field: SortField) -> Result<SortState, BoardError> {
        self.mutate("sort column", |board| board.sort_column(column_id, field))
    }

    pub fn reset_sort(&mut self, column_id: &str) -> Result<bool, BoardError> {
        self.mutate("reset sort", |board| board.reset_sort(column_id))
    }

    // ── Internals ──────────────────────────────────────────────

    /// Run one board operation, then save. A failed save rolls the board
    /// back so memory never runs ahead of storage.
    fn mutate<T>(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&mut Board) -> Result<T, BoardError>,
    ) -> Result<T, BoardError> {
        let before = self.board.clone();
        let out = f(&mut self.board).inspect_err(|e| {
            warn!(op, error = %e, "board operation rejected");
        })?;

        if let Err(e) = self.save() {
            warn!(op, error = %e, "save failed, rolling back");
            self.board = before;
            return Err(e.into());
        }
        info!(op, user_id = ?self.user_id, "board updated");
        Ok(out)
    }

    fn save(&self) -> Result<(), SaveFileError> {
        match self.saving_as()? {
            Some(user_id) => self.store.save(user_id, &self.board),
            None => Ok(()),
        }
    }

    /// The key to write under, if writing is allowed right now: someone is
    /// signed in and it is the user this session loaded. Failing to read
    /// the current user is a storage error.
    fn saving_as(&self) -> Result<Option<UserId>, SaveFileError> {
        let current = self.identity.current_user_id()?;
        Ok(match (current, self.user_id) {
            (None, _) => {
                debug!("no current user, not saving");
                None
            }
            (Some(current), Some(owner)) if current == owner => Some(owner),
            (Some(current), owner) => {
                warn!(%current, owner = ?owner, "current user changed since the session opened, not saving");
                None
            }
        })
    }
}

fn load_or_default<S: BoardStore>(store: &S, user_id: Option<UserId>) -> Result<Board, BoardError> {
    let Some(user_id) = user_id else {
        debug!("no current user, using the default board");
        return Ok(Board::default_board());
    };
    match store.load(user_id)? {
        Some(board) => Ok(board),
        None => {
            debug!(%user_id, "no saved board, using the default board");
            Ok(Board::default_board())
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────
