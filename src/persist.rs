//! Board ↔ redb persistence.
//!
//! redb is a save file: each user's board is loaded when a session opens
//! and written back whole after every mutation. The in-memory Board is the
//! runtime truth; nothing queries the file in between.
//!
//! Boards are stored as the postcard-encoded column sequence. Due dates go
//! through chrono's serde impl, which writes them as ISO-8601 text.

use crate::auth::{User, UserId};
use crate::board::{Board, Column};
use redb::{Database, ReadableTable, TableDefinition};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
#[cfg(feature = "profile")]
use std::time::Instant;

const BOARDS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("boards");
const USERS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("users");
const META: TableDefinition<&str, &[u8]> = TableDefinition::new("meta");

const CURRENT_USER_KEY: &str = "current_user";

/// Where boards live, one per user.
pub trait BoardStore {
    /// The user's saved board, or None if they never saved one.
    fn load(&self, user_id: UserId) -> Result<Option<Board>, SaveFileError>;
    fn save(&self, user_id: UserId, board: &Board) -> Result<(), SaveFileError>;
    fn clear(&self, user_id: UserId) -> Result<(), SaveFileError>;
}

impl<T: BoardStore + ?Sized> BoardStore for &T {
    fn load(&self, user_id: UserId) -> Result<Option<Board>, SaveFileError> {
        (**self).load(user_id)
    }

    fn save(&self, user_id: UserId, board: &Board) -> Result<(), SaveFileError> {
        (**self).save(user_id, board)
    }

    fn clear(&self, user_id: UserId) -> Result<(), SaveFileError> {
        (**self).clear(user_id)
    }
}

fn encode_board(board: &Board) -> Result<Vec<u8>, SaveFileError> {
    postcard::to_allocvec(board.columns()).map_err(|e| SaveFileError::Encode(e.to_string()))
}

fn decode_board(bytes: &[u8]) -> Result<Board, SaveFileError> {
    let columns: Vec<Column> =
        postcard::from_bytes(bytes).map_err(|e| SaveFileError::Decode(e.to_string()))?;
    Ok(Board::from_columns(columns))
}

// ── SaveFile ───────────────────────────────────────────────────

/// Thin handle to the redb file. Cloneable (Arc inside).
#[derive(Clone)]
pub struct SaveFile {
    db: Arc<Database>,
}

impl SaveFile {
    /// Open (or create) the save file at the given path.
    /// Creates tables if they don't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SaveFileError> {
        let db = Database::create(path.as_ref())?;

        let txn = db.begin_write()?;
        {
            let _ = txn.open_table(BOARDS)?;
            let _ = txn.open_table(USERS)?;
            let _ = txn.open_table(META)?;
        }
        txn.commit()?;

        Ok(SaveFile { db: Arc::new(db) })
    }

    // ── Users ──────────────────────────────────────────────────

    /// Insert or replace a user record.
    pub fn save_user(&self, user: &User) -> Result<(), SaveFileError> {
        let bytes = postcard::to_allocvec(user).map_err(|e| SaveFileError::Encode(e.to_string()))?;
        let txn = self.db.begin_write()?;
        {
            let mut users = txn.open_table(USERS)?;
            users.insert(user.id.as_bytes().as_slice(), bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Every registered user (linear scan, a handful of accounts per file).
    pub fn list_users(&self) -> Result<Vec<User>, SaveFileError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(USERS)?;
        let mut users = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let user: User = postcard::from_bytes(value.value())
                .map_err(|e| SaveFileError::Decode(e.to_string()))?;
            users.push(user);
        }
        Ok(users)
    }

    pub fn get_user(&self, user_id: UserId) -> Result<Option<User>, SaveFileError> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(USERS)?;
        match table.get(user_id.as_bytes().as_slice())? {
            Some(value) => {
                let user = postcard::from_bytes(value.value())
                    .map_err(|e| SaveFileError::Decode(e.to_string()))?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// The last authenticated user, if nobody signed out since.
    pub fn current_user_id(&self) -> Result<Option<UserId>, SaveFileError> {
        let txn = self.db.begin_read()?;
        let meta = txn.open_table(META)?;
        match meta.get(CURRENT_USER_KEY)? {
            Some(value) => {
                let id = UserId::from_slice(value.value())
                    .map_err(|e| SaveFileError::Decode(e.to_string()))?;
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }

    pub fn set_current_user(&self, user_id: Option<UserId>) -> Result<(), SaveFileError> {
        let txn = self.db.begin_write()?;
        {
            let mut meta = txn.open_table(META)?;
            match user_id {
                Some(id) => {
                    meta.insert(CURRENT_USER_KEY, id.as_bytes().as_slice())?;
                }
                None => {
                    meta.remove(CURRENT_USER_KEY)?;
                }
            }
        }
        txn.commit()?;
        Ok(())
    }
}

impl BoardStore for SaveFile {
    fn load(&self, user_id: UserId) -> Result<Option<Board>, SaveFileError> {
        let txn = self.db.begin_read()?;
        let boards = txn.open_table(BOARDS)?;
        match boards.get(user_id.as_bytes().as_slice())? {
            Some(value) => decode_board(value.value()).map(Some),
            None => Ok(None),
        }
    }

    /// Replace the user's board in one transaction.
    fn save(&self, user_id: UserId, board: &Board) -> Result<(), SaveFileError> {
        #[cfg(feature = "profile")]
        let total_start = Instant::now();
        let bytes = encode_board(board)?;

        let txn = self.db.begin_write()?;
        {
            let mut boards = txn.open_table(BOARDS)?;
            boards.insert(user_id.as_bytes().as_slice(), bytes.as_slice())?;
        }
        #[cfg(feature = "profile")]
        let commit_start = Instant::now();
        txn.commit()?;
        #[cfg(feature = "profile")]
        tracing::debug!(
            bytes = bytes.len(),
            commit_us = commit_start.elapsed().as_micros() as u64,
            total_us = total_start.elapsed().as_micros() as u64,
            "board saved"
        );
        Ok(())
    }

    fn clear(&self, user_id: UserId) -> Result<(), SaveFileError> {
        let txn = self.db.begin_write()?;
        {
            let mut boards = txn.open_table(BOARDS)?;
            boards.remove(user_id.as_bytes().as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }
}

// ── MemoryStore ────────────────────────────────────────────────

/// Boards kept in process memory, encoded exactly as the save file
/// encodes them. Gone when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    boards: RefCell<HashMap<UserId, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl BoardStore for MemoryStore {
    fn load(&self, user_id: UserId) -> Result<Option<Board>, SaveFileError> {
        self.boards
            .borrow()
            .get(&user_id)
            .map(Vec::as_slice)
            .map(decode_board)
            .transpose()
    }

    fn save(&self, user_id: UserId, board: &Board) -> Result<(), SaveFileError> {
        let bytes = encode_board(board)?;
        self.boards.borrow_mut().insert(user_id, bytes);
        Ok(())
    }

    fn clear(&self, user_id: UserId) -> Result<(), SaveFileError> {
        self.boards.borrow_mut().remove(&user_id);
        Ok(())
    }
}

// ── Errors ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveFileError {
    #[error("redb: {0}")]
    Redb(String),
    #[error("decode: {0}")]
    Decode(String),
    #[error("encode: {0}")]
    Encode(String),
}

// redb 2.x has many error types. Blanket them all into SaveFileError::Redb.
macro_rules! from_redb {
    ($($t:ty),*) => {
        $(impl From<$t> for SaveFileError {
            fn from(e: $t) -> Self { SaveFileError::Redb(e.to_string()) }
        })*
    };
}

from_redb!(
    redb::Error,
    redb::DatabaseError,
    redb::TableError,
    redb::TransactionError,
    redb::StorageError,
    redb::CommitError
);

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Priority, SortField, TaskDraft};
    use chrono::NaiveDate;
    use std::fs;
    use std::path::PathBuf;
    use uuid::Uuid;

    /// Create a temp save file; the caller cleans it up.
    fn temp_save(name: &str) -> (SaveFile, PathBuf) {
        let path = std::env::temp_dir().join(format!("kanban_test_{name}_{}.redb", std::process::id()));
        let _ = fs::remove_file(&path); // clean up any leftover
        let sf = SaveFile::open(&path).unwrap();
        (sf, path)
    }

    fn cleanup(path: &Path) {
        let _ = fs::remove_file(path);
    }

    fn sample_board() -> Board {
        let mut board = Board::default_board();
        let due = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        board
            .create_task(
                "todo",
                TaskDraft::new("Write report", due)
                    .with_description("quarterly numbers")
                    .with_priority(Priority::High),
            )
            .unwrap();
        board
            .create_task("todo", TaskDraft::new("Call back", due.succ_opt().unwrap()))
            .unwrap();
        board.sort_column("todo", SortField::DueDate).unwrap();
        board
    }

    #[test]
    fn missing_board_loads_as_none() {
        let (sf, path) = temp_save("missing");
        assert_eq!(sf.load(Uuid::new_v4()).unwrap(), None);
        cleanup(&path);
    }

    #[test]
    fn save_and_reload_board() {
        let (sf, path) = temp_save("board");
        let user = Uuid::new_v4();
        let board = sample_board();

        sf.save(user, &board).unwrap();
        drop(sf);

        // Reopen: the board should come back identical, dates included.
        let sf = SaveFile::open(&path).unwrap();
        let loaded = sf.load(user).unwrap().unwrap();
        assert_eq!(loaded.columns(), board.columns());

        cleanup(&path);
    }

    #[test]
    fn boards_are_per_user() {
        let (sf, path) = temp_save("per_user");
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        sf.save(alice, &sample_board()).unwrap();
        sf.save(bob, &Board::default_board()).unwrap();
        sf.clear(alice).unwrap();

        assert_eq!(sf.load(alice).unwrap(), None);
        assert_eq!(sf.load(bob).unwrap().unwrap().total_task_count(), 0);

        cleanup(&path);
    }

    #[test]
    fn current_user_round_trip() {
        let (sf, path) = temp_save("current");
        assert_eq!(sf.current_user_id().unwrap(), None);

        let id = Uuid::new_v4();
        sf.set_current_user(Some(id)).unwrap();
        assert_eq!(sf.current_user_id().unwrap(), Some(id));

        sf.set_current_user(None).unwrap();
        assert_eq!(sf.current_user_id().unwrap(), None);
        // Clearing twice is fine.
        sf.set_current_user(None).unwrap();

        cleanup(&path);
    }

    #[test]
    fn users_round_trip() {
        let (sf, path) = temp_save("users");
        let user = User {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            office_id: "OF-1".into(),
            password_hash: "not-a-real-hash".into(),
        };
        sf.save_user(&user).unwrap();

        assert_eq!(sf.list_users().unwrap(), vec![user.clone()]);
        assert_eq!(sf.get_user(user.id).unwrap(), Some(user));
        assert_eq!(sf.get_user(Uuid::new_v4()).unwrap(), None);

        cleanup(&path);
    }

    #[test]
    fn memory_store_matches_save_file_encoding() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let board = sample_board();

        store.save(user, &board).unwrap();
        assert_eq!(store.load(user).unwrap().unwrap().columns(), board.columns());

        store.clear(user).unwrap();
        assert_eq!(store.load(user).unwrap(), None);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = decode_board(&[0xFF, 0xFF, 0xFF]).unwrap_err();
        assert!(matches!(err, SaveFileError::Decode(_)));
    }
}
