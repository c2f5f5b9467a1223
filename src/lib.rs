//! Kanban board engine: named, colored columns of prioritised, dated tasks,
//! with drag-and-drop reordering, per-column sort with restore, and one saved
//! board per signed-in user.

//---------------------------------------
pub mod board;
pub mod reorder;
pub mod sort;

pub use board::{
    Board, BoardError, Column, ColumnColor, Priority, SortDirection, SortField, SortState, Task,
    TaskDraft, TaskId,
};
//---------------------------------------

//---------------------------------------
pub mod auth;
pub mod persist;
pub mod session;

pub use auth::{Accounts, AuthError, Identity, SignUp, User, UserId};
pub use persist::{BoardStore, MemoryStore, SaveFile, SaveFileError};
pub use session::BoardSession;
//---------------------------------------

//---------------------------------------
pub mod settings;

pub use settings::{init_tracing, Settings, SettingsError};
//---------------------------------------
