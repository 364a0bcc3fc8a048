//! Persistence Collaborator
//!
//! Abstract contract for the remote board service. The engine only talks to
//! this trait; transports (HTTP, in-memory) implement it.

mod memory;

use async_trait::async_trait;

use crate::error::SyncResult;
use crate::models::{Board, BoardId};

pub use memory::{InMemoryBoardService, InjectedFailure, Operation, RemoteCall};

/// Remote board persistence.
///
/// Every call either applies exactly the submitted payload or fails with
/// `SyncError::Remote` / `SyncError::AuthExpired`.
#[async_trait]
pub trait BoardService: Send + Sync {
    /// Load the full board tree for the current user
    async fn get_boards(&self) -> SyncResult<Vec<Board>>;

    /// Persist the `order` of every board in `boards`
    async fn save_boards_order(&self, boards: &[Board]) -> SyncResult<()>;

    /// Persist a board's own fields (name)
    async fn update_board(&self, board: &Board) -> SyncResult<()>;

    /// Set every sub-task of the board to `is_done`
    async fn update_board_status(&self, board_id: BoardId, is_done: bool) -> SyncResult<()>;

    async fn delete_board(&self, board_id: BoardId) -> SyncResult<()>;

    /// Generate and store the spreadsheet export of a board
    async fn download_export(&self, board_id: BoardId, file_name: &str) -> SyncResult<()>;
}
