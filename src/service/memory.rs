//! In-Memory Board Service
//!
//! A `BoardService` backed by a `Vec<Board>`, recording every call it
//! receives. Failures can be injected per operation or per board, and an
//! artificial latency can be added to every call.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::BoardService;
use crate::error::{SyncError, SyncResult};
use crate::models::{Board, BoardId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetBoards,
    SaveBoardsOrder,
    UpdateBoard,
    UpdateBoardStatus,
    DeleteBoard,
    DownloadExport,
}

/// A call as received by the service, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    GetBoards,
    SaveBoardsOrder(Vec<(BoardId, u32)>),
    UpdateBoard { id: BoardId, name: String },
    UpdateBoardStatus { id: BoardId, is_done: bool },
    DeleteBoard(BoardId),
    DownloadExport { id: BoardId, file_name: String },
}

impl RemoteCall {
    pub fn operation(&self) -> Operation {
        match self {
            RemoteCall::GetBoards => Operation::GetBoards,
            RemoteCall::SaveBoardsOrder(_) => Operation::SaveBoardsOrder,
            RemoteCall::UpdateBoard { .. } => Operation::UpdateBoard,
            RemoteCall::UpdateBoardStatus { .. } => Operation::UpdateBoardStatus,
            RemoteCall::DeleteBoard(_) => Operation::DeleteBoard,
            RemoteCall::DownloadExport { .. } => Operation::DownloadExport,
        }
    }
}

/// Kind of error an injected failure produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    Remote,
    AuthExpired,
}

impl InjectedFailure {
    fn to_error(self, operation: Operation) -> SyncError {
        match self {
            InjectedFailure::Remote => {
                SyncError::Remote(format!("injected failure for {:?}", operation))
            }
            InjectedFailure::AuthExpired => SyncError::AuthExpired,
        }
    }
}

#[derive(Debug, Default)]
struct FailureRules {
    operations: HashMap<Operation, InjectedFailure>,
    boards: HashMap<(Operation, BoardId), InjectedFailure>,
}

impl FailureRules {
    fn lookup(&self, operation: Operation, board_id: Option<BoardId>) -> Option<InjectedFailure> {
        board_id
            .and_then(|id| self.boards.get(&(operation, id)).copied())
            .or_else(|| self.operations.get(&operation).copied())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBoardService {
    boards: Mutex<Vec<Board>>,
    calls: Mutex<Vec<RemoteCall>>,
    failures: Mutex<FailureRules>,
    latency: Mutex<Duration>,
}

impl InMemoryBoardService {
    pub fn new(boards: Vec<Board>) -> Self {
        Self {
            boards: Mutex::new(boards),
            ..Default::default()
        }
    }

    pub fn shared(boards: Vec<Board>) -> Arc<Self> {
        Arc::new(Self::new(boards))
    }

    /// Delay every call by `latency` before it resolves
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    pub fn fail_operation(&self, operation: Operation) {
        self.fail_operation_with(operation, InjectedFailure::Remote);
    }

    pub fn fail_operation_with(&self, operation: Operation, failure: InjectedFailure) {
        self.failures.lock().operations.insert(operation, failure);
    }

    /// Fail `operation` only when it targets `board_id`
    pub fn fail_board(&self, operation: Operation, board_id: BoardId) {
        self.failures
            .lock()
            .boards
            .insert((operation, board_id), InjectedFailure::Remote);
    }

    pub fn clear_failures(&self) {
        *self.failures.lock() = FailureRules::default();
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().clone()
    }

    pub fn calls_of(&self, operation: Operation) -> Vec<RemoteCall> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.operation() == operation)
            .cloned()
            .collect()
    }

    /// Current server-side state
    pub fn stored_boards(&self) -> Vec<Board> {
        self.boards.lock().clone()
    }

    /// Record the call, wait out the latency, then apply failure rules
    async fn receive(&self, call: RemoteCall, board_id: Option<BoardId>) -> SyncResult<()> {
        let operation = call.operation();
        self.calls.lock().push(call);

        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        match self.failures.lock().lookup(operation, board_id) {
            Some(failure) => Err(failure.to_error(operation)),
            None => Ok(()),
        }
    }

    fn edit_board(&self, board_id: BoardId, edit: impl FnOnce(&mut Board)) -> SyncResult<()> {
        let mut boards = self.boards.lock();
        let board = boards
            .iter_mut()
            .find(|board| board.id == board_id)
            .ok_or_else(|| SyncError::Remote(format!("404 board {} not found", board_id)))?;
        edit(board);
        Ok(())
    }
}

#[async_trait]
impl BoardService for InMemoryBoardService {
    async fn get_boards(&self) -> SyncResult<Vec<Board>> {
        self.receive(RemoteCall::GetBoards, None).await?;
        Ok(self.boards.lock().clone())
    }

    async fn save_boards_order(&self, boards: &[Board]) -> SyncResult<()> {
        let orders: Vec<(BoardId, u32)> = boards.iter().map(|b| (b.id, b.order)).collect();
        self.receive(RemoteCall::SaveBoardsOrder(orders.clone()), None).await?;

        let mut stored = self.boards.lock();
        for (id, order) in orders {
            if let Some(board) = stored.iter_mut().find(|board| board.id == id) {
                board.order = order;
            }
        }
        stored.sort_by_key(|board| board.order);
        Ok(())
    }

    async fn update_board(&self, board: &Board) -> SyncResult<()> {
        let call = RemoteCall::UpdateBoard {
            id: board.id,
            name: board.name.clone(),
        };
        self.receive(call, Some(board.id)).await?;
        self.edit_board(board.id, |stored| stored.name = board.name.clone())
    }

    async fn update_board_status(&self, board_id: BoardId, is_done: bool) -> SyncResult<()> {
        let call = RemoteCall::UpdateBoardStatus { id: board_id, is_done };
        self.receive(call, Some(board_id)).await?;
        self.edit_board(board_id, |stored| {
            for todo in &mut stored.todos {
                for sub_task in &mut Arc::make_mut(todo).sub_tasks {
                    sub_task.is_done = is_done;
                }
            }
        })
    }

    async fn delete_board(&self, board_id: BoardId) -> SyncResult<()> {
        self.receive(RemoteCall::DeleteBoard(board_id), Some(board_id)).await?;
        let mut boards = self.boards.lock();
        let before = boards.len();
        boards.retain(|board| board.id != board_id);
        if boards.len() == before {
            return Err(SyncError::Remote(format!("404 board {} not found", board_id)));
        }
        Ok(())
    }

    async fn download_export(&self, board_id: BoardId, file_name: &str) -> SyncResult<()> {
        let call = RemoteCall::DownloadExport {
            id: board_id,
            file_name: file_name.to_string(),
        };
        self.receive(call, Some(board_id)).await
    }
}
