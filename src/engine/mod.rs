//! Board Synchronization Engine
//!
//! Owns the board tree and applies every user action to it:
//! - local edits are synchronous and published to subscribers immediately
//! - renames and reorders are persisted through keyed debouncers
//! - removals are confirmed remotely before they are applied locally
//! - status toggles cascade to every sub-task of the affected boards
//!
//! Optimistic edits are never rolled back on remote failure; the failure is
//! logged (debounced writes) or returned to the caller (status, removal).

mod cascade;


use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::{EngineConfig, RenameKeying, StatusWriteOrder};
use crate::error::{SyncError, SyncResult};
use crate::models::{Board, BoardId};
use crate::scheduler::Debouncer;
use crate::service::BoardService;
use crate::status;
use crate::tree::BoardTree;

use cascade::{cascade_all, cascade_board};

/// Progress of the initial (or latest) full load
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }
}

pub struct BoardEngine {
    service: Arc<dyn BoardService>,
    config: EngineConfig,
    tree: watch::Sender<Arc<BoardTree>>,
    load_state: watch::Sender<LoadState>,
    reorder: Debouncer<(), Vec<Board>>,
    /// Keyed by board id, or by `None` when renames share one window
    rename: Debouncer<Option<BoardId>, Board>,
    /// Board targeted by the latest rename in the shared window
    shared_rename: Mutex<Option<BoardId>>,
}

impl BoardEngine {
    pub fn new(service: Arc<dyn BoardService>, config: EngineConfig) -> Self {
        let (tree, _) = watch::channel(Arc::new(BoardTree::default()));
        let (load_state, _) = watch::channel(LoadState::Idle);

        let reorder_service = Arc::clone(&service);
        let reorder = Debouncer::new(
            "reorder",
            config.reorder_window(),
            move |_: (), boards: Vec<Board>| {
                let service = Arc::clone(&reorder_service);
                async move {
                    debug!(boards = boards.len(), "saving board order");
                    service.save_boards_order(&boards).await
                }
            },
        );

        let rename_service = Arc::clone(&service);
        let rename = Debouncer::new(
            "rename",
            config.rename_window(),
            move |_: Option<BoardId>, board: Board| {
                let service = Arc::clone(&rename_service);
                async move {
                    debug!(board_id = board.id, "saving board name");
                    service.update_board(&board).await
                }
            },
        );

        Self {
            service,
            config,
            tree,
            load_state,
            reorder,
            rename,
            shared_rename: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================
    // Observation
    // ========================

    /// Current tree. Unchanged boards are the same `Arc` across snapshots.
    pub fn snapshot(&self) -> Arc<BoardTree> {
        Arc::clone(&*self.tree.borrow())
    }

    /// Receiver notified after every published edit
    pub fn subscribe(&self) -> watch::Receiver<Arc<BoardTree>> {
        self.tree.subscribe()
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state.borrow().clone()
    }

    pub fn subscribe_load_state(&self) -> watch::Receiver<LoadState> {
        self.load_state.subscribe()
    }

    /// Aggregate checkbox: every sub-task of every board done
    pub fn all_done(&self) -> bool {
        status::compute_all_done(&self.snapshot())
    }

    /// Per-board checkbox, `None` for an unknown board
    pub fn board_status(&self, board_id: BoardId) -> Option<bool> {
        self.snapshot().board(board_id).map(|board| status::board_all_done(board))
    }

    /// Debounced writes still waiting for their window
    pub fn pending_writes(&self) -> usize {
        self.reorder.pending_len() + self.rename.pending_len()
    }

    // ========================
    // Load
    // ========================

    /// Replace the tree with the remote state. On failure the tree is emptied
    /// and the load state records the error.
    pub async fn load(&self) -> SyncResult<()> {
        self.load_state.send_replace(LoadState::Loading);

        let loaded = match self.service.get_boards().await {
            Ok(boards) => BoardTree::from_remote(boards),
            Err(err) => Err(err),
        };

        match loaded {
            Ok(tree) => {
                info!(boards = tree.len(), "loaded boards");
                self.tree.send_replace(Arc::new(tree));
                self.load_state.send_replace(LoadState::Loaded);
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "failed to load boards");
                self.tree.send_replace(Arc::new(BoardTree::default()));
                self.load_state.send_replace(LoadState::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    // ========================
    // Mutations
    // ========================

    /// Apply a drag-and-drop result: `ordered` is the new board sequence.
    /// Persisted after the reorder window.
    pub fn reorder_boards(&self, ordered: &[BoardId]) -> SyncResult<()> {
        let tree = self.commit(|tree| tree.reordered(ordered))?;
        self.reorder.schedule((), tree.to_boards());
        Ok(())
    }

    /// Rename locally now, persist after the rename window
    pub fn set_board_name(&self, board_id: BoardId, name: &str) -> SyncResult<()> {
        let tree = self.commit(|tree| {
            tree.with_board_replaced(board_id, |board| board.renamed(name))
                .ok_or(SyncError::BoardNotFound(board_id))
        })?;
        if let Some(board) = tree.board(board_id) {
            if self.config.rename_keying == RenameKeying::Shared {
                *self.shared_rename.lock() = Some(board_id);
            }
            self.rename.schedule(self.rename_key(board_id), Board::clone(board));
        }
        Ok(())
    }

    /// Delete remotely, then drop the board locally and close the rank gap.
    /// A failed delete leaves the tree untouched.
    pub async fn remove_board(&self, board_id: BoardId) -> SyncResult<()> {
        if let Err(err) = self.service.delete_board(board_id).await {
            warn!(board_id, error = %err, "board removal failed");
            return Err(err);
        }

        self.cancel_rename_of(board_id);

        let mut renumbered = false;
        self.publish(|tree| {
            let next = tree.without_board(board_id)?;
            renumbered = next.boards().iter().any(|board| {
                tree.board(board.id)
                    .is_some_and(|previous| !Arc::ptr_eq(previous, board))
            });
            Some(next)
        });

        // a pending order save must not resurrect the deleted board
        if renumbered || self.reorder.is_pending(&()) {
            self.reorder.schedule((), self.snapshot().to_boards());
        }
        info!(board_id, "board removed");
        Ok(())
    }

    /// Set every sub-task of one board to `is_done`, locally and remotely
    pub async fn set_board_status(&self, board_id: BoardId, is_done: bool) -> SyncResult<()> {
        if !self.snapshot().contains(board_id) {
            return Err(SyncError::BoardNotFound(board_id));
        }

        match self.config.status_write_order {
            StatusWriteOrder::Optimistic => {
                self.apply_board_status(board_id, is_done);
                self.service
                    .update_board_status(board_id, is_done)
                    .await
                    .inspect_err(|err| warn!(board_id, error = %err, "board status write failed"))
            }
            StatusWriteOrder::Confirmed => {
                self.service
                    .update_board_status(board_id, is_done)
                    .await
                    .inspect_err(|err| warn!(board_id, error = %err, "board status write failed"))?;
                self.apply_board_status(board_id, is_done);
                Ok(())
            }
        }
    }

    /// Toggle every board. Remote writes run concurrently and all of them are
    /// awaited; one failing board does not stop the others.
    pub async fn set_all_boards_status(&self, is_done: bool) -> SyncResult<()> {
        let board_ids = self.snapshot().board_ids();
        if board_ids.is_empty() {
            return Ok(());
        }

        let confirmed = self.config.status_write_order == StatusWriteOrder::Confirmed;
        if !confirmed {
            self.publish(|tree| Some(cascade_all(tree, is_done)));
        }

        let writes = board_ids.iter().map(|&board_id| async move {
            let result = self.service.update_board_status(board_id, is_done).await;
            if result.is_ok() && confirmed {
                self.apply_board_status(board_id, is_done);
            }
            (board_id, result)
        });

        let failures: Vec<(BoardId, SyncError)> = join_all(writes)
            .await
            .into_iter()
            .filter_map(|(board_id, result)| result.err().map(|err| (board_id, err)))
            .collect();

        if failures.is_empty() {
            return Ok(());
        }
        warn!(failed = failures.len(), total = board_ids.len(), "bulk status write partially failed");
        if failures.iter().any(|(_, err)| err.is_auth_expired()) {
            return Err(SyncError::AuthExpired);
        }
        Err(SyncError::StatusFanOut {
            failed: failures
                .into_iter()
                .map(|(board_id, err)| (board_id, err.to_string()))
                .collect(),
        })
    }

    /// Ask the service to generate the board's spreadsheet export
    pub async fn export_board(&self, board_id: BoardId, file_name: &str) -> SyncResult<()> {
        if !self.snapshot().contains(board_id) {
            return Err(SyncError::BoardNotFound(board_id));
        }
        self.service.download_export(board_id, file_name).await
    }

    /// Drop pending debounced writes. They are not guaranteed to be persisted.
    pub fn shutdown(&self) {
        self.reorder.cancel_all();
        self.rename.cancel_all();
    }

    // ========================
    // Internals
    // ========================

    fn rename_key(&self, board_id: BoardId) -> Option<BoardId> {
        match self.config.rename_keying {
            RenameKeying::PerBoard => Some(board_id),
            RenameKeying::Shared => None,
        }
    }

    fn cancel_rename_of(&self, board_id: BoardId) {
        match self.config.rename_keying {
            RenameKeying::PerBoard => {
                self.rename.cancel(&Some(board_id));
            }
            RenameKeying::Shared => {
                let mut target = self.shared_rename.lock();
                if *target == Some(board_id) {
                    self.rename.cancel(&None);
                    *target = None;
                }
            }
        }
    }

    fn apply_board_status(&self, board_id: BoardId, is_done: bool) -> bool {
        self.publish(|tree| cascade_board(tree, board_id, is_done))
            .is_some()
    }

    /// Atomically replace the tree with `edit(current)`; nothing is published on error.
    fn commit(
        &self,
        edit: impl FnOnce(&BoardTree) -> SyncResult<BoardTree>,
    ) -> SyncResult<Arc<BoardTree>> {
        let mut outcome = None;
        self.tree.send_if_modified(|tree| {
            let result = edit(tree).map(Arc::new);
            let changed = match &result {
                Ok(next) => {
                    *tree = Arc::clone(next);
                    true
                }
                Err(_) => false,
            };
            outcome = Some(result);
            changed
        });
        outcome.unwrap_or_else(|| Ok(self.snapshot()))
    }

    /// Atomically replace the tree if `edit(current)` yields one
    fn publish(&self, edit: impl FnOnce(&BoardTree) -> Option<BoardTree>) -> Option<Arc<BoardTree>> {
        let mut published = None;
        self.tree.send_if_modified(|tree| match edit(tree) {
            Some(next) => {
                let next = Arc::new(next);
                *tree = Arc::clone(&next);
                published = Some(next);
                true
            }
            None => false,
        });
        published
    }
}
