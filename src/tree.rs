//! Board Tree
//!
//! Immutable Boards → Todos → SubTasks tree. Every edit returns a new tree
//! that shares all untouched boards and todos with the previous one, so
//! observers can compare snapshots with `Arc::ptr_eq`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{SyncError, SyncResult};
use crate::models::{Board, BoardId, SubTask, SubTaskId, TodoId};
use crate::status;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardTree {
    boards: Vec<Arc<Board>>,
}

/// Kind of a flattened display row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Board,
    Todo,
    SubTask,
}

/// One line of the board table, in display order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub kind: RowKind,
    pub id: u32,
    pub depth: usize,
    pub label: String,
    pub done: bool,
}

impl BoardTree {
    /// Wrap boards as given, without validation or sorting
    pub fn new(boards: Vec<Board>) -> Self {
        Self {
            boards: boards.into_iter().map(Arc::new).collect(),
        }
    }

    /// Build a tree from a remote load: validate back-references, then sort
    /// every level by `order`.
    pub fn from_remote(mut boards: Vec<Board>) -> SyncResult<Self> {
        boards.sort_by_key(|board| board.order);
        for board in &mut boards {
            board.todos.sort_by_key(|todo| todo.order);
            for todo in &mut board.todos {
                Arc::make_mut(todo).sub_tasks.sort_by_key(|sub_task| sub_task.order);
            }
        }
        let tree = Self::new(boards);
        tree.validate()?;
        Ok(tree)
    }

    /// Check id uniqueness and that every `board_id` / `todo_id` points at its owner
    pub fn validate(&self) -> SyncResult<()> {
        let mut board_ids = HashSet::new();
        let mut todo_ids = HashSet::new();
        let mut sub_task_ids = HashSet::new();

        for board in &self.boards {
            if !board_ids.insert(board.id) {
                return Err(SyncError::MalformedTree(format!("duplicate board id {}", board.id)));
            }
            for todo in &board.todos {
                if todo.board_id != board.id {
                    return Err(SyncError::MalformedTree(format!(
                        "todo {} references board {} but is owned by board {}",
                        todo.id, todo.board_id, board.id
                    )));
                }
                if !todo_ids.insert(todo.id) {
                    return Err(SyncError::MalformedTree(format!("duplicate todo id {}", todo.id)));
                }
                for sub_task in &todo.sub_tasks {
                    if sub_task.todo_id != todo.id {
                        return Err(SyncError::MalformedTree(format!(
                            "sub-task {} references todo {} but is owned by todo {}",
                            sub_task.id, sub_task.todo_id, todo.id
                        )));
                    }
                    if !sub_task_ids.insert(sub_task.id) {
                        return Err(SyncError::MalformedTree(format!(
                            "duplicate sub-task id {}",
                            sub_task.id
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    // ========================
    // Traversal
    // ========================

    pub fn boards(&self) -> &[Arc<Board>] {
        &self.boards
    }

    pub fn board(&self, id: BoardId) -> Option<&Arc<Board>> {
        self.boards.iter().find(|board| board.id == id)
    }

    pub fn contains(&self, id: BoardId) -> bool {
        self.board(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    pub fn board_ids(&self) -> Vec<BoardId> {
        self.boards.iter().map(|board| board.id).collect()
    }

    /// Owned copies of the boards in current order, for persistence payloads
    pub fn to_boards(&self) -> Vec<Board> {
        self.boards.iter().map(|board| Board::clone(board)).collect()
    }

    pub fn sub_tasks(&self) -> impl Iterator<Item = &SubTask> {
        self.boards.iter().flat_map(|board| board.sub_tasks())
    }

    // ========================
    // Structural copies
    // ========================

    /// Replace board `id` with `edit(board)`. `None` if the board is absent.
    pub fn with_board_replaced(
        &self,
        id: BoardId,
        edit: impl FnOnce(&Board) -> Board,
    ) -> Option<Self> {
        let index = self.boards.iter().position(|board| board.id == id)?;
        let mut boards = self.boards.clone();
        boards[index] = Arc::new(edit(&self.boards[index]));
        Some(Self { boards })
    }

    /// Replace sub-task `sub_task_id` of todo `todo_id`, wherever that todo lives
    pub fn with_sub_task_replaced(
        &self,
        todo_id: TodoId,
        sub_task_id: SubTaskId,
        edit: impl FnOnce(&SubTask) -> SubTask,
    ) -> Option<Self> {
        let board_id = self
            .boards
            .iter()
            .find(|board| board.todos.iter().any(|todo| todo.id == todo_id))?
            .id;
        let board = self.board(board_id)?;
        let todo_index = board.todos.iter().position(|todo| todo.id == todo_id)?;
        let sub_index = board.todos[todo_index]
            .sub_tasks
            .iter()
            .position(|sub_task| sub_task.id == sub_task_id)?;

        self.with_board_replaced(board_id, |board| {
            let mut board = board.clone();
            let todo = Arc::make_mut(&mut board.todos[todo_index]);
            todo.sub_tasks[sub_index] = edit(&todo.sub_tasks[sub_index]);
            board
        })
    }

    /// Drop board `id` and close the gap: survivors are renumbered to
    /// contiguous 1-based ranks, keeping their `Arc` when the rank holds.
    pub fn without_board(&self, id: BoardId) -> Option<Self> {
        let index = self.boards.iter().position(|board| board.id == id)?;
        let boards = self
            .boards
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, board)| board)
            .enumerate()
            .map(|(position, board)| ranked(board, position as u32 + 1))
            .collect();
        Some(Self { boards })
    }

    /// Rearrange boards to `ordered` (a permutation of the current ids) and
    /// renumber `order` as the 1-based position. Boards whose rank did not
    /// change keep their `Arc`.
    pub fn reordered(&self, ordered: &[BoardId]) -> SyncResult<Self> {
        if ordered.len() != self.boards.len() {
            return Err(SyncError::InvalidOrdering(format!(
                "expected {} boards, got {}",
                self.boards.len(),
                ordered.len()
            )));
        }

        let by_id: HashMap<BoardId, &Arc<Board>> =
            self.boards.iter().map(|board| (board.id, board)).collect();
        let mut seen = HashSet::with_capacity(ordered.len());
        let mut boards = Vec::with_capacity(ordered.len());

        for (index, id) in ordered.iter().enumerate() {
            if !seen.insert(*id) {
                return Err(SyncError::InvalidOrdering(format!("board {id} listed twice")));
            }
            let board: &Arc<Board> = by_id
                .get(id)
                .copied()
                .ok_or_else(|| SyncError::InvalidOrdering(format!("unknown board {id}")))?;
            boards.push(ranked(board, index as u32 + 1));
        }
        Ok(Self { boards })
    }

    /// Render the tree as indented rows: board, then its todos, then their sub-tasks
    pub fn flatten(&self) -> Vec<Row> {
        let mut rows = Vec::new();
        for board in &self.boards {
            rows.push(Row {
                kind: RowKind::Board,
                id: board.id,
                depth: 0,
                label: board.name.clone(),
                done: status::board_all_done(board),
            });
            for todo in &board.todos {
                rows.push(Row {
                    kind: RowKind::Todo,
                    id: todo.id,
                    depth: 1,
                    label: todo.title.clone(),
                    done: status::todo_all_done(todo),
                });
                for sub_task in &todo.sub_tasks {
                    rows.push(Row {
                        kind: RowKind::SubTask,
                        id: sub_task.id,
                        depth: 2,
                        label: sub_task.text.clone(),
                        done: sub_task.is_done,
                    });
                }
            }
        }
        rows
    }
}

/// `board` at `rank`, shared as-is when it already holds that rank
fn ranked(board: &Arc<Board>, rank: u32) -> Arc<Board> {
    if board.order == rank {
        Arc::clone(board)
    } else {
        Arc::new(Board {
            order: rank,
            ..Board::clone(board)
        })
    }
}
