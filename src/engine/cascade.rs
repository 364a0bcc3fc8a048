//! Cascading Status Propagation
//!
//! Fans a board-level (or tree-level) done flag out to every descendant
//! sub-task. Todos already in the requested state keep their `Arc`.

use std::sync::Arc;

use crate::models::{Board, BoardId, SubTask, Todo};
use crate::tree::BoardTree;

fn board_with_status(board: &Board, is_done: bool) -> Board {
    Board {
        id: board.id,
        order: board.order,
        name: board.name.clone(),
        todos: board
            .todos
            .iter()
            .map(|todo| todo_with_status(todo, is_done))
            .collect(),
    }
}

fn todo_with_status(todo: &Arc<Todo>, is_done: bool) -> Arc<Todo> {
    if todo.sub_tasks.iter().all(|sub_task| sub_task.is_done == is_done) {
        return Arc::clone(todo);
    }
    Arc::new(Todo {
        sub_tasks: todo
            .sub_tasks
            .iter()
            .map(|sub_task| SubTask {
                is_done,
                ..sub_task.clone()
            })
            .collect(),
        ..Todo::clone(todo)
    })
}

/// Apply `is_done` to one board's subtree. `None` if the board is absent.
pub fn cascade_board(tree: &BoardTree, board_id: BoardId, is_done: bool) -> Option<BoardTree> {
    tree.with_board_replaced(board_id, |board| board_with_status(board, is_done))
}

/// Apply `is_done` to every board in a single new tree
pub fn cascade_all(tree: &BoardTree, is_done: bool) -> BoardTree {
    tree.board_ids().into_iter().fold(tree.clone(), |acc, board_id| {
        cascade_board(&acc, board_id, is_done).unwrap_or(acc)
    })
}
