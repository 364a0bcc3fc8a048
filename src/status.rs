//! Status Aggregator
//!
//! Pure "every sub-task done" folds. Empty collections are vacuously done.

use crate::models::{Board, Todo};
use crate::tree::BoardTree;

/// `true` iff every sub-task of every todo of every board is done
pub fn compute_all_done(tree: &BoardTree) -> bool {
    tree.boards().iter().all(|board| board_all_done(board))
}

pub fn board_all_done(board: &Board) -> bool {
    board.todos.iter().all(|todo| todo_all_done(todo))
}

pub fn todo_all_done(todo: &Todo) -> bool {
    todo.sub_tasks.iter().all(|sub_task| sub_task.is_done)
}

/// (done, total) sub-task counts across the tree
pub fn progress(tree: &BoardTree) -> (usize, usize) {
    tree.sub_tasks().fold((0, 0), |(done, total), sub_task| {
        (done + usize::from(sub_task.is_done), total + 1)
    })
}
