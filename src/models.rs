//! Client Models
//!
//! Data structures matching the remote API. Wire names are camelCase.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub type BoardId = u32;
pub type TodoId = u32;
pub type SubTaskId = u32;
pub type UserId = u32;

/// Top-level ordered container of todos.
///
/// Todos sit behind `Arc` so a copied board shares every todo it did not touch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: BoardId,
    /// 1-based rank among sibling boards
    pub order: u32,
    pub name: String,
    #[serde(default)]
    pub todos: Vec<Arc<Todo>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: TodoId,
    pub order: u32,
    pub title: String,
    /// Owning board (back-reference)
    pub board_id: BoardId,
    #[serde(default)]
    pub sub_tasks: Vec<SubTask>,
}

/// Leaf unit carrying the done flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubTask {
    pub id: SubTaskId,
    pub order: u32,
    pub text: String,
    pub is_done: bool,
    /// Owning todo (back-reference)
    pub todo_id: TodoId,
}

impl Board {
    pub fn new(id: BoardId, order: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            order,
            name: name.into(),
            todos: Vec::new(),
        }
    }

    /// Builder-style helper used when assembling boards by hand
    pub fn with_todo(mut self, todo: Todo) -> Self {
        self.todos.push(Arc::new(todo));
        self
    }

    /// Copy of this board with a new name, sharing all todos
    pub fn renamed(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..self.clone()
        }
    }

    pub fn sub_tasks(&self) -> impl Iterator<Item = &SubTask> {
        self.todos.iter().flat_map(|todo| todo.sub_tasks.iter())
    }
}

impl Todo {
    pub fn new(id: TodoId, order: u32, title: impl Into<String>, board_id: BoardId) -> Self {
        Self {
            id,
            order,
            title: title.into(),
            board_id,
            sub_tasks: Vec::new(),
        }
    }

    pub fn with_sub_task(mut self, sub_task: SubTask) -> Self {
        self.sub_tasks.push(sub_task);
        self
    }
}

impl SubTask {
    pub fn new(id: SubTaskId, order: u32, text: impl Into<String>, todo_id: TodoId) -> Self {
        Self {
            id,
            order,
            text: text.into(),
            is_done: false,
            todo_id,
        }
    }

    pub fn done(mut self, is_done: bool) -> Self {
        self.is_done = is_done;
        self
    }
}

// ========================
// Account Models
// ========================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResult {
    pub user: User,
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_wire_format() {
        let json = r#"{
            "id": 7, "order": 1, "name": "Home",
            "todos": [{
                "id": 70, "order": 1, "title": "Kitchen", "boardId": 7,
                "subTasks": [{"id": 700, "order": 1, "text": "Dishes", "isDone": true, "todoId": 70}]
            }]
        }"#;
        let board: Board = serde_json::from_str(json).unwrap();
        assert_eq!(board.todos[0].board_id, 7);
        assert!(board.todos[0].sub_tasks[0].is_done);

        let value = serde_json::to_value(&board).unwrap();
        assert_eq!(value["todos"][0]["subTasks"][0]["todoId"], 70);
    }

    #[test]
    fn test_missing_children_default_to_empty() {
        let board: Board = serde_json::from_str(r#"{"id":1,"order":1,"name":"Empty"}"#).unwrap();
        assert!(board.todos.is_empty());
    }

    #[test]
    fn test_renamed_shares_todos() {
        let board = Board::new(1, 1, "Old").with_todo(Todo::new(10, 1, "T", 1));
        let renamed = board.renamed("New");
        assert_eq!(renamed.name, "New");
        assert!(Arc::ptr_eq(&board.todos[0], &renamed.todos[0]));
    }

    #[test]
    fn test_user_wire_format() {
        let user: User =
            serde_json::from_str(r#"{"id":3,"email":"a@b.c","fullName":"Ada Lovelace"}"#).unwrap();
        assert_eq!(user.full_name, "Ada Lovelace");
    }
}
