//! Taskboard Client Core
//!
//! Layered architecture:
//! - models: Board / Todo / SubTask / User data shapes
//! - tree: immutable board tree with structural-copy helpers
//! - status: derived "all subtasks done" aggregate
//! - scheduler: keyed debounce of persistence writes
//! - engine: optimistic mutations, cascading status, load lifecycle
//! - service: persistence collaborator contract and adapters
//! - account: session and token handling
//! - http: reqwest transport for the remote API

pub mod account;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod models;
pub mod scheduler;
pub mod service;
pub mod status;
pub mod tree;

pub use account::{AccountService, AccountSession, FileTokenStore, MemoryTokenStore, TokenStore};
pub use config::{ClientConfig, EngineConfig, RenameKeying, StatusWriteOrder};
pub use engine::{BoardEngine, LoadState};
pub use error::{SyncError, SyncResult};
pub use http::HttpApi;
pub use models::{Board, BoardId, SubTask, SubTaskId, Todo, TodoId, User};
pub use scheduler::Debouncer;
pub use service::{BoardService, InMemoryBoardService};
pub use status::compute_all_done;
pub use tree::BoardTree;
