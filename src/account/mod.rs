//! Account Layer
//!
//! Remote account contract, auth-token persistence and the logged-in user
//! session built on top of both.

mod session;
mod token;

use async_trait::async_trait;

use crate::error::SyncResult;
use crate::models::{LoginCredentials, LoginResult, RegisterPayload, User};

pub use session::AccountSession;
pub use token::{FileTokenStore, MemoryTokenStore, TokenStore};

/// Remote account endpoints
#[async_trait]
pub trait AccountService: Send + Sync {
    async fn register_user(&self, payload: &RegisterPayload) -> SyncResult<LoginResult>;

    async fn login_user(&self, credentials: &LoginCredentials) -> SyncResult<LoginResult>;

    /// Invalidate the current token server-side
    async fn logout_user(&self) -> SyncResult<()>;

    /// User owning the stored token. `AuthExpired` when it is no longer valid.
    async fn get_logged_in_user(&self) -> SyncResult<User>;
}
