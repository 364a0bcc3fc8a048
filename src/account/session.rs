//! Logged-in User Session
//!
//! Keeps the current user observable and the auth token in step with it.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use super::{AccountService, TokenStore};
use crate::error::SyncResult;
use crate::models::{LoginCredentials, LoginResult, RegisterPayload, User};

pub struct AccountSession {
    service: Arc<dyn AccountService>,
    tokens: Arc<dyn TokenStore>,
    logged_user: watch::Sender<Option<User>>,
}

impl AccountSession {
    pub fn new(service: Arc<dyn AccountService>, tokens: Arc<dyn TokenStore>) -> Self {
        let (logged_user, _) = watch::channel(None);
        Self {
            service,
            tokens,
            logged_user,
        }
    }

    pub fn logged_user(&self) -> Option<User> {
        self.logged_user.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.logged_user.subscribe()
    }

    pub async fn register(&self, payload: &RegisterPayload) -> SyncResult<User> {
        let result = self.service.register_user(payload).await?;
        self.accept(result)
    }

    pub async fn login(&self, credentials: &LoginCredentials) -> SyncResult<User> {
        let result = self.service.login_user(credentials).await?;
        self.accept(result)
    }

    pub async fn logout(&self) -> SyncResult<()> {
        self.service.logout_user().await?;
        self.tokens.clear()?;
        self.logged_user.send_replace(None);
        info!("logged out");
        Ok(())
    }

    /// Restore the session from a stored token. Without a token nothing is
    /// fetched; an expired token is discarded and the error returned.
    pub async fn load_user(&self) -> SyncResult<Option<User>> {
        if self.tokens.load()?.is_none() {
            return Ok(None);
        }

        match self.service.get_logged_in_user().await {
            Ok(user) => {
                info!(user_id = user.id, "session restored");
                self.logged_user.send_replace(Some(user.clone()));
                Ok(Some(user))
            }
            Err(err) => {
                if err.is_auth_expired() {
                    warn!("stored token expired, clearing it");
                    self.tokens.clear()?;
                }
                Err(err)
            }
        }
    }

    fn accept(&self, result: LoginResult) -> SyncResult<User> {
        self.tokens.save(&result.token)?;
        info!(user_id = result.user.id, "logged in");
        self.logged_user.send_replace(Some(result.user.clone()));
        Ok(result.user)
    }
}
