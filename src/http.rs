//! HTTP Transport
//!
//! `reqwest` adapter for the remote board and account API. The stored token
//! is sent as a bearer credential on every request.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::account::{AccountService, TokenStore};
use crate::config::ClientConfig;
use crate::error::{SyncError, SyncResult};
use crate::models::{Board, BoardId, LoginCredentials, LoginResult, RegisterPayload, User};
use crate::service::BoardService;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BoardStatusBody {
    is_done: bool,
}

#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
    export_dir: PathBuf,
}

impl HttpApi {
    pub fn new(config: &ClientConfig, tokens: Arc<dyn TokenStore>) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SyncError::Config(format!("http client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            tokens,
            export_dir: config.export_dir.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Target of an export: a bare file name inside `export_dir`
    fn export_path(&self, file_name: &str) -> SyncResult<PathBuf> {
        match Path::new(file_name).file_name() {
            Some(name) if name == file_name => Ok(self.export_dir.join(name)),
            _ => Err(SyncError::Config(format!("invalid export file name: {:?}", file_name))),
        }
    }

    fn request(&self, method: Method, path: &str) -> SyncResult<RequestBuilder> {
        let builder = self.client.request(method, self.url(path));
        Ok(match self.tokens.load()? {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send(&self, builder: RequestBuilder) -> SyncResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| SyncError::Remote(e.to_string()))?;
        match classify(response.status()) {
            Some(err) => Err(err),
            None => Ok(response),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> SyncResult<T> {
        let response = self.send(self.request(Method::GET, path)?).await?;
        parse_json(response).await
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(&self, path: &str, body: &B) -> SyncResult<T> {
        let response = self.send(self.request(Method::POST, path)?.json(body)).await?;
        parse_json(response).await
    }

    async fn put<B: Serialize + Sync>(&self, path: &str, body: &B) -> SyncResult<()> {
        self.send(self.request(Method::PUT, path)?.json(body)).await?;
        Ok(())
    }
}

/// Map a response status to the error it stands for, `None` on success
pub fn classify(status: StatusCode) -> Option<SyncError> {
    if status.is_success() {
        None
    } else if status == StatusCode::UNAUTHORIZED {
        Some(SyncError::AuthExpired)
    } else {
        Some(SyncError::Remote(status.to_string()))
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> SyncResult<T> {
    response
        .json()
        .await
        .map_err(|e| SyncError::Remote(format!("invalid response body: {}", e)))
}

#[async_trait]
impl BoardService for HttpApi {
    async fn get_boards(&self) -> SyncResult<Vec<Board>> {
        self.get("board").await
    }

    async fn save_boards_order(&self, boards: &[Board]) -> SyncResult<()> {
        self.put("board/order", &boards).await
    }

    async fn update_board(&self, board: &Board) -> SyncResult<()> {
        self.put(&format!("board/{}", board.id), board).await
    }

    async fn update_board_status(&self, board_id: BoardId, is_done: bool) -> SyncResult<()> {
        self.put(&format!("board/{}/status", board_id), &BoardStatusBody { is_done })
            .await
    }

    async fn delete_board(&self, board_id: BoardId) -> SyncResult<()> {
        self.send(self.request(Method::DELETE, &format!("board/{}", board_id))?)
            .await?;
        Ok(())
    }

    async fn download_export(&self, board_id: BoardId, file_name: &str) -> SyncResult<()> {
        let path = self.export_path(file_name)?;
        let response = self
            .send(self.request(Method::GET, &format!("board/{}/excel", board_id))?)
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SyncError::Remote(e.to_string()))?;

        tokio::fs::create_dir_all(&self.export_dir).await?;
        tokio::fs::write(&path, &bytes).await?;
        info!(board_id, path = %path.display(), bytes = bytes.len(), "board exported");
        Ok(())
    }
}

#[async_trait]
impl AccountService for HttpApi {
    async fn register_user(&self, payload: &RegisterPayload) -> SyncResult<LoginResult> {
        self.post("auth/signup", payload).await
    }

    async fn login_user(&self, credentials: &LoginCredentials) -> SyncResult<LoginResult> {
        self.post("auth/login", credentials).await
    }

    async fn logout_user(&self) -> SyncResult<()> {
        self.send(self.request(Method::POST, "auth/logout")?).await?;
        debug!("server session closed");
        Ok(())
    }

    async fn get_logged_in_user(&self) -> SyncResult<User> {
        self.get("auth/user").await
    }
}
