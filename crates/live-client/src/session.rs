//! Persisted session and auth flows
//!
//! The session document holds the token pair plus the signed-in user and
//! organization. It is written on login and refresh and removed on logout.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fleet_protocol::LoginResponse;
use fleet_state::{AuthAction, AuthState, Store};
use serde::{Deserialize, Serialize};
use storage::{Organization, User};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::ClientError;

/// On-disk session document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub token: String,
    pub refresh_token: String,
    pub user: User,
    pub organization: Organization,
}

impl From<&LoginResponse> for PersistedSession {
    fn from(r: &LoginResponse) -> Self {
        Self {
            token: r.token.clone(),
            refresh_token: r.refresh_token.clone(),
            user: r.user.clone(),
            organization: r.organization.clone(),
        }
    }
}

impl From<PersistedSession> for LoginResponse {
    fn from(s: PersistedSession) -> Self {
        LoginResponse {
            user: s.user,
            organization: s.organization,
            token: s.token,
            refresh_token: s.refresh_token,
        }
    }
}

/// JSON file holding one [`PersistedSession`]
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored session, if any. A corrupt file is treated as absent.
    pub fn load(&self) -> Result<Option<PersistedSession>, ClientError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&text) {
            Ok(session) => Ok(Some(session)),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Ignoring unreadable session file");
                Ok(None)
            }
        }
    }

    pub fn save(&self, session: &PersistedSession) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(session)?)?;
        debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    pub fn clear(&self) -> Result<(), ClientError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Auth flows tying the API client, the session file, and the auth store
#[derive(Clone)]
pub struct Session {
    api: Arc<Mutex<ApiClient>>,
    store: SessionStore,
    auth: Arc<Store<AuthState>>,
}

impl Session {
    pub fn new(api: ApiClient, store: SessionStore, auth: Arc<Store<AuthState>>) -> Self {
        Self {
            api: Arc::new(Mutex::new(api)),
            store,
            auth,
        }
    }

    pub fn auth(&self) -> &Arc<Store<AuthState>> {
        &self.auth
    }

    /// Copy of the API client carrying the current token
    pub async fn api(&self) -> ApiClient {
        self.api.lock().await.clone()
    }

    /// Restore the stored session: keep it if the token verifies, else try a
    /// refresh, else log out.
    pub async fn initialize(&self) {
        let stored = match self.store.load() {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                self.auth.dispatch(AuthAction::SetLoading(false));
                return;
            }
            Err(err) => {
                warn!(error = %err, "Auth initialization error");
                self.auth.dispatch(AuthAction::SetLoading(false));
                return;
            }
        };

        let valid = self.api.lock().await.verify(&stored.token).await;
        if valid {
            info!(user = %stored.user.id, "Restored session");
            self.api.lock().await.set_token(Some(stored.token.clone()));
            self.auth.dispatch(AuthAction::LoginSuccess(Box::new(stored.into())));
            return;
        }

        // Seed the store so refresh has a refresh token to use
        self.auth.dispatch(AuthAction::LoginSuccess(Box::new(stored.into())));
        if let Err(err) = self.refresh().await {
            warn!(error = %err, "Stored session could not be refreshed");
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), ClientError> {
        self.auth.dispatch(AuthAction::LoginStart);

        let result = self.api.lock().await.login(email, password).await;
        match result {
            Ok(response) => {
                if let Err(err) = self.store.save(&PersistedSession::from(&response)) {
                    warn!(error = %err, "Failed to persist session");
                }
                self.api.lock().await.set_token(Some(response.token.clone()));
                info!(user = %response.user.id, "Logged in");
                self.auth.dispatch(AuthAction::LoginSuccess(Box::new(response)));
                Ok(())
            }
            Err(err) => {
                let message = match &err {
                    ClientError::Api { message, .. } => message.clone(),
                    _ => "Login failed".to_string(),
                };
                warn!(error = %err, "Login failed");
                self.auth.dispatch(AuthAction::LoginFailure(message));
                Err(err)
            }
        }
    }

    pub async fn logout(&self) {
        if let Err(err) = self.store.clear() {
            warn!(error = %err, "Failed to clear session file");
        }
        self.api.lock().await.set_token(None);
        self.auth.dispatch(AuthAction::Logout);
        info!("Logged out");
    }

    /// Exchange the refresh token for a new pair. Any failure logs out.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let Some(refresh_token) = self.auth.snapshot().refresh_token.clone() else {
            self.logout().await;
            return Err(ClientError::NotAuthenticated);
        };

        let result = self.api.lock().await.refresh(&refresh_token).await;
        let pair = match result {
            Ok(pair) => pair,
            Err(err) => {
                warn!(error = %err, "Token refresh failed");
                self.logout().await;
                return Err(err);
            }
        };

        self.api.lock().await.set_token(Some(pair.token.clone()));
        let state = self.auth.dispatch(AuthAction::RefreshToken(pair));
        if let (Some(token), Some(refresh_token), Some(user), Some(organization)) = (
            state.token.clone(),
            state.refresh_token.clone(),
            state.user.clone(),
            state.organization.clone(),
        ) {
            let session = PersistedSession {
                token,
                refresh_token,
                user,
                organization,
            };
            if let Err(err) = self.store.save(&session) {
                warn!(error = %err, "Failed to persist refreshed session");
            }
        }
        debug!("Token refreshed");
        Ok(())
    }

    /// Refresh every `interval` until shutdown or the first failed refresh
    pub fn spawn_refresh_task(
        &self,
        interval: std::time::Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let session = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if session.refresh().await.is_err() {
                            break;
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("Refresh task stopped");
        })
    }
}
