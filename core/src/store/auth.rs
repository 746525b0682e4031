use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use super::ActionResult;
use crate::backend::BlogBackend;
use crate::clock::Clock;
use crate::error::{ApiError, Result};
use crate::session::{is_token_valid, Session};
use crate::storage::{keys, read_json, write_json, KeyValueStore, StorageResult};
use crate::types::{ChangePasswordRequest, LoginRequest, Role, User, UserPatch};

/// Session owner. The token lives under `keys::TOKEN` as a raw string and the
/// user under `keys::USER` as JSON; both are written together and removed
/// together.
pub struct AuthStore {
    backend: Arc<dyn BlogBackend>,
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    session: RwLock<Session>,
}

impl AuthStore {
    /// Build the store and restore any persisted session. A stored user that
    /// cannot be decoded clears both keys and starts anonymous.
    pub async fn restore(
        backend: Arc<dyn BlogBackend>,
        storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = Self {
            backend,
            storage,
            clock,
            session: RwLock::new(Session::Anonymous),
        };

        match store.load_session() {
            Ok(Some(session)) => {
                if let Some(token) = session.token() {
                    store.backend.set_auth_token(Some(token.to_string())).await;
                }
                *store.session.write().await = session;
            }
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "stored session is unreadable, logging out");
                store.clear_storage();
            }
        }
        store
    }

    fn load_session(&self) -> StorageResult<Option<Session>> {
        let token = self.storage.get(keys::TOKEN)?;
        let user: Option<User> = read_json(self.storage.as_ref(), keys::USER)?;
        Ok(match (token, user) {
            (Some(token), Some(user)) if !token.is_empty() => Some(Session::Authenticated { token, user }),
            _ => None,
        })
    }

    fn save_session(&self, token: &str, user: &User) {
        let saved = self
            .storage
            .set(keys::TOKEN, token)
            .and_then(|()| write_json(self.storage.as_ref(), keys::USER, user));
        if let Err(err) = saved {
            warn!(error = %err, "failed to persist session");
        }
    }

    fn clear_storage(&self) {
        for key in [keys::TOKEN, keys::USER] {
            if let Err(err) = self.storage.remove(key) {
                warn!(key, error = %err, "failed to clear session key");
            }
        }
    }

    pub async fn login(&self, request: &LoginRequest) -> ActionResult {
        let response = match self.backend.login(request).await {
            Ok(envelope) => envelope.data,
            Err(err) => {
                warn!(username = %request.username, error = %err, "login failed");
                return ActionResult::failed(err.to_string());
            }
        };
        let Some(response) = response else {
            return ActionResult::failed("login failed");
        };

        self.backend.set_auth_token(Some(response.token.clone())).await;
        self.save_session(&response.token, &response.user);
        info!(username = %response.user.username, mode = self.backend.mode(), "logged in");
        *self.session.write().await = Session::Authenticated {
            token: response.token,
            user: response.user,
        };
        ActionResult::ok("login successful")
    }

    /// End the session. The remote logout is best effort; local state is
    /// always cleared.
    pub async fn logout(&self) {
        if self.session.read().await.is_authenticated() {
            if let Err(err) = self.backend.logout().await {
                warn!(error = %err, "remote logout failed");
            }
        }

        self.backend.set_auth_token(None).await;
        self.clear_storage();
        let previous = std::mem::take(&mut *self.session.write().await);
        if let Some(user) = previous.user() {
            info!(username = %user.username, "logged out");
        }
    }

    /// Check the session token against its embedded issue time. An expired or
    /// malformed token logs the session out.
    pub async fn validate_token(&self) -> bool {
        let token = match self.session.read().await.token() {
            Some(token) => token.to_string(),
            None => return false,
        };

        if is_token_valid(&token, self.clock.now()) {
            return true;
        }
        warn!("session token is invalid or expired");
        self.logout().await;
        false
    }

    /// Merge `patch` into the current user and persist it.
    pub async fn update_user(&self, patch: UserPatch) -> Result<User> {
        let mut session = self.session.write().await;
        let Session::Authenticated { token, user } = &mut *session else {
            return Err(ApiError::unauthorized("not logged in"));
        };
        user.apply(patch);
        self.save_session(token, user);
        Ok(user.clone())
    }

    pub async fn change_password(&self, old_password: &str, new_password: &str) -> ActionResult {
        let request = ChangePasswordRequest {
            old_password: old_password.to_string(),
            new_password: new_password.to_string(),
        };
        match self.backend.change_password(&request).await {
            Ok(_) => ActionResult::ok("password changed"),
            Err(err) => {
                warn!(error = %err, "change password failed");
                ActionResult::failed(err.to_string())
            }
        }
    }

    pub async fn session(&self) -> Session {
        self.session.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_authenticated()
    }

    pub async fn user(&self) -> Option<User> {
        self.session.read().await.user().cloned()
    }

    pub async fn token(&self) -> Option<String> {
        self.session.read().await.token().map(str::to_string)
    }

    pub async fn is_admin(&self) -> bool {
        self.has_role(Role::Admin).await
    }

    pub async fn is_editor(&self) -> bool {
        self.has_role(Role::Editor).await
    }

    async fn has_role(&self, role: Role) -> bool {
        self.session.read().await.user().is_some_and(|u| u.role == role)
    }
}
