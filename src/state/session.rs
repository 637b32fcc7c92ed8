#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::net::api::UserApi;
use crate::net::normalize::ApiError;
use crate::net::types::{RegisterRequest, UserInfo};

pub const UNKNOWN_USER: &str = "unknown user";
const REGISTER_FAILED: &str = "registration failed";
const FETCH_USER_FAILED: &str = "failed to fetch user info";

/// User session state tracking the current user, per-action flags, and the
/// last action's error message.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SessionState {
    pub user_info: Option<UserInfo>,
    pub is_loading: bool,
    pub is_registering: bool,
    pub error: Option<String>,
}

impl SessionState {
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.user_info.is_some()
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        display_name(self.user_info.as_ref())
    }
}

/// Name to show for `user`: nickname, then username, then [`UNKNOWN_USER`].
/// Empty strings count as missing.
#[must_use]
pub fn display_name(user: Option<&UserInfo>) -> String {
    user.and_then(|u| non_empty(u.nickname.as_deref()).or_else(|| non_empty(u.username.as_deref())))
        .unwrap_or(UNKNOWN_USER)
        .to_owned()
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.filter(|s| !s.is_empty())
}

/// Handle to the session state and the actions that mutate it.
///
/// Clone is cheap; all clones share the same state. The state lock is only
/// held for flag updates, never across a backend call.
#[derive(Clone)]
pub struct SessionStore {
    api: Arc<dyn UserApi>,
    state: Arc<RwLock<SessionState>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(api: Arc<dyn UserApi>) -> Self {
        Self { api, state: Arc::new(RwLock::new(SessionState::default())) }
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn is_logged_in(&self) -> bool {
        self.state.read().await.is_logged_in()
    }

    pub async fn display_name(&self) -> String {
        self.state.read().await.display_name()
    }

    /// Register a new account. Does not log the user in.
    ///
    /// # Errors
    ///
    /// Returns the normalized backend error after recording its message in
    /// `error`. `is_registering` is false again on every exit path.
    pub async fn register(&self, request: &RegisterRequest) -> Result<Value, ApiError> {
        {
            let mut state = self.state.write().await;
            state.is_registering = true;
            state.error = None;
        }
        tracing::info!(username = %request.username, "registering user");

        let result = self.api.register(request).await;

        let mut state = self.state.write().await;
        state.is_registering = false;
        match result {
            Ok(data) => {
                tracing::info!(username = %request.username, "registration succeeded");
                Ok(data)
            }
            Err(error) => {
                tracing::warn!(
                    username = %request.username,
                    code = error.error_code(),
                    error = %error,
                    "registration failed"
                );
                state.error = Some(failure_message(&error, REGISTER_FAILED));
                Err(error)
            }
        }
    }

    /// Fetch a user and make it the current session user.
    ///
    /// # Errors
    ///
    /// Returns the normalized backend error after recording its message in
    /// `error`. `is_loading` is false again on every exit path and
    /// `user_info` is left as it was.
    pub async fn fetch_user_info(&self, user_id: &str) -> Result<UserInfo, ApiError> {
        {
            let mut state = self.state.write().await;
            state.is_loading = true;
            state.error = None;
        }
        tracing::info!(%user_id, "fetching user info");

        let result = self.api.get_user_info(user_id).await;

        let mut state = self.state.write().await;
        state.is_loading = false;
        match result {
            Ok(user) => {
                tracing::info!(%user_id, "fetched user info");
                state.user_info = Some(user.clone());
                Ok(user)
            }
            Err(error) => {
                tracing::warn!(%user_id, code = error.error_code(), error = %error, "fetch user info failed");
                state.error = Some(failure_message(&error, FETCH_USER_FAILED));
                Err(error)
            }
        }
    }

    pub async fn clear_error(&self) {
        self.state.write().await.error = None;
    }

    /// Drop the current user and error. In-flight flags are left alone.
    pub async fn logout(&self) {
        let mut state = self.state.write().await;
        state.user_info = None;
        state.error = None;
        tracing::info!("logged out");
    }
}

fn failure_message(error: &ApiError, fallback: &str) -> String {
    match error.message() {
        "" => fallback.to_owned(),
        message => message.to_owned(),
    }
}
