//! User endpoints of the registration backend.

use serde_json::Value;

use super::client::ApiClient;
use super::normalize::ApiError;
use super::types::{RegisterRequest, UserInfo};

/// The backend calls the session store depends on. Enables mocking in tests.
#[async_trait::async_trait]
pub trait UserApi: Send + Sync {
    /// `POST /users/register`. Resolves with whatever `data` the backend returns.
    async fn register(&self, request: &RegisterRequest) -> Result<Value, ApiError>;

    /// `GET /users/{user_id}`.
    async fn get_user_info(&self, user_id: &str) -> Result<UserInfo, ApiError>;
}

#[async_trait::async_trait]
impl UserApi for ApiClient {
    async fn register(&self, request: &RegisterRequest) -> Result<Value, ApiError> {
        self.post("/users/register", request).await
    }

    async fn get_user_info(&self, user_id: &str) -> Result<UserInfo, ApiError> {
        self.get_segments(&["users", user_id.trim()]).await
    }
}
