//! Session manager API.

use tracing::debug;

use crate::client::{SESSION_HEADER, VimClient};
use crate::error::{Error, Result};
use crate::types::{LoginRequest, SessionIsActiveRequest, UserSession};

/// Session manager API client.
pub struct SessionManagerApi {
    client: VimClient,
}

impl SessionManagerApi {
    pub(crate) fn new(client: VimClient) -> Self {
        Self { client }
    }

    async fn path(&self, method: &str) -> Result<String> {
        let content = self.client.service_instance().content().await?;
        Ok(format!(
            "SessionManager/{}/{}",
            content.session_manager.value, method
        ))
    }

    /// Log in with a user name and password.
    ///
    /// On success the session id is stored on the client and sent with
    /// every later request.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserSession> {
        let path = self.path("Login").await?;
        let request = LoginRequest {
            user_name: username,
            password,
        };
        let response = self.client.post_raw(&path, Some(&request)).await?;

        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| Error::Auth(format!("login response carried no {SESSION_HEADER}")))?;

        let user: UserSession = self.client.handle_response(response).await?;
        debug!(user = %user.user_name, server = %self.client.server(), "logged in");
        self.client.set_session(Some(session_id), Some(user.clone()));
        Ok(user)
    }

    /// End the current session.
    ///
    /// The stored session id is cleared even if the server call fails.
    pub async fn logout(&self) -> Result<()> {
        if !self.client.is_authenticated() {
            return Ok(());
        }
        let path = self.path("Logout").await?;
        let result = self.client.post_unit(&path).await;
        self.client.set_session(None, None);
        result
    }

    /// Ask the server whether the current session is still valid.
    ///
    /// Returns `false` without a round trip when not logged in.
    pub async fn session_is_active(&self) -> Result<bool> {
        let Some(user) = self.client.user_session() else {
            return Ok(false);
        };
        let path = self.path("SessionIsActive").await?;
        let request = SessionIsActiveRequest {
            session_id: &user.key,
            user_name: &user.user_name,
        };
        self.client.post(&path, &request).await
    }
}
