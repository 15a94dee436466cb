//! Twitter OAuth1 provider

use async_trait::async_trait;
use std::any::Any;
use tracing::debug;

use super::server::{Credentials, OAuth1Server};
use crate::config::scalar_to_string;
use crate::provider::{
    AccessToken, CallbackParams, OAuth1Provider, Provider, RedirectInstruction, User,
};
use crate::request::RequestHandle;
use crate::session::SessionHandle;
use crate::{Error, Result};

/// Session key holding the temporary credentials between redirect and callback
pub const TEMPORARY_CREDENTIALS_KEY: &str = "oauth.temp";

#[derive(Debug)]
pub struct TwitterProvider {
    request: RequestHandle,
    server: OAuth1Server,
    session: SessionHandle,
}

impl TwitterProvider {
    #[must_use]
    pub fn new(request: RequestHandle, server: OAuth1Server, session: SessionHandle) -> Self {
        Self {
            request,
            server,
            session,
        }
    }
}

#[async_trait]
impl Provider for TwitterProvider {
    fn driver_name(&self) -> &str {
        "twitter"
    }

    async fn redirect(&self) -> Result<RedirectInstruction> {
        let temporary = self.server.temporary_credentials().await?;
        self.session.set(
            TEMPORARY_CREDENTIALS_KEY,
            serde_json::to_string(&temporary)?,
        );

        debug!(driver = "twitter", "Generated OAuth1 authorization URL");

        Ok(RedirectInstruction::new(
            self.server.authorization_url(&temporary)?,
        ))
    }

    async fn user(&self, callback: &CallbackParams) -> Result<User> {
        let token = callback.require("oauth_token")?;
        let verifier = callback.require("oauth_verifier")?;

        let stored = self
            .session
            .remove(TEMPORARY_CREDENTIALS_KEY)
            .ok_or_else(|| Error::Authentication("Missing temporary OAuth credentials".into()))?;
        let temporary: Credentials = serde_json::from_str(&stored)?;

        let credentials = self
            .server
            .token_credentials(&temporary, token, verifier)
            .await?;
        let raw = self.server.user_details(&credentials).await?;

        let text = |key: &str| raw.get(key).and_then(scalar_to_string);
        let user = User {
            id: text("id_str").or_else(|| text("id")).unwrap_or_default(),
            nickname: text("screen_name"),
            name: text("name"),
            email: text("email"),
            avatar: text("profile_image_url_https"),
            token: AccessToken {
                token: credentials.identifier,
                secret: Some(credentials.secret),
                ..AccessToken::default()
            },
            raw,
        };

        debug!(driver = "twitter", user_id = %user.id, "Resolved OAuth1 user");

        Ok(user)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl OAuth1Provider for TwitterProvider {
    fn server(&self) -> &OAuth1Server {
        &self.server
    }

    fn request(&self) -> &RequestHandle {
        &self.request
    }

    fn session(&self) -> &SessionHandle {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::new_session;
    use serde_json::{json, Value};

    fn provider() -> TwitterProvider {
        let config = match json!({"identifier": "i", "secret": "s", "callback_uri": "https://x/cb"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        TwitterProvider::new(
            RequestHandle::default(),
            OAuth1Server::twitter(config).unwrap(),
            new_session(),
        )
    }

    #[tokio::test]
    async fn test_callback_requires_verifier() {
        let callback = CallbackParams::new().with("oauth_token", "t");
        assert!(matches!(
            provider().user(&callback).await,
            Err(Error::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_callback_requires_stored_credentials() {
        let callback = CallbackParams::new()
            .with("oauth_token", "t")
            .with("oauth_verifier", "v");
        assert!(matches!(
            provider().user(&callback).await,
            Err(Error::Authentication(_))
        ));
    }
}
