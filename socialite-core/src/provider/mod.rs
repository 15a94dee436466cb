//! Provider capability contract
//!
//! Every driver returned by [`SocialiteManager::driver`](crate::SocialiteManager::driver)
//! can do two things:
//! 1. `redirect` - produce the authorization redirect for the user agent
//! 2. `user` - resolve the authenticated user from the callback parameters
//!
//! OAuth2 providers live in [`two`], the OAuth1 (Twitter) provider in [`one`].

pub mod one;
pub mod two;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use url::Url;

use crate::config::ProviderConfig;
use crate::request::RequestHandle;
use crate::session::SessionHandle;
use crate::{Error, Result};

pub use one::{OAuth1Server, TwitterProvider};
pub use two::{
    AbstractProvider, AppleProvider, BitbucketProvider, FacebookProvider, GithubProvider,
    GoogleProvider, LinkedInProvider,
};

/// Where to send the user agent to start authorization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectInstruction {
    pub url: Url,
}

impl RedirectInstruction {
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    /// Value for the `Location` header
    #[must_use]
    pub fn location(&self) -> &str {
        self.url.as_str()
    }
}

/// Parameters the identity platform sent back to the redirect URI
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    params: HashMap<String, String>,
}

impl CallbackParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect body then query parameters; query values win on conflict
    #[must_use]
    pub fn from_request(request: &RequestHandle) -> Self {
        let mut params = request.body_params().clone();
        params.extend(
            request
                .query_params()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        Self { params }
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Value for a parameter the callback must carry
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| Error::Authentication(format!("Callback is missing '{key}'")))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CallbackParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Credentials issued to the application for the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    /// OAuth1 token secret
    pub secret: Option<String>,
    pub refresh_token: Option<String>,
    /// Lifetime in seconds
    pub expires_in: Option<u64>,
    pub id_token: Option<String>,
}

/// Authenticated user as reported by the identity platform
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub nickname: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    /// Unmodified profile payload
    pub raw: serde_json::Value,
    pub token: AccessToken,
}

/// OAuth protocol family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    OAuth1,
    OAuth2,
}

/// Request, configuration and session a provider is constructed with
#[derive(Debug, Clone)]
pub struct ProviderContext {
    pub request: RequestHandle,
    pub config: ProviderConfig,
    pub session: SessionHandle,
}

impl ProviderContext {
    #[must_use]
    pub fn new(request: RequestHandle, config: ProviderConfig, session: SessionHandle) -> Self {
        Self {
            request,
            config,
            session,
        }
    }
}

/// Capabilities shared by both protocol families
#[async_trait]
pub trait Provider: Send + Sync + fmt::Debug {
    /// Driver name (e.g., "github", "twitter")
    fn driver_name(&self) -> &str;

    async fn redirect(&self) -> Result<RedirectInstruction>;

    async fn user(&self, callback: &CallbackParams) -> Result<User>;

    /// Concrete provider, for callers that need type-specific access
    fn as_any(&self) -> &dyn Any;
}

/// OAuth2 provider built from (request, config, session)
pub trait OAuth2Provider: Provider {
    fn context(&self) -> &ProviderContext;

    /// Scopes requested on redirect
    fn scopes(&self) -> Vec<String>;

    fn request(&self) -> &RequestHandle {
        &self.context().request
    }

    fn config(&self) -> &ProviderConfig {
        &self.context().config
    }

    fn session(&self) -> &SessionHandle {
        &self.context().session
    }
}

/// OAuth1 provider wrapping a pre-built signing server
pub trait OAuth1Provider: Provider {
    fn server(&self) -> &OAuth1Server;

    fn request(&self) -> &RequestHandle;

    fn session(&self) -> &SessionHandle;
}

/// Provider handle returned by the resolver
#[derive(Debug)]
pub enum ProviderInstance {
    OAuth1(Box<dyn OAuth1Provider>),
    OAuth2(Box<dyn OAuth2Provider>),
}

impl ProviderInstance {
    #[must_use]
    pub fn protocol(&self) -> Protocol {
        match self {
            Self::OAuth1(_) => Protocol::OAuth1,
            Self::OAuth2(_) => Protocol::OAuth2,
        }
    }

    #[must_use]
    pub fn is_oauth1(&self) -> bool {
        matches!(self, Self::OAuth1(_))
    }

    #[must_use]
    pub fn is_oauth2(&self) -> bool {
        matches!(self, Self::OAuth2(_))
    }

    #[must_use]
    pub fn as_oauth1(&self) -> Option<&dyn OAuth1Provider> {
        match self {
            Self::OAuth1(provider) => Some(provider.as_ref()),
            Self::OAuth2(_) => None,
        }
    }

    #[must_use]
    pub fn as_oauth2(&self) -> Option<&dyn OAuth2Provider> {
        match self {
            Self::OAuth2(provider) => Some(provider.as_ref()),
            Self::OAuth1(_) => None,
        }
    }

    #[must_use]
    pub fn into_oauth2(self) -> Option<Box<dyn OAuth2Provider>> {
        match self {
            Self::OAuth2(provider) => Some(provider),
            Self::OAuth1(_) => None,
        }
    }

    /// Downcast to a concrete provider type
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::OAuth1(provider) => provider.as_any().downcast_ref::<T>(),
            Self::OAuth2(provider) => provider.as_any().downcast_ref::<T>(),
        }
    }

    #[must_use]
    pub fn driver_name(&self) -> &str {
        match self {
            Self::OAuth1(provider) => provider.driver_name(),
            Self::OAuth2(provider) => provider.driver_name(),
        }
    }

    pub async fn redirect(&self) -> Result<RedirectInstruction> {
        match self {
            Self::OAuth1(provider) => provider.redirect().await,
            Self::OAuth2(provider) => provider.redirect().await,
        }
    }

    pub async fn user(&self, callback: &CallbackParams) -> Result<User> {
        match self {
            Self::OAuth1(provider) => provider.user(callback).await,
            Self::OAuth2(provider) => provider.user(callback).await,
        }
    }
}
