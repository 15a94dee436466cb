//! OAuth2 providers
//!
//! All six OAuth2 drivers share [`AbstractProvider`]; each driver module only
//! supplies a [`ProviderSpec`]: its endpoints, default scopes and how the
//! profile payload maps onto a [`User`].
//!
//! Endpoints can be overridden per application with the `authorize_url`,
//! `token_url` and `userinfo_url` config keys (self-hosted Bitbucket, tests).

pub mod apple;
pub mod bitbucket;
pub mod facebook;
pub mod github;
pub mod google;
pub mod linkedin;

pub use apple::{Apple, AppleProvider};
pub use bitbucket::{Bitbucket, BitbucketProvider};
pub use facebook::{Facebook, FacebookProvider};
pub use github::{Github, GithubProvider};
pub use google::{Google, GoogleProvider};
pub use linkedin::{LinkedIn, LinkedInProvider};

use async_trait::async_trait;
use oauth2::basic::{
    BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
    BasicTokenType,
};
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet,
    EndpointSet, ExtraTokenFields, RedirectUrl, Scope, StandardRevocableToken,
    StandardTokenResponse, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::fmt;
use tracing::{debug, warn};

use crate::provider::{
    AccessToken, CallbackParams, OAuth2Provider, Provider, ProviderContext, ProviderInstance,
    RedirectInstruction, User,
};
use crate::{Error, Result};

/// Session key holding the `state` issued with the last redirect
pub const STATE_SESSION_KEY: &str = "state";

const USER_AGENT: &str = concat!("socialite-rs/", env!("CARGO_PKG_VERSION"));

/// `id_token` returned next to the access token by OpenID platforms
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdTokenFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl ExtraTokenFields for IdTokenFields {}

pub type OAuth2Token = StandardTokenResponse<IdTokenFields, BasicTokenType>;

type UnconfiguredClient = oauth2::Client<
    BasicErrorResponse,
    OAuth2Token,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
>;

type ConfiguredClient = oauth2::Client<
    BasicErrorResponse,
    OAuth2Token,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// How client credentials are presented to the token endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAuth {
    BasicAuth,
    RequestBody,
}

/// Static endpoint description of an OAuth2 platform
#[derive(Debug, Clone, Copy)]
pub struct Endpoints {
    pub authorize_url: &'static str,
    pub token_url: &'static str,
    /// Profile endpoint; empty when the profile comes from the ID token
    pub userinfo_url: &'static str,
    pub default_scopes: &'static [&'static str],
    /// Fixed extra authorization parameters
    pub authorize_params: &'static [(&'static str, &'static str)],
    pub token_auth: TokenAuth,
}

/// Per-platform behaviour plugged into [`AbstractProvider`]
#[async_trait]
pub trait ProviderSpec: Default + Send + Sync + fmt::Debug + 'static {
    /// Registered driver name
    const NAME: &'static str;

    fn endpoints(&self) -> &'static Endpoints;

    /// Fetch the raw profile for an access token
    async fn fetch_user(
        &self,
        http: &reqwest::Client,
        userinfo_url: &str,
        token: &OAuth2Token,
    ) -> Result<Value> {
        fetch_json(http, userinfo_url, token.access_token().secret()).await
    }

    /// Map the raw profile onto a user; `raw` and `token` are filled in later
    fn map_user(&self, raw: &Value) -> User;
}

/// Shared OAuth2 authorization-code flow
///
/// The `oauth2` client is assembled from the configuration on each call, so a
/// provider with a malformed redirect URI still constructs and reports the
/// problem when used.
#[derive(Debug)]
pub struct AbstractProvider<S: ProviderSpec> {
    context: ProviderContext,
    spec: S,
    http: reqwest::Client,
}

impl<S: ProviderSpec> AbstractProvider<S> {
    /// Create a provider from the (request, config, session) triple
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be initialised.
    pub fn new(context: ProviderContext) -> Result<Self> {
        // Redirects are not followed, the token endpoint must answer directly.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            context,
            spec: S::default(),
            http,
        })
    }

    #[must_use]
    pub fn spec(&self) -> &S {
        &self.spec
    }

    fn endpoint(&self, key: &str, default: &'static str) -> String {
        self.context
            .config
            .get_str(key)
            .map_or_else(|| default.to_string(), ToString::to_string)
    }

    fn client(&self) -> Result<ConfiguredClient> {
        let endpoints = self.spec.endpoints();
        let config = &self.context.config;

        let auth_url = AuthUrl::new(self.endpoint("authorize_url", endpoints.authorize_url))
            .map_err(|e| Error::InvalidInput(format!("Invalid {} authorize URL: {e}", S::NAME)))?;
        let token_url = TokenUrl::new(self.endpoint("token_url", endpoints.token_url))
            .map_err(|e| Error::InvalidInput(format!("Invalid {} token URL: {e}", S::NAME)))?;
        let redirect_url = RedirectUrl::new(config.redirect()?.to_string())
            .map_err(|e| Error::InvalidInput(format!("Invalid {} redirect URL: {e}", S::NAME)))?;

        let auth_type = match endpoints.token_auth {
            TokenAuth::BasicAuth => AuthType::BasicAuth,
            TokenAuth::RequestBody => AuthType::RequestBody,
        };

        Ok(UnconfiguredClient::new(ClientId::new(config.client_id()?.to_string()))
            .set_client_secret(ClientSecret::new(config.client_secret()?.to_string()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url)
            .set_auth_type(auth_type))
    }

    /// Compare the callback `state` with the one issued on redirect
    ///
    /// The stored value is consumed either way. Skipped when the config sets
    /// `stateless`.
    fn verify_state(&self, callback: &CallbackParams) -> Result<()> {
        let stored = self.context.session.remove(STATE_SESSION_KEY);
        if self.context.config.flag("stateless") {
            return Ok(());
        }

        match (stored, callback.get("state")) {
            (Some(expected), Some(actual)) if expected == actual => Ok(()),
            _ => {
                warn!(driver = S::NAME, "OAuth2 callback state mismatch");
                Err(Error::Authentication("Invalid state".to_string()))
            }
        }
    }
}

#[async_trait]
impl<S: ProviderSpec> Provider for AbstractProvider<S> {
    fn driver_name(&self) -> &str {
        S::NAME
    }

    async fn redirect(&self) -> Result<RedirectInstruction> {
        let client = self.client()?;

        let mut request = client.authorize_url(CsrfToken::new_random);
        for scope in self.scopes() {
            request = request.add_scope(Scope::new(scope));
        }
        for (key, value) in self.spec.endpoints().authorize_params {
            request = request.add_extra_param(*key, *value);
        }
        for (key, value) in self.context.config.parameters() {
            request = request.add_extra_param(key, value);
        }

        let (url, state) = request.url();
        if !self.context.config.flag("stateless") {
            self.context
                .session
                .set(STATE_SESSION_KEY, state.secret().clone());
        }

        debug!(driver = S::NAME, "Generated OAuth2 authorization URL");

        Ok(RedirectInstruction::new(url))
    }

    async fn user(&self, callback: &CallbackParams) -> Result<User> {
        self.verify_state(callback)?;
        let code = callback.require("code")?;

        let token = self
            .client()?
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| Error::Authentication(format!("Failed to exchange code: {e}")))?;

        let userinfo_url = self.endpoint("userinfo_url", self.spec.endpoints().userinfo_url);
        let raw = self.spec.fetch_user(&self.http, &userinfo_url, &token).await?;

        let mut user = self.spec.map_user(&raw);
        user.raw = raw;
        user.token = AccessToken {
            token: token.access_token().secret().clone(),
            secret: None,
            refresh_token: token.refresh_token().map(|t| t.secret().clone()),
            expires_in: token.expires_in().map(|d| d.as_secs()),
            id_token: token.extra_fields().id_token.clone(),
        };

        debug!(driver = S::NAME, user_id = %user.id, "Resolved OAuth2 user");

        Ok(user)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<S: ProviderSpec> OAuth2Provider for AbstractProvider<S> {
    fn context(&self) -> &ProviderContext {
        &self.context
    }

    fn scopes(&self) -> Vec<String> {
        self.context.config.scopes().unwrap_or_else(|| {
            self.spec
                .endpoints()
                .default_scopes
                .iter()
                .map(ToString::to_string)
                .collect()
        })
    }
}

/// Default constructor for a registered OAuth2 driver
pub(crate) fn construct<S: ProviderSpec>(context: ProviderContext) -> Result<ProviderInstance> {
    Ok(ProviderInstance::OAuth2(Box::new(AbstractProvider::<S>::new(
        context,
    )?)))
}

/// GET a JSON document with a bearer token
pub(crate) async fn fetch_json(
    http: &reqwest::Client,
    url: &str,
    access_token: &str,
) -> Result<Value> {
    let response = http
        .get(url)
        .bearer_auth(access_token)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await?
        .error_for_status()?;

    Ok(response.json().await?)
}

/// Extract a string from a dotted JSON path like `"picture.data.url"`
pub(crate) fn field(data: &Value, path: &str) -> Option<String> {
    let mut current = data;
    for part in path.split('.') {
        current = match current {
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => current.get(part)?,
        };
    }
    match current {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
