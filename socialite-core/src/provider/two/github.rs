//! GitHub OAuth2 provider

use async_trait::async_trait;
use oauth2::TokenResponse;
use serde_json::Value;

use super::{fetch_json, field, AbstractProvider, Endpoints, OAuth2Token, ProviderSpec, TokenAuth};
use crate::provider::User;
use crate::Result;

static ENDPOINTS: Endpoints = Endpoints {
    authorize_url: "https://github.com/login/oauth/authorize",
    token_url: "https://github.com/login/oauth/access_token",
    userinfo_url: "https://api.github.com/user",
    default_scopes: &["user:email"],
    authorize_params: &[],
    token_auth: TokenAuth::RequestBody,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct Github;

pub type GithubProvider = AbstractProvider<Github>;

#[async_trait]
impl ProviderSpec for Github {
    const NAME: &'static str = "github";

    fn endpoints(&self) -> &'static Endpoints {
        &ENDPOINTS
    }

    /// Profile plus the primary verified address when the public email is hidden
    async fn fetch_user(
        &self,
        http: &reqwest::Client,
        userinfo_url: &str,
        token: &OAuth2Token,
    ) -> Result<Value> {
        let access_token = token.access_token().secret();
        let mut user = fetch_json(http, userinfo_url, access_token).await?;

        if user.get("email").is_none_or(Value::is_null) {
            let emails_url = format!("{}/emails", userinfo_url.trim_end_matches('/'));
            // Token may lack the user:email scope; the profile is still usable.
            if let Ok(emails) = fetch_json(http, &emails_url, access_token).await {
                if let (Some(primary), Some(profile)) = (primary_email(&emails), user.as_object_mut()) {
                    profile.insert("email".to_string(), Value::String(primary));
                }
            }
        }

        Ok(user)
    }

    fn map_user(&self, raw: &Value) -> User {
        User {
            id: field(raw, "id").unwrap_or_default(),
            nickname: field(raw, "login"),
            name: field(raw, "name"),
            email: field(raw, "email"),
            avatar: field(raw, "avatar_url"),
            ..User::default()
        }
    }
}

fn primary_email(emails: &Value) -> Option<String> {
    emails.as_array()?.iter().find_map(|entry| {
        let primary = entry.get("primary").and_then(Value::as_bool).unwrap_or(false);
        let verified = entry.get("verified").and_then(Value::as_bool).unwrap_or(false);
        (primary && verified).then(|| field(entry, "email")).flatten()
    })
}
