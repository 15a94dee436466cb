//! Bitbucket Cloud OAuth2 provider

use async_trait::async_trait;
use oauth2::TokenResponse;
use serde_json::Value;

use super::{fetch_json, field, AbstractProvider, Endpoints, OAuth2Token, ProviderSpec, TokenAuth};
use crate::provider::User;
use crate::Result;

static ENDPOINTS: Endpoints = Endpoints {
    authorize_url: "https://bitbucket.org/site/oauth2/authorize",
    token_url: "https://bitbucket.org/site/oauth2/access_token",
    userinfo_url: "https://api.bitbucket.org/2.0/user",
    default_scopes: &["email"],
    authorize_params: &[],
    token_auth: TokenAuth::BasicAuth,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct Bitbucket;

pub type BitbucketProvider = AbstractProvider<Bitbucket>;

#[async_trait]
impl ProviderSpec for Bitbucket {
    const NAME: &'static str = "bitbucket";

    fn endpoints(&self) -> &'static Endpoints {
        &ENDPOINTS
    }

    /// The profile never carries an address; it comes from `/user/emails`
    async fn fetch_user(
        &self,
        http: &reqwest::Client,
        userinfo_url: &str,
        token: &OAuth2Token,
    ) -> Result<Value> {
        let access_token = token.access_token().secret();
        let mut user = fetch_json(http, userinfo_url, access_token).await?;

        let emails_url = format!("{}/emails", userinfo_url.trim_end_matches('/'));
        if let Ok(emails) = fetch_json(http, &emails_url, access_token).await {
            if let (Some(primary), Some(profile)) = (primary_email(&emails), user.as_object_mut()) {
                profile.insert("email".to_string(), Value::String(primary));
            }
        }

        Ok(user)
    }

    fn map_user(&self, raw: &Value) -> User {
        User {
            id: field(raw, "uuid").unwrap_or_default(),
            nickname: field(raw, "username"),
            name: field(raw, "display_name"),
            email: field(raw, "email"),
            avatar: field(raw, "links.avatar.href"),
            ..User::default()
        }
    }
}

fn primary_email(emails: &Value) -> Option<String> {
    emails.get("values")?.as_array()?.iter().find_map(|entry| {
        let primary = entry.get("is_primary").and_then(Value::as_bool).unwrap_or(false);
        let confirmed = entry.get("is_confirmed").and_then(Value::as_bool).unwrap_or(false);
        (primary && confirmed).then(|| field(entry, "email")).flatten()
    })
}
