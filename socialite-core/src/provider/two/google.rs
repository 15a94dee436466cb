//! Google OAuth2 provider

use serde_json::Value;

use super::{field, AbstractProvider, Endpoints, ProviderSpec, TokenAuth};
use crate::provider::User;

static ENDPOINTS: Endpoints = Endpoints {
    authorize_url: "https://accounts.google.com/o/oauth2/v2/auth",
    token_url: "https://oauth2.googleapis.com/token",
    userinfo_url: "https://www.googleapis.com/oauth2/v3/userinfo",
    default_scopes: &["openid", "profile", "email"],
    authorize_params: &[],
    token_auth: TokenAuth::RequestBody,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct Google;

pub type GoogleProvider = AbstractProvider<Google>;

impl ProviderSpec for Google {
    const NAME: &'static str = "google";

    fn endpoints(&self) -> &'static Endpoints {
        &ENDPOINTS
    }

    fn map_user(&self, raw: &Value) -> User {
        User {
            id: field(raw, "sub").unwrap_or_default(),
            nickname: field(raw, "nickname"),
            name: field(raw, "name"),
            email: field(raw, "email"),
            avatar: field(raw, "picture"),
            ..User::default()
        }
    }
}
