//! Facebook OAuth2 provider

use serde_json::Value;

use super::{field, AbstractProvider, Endpoints, ProviderSpec, TokenAuth};
use crate::provider::User;

static ENDPOINTS: Endpoints = Endpoints {
    authorize_url: "https://www.facebook.com/v19.0/dialog/oauth",
    token_url: "https://graph.facebook.com/v19.0/oauth/access_token",
    userinfo_url: "https://graph.facebook.com/v19.0/me?fields=id,name,email,picture.type(large)",
    default_scopes: &["email"],
    authorize_params: &[],
    token_auth: TokenAuth::RequestBody,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct Facebook;

pub type FacebookProvider = AbstractProvider<Facebook>;

impl ProviderSpec for Facebook {
    const NAME: &'static str = "facebook";

    fn endpoints(&self) -> &'static Endpoints {
        &ENDPOINTS
    }

    fn map_user(&self, raw: &Value) -> User {
        User {
            id: field(raw, "id").unwrap_or_default(),
            nickname: None,
            name: field(raw, "name"),
            email: field(raw, "email"),
            avatar: field(raw, "picture.data.url"),
            ..User::default()
        }
    }
}
