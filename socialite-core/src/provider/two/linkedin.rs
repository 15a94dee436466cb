//! LinkedIn provider (Sign In with LinkedIn using OpenID Connect)

use serde_json::Value;

use super::{field, AbstractProvider, Endpoints, ProviderSpec, TokenAuth};
use crate::provider::User;

static ENDPOINTS: Endpoints = Endpoints {
    authorize_url: "https://www.linkedin.com/oauth/v2/authorization",
    token_url: "https://www.linkedin.com/oauth/v2/accessToken",
    userinfo_url: "https://api.linkedin.com/v2/userinfo",
    default_scopes: &["openid", "profile", "email"],
    authorize_params: &[],
    token_auth: TokenAuth::RequestBody,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct LinkedIn;

pub type LinkedInProvider = AbstractProvider<LinkedIn>;

impl ProviderSpec for LinkedIn {
    const NAME: &'static str = "linkedin";

    fn endpoints(&self) -> &'static Endpoints {
        &ENDPOINTS
    }

    fn map_user(&self, raw: &Value) -> User {
        User {
            id: field(raw, "sub").unwrap_or_default(),
            nickname: None,
            name: field(raw, "name"),
            email: field(raw, "email"),
            avatar: field(raw, "picture"),
            ..User::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_user() {
        let user = LinkedIn.map_user(&json!({
            "sub": "782bbtaQ",
            "name": "John Doe",
            "email": "doe@email.com",
            "picture": "https://media.licdn.com/photo.jpg",
        }));
        assert_eq!(user.id, "782bbtaQ");
        assert_eq!(user.name.as_deref(), Some("John Doe"));
    }
}
