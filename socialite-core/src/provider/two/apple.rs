//! Sign in with Apple
//!
//! Apple has no profile endpoint. The identity comes from the claims of the
//! `id_token` returned by the token endpoint, and the callback is delivered
//! as a form POST. `client_secret` must be the signed client JWT.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

use super::{field, AbstractProvider, Endpoints, OAuth2Token, ProviderSpec, TokenAuth};
use crate::provider::User;
use crate::{Error, Result};

static ENDPOINTS: Endpoints = Endpoints {
    authorize_url: "https://appleid.apple.com/auth/authorize",
    token_url: "https://appleid.apple.com/auth/token",
    userinfo_url: "",
    default_scopes: &["name", "email"],
    authorize_params: &[("response_mode", "form_post")],
    token_auth: TokenAuth::RequestBody,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct Apple;

pub type AppleProvider = AbstractProvider<Apple>;

#[async_trait]
impl ProviderSpec for Apple {
    const NAME: &'static str = "apple";

    fn endpoints(&self) -> &'static Endpoints {
        &ENDPOINTS
    }

    async fn fetch_user(
        &self,
        _http: &reqwest::Client,
        _userinfo_url: &str,
        token: &OAuth2Token,
    ) -> Result<Value> {
        let id_token = token
            .extra_fields()
            .id_token
            .as_deref()
            .ok_or_else(|| Error::Authentication("Apple token response has no id_token".into()))?;
        id_token_claims(id_token)
    }

    fn map_user(&self, raw: &Value) -> User {
        User {
            id: field(raw, "sub").unwrap_or_default(),
            nickname: None,
            name: None,
            email: field(raw, "email"),
            avatar: None,
            ..User::default()
        }
    }
}

/// Decode the claims segment of an ID token
///
/// The token was received directly from the token endpoint over TLS, so the
/// signature is not re-validated here.
pub fn id_token_claims(id_token: &str) -> Result<Value> {
    let payload = id_token
        .split('.')
        .nth(1)
        .ok_or_else(|| Error::Authentication("Malformed id_token".to_string()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| Error::Authentication(format!("Malformed id_token payload: {e}")))?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token_with(claims: &Value) -> String {
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","kid":"k1"}"#),
            URL_SAFE_NO_PAD.encode(claims.to_string())
        )
    }

    #[test]
    fn test_id_token_claims() {
        let claims = json!({"sub": "001122.abc", "email": "x@privaterelay.appleid.com"});
        let decoded = id_token_claims(&token_with(&claims)).unwrap();
        assert_eq!(decoded, claims);

        let user = Apple.map_user(&decoded);
        assert_eq!(user.id, "001122.abc");
        assert_eq!(user.email.as_deref(), Some("x@privaterelay.appleid.com"));
    }

    #[test]
    fn test_malformed_id_token() {
        assert!(matches!(
            id_token_claims("no-dots"),
            Err(Error::Authentication(_))
        ));
        assert!(matches!(
            id_token_claims("a.!!!.c"),
            Err(Error::Authentication(_))
        ));
    }
}
