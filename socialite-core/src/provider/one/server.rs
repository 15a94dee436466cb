//! OAuth1 (RFC 5849) signing client
//!
//! Signs every request with HMAC-SHA1 and performs the three legs of the
//! flow: temporary credentials, user authorization, token credentials.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use http::Method;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha1::Sha1;
use std::collections::HashMap;
use tracing::debug;
use url::Url;

use crate::config::scalar_to_string;
use crate::{Error, Result};

/// RFC 3986 unreserved characters are the only ones left unescaped
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const SIGNATURE_METHOD: &str = "HMAC-SHA1";

/// Application credentials of an OAuth1 client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub identifier: String,
    pub secret: String,
    pub callback_uri: Option<String>,
}

/// Temporary or token credentials issued by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub identifier: String,
    pub secret: String,
}

/// OAuth1 server endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoints {
    pub temporary_credentials: String,
    pub authorize: String,
    pub token_credentials: String,
    pub user_details: String,
}

impl ServerEndpoints {
    #[must_use]
    pub fn twitter() -> Self {
        Self {
            temporary_credentials: "https://api.twitter.com/oauth/request_token".to_string(),
            authorize: "https://api.twitter.com/oauth/authenticate".to_string(),
            token_credentials: "https://api.twitter.com/oauth/access_token".to_string(),
            user_details:
                "https://api.twitter.com/1.1/account/verify_credentials.json?include_email=true"
                    .to_string(),
        }
    }

    /// Apply `request_token_url`, `authorize_url`, `access_token_url` and
    /// `user_details_url` overrides from the server configuration
    fn with_overrides(mut self, config: &Map<String, Value>) -> Self {
        for (key, target) in [
            ("request_token_url", &mut self.temporary_credentials),
            ("authorize_url", &mut self.authorize),
            ("access_token_url", &mut self.token_credentials),
            ("user_details_url", &mut self.user_details),
        ] {
            if let Some(url) = config.get(key).and_then(Value::as_str) {
                *target = url.to_string();
            }
        }
        self
    }
}

/// Upstream OAuth1 client
///
/// Built from the OAuth1 view of the application configuration
/// (`identifier`, `secret`, `callback_uri`), which it keeps verbatim.
#[derive(Debug, Clone)]
pub struct OAuth1Server {
    credentials: ClientCredentials,
    endpoints: ServerEndpoints,
    config: Map<String, Value>,
    http: reqwest::Client,
}

impl OAuth1Server {
    /// Twitter server from a formatted configuration
    pub fn twitter(config: Map<String, Value>) -> Result<Self> {
        Self::new(config, ServerEndpoints::twitter())
    }

    /// # Errors
    /// Returns `InvalidInput` when `identifier` or `secret` is missing or not
    /// a scalar value.
    pub fn new(config: Map<String, Value>, endpoints: ServerEndpoints) -> Result<Self> {
        let required = |key: &str| {
            config
                .get(key)
                .and_then(scalar_to_string)
                .ok_or_else(|| Error::InvalidInput(format!("OAuth1 server config requires '{key}'")))
        };

        let credentials = ClientCredentials {
            identifier: required("identifier")?,
            secret: required("secret")?,
            callback_uri: config.get("callback_uri").and_then(scalar_to_string),
        };
        let endpoints = endpoints.with_overrides(&config);

        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            credentials,
            endpoints,
            config,
            http,
        })
    }

    /// Configuration the server was built from
    #[must_use]
    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    #[must_use]
    pub fn client_credentials(&self) -> &ClientCredentials {
        &self.credentials
    }

    #[must_use]
    pub fn endpoints(&self) -> &ServerEndpoints {
        &self.endpoints
    }

    /// Obtain temporary credentials (request token)
    pub async fn temporary_credentials(&self) -> Result<Credentials> {
        let url = Url::parse(&self.endpoints.temporary_credentials)?;
        let callback: Vec<(String, String)> = self
            .credentials
            .callback_uri
            .iter()
            .map(|uri| ("oauth_callback".to_string(), uri.clone()))
            .collect();
        let header = self.authorization_header(&Method::POST, &url, None, &callback, &[])?;

        let body = self
            .http
            .post(url)
            .header(AUTHORIZATION, header)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let params = parse_form(&body);

        if params.get("oauth_callback_confirmed").map(String::as_str) != Some("true") {
            return Err(Error::Authentication(
                "Error in retrieving temporary credentials".to_string(),
            ));
        }

        debug!("Obtained OAuth1 temporary credentials");
        credentials_from(&params)
    }

    /// URL the user is sent to for authorizing the temporary credentials
    pub fn authorization_url(&self, temporary: &Credentials) -> Result<Url> {
        let mut url = Url::parse(&self.endpoints.authorize)?;
        url.query_pairs_mut()
            .append_pair("oauth_token", &temporary.identifier);
        Ok(url)
    }

    /// Exchange authorized temporary credentials for token credentials
    ///
    /// # Errors
    /// Returns `Authentication` when `token` does not match the stored
    /// temporary identifier.
    pub async fn token_credentials(
        &self,
        temporary: &Credentials,
        token: &str,
        verifier: &str,
    ) -> Result<Credentials> {
        if token != temporary.identifier {
            return Err(Error::Authentication(
                "Temporary identifier passed back by server does not match stored temporary credentials"
                    .to_string(),
            ));
        }

        let url = Url::parse(&self.endpoints.token_credentials)?;
        let body = [("oauth_verifier".to_string(), verifier.to_string())];
        let header =
            self.authorization_header(&Method::POST, &url, Some(temporary), &[], &body)?;

        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, header)
            .form(&body)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        credentials_from(&parse_form(&response))
    }

    /// Fetch the profile of the user owning `token`
    pub async fn user_details(&self, token: &Credentials) -> Result<Value> {
        let url = Url::parse(&self.endpoints.user_details)?;
        let header = self.authorization_header(&Method::GET, &url, Some(token), &[], &[])?;

        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, header)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    /// `Authorization: OAuth ...` header value for a request
    ///
    /// `protocol` holds extra `oauth_*` parameters, `body` the form body; both
    /// are covered by the signature, only `protocol` goes into the header.
    pub fn authorization_header(
        &self,
        method: &Method,
        url: &Url,
        token: Option<&Credentials>,
        protocol: &[(String, String)],
        body: &[(String, String)],
    ) -> Result<String> {
        let mut params = vec![
            (
                "oauth_consumer_key".to_string(),
                self.credentials.identifier.clone(),
            ),
            ("oauth_nonce".to_string(), nanoid::nanoid!(32)),
            (
                "oauth_signature_method".to_string(),
                SIGNATURE_METHOD.to_string(),
            ),
            (
                "oauth_timestamp".to_string(),
                chrono::Utc::now().timestamp().to_string(),
            ),
            ("oauth_version".to_string(), "1.0".to_string()),
        ];
        if let Some(token) = token {
            params.push(("oauth_token".to_string(), token.identifier.clone()));
        }
        params.extend_from_slice(protocol);

        let mut signed = params.clone();
        signed.extend_from_slice(body);
        let base = Self::signature_base_string(method, url, &signed);
        let signature = self.sign(&base, token.map(|t| t.secret.as_str()))?;
        params.push(("oauth_signature".to_string(), signature));
        params.sort();

        let fields: Vec<String> = params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect();
        Ok(format!("OAuth {}", fields.join(", ")))
    }

    /// Signature base string (RFC 5849 section 3.4.1)
    ///
    /// Query parameters of `url` are included alongside `params`.
    #[must_use]
    pub fn signature_base_string(method: &Method, url: &Url, params: &[(String, String)]) -> String {
        let mut base_url = url.clone();
        base_url.set_query(None);
        base_url.set_fragment(None);

        let mut encoded: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (encode(&k), encode(&v)))
            .chain(params.iter().map(|(k, v)| (encode(k), encode(v))))
            .collect();
        encoded.sort();

        let normalized: Vec<String> = encoded.iter().map(|(k, v)| format!("{k}={v}")).collect();

        format!(
            "{}&{}&{}",
            method.as_str().to_ascii_uppercase(),
            encode(base_url.as_str()),
            encode(&normalized.join("&"))
        )
    }

    /// HMAC-SHA1 signature keyed with the client and token secrets
    pub fn sign(&self, base_string: &str, token_secret: Option<&str>) -> Result<String> {
        let key = format!(
            "{}&{}",
            encode(&self.credentials.secret),
            encode(token_secret.unwrap_or_default())
        );
        let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes())
            .map_err(|e| Error::Internal(format!("Invalid HMAC key: {e}")))?;
        mac.update(base_string.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

fn parse_form(body: &str) -> HashMap<String, String> {
    serde_urlencoded::from_str(body).unwrap_or_default()
}

fn credentials_from(params: &HashMap<String, String>) -> Result<Credentials> {
    match (params.get("oauth_token"), params.get("oauth_token_secret")) {
        (Some(identifier), Some(secret)) => Ok(Credentials {
            identifier: identifier.clone(),
            secret: secret.clone(),
        }),
        _ => Err(Error::Authentication(
            "Server response is missing oauth_token/oauth_token_secret".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn server(secret: &str) -> OAuth1Server {
        let config = json!({
            "identifier": "9djdj82h48djs9d2",
            "secret": secret,
            "callback_uri": "https://x/cb",
        });
        match config {
            Value::Object(map) => OAuth1Server::twitter(map).unwrap(),
            _ => unreachable!(),
        }
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_requires_identifier_and_secret() {
        let config = match json!({"secret": "s"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        assert!(matches!(
            OAuth1Server::twitter(config),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_endpoint_overrides() {
        let config = match json!({
            "identifier": "i",
            "secret": "s",
            "request_token_url": "http://127.0.0.1:9/oauth/request_token",
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let server = OAuth1Server::twitter(config).unwrap();
        assert_eq!(
            server.endpoints().temporary_credentials,
            "http://127.0.0.1:9/oauth/request_token"
        );
        assert_eq!(server.endpoints().authorize, ServerEndpoints::twitter().authorize);
        assert!(server.client_credentials().callback_uri.is_none());
    }

    // Example from RFC 5849 section 3.4.1.1
    #[test]
    fn test_signature_base_string_and_signature() {
        let url = Url::parse("http://example.com/request?b5=%3D%253D&a3=a&c%40=&a2=r%20b").unwrap();
        let params = pairs(&[
            ("oauth_consumer_key", "9djdj82h48djs9d2"),
            ("oauth_token", "kkk9d7dh3k39sjv7"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "137131201"),
            ("oauth_nonce", "7d8f3e4a"),
            ("c2", ""),
            ("a3", "2 q"),
        ]);

        let base = OAuth1Server::signature_base_string(&Method::POST, &url, &params);
        assert_eq!(
            base,
            "POST&http%3A%2F%2Fexample.com%2Frequest&a2%3Dr%2520b%26a3%3D2%2520q%26a3%3Da%26\
             b5%3D%253D%25253D%26c%2540%3D%26c2%3D%26oauth_consumer_key%3D9djdj82h48djs9d2%26\
             oauth_nonce%3D7d8f3e4a%26oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D\
             137131201%26oauth_token%3Dkkk9d7dh3k39sjv7"
        );

        let signature = server("j49sk3j29djd")
            .sign(&base, Some("dh893hdasih9"))
            .unwrap();
        assert_eq!(signature, "r6/TJjbCOr97/+UU0NsvSne7s5g=");
    }

    #[test]
    fn test_sign_without_token_secret() {
        let base = "POST&https%3A%2F%2Fapi.twitter.com%2Foauth%2Frequest_token&oauth_callback%3Dhttps%253A%252F%252Fx%252Fcb";
        let server = server("s3c");
        assert_eq!(server.sign(base, None).unwrap(), "5VILI0XKTl1/Ve9OZTKPwtjQJB0=");
        assert_eq!(
            server.sign(base, Some("tsecret")).unwrap(),
            "cnXIA8TS/8h6N8GT8x7ewkaotHc="
        );
    }

    #[test]
    fn test_authorization_header_fields() {
        let server = server("s3c");
        let url = Url::parse("https://api.twitter.com/oauth/request_token").unwrap();
        let header = server
            .authorization_header(
                &Method::POST,
                &url,
                None,
                &pairs(&[("oauth_callback", "https://x/cb")]),
                &[],
            )
            .unwrap();

        assert!(header.starts_with("OAuth "));
        assert!(header.contains("oauth_callback=\"https%3A%2F%2Fx%2Fcb\""));
        assert!(header.contains("oauth_consumer_key=\"9djdj82h48djs9d2\""));
        assert!(header.contains("oauth_signature_method=\"HMAC-SHA1\""));
        assert!(header.contains("oauth_signature=\""));
        assert!(!header.contains("oauth_token="));
    }

    #[test]
    fn test_authorization_url() {
        let server = server("s3c");
        let url = server
            .authorization_url(&Credentials {
                identifier: "temp-token".to_string(),
                secret: "temp-secret".to_string(),
            })
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.twitter.com/oauth/authenticate?oauth_token=temp-token"
        );
    }

    #[tokio::test]
    async fn test_token_mismatch_rejected() {
        let temporary = Credentials {
            identifier: "temp-token".to_string(),
            secret: "temp-secret".to_string(),
        };
        let result = server("s3c")
            .token_credentials(&temporary, "other-token", "verifier")
            .await;
        assert!(matches!(result, Err(Error::Authentication(_))));
    }
}
