//! Integration tests for driver resolution
//!
//! Run with: cargo test --test driver_resolution

use serde_json::{json, Value};
use std::sync::Arc;

use socialite_core::provider::two::{
    AbstractProvider, AppleProvider, BitbucketProvider, Endpoints, FacebookProvider,
    GithubProvider, GoogleProvider, LinkedInProvider, ProviderSpec, TokenAuth,
};
use socialite_core::provider::{OAuth1Server, TwitterProvider};
use socialite_core::{
    new_session, register_driver_factory, unregister_driver_factory, Error, OAuth1Provider,
    OAuth2Provider, Protocol, ProviderContext, ProviderInstance, RequestHandle,
    SocialiteManager, User,
};

fn base_config() -> Value {
    json!({
        "client_id": "abc",
        "client_secret": "s3c",
        "redirect": "https://x/cb",
    })
}

fn manager_with(extra: Value) -> SocialiteManager {
    let mut config = base_config();
    if let (Some(base), Value::Object(extra)) = (config.as_object_mut(), extra) {
        base.extend(extra);
    }
    SocialiteManager::from_value(config).expect("valid configuration")
}

/// Minimal self-hosted OAuth2 platform used as an extension
#[derive(Debug, Default)]
struct Gitea;

static GITEA: Endpoints = Endpoints {
    authorize_url: "https://git.example.com/login/oauth/authorize",
    token_url: "https://git.example.com/login/oauth/access_token",
    userinfo_url: "https://git.example.com/api/v1/user",
    default_scopes: &["read:user"],
    authorize_params: &[],
    token_auth: TokenAuth::RequestBody,
};

#[async_trait::async_trait]
impl ProviderSpec for Gitea {
    const NAME: &'static str = "gitea";

    fn endpoints(&self) -> &'static Endpoints {
        &GITEA
    }

    fn map_user(&self, raw: &Value) -> User {
        User {
            id: raw["id"].to_string(),
            nickname: raw["login"].as_str().map(ToString::to_string),
            ..User::default()
        }
    }
}

fn gitea_factory(context: ProviderContext) -> socialite_core::Result<ProviderInstance> {
    Ok(ProviderInstance::OAuth2(Box::new(
        AbstractProvider::<Gitea>::new(context)?,
    )))
}

fn oauth1_factory(context: ProviderContext) -> socialite_core::Result<ProviderInstance> {
    let server = OAuth1Server::twitter(context.config.format_oauth1())?;
    Ok(ProviderInstance::OAuth1(Box::new(TwitterProvider::new(
        context.request,
        server,
        context.session,
    ))))
}

#[test]
fn test_missing_required_key_is_rejected() {
    for missing in ["client_id", "redirect", "client_secret"] {
        let mut config = base_config();
        config.as_object_mut().unwrap().remove(missing);
        config["scopes"] = json!(["email"]);

        let result = SocialiteManager::from_value(config);
        assert!(
            matches!(result, Err(Error::InvalidConfiguration(_))),
            "missing {missing} should be rejected"
        );
    }
}

#[test]
fn test_null_required_key_is_rejected() {
    let mut config = base_config();
    config["redirect"] = Value::Null;
    assert!(matches!(
        SocialiteManager::from_value(config),
        Err(Error::InvalidConfiguration(_))
    ));
}

#[test]
fn test_extra_keys_are_accepted() {
    let manager = manager_with(json!({
        "scopes": ["email"],
        "stateless": true,
        "anything": {"nested": [1, 2, 3]},
    }));
    assert_eq!(manager.config().client_id().unwrap(), "abc");
    assert!(manager.config().contains_key("anything"));
}

#[test]
fn test_oauth2_drivers_use_injected_handles() {
    let request = RequestHandle::builder().query("code", "xyz").build();
    let session = new_session();
    let manager = manager_with(json!({}))
        .with_request(request.clone())
        .with_session(session.clone());

    for name in ["github", "google", "facebook", "bitbucket", "linkedin", "apple"] {
        let instance = manager.driver(name).unwrap();
        assert_eq!(instance.protocol(), Protocol::OAuth2);
        assert_eq!(instance.driver_name(), name);

        let matches_type = match name {
            "github" => instance.downcast_ref::<GithubProvider>().is_some(),
            "google" => instance.downcast_ref::<GoogleProvider>().is_some(),
            "facebook" => instance.downcast_ref::<FacebookProvider>().is_some(),
            "bitbucket" => instance.downcast_ref::<BitbucketProvider>().is_some(),
            "linkedin" => instance.downcast_ref::<LinkedInProvider>().is_some(),
            "apple" => instance.downcast_ref::<AppleProvider>().is_some(),
            _ => unreachable!(),
        };
        assert!(matches_type, "{name} resolved to the wrong provider type");

        let provider = instance.as_oauth2().unwrap();
        assert!(provider.request().ptr_eq(&request));
        assert!(Arc::ptr_eq(provider.session(), &session));
        assert!(provider.config().ptr_eq(manager.config()));
    }
}

#[test]
fn test_twitter_is_oauth1_with_formatted_config() {
    let session = new_session();
    let manager = manager_with(json!({})).with_session(session.clone());

    let instance = manager.driver("twitter").unwrap();
    assert!(instance.is_oauth1());
    assert!(instance.downcast_ref::<TwitterProvider>().is_some());

    let provider = instance.as_oauth1().unwrap();
    assert!(Arc::ptr_eq(provider.session(), &session));

    let credentials = provider.server().client_credentials();
    assert_eq!(credentials.identifier, "abc");
    assert_eq!(credentials.secret, "s3c");
    assert_eq!(credentials.callback_uri.as_deref(), Some("https://x/cb"));

    let config = provider.server().config();
    assert_eq!(config["client_id"], "abc");
    assert_eq!(config["identifier"], "abc");
}

#[test]
fn test_twitter_original_keys_win() {
    let manager = manager_with(json!({"identifier": "override"}));

    let formatted = manager.formatted_config();
    assert_eq!(formatted["identifier"], "override");
    assert_eq!(formatted["secret"], "s3c");
    assert_eq!(formatted["callback_uri"], "https://x/cb");

    let instance = manager.driver("twitter").unwrap();
    let server = instance.as_oauth1().unwrap().server();
    assert_eq!(server.client_credentials().identifier, "override");
    assert_eq!(server.config()["identifier"], "override");
}

#[test]
fn test_unknown_driver_names_the_driver() {
    let err = manager_with(json!({})).driver("unknown_name").unwrap_err();
    assert_eq!(err.unsupported_driver(), Some("unknown_name"));
    assert!(err.to_string().contains("unknown_name"));
}

#[test]
fn test_extension_without_oauth2_capability_is_unsupported() {
    let type_id = "tests::LegacyOAuth1Provider";
    register_driver_factory(type_id, oauth1_factory);

    let result = manager_with(json!({})).driver(type_id);
    assert!(matches!(
        result,
        Err(Error::UnsupportedDriver(ref name)) if name == type_id
    ));

    assert!(unregister_driver_factory(type_id));
}

#[test]
fn test_extension_with_oauth2_capability_is_returned() {
    let type_id = "tests::GiteaProvider";
    register_driver_factory(type_id, gitea_factory);

    let request = RequestHandle::default();
    let session = new_session();
    let manager = manager_with(json!({})).for_request(request.clone(), session.clone());

    let instance = manager.driver(type_id).unwrap();
    assert!(instance.is_oauth2());
    assert_eq!(instance.driver_name(), "gitea");

    let provider = instance.downcast_ref::<AbstractProvider<Gitea>>().unwrap();
    assert!(provider.request().ptr_eq(&request));
    assert!(Arc::ptr_eq(provider.session(), &session));
    assert_eq!(provider.scopes(), vec!["read:user".to_string()]);

    assert!(unregister_driver_factory(type_id));
    assert!(manager.driver(type_id).is_err());
}

#[test]
fn test_builtin_names_shadow_extensions() {
    let type_id = "twitter";
    register_driver_factory(type_id, gitea_factory);

    let instance = manager_with(json!({})).driver(type_id).unwrap();
    assert!(instance.is_oauth1());

    assert!(unregister_driver_factory(type_id));
}

#[test]
fn test_lazy_handles_are_not_cached() {
    let manager = manager_with(json!({}));

    let first = manager.driver("github").unwrap();
    let second = manager.driver("github").unwrap();
    let first = first.as_oauth2().unwrap();
    let second = second.as_oauth2().unwrap();

    assert!(!Arc::ptr_eq(first.session(), second.session()));
    first.session().set("state", "one".to_string());
    assert!(!second.session().has("state"));
}
