//! Social login driver resolution
//!
//! [`SocialiteManager`] turns a driver name into a ready-to-use OAuth1 or
//! OAuth2 provider bound to the application's credentials and the current
//! request/session.
//!
//! ```ignore
//! let manager = SocialiteManager::from_value(json!({
//!     "client_id": "...",
//!     "client_secret": "...",
//!     "redirect": "https://example.com/auth/github/callback",
//! }))?
//! .with_request(request)
//! .with_session(session);
//!
//! let github = manager.driver("github")?;
//! let redirect = github.redirect().await?;
//! // ... later, on the callback
//! let user = github.user(&CallbackParams::from_request(&callback_request)).await?;
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod manager;
pub mod provider;
pub mod request;
pub mod session;

pub use config::{ConfigLoader, LoggingConfig, ProviderConfig};
pub use error::{Error, Result};
pub use logging::{init_logging, LogFormat};
pub use manager::{
    register_driver_factory, unregister_driver_factory, Driver, DriverConstructor,
    ExtensionFactory, SocialiteManager,
};
pub use provider::{
    AccessToken, CallbackParams, OAuth1Provider, OAuth2Provider, Protocol, Provider,
    ProviderContext, ProviderInstance, RedirectInstruction, User,
};
pub use request::RequestHandle;
pub use session::{new_session, MemorySession, SessionHandle, SessionStore};
