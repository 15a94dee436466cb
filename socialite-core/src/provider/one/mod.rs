//! OAuth1 providers
//!
//! Unlike OAuth2 drivers, an OAuth1 provider is handed a ready-made
//! [`OAuth1Server`] instead of the raw configuration.

pub mod server;
pub mod twitter;

pub use server::{ClientCredentials, Credentials, OAuth1Server, ServerEndpoints};
pub use twitter::TwitterProvider;
