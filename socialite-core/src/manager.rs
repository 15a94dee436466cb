//! Driver resolution
//!
//! # Architecture
//!
//! 1. **Driver registry**: fixed table of short names -> [`Driver`], each with
//!    a default `(request, config, session)` constructor
//! 2. **Specialised constructors**: drivers that need a differently shaped
//!    upstream client (only `twitter`) are built by the manager itself
//! 3. **Extension registry**: host-wide map of type identifier -> factory for
//!    custom providers, consulted for names that are not registered drivers

use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use crate::config::ProviderConfig;
use crate::provider::one::{OAuth1Server, TwitterProvider};
use crate::provider::two::{self, Apple, Bitbucket, Facebook, Github, Google, LinkedIn};
use crate::provider::{Protocol, ProviderContext, ProviderInstance};
use crate::request::RequestHandle;
use crate::session::{new_session, SessionHandle};
use crate::{Error, Result};

/// Constructor taking the (request, config, session) triple
pub type DriverConstructor = fn(ProviderContext) -> Result<ProviderInstance>;

/// Factory for a custom provider type registered by the host
pub type ExtensionFactory = fn(ProviderContext) -> Result<ProviderInstance>;

type SpecialisedConstructor = fn(&SocialiteManager) -> Result<ProviderInstance>;

/// Built-in drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Driver {
    Twitter,
    Github,
    Google,
    Facebook,
    Bitbucket,
    LinkedIn,
    Apple,
}

impl Driver {
    pub const ALL: [Self; 7] = [
        Self::Twitter,
        Self::Github,
        Self::Google,
        Self::Facebook,
        Self::Bitbucket,
        Self::LinkedIn,
        Self::Apple,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Twitter => "twitter",
            Self::Github => "github",
            Self::Google => "google",
            Self::Facebook => "facebook",
            Self::Bitbucket => "bitbucket",
            Self::LinkedIn => "linkedin",
            Self::Apple => "apple",
        }
    }

    /// Look up a registered short name (exact match)
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|driver| driver.name() == name)
    }

    #[must_use]
    pub fn protocol(self) -> Protocol {
        match self {
            Self::Twitter => Protocol::OAuth1,
            _ => Protocol::OAuth2,
        }
    }

    /// Default constructor; `None` for drivers that can only be built by a
    /// specialised constructor
    fn constructor(self) -> Option<DriverConstructor> {
        match self {
            Self::Twitter => None,
            Self::Github => Some(two::construct::<Github> as DriverConstructor),
            Self::Google => Some(two::construct::<Google> as DriverConstructor),
            Self::Facebook => Some(two::construct::<Facebook> as DriverConstructor),
            Self::Bitbucket => Some(two::construct::<Bitbucket> as DriverConstructor),
            Self::LinkedIn => Some(two::construct::<LinkedIn> as DriverConstructor),
            Self::Apple => Some(two::construct::<Apple> as DriverConstructor),
        }
    }

    fn specialised(self) -> Option<SpecialisedConstructor> {
        match self {
            Self::Twitter => Some(SocialiteManager::twitter_provider as SpecialisedConstructor),
            _ => None,
        }
    }
}

/// Host-wide extension registry
///
/// Written during start-up, read on every unregistered driver lookup.
static EXTENSION_REGISTRY: LazyLock<RwLock<HashMap<String, ExtensionFactory>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Register a custom provider factory under a type identifier
///
/// # Example
///
/// ```ignore
/// register_driver_factory("acme::GitlabProvider", gitlab_factory);
/// let gitlab = manager.driver("acme::GitlabProvider")?;
/// ```
pub fn register_driver_factory(type_id: &str, factory: ExtensionFactory) {
    EXTENSION_REGISTRY
        .write()
        .insert(type_id.to_string(), factory);
    info!(type_id, "Registered driver factory");
}

/// Remove a custom provider factory, returning whether one was registered
pub fn unregister_driver_factory(type_id: &str) -> bool {
    EXTENSION_REGISTRY.write().remove(type_id).is_some()
}

fn extension_factory(type_id: &str) -> Option<ExtensionFactory> {
    EXTENSION_REGISTRY.read().get(type_id).copied()
}

/// Social login driver resolver
///
/// Holds the application configuration and optional request/session handles.
/// It carries no interior mutability: a missing request handle is snapshotted
/// from the environment and a missing session is created fresh on every
/// [`driver`](Self::driver) call. Share one manager across requests and scope
/// handles per request with [`for_request`](Self::for_request).
#[derive(Debug, Clone)]
pub struct SocialiteManager {
    config: ProviderConfig,
    request: Option<RequestHandle>,
    session: Option<SessionHandle>,
}

impl SocialiteManager {
    /// Create a manager from a configuration mapping
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if `client_id`, `redirect` or
    /// `client_secret` is missing.
    pub fn new(config: Map<String, Value>) -> Result<Self> {
        Ok(Self::from_config(ProviderConfig::new(config)?))
    }

    /// Create a manager from a JSON object
    pub fn from_value(config: Value) -> Result<Self> {
        Ok(Self::from_config(ProviderConfig::from_value(config)?))
    }

    /// Create a manager from an already validated configuration
    #[must_use]
    pub fn from_config(config: ProviderConfig) -> Self {
        Self {
            config,
            request: None,
            session: None,
        }
    }

    #[must_use]
    pub fn with_request(mut self, request: RequestHandle) -> Self {
        self.request = Some(request);
        self
    }

    #[must_use]
    pub fn with_session(mut self, session: SessionHandle) -> Self {
        self.session = Some(session);
        self
    }

    /// Copy of this manager bound to one request's handles
    #[must_use]
    pub fn for_request(&self, request: RequestHandle, session: SessionHandle) -> Self {
        Self {
            config: self.config.clone(),
            request: Some(request),
            session: Some(session),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Names of the built-in drivers
    pub fn drivers() -> impl Iterator<Item = &'static str> {
        Driver::ALL.into_iter().map(Driver::name)
    }

    /// Resolve a driver by short name or registered type identifier
    ///
    /// Resolution order:
    /// 1. Built-in driver: specialised constructor if it has one, otherwise
    ///    its default constructor with (request, config, session)
    /// 2. Registered extension: constructed with (request, config, session)
    ///    and returned only if it is an OAuth2 provider
    /// 3. `UnsupportedDriver`
    ///
    /// # Errors
    /// `UnsupportedDriver` as above; construction errors are returned as-is.
    pub fn driver(&self, name: &str) -> Result<ProviderInstance> {
        if let Some(driver) = Driver::from_name(name) {
            debug!(driver = name, "Resolving built-in driver");
            if let Some(specialised) = driver.specialised() {
                return specialised(self);
            }
            if let Some(constructor) = driver.constructor() {
                return constructor(self.context());
            }
        } else if let Some(factory) = extension_factory(name) {
            debug!(driver = name, "Resolving extension driver");
            let instance = factory(self.context())?;
            if instance.is_oauth2() {
                return Ok(instance);
            }
            warn!(driver = name, "Extension driver is not an OAuth2 provider");
        }

        warn!(driver = name, "Unsupported driver requested");
        Err(Error::UnsupportedDriver(name.to_string()))
    }

    /// Request handle for provider construction
    ///
    /// The injected handle if any, otherwise a fresh environment snapshot.
    #[must_use]
    pub fn request(&self) -> RequestHandle {
        self.request.clone().unwrap_or_else(RequestHandle::from_globals)
    }

    /// Session handle for provider construction
    ///
    /// The injected handle if any, otherwise a new independent session.
    #[must_use]
    pub fn session(&self) -> SessionHandle {
        self.session.clone().unwrap_or_else(new_session)
    }

    /// OAuth1 view of the configuration handed to the Twitter server
    #[must_use]
    pub fn formatted_config(&self) -> Map<String, Value> {
        self.config.format_oauth1()
    }

    fn context(&self) -> ProviderContext {
        ProviderContext::new(self.request(), self.config.clone(), self.session())
    }

    fn twitter_provider(&self) -> Result<ProviderInstance> {
        let server = OAuth1Server::twitter(self.formatted_config())?;
        Ok(ProviderInstance::OAuth1(Box::new(TwitterProvider::new(
            self.request(),
            server,
            self.session(),
        ))))
    }
}
