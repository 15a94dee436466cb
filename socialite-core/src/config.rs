//! Application configuration for social login drivers
//!
//! A [`ProviderConfig`] is the static per-application credential set handed to
//! [`SocialiteManager`](crate::SocialiteManager). [`ConfigLoader`] builds them
//! from a config file and `SOCIALITE__*` environment variables.

use anyhow::Context;
use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{Error, Result};

/// Keys every driver configuration must define
pub const REQUIRED_KEYS: [&str; 3] = ["client_id", "redirect", "client_secret"];

/// Immutable driver configuration
///
/// Holds the raw key/value mapping verbatim. Only presence of
/// [`REQUIRED_KEYS`] is checked; their values may be empty. Any extra keys
/// (`scopes`, `parameters`, endpoint overrides, ...) are passed through to
/// providers untouched. Cloning shares the underlying map.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    values: Arc<Map<String, Value>>,
}

impl ProviderConfig {
    /// Validate and wrap a configuration mapping
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if `client_id`, `redirect` or
    /// `client_secret` is absent (a JSON `null` counts as absent).
    pub fn new(values: Map<String, Value>) -> Result<Self> {
        if let Some(missing) = REQUIRED_KEYS
            .iter()
            .find(|key| values.get(**key).is_none_or(Value::is_null))
        {
            warn!(missing_key = %missing, "Rejected driver configuration");
            return Err(Error::InvalidConfiguration(
                "client_id/redirect/client_secret is required".to_string(),
            ));
        }

        Ok(Self {
            values: Arc::new(values),
        })
    }

    /// Validate a JSON value, which must be an object
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Self::new(map),
            other => Err(Error::InvalidConfiguration(format!(
                "driver configuration must be a mapping, got {other}"
            ))),
        }
    }

    /// Parse a YAML document into a configuration
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(yaml)
            .map_err(|e| Error::InvalidConfiguration(format!("Failed to parse YAML: {e}")))?;
        Self::from_value(value)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// String value for `key`, `None` when absent or not a string
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Boolean flag, accepting `true` or the string `"true"`
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        match self.values.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    /// String value for a key that must be present
    pub fn require_str(&self, key: &str) -> Result<&str> {
        match self.values.get(key) {
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(Error::InvalidInput(format!(
                "config key '{key}' must be a string, got {other}"
            ))),
            None => Err(Error::InvalidInput(format!("config key '{key}' is missing"))),
        }
    }

    pub fn client_id(&self) -> Result<&str> {
        self.require_str("client_id")
    }

    pub fn client_secret(&self) -> Result<&str> {
        self.require_str("client_secret")
    }

    pub fn redirect(&self) -> Result<&str> {
        self.require_str("redirect")
    }

    /// Requested scopes, from either a list or a comma/space separated string
    #[must_use]
    pub fn scopes(&self) -> Option<Vec<String>> {
        match self.values.get("scopes")? {
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(ToString::to_string)
                    .collect(),
            ),
            Value::String(s) => Some(
                s.split([',', ' '])
                    .filter(|scope| !scope.is_empty())
                    .map(ToString::to_string)
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Extra authorization parameters from the `parameters` mapping
    #[must_use]
    pub fn parameters(&self) -> Vec<(String, String)> {
        self.values
            .get("parameters")
            .and_then(Value::as_object)
            .map(|params| {
                params
                    .iter()
                    .filter_map(|(k, v)| scalar_to_string(v).map(|v| (k.clone(), v)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Configuration view expected by OAuth1 servers
    ///
    /// `identifier`, `secret` and `callback_uri` default to `client_id`,
    /// `client_secret` and `redirect`; every original entry is then laid on
    /// top, so an original key of the same name wins.
    #[must_use]
    pub fn format_oauth1(&self) -> Map<String, Value> {
        let mut formatted = Map::new();
        for (synthetic, source) in [
            ("identifier", "client_id"),
            ("secret", "client_secret"),
            ("callback_uri", "redirect"),
        ] {
            formatted.insert(
                synthetic.to_string(),
                self.values.get(source).cloned().unwrap_or_default(),
            );
        }
        for (key, value) in self.values.iter() {
            formatted.insert(key.clone(), value.clone());
        }
        formatted
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Whether both handles share the same underlying mapping
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }
}

impl TryFrom<Map<String, Value>> for ProviderConfig {
    type Error = Error;

    fn try_from(values: Map<String, Value>) -> Result<Self> {
        Self::new(values)
    }
}

impl TryFrom<Value> for ProviderConfig {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

/// Render strings, numbers and booleans as text
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

/// Layered configuration loader
///
/// Sources, lowest priority first:
/// 1. Config file (TOML, YAML or JSON, picked by extension)
/// 2. Environment variables (`SOCIALITE__PROVIDERS__GITHUB__CLIENT_ID`, ...)
///
/// Driver sections live under `providers.<driver>`, logging under `logging`:
///
/// ```toml
/// [logging]
/// level = "debug"
///
/// [providers.github]
/// client_id = "..."
/// client_secret = "..."
/// redirect = "https://example.com/auth/github/callback"
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    raw: Map<String, Value>,
}

impl ConfigLoader {
    pub fn load(config_file: Option<&str>) -> anyhow::Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            } else {
                warn!(path, "Config file not found, using environment only");
            }
        }

        // Values stay strings: numeric-looking client ids must not be coerced.
        builder = builder.add_source(Environment::with_prefix("SOCIALITE").separator("__"));

        let raw: Map<String, Value> = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to decode configuration")?;

        info!("Loaded socialite configuration");

        Ok(Self { raw })
    }

    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        Self::load(Some(path))
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::load(None)
    }

    /// Wrap an already parsed configuration tree
    #[must_use]
    pub fn from_map(raw: Map<String, Value>) -> Self {
        Self { raw }
    }

    /// Configuration for one driver, validated
    pub fn load_section(&self, driver: &str) -> Result<ProviderConfig> {
        let section = self
            .providers()
            .and_then(|providers| providers.get(driver))
            .ok_or_else(|| {
                Error::InvalidConfiguration(format!("No configuration for driver '{driver}'"))
            })?;
        ProviderConfig::from_value(section.clone())
    }

    /// Names of all configured driver sections
    #[must_use]
    pub fn drivers(&self) -> Vec<String> {
        self.providers()
            .map(|providers| providers.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn logging(&self) -> anyhow::Result<LoggingConfig> {
        match self.raw.get("logging") {
            Some(value) => serde_json::from_value(value.clone())
                .context("Failed to decode section 'logging'"),
            None => Ok(LoggingConfig::default()),
        }
    }

    fn providers(&self) -> Option<&Map<String, Value>> {
        self.raw.get("providers").and_then(Value::as_object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test fixture must be an object"),
        }
    }

    #[test]
    fn test_missing_required_key_is_rejected() {
        for missing in REQUIRED_KEYS {
            let mut values = map(json!({
                "client_id": "abc",
                "client_secret": "s3c",
                "redirect": "https://x/cb",
                "scopes": ["email"],
            }));
            values.remove(missing);
            let err = ProviderConfig::new(values).unwrap_err();
            assert!(matches!(err, Error::InvalidConfiguration(_)), "missing {missing}");
        }
    }

    #[test]
    fn test_null_counts_as_missing() {
        let err = ProviderConfig::from_value(json!({
            "client_id": null,
            "client_secret": "s3c",
            "redirect": "https://x/cb",
        }))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }

    #[test]
    fn test_empty_values_are_present() {
        let config = ProviderConfig::from_value(json!({
            "client_id": "",
            "client_secret": "",
            "redirect": "",
        }))
        .unwrap();
        assert_eq!(config.client_id().unwrap(), "");
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(matches!(
            ProviderConfig::from_value(json!(["client_id"])),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_format_oauth1_defaults() {
        let config = ProviderConfig::from_value(json!({
            "client_id": "abc",
            "client_secret": "s3c",
            "redirect": "https://x/cb",
        }))
        .unwrap();
        let formatted = config.format_oauth1();
        assert_eq!(formatted["identifier"], "abc");
        assert_eq!(formatted["secret"], "s3c");
        assert_eq!(formatted["callback_uri"], "https://x/cb");
        assert_eq!(formatted["client_id"], "abc");
    }

    #[test]
    fn test_format_oauth1_original_keys_win() {
        let config = ProviderConfig::from_value(json!({
            "client_id": "abc",
            "client_secret": "s3c",
            "redirect": "https://x/cb",
            "identifier": "override",
        }))
        .unwrap();
        let formatted = config.format_oauth1();
        assert_eq!(formatted["identifier"], "override");
        assert_eq!(formatted["secret"], "s3c");
        assert_eq!(formatted["callback_uri"], "https://x/cb");
    }

    #[test]
    fn test_scopes_forms() {
        let list = ProviderConfig::from_value(json!({
            "client_id": "a", "client_secret": "b", "redirect": "c",
            "scopes": ["user:email", "read:org"],
        }))
        .unwrap();
        assert_eq!(list.scopes().unwrap(), vec!["user:email", "read:org"]);

        let joined = ProviderConfig::from_value(json!({
            "client_id": "a", "client_secret": "b", "redirect": "c",
            "scopes": "email, public_profile",
        }))
        .unwrap();
        assert_eq!(joined.scopes().unwrap(), vec!["email", "public_profile"]);
    }

    #[test]
    fn test_require_str_type_mismatch() {
        let config = ProviderConfig::from_value(json!({
            "client_id": 42, "client_secret": "b", "redirect": "c",
        }))
        .unwrap();
        assert!(matches!(config.client_id(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_from_yaml_str() {
        let config = ProviderConfig::from_yaml_str(
            "client_id: abc\nclient_secret: s3c\nredirect: https://x/cb\nstateless: true\n",
        )
        .unwrap();
        assert_eq!(config.get_str("client_id"), Some("abc"));
        assert!(config.flag("stateless"));
    }

    #[test]
    fn test_loader_sections() {
        let loader = ConfigLoader::from_map(map(json!({
            "providers": {
                "github": {"client_id": "a", "client_secret": "b", "redirect": "c"},
                "broken": {"client_id": "a"},
            }
        })));
        let mut drivers = loader.drivers();
        drivers.sort();
        assert_eq!(drivers, vec!["broken", "github"]);
        assert!(loader.load_section("github").is_ok());
        assert!(matches!(
            loader.load_section("broken"),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(
            loader.load_section("gitlab"),
            Err(Error::InvalidConfiguration(_))
        ));
        assert_eq!(loader.logging().unwrap().level, "info");
    }
}
