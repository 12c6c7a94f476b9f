//! # Runtime Configuration
//!
//! Sources, later wins:
//!
//! 1. Built-in defaults
//! 2. Properties file (`SUBMAN_PROPERTIES`, default `solace.properties`)
//! 3. Environment variables
//!
//! | Property | Environment | Required |
//! |----------|-------------|----------|
//! | `solace.host` | `SUBMAN_HOST` | yes |
//! | `solace.username` | `SUBMAN_USERNAME` | yes |
//! | `solace.password` | `SUBMAN_PASSWORD` | yes |
//! | `solace.vpn` | `SUBMAN_VPN` | yes |
//! | `solace.client_name` | `SUBMAN_CLIENT_NAME` | no |
//! | `subman.namespace` | `SUBMAN_NAMESPACE` | no (`bofa`) |
//! | `subman.request_topic` | `SUBMAN_REQUEST_TOPIC` | no |
//! | `subman.call_timeout_ms` | `SUBMAN_CALL_TIMEOUT_MS` | no |
//! | `subman.entitlements` | `SUBMAN_ENTITLEMENTS` | no (static catalog) |
//! | | `SUBMAN_DEMO_REQUESTER` | no |

use shared_bus::SessionProperties;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use subman_provisioning::{ConfigError, Credentials, PolicyChoice, ProvisioningConfig};

use crate::demo::DemoRequester;
use crate::telemetry::TelemetryConfig;
use crate::RuntimeError;

/// Environment variable naming the properties file.
pub const PROPERTIES_ENV: &str = "SUBMAN_PROPERTIES";

/// Properties file read when `SUBMAN_PROPERTIES` is unset.
pub const DEFAULT_PROPERTIES_FILE: &str = "solace.properties";

/// Parsed `key=value` pairs.
pub type Properties = HashMap<String, String>;

/// Broker connection settings.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BrokerConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub vpn: String,
    /// Client name to register; the broker picks one when `None`.
    pub client_name: Option<String>,
}

impl BrokerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("host", &self.host),
            ("username", &self.username),
            ("password", &self.password),
            ("vpn", &self.vpn),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(field));
            }
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }

    pub fn session_properties(&self) -> SessionProperties {
        let properties = SessionProperties::new(
            self.host.clone(),
            self.username.clone(),
            self.password.clone(),
            self.vpn.clone(),
        );
        match &self.client_name {
            Some(name) => properties.with_client_name(name.clone()),
            None => properties,
        }
    }
}

impl fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("vpn", &self.vpn)
            .field("client_name", &self.client_name)
            .finish()
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    pub broker: BrokerConfig,
    pub provisioning: ProvisioningConfig,
    pub telemetry: TelemetryConfig,
    /// Requester to simulate after startup.
    pub demo: Option<DemoRequester>,
    /// Properties file the settings were read from, if any.
    pub source: Option<PathBuf>,
}

impl RuntimeConfig {
    /// Load from the properties file and the process environment, then validate.
    pub fn load() -> Result<Self, RuntimeError> {
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        let (path, explicit) = match env(PROPERTIES_ENV) {
            Some(path) => (PathBuf::from(path), true),
            None => (PathBuf::from(DEFAULT_PROPERTIES_FILE), false),
        };
        let (properties, source) = if explicit || path.exists() {
            (read_properties(&path)?, Some(path))
        } else {
            (Properties::new(), None)
        };

        let mut config = Self::from_sources(&properties, env)?;
        config.source = source;
        config.validate()?;
        Ok(config)
    }

    /// Merge properties and an environment lookup over the defaults.
    pub fn from_sources(
        properties: &Properties,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let setting = |env_key: &str, property: &str| {
            env(env_key).or_else(|| properties.get(property).cloned())
        };

        let broker = BrokerConfig {
            host: setting("SUBMAN_HOST", "solace.host").unwrap_or_default(),
            username: setting("SUBMAN_USERNAME", "solace.username").unwrap_or_default(),
            password: setting("SUBMAN_PASSWORD", "solace.password").unwrap_or_default(),
            vpn: setting("SUBMAN_VPN", "solace.vpn").unwrap_or_default(),
            client_name: setting("SUBMAN_CLIENT_NAME", "solace.client_name"),
        };

        let mut provisioning = ProvisioningConfig::default();
        if let Some(namespace) = setting("SUBMAN_NAMESPACE", "subman.namespace") {
            provisioning.namespace = namespace;
        }
        provisioning.request_topic = setting("SUBMAN_REQUEST_TOPIC", "subman.request_topic");
        if let Some(raw) = setting("SUBMAN_CALL_TIMEOUT_MS", "subman.call_timeout_ms") {
            let millis: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "subman.call_timeout_ms".to_string(),
                value: raw.clone(),
            })?;
            provisioning.call_timeout = Some(Duration::from_millis(millis));
        }
        if let Some(table) = setting("SUBMAN_ENTITLEMENTS", "subman.entitlements") {
            provisioning.policy = PolicyChoice::EntitlementTable(table);
        }

        let demo = env("SUBMAN_DEMO_REQUESTER")
            .map(|raw| raw.parse::<DemoRequester>())
            .transpose()?;

        Ok(Self {
            broker,
            provisioning,
            telemetry: TelemetryConfig::from_lookup(&env),
            demo,
            source: None,
        })
    }

    /// Fail fast before any connection is attempted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.broker.validate()?;
        self.provisioning.validate()
    }
}

/// Read a properties file.
pub fn read_properties(path: &Path) -> Result<Properties, RuntimeError> {
    let text = std::fs::read_to_string(path).map_err(|source| RuntimeError::PropertiesFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_properties(&text))
}

/// Parse Java-style properties: `key=value`, `key: value` or `key value`,
/// `#`/`!` comments, trailing `\` continues a line.
pub fn parse_properties(text: &str) -> Properties {
    let mut properties = Properties::new();
    let mut pending = String::new();

    for line in text.lines() {
        let line = line.trim_start();
        if pending.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
            continue;
        }
        if let Some(continued) = line.strip_suffix('\\') {
            pending.push_str(continued);
            continue;
        }
        pending.push_str(line);

        let entry = std::mem::take(&mut pending);
        if let Some((key, value)) = split_entry(&entry) {
            properties.insert(key, value);
        }
    }
    if let Some((key, value)) = split_entry(&pending) {
        properties.insert(key, value);
    }
    properties
}

fn split_entry(entry: &str) -> Option<(String, String)> {
    let entry = entry.trim();
    if entry.is_empty() {
        return None;
    }
    // Key ends at the first '=', ':' or whitespace; whitespace may be followed
    // by one '=' or ':'.
    let Some(idx) = entry.find(|c: char| c == '=' || c == ':' || c.is_whitespace()) else {
        return Some((entry.to_string(), String::new()));
    };
    let (key, rest) = entry.split_at(idx);
    let rest = rest.trim_start();
    let value = rest
        .strip_prefix(['=', ':'])
        .unwrap_or(rest)
        .trim();
    Some((key.to_string(), value.to_string()))
}
