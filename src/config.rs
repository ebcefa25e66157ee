use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SqlScopeError;

/// Defaults applied under caller-supplied options: unicode text, UTF-8, and
/// autocommit off so that writes only land on an explicit commit.
pub const SAFE_DEFAULTS: &[(&str, &str)] = &[
    ("use_unicode", "true"),
    ("charset", "utf8"),
    ("collation", "utf8_general_ci"),
    ("autocommit", "false"),
];

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3306
}

/// Parameters handed to [`Driver::connect`](crate::Driver::connect) for every new
/// connection.
///
/// The password is accepted when deserializing but never serialized or printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectParams {
    #[serde(default)]
    pub user: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    /// Database name, or file path for file-backed drivers.
    pub database: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl ConnectParams {
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            user: String::new(),
            password: String::new(),
            database: database.into(),
            host: default_host(),
            port: default_port(),
            options: BTreeMap::new(),
        }
    }

    /// Parse parameters from a JSON document.
    ///
    /// # Errors
    /// Returns `SqlScopeError::ConfigError` if the document is not valid.
    pub fn from_json(json: &str) -> Result<Self, SqlScopeError> {
        serde_json::from_str(json)
            .map_err(|e| SqlScopeError::ConfigError(format!("invalid connect params: {e}")))
    }

    #[must_use]
    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Merge [`SAFE_DEFAULTS`] under the caller's options and force result buffering on.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        for (key, value) in SAFE_DEFAULTS {
            self.options
                .entry((*key).to_string())
                .or_insert_with(|| (*value).to_string());
        }
        self.options.insert("buffered".to_string(), "true".to_string());
        self
    }

    #[must_use]
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// # Errors
    /// Returns `SqlScopeError::ConfigError` if the option is set but not a boolean.
    pub fn option_bool(&self, key: &str) -> Result<Option<bool>, SqlScopeError> {
        match self.option_str(key) {
            None => Ok(None),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Some(true)),
                "false" | "0" | "no" | "off" => Ok(Some(false)),
                _ => Err(SqlScopeError::ConfigError(format!(
                    "option '{key}' expects a boolean, got '{raw}'"
                ))),
            },
        }
    }

    /// # Errors
    /// Returns `SqlScopeError::ConfigError` if the option is set but not an integer.
    pub fn option_u64(&self, key: &str) -> Result<Option<u64>, SqlScopeError> {
        self.option_str(key)
            .map(|raw| {
                raw.parse::<u64>().map_err(|_| {
                    SqlScopeError::ConfigError(format!(
                        "option '{key}' expects an integer, got '{raw}'"
                    ))
                })
            })
            .transpose()
    }
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("options", &self.options)
            .finish()
    }
}

/// Behaviour knobs for the query layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Statements slower than this are logged at warn level.
    pub slow_query_threshold: Duration,
    /// Rewrite `?` placeholders into the driver's native syntax.
    pub translate_placeholders: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            slow_query_threshold: Duration::from_millis(100),
            translate_placeholders: true,
        }
    }
}

impl EngineOptions {
    #[must_use]
    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_translation(mut self, translate_placeholders: bool) -> Self {
        self.translate_placeholders = translate_placeholders;
        self
    }
}
