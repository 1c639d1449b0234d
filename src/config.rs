//! Configuration management
//!
//! [`AppConfig`] is built once at startup from an optional YAML file and
//! `APP_*` environment variables, then passed by reference to whatever
//! needs it. There is no global copy.

use std::{fmt, path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize, Serializer};
use url::Url;

use crate::i18n::DEFAULT_LANGUAGE;
use crate::{Error, Result};

/// Prefix of environment variables read by [`AppConfig::load`]
pub const ENV_PREFIX: &str = "APP_";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Environment files loaded into the process environment before the
    /// `APP_*` variables are read. Paths support `~`. Existing variables win.
    pub env_files: Vec<String>,
    /// Public URL of the frontend
    pub frontend_url: String,
    /// Base URL of the backend API (required)
    pub backend_url: String,
    /// Application name
    pub app_name: String,
    /// Deployment environment (`development`, `staging`, `production`)
    pub environment: String,
    /// Port to listen on
    pub port: u16,
    /// JWT signing secret
    pub jwt_secret: Option<Secret>,
    /// Auth-flow redirect paths
    pub auth: AuthPaths,
    /// API path segments
    pub api: ApiConfig,
    /// Per-request timeout for outbound calls
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Language used when a message is missing in the requested one
    pub default_language: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env_files: Vec::new(),
            frontend_url: "http://localhost:3000".to_string(),
            backend_url: String::new(),
            app_name: "webapp".to_string(),
            environment: "development".to_string(),
            port: 3000,
            jwt_secret: None,
            auth: AuthPaths::default(),
            api: ApiConfig::default(),
            request_timeout: Duration::from_secs(10),
            default_language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

/// Auth-flow redirect paths
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthPaths {
    /// Login page
    pub login_path: String,
    /// Token verification endpoint
    pub verify_path: String,
    /// Logout endpoint
    pub logout_path: String,
}

impl Default for AuthPaths {
    fn default() -> Self {
        Self {
            login_path: "/auth/login".to_string(),
            verify_path: "/auth/verify".to_string(),
            logout_path: "/auth/logout".to_string(),
        }
    }
}

/// API path segments appended to the backend URL
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Leading path segment (`api`)
    pub prefix: String,
    /// Version segment (`v1`)
    pub version: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: "api".to_string(),
            version: "v1".to_string(),
        }
    }
}

/// A secret string that never shows up in logs or serialized output
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The underlying value
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str("***")
    }
}

impl AppConfig {
    /// Load configuration from an optional YAML file and `APP_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file does not exist, cannot be
    /// parsed, or the backend URL is missing. Callers treat this as fatal.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    /// [`AppConfig::load`] reading `<env_prefix>*` variables instead of `APP_*`
    ///
    /// When `env_files` is set, the files are loaded into the process
    /// environment and the providers are rebuilt: an `Env` provider only
    /// sees the variables present when it is merged.
    pub fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let first: Self = Self::figment(path, env_prefix)?
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        if first.env_files.is_empty() {
            first.validate()?;
            return Ok(first);
        }

        load_env_files(&first.env_files);
        Self::from_figment(Self::figment(path, env_prefix)?)
    }

    /// File + environment providers, in merge order
    pub fn figment(path: Option<&Path>, env_prefix: &str) -> Result<Figment> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // APP_AUTH__LOGIN_PATH -> auth.login_path
        Ok(figment.merge(Env::prefixed(env_prefix).split("__")))
    }

    /// Extract and validate a config from any figment.
    ///
    /// `env_files` is not acted on here; see [`AppConfig::load_with_prefix`].
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check required fields
    pub fn validate(&self) -> Result<()> {
        if self.backend_url.trim().is_empty() {
            return Err(Error::Config(format!(
                "backend_url is required (set {ENV_PREFIX}BACKEND_URL)"
            )));
        }
        let url = Url::parse(&self.backend_url)
            .map_err(|e| Error::Config(format!("Invalid backend_url '{}': {e}", self.backend_url)))?;
        if url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "backend_url '{}' cannot be used as a base URL",
                self.backend_url
            )));
        }
        Ok(())
    }

    /// Backend URL with the API prefix and version appended, ending in `/`
    ///
    /// ```
    /// use webapp_kit::config::AppConfig;
    /// let config = AppConfig {
    ///     backend_url: "https://api.example.com/".to_string(),
    ///     ..AppConfig::default()
    /// };
    /// assert_eq!(config.api_base_url().unwrap().as_str(), "https://api.example.com/api/v1/");
    /// ```
    pub fn api_base_url(&self) -> Result<Url> {
        let mut base = self.backend_url.trim_end_matches('/').to_string();
        for segment in [&self.api.prefix, &self.api.version] {
            let segment = segment.trim_matches('/');
            if !segment.is_empty() {
                base.push('/');
                base.push_str(segment);
            }
        }
        base.push('/');
        Url::parse(&base).map_err(|e| Error::Config(format!("Invalid API base URL '{base}': {e}")))
    }

    /// Whether this is a production deployment
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

/// Load environment files into the process environment.
/// Supports ~ expansion. Files that don't exist are silently skipped.
fn load_env_files(paths: &[String]) {
    for path_str in paths {
        let expanded = if path_str.starts_with('~') {
            if let Some(home) = dirs::home_dir() {
                path_str.replacen('~', &home.display().to_string(), 1)
            } else {
                path_str.clone()
            }
        } else {
            path_str.clone()
        };

        let path = Path::new(&expanded);
        if path.exists() {
            match dotenvy::from_path(path) {
                Ok(()) => {
                    tracing::info!("Loaded env file: {expanded}");
                }
                Err(e) => {
                    tracing::warn!("Failed to load env file {expanded}: {e}");
                }
            }
        } else {
            tracing::debug!("Env file not found (skipped): {expanded}");
        }
    }
}

/// Duration (de)serialization as `"10s"`, `"500ms"`, `"2m"` or bare seconds
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Text(String),
    }

    /// Serialize Duration to a human-readable string (`"10s"`, `"250ms"`)
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the serializer fails.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    /// Deserialize a human-readable duration (`"30s"`, `"5m"`, `"100ms"`, `30`)
    ///
    /// # Errors
    ///
    /// Returns a deserialization error if the value cannot be parsed as a duration.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = match Raw::deserialize(deserializer)? {
            Raw::Secs(secs) => return Ok(Duration::from_secs(secs)),
            Raw::Text(s) => s,
        };
        let s = s.trim();

        if let Some(ms) = s.strip_suffix("ms") {
            ms.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(serde::de::Error::custom)
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        } else if let Some(mins) = s.strip_suffix('m') {
            let mins = mins.parse::<u64>().map_err(serde::de::Error::custom)?;
            mins.checked_mul(60)
                .map(Duration::from_secs)
                .ok_or_else(|| serde::de::Error::custom(format!("duration of {mins}m is too large")))
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        }
    }
}
