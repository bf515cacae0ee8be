//! # Configuration Module
//!
//! The proxy is configured once at process start and the resulting
//! [`PlatformConfig`] is handed to every handler through shared state. Nothing
//! reads the environment after start-up.
//!
//! ## Sources (later wins)
//! - Built-in defaults
//! - Optional YAML file (path from `PLATFORM_CONFIG_PATH`)
//! - Environment variables: the dashboard's `NEXT_PUBLIC_*` variables plus
//!   `PLATFORM_*` overrides for the server itself
//!
//! After merging, the auth mode is resolved exactly once and the whole
//! configuration is validated, collecting every problem into one error.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::auth::mode::{AuthMode, AuthModeSettings};
use crate::core::error::{PlatformError, PlatformResult};

pub const ENV_CONFIG_PATH: &str = "PLATFORM_CONFIG_PATH";
pub const ENV_API_URL: &str = "NEXT_PUBLIC_API_URL";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Listener settings
    pub server: ServerSettings,

    /// Where proxied requests go
    pub backend: BackendSettings,

    /// Auth-mode inputs and OAuth client settings
    pub auth: AuthSettings,

    /// Logging and metrics
    pub observability: ObservabilitySettings,

    /// Mode resolved from `auth.mode_settings`; filled in by the loaders
    #[serde(skip)]
    resolved_mode: AuthMode,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            backend: BackendSettings::default(),
            auth: AuthSettings::default(),
            observability: ObservabilitySettings::default(),
            resolved_mode: AuthMode::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_address: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Backend API base URL (`NEXT_PUBLIC_API_URL`)
    pub base_url: String,

    /// Whole-request timeout for backend calls; unset means the client default
    #[serde(with = "humantime_serde")]
    pub request_timeout: Option<Duration>,

    pub user_agent: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            request_timeout: None,
            user_agent: format!("platform-web-proxy/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Raw auth-mode variables
    #[serde(flatten)]
    pub mode_settings: AuthModeSettings,

    /// Identity provider client, used in OAuth mode
    pub oauth: Option<OAuthSettings>,

    /// Identity returned by `/api/users/current` in mock mode
    pub mock_user: serde_json::Value,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            mode_settings: AuthModeSettings::default(),
            oauth: None,
            mock_user: default_mock_user(),
        }
    }
}

fn default_mock_user() -> serde_json::Value {
    serde_json::json!({
        "id": "mock-user",
        "email": "mock.user@example.com",
        "name": "Mock User",
        "role": "admin",
        "tenantId": "mock-tenant",
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub auth_url: String,
    pub token_url: String,
    /// Must point at this proxy's `/api/auth/callback`
    pub redirect_url: String,
    pub scopes: Vec<String>,
    /// Backend endpoint that performs the code exchange
    pub backend_callback_path: String,
    /// Where the browser lands after a successful login
    pub post_login_path: String,
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            auth_url: String::new(),
            token_url: String::new(),
            redirect_url: String::new(),
            scopes: vec!["openid".to_string(), "profile".to_string(), "email".to_string()],
            backend_callback_path: "/auth/oauth/callback".to_string(),
            post_login_path: "/dashboard".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilitySettings {
    /// Default filter directive when `RUST_LOG` is unset
    pub log_level: String,
    pub log_format: LogFormat,
    pub metrics_enabled: bool,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            metrics_enabled: true,
        }
    }
}

impl PlatformConfig {
    /// Load from the file named by `PLATFORM_CONFIG_PATH` (if any), then
    /// apply process environment overrides
    pub async fn load() -> PlatformResult<Self> {
        let config = match std::env::var(ENV_CONFIG_PATH) {
            Ok(path) => Self::read_file(&path).await?,
            Err(_) => Self::default(),
        };
        config.finish(|name| std::env::var(name).ok())
    }

    /// Load configuration from a YAML file, then apply environment overrides
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> PlatformResult<Self> {
        Self::load_from_file_with(path, |name| std::env::var(name).ok()).await
    }

    /// Load a YAML file and resolve against the given variable lookup
    pub async fn load_from_file_with<P, F>(path: P, lookup: F) -> PlatformResult<Self>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        Self::read_file(path).await?.finish(lookup)
    }

    /// Parse YAML and resolve against the given variable lookup
    pub fn from_yaml_str<F>(content: &str, lookup: F) -> PlatformResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config: PlatformConfig = serde_yaml::from_str(content)
            .map_err(|e| PlatformError::config(format!("Failed to parse config: {}", e)))?;
        config.finish(lookup)
    }

    /// Defaults plus the given variable lookup only
    pub fn from_lookup<F>(lookup: F) -> PlatformResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().finish(lookup)
    }

    async fn read_file<P: AsRef<Path>>(path: P) -> PlatformResult<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await.map_err(|e| {
            PlatformError::config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        serde_yaml::from_str(&content)
            .map_err(|e| PlatformError::config(format!("Failed to parse config: {}", e)))
    }

    fn finish<F>(mut self, lookup: F) -> PlatformResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.apply_env_overrides(&lookup)?;
        self.resolved_mode = self.auth.mode_settings.resolve();
        self.validate()?;
        Ok(self)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> PlatformResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            self.backend.base_url = url;
        }

        self.auth
            .mode_settings
            .merge(AuthModeSettings::from_lookup(&lookup));

        if let Some(addr) = lookup("PLATFORM_BIND_ADDRESS") {
            self.server.bind_address = addr;
        }

        if let Some(port) = lookup("PLATFORM_PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| PlatformError::config(format!("Invalid PLATFORM_PORT: {}", e)))?;
        }

        if let Some(timeout) = lookup("PLATFORM_BACKEND_TIMEOUT") {
            self.backend.request_timeout = Some(humantime::parse_duration(&timeout).map_err(
                |e| PlatformError::config(format!("Invalid PLATFORM_BACKEND_TIMEOUT: {}", e)),
            )?);
        }

        if let Some(level) = lookup("PLATFORM_LOG_LEVEL") {
            self.observability.log_level = level;
        }

        if let Some(format) = lookup("PLATFORM_LOG_FORMAT") {
            self.observability.log_format = match format.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" => LogFormat::Text,
                other => {
                    return Err(PlatformError::config(format!(
                        "Invalid PLATFORM_LOG_FORMAT: {} (expected json or text)",
                        other
                    )))
                }
            };
        }

        if let Some(enabled) = lookup("PLATFORM_METRICS_ENABLED") {
            self.observability.metrics_enabled = enabled.trim().parse().map_err(|e| {
                PlatformError::config(format!("Invalid PLATFORM_METRICS_ENABLED: {}", e))
            })?;
        }

        let oauth_overrides = [
            "PLATFORM_OAUTH_CLIENT_ID",
            "PLATFORM_OAUTH_CLIENT_SECRET",
            "PLATFORM_OAUTH_AUTH_URL",
            "PLATFORM_OAUTH_TOKEN_URL",
            "PLATFORM_OAUTH_REDIRECT_URL",
        ];
        if oauth_overrides.iter().any(|name| lookup(*name).is_some()) {
            let oauth = self.auth.oauth.get_or_insert_with(OAuthSettings::default);
            if let Some(v) = lookup("PLATFORM_OAUTH_CLIENT_ID") {
                oauth.client_id = v;
            }
            if let Some(v) = lookup("PLATFORM_OAUTH_CLIENT_SECRET") {
                oauth.client_secret = Some(v);
            }
            if let Some(v) = lookup("PLATFORM_OAUTH_AUTH_URL") {
                oauth.auth_url = v;
            }
            if let Some(v) = lookup("PLATFORM_OAUTH_TOKEN_URL") {
                oauth.token_url = v;
            }
            if let Some(v) = lookup("PLATFORM_OAUTH_REDIRECT_URL") {
                oauth.redirect_url = v;
            }
        }

        Ok(())
    }

    /// Configuration validation collecting every problem
    pub fn validate(&self) -> PlatformResult<()> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push("server.port must be greater than 0".to_string());
        }
        if self.server.bind_address.is_empty() {
            errors.push("server.bind_address cannot be empty".to_string());
        }

        match Url::parse(&self.backend.base_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => errors.push(format!(
                "backend.base_url must use http or https, got '{}'",
                url.scheme()
            )),
            Err(e) => errors.push(format!(
                "backend.base_url '{}' is not a valid URL: {}",
                self.backend.base_url, e
            )),
        }

        if let Some(timeout) = self.backend.request_timeout {
            if timeout.is_zero() {
                errors.push("backend.request_timeout must be greater than 0".to_string());
            }
        }

        if let Some(oauth) = &self.auth.oauth {
            if oauth.client_id.is_empty() {
                errors.push("auth.oauth.client_id cannot be empty".to_string());
            }
            for (field, value) in [
                ("auth_url", &oauth.auth_url),
                ("token_url", &oauth.token_url),
                ("redirect_url", &oauth.redirect_url),
            ] {
                if let Err(e) = Url::parse(value) {
                    errors.push(format!("auth.oauth.{} '{}' is not a valid URL: {}", field, value, e));
                }
            }
            if !oauth.backend_callback_path.starts_with('/') {
                errors.push("auth.oauth.backend_callback_path must start with '/'".to_string());
            }
            if !oauth.post_login_path.starts_with('/') {
                errors.push("auth.oauth.post_login_path must start with '/'".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PlatformError::config(errors.join("; ")))
        }
    }

    /// The single auth mode active for this process
    pub fn auth_mode(&self) -> AuthMode {
        self.resolved_mode
    }

    /// Force a mode, bypassing resolution
    pub fn with_auth_mode(mut self, mode: AuthMode) -> Self {
        self.resolved_mode = mode;
        self
    }

    /// Point the proxy at a different backend
    pub fn with_backend_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.backend.base_url = base_url.into();
        self
    }

    /// `host:port` the listener binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }
}
