//! # Auth-Mode Resolution
//!
//! The dashboard runs in exactly one of three authentication modes. The mode
//! is derived once, at start-up, from four environment variables that grew
//! over time: two legacy boolean flags and a newer single mode variable.
//!
//! Precedence (first match wins):
//!
//! 1. `NEXT_PUBLIC_USE_MOCK_AUTH=true`   → [`AuthMode::Mock`]
//! 2. `NEXT_PUBLIC_USE_LEGACY_AUTH=true` → [`AuthMode::Legacy`]
//! 3. `NEXT_PUBLIC_AUTH_MODE` naming a valid mode → that mode
//! 4. anything else → [`AuthMode::OAuth`]
//!
//! The boolean flags deliberately override the mode variable so deployments
//! that still set the old flags keep their behavior. Unrecognized values are
//! never an error; they fall through to the default.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub const ENV_AUTH_MODE: &str = "NEXT_PUBLIC_AUTH_MODE";
pub const ENV_USE_MOCK_AUTH: &str = "NEXT_PUBLIC_USE_MOCK_AUTH";
pub const ENV_USE_LEGACY_AUTH: &str = "NEXT_PUBLIC_USE_LEGACY_AUTH";

/// Active authentication mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Canned identity, no backend session
    Mock,
    /// Identity provider login, backend issues the session
    #[default]
    #[serde(rename = "oauth")]
    OAuth,
    /// Cookie session issued directly by the backend
    Legacy,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::Mock => "mock",
            AuthMode::OAuth => "oauth",
            AuthMode::Legacy => "legacy",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("mock") {
            Ok(AuthMode::Mock)
        } else if s.eq_ignore_ascii_case("oauth") {
            Ok(AuthMode::OAuth)
        } else if s.eq_ignore_ascii_case("legacy") {
            Ok(AuthMode::Legacy)
        } else {
            Err(())
        }
    }
}

/// Raw, unvalidated settings the mode is resolved from
///
/// Values are kept as strings so a config file and the process environment
/// go through exactly the same interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthModeSettings {
    /// `NEXT_PUBLIC_AUTH_MODE`
    pub mode: Option<String>,
    /// `NEXT_PUBLIC_USE_MOCK_AUTH`
    #[serde(deserialize_with = "flag_value")]
    pub use_mock_auth: Option<String>,
    /// `NEXT_PUBLIC_USE_LEGACY_AUTH`
    #[serde(deserialize_with = "flag_value")]
    pub use_legacy_auth: Option<String>,
}

/// Config files may write flags as YAML scalars (`true`, `1`) or strings
fn flag_value<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Bool(bool),
        Int(i64),
        Float(f64),
        Text(String),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
        Scalar::Bool(b) => b.to_string(),
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Text(s) => s,
    }))
}

impl AuthModeSettings {
    /// Read the three variables through an arbitrary lookup function
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            mode: lookup(ENV_AUTH_MODE),
            use_mock_auth: lookup(ENV_USE_MOCK_AUTH),
            use_legacy_auth: lookup(ENV_USE_LEGACY_AUTH),
        }
    }

    /// Read the three variables from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Overlay every variable that is set in `other`
    pub fn merge(&mut self, other: AuthModeSettings) {
        if other.mode.is_some() {
            self.mode = other.mode;
        }
        if other.use_mock_auth.is_some() {
            self.use_mock_auth = other.use_mock_auth;
        }
        if other.use_legacy_auth.is_some() {
            self.use_legacy_auth = other.use_legacy_auth;
        }
    }

    /// Resolve to exactly one mode
    pub fn resolve(&self) -> AuthMode {
        if is_truthy(self.use_mock_auth.as_deref()) {
            return AuthMode::Mock;
        }
        if is_truthy(self.use_legacy_auth.as_deref()) {
            return AuthMode::Legacy;
        }
        self.mode
            .as_deref()
            .and_then(|m| m.parse().ok())
            .unwrap_or_default()
    }
}

fn is_truthy(value: Option<&str>) -> bool {
    value.map_or(false, |v| v.trim().eq_ignore_ascii_case("true"))
}
