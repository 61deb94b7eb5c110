//! Server configuration, read from the environment.

use std::path::PathBuf;

use chrono::Duration;
use thiserror::Error;

use floe_auth::AdminToken;

/// Sliding session lifetime when `FLOE_SESSION_LIFETIME_SECS` is unset.
pub const DEFAULT_SESSION_LIFETIME_SECS: i64 = 2 * 60 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Short host name used in event ids and routing.
    pub host_name: String,
    pub tags: Vec<String>,
    /// Shared by cluster peers; `None` disables the admin bypass.
    pub admin_token: Option<AdminToken>,
    pub bind: String,
    /// Prefix of every API route, e.g. `/build/api`.
    pub base_path: String,
    /// Prefix of trigger routes under `base_path`, e.g. `/push/`.
    pub push_path: String,
    /// Static asset route; must end with `/*filepath`.
    pub asset_path: String,
    pub web_root: PathBuf,
    pub session_lifetime: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host_name: "h1".to_string(),
            tags: vec!["master".to_string()],
            admin_token: None,
            bind: "0.0.0.0:8080".to_string(),
            base_path: "/build/api".to_string(),
            push_path: "/push/".to_string(),
            asset_path: "/app/*filepath".to_string(),
            web_root: PathBuf::from("webapp"),
            session_lifetime: Duration::seconds(DEFAULT_SESSION_LIFETIME_SECS),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or empty keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        if let Some(v) = get("FLOE_HOST_NAME") {
            cfg.host_name = v;
        }
        if let Some(v) = get("FLOE_TAGS") {
            cfg.tags = v
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect();
        }
        cfg.admin_token = lookup("FLOE_ADMIN_TOKEN").and_then(AdminToken::new);
        if let Some(v) = get("FLOE_PUB_BIND") {
            cfg.bind = v;
        }
        if let Some(v) = get("FLOE_BASE_PATH") {
            cfg.base_path = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("FLOE_PUSH_PATH") {
            cfg.push_path = v;
        }
        if let Some(v) = get("FLOE_ASSET_PATH") {
            cfg.asset_path = v;
        }
        if let Some(v) = get("FLOE_WEB_ROOT") {
            cfg.web_root = PathBuf::from(v);
        }
        if let Some(v) = get("FLOE_SESSION_LIFETIME_SECS") {
            let secs = v
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or(ConfigError::Invalid {
                    var: "FLOE_SESSION_LIFETIME_SECS",
                    expected: "a positive number of seconds",
                    value: v.clone(),
                })?;
            cfg.session_lifetime = Duration::seconds(secs);
        }

        Ok(cfg)
    }

    /// Where trigger sub-paths are mounted.
    pub fn trigger_base(&self) -> String {
        format!("{}{}", self.base_path, self.push_path)
    }
}
