//! Startup configuration, read once from the environment.

use std::net::SocketAddr;

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_SESSION_HOURS: i64 = 168;
const DEFAULT_WORKSPACE: &str = "Keuangan";
const DEV_COOKIE_SECRET: &str = "jurnal-dev-cookie-secret-do-not-use-in-production";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not a valid socket address: {value}")]
    InvalidBindAddr { var: &'static str, value: String },

    #[error("{var} must be a positive number of hours, got {value}")]
    InvalidSessionHours { var: &'static str, value: String },

    #[error("{var} must be at least 32 characters")]
    WeakCookieSecret { var: &'static str },

    #[error("{var} is required when DATABASE_URL is set")]
    MissingCookieSecret { var: &'static str },
}

/// First user (and workspace) created at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapUser {
    pub email: String,
    pub password: String,
    pub workspace: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub cookie_secret: String,
    /// Postgres when set, in-memory (with demo data) otherwise.
    pub database_url: Option<String>,
    pub session_ttl: chrono::Duration,
    /// Mark cookies `Secure`. Off by default so plain-http dev works.
    pub secure_cookies: bool,
    pub bootstrap: Option<BootstrapUser>,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source (tests pass a closure over a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = match lookup("JURNAL_BIND_ADDR") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidBindAddr {
                var: "JURNAL_BIND_ADDR",
                value: value.clone(),
            })?,
            None => DEFAULT_BIND_ADDR
                .parse()
                .map_err(|_| ConfigError::InvalidBindAddr {
                    var: "JURNAL_BIND_ADDR",
                    value: DEFAULT_BIND_ADDR.to_string(),
                })?,
        };

        let session_hours = match lookup("JURNAL_SESSION_HOURS") {
            Some(value) => match value.trim().parse::<i64>() {
                Ok(hours) if hours > 0 => hours,
                _ => {
                    return Err(ConfigError::InvalidSessionHours {
                        var: "JURNAL_SESSION_HOURS",
                        value,
                    });
                }
            },
            None => DEFAULT_SESSION_HOURS,
        };

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let cookie_secret = match lookup("JURNAL_COOKIE_SECRET") {
            Some(secret) if secret.len() < 32 => {
                return Err(ConfigError::WeakCookieSecret {
                    var: "JURNAL_COOKIE_SECRET",
                });
            }
            Some(secret) => secret,
            None if database_url.is_some() => {
                return Err(ConfigError::MissingCookieSecret {
                    var: "JURNAL_COOKIE_SECRET",
                });
            }
            None => {
                tracing::warn!("JURNAL_COOKIE_SECRET not set; using insecure dev default");
                DEV_COOKIE_SECRET.to_string()
            }
        };

        let secure_cookies = lookup("JURNAL_SECURE_COOKIES")
            .map(|value| matches!(value.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let bootstrap = match (lookup("JURNAL_BOOTSTRAP_EMAIL"), lookup("JURNAL_BOOTSTRAP_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapUser {
                email,
                password,
                workspace: lookup("JURNAL_BOOTSTRAP_WORKSPACE").unwrap_or_else(|| DEFAULT_WORKSPACE.to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            bind_addr,
            cookie_secret,
            database_url,
            session_ttl: chrono::Duration::hours(session_hours),
            secure_cookies,
            bootstrap,
        })
    }
}
