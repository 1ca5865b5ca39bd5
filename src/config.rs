//! Application configuration.
//!
//! Values are resolved with priority: config.toml > environment (.env) > default.
//!
//! ```toml
//! [app]
//! base_url = "https://example.com"
//!
//! [server]
//! addr = "127.0.0.1"
//! port = 8080
//!
//! [admin]
//! users_file = "data/users.toml"
//! session_expiry_hours = 24
//! csrf_token_max_age_secs = 3600
//!
//! [baun]
//! blog_path = "blog"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

// ==================== Defaults ====================

/// Server address to bind to
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0";

/// Server port
pub const DEFAULT_SERVER_PORT: u16 = 3000;

/// Where admin users are stored
pub const DEFAULT_USERS_FILE: &str = "data/users.toml";

/// Session inactivity timeout in hours
pub const DEFAULT_SESSION_EXPIRY_HOURS: i64 = 24;

/// Probability threshold for session cleanup (0-255, lower = more frequent)
/// Value of 25 means ~10% chance (25/256) on each session access
pub const SESSION_CLEANUP_THRESHOLD: u8 = 25;

pub const CONFIG_FILE: &str = "config.toml";

// ==================== File layout ====================

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    app: Option<AppSection>,
    server: Option<ServerSection>,
    admin: Option<AdminSection>,
    baun: Option<BaunSection>,
}

#[derive(Debug, Default, Deserialize)]
struct AppSection {
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSection {
    addr: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct AdminSection {
    users_file: Option<String>,
    session_expiry_hours: Option<i64>,
    csrf_token_max_age_secs: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct BaunSection {
    blog_path: Option<String>,
}

// ==================== Resolved config ====================

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Prefix for every redirect and link, without a trailing slash
    pub base_url: String,
    pub server_addr: String,
    pub server_port: u16,
    pub users_file: PathBuf,
    pub session_expiry_hours: i64,
    pub csrf_token_max_age_secs: Option<i64>,
    /// Set when the site has a blog; shown in the admin navigation
    pub blog_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            users_file: PathBuf::from(DEFAULT_USERS_FILE),
            session_expiry_hours: DEFAULT_SESSION_EXPIRY_HOURS,
            csrf_token_max_age_secs: None,
            blog_path: None,
        }
    }
}

impl Config {
    /// Get the full server bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_addr, self.server_port)
    }
}

/// Load configuration from `config.toml` in the working directory and the
/// process environment.
pub fn load() -> Result<Config, ConfigError> {
    // Load .env file if present
    let _ = dotenvy::dotenv();
    load_from(Path::new(CONFIG_FILE), |key| std::env::var(key).ok())
}

/// Load configuration from `path`, falling back to `env` lookups and defaults.
pub fn load_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    let file = match std::fs::read_to_string(path) {
        Ok(contents) => {
            tracing::info!("Using config from {}", path.display());
            toml::from_str::<FileConfig>(&contents).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileConfig::default(),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            });
        }
    };

    let app = file.app.unwrap_or_default();
    let server = file.server.unwrap_or_default();
    let admin = file.admin.unwrap_or_default();
    let baun = file.baun.unwrap_or_default();
    let defaults = Config::default();

    let base_url = app
        .base_url
        .or_else(|| env("BASE_URL"))
        .unwrap_or(defaults.base_url);

    let server_port = match server.port {
        Some(port) => port,
        None => match env("PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value,
            })?,
            None => defaults.server_port,
        },
    };

    let session_expiry_hours = admin
        .session_expiry_hours
        .unwrap_or(defaults.session_expiry_hours);
    if session_expiry_hours <= 0 {
        return Err(ConfigError::InvalidValue {
            key: "admin.session_expiry_hours",
            value: session_expiry_hours.to_string(),
        });
    }

    Ok(Config {
        base_url: base_url.trim_end_matches('/').to_string(),
        server_addr: server
            .addr
            .or_else(|| env("SERVER_ADDR"))
            .unwrap_or(defaults.server_addr),
        server_port,
        users_file: admin
            .users_file
            .or_else(|| env("USERS_FILE"))
            .map(PathBuf::from)
            .unwrap_or(defaults.users_file),
        session_expiry_hours,
        csrf_token_max_age_secs: admin.csrf_token_max_age_secs.filter(|secs| *secs > 0),
        blog_path: baun
            .blog_path
            .or_else(|| env("BLOG_PATH"))
            .filter(|p| !p.is_empty()),
    })
}
