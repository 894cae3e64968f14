use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Public KoboToolbox instance used when KOBO_SERVER is not set
pub const DEFAULT_SERVER: &str = "https://kf.kobotoolbox.org";

/// Process-wide configuration, read once at startup
///
/// Constructed explicitly and passed by reference into the request executor
/// so tests can inject fake servers instead of touching the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KoboConfig {
    /// API token sent as `Authorization: Token <value>` on every request
    pub api_token: String,
    /// Base URL of the KoboToolbox instance, without a trailing slash
    pub server: String,
}

impl Default for KoboConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            server: DEFAULT_SERVER.to_string(),
        }
    }
}

impl KoboConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(token) = env::var("KOBO_API_TOKEN") {
            config.api_token = token;
        }
        if let Ok(server) = env::var("KOBO_SERVER") {
            config.server = normalize_server(server);
        }

        config
    }

    /// Validate the configuration
    ///
    /// A missing token is fatal: every tool operation needs authorization,
    /// so the server refuses to start rather than failing on each call.
    pub fn validate(&self) -> Result<()> {
        if self.api_token.is_empty() {
            return Err(ConfigError::MissingToken.into());
        }

        if !self.server.starts_with("http://") && !self.server.starts_with("https://") {
            return Err(ConfigError::InvalidServer {
                url: self.server.clone(),
            }
            .into());
        }

        Ok(())
    }
}

/// Strip trailing slashes so paths can be appended with a leading `/`
fn normalize_server(mut server: String) -> String {
    while server.ends_with('/') {
        server.pop();
    }
    server
}

/// Helper to load dotenv file if it exists
pub fn load_dotenv() {
    if let Ok(path) = env::var("DOTENV_PATH") {
        dotenvy::from_path(&path).ok();
    } else {
        dotenvy::dotenv().ok();
    }
}
