//! Server configuration.

use std::net::SocketAddr;

use crate::error::{Result, ServerError};

/// Default callback path.
pub const DEFAULT_CALLBACK_PATH: &str = "/auth";

/// Default max body size for REST requests (1 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Routes mounted at fixed paths; the callback may not shadow them.
pub const FIXED_PATHS: &[&str] = &[
    "/login",
    "/refresh-token",
    "/profile",
    "/webhook",
    "/token-webhook",
    "/health",
];

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Path Upstox redirects the browser to after login.
    pub callback_path: String,

    /// Enable request logging.
    pub request_logging: bool,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 3000)),
            callback_path: DEFAULT_CALLBACK_PATH.to_string(),
            request_logging: true,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Set the callback path. A missing leading slash is added.
    pub fn with_callback_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.callback_path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };
        self
    }

    /// Enable or disable request logging.
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }

    /// Set the maximum request body size.
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Check the callback path can be mounted next to the fixed routes.
    ///
    /// It must be a literal path: axum treats `{..}` as a capture and
    /// rejects the older `:name` / `*rest` forms outright.
    pub fn validate(&self) -> Result<()> {
        let path = self.callback_path.as_str();
        let invalid = |reason: &str| -> Result<()> {
            Err(ServerError::Config(format!(
                "callback path '{}' {}",
                path, reason
            )))
        };

        if !path.starts_with('/') || path.len() < 2 {
            return invalid("must be an absolute path like /auth");
        }
        if path.contains(['{', '}'])
            || path
                .split('/')
                .any(|segment| segment.starts_with(':') || segment.starts_with('*'))
        {
            return invalid("must not contain route captures");
        }
        if FIXED_PATHS.contains(&path) {
            return invalid("is already served by the relay");
        }
        Ok(())
    }
}
