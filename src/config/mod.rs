use std::env;

/// Runtime configuration for the conversion service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Port the HTTP server binds to (default: 5000)
    pub port: u16,

    /// Maximum upload size in bytes (default: 256 MB)
    pub max_file_size: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            max_file_size: 256 * 1024 * 1024, // 256 MB
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.port),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),
        }
    }
}
