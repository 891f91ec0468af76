//! API configuration.

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// CORS origins; `*` allows any origin without credentials.
    pub cors_origins: Vec<String>,
    /// Max JSON request body size
    pub max_body_size: usize,
    /// Max direct upload size
    pub max_upload_size: usize,
    /// Environment (development/production)
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            max_body_size: 1024 * 1024,
            max_upload_size: 2 * 1024 * 1024 * 1024,
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
                .unwrap_or(defaults.cors_origins),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            max_upload_size: std::env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_upload_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        std::env::set_var("API_PORT", "9100");
        std::env::set_var("CORS_ORIGINS", "https://a.test, https://b.test,");
        std::env::set_var("MAX_UPLOAD_SIZE", "not-a-number");

        let config = ApiConfig::from_env();
        assert_eq!(config.port, 9100);
        assert_eq!(config.cors_origins, vec!["https://a.test", "https://b.test"]);
        assert_eq!(config.max_upload_size, ApiConfig::default().max_upload_size);

        std::env::remove_var("API_PORT");
        std::env::remove_var("CORS_ORIGINS");
        std::env::remove_var("MAX_UPLOAD_SIZE");
    }

    #[test]
    #[serial]
    fn test_production_flag() {
        std::env::set_var("ENVIRONMENT", "Production");
        assert!(ApiConfig::from_env().is_production());
        std::env::remove_var("ENVIRONMENT");
        assert!(!ApiConfig::from_env().is_production());
    }
}
