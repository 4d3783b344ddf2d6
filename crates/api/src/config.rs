use std::time::Duration;

use arbor_core::config::{
    HierarchyConfig, DEFAULT_MAX_HIERARCHY_DEPTH, DEFAULT_MAX_NAME_LENGTH,
    DEFAULT_TRAVERSAL_TIMEOUT,
};

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT validation settings.
    pub jwt: JwtConfig,
    /// Depth, name length, and traversal bounds for the hierarchy.
    pub hierarchy: HierarchyConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `MAX_HIERARCHY_DEPTH`  | `10`                       |
    /// | `MAX_NAME_LENGTH`      | `255`                      |
    /// | `TRAVERSAL_TIMEOUT_MS` | `5000`                     |
    ///
    /// # Panics
    ///
    /// Panics on unparsable values or hierarchy bounds that are not positive.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let jwt = JwtConfig::from_env();
        let hierarchy = hierarchy_from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt,
            hierarchy,
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn hierarchy_from_env() -> HierarchyConfig {
    let max_depth: i32 = std::env::var("MAX_HIERARCHY_DEPTH")
        .unwrap_or_else(|_| DEFAULT_MAX_HIERARCHY_DEPTH.to_string())
        .parse()
        .expect("MAX_HIERARCHY_DEPTH must be a valid i32");

    let max_name_length: usize = std::env::var("MAX_NAME_LENGTH")
        .unwrap_or_else(|_| DEFAULT_MAX_NAME_LENGTH.to_string())
        .parse()
        .expect("MAX_NAME_LENGTH must be a valid usize");

    let timeout_ms: u64 = std::env::var("TRAVERSAL_TIMEOUT_MS")
        .unwrap_or_else(|_| DEFAULT_TRAVERSAL_TIMEOUT.as_millis().to_string())
        .parse()
        .expect("TRAVERSAL_TIMEOUT_MS must be a valid u64");

    HierarchyConfig::new(max_depth, max_name_length, Duration::from_millis(timeout_ms))
        .unwrap_or_else(|e| panic!("Invalid hierarchy configuration: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins_skips_blanks() {
        assert_eq!(
            parse_origins(" http://a.test, ,http://b.test,"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }
}
