use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub oauth: OAuthConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Absent when serving from the in-memory store.
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
    pub history_limit: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub session_secret: String,
    pub session_expiry_hours: u64,
    pub secure_cookies: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    /// Consulted when the userinfo response hides the email (GitHub private emails).
    pub emails_url: Option<String>,
    pub redirect_url: String,
    pub scopes: Vec<String>,
}

impl AppConfig {
    /// Build configuration from the process environment. The OAuth client
    /// credentials and the session secret have no defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`AppConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let client_id = required(&lookup, "OAUTH_CLIENT_ID")?;
        let client_secret = required(&lookup, "OAUTH_CLIENT_SECRET")?;
        let session_secret = required(&lookup, "SESSION_SECRET")?;
        if session_secret.len() < 16 {
            return Err(ConfigError::Invalid {
                name: "SESSION_SECRET",
                reason: "must be at least 16 characters".to_string(),
            });
        }

        let defaults = match environment {
            Environment::Production => Self::production(client_id, client_secret, session_secret),
            Environment::Staging => Self::staging(client_id, client_secret, session_secret),
            Environment::Development => Self::development(client_id, client_secret, session_secret),
        };

        defaults.with_overrides(&lookup)
    }

    fn with_overrides<F>(mut self, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Database overrides
        if let Some(v) = lookup("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse("DATABASE_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = lookup("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = parse("DATABASE_CONNECTION_TIMEOUT", &v)?;
        }

        // API overrides
        if let Some(v) = lookup("API_PORT").or_else(|| lookup("PORT")) {
            self.api.port = parse("API_PORT", &v)?;
        }
        if let Some(v) = lookup("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = parse("API_ENABLE_REQUEST_LOGGING", &v)?;
        }
        if let Some(v) = lookup("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = parse("API_MAX_REQUEST_SIZE_BYTES", &v)?;
        }
        if let Some(v) = lookup("API_HISTORY_LIMIT") {
            self.api.history_limit = parse("API_HISTORY_LIMIT", &v)?;
        }

        // Security overrides
        if let Some(v) = lookup("SECURITY_SESSION_EXPIRY_HOURS") {
            self.security.session_expiry_hours = parse("SECURITY_SESSION_EXPIRY_HOURS", &v)?;
        }
        if let Some(v) = lookup("SECURITY_SECURE_COOKIES") {
            self.security.secure_cookies = parse("SECURITY_SECURE_COOKIES", &v)?;
        }
        if let Some(v) = lookup("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = split_list(&v, ',');
        }

        // OAuth provider endpoints
        if let Some(v) = lookup("OAUTH_AUTHORIZE_URL") {
            self.oauth.authorize_url = v;
        }
        if let Some(v) = lookup("OAUTH_TOKEN_URL") {
            self.oauth.token_url = v;
        }
        if let Some(v) = lookup("OAUTH_USERINFO_URL") {
            self.oauth.userinfo_url = v;
        }
        if let Some(v) = lookup("OAUTH_EMAILS_URL") {
            // Empty disables the fallback
            self.oauth.emails_url = Some(v).filter(|v| !v.trim().is_empty());
        }
        if let Some(v) = lookup("OAUTH_REDIRECT_URL") {
            self.oauth.redirect_url = v;
        }
        if let Some(v) = lookup("OAUTH_SCOPES") {
            self.oauth.scopes = split_list(&v, ' ');
        }

        for (name, value) in [
            ("OAUTH_AUTHORIZE_URL", &self.oauth.authorize_url),
            ("OAUTH_TOKEN_URL", &self.oauth.token_url),
            ("OAUTH_USERINFO_URL", &self.oauth.userinfo_url),
            ("OAUTH_REDIRECT_URL", &self.oauth.redirect_url),
        ] {
            url::Url::parse(value).map_err(|e| ConfigError::Invalid {
                name,
                reason: e.to_string(),
            })?;
        }
        if let Some(value) = &self.oauth.emails_url {
            url::Url::parse(value).map_err(|e| ConfigError::Invalid {
                name: "OAUTH_EMAILS_URL",
                reason: e.to_string(),
            })?;
        }

        Ok(self)
    }

    fn base_oauth(client_id: String, client_secret: String) -> OAuthConfig {
        OAuthConfig {
            client_id,
            client_secret,
            authorize_url: "https://github.com/login/oauth/authorize".to_string(),
            token_url: "https://github.com/login/oauth/access_token".to_string(),
            userinfo_url: "https://api.github.com/user".to_string(),
            emails_url: Some("https://api.github.com/user/emails".to_string()),
            redirect_url: "http://localhost:3000/auth/callback".to_string(),
            scopes: vec!["read:user".to_string(), "user:email".to_string()],
        }
    }

    fn development(client_id: String, client_secret: String, session_secret: String) -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
                max_request_size_bytes: 1024 * 1024, // 1MB
                history_limit: 200,
            },
            security: SecurityConfig {
                session_secret,
                session_expiry_hours: 24 * 30,
                secure_cookies: false,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            oauth: Self::base_oauth(client_id, client_secret),
        }
    }

    fn staging(client_id: String, client_secret: String, session_secret: String) -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
                max_request_size_bytes: 512 * 1024,
                history_limit: 200,
            },
            security: SecurityConfig {
                session_secret,
                session_expiry_hours: 24 * 7,
                secure_cookies: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            oauth: Self::base_oauth(client_id, client_secret),
        }
    }

    fn production(client_id: String, client_secret: String, session_secret: String) -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: false,
                max_request_size_bytes: 256 * 1024,
                history_limit: 100,
            },
            security: SecurityConfig {
                session_secret,
                session_expiry_hours: 24 * 7,
                secure_cookies: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            oauth: Self::base_oauth(client_id, client_secret),
        }
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parse<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

fn split_list(value: &str, separator: char) -> Vec<String> {
    value
        .split(separator)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
