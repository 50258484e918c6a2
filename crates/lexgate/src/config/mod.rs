use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

const DEV_JWT_SECRET: &str = "lexgate-development-secret";
const DEFAULT_ADMIN_EMAIL: &str = "admin@nyaaysathi.com";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub auth: AuthConfig,
    pub gateway: GatewayConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let auth = AuthConfig::load(environment)?;

        let base_url = env::var("APP_API_BASE_URL")
            .unwrap_or_else(|_| format!("http://127.0.0.1:{port}"));
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(base_url));
        }
        let session_dir = env::var("APP_SESSION_DIR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            auth,
            gateway: GatewayConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                session_dir,
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Token signing secret and the single administrator account.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub admin_email: String,
    pub admin_password: String,
}

impl AuthConfig {
    fn load(environment: AppEnvironment) -> Result<Self, ConfigError> {
        let production = environment == AppEnvironment::Production;

        let jwt_secret = match env::var("APP_JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if production => return Err(ConfigError::MissingSecret("APP_JWT_SECRET")),
            _ => DEV_JWT_SECRET.to_string(),
        };
        let admin_email =
            env::var("APP_ADMIN_EMAIL").unwrap_or_else(|_| DEFAULT_ADMIN_EMAIL.to_string());
        let admin_password = match env::var("APP_ADMIN_PASSWORD") {
            Ok(password) if !password.is_empty() => password,
            _ if production => return Err(ConfigError::MissingSecret("APP_ADMIN_PASSWORD")),
            _ => DEFAULT_ADMIN_PASSWORD.to_string(),
        };

        Ok(Self {
            jwt_secret,
            admin_email,
            admin_password,
        })
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("admin_email", &self.admin_email)
            .finish_non_exhaustive()
    }
}

/// Where the review console and other clients find the API.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    /// Directory for file-backed sessions; memory-only when unset.
    pub session_dir: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidBaseUrl(String),
    MissingSecret(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidBaseUrl(value) => {
                write!(f, "APP_API_BASE_URL must be an http(s) URL, got '{value}'")
            }
            ConfigError::MissingSecret(name) => write!(f, "{name} is required in production"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidBaseUrl(_)
            | ConfigError::MissingSecret(_) => None,
        }
    }
}
