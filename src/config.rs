use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is not a valid number: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Token signing settings shared by the REST extractor and the WebSocket handshake.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub maxage_minutes: i64,
}

/// Payment processor credentials and webhook verification settings.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub api_base: String,
    pub currency: String,
    pub webhook_tolerance_secs: i64,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub redis_url: String,
    pub port: u16,
    pub app_env: String,
    pub public_base_url: String,
    pub jwt: JwtConfig,
    pub stripe: StripeConfig,
    pub smtp: SmtpConfig,
}

impl AppConfig {
    /// Read configuration from the process environment (after `.env` is loaded).
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            redis_url: required("REDIS_URL")?,
            port: parse_or("PORT", 8080)?,
            app_env: optional("APP_ENV", "development"),
            public_base_url: optional("PUBLIC_BASE_URL", "http://localhost:8080"),
            jwt: JwtConfig {
                secret: required("JWT_SECRET")?,
                maxage_minutes: parse_or("JWT_MAXAGE_MINUTES", 43_200)?,
            },
            stripe: StripeConfig {
                secret_key: required("STRIPE_SECRET_KEY")?,
                webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
                api_base: optional("STRIPE_API_BASE", "https://api.stripe.com"),
                currency: optional("PAYMENT_CURRENCY", "usd"),
                webhook_tolerance_secs: parse_or("WEBHOOK_TOLERANCE_SECS", 300)?,
            },
            smtp: SmtpConfig {
                host: optional("SMTP_HOST", "localhost"),
                port: parse_or("SMTP_PORT", 587)?,
                username: optional("SMTP_USERNAME", ""),
                password: optional("SMTP_PASSWORD", ""),
                from: optional("MAIL_FROM", "Freelance Marketplace <noreply@localhost>"),
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn optional(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
