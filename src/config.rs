use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Empty means permissive.
    pub origins: Vec<String>,
    pub allow_credentials: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub cookie_secure: bool,
    pub cors: CorsConfig,
    pub smtp: Option<SmtpConfig>,
    pub tmdb: TmdbConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is required")?,
            access_ttl_minutes: env_parse("JWT_ACCESS_TTL_MINUTES").unwrap_or(15),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES").unwrap_or(60 * 24 * 7),
        };
        anyhow::ensure!(!jwt.secret.is_empty(), "JWT_SECRET must not be empty");

        let cors = CorsConfig {
            origins: std::env::var("CORS_ORIGINS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            allow_credentials: env_parse("CORS_ALLOW_CREDENTIALS").unwrap_or(true),
        };

        let smtp = match std::env::var("SMTP_HOST") {
            Ok(host) if !host.is_empty() => Some(SmtpConfig {
                host,
                port: env_parse("SMTP_PORT").unwrap_or(587),
                username: std::env::var("SMTP_USERNAME").ok(),
                password: std::env::var("SMTP_PASSWORD").ok(),
                from: std::env::var("SMTP_FROM")
                    .unwrap_or_else(|_| "no-reply@cinelog.local".into()),
            }),
            _ => None,
        };

        let tmdb = TmdbConfig {
            api_key: std::env::var("TMDB_API_KEY").ok().filter(|k| !k.is_empty()),
            base_url: std::env::var("TMDB_BASE_URL")
                .unwrap_or_else(|_| "https://api.themoviedb.org/3".into()),
        };

        Ok(Self {
            database_url,
            jwt,
            cookie_secure: env_parse("COOKIE_SECURE").unwrap_or(true),
            cors,
            smtp,
            tmdb,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
