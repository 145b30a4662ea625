use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use remitdesk_application::{DEFAULT_IDEMPOTENCY_TTL_SECONDS, RateLimitRule};
use remitdesk_core::AppError;
use tracing_subscriber::EnvFilter;

/// Ten years. Longer windows are rejected at startup.
const MAX_WINDOW_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;
/// A century, the ceiling for limiter retention and idempotency TTL.
const MAX_RETENTION_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

/// Backing store for idempotency records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdempotencyStoreConfig {
    Postgres,
    Memory,
}

impl FromStr for IdempotencyStoreConfig {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(AppError::Validation(format!(
                "IDEMPOTENCY_STORE must be either 'postgres' or 'memory', got '{other}'"
            ))),
        }
    }
}

/// Budgets for every rate limit policy sharing the process-wide limiter.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitSettings {
    pub ip: RateLimitRule,
    pub user: RateLimitRule,
    pub tenant: RateLimitRule,
    pub sensitive: RateLimitRule,
    pub verified_tenant_multiplier: f64,
    pub sweep_interval_seconds: u64,
    pub retention_seconds: u64,
}

impl RateLimitSettings {
    fn load() -> Result<Self, AppError> {
        let ip = load_rule("ip", "RATE_LIMIT_IP", 100, 60)?;
        let user = load_rule("user", "RATE_LIMIT_USER", 60, 60)?;
        let tenant = load_rule("tenant", "RATE_LIMIT_TENANT", 600, 60)?;
        let sensitive = load_rule("sensitive", "RATE_LIMIT_SENSITIVE", 10, 15 * 60)?;

        let verified_tenant_multiplier =
            parse_env_or("RATE_LIMIT_VERIFIED_TENANT_MULTIPLIER", 1.5_f64)?;
        if !verified_tenant_multiplier.is_finite() || verified_tenant_multiplier < 1.0 {
            return Err(AppError::Validation(
                "RATE_LIMIT_VERIFIED_TENANT_MULTIPLIER must be a finite number >= 1".to_owned(),
            ));
        }

        let sweep_interval_seconds = parse_env_or("RATE_LIMIT_SWEEP_INTERVAL_SECONDS", 60_u64)?;
        if sweep_interval_seconds == 0 {
            return Err(AppError::Validation(
                "RATE_LIMIT_SWEEP_INTERVAL_SECONDS must be greater than zero".to_owned(),
            ));
        }

        let default_retention =
            default_retention_seconds([&ip, &user, &tenant, &sensitive].into_iter());
        let retention_seconds = parse_env_or("RATE_LIMIT_RETENTION_SECONDS", default_retention)?;
        validate_retention(retention_seconds, default_retention / 2)?;

        Ok(Self {
            ip,
            user,
            tenant,
            sensitive,
            verified_tenant_multiplier,
            sweep_interval_seconds,
            retention_seconds,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: String,
    pub frontend_url: String,
    pub api_host: String,
    pub api_port: u16,
    pub cookie_secure: bool,
    pub idempotency_store: IdempotencyStoreConfig,
    pub idempotency_ttl_seconds: i64,
    pub rate_limits: RateLimitSettings,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

        let database_url = required_non_empty_env("DATABASE_URL")?;
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);

        let cookie_secure = env::var("SESSION_COOKIE_SECURE")
            .unwrap_or_else(|_| "false".to_owned())
            .eq_ignore_ascii_case("true");

        let idempotency_store = env::var("IDEMPOTENCY_STORE")
            .unwrap_or_else(|_| "postgres".to_owned())
            .parse::<IdempotencyStoreConfig>()?;
        // Non-positive values fall back to the default inside the service.
        let idempotency_ttl_seconds =
            parse_env_or("IDEMPOTENCY_TTL_SECONDS", DEFAULT_IDEMPOTENCY_TTL_SECONDS)?;
        if u64::try_from(idempotency_ttl_seconds).is_ok_and(|ttl| ttl > MAX_RETENTION_SECONDS) {
            return Err(AppError::Validation(format!(
                "IDEMPOTENCY_TTL_SECONDS must not exceed {MAX_RETENTION_SECONDS}"
            )));
        }

        Ok(Self {
            migrate_only,
            database_url,
            frontend_url,
            api_host,
            api_port,
            cookie_secure,
            idempotency_store,
            idempotency_ttl_seconds,
            rate_limits: RateLimitSettings::load()?,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

/// Twice the longest configured window, so live windows are never evicted.
fn default_retention_seconds<'a>(rules: impl Iterator<Item = &'a RateLimitRule>) -> u64 {
    rules
        .map(|rule| rule.window_seconds)
        .max()
        .unwrap_or(60)
        .saturating_mul(2)
}

fn load_rule(
    category: &str,
    prefix: &str,
    default_max: u32,
    default_window_seconds: u64,
) -> Result<RateLimitRule, AppError> {
    let max_attempts = parse_env_or(format!("{prefix}_MAX").as_str(), default_max)?;
    let window_seconds = parse_env_or(
        format!("{prefix}_WINDOW_SECONDS").as_str(),
        default_window_seconds,
    )?;

    validated_rule(category, prefix, max_attempts, window_seconds)
}

fn validated_rule(
    category: &str,
    prefix: &str,
    max_attempts: u32,
    window_seconds: u64,
) -> Result<RateLimitRule, AppError> {
    if max_attempts == 0 || window_seconds == 0 {
        return Err(AppError::Validation(format!(
            "{prefix}_MAX and {prefix}_WINDOW_SECONDS must be greater than zero"
        )));
    }

    if window_seconds > MAX_WINDOW_SECONDS {
        return Err(AppError::Validation(format!(
            "{prefix}_WINDOW_SECONDS must not exceed {MAX_WINDOW_SECONDS}"
        )));
    }

    Ok(RateLimitRule::new(category, max_attempts, window_seconds))
}

fn validate_retention(retention_seconds: u64, longest_window: u64) -> Result<(), AppError> {
    if retention_seconds <= longest_window {
        return Err(AppError::Validation(format!(
            "RATE_LIMIT_RETENTION_SECONDS must exceed the longest window ({longest_window}s)"
        )));
    }

    if retention_seconds > MAX_RETENTION_SECONDS {
        return Err(AppError::Validation(format!(
            "RATE_LIMIT_RETENTION_SECONDS must not exceed {MAX_RETENTION_SECONDS}"
        )));
    }

    Ok(())
}

fn parse_env_or<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        _ => Ok(default),
    }
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn required_non_empty_env(name: &str) -> Result<String, AppError> {
    let value = required_env(name)?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}
