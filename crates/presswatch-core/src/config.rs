use crate::app_config::{AppConfig, Environment, VerificationSettings};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from the variables already in the process.
///
/// Does not read `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration from an env-var lookup function.
///
/// Kept separate from the process environment so tests can drive it from a
/// plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("PRESSWATCH_ENV", "development"))?;

    let bind_addr = parse_addr("PRESSWATCH_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("PRESSWATCH_LOG_LEVEL", "info");
    let rules_path = PathBuf::from(or_default(
        "PRESSWATCH_RULES_PATH",
        "./config/verification.yaml",
    ));

    let db_max_connections = parse_u32("PRESSWATCH_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("PRESSWATCH_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("PRESSWATCH_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let browserless_url = optional("PRESSWATCH_BROWSERLESS_URL");
    let browserless_token = optional("PRESSWATCH_BROWSERLESS_TOKEN");

    let concurrency = parse_usize("PRESSWATCH_VERIFY_CONCURRENCY", "5")?;
    if concurrency == 0 {
        return Err(invalid(
            "PRESSWATCH_VERIFY_CONCURRENCY",
            "must be at least 1".to_string(),
        ));
    }
    let max_retries = parse_u32("PRESSWATCH_VERIFY_MAX_RETRIES", "3")?;
    if max_retries == 0 {
        return Err(invalid(
            "PRESSWATCH_VERIFY_MAX_RETRIES",
            "must be at least 1".to_string(),
        ));
    }

    let browser_fallback_statuses = parse_status_list(
        "PRESSWATCH_VERIFY_BROWSER_FALLBACK_STATUSES",
        &or_default("PRESSWATCH_VERIFY_BROWSER_FALLBACK_STATUSES", "403"),
    )?;

    let verification = VerificationSettings {
        concurrency,
        max_retries,
        retry_delay_ms: parse_u64("PRESSWATCH_VERIFY_RETRY_DELAY_MS", "2000")?,
        rate_limit_ms: parse_u64("PRESSWATCH_VERIFY_RATE_LIMIT_MS", "500")?,
        fetch_timeout_ms: parse_u64("PRESSWATCH_VERIFY_FETCH_TIMEOUT_MS", "15000")?,
        browser_timeout_ms: parse_u64("PRESSWATCH_VERIFY_BROWSER_TIMEOUT_MS", "30000")?,
        settle_delay_ms: parse_u64("PRESSWATCH_VERIFY_SETTLE_DELAY_MS", "2000")?,
        min_content_length: parse_usize("PRESSWATCH_VERIFY_MIN_CONTENT_LENGTH", "1000")?,
        browser_fallback_statuses,
        user_agent: or_default(
            "PRESSWATCH_VERIFY_USER_AGENT",
            crate::app_config::DEFAULT_USER_AGENT,
        ),
    };

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        rules_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        browserless_url,
        browserless_token,
        verification,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "production" => Ok(Environment::Production),
        "test" => Ok(Environment::Test),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PRESSWATCH_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

/// Parse a comma-separated list of HTTP status codes. An empty value disables
/// the browser fallback entirely.
fn parse_status_list(var: &str, raw: &str) -> Result<Vec<u16>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let code = s.parse::<u16>().map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("'{s}': {e}"),
            })?;
            if (100..=599).contains(&code) {
                Ok(code)
            } else {
                Err(ConfigError::InvalidEnvVar {
                    var: var.to_string(),
                    reason: format!("{code} is not an HTTP status code"),
                })
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
