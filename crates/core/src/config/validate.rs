use super::{
    types::{AuthMethod, Config},
    ConfigError,
};

/// Upper bound for ages given in hours (100 years).
pub const MAX_AGE_HOURS: u64 = 24 * 365 * 100;

/// Validate configuration
/// Currently validates:
/// - Auth section exists (enforced by serde)
/// - Server port is not 0
/// - `api_key` auth carries a non-empty key
/// - Bootstrap admin has a username and password
/// - Task worker intervals are not 0
/// - Ages in hours stay within `MAX_AGE_HOURS`
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::ApiKey
        && config.auth.api_key.as_deref().is_none_or(str::is_empty)
    {
        return Err(ConfigError::ValidationError(
            "auth.api_key is required when auth.method = \"api_key\"".to_string(),
        ));
    }

    if let Some(admin) = &config.auth.bootstrap_admin {
        if admin.username.trim().is_empty() || admin.password.is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.bootstrap_admin needs a username and a password".to_string(),
            ));
        }
    }

    let tasks = &config.tasks;
    if tasks.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "tasks.poll_interval_ms cannot be 0".to_string(),
        ));
    }
    if tasks.completion_sweep_secs == 0 || tasks.wanted_sweep_secs == 0 {
        return Err(ConfigError::ValidationError(
            "tasks sweep intervals cannot be 0".to_string(),
        ));
    }
    for (name, hours) in [
        (
            "tasks.tmdb_configuration_max_age_hours",
            tasks.tmdb_configuration_max_age_hours,
        ),
        ("tasks.retain_finished_hours", tasks.retain_finished_hours),
    ] {
        if hours > MAX_AGE_HOURS {
            return Err(ConfigError::ValidationError(format!(
                "{name} cannot exceed {MAX_AGE_HOURS}"
            )));
        }
    }

    Ok(())
}
