//! Configuration validation with aggregated errors.
//! Credentials are not checked here: a broken environment only disables
//! itself when the registry is built.

use regex::Regex;
use tracing::error;

use crate::config::settings::{RetryConfig, SettingsConfig};
use crate::config::types::ServiceConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);

    let name_re = Regex::new(r"^[A-Za-z0-9_-]+$").expect("static regex");
    for (name, env) in &cfg.environments {
        if !name_re.is_match(name) {
            errors.push(format!("environments['{}']: name must match [A-Za-z0-9_-]+", name));
        }
        if let Some(url) = &env.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                errors.push(format!("environments['{}'].base_url must be an http(s) URL", name));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        for e in &errors {
            error!("config validation: {}", e);
        }
        Err(errors)
    }
}

fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if settings.default_environment.trim().is_empty() {
        errors.push("settings.default_environment must not be empty".to_string());
    }
    if settings.timeout_ms == 0 {
        errors.push("settings.timeout_ms must be > 0".to_string());
    }
    if let Some(retry) = &settings.retry {
        validate_retry(retry, errors);
    }
    if settings.shaping.max_tokens == 0 {
        errors.push("settings.shaping.max_tokens must be > 0".to_string());
    }
    if settings.shaping.chars_per_token == 0 {
        errors.push("settings.shaping.chars_per_token must be > 0".to_string());
    }
    if !settings.metrics.path.starts_with('/') {
        errors.push(format!("settings.metrics.path '{}' must start with '/'", settings.metrics.path));
    }
    if let Some(logging) = &settings.logging {
        if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' must be one of {}",
                logging.level,
                LOG_LEVELS.join(", ")
            ));
        }
    }
}

fn validate_retry(retry: &RetryConfig, errors: &mut Vec<String>) {
    if let (Some(base), Some(max)) = (retry.base_delay_ms, retry.max_delay_ms) {
        if max < base {
            errors.push(format!(
                "settings.retry.max_delay_ms ({}) must be >= base_delay_ms ({})",
                max, base
            ));
        }
    }
    if let Some(codes) = &retry.retryable_status_codes {
        for code in codes {
            if !(100..=599).contains(code) {
                errors.push(format!("settings.retry.retryable_status_codes: {} is not an HTTP status", code));
            }
            if *code == 401 {
                errors.push("settings.retry.retryable_status_codes must not contain 401 (handled by reauthentication)".to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::environments::EnvironmentConfig;

    #[test]
    fn aggregates_all_issues() {
        let mut cfg = ServiceConfig::default();
        cfg.settings.timeout_ms = 0;
        cfg.settings.retry = Some(RetryConfig {
            retryable_status_codes: Some(vec![401, 42]),
            ..Default::default()
        });
        cfg.environments.insert(
            "bad name".into(),
            EnvironmentConfig {
                base_url: Some("ftp://x".into()),
                ..Default::default()
            },
        );

        let errors = validate_service_config(&cfg).unwrap_err();
        assert_eq!(errors.len(), 5, "{errors:?}");
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_service_config(&ServiceConfig::default()).is_ok());
    }
}
