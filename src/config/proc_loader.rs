use std::{fs, path::Path};

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use tracing::{debug, error, info};

use crate::config::proc_validator;
use crate::config::settings::{LogFormat, LoggingConfig};
use crate::config::types::ServiceConfig;

/// Used when no config file exists: one environment per well-known
/// credentials-file variable.
pub const BUILTIN_CONFIG: &str = r#"
settings:
  default_environment: "${TDX_DEFAULT_ENVIRONMENT:prod}"
environments:
  prod:
    credentials_file: "${TDX_PROD_CREDENTIALS_FILE:}"
  test:
    credentials_file: "${TDX_TEST_CREDENTIALS_FILE:}"
  canary:
    credentials_file: "${TDX_CANARY_CREDENTIALS_FILE:}"
  dev:
    credentials_file: "${TDX_DEV_CREDENTIALS_FILE:}"
"#;

/// Load and validate config from YAML file, falling back to the builtin template
pub fn file_to_config(path: &Path) -> Result<ServiceConfig> {
    let content = if path.exists() {
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
    } else {
        info!("config file {} not found, using credentials-file environment variables", path.display());
        BUILTIN_CONFIG.to_string()
    };

    let expanded = expand_env_vars(&content);
    parse_config(&expanded)
}

pub fn parse_config(content: &str) -> Result<ServiceConfig> {
    let mut service_config: ServiceConfig = serde_yaml::from_str(content)
        .inspect_err(|e| error!("parse config error: {}", e))?;

    // Apply defaults
    if service_config.settings.logging.is_none() {
        service_config.settings.logging = Some(LoggingConfig::new("info".to_owned(), LogFormat::from_env()));
    }

    debug!("validation config ...");
    proc_validator::validate_service_config(&service_config)
        .map_err(|errors| anyhow!("invalid configuration:\n  - {}", errors.join("\n  - ")))?;

    Ok(service_config)
}

/// `${VAR}` and `${VAR:default}`; unset variables without a default become empty.
pub fn expand_env_vars(input: &str) -> String {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]*))?\}").expect("static regex");
    re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string())
    })
    .to_string()
}
