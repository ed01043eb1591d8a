//! Per-environment connection settings.
//!
//! An environment is either described inline in the service config or points
//! at a JSON credentials file:
//!
//! ```json
//! {
//!   "TDX_BASE_URL": "https://example.teamdynamix.com/TDWebApi",
//!   "TDX_USERNAME": "svc-projects",
//!   "TDX_PASSWORD": "c2VjcmV0",
//!   "TDX_PROJECT_APP_IDS": "123, 456"
//! }
//! ```

use std::fs;
use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EnvironmentConfig {
    pub credentials_file: Option<String>,
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub app_ids: Option<Vec<String>>,
    #[serde(default)]
    pub password_encoding: PasswordEncoding,
}

/// How the stored password is encoded. This is obfuscation, not protection.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PasswordEncoding {
    #[default]
    Base64,
    Plain,
}

#[derive(Debug, Deserialize, Default)]
struct CredentialsFile {
    #[serde(rename = "TDX_BASE_URL")]
    base_url: Option<String>,
    #[serde(rename = "TDX_USERNAME")]
    username: Option<String>,
    #[serde(rename = "TDX_PASSWORD")]
    password: Option<String>,
    #[serde(rename = "TDX_PROJECT_APP_IDS")]
    project_app_ids: Option<String>,
    #[serde(rename = "TDX_TICKET_APP_IDS")]
    ticket_app_ids: Option<String>,
}

/// Everything needed to talk to one environment, password already decoded.
#[derive(Clone, PartialEq, Eq)]
pub struct Connection {
    pub environment: String,
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub app_ids: Vec<String>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("environment", &self.environment)
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("app_ids", &self.app_ids)
            .finish()
    }
}

impl EnvironmentConfig {
    /// True when the entry only points at an unset credentials file,
    /// e.g. `credentials_file: "${TDX_DEV_CREDENTIALS_FILE:}"` with the variable absent.
    pub fn is_unset(&self) -> bool {
        let file_unset = self
            .credentials_file
            .as_deref()
            .map(|p| p.trim().is_empty())
            .unwrap_or(true);
        file_unset && self.base_url.is_none() && self.username.is_none() && self.password.is_none()
    }

    pub fn resolve(&self, environment: &str) -> Result<Connection, ApiError> {
        let fail = |reason: String| ApiError::Configuration {
            environment: environment.to_string(),
            reason,
        };

        let file = match self.credentials_file.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => load_credentials_file(path).map_err(fail)?,
            _ => CredentialsFile::default(),
        };

        // inline values win over the file
        let base_url = non_empty(self.base_url.clone().or(file.base_url));
        let username = non_empty(self.username.clone().or(file.username));
        let password = non_empty(self.password.clone().or(file.password));
        let app_ids = self
            .app_ids
            .clone()
            .or_else(|| {
                file.project_app_ids
                    .or(file.ticket_app_ids)
                    .map(|ids| split_app_ids(&ids))
            })
            .unwrap_or_default()
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect::<Vec<_>>();

        let mut missing = Vec::new();
        if base_url.is_none() {
            missing.push("TDX_BASE_URL");
        }
        if username.is_none() {
            missing.push("TDX_USERNAME");
        }
        if password.is_none() {
            missing.push("TDX_PASSWORD");
        }
        if app_ids.is_empty() {
            missing.push("TDX_PROJECT_APP_IDS");
        }
        let (Some(base_url), Some(username), Some(password), false) =
            (base_url, username, password, app_ids.is_empty())
        else {
            return Err(fail(format!("missing required configuration: {}", missing.join(", "))));
        };

        let password = decode_password(&password, self.password_encoding).map_err(fail)?;

        Ok(Connection {
            environment: environment.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            password,
            app_ids,
        })
    }
}

fn load_credentials_file(path: &str) -> Result<CredentialsFile, String> {
    let path = expand_home(path);
    let content = fs::read_to_string(&path)
        .map_err(|e| format!("cannot read credentials file {}: {}", path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("invalid credentials file {}: {}", path.display(), e))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn split_app_ids(ids: &str) -> Vec<String> {
    ids.split(',').map(|id| id.trim().to_string()).collect()
}

pub fn decode_password(raw: &str, encoding: PasswordEncoding) -> Result<String, String> {
    match encoding {
        PasswordEncoding::Plain => Ok(raw.to_string()),
        PasswordEncoding::Base64 => {
            let bytes = STANDARD
                .decode(raw.trim())
                .map_err(|e| format!("TDX_PASSWORD is not valid base64: {}", e))?;
            String::from_utf8(bytes).map_err(|_| "TDX_PASSWORD does not decode to UTF-8".to_string())
        }
    }
}

/// `~` and `~/...` resolve against HOME (USERPROFILE on Windows).
pub fn expand_home(path: &str) -> PathBuf {
    let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"));
    match (path.strip_prefix('~'), home) {
        (Some(rest), Ok(home)) => {
            let rest = rest.trim_start_matches(|c: char| c == '/' || c == '\\');
            if rest.is_empty() {
                PathBuf::from(home)
            } else {
                PathBuf::from(home).join(rest)
            }
        }
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn credentials_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn resolves_credentials_file_and_decodes_password() {
        let file = credentials_file(
            r#"{
                "TDX_BASE_URL": "https://tdx.example.edu/TDWebApi/",
                "TDX_USERNAME": "svc",
                "TDX_PASSWORD": "aHVudGVyMg==",
                "TDX_TICKET_APP_IDS": "12, 34,,"
            }"#,
        );
        let cfg = EnvironmentConfig {
            credentials_file: Some(file.path().display().to_string()),
            ..Default::default()
        };

        let conn = cfg.resolve("prod").unwrap();
        assert_eq!(conn.base_url, "https://tdx.example.edu/TDWebApi");
        assert_eq!(conn.username, "svc");
        assert_eq!(conn.password, "hunter2");
        assert_eq!(conn.app_ids, vec!["12", "34"]);
    }

    #[test]
    fn inline_values_override_file() {
        let file = credentials_file(
            r#"{"TDX_BASE_URL":"https://a","TDX_USERNAME":"u","TDX_PASSWORD":"cA==","TDX_PROJECT_APP_IDS":"1"}"#,
        );
        let cfg = EnvironmentConfig {
            credentials_file: Some(file.path().display().to_string()),
            base_url: Some("https://b".into()),
            password: Some("plain-secret".into()),
            password_encoding: PasswordEncoding::Plain,
            ..Default::default()
        };
        let conn = cfg.resolve("dev").unwrap();
        assert_eq!(conn.base_url, "https://b");
        assert_eq!(conn.password, "plain-secret");
    }

    #[test]
    fn missing_fields_are_configuration_errors() {
        let cfg = EnvironmentConfig {
            base_url: Some("https://a".into()),
            username: Some("u".into()),
            ..Default::default()
        };
        let err = cfg.resolve("test").unwrap_err();
        match err {
            ApiError::Configuration { environment, reason } => {
                assert_eq!(environment, "test");
                assert!(reason.contains("TDX_PASSWORD"));
                assert!(reason.contains("TDX_PROJECT_APP_IDS"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unreadable_file_is_a_configuration_error() {
        let cfg = EnvironmentConfig {
            credentials_file: Some("/definitely/not/here.json".into()),
            ..Default::default()
        };
        assert!(matches!(cfg.resolve("canary"), Err(ApiError::Configuration { .. })));
    }

    #[test]
    fn unset_entries_are_detected() {
        let cfg = EnvironmentConfig {
            credentials_file: Some("  ".into()),
            ..Default::default()
        };
        assert!(cfg.is_unset());
        assert!(!EnvironmentConfig {
            base_url: Some("https://a".into()),
            ..Default::default()
        }
        .is_unset());
    }

    #[test]
    fn bad_base64_password_is_rejected() {
        assert!(decode_password("not base64!!", PasswordEncoding::Base64).is_err());
        assert_eq!(decode_password("c2VjcmV0", PasswordEncoding::Base64).unwrap(), "secret");
    }
}
