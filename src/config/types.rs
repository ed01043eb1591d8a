use serde::Deserialize;
use std::collections::BTreeMap;

use crate::config::environments::EnvironmentConfig;
use crate::config::settings::SettingsConfig;

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub environments: BTreeMap<String, EnvironmentConfig>,
}
