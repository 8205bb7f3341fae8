use std::env;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::models::FilterSpec;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub login: LoginSettings,
    pub filter: FilterSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Credentials for the headless runner. Missing values are rejected by the
/// login flow, not here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginSettings {
    pub tenant: String,
    pub email: String,
    pub password: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub user_ids: Vec<String>,
    pub crop_types: Vec<String>,
    pub crop_statuses: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl FilterSettings {
    pub fn to_spec(&self) -> FilterSpec {
        let mut spec = FilterSpec::unconstrained()
            .with_user_ids(self.user_ids.iter().cloned())
            .with_crop_types(self.crop_types.iter().cloned())
            .with_crop_status(self.crop_statuses.iter().cloned());
        spec.start_date = self.start_date.clone();
        spec.end_date = self.end_date.clone();
        spec
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Environment variables with prefix AGROMO_, e.g. AGROMO_API__BASE_URL
            .add_source(
                Environment::with_prefix("AGROMO")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("filter.user_ids")
                    .with_list_parse_key("filter.crop_types")
                    .with_list_parse_key("filter.crop_statuses")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }
}
