use crate::source::SourceLocation;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_EVALUATOR_URL: &str = "http://localhost:3001/api/evaluate";
pub const CITY_FILE: &str = "processed_city_data.csv";
pub const TEAM_FILE: &str = "processed_team_data.csv";
pub const SALES_FILE: &str = "processed_sales_data.csv";

/// Top-level configuration for the dashboard.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data: DataConfig,
    pub evaluator: EvaluatorConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let data_dir = PathBuf::from(
            env::var("DASHBOARD_DATA_DIR").unwrap_or_else(|_| "data".to_string()),
        );
        let url =
            env::var("DASHBOARD_EVALUATOR_URL").unwrap_or_else(|_| DEFAULT_EVALUATOR_URL.to_string());
        let timeout_secs = match env::var("DASHBOARD_EVALUATOR_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidTimeout(raw))?,
            Err(_) => 30,
        };
        let log_level = env::var("DASHBOARD_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            data: DataConfig {
                data_dir,
                city_source: optional_var("DASHBOARD_CITY_SOURCE"),
                team_source: optional_var("DASHBOARD_TEAM_SOURCE"),
                sales_source: optional_var("DASHBOARD_SALES_SOURCE"),
                boundary_source: optional_var("DASHBOARD_BOUNDARY_SOURCE"),
            },
            evaluator: EvaluatorConfig {
                url,
                timeout: Duration::from_secs(timeout_secs),
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Where the three CSV sources (and the optional boundary document) live.
/// Explicit sources win over files inside `data_dir`.
#[derive(Debug, Clone)]
pub struct DataConfig {
    pub data_dir: PathBuf,
    pub city_source: Option<String>,
    pub team_source: Option<String>,
    pub sales_source: Option<String>,
    pub boundary_source: Option<String>,
}

impl DataConfig {
    fn resolve(&self, explicit: &Option<String>, file: &str) -> SourceLocation {
        match explicit {
            Some(value) => SourceLocation::parse(value),
            None => SourceLocation::File(self.data_dir.join(file)),
        }
    }

    pub fn city_location(&self) -> SourceLocation {
        self.resolve(&self.city_source, CITY_FILE)
    }

    pub fn team_location(&self) -> SourceLocation {
        self.resolve(&self.team_source, TEAM_FILE)
    }

    pub fn sales_location(&self) -> SourceLocation {
        self.resolve(&self.sales_source, SALES_FILE)
    }

    pub fn boundary_location(&self) -> Option<SourceLocation> {
        self.boundary_source.as_deref().map(SourceLocation::parse)
    }
}

#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    pub url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DASHBOARD_EVALUATOR_TIMEOUT_SECS must be a positive integer, got '{0}'")]
    InvalidTimeout(String),
}

/// Serializes tests that touch process environment variables.
#[cfg(test)]
pub(crate) fn env_guard() -> &'static std::sync::Mutex<()> {
    static GUARD: std::sync::OnceLock<std::sync::Mutex<()>> = std::sync::OnceLock::new();
    GUARD.get_or_init(|| std::sync::Mutex::new(()))
}
