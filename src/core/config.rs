use std::env;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Settings {
    runtime: RuntimeSettings,
    regrade: RegradeSettings,
    telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub environment: Environment,
    pub strict_config: bool,
}

#[derive(Debug, Clone)]
pub struct RegradeSettings {
    pub exam_path: String,
    pub attempts_path: String,
    pub report_path: String,
}

#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    pub log_level: String,
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Staging,
    Test,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Staging => "staging",
            Self::Test => "test",
        }
    }

    fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            parse_environment(env_optional("MARKBOOK_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("MARKBOOK_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let exam_path = env_or_default("MARKBOOK_EXAM_FILE", "data/exam.json");
        let attempts_path = env_or_default("MARKBOOK_ATTEMPTS_FILE", "data/attempts.json");
        let report_path = env_or_default("MARKBOOK_REPORT_FILE", "data/regrade_report.json");

        let log_level = env_or_default("MARKBOOK_LOG_LEVEL", "info");
        let json =
            env_optional("MARKBOOK_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            runtime: RuntimeSettings { environment, strict_config },
            regrade: RegradeSettings { exam_path, attempts_path, report_path },
            telemetry: TelemetrySettings { log_level, json },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    pub fn regrade(&self) -> &RegradeSettings {
        &self.regrade
    }

    pub fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.regrade.exam_path.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "MARKBOOK_EXAM_FILE",
                value: String::from("<empty>"),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        let exam_path = std::path::Path::new(&self.regrade.exam_path);
        if !exam_path.exists() || !exam_path.is_file() {
            return Err(ConfigError::InvalidValue {
                field: "MARKBOOK_EXAM_FILE",
                value: self.regrade.exam_path.clone(),
            });
        }

        let attempts_path = std::path::Path::new(&self.regrade.attempts_path);
        if !attempts_path.exists() || !attempts_path.is_file() {
            return Err(ConfigError::InvalidValue {
                field: "MARKBOOK_ATTEMPTS_FILE",
                value: self.regrade.attempts_path.clone(),
            });
        }

        Ok(())
    }
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON")
}

fn parse_environment(value: Option<String>) -> Environment {
    match value.as_deref().map(|item| item.to_lowercase()) {
        Some(ref val) if val == "production" || val == "prod" => Environment::Production,
        Some(ref val) if val == "staging" => Environment::Staging,
        Some(ref val) if val == "test" || val == "testing" => Environment::Test,
        _ => Environment::Development,
    }
}
