use std::str::FromStr;

use crate::error::Vsi2wmError;

/// Log line format on stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = Vsi2wmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(Vsi2wmError::ConfigError(format!(
                "Invalid log format: '{}'. Expected text or json",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub level: String,
    pub format: LogFormat,
}

impl TelemetryConfig {
    pub fn new(level: impl Into<String>, format: LogFormat) -> Self {
        Self {
            level: level.into(),
            format,
        }
    }

    /// Filter used when `RUST_LOG` is not set
    pub fn default_directive(&self) -> String {
        format!("vsi2wm={}", self.level.to_ascii_lowercase())
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::new("info", LogFormat::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        let config = TelemetryConfig::new("DEBUG", LogFormat::Json);
        assert_eq!(config.default_directive(), "vsi2wm=debug");
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
