//! Conversion configuration, loaded from an optional YAML file and merged with CLI flags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::converters::{ConvertOptions, DEFAULT_MAX_INLINE_BYTES, LatencyStrategy, SoapMatchMode};
use crate::error::{Result, Vsi2wmError};

pub const DEFAULT_CONFIG_FILE: &str = "vsi2wm.yaml";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Output layout produced by the writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Single WireMock Cloud import file
    #[default]
    Cloud,
    /// One mapping file per stub, as read by open-source WireMock
    Oss,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Cloud => "cloud",
            OutputFormat::Oss => "oss",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CloudSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConversionConfig {
    /// `uniform` or `fixed:<ms>`
    pub latency_strategy: String,
    /// `soapAction`, `xpath` or `both`
    pub soap_match_strategy: String,
    /// Largest response body kept inline, in bytes
    pub max_file_size: usize,
    pub strict: bool,
    pub log_level: String,
    pub output_format: OutputFormat,
    pub create_index_files: bool,
    pub create_summary_files: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wiremock_cloud: Option<CloudSettings>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            latency_strategy: LatencyStrategy::Uniform.to_string(),
            soap_match_strategy: SoapMatchMode::Both.to_string(),
            max_file_size: DEFAULT_MAX_INLINE_BYTES,
            strict: false,
            log_level: "info".to_string(),
            output_format: OutputFormat::Cloud,
            create_index_files: true,
            create_summary_files: true,
            wiremock_cloud: None,
        }
    }
}

/// Values given on the command line; `None` keeps the configured value
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub latency_strategy: Option<String>,
    pub soap_match_strategy: Option<String>,
    pub max_file_size: Option<usize>,
    pub strict: bool,
    pub log_level: Option<String>,
    pub output_format: Option<OutputFormat>,
}

impl ConversionConfig {
    /// Check every value; the first problem is reported as a configuration error
    pub fn validate(&self) -> Result<()> {
        self.latency_strategy.parse::<LatencyStrategy>()?;
        self.soap_match_strategy.parse::<SoapMatchMode>()?;

        if self.max_file_size == 0 {
            return Err(Vsi2wmError::ConfigError(
                "max_file_size must be greater than 0".to_string(),
            ));
        }

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(Vsi2wmError::ConfigError(format!(
                "Invalid log level: '{}'. Expected one of {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }

    /// Apply command-line overrides
    pub fn merge(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(latency) = overrides.latency_strategy {
            self.latency_strategy = latency;
        }
        if let Some(soap) = overrides.soap_match_strategy {
            self.soap_match_strategy = soap;
        }
        if let Some(size) = overrides.max_file_size {
            self.max_file_size = size;
        }
        if overrides.strict {
            self.strict = true;
        }
        if let Some(level) = overrides.log_level {
            self.log_level = level;
        }
        if let Some(format) = overrides.output_format {
            self.output_format = format;
        }
        self
    }

    pub fn convert_options(&self) -> Result<ConvertOptions> {
        Ok(ConvertOptions {
            latency: self.latency_strategy.parse()?,
            soap_match: self.soap_match_strategy.parse()?,
            max_inline_bytes: self.max_file_size,
            strict: self.strict,
            analyze_scenario: false,
        })
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

fn is_blank_yaml(content: &str) -> bool {
    content.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---"
    })
}

/// Load and validate a configuration file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ConversionConfig> {
    let path = path.as_ref();

    let content = fs::read_to_string(path).map_err(|e| {
        Vsi2wmError::ConfigError(format!("Failed to read config {}: {}", path.display(), e))
    })?;

    let config = if is_blank_yaml(&content) {
        ConversionConfig::default()
    } else {
        serde_yaml::from_str::<ConversionConfig>(&content).map_err(|e| {
            Vsi2wmError::ConfigError(format!("Invalid config {}: {}", path.display(), e))
        })?
    };

    config.validate()?;
    tracing::debug!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

const DEFAULT_CONFIG_TEMPLATE: &str = r#"# vsi2wm configuration

# Latency strategy: uniform (default) or fixed:<ms>
latency_strategy: uniform

# SOAP match strategy: soapAction, xpath or both (default: both)
soap_match_strategy: both

# Response bodies larger than this many bytes are written to __files/ (default: 1048576)
max_file_size: 1048576

# Fail on unsupported helpers instead of emitting a placeholder
strict: false

# Log level: trace, debug, info, warn, error (default: info)
log_level: info

# Output format: cloud (single import file) or oss (one file per mapping)
output_format: cloud

# Write stubs_index.json and summary.txt next to the output
create_index_files: true
create_summary_files: true

# WireMock Cloud upload settings
# wiremock_cloud:
#   api_key: your-api-key
#   project_id: your-project
#   environment: default
"#;

/// Write a commented default configuration file
pub fn create_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, DEFAULT_CONFIG_TEMPLATE)?;
    Ok(())
}
