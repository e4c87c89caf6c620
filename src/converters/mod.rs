//! Conversion of service images into WireMock stubs
//!
//! The stages run in order for every transaction: IR builder, helper translator,
//! stub mapper, priority assigner and body externalizer. [`WireMockConverter`]
//! drives them and aggregates the report.

pub mod externalizer;
pub mod helpers;
pub mod ir_builder;
pub mod mapper;
pub mod priority;
pub mod scenario;
pub mod selection;
pub mod wiremock;

pub use externalizer::{BodyExternalizer, BodyFile, BodyKey, sanitize_filename};
pub use helpers::{HelperTranslator, TranslateMode, Translation, UnsupportedHelper};
pub use ir_builder::{BuiltTransaction, FieldError, FieldIssue, IrBuilder, TransactionError};
pub use mapper::{StubMapper, VariantContext};
pub use priority::assign_priorities;
pub use scenario::analyze_transactions;
pub use selection::{SelectionConstraint, SelectionOutcome, translate_selection};
pub use wiremock::{ConversionOutput, WireMockConverter};

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, Vsi2wmError};
use crate::loader::SourceDocument;

/// Bodies larger than this many bytes are written to their own file by default
pub const DEFAULT_MAX_INLINE_BYTES: usize = 1_048_576;

/// How recorded latencies become stub delays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LatencyStrategy {
    /// Ranges become uniform distributions, fixed values stay fixed
    #[default]
    Uniform,
    /// Every recorded latency is replaced by this fixed delay
    Fixed(u64),
}

impl FromStr for LatencyStrategy {
    type Err = Vsi2wmError;

    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim();
        if value.eq_ignore_ascii_case("uniform") {
            return Ok(LatencyStrategy::Uniform);
        }
        if let Some(ms) = value.strip_prefix("fixed:") {
            return ms.trim().parse::<u64>().map(LatencyStrategy::Fixed).map_err(|_| {
                Vsi2wmError::ConfigError(format!("Invalid fixed latency: '{}'", value))
            });
        }
        Err(Vsi2wmError::ConfigError(format!(
            "Invalid latency strategy: '{}'. Expected 'uniform' or 'fixed:<ms>'",
            value
        )))
    }
}

impl fmt::Display for LatencyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LatencyStrategy::Uniform => f.write_str("uniform"),
            LatencyStrategy::Fixed(ms) => write!(f, "fixed:{}", ms),
        }
    }
}

/// Which SOAP matchers a stub carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoapMatchMode {
    SoapAction,
    XPath,
    #[default]
    Both,
}

impl SoapMatchMode {
    pub fn matches_action(&self) -> bool {
        matches!(self, SoapMatchMode::SoapAction | SoapMatchMode::Both)
    }

    pub fn matches_xpath(&self) -> bool {
        matches!(self, SoapMatchMode::XPath | SoapMatchMode::Both)
    }
}

impl FromStr for SoapMatchMode {
    type Err = Vsi2wmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "soapaction" => Ok(SoapMatchMode::SoapAction),
            "xpath" => Ok(SoapMatchMode::XPath),
            "both" => Ok(SoapMatchMode::Both),
            other => Err(Vsi2wmError::ConfigError(format!(
                "Invalid SOAP match strategy: '{}'. Expected soapAction, xpath or both",
                other
            ))),
        }
    }
}

impl fmt::Display for SoapMatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SoapMatchMode::SoapAction => "soapAction",
            SoapMatchMode::XPath => "xpath",
            SoapMatchMode::Both => "both",
        })
    }
}

/// Configuration options for converters
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub latency: LatencyStrategy,
    pub soap_match: SoapMatchMode,
    /// Largest body kept inline in a stub
    pub max_inline_bytes: usize,
    /// Fail on the first unsupported helper instead of emitting a sentinel
    pub strict: bool,
    /// Attach a scenario analysis to the report
    pub analyze_scenario: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            latency: LatencyStrategy::Uniform,
            soap_match: SoapMatchMode::Both,
            max_inline_bytes: DEFAULT_MAX_INLINE_BYTES,
            strict: false,
            analyze_scenario: false,
        }
    }
}

/// Trait for converting a source document into a target stub format
pub trait Converter {
    type Output;

    fn convert_document(
        &self,
        document: &SourceDocument,
        source_name: &str,
        options: &ConvertOptions,
    ) -> Result<Self::Output>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_strategy_parse() {
        assert_eq!("uniform".parse::<LatencyStrategy>().unwrap(), LatencyStrategy::Uniform);
        assert_eq!("fixed:150".parse::<LatencyStrategy>().unwrap(), LatencyStrategy::Fixed(150));
        assert!("fixed:abc".parse::<LatencyStrategy>().is_err());
        assert!("gaussian".parse::<LatencyStrategy>().is_err());
        assert_eq!(LatencyStrategy::Fixed(20).to_string(), "fixed:20");
    }

    #[test]
    fn test_soap_match_mode_parse() {
        assert_eq!("soapAction".parse::<SoapMatchMode>().unwrap(), SoapMatchMode::SoapAction);
        assert_eq!("XPATH".parse::<SoapMatchMode>().unwrap(), SoapMatchMode::XPath);
        assert!(SoapMatchMode::Both.matches_action() && SoapMatchMode::Both.matches_xpath());
        assert!(!SoapMatchMode::XPath.matches_action());
        assert!("header".parse::<SoapMatchMode>().is_err());
    }
}
