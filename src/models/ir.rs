//! Layout-independent intermediate representation of a source document.
//!
//! Everything here is built once by the IR builder and never mutated afterwards;
//! later stages consume it by reference or rebuild a new value.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::loader::xml::is_well_formed;

/// HTTP verb of a recorded request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Trace,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            "TRACE" => Ok(HttpMethod::Trace),
            other => Err(format!("Unknown HTTP method: {}", other)),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected value of a request header or query parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchValue {
    /// Must equal this literal
    Exact(String),
    /// Wildcard (`*`): any value is accepted
    Any,
}

impl Serialize for MatchValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MatchValue::Exact(value) => serializer.serialize_str(value),
            MatchValue::Any => serializer.serialize_str(Self::WILDCARD),
        }
    }
}

impl MatchValue {
    pub const WILDCARD: &'static str = "*";

    /// Classify a raw header/query value. A lone `*` or an empty value is the wildcard.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == Self::WILDCARD {
            MatchValue::Any
        } else {
            MatchValue::Exact(raw.to_string())
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, MatchValue::Any)
    }
}

/// Structural kind of a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    Json,
    Xml,
    Text,
}

impl BodyKind {
    /// File extension used when the body is written out on its own
    pub fn extension(&self) -> &'static str {
        match self {
            BodyKind::Json => "json",
            BodyKind::Xml => "xml",
            BodyKind::Text => "txt",
        }
    }
}

/// Request or response body with its detected kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BodySpec {
    Json {
        content: String,
        #[serde(skip)]
        value: serde_json::Value,
    },
    Xml {
        content: String,
    },
    Text {
        content: String,
    },
}

impl BodySpec {
    /// Detect the body kind from the content itself.
    ///
    /// JSON wins when the content parses as JSON, then well-formed XML, then plain text.
    pub fn detect(content: impl Into<String>) -> Self {
        let content = content.into();
        let trimmed = content.trim();

        if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed)
            && (value.is_object() || value.is_array())
        {
            return BodySpec::Json { content, value };
        }

        if is_well_formed(trimmed) {
            return BodySpec::Xml { content };
        }

        BodySpec::Text { content }
    }

    pub fn kind(&self) -> BodyKind {
        match self {
            BodySpec::Json { .. } => BodyKind::Json,
            BodySpec::Xml { .. } => BodyKind::Xml,
            BodySpec::Text { .. } => BodyKind::Text,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            BodySpec::Json { content, .. }
            | BodySpec::Xml { content }
            | BodySpec::Text { content } => content,
        }
    }

    /// Size in bytes of the body as it would be written out
    pub fn byte_len(&self) -> usize {
        self.content().len()
    }
}

/// Response latency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum LatencySpec {
    #[default]
    None,
    Fixed {
        ms: u64,
    },
    Range {
        lower_ms: u64,
        upper_ms: u64,
    },
}

impl LatencySpec {
    /// Build a range, rejecting inverted bounds
    pub fn range(lower_ms: u64, upper_ms: u64) -> Option<Self> {
        (lower_ms <= upper_ms).then_some(LatencySpec::Range { lower_ms, upper_ms })
    }

    pub fn is_none(&self) -> bool {
        matches!(self, LatencySpec::None)
    }
}

/// Scenario/state hints carried through to stub metadata
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StateHints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sets: Option<String>,
}

impl StateHints {
    pub fn is_empty(&self) -> bool {
        self.scenario.is_none() && self.requires.is_none() && self.sets.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_template: Option<String>,
    pub headers: IndexMap<String, MatchValue>,
    pub query: IndexMap<String, MatchValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soap_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<BodySpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseVariant {
    /// Variant identifier from the source, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub status: u16,
    pub headers: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<BodySpec>,
    pub latency: LatencySpec,
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_logic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<StateHints>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ResponseVariant {
    pub const DEFAULT_STATUS: u16 = 200;
    pub const DEFAULT_WEIGHT: f64 = 1.0;
}

/// One request/response contract unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    pub request: RequestDescriptor,
    pub responses: Vec<ResponseVariant>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_kind_detection() {
        assert_eq!(BodySpec::detect(r#"{"a":1}"#).kind(), BodyKind::Json);
        assert_eq!(BodySpec::detect("<a>1</a>").kind(), BodyKind::Xml);
        assert_eq!(BodySpec::detect("plain").kind(), BodyKind::Text);
    }

    #[test]
    fn test_body_detection_is_structural() {
        // Looks like JSON but does not parse
        assert_eq!(BodySpec::detect(r#"{"a": {{x}}}"#).kind(), BodyKind::Text);
        // Unbalanced markup is not XML
        assert_eq!(BodySpec::detect("<a><b></a>").kind(), BodyKind::Text);
        // Bare scalars are text, not JSON documents
        assert_eq!(BodySpec::detect("42").kind(), BodyKind::Text);
    }

    #[test]
    fn test_json_body_keeps_raw_content() {
        let body = BodySpec::detect("{ \"a\" : 1 }");
        assert_eq!(body.content(), "{ \"a\" : 1 }");
        assert_eq!(body.byte_len(), 11);
    }

    #[test]
    fn test_match_value_wildcard() {
        assert!(MatchValue::parse("*").is_wildcard());
        assert!(MatchValue::parse("  ").is_wildcard());
        assert_eq!(
            MatchValue::parse("application/json"),
            MatchValue::Exact("application/json".to_string())
        );
        // A star inside a value is a literal
        assert!(!MatchValue::parse("*/*").is_wildcard());
    }

    #[test]
    fn test_latency_range_invariant() {
        assert_eq!(
            LatencySpec::range(100, 200),
            Some(LatencySpec::Range {
                lower_ms: 100,
                upper_ms: 200
            })
        );
        assert_eq!(LatencySpec::range(200, 100), None);
        assert!(LatencySpec::default().is_none());
    }

    #[test]
    fn test_http_method_parse() {
        assert_eq!("get".parse::<HttpMethod>(), Ok(HttpMethod::Get));
        assert_eq!(" POST ".parse::<HttpMethod>(), Ok(HttpMethod::Post));
        assert!("FETCH".parse::<HttpMethod>().is_err());
    }
}
