//! WireMock stub mapping output model
//! https://wiremock.org/docs/stubbing/

use indexmap::IndexMap;
use serde::Serialize;

/// Transformer every generated stub relies on for template expressions
pub const RESPONSE_TEMPLATE_TRANSFORMER: &str = "response-template";

/// A single WireMock stub mapping
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StubMapping {
    /// Matching priority (lower wins)
    pub priority: u32,

    /// Request matcher block
    pub request: RequestPattern,

    /// Response definition
    pub response: ResponseDefinition,

    /// Provenance and review information
    pub metadata: StubMetadata,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPattern {
    pub method: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_path_pattern: Option<String>,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, StringPattern>,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub query_parameters: IndexMap<String, StringPattern>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub body_patterns: Vec<BodyPattern>,
}

/// Exact-match constraint on a header or query parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StringPattern {
    #[serde(rename = "equalTo")]
    pub equal_to: String,
}

impl StringPattern {
    pub fn equal_to(value: impl Into<String>) -> Self {
        Self {
            equal_to: value.into(),
        }
    }
}

/// Request body matcher
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BodyPattern {
    EqualToJson {
        #[serde(rename = "equalToJson")]
        equal_to_json: serde_json::Value,
        #[serde(rename = "ignoreArrayOrder")]
        ignore_array_order: bool,
        #[serde(rename = "ignoreExtraElements")]
        ignore_extra_elements: bool,
    },
    EqualToXml {
        #[serde(rename = "equalToXml")]
        equal_to_xml: String,
    },
    MatchesXPath {
        #[serde(rename = "matchesXPath")]
        matches_xpath: String,
    },
    Contains {
        contains: String,
    },
    EqualTo {
        #[serde(rename = "equalTo")]
        equal_to: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseDefinition {
    pub status: u16,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, String>,

    #[serde(flatten)]
    pub body: Option<ResponseBody>,

    #[serde(flatten)]
    pub delay: Option<Delay>,

    pub transformers: Vec<String>,
}

/// Response body, inline or by file reference
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ResponseBody {
    /// Structured JSON, re-serialized by WireMock
    #[serde(rename = "jsonBody")]
    Json(serde_json::Value),

    /// Literal XML or text
    #[serde(rename = "body")]
    Text(String),

    /// Name of a file under `__files/`
    #[serde(rename = "bodyFileName")]
    File(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Delay {
    #[serde(rename = "delayDistribution")]
    Distribution(DelayDistribution),

    #[serde(rename = "fixedDelayMilliseconds")]
    Fixed(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DelayDistribution {
    #[serde(rename = "type")]
    pub kind: String,
    pub lower: u64,
    pub upper: u64,
}

impl DelayDistribution {
    pub fn uniform(lower: u64, upper: u64) -> Self {
        Self {
            kind: "uniform".to_string(),
            lower,
            upper,
        }
    }
}

/// Stub metadata block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StubMetadata {
    pub devtest_transaction_id: String,

    pub devtest_variant_weight: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub devtest_variant_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub devtest_selection_logic: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub devtest_notes: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub devtest_scenario: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub devtest_required_state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub devtest_new_state: Option<String>,

    #[serde(rename = "manualReview", skip_serializing_if = "is_false")]
    pub manual_review: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl StubMapping {
    /// URL the stub matches, whichever form it uses
    pub fn url(&self) -> &str {
        self.request
            .url_path
            .as_deref()
            .or(self.request.url_path_pattern.as_deref())
            .unwrap_or("")
    }
}
