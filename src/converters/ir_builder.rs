//! Normalizes raw transaction nodes into the intermediate representation.

use indexmap::IndexMap;
use thiserror::Error;

use crate::loader::layout::{BodyLayout, DocumentLayout};
use crate::loader::source::{RawTransaction, tags};
use crate::loader::xml::XmlElement;
use crate::models::{
    BodySpec, HttpMethod, LatencySpec, MatchValue, RequestDescriptor, ResponseVariant,
    StateHints, Transaction,
};

/// Why a single transaction could not be built. Never fatal to the run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransactionError {
    #[error("missing request block")]
    MissingRequest,

    #[error("unknown HTTP method '{0}'")]
    InvalidMethod(String),

    #[error("no response variants")]
    NoResponseVariants,
}

/// A response field that could not be read and fell back to its default
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("invalid status '{0}', using 200")]
    InvalidStatus(String),

    #[error("invalid latency '{0}', no delay applied")]
    InvalidLatency(String),

    #[error("latency marker '{marker}' does not fit ms '{ms}', using its shape")]
    LatencyMarker { marker: String, ms: String },

    #[error("invalid weight '{0}', using 1.0")]
    InvalidWeight(String),
}

/// A field problem located on one response variant
#[derive(Debug, Clone, PartialEq)]
pub struct FieldIssue {
    pub variant: String,
    pub error: FieldError,
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "response {}: {}", self.variant, self.error)
    }
}

/// A built transaction and the fields that were degraded on the way
#[derive(Debug, Clone)]
pub struct BuiltTransaction {
    pub transaction: Transaction,
    pub issues: Vec<FieldIssue>,
}

type BuildResult<T> = std::result::Result<T, TransactionError>;

/// Builds [`Transaction`]s under one document layout
pub struct IrBuilder<'l> {
    layout: &'l DocumentLayout,
}

impl<'l> IrBuilder<'l> {
    pub fn new(layout: &'l DocumentLayout) -> Self {
        Self { layout }
    }

    pub fn build(&self, raw: &RawTransaction<'_>) -> BuildResult<BuiltTransaction> {
        let node = raw.node;

        let request_node = match node.child(tags::REQUEST) {
            Some(rq) => rq,
            // Paired exports may hang the request data directly off the transaction
            None if node.child(tags::REQUEST_DATA).is_some() => node,
            None => return Err(TransactionError::MissingRequest),
        };

        let request = self.build_request(request_node)?;
        let protocol = self
            .layout
            .meta_text(request_node, "protocol")
            .or_else(|| self.layout.meta_text(node, "protocol"));

        let mut issues = Vec::new();
        let mut responses = Vec::new();
        for (index, container) in self.response_containers(node).into_iter().enumerate() {
            let mut errors = Vec::new();
            responses.push(self.build_variant(container, &mut errors));

            let variant = match container.attr("id") {
                Some(id) => format!("'{}'", id),
                None => index.to_string(),
            };
            issues.extend(errors.into_iter().map(|error| FieldIssue {
                variant: variant.clone(),
                error,
            }));
        }

        if responses.is_empty() {
            return Err(TransactionError::NoResponseVariants);
        }

        Ok(BuiltTransaction {
            transaction: Transaction {
                id: raw.id(),
                protocol,
                request,
                responses,
            },
            issues,
        })
    }

    fn build_request(&self, rq: &XmlElement) -> BuildResult<RequestDescriptor> {
        let body = self.body(rq, tags::REQUEST_DATA).map(BodySpec::detect);

        let method = match self.layout.meta_text(rq, "method") {
            Some(raw) => raw
                .parse::<HttpMethod>()
                .map_err(|_| TransactionError::InvalidMethod(raw))?,
            None if body.as_ref().is_some_and(is_soap_envelope) => HttpMethod::Post,
            None => HttpMethod::Get,
        };

        let path = self
            .layout
            .meta_text(rq, "path")
            .or_else(|| self.layout.meta_text(rq, "endpoint"))
            .unwrap_or_else(|| "/".to_string());

        Ok(RequestDescriptor {
            method,
            path,
            path_template: self.layout.meta_text(rq, "pathTemplate"),
            headers: self.match_values(rq, "headers", "header"),
            query: self.match_values(rq, "query", "param"),
            soap_action: self.layout.meta_text(rq, "soapAction"),
            operation: self.layout.meta_text(rq, "operation"),
            body,
        })
    }

    /// Unreadable status, latency and weight fall back to their defaults and are
    /// pushed onto `errors`
    fn build_variant(&self, rp: &XmlElement, errors: &mut Vec<FieldError>) -> ResponseVariant {
        let status = match self.layout.meta_text(rp, "status") {
            Some(raw) => parse_status(&raw).unwrap_or_else(|e| {
                errors.push(e);
                ResponseVariant::DEFAULT_STATUS
            }),
            None => ResponseVariant::DEFAULT_STATUS,
        };

        let latency = match self.layout.meta(rp, "latency") {
            Some(element) => parse_latency(element, errors),
            None => LatencySpec::None,
        };

        let weight = match self
            .weight_text(rp, "weight")
            .or_else(|| self.weight_text(rp, "selectionWeight"))
        {
            Some(raw) => parse_weight(&raw).unwrap_or_else(|e| {
                errors.push(e);
                ResponseVariant::DEFAULT_WEIGHT
            }),
            None => ResponseVariant::DEFAULT_WEIGHT,
        };

        let headers = self
            .named_entries(rp, "headers", "header")
            .into_iter()
            .collect::<IndexMap<_, _>>();

        ResponseVariant {
            id: rp.attr("id").map(str::to_string),
            status,
            headers,
            body: self.body(rp, tags::RESPONSE_DATA).map(BodySpec::detect),
            latency,
            weight,
            selection_logic: self.layout.meta_text(rp, "matchScript"),
            state: self.state_hints(rp),
            notes: self.layout.meta_text(rp, "notes"),
        }
    }

    /// Response containers in document order: `rp` nodes, or bare `rspData` in paired exports
    fn response_containers<'a>(&self, node: &'a XmlElement) -> Vec<&'a XmlElement> {
        let mut containers: Vec<&XmlElement> = node
            .elements_named(tags::RESPONSES)
            .flat_map(|rs| rs.elements_named(tags::RESPONSE))
            .collect();
        if containers.is_empty() {
            containers = node.elements_named(tags::RESPONSE).collect();
        }
        if containers.is_empty() && self.layout.body == BodyLayout::PairedReqRsp {
            containers = node.elements_named(tags::RESPONSE_DATA).collect();
        }
        containers
    }

    /// Body text of a request/response container under the detected layout.
    /// The other layout is tried as a fallback so mixed documents still convert.
    fn body(&self, container: &XmlElement, paired_tag: &str) -> Option<String> {
        let paired = || {
            if container.name == paired_tag {
                return unwrap_body(container);
            }
            container.child(paired_tag).and_then(unwrap_body)
        };
        let inline = || container.child(tags::BODY).and_then(XmlElement::content);

        match self.layout.body {
            BodyLayout::PairedReqRsp => paired().or_else(inline),
            BodyLayout::InlineBody => inline().or_else(paired),
        }
    }

    fn block<'a>(&self, container: &'a XmlElement, name: &str) -> Option<&'a XmlElement> {
        self.layout.meta(container, name)
    }

    fn named_entries(
        &self,
        container: &XmlElement,
        block: &str,
        entry: &str,
    ) -> Vec<(String, String)> {
        self.block(container, block)
            .map(|block| {
                block
                    .elements_named(entry)
                    .filter_map(|e| {
                        let name = e.attr("name")?.trim();
                        (!name.is_empty())
                            .then(|| (name.to_string(), e.text().trim().to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn match_values(
        &self,
        container: &XmlElement,
        block: &str,
        entry: &str,
    ) -> IndexMap<String, MatchValue> {
        self.named_entries(container, block, entry)
            .into_iter()
            .map(|(name, value)| (name, MatchValue::parse(&value)))
            .collect()
    }

    fn weight_text(&self, rp: &XmlElement, key: &str) -> Option<String> {
        let element = self.layout.meta(rp, key)?;
        element
            .trimmed_text()
            .or_else(|| element.attr("value").map(|v| v.trim().to_string()))
    }

    fn state_hints(&self, rp: &XmlElement) -> Option<StateHints> {
        let state = self.layout.meta(rp, "state");
        let attr = |name: &str| {
            state
                .and_then(|s| s.attr(name))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let hints = StateHints {
            scenario: attr("scenario").or_else(|| self.layout.meta_text(rp, "scenario")),
            requires: attr("requires").or_else(|| self.layout.meta_text(rp, "requiredState")),
            sets: attr("sets").or_else(|| self.layout.meta_text(rp, "newState")),
        };

        (!hints.is_empty()).then_some(hints)
    }
}

/// A paired data container holds its body directly or wrapped in a nested `bd`
fn unwrap_body(data: &XmlElement) -> Option<String> {
    match data.child(tags::BODY) {
        Some(bd) => bd.content(),
        None => data.content(),
    }
}

fn is_soap_envelope(body: &BodySpec) -> bool {
    matches!(body, BodySpec::Xml { .. })
        && crate::loader::xml::parse_document(body.content())
            .is_ok_and(|root| root.local_name() == "Envelope")
}

fn parse_status(raw: &str) -> Result<u16, FieldError> {
    raw.trim()
        .parse::<u16>()
        .ok()
        .filter(|status| (100..=599).contains(status))
        .ok_or_else(|| FieldError::InvalidStatus(raw.to_string()))
}

fn parse_ms(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok()
}

fn parse_range(raw: &str) -> Option<LatencySpec> {
    let (lower, upper) = raw.split_once('-')?;
    LatencySpec::range(parse_ms(lower)?, parse_ms(upper)?)
}

/// `<latency ms="a-b">range</latency>`, `<latency ms="n">fixed</latency>`, or a bare
/// `ms` value. A property may carry the value as its text.
///
/// The shape of `ms` decides the kind; a marker that disagrees with it is reported
/// and an unreadable value means no delay.
fn parse_latency(element: &XmlElement, errors: &mut Vec<FieldError>) -> LatencySpec {
    let text = element.trimmed_text();
    let (marker, ms) = match element.attr("ms").map(str::trim) {
        Some(ms) => (text.map(|t| t.to_ascii_lowercase()), ms.to_string()),
        None => match text {
            Some(t) => (None, t),
            None => return LatencySpec::None,
        },
    };

    let by_shape = if ms.contains('-') {
        parse_range(&ms)
    } else {
        parse_ms(&ms).map(|ms| LatencySpec::Fixed { ms })
    };
    let Some(latency) = by_shape else {
        errors.push(FieldError::InvalidLatency(ms));
        return LatencySpec::None;
    };

    let fits = match marker.as_deref() {
        None | Some("") => true,
        Some("range") => matches!(latency, LatencySpec::Range { .. }),
        Some("fixed") => matches!(latency, LatencySpec::Fixed { .. }),
        Some(_) => false,
    };
    if !fits {
        errors.push(FieldError::LatencyMarker {
            marker: marker.unwrap_or_default(),
            ms,
        });
    }
    latency
}

/// Finite and non-negative; `-0` reads as `0` so equal weights keep document order
fn parse_weight(raw: &str) -> Result<f64, FieldError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|w| w.is_finite() && *w >= 0.0)
        .map(|w| if w == 0.0 { 0.0 } else { w })
        .ok_or_else(|| FieldError::InvalidWeight(raw.to_string()))
}
