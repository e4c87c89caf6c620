//! One stub mapping per response variant.

use crate::loader::xml::parse_document;
use crate::models::stub::RESPONSE_TEMPLATE_TRANSFORMER;
use crate::models::{
    BodyPattern, BodySpec, Delay, DelayDistribution, LatencySpec, MatchValue, RequestDescriptor,
    RequestPattern, ResponseBody, ResponseDefinition, ResponseVariant, StringPattern, StubMapping,
    StubMetadata, Transaction,
};

use super::selection::SelectionConstraint;
use super::{LatencyStrategy, SoapMatchMode};

const SOAP_ACTION_HEADER: &str = "SOAPAction";

/// Per-variant inputs decided by earlier stages
#[derive(Debug, Clone, Default)]
pub struct VariantContext<'a> {
    /// Static constraints translated from the variant's selection script
    pub constraints: &'a [SelectionConstraint],
    /// Helper translation or selection capture was incomplete
    pub manual_review: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StubMapper {
    soap_match: SoapMatchMode,
    latency: LatencyStrategy,
}

impl StubMapper {
    pub fn new(soap_match: SoapMatchMode, latency: LatencyStrategy) -> Self {
        Self {
            soap_match,
            latency,
        }
    }

    /// Map one variant. Priority is left at 0 for the priority assigner.
    pub fn map(
        &self,
        transaction: &Transaction,
        variant: &ResponseVariant,
        context: &VariantContext<'_>,
    ) -> StubMapping {
        let mut request = self.request_pattern(&transaction.request);
        apply_constraints(&mut request, context.constraints);

        StubMapping {
            priority: 0,
            request,
            response: self.response_definition(variant),
            metadata: metadata(transaction, variant, context.manual_review),
        }
    }

    fn request_pattern(&self, request: &RequestDescriptor) -> RequestPattern {
        let mut pattern = RequestPattern {
            method: request.method.to_string(),
            ..Default::default()
        };

        match &request.path_template {
            Some(template) => pattern.url_path_pattern = Some(template.clone()),
            None => pattern.url_path = Some(request.path.clone()),
        }

        pattern.headers = exact_matchers(request.headers.iter());
        pattern.query_parameters = exact_matchers(request.query.iter());

        if let Some(body) = &request.body {
            pattern.body_patterns.push(body_pattern(body));
        }

        if let Some(action) = &request.soap_action {
            if self.soap_match.matches_action() {
                set_header(&mut pattern, SOAP_ACTION_HEADER, action);
            }
            if self.soap_match.matches_xpath()
                && let Some(operation) = soap_operation(request)
            {
                pattern.body_patterns.push(operation_xpath(&operation));
            }
        }

        pattern
    }

    fn response_definition(&self, variant: &ResponseVariant) -> ResponseDefinition {
        let body = variant.body.as_ref().map(|body| match body {
            BodySpec::Json { value, .. } => ResponseBody::Json(value.clone()),
            BodySpec::Xml { content } | BodySpec::Text { content } => {
                ResponseBody::Text(content.clone())
            }
        });

        ResponseDefinition {
            status: variant.status,
            headers: variant.headers.clone(),
            body,
            delay: self.delay(variant.latency),
            transformers: vec![RESPONSE_TEMPLATE_TRANSFORMER.to_string()],
        }
    }

    fn delay(&self, latency: LatencySpec) -> Option<Delay> {
        match (latency, self.latency) {
            (LatencySpec::None, _) => None,
            (_, LatencyStrategy::Fixed(ms)) => Some(Delay::Fixed(ms)),
            (LatencySpec::Fixed { ms }, LatencyStrategy::Uniform) => Some(Delay::Fixed(ms)),
            (LatencySpec::Range { lower_ms, upper_ms }, LatencyStrategy::Uniform) => Some(
                Delay::Distribution(DelayDistribution::uniform(lower_ms, upper_ms)),
            ),
        }
    }
}

fn exact_matchers<'a>(
    entries: impl Iterator<Item = (&'a String, &'a MatchValue)>,
) -> indexmap::IndexMap<String, StringPattern> {
    entries
        .filter_map(|(name, value)| match value {
            MatchValue::Exact(literal) => Some((name.clone(), StringPattern::equal_to(literal))),
            MatchValue::Any => None,
        })
        .collect()
}

/// Insert a header constraint, replacing any existing one with the same name in any case
fn set_header(pattern: &mut RequestPattern, name: &str, value: &str) {
    pattern.headers.retain(|key, _| !key.eq_ignore_ascii_case(name));
    pattern
        .headers
        .insert(name.to_string(), StringPattern::equal_to(value));
}

fn body_pattern(body: &BodySpec) -> BodyPattern {
    match body {
        BodySpec::Json { value, .. } => BodyPattern::EqualToJson {
            equal_to_json: value.clone(),
            ignore_array_order: true,
            ignore_extra_elements: true,
        },
        BodySpec::Xml { content } => BodyPattern::EqualToXml {
            equal_to_xml: content.clone(),
        },
        BodySpec::Text { content } => BodyPattern::EqualTo {
            equal_to: content.clone(),
        },
    }
}

fn operation_xpath(operation: &str) -> BodyPattern {
    BodyPattern::MatchesXPath {
        matches_xpath: format!("//*[local-name()='{}']", operation),
    }
}

/// Declared operation name, or the first element under the envelope `Body`
fn soap_operation(request: &RequestDescriptor) -> Option<String> {
    if let Some(operation) = &request.operation {
        return Some(operation.clone());
    }
    let body = match request.body.as_ref()? {
        BodySpec::Xml { content } => content,
        _ => return None,
    };
    let envelope = parse_document(body).ok()?;
    let soap_body = envelope
        .descendants()
        .into_iter()
        .find(|e| e.local_name() == "Body")?;
    soap_body
        .elements()
        .next()
        .map(|first| first.local_name().to_string())
}

fn apply_constraints(pattern: &mut RequestPattern, constraints: &[SelectionConstraint]) {
    for constraint in constraints {
        match constraint {
            SelectionConstraint::Query { name, value } => {
                pattern
                    .query_parameters
                    .insert(name.clone(), StringPattern::equal_to(value));
            }
            SelectionConstraint::Header { name, value } => set_header(pattern, name, value),
            SelectionConstraint::BodyContains(text) => {
                pattern.body_patterns.push(BodyPattern::Contains {
                    contains: text.clone(),
                });
            }
            SelectionConstraint::Operation(operation) => {
                pattern.body_patterns.push(operation_xpath(operation));
            }
        }
    }
}

fn metadata(
    transaction: &Transaction,
    variant: &ResponseVariant,
    manual_review: bool,
) -> StubMetadata {
    let state = variant.state.clone().unwrap_or_default();
    StubMetadata {
        devtest_transaction_id: transaction.id.clone(),
        devtest_variant_weight: variant.weight,
        devtest_variant_id: variant.id.clone(),
        devtest_selection_logic: variant.selection_logic.clone(),
        devtest_notes: variant.notes.clone(),
        devtest_scenario: state.scenario,
        devtest_required_state: state.requires,
        devtest_new_state: state.sets,
        manual_review,
    }
}
