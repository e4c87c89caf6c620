//! Heuristic analysis of the converted transactions, attached to the report on request.

use indexmap::IndexMap;

use crate::models::{
    BodyKind, LatencySpec, ScenarioAnalysis, ScenarioPatterns, ScenarioStatistics, Transaction,
};

const LOAD_TEST_SPREAD_MS: u64 = 1000;

fn weight_category(weight: f64) -> &'static str {
    if weight >= 0.8 {
        "high"
    } else if weight >= 0.5 {
        "medium"
    } else if weight >= 0.2 {
        "low"
    } else {
        "very_low"
    }
}

fn header_mentions(transaction: &Transaction, keywords: &[&str]) -> usize {
    transaction
        .request
        .headers
        .keys()
        .filter(|name| {
            let name = name.to_ascii_lowercase();
            keywords.iter().any(|k| name.contains(k))
        })
        .count()
}

fn body_mentions(transaction: &Transaction, keywords: &[&str]) -> usize {
    transaction
        .responses
        .iter()
        .filter_map(|v| v.body.as_ref())
        .filter(|body| {
            let content = body.content().to_ascii_lowercase();
            keywords.iter().any(|k| content.contains(k))
        })
        .count()
}

fn response_kinds(transaction: &Transaction, kind: BodyKind) -> usize {
    transaction
        .responses
        .iter()
        .filter(|v| v.body.as_ref().is_some_and(|b| b.kind() == kind))
        .count()
}

fn detect_patterns(transactions: &[Transaction]) -> ScenarioPatterns {
    let n = transactions.len() as f64;
    if transactions.is_empty() {
        return ScenarioPatterns::default();
    }

    let mut rest = 0usize;
    let mut soap = 0usize;
    let mut stateful = 0usize;
    let mut load = 0usize;
    let mut errors = 0usize;

    for txn in transactions {
        let request = &txn.request;

        if request.path.contains('/') {
            rest += 1;
        }
        if request.soap_action.is_none() {
            rest += 1;
        }
        rest += response_kinds(txn, BodyKind::Json);

        soap += header_mentions(txn, &["soap"]);
        soap += response_kinds(txn, BodyKind::Xml);
        if request.soap_action.is_some() || request.path.to_ascii_lowercase().contains("soap") {
            soap += 1;
        }

        stateful += header_mentions(txn, &["session", "cookie", "token"]);
        stateful += txn
            .responses
            .iter()
            .filter(|v| v.selection_logic.is_some() || v.state.is_some())
            .count();

        let widest_spread = txn
            .responses
            .iter()
            .filter_map(|v| match v.latency {
                LatencySpec::Range { lower_ms, upper_ms } => Some(upper_ms - lower_ms),
                _ => None,
            })
            .max();
        if txn.responses.len() > 2 {
            load += 1;
        }
        if widest_spread.is_some_and(|spread| spread > LOAD_TEST_SPREAD_MS) {
            load += 1;
        }

        errors += txn.responses.iter().filter(|v| v.status >= 400).count();
        errors += body_mentions(txn, &["error", "exception", "fault"]);
    }

    ScenarioPatterns {
        rest_api: rest as f64 >= n * 2.0,
        soap_service: soap as f64 >= n,
        stateful: stateful as f64 >= n * 0.5,
        load_testing: load as f64 >= n * 0.5,
        error_scenarios: errors as f64 >= n * 0.3,
    }
}

fn statistics(transactions: &[Transaction]) -> ScenarioStatistics {
    let variants: usize = transactions.iter().map(|t| t.responses.len()).sum();
    let mut status_codes = IndexMap::new();
    let mut weight_categories = IndexMap::new();

    for variant in transactions.iter().flat_map(|t| t.responses.iter()) {
        *status_codes.entry(variant.status.to_string()).or_insert(0) += 1;
        *weight_categories
            .entry(weight_category(variant.weight).to_string())
            .or_insert(0) += 1;
    }

    ScenarioStatistics {
        transactions: transactions.len(),
        variants,
        avg_variants_per_transaction: if transactions.is_empty() {
            0.0
        } else {
            variants as f64 / transactions.len() as f64
        },
        status_codes,
        weight_categories,
    }
}

/// Score in 0..=100; grows with transactions, variants, selection logic, headers and query
fn complexity_score(transactions: &[Transaction]) -> u32 {
    let capped = |count: usize, per_item: usize, cap: usize| (count * per_item).min(cap);

    let variants: usize = transactions.iter().map(|t| t.responses.len()).sum();
    let with_logic = transactions
        .iter()
        .filter(|t| t.responses.iter().any(|v| v.selection_logic.is_some()))
        .count();
    let headers: usize = transactions.iter().map(|t| t.request.headers.len()).sum();
    let query: usize = transactions.iter().map(|t| t.request.query.len()).sum();

    let score = capped(transactions.len(), 5, 30)
        + capped(variants, 2, 20)
        + capped(with_logic, 10, 20)
        + capped(headers, 2, 15)
        + capped(query, 2, 15);

    score.min(100) as u32
}

fn recommendations(
    patterns: &ScenarioPatterns,
    statistics: &ScenarioStatistics,
    score: u32,
) -> Vec<String> {
    let mut out = Vec::new();
    if score > 70 {
        out.push(
            "High complexity detected. Consider splitting into multiple service images."
                .to_string(),
        );
    }
    if score > 50 {
        out.push(
            "Consider using WireMock Cloud for better management of complex scenarios."
                .to_string(),
        );
    }
    if patterns.stateful {
        out.push(
            "Stateful scenario detected. Review selection logic and state metadata on the generated stubs."
                .to_string(),
        );
    }
    if patterns.load_testing {
        out.push(
            "Load testing pattern detected. Monitor WireMock performance under load."
                .to_string(),
        );
    }
    if patterns.error_scenarios {
        out.push(
            "Error scenarios detected. Ensure proper error handling in client applications."
                .to_string(),
        );
    }
    if statistics.variants > 10 {
        out.push("Many response variants detected. Check stub priorities carefully.".to_string());
    }
    out
}

/// Analyse the built transactions of one document
pub fn analyze_transactions(transactions: &[Transaction]) -> ScenarioAnalysis {
    let patterns = detect_patterns(transactions);
    let statistics = statistics(transactions);
    let complexity_score = complexity_score(transactions);
    let recommendations = recommendations(&patterns, &statistics, complexity_score);

    ScenarioAnalysis {
        patterns,
        statistics,
        complexity_score,
        recommendations,
    }
}
