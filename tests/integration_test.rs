use serde_json::{Value, json};
use std::path::Path;
use vsi2wm::converters::{ConvertOptions, Converter, SoapMatchMode, WireMockConverter};
use vsi2wm::loader::{BodyLayout, MetaLayout, detect_layout, load_source};
use vsi2wm::Vsi2wmError;

fn convert_fixture(name: &str, options: &ConvertOptions) -> vsi2wm::Result<Vec<Value>> {
    let path = Path::new("tests/fixtures").join(name);
    let document = load_source(&path)?;
    let output = WireMockConverter::new().convert_document(&document, name, options)?;
    Ok(output
        .stubs
        .iter()
        .map(|stub| serde_json::to_value(stub).unwrap())
        .collect())
}

#[test]
fn test_load_rest_fixture() {
    let document = load_source("tests/fixtures/rest_inline.vsi").unwrap();

    assert_eq!(document.transaction_count(), 3);
    assert_eq!(document.source_version.as_deref(), Some("10.5"));
    assert_eq!(document.build_number.as_deref(), Some("10.5.0.123"));

    let layout = detect_layout(&document);
    assert_eq!(layout.body, BodyLayout::InlineBody);
    assert_eq!(layout.meta, MetaLayout::InlineMeta);
}

#[test]
fn test_rest_fixture_stubs() {
    let stubs = convert_fixture("rest_inline.vsi", &ConvertOptions::default()).unwrap();
    assert_eq!(stubs.len(), 5);

    // Heavier variant first
    let listing = &stubs[0];
    assert_eq!(listing["priority"], 0);
    assert_eq!(listing["metadata"]["devtest_variant_id"], "listing");
    assert_eq!(listing["request"]["method"], "GET");
    assert_eq!(listing["request"]["urlPath"], "/accounts");
    assert_eq!(
        listing["request"]["headers"],
        json!({"Accept": {"equalTo": "application/json"}})
    );
    assert_eq!(
        listing["request"]["queryParameters"],
        json!({"page": {"equalTo": "1"}})
    );
    assert_eq!(
        listing["response"]["delayDistribution"],
        json!({"type": "uniform", "lower": 50, "upper": 150})
    );
    assert_eq!(
        listing["response"]["headers"],
        json!({"Content-Type": "application/json"})
    );
    assert_eq!(
        listing["response"]["jsonBody"],
        json!({"accounts": [{
            "id": "{{randomValue type='UUID'}}",
            "opened": "{{now offset='-30 days' format='yyyy-MM-dd'}}"
        }]})
    );
    assert_eq!(listing["response"]["transformers"], json!(["response-template"]));

    let empty = &stubs[1];
    assert_eq!(empty["priority"], 1);
    assert_eq!(empty["response"]["jsonBody"], json!({"accounts": []}));
    assert!(empty["response"].get("delayDistribution").is_none());
}

#[test]
fn test_rest_fixture_request_body_and_fixed_latency() {
    let stubs = convert_fixture("rest_inline.vsi", &ConvertOptions::default()).unwrap();

    let create = stubs
        .iter()
        .find(|s| s["metadata"]["devtest_transaction_id"] == "POST#/accounts")
        .unwrap();
    assert_eq!(create["response"]["status"], 201);
    assert_eq!(create["response"]["fixedDelayMilliseconds"], 25);
    assert_eq!(
        create["request"]["bodyPatterns"],
        json!([{
            "equalToJson": {"owner": "jane"},
            "ignoreArrayOrder": true,
            "ignoreExtraElements": true
        }])
    );
    assert_eq!(
        create["response"]["jsonBody"]["owner"],
        "{{xPath request.body '//owner/text()'}}"
    );
}

#[test]
fn test_selection_logic_and_path_template() {
    let stubs = convert_fixture("rest_inline.vsi", &ConvertOptions::default()).unwrap();

    let statements: Vec<&Value> = stubs
        .iter()
        .filter(|s| s["metadata"]["devtest_transaction_id"] == "GET#/accounts/{id}/statement")
        .collect();
    assert_eq!(statements.len(), 2);

    let premium = statements[0];
    assert_eq!(premium["request"]["urlPathPattern"], "/accounts/[^/]+/statement");
    assert!(premium["request"].get("urlPath").is_none());
    assert_eq!(
        premium["request"]["queryParameters"],
        json!({"tier": {"equalTo": "premium"}})
    );
    assert_eq!(premium["priority"], 0);

    let default = statements[1];
    assert!(default["request"].get("queryParameters").is_none());
    assert_eq!(default["response"]["body"], "statement");
    assert_eq!(default["priority"], 1);
}

#[test]
fn test_soap_paired_fixture() {
    let stubs = convert_fixture("soap_paired.vsi", &ConvertOptions::default()).unwrap();
    assert_eq!(stubs.len(), 2);

    let found = &stubs[0];
    assert_eq!(found["metadata"]["devtest_variant_id"], "found");
    assert_eq!(found["request"]["method"], "POST");
    assert_eq!(
        found["request"]["urlPath"],
        "/soa-infra/services/erp/SupplierService"
    );
    assert_eq!(
        found["request"]["headers"]["SOAPAction"],
        json!({"equalTo": "urn:SupplierService#getSupplier"})
    );

    let patterns = found["request"]["bodyPatterns"].as_array().unwrap();
    assert!(patterns.iter().any(|p| p.get("equalToXml").is_some()));
    assert!(
        patterns
            .iter()
            .any(|p| p["matchesXPath"] == "//*[local-name()='getSupplier']")
    );
    assert!(found["response"]["body"].as_str().unwrap().contains("<supplier>"));

    let fault = &stubs[1];
    assert_eq!(fault["priority"], 1);
    assert_eq!(fault["response"]["status"], 500);
}

#[test]
fn test_soap_match_xpath_only() {
    let options = ConvertOptions {
        soap_match: SoapMatchMode::XPath,
        ..Default::default()
    };
    let stubs = convert_fixture("soap_paired.vsi", &options).unwrap();

    assert!(stubs[0]["request"].get("headers").is_none());
    assert!(
        stubs[0]["request"]["bodyPatterns"]
            .as_array()
            .unwrap()
            .iter()
            .any(|p| p.get("matchesXPath").is_some())
    );
}

#[test]
fn test_mixed_protocols_fixture() {
    let path = Path::new("tests/fixtures/mixed_protocols.vsi");
    let document = load_source(path).unwrap();
    let output = WireMockConverter::new()
        .convert_document(&document, "mixed_protocols.vsi", &ConvertOptions::default())
        .unwrap();
    let report = &output.report;

    assert_eq!(report.counts.transactions_seen, 4);
    assert_eq!(report.counts.transactions_skipped_non_http, 1);
    assert_eq!(report.counts.transactions_quarantined, 1);
    assert_eq!(report.counts.stubs_generated, 2);

    let ids: Vec<&str> = output
        .stubs
        .iter()
        .map(|s| s.metadata.devtest_transaction_id.as_str())
        .collect();
    assert_eq!(ids, vec!["GET#/status", "transaction_3"]);

    assert!(
        report
            .warnings
            .iter()
            .any(|w| w == "Skipping non-HTTP transaction 'JMS#orders.queue' (protocol: jms)")
    );
    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.starts_with("Quarantined transaction 'DELETE#/status'"))
    );
    assert!(report.warnings.iter().any(|w| w.contains("'transaction_3'")));
}

#[test]
fn test_missing_transaction_list_is_fatal() {
    let err = load_source("tests/fixtures/not_a_service_image.vsi").unwrap_err();
    assert!(matches!(err, Vsi2wmError::MissingTransactionList));
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn test_unreadable_source_is_fatal() {
    let err = load_source("tests/fixtures/does_not_exist.vsi").unwrap_err();
    assert!(matches!(err, Vsi2wmError::SourceLoadError(_)));
    assert_eq!(err.exit_code(), 3);
}
