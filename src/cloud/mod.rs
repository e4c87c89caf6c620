//! WireMock Cloud export format and upload client.

use serde::Serialize;
use std::time::Duration;

use crate::config::CloudSettings;
use crate::error::{Result, Vsi2wmError};
use crate::models::StubMapping;

pub const DEFAULT_BASE_URL: &str = "https://api.wiremock.cloud";
pub const DEFAULT_ENVIRONMENT: &str = "default";
pub const API_TOKEN_ENV: &str = "WIREMOCK_CLOUD_API_TOKEN";

const EXPORT_VERSION: &str = "1.0";
const EXPORT_FORMAT: &str = "wiremock-cloud";
const GENERATOR: &str = "vsi2wm";

/// A stub as listed in a cloud import, named after its source transaction
#[derive(Debug, Serialize)]
pub struct NamedStub<'a> {
    pub name: &'a str,
    #[serde(flatten)]
    pub stub: &'a StubMapping,
}

#[derive(Debug, Serialize)]
pub struct ExportMetadata {
    pub generated_by: &'static str,
    pub total_stubs: usize,
}

#[derive(Debug, Serialize)]
pub struct CloudExport<'a> {
    pub version: &'static str,
    pub format: &'static str,
    pub stubs: Vec<NamedStub<'a>>,
    pub metadata: ExportMetadata,
}

impl<'a> CloudExport<'a> {
    pub fn new(stubs: &'a [StubMapping]) -> Self {
        Self {
            version: EXPORT_VERSION,
            format: EXPORT_FORMAT,
            stubs: stubs
                .iter()
                .map(|stub| NamedStub {
                    name: &stub.metadata.devtest_transaction_id,
                    stub,
                })
                .collect(),
            metadata: ExportMetadata {
                generated_by: GENERATOR,
                total_stubs: stubs.len(),
            },
        }
    }
}

/// Project name derived from the source file stem
pub fn suggest_project_name(stem: &str) -> String {
    stem.to_lowercase().replace(['_', ' '], "-")
}

/// First token found among the flag, the config file and the environment
pub fn resolve_api_token(flag: Option<&str>, settings: Option<&CloudSettings>) -> Option<String> {
    flag.map(str::to_string)
        .or_else(|| settings.and_then(|s| s.api_key.clone()))
        .or_else(|| std::env::var(API_TOKEN_ENV).ok())
        .filter(|token| !token.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub project: String,
    pub environment: String,
    pub uploaded: usize,
    pub attempts: u32,
}

#[derive(Serialize)]
struct UploadRequest<'a> {
    stubs: &'a [StubMapping],
}

/// Client for the WireMock Cloud stub import endpoint
pub struct CloudClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
    max_attempts: u32,
    initial_backoff: Duration,
}

impl CloudClient {
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Vsi2wmError::CloudError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token: api_token.into(),
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, max_attempts: u32, initial_backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.initial_backoff = initial_backoff;
        self
    }

    pub fn stubs_url(&self, project: &str, environment: &str) -> String {
        format!(
            "{}/v1/projects/{}/environments/{}/stubs",
            self.base_url, project, environment
        )
    }

    /// Post all stubs in one request, retrying transport failures and server errors
    pub async fn upload_stubs(
        &self,
        project: &str,
        environment: &str,
        stubs: &[StubMapping],
    ) -> Result<UploadResult> {
        let url = self.stubs_url(project, environment);
        let body = UploadRequest { stubs };
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            tracing::info!(url = %url, attempt, stubs = stubs.len(), "Uploading stubs");

            let response = self
                .http
                .post(&url)
                .bearer_auth(&self.api_token)
                .json(&body)
                .send()
                .await;

            match response {
                Ok(response) if response.status().is_success() => {
                    return Ok(UploadResult {
                        project: project.to_string(),
                        environment: environment.to_string(),
                        uploaded: stubs.len(),
                        attempts: attempt,
                    });
                }
                Ok(response) if response.status().is_server_error() => {
                    last_error = format!("server returned {}", response.status());
                }
                Ok(response) => {
                    let status = response.status();
                    let detail = response.text().await.unwrap_or_default();
                    return Err(Vsi2wmError::CloudError(format!(
                        "Upload rejected with {}: {}",
                        status, detail
                    )));
                }
                Err(e) => last_error = e.to_string(),
            }

            if attempt < self.max_attempts {
                let backoff = self.initial_backoff * 2u32.pow(attempt - 1);
                tracing::warn!(
                    attempt,
                    error = %last_error,
                    "Upload failed; retrying in {:?}",
                    backoff
                );
                tokio::time::sleep(backoff).await;
            }
        }

        Err(Vsi2wmError::CloudError(format!(
            "Upload failed after {} attempts: {}",
            self.max_attempts, last_error
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RequestPattern, ResponseDefinition, StubMetadata};
    use indexmap::IndexMap;
    use serde_json::json;

    fn stub(id: &str) -> StubMapping {
        StubMapping {
            priority: 0,
            request: RequestPattern {
                method: "GET".to_string(),
                url_path: Some("/x".to_string()),
                ..Default::default()
            },
            response: ResponseDefinition {
                status: 200,
                headers: IndexMap::new(),
                body: None,
                delay: None,
                transformers: vec!["response-template".to_string()],
            },
            metadata: StubMetadata {
                devtest_transaction_id: id.to_string(),
                devtest_variant_weight: 1.0,
                devtest_variant_id: None,
                devtest_selection_logic: None,
                devtest_notes: None,
                devtest_scenario: None,
                devtest_required_state: None,
                devtest_new_state: None,
                manual_review: false,
            },
        }
    }

    #[test]
    fn test_export_shape() {
        let stubs = vec![stub("GET#/x")];
        let value = serde_json::to_value(CloudExport::new(&stubs)).unwrap();

        assert_eq!(value["version"], "1.0");
        assert_eq!(value["format"], "wiremock-cloud");
        assert_eq!(value["metadata"], json!({"generated_by": "vsi2wm", "total_stubs": 1}));
        assert_eq!(value["stubs"][0]["name"], "GET#/x");
        assert_eq!(value["stubs"][0]["request"]["urlPath"], "/x");
        assert_eq!(value["stubs"][0]["priority"], 0);
    }

    #[test]
    fn test_project_name_suggestion() {
        assert_eq!(suggest_project_name("Retail_Banking Service"), "retail-banking-service");
    }

    #[test]
    fn test_token_precedence() {
        let settings = CloudSettings {
            api_key: Some("from-config".to_string()),
            ..Default::default()
        };
        assert_eq!(
            resolve_api_token(Some("from-flag"), Some(&settings)).as_deref(),
            Some("from-flag")
        );
        assert_eq!(
            resolve_api_token(None, Some(&settings)).as_deref(),
            Some("from-config")
        );
    }

    #[test]
    fn test_stubs_url() {
        let client = CloudClient::new("t")
            .unwrap()
            .with_base_url("http://localhost:9999/");
        assert_eq!(
            client.stubs_url("retail", "default"),
            "http://localhost:9999/v1/projects/retail/environments/default/stubs"
        );
    }

    #[tokio::test]
    async fn test_upload_gives_up_after_retries() {
        // Nothing listens on port 9 locally; every attempt fails at the transport level
        let client = CloudClient::new("t")
            .unwrap()
            .with_base_url("http://127.0.0.1:9")
            .with_retry(2, Duration::from_millis(1));

        let err = client
            .upload_stubs("p", "default", &[stub("a")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("after 2 attempts"));
    }
}
