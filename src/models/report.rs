use serde::Serialize;

use super::scenario::ScenarioAnalysis;

/// Summary of one conversion run
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ConversionReport {
    pub source_file: String,
    pub source_version: Option<String>,
    pub build_number: Option<String>,
    pub counts: ConversionCounts,
    pub warnings: Vec<String>,
    pub notes: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<ScenarioAnalysis>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub writer_info: Option<WriterInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ConversionCounts {
    pub transactions_seen: usize,
    pub transactions_skipped_non_http: usize,
    pub transactions_quarantined: usize,
    pub variants_converted: usize,
    pub stubs_generated: usize,
    pub helpers_translated: usize,
    pub helpers_unsupported: usize,
    pub bodies_externalized: usize,
}

/// Details added by the output writer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriterInfo {
    pub max_file_size: usize,
    pub output_format: String,
    pub version: String,
    pub files_written: usize,
    pub large_files_split: usize,
    pub total_large_file_size: usize,
}

impl ConversionReport {
    pub fn new(source_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            ..Default::default()
        }
    }

    /// Record a warning; mirrored to the log
    pub fn add_warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    /// Record an informational note; mirrored to the log
    pub fn add_note(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{}", message);
        self.notes.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_json_shape() {
        let mut report = ConversionReport::new("service.vsi");
        report.source_version = Some("10.5.0".to_string());
        report.counts.stubs_generated = 2;
        report.add_warning("Skipping non-HTTP protocol: mq");

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["source_file"], "service.vsi");
        assert_eq!(value["source_version"], "10.5.0");
        assert_eq!(value["build_number"], json!(null));
        assert_eq!(value["counts"]["stubs_generated"], 2);
        assert_eq!(value["warnings"], json!(["Skipping non-HTTP protocol: mq"]));
        assert!(value.get("writer_info").is_none());
    }
}
