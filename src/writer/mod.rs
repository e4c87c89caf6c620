//! Writes a conversion run to disk.
//!
//! Nothing is written until conversion has fully succeeded, so a failed run never
//! leaves partial output behind.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cloud::CloudExport;
use crate::config::OutputFormat;
use crate::converters::{ConversionOutput, sanitize_filename};
use crate::error::Result;
use crate::models::{ConversionReport, StubMapping, WriterInfo};

pub const MAPPINGS_DIR: &str = "mappings";
pub const FILES_DIR: &str = "__files";
pub const REPORT_FILE: &str = "report.json";
pub const INDEX_FILE: &str = "stubs_index.json";
pub const SUMMARY_FILE: &str = "summary.txt";
pub const CLOUD_EXPORT_FILE: &str = "wiremock-cloud-export.json";

#[derive(Debug, Clone)]
pub struct WriterOptions {
    pub format: OutputFormat,
    pub max_file_size: usize,
    pub create_index: bool,
    pub create_summary: bool,
}

#[derive(Debug, Serialize)]
struct IndexEntry<'a> {
    index: usize,
    transaction_id: &'a str,
    method: &'a str,
    url: &'a str,
    status: u16,
    priority: u32,
    file: String,
}

/// Paths written by one run
#[derive(Debug, Clone, Default)]
pub struct WrittenFiles {
    pub mappings: Vec<PathBuf>,
    pub bodies: Vec<PathBuf>,
    pub report: PathBuf,
    pub index: Option<PathBuf>,
    pub summary: Option<PathBuf>,
}

impl WrittenFiles {
    pub fn count(&self) -> usize {
        self.mappings.len()
            + self.bodies.len()
            + 1
            + usize::from(self.index.is_some())
            + usize::from(self.summary.is_some())
    }
}

pub struct OutputWriter {
    out_dir: PathBuf,
    options: WriterOptions,
}

/// File name of the `index`-th stub in the per-mapping layout
pub fn mapping_file_name(stub: &StubMapping, index: usize) -> String {
    format!(
        "{}_{}.json",
        sanitize_filename(&stub.metadata.devtest_transaction_id),
        index
    )
}

impl OutputWriter {
    pub fn new(out_dir: impl Into<PathBuf>, options: WriterOptions) -> Self {
        Self {
            out_dir: out_dir.into(),
            options,
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Write stubs, bodies and the report; the report written includes `writer_info`
    pub fn write(&self, output: &ConversionOutput) -> Result<(WrittenFiles, ConversionReport)> {
        fs::create_dir_all(&self.out_dir)?;
        let mut written = WrittenFiles::default();

        let stub_files: Vec<String> = match self.options.format {
            OutputFormat::Oss => {
                let dir = self.out_dir.join(MAPPINGS_DIR);
                fs::create_dir_all(&dir)?;
                let mut names = Vec::with_capacity(output.stubs.len());
                for (index, stub) in output.stubs.iter().enumerate() {
                    let name = mapping_file_name(stub, index);
                    let path = dir.join(&name);
                    fs::write(&path, serde_json::to_string_pretty(stub)?)?;
                    written.mappings.push(path);
                    names.push(format!("{}/{}", MAPPINGS_DIR, name));
                }
                names
            }
            OutputFormat::Cloud => {
                let path = self.out_dir.join(CLOUD_EXPORT_FILE);
                let export = CloudExport::new(&output.stubs);
                fs::write(&path, serde_json::to_string_pretty(&export)?)?;
                written.mappings.push(path);
                vec![CLOUD_EXPORT_FILE.to_string(); output.stubs.len()]
            }
        };

        if !output.files.is_empty() {
            let dir = self.out_dir.join(FILES_DIR);
            fs::create_dir_all(&dir)?;
            for file in &output.files {
                let path = dir.join(&file.file_name);
                fs::write(&path, &file.content)?;
                written.bodies.push(path);
            }
        }

        if self.options.create_index {
            let entries: Vec<IndexEntry<'_>> = output
                .stubs
                .iter()
                .zip(stub_files)
                .enumerate()
                .map(|(index, (stub, file))| IndexEntry {
                    index,
                    transaction_id: &stub.metadata.devtest_transaction_id,
                    method: &stub.request.method,
                    url: stub.url(),
                    status: stub.response.status,
                    priority: stub.priority,
                    file,
                })
                .collect();
            let path = self.out_dir.join(INDEX_FILE);
            fs::write(&path, serde_json::to_string_pretty(&entries)?)?;
            written.index = Some(path);
        }

        if self.options.create_summary {
            written.summary = Some(self.out_dir.join(SUMMARY_FILE));
        }
        written.report = self.out_dir.join(REPORT_FILE);

        let mut report = output.report.clone();
        report.writer_info = Some(WriterInfo {
            max_file_size: self.options.max_file_size,
            output_format: self.options.format.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            files_written: written.count(),
            large_files_split: output.files.len(),
            total_large_file_size: output.files.iter().map(|f| f.content.len()).sum(),
        });

        if let Some(path) = &written.summary {
            fs::write(path, render_summary(&report))?;
        }
        fs::write(&written.report, serde_json::to_string_pretty(&report)?)?;

        tracing::info!(
            out_dir = %self.out_dir.display(),
            files = written.count(),
            "Output written"
        );

        Ok((written, report))
    }
}

/// Human-readable summary of a run
pub fn render_summary(report: &ConversionReport) -> String {
    let counts = &report.counts;
    let or_unknown =
        |value: &Option<String>| value.clone().unwrap_or_else(|| "unknown".to_string());

    let mut lines = vec![
        "VSI to WireMock Conversion Summary".to_string(),
        "==================================".to_string(),
        format!("Source file:    {}", report.source_file),
        format!("Source version: {}", or_unknown(&report.source_version)),
        format!("Build number:   {}", or_unknown(&report.build_number)),
    ];
    if let Some(info) = &report.writer_info {
        lines.push(format!("Output format:  {}", info.output_format));
        lines.push(format!("Files written:  {}", info.files_written));
    }

    lines.push(String::new());
    lines.push(format!("Transactions seen:    {}", counts.transactions_seen));
    lines.push(format!("Skipped (non-HTTP):   {}", counts.transactions_skipped_non_http));
    lines.push(format!("Quarantined:          {}", counts.transactions_quarantined));
    lines.push(format!("Variants converted:   {}", counts.variants_converted));
    lines.push(format!("Stubs generated:      {}", counts.stubs_generated));
    lines.push(format!("Helpers translated:   {}", counts.helpers_translated));
    lines.push(format!("Helpers unsupported:  {}", counts.helpers_unsupported));
    lines.push(format!("Bodies externalized:  {}", counts.bodies_externalized));

    lines.push(String::new());
    lines.push(format!("Warnings ({}):", report.warnings.len()));
    lines.extend(report.warnings.iter().map(|w| format!("  - {}", w)));

    if let Some(scenario) = &report.scenario {
        lines.push(String::new());
        lines.push(format!("Complexity score: {}", scenario.complexity_score));
        lines.extend(scenario.recommendations.iter().map(|r| format!("  * {}", r)));
    }

    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::{BodyFile, ConvertOptions, Converter, WireMockConverter};
    use crate::loader::SourceDocument;
    use tempfile::tempdir;

    const SOURCE: &str = r#"<serviceImage version="9.0"><transactions>
  <t id="GET#/a"><rq><m><method>GET</method><path>/a</path></m></rq><rs><rp><bd>{"a": 1}</bd></rp><rp><bd>{"a": 2}</bd></rp></rs></t>
</transactions></serviceImage>"#;

    fn output() -> ConversionOutput {
        let doc = SourceDocument::parse(SOURCE).unwrap();
        let mut output = WireMockConverter::new()
            .convert_document(&doc, "a.vsi", &ConvertOptions::default())
            .unwrap();
        output.files.push(BodyFile {
            file_name: "GET__a_0_0_body.json".to_string(),
            content: b"{}".to_vec(),
        });
        output
    }

    fn options(format: OutputFormat) -> WriterOptions {
        WriterOptions {
            format,
            max_file_size: 1024,
            create_index: true,
            create_summary: true,
        }
    }

    #[test]
    fn test_oss_layout() {
        let dir = tempdir().unwrap();
        let writer = OutputWriter::new(dir.path(), options(OutputFormat::Oss));
        let (written, report) = writer.write(&output()).unwrap();

        assert!(dir.path().join("mappings/GET__a_0.json").exists());
        assert!(dir.path().join("mappings/GET__a_1.json").exists());
        assert!(dir.path().join("__files/GET__a_0_0_body.json").exists());
        assert!(dir.path().join(SUMMARY_FILE).exists());
        assert_eq!(written.count(), 6);

        let info = report.writer_info.unwrap();
        assert_eq!(info.output_format, "oss");
        assert_eq!(info.large_files_split, 1);
        assert_eq!(info.total_large_file_size, 2);

        let saved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(REPORT_FILE)).unwrap())
                .unwrap();
        assert_eq!(saved["writer_info"]["files_written"], 6);

        let index: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(INDEX_FILE)).unwrap())
                .unwrap();
        assert_eq!(index[1]["file"], "mappings/GET__a_1.json");
        assert_eq!(index[1]["priority"], 1);
        assert_eq!(index[0]["url"], "/a");
    }

    #[test]
    fn test_cloud_layout() {
        let dir = tempdir().unwrap();
        let writer = OutputWriter::new(
            dir.path(),
            WriterOptions {
                create_index: false,
                create_summary: false,
                ..options(OutputFormat::Cloud)
            },
        );
        let (written, _) = writer.write(&output()).unwrap();

        assert!(!dir.path().join(MAPPINGS_DIR).exists());
        assert!(!dir.path().join(INDEX_FILE).exists());
        let export: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join(CLOUD_EXPORT_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(export["metadata"]["total_stubs"], 2);
        assert_eq!(written.count(), 3);
    }

    #[test]
    fn test_summary_lists_warnings() {
        let mut report = ConversionReport::new("x.vsi");
        report.warnings.push("Skipping non-HTTP transaction 'q' (protocol: jms)".to_string());
        let summary = render_summary(&report);
        assert!(summary.contains("Warnings (1):"));
        assert!(summary.contains("protocol: jms"));
        assert!(summary.contains("Source version: unknown"));
    }
}
