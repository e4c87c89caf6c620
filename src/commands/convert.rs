//! Convert command implementation
//!
//! Converts a service image into WireMock stubs and optionally uploads them to WireMock Cloud.

use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::cloud::{self, CloudClient, DEFAULT_ENVIRONMENT};
use crate::config::{ConfigOverrides, ConversionConfig, OutputFormat, load_config};
use crate::converters::{ConversionOutput, Converter, WireMockConverter};
use crate::error::{Result, Vsi2wmError};
use crate::loader::load_source;
use crate::telemetry::{LogFormat, TelemetryConfig, init_telemetry};
use crate::writer::{OutputWriter, WriterOptions};

const SOURCE_EXTENSION: &str = "vsi";

/// Arguments of the convert command
#[derive(Debug, Clone)]
pub struct ConvertCommandArgs<'a> {
    pub input: &'a Path,
    pub output: Option<&'a Path>,
    pub config: Option<&'a Path>,
    pub latency: Option<&'a str>,
    pub soap_match: Option<&'a str>,
    pub max_file_size: Option<usize>,
    pub strict: bool,
    pub log_level: Option<&'a str>,
    pub log_format: Option<&'a str>,
    pub oss_format: bool,
    pub analyze_scenario: bool,
    pub auto_upload: bool,
    pub api_token: Option<&'a str>,
    pub project_name: Option<&'a str>,
    pub environment: Option<&'a str>,
}

impl<'a> ConvertCommandArgs<'a> {
    /// Arguments with every option left at its configured value
    pub fn new(input: &'a Path) -> Self {
        Self {
            input,
            output: None,
            config: None,
            latency: None,
            soap_match: None,
            max_file_size: None,
            strict: false,
            log_level: None,
            log_format: None,
            oss_format: false,
            analyze_scenario: false,
            auto_upload: false,
            api_token: None,
            project_name: None,
            environment: None,
        }
    }
}

/// Input must be an existing `.vsi` file
fn validate_input(input: &Path) -> Result<()> {
    if !input.exists() {
        return Err(Vsi2wmError::ValidationError(format!(
            "Input file not found: {}",
            input.display()
        )));
    }
    if !input.is_file() {
        return Err(Vsi2wmError::ValidationError(format!(
            "Input is not a file: {}",
            input.display()
        )));
    }
    let has_extension = input
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(SOURCE_EXTENSION));
    if !has_extension {
        return Err(Vsi2wmError::ValidationError(format!(
            "Input must be a .{} file: {}",
            SOURCE_EXTENSION,
            input.display()
        )));
    }
    Ok(())
}

/// Output directory: the given path, or the input path without its extension
fn resolve_output(input: &Path, output: Option<&Path>) -> Result<PathBuf> {
    let out_dir = match output {
        Some(path) => path.to_path_buf(),
        None => input.with_extension(""),
    };
    if out_dir.exists() && !out_dir.is_dir() {
        return Err(Vsi2wmError::ValidationError(format!(
            "Output path exists and is not a directory: {}",
            out_dir.display()
        )));
    }
    Ok(out_dir)
}

fn input_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "vsi2wm".to_string())
}

/// Execute the convert command
pub async fn execute_convert(args: ConvertCommandArgs<'_>) -> Result<()> {
    validate_input(args.input)?;
    let out_dir = resolve_output(args.input, args.output)?;

    let config = match args.config {
        Some(path) => {
            let config = load_config(path)?;
            println!("{} Loaded config: {}", "✓".green(), path.display());
            config
        }
        None => ConversionConfig::default(),
    };
    let config = config.merge(ConfigOverrides {
        latency_strategy: args.latency.map(str::to_string),
        soap_match_strategy: args.soap_match.map(str::to_string),
        max_file_size: args.max_file_size,
        strict: args.strict,
        log_level: args.log_level.map(str::to_string),
        output_format: args.oss_format.then_some(OutputFormat::Oss),
    });
    config.validate()?;

    let log_format = match args.log_format {
        Some(format) => format.parse()?,
        None => LogFormat::Text,
    };
    init_telemetry(&TelemetryConfig::new(&config.log_level, log_format));

    let mut options = config.convert_options()?;
    options.analyze_scenario = args.analyze_scenario;

    let document = load_source(args.input)?;
    println!(
        "{} Loaded service image: {} ({} transactions)",
        "✓".green(),
        args.input.display(),
        document.transaction_count()
    );

    let source_name = args.input.display().to_string();
    let output = WireMockConverter::new().convert_document(&document, &source_name, &options)?;
    print_conversion(&output);

    let writer = OutputWriter::new(
        &out_dir,
        WriterOptions {
            format: config.output_format,
            max_file_size: config.max_file_size,
            create_index: config.create_index_files,
            create_summary: config.create_summary_files,
        },
    );
    let (written, _) = writer.write(&output)?;
    println!(
        "{} Wrote {} files ({} format) to {}",
        "✓".green(),
        written.count(),
        config.output_format,
        out_dir.display()
    );

    if args.auto_upload {
        upload(&args, &config, &output).await?;
    }

    Ok(())
}

fn print_conversion(output: &ConversionOutput) {
    let counts = &output.report.counts;
    println!(
        "{} Generated {} stubs from {} transactions",
        "✓".green(),
        counts.stubs_generated,
        counts.transactions_seen
    );
    if counts.transactions_skipped_non_http > 0 {
        println!(
            "  Skipped {} non-HTTP transactions",
            counts.transactions_skipped_non_http
        );
    }
    if counts.helpers_translated > 0 || counts.helpers_unsupported > 0 {
        println!(
            "  Helpers: {} translated, {} unsupported",
            counts.helpers_translated, counts.helpers_unsupported
        );
    }
    if !output.report.warnings.is_empty() {
        println!(
            "{} {} warnings (see report.json)",
            "!".yellow(),
            output.report.warnings.len()
        );
    }
}

async fn upload(
    args: &ConvertCommandArgs<'_>,
    config: &ConversionConfig,
    output: &ConversionOutput,
) -> Result<()> {
    let settings = config.wiremock_cloud.as_ref();

    let token = cloud::resolve_api_token(args.api_token, settings).ok_or_else(|| {
        Vsi2wmError::ConfigError(format!(
            "No WireMock Cloud API token: pass --api-token, set wiremock_cloud.api_key or {}",
            cloud::API_TOKEN_ENV
        ))
    })?;
    let project = args
        .project_name
        .map(str::to_string)
        .or_else(|| settings.and_then(|s| s.project_id.clone()))
        .unwrap_or_else(|| cloud::suggest_project_name(&input_stem(args.input)));
    let environment = args
        .environment
        .map(str::to_string)
        .or_else(|| settings.and_then(|s| s.environment.clone()))
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

    let mut client = CloudClient::new(token)?;
    if let Some(base_url) = settings.and_then(|s| s.base_url.as_deref()) {
        client = client.with_base_url(base_url);
    }

    println!(
        "{} Uploading {} stubs to {}/{}...",
        "→".blue(),
        output.stubs.len(),
        project,
        environment
    );
    let result = client
        .upload_stubs(&project, &environment, &output.stubs)
        .await?;
    println!(
        "{} Uploaded {} stubs to {}/{}",
        "✓".green(),
        result.uploaded,
        result.project,
        result.environment
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_input_must_be_vsi_file() {
        let dir = tempdir().unwrap();
        let txt = dir.path().join("service.txt");
        fs::write(&txt, "<x/>").unwrap();

        let err = validate_input(&txt).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(validate_input(dir.path()).unwrap_err().exit_code(), 2);
        assert_eq!(
            validate_input(&dir.path().join("missing.vsi"))
                .unwrap_err()
                .exit_code(),
            2
        );

        let vsi = dir.path().join("service.VSI");
        fs::write(&vsi, "<x/>").unwrap();
        assert!(validate_input(&vsi).is_ok());
    }

    #[test]
    fn test_output_defaults_to_input_stem() {
        let out = resolve_output(Path::new("/data/retail_bank.vsi"), None).unwrap();
        assert_eq!(out, PathBuf::from("/data/retail_bank"));
    }

    #[test]
    fn test_output_must_not_be_a_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("out");
        fs::write(&file, "").unwrap();

        let err = resolve_output(Path::new("a.vsi"), Some(&file)).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
