use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_FILE;

#[derive(Parser)]
#[command(name = "vsi2wm")]
#[command(version)]
#[command(about = "Convert CA LISA / DevTest service images to WireMock stubs", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a .vsi service image to WireMock stubs
    Convert {
        /// Path to the .vsi file
        #[arg(short, long = "in", value_name = "FILE")]
        input: PathBuf,

        /// Output directory (defaults to the input file stem)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Latency strategy: uniform or fixed:<ms>
        #[arg(long)]
        latency: Option<String>,

        /// SOAP match strategy: soapAction, xpath or both
        #[arg(long)]
        soap_match: Option<String>,

        /// Largest response body kept inline, in bytes
        #[arg(long)]
        max_file_size: Option<usize>,

        /// Fail on unsupported helpers
        #[arg(long)]
        strict: bool,

        /// Log level (trace, debug, info, warn, error)
        #[arg(long)]
        log_level: Option<String>,

        /// Log format on stderr (text or json)
        #[arg(long)]
        log_format: Option<String>,

        /// Write one mapping file per stub instead of a cloud import file
        #[arg(long)]
        oss_format: bool,

        /// Add a scenario analysis to the report
        #[arg(long)]
        analyze_scenario: bool,

        /// Upload the stubs to WireMock Cloud after writing them
        #[arg(long)]
        auto_upload: bool,

        /// WireMock Cloud API token
        #[arg(long)]
        api_token: Option<String>,

        /// WireMock Cloud project (defaults to a name derived from the input file)
        #[arg(long)]
        project_name: Option<String>,

        /// WireMock Cloud environment
        #[arg(long)]
        environment: Option<String>,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Write a default configuration file
    Create {
        /// Path of the configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the configuration in effect
    Show {
        /// Path of the configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,
    },
}
