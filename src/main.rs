use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;
use vsi2wm::{
    Result,
    cli::{Cli, Commands, ConfigAction},
    commands::{self, ConvertCommandArgs},
};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e.to_string().red());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Convert {
            input,
            out,
            config,
            latency,
            soap_match,
            max_file_size,
            strict,
            log_level,
            log_format,
            oss_format,
            analyze_scenario,
            auto_upload,
            api_token,
            project_name,
            environment,
        } => {
            commands::execute_convert(ConvertCommandArgs {
                input: &input,
                output: out.as_deref(),
                config: config.as_deref(),
                latency: latency.as_deref(),
                soap_match: soap_match.as_deref(),
                max_file_size,
                strict,
                log_level: log_level.as_deref(),
                log_format: log_format.as_deref(),
                oss_format,
                analyze_scenario,
                auto_upload,
                api_token: api_token.as_deref(),
                project_name: project_name.as_deref(),
                environment: environment.as_deref(),
            })
            .await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Create { file, force } => commands::execute_config_create(&file, force)?,
            ConfigAction::Show { file } => commands::execute_config_show(&file)?,
        },
    }

    Ok(())
}
