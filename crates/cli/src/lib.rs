pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use costpilot_core::config::{AppConfig, ConfigOverrides, LoadOptions, LoggingConfig};

use crate::commands::describe::DescriptionSource;
use crate::commands::show::ShowTarget;

#[derive(Debug, Parser)]
#[command(
    name = "costpilot",
    about = "Costpilot cost-analysis CLI",
    long_about = "Turn a project description into a synthetic billing ledger and a cost-optimization report.",
    after_help = "Examples:\n  costpilot describe --file project.txt\n  costpilot analyze\n  costpilot show summary\n  costpilot export"
)]
pub struct Cli {
    #[arg(long, global = true, value_name = "PATH", help = "Explicit config file (must exist)")]
    config: Option<PathBuf>,
    #[arg(long, global = true, value_name = "DIR", help = "Artifact directory override")]
    workspace: Option<PathBuf>,
    #[arg(long, global = true, value_name = "LEVEL", help = "Log level override")]
    log_level: Option<String>,
    #[arg(long, global = true, value_name = "URL", help = "Chat-completions endpoint override")]
    endpoint: Option<String>,
    #[arg(
        long = "model",
        global = true,
        value_name = "ID",
        help = "Candidate model, in order (repeatable; replaces the configured list)"
    )]
    models: Vec<String>,
    #[arg(long, global = true, value_name = "N", help = "Attempts per candidate model")]
    max_attempts: Option<u32>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Store the project description (from --text, --file, or stdin)")]
    Describe {
        #[arg(long, conflicts_with = "file", help = "Description text")]
        text: Option<String>,
        #[arg(long, value_name = "PATH", help = "Read the description from a file")]
        file: Option<PathBuf>,
    },
    #[command(about = "Extract the profile, synthesize billing, and generate the report")]
    Analyze,
    #[command(about = "Print a stored artifact or the recomputed spending summary")]
    Show {
        #[arg(value_enum)]
        target: ShowTarget,
    },
    #[command(about = "Copy the stored report to a timestamped file under exports/")]
    Export,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, credential presence, and the artifact inventory")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                workspace_dir: self.workspace.clone(),
                log_level: self.log_level.clone(),
                endpoint: self.endpoint.clone(),
                models: (!self.models.is_empty()).then(|| self.models.clone()),
                max_attempts: self.max_attempts,
            },
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    let logging = match AppConfig::load(options.clone()) {
        Ok(config) => config.logging,
        Err(_) => AppConfig::default().logging,
    };
    init_logging(&logging);

    let result = match cli.command {
        Command::Describe { text, file } => {
            let source = match (text, file) {
                (Some(text), _) => DescriptionSource::Text(text),
                (None, Some(path)) => DescriptionSource::File(path),
                (None, None) => DescriptionSource::Stdin,
            };
            commands::describe::run(&options, source)
        }
        Command::Analyze => commands::analyze::run(&options),
        Command::Show { target } => commands::show::run(&options, target),
        Command::Export => commands::export::run(&options),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(&options) }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(&options, json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr; stdout carries only command output.
fn init_logging(logging: &LoggingConfig) {
    use costpilot_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match logging.format {
        Compact => builder.compact().init(),
        Pretty => builder.pretty().init(),
        Json => builder.json().init(),
    }
}
