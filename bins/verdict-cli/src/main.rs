mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use verdict_engine::SandboxKind;

#[derive(Parser)]
#[command(name = "verdict-cli")]
#[command(about = "Verdict CLI - Evaluate submissions locally and inspect normalized code", long_about = None)]
struct Cli {
    /// Engine config file (defaults to VERDICT_CONFIG or config/verdict.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a source file against a JSON file of test cases
    Run {
        /// Source language (javascript, python, java, cpp)
        #[arg(short, long)]
        language: String,

        /// Source file
        #[arg(short, long)]
        file: PathBuf,

        /// Test cases: an array of {input, expected} or an object with testCases
        #[arg(short, long)]
        cases: PathBuf,

        /// Function to call (defaults to the first top-level function)
        #[arg(long)]
        function: Option<String>,

        /// Per-case timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Execution backend
        #[arg(long, value_parser = parse_sandbox)]
        sandbox: Option<SandboxKind>,

        /// Print the raw JSON result
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Print the resolved function and the normalized JavaScript
    Normalize {
        /// Source language (javascript, python, java, cpp)
        #[arg(short, long)]
        language: String,

        /// Source file
        #[arg(short, long)]
        file: PathBuf,

        /// Function to call (defaults to the first top-level function)
        #[arg(long)]
        function: Option<String>,
    },

    /// Check that the configured runtime is reachable
    Check,
}

fn parse_sandbox(value: &str) -> Result<SandboxKind, String> {
    value
        .parse()
        .map_err(|_| format!("unknown sandbox '{value}' (expected process or docker)"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            language,
            file,
            cases,
            function,
            timeout_ms,
            sandbox,
            json,
        } => {
            let options = commands::RunOptions {
                config: cli.config,
                language,
                file,
                cases,
                function,
                timeout_ms,
                sandbox,
                json,
            };
            let all_passed = commands::run(options).await?;
            if !all_passed {
                std::process::exit(1);
            }
        }
        Commands::Normalize {
            language,
            file,
            function,
        } => {
            commands::normalize(&language, &file, function.as_deref())?;
        }
        Commands::Check => {
            commands::check(cli.config.as_deref()).await?;
        }
    }

    Ok(())
}
