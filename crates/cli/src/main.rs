//! `restbind`: load a REST tool configuration, list its tools, or call one.
//!
//! ```bash
//! restbind --config github.yaml list
//! restbind --config github.yaml call list_issues --args '{"owner": "rust-lang", "repo": "rust"}'
//! ```
//!
//! Results are printed to stdout as JSON; logs go to stderr.

mod config;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use restbind_http_tools::{EnvSnapshot, ToolRegistry};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Parser)]
#[command(name = "restbind", version, about = "Call REST APIs through declarative tool bindings")]
struct Cli {
    /// Tool configuration file (JSON or YAML).
    #[arg(long, short = 'c', env = "RESTBIND_CONFIG")]
    config: PathBuf,

    /// Override the configured per-request timeout (milliseconds, 0 = none).
    #[arg(long, env = "RESTBIND_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    #[arg(long, env = "RESTBIND_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the configuration and print the tool descriptors.
    List,

    /// Call a tool and print its result.
    Call {
        tool: String,

        /// Arguments as a JSON object.
        #[arg(long, short = 'a', default_value = "{}")]
        args: String,

        /// Print the MCP `CallToolResult` form instead of the raw output.
        #[arg(long)]
        mcp: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("restbind=info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let cfg = config::load_config(&cli.config, cli.timeout_ms)?;
    let registry = ToolRegistry::with_reqwest(cfg, EnvSnapshot::from_process())
        .with_context(|| format!("load tools from {}", cli.config.display()))?;

    match cli.command {
        Command::List => {
            print_json(&serde_json::to_value(registry.list_tools())?)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Call { tool, args, mcp } => {
            let args: Value =
                serde_json::from_str(&args).context("parse --args as a JSON object")?;
            let result = registry.call_tool(&tool, args).await;

            if mcp {
                let (result, ok) = match result {
                    Ok(out) => (out.into_call_tool_result(), true),
                    Err(e) => (e.into_call_tool_result(), false),
                };
                print_json(&serde_json::to_value(result)?)?;
                return Ok(exit_code(ok));
            }

            match result {
                Ok(out) => {
                    print_json(&serde_json::to_value(out)?)?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    tracing::debug!(kind = ?e.kind(), "tool call failed");
                    eprintln!("error: {e}");
                    if let Some(body) = e.error_body() {
                        print_json(body)?;
                    }
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialize output as json")?;
    println!("{text}");
    Ok(())
}
