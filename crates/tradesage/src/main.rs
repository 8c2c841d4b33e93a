use std::io::Read;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tradesage::ai::{CompletionError, SignalError};
use tradesage_models::{CompletionOptions, ResponseFormat, TradesageConfig};

#[derive(Parser, Debug)]
#[command(name = "tradesage", about = "TradeSage AI provider client")]
struct Cli {
    /// Path to configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<String>,

    /// Abandon the provider call after this many seconds
    #[arg(long)]
    timeout_seconds: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Authenticate and print the provider status
    Status,

    /// Free-form market analysis for a prompt
    Analyze {
        prompt: String,

        #[arg(long)]
        max_tokens: Option<u32>,

        #[arg(long)]
        temperature: Option<f32>,

        #[arg(long)]
        model: Option<String>,

        /// Ask the provider for a JSON object reply
        #[arg(long)]
        json: bool,
    },

    /// Generate a trading signal from stock data JSON
    Signal {
        /// Read stock data JSON from a file instead of stdin
        #[arg(short, long)]
        input: Option<String>,

        /// Pretty-print the output JSON
        #[arg(long)]
        pretty: bool,
    },
}

fn load_config(path: Option<&str>) -> Result<TradesageConfig> {
    let Some(path) = path else {
        return Ok(TradesageConfig::default());
    };
    let config_str =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read config: {path}"))?;
    toml::from_str(&config_str).with_context(|| "Failed to parse config")
}

/// Cancel `token` once `timeout` elapses.
fn cancel_after(token: &CancellationToken, timeout: Option<u64>) {
    if let Some(seconds) = timeout {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(seconds)).await;
            token.cancel();
        });
    }
}

fn completion_failure(e: CompletionError) -> anyhow::Error {
    match e {
        CompletionError::NotAuthenticated => {
            anyhow::anyhow!("AI analysis unavailable: authentication error")
        }
        other => anyhow::anyhow!("AI analysis unavailable: {other}"),
    }
}

fn signal_failure(e: SignalError) -> anyhow::Error {
    match e {
        SignalError::NotAuthenticated => {
            anyhow::anyhow!("Trading signal unavailable: authentication error")
        }
        other => anyhow::anyhow!("Trading signal unavailable: {other}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let service = tradesage::build_service(&config).context("Failed to build AI service")?;

    let cancel = CancellationToken::new();
    cancel_after(&cancel, cli.timeout_seconds);

    match cli.command {
        Command::Status => {
            let status = service.status().await;
            let output = serde_json::json!({
                "status": status,
                "ready": service.is_ready(),
            });
            println!("{output}");
        }
        Command::Analyze {
            prompt,
            max_tokens,
            temperature,
            model,
            json,
        } => {
            let options = CompletionOptions {
                max_output_tokens: max_tokens,
                temperature,
                response_format: json.then_some(ResponseFormat::JsonObject),
                model,
            };
            let text = service
                .generate_analysis_with_cancel(&prompt, &options, &cancel)
                .await
                .map_err(completion_failure)?;
            println!("{text}");
        }
        Command::Signal { input, pretty } => {
            let stock_json = if let Some(input_path) = &input {
                std::fs::read_to_string(input_path)
                    .with_context(|| format!("Failed to read input: {input_path}"))?
            } else {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read from stdin")?;
                buf
            };
            let stock_data: serde_json::Value =
                serde_json::from_str(&stock_json).context("Failed to parse stock data JSON")?;

            let signal = service
                .generate_trading_signal_with_cancel(&stock_data, &cancel)
                .await
                .map_err(signal_failure)?;

            let output = if pretty {
                serde_json::to_string_pretty(&signal)?
            } else {
                serde_json::to_string(&signal)?
            };
            println!("{output}");
        }
    }

    Ok(())
}
