// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Inboxeval CLI
//!
//! Command-line interface for judging email assistant replies.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inboxeval_core::{DatasetRow, EvalSettings, TargetOutput};
use inboxeval_evals::evaluators::HelpfulnessEvaluator;
use inboxeval_evals::{
    parse_reason_score, ColumnMapping, EvalError, EvalOutput, EvaluatorRegistry,
    ResponseGenerator,
};
use std::future::Future;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "inboxeval")]
#[command(about = "Inboxeval - evaluate email assistant replies", long_about = None)]
struct Cli {
    /// TOML configuration file (environment variables take priority)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// Output as JSON (machine-readable)
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract score and reason from raw judge output
    Parse {
        /// Judge output (read from stdin when omitted)
        #[arg(long)]
        text: Option<String>,
    },

    /// Score one reply for helpfulness
    Judge {
        /// Email or question the reply answers
        #[arg(long)]
        query: String,

        /// Email context available to the assistant
        #[arg(long, default_value = "")]
        context: String,

        /// Instructions the user gave the assistant
        #[arg(long, default_value = "")]
        user_instructions: String,

        /// Reply to score
        #[arg(long)]
        response: String,
    },

    /// Generate a reply with a target model
    Generate {
        /// Target deployment (defaults to the first configured target model)
        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        query: String,

        #[arg(long, default_value = "")]
        context: String,

        #[arg(long, default_value = "")]
        user_instructions: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Parse { text } => {
            let text = match text {
                Some(text) => text,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read judge output from stdin")?;
                    buf
                }
            };

            let (score, reason) = parse_reason_score(Some(text.as_str()))?;
            print_output(
                &EvalOutput::score_with_reason(HelpfulnessEvaluator::METRIC, score, reason),
                cli.json,
            )?;
        }

        Commands::Judge {
            query,
            context,
            user_instructions,
            response,
        } => {
            let settings = load_settings(cli.config.as_ref())?;

            let mut registry = EvaluatorRegistry::new();
            registry.register(
                Arc::new(HelpfulnessEvaluator::from_config(&settings.model)?),
                ColumnMapping::helpfulness(),
            )?;

            let row = DatasetRow::new(query, context, user_instructions, "");
            let target = TargetOutput::new(response);

            info!(judge = %settings.model.azure_deployment, "Judging reply");
            let output = with_timeout(
                settings.run.timeout_secs,
                registry.evaluate(HelpfulnessEvaluator::METRIC, &row, &target),
            )
            .await
            .context("Helpfulness evaluation failed")?;

            print_output(&output, cli.json)?;
        }

        Commands::Generate {
            model,
            query,
            context,
            user_instructions,
        } => {
            let settings = load_settings(cli.config.as_ref())?;
            let model = model
                .or_else(|| settings.target.models.first().cloned())
                .context("No target model given and none configured")?;

            let generator = ResponseGenerator::from_config(
                &settings.model,
                &model,
                settings.target.system_prompt.as_deref(),
            )?;

            info!(model = %model, "Generating reply");
            let output = with_timeout(
                settings.run.timeout_secs,
                generator.generate(&query, &user_instructions, &context),
            )
            .await
            .context("Response generation failed")?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("{}", output.response);
            }
        }
    }

    Ok(())
}

fn load_settings(path: Option<&PathBuf>) -> Result<EvalSettings> {
    let settings =
        EvalSettings::load(path.map(PathBuf::as_path)).context("Failed to load configuration")?;
    settings
        .model
        .validate()
        .context("Judge deployment is not configured")?;
    Ok(settings)
}

/// Bound a model call by the configured timeout; on expiry nothing is kept
async fn with_timeout<T, F>(timeout_secs: Option<u64>, call: F) -> Result<T, EvalError>
where
    F: Future<Output = Result<T, EvalError>>,
{
    match timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), call)
            .await
            .map_err(|_| EvalError::Timeout)?,
        None => call.await,
    }
}

fn print_output(output: &EvalOutput, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(output)?);
        return Ok(());
    }

    let metric = HelpfulnessEvaluator::METRIC;
    match output.float(metric) {
        Some(score) if score.is_finite() => println!("Score:  {}", score),
        _ => println!("Score:  n/a (no score in judge output)"),
    }
    match output.reason(metric) {
        Some(reason) if !reason.is_empty() => println!("Reason: {}", reason),
        _ => println!("Reason: -"),
    }
    Ok(())
}
