//! Main entry point for the application.
//!
//! This module initializes logging, loads environment variables and configuration,
//! wires the collaborators into the workflow engine and renders the event stream.
//!
//! The request text comes from `--text` or is asked interactively. A mask file
//! turns the request into a region edit.

mod cli;

use clap::Parser;
use colored::*;
use dialoguer::{theme::ColorfulTheme, Input};
use promptsmith::artifacts;
use promptsmith::config::{self, AppConfig};
use promptsmith::core::rag::{InMemoryStyleIndex, SimilaritySearch};
use promptsmith::core::{Collaborators, MaskData, Termination, UserInput, WorkflowEngine};
use promptsmith::errors::Error;
use promptsmith::event::Event;
use promptsmith::llm::{AssessmentService, LlmAssessor, LlmClient, LlmIntentClassifier};
use promptsmith::utils;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Main entry point that initializes and runs the application.
///
/// # Initialization steps:
/// 1. Parse CLI arguments
/// 2. Initialize logging system
/// 3. Load environment variables
/// 4. Resolve the configuration and build the engine
/// 5. Stream one workflow instance to the console
#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();
    utils::init_logging(&cli.logging_level, cli.log_file);

    if let Err(e) = dotenvy::dotenv() {
        warn!("Failed to load .env file: {}", e);
    }

    match run(cli).await {
        Ok(Termination::Success) => {}
        Ok(termination) => {
            info!("Workflow ended with {}", termination.as_str());
            std::process::exit(2);
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: cli::Cli) -> Result<Termination, Error> {
    let mut config = config::resolve_config(cli.config.as_deref())?;
    if let Some(max_retries) = cli.max_retries {
        config.workflow.max_retry_count = max_retries;
    }

    let index = InMemoryStyleIndex::from_config(&config).await?;
    if cli.list_styles {
        for record in index.list().await {
            let marker = if record.is_system_protected { "🔒" } else { "  " };
            println!("{} {} {}", marker, record.label.cyan().bold(), record.prompt_fragment.dimmed());
        }
        return Ok(Termination::Success);
    }

    let collaborators = build_collaborators(&config, Arc::new(index))?;
    let input = read_input(&cli)?;
    let engine = Arc::new(WorkflowEngine::new(&config, collaborators));

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling workflow");
            interrupt.cancel();
        }
    });

    let spinner = (!cli.json).then(utils::init_spinner);
    let mut stream = engine.stream(input, cancel);
    while let Some(envelope) = stream.recv().await {
        if cli.json {
            println!("{}", serde_json::to_string(&envelope)?);
            continue;
        }
        if let Some(line) = utils::format_event(&envelope) {
            match &spinner {
                Some(spinner) => spinner.println(line),
                None => println!("{}", line),
            }
        }
        if let (Some(spinner), Event::ThoughtLog(data)) = (&spinner, &envelope.event) {
            spinner.set_message(format!("{}...", data.stage));
        }
    }
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let outcome = stream
        .handle
        .await
        .map_err(|e| Error::Invariant(format!("workflow task failed: {}", e)))??;
    Ok(outcome.termination)
}

/// Builds the request from the command line, prompting for the text when absent
fn read_input(cli: &cli::Cli) -> Result<UserInput, Error> {
    let text = match &cli.text {
        Some(text) => text.clone(),
        None => {
            utils::display_welcome_message();
            Input::<String>::with_theme(&ColorfulTheme::default())
                .with_prompt("📝 Your request")
                .interact_text()
                .map_err(|e| Error::Config(format!("Failed to read input: {}", e)))?
        }
    };

    let mask_data = match &cli.mask_file {
        Some(path) => Some(MaskData {
            base64: std::fs::read_to_string(path)?.trim().to_string(),
            reference_image_url: cli.reference_image_url.clone(),
        }),
        None => None,
    };

    Ok(UserInput {
        text,
        mask_data,
        preferred_model: cli.model.clone(),
    })
}

/// Wires the LLM-backed services around an already built style index
fn build_collaborators(
    config: &AppConfig,
    index: Arc<dyn SimilaritySearch>,
) -> Result<Collaborators, Error> {
    let classifier = LlmIntentClassifier::new(LlmClient::new(&config.llm.provider, &config.llm.model)?)?;

    let assessor: Option<Arc<dyn AssessmentService>> = if config.critic.use_external_assessment {
        let client = LlmClient::new(&config.llm.provider, &config.llm.model)?;
        Some(Arc::new(LlmAssessor::new(client)?))
    } else {
        None
    };

    Ok(Collaborators {
        classifier: Arc::new(classifier),
        index,
        artifacts: artifacts::artifact_service_from_config(&config.artifacts)?,
        assessor,
    })
}
