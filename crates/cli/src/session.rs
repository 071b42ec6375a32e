//! Builds the agent from configuration and runs one prompt.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use agentbox_agent::{AgentLoop, StopReason};
use agentbox_config::AppConfig;
use agentbox_core::event::EventBus;
use agentbox_core::store::ConversationStore;
use agentbox_core::tool::WorkingRoot;
use agentbox_memory::{InMemoryStore, JsonFileStore};
use agentbox_providers::openai_compat::OpenAiCompatProvider;
use agentbox_tools::{ScriptSettings, ToolDispatcher, ToolSettings};
use tracing::{debug, info, warn};

use crate::Cli;
use crate::reporter::{self, Verbosity};

/// Load configuration: file, then environment, then command-line flags.
pub fn resolve_config(cli: &Cli) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_with_env(path)?,
        None => AppConfig::load()?,
    };

    if let Some(dir) = &cli.working_dir {
        config.sandbox.working_dir = dir.clone();
    }
    if let Some(max_chars) = cli.max_chars {
        config.sandbox.max_chars = max_chars;
    }
    if let Some(limit) = cli.iteration_limit {
        config.agent.max_iterations = limit;
    }
    if let Some(min) = cli.min_iterations {
        config.agent.min_iterations = min;
    }
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if cli.no_history {
        config.history.enabled = false;
    }

    config.validate()?;
    Ok(config)
}

/// The history store `--clear` acts on.
///
/// Only the `[history]` section matters here, so a file whose other values
/// fail validation still yields its history location.
pub fn clear_target(cli: &Cli) -> Box<dyn ConversationStore> {
    let path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let mut config = match AppConfig::read_from(&path) {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Unreadable configuration, clearing the default history");
            AppConfig::default()
        }
    };
    if cli.no_history {
        config.history.enabled = false;
    }
    build_store(&config)
}

/// Tool settings derived from the `[sandbox]` section.
pub fn tool_settings(config: &AppConfig) -> ToolSettings {
    ToolSettings {
        max_chars: config.sandbox.max_chars,
        script: ScriptSettings {
            interpreter: config.sandbox.script.interpreter.clone(),
            extension: config.sandbox.script.extension.clone(),
            timeout: Duration::from_secs(config.sandbox.script.timeout_secs),
        },
    }
}

/// The history store selected by configuration.
pub fn build_store(config: &AppConfig) -> Box<dyn ConversationStore> {
    if config.history.enabled {
        Box::new(JsonFileStore::new(config.history_path()))
    } else {
        Box::new(InMemoryStore::new())
    }
}

/// Assemble the agent loop around one working root.
pub fn build_agent(
    config: &AppConfig,
    root: WorkingRoot,
    events: Arc<EventBus>,
) -> Result<AgentLoop, Box<dyn std::error::Error>> {
    let provider = OpenAiCompatProvider::new(
        &config.provider,
        &config.api_url,
        config.api_key.clone().unwrap_or_default(),
    )?;
    let dispatcher = Arc::new(ToolDispatcher::new(root, &tool_settings(config), events.clone()));

    let mut agent = AgentLoop::new(
        Arc::new(provider),
        &config.model,
        config.temperature,
        dispatcher,
        events,
    )
    .with_max_iterations(config.agent.max_iterations)
    .with_min_iterations(config.agent.min_iterations);

    if let Some(max_tokens) = config.max_tokens {
        agent = agent.with_max_tokens(max_tokens);
    }
    if let Some(prompt) = &config.agent.system_prompt {
        agent = agent.with_system_prompt(prompt);
    }
    Ok(agent)
}

pub async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    if cli.clear {
        let removed = match clear_target(&cli).clear().await {
            Ok(removed) => removed,
            Err(e) => {
                eprintln!("Error: {e}");
                return Ok(ExitCode::FAILURE);
            }
        };
        info!(removed, "Conversation history cleared");
        if cli.prompt_text().is_empty() {
            eprintln!("Conversation history cleared.");
            return Ok(ExitCode::SUCCESS);
        }
    }

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };
    debug!(?config, "Configuration resolved");

    let store = build_store(&config);

    let prompt = cli.prompt_text();
    if prompt.is_empty() {
        eprintln!("Error: no prompt given");
        eprintln!("Usage: agentbox [OPTIONS] <PROMPT>...");
        return Ok(ExitCode::FAILURE);
    }

    let root = match WorkingRoot::new(&config.sandbox.working_dir) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("Error: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };
    info!(root = %root.path().display(), model = %config.model, "Starting agent");

    if !config.has_api_key() {
        debug!("No API key configured, sending requests without one");
    }

    let verbosity = if cli.silent {
        Verbosity::Silent
    } else if cli.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    };

    let events = Arc::new(EventBus::default());
    let printer = reporter::spawn(&events, verbosity);
    let agent = build_agent(&config, root, events)?;

    let result = agent.run(store.as_ref(), &prompt).await;

    // Closing the bus lets the reporter drain before the answer is printed
    drop(agent);
    reporter::finish(printer).await;

    match result {
        Ok(outcome) => {
            if outcome.stop_reason == StopReason::IterationLimit && outcome.text.is_none() {
                eprintln!("No answer was produced.");
            }
            if let Some(text) = outcome.text {
                println!("{text}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}
