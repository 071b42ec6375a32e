//! agentbox CLI: the main entry point.
//!
//! One invocation answers one prompt:
//! - the prompt words are joined and appended to the saved conversation
//! - the agent loop runs until the model answers or the iteration limit hits
//! - the answer goes to stdout, tool notifications to stderr

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

mod reporter;
mod session;

#[derive(Parser, Debug)]
#[command(
    name = "agentbox",
    about = "agentbox: a sandboxed tool-calling coding agent",
    version,
    author
)]
pub struct Cli {
    /// The prompt to send to the agent
    #[arg(value_name = "PROMPT")]
    prompt: Vec<String>,

    /// Show tool arguments and results, enable debug logging
    #[arg(short, long, conflicts_with = "silent")]
    verbose: bool,

    /// Do not print tool notifications
    #[arg(short, long)]
    silent: bool,

    /// Delete the conversation history before anything else
    #[arg(short, long)]
    clear: bool,

    /// Directory the tools are confined to
    #[arg(long, value_name = "DIR")]
    working_dir: Option<PathBuf>,

    /// Character limit for file reads
    #[arg(long, value_name = "N")]
    max_chars: Option<usize>,

    /// Maximum number of model calls
    #[arg(long, value_name = "N")]
    iteration_limit: Option<u32>,

    /// Model calls that must happen before an answer is accepted
    #[arg(long, value_name = "N")]
    min_iterations: Option<u32>,

    /// Override the model
    #[arg(long)]
    model: Option<String>,

    /// Read configuration from this file instead of ~/.agentbox/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Keep the conversation in memory only
    #[arg(long)]
    no_history: bool,
}

impl Cli {
    /// The prompt words joined with spaces, trimmed.
    fn prompt_text(&self) -> String {
        self.prompt.join(" ").trim().to_string()
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing; stdout is reserved for the answer
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    session::run(cli).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_words_are_joined() {
        let cli = Cli::parse_from(["agentbox", "fix", "the", "bug", "in", "main.py"]);
        assert_eq!(cli.prompt_text(), "fix the bug in main.py");
        assert!(!cli.verbose);
        assert!(!cli.clear);
    }

    #[test]
    fn flags_before_prompt() {
        let cli = Cli::parse_from([
            "agentbox",
            "-v",
            "--iteration-limit",
            "5",
            "--working-dir",
            "calculator",
            "run",
            "tests.py",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.iteration_limit, Some(5));
        assert_eq!(cli.working_dir, Some(PathBuf::from("calculator")));
        assert_eq!(cli.prompt_text(), "run tests.py");
    }

    #[test]
    fn flags_after_prompt() {
        let cli = Cli::parse_from(["agentbox", "list", "files", "--silent", "--no-history"]);
        assert!(cli.silent);
        assert!(cli.no_history);
        assert_eq!(cli.prompt_text(), "list files");
    }

    #[test]
    fn clear_without_prompt() {
        let cli = Cli::parse_from(["agentbox", "--clear"]);
        assert!(cli.clear);
        assert!(cli.prompt_text().is_empty());
    }

    #[test]
    fn verbose_and_silent_conflict() {
        assert!(Cli::try_parse_from(["agentbox", "-v", "-s", "hi"]).is_err());
    }
}
