//! dt - dashtree demo runner
//!
//! CLI entry point for the todo and tree scenarios.

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use dashtree::cli::{Cli, Command};
use dashtree::config::AppConfig;
use dashtree::demo::{run_todo, run_tree};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) {
    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
}

fn print_transcript(title: &str, lines: &[String]) {
    println!("{}", title.bold());
    for line in lines {
        if line.starts_with("editing:") || line.ends_with("stopped propagation") {
            println!("  {}", line.green());
        } else {
            println!("  {}", line);
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref());

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Todo { tasks, select, deferred } => {
            debug!(tasks, ?select, deferred, "main: matched Todo command");
            let lines = run_todo(config, tasks, select, deferred)?;
            print_transcript("todo", &lines);
        }
        Command::Tree {
            depth,
            fanout,
            stop_at,
            scheduler,
        } => {
            debug!(depth, fanout, ?stop_at, ?scheduler, "main: matched Tree command");
            let lines = run_tree(config, depth, fanout, stop_at, scheduler).await?;
            print_transcript("tree", &lines);
        }
    }

    Ok(())
}
