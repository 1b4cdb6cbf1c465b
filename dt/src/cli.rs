//! CLI command definitions for the `dt` demo binary

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// dt - component tree runtime demos
#[derive(Parser)]
#[command(
    name = "dt",
    about = "Demos for the dashtree component runtime: bubbling, groups and lifetime-bound listeners",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Todo list where selecting a task takes focus away from the others
    Todo {
        /// Number of tasks to add
        #[arg(short, long, default_value_t = 3)]
        tasks: usize,

        /// Task to select after adding them all (1-based)
        #[arg(short, long)]
        select: Option<usize>,

        /// Emit grabFocus deferred instead of synchronously
        #[arg(long)]
        deferred: bool,
    },

    /// Build a tree and bubble an event up from its deepest leaf
    Tree {
        /// Levels below the root
        #[arg(short, long, default_value_t = 3)]
        depth: usize,

        /// Children per node
        #[arg(short, long, default_value_t = 2)]
        fanout: usize,

        /// Level (0 = root) whose listener stops propagation
        #[arg(long)]
        stop_at: Option<usize>,

        /// Scheduler running the deferred emission
        #[arg(long, value_enum, default_value_t = SchedulerKind::Queue)]
        scheduler: SchedulerKind,
    },
}

/// Scheduler choice for deferred emissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SchedulerKind {
    /// FIFO queue drained by `run_pending`
    Queue,
    /// tokio local tasks on a `LocalSet`
    Tokio,
}
