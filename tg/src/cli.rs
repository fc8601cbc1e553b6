//! CLI command definitions and the terminal presenter

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::presenter::ProgressPresenter;

/// TaskGauge - adaptive progress gauge for long-running tasks
#[derive(Parser)]
#[command(
    name = "tg",
    about = "Adaptive progress gauge for long-running background tasks",
    version,
    after_help = "Logs are written to: ~/.local/share/taskgauge/logs/taskgauge.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run a sample workload under the progress gauge
    Run {
        /// Sample name (see `tg samples`)
        #[arg(value_name = "SAMPLE")]
        sample: String,

        /// Workload size in seconds (elements for weighted-sum)
        #[arg(short, long, default_value = "10")]
        secs: u32,

        /// Seed estimate in seconds, used when no history exists yet
        #[arg(long)]
        seed: Option<f64>,

        /// Run the workload this many times, reusing history
        #[arg(short, long, default_value = "1")]
        repeat: u32,

        /// Request cancellation after this many seconds
        #[arg(long, value_name = "SECS")]
        cancel_after: Option<f64>,

        /// Print each run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the built-in sample workloads
    Samples,
}

/// Renders the gauge as an in-place terminal bar
///
/// Thin presentation glue over stdout; all pacing decisions happen in the
/// core.
pub struct TerminalPresenter {
    label: String,
    failed: Mutex<bool>,
}

const BAR_CELLS: usize = 20;

impl TerminalPresenter {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            failed: Mutex::new(false),
        }
    }
}

impl ProgressPresenter for TerminalPresenter {
    fn display(&self, percent: u8) {
        let filled = (usize::from(percent) * BAR_CELLS) / 100;
        let bar = format!("{}{}", "#".repeat(filled), "-".repeat(BAR_CELLS - filled));
        print!("\r{} [{}] {:>3}%", self.label.bold(), bar, percent);
        let _ = io::stdout().flush();
    }

    fn notify_failed(&self) {
        if let Ok(mut failed) = self.failed.lock() {
            *failed = true;
        }
        println!("\n{}", "task failed".red());
    }

    fn notify_finished(&self) {
        let failed = self.failed.lock().map(|f| *f).unwrap_or(false);
        if !failed {
            println!();
        }
    }
}
