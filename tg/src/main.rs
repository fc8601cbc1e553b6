//! TaskGauge - adaptive progress gauge demo CLI
//!
//! Entry point for running sample workloads under the gauge.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result, eyre};
use tracing::info;

use taskgauge::cli::{Cli, Command, TerminalPresenter};
use taskgauge::config::Config;
use taskgauge::history::DurationHistory;
use taskgauge::samples;
use taskgauge::session::ProgressSession;

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskgauge")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Setup tracing subscriber - write to log file to keep stdout clean for
    // the progress bar
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(log_dir.join("taskgauge.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate()?;

    match cli.command {
        Command::Run {
            sample,
            secs,
            seed,
            repeat,
            cancel_after,
            json,
        } => cmd_run(&config, &sample, secs, seed, repeat, cancel_after, json).await,
        Command::Samples => cmd_samples(),
    }
}

/// Run a sample workload `repeat` times against one shared history
async fn cmd_run(
    config: &Config,
    sample: &str,
    secs: u32,
    seed: Option<f64>,
    repeat: u32,
    cancel_after: Option<f64>,
    json: bool,
) -> Result<()> {
    let history = Arc::new(DurationHistory::new(config.history.clone()));
    let seed = Duration::from_secs_f64(seed.unwrap_or(config.demo.seed_secs));

    for attempt in 1..=repeat {
        let (task, identity) = samples::by_name(sample, secs)
            .ok_or_else(|| eyre!("Unknown sample: {sample}. Try `tg samples`."))?;
        let title = if repeat > 1 {
            format!("{sample} #{attempt}")
        } else {
            sample.to_string()
        };

        let presenter = Arc::new(TerminalPresenter::new(title.clone()));
        let mut session = ProgressSession::new(history.clone(), presenter, config.clock.clone());
        session.configure(task, identity, seed, Some(title))?;

        println!(
            "{} {} (estimated {})",
            "running".cyan(),
            sample,
            format_secs(session.predicted())
        );
        session.run()?;

        if let Some(after) = cancel_after {
            tokio::select! {
                _ = session.finished() => {}
                _ = tokio::time::sleep(Duration::from_secs_f64(after)) => {
                    session.request_cancel();
                    session.finished().await;
                }
            }
        } else {
            tokio::select! {
                _ = session.finished() => {}
                _ = tokio::signal::ctrl_c() => {
                    session.request_cancel();
                    session.finished().await;
                }
            }
        }

        let report = session
            .report()
            .ok_or_else(|| eyre!("session ended without a report"))?;

        match &report.outcome {
            taskgauge::TaskOutcome::Success { value } => {
                println!("{} value: {value}", "done".green());
            }
            taskgauge::TaskOutcome::Failure { error } => {
                println!("{} {}", "failed".red(), error.message);
                for line in error.trace.lines() {
                    println!("    {line}");
                }
            }
            taskgauge::TaskOutcome::Cancelled { reason } => {
                println!("{} {reason}", "cancelled".yellow());
            }
        }
        println!(
            "  elapsed {} (predicted {})",
            format_secs(Duration::from_millis(report.elapsed_ms)),
            format_secs(Duration::from_millis(report.predicted_ms)),
        );

        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        // A cancelled attempt ends the series; there is nothing to adapt from
        if report.outcome.is_cancelled() {
            break;
        }
    }

    Ok(())
}

fn cmd_samples() -> Result<()> {
    println!("Available samples:");
    for (name, describe) in samples::SAMPLES {
        println!("  {:<14} {}", name.bold(), describe);
    }
    Ok(())
}

fn format_secs(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}
