// src/main.rs
use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use attendance_tracker::config::{AppConfig, RunKind};
use attendance_tracker::runner::ReportRunner;
use attendance_tracker::scheduler::run_scheduler;

#[derive(Parser)]
#[command(name = "attendance-tracker", about = "Attendance reporting pipeline")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, default_value = "attendance.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RunMode {
    /// Morning report for every group.
    Morning,
    /// End-of-day report, sheet sync and notification emails.
    Eod,
    /// Every scheduled report for today, in order.
    Complete,
}

#[derive(Subcommand)]
enum Command {
    /// Run today's report once and exit.
    Run {
        #[arg(long, value_enum, default_value_t = RunMode::Morning)]
        mode: RunMode,
    },
    /// Rebuild the current week's attendance sheet and exit.
    Weekly,
    /// Run forever, firing reports on their configured schedule.
    Schedule,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    let tz = config.tz().context("Invalid timezone")?;
    let schedule = config.report_schedule();

    let runner = ReportRunner::new(config)
        .await
        .context("Failed to initialize report runner")?;

    match cli.command {
        Command::Run { mode } => {
            let all_groups: Vec<String> = schedule
                .entries
                .iter()
                .find(|e| e.kind == RunKind::EndOfDay)
                .map(|e| e.groups.clone())
                .unwrap_or_default();

            match mode {
                RunMode::Morning => runner.run_groups(&all_groups, RunKind::Morning).await?,
                RunMode::Eod => runner.run_groups(&all_groups, RunKind::EndOfDay).await?,
                RunMode::Complete => runner.run_complete().await?,
            }
            info!("Run complete");
        }
        Command::Weekly => {
            let date = runner.today();
            runner.run_weekly(date).await?;
            info!("Weekly sheet update complete");
        }
        Command::Schedule => {
            run_scheduler(Arc::new(runner), schedule, tz).await?;
        }
    }

    Ok(())
}
