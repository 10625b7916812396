//! Command-line interface for medley.
//!
//! Provides commands for syncing a subscription, previewing the resolved
//! collection layout without downloading, and inspecting resolved
//! configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::Subscription;
use crate::core::{FailureMode, SyncRunner};
use crate::domain::RunReport;
use crate::extract::HttpExtractor;
use crate::materialize::{HttpFetcher, Materializer};
use crate::naming::Layout;

/// medley - multi-source media subscription sync
#[derive(Parser, Debug)]
#[command(name = "medley")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync a subscription: extract, merge, and download
    Sync {
        /// Path to the subscription YAML file
        subscription: PathBuf,

        /// Abort on the first permanent failure instead of skipping
        #[arg(long)]
        strict: bool,

        /// Override the output library root
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract and merge without downloading, print the resulting layout
    Plan {
        /// Path to the subscription YAML file
        subscription: PathBuf,
    },

    /// Show resolved configuration for a subscription (debug)
    Config {
        /// Path to the subscription YAML file
        subscription: PathBuf,
    },
}

impl Cli {
    /// Execute the parsed command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Sync {
                subscription,
                strict,
                output,
            } => cmd_sync(&subscription, strict, output).await,
            Commands::Plan { subscription } => cmd_plan(&subscription).await,
            Commands::Config { subscription } => cmd_config(&subscription),
        }
    }
}

/// Build the production runner for a subscription
fn build_runner(
    subscription: &Subscription,
    strict: bool,
) -> SyncRunner<HttpExtractor, HttpFetcher> {
    let mode = if strict {
        FailureMode::Strict
    } else {
        subscription.mode
    };

    let materializer = Materializer::new(
        Arc::new(HttpFetcher::new()),
        subscription.retry.clone(),
        subscription.working_directory.clone(),
    );

    SyncRunner::new(
        Arc::new(HttpExtractor::new()),
        Arc::new(materializer),
        subscription.retry.clone(),
        mode,
    )
}

async fn cmd_sync(path: &Path, strict: bool, output: Option<PathBuf>) -> Result<()> {
    let subscription = Subscription::from_file(path)?;

    let root = output.unwrap_or_else(|| subscription.output.clone());
    let layout = Layout::new(root, subscription.naming.clone());

    tokio::fs::create_dir_all(&subscription.working_directory)
        .await
        .with_context(|| {
            format!(
                "Failed to create working directory {}",
                subscription.working_directory.display()
            )
        })?;

    let runner = build_runner(&subscription, strict);
    let report = runner
        .run(&subscription.name, subscription.sources(), &layout)
        .await?;

    print_report(&report);
    Ok(())
}

async fn cmd_plan(path: &Path) -> Result<()> {
    let subscription = Subscription::from_file(path)?;

    let runner = build_runner(&subscription, false);
    let plan = runner.plan(subscription.sources()).await?;

    println!("Subscription: {}", subscription.name);
    for (ordinal, count) in &plan.source_counts {
        println!("  source {}: {} records extracted", ordinal, count);
    }
    println!();

    for collection in &plan.collections {
        println!(
            "[{}] {} ({} records)",
            collection.ordinal,
            collection.title,
            collection.records.len()
        );
        for (i, record) in collection.records.iter().enumerate() {
            println!(
                "  {:02}  {}  {}  {}",
                i + 1,
                record.upload_date,
                record.uid,
                record.title
            );
        }
    }

    if !plan.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &plan.warnings {
            println!("  - {}", warning);
        }
    }

    Ok(())
}

fn cmd_config(path: &Path) -> Result<()> {
    let subscription = Subscription::from_file(path)?;

    println!("name:              {}", subscription.name);
    println!("output:            {}", subscription.output.display());
    println!(
        "working_directory: {}",
        subscription.working_directory.display()
    );
    println!("mode:              {:?}", subscription.mode);
    println!(
        "retry:             {} attempts, {}ms base, x{}",
        subscription.retry.max_attempts,
        subscription.retry.initial_delay_ms,
        subscription.retry.backoff_multiplier
    );
    println!("sources:");
    for source in subscription.sources().iter() {
        match &source.label {
            Some(label) => println!("  [{}] {} ({})", source.ordinal, source.locator, label),
            None => println!("  [{}] {}", source.ordinal, source.locator),
        }
    }

    Ok(())
}

fn print_report(report: &RunReport) {
    println!(
        "Run {} finished: {} collections, {} records",
        report.run_id,
        report.collections.len(),
        report.total_records()
    );

    for collection in &report.collections {
        println!(
            "  [{}] {}: {} records",
            collection.ordinal,
            collection.title,
            collection.records.len()
        );
    }

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  - {}", warning);
        }
    }
}
