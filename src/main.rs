//! visnet - command line entry point
//!
//! Loads workspace documents, evaluates them and reports per-processor
//! outcomes. Mostly useful for batch processing and for checking workspaces.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use visnet::config::{AppConfig, LoggingSettings};
use visnet::network::{NetworkDocument, ProcessorNetwork};
use visnet::{ApplicationContext, EvaluationReport};

#[derive(Parser)]
#[command(name = "visnet")]
#[command(about = "Evaluate visualization processor networks", long_about = None)]
struct Cli {
    /// Config file to use instead of the one in the app data directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a workspace and run evaluation passes.
    Run {
        workspace: PathBuf,

        #[arg(long, default_value_t = 1)]
        passes: u32,

        /// Evaluate independent processors on worker threads
        #[arg(long)]
        parallel: bool,

        /// Write the network back out after evaluating
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// List the registered processor classes.
    Processors,
    /// Load a workspace and print its evaluation order without processing.
    Validate { workspace: PathBuf },
}

fn init_logging(settings: &LoggingSettings) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.filter));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr));

    match &settings.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "visnet.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .init();
            Some(guard)
        }
        None => {
            registry.init();
            None
        }
    }
}

fn load_network(
    context: Arc<ApplicationContext>,
    config: &AppConfig,
    workspace: &Path,
) -> anyhow::Result<ProcessorNetwork> {
    let document = NetworkDocument::load(workspace)
        .with_context(|| format!("loading workspace {}", workspace.display()))?;
    let network = ProcessorNetwork::from_document(&document, context, config.evaluation.clone())
        .with_context(|| format!("building network from {}", workspace.display()))?;
    Ok(network)
}

fn print_report(report: &EvaluationReport) {
    println!(
        "pass {}: {} processed, {} failed, {} skipped in {:?}",
        report.pass,
        report.processed.len(),
        report.failed.len(),
        report.skipped.len(),
        report.duration
    );
    for (identifier, error) in &report.failed {
        println!("  failed  {identifier}: {error}");
    }
    for (identifier, reason) in &report.skipped {
        println!("  skipped {identifier}: {reason}");
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_or_default(),
    };
    let _guard = init_logging(&config.logging);

    let context = Arc::new(ApplicationContext::from_config("visnet", &config));

    match cli.cmd {
        Commands::Run {
            workspace,
            passes,
            parallel,
            save,
        } => {
            let mut network = load_network(context, &config, &workspace)?;
            if parallel {
                let mut settings = network.settings().clone();
                settings.parallel = true;
                network.set_settings(settings);
            }

            let mut failures = 0;
            for _ in 0..passes.max(1) {
                let report = network.evaluate();
                print_report(&report);
                failures += report.failed.len();
            }

            if let Some(path) = save {
                network.save_workspace(&path)?;
                println!("Wrote {}", path.display());
            }
            if failures > 0 {
                anyhow::bail!("{failures} processor failures");
            }
        }
        Commands::Processors => {
            for info in context.processors().infos() {
                println!(
                    "{:<32} {:<24} {:<14} {}",
                    info.class_identifier, info.display_name, info.category, info.code_state
                );
            }
        }
        Commands::Validate { workspace } => {
            let network = load_network(context, &config, &workspace)?;
            println!(
                "{} processors, {} connections, {} links",
                network.len(),
                network.connections().len(),
                network.links().len()
            );
            for (position, identifier) in network.evaluation_order().iter().enumerate() {
                println!("{:>3}. {identifier}", position + 1);
            }
        }
    }

    Ok(())
}
