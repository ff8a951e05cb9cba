//! Amnesia Pipeline
//!
//! Command line entry point: runs a PDF through the processing pipeline
//! with lazily loaded components and prints the result as JSON.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use amnesia_pipeline::component::{ComponentManager, ManagerStats};
use amnesia_pipeline::config::Config;
use amnesia_pipeline::pipeline::{ExtractionOptions, PipelineOrchestrator, ProcessingJob};
use amnesia_pipeline::processors::{self, OcrProviderKind};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process a PDF and print the result as JSON
    Process {
        file: PathBuf,

        /// Skip text extraction
        #[arg(long)]
        no_text: bool,

        /// Skip image extraction
        #[arg(long)]
        no_images: bool,

        /// Skip OCR of pages without a text layer
        #[arg(long)]
        no_ocr: bool,

        /// OCR language hint
        #[arg(long)]
        language: Option<String>,

        /// Use only this OCR provider (tesseract or ollama)
        #[arg(long)]
        ocr_provider: Option<OcrProviderKind>,

        /// Load every component up front and keep it loaded
        #[arg(long, env = "PIPELINE_EAGER")]
        eager: bool,

        #[arg(long)]
        pretty: bool,
    },

    /// List registered components and the active configuration
    Components {
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Serialize)]
struct ComponentsReport<'a> {
    version: &'static str,
    config: &'a Config,
    components: ManagerStats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "amnesia_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("invalid configuration")?;

    match cli.command {
        Command::Process {
            file,
            no_text,
            no_images,
            no_ocr,
            language,
            ocr_provider,
            eager,
            pretty,
        } => {
            if eager {
                config.pipeline.lazy_loading = false;
            }

            let options = ExtractionOptions {
                extract_text: !no_text,
                extract_images: !no_images,
                enable_ocr: !no_ocr && config.ocr.enabled,
                ocr_language: language,
                ocr_provider,
            };
            process(config, file, options, pretty).await
        }
        Command::Components { pretty } => {
            let manager = ComponentManager::new(config.manager_config());
            processors::register_defaults(&manager, &config)?;

            let report = ComponentsReport {
                version: env!("CARGO_PKG_VERSION"),
                config: &config,
                components: manager.stats(),
            };
            print_json(&report, pretty)
        }
    }
}

async fn process(
    config: Config,
    file: PathBuf,
    options: ExtractionOptions,
    pretty: bool,
) -> anyhow::Result<()> {
    tracing::info!(
        "Starting Amnesia Pipeline v{} ({} loading)",
        env!("CARGO_PKG_VERSION"),
        if config.pipeline.lazy_loading { "lazy" } else { "eager" }
    );

    let manager = ComponentManager::new(config.manager_config());
    processors::register_defaults(&manager, &config)?;

    if !config.pipeline.lazy_loading {
        let loaded = manager
            .preload_all()
            .await
            .context("failed to preload components")?;
        tracing::info!("Preloaded {} components", loaded);
    }

    let orchestrator = PipelineOrchestrator::new(manager.clone(), config.pipeline.clone());
    let job = ProcessingJob::from_path(&file).with_options(options);
    let result = orchestrator.run(job).await;

    for (name, outcome) in manager.unload_all().await {
        tracing::debug!("Shutdown unload of {}: {:?}", name, outcome);
    }

    let result = result.with_context(|| format!("failed to process {}", file.display()))?;
    print_json(&result, pretty)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}
