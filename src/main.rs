//! vidya CLI entry point
//!
//! Loads `.env` and `vidya.toml`, runs one research query through the
//! pipeline while rendering progress, then prints a summary (or the whole
//! run as JSON with `--json`).

use anyhow::Context;
use std::path::Path;
use tracing_subscriber::EnvFilter;
use vidya::cli::output::Output;
use vidya::cli::Cli;
use vidya::research::progress::ChannelProgress;
use vidya::research::refinement::RefinementState;
use vidya::utils::toml_config::{LoggingConfig, DEFAULT_CONFIG_FILE};
use vidya::{AgentRegistry, ResearchPipeline, VidyaConfig};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    if let Err(e) = run(cli, &output).await {
        output.error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &Output) -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    // A missing default file means built-in defaults; a missing explicit file is an error.
    let config_path = (cli.config.exists() || cli.config != Path::new(DEFAULT_CONFIG_FILE))
        .then_some(cli.config.as_path());
    let config = VidyaConfig::load_or_default(config_path)
        .and_then(|config| config.with_refinement_overrides(cli.max_iterations, cli.min_score))
        .context("Failed to load configuration")?;

    init_logging(&config.logging, cli.verbose, cli.json_logs);

    let query = cli.research_query();
    if !cli.json {
        output.banner();
        output.info(&format!("Researching: {}", query));
        output.newline();
    }

    let registry = AgentRegistry::from_config(&config)
        .await
        .context("Failed to create agents")?;
    let pipeline = ResearchPipeline::from_config(registry, config)?
        .with_mode(cli.search_mode, cli.files.clone())
        .with_output(cli.output.clone());

    let (progress, mut updates) = ChannelProgress::new();
    let renderer_output = if output.colored {
        Output::new()
    } else {
        Output::no_color()
    };
    let show_progress = !cli.json;
    let renderer = tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            if show_progress {
                renderer_output.progress(&update);
            }
        }
    });

    let result = pipeline.run(&query, &progress).await;
    drop(progress);
    let _ = renderer.await;
    let run = result.context("Research run failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        output.run_summary(&run);
        output.newline();
        if run.refinement_state != RefinementState::Satisfied {
            output.warning(&format!(
                "Report did not meet the quality bar; best score {:.1}/10",
                run.best_score
            ));
        }
        output.success("Research complete");
    }

    Ok(())
}

/// `RUST_LOG` wins over the configured level; `-v` raises it to debug.
fn init_logging(config: &LoggingConfig, verbose: bool, json: bool) {
    let level = if verbose { "debug" } else { config.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,vidya={}", level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = if json || config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
