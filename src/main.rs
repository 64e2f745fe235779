mod app;
mod config;
mod document;
mod export;
mod extract;
mod io;
mod keys;
mod matching;
mod merge;
mod pipeline;

use anyhow::{Context, Result};
use clap::Parser;

use app::{Cli, OutputFormat, detect_output_format, output_format_label, summarize_config};
use config::LinkConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("CLI: Failed to initialize thread pool")?;
    }

    let config = LinkConfig::load(&cli.config)
        .with_context(|| format!("CLI: Failed to load link config {:?}", cli.config))?;
    let (mapping_count, column_count) = summarize_config(&config);
    tracing::info!(
        "Link: '{}' <- '{}' ({} attribute mappings, {} csv columns)",
        config.primary_field,
        config.secondary_field,
        mapping_count,
        column_count
    );

    let format = cli
        .format
        .or_else(|| detect_output_format(&cli.output))
        .context("CLI: Could not detect output format from extension; use --format")?;

    let primary = io::load_document(&cli.primary)?;
    let secondary = io::load_document(&cli.secondary)?;

    let start = std::time::Instant::now();
    let merged = pipeline::run_linkage(&primary, &secondary, &config)?;

    let content = match format {
        OutputFormat::Gml => export::write_gml(&merged)?,
        OutputFormat::Csv => {
            if config.csv_columns.is_empty() {
                anyhow::bail!("CLI: csv output requires csv_columns in the link config");
            }
            let table = export::project_csv(&merged, &config.csv_columns);
            export::to_csv_string(&table)
        }
    };
    std::fs::write(&cli.output, content)
        .with_context(|| format!("CLI: Failed to write {:?}", cli.output))?;

    let elapsed = start.elapsed();
    tracing::info!(
        "Done! Wrote {} output to {:?} in {:.2}s",
        output_format_label(&format),
        cli.output,
        elapsed.as_secs_f64()
    );

    Ok(())
}
