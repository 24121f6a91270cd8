//! Runs the enrichment pipeline on a CSV file on local disk.
//!
//! Usage: `process_csv <input.csv> [output-dir]`
//!
//! Configuration comes from the same environment variables as the server;
//! the optional second argument overrides `OUTPUT_DIR`.

use rust_cnpj_enrichment::config::Config;
use rust_cnpj_enrichment::pipeline::RecordPipeline;
use rust_cnpj_enrichment::upload;
use std::env;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = env::args().skip(1);
    let input = args
        .next()
        .map(PathBuf::from)
        .ok_or_else(|| anyhow::anyhow!("usage: process_csv <input.csv> [output-dir]"))?;

    let mut config = Config::from_env()?;
    if let Some(dir) = args.next() {
        config.output_dir = PathBuf::from(dir);
    }
    tokio::fs::create_dir_all(&config.output_dir).await?;

    let pipeline = RecordPipeline::from_config(&config)?;
    let report = upload::process_file(&pipeline, &config.output_dir, &input)
        .await?;

    tracing::info!(
        "File {} processed: {} of {} rows written. Results saved to: {}",
        report.input_name,
        report.summary.written,
        report.summary.rows,
        report.output_path.display()
    );

    Ok(())
}
