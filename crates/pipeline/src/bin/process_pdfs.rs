use anyhow::Result;
use clap::Parser;
use pipeline::{ConfigUpdate, Metrics, Pipeline, PipelineConfig};
use std::path::PathBuf;
use tracing::info;

/// Extract funding opportunities from a folder of PDFs.
#[derive(Parser, Debug)]
#[command(name = "process_pdfs", version, about)]
struct Args {
    /// Folder containing the PDF files
    #[arg(short, long)]
    input: PathBuf,

    /// Folder for the JSON and Markdown reports
    #[arg(short, long)]
    output: PathBuf,

    /// Keep opportunities marked as closed
    #[arg(long)]
    keep_closed: bool,

    /// Output language code, e.g. ES or EN
    #[arg(short, long)]
    language: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    pipeline::init_tracing("info");

    let args = Args::parse();

    let mut config = PipelineConfig::from_env()?;
    config.apply(ConfigUpdate {
        keep_closed: args.keep_closed.then_some(true),
        language: args.language,
        ..Default::default()
    })?;
    info!(
        model = %config.llm.model,
        language = %config.language,
        keep_closed = config.keep_closed,
        "Configuration loaded"
    );

    let model = config.build_model()?;
    let pipeline = Pipeline::new(model, &config, Metrics::new())?;

    let Some(report) = pipeline.process_folder(&args.input).await? else {
        println!("No PDF files found in {}", args.input.display());
        return Ok(());
    };

    let written = report::write_reports(&report, &args.output).await?;

    println!("\n=== Processing complete ===");
    println!("PDFs processed:      {}", report.total_pdfs);
    println!("Opportunities found: {}", report.total_opportunities);
    for result in &report.results {
        println!("  {:<40} {}", result.filename, result.opportunities_count);
    }
    println!("JSON report:     {}", written.json.display());
    println!("Markdown report: {}", written.markdown.display());

    let stats = pipeline.metrics().snapshot();
    info!(
        chunks = stats.chunks_processed,
        llm_requests = stats.llm_requests,
        avg_document_ms = stats.avg_document_time_ms,
        "Run statistics"
    );

    Ok(())
}
