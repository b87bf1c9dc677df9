pub mod markdown;

pub use markdown::render_markdown;

use anyhow::{Context, Result};
use chrono::Local;
use extract::{DocumentResult, OpportunityRecord};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const JSON_REPORT_FILE: &str = "opportunities_results.json";
pub const MARKDOWN_REPORT_FILE: &str = "opportunities_summary.md";

/// Consolidated output of one folder run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// ISO-8601 local timestamp
    pub processing_date: String,
    pub total_pdfs: usize,
    pub total_opportunities: usize,
    pub language: String,
    pub keep_closed: bool,
    pub results: Vec<DocumentResult>,
}

impl RunReport {
    /// `total_opportunities` is always the sum of the per-document counts.
    pub fn new(
        total_pdfs: usize,
        language: &str,
        keep_closed: bool,
        results: Vec<DocumentResult>,
    ) -> Self {
        Self {
            processing_date: Local::now().to_rfc3339(),
            total_pdfs,
            total_opportunities: results.iter().map(|r| r.opportunities_count).sum(),
            language: language.to_string(),
            keep_closed,
            results,
        }
    }

    /// Every opportunity across documents, in report order.
    pub fn opportunities(&self) -> impl Iterator<Item = &OpportunityRecord> {
        self.results.iter().flat_map(|r| r.opportunities.iter())
    }
}

#[derive(Debug, Clone)]
pub struct WrittenReports {
    pub json: PathBuf,
    pub markdown: PathBuf,
}

/// Write the JSON and Markdown reports into `folder`, creating it if needed.
pub async fn write_reports(report: &RunReport, folder: &Path) -> Result<WrittenReports> {
    tokio::fs::create_dir_all(folder)
        .await
        .with_context(|| format!("Failed to create output folder: {:?}", folder))?;

    let json_path = folder.join(JSON_REPORT_FILE);
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    tokio::fs::write(&json_path, json)
        .await
        .with_context(|| format!("Failed to write {:?}", json_path))?;

    let markdown_path = folder.join(MARKDOWN_REPORT_FILE);
    tokio::fs::write(&markdown_path, render_markdown(report))
        .await
        .with_context(|| format!("Failed to write {:?}", markdown_path))?;

    info!(json = ?json_path, markdown = ?markdown_path, "Reports written");

    Ok(WrittenReports {
        json: json_path,
        markdown: markdown_path,
    })
}
