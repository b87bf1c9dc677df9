use anyhow::Result;
use extract::{
    Deduplicator, DocumentResult, Extractor, LanguageModel, dedupe, extract_hints, filter_status,
};
use ingest::{Chunker, PdfReader, annotate_sections, generate_doc_id, keyword_focus};
use report::RunReport;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{ConfigError, PipelineConfig};
use crate::metrics::{Metrics, TimedOperation};

pub const EMPTY_PDF_SUMMARY: &str = "No text could be extracted from the PDF";

/// Runs documents through hints, focusing, chunking and extraction.
///
/// Built from one [`PipelineConfig`] snapshot; later config edits only take
/// effect in pipelines built afterwards.
pub struct Pipeline<M> {
    extractor: Extractor<M>,
    chunker: Chunker,
    keywords: Vec<String>,
    keep_closed: bool,
    language: String,
    delay: Duration,
    metrics: Arc<Metrics>,
}

impl<M: LanguageModel> Pipeline<M> {
    pub fn new(model: M, config: &PipelineConfig, metrics: Arc<Metrics>) -> Result<Self, ConfigError> {
        config.validate()?;
        let chunker = Chunker::new(config.chunking)?;

        Ok(Self {
            extractor: Extractor::new(model, config.extractor_config()),
            chunker,
            keywords: config.keywords.clone(),
            keep_closed: config.keep_closed,
            language: config.language.clone(),
            delay: config.delay(),
            metrics,
        })
    }

    pub fn extractor(&self) -> &Extractor<M> {
        &self.extractor
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Turn one document's text into its deduplicated, filtered result.
    ///
    /// Never fails: empty text, summary errors and chunk failures all degrade
    /// into the returned result.
    pub async fn process_document(&self, filename: &str, text: &str) -> DocumentResult {
        if text.trim().is_empty() {
            warn!(filename, "No text extracted, recording an empty result");
            self.metrics.record_empty_document();
            return DocumentResult::empty(filename.to_string(), EMPTY_PDF_SUMMARY);
        }

        let timer = TimedOperation::start();
        info!(filename, chars = text.len(), "Processing document");

        // Hints come from the raw text, before annotation rewrites any lines
        let hints = extract_hints(text);
        if !hints.is_empty() {
            info!(filename, fields = ?hints.fields(), "Pattern hints found");
        }

        let annotated = annotate_sections(text);
        let summary = self.extractor.summarize(&annotated, filename).await;

        let focused = keyword_focus(
            &annotated,
            &self.keywords,
            self.chunker.config().chunk_size,
        );
        let doc_id = generate_doc_id(filename);

        let mut chunks = self.chunker.chunks(&doc_id, &focused).peekable();
        let mut records = Vec::new();
        let mut chunk_count = 0;

        while let Some(chunk) = chunks.next() {
            chunk_count += 1;
            debug!(
                filename,
                chunk = chunk.index,
                chunk_id = %chunk.chunk_id,
                words = chunk.word_count(),
                "Extracting chunk"
            );

            let found = self
                .extractor
                .extract_chunk(&chunk.text, filename, &hints)
                .await;
            debug!(filename, chunk = chunk.index, found = found.len(), "Chunk done");
            records.extend(found);

            // Rate limit between consecutive model calls
            if chunks.peek().is_some() && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        let extracted = records.len();
        let kept = filter_status(dedupe(records), self.keep_closed);

        self.metrics.record_document(timer.elapsed(), chunk_count);
        info!(
            filename,
            chunks = chunk_count,
            extracted,
            kept = kept.len(),
            "Document processed"
        );

        DocumentResult::new(filename.to_string(), summary, kept)
    }

    /// Process every PDF in `input`, one after another, in file name order.
    ///
    /// Returns `Ok(None)` when the folder holds no PDFs. A PDF that cannot
    /// be read becomes an empty result instead of aborting the run.
    pub async fn process_folder(&self, input: &Path) -> Result<Option<RunReport>> {
        let pdfs = PdfReader::list_pdfs(input).await?;
        if pdfs.is_empty() {
            warn!(folder = ?input, "No PDF files found");
            return Ok(None);
        }

        let run_id = Uuid::new_v4();
        info!(%run_id, folder = ?input, pdfs = pdfs.len(), "Starting run");
        self.metrics.record_run();

        let mut run = FolderRun::new();
        for (i, path) in pdfs.iter().enumerate() {
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            info!(%run_id, document = i + 1, total = pdfs.len(), filename = %filename, "Reading PDF");

            let text = match PdfReader::read_pdf(path).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(filename = %filename, error = %e, "Text extraction failed");
                    String::new()
                }
            };

            let result = self.process_document(&filename, &text).await;
            let kept = run.push(result);
            self.metrics.record_opportunities(kept);
        }

        let report = run.finish(pdfs.len(), &self.language, self.keep_closed);
        info!(
            %run_id,
            pdfs = report.total_pdfs,
            opportunities = report.total_opportunities,
            "Run complete"
        );
        Ok(Some(report))
    }
}

/// Accumulates document results for one folder run, deduplicating
/// opportunities across documents as they arrive.
#[derive(Debug, Default)]
pub struct FolderRun {
    dedup: Deduplicator,
    results: Vec<DocumentResult>,
}

impl FolderRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop opportunities an earlier document already produced and keep the
    /// result. Returns how many of its opportunities were kept.
    pub fn push(&mut self, result: DocumentResult) -> usize {
        let DocumentResult {
            filename,
            summary,
            opportunities,
            ..
        } = result;
        let before = opportunities.len();
        let opportunities = self.dedup.retain_new(opportunities);
        if opportunities.len() < before {
            debug!(
                filename = %filename,
                dropped = before - opportunities.len(),
                "Dropped opportunities seen in earlier documents"
            );
        }

        let kept = opportunities.len();
        self.results
            .push(DocumentResult::new(filename, summary, opportunities));
        kept
    }

    pub fn results(&self) -> &[DocumentResult] {
        &self.results
    }

    pub fn finish(self, total_pdfs: usize, language: &str, keep_closed: bool) -> RunReport {
        RunReport::new(total_pdfs, language, keep_closed, self.results)
    }
}
