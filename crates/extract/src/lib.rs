pub mod dedup;
pub mod filter;
pub mod llm;
pub mod patterns;
pub mod prompt;
pub mod retry;
pub mod schema;
pub mod testing;

pub use dedup::{Deduplicator, dedupe};
pub use filter::filter_status;
pub use llm::{CompletionRequest, LanguageModel, OpenAiClient};
pub use patterns::extract_hints;
pub use retry::RetryPolicy;
pub use schema::{
    DocumentResult, FieldHints, HintField, OpportunityRecord, OpportunityStatus,
    DEFAULT_AMOUNT, DEFAULT_CURRENCY, UNKNOWN_DEADLINE,
};

use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Sampling temperature for document summaries.
pub const SUMMARY_TEMPERATURE: f32 = 0.3;

pub const NO_TEXT_SUMMARY: &str = "No text could be extracted from the document.";

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub temperature: f32,
    /// Output language code passed to the model, e.g. `ES` or `EN`
    pub language: String,
    pub amount_placeholder: String,
    pub default_currency: String,
    pub retry: RetryPolicy,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            language: "ES".to_string(),
            amount_placeholder: DEFAULT_AMOUNT.to_string(),
            default_currency: DEFAULT_CURRENCY.to_string(),
            retry: RetryPolicy::new(3, Duration::from_secs(1)),
        }
    }
}

pub struct Extractor<M> {
    model: M,
    config: ExtractorConfig,
}

impl<M: LanguageModel> Extractor<M> {
    pub fn new(model: M, config: ExtractorConfig) -> Self {
        Self { model, config }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Short prose summary of a document. Failures become the summary text
    /// instead of an error.
    pub async fn summarize(&self, text: &str, filename: &str) -> String {
        if text.trim().is_empty() {
            return NO_TEXT_SUMMARY.to_string();
        }

        let request = CompletionRequest {
            system: prompt::SUMMARY_SYSTEM_PROMPT.to_string(),
            user: prompt::build_summary_prompt(text, filename, &self.config.language),
            temperature: SUMMARY_TEMPERATURE,
            json_mode: false,
        };

        match self.model.complete(&request).await {
            Ok(summary) => summary.trim().to_string(),
            Err(e) => {
                warn!(filename, error = %e, "Summary generation failed");
                format!("Error generating summary: {e}")
            }
        }
    }

    /// Extract the opportunities in one chunk of a document.
    ///
    /// Malformed replies and transport errors are retried per the configured
    /// policy; once attempts run out the chunk yields no records. Every record
    /// gets `source_file`, absent fields are filled from `hints`, and
    /// deadline, amount and currency fall back to defaults.
    pub async fn extract_chunk(
        &self,
        chunk_text: &str,
        filename: &str,
        hints: &FieldHints,
    ) -> Vec<OpportunityRecord> {
        if chunk_text.trim().is_empty() {
            return Vec::new();
        }

        let request = CompletionRequest {
            system: prompt::EXTRACTION_SYSTEM_PROMPT.to_string(),
            user: prompt::build_extraction_prompt(
                chunk_text,
                filename,
                &self.config.language,
                hints,
            ),
            temperature: self.config.temperature,
            json_mode: true,
        };

        let outcome = self
            .config
            .retry
            .retry("extract_chunk", || self.request_opportunities(&request))
            .await;

        let mut records = match outcome {
            Ok(records) => records,
            Err(e) => {
                warn!(filename, error = %e, "Chunk extraction gave up, recording no opportunities");
                return Vec::new();
            }
        };

        for record in &mut records {
            record.source_file = Some(filename.to_string());

            let filled = record.apply_hints(hints);
            if !filled.is_empty() {
                debug!(title = %record.title, fields = ?filled, "Completed fields from pattern hints");
            }

            record.fill_defaults(&self.config.amount_placeholder, &self.config.default_currency);
        }

        records
    }

    async fn request_opportunities(
        &self,
        request: &CompletionRequest,
    ) -> Result<Vec<OpportunityRecord>> {
        let reply = self.model.complete(request).await?;
        parse_opportunities(&reply)
    }
}

/// Parse a structured-extraction reply.
///
/// Invalid JSON is an error. Valid JSON without an `opportunities` array is
/// an empty answer. Entries that are not valid records are skipped.
pub fn parse_opportunities(reply: &str) -> Result<Vec<OpportunityRecord>> {
    let value: Value = serde_json::from_str(strip_code_fence(reply))
        .context("Model reply is not valid JSON")?;

    let Some(items) = value.get("opportunities").and_then(Value::as_array) else {
        debug!("Reply has no opportunities array");
        return Ok(Vec::new());
    };

    Ok(items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Skipping malformed opportunity entry");
                None
            }
        })
        .collect())
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string (```json) and the closing fence
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().trim_end_matches("```").trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;

    fn extractor(model: ScriptedModel) -> Extractor<ScriptedModel> {
        Extractor::new(
            model,
            ExtractorConfig {
                retry: RetryPolicy::new(3, Duration::ZERO),
                ..Default::default()
            },
        )
    }

    fn notice_hints() -> FieldHints {
        let mut hints = FieldHints::new();
        hints.insert(HintField::Deadline, "2025-10-17");
        hints.insert(HintField::Contact, "adquisiciones.sv@undp.org");
        hints
    }

    #[tokio::test]
    async fn test_malformed_reply_is_retried_and_hints_merged() {
        let model = ScriptedModel::new()
            .json("{not json")
            .json(
                r#"{"opportunities": [{"title": "Solar Grant", "summary": "s",
                    "deadline": "unknown", "contact": null, "status": "open"}]}"#,
            );
        let extractor = extractor(model);

        let records = extractor
            .extract_chunk("chunk text", "notice.pdf", &notice_hints())
            .await;

        assert_eq!(extractor.model().json_calls(), 2);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.source_file.as_deref(), Some("notice.pdf"));
        assert_eq!(record.deadline.as_deref(), Some("2025-10-17"));
        assert_eq!(record.contact.as_deref(), Some("adquisiciones.sv@undp.org"));
        assert_eq!(record.amount.as_deref(), Some(DEFAULT_AMOUNT));
        assert_eq!(record.currency.as_deref(), Some(DEFAULT_CURRENCY));
    }

    #[tokio::test]
    async fn test_exhausted_retries_yield_no_records() {
        let model = ScriptedModel::new()
            .json_failure("connection reset")
            .json("garbage")
            .json_failure("timeout")
            .json(r#"{"opportunities": [{"title": "Never reached"}]}"#);
        let extractor = extractor(model);

        let records = extractor
            .extract_chunk("chunk", "a.pdf", &FieldHints::new())
            .await;

        assert!(records.is_empty());
        assert_eq!(extractor.model().json_calls(), 3);
    }

    #[tokio::test]
    async fn test_missing_array_is_not_retried() {
        let extractor = extractor(ScriptedModel::new().json(r#"{"result": "nothing"}"#));

        let records = extractor
            .extract_chunk("chunk", "a.pdf", &FieldHints::new())
            .await;

        assert!(records.is_empty());
        assert_eq!(extractor.model().json_calls(), 1);
    }

    #[tokio::test]
    async fn test_defaults_without_hints() {
        let extractor = extractor(
            ScriptedModel::new().json(r#"{"opportunities": [{"title": "Fellowship"}]}"#),
        );

        let records = extractor
            .extract_chunk("chunk", "a.pdf", &FieldHints::new())
            .await;

        assert_eq!(records[0].deadline.as_deref(), Some(UNKNOWN_DEADLINE));
        assert_eq!(records[0].amount.as_deref(), Some(DEFAULT_AMOUNT));
        assert_eq!(records[0].currency.as_deref(), Some("USD"));
        assert_eq!(records[0].status, OpportunityStatus::Unknown);
    }

    #[tokio::test]
    async fn test_prompt_carries_hints_and_settings() {
        let extractor = extractor(ScriptedModel::new());

        extractor
            .extract_chunk("the chunk body", "notice.pdf", &notice_hints())
            .await;

        let calls = extractor.model().calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].json_mode);
        assert_eq!(calls[0].system, prompt::EXTRACTION_SYSTEM_PROMPT);
        assert!(calls[0].user.contains("- deadline: 2025-10-17"));
        assert!(calls[0].user.contains("the chunk body"));
    }

    #[tokio::test]
    async fn test_empty_chunk_skips_the_model() {
        let extractor = extractor(ScriptedModel::new());
        assert!(extractor.extract_chunk("  ", "a.pdf", &FieldHints::new()).await.is_empty());
        assert!(extractor.model().calls().is_empty());
    }

    #[tokio::test]
    async fn test_summary_degrades_on_failure() {
        let extractor = extractor(ScriptedModel::new().summary_failure("rate limited"));

        let summary = extractor.summarize("Some document text", "a.pdf").await;

        assert!(summary.starts_with("Error generating summary:"));
        assert!(summary.contains("rate limited"));
    }

    #[tokio::test]
    async fn test_summary_is_trimmed_and_plain() {
        let extractor = extractor(ScriptedModel::new().summary("  A call for NGOs.\n"));

        assert_eq!(extractor.summarize("text", "a.pdf").await, "A call for NGOs.");
        let calls = extractor.model().calls();
        assert!(!calls[0].json_mode);
        assert_eq!(calls[0].temperature, SUMMARY_TEMPERATURE);
        assert_eq!(extractor.summarize("", "a.pdf").await, NO_TEXT_SUMMARY);
    }

    #[test]
    fn test_parse_fenced_reply_and_skip_bad_entries() {
        let reply = "```json\n{\"opportunities\": [{\"title\": \"A\"}, \"oops\", {\"title\": \"B\"}]}\n```";
        let records = parse_opportunities(reply).unwrap();

        let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        assert!(parse_opportunities("Sorry, I cannot help").is_err());
    }
}
