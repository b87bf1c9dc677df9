use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Process-wide pipeline counters. Shared through an `Arc` by every run.
#[derive(Default)]
pub struct Metrics {
    // Counters
    runs: AtomicUsize,
    documents_processed: AtomicUsize,
    documents_empty: AtomicUsize,
    chunks_processed: AtomicUsize,
    opportunities_kept: AtomicUsize,
    // One summary call per document plus one extraction call per chunk,
    // retries not included
    llm_requests: AtomicUsize,

    // Timing (in microseconds)
    total_document_time_us: AtomicU64,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_run(&self) {
        self.runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_document(&self, duration: Duration, chunks: usize) {
        self.documents_processed.fetch_add(1, Ordering::Relaxed);
        self.chunks_processed.fetch_add(chunks, Ordering::Relaxed);
        self.llm_requests.fetch_add(chunks + 1, Ordering::Relaxed);
        self.total_document_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_empty_document(&self) {
        self.documents_empty.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_opportunities(&self, count: usize) {
        self.opportunities_kept.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let documents = self.documents_processed.load(Ordering::Relaxed);
        let total_us = self.total_document_time_us.load(Ordering::Relaxed) as f64;

        MetricsSnapshot {
            runs: self.runs.load(Ordering::Relaxed),
            documents_processed: documents,
            documents_empty: self.documents_empty.load(Ordering::Relaxed),
            chunks_processed: self.chunks_processed.load(Ordering::Relaxed),
            opportunities_kept: self.opportunities_kept.load(Ordering::Relaxed),
            llm_requests: self.llm_requests.load(Ordering::Relaxed),
            avg_document_time_ms: if documents > 0 {
                total_us / documents as f64 / 1000.0
            } else {
                0.0
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub runs: usize,
    pub documents_processed: usize,
    pub documents_empty: usize,
    pub chunks_processed: usize,
    pub opportunities_kept: usize,
    pub llm_requests: usize,
    pub avg_document_time_ms: f64,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
