use std::collections::HashSet;

use crate::schema::OpportunityRecord;

/// Drops records whose (title, deadline) identity was already seen.
///
/// The seen set persists across calls, so one instance can deduplicate a
/// whole folder run document by document.
///
/// Two different opportunities that share a title and both have an
/// `"unknown"` deadline collapse into one.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the first record for every new key, in input order. Records with
    /// an empty title are always dropped.
    pub fn retain_new(&mut self, records: Vec<OpportunityRecord>) -> Vec<OpportunityRecord> {
        records
            .into_iter()
            .filter(|record| {
                !record.title.trim().is_empty() && self.seen.insert(record.dedup_key())
            })
            .collect()
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

/// Deduplicate a single list.
pub fn dedupe(records: Vec<OpportunityRecord>) -> Vec<OpportunityRecord> {
    Deduplicator::new().retain_new(records)
}
