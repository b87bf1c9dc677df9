use crate::schema::OpportunityRecord;

/// Remove closed opportunities unless `keep_closed` is set. Open, unknown and
/// any other status pass through.
pub fn filter_status(records: Vec<OpportunityRecord>, keep_closed: bool) -> Vec<OpportunityRecord> {
    if keep_closed {
        return records;
    }
    records
        .into_iter()
        .filter(|record| !record.status.is_closed())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::OpportunityStatus;

    fn with_status(raw: &str) -> OpportunityRecord {
        OpportunityRecord {
            title: raw.to_string(),
            status: OpportunityStatus::parse(raw),
            ..Default::default()
        }
    }

    #[test]
    fn test_drops_closed_case_insensitively() {
        let records = vec![
            with_status("Closed"),
            with_status("unknown"),
            with_status("open"),
            with_status("Expired"),
        ];

        let kept: Vec<String> = filter_status(records, false)
            .into_iter()
            .map(|r| r.title)
            .collect();

        assert_eq!(kept, vec!["unknown", "open", "Expired"]);
    }

    #[test]
    fn test_keep_closed_passes_everything() {
        let records = vec![with_status("CLOSED"), with_status("open")];
        assert_eq!(filter_status(records, true).len(), 2);
    }
}
