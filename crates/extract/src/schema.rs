use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Whether an opportunity still accepts applications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OpportunityStatus {
    Open,
    Closed,
    #[default]
    Unknown,
    /// Any other label the model produced, kept verbatim
    Other(String),
}

impl OpportunityStatus {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_lowercase().as_str() {
            "open" => Self::Open,
            "closed" => Self::Closed,
            "" | "unknown" | "null" => Self::Unknown,
            _ => Self::Other(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Unknown => "unknown",
            Self::Other(label) => label,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for OpportunityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OpportunityStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OpportunityStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value
            .and_then(scalar_text)
            .map(|s| Self::parse(&s))
            .unwrap_or_default())
    }
}

/// One funding opportunity pulled out of a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpportunityRecord {
    #[serde(default, deserialize_with = "required_text")]
    pub title: String,
    #[serde(default, deserialize_with = "required_text")]
    pub summary: String,
    #[serde(default, deserialize_with = "optional_text")]
    pub sponsor: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub amount: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub deadline: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub eligibility: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub link: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub contact: Option<String>,
    #[serde(default)]
    pub status: OpportunityStatus,
    #[serde(default, deserialize_with = "optional_text")]
    pub source_file: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub notes: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub reference: Option<String>,
}

impl OpportunityRecord {
    pub fn field_mut(&mut self, field: HintField) -> &mut Option<String> {
        match field {
            HintField::Deadline => &mut self.deadline,
            HintField::Contact => &mut self.contact,
            HintField::Sponsor => &mut self.sponsor,
            HintField::Country => &mut self.country,
            HintField::Region => &mut self.region,
            HintField::Reference => &mut self.reference,
            HintField::Link => &mut self.link,
        }
    }

    /// Fill every field the model left absent with the matching hint.
    /// Returns the fields that were filled.
    pub fn apply_hints(&mut self, hints: &FieldHints) -> Vec<HintField> {
        let mut filled = Vec::new();
        for (field, value) in hints.iter() {
            let slot = self.field_mut(field);
            if slot.is_none() {
                *slot = Some(value.to_string());
                filled.push(field);
            }
        }
        filled
    }

    /// Guarantee that deadline, amount and currency are never absent.
    pub fn fill_defaults(&mut self, amount_placeholder: &str, default_currency: &str) {
        self.deadline.get_or_insert_with(|| UNKNOWN_DEADLINE.to_string());
        self.amount.get_or_insert_with(|| amount_placeholder.to_string());
        self.currency.get_or_insert_with(|| default_currency.to_string());
    }

    /// Identity used for deduplication: normalized title plus deadline.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}|{}",
            self.title.trim().to_lowercase(),
            self.deadline.as_deref().unwrap_or("").trim()
        )
    }
}

pub const UNKNOWN_DEADLINE: &str = "unknown";
pub const DEFAULT_AMOUNT: &str = "A determinar";
pub const DEFAULT_CURRENCY: &str = "USD";

/// Fields the pattern extractor can vouch for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HintField {
    Deadline,
    Contact,
    Sponsor,
    Country,
    Region,
    Reference,
    Link,
}

impl HintField {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Deadline => "deadline",
            Self::Contact => "contact",
            Self::Sponsor => "sponsor",
            Self::Country => "country",
            Self::Region => "region",
            Self::Reference => "reference",
            Self::Link => "link",
        }
    }
}

/// Field values found by deterministic pattern matching over a whole
/// document. Built once per document, read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldHints(BTreeMap<HintField, String>);

impl FieldHints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: HintField, value: impl Into<String>) {
        self.0.insert(field, value.into());
    }

    pub fn get(&self, field: HintField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (HintField, &str)> {
        self.0.iter().map(|(field, value)| (*field, value.as_str()))
    }

    pub fn fields(&self) -> Vec<&'static str> {
        self.0.keys().map(HintField::name).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything extracted from one source PDF.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResult {
    pub filename: String,
    pub summary: String,
    pub opportunities_count: usize,
    pub opportunities: Vec<OpportunityRecord>,
}

impl DocumentResult {
    pub fn new(filename: String, summary: String, opportunities: Vec<OpportunityRecord>) -> Self {
        Self {
            filename,
            summary,
            opportunities_count: opportunities.len(),
            opportunities,
        }
    }

    /// Result for a document whose text could not be used.
    pub fn empty(filename: String, reason: &str) -> Self {
        Self::new(filename, reason.to_string(), Vec::new())
    }
}

/// Placeholder strings models use instead of leaving a field out.
fn is_absent(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "" | "null" | "none" | "n/a" | "unknown"
    )
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.into_iter().filter_map(scalar_text).collect();
            Some(parts.join(", "))
        }
        other => Some(other.to_string()),
    }
}

fn optional_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(scalar_text).filter(|s| !is_absent(s)))
}

fn required_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(optional_text(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sentinels_and_scalars_are_normalized() {
        let record: OpportunityRecord = serde_json::from_value(json!({
            "title": "  Youth Grant ",
            "summary": null,
            "sponsor": "null",
            "amount": 50000,
            "currency": "Unknown",
            "deadline": "",
            "eligibility": ["NGOs", "universities"],
            "status": "Closed"
        }))
        .unwrap();

        assert_eq!(record.title, "Youth Grant");
        assert_eq!(record.summary, "");
        assert_eq!(record.sponsor, None);
        assert_eq!(record.amount.as_deref(), Some("50000"));
        assert_eq!(record.currency, None);
        assert_eq!(record.deadline, None);
        assert_eq!(record.eligibility.as_deref(), Some("NGOs, universities"));
        assert_eq!(record.status, OpportunityStatus::Closed);
    }

    #[test]
    fn test_status_variants() {
        assert_eq!(OpportunityStatus::parse("OPEN"), OpportunityStatus::Open);
        assert_eq!(OpportunityStatus::parse(" unknown "), OpportunityStatus::Unknown);
        assert_eq!(
            OpportunityStatus::parse("Expired"),
            OpportunityStatus::Other("Expired".to_string())
        );

        let record: OpportunityRecord = serde_json::from_value(json!({"title": "x"})).unwrap();
        assert_eq!(record.status, OpportunityStatus::Unknown);
        assert_eq!(serde_json::to_value(&record).unwrap()["status"], "unknown");
    }

    #[test]
    fn test_hints_only_fill_absent_fields() {
        let mut record = OpportunityRecord {
            title: "Call".to_string(),
            sponsor: Some("UNICEF".to_string()),
            ..Default::default()
        };
        let mut hints = FieldHints::new();
        hints.insert(HintField::Sponsor, "UNDP");
        hints.insert(HintField::Deadline, "2025-10-17");
        hints.insert(HintField::Reference, "UNDP-SLV-00470");

        let filled = record.apply_hints(&hints);

        assert_eq!(filled, vec![HintField::Deadline, HintField::Reference]);
        assert_eq!(record.sponsor.as_deref(), Some("UNICEF"));
        assert_eq!(record.deadline.as_deref(), Some("2025-10-17"));
        assert_eq!(record.reference.as_deref(), Some("UNDP-SLV-00470"));
    }

    #[test]
    fn test_defaults_fill_economic_fields() {
        let mut record = OpportunityRecord {
            title: "Call".to_string(),
            currency: Some("EUR".to_string()),
            ..Default::default()
        };
        record.fill_defaults(DEFAULT_AMOUNT, DEFAULT_CURRENCY);

        assert_eq!(record.deadline.as_deref(), Some(UNKNOWN_DEADLINE));
        assert_eq!(record.amount.as_deref(), Some(DEFAULT_AMOUNT));
        assert_eq!(record.currency.as_deref(), Some("EUR"));
    }

    #[test]
    fn test_document_result_counts() {
        let result = DocumentResult::new(
            "a.pdf".to_string(),
            "summary".to_string(),
            vec![OpportunityRecord::default(), OpportunityRecord::default()],
        );
        assert_eq!(result.opportunities_count, 2);
        assert_eq!(DocumentResult::empty("b.pdf".to_string(), "none").opportunities_count, 0);
    }
}
