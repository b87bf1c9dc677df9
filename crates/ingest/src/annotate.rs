//! Inline markers that make document structure visible to the model.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*([A-ZÁÉÍÓÚÑ][A-ZÁÉÍÓÚÑ \t]{4,})[ \t]*$").unwrap());
static CONTACT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bcontacto?[\s:]+").unwrap());
static EMAIL_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\be-?mail[\s:]+").unwrap());
static DEADLINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:deadline|fecha\s+l[ií]mite|closing\s+date)[\s:]*").unwrap()
});
static AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\$\s*[\d,]+|\b\d+\s*(?:USD|EUR|dollars|dólares)\b)").unwrap()
});
static ELIGIBILITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(eligib\w*|pueden\s+aplicar|dirigido\s+a|podr[áa]n\s+participar)[\s:]*")
        .unwrap()
});
static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());
static EXTRA_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Prefix headings, deadlines, amounts, contacts, eligibility phrases and
/// links with line markers. Only the model sees the annotated text.
pub fn annotate_sections(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = HEADING.replace_all(text, |caps: &Captures| {
        format!("\n=== {} ===\n", caps[1].trim())
    });
    let text = CONTACT.replace_all(&text, "\nCONTACT: ");
    let text = EMAIL_LABEL.replace_all(&text, "\nEMAIL: ");
    let text = DEADLINE.replace_all(&text, "\nDEADLINE: ");
    let text = AMOUNT.replace_all(&text, "\nAMOUNT: $1");
    let text = ELIGIBILITY.replace_all(&text, "\nELIGIBILITY: $1 ");
    let text = URL.replace_all(&text, "\nLINK: $0");

    EXTRA_NEWLINES.replace_all(&text, "\n\n").trim().to_string()
}
