//! Deterministic field detection that runs before the model sees a document.
//!
//! Everything here is a pure function of the input text. A field is only
//! reported when one of the fixed patterns matches; absence of a match is
//! absence of the key in [`FieldHints`].

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::schema::{FieldHints, HintField};

/// `17-Oct-25 @ 01:59 AM`, the closing-time stamp of procurement notices.
static COMPACT_DEADLINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})-([a-z]{3})-(\d{2})\s*@\s*(\d{1,2}):(\d{2})\s*([ap]m)\b").unwrap()
});
static DAY_MONTH_NAME_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})-([A-Za-z]{3,9})-(\d{2,4})\b").unwrap());
static DAY_MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{2,4})\b").unwrap());
static YEAR_MONTH_DAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").unwrap());

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap());
static REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z]{2,6}-[A-Z]{2,4}-\d{3,6}\b").unwrap());
static URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s<>"{}|\\^`\[\]]+"#).unwrap());

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Lines after a "deadline" mention that may still hold its date.
const DEADLINE_WINDOW: usize = 3;

/// Mail domains of funding bodies; an address on one of these wins over
/// whatever address appears first.
const KNOWN_DOMAINS: &[&str] = &[
    "undp.org",
    "un.org",
    "unicef.org",
    "worldbank.org",
    "iadb.org",
    "usaid.gov",
    "europa.eu",
    "iom.int",
    "fao.org",
    "unesco.org",
    "who.int",
];

/// (pattern, canonical name), checked in order.
const ORGANIZATIONS: &[(&str, &str)] = &[
    (r"united nations development programme|\bundp\b|\bpnud\b", "UNDP"),
    (r"\bunicef\b", "UNICEF"),
    (r"world bank|banco mundial", "World Bank"),
    (r"inter-american development bank|\biadb\b|\bbid\b", "IDB"),
    (r"\busaid\b", "USAID"),
    (r"european union|uni[oó]n europea", "European Union"),
    (r"\bunesco\b", "UNESCO"),
    (r"\bfao\b", "FAO"),
    (r"international organization for migration|\biom\b|\boim\b", "IOM"),
];

/// (pattern, country, region), checked in order.
const COUNTRIES: &[(&str, &str, &str)] = &[
    (r"el salvador", "El Salvador", "Central America"),
    (r"guatemala", "Guatemala", "Central America"),
    (r"honduras", "Honduras", "Central America"),
    (r"nicaragua", "Nicaragua", "Central America"),
    (r"costa rica", "Costa Rica", "Central America"),
    (r"panam[aá]", "Panama", "Central America"),
    (r"m[eé]xico", "Mexico", "North America"),
    (r"colombia", "Colombia", "South America"),
    (r"per[uú]\b", "Peru", "South America"),
    (r"ecuador", "Ecuador", "South America"),
    (r"rep[uú]blica dominicana|dominican republic", "Dominican Republic", "Caribbean"),
];

static ORGANIZATION_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    ORGANIZATIONS
        .iter()
        .map(|(pattern, name)| (Regex::new(&format!("(?i){pattern}")).unwrap(), *name))
        .collect()
});

static COUNTRY_PATTERNS: Lazy<Vec<(Regex, &'static str, &'static str)>> = Lazy::new(|| {
    COUNTRIES
        .iter()
        .map(|(pattern, country, region)| {
            (Regex::new(&format!(r"(?i)\b{pattern}")).unwrap(), *country, *region)
        })
        .collect()
});

/// Scan a document for the fields fixed patterns can find with confidence.
pub fn extract_hints(text: &str) -> FieldHints {
    let mut hints = FieldHints::new();

    if let Some(deadline) = find_deadline(text) {
        hints.insert(HintField::Deadline, deadline);
    }
    if let Some(contact) = find_contact(text) {
        hints.insert(HintField::Contact, contact);
    }
    if let Some(sponsor) = find_sponsor(text) {
        hints.insert(HintField::Sponsor, sponsor);
    }
    if let Some((country, region)) = find_country(text) {
        hints.insert(HintField::Country, country);
        hints.insert(HintField::Region, region);
    }
    if let Some(reference) = REFERENCE.find(text) {
        hints.insert(HintField::Reference, reference.as_str());
    }
    if let Some(link) = find_link(text) {
        hints.insert(HintField::Link, link);
    }

    debug!(fields = ?hints.fields(), "pattern hints extracted");
    hints
}

/// Deadline normalized to `YYYY-MM-DD`.
pub fn find_deadline(text: &str) -> Option<String> {
    let compact = COMPACT_DEADLINE.captures_iter(text).find_map(|caps| {
        iso_date(
            expand_year(&caps[3])?,
            month_number(&caps[2])?,
            caps[1].parse().ok()?,
        )
    });
    if compact.is_some() {
        return compact;
    }

    let lines: Vec<&str> = text.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        if !line.to_lowercase().contains("deadline") {
            continue;
        }
        let end = (i + DEADLINE_WINDOW).min(lines.len());
        let window = lines[i..end].join("\n");
        if let Some(date) = date_in(&window) {
            return Some(date);
        }
    }

    None
}

fn date_in(window: &str) -> Option<String> {
    DAY_MONTH_NAME_YEAR
        .captures_iter(window)
        .find_map(|caps| {
            iso_date(
                expand_year(&caps[3])?,
                month_number(&caps[2])?,
                caps[1].parse().ok()?,
            )
        })
        .or_else(|| {
            DAY_MONTH_YEAR.captures_iter(window).find_map(|caps| {
                iso_date(
                    expand_year(&caps[3])?,
                    caps[2].parse().ok()?,
                    caps[1].parse().ok()?,
                )
            })
        })
        .or_else(|| {
            YEAR_MONTH_DAY.captures_iter(window).find_map(|caps| {
                iso_date(
                    caps[1].parse().ok()?,
                    caps[2].parse().ok()?,
                    caps[3].parse().ok()?,
                )
            })
        })
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == prefix)
        .map(|idx| idx as u32 + 1)
}

fn expand_year(raw: &str) -> Option<i32> {
    let year: i32 = raw.parse().ok()?;
    match raw.len() {
        2 => Some(2000 + year),
        4 => Some(year),
        _ => None,
    }
}

fn iso_date(year: i32, month: u32, day: u32) -> Option<String> {
    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y-%m-%d").to_string())
}

/// First address on a known funding-body domain, else the first address.
pub fn find_contact(text: &str) -> Option<String> {
    let emails: Vec<&str> = EMAIL.find_iter(text).map(|m| m.as_str()).collect();

    emails
        .iter()
        .find(|email| {
            let lower = email.to_lowercase();
            KNOWN_DOMAINS.iter().any(|domain| lower.contains(domain))
        })
        .or_else(|| emails.first())
        .map(|email| email.to_string())
}

pub fn find_sponsor(text: &str) -> Option<&'static str> {
    ORGANIZATION_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(text))
        .map(|(_, name)| *name)
}

/// Country and the region it belongs to.
pub fn find_country(text: &str) -> Option<(&'static str, &'static str)> {
    COUNTRY_PATTERNS
        .iter()
        .find(|(pattern, _, _)| pattern.is_match(text))
        .map(|(_, country, region)| (*country, *region))
}

pub fn find_link(text: &str) -> Option<String> {
    URL.find(text).map(|m| {
        m.as_str()
            .trim_end_matches(['.', ',', ';', ':', ')', '\''])
            .to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTICE: &str = "UNITED NATIONS DEVELOPMENT PROGRAMME\n\
        Request for Quotation UNDP-SLV-00470\n\
        Country: El Salvador\n\
        Deadline 17-Oct-25 @ 01:59 AM (New York time)\n\
        Questions: adquisiciones.sv@undp.org\n\
        Details at https://procurement-notices.undp.org/view_notice.cfm?notice_id=12345.";

    #[test]
    fn test_compact_deadline() {
        assert_eq!(
            find_deadline("Closing 17-Oct-25 @ 01:59 AM").as_deref(),
            Some("2025-10-17")
        );
    }

    #[test]
    fn test_deadline_window_shapes() {
        assert_eq!(
            find_deadline("Application deadline:\n\n5-Mar-2026").as_deref(),
            Some("2026-03-05")
        );
        assert_eq!(
            find_deadline("DEADLINE\n30/06/2025").as_deref(),
            Some("2025-06-30")
        );
        assert_eq!(
            find_deadline("The deadline is 2025-7-1 at noon").as_deref(),
            Some("2025-07-01")
        );
    }

    #[test]
    fn test_deadline_outside_window_is_ignored() {
        let text = "Deadline\nline two\nline three\n2025-01-01";
        assert_eq!(find_deadline(text), None);
        assert_eq!(find_deadline("Published 2025-01-01"), None);
    }

    #[test]
    fn test_invalid_dates_are_skipped() {
        assert_eq!(find_deadline("deadline 31/02/2025"), None);
        assert_eq!(find_deadline("deadline 12-Foo-2025"), None);
    }

    #[test]
    fn test_single_contact() {
        assert_eq!(
            find_contact("Write to adquisiciones.sv@undp.org for details").as_deref(),
            Some("adquisiciones.sv@undp.org")
        );
    }

    #[test]
    fn test_contact_prefers_known_domain() {
        let text = "webmaster@example.com or grants@worldbank.org";
        assert_eq!(find_contact(text).as_deref(), Some("grants@worldbank.org"));
        assert_eq!(
            find_contact("a@example.com, b@example.net").as_deref(),
            Some("a@example.com")
        );
        assert_eq!(find_contact("no address here"), None);
    }

    #[test]
    fn test_sponsor_and_country() {
        assert_eq!(find_sponsor("funded by the World Bank"), Some("World Bank"));
        assert_eq!(find_sponsor("the biome of the region"), None);
        assert_eq!(
            find_country("Proyecto en MÉXICO"),
            Some(("Mexico", "North America"))
        );
        assert_eq!(find_country("superuser"), None);
    }

    #[test]
    fn test_link_trims_punctuation() {
        assert_eq!(
            find_link("see (https://example.org/call).").as_deref(),
            Some("https://example.org/call")
        );
    }

    #[test]
    fn test_extract_hints_from_notice() {
        let hints = extract_hints(NOTICE);

        assert_eq!(hints.get(HintField::Deadline), Some("2025-10-17"));
        assert_eq!(hints.get(HintField::Contact), Some("adquisiciones.sv@undp.org"));
        assert_eq!(hints.get(HintField::Sponsor), Some("UNDP"));
        assert_eq!(hints.get(HintField::Country), Some("El Salvador"));
        assert_eq!(hints.get(HintField::Region), Some("Central America"));
        assert_eq!(hints.get(HintField::Reference), Some("UNDP-SLV-00470"));
        assert_eq!(
            hints.get(HintField::Link),
            Some("https://procurement-notices.undp.org/view_notice.cfm?notice_id=12345")
        );
    }

    #[test]
    fn test_no_matches_means_no_keys() {
        let hints = extract_hints("A plain paragraph with nothing to find.");
        assert!(hints.is_empty());
    }
}
