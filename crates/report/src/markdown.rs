use extract::{OpportunityRecord, OpportunityStatus, UNKNOWN_DEADLINE};
use std::fmt::{self, Write};

use crate::RunReport;

/// Human-readable rendering of a run: executive summary, every opportunity
/// with its filled-in fields, then one section per document.
pub fn render_markdown(report: &RunReport) -> String {
    let language = if report.language.eq_ignore_ascii_case("ES") {
        "Español"
    } else {
        "English"
    };

    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_report(&mut out, report, language);
    out
}

fn write_report(out: &mut String, report: &RunReport, language: &str) -> fmt::Result {
    let opportunities: Vec<&OpportunityRecord> = report.opportunities().collect();
    let open = opportunities
        .iter()
        .filter(|o| o.status == OpportunityStatus::Open)
        .count();
    let with_deadline = opportunities
        .iter()
        .filter(|o| has_known_deadline(o))
        .count();

    writeln!(out, "# Funding Opportunities Report\n")?;
    writeln!(out, "- **Date**: {}", report.processing_date)?;
    writeln!(out, "- **Language**: {language}")?;
    writeln!(out, "- **Closed opportunities kept**: {}\n", yes_no(report.keep_closed))?;

    writeln!(out, "## Executive Summary\n")?;
    writeln!(out, "| Metric | Value |")?;
    writeln!(out, "|--------|-------|")?;
    writeln!(out, "| Documents analysed | {} |", report.results.len())?;
    writeln!(out, "| Opportunities identified | {} |", opportunities.len())?;
    writeln!(out, "| Open opportunities | {open} |")?;
    writeln!(out, "| Opportunities with deadline | {with_deadline} |\n")?;

    if !opportunities.is_empty() {
        writeln!(out, "## All Opportunities\n")?;
        for (i, opportunity) in opportunities.iter().enumerate() {
            render_opportunity(out, i + 1, opportunity)?;
        }
    }

    writeln!(out, "## Analysis by Document\n")?;
    for result in &report.results {
        writeln!(out, "### {}\n", result.filename)?;
        writeln!(out, "**Summary:** {}\n", result.summary.trim())?;

        if result.opportunities.is_empty() {
            writeln!(out, "> No opportunities found.\n")?;
            continue;
        }

        writeln!(out, "**Opportunities ({})**\n", result.opportunities_count)?;
        for opportunity in &result.opportunities {
            match opportunity.deadline.as_deref() {
                Some(deadline) if has_known_deadline(opportunity) => {
                    writeln!(out, "- **{}** - Deadline: {deadline}", cell(&opportunity.title))?;
                }
                _ => {
                    writeln!(out, "- **{}**", cell(&opportunity.title))?;
                }
            }
        }
        out.push('\n');
    }

    Ok(())
}

fn render_opportunity(
    out: &mut String,
    position: usize,
    opportunity: &OpportunityRecord,
) -> fmt::Result {
    let title = if opportunity.title.trim().is_empty() {
        "Untitled"
    } else {
        opportunity.title.trim()
    };
    writeln!(out, "### {position}. {title}\n")?;

    let amount = opportunity.amount.as_deref().map(|amount| {
        match opportunity.currency.as_deref() {
            Some(currency) => format!("{amount} {currency}"),
            None => amount.to_string(),
        }
    });
    let status = opportunity.status.to_string();

    let fields: [(&str, Option<&str>); 12] = [
        ("Summary", Some(opportunity.summary.as_str())),
        ("Sponsor", opportunity.sponsor.as_deref()),
        ("Amount", amount.as_deref()),
        ("Deadline", opportunity.deadline.as_deref()),
        ("Region", opportunity.region.as_deref()),
        ("Country", opportunity.country.as_deref()),
        ("Eligibility", opportunity.eligibility.as_deref()),
        ("Link", opportunity.link.as_deref()),
        ("Contact", opportunity.contact.as_deref()),
        ("Status", Some(status.as_str())),
        ("File", opportunity.source_file.as_deref()),
        ("Notes", opportunity.notes.as_deref()),
    ];

    writeln!(out, "| Field | Value |")?;
    writeln!(out, "|-------|-------|")?;
    for (label, value) in fields {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            writeln!(out, "| {label} | {} |", cell(value))?;
        }
    }
    out.push('\n');
    Ok(())
}

fn has_known_deadline(opportunity: &OpportunityRecord) -> bool {
    opportunity
        .deadline
        .as_deref()
        .is_some_and(|d| !d.trim().is_empty() && !d.eq_ignore_ascii_case(UNKNOWN_DEADLINE))
}

/// Keep table cells on one line and escape column separators.
fn cell(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}
