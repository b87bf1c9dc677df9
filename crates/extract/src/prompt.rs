use crate::schema::FieldHints;

/// Words of the document sent to the summarizer.
pub const SUMMARY_WORD_LIMIT: usize = 2000;

pub const SUMMARY_SYSTEM_PROMPT: &str = "You are an expert in document analysis.";

pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"You are an expert in analysing FUNDING OPPORTUNITY documents.

Your task is to extract ALL available information about calls for proposals, grants, scholarships, RFPs, awards, tenders and similar opportunities.

EXTRACTION RULES:
1. Actively search the WHOLE text, even when information is scattered or badly formatted
2. Infer information from context when possible
3. Do NOT leave fields null when the text contains any clue
4. Partial information is better than nothing ("Amount: variable" beats null)

FIELDS (return JSON):
{
  "opportunities": [
    {
      "title": "Clear, descriptive title of the opportunity",
      "summary": "2-4 lines explaining WHAT it is and WHAT it is for",
      "sponsor": "Sponsoring organisation (UNDP, World Bank, ...)",
      "amount": "Amount of money ($, USD, EUR); 'Variable' or 'To be determined' when no figure is given",
      "currency": "USD, EUR, ... inferred from context when not explicit",
      "deadline": "ISO date (YYYY-MM-DD), 'rolling', or month/year. Look for 'deadline', 'closing date', 'fecha límite', 'hasta'",
      "region": "Geographic region (Latin America, Global, Africa, ...)",
      "country": "Specific country when applicable",
      "eligibility": "Who may apply (NGOs, universities, individuals, ...)",
      "link": "URL if present in the text",
      "contact": "E-mail or contact details",
      "status": "'open', 'closed' or 'unknown'. Look for words such as open, closed, active, expired",
      "source_file": "Name of the PDF (filled automatically)",
      "notes": "Other important details: co-financing, stages, special restrictions"
    }
  ]
}

SEARCH STRATEGIES:
- Sponsor: acronyms (UNDP, USAID, EU, IDB) or organisation names in capitals
- Amount: numbers followed by $, USD, EUR, dollars, euros, million, thousand
- Deadline: dates in any format: DD/MM/YYYY, Month Day Year, "30 June"
- Eligibility: phrases such as "may apply", "aimed at", "eligible"
- Region: several Latin American countries -> "Latin America"; "all countries" -> "Global"
- Contact: e-mail addresses or "for more information contact"

SPECIAL CASES:
- "variable amount" or "according to proposal" -> amount: "Variable", NOT null
- No explicit deadline but "permanent" -> deadline: "rolling"
- Several countries of one region -> region: the region name
- A document listing several opportunities -> extract EACH one separately

QUALITY OVER PERFECTION:
- "amount: Variable" is better than "amount: null"
- "deadline: 2025" is better than "deadline: null"
- "eligibility: Non-profit organisations" is better than "eligibility: null"

EXCLUDE:
- News about finished projects
- Reviews or result reports
- Explicitly closed calls (unless the configuration says to keep them)

OUTPUT FORMAT:
Return ONLY the JSON, no explanations. If there are no opportunities, return {"opportunities": []}"#;

const RECORD_SCHEMA: &str = r#"{
  "opportunities": [
    {
      "title": "string",
      "summary": "string",
      "sponsor": "string|null",
      "amount": "string|null",
      "currency": "string|null",
      "deadline": "string|null",
      "region": "string|null",
      "country": "string|null",
      "eligibility": "string|null",
      "link": "string|null",
      "contact": "string|null",
      "status": "open"|"closed"|"unknown",
      "source_file": "string|null",
      "notes": "string|null"
    }
  ]
}"#;

pub fn build_extraction_prompt(
    chunk_text: &str,
    filename: &str,
    language: &str,
    hints: &FieldHints,
) -> String {
    let mut prompt = format!(
        "Output language: {}\nFile: {}\n\nExpected JSON schema:\n{}\n\n",
        language, filename, RECORD_SCHEMA
    );

    if !hints.is_empty() {
        prompt.push_str(
            "ALREADY KNOWN (found verbatim in the document, you MUST use these values):\n",
        );
        for (field, value) in hints.iter() {
            prompt.push_str(&format!("- {}: {}\n", field.name(), value));
        }
        prompt.push('\n');
    }

    prompt.push_str("TEXT:\n");
    prompt.push_str(chunk_text);
    prompt
}

pub fn build_summary_prompt(text: &str, filename: &str, language: &str) -> String {
    let limited: Vec<&str> = text.split_whitespace().take(SUMMARY_WORD_LIMIT).collect();

    format!(
        r#"Summarise this document in 120-180 words in {}.
Highlight: main topic, purpose, and whether it contains funding opportunities.

File: {}

Text:
{}"#,
        language,
        filename,
        limited.join(" ")
    )
}
