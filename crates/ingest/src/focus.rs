use once_cell::sync::Lazy;
use regex::Regex;

static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{2,}").unwrap());

/// Number of non-keyword paragraphs appended when the keyword-bearing part
/// is too short to stand on its own.
pub const CONTEXT_PARAGRAPHS: usize = 5;

/// Reorder `text` so that paragraphs mentioning any of `keywords` come first.
///
/// Paragraphs keep their relative order within each group. When the
/// keyword-bearing part is shorter than three chunk widths (in characters), the
/// first [`CONTEXT_PARAGRAPHS`] other paragraphs are appended for context.
/// Text with no keyword match is returned unchanged.
pub fn keyword_focus(text: &str, keywords: &[String], chunk_size: usize) -> String {
    if text.is_empty() {
        return String::new();
    }

    let needles: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    let (relevant, other): (Vec<&str>, Vec<&str>) = PARAGRAPH_BREAK
        .split(text)
        .partition(|para| {
            let lower = para.to_lowercase();
            needles.iter().any(|kw| lower.contains(kw.as_str()))
        });

    if relevant.is_empty() {
        return text.to_string();
    }

    let mut focused = relevant.join("\n\n");
    let focused_chars = focused.chars().count();

    if focused_chars < chunk_size.saturating_mul(3) && !other.is_empty() {
        let context: Vec<&str> = other.into_iter().take(CONTEXT_PARAGRAPHS).collect();
        focused.push_str("\n\n");
        focused.push_str(&context.join("\n\n"));
    }

    focused
}
