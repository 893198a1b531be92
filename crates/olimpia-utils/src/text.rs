//! Text helpers for scraped and generated content

use regex::Regex;
use std::sync::LazyLock;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static NUMERIC_ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&#(?:[xX]([0-9a-fA-F]{1,6})|([0-9]{1,7}));").expect("valid entity regex")
});

/// Truncate to at most `max_chars` characters, appending `...` when cut
///
/// Counts characters, not bytes, so multi-byte text never splits mid-codepoint.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(max_chars).collect();
    out.truncate(out.trim_end().len());
    out.push_str("...");
    out
}

/// Remove HTML tags
pub fn strip_tags(html: &str) -> String {
    TAG_RE.replace_all(html, "").into_owned()
}

/// Decode numeric character references and the named entities search engines
/// emit in result snippets
///
/// References to invalid code points are left as they are.
pub fn decode_entities(text: &str) -> String {
    let numeric = NUMERIC_ENTITY_RE.replace_all(text, |caps: &regex::Captures<'_>| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (None, Some(dec)) => dec.as_str().parse().ok(),
            (None, None) => None,
        };
        code.and_then(char::from_u32)
            .map_or_else(|| caps[0].to_string(), String::from)
    });

    numeric
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Replace Portuguese accented letters with their ASCII base letter
pub fn fold_accents(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'Ç' => 'C',
            'ç' => 'c',
            other => other,
        })
        .collect()
}
