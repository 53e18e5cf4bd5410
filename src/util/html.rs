use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Comments first so a `>` inside them does not end the match early.
    static ref TAG_PATTERN: Regex = Regex::new(r"(?s)<!--.*?-->|</?[A-Za-z!][^>]*>").unwrap();
}

/// Removes every HTML tag and comment, keeping the text between them.
pub fn strip_tags(html: &str) -> String {
    TAG_PATTERN.replace_all(html, "").into_owned()
}

/// Keeps at most `length` characters of `text`.
pub fn truncate_chars(text: &str, length: usize) -> String {
    match text.char_indices().nth(length) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

pub fn html_escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
