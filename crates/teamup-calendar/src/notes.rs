//! Text helpers for event notes and HTML output.
//!
//! Teamup notes are free-form HTML. Trainers put an age group keyword
//! ("Kinder", "Jugend", "Erwachsene", "Senioren") next to the contact details,
//! so ingestion splits it into the `age` column and keeps the rest as `contact`.

use std::sync::OnceLock;

use regex::Regex;

/// Age group keywords, matched case-insensitively and only when followed by
/// whitespace.
pub const AGE_KEYWORDS: [&str; 4] = ["kinder", "jugend", "erwachsene", "senioren"];

#[allow(clippy::expect_used)]
fn re_age() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?i)({})\s+", AGE_KEYWORDS.join("|")))
            .expect("age keyword regex should compile")
    })
}

#[allow(clippy::expect_used)]
fn re_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<!--.*?-->|<[A-Za-z/!?][^>]*>").expect("tag regex should compile")
    })
}

/// Remove every markup tag (and HTML comment), keeping the text between them.
///
/// A `<` not followed by a tag name (`6 < 10`) is text and stays.
pub fn strip_tags(text: &str) -> String {
    re_tag().replace_all(text, "").into_owned()
}

/// Notes with markup and every age keyword (plus its trailing whitespace)
/// removed.
pub fn get_contact(notes: &str) -> String {
    re_age().replace_all(&strip_tags(notes), "").into_owned()
}

/// The first age keyword in the notes, in its original case, or empty.
pub fn get_age(notes: &str) -> String {
    re_age()
        .captures(&strip_tags(notes))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Named entities for U+00A0..=U+00FF, in code point order.
const LATIN1_ENTITIES: [&str; 96] = [
    "nbsp", "iexcl", "cent", "pound", "curren", "yen", "brvbar", "sect",
    "uml", "copy", "ordf", "laquo", "not", "shy", "reg", "macr",
    "deg", "plusmn", "sup2", "sup3", "acute", "micro", "para", "middot",
    "cedil", "sup1", "ordm", "raquo", "frac14", "frac12", "frac34", "iquest",
    "Agrave", "Aacute", "Acirc", "Atilde", "Auml", "Aring", "AElig", "Ccedil",
    "Egrave", "Eacute", "Ecirc", "Euml", "Igrave", "Iacute", "Icirc", "Iuml",
    "ETH", "Ntilde", "Ograve", "Oacute", "Ocirc", "Otilde", "Ouml", "times",
    "Oslash", "Ugrave", "Uacute", "Ucirc", "Uuml", "Yacute", "THORN", "szlig",
    "agrave", "aacute", "acirc", "atilde", "auml", "aring", "aelig", "ccedil",
    "egrave", "eacute", "ecirc", "euml", "igrave", "iacute", "icirc", "iuml",
    "eth", "ntilde", "ograve", "oacute", "ocirc", "otilde", "ouml", "divide",
    "oslash", "ugrave", "uacute", "ucirc", "uuml", "yacute", "thorn", "yuml",
];

fn named_entity(ch: char) -> Option<&'static str> {
    match ch {
        '&' => Some("amp"),
        '<' => Some("lt"),
        '>' => Some("gt"),
        '"' => Some("quot"),
        '\u{2013}' => Some("ndash"),
        '\u{2014}' => Some("mdash"),
        '\u{2018}' => Some("lsquo"),
        '\u{2019}' => Some("rsquo"),
        '\u{201C}' => Some("ldquo"),
        '\u{201D}' => Some("rdquo"),
        '\u{201E}' => Some("bdquo"),
        '\u{2026}' => Some("hellip"),
        '\u{20AC}' => Some("euro"),
        '\u{00A0}'..='\u{00FF}' => LATIN1_ENTITIES.get(ch as usize - 0xA0).copied(),
        _ => None,
    }
}

/// Replace every character that has a named HTML entity, plus `'` as `&#039;`.
///
/// Umlauts come out as entities too (`ü` becomes `&uuml;`).
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == '\'' {
            escaped.push_str("&#039;");
        } else if let Some(name) = named_entity(ch) {
            escaped.push('&');
            escaped.push_str(name);
            escaped.push(';');
        } else {
            escaped.push(ch);
        }
    }
    escaped
}
