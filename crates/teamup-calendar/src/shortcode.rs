//! The `[teamup]` template tag.
//!
//! `[teamup]` renders the weekly table, `[teamup event="<ref>"]` renders a
//! single event. Any other attribute is ignored.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

pub const TAG_NAME: &str = "teamup";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ShortcodeError {
    #[error("Not a [teamup] tag: {0}")]
    NotATag(String),

    #[error("Malformed attribute list: {0}")]
    MalformedAttributes(String),
}

/// Which view a template tag asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateTag {
    CalendarView,
    EventView { event_ref: String },
}

#[allow(clippy::expect_used)]
fn re_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"^\[\s*{TAG_NAME}(?:\s+(?P<attrs>[^\]]*?))?\s*/?\]$"))
            .expect("shortcode regex should compile")
    })
}

#[allow(clippy::expect_used)]
fn re_attr() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?P<key>[A-Za-z_][\w-]*)\s*=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|(?P<bare>[^\s"']+))"#)
            .expect("attribute regex should compile")
    })
}

impl TemplateTag {
    /// Pick the view from already-parsed attributes.
    pub fn from_attrs<I, K, V>(attrs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in attrs {
            if key.as_ref().eq_ignore_ascii_case("event") {
                return TemplateTag::EventView {
                    event_ref: value.into(),
                };
            }
        }
        TemplateTag::CalendarView
    }

    /// Parse tag text such as `[teamup event="42-20240101T090000Z"]`.
    pub fn parse(text: &str) -> Result<Self, ShortcodeError> {
        let text = text.trim();
        let caps = re_tag()
            .captures(text)
            .ok_or_else(|| ShortcodeError::NotATag(text.to_string()))?;

        let Some(raw) = caps.name("attrs").map(|m| m.as_str()) else {
            return Ok(TemplateTag::CalendarView);
        };

        let mut attrs = Vec::new();
        let mut consumed = 0;
        for attr in re_attr().captures_iter(raw) {
            let whole = attr.get(0).map(|m| m.range()).unwrap_or_default();
            if !raw[consumed..whole.start].trim().is_empty() {
                return Err(ShortcodeError::MalformedAttributes(raw.to_string()));
            }
            consumed = whole.end;

            let key = attr.name("key").map(|m| m.as_str()).unwrap_or_default();
            let value = ["dq", "sq", "bare"]
                .iter()
                .find_map(|group| attr.name(group))
                .map(|m| m.as_str())
                .unwrap_or_default();
            attrs.push((key, value));
        }
        if !raw[consumed..].trim().is_empty() {
            return Err(ShortcodeError::MalformedAttributes(raw.to_string()));
        }

        Ok(Self::from_attrs(attrs))
    }
}
