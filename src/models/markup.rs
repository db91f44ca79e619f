//! Extraction helpers for raw outline names.
//!
//! Outline item names arrive as markup strings: the display text with
//! inline `#Tag` hashtags and an optional due-date annotation of the form
//! `, Due <time startYear="Y" startMonth="M" startDay="D">...</time>`.
//! The functions here pull the structured pieces out of that string and
//! produce a clean display name. All of them are pure; regexes are
//! compiled once.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

static DUE_DATE: OnceLock<Regex> = OnceLock::new();
static DUE_BLOCK: OnceLock<Regex> = OnceLock::new();
static TAG: OnceLock<Regex> = OnceLock::new();
static MARKUP: OnceLock<Regex> = OnceLock::new();

fn due_date_re() -> &'static Regex {
    DUE_DATE.get_or_init(|| {
        Regex::new(r#"<time startYear="(\d+)" startMonth="(\d+)" startDay="(\d+)">"#).unwrap()
    })
}

fn due_block_re() -> &'static Regex {
    DUE_BLOCK.get_or_init(|| Regex::new(r", Due <time .*?</time>").unwrap())
}

fn tag_re() -> &'static Regex {
    TAG.get_or_init(|| Regex::new(r"#\w+").unwrap())
}

fn markup_re() -> &'static Regex {
    MARKUP.get_or_init(|| Regex::new(r"<.*?>").unwrap())
}

/// Extract the embedded due date, if the name carries the date marker.
///
/// Malformed or partial markers (missing attributes, out-of-range
/// components) are simply not matched; there is no partial-parse error.
pub fn extract_due_date(raw_name: &str) -> Option<NaiveDate> {
    let caps = due_date_re().captures(raw_name)?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Every `#word` hashtag in the name, left-to-right, duplicates included.
pub fn extract_tags(raw_name: &str) -> Vec<String> {
    tag_re()
        .find_iter(raw_name)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Remove the `, Due <time ...>...</time>` annotation block(s), anchor
/// text included. No-op when the name has no due annotation.
pub fn strip_due_date(raw_name: &str) -> String {
    due_block_re().replace_all(raw_name, "").into_owned()
}

/// Remove every `<...>` markup span.
pub fn strip_markup(raw_name: &str) -> String {
    markup_re().replace_all(raw_name, "").into_owned()
}

/// Remove every `#word` hashtag.
pub fn strip_tags(raw_name: &str) -> String {
    tag_re().replace_all(raw_name, "").into_owned()
}

/// The display name: due-date block, hashtags, and markup removed.
///
/// The due block must be stripped first: it is not tag-shaped, and once
/// the surrounding markup is gone its remnants would no longer be
/// recognizable as a unit.
pub fn clean_name(raw_name: &str) -> String {
    strip_markup(&strip_tags(&strip_due_date(raw_name)))
}
