// crates/abraxas-acquisition/src/parse.rs
// ============================================================================
// Module: Manifest Parsers
// Description: Pure byte-to-URL-list parsers for the supported formats.
// Purpose: Turn raw manifest bodies into sorted, deduplicated URL lists.
// Dependencies: quick-xml, regex, serde_json, tl
// ============================================================================

//! ## Overview
//! Each parser is a pure function from raw text to a sorted, deduplicated
//! URL list; re-parsing the same bytes is a fixed point. Unparsable input
//! yields an empty list rather than a partial one, so a malformed body can
//! never produce environment-dependent output. URL normalization lowercases
//! the scheme and host, preserves path and query verbatim, and drops the
//! fragment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::OnceLock;

use quick_xml::Reader;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use regex::Regex;
use serde_json::Value;

// ============================================================================
// SECTION: URL Normalization
// ============================================================================

/// Matches absolute HTTP(S) URLs anchored at the string start.
#[allow(clippy::expect_used, reason = "the pattern literal is statically valid")]
pub(crate) fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^https?://\S+").expect("valid url pattern"))
}

/// Normalizes a URL: lowercase scheme and host, verbatim path and query,
/// fragment dropped. Non-absolute references pass through fragment-stripped.
#[must_use]
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() {
        return String::new();
    }
    let without_fragment = url.split('#').next().unwrap_or_default();
    let Some(scheme_end) = without_fragment.find("://") else {
        return without_fragment.to_string();
    };
    let scheme = without_fragment[.. scheme_end].to_ascii_lowercase();
    let rest = &without_fragment[scheme_end + 3 ..];
    let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());
    let authority = rest[.. authority_end].to_ascii_lowercase();
    let tail = &rest[authority_end ..];
    format!("{scheme}://{authority}{tail}")
}

/// Normalizes, deduplicates, and sorts a URL collection.
fn normalize_dedup_sort<I: IntoIterator<Item = String>>(urls: I) -> Vec<String> {
    let set: BTreeSet<String> = urls
        .into_iter()
        .map(|u| normalize_url(&u))
        .filter(|u| !u.is_empty())
        .collect();
    set.into_iter().collect()
}

// ============================================================================
// SECTION: XML Parsers
// ============================================================================

/// Returns whether an element's lowercased local name ends with a suffix.
fn local_name_ends_with(element: &BytesStart<'_>, suffix: &str) -> bool {
    let local = element.local_name();
    String::from_utf8_lossy(local.as_ref()).to_ascii_lowercase().ends_with(suffix)
}

/// Pushes the `href` attribute of an element, when present.
fn push_href_attribute(element: &BytesStart<'_>, urls: &mut Vec<String>) {
    for attribute in element.attributes().flatten() {
        if attribute.key.local_name().as_ref().eq_ignore_ascii_case(b"href")
            && let Ok(value) = attribute.unescape_value()
        {
            urls.push(value.trim().to_string());
        }
    }
}

/// Parses sitemap XML, collecting the text of every `*loc` element.
#[must_use]
pub fn parse_sitemap_xml(raw: &str) -> Vec<String> {
    let mut reader = Reader::from_str(raw);
    let mut urls: Vec<String> = Vec::new();
    let mut in_loc = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => {
                in_loc = local_name_ends_with(&element, "loc");
            }
            Ok(Event::End(_)) => {
                in_loc = false;
            }
            Ok(Event::Text(text)) if in_loc => {
                if let Ok(value) = text.unescape() {
                    urls.push(value.trim().to_string());
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => return Vec::new(),
            Ok(_) => {}
        }
    }
    normalize_dedup_sort(urls)
}

/// Parses RSS/Atom XML, collecting `*link` element text and `href` values.
#[must_use]
pub fn parse_rss(raw: &str) -> Vec<String> {
    let mut reader = Reader::from_str(raw);
    let mut urls: Vec<String> = Vec::new();
    let mut in_link = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => {
                in_link = local_name_ends_with(&element, "link");
                if in_link {
                    push_href_attribute(&element, &mut urls);
                }
            }
            Ok(Event::Empty(element)) => {
                if local_name_ends_with(&element, "link") {
                    push_href_attribute(&element, &mut urls);
                }
            }
            Ok(Event::End(_)) => {
                in_link = false;
            }
            Ok(Event::Text(text)) if in_link => {
                if let Ok(value) = text.unescape() {
                    urls.push(value.trim().to_string());
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => return Vec::new(),
            Ok(_) => {}
        }
    }
    normalize_dedup_sort(urls)
}

// ============================================================================
// SECTION: HTML and JSON Parsers
// ============================================================================

/// Parses an HTML index page, collecting anchor `href` attributes.
#[must_use]
pub fn parse_index_html(raw: &str) -> Vec<String> {
    let Ok(dom) = tl::parse(raw, tl::ParserOptions::default()) else {
        return Vec::new();
    };
    let parser = dom.parser();
    let mut urls: Vec<String> = Vec::new();
    if let Some(anchors) = dom.query_selector("a[href]") {
        for handle in anchors {
            let Some(node) = handle.get(parser) else {
                continue;
            };
            let Some(tag) = node.as_tag() else {
                continue;
            };
            if let Some(Some(href)) = tag.attributes().get("href") {
                urls.push(href.as_utf8_str().trim().to_string());
            }
        }
    }
    normalize_dedup_sort(urls)
}

/// Recursively collects URL-shaped strings from a JSON value.
fn walk_json(value: &Value, urls: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for child in map.values() {
                walk_json(child, urls);
            }
        }
        Value::Array(items) => {
            for child in items {
                walk_json(child, urls);
            }
        }
        Value::String(text) => {
            if url_pattern().is_match(text) {
                urls.push(text.clone());
            }
        }
        _ => {}
    }
}

/// Parses a JSON listing, emitting every string that looks like a URL.
#[must_use]
pub fn parse_json_listing(raw: &str) -> Vec<String> {
    let Ok(payload) = serde_json::from_str::<Value>(raw) else {
        return Vec::new();
    };
    let mut urls: Vec<String> = Vec::new();
    walk_json(&payload, &mut urls);
    normalize_dedup_sort(urls)
}
