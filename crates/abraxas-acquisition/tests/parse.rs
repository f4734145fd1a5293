// crates/abraxas-acquisition/tests/parse.rs
// ============================================================================
// Module: Manifest Parser Tests
// Description: Verifies format parsers and URL normalization.
// ============================================================================
//! ## Overview
//! Each parser must yield a sorted, deduplicated URL list, be a fixed point
//! under re-parsing, and return an empty list for unparsable input.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use abraxas_acquisition::parse::normalize_url;
use abraxas_acquisition::parse::parse_index_html;
use abraxas_acquisition::parse::parse_json_listing;
use abraxas_acquisition::parse::parse_rss;
use abraxas_acquisition::parse::parse_sitemap_xml;

#[test]
fn normalize_lowercases_scheme_and_host_only() {
    assert_eq!(
        normalize_url("HTTPS://Example.COM/Path?Q=UPPER#frag"),
        "https://example.com/Path?Q=UPPER"
    );
}

#[test]
fn normalize_preserves_relative_references() {
    assert_eq!(normalize_url("/archive/2025.html#top"), "/archive/2025.html");
    assert_eq!(normalize_url("   "), "");
}

#[test]
fn sitemap_collects_loc_elements_sorted_and_unique() {
    let raw = r"<urlset>
        <url><loc>https://example.com/b</loc></url>
        <url><loc>https://example.com/a</loc></url>
        <url><loc>https://example.com/a</loc></url>
    </urlset>";
    let urls = parse_sitemap_xml(raw);
    assert_eq!(urls, vec!["https://example.com/a", "https://example.com/b"]);
}

#[test]
fn sitemap_index_uses_namespaced_loc_tags() {
    let raw = r#"<sm:sitemapindex xmlns:sm="http://x">
        <sm:sitemap><sm:loc>https://example.com/sitemap-2.xml</sm:loc></sm:sitemap>
        <sm:sitemap><sm:loc>https://example.com/sitemap-1.xml</sm:loc></sm:sitemap>
    </sm:sitemapindex>"#;
    let urls = parse_sitemap_xml(raw);
    assert_eq!(urls, vec![
        "https://example.com/sitemap-1.xml",
        "https://example.com/sitemap-2.xml",
    ]);
}

#[test]
fn malformed_sitemap_yields_empty_list() {
    assert!(parse_sitemap_xml("<urlset><loc>broken").is_empty());
}

#[test]
fn rss_collects_link_text_and_href_attributes() {
    let raw = r#"<rss><channel>
        <item><link>https://example.com/post-2</link></item>
        <item><link>https://example.com/post-1</link></item>
    </channel></rss>"#;
    assert_eq!(parse_rss(raw), vec![
        "https://example.com/post-1",
        "https://example.com/post-2",
    ]);

    let atom = r#"<feed xmlns="http://www.w3.org/2005/Atom">
        <link href="https://example.com/entry-b"/>
        <entry><link href="https://example.com/entry-a"/></entry>
    </feed>"#;
    assert_eq!(parse_rss(atom), vec![
        "https://example.com/entry-a",
        "https://example.com/entry-b",
    ]);
}

#[test]
fn html_index_collects_anchor_hrefs() {
    let raw = r#"<html><body>
        <a href="https://example.com/b">b</a>
        <a href="https://example.com/a">a</a>
        <a name="no-href">skip</a>
        <a href="https://example.com/a">dup</a>
    </body></html>"#;
    assert_eq!(parse_index_html(raw), vec![
        "https://example.com/a",
        "https://example.com/b",
    ]);
}

#[test]
fn json_listing_walks_nested_values_for_urls() {
    let raw = r#"{
        "data": [
            {"file": "https://example.com/data/2.csv"},
            {"file": "https://example.com/data/1.csv", "note": "not a url"}
        ],
        "next": "https://example.com/page/2"
    }"#;
    assert_eq!(parse_json_listing(raw), vec![
        "https://example.com/data/1.csv",
        "https://example.com/data/2.csv",
        "https://example.com/page/2",
    ]);
}

#[test]
fn json_listing_rejects_invalid_json() {
    assert!(parse_json_listing("{not json").is_empty());
}

#[test]
fn parsers_are_fixed_points_under_reparsing() {
    let raw = r"<urlset><url><loc>https://example.com/x</loc></url></urlset>";
    let first = parse_sitemap_xml(raw);
    let second = parse_sitemap_xml(raw);
    assert_eq!(first, second);
}
