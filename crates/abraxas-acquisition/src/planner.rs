// crates/abraxas-acquisition/src/planner.rs
// ============================================================================
// Module: Bulk Planner
// Description: Window filtering and request capping over manifest URLs.
// Purpose: Turn a manifest into a finite, budget-capped fetch plan.
// Dependencies: abraxas-core, abraxas-tuning, regex, time
// ============================================================================

//! ## Overview
//! URLs carrying an extractable date (`YYYY-MM-DD` or `YYYYMMDD`) are
//! filtered against the window when one is set, sorted ascending by URL,
//! and followed by the undated URLs in sorted order. Without a window,
//! dated URLs sort descending by URL (a most-recent-first heuristic by
//! ASCII) and undated URLs are used only when no dated URL exists. The
//! request cap truncates the selection; overflow URLs are returned
//! separately, never silently dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::OnceLock;

use abraxas_core::CanonicalError;
use abraxas_core::WindowUtc;
use abraxas_tuning::PortfolioTuningIR;
use regex::Regex;
use time::Date;
use time::Month;

use crate::manifest::ManifestArtifact;
use crate::plan::BulkPullPlan;
use crate::plan::CachePolicy;
use crate::plan::PlanAction;
use crate::plan::PlanStep;

// ============================================================================
// SECTION: Date Extraction
// ============================================================================

/// Matches dashed dates (`YYYY-MM-DD`).
#[allow(clippy::expect_used, reason = "the pattern literal is statically valid")]
fn dashed_date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").expect("valid date pattern"))
}

/// Matches compact dates (`YYYYMMDD`).
#[allow(clippy::expect_used, reason = "the pattern literal is statically valid")]
fn compact_date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d{4})(\d{2})(\d{2})").expect("valid date pattern"))
}

/// Builds a calendar date from captured year, month, and day strings.
fn date_from_parts(year: &str, month: &str, day: &str) -> Option<Date> {
    let year: i32 = year.parse().ok()?;
    let month: u8 = month.parse().ok()?;
    let day: u8 = day.parse().ok()?;
    let month = Month::try_from(month).ok()?;
    Date::from_calendar_date(year, month, day).ok()
}

/// Extracts the first valid date from a URL using the fixed patterns.
fn extract_date(url: &str) -> Option<Date> {
    for pattern in [dashed_date_pattern(), compact_date_pattern()] {
        let Some(captures) = pattern.captures(url) else {
            continue;
        };
        let (Some(y), Some(m), Some(d)) = (captures.get(1), captures.get(2), captures.get(3))
        else {
            continue;
        };
        if let Some(date) = date_from_parts(y.as_str(), m.as_str(), d.as_str()) {
            return Some(date);
        }
    }
    None
}

/// Parses a window bound (`YYYY-MM-DD`, optionally with a time suffix).
fn parse_window_date(value: Option<&String>) -> Option<Date> {
    let value = value?;
    let captures = dashed_date_pattern().captures(value)?;
    let (y, m, d) = (captures.get(1)?, captures.get(2)?, captures.get(3)?);
    date_from_parts(y.as_str(), m.as_str(), d.as_str())
}

/// Returns whether a date falls inside the optional window bounds.
fn date_in_window(date: Date, start: Option<Date>, end: Option<Date>) -> bool {
    if start.is_some_and(|start| date < start) {
        return false;
    }
    if end.is_some_and(|end| date > end) {
        return false;
    }
    true
}

// ============================================================================
// SECTION: Window Filtering
// ============================================================================

/// Applies window filtering and ordering, returning `(selected, overflow)`.
fn filter_by_window(urls: &[String], window: &WindowUtc) -> (Vec<String>, Vec<String>) {
    let window_start = parse_window_date(window.start.as_ref());
    let window_end = parse_window_date(window.end.as_ref());

    let mut dated: Vec<(String, Date)> = Vec::new();
    let mut undated: Vec<String> = Vec::new();
    for url in urls {
        match extract_date(url) {
            Some(date) => dated.push((url.clone(), date)),
            None => undated.push(url.clone()),
        }
    }

    if window_start.is_some() || window_end.is_some() {
        let mut filtered: Vec<String> = dated
            .into_iter()
            .filter(|(_, date)| date_in_window(*date, window_start, window_end))
            .map(|(url, _)| url)
            .collect();
        filtered.sort();
        undated.sort();
        filtered.extend(undated);
        return (filtered, Vec::new());
    }

    if !dated.is_empty() {
        let mut selected: Vec<String> = dated.into_iter().map(|(url, _)| url).collect();
        selected.sort_by(|a, b| b.cmp(a));
        return (selected, Vec::new());
    }

    undated.sort();
    (undated, Vec::new())
}

// ============================================================================
// SECTION: Planning
// ============================================================================

/// A built plan with the URLs the request cap pushed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkPlanResult {
    /// Budget-capped fetch plan.
    pub plan: BulkPullPlan,
    /// URLs excluded by the window or the request cap, in selection order.
    pub overflow_urls: Vec<String>,
}

/// Builds a bulk pull plan from a manifest under the active budgets.
///
/// # Errors
///
/// Returns [`CanonicalError`] when a step or plan identity has no canonical
/// encoding.
pub fn build_bulk_plan(
    source_id: &str,
    window_utc: &WindowUtc,
    manifest: &ManifestArtifact,
    budgets: &PortfolioTuningIR,
    created_at_utc: &str,
) -> Result<BulkPlanResult, CanonicalError> {
    let (mut selected, mut overflow) = filter_by_window(&manifest.urls, window_utc);

    let max_requests = budgets.ubv.max_requests_per_run as usize;
    if selected.len() > max_requests {
        overflow.extend(selected.split_off(max_requests));
    }

    let mut steps: Vec<PlanStep> = Vec::with_capacity(selected.len());
    for (idx, url) in selected.iter().enumerate() {
        let idx = idx as u64;
        steps.push(PlanStep {
            step_id: PlanStep::derive_step_id(url, idx, source_id)?,
            action: PlanAction::Download,
            url_or_key: url.clone(),
            expected_bytes: None,
            cache_policy: CachePolicy::Required,
            order_index: idx,
        });
    }

    let plan = BulkPullPlan::build(
        source_id,
        created_at_utc,
        window_utc.clone(),
        manifest.manifest_id.clone(),
        steps,
    )?;

    Ok(BulkPlanResult {
        plan,
        overflow_urls: overflow,
    })
}
