use std::cmp::Ordering;

use chrono::{DateTime, Datelike, NaiveDate};

use crate::draw::DrawRecord;

/// Total order over draw records used as the draw index for drought math.
///
/// Compares UTC business day, then draw number (missing sorts last), then
/// ingestion timestamp, then source identity, then internal id. The final
/// tie-breaks make the order strict: no two distinct records compare equal.
pub fn canonical_cmp(a: &DrawRecord, b: &DrawRecord) -> Ordering {
    utc_day_number(a)
        .cmp(&utc_day_number(b))
        .then_with(|| cmp_draw_number(a.draw_number, b.draw_number))
        .then_with(|| a.created_at_ms.cmp(&b.created_at_ms))
        .then_with(|| a.source_id.cmp(&b.source_id))
        .then_with(|| a.id.cmp(&b.id))
}

/// Stable-sorts records into canonical order.
pub fn canonical_sort(records: &mut [DrawRecord]) {
    records.sort_by(canonical_cmp);
}

/// UTC day number for a record's business date.
///
/// Falls back to the ingestion day when the date is absent or unparsable;
/// scraped date strings come in several shapes and ingestion order can
/// diverge from true draw order on backfills.
pub fn utc_day_number(rec: &DrawRecord) -> i32 {
    rec.date
        .as_deref()
        .and_then(parse_day)
        .unwrap_or_else(|| created_at_day(rec.created_at_ms))
}

fn parse_day(s: &str) -> Option<i32> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d.num_days_from_ce());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%d-%m-%Y") {
        return Some(d.num_days_from_ce());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.to_utc().date_naive().num_days_from_ce());
    }
    None
}

fn created_at_day(ms: u64) -> i32 {
    DateTime::from_timestamp_millis(ms as i64)
        .map(|dt| dt.date_naive().num_days_from_ce())
        .unwrap_or(0)
}

fn cmp_draw_number(a: Option<u64>, b: Option<u64>) -> Ordering {
    // Missing draw numbers sort after present ones in ascending order.
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
