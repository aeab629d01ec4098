//! Work-hours window evaluation for distribution rules.

use chrono::{DateTime, Datelike, Timelike, Utc};
use database::models::DistributionRule;
use database::validation::parse_time_of_day;

/// Whether a rule's work-days set and work-hours window cover `now`.
///
/// The window is half-open `[start, end)`. A start after the end wraps past
/// midnight (e.g. 22:00-06:00). Rules with an unparseable window or an
/// empty day set match nothing and are skipped for the cycle.
pub(crate) fn rule_matches(rule: &DistributionRule, now: DateTime<Utc>) -> bool {
    let weekday = now.weekday().num_days_from_sunday() as u8;
    if !rule.work_day_set().contains(&weekday) {
        return false;
    }

    let (Ok(start), Ok(end)) = (
        parse_time_of_day(&rule.work_hours_start),
        parse_time_of_day(&rule.work_hours_end),
    ) else {
        tracing::warn!(rule_id = rule.id, "rule has malformed work hours, skipping");
        return false;
    };

    let minute = now.hour() * 60 + now.minute();
    if start < end {
        minute >= start && minute < end
    } else if start > end {
        // Overnight window.
        minute >= start || minute < end
    } else {
        false
    }
}
