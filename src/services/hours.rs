use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;

use crate::models::{DayHours, OpeningHours};

/// Result of evaluating a venue's opening hours at a reference instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoursStatus {
    /// All seven recognized weekdays carry an explicit closed marker.
    pub permanently_closed: bool,
    /// Closed at the reference instant in the venue's local timezone.
    pub closed_now: bool,
}

/// Evaluates `hours` against the current weekday and time-of-day in the
/// venue's local timezone.
///
/// Unknown or unparsed data fails open: availability is favored over
/// over-filtering, and the quality gate separately flags missing hours.
pub fn evaluate(hours: &OpeningHours, reference: DateTime<Utc>, timezone: Tz) -> HoursStatus {
    let local = reference.with_timezone(&timezone);
    let today = local.weekday();
    let now = local.time();

    match hours {
        OpeningHours::PerWeekday(days) => {
            // Fewer than 7 recognized days is insufficient data for a
            // permanently-closed verdict.
            let permanently_closed =
                days.len() >= 7 && days.values().all(|d| *d == DayHours::Closed);

            let closed_now = match days.get(&today) {
                // No entry for today means no slots today.
                None => true,
                Some(DayHours::Closed) => true,
                Some(DayHours::Open(slots)) => !slots.iter().any(|s| s.contains(now)),
                Some(DayHours::Unparsed) => {
                    tracing::debug!(weekday = %today, "Unparsed day hours, failing open");
                    false
                }
            };

            HoursStatus {
                permanently_closed,
                closed_now,
            }
        }
        OpeningHours::LegacyRange(range) => HoursStatus {
            permanently_closed: false,
            closed_now: !range.contains(now),
        },
        OpeningHours::Unknown => HoursStatus::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Europe::Madrid;
    use serde_json::json;

    // Madrid local time on a Wednesday (2026-07-15 is a Wednesday).
    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Madrid
            .with_ymd_and_hms(2026, 7, 15, hour, minute, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn parse(raw: serde_json::Value) -> OpeningHours {
        OpeningHours::parse(Some(&raw))
    }

    #[test]
    fn test_open_within_todays_slot() {
        let hours = parse(json!({
            "wednesday": [{"open": "09:00", "close": "17:00"}]
        }));

        assert!(!evaluate(&hours, at(10, 0), Madrid).closed_now);
        assert!(evaluate(&hours, at(18, 0), Madrid).closed_now);
        // Half-open interval: closing minute is closed
        assert!(evaluate(&hours, at(17, 0), Madrid).closed_now);
    }

    #[test]
    fn test_missing_day_entry_is_closed_today() {
        let hours = parse(json!({
            "monday": [{"open": "09:00", "close": "17:00"}]
        }));
        assert!(evaluate(&hours, at(10, 0), Madrid).closed_now);
    }

    #[test]
    fn test_overnight_slot_wraps_past_midnight() {
        let hours = parse(json!({
            "wednesday": [{"open": "22:00", "close": "02:00"}],
            "thursday": [{"open": "22:00", "close": "02:00"}]
        }));

        assert!(!evaluate(&hours, at(23, 30), Madrid).closed_now);
        // 01:00 Thursday falls inside Wednesday's logical night via
        // Thursday's own overnight slot
        let thursday_0100 = Madrid
            .with_ymd_and_hms(2026, 7, 16, 1, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        assert!(!evaluate(&hours, thursday_0100, Madrid).closed_now);
        let thursday_0300 = Madrid
            .with_ymd_and_hms(2026, 7, 16, 3, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        assert!(evaluate(&hours, thursday_0300, Madrid).closed_now);
    }

    #[test]
    fn test_permanently_closed_requires_all_seven_days() {
        let all_closed = parse(json!({
            "monday": [], "tuesday": [], "wednesday": [], "thursday": [],
            "friday": [], "saturday": [], "sunday": []
        }));
        let status = evaluate(&all_closed, at(10, 0), Madrid);
        assert!(status.permanently_closed);
        assert!(status.closed_now);

        // Six closed days is insufficient data
        let six_days = parse(json!({
            "monday": [], "tuesday": [], "wednesday": [], "thursday": [],
            "friday": [], "saturday": []
        }));
        assert!(!evaluate(&six_days, at(10, 0), Madrid).permanently_closed);

        // Mixed closed markers still count
        let mixed_markers = parse(json!({
            "monday": null, "tuesday": false, "wednesday": "",
            "thursday": "closed", "friday": "gesloten", "saturday": "cerrado",
            "sunday": []
        }));
        assert!(evaluate(&mixed_markers, at(10, 0), Madrid).permanently_closed);
    }

    #[test]
    fn test_one_open_day_is_not_permanently_closed() {
        let hours = parse(json!({
            "monday": [], "tuesday": [], "wednesday": [], "thursday": [],
            "friday": [], "saturday": [],
            "sunday": [{"open": "10:00", "close": "14:00"}]
        }));
        assert!(!evaluate(&hours, at(10, 0), Madrid).permanently_closed);
    }

    #[test]
    fn test_unknown_hours_fail_open() {
        let status = evaluate(&OpeningHours::Unknown, at(3, 0), Madrid);
        assert!(!status.permanently_closed);
        assert!(!status.closed_now);
    }

    #[test]
    fn test_legacy_range_applies_every_day() {
        let hours = parse(json!("10:00 - 18:00"));
        assert!(!evaluate(&hours, at(12, 0), Madrid).closed_now);
        assert!(evaluate(&hours, at(20, 0), Madrid).closed_now);
        assert!(!evaluate(&hours, at(12, 0), Madrid).permanently_closed);
    }

    #[test]
    fn test_timezone_shifts_the_local_weekday() {
        // 23:30 UTC Wednesday is already 01:30 Thursday in Madrid (summer,
        // UTC+2), so Thursday's hours apply.
        let hours = parse(json!({
            "wednesday": [{"open": "00:00", "close": "23:59"}],
            "thursday": []
        }));
        let utc_wed_late = Utc.with_ymd_and_hms(2026, 7, 15, 23, 30, 0).unwrap();
        assert!(evaluate(&hours, utc_wed_late, Madrid).closed_now);
    }
}
