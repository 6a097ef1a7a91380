use chrono::{NaiveTime, Weekday};
use serde_json::Value;
use std::collections::HashMap;

/// Words that mark a day as explicitly closed in the source data.
/// The upstream scrape mixes English, Dutch, Spanish and German payloads.
const CLOSED_MARKERS: &[&str] = &["closed", "gesloten", "cerrado", "geschlossen"];

/// A single open interval within one day. `close < open` means the interval
/// wraps past midnight into the next day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl TimeRange {
    /// Whether `time` falls within `[open, close)`, honoring overnight wrap.
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.close < self.open {
            // Overnight interval, e.g. 22:00 - 02:00
            time >= self.open || time < self.close
        } else {
            time >= self.open && time < self.close
        }
    }
}

/// Opening hours for one weekday.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayHours {
    /// Explicit closed marker (empty slot list, `false`, `null`, empty
    /// string, or a closed word).
    Closed,
    Open(Vec<TimeRange>),
    /// The day value was present but unintelligible. Fails open and never
    /// counts toward a permanently-closed verdict.
    Unparsed,
}

/// Canonical opening-hours representation. Raw payloads come in several
/// historical shapes; they are parsed here, once, at the boundary, so the
/// evaluator never branches on raw JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpeningHours {
    /// Object keyed by weekday name with arrays of `{open, close}` slots.
    PerWeekday(HashMap<Weekday, DayHours>),
    /// Legacy single-string format `"HH:MM - HH:MM"`, applied every day.
    LegacyRange(TimeRange),
    /// Absent or unparsable payload. Treated as "not closed" downstream.
    Unknown,
}

impl OpeningHours {
    /// Parses a raw opening-hours payload. Never fails: anything that cannot
    /// be understood becomes `Unknown` and is logged by the caller.
    pub fn parse(raw: Option<&Value>) -> Self {
        let Some(raw) = raw else {
            return OpeningHours::Unknown;
        };

        match raw {
            Value::String(s) => match parse_range(s) {
                Some(range) => OpeningHours::LegacyRange(range),
                None => OpeningHours::Unknown,
            },
            Value::Object(map) => {
                let mut days = HashMap::new();
                for (key, value) in map {
                    let Ok(weekday) = key.trim().parse::<Weekday>() else {
                        continue;
                    };
                    days.insert(weekday, parse_day(value));
                }
                if days.is_empty() {
                    OpeningHours::Unknown
                } else {
                    OpeningHours::PerWeekday(days)
                }
            }
            _ => OpeningHours::Unknown,
        }
    }

    /// Whether any usable hours information was extracted from the payload.
    pub fn is_known(&self) -> bool {
        !matches!(self, OpeningHours::Unknown)
    }
}

/// Parses one weekday's value into `DayHours`.
fn parse_day(value: &Value) -> DayHours {
    match value {
        Value::Null | Value::Bool(false) => DayHours::Closed,
        Value::String(s) => {
            let normalized = s.trim().to_lowercase();
            if normalized.is_empty() || CLOSED_MARKERS.contains(&normalized.as_str()) {
                DayHours::Closed
            } else if let Some(range) = parse_range(s) {
                DayHours::Open(vec![range])
            } else {
                DayHours::Unparsed
            }
        }
        Value::Array(slots) => {
            if slots.is_empty() {
                return DayHours::Closed;
            }
            let ranges: Vec<TimeRange> = slots.iter().filter_map(parse_slot).collect();
            if ranges.is_empty() {
                // Slots were present but none parsed
                DayHours::Unparsed
            } else {
                DayHours::Open(ranges)
            }
        }
        _ => DayHours::Unparsed,
    }
}

/// Parses one `{open, close}` slot object.
fn parse_slot(slot: &Value) -> Option<TimeRange> {
    let open = parse_time(slot.get("open")?.as_str()?)?;
    let close = parse_time(slot.get("close")?.as_str()?)?;
    Some(TimeRange { open, close })
}

/// Parses the legacy `"HH:MM - HH:MM"` string range.
fn parse_range(s: &str) -> Option<TimeRange> {
    let (open, close) = s.split_once('-')?;
    Some(TimeRange {
        open: parse_time(open)?,
        close: parse_time(close)?,
    })
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}
