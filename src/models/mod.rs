mod candidate;
mod opening_hours;

pub use candidate::{normalize_name, Candidate, Event, RawCandidate, RawEvent};
pub use opening_hours::{DayHours, OpeningHours, TimeRange};
