use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use super::OpeningHours;
use chrono::NaiveTime;

/// A point of interest eligible for recommendation.
///
/// Immutable once normalized from the raw search payload; the engine only
/// annotates copies (icon) and never mutates source data.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Stable identifier. Transient search results may not carry one, in
    /// which case the normalized name acts as the dedup key.
    pub id: Option<String>,
    pub name: String,
    pub category: String,
    pub subcategory: Option<String>,
    /// 0-5 rating. Absence means unrated, which is acceptable.
    pub rating: Option<f64>,
    pub review_count: u32,
    pub has_thumbnail: bool,
    pub image_count: u32,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub opening_hours: OpeningHours,
    /// Language code -> description text, for locale-sensitive selection.
    pub descriptions: HashMap<String, String>,
    /// Engine-assigned display icon.
    pub icon: Option<String>,
}

impl Candidate {
    /// The keys under which this candidate is recorded in session history:
    /// its id when present, plus its normalized name. Matching either one
    /// counts as "seen", which guards against the same physical place
    /// surfacing under two different source identifiers.
    pub fn history_keys(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(2);
        if let Some(id) = &self.id {
            keys.push(id.clone());
        }
        keys.push(normalize_name(&self.name));
        keys
    }

    pub fn is_seen(&self, history: &HashSet<String>) -> bool {
        self.history_keys().iter().any(|k| history.contains(k))
    }

    pub fn has_gps(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// Picks the description for `language`, falling back to English, then
    /// to any available translation.
    pub fn description_for(&self, language: &str) -> Option<&str> {
        self.descriptions
            .get(language)
            .or_else(|| self.descriptions.get("en"))
            .or_else(|| self.descriptions.values().next())
            .map(String::as_str)
    }

    /// Case-insensitive match against category and subcategory.
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let keyword = keyword.to_lowercase();
        self.category.to_lowercase().contains(&keyword)
            || self
                .subcategory
                .as_deref()
                .is_some_and(|s| s.to_lowercase().contains(&keyword))
    }
}

/// A local event eligible for recommendation alongside POIs.
#[derive(Debug, Clone)]
pub struct Event {
    pub id: Option<String>,
    pub name: String,
    pub start_time: Option<NaiveTime>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

impl Event {
    pub fn history_keys(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(2);
        if let Some(id) = &self.id {
            keys.push(id.clone());
        }
        keys.push(normalize_name(&self.name));
        keys
    }

    pub fn is_seen(&self, history: &HashSet<String>) -> bool {
        self.history_keys().iter().any(|k| history.contains(k))
    }
}

/// Normalizes a display name into a history/dedup key.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

// ============================================================================
// Raw boundary shapes
// ============================================================================

/// Candidate as delivered by the search/database collaborators. Field names
/// vary between sources; aliases and defaults absorb the variation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCandidate {
    /// String or numeric id, depending on the source.
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(alias = "title")]
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, alias = "subCategory")]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default, alias = "reviews")]
    pub review_count: u32,
    #[serde(default)]
    pub has_thumbnail: bool,
    #[serde(default, alias = "images")]
    pub image_count: u32,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, alias = "lat")]
    pub latitude: Option<f64>,
    #[serde(default, alias = "lng", alias = "lon")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub opening_hours: Option<Value>,
    #[serde(default)]
    pub descriptions: HashMap<String, String>,
}

impl From<RawCandidate> for Candidate {
    fn from(raw: RawCandidate) -> Self {
        let opening_hours = OpeningHours::parse(raw.opening_hours.as_ref());
        if raw.opening_hours.is_some() && !opening_hours.is_known() {
            // Fail open: unparsable hours never exclude a candidate here;
            // the quality gate still flags the missing data.
            tracing::debug!(name = %raw.name, "Unparsable opening hours payload");
        }

        Candidate {
            id: normalize_id(raw.id),
            name: raw.name,
            category: raw.category.unwrap_or_default(),
            subcategory: raw.subcategory,
            rating: raw.rating,
            review_count: raw.review_count,
            has_thumbnail: raw.has_thumbnail,
            image_count: raw.image_count,
            address: raw.address,
            latitude: raw.latitude,
            longitude: raw.longitude,
            opening_hours,
            descriptions: raw.descriptions,
            icon: None,
        }
    }
}

/// Event as delivered by collaborators: `{id, name/title, startTime,
/// address, description}` with loosely formatted start times.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(alias = "title")]
    pub name: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<RawEvent> for Event {
    fn from(raw: RawEvent) -> Self {
        let start_time = raw.start_time.as_deref().and_then(parse_event_time);
        if raw.start_time.is_some() && start_time.is_none() {
            tracing::debug!(name = %raw.name, "Unparsable event start time");
        }

        Event {
            id: normalize_id(raw.id),
            name: raw.name,
            start_time,
            address: raw.address,
            description: raw.description,
            icon: None,
        }
    }
}

/// Accepts `HH:MM`, `HH:MM:SS`, or an RFC 3339 timestamp.
fn parse_event_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.time())
        })
}

/// Collapses string and numeric source ids into one string key.
fn normalize_id(id: Option<Value>) -> Option<String> {
    match id? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate(id: Option<&str>, name: &str) -> Candidate {
        Candidate {
            id: id.map(String::from),
            name: name.to_string(),
            category: "culture".to_string(),
            subcategory: None,
            rating: Some(4.5),
            review_count: 10,
            has_thumbnail: true,
            image_count: 3,
            address: Some("Carrer Major 1".to_string()),
            latitude: Some(38.64),
            longitude: Some(0.04),
            opening_hours: OpeningHours::Unknown,
            descriptions: HashMap::new(),
            icon: None,
        }
    }

    #[test]
    fn test_history_keys_prefer_id_but_include_name() {
        let c = candidate(Some("poi-1"), "  Castell de Calp ");
        assert_eq!(
            c.history_keys(),
            vec!["poi-1".to_string(), "castell de calp".to_string()]
        );

        let anonymous = candidate(None, "Mirador");
        assert_eq!(anonymous.history_keys(), vec!["mirador".to_string()]);
    }

    #[test]
    fn test_is_seen_matches_either_key() {
        let c = candidate(Some("poi-1"), "Castell de Calp");

        let by_id: HashSet<String> = ["poi-1".to_string()].into();
        assert!(c.is_seen(&by_id));

        let by_name: HashSet<String> = ["castell de calp".to_string()].into();
        assert!(c.is_seen(&by_name));

        let neither: HashSet<String> = ["poi-2".to_string()].into();
        assert!(!c.is_seen(&neither));
    }

    #[test]
    fn test_raw_candidate_normalization() {
        let raw: RawCandidate = serde_json::from_value(json!({
            "id": 117,
            "title": "Museu del Col·leccionisme",
            "category": "Culture",
            "reviewCount": 24,
            "hasThumbnail": true,
            "imageCount": 2,
            "lat": 38.645,
            "lng": 0.045,
            "openingHours": {"monday": [{"open": "10:00", "close": "14:00"}]},
            "descriptions": {"en": "Collector's museum", "nl": "Verzamelmuseum"}
        }))
        .unwrap();

        let c: Candidate = raw.into();
        assert_eq!(c.id.as_deref(), Some("117"));
        assert_eq!(c.name, "Museu del Col·leccionisme");
        assert!(c.has_gps());
        assert!(c.opening_hours.is_known());
        assert_eq!(c.description_for("nl"), Some("Verzamelmuseum"));
        assert_eq!(c.description_for("de"), Some("Collector's museum"));
    }

    #[test]
    fn test_raw_event_start_time_formats() {
        for (input, expected) in [
            ("19:00", Some("19:00")),
            ("19:00:00", Some("19:00")),
            ("2026-07-14T20:30:00+02:00", Some("20:30")),
            ("tonight", None),
        ] {
            let raw: RawEvent =
                serde_json::from_value(json!({ "name": "Fiesta", "startTime": input })).unwrap();
            let event: Event = raw.into();
            let expected =
                expected.map(|t| NaiveTime::parse_from_str(t, "%H:%M").unwrap());
            assert_eq!(event.start_time, expected, "input: {input}");
        }
    }

    #[test]
    fn test_matches_keyword_checks_both_classification_fields() {
        let mut c = candidate(None, "La Bodega");
        c.category = "Food & Drink".to_string();
        c.subcategory = Some("Tapas Restaurant".to_string());

        assert!(c.matches_keyword("food"));
        assert!(c.matches_keyword("restaurant"));
        assert!(!c.matches_keyword("beach"));
    }
}
