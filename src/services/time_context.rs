use serde::Serialize;

/// Coarse time-of-day suitability derived from free-text classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeContext {
    Morning,
    Afternoon,
    Evening,
}

const MORNING_KEYWORDS: &[&str] = &[
    "market", "bakery", "cafe", "coffee", "breakfast", "garden", "park", "walk", "hike", "hiking",
];

const EVENING_KEYWORDS: &[&str] = &[
    "restaurant", "dinner", "tapas", "bar", "nightlife", "nightclub", "club", "cocktail", "sunset",
    "music",
];

const AFTERNOON_KEYWORDS: &[&str] = &[
    "museum", "beach", "gallery", "shopping", "boat", "aquarium", "pool", "castle", "culture",
];

/// Infers a time context from category/subcategory keyword matching.
///
/// Kept as a narrow pure function on purpose: the keyword vocabulary is the
/// only thing that determines itinerary composition per time of day, so
/// changes here stay visible and testable.
pub fn classify(category: &str, subcategory: Option<&str>) -> Option<TimeContext> {
    let haystack = match subcategory {
        Some(sub) => format!("{} {}", category, sub).to_lowercase(),
        None => category.to_lowercase(),
    };

    let matches = |keywords: &[&str]| keywords.iter().any(|k| haystack.contains(k));

    if matches(MORNING_KEYWORDS) {
        Some(TimeContext::Morning)
    } else if matches(EVENING_KEYWORDS) {
        Some(TimeContext::Evening)
    } else if matches(AFTERNOON_KEYWORDS) {
        Some(TimeContext::Afternoon)
    } else {
        None
    }
}
