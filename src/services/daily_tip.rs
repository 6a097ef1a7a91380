use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use crate::models::{Candidate, Event};
use crate::services::icons::IconAssigner;
use crate::services::quality;

/// Probability of drawing the tip from the POI set rather than the events.
const POI_DRAW_PROBABILITY: f64 = 0.6;

/// The single selected tip.
#[derive(Debug, Clone)]
pub enum TipItem {
    Poi(Candidate),
    Event(Event),
}

/// Outcome of a daily-tip request. `Exhausted` is a normal result, not an
/// error: there are simply no more tips available today.
#[derive(Debug, Clone)]
pub enum DailyTipOutcome {
    Tip { item: TipItem, category: String },
    Exhausted,
}

/// Everything the selector needs for one request.
#[derive(Debug, Clone)]
pub struct TipRequest {
    pub pois: Vec<Candidate>,
    pub events: Vec<Event>,
    /// Client-supplied "already shown this session" keys.
    pub excluded_keys: HashSet<String>,
    pub reference: DateTime<Utc>,
    pub timezone: Tz,
}

/// The interest category active on the destination-local calendar day.
/// Deterministic rotation: identical for all users on the same day.
fn active_category(
    categories: &[String],
    reference: DateTime<Utc>,
    timezone: Tz,
) -> Option<&str> {
    if categories.is_empty() {
        return None;
    }
    let day_of_year = reference.with_timezone(&timezone).ordinal() as usize;
    Some(categories[day_of_year % categories.len()].as_str())
}

/// Picks exactly one tip.
///
/// POIs are pre-filtered through the opening-hours evaluator and quality
/// gate, the day's active category, and the client's exclusion list; events
/// only honor the exclusion list. A weighted draw then prefers POIs, falls
/// back to whichever set still has supply, and reports `Exhausted` when
/// both are empty.
pub fn select_daily_tip<R: Rng>(
    request: &TipRequest,
    categories: &[String],
    rng: &mut R,
) -> DailyTipOutcome {
    let active = active_category(categories, request.reference, request.timezone);

    let pois: Vec<Candidate> =
        quality::filter_pool(&request.pois, request.reference, request.timezone)
            .into_iter()
            .filter(|c| active.map_or(true, |cat| c.matches_keyword(cat)))
            .filter(|c| !c.is_seen(&request.excluded_keys))
            .collect();

    let events: Vec<&Event> = request
        .events
        .iter()
        .filter(|e| !e.is_seen(&request.excluded_keys))
        .collect();

    tracing::debug!(
        active_category = active.unwrap_or("all"),
        pois = pois.len(),
        events = events.len(),
        "Daily tip candidate sets"
    );

    let draw_poi = if pois.is_empty() {
        false
    } else if events.is_empty() {
        true
    } else {
        rng.gen_bool(POI_DRAW_PROBABILITY)
    };

    let category = active.unwrap_or("all").to_string();
    let mut assigner = IconAssigner::new();

    if draw_poi {
        if let Some(poi) = pois.choose(rng) {
            let mut poi = poi.clone();
            let icon = assigner.assign(&poi.category, poi.subcategory.as_deref());
            poi.icon = Some(icon.to_string());
            return DailyTipOutcome::Tip {
                item: TipItem::Poi(poi),
                category,
            };
        }
    } else if let Some(event) = events.choose(rng) {
        let mut event = (*event).clone();
        event.icon = Some(assigner.assign("event", None).to_string());
        return DailyTipOutcome::Tip {
            item: TipItem::Event(event),
            category,
        };
    }

    DailyTipOutcome::Exhausted
}
