use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::{Candidate, Event};
use crate::services::icons::IconAssigner;
use crate::services::session_history::SessionHistoryStore;
use crate::services::time_context::{self, TimeContext};
use crate::services::{quality, variation};

/// Events whose start is within this window of a slot's time can fill it.
const EVENT_MATCH_WINDOW_MINUTES: i64 = 120;

/// How many candidates the variation selector hands the builder per slot.
/// Headroom keeps meal and context sub-pools from starving.
const WORKING_SET_FACTOR: usize = 2;

/// Requested itinerary span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItineraryDuration {
    Morning,
    Afternoon,
    Evening,
    #[serde(rename = "full-day")]
    FullDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Activity,
    Lunch,
    Dinner,
}

/// One template slot. Never persisted; constructed per request.
#[derive(Debug, Clone, Copy)]
struct TimeSlot {
    time: NaiveTime,
    kind: SlotKind,
    context: TimeContext,
}

/// What filled a slot.
#[derive(Debug, Clone)]
pub enum PlannedEntry {
    Poi(Candidate),
    Event(Event),
}

/// Final output unit, one per filled slot. Slots that could not be filled
/// are omitted, so an itinerary may carry fewer items than template slots.
#[derive(Debug, Clone)]
pub struct ItineraryItem {
    pub time: NaiveTime,
    pub kind: SlotKind,
    pub entry: PlannedEntry,
    pub label: Option<String>,
}

/// Everything the builder needs for one request.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub candidates: Vec<Candidate>,
    pub events: Vec<Event>,
    pub duration: ItineraryDuration,
    pub include_meals: bool,
    pub session_key: String,
    pub reference: DateTime<Utc>,
    pub timezone: Tz,
}

fn slot(time: &str, kind: SlotKind, context: TimeContext) -> TimeSlot {
    TimeSlot {
        // Template times are static and always valid
        time: NaiveTime::parse_from_str(time, "%H:%M").expect("valid template time"),
        kind,
        context,
    }
}

/// Static slot templates per duration.
fn slot_template(duration: ItineraryDuration, include_meals: bool) -> Vec<TimeSlot> {
    use SlotKind::*;
    use TimeContext::*;

    let mut slots = match duration {
        ItineraryDuration::Morning => vec![
            slot("09:00", Activity, Morning),
            slot("11:00", Activity, Morning),
            slot("12:30", Lunch, Morning),
        ],
        ItineraryDuration::Afternoon => vec![
            slot("14:00", Activity, Afternoon),
            slot("16:00", Activity, Afternoon),
            slot("19:30", Dinner, Evening),
        ],
        ItineraryDuration::Evening => vec![
            slot("18:00", Activity, Evening),
            slot("19:30", Dinner, Evening),
            slot("21:30", Activity, Evening),
        ],
        ItineraryDuration::FullDay => vec![
            slot("09:00", Activity, Morning),
            slot("11:00", Activity, Morning),
            slot("12:30", Lunch, Morning),
            slot("14:30", Activity, Afternoon),
            slot("16:30", Activity, Afternoon),
            slot("19:30", Dinner, Evening),
        ],
    };

    if !include_meals {
        for s in &mut slots {
            s.kind = SlotKind::Activity;
        }
    }

    slots
}

/// Builds a time-sliced day plan.
///
/// Pipeline: quality gate (with relaxation) -> session history read ->
/// variation selection of a working set -> slot filling -> icon assignment
/// -> history write-back. The history write happens only after the whole
/// selection completes, so an abandoned request leaves the store untouched.
pub async fn build<R: Rng>(
    store: &SessionHistoryStore,
    request: BuildRequest,
    rng: &mut R,
) -> Vec<ItineraryItem> {
    let slots = slot_template(request.duration, request.include_meals);

    // 1. Quality-filter the raw pool
    let filtered = quality::filter_pool(&request.candidates, request.reference, request.timezone);

    // 2. Read session history and select a working set with guaranteed novelty
    let history = store.get(&request.session_key).await;
    let working = variation::select(
        &filtered,
        &history,
        slots.len() * WORKING_SET_FACTOR,
        rng,
    );

    tracing::info!(
        session_key = %request.session_key,
        duration = ?request.duration,
        pool = request.candidates.len(),
        filtered = filtered.len(),
        working = working.len(),
        events = request.events.len(),
        "Building itinerary"
    );

    // 3. Fill slots in order; a placed candidate or event is excluded from
    //    every later slot in the same build
    let mut used: HashSet<String> = HashSet::new();
    let mut items: Vec<ItineraryItem> = Vec::with_capacity(slots.len());

    for slot in &slots {
        let entry = fill_slot(slot, &working, &request.events, &mut used);
        let Some(entry) = entry else {
            tracing::debug!(time = %slot.time, kind = ?slot.kind, "Slot left unfilled");
            continue;
        };

        let label = match slot.kind {
            SlotKind::Lunch => Some("Lunch".to_string()),
            SlotKind::Dinner => Some("Dinner".to_string()),
            SlotKind::Activity => None,
        };

        items.push(ItineraryItem {
            time: slot.time,
            kind: slot.kind,
            entry,
            label,
        });
    }

    // 4. Annotate with visually distinct icons, in result order
    let mut assigner = IconAssigner::new();
    for item in &mut items {
        match &mut item.entry {
            PlannedEntry::Poi(poi) => {
                let icon = assigner.assign(&poi.category, poi.subcategory.as_deref());
                poi.icon = Some(icon.to_string());
            }
            PlannedEntry::Event(event) => {
                event.icon = Some(assigner.assign("event", None).to_string());
            }
        }
    }

    // 5. Feed placed candidates back into the session history
    let placed_keys: Vec<String> = items
        .iter()
        .filter_map(|item| match &item.entry {
            PlannedEntry::Poi(poi) => Some(poi.history_keys()),
            PlannedEntry::Event(_) => None,
        })
        .flatten()
        .collect();
    if !placed_keys.is_empty() {
        store.add(&request.session_key, placed_keys).await;
    }

    items
}

/// Picks what goes into one slot. Events take precedence for every slot
/// type; meal slots otherwise require a restaurant-like candidate, activity
/// slots prefer context-matching or unclassified candidates before falling
/// back to the general pool.
fn fill_slot(
    slot: &TimeSlot,
    working: &[Candidate],
    events: &[Event],
    used: &mut HashSet<String>,
) -> Option<PlannedEntry> {
    if let Some(event) = closest_event(slot.time, events, used) {
        for key in event.history_keys() {
            used.insert(key);
        }
        return Some(PlannedEntry::Event(event.clone()));
    }

    let candidate = match slot.kind {
        SlotKind::Lunch | SlotKind::Dinner => next_unused(working, used, |c| {
            c.matches_keyword("food") || c.matches_keyword("restaurant")
        }),
        SlotKind::Activity => next_unused(working, used, |c| {
            // Unclassified candidates default into whichever sub-pool is
            // being filled
            match time_context::classify(&c.category, c.subcategory.as_deref()) {
                Some(context) => context == slot.context,
                None => true,
            }
        })
        .or_else(|| next_unused(working, used, |_| true)),
    }?;

    for key in candidate.history_keys() {
        used.insert(key);
    }
    Some(PlannedEntry::Poi(candidate.clone()))
}

/// The unused event closest to `slot_time` within the match window.
fn closest_event<'a>(
    slot_time: NaiveTime,
    events: &'a [Event],
    used: &HashSet<String>,
) -> Option<&'a Event> {
    events
        .iter()
        .filter(|e| !e.is_seen(used))
        .filter_map(|e| {
            let start = e.start_time?;
            let distance = (slot_time - start).num_minutes().abs();
            (distance <= EVENT_MATCH_WINDOW_MINUTES).then_some((distance, e))
        })
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, e)| e)
}

fn next_unused<'a>(
    working: &'a [Candidate],
    used: &HashSet<String>,
    predicate: impl Fn(&Candidate) -> bool,
) -> Option<&'a Candidate> {
    working
        .iter()
        .find(|c| !c.is_seen(used) && predicate(c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OpeningHours;
    use chrono::TimeZone;
    use chrono_tz::Europe::Madrid;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;
    use std::collections::HashMap;

    fn open_all_week() -> OpeningHours {
        let mut days = serde_json::Map::new();
        for day in [
            "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
        ] {
            days.insert(
                day.to_string(),
                json!([{"open": "08:00", "close": "23:30"}]),
            );
        }
        OpeningHours::parse(Some(&serde_json::Value::Object(days)))
    }

    fn poi(id: &str, category: &str, rating: f64) -> Candidate {
        Candidate {
            id: Some(id.to_string()),
            name: format!("{id} name"),
            category: category.to_string(),
            subcategory: None,
            rating: Some(rating),
            review_count: 40,
            has_thumbnail: true,
            image_count: 3,
            address: Some("Carrer La Niu 4, Calp".to_string()),
            latitude: Some(38.64),
            longitude: Some(0.04),
            opening_hours: open_all_week(),
            descriptions: HashMap::new(),
            icon: None,
        }
    }

    fn event(id: &str, start: &str) -> Event {
        Event {
            id: Some(id.to_string()),
            name: format!("{id} fiesta"),
            start_time: Some(NaiveTime::parse_from_str(start, "%H:%M").unwrap()),
            address: None,
            description: None,
            icon: None,
        }
    }

    fn noon() -> DateTime<Utc> {
        Madrid
            .with_ymd_and_hms(2026, 7, 15, 12, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn request(
        candidates: Vec<Candidate>,
        events: Vec<Event>,
        duration: ItineraryDuration,
    ) -> BuildRequest {
        BuildRequest {
            candidates,
            events,
            duration,
            include_meals: true,
            session_key: "session-test".to_string(),
            reference: noon(),
            timezone: Madrid,
        }
    }

    fn item_keys(items: &[ItineraryItem]) -> Vec<String> {
        items
            .iter()
            .map(|item| match &item.entry {
                PlannedEntry::Poi(p) => p.id.clone().unwrap(),
                PlannedEntry::Event(e) => e.id.clone().unwrap(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_full_day_with_meals_and_events() {
        // 10 morning-context POIs, 10 restaurants, 2 evening events
        let mut candidates: Vec<Candidate> = (0..10)
            .map(|i| poi(&format!("park-{i}"), "Park", 4.2 + (i as f64) * 0.06))
            .collect();
        candidates.extend(
            (0..10).map(|i| poi(&format!("rest-{i}"), "Restaurant", 4.0 + (i as f64) * 0.09)),
        );
        let events = vec![event("ev-1900", "19:00"), event("ev-2030", "20:30")];

        let store = SessionHistoryStore::default();
        let mut rng = StdRng::seed_from_u64(11);
        let items = build(
            &store,
            request(candidates, events, ItineraryDuration::FullDay),
            &mut rng,
        )
        .await;

        assert_eq!(items.len(), 6);

        // The 19:30 dinner slot is taken by the closest event (19:00)
        let dinner = items
            .iter()
            .find(|i| i.kind == SlotKind::Dinner)
            .expect("dinner slot filled");
        assert_eq!(dinner.time, NaiveTime::parse_from_str("19:30", "%H:%M").unwrap());
        match &dinner.entry {
            PlannedEntry::Event(e) => assert_eq!(e.id.as_deref(), Some("ev-1900")),
            PlannedEntry::Poi(p) => panic!("expected event at dinner, got {:?}", p.id),
        }

        // Lunch comes from the restaurant sub-pool
        let lunch = items
            .iter()
            .find(|i| i.kind == SlotKind::Lunch)
            .expect("lunch slot filled");
        match &lunch.entry {
            PlannedEntry::Poi(p) => assert!(p.id.as_deref().unwrap().starts_with("rest-")),
            PlannedEntry::Event(_) => panic!("expected restaurant at lunch"),
        }

        // No candidate repeats across items
        let keys = item_keys(&items);
        let unique: HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());

        // Every item carries an icon
        for item in &items {
            let icon = match &item.entry {
                PlannedEntry::Poi(p) => &p.icon,
                PlannedEntry::Event(e) => &e.icon,
            };
            assert!(icon.is_some());
        }
    }

    #[tokio::test]
    async fn test_exhausted_pool_omits_slots() {
        let candidates = vec![poi("park-0", "Park", 4.5)];
        let store = SessionHistoryStore::default();
        let mut rng = StdRng::seed_from_u64(2);

        let items = build(
            &store,
            request(candidates, vec![], ItineraryDuration::Morning),
            &mut rng,
        )
        .await;

        // One activity placed; the second activity and lunch are omitted
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_include_meals_false_turns_meal_slots_into_activities() {
        let candidates: Vec<Candidate> =
            (0..12).map(|i| poi(&format!("park-{i}"), "Park", 4.5)).collect();
        let store = SessionHistoryStore::default();
        let mut rng = StdRng::seed_from_u64(4);

        let mut req = request(candidates, vec![], ItineraryDuration::FullDay);
        req.include_meals = false;
        let items = build(&store, req, &mut rng).await;

        assert_eq!(items.len(), 6);
        assert!(items.iter().all(|i| i.kind == SlotKind::Activity));
    }

    #[tokio::test]
    async fn test_placed_candidates_are_recorded_in_history() {
        let candidates: Vec<Candidate> =
            (0..12).map(|i| poi(&format!("park-{i}"), "Park", 4.5)).collect();
        let store = SessionHistoryStore::default();
        let mut rng = StdRng::seed_from_u64(8);

        let items = build(
            &store,
            request(candidates.clone(), vec![], ItineraryDuration::Morning),
            &mut rng,
        )
        .await;
        assert!(!items.is_empty());

        let history = store.get("session-test").await;
        for key in item_keys(&items) {
            assert!(history.contains(&key), "missing history key {key}");
        }
    }

    #[tokio::test]
    async fn test_repeat_requests_vary_across_a_session() {
        let candidates: Vec<Candidate> =
            (0..20).map(|i| poi(&format!("park-{i}"), "Park", 4.5)).collect();
        let store = SessionHistoryStore::default();
        let mut rng = StdRng::seed_from_u64(21);

        let first = build(
            &store,
            request(candidates.clone(), vec![], ItineraryDuration::Morning),
            &mut rng,
        )
        .await;
        let second = build(
            &store,
            request(candidates, vec![], ItineraryDuration::Morning),
            &mut rng,
        )
        .await;

        let first_keys: HashSet<String> = item_keys(&first).into_iter().collect();
        assert!(item_keys(&second).iter().all(|k| !first_keys.contains(k)));
    }

    #[tokio::test]
    async fn test_event_outside_window_is_not_matched() {
        let candidates: Vec<Candidate> =
            (0..12).map(|i| poi(&format!("rest-{i}"), "Restaurant", 4.5)).collect();
        // 14:00 is more than two hours from every evening template slot
        let events = vec![event("ev-1400", "14:00")];
        let store = SessionHistoryStore::default();
        let mut rng = StdRng::seed_from_u64(13);

        let items = build(
            &store,
            request(candidates, events, ItineraryDuration::Evening),
            &mut rng,
        )
        .await;

        assert!(items.iter().all(|i| matches!(i.entry, PlannedEntry::Poi(_))));
    }
}
