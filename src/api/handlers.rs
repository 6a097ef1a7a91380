use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{AppError, AppResult};
use crate::models::{Candidate, Event, RawCandidate, RawEvent};
use crate::services::daily_tip::{self, DailyTipOutcome, TipItem, TipRequest};
use crate::services::itinerary::{self, BuildRequest, ItineraryDuration, PlannedEntry, SlotKind};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryRequest {
    pub candidates: Vec<RawCandidate>,
    #[serde(default)]
    pub events: Vec<RawEvent>,
    pub duration: ItineraryDuration,
    #[serde(default = "default_include_meals")]
    pub include_meals: bool,
    pub session_id: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
}

fn default_include_meals() -> bool {
    true
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryResponse {
    pub items: Vec<ItineraryItemResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryItemResponse {
    pub time: String,
    pub slot: SlotKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub item: PlaceResponse,
}

/// Enough of the original candidate/event fields for downstream
/// natural-language generation and client rendering.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceResponse {
    pub kind: PlaceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceKind {
    Poi,
    Event,
}

impl PlaceResponse {
    fn from_poi(poi: &Candidate, language: &str) -> Self {
        Self {
            kind: PlaceKind::Poi,
            id: poi.id.clone(),
            name: poi.name.clone(),
            category: Some(poi.category.clone()).filter(|c| !c.is_empty()),
            subcategory: poi.subcategory.clone(),
            address: poi.address.clone(),
            latitude: poi.latitude,
            longitude: poi.longitude,
            rating: poi.rating,
            icon: poi.icon.clone(),
            description: poi.description_for(language).map(String::from),
            start_time: None,
        }
    }

    fn from_event(event: &Event) -> Self {
        Self {
            kind: PlaceKind::Event,
            id: event.id.clone(),
            name: event.name.clone(),
            category: None,
            subcategory: None,
            address: event.address.clone(),
            latitude: None,
            longitude: None,
            rating: None,
            icon: event.icon.clone(),
            description: event.description.clone(),
            start_time: event.start_time.map(|t| t.format("%H:%M").to_string()),
        }
    }

    fn from_entry(entry: &PlannedEntry, language: &str) -> Self {
        match entry {
            PlannedEntry::Poi(poi) => Self::from_poi(poi, language),
            PlannedEntry::Event(event) => Self::from_event(event),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTipRequest {
    pub pois: Vec<RawCandidate>,
    #[serde(default)]
    pub events: Vec<RawEvent>,
    #[serde(default)]
    pub exclude_ids: Option<ExcludeIds>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Already-shown keys arrive either as a list or as the legacy
/// comma-separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ExcludeIds {
    List(Vec<String>),
    Csv(String),
}

impl ExcludeIds {
    fn into_set(self) -> HashSet<String> {
        let keys: Vec<String> = match self {
            ExcludeIds::List(keys) => keys,
            ExcludeIds::Csv(csv) => csv.split(',').map(String::from).collect(),
        };
        keys.into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTipResponse {
    pub status: TipStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<PlaceResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TipStatus {
    Ok,
    Exhausted,
}

// Handlers

/// Builds a time-sliced day plan from the supplied candidate and event pools
pub async fn build_itinerary(
    State(state): State<AppState>,
    Json(request): Json<ItineraryRequest>,
) -> AppResult<Json<ItineraryResponse>> {
    if request.session_id.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "session_id must not be empty".to_string(),
        ));
    }

    let language = request.language.as_deref().unwrap_or("en").to_string();

    let mut candidates: Vec<Candidate> = request
        .candidates
        .into_iter()
        .map(Candidate::from)
        .collect();
    if !request.interests.is_empty() {
        candidates.retain(|c| request.interests.iter().any(|i| c.matches_keyword(i)));
    }
    let events: Vec<Event> = request.events.into_iter().map(Event::from).collect();

    let build_request = BuildRequest {
        candidates,
        events,
        duration: request.duration,
        include_meals: request.include_meals,
        session_key: request.session_id,
        reference: Utc::now(),
        timezone: state.config.destination_timezone,
    };

    let mut rng = state.rng();
    let items = itinerary::build(&state.history, build_request, &mut rng).await;

    let items = items
        .iter()
        .map(|item| ItineraryItemResponse {
            time: item.time.format("%H:%M").to_string(),
            slot: item.kind,
            label: item.label.clone(),
            item: PlaceResponse::from_entry(&item.entry, &language),
        })
        .collect();

    Ok(Json(ItineraryResponse { items }))
}

/// Picks the single rotating tip of the day
pub async fn daily_tip(
    State(state): State<AppState>,
    Json(request): Json<DailyTipRequest>,
) -> AppResult<Json<DailyTipResponse>> {
    let language = request.language.as_deref().unwrap_or("en").to_string();
    let excluded_keys = request
        .exclude_ids
        .map(ExcludeIds::into_set)
        .unwrap_or_default();

    let tip_request = TipRequest {
        pois: request.pois.into_iter().map(Candidate::from).collect(),
        events: request.events.into_iter().map(Event::from).collect(),
        excluded_keys,
        reference: Utc::now(),
        timezone: state.config.destination_timezone,
    };

    let mut rng = state.rng();
    let outcome = daily_tip::select_daily_tip(&tip_request, &state.config.tip_categories(), &mut rng);

    let response = match outcome {
        DailyTipOutcome::Tip { item, category } => {
            let place = match &item {
                TipItem::Poi(poi) => PlaceResponse::from_poi(poi, &language),
                TipItem::Event(event) => PlaceResponse::from_event(event),
            };
            DailyTipResponse {
                status: TipStatus::Ok,
                category: Some(category),
                item: Some(place),
            }
        }
        // Exhaustion is a normal outcome, not a server error
        DailyTipOutcome::Exhausted => DailyTipResponse {
            status: TipStatus::Exhausted,
            category: None,
            item: None,
        },
    };

    Ok(Json(response))
}
