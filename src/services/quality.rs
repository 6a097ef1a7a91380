use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::models::Candidate;
use crate::services::hours::{self, HoursStatus};

/// Minimum rating under strict filtering.
const STRICT_RATING_THRESHOLD: f64 = 4.0;
/// Lowered rating bar when the strict pool is too small.
const RELAXED_RATING_THRESHOLD: f64 = 3.5;
/// Below this many strict survivors, the gate reruns in relaxed mode.
const MIN_VIABLE_CANDIDATES: usize = 6;
/// Shorter address strings carry no real location signal.
const MIN_ADDRESS_LEN: usize = 8;

/// Which quality bar to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    Strict,
    Relaxed,
}

/// A reason a candidate failed the gate. Codes are accumulated, not
/// short-circuited, so callers can log every simultaneous failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityIssue {
    LowRating,
    NoReviews,
    NoImages,
    NoLocation,
    MissingOpeningHours,
    PermanentlyClosed,
    ClosedNow,
}

/// Outcome of assessing one candidate.
#[derive(Debug, Clone)]
pub struct QualityReport {
    pub passes: bool,
    pub issues: Vec<QualityIssue>,
}

/// Assesses one candidate against the gate.
///
/// Relaxed mode lowers the rating bar (and accepts unrated or zero-rated
/// candidates) and waives every other strict criterion except closure:
/// a permanently- or currently-closed candidate never passes in any mode.
pub fn assess(candidate: &Candidate, status: &HoursStatus, mode: GateMode) -> QualityReport {
    let mut issues = Vec::new();

    match mode {
        GateMode::Strict => {
            if candidate
                .rating
                .is_some_and(|r| r < STRICT_RATING_THRESHOLD)
            {
                issues.push(QualityIssue::LowRating);
            }
            if candidate.review_count == 0 {
                issues.push(QualityIssue::NoReviews);
            }
            if !candidate.has_thumbnail && candidate.image_count == 0 {
                issues.push(QualityIssue::NoImages);
            }
            let has_address = candidate
                .address
                .as_deref()
                .is_some_and(|a| a.trim().len() >= MIN_ADDRESS_LEN);
            if !has_address && !candidate.has_gps() {
                issues.push(QualityIssue::NoLocation);
            }
            if !candidate.opening_hours.is_known() {
                issues.push(QualityIssue::MissingOpeningHours);
            }
        }
        GateMode::Relaxed => {
            if candidate
                .rating
                .is_some_and(|r| r != 0.0 && r < RELAXED_RATING_THRESHOLD)
            {
                issues.push(QualityIssue::LowRating);
            }
        }
    }

    // Closure exclusion is never relaxed
    if status.permanently_closed {
        issues.push(QualityIssue::PermanentlyClosed);
    }
    if status.closed_now {
        issues.push(QualityIssue::ClosedNow);
    }

    QualityReport {
        passes: issues.is_empty(),
        issues,
    }
}

/// Runs the full gate over a pool: opening-hours evaluation, then strict
/// filtering, then a relaxed rerun when fewer than the minimum viable
/// number of candidates survive. Never errors; an empty result is a valid
/// outcome the orchestration layers handle.
pub fn filter_pool(pool: &[Candidate], reference: DateTime<Utc>, timezone: Tz) -> Vec<Candidate> {
    let assessed: Vec<(&Candidate, HoursStatus)> = pool
        .iter()
        .map(|c| (c, hours::evaluate(&c.opening_hours, reference, timezone)))
        .collect();

    let strict: Vec<Candidate> = assessed
        .iter()
        .filter(|(c, status)| assess(c, status, GateMode::Strict).passes)
        .map(|(c, _)| (*c).clone())
        .collect();

    if strict.len() >= MIN_VIABLE_CANDIDATES {
        tracing::debug!(
            pool = pool.len(),
            passed = strict.len(),
            "Strict quality gate"
        );
        return strict;
    }

    let relaxed: Vec<Candidate> = assessed
        .iter()
        .filter(|(c, status)| assess(c, status, GateMode::Relaxed).passes)
        .map(|(c, _)| (*c).clone())
        .collect();

    tracing::info!(
        pool = pool.len(),
        strict = strict.len(),
        relaxed = relaxed.len(),
        "Strict pool too small, relaxed quality gate applied"
    );

    relaxed
}
