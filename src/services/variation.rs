use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use crate::models::Candidate;

/// Minimum share of a selection that must be absent from session history,
/// as a percentage. Small selections tolerate slightly more repetition.
fn novelty_percent(count: usize) -> usize {
    match count {
        0..=4 => 80,
        5..=6 => 85,
        _ => 90,
    }
}

/// Selects `count` candidates from `pool`, guaranteeing a minimum fraction
/// of previously-unseen items relative to `history`.
///
/// The caller is responsible for writing the returned items' keys back into
/// the session history store after selection completes.
pub fn select<R: Rng>(
    pool: &[Candidate],
    history: &HashSet<String>,
    count: usize,
    rng: &mut R,
) -> Vec<Candidate> {
    // Undersized pool: return everything, no padding or duplication. An
    // exactly-sized pool still goes through the partition so the seen cap
    // applies.
    if pool.len() < count {
        let mut all: Vec<Candidate> = pool.to_vec();
        all.shuffle(rng);
        return all;
    }

    let percent = novelty_percent(count);
    // Integer ceil keeps the fraction exact; the seen cap is the complement
    let target_new = (count * percent + 99) / 100;
    let seen_cap = count - target_new;

    // 1. Partition by the dual id/name membership test
    let (mut unseen, mut seen): (Vec<&Candidate>, Vec<&Candidate>) =
        pool.iter().partition(|c| !c.is_seen(history));

    // 2. Shuffle both partitions to avoid positional bias
    unseen.shuffle(rng);
    seen.shuffle(rng);

    // 3. Fill from unseen first; only when unseen is exhausted, backfill
    //    from seen, capped so repetition stays bounded even when novel
    //    supply runs low
    let mut result: Vec<Candidate> = unseen.iter().take(count).map(|c| (*c).clone()).collect();
    if result.len() < count {
        let missing = count - result.len();
        result.extend(
            seen.iter()
                .take(missing.min(seen_cap))
                .map(|c| (*c).clone()),
        );
    }

    tracing::debug!(
        pool = pool.len(),
        requested = count,
        selected = result.len(),
        novelty_target = target_new,
        "Variation selection"
    );

    // 4. Shuffle the combined result so new items are not always first
    result.shuffle(rng);
    result
}
