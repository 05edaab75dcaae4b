//! Proposal selection: spread ranked candidates across days, cap same-day
//! repeats, and truncate to the proposal budget.
//!
//! Recurring requests read better when the options land on distinct days, so
//! the selector first takes the best candidate of each day, then tops up from
//! the remaining pool by rank. At most one major block per day is kept unless
//! `count` exceeds the number of days that produced candidates.

use std::collections::BTreeSet;

use crate::search::{CandidateSlot, SlotRequest};

/// How many proposals are offered per requested slot.
pub const PROPOSALS_PER_NEED: usize = 2;

/// Reduce ranked candidates to the final proposal list, best score first.
///
/// `ranked` must already be sorted best-first (see [`crate::score::rank`]).
pub fn select(ranked: Vec<CandidateSlot>, request: &SlotRequest) -> Vec<CandidateSlot> {
    let budget = request.count as usize * PROPOSALS_PER_NEED;
    let distinct_days: BTreeSet<u32> = ranked.iter().map(|c| c.day_index).collect();
    // One block per day, unless the request needs more slots than there are
    // days to put them on.
    let per_day_cap = if (request.count as usize) > distinct_days.len() {
        usize::MAX
    } else {
        1
    };

    let mut taken_flags = vec![false; ranked.len()];
    let mut selected: Vec<CandidateSlot> = Vec::with_capacity(budget);

    // First pass: the best candidate from each day, in rank order.
    let mut seen_days = BTreeSet::new();
    for (i, candidate) in ranked.iter().enumerate() {
        if selected.len() >= budget {
            break;
        }
        if seen_days.insert(candidate.day_index) {
            taken_flags[i] = true;
            selected.push(candidate.clone());
        }
    }

    // Top up with remaining candidates by rank, respecting the per-day cap.
    if selected.len() < budget {
        for (i, candidate) in ranked.iter().enumerate() {
            if selected.len() >= budget {
                break;
            }
            if taken_flags[i] {
                continue;
            }
            let on_day = selected
                .iter()
                .filter(|s| s.day_index == candidate.day_index)
                .count();
            if on_day >= per_day_cap {
                continue;
            }
            taken_flags[i] = true;
            selected.push(candidate.clone());
        }
    }

    // Present best-first regardless of which pass admitted the slot.
    selected.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.start.cmp(&b.start))
    });
    selected.truncate(budget);
    selected
}
