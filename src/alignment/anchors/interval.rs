use std::collections::VecDeque;

use super::joint_match::{find_next_anchor, TierKeys};
use crate::config::SearchPass;
use crate::types::Anchor;

/// Open search interval between two confirmed anchors: per witness, the
/// first free index (inclusive) and the next anchor's index (exclusive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Interval {
    pub(super) lower: Vec<usize>,
    pub(super) upper: Vec<usize>,
}

impl Interval {
    /// What is left of this interval once `anchor` has been placed inside it.
    fn after(&self, anchor: &Anchor) -> Interval {
        Interval {
            lower: anchor.indices.iter().map(|&i| i + 1).collect(),
            upper: self.upper.clone(),
        }
    }
}

/// Intervals delimited by consecutive anchors, including the sentinel
/// before the first word and after the last word of every witness.
pub(super) fn intervals_between(anchors: &[Anchor], lengths: &[usize]) -> VecDeque<Interval> {
    let mut intervals = VecDeque::with_capacity(anchors.len() + 1);
    let mut lower = vec![0; lengths.len()];
    for anchor in anchors {
        intervals.push_back(Interval {
            lower,
            upper: anchor.indices.clone(),
        });
        lower = anchor.indices.iter().map(|&i| i + 1).collect();
    }
    intervals.push_back(Interval {
        lower,
        upper: lengths.to_vec(),
    });
    intervals
}

/// Run one pass over every gap of the current anchor list.
///
/// Each queued interval yields at most one new anchor per step; the part of
/// the interval after that anchor goes back to the front of the queue. An
/// interval that yields nothing is closed by the existing anchor that
/// bounded it. Existing anchors are never moved or dropped.
pub(super) fn refine_pass(
    keys: &TierKeys<'_>,
    anchors: Vec<Anchor>,
    lengths: &[usize],
    pass: SearchPass,
) -> Vec<Anchor> {
    let mut queue = intervals_between(&anchors, lengths);
    let mut existing = anchors.into_iter();
    let mut refined = Vec::with_capacity(queue.len());

    while let Some(interval) = queue.pop_front() {
        match find_next_anchor(keys, &interval.lower, &interval.upper, pass.limit) {
            Some(indices) => {
                let anchor = Anchor {
                    indices,
                    match_length: pass.limit,
                    tier: pass.tier,
                };
                queue.push_front(interval.after(&anchor));
                refined.push(anchor);
            }
            None => refined.extend(existing.next()),
        }
    }
    refined
}
