use std::collections::HashMap;

/// Per-witness keys for one tier.
pub(super) type TierKeys<'a> = Vec<Vec<&'a str>>;

/// Concatenate keys starting at `start` until the string spans at least
/// `limit` characters. `None` when the witness runs out of words first.
pub(super) fn build_candidate(keys: &[&str], start: usize, limit: usize) -> Option<String> {
    let mut candidate = String::new();
    let mut char_len = 0usize;
    for key in keys.get(start..)? {
        candidate.push_str(key);
        char_len += key.chars().count();
        if char_len >= limit {
            return Some(candidate);
        }
    }
    None
}

/// Offsets at which each witness first produced a given candidate string.
#[derive(Debug)]
struct PartialMatch {
    offsets: Vec<Option<usize>>,
    filled: usize,
}

/// Incremental joint-match table: candidate string to the set of witnesses
/// that have produced it so far, with the offset each one produced it at.
#[derive(Debug)]
pub(super) struct JointMatchTable {
    witness_count: usize,
    seen: HashMap<String, PartialMatch>,
}

impl JointMatchTable {
    pub(super) fn new(witness_count: usize) -> Self {
        Self {
            witness_count,
            seen: HashMap::new(),
        }
    }

    /// Record that `witness` produced `candidate` at `offset`. Returns the
    /// per-witness offsets the moment every witness has produced it.
    ///
    /// Only the first offset per witness counts; later repeats are ignored.
    pub(super) fn record(
        &mut self,
        candidate: String,
        witness: usize,
        offset: usize,
    ) -> Option<Vec<usize>> {
        let witness_count = self.witness_count;
        let entry = self.seen.entry(candidate).or_insert_with(|| PartialMatch {
            offsets: vec![None; witness_count],
            filled: 0,
        });
        if entry.offsets[witness].is_some() {
            return None;
        }
        entry.offsets[witness] = Some(offset);
        entry.filled += 1;
        if entry.filled < witness_count {
            return None;
        }
        entry.offsets.iter().copied().collect()
    }
}

/// Scan the interval `[lower, upper)` offset by offset and return the word
/// indices of the first candidate every witness agrees on.
pub(super) fn find_next_anchor(
    keys: &TierKeys<'_>,
    lower: &[usize],
    upper: &[usize],
    limit: usize,
) -> Option<Vec<usize>> {
    let mut table = JointMatchTable::new(keys.len());
    let mut offset = 0usize;
    loop {
        let mut progress = false;
        for (w, witness_keys) in keys.iter().enumerate() {
            let start = lower[w] + offset;
            if start >= upper[w] {
                continue;
            }
            let Some(candidate) = build_candidate(witness_keys, start, limit) else {
                continue;
            };
            progress = true;
            if let Some(offsets) = table.record(candidate, w, offset) {
                return Some(
                    offsets
                        .iter()
                        .zip(lower)
                        .map(|(&o, &lo)| lo + o)
                        .collect(),
                );
            }
        }
        if !progress {
            return None;
        }
        offset += 1;
    }
}
