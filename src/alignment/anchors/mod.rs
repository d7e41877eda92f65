use crate::config::SearchPass;
use crate::types::{Anchor, KeyTier, Witness};

mod interval;
mod joint_match;

/// Progressive anchor alignment of one chunk's witnesses.
///
/// Starting from the two sentinels, every pass of `schedule` refines each
/// gap between consecutive anchors, looking for a candidate string of at
/// least `pass.limit` key characters that all witnesses produce. Long,
/// unambiguous matches are found first; shorter and weak-key matches only
/// fill what remains. The returned anchors exclude the sentinels and are
/// strictly increasing in every witness.
pub fn align_witnesses(witnesses: &[Witness], schedule: &[SearchPass]) -> Vec<Anchor> {
    if witnesses.is_empty() {
        return Vec::new();
    }
    let lengths: Vec<usize> = witnesses.iter().map(Witness::len).collect();
    let strong = tier_keys(witnesses, KeyTier::Strong);
    let weak = tier_keys(witnesses, KeyTier::Weak);

    let mut anchors = Vec::new();
    for &pass in schedule {
        let keys = match pass.tier {
            KeyTier::Strong => &strong,
            KeyTier::Weak => &weak,
        };
        anchors = interval::refine_pass(keys, anchors, &lengths, pass);
        tracing::debug!(
            tier = pass.tier.as_str(),
            limit = pass.limit,
            anchors = anchors.len(),
            "anchors: pass complete"
        );
    }
    anchors
}

fn tier_keys(witnesses: &[Witness], tier: KeyTier) -> joint_match::TierKeys<'_> {
    witnesses.iter().map(|w| w.keys(tier)).collect()
}
