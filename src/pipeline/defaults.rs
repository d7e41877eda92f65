use crate::alignment::anchors::align_witnesses;
use crate::alignment::canonical::canonicalize;
use crate::config::SearchPass;
use crate::error::AlignmentError;
use crate::pipeline::traits::{AnchorAligner, Canonicalizer};
use crate::types::{Anchor, CanonicalKeys, Witness};

pub struct MiddleEnglishCanonicalizer;

impl Canonicalizer for MiddleEnglishCanonicalizer {
    fn canonicalize(&self, surface: &str) -> Result<CanonicalKeys, AlignmentError> {
        canonicalize(surface)
    }
}

pub struct ProgressiveAnchorAligner;

impl AnchorAligner for ProgressiveAnchorAligner {
    fn align(
        &self,
        witnesses: &[Witness],
        schedule: &[SearchPass],
    ) -> Result<Vec<Anchor>, AlignmentError> {
        Ok(align_witnesses(witnesses, schedule))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::CollationConfig;
    use crate::types::Word;

    use super::*;

    #[test]
    fn middle_english_canonicalizer_canonicalize() {
        let keys = MiddleEnglishCanonicalizer
            .canonicalize("Þe")
            .expect("canonicalizable");
        assert_eq!(keys, canonicalize("Þe").expect("canonicalizable"));
    }

    #[test]
    fn progressive_anchor_aligner_align() {
        let words = |surfaces: &[&str]| -> Vec<Word> {
            surfaces
                .iter()
                .map(|s| Word::new(s, false).expect("valid word"))
                .collect()
        };
        let witnesses = vec![
            Witness::new("A", words(&["the", "pestilence"])),
            Witness::new("B", words(&["þe", "pestilens"])),
        ];
        let schedule = CollationConfig::default().schedule();
        let anchors = ProgressiveAnchorAligner
            .align(&witnesses, &schedule)
            .expect("alignment");
        assert_eq!(anchors, align_witnesses(&witnesses, &schedule));
        assert_eq!(anchors.len(), 2);
    }
}
