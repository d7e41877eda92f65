use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::alignment::layout::{self, TableRow};
use crate::error::AlignmentError;

/// Sentinel weak key for words whose weak reduction is empty.
pub const EMPTY_WEAK_KEY: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyTier {
    Strong,
    Weak,
}

impl KeyTier {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyTier::Strong => "strong",
            KeyTier::Weak => "weak",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalKeys {
    pub strong: String,
    pub weak: String,
}

impl CanonicalKeys {
    pub fn new(strong: impl Into<String>, weak: impl Into<String>) -> Self {
        Self {
            strong: strong.into(),
            weak: weak.into(),
        }
    }

    pub fn get(&self, tier: KeyTier) -> &str {
        match tier {
            KeyTier::Strong => &self.strong,
            KeyTier::Weak => &self.weak,
        }
    }
}

/// One transcribed token of one witness.
///
/// Keys are fixed at construction; there is no way to mutate a word after
/// it has been built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    surface: String,
    abbreviated: bool,
    keys: CanonicalKeys,
}

impl Word {
    /// Builds a word from its surface form using the default canonicalizer.
    pub fn new(surface: &str, abbreviated: bool) -> Result<Self, AlignmentError> {
        let keys = crate::alignment::canonical::canonicalize(surface)?;
        Self::from_parts(surface, abbreviated, keys)
    }

    /// Builds a word from keys computed elsewhere.
    ///
    /// The surface form is whitespace-collapsed. An empty surface form or an
    /// empty strong key is rejected; an empty weak key becomes `"*"`.
    pub fn from_parts(
        surface: &str,
        abbreviated: bool,
        mut keys: CanonicalKeys,
    ) -> Result<Self, AlignmentError> {
        let surface = collapse_whitespace(surface);
        if surface.is_empty() {
            return Err(AlignmentError::invariant("word", "empty surface form"));
        }
        if keys.strong.is_empty() {
            return Err(AlignmentError::invariant(
                "word",
                format!("strong key of {surface:?} is empty"),
            ));
        }
        if keys.weak.is_empty() {
            keys.weak = EMPTY_WEAK_KEY.to_string();
        }
        Ok(Self {
            surface,
            abbreviated,
            keys,
        })
    }

    pub fn surface(&self) -> &str {
        &self.surface
    }

    pub fn is_abbreviated(&self) -> bool {
        self.abbreviated
    }

    pub fn strong_key(&self) -> &str {
        &self.keys.strong
    }

    pub fn weak_key(&self) -> &str {
        &self.keys.weak
    }

    pub fn key(&self, tier: KeyTier) -> &str {
        self.keys.get(tier)
    }

    pub fn keys(&self) -> &CanonicalKeys {
        &self.keys
    }
}

/// One manuscript's word stream for a single structural chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Witness {
    pub label: String,
    pub words: Vec<Word>,
}

impl Witness {
    pub fn new(label: impl Into<String>, words: Vec<Word>) -> Self {
        Self {
            label: label.into(),
            words,
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn keys(&self, tier: KeyTier) -> Vec<&str> {
        self.words.iter().map(|w| w.key(tier)).collect()
    }
}

/// A cross-witness word correspondence: one word index per witness, all
/// pointing at the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anchor {
    pub indices: Vec<usize>,
    /// Minimum key-string length the match had to reach.
    pub match_length: usize,
    pub tier: KeyTier,
}

impl Anchor {
    pub fn is_weak(&self) -> bool {
        self.tier == KeyTier::Weak
    }
}

/// Half-open span `[start, end)` of unmatched word indices in one witness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GapSpan {
    pub witness: usize,
    pub start: usize,
    pub end: usize,
}

impl GapSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Alignment of one structural chunk: the interior anchors (sentinels
/// already removed) and the word count of every aligned witness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkAlignment {
    pub anchors: Vec<Anchor>,
    pub lengths: Vec<usize>,
}

impl ChunkAlignment {
    pub fn gaps(&self) -> Vec<GapSpan> {
        layout::gap_spans(&self.anchors, &self.lengths)
    }

    pub fn rows(&self) -> Vec<TableRow> {
        layout::table_rows(&self.anchors, &self.lengths)
    }

    pub fn gap_word_count(&self) -> usize {
        self.gaps().iter().map(GapSpan::len).sum()
    }

    pub fn word_count(&self) -> usize {
        self.lengths.iter().sum()
    }
}

/// One chunk after alignment, with the witnesses it was aligned over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkCollation {
    pub key: String,
    pub name: String,
    /// Witnesses carrying this chunk, in corpus order.
    pub witnesses: Vec<Witness>,
    /// For every corpus witness, its position in `witnesses`, or `None`
    /// when the witness lacks this chunk.
    pub presence: Vec<Option<usize>>,
    pub alignment: ChunkAlignment,
}

impl ChunkCollation {
    pub fn absent_labels<'a>(&self, corpus_labels: &'a [String]) -> Vec<&'a str> {
        corpus_labels
            .iter()
            .zip(&self.presence)
            .filter(|(_, slot)| slot.is_none())
            .map(|(label, _)| label.as_str())
            .collect()
    }
}

/// Every chunk of a corpus plus the corpus-wide abbreviation tally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collation {
    pub labels: Vec<String>,
    pub chunks: Vec<ChunkCollation>,
    /// Abbreviation pattern (one of `1`, `0`, `N` per corpus witness) to
    /// the number of anchors showing it.
    pub abbreviation_tally: BTreeMap<String, u64>,
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_parts_collapses_surface_whitespace() {
        let word = Word::from_parts("  wiþ \n oute ", false, CanonicalKeys::new("uitout", "ott"))
            .expect("valid word");
        assert_eq!(word.surface(), "wiþ oute");
    }

    #[test]
    fn from_parts_rejects_empty_surface() {
        let err = Word::from_parts("   ", false, CanonicalKeys::new("a", "a")).unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn from_parts_rejects_empty_strong_key() {
        let err = Word::from_parts("?", false, CanonicalKeys::new("", "")).unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn from_parts_maps_empty_weak_key_to_sentinel() {
        let word = Word::from_parts("i", true, CanonicalKeys::new("i", "")).expect("valid word");
        assert_eq!(word.weak_key(), EMPTY_WEAK_KEY);
        assert!(word.is_abbreviated());
    }

    #[test]
    fn new_computes_both_keys() {
        let word = Word::new("Þe", false).expect("valid word");
        assert_eq!(word.strong_key(), "ti");
        assert_eq!(word.weak_key(), "t");
        assert_eq!(word.key(KeyTier::Strong), "ti");
        assert_eq!(word.key(KeyTier::Weak), "t");
    }

    #[test]
    fn gap_span_len() {
        let span = GapSpan {
            witness: 0,
            start: 2,
            end: 5,
        };
        assert_eq!(span.len(), 3);
        assert!(!span.is_empty());
    }
}
