#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::alignment::report;
use crate::config::{CollationConfig, SearchPass};
use crate::corpus::{ChunkEntry, ChunkIndex, ChunkSelection, CorpusInput, WordInput};
use crate::error::AlignmentError;
use crate::pipeline::traits::{AnchorAligner, Canonicalizer};
use crate::types::{ChunkAlignment, ChunkCollation, Collation, Witness, Word};

pub struct Collator {
    config: CollationConfig,
    schedule: Vec<SearchPass>,
    canonicalizer: Box<dyn Canonicalizer>,
    anchor_aligner: Box<dyn AnchorAligner>,
}

pub(crate) struct CollatorParts {
    pub config: CollationConfig,
    pub schedule: Vec<SearchPass>,
    pub canonicalizer: Box<dyn Canonicalizer>,
    pub anchor_aligner: Box<dyn AnchorAligner>,
}

/// How `collate_with` treats chunks that violate an invariant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InvalidChunkPolicy {
    #[default]
    Fail,
    /// Log the violation and leave the chunk out of the collation.
    Skip,
}

impl Collator {
    pub(crate) fn from_parts(parts: CollatorParts) -> Self {
        Self {
            config: parts.config,
            schedule: parts.schedule,
            canonicalizer: parts.canonicalizer,
            anchor_aligner: parts.anchor_aligner,
        }
    }

    pub fn config(&self) -> &CollationConfig {
        &self.config
    }

    pub fn schedule(&self) -> &[SearchPass] {
        &self.schedule
    }

    /// Canonicalizes every word of one witness's copy of a chunk.
    pub fn prepare_witness(
        &self,
        label: &str,
        words: &[WordInput],
    ) -> Result<Witness, AlignmentError> {
        let words = words
            .iter()
            .map(|input| {
                let keys = self.canonicalizer.canonicalize(&input.surface)?;
                Word::from_parts(&input.surface, input.abbreviated, keys)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Witness::new(label, words))
    }

    pub fn align_chunk(&self, witnesses: &[Witness]) -> Result<ChunkAlignment, AlignmentError> {
        let anchors = self.anchor_aligner.align(witnesses, &self.schedule)?;
        let alignment = ChunkAlignment {
            anchors,
            lengths: witnesses.iter().map(Witness::len).collect(),
        };
        report::verify_alignment(&alignment)?;
        Ok(alignment)
    }

    /// Aligns one chunk over the witnesses that carry it. `labels` are the
    /// labels of every corpus witness, in corpus order.
    pub fn collate_chunk(
        &self,
        entry: &ChunkEntry<'_>,
        labels: &[&str],
    ) -> Result<ChunkCollation, AlignmentError> {
        let witnesses = entry
            .members
            .iter()
            .map(|member| {
                let label = labels.get(member.witness).ok_or_else(|| {
                    AlignmentError::invariant(
                        "collate_chunk",
                        format!("chunk {:?} refers to unknown witness {}", entry.key, member.witness),
                    )
                })?;
                self.prepare_witness(label, &member.text.words)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let presence = entry.presence(labels.len());
        if witnesses.len() < labels.len() {
            let absent: Vec<&str> = labels
                .iter()
                .zip(&presence)
                .filter(|(_, slot)| slot.is_none())
                .map(|(label, _)| *label)
                .collect();
            tracing::warn!(
                chunk = entry.key,
                name = entry.name,
                absent = ?absent,
                "witnesses lack chunk"
            );
        }

        let alignment = self.align_chunk(&witnesses)?;
        tracing::debug!(
            chunk = entry.key,
            witnesses = witnesses.len(),
            anchors = alignment.anchors.len(),
            gap_words = alignment.gap_word_count(),
            "chunk aligned"
        );

        Ok(ChunkCollation {
            key: entry.key.to_string(),
            name: entry.name.to_string(),
            witnesses,
            presence,
            alignment,
        })
    }

    /// Aligns every chunk of the corpus and tallies abbreviation patterns.
    pub fn collate(&self, corpus: &CorpusInput) -> Result<Collation, AlignmentError> {
        self.collate_with(
            corpus,
            &ChunkSelection::default(),
            InvalidChunkPolicy::Fail,
            |_| {},
        )
    }

    /// Like `collate`, restricted to `selection`. `on_chunk` runs once per
    /// selected chunk as it finishes, possibly from several threads.
    pub fn collate_with<F>(
        &self,
        corpus: &CorpusInput,
        selection: &ChunkSelection,
        policy: InvalidChunkPolicy,
        on_chunk: F,
    ) -> Result<Collation, AlignmentError>
    where
        F: Fn(&str) + Sync,
    {
        let index = ChunkIndex::build(corpus)?;
        let labels = index.labels();
        let selected = selection.select(index.chunks())?;
        tracing::info!(
            chunks = selected.len(),
            witnesses = labels.len(),
            "collating corpus"
        );

        let run = |entry: &&ChunkEntry<'_>| {
            let result = self.collate_chunk(entry, labels);
            on_chunk(entry.key);
            result
        };
        #[cfg(feature = "parallel")]
        let results: Vec<Result<ChunkCollation, AlignmentError>> =
            selected.par_iter().map(run).collect();
        #[cfg(not(feature = "parallel"))]
        let results: Vec<Result<ChunkCollation, AlignmentError>> =
            selected.iter().map(run).collect();

        let mut chunks = Vec::with_capacity(results.len());
        for (entry, result) in selected.iter().zip(results) {
            match result {
                Ok(chunk) => chunks.push(chunk),
                Err(err) if policy == InvalidChunkPolicy::Skip && err.is_invariant_violation() => {
                    tracing::warn!(chunk = entry.key, error = %err, "skipping invalid chunk");
                }
                Err(err) => return Err(err),
            }
        }

        let abbreviation_tally = report::tally_abbreviations(&chunks)?;
        tracing::info!(
            chunks = chunks.len(),
            patterns = abbreviation_tally.len(),
            "collation complete"
        );
        Ok(Collation {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            chunks,
            abbreviation_tally,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::corpus::{ChunkText, WitnessText};
    use crate::pipeline::builder::CollatorBuilder;

    use super::*;

    fn chunk(key: &str, name: &str, words: &[(&str, bool)]) -> ChunkText {
        ChunkText {
            key: key.to_string(),
            name: name.to_string(),
            words: words
                .iter()
                .map(|(surface, abbreviated)| WordInput {
                    surface: surface.to_string(),
                    abbreviated: *abbreviated,
                })
                .collect(),
        }
    }

    fn corpus() -> CorpusInput {
        CorpusInput {
            witnesses: vec![
                WitnessText {
                    label: "A".to_string(),
                    chunks: vec![
                        chunk("211", "English 1", &[("þe", true), ("pestilence", false)]),
                        chunk("100", "Latin", &[("in", false), ("nomine", false)]),
                    ],
                },
                WitnessText {
                    label: "B".to_string(),
                    chunks: vec![chunk("211", "English 1", &[("the", false), ("pestilens", false)])],
                },
            ],
        }
    }

    fn collator() -> Collator {
        CollatorBuilder::default().build().expect("default collator")
    }

    #[test]
    fn collate_orders_chunks_by_key_and_tallies_patterns() {
        let collation = collator().collate(&corpus()).expect("collation");
        assert_eq!(collation.labels, ["A", "B"]);
        let keys: Vec<&str> = collation.chunks.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, ["100", "211"]);

        let latin = &collation.chunks[0];
        assert_eq!(latin.presence, vec![Some(0), None]);
        assert_eq!(latin.alignment.anchors.len(), 2);

        let english = &collation.chunks[1];
        assert_eq!(english.alignment.anchors.len(), 2);

        assert_eq!(collation.abbreviation_tally.get("0N"), Some(&2));
        assert_eq!(collation.abbreviation_tally.get("10"), Some(&1));
        assert_eq!(collation.abbreviation_tally.get("00"), Some(&1));
    }

    #[test]
    fn collate_fails_fast_on_invalid_word() {
        let mut corpus = corpus();
        corpus.witnesses[1].chunks[0].words[0].surface = "?".to_string();
        let err = collator().collate(&corpus).unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn skip_policy_drops_only_the_invalid_chunk() {
        let mut corpus = corpus();
        corpus.witnesses[1].chunks[0].words[0].surface = "?".to_string();
        let collation = collator()
            .collate_with(
                &corpus,
                &ChunkSelection::default(),
                InvalidChunkPolicy::Skip,
                |_| {},
            )
            .expect("collation");
        assert_eq!(collation.chunks.len(), 1);
        assert_eq!(collation.chunks[0].key, "100");
    }

    #[test]
    fn collate_with_reports_every_selected_chunk() {
        let seen = AtomicUsize::new(0);
        let selection = ChunkSelection {
            keys: vec!["211".to_string()],
            ..ChunkSelection::default()
        };
        let collation = collator()
            .collate_with(&corpus(), &selection, InvalidChunkPolicy::Fail, |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .expect("collation");
        assert_eq!(collation.chunks.len(), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn prepare_witness_rejects_empty_surface() {
        let words = [WordInput {
            surface: "  ".to_string(),
            abbreviated: false,
        }];
        assert!(collator().prepare_witness("A", &words).is_err());
    }

    #[test]
    fn align_chunk_of_no_witnesses_is_empty() {
        let alignment = collator().align_chunk(&[]).expect("alignment");
        assert!(alignment.anchors.is_empty());
        assert_eq!(alignment.word_count(), 0);
    }
}
