use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AlignmentError;

/// Pre-tokenized word as delivered by the document parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordInput {
    pub surface: String,
    #[serde(default)]
    pub abbreviated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkText {
    /// Sort key shared by every witness's copy of this chunk.
    pub key: String,
    /// Display name, e.g. "English 3".
    pub name: String,
    pub words: Vec<WordInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessText {
    pub label: String,
    pub chunks: Vec<ChunkText>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusInput {
    pub witnesses: Vec<WitnessText>,
}

impl CorpusInput {
    pub fn load(path: &Path) -> Result<Self, AlignmentError> {
        let data =
            std::fs::read_to_string(path).map_err(|e| AlignmentError::io("read corpus", e))?;
        serde_json::from_str(&data).map_err(|e| AlignmentError::json("parse corpus", e))
    }

    pub fn labels(&self) -> Vec<&str> {
        self.witnesses.iter().map(|w| w.label.as_str()).collect()
    }
}

/// One witness's copy of a chunk.
#[derive(Debug, Clone, Copy)]
pub struct ChunkMember<'a> {
    /// Position of the witness in the corpus.
    pub witness: usize,
    pub text: &'a ChunkText,
}

/// A structural chunk and the witnesses that carry it, in corpus order.
#[derive(Debug, Clone)]
pub struct ChunkEntry<'a> {
    pub key: &'a str,
    pub name: &'a str,
    pub members: Vec<ChunkMember<'a>>,
}

impl ChunkEntry<'_> {
    /// For every corpus witness, its slot among this chunk's members.
    pub fn presence(&self, witness_count: usize) -> Vec<Option<usize>> {
        let mut presence = vec![None; witness_count];
        for (slot, member) in self.members.iter().enumerate() {
            presence[member.witness] = Some(slot);
        }
        presence
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresenceRow {
    pub key: String,
    pub name: String,
    pub present: Vec<bool>,
}

/// Witnesses grouped by structural chunk, ordered by chunk key.
#[derive(Debug, Clone)]
pub struct ChunkIndex<'a> {
    labels: Vec<&'a str>,
    chunks: Vec<ChunkEntry<'a>>,
}

impl<'a> ChunkIndex<'a> {
    pub fn build(corpus: &'a CorpusInput) -> Result<Self, AlignmentError> {
        let mut seen_labels = HashSet::new();
        for witness in &corpus.witnesses {
            if !seen_labels.insert(witness.label.as_str()) {
                return Err(AlignmentError::invariant(
                    "chunk index",
                    format!("duplicate witness label {:?}", witness.label),
                ));
            }
        }

        let mut by_key: BTreeMap<&'a str, ChunkEntry<'a>> = BTreeMap::new();
        for (witness_idx, witness) in corpus.witnesses.iter().enumerate() {
            for chunk in &witness.chunks {
                if chunk.words.is_empty() {
                    continue;
                }
                let member = ChunkMember {
                    witness: witness_idx,
                    text: chunk,
                };
                match by_key.entry(chunk.key.as_str()) {
                    Entry::Vacant(slot) => {
                        slot.insert(ChunkEntry {
                            key: &chunk.key,
                            name: &chunk.name,
                            members: vec![member],
                        });
                    }
                    Entry::Occupied(mut slot) => {
                        let entry = slot.get_mut();
                        if entry.name != chunk.name {
                            return Err(AlignmentError::invariant(
                                "chunk index",
                                format!(
                                    "chunk {:?} named {:?} in {:?} but {:?} elsewhere",
                                    chunk.key, chunk.name, witness.label, entry.name
                                ),
                            ));
                        }
                        if entry.members.iter().any(|m| m.witness == witness_idx) {
                            return Err(AlignmentError::invariant(
                                "chunk index",
                                format!(
                                    "chunk {:?} appears twice in {:?}",
                                    chunk.key, witness.label
                                ),
                            ));
                        }
                        entry.members.push(member);
                    }
                }
            }
        }

        Ok(Self {
            labels: corpus.labels(),
            chunks: by_key.into_values().collect(),
        })
    }

    pub fn labels(&self) -> &[&'a str] {
        &self.labels
    }

    pub fn chunks(&self) -> &[ChunkEntry<'a>] {
        &self.chunks
    }

    pub fn presence_table(&self) -> Vec<PresenceRow> {
        self.chunks
            .iter()
            .map(|chunk| PresenceRow {
                key: chunk.key.to_string(),
                name: chunk.name.to_string(),
                present: chunk
                    .presence(self.labels.len())
                    .iter()
                    .map(Option::is_some)
                    .collect(),
            })
            .collect()
    }
}

/// Which chunks of an index to collate: an optional key filter, then an
/// offset and a limit over the remaining chunks in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkSelection {
    pub keys: Vec<String>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl ChunkSelection {
    pub fn select<'b, 'a>(
        &self,
        chunks: &'b [ChunkEntry<'a>],
    ) -> Result<Vec<&'b ChunkEntry<'a>>, AlignmentError> {
        for key in &self.keys {
            if !chunks.iter().any(|c| c.key == key) {
                tracing::warn!(chunk = %key, "requested chunk not in corpus");
            }
        }
        let filtered: Vec<&ChunkEntry<'a>> = chunks
            .iter()
            .filter(|c| self.keys.is_empty() || self.keys.iter().any(|k| k == c.key))
            .collect();
        if !self.keys.is_empty() && filtered.is_empty() {
            return Err(AlignmentError::invalid_input(format!(
                "chunk filter {:?} matches no chunk",
                self.keys
            )));
        }
        Ok(filtered
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect())
    }
}
