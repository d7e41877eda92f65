use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::alignment::layout::{self, TableRow};
use crate::config::CollationConfig;
use crate::corpus::PresenceRow;
use crate::error::AlignmentError;
use crate::types::{Anchor, ChunkAlignment, ChunkCollation, Collation, GapSpan, Word};

pub const SCHEMA_VERSION: u32 = 1;
const OUTLIER_TOP_N: usize = 20;

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub schema_version: u32,
    pub meta: Meta,
    pub presence: Vec<PresenceRow>,
    pub chunks: Vec<ChunkReport>,
    pub aggregates: AggregateReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    pub generated_at: String,
    pub witnesses: Vec<String>,
    pub chunk_count: usize,
    pub config: CollationConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkReport {
    pub key: String,
    pub name: String,
    /// Labels of the witnesses carrying this chunk, in corpus order.
    pub witnesses: Vec<String>,
    pub absent: Vec<String>,
    pub anchors: Vec<AnchorReport>,
    pub gaps: Vec<GapReport>,
    pub rows: Vec<TableRow>,
    pub structural: StructuralMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnchorReport {
    pub indices: Vec<usize>,
    pub words: Vec<String>,
    pub match_length: usize,
    pub weak: bool,
    pub score: usize,
    pub needs_review: bool,
    /// One of `1`, `0`, `N` per corpus witness.
    pub abbreviation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GapReport {
    pub witness: String,
    pub start: usize,
    pub end: usize,
    pub words: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StructuralMetrics {
    pub word_counts: Vec<u32>,
    pub matched_word_ratio: f32,
    pub gap_word_count: u32,
    pub strong_anchor_count: u32,
    pub weak_anchor_count: u32,
    pub review_anchor_count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    pub counts: AggregateCounts,
    pub matched_word_ratio: Option<MetricDistribution>,
    pub abbreviations: BTreeMap<String, u64>,
    pub outliers: OutlierReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateCounts {
    pub chunks: u32,
    pub chunks_with_absent_witness: u32,
    pub words: u32,
    pub strong_anchors: u32,
    pub weak_anchors: u32,
    pub review_anchors: u32,
    pub gap_words: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricDistribution {
    pub mean: f32,
    pub p50: f32,
    pub p90: f32,
    pub p95: f32,
    pub p99: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutlierReport {
    pub lowest_matched_word_ratio: Vec<OutlierEntry>,
    pub most_review_anchors: Vec<OutlierEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutlierEntry {
    pub key: String,
    pub name: String,
    pub value: f32,
}

/// Corpus-wide abbreviation summary, one entry per observed pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryDump {
    pub texts: Vec<String>,
    pub abbr: BTreeMap<String, u64>,
}

impl SummaryDump {
    pub fn from_collation(collation: &Collation) -> Self {
        Self {
            texts: collation.labels.clone(),
            abbr: collation.abbreviation_tally.clone(),
        }
    }
}

/// `1` where the anchored word is abbreviated, `0` where it is not and `N`
/// where the witness lacks the chunk, in corpus witness order.
pub fn abbreviation_pattern(
    chunk: &ChunkCollation,
    anchor: &Anchor,
) -> Result<String, AlignmentError> {
    chunk
        .presence
        .iter()
        .map(|slot| match slot {
            None => Ok('N'),
            Some(slot) => {
                let word = anchored_word(chunk, anchor, *slot)?;
                Ok(if word.is_abbreviated() { '1' } else { '0' })
            }
        })
        .collect()
}

pub fn tally_abbreviations(
    chunks: &[ChunkCollation],
) -> Result<BTreeMap<String, u64>, AlignmentError> {
    let mut tally = BTreeMap::new();
    for chunk in chunks {
        for anchor in &chunk.alignment.anchors {
            *tally.entry(abbreviation_pattern(chunk, anchor)?).or_insert(0) += 1;
        }
    }
    Ok(tally)
}

/// Every anchor must be strictly increasing and in range, and every word of
/// every witness must fall in exactly one anchor or one gap.
pub fn verify_alignment(alignment: &ChunkAlignment) -> Result<(), AlignmentError> {
    layout::validate_anchors(&alignment.anchors, &alignment.lengths)?;

    let mut covered = vec![alignment.anchors.len(); alignment.lengths.len()];
    for span in alignment.gaps() {
        covered[span.witness] += span.len();
    }
    for (witness, (&count, &len)) in covered.iter().zip(&alignment.lengths).enumerate() {
        if count != len {
            return Err(AlignmentError::invariant(
                "verify_alignment",
                format!("witness {witness} covers {count} of {len} words"),
            ));
        }
    }
    Ok(())
}

pub fn compute_chunk_report(
    chunk: &ChunkCollation,
    labels: &[String],
    config: &CollationConfig,
) -> Result<ChunkReport, AlignmentError> {
    let alignment = &chunk.alignment;

    let anchors = alignment
        .anchors
        .iter()
        .map(|anchor| -> Result<AnchorReport, AlignmentError> {
            let words = (0..chunk.witnesses.len())
                .map(|slot| anchored_word(chunk, anchor, slot).map(|w| w.surface().to_string()))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(AnchorReport {
                indices: anchor.indices.clone(),
                words,
                match_length: anchor.match_length,
                weak: anchor.is_weak(),
                score: config.anchor_score(anchor.match_length, anchor.tier),
                needs_review: config.needs_review(anchor.match_length, anchor.tier),
                abbreviation: abbreviation_pattern(chunk, anchor)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let gaps = alignment
        .gaps()
        .iter()
        .map(|span| gap_report(chunk, span))
        .collect::<Result<Vec<_>, _>>()?;

    let structural = compute_structural_metrics(alignment, &anchors)?;

    Ok(ChunkReport {
        key: chunk.key.clone(),
        name: chunk.name.clone(),
        witnesses: chunk.witnesses.iter().map(|w| w.label.clone()).collect(),
        absent: chunk
            .absent_labels(labels)
            .into_iter()
            .map(str::to_string)
            .collect(),
        anchors,
        gaps,
        rows: alignment.rows(),
        structural,
    })
}

pub fn aggregate_reports(
    chunks: &[ChunkReport],
    abbreviations: &BTreeMap<String, u64>,
) -> Result<AggregateReport, AlignmentError> {
    let mut counts = AggregateCounts {
        chunks: to_u32(chunks.len()),
        chunks_with_absent_witness: 0,
        words: 0,
        strong_anchors: 0,
        weak_anchors: 0,
        review_anchors: 0,
        gap_words: 0,
    };
    for chunk in chunks {
        let s = &chunk.structural;
        if !chunk.absent.is_empty() {
            counts.chunks_with_absent_witness += 1;
        }
        counts.words = counts
            .words
            .saturating_add(s.word_counts.iter().fold(0u32, |acc, c| acc.saturating_add(*c)));
        counts.strong_anchors = counts.strong_anchors.saturating_add(s.strong_anchor_count);
        counts.weak_anchors = counts.weak_anchors.saturating_add(s.weak_anchor_count);
        counts.review_anchors = counts.review_anchors.saturating_add(s.review_anchor_count);
        counts.gap_words = counts.gap_words.saturating_add(s.gap_word_count);
    }

    let ratios: Vec<f64> = chunks
        .iter()
        .map(|chunk| chunk.structural.matched_word_ratio as f64)
        .collect();

    Ok(AggregateReport {
        counts,
        matched_word_ratio: distribution_or_none(&ratios),
        abbreviations: abbreviations.clone(),
        outliers: compute_outliers(chunks, OUTLIER_TOP_N),
    })
}

pub fn build_report(
    collation: &Collation,
    config: &CollationConfig,
    generated_at: String,
) -> Result<Report, AlignmentError> {
    let chunks = collation
        .chunks
        .iter()
        .map(|chunk| compute_chunk_report(chunk, &collation.labels, config))
        .collect::<Result<Vec<_>, _>>()?;
    let aggregates = aggregate_reports(&chunks, &collation.abbreviation_tally)?;
    let presence = collation
        .chunks
        .iter()
        .map(|chunk| PresenceRow {
            key: chunk.key.clone(),
            name: chunk.name.clone(),
            present: chunk.presence.iter().map(Option::is_some).collect(),
        })
        .collect();

    Ok(Report {
        schema_version: SCHEMA_VERSION,
        meta: Meta {
            generated_at,
            witnesses: collation.labels.clone(),
            chunk_count: collation.chunks.len(),
            config: config.clone(),
        },
        presence,
        chunks,
        aggregates,
    })
}

fn anchored_word<'c>(
    chunk: &'c ChunkCollation,
    anchor: &Anchor,
    slot: usize,
) -> Result<&'c Word, AlignmentError> {
    anchor
        .indices
        .get(slot)
        .and_then(|&index| chunk.witnesses.get(slot)?.words.get(index))
        .ok_or_else(|| {
            AlignmentError::invariant(
                "report",
                format!(
                    "anchor {:?} has no word for witness slot {slot} in chunk {:?}",
                    anchor.indices, chunk.key
                ),
            )
        })
}

fn gap_report(chunk: &ChunkCollation, span: &GapSpan) -> Result<GapReport, AlignmentError> {
    let witness = chunk.witnesses.get(span.witness).ok_or_else(|| {
        AlignmentError::invariant(
            "report",
            format!("gap refers to missing witness slot {}", span.witness),
        )
    })?;
    let words = witness
        .words
        .get(span.start..span.end)
        .ok_or_else(|| {
            AlignmentError::invariant(
                "report",
                format!(
                    "gap [{}, {}) outside {:?} ({} words)",
                    span.start,
                    span.end,
                    witness.label,
                    witness.len()
                ),
            )
        })?
        .iter()
        .map(|w| w.surface().to_string())
        .collect();
    Ok(GapReport {
        witness: witness.label.clone(),
        start: span.start,
        end: span.end,
        words,
    })
}

fn compute_structural_metrics(
    alignment: &ChunkAlignment,
    anchors: &[AnchorReport],
) -> Result<StructuralMetrics, AlignmentError> {
    let word_count = alignment.word_count();
    let matched = anchors.len() * alignment.lengths.len();
    let matched_word_ratio = if word_count > 0 {
        matched as f64 / word_count as f64
    } else {
        0.0
    };

    Ok(StructuralMetrics {
        word_counts: alignment.lengths.iter().map(|&len| to_u32(len)).collect(),
        matched_word_ratio: checked_f32(matched_word_ratio, "structural.matched_word_ratio")?,
        gap_word_count: to_u32(alignment.gap_word_count()),
        strong_anchor_count: to_u32(anchors.iter().filter(|a| !a.weak).count()),
        weak_anchor_count: to_u32(anchors.iter().filter(|a| a.weak).count()),
        review_anchor_count: to_u32(anchors.iter().filter(|a| a.needs_review).count()),
    })
}

fn compute_outliers(chunks: &[ChunkReport], top_n: usize) -> OutlierReport {
    // Ranked descending, so the unmatched share stands in for the ratio.
    let mut lowest_matched_word_ratio = ranked_outliers(chunks, top_n, |chunk| {
        Some(1.0 - chunk.structural.matched_word_ratio as f64)
    });
    for entry in &mut lowest_matched_word_ratio {
        entry.value = 1.0 - entry.value;
    }
    let most_review_anchors = ranked_outliers(chunks, top_n, |chunk| {
        (chunk.structural.review_anchor_count > 0)
            .then_some(chunk.structural.review_anchor_count as f64)
    });

    OutlierReport {
        lowest_matched_word_ratio,
        most_review_anchors,
    }
}

fn ranked_outliers(
    chunks: &[ChunkReport],
    top_n: usize,
    metric: impl Fn(&ChunkReport) -> Option<f64>,
) -> Vec<OutlierEntry> {
    let mut entries: Vec<OutlierEntry> = chunks
        .iter()
        .filter_map(|chunk| {
            metric(chunk).map(|value| OutlierEntry {
                key: chunk.key.clone(),
                name: chunk.name.clone(),
                value: value as f32,
            })
        })
        .collect();

    entries.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.key.cmp(&b.key))
    });
    entries.truncate(top_n);
    entries
}

fn distribution_or_none(values: &[f64]) -> Option<MetricDistribution> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    Some(MetricDistribution {
        mean: checked_f32(mean(&sorted), "aggregate.mean").ok()?,
        p50: checked_f32(percentile_sorted(&sorted, 0.5), "aggregate.p50").ok()?,
        p90: checked_f32(percentile_sorted(&sorted, 0.9), "aggregate.p90").ok()?,
        p95: checked_f32(percentile_sorted(&sorted, 0.95), "aggregate.p95").ok()?,
        p99: checked_f32(percentile_sorted(&sorted, 0.99), "aggregate.p99").ok()?,
    })
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn percentile_sorted(sorted_values: &[f64], percentile: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }
    if sorted_values.len() == 1 {
        return sorted_values[0];
    }

    let rank = percentile.clamp(0.0, 1.0) * (sorted_values.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted_values[lower]
    } else {
        let weight = rank - lower as f64;
        sorted_values[lower] * (1.0 - weight) + sorted_values[upper] * weight
    }
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn checked_f32(value: f64, metric_name: &str) -> Result<f32, AlignmentError> {
    if !value.is_finite() {
        return Err(AlignmentError::invalid_input(format!(
            "metric '{metric_name}' produced non-finite value: {value}"
        )));
    }
    Ok(value as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{KeyTier, Witness};

    fn witness(label: &str, words: &[(&str, bool)]) -> Witness {
        Witness::new(
            label,
            words
                .iter()
                .map(|(s, abbr)| Word::new(s, *abbr).expect("valid word"))
                .collect(),
        )
    }

    fn anchor(indices: &[usize], match_length: usize, tier: KeyTier) -> Anchor {
        Anchor {
            indices: indices.to_vec(),
            match_length,
            tier,
        }
    }

    /// Corpus of three witnesses where `C` lacks the chunk.
    /// A: þe grete pestilence ; B: the pestilens
    fn sample_chunk() -> ChunkCollation {
        let witnesses = vec![
            witness("A", &[("þe", true), ("grete", false), ("pestilence", false)]),
            witness("B", &[("the", false), ("pestilens", false)]),
        ];
        let lengths = witnesses.iter().map(Witness::len).collect();
        ChunkCollation {
            key: "211".to_string(),
            name: "English 1".to_string(),
            witnesses,
            presence: vec![Some(0), Some(1), None],
            alignment: ChunkAlignment {
                anchors: vec![
                    anchor(&[0, 0], 12, KeyTier::Strong),
                    anchor(&[2, 1], 4, KeyTier::Weak),
                ],
                lengths,
            },
        }
    }

    fn labels() -> Vec<String> {
        ["A", "B", "C"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn abbreviation_pattern_marks_absent_witnesses() {
        let chunk = sample_chunk();
        let anchors = &chunk.alignment.anchors;
        assert_eq!(abbreviation_pattern(&chunk, &anchors[0]).expect("pattern"), "10N");
        assert_eq!(abbreviation_pattern(&chunk, &anchors[1]).expect("pattern"), "00N");
    }

    #[test]
    fn tally_counts_every_anchor() {
        let tally = tally_abbreviations(&[sample_chunk(), sample_chunk()]).expect("tally");
        assert_eq!(tally.get("10N"), Some(&2));
        assert_eq!(tally.get("00N"), Some(&2));
        assert_eq!(tally.len(), 2);
    }

    #[test]
    fn abbreviation_pattern_rejects_out_of_range_anchor() {
        let chunk = sample_chunk();
        let err = abbreviation_pattern(&chunk, &anchor(&[0, 7], 1, KeyTier::Strong)).unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn chunk_report_scores_and_flags_anchors() {
        let report =
            compute_chunk_report(&sample_chunk(), &labels(), &CollationConfig::default())
                .expect("report");
        assert_eq!(report.witnesses, ["A", "B"]);
        assert_eq!(report.absent, ["C"]);

        let strong = &report.anchors[0];
        assert_eq!(strong.words, ["þe", "the"]);
        assert_eq!(strong.score, 62);
        assert!(!strong.needs_review);

        let weak = &report.anchors[1];
        assert!(weak.weak);
        assert_eq!(weak.score, 4);
        assert!(weak.needs_review);

        assert_eq!(report.gaps.len(), 1);
        assert_eq!(report.gaps[0].witness, "A");
        assert_eq!(report.gaps[0].words, ["grete"]);

        let s = &report.structural;
        assert_eq!(s.word_counts, [3, 2]);
        assert_eq!(s.gap_word_count, 1);
        assert_eq!(s.strong_anchor_count, 1);
        assert_eq!(s.weak_anchor_count, 1);
        assert_eq!(s.review_anchor_count, 1);
        assert!((s.matched_word_ratio - 0.8).abs() < 1e-6);
    }

    #[test]
    fn verify_alignment_accepts_valid_chunk() {
        assert!(verify_alignment(&sample_chunk().alignment).is_ok());
    }

    #[test]
    fn verify_alignment_rejects_crossing_anchors() {
        let alignment = ChunkAlignment {
            anchors: vec![
                anchor(&[1, 0], 1, KeyTier::Strong),
                anchor(&[0, 1], 1, KeyTier::Strong),
            ],
            lengths: vec![2, 2],
        };
        assert!(verify_alignment(&alignment).is_err());
    }

    #[test]
    fn build_report_aggregates_chunks() {
        let chunks = vec![sample_chunk()];
        let abbreviation_tally = tally_abbreviations(&chunks).expect("tally");
        let collation = Collation {
            labels: labels(),
            chunks,
            abbreviation_tally,
        };
        let report = build_report(
            &collation,
            &CollationConfig::default(),
            "2026-01-01T00:00:00Z".to_string(),
        )
        .expect("report");

        assert_eq!(report.schema_version, SCHEMA_VERSION);
        assert_eq!(report.meta.chunk_count, 1);
        assert_eq!(report.presence[0].present, [true, true, false]);

        let counts = &report.aggregates.counts;
        assert_eq!(counts.chunks, 1);
        assert_eq!(counts.chunks_with_absent_witness, 1);
        assert_eq!(counts.words, 5);
        assert_eq!(counts.strong_anchors, 1);
        assert_eq!(counts.weak_anchors, 1);
        assert_eq!(counts.gap_words, 1);
        assert_eq!(report.aggregates.abbreviations.get("10N"), Some(&1));

        let outliers = &report.aggregates.outliers;
        assert_eq!(outliers.lowest_matched_word_ratio[0].key, "211");
        assert!((outliers.lowest_matched_word_ratio[0].value - 0.8).abs() < 1e-6);
        assert_eq!(outliers.most_review_anchors[0].value, 1.0);
    }

    #[test]
    fn summary_dump_serializes_in_summary_shape() {
        let collation = Collation {
            labels: vec!["A".to_string(), "B".to_string()],
            chunks: Vec::new(),
            abbreviation_tally: BTreeMap::from([("01".to_string(), 3)]),
        };
        let json = serde_json::to_value(SummaryDump::from_collation(&collation)).expect("json");
        assert_eq!(json, serde_json::json!({ "texts": ["A", "B"], "abbr": { "01": 3 } }));
    }

    #[test]
    fn percentile_interpolates_between_ranks() {
        let sorted = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(percentile_sorted(&sorted, 0.5), 1.5);
        assert_eq!(percentile_sorted(&sorted, 1.0), 3.0);
        assert!(distribution_or_none(&[]).is_none());
    }
}
