use serde::Serialize;

use crate::error::AlignmentError;
use crate::types::{Anchor, GapSpan};

/// One row of the side-by-side collation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TableRow {
    /// Next unmatched word of every witness still inside a gap; `None`
    /// for witnesses whose gap is already exhausted.
    Gap { cells: Vec<Option<usize>> },
    /// Position of the anchor in the alignment's anchor list.
    Match { anchor: usize },
}

/// Unmatched spans between consecutive anchors, including the stretch
/// before the first and after the last anchor. Empty spans are skipped.
pub fn gap_spans(anchors: &[Anchor], lengths: &[usize]) -> Vec<GapSpan> {
    let mut spans = Vec::new();
    let mut next_free = vec![0; lengths.len()];
    let boundaries = anchors
        .iter()
        .map(|a| a.indices.as_slice())
        .chain(std::iter::once(lengths));
    for boundary in boundaries {
        for (witness, (&start, &end)) in next_free.iter().zip(boundary).enumerate() {
            if end > start {
                spans.push(GapSpan {
                    witness,
                    start,
                    end,
                });
            }
        }
        next_free = boundary.iter().map(|&i| i + 1).collect();
    }
    spans
}

/// Interleave gap rows and match rows in reading order.
///
/// Before each anchor, gap rows are emitted until every witness has caught
/// up with it; each gap row takes one pending word from each witness that
/// still has one.
pub fn table_rows(anchors: &[Anchor], lengths: &[usize]) -> Vec<TableRow> {
    let mut rows = Vec::new();
    let mut cursor = vec![0; lengths.len()];
    for (position, anchor) in anchors.iter().enumerate() {
        push_gap_rows(&mut rows, &mut cursor, &anchor.indices);
        rows.push(TableRow::Match { anchor: position });
        cursor = anchor.indices.iter().map(|&i| i + 1).collect();
    }
    push_gap_rows(&mut rows, &mut cursor, lengths);
    rows
}

fn push_gap_rows(rows: &mut Vec<TableRow>, cursor: &mut [usize], until: &[usize]) {
    loop {
        let mut any = false;
        let cells: Vec<Option<usize>> = cursor
            .iter_mut()
            .zip(until)
            .map(|(pos, &end)| {
                if *pos < end {
                    any = true;
                    *pos += 1;
                    Some(*pos - 1)
                } else {
                    None
                }
            })
            .collect();
        if !any {
            return;
        }
        rows.push(TableRow::Gap { cells });
    }
}

/// Check that anchors are strictly increasing and in range in every
/// witness, so that each word lies in exactly one anchor or one gap.
pub fn validate_anchors(anchors: &[Anchor], lengths: &[usize]) -> Result<(), AlignmentError> {
    let mut next_free = vec![0; lengths.len()];
    for (position, anchor) in anchors.iter().enumerate() {
        if anchor.indices.len() != lengths.len() {
            return Err(AlignmentError::invariant(
                "validate_anchors",
                format!(
                    "anchor {position} has {} indices for {} witnesses",
                    anchor.indices.len(),
                    lengths.len()
                ),
            ));
        }
        for (witness, (&index, (&free, &len))) in anchor
            .indices
            .iter()
            .zip(next_free.iter().zip(lengths))
            .enumerate()
        {
            if index < free || index >= len {
                return Err(AlignmentError::invariant(
                    "validate_anchors",
                    format!(
                        "anchor {position} index {index} in witness {witness} outside [{free}, {len})"
                    ),
                ));
            }
        }
        next_free = anchor.indices.iter().map(|&i| i + 1).collect();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KeyTier;

    fn anchor(indices: &[usize]) -> Anchor {
        Anchor {
            indices: indices.to_vec(),
            match_length: 1,
            tier: KeyTier::Strong,
        }
    }

    #[test]
    fn gap_spans_between_anchors() {
        let anchors = vec![anchor(&[0, 0]), anchor(&[1, 2]), anchor(&[2, 3])];
        assert_eq!(
            gap_spans(&anchors, &[3, 4]),
            vec![GapSpan {
                witness: 1,
                start: 1,
                end: 2
            }]
        );
    }

    #[test]
    fn gap_spans_without_anchors_cover_each_witness() {
        assert_eq!(
            gap_spans(&[], &[5, 5]),
            vec![
                GapSpan {
                    witness: 0,
                    start: 0,
                    end: 5
                },
                GapSpan {
                    witness: 1,
                    start: 0,
                    end: 5
                },
            ]
        );
    }

    #[test]
    fn gap_spans_leading_and_trailing() {
        let spans = gap_spans(&[anchor(&[2, 0])], &[3, 4]);
        assert_eq!(
            spans,
            vec![
                GapSpan {
                    witness: 0,
                    start: 0,
                    end: 2
                },
                GapSpan {
                    witness: 1,
                    start: 1,
                    end: 4
                },
            ]
        );
    }

    #[test]
    fn table_rows_pair_gap_words_line_by_line() {
        // A: g0 g1 M ; B: h0 M h2 h3
        let anchors = vec![anchor(&[2, 1])];
        let rows = table_rows(&anchors, &[3, 4]);
        assert_eq!(
            rows,
            vec![
                TableRow::Gap {
                    cells: vec![Some(0), Some(0)]
                },
                TableRow::Gap {
                    cells: vec![Some(1), None]
                },
                TableRow::Match { anchor: 0 },
                TableRow::Gap {
                    cells: vec![None, Some(2)]
                },
                TableRow::Gap {
                    cells: vec![None, Some(3)]
                },
            ]
        );
    }

    #[test]
    fn table_rows_identity_has_only_matches() {
        let anchors = vec![anchor(&[0, 0]), anchor(&[1, 1])];
        assert_eq!(
            table_rows(&anchors, &[2, 2]),
            vec![TableRow::Match { anchor: 0 }, TableRow::Match { anchor: 1 }]
        );
    }

    #[test]
    fn validate_accepts_monotonic_anchors() {
        let anchors = vec![anchor(&[0, 1]), anchor(&[2, 2])];
        assert!(validate_anchors(&anchors, &[3, 3]).is_ok());
    }

    #[test]
    fn validate_rejects_non_increasing_or_out_of_range() {
        let repeated = vec![anchor(&[0, 1]), anchor(&[0, 2])];
        assert!(validate_anchors(&repeated, &[3, 3]).is_err());

        let beyond = vec![anchor(&[3, 0])];
        assert!(validate_anchors(&beyond, &[3, 3]).is_err());

        let short = vec![anchor(&[0])];
        assert!(validate_anchors(&short, &[3, 3]).is_err());
    }
}
