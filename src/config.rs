use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AlignmentError;
use crate::types::KeyTier;

/// Tunables for the progressive anchor search and the report flags.
///
/// The defaults are the values the collation was calibrated against; any
/// change to the limits changes which anchors are found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollationConfig {
    pub strong_max_limit: usize,
    pub strong_min_limit: usize,
    pub weak_max_limit: usize,
    /// Weak keys are short; a one-character weak key anchors almost anywhere.
    pub weak_min_limit: usize,
    /// Strong anchors shorter than this are flagged for review.
    pub review_limit: usize,
    pub strong_score_bonus: usize,
}

impl CollationConfig {
    pub const DEFAULT_MAX_LIMIT: usize = 39;
    pub const DEFAULT_STRONG_MIN_LIMIT: usize = 1;
    pub const DEFAULT_WEAK_MIN_LIMIT: usize = 2;
    pub const DEFAULT_REVIEW_LIMIT: usize = 10;
    pub const DEFAULT_STRONG_SCORE_BONUS: usize = 50;

    pub fn load(path: &Path) -> Result<Self, AlignmentError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| AlignmentError::io("read collation config", e))?;
        let config: Self = serde_json::from_str(&data)
            .map_err(|e| AlignmentError::json("parse collation config", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AlignmentError> {
        check_range("strong", self.strong_min_limit, self.strong_max_limit)?;
        check_range("weak", self.weak_min_limit, self.weak_max_limit)
    }

    /// Passes in the order they run: strong tier first, each tier from its
    /// longest match length down to its shortest.
    pub fn schedule(&self) -> Vec<SearchPass> {
        let strong = (self.strong_min_limit..=self.strong_max_limit)
            .rev()
            .map(|limit| SearchPass {
                tier: KeyTier::Strong,
                limit,
            });
        let weak = (self.weak_min_limit..=self.weak_max_limit)
            .rev()
            .map(|limit| SearchPass {
                tier: KeyTier::Weak,
                limit,
            });
        strong.chain(weak).collect()
    }

    pub fn anchor_score(&self, match_length: usize, tier: KeyTier) -> usize {
        match tier {
            KeyTier::Strong => match_length + self.strong_score_bonus,
            KeyTier::Weak => match_length,
        }
    }

    pub fn needs_review(&self, match_length: usize, tier: KeyTier) -> bool {
        tier == KeyTier::Weak || match_length < self.review_limit
    }
}

impl Default for CollationConfig {
    fn default() -> Self {
        Self {
            strong_max_limit: Self::DEFAULT_MAX_LIMIT,
            strong_min_limit: Self::DEFAULT_STRONG_MIN_LIMIT,
            weak_max_limit: Self::DEFAULT_MAX_LIMIT,
            weak_min_limit: Self::DEFAULT_WEAK_MIN_LIMIT,
            review_limit: Self::DEFAULT_REVIEW_LIMIT,
            strong_score_bonus: Self::DEFAULT_STRONG_SCORE_BONUS,
        }
    }
}

/// One sweep of the anchor search: a key tier and the minimum number of
/// key characters a candidate must span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchPass {
    pub tier: KeyTier,
    pub limit: usize,
}

fn check_range(tier: &str, min: usize, max: usize) -> Result<(), AlignmentError> {
    if min == 0 {
        return Err(AlignmentError::invalid_input(format!(
            "{tier}_min_limit must be >= 1"
        )));
    }
    if min > max {
        return Err(AlignmentError::invalid_input(format!(
            "{tier}_min_limit ({min}) exceeds {tier}_max_limit ({max})"
        )));
    }
    Ok(())
}
