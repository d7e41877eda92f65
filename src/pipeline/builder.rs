use std::path::Path;

use crate::config::CollationConfig;
use crate::error::AlignmentError;
use crate::pipeline::defaults::{MiddleEnglishCanonicalizer, ProgressiveAnchorAligner};
use crate::pipeline::runtime::{Collator, CollatorParts};
use crate::pipeline::traits::{AnchorAligner, Canonicalizer};

pub struct CollatorBuilder {
    config: CollationConfig,
    canonicalizer: Option<Box<dyn Canonicalizer>>,
    anchor_aligner: Option<Box<dyn AnchorAligner>>,
}

impl CollatorBuilder {
    pub fn new(config: CollationConfig) -> Self {
        Self {
            config,
            canonicalizer: None,
            anchor_aligner: None,
        }
    }

    /// Start from a JSON config file instead of the defaults.
    pub fn from_config_file(path: &Path) -> Result<Self, AlignmentError> {
        Ok(Self::new(CollationConfig::load(path)?))
    }

    pub fn with_canonicalizer(mut self, canonicalizer: Box<dyn Canonicalizer>) -> Self {
        self.canonicalizer = Some(canonicalizer);
        self
    }

    pub fn with_anchor_aligner(mut self, anchor_aligner: Box<dyn AnchorAligner>) -> Self {
        self.anchor_aligner = Some(anchor_aligner);
        self
    }

    pub fn build(self) -> Result<Collator, AlignmentError> {
        self.config.validate()?;
        let schedule = self.config.schedule();
        Ok(Collator::from_parts(CollatorParts {
            config: self.config,
            schedule,
            canonicalizer: self
                .canonicalizer
                .unwrap_or_else(|| Box::new(MiddleEnglishCanonicalizer)),
            anchor_aligner: self
                .anchor_aligner
                .unwrap_or_else(|| Box::new(ProgressiveAnchorAligner)),
        }))
    }
}

impl Default for CollatorBuilder {
    fn default() -> Self {
        Self::new(CollationConfig::default())
    }
}
