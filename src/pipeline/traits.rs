use crate::config::SearchPass;
use crate::error::AlignmentError;
use crate::types::{Anchor, CanonicalKeys, Witness};

pub trait Canonicalizer: Send + Sync {
    fn canonicalize(&self, surface: &str) -> Result<CanonicalKeys, AlignmentError>;
}

pub trait AnchorAligner: Send + Sync {
    fn align(
        &self,
        witnesses: &[Witness],
        schedule: &[SearchPass],
    ) -> Result<Vec<Anchor>, AlignmentError>;
}
