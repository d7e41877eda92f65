pub mod alignment;
pub mod config;
pub mod corpus;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod types;

pub use alignment::canonical::canonicalize;
pub use alignment::report::{build_report, Report, SummaryDump};
pub use config::{CollationConfig, SearchPass};
pub use corpus::{ChunkIndex, ChunkSelection, CorpusInput};
pub use error::AlignmentError;
pub use pipeline::builder::CollatorBuilder;
pub use pipeline::runtime::{Collator, InvalidChunkPolicy};
pub use pipeline::traits::{AnchorAligner, Canonicalizer};
pub use types::{
    Anchor, CanonicalKeys, ChunkAlignment, ChunkCollation, Collation, KeyTier, Witness, Word,
};
