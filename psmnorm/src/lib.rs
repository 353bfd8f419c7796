//! Normalization of peptide search engine results.
//!
//! Engine specific peptide annotations are rewritten into a canonical notation with
//! modification symbols, peptide masses and precursor errors are recomputed, merged
//! scans are expanded, and the matches are ranked and filtered into first-hits and
//! synopsis views.
pub mod amino_acid;
pub mod modification;
pub mod mass_shift;
pub mod annotation;
pub mod delta_mass;
pub mod cleavage;
pub mod scan_group;
pub mod search_result;
pub mod ranking;

pub mod columns;
pub mod errors;
pub mod params;
pub mod progress;
pub mod processor;
pub mod writer;
pub mod api;

pub use amino_acid::{AminoAcidMassTable, SequenceMassError};
pub use annotation::{PeptideAnnotationRewriter, RewrittenPeptide};
pub use columns::EngineVariant;
pub use delta_mass::{DeltaMass, DeltaMassCorrector, PrecursorError};
pub use errors::PipelineError;
pub use mass_shift::{MassShiftSymbolResolver, StaticDynamicTieBreak};
pub use modification::{
    ModificationCatalog, ModificationCatalogError, ModificationClass, ModificationDefinition,
};
pub use params::ProcessingParams;
pub use processor::ResultsProcessor;
pub use progress::ProcessingSummary;
pub use ranking::{RankAndFilterEngine, ScoreThresholds};
pub use scan_group::ScanGroupResolver;
pub use search_result::SearchResult;
