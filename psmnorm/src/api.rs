//! High level entry points for normalizing result files and single peptides
use std::path::Path;

use crate::{
    annotation::{PeptideAnnotationRewriter, RewrittenPeptide},
    errors::PipelineError,
    mass_shift::{MassShiftSymbolResolver, DEFAULT_MASS_MATCH_TOLERANCE},
    modification::ModificationCatalog,
    params::ProcessingParams,
    processor::ResultsProcessor,
    progress::ProcessingSummary,
};

/// Normalize a single result file with `params`, writing its outputs into `output_directory`.
///
/// This is a convenience wrapper around [`ResultsProcessor::process_file`] for callers
/// that do not need to abort a run.
pub fn normalize_file(
    input: &Path,
    output_directory: &Path,
    params: ProcessingParams,
) -> Result<ProcessingSummary, PipelineError> {
    let processor = ResultsProcessor::new(params)?;
    processor.process_file(input, output_directory)
}

/// Rewrite one engine peptide annotation against `catalog` using the default tolerance.
///
/// `fold_static` adds the mass of static modifications the engine left implicit.
pub fn rewrite_peptide(
    peptide: &str,
    catalog: &ModificationCatalog,
    fold_static: bool,
) -> RewrittenPeptide {
    let resolver = MassShiftSymbolResolver::new(
        catalog,
        DEFAULT_MASS_MATCH_TOLERANCE,
        Default::default(),
    );
    PeptideAnnotationRewriter::new(resolver, fold_static).rewrite(peptide)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::modification::{ModificationCatalogError, ModificationClass, ModificationDefinition};

    #[test]
    fn test_rewrite_peptide() -> Result<(), ModificationCatalogError> {
        let catalog = ModificationCatalog::new(vec![ModificationDefinition::new(
            "Phospho",
            79.966331,
            "STY",
            ModificationClass::DynamicMod,
            None,
        )])?;
        let rewritten = rewrite_peptide("R.GS+79.966PEK.L", &catalog, false);
        assert_eq!(rewritten.full_sequence(), "R.GS*PEK.L");
        Ok(())
    }

    #[test]
    fn test_normalize_missing_file() {
        let err = normalize_file(
            Path::new("does/not/exist.tsv"),
            Path::new("."),
            ProcessingParams::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::InputRead { .. }));
    }
}
