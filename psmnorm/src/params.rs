use serde::{Deserialize, Serialize};

use crate::amino_acid::{AminoAcidMassTable, AtomCounts, SequenceMassError};
use crate::cleavage::CleavageRule;
use crate::columns::EngineVariant;
use crate::delta_mass::{DeltaMassCorrector, DEFAULT_MAX_ISOTOPE_SHIFT};
use crate::mass_shift::{StaticDynamicTieBreak, DEFAULT_MASS_MATCH_TOLERANCE};
use crate::modification::{ModificationCatalog, ModificationCatalogError, ModificationDefinition};
use crate::ranking::{DecoyAwareProteinOrdering, ScoreThresholds};

/// A residue letter given a non-standard composition, or an explicit mass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomResidue {
    pub symbol: char,
    #[serde(default)]
    pub composition: AtomCounts,
    /// Overrides the mass computed from `composition`
    #[serde(default)]
    pub mass: Option<f64>,
}

/// Everything that controls how a result file is normalized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingParams {
    pub engine: EngineVariant,
    pub modifications: Vec<ModificationDefinition>,
    pub custom_residues: Vec<CustomResidue>,
    pub synopsis_primary_threshold: f64,
    pub synopsis_secondary_threshold: f64,
    pub precursor_tolerance_ppm: f64,
    pub mass_match_tolerance: f64,
    pub max_isotope_shift: i32,
    pub ppm_warning_limit: usize,
    pub error_log_budget: usize,
    pub tie_break: StaticDynamicTieBreak,
    pub cleavage_rule: CleavageRule,
    pub decoy_prefixes: Vec<String>,
    pub create_first_hits: bool,
    pub create_synopsis: bool,
    pub create_modification_summary: bool,
}

impl Default for ProcessingParams {
    fn default() -> Self {
        let thresholds = ScoreThresholds::default();
        Self {
            engine: EngineVariant::default(),
            modifications: Vec::new(),
            custom_residues: Vec::new(),
            synopsis_primary_threshold: thresholds.primary,
            synopsis_secondary_threshold: thresholds.secondary,
            precursor_tolerance_ppm: 20.0,
            mass_match_tolerance: DEFAULT_MASS_MATCH_TOLERANCE,
            max_isotope_shift: DEFAULT_MAX_ISOTOPE_SHIFT,
            ppm_warning_limit: 10,
            error_log_budget: 4000,
            tie_break: StaticDynamicTieBreak::default(),
            cleavage_rule: CleavageRule::default(),
            decoy_prefixes: ["XXX_", "REV_", "DECOY_", "Reversed_"]
                .into_iter()
                .map(String::from)
                .collect(),
            create_first_hits: true,
            create_synopsis: true,
            create_modification_summary: true,
        }
    }
}

impl ProcessingParams {
    pub fn build_catalog(&self) -> Result<ModificationCatalog, ModificationCatalogError> {
        ModificationCatalog::new(self.modifications.clone())
    }

    pub fn build_mass_table(&self) -> Result<AminoAcidMassTable, SequenceMassError> {
        let mut table = AminoAcidMassTable::new();
        for residue in self.custom_residues.iter() {
            let mass = residue.mass.unwrap_or_else(|| residue.composition.mass());
            table.set_residue(residue.symbol, mass, residue.composition)?;
        }
        Ok(table)
    }

    pub fn thresholds(&self) -> ScoreThresholds {
        ScoreThresholds {
            primary: self.synopsis_primary_threshold,
            secondary: self.synopsis_secondary_threshold,
        }
    }

    pub fn protein_ordering(&self) -> DecoyAwareProteinOrdering {
        DecoyAwareProteinOrdering::new(self.decoy_prefixes.iter().cloned())
    }

    pub fn delta_mass_corrector(&self) -> DeltaMassCorrector {
        DeltaMassCorrector::new(
            self.precursor_tolerance_ppm,
            self.max_isotope_shift,
            self.ppm_warning_limit,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::modification::ModificationClass;

    #[test]
    fn test_defaults() {
        let params = ProcessingParams::default();
        assert_eq!(params.synopsis_primary_threshold, 5e-7);
        assert_eq!(params.synopsis_secondary_threshold, 0.75);
        assert_eq!(params.tie_break, StaticDynamicTieBreak::PreferDynamic);
        assert!(params.build_catalog().unwrap().is_empty());
    }

    #[test]
    fn test_build() -> Result<(), Box<dyn std::error::Error>> {
        let params = ProcessingParams {
            modifications: vec![ModificationDefinition::new(
                "Oxidation",
                15.994915,
                "M",
                ModificationClass::DynamicMod,
                None,
            )],
            custom_residues: vec![CustomResidue {
                symbol: 'X',
                composition: AtomCounts::new(2, 3, 1, 1, 0),
                mass: None,
            }],
            ..Default::default()
        };
        let catalog = params.build_catalog()?;
        assert_eq!(catalog.get(0).unwrap().symbol, Some('*'));
        let table = params.build_mass_table()?;
        assert!((table.residue_mass('X') - table.residue_mass('G')).abs() < 1e-9);
        Ok(())
    }
}
