/*! Modification definitions and the catalog used to resolve mass shifts into symbols */
use std::collections::HashSet;
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::amino_acid::IsotopicModification;

/// Target residue sentinel for the peptide N-terminus
pub const N_TERMINAL_PEPTIDE_SYMBOL: char = '<';
/// Target residue sentinel for the peptide C-terminus
pub const C_TERMINAL_PEPTIDE_SYMBOL: char = '>';
/// Target residue sentinel for the protein N-terminus
pub const N_TERMINAL_PROTEIN_SYMBOL: char = '[';
/// Target residue sentinel for the protein C-terminus
pub const C_TERMINAL_PROTEIN_SYMBOL: char = ']';

/// Symbols handed out, in order, to dynamic modifications that were not given one
pub const DEFAULT_MODIFICATION_SYMBOLS: &[char] =
    &['*', '#', '@', '!', '$', '%', '^', '&', '~', '=', '?', '\'', '"'];

/// Masses closer than this are treated as the same modification when checking symbol reuse
const SAME_MASS_TOLERANCE: f64 = 1e-4;

pub fn is_terminus_symbol(c: char) -> bool {
    matches!(
        c,
        N_TERMINAL_PEPTIDE_SYMBOL
            | C_TERMINAL_PEPTIDE_SYMBOL
            | N_TERMINAL_PROTEIN_SYMBOL
            | C_TERMINAL_PROTEIN_SYMBOL
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModificationClass {
    /// Always present on the target residues
    StaticMod,
    /// Optionally present on the target residues
    DynamicMod,
    DynNTermPeptide,
    DynCTermPeptide,
    DynNTermProtein,
    DynCTermProtein,
    /// Always present on the peptide terminus named by the target sentinel
    TermPeptideStaticMod,
    /// Always present on the protein terminus named by the target sentinel
    TermProteinStaticMod,
    /// A per-atom mass shift applied to the whole peptide
    IsotopicMod,
}

impl ModificationClass {
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            Self::StaticMod | Self::TermPeptideStaticMod | Self::TermProteinStaticMod | Self::IsotopicMod
        )
    }

    pub fn is_n_terminal(&self) -> bool {
        matches!(self, Self::DynNTermPeptide | Self::DynNTermProtein)
    }

    pub fn is_c_terminal(&self) -> bool {
        matches!(self, Self::DynCTermPeptide | Self::DynCTermProtein)
    }

    /// The single letter code written in the modification summary
    pub fn code(&self) -> char {
        match self {
            Self::StaticMod => 'S',
            Self::DynamicMod => 'D',
            Self::DynNTermPeptide | Self::DynCTermPeptide => 'T',
            Self::DynNTermProtein | Self::DynCTermProtein => 'P',
            Self::TermPeptideStaticMod => 'N',
            Self::TermProteinStaticMod => 'C',
            Self::IsotopicMod => 'I',
        }
    }
}

impl Display for ModificationClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// How well a modification's target residues agree with the residue it was observed on.
///
/// Ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResidueAffinity {
    Matched,
    Generic,
    Unmatched,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModificationDefinition {
    #[serde(default)]
    pub name: String,
    pub mass: f64,
    /// Residue letters and/or terminus sentinels this modification may be placed on
    #[serde(default)]
    pub target_residues: String,
    pub class: ModificationClass,
    #[serde(default)]
    pub symbol: Option<char>,
    /// The element an [`ModificationClass::IsotopicMod`] shifts
    #[serde(default)]
    pub affected_atom: Option<char>,
}

impl ModificationDefinition {
    pub fn new(
        name: impl Into<String>,
        mass: f64,
        target_residues: impl Into<String>,
        class: ModificationClass,
        symbol: Option<char>,
    ) -> Self {
        Self {
            name: name.into(),
            mass,
            target_residues: target_residues.into(),
            class,
            symbol,
            affected_atom: None,
        }
    }

    pub fn isotopic(name: impl Into<String>, mass: f64, affected_atom: char) -> Self {
        Self {
            affected_atom: Some(affected_atom),
            ..Self::new(name, mass, "", ModificationClass::IsotopicMod, None)
        }
    }

    /// The symbol written into peptides, never present for static classes
    pub fn visible_symbol(&self) -> Option<char> {
        if self.class.is_static() {
            None
        } else {
            self.symbol
        }
    }

    pub fn targets(&self, residue: char) -> bool {
        self.target_residues
            .chars()
            .any(|c| c.eq_ignore_ascii_case(&residue))
    }

    /// A modification without residue letters among its targets applies anywhere in its class
    pub fn is_generic(&self) -> bool {
        !self
            .target_residues
            .chars()
            .any(|c| c.is_ascii_alphabetic())
    }

    pub fn residue_affinity(&self, residue: Option<char>) -> ResidueAffinity {
        match residue {
            Some(r) if self.targets(r) => ResidueAffinity::Matched,
            _ if self.is_generic() => ResidueAffinity::Generic,
            _ => ResidueAffinity::Unmatched,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModificationCatalogError {
    #[error("Modification {name} has a non-finite mass")]
    InvalidMass { name: String },
    #[error("Modification {name} has no target residues")]
    EmptyTargets { name: String },
    #[error("Modification {name} targets '{residue}', which is neither a residue letter nor a terminus symbol")]
    InvalidTargetResidue { name: String, residue: char },
    #[error("Modification {name} cannot use '{symbol}' as its symbol")]
    InvalidSymbol { name: String, symbol: char },
    #[error("Symbol '{symbol}' is already assigned to a modification of a different mass")]
    DuplicateSymbol { symbol: char },
    #[error("No modification symbols are left to assign to {name}")]
    SymbolsExhausted { name: String },
    #[error("Isotopic modification {name} must name an affected atom among C, H, N, O or S")]
    InvalidAffectedAtom { name: String },
}

fn is_valid_symbol(symbol: char) -> bool {
    !(symbol.is_ascii_alphanumeric()
        || symbol.is_whitespace()
        || matches!(symbol, '.' | '+' | '-' | '_')
        || is_terminus_symbol(symbol))
}

/// The ordered list of known modifications.
///
/// Construction validates every definition and assigns symbols to dynamic
/// modifications that lack one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModificationCatalog {
    definitions: Vec<ModificationDefinition>,
}

impl ModificationCatalog {
    pub fn new(
        definitions: Vec<ModificationDefinition>,
    ) -> Result<Self, ModificationCatalogError> {
        let mut definitions = definitions;
        for def in definitions.iter_mut() {
            Self::validate(def)?;
            if def.class.is_static() {
                def.symbol = None;
            }
        }

        let mut assigned: Vec<(char, f64)> = Vec::new();
        for def in definitions.iter().filter(|d| !d.class.is_static()) {
            if let Some(symbol) = def.symbol {
                if !is_valid_symbol(symbol) {
                    return Err(ModificationCatalogError::InvalidSymbol {
                        name: def.name.clone(),
                        symbol,
                    });
                }
                if assigned
                    .iter()
                    .any(|(s, m)| *s == symbol && (m - def.mass).abs() > SAME_MASS_TOLERANCE)
                {
                    return Err(ModificationCatalogError::DuplicateSymbol { symbol });
                }
                assigned.push((symbol, def.mass));
            }
        }

        let used: HashSet<char> = assigned.iter().map(|(s, _)| *s).collect();
        let mut available = DEFAULT_MODIFICATION_SYMBOLS
            .iter()
            .copied()
            .filter(|c| !used.contains(c));
        for def in definitions
            .iter_mut()
            .filter(|d| !d.class.is_static() && d.symbol.is_none())
        {
            match available.next() {
                Some(symbol) => def.symbol = Some(symbol),
                None => {
                    return Err(ModificationCatalogError::SymbolsExhausted {
                        name: def.name.clone(),
                    })
                }
            }
        }
        Ok(Self { definitions })
    }

    fn validate(def: &ModificationDefinition) -> Result<(), ModificationCatalogError> {
        if !def.mass.is_finite() {
            return Err(ModificationCatalogError::InvalidMass {
                name: def.name.clone(),
            });
        }
        if let Some(residue) = def
            .target_residues
            .chars()
            .find(|c| !(c.is_ascii_alphabetic() || is_terminus_symbol(*c)))
        {
            return Err(ModificationCatalogError::InvalidTargetResidue {
                name: def.name.clone(),
                residue,
            });
        }
        match def.class {
            ModificationClass::IsotopicMod => {
                if !matches!(
                    def.affected_atom.map(|c| c.to_ascii_uppercase()),
                    Some('C' | 'H' | 'N' | 'O' | 'S')
                ) {
                    return Err(ModificationCatalogError::InvalidAffectedAtom {
                        name: def.name.clone(),
                    });
                }
            }
            ModificationClass::StaticMod
            | ModificationClass::DynamicMod
            | ModificationClass::TermPeptideStaticMod
            | ModificationClass::TermProteinStaticMod => {
                if def.target_residues.is_empty() {
                    return Err(ModificationCatalogError::EmptyTargets {
                        name: def.name.clone(),
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ModificationDefinition> {
        self.definitions.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ModificationDefinition> {
        self.definitions.iter()
    }

    /// Iterate over `(index, definition)` pairs of a given class
    pub fn of_class(
        &self,
        class: ModificationClass,
    ) -> impl Iterator<Item = (usize, &ModificationDefinition)> {
        self.definitions
            .iter()
            .enumerate()
            .filter(move |(_, d)| d.class == class)
    }

    /// All definitions within `tolerance` of `mass` that satisfy `predicate`, with
    /// their absolute mass difference.
    pub fn candidates_within<'a, P: Fn(&ModificationDefinition) -> bool + 'a>(
        &'a self,
        mass: f64,
        tolerance: f64,
        predicate: P,
    ) -> impl Iterator<Item = (usize, &'a ModificationDefinition, f64)> + 'a {
        self.definitions
            .iter()
            .enumerate()
            .filter(move |(_, d)| predicate(d))
            .map(move |(i, d)| (i, d, (d.mass - mass).abs()))
            .filter(move |(_, _, diff)| *diff <= tolerance)
    }

    /// The definition closest in mass to `mass`, if any is within `tolerance`
    pub fn nearest(&self, mass: f64, tolerance: f64) -> Option<(usize, &ModificationDefinition)> {
        self.candidates_within(mass, tolerance, |d| d.class != ModificationClass::IsotopicMod)
            .min_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(i, d, _)| (i, d))
    }

    pub fn isotopic_modifications(&self) -> Vec<IsotopicModification> {
        self.of_class(ModificationClass::IsotopicMod)
            .filter_map(|(_, d)| {
                d.affected_atom
                    .map(|atom| IsotopicModification::new(atom, d.mass))
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a ModificationCatalog {
    type Item = &'a ModificationDefinition;
    type IntoIter = std::slice::Iter<'a, ModificationDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Occurrence counts of each catalog entry, indexed like the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModificationUsage {
    counts: Vec<usize>,
}

impl ModificationUsage {
    pub fn new(catalog: &ModificationCatalog) -> Self {
        Self {
            counts: vec![0; catalog.len()],
        }
    }

    pub fn record(&mut self, index: usize) {
        if index >= self.counts.len() {
            self.counts.resize(index + 1, 0);
        }
        self.counts[index] += 1;
    }

    pub fn count(&self, index: usize) -> usize {
        self.counts.get(index).copied().unwrap_or_default()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn oxidation() -> ModificationDefinition {
        ModificationDefinition::new("Oxidation", 15.994915, "M", ModificationClass::DynamicMod, None)
    }

    #[test]
    fn test_symbol_assignment() -> Result<(), ModificationCatalogError> {
        let catalog = ModificationCatalog::new(vec![
            oxidation(),
            ModificationDefinition::new("Acetyl", 42.010565, "<", ModificationClass::DynNTermPeptide, Some('*')),
            ModificationDefinition::new("Carbamidomethyl", 57.021464, "C", ModificationClass::StaticMod, Some('!')),
            ModificationDefinition::new("Phospho", 79.966331, "STY", ModificationClass::DynamicMod, None),
        ])?;
        // '*' was claimed explicitly, so the first free default symbol is '#'
        assert_eq!(catalog.get(0).unwrap().symbol, Some('#'));
        assert_eq!(catalog.get(1).unwrap().symbol, Some('*'));
        assert_eq!(catalog.get(2).unwrap().symbol, None);
        assert_eq!(catalog.get(2).unwrap().visible_symbol(), None);
        assert_eq!(catalog.get(3).unwrap().symbol, Some('@'));
        Ok(())
    }

    #[test]
    fn test_malformed_definitions() {
        let err = ModificationCatalog::new(vec![ModificationDefinition::new(
            "Bad", 1.0, "M", ModificationClass::DynamicMod, Some('A'),
        )])
        .unwrap_err();
        assert!(matches!(err, ModificationCatalogError::InvalidSymbol { .. }));

        let err = ModificationCatalog::new(vec![ModificationDefinition::new(
            "Bad", 1.0, "M1", ModificationClass::DynamicMod, None,
        )])
        .unwrap_err();
        assert!(matches!(err, ModificationCatalogError::InvalidTargetResidue { residue: '1', .. }));

        let err = ModificationCatalog::new(vec![ModificationDefinition::new(
            "Bad", 1.0, "", ModificationClass::StaticMod, None,
        )])
        .unwrap_err();
        assert!(matches!(err, ModificationCatalogError::EmptyTargets { .. }));

        let err = ModificationCatalog::new(vec![
            ModificationDefinition::new("A", 1.0, "M", ModificationClass::DynamicMod, Some('*')),
            ModificationDefinition::new("B", 2.0, "K", ModificationClass::DynamicMod, Some('*')),
        ])
        .unwrap_err();
        assert_eq!(err, ModificationCatalogError::DuplicateSymbol { symbol: '*' });

        let err = ModificationCatalog::new(vec![ModificationDefinition::isotopic("15N", 0.997035, 'X')])
            .unwrap_err();
        assert!(matches!(err, ModificationCatalogError::InvalidAffectedAtom { .. }));

        let many: Vec<_> = (0..DEFAULT_MODIFICATION_SYMBOLS.len() + 1)
            .map(|i| ModificationDefinition::new(format!("m{i}"), i as f64, "K", ModificationClass::DynamicMod, None))
            .collect();
        let err = ModificationCatalog::new(many).unwrap_err();
        assert!(matches!(err, ModificationCatalogError::SymbolsExhausted { .. }));
    }

    #[test]
    fn test_nearest_and_affinity() -> Result<(), ModificationCatalogError> {
        let catalog = ModificationCatalog::new(vec![
            oxidation(),
            ModificationDefinition::new("Deamidation", 0.984016, "NQ", ModificationClass::DynamicMod, None),
            ModificationDefinition::isotopic("15N", 0.997035, 'N'),
        ])?;
        let (i, def) = catalog.nearest(15.995, 0.25).unwrap();
        assert_eq!(i, 0);
        assert_eq!(def.residue_affinity(Some('M')), ResidueAffinity::Matched);
        assert_eq!(def.residue_affinity(Some('K')), ResidueAffinity::Unmatched);
        // the isotopic shift is never a nearest-mass candidate
        assert_eq!(catalog.nearest(0.997, 0.25).map(|(i, _)| i), Some(1));
        assert!(catalog.nearest(100.0, 0.25).is_none());
        assert_eq!(catalog.isotopic_modifications().len(), 1);

        let nterm = ModificationDefinition::new("Acetyl", 42.010565, "<", ModificationClass::DynNTermPeptide, None);
        assert!(nterm.is_generic());
        assert_eq!(nterm.residue_affinity(Some('M')), ResidueAffinity::Generic);
        Ok(())
    }

    #[test]
    fn test_usage() -> Result<(), ModificationCatalogError> {
        let catalog = ModificationCatalog::new(vec![oxidation()])?;
        let mut usage = ModificationUsage::new(&catalog);
        usage.record(0);
        usage.record(0);
        assert_eq!(usage.count(0), 2);
        assert_eq!(usage.count(5), 0);
        assert_eq!(usage.total(), 2);
        Ok(())
    }
}
