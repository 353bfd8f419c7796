/*! Resolution of inline signed mass annotations like `+15.995` into modification symbols */
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::modification::{ModificationCatalog, ModificationClass, ModificationDefinition, ResidueAffinity};

/// The default maximum distance between an annotated mass and a catalog mass
pub const DEFAULT_MASS_MATCH_TOLERANCE: f64 = 0.25;

/// Candidates whose mass errors differ by less than this are considered tied
pub const MASS_TIE_TOLERANCE: f64 = 5e-4;

/// Which class wins when a static and a dynamic modification match a mass equally well
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaticDynamicTieBreak {
    PreferStatic,
    #[default]
    PreferDynamic,
}

impl StaticDynamicTieBreak {
    fn prefers(&self, is_static: bool) -> bool {
        match self {
            Self::PreferStatic => is_static,
            Self::PreferDynamic => !is_static,
        }
    }
}

/// Where in the peptide a run of mass shifts was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalContext {
    NTerminal,
    CTerminal,
    Internal,
}

impl TerminalContext {
    /// Whether a modification class is a candidate in the restricted, first phase of matching
    pub fn admits(&self, class: ModificationClass) -> bool {
        match self {
            Self::NTerminal => class.is_n_terminal(),
            Self::CTerminal => class.is_c_terminal(),
            Self::Internal => true,
        }
    }

    pub fn is_restricted(&self) -> bool {
        !matches!(self, Self::Internal)
    }
}

/// One signed mass taken from a run, keeping its source text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassShiftToken<'a> {
    pub text: &'a str,
    pub mass: Option<f64>,
}

fn is_numeric_char(b: u8) -> bool {
    b.is_ascii_digit() || b == b'.'
}

/// The length in bytes of the run of signed numbers at the start of `text`.
///
/// A sign only starts a number when a digit or decimal point follows it, otherwise
/// it is treated as an ordinary symbol and the run ends.
pub fn numeric_run_length(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() && matches!(bytes[i], b'+' | b'-') && is_numeric_char(bytes[i + 1]) {
        i += 1;
        while i < bytes.len() && is_numeric_char(bytes[i]) {
            i += 1;
        }
    }
    i
}

/// Split a run of concatenated signed numbers into its tokens
pub fn tokenize_mass_shifts(run: &str) -> Vec<MassShiftToken<'_>> {
    let mut tokens = Vec::new();
    let mut start = 0;
    for (i, c) in run.char_indices().skip(1) {
        if c == '+' || c == '-' {
            tokens.push(&run[start..i]);
            start = i;
        }
    }
    if start < run.len() {
        tokens.push(&run[start..]);
    }
    tokens
        .into_iter()
        .map(|text| MassShiftToken {
            text,
            mass: text.parse::<f64>().ok().filter(|m| m.is_finite()),
        })
        .collect()
}

/// The outcome of resolving one run of mass shifts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedMassShifts {
    /// Symbols of matched dynamic modifications followed or interleaved with the
    /// literal text of unmatched tokens
    pub symbols: String,
    /// The catalog masses of the matched tokens plus the written masses of unmatched ones
    pub mass: f64,
    /// Catalog indices of the matched modifications
    pub modifications: Vec<usize>,
    pub matched: usize,
    pub unmatched: usize,
    /// How many of the matches were static modifications
    pub static_matches: usize,
}

impl ResolvedMassShifts {
    pub fn success(&self) -> bool {
        self.matched > 0
    }
}

/// Maps numeric mass shifts onto catalog modifications
#[derive(Debug, Clone)]
pub struct MassShiftSymbolResolver<'a> {
    catalog: &'a ModificationCatalog,
    tolerance: f64,
    tie_break: StaticDynamicTieBreak,
}

impl<'a> MassShiftSymbolResolver<'a> {
    pub fn new(
        catalog: &'a ModificationCatalog,
        tolerance: f64,
        tie_break: StaticDynamicTieBreak,
    ) -> Self {
        Self {
            catalog,
            tolerance,
            tie_break,
        }
    }

    pub fn catalog(&self) -> &'a ModificationCatalog {
        self.catalog
    }

    /// Resolve every token in `run`, which must consist only of signed numbers.
    ///
    /// `adjacent` is the residue the run is attached to, used to break ties.
    pub fn resolve(
        &self,
        run: &str,
        context: TerminalContext,
        adjacent: Option<char>,
    ) -> ResolvedMassShifts {
        let mut resolved = ResolvedMassShifts::default();
        for token in tokenize_mass_shifts(run) {
            let Some(mass) = token.mass else {
                resolved.symbols.push_str(token.text);
                resolved.unmatched += 1;
                continue;
            };
            let matched = self
                .resolve_mass(mass, context, adjacent)
                .and_then(|index| self.catalog.get(index).map(|def| (index, def)));
            match matched {
                Some((index, def)) => {
                    if def.class.is_static() {
                        resolved.static_matches += 1;
                    }
                    if let Some(symbol) = def.visible_symbol() {
                        resolved.symbols.push(symbol);
                    }
                    resolved.mass += def.mass;
                    resolved.modifications.push(index);
                    resolved.matched += 1;
                }
                None => {
                    debug!(
                        "No modification within {} of {} ({:?})",
                        self.tolerance, token.text, context
                    );
                    resolved.symbols.push_str(token.text);
                    resolved.mass += mass;
                    resolved.unmatched += 1;
                }
            }
        }
        resolved
    }

    /// Find the catalog index for a single mass, restricting candidates to the terminal
    /// classes first and falling back to the whole catalog.
    pub fn resolve_mass(
        &self,
        mass: f64,
        context: TerminalContext,
        adjacent: Option<char>,
    ) -> Option<usize> {
        let restricted = self.best_candidate(mass, adjacent, |d| context.admits(d.class));
        if restricted.is_some() || !context.is_restricted() {
            return restricted;
        }
        self.best_candidate(mass, adjacent, |_| true)
    }

    fn best_candidate(
        &self,
        mass: f64,
        adjacent: Option<char>,
        predicate: impl Fn(&ModificationDefinition) -> bool,
    ) -> Option<usize> {
        let mut best: Option<(usize, f64, ResidueAffinity, bool)> = None;
        let candidates = self.catalog.candidates_within(mass, self.tolerance, |d| {
            d.class != ModificationClass::IsotopicMod && predicate(d)
        });
        for (index, def, diff) in candidates {
            let affinity = def.residue_affinity(adjacent);
            let is_static = def.class.is_static();
            let replace = match best {
                None => true,
                Some((_, best_diff, best_affinity, best_static)) => {
                    if diff < best_diff - MASS_TIE_TOLERANCE {
                        true
                    } else if diff > best_diff + MASS_TIE_TOLERANCE {
                        false
                    } else if affinity != best_affinity {
                        affinity < best_affinity
                    } else if is_static != best_static {
                        self.tie_break.prefers(is_static)
                    } else {
                        false
                    }
                }
            };
            if replace {
                best = Some((index, diff, affinity, is_static));
            }
        }
        best.map(|(index, ..)| index)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::modification::ModificationCatalogError;

    fn catalog() -> Result<ModificationCatalog, ModificationCatalogError> {
        ModificationCatalog::new(vec![
            ModificationDefinition::new("Oxidation", 15.994915, "M", ModificationClass::DynamicMod, Some('*')),
            ModificationDefinition::new("Acetyl", 42.010565, "<", ModificationClass::DynNTermPeptide, Some('#')),
            ModificationDefinition::new("AcetylK", 42.010565, "K", ModificationClass::DynamicMod, Some('@')),
            ModificationDefinition::new("Carbamidomethyl", 57.021464, "C", ModificationClass::StaticMod, None),
            ModificationDefinition::new("Amidated", -0.984016, ">", ModificationClass::DynCTermPeptide, Some('!')),
            ModificationDefinition::new("Phospho", 79.966331, "STY", ModificationClass::DynamicMod, Some('$')),
        ])
    }

    #[test]
    fn test_numeric_run_length() {
        assert_eq!(numeric_run_length("+15.995PEP"), 7);
        assert_eq!(numeric_run_length("+15.995-17.027K"), 14);
        assert_eq!(numeric_run_length("+.5A"), 3);
        assert_eq!(numeric_run_length("PEP"), 0);
        // a sign not followed by a number is a symbol
        assert_eq!(numeric_run_length("-A"), 0);
        assert_eq!(numeric_run_length("+"), 0);
    }

    #[test]
    fn test_tokenize() {
        let tokens = tokenize_mass_shifts("+42.011-17.027+0.984");
        let texts: Vec<_> = tokens.iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["+42.011", "-17.027", "+0.984"]);
        assert!((tokens[1].mass.unwrap() + 17.027).abs() < 1e-12);
    }

    #[test]
    fn test_exact_match() -> Result<(), ModificationCatalogError> {
        let catalog = catalog()?;
        let resolver = MassShiftSymbolResolver::new(&catalog, DEFAULT_MASS_MATCH_TOLERANCE, Default::default());
        let resolved = resolver.resolve("+15.994915", TerminalContext::Internal, Some('M'));
        assert!(resolved.success());
        assert_eq!(resolved.symbols, "*");
        assert_eq!(resolved.modifications, vec![0]);
        assert!((resolved.mass - catalog.get(0).unwrap().mass).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_unmatched_keeps_literal() -> Result<(), ModificationCatalogError> {
        let catalog = catalog()?;
        let resolver = MassShiftSymbolResolver::new(&catalog, DEFAULT_MASS_MATCH_TOLERANCE, Default::default());
        let resolved = resolver.resolve("+114.043", TerminalContext::Internal, Some('K'));
        assert!(!resolved.success());
        assert_eq!(resolved.symbols, "+114.043");
        assert_eq!(resolved.unmatched, 1);
        assert!((resolved.mass - 114.043).abs() < 1e-9);

        let resolved = resolver.resolve("+15.995+114.043", TerminalContext::Internal, Some('M'));
        assert!(resolved.success());
        assert_eq!(resolved.symbols, "*+114.043");
        assert!((resolved.mass - (15.994915 + 114.043)).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_matched_mass_is_catalog_mass() -> Result<(), ModificationCatalogError> {
        let catalog = catalog()?;
        let resolver = MassShiftSymbolResolver::new(&catalog, DEFAULT_MASS_MATCH_TOLERANCE, Default::default());
        // a coarse annotation still contributes the exact modification mass
        let resolved = resolver.resolve("+42.2", TerminalContext::NTerminal, Some('M'));
        assert_eq!(resolved.symbols, "#");
        assert!((resolved.mass - 42.010565).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_terminal_restriction() -> Result<(), ModificationCatalogError> {
        let catalog = catalog()?;
        let resolver = MassShiftSymbolResolver::new(&catalog, DEFAULT_MASS_MATCH_TOLERANCE, Default::default());
        // the N-terminal acetyl wins at the N-terminus even on a lysine
        let n_term = resolver.resolve("+42.011", TerminalContext::NTerminal, Some('K'));
        assert_eq!(n_term.symbols, "#");
        // but internally the lysine-specific entry wins the tie
        let internal = resolver.resolve("+42.011", TerminalContext::Internal, Some('K'));
        assert_eq!(internal.symbols, "@");
        // no N-terminal oxidation, so the restriction is dropped
        let relaxed = resolver.resolve("+15.995", TerminalContext::NTerminal, Some('M'));
        assert_eq!(relaxed.symbols, "*");
        let c_term = resolver.resolve("-0.984", TerminalContext::CTerminal, Some('K'));
        assert_eq!(c_term.symbols, "!");
        Ok(())
    }

    #[test]
    fn test_static_tie_break() -> Result<(), ModificationCatalogError> {
        let catalog = ModificationCatalog::new(vec![
            ModificationDefinition::new("Carbamidomethyl", 57.021464, "C", ModificationClass::StaticMod, None),
            ModificationDefinition::new("Carbamidomethyl", 57.021464, "C", ModificationClass::DynamicMod, Some('%')),
        ])?;
        let resolver = MassShiftSymbolResolver::new(&catalog, DEFAULT_MASS_MATCH_TOLERANCE, StaticDynamicTieBreak::PreferDynamic);
        let resolved = resolver.resolve("+57.021", TerminalContext::Internal, Some('C'));
        assert_eq!(resolved.symbols, "%");
        assert_eq!(resolved.static_matches, 0);

        let resolver = MassShiftSymbolResolver::new(&catalog, DEFAULT_MASS_MATCH_TOLERANCE, StaticDynamicTieBreak::PreferStatic);
        let resolved = resolver.resolve("+57.021", TerminalContext::Internal, Some('C'));
        assert_eq!(resolved.symbols, "");
        assert_eq!(resolved.static_matches, 1);
        assert!(resolved.success());
        Ok(())
    }
}
