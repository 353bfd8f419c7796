/*!
Rewriting of engine peptide annotations into the canonical `P.SEQ#UENCE.S` notation.

Engines write modifications as signed masses inline with the sequence, e.g.
`K.+42.011MDHT+79.966PQSQLK.L`. Each run of masses is handed to a
[`MassShiftSymbolResolver`], static modification masses are folded in where the
engine leaves them implicit, and the flanking residues are normalized so that a
protein terminus is always written as `-`.
*/
use crate::mass_shift::{numeric_run_length, MassShiftSymbolResolver, ResolvedMassShifts, TerminalContext};
use crate::modification::{
    ModificationCatalog, ModificationClass, C_TERMINAL_PEPTIDE_SYMBOL, C_TERMINAL_PROTEIN_SYMBOL,
    N_TERMINAL_PEPTIDE_SYMBOL, N_TERMINAL_PROTEIN_SYMBOL,
};

/// The canonical flanking residue written for a protein terminus
pub const PROTEIN_TERMINUS_SYMBOL: char = '-';

/// Map engine specific terminus markers onto [`PROTEIN_TERMINUS_SYMBOL`]
pub fn normalize_flanking_residue(residue: char) -> char {
    match residue {
        '_' | '-' => PROTEIN_TERMINUS_SYMBOL,
        c => c,
    }
}

/// Split `K.PEPTIDE.L` into its flanking residues and core.
///
/// Either flank may be missing, in which case the corresponding side of the
/// core is left untouched.
pub fn split_flanking(peptide: &str) -> (Option<char>, &str, Option<char>) {
    let mut core = peptide.trim();
    let mut prefix = None;
    let mut suffix = None;
    let bytes = core.as_bytes();
    if bytes.len() >= 3 && bytes[1] == b'.' && !(bytes[0].is_ascii_digit() || bytes[0] == b'+') {
        prefix = Some(normalize_flanking_residue(bytes[0] as char));
        core = &core[2..];
    }
    let bytes = core.as_bytes();
    let n = bytes.len();
    if n >= 3 && bytes[n - 2] == b'.' && !bytes[n - 1].is_ascii_digit() {
        suffix = Some(normalize_flanking_residue(bytes[n - 1] as char));
        core = &core[..n - 2];
    }
    (prefix, core, suffix)
}

/// A peptide after its mass annotations have been rewritten
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewrittenPeptide {
    pub prefix: Option<char>,
    pub suffix: Option<char>,
    /// The residues with modification symbols, without flanking residues
    pub annotated: String,
    /// The residues alone, upper case
    pub clean_sequence: String,
    /// The total mass of every modification, resolved, unresolved and implicit static
    pub modification_mass: f64,
    /// Catalog indices of the resolved and implicit static modifications
    pub modifications: Vec<usize>,
    pub unresolved_tokens: usize,
}

impl RewrittenPeptide {
    /// The same peptide with different flanking residues, as when a peptide is found in several proteins
    pub fn with_flanking(&self, prefix: Option<char>, suffix: Option<char>) -> Self {
        Self {
            prefix,
            suffix,
            ..self.clone()
        }
    }

    pub fn full_sequence(&self) -> String {
        let mut buf = String::with_capacity(self.annotated.len() + 4);
        if let Some(prefix) = self.prefix {
            buf.push(prefix);
            buf.push('.');
        }
        buf.push_str(&self.annotated);
        if let Some(suffix) = self.suffix {
            buf.push('.');
            buf.push(suffix);
        }
        buf
    }

    fn absorb(&mut self, resolved: ResolvedMassShifts) -> String {
        self.modification_mass += resolved.mass;
        self.modifications.extend(resolved.modifications);
        self.unresolved_tokens += resolved.unmatched;
        resolved.symbols
    }
}

#[derive(Debug, Clone)]
pub struct PeptideAnnotationRewriter<'a> {
    resolver: MassShiftSymbolResolver<'a>,
    catalog: &'a ModificationCatalog,
    fold_static: bool,
}

impl<'a> PeptideAnnotationRewriter<'a> {
    /// Create a rewriter. `fold_static` should be set when the engine does not write
    /// static modification masses into its peptides.
    pub fn new(resolver: MassShiftSymbolResolver<'a>, fold_static: bool) -> Self {
        let catalog = resolver.catalog();
        Self {
            resolver,
            catalog,
            fold_static,
        }
    }

    pub fn rewrite(&self, peptide: &str) -> RewrittenPeptide {
        let (prefix, core, suffix) = split_flanking(peptide);
        let mut rewritten = RewrittenPeptide {
            prefix,
            suffix,
            ..Default::default()
        };
        let residue_count = core.bytes().filter(|b| b.is_ascii_alphabetic()).count();

        let mut pending_n_term = String::new();
        let mut i = numeric_run_length(core);
        if i > 0 {
            let first_residue = core[i..].chars().find(|c| c.is_ascii_alphabetic());
            let resolved = self
                .resolver
                .resolve(&core[..i], TerminalContext::NTerminal, first_residue);
            pending_n_term = rewritten.absorb(resolved);
        }

        let mut residues_seen = 0;
        let mut last_residue = None;
        while let Some(c) = core[i..].chars().next() {
            if c.is_ascii_alphabetic() {
                rewritten.annotated.push(c);
                rewritten.clean_sequence.push(c.to_ascii_uppercase());
                if self.fold_static {
                    self.fold_static_modifications(
                        &mut rewritten,
                        c.to_ascii_uppercase(),
                        residues_seen,
                        residue_count,
                    );
                }
                residues_seen += 1;
                last_residue = Some(c.to_ascii_uppercase());
                if residues_seen == 1 && !pending_n_term.is_empty() {
                    rewritten.annotated.push_str(&pending_n_term);
                    pending_n_term.clear();
                }
                i += 1;
                continue;
            }
            let run = numeric_run_length(&core[i..]);
            if run > 0 {
                let context = if residues_seen == residue_count {
                    TerminalContext::CTerminal
                } else {
                    TerminalContext::Internal
                };
                let resolved = self.resolver.resolve(&core[i..i + run], context, last_residue);
                let symbols = rewritten.absorb(resolved);
                rewritten.annotated.push_str(&symbols);
                i += run;
            } else {
                // an existing symbol is carried over as is
                rewritten.annotated.push(c);
                i += c.len_utf8();
            }
        }
        rewritten.annotated.push_str(&pending_n_term);
        rewritten
    }

    fn fold_static_modifications(
        &self,
        rewritten: &mut RewrittenPeptide,
        residue: char,
        position: usize,
        residue_count: usize,
    ) {
        let is_first = position == 0;
        let is_last = position + 1 == residue_count;
        let at_protein_n_term = rewritten.prefix == Some(PROTEIN_TERMINUS_SYMBOL);
        let at_protein_c_term = rewritten.suffix == Some(PROTEIN_TERMINUS_SYMBOL);
        for (index, def) in self.catalog.iter().enumerate() {
            let applies = match def.class {
                ModificationClass::StaticMod => def.targets(residue),
                ModificationClass::TermPeptideStaticMod => {
                    (is_first && def.target_residues.contains(N_TERMINAL_PEPTIDE_SYMBOL))
                        || (is_last && def.target_residues.contains(C_TERMINAL_PEPTIDE_SYMBOL))
                }
                ModificationClass::TermProteinStaticMod => {
                    (is_first
                        && at_protein_n_term
                        && def.target_residues.contains(N_TERMINAL_PROTEIN_SYMBOL))
                        || (is_last
                            && at_protein_c_term
                            && def.target_residues.contains(C_TERMINAL_PROTEIN_SYMBOL))
                }
                _ => false,
            };
            if applies {
                rewritten.modification_mass += def.mass;
                rewritten.modifications.push(index);
            }
        }
    }
}
