use serde::{Deserialize, Serialize};

use crate::annotation::PROTEIN_TERMINUS_SYMBOL;

/// How many of a peptide's termini agree with the digestion rule
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CleavageState {
    #[default]
    NonSpecific,
    Partial,
    Full,
}

impl CleavageState {
    pub fn from_conforming_termini(count: u8) -> Self {
        match count {
            0 => Self::NonSpecific,
            1 => Self::Partial,
            _ => Self::Full,
        }
    }

    /// The NTT value, the number of tryptic termini
    pub fn conforming_termini(&self) -> u8 {
        match self {
            Self::NonSpecific => 0,
            Self::Partial => 1,
            Self::Full => 2,
        }
    }
}

/// A single-residue digestion rule: cleave after any of `cleavage_residues` unless
/// the next residue is one of `exception_residues`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleavageRule {
    pub cleavage_residues: String,
    #[serde(default)]
    pub exception_residues: String,
}

impl Default for CleavageRule {
    fn default() -> Self {
        Self::trypsin()
    }
}

impl CleavageRule {
    pub fn new(cleavage_residues: impl Into<String>, exception_residues: impl Into<String>) -> Self {
        Self {
            cleavage_residues: cleavage_residues.into(),
            exception_residues: exception_residues.into(),
        }
    }

    pub fn trypsin() -> Self {
        Self::new("KR", "P")
    }

    pub fn is_cleavage_site(&self, before: char, after: char) -> bool {
        let before = before.to_ascii_uppercase();
        let after = after.to_ascii_uppercase();
        self.cleavage_residues.contains(before) && !self.exception_residues.contains(after)
    }

    pub fn n_terminus_conforms(&self, prefix: Option<char>, first: char) -> bool {
        match prefix {
            Some(PROTEIN_TERMINUS_SYMBOL) => true,
            Some(prefix) => self.is_cleavage_site(prefix, first),
            None => false,
        }
    }

    pub fn c_terminus_conforms(&self, last: char, suffix: Option<char>) -> bool {
        match suffix {
            Some(PROTEIN_TERMINUS_SYMBOL) => true,
            Some(suffix) => self.is_cleavage_site(last, suffix),
            None => false,
        }
    }

    pub fn cleavage_state(
        &self,
        prefix: Option<char>,
        clean_sequence: &str,
        suffix: Option<char>,
    ) -> CleavageState {
        let (Some(first), Some(last)) = (clean_sequence.chars().next(), clean_sequence.chars().last())
        else {
            return CleavageState::NonSpecific;
        };
        let count = self.n_terminus_conforms(prefix, first) as u8
            + self.c_terminus_conforms(last, suffix) as u8;
        CleavageState::from_conforming_termini(count)
    }
}
