/*! Amino acid residue masses, elemental compositions and peptide mass arithmetic */
use std::fmt::Display;
use std::ops::{Add, AddAssign};

use chemical_elements::{neutral_mass, ChemicalComposition, ElementSpecification, PROTON as _PROTON};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The mass of H+, a hydrogen atom minus an electron
pub const PROTON: f64 = _PROTON;

/// The value stored in place of a peptide mass that could not be computed
pub const MASS_SENTINEL: f64 = -1.0;

/// An error that might occur while computing the mass of a peptide sequence
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SequenceMassError {
    #[error("Unrecognized residue symbol '{symbol}' at position {position} of {sequence}")]
    UnrecognizedResidue {
        symbol: char,
        position: usize,
        sequence: String,
    },
    #[error("Isotopic modifications cannot be applied to atom '{0}', only C, H, N, O or S")]
    UnsupportedAffectedAtom(char),
    #[error("Custom residues must use a letter slot A-Z, received '{0}'")]
    InvalidResidueSymbol(char),
    #[error("Positional modification at {position} is outside of a sequence of length {length}")]
    PositionOutOfRange { position: usize, length: usize },
}

/// Element counts for the five elements that make up the standard residues
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct AtomCounts {
    pub c: i32,
    pub h: i32,
    pub n: i32,
    pub o: i32,
    pub s: i32,
}

impl AtomCounts {
    pub const fn new(c: i32, h: i32, n: i32, o: i32, s: i32) -> Self {
        Self { c, h, n, o, s }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, i32)> {
        [
            ("C", self.c),
            ("H", self.h),
            ("N", self.n),
            ("O", self.o),
            ("S", self.s),
        ]
        .into_iter()
    }

    /// The number of atoms of the element denoted by `atom`, if it is one of the tracked elements
    pub fn count_of(&self, atom: char) -> Option<i32> {
        match atom.to_ascii_uppercase() {
            'C' => Some(self.c),
            'H' => Some(self.h),
            'N' => Some(self.n),
            'O' => Some(self.o),
            'S' => Some(self.s),
            _ => None,
        }
    }

    /// The monoisotopic mass of this composition
    pub fn mass(&self) -> f64 {
        let mut composition = ChemicalComposition::new();
        for (symbol, count) in self.iter() {
            if count == 0 {
                continue;
            }
            if let Ok(element) = ElementSpecification::parse(symbol) {
                composition.set(element, count);
            }
        }
        composition.mass()
    }
}

impl Add for AtomCounts {
    type Output = AtomCounts;

    fn add(self, rhs: Self) -> Self::Output {
        let mut dup = self;
        dup += rhs;
        dup
    }
}

impl AddAssign for AtomCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.c += rhs.c;
        self.h += rhs.h;
        self.n += rhs.n;
        self.o += rhs.o;
        self.s += rhs.s;
    }
}

impl Display for AtomCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (symbol, count) in self.iter().filter(|(_, c)| *c != 0) {
            write!(f, "{symbol}{count}")?;
        }
        Ok(())
    }
}

/// A single residue slot in an [`AminoAcidMassTable`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AminoAcidEntry {
    pub symbol: char,
    pub mass: f64,
    pub atoms: AtomCounts,
}

impl AminoAcidEntry {
    pub fn new(symbol: char, mass: f64, atoms: AtomCounts) -> Self {
        Self {
            symbol,
            mass,
            atoms,
        }
    }

    /// Create an entry whose mass is derived from its elemental composition
    pub fn from_composition(symbol: char, atoms: AtomCounts) -> Self {
        Self::new(symbol, atoms.mass(), atoms)
    }

    /// The entry that unrecognized symbols resolve to
    pub const fn zero(symbol: char) -> Self {
        Self {
            symbol,
            mass: 0.0,
            atoms: AtomCounts::new(0, 0, 0, 0, 0),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.mass == 0.0 && self.atoms == AtomCounts::default()
    }
}

/// A mass added at a specific residue index, independent of the residue identity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionalModification {
    /// Zero-based residue index
    pub position: usize,
    pub mass: f64,
}

impl PositionalModification {
    pub fn new(position: usize, mass: f64) -> Self {
        Self { position, mass }
    }
}

/// A per-atom mass shift, such as uniform <sup>15</sup>N labeling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsotopicModification {
    pub affected_atom: char,
    pub mass_shift: f64,
}

impl IsotopicModification {
    pub fn new(affected_atom: char, mass_shift: f64) -> Self {
        Self {
            affected_atom,
            mass_shift,
        }
    }
}

fn slot(symbol: char) -> Option<usize> {
    if symbol.is_ascii_alphabetic() {
        Some((symbol.to_ascii_uppercase() as u8 - b'A') as usize)
    } else {
        None
    }
}

/// Monoisotopic masses and compositions for the 26 residue letter slots, plus
/// the peptide terminal groups.
#[derive(Debug, Clone, PartialEq)]
pub struct AminoAcidMassTable {
    residues: [AminoAcidEntry; 26],
    n_terminus: AtomCounts,
    c_terminus: AtomCounts,
    n_terminus_mass: f64,
    c_terminus_mass: f64,
}

impl Default for AminoAcidMassTable {
    fn default() -> Self {
        Self::new()
    }
}

impl AminoAcidMassTable {
    pub fn new() -> Self {
        let l_atoms = AtomCounts::new(6, 11, 1, 1, 0);
        let n_atoms = AtomCounts::new(4, 6, 2, 2, 0);
        let q_atoms = AtomCounts::new(5, 8, 2, 2, 0);
        let residues = [
            AminoAcidEntry::from_composition('A', AtomCounts::new(3, 5, 1, 1, 0)),
            // Asn or Asp, averaged
            AminoAcidEntry::new('B', 114.534935, n_atoms),
            AminoAcidEntry::from_composition('C', AtomCounts::new(3, 5, 1, 1, 1)),
            AminoAcidEntry::from_composition('D', AtomCounts::new(4, 5, 1, 3, 0)),
            AminoAcidEntry::from_composition('E', AtomCounts::new(5, 7, 1, 3, 0)),
            AminoAcidEntry::from_composition('F', AtomCounts::new(9, 9, 1, 1, 0)),
            AminoAcidEntry::from_composition('G', AtomCounts::new(2, 3, 1, 1, 0)),
            AminoAcidEntry::from_composition('H', AtomCounts::new(6, 7, 3, 1, 0)),
            AminoAcidEntry::from_composition('I', l_atoms),
            AminoAcidEntry::from_composition('J', l_atoms),
            AminoAcidEntry::from_composition('K', AtomCounts::new(6, 12, 2, 1, 0)),
            AminoAcidEntry::from_composition('L', l_atoms),
            AminoAcidEntry::from_composition('M', AtomCounts::new(5, 9, 1, 1, 1)),
            AminoAcidEntry::from_composition('N', n_atoms),
            // Ornithine
            AminoAcidEntry::from_composition('O', AtomCounts::new(5, 10, 2, 1, 0)),
            AminoAcidEntry::from_composition('P', AtomCounts::new(5, 7, 1, 1, 0)),
            AminoAcidEntry::from_composition('Q', q_atoms),
            AminoAcidEntry::from_composition('R', AtomCounts::new(6, 12, 4, 1, 0)),
            AminoAcidEntry::from_composition('S', AtomCounts::new(3, 5, 1, 2, 0)),
            AminoAcidEntry::from_composition('T', AtomCounts::new(4, 7, 1, 2, 0)),
            // Selenocysteine, selenium is not tracked in the composition
            AminoAcidEntry::new('U', 150.953636, AtomCounts::new(3, 5, 1, 1, 0)),
            AminoAcidEntry::from_composition('V', AtomCounts::new(5, 9, 1, 1, 0)),
            AminoAcidEntry::from_composition('W', AtomCounts::new(11, 10, 2, 1, 0)),
            AminoAcidEntry::from_composition('X', l_atoms),
            AminoAcidEntry::from_composition('Y', AtomCounts::new(9, 9, 1, 2, 0)),
            // Gln or Glu, averaged
            AminoAcidEntry::new('Z', 128.550585, q_atoms),
        ];
        let n_terminus = AtomCounts::new(0, 1, 0, 0, 0);
        let c_terminus = AtomCounts::new(0, 1, 0, 1, 0);
        Self {
            residues,
            n_terminus,
            c_terminus,
            n_terminus_mass: n_terminus.mass(),
            c_terminus_mass: c_terminus.mass(),
        }
    }

    /// Look up the entry for `symbol`. Anything that is not a letter maps to a zero entry.
    pub fn get(&self, symbol: char) -> AminoAcidEntry {
        match slot(symbol) {
            Some(i) => self.residues[i],
            None => AminoAcidEntry::zero(symbol),
        }
    }

    pub fn residue_mass(&self, symbol: char) -> f64 {
        self.get(symbol).mass
    }

    pub fn n_terminus_mass(&self) -> f64 {
        self.n_terminus_mass
    }

    pub fn c_terminus_mass(&self) -> f64 {
        self.c_terminus_mass
    }

    /// Override the mass and composition of a residue letter slot
    pub fn set_residue(
        &mut self,
        symbol: char,
        mass: f64,
        atoms: AtomCounts,
    ) -> Result<(), SequenceMassError> {
        let i = slot(symbol).ok_or(SequenceMassError::InvalidResidueSymbol(symbol))?;
        self.residues[i] = AminoAcidEntry::new(symbol.to_ascii_uppercase(), mass, atoms);
        Ok(())
    }

    /// Compute the neutral monoisotopic mass of an unmodified residue sequence.
    ///
    /// The terminal groups are only included if at least one residue was read.
    pub fn compute_sequence_mass(&self, sequence: &str) -> Result<f64, SequenceMassError> {
        let mut total = 0.0;
        let mut matched = 0usize;
        for (position, symbol) in sequence.chars().enumerate() {
            match slot(symbol) {
                Some(i) => {
                    total += self.residues[i].mass;
                    matched += 1;
                }
                None => {
                    return Err(SequenceMassError::UnrecognizedResidue {
                        symbol,
                        position,
                        sequence: sequence.to_string(),
                    })
                }
            }
        }
        if matched > 0 {
            total += self.n_terminus_mass + self.c_terminus_mass;
        }
        Ok(total)
    }

    /// Count the atoms of the whole peptide, terminal groups included
    pub fn count_atoms(&self, sequence: &str) -> Result<AtomCounts, SequenceMassError> {
        let mut atoms = AtomCounts::default();
        let mut matched = 0usize;
        for (position, symbol) in sequence.chars().enumerate() {
            let i = slot(symbol).ok_or_else(|| SequenceMassError::UnrecognizedResidue {
                symbol,
                position,
                sequence: sequence.to_string(),
            })?;
            atoms += self.residues[i].atoms;
            matched += 1;
        }
        if matched > 0 {
            atoms += self.n_terminus + self.c_terminus;
        }
        Ok(atoms)
    }

    /// Compute the neutral monoisotopic mass of `sequence` with positional modification masses
    /// added directly and isotopic modification shifts scaled by the number of affected atoms.
    pub fn compute_sequence_mass_with_mods(
        &self,
        sequence: &str,
        positional: &[PositionalModification],
        isotopic: &[IsotopicModification],
    ) -> Result<f64, SequenceMassError> {
        let mut mass = self.compute_sequence_mass(sequence)?;
        let length = sequence.chars().count();
        for modification in positional {
            if modification.position >= length {
                return Err(SequenceMassError::PositionOutOfRange {
                    position: modification.position,
                    length,
                });
            }
            mass += modification.mass;
        }
        if !isotopic.is_empty() {
            let atoms = self.count_atoms(sequence)?;
            for modification in isotopic {
                let count = atoms
                    .count_of(modification.affected_atom)
                    .ok_or(SequenceMassError::UnsupportedAffectedAtom(
                        modification.affected_atom,
                    ))?;
                mass += modification.mass_shift * count as f64;
            }
        }
        Ok(mass)
    }

    /// Convert between charge states, see [`convolute`]
    pub fn convolute(&self, mass_or_mz: f64, from_charge: i32, to_charge: i32) -> f64 {
        convolute(mass_or_mz, from_charge, to_charge)
    }
}

/// Convert a mass or m/z from one charge state to another.
///
/// A `from_charge` of 0 means the input is already a neutral mass, and a `to_charge`
/// of 0 requests a neutral mass.
pub fn convolute(mass_or_mz: f64, from_charge: i32, to_charge: i32) -> f64 {
    if from_charge == to_charge {
        return mass_or_mz;
    }
    let neutral = if from_charge == 0 {
        mass_or_mz
    } else {
        neutral_mass(mass_or_mz, from_charge, PROTON)
    };
    if to_charge == 0 {
        neutral
    } else {
        let z = to_charge as f64;
        (neutral + PROTON * z) / z
    }
}

/// The M+H of a neutral mass
pub fn mh_from_neutral(mass: f64) -> f64 {
    convolute(mass, 0, 1)
}
