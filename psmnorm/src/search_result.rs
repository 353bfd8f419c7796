use crate::annotation::normalize_flanking_residue;
use crate::cleavage::CleavageState;
use crate::delta_mass::DeltaMass;

/// A single peptide-spectrum match after normalization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    /// Assigned after the final sort of an output view
    pub result_id: u32,
    pub scan: u32,
    pub frag_method: String,
    pub spectrum_index: String,
    pub charge: i32,
    pub precursor_mz: f64,
    /// The peptide exactly as the engine wrote it
    pub raw_peptide: String,
    /// The canonical peptide with flanking residues, `K.PEP#TIDE.L`
    pub peptide: String,
    /// The canonical peptide without flanking residues
    pub peptide_core: String,
    pub clean_sequence: String,
    pub protein: String,
    pub primary_score: f64,
    pub primary_score_text: String,
    pub secondary_score: f64,
    pub secondary_score_text: String,
    /// Neutral monoisotopic mass including all modifications
    pub monoisotopic_mass: f64,
    pub mh: f64,
    pub delta_mass: DeltaMass,
    pub cleavage_state: CleavageState,
    pub rank: u32,
    pub q_value: Option<String>,
    pub pep_q_value: Option<String>,
    pub ims_scan: Option<String>,
    pub ims_drift_time: Option<String>,
    pub isotope_error: Option<String>,
    /// Catalog indices of every modification on the peptide
    pub modifications: Vec<usize>,
}

impl SearchResult {
    pub fn ntt(&self) -> u8 {
        self.cleavage_state.conforming_termini()
    }

    /// Whether two results belong to the same scan and charge, and so are ranked together
    pub fn same_spectrum(&self, other: &Self) -> bool {
        self.scan == other.scan && self.charge == other.charge
    }
}

/// A protein accession from a protein list, with the residues around the peptide if given
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProteinHit {
    pub name: String,
    pub prefix: Option<char>,
    pub suffix: Option<char>,
}

fn parse_flanking(annotation: &str) -> (Option<char>, Option<char>) {
    let mut prefix = None;
    let mut suffix = None;
    for part in annotation.split(',') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        let value = value.trim().chars().next().map(normalize_flanking_residue);
        match key.trim() {
            "pre" => prefix = value,
            "post" => suffix = value,
            _ => {}
        }
    }
    (prefix, suffix)
}

/// Split a `;` separated protein list. Entries may carry `(pre=X,post=Y)` flanking annotations.
///
/// An empty list yields a single unnamed hit so that the peptide is still reported.
pub fn split_protein_list(text: &str) -> Vec<ProteinHit> {
    let mut hits: Vec<ProteinHit> = text
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| match entry.rfind("(pre=") {
            Some(start) if entry.ends_with(')') => {
                let (prefix, suffix) = parse_flanking(&entry[start + 1..entry.len() - 1]);
                ProteinHit {
                    name: entry[..start].trim().to_string(),
                    prefix,
                    suffix,
                }
            }
            _ => ProteinHit {
                name: entry.to_string(),
                ..Default::default()
            },
        })
        .collect();
    if hits.is_empty() {
        hits.push(ProteinHit::default());
    }
    hits
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_split_protein_list() {
        let hits = split_protein_list("sp|P12345|ALBU(pre=K,post=L);XXX_sp|Q99999|FAKE(pre=_,post=A)");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].name, "sp|P12345|ALBU");
        assert_eq!(hits[0].prefix, Some('K'));
        assert_eq!(hits[0].suffix, Some('L'));
        assert_eq!(hits[1].name, "XXX_sp|Q99999|FAKE");
        assert_eq!(hits[1].prefix, Some('-'));

        let plain = split_protein_list("Prot1");
        assert_eq!(plain, vec![ProteinHit { name: "Prot1".into(), prefix: None, suffix: None }]);

        let empty = split_protein_list("");
        assert_eq!(empty.len(), 1);
        assert!(empty[0].name.is_empty());
    }
}
