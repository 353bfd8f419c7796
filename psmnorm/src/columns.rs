/*!
Header driven column mapping.

Each engine variant declares a schema of canonical fields, whether they are
required, and the header names that may stand for them. A [`ColumnMap`] is
resolved once per file from its header line.
*/
use std::collections::HashMap;
use std::fmt::Display;

use csv::StringRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PsmField {
    SpecFile,
    SpecIndex,
    Scan,
    FragMethod,
    PrecursorMz,
    IsotopeError,
    PrecursorErrorDa,
    PrecursorErrorPpm,
    Charge,
    Peptide,
    Protein,
    DeNovoScore,
    MsgfScore,
    /// The spectrum level score used for ranking, lower is better
    PrimaryScore,
    /// The database level score, lower is better
    SecondaryScore,
    QValue,
    PepQValue,
    ImsScan,
    ImsDriftTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub field: PsmField,
    pub required: bool,
    pub synonyms: &'static [&'static str],
}

const fn required(field: PsmField, synonyms: &'static [&'static str]) -> ColumnSpec {
    ColumnSpec {
        field,
        required: true,
        synonyms,
    }
}

const fn optional(field: PsmField, synonyms: &'static [&'static str]) -> ColumnSpec {
    ColumnSpec {
        field,
        required: false,
        synonyms,
    }
}

const MSGFPLUS_SCHEMA: &[ColumnSpec] = &[
    optional(PsmField::SpecFile, &["#SpecFile", "SpecFile"]),
    optional(PsmField::SpecIndex, &["SpecID", "SpecIndex"]),
    required(PsmField::Scan, &["ScanNum", "Scan#", "Scan"]),
    optional(PsmField::FragMethod, &["FragMethod"]),
    required(PsmField::PrecursorMz, &["Precursor", "PrecursorMZ"]),
    optional(PsmField::IsotopeError, &["IsotopeError"]),
    optional(PsmField::PrecursorErrorPpm, &["PrecursorError(ppm)"]),
    optional(PsmField::PrecursorErrorDa, &["PrecursorError(Da)"]),
    required(PsmField::Charge, &["Charge"]),
    required(PsmField::Peptide, &["Peptide"]),
    required(PsmField::Protein, &["Protein"]),
    optional(PsmField::DeNovoScore, &["DeNovoScore"]),
    optional(PsmField::MsgfScore, &["MSGFScore"]),
    required(PsmField::PrimaryScore, &["SpecEValue", "MSGFDB_SpecEValue"]),
    optional(PsmField::SecondaryScore, &["EValue"]),
    optional(PsmField::QValue, &["QValue"]),
    optional(PsmField::PepQValue, &["PepQValue"]),
    optional(PsmField::ImsScan, &["IMS_Scan", "IMSScan"]),
    optional(PsmField::ImsDriftTime, &["IMS_Drift_Time", "IMSDriftTime"]),
];

const MSGFDB_SCHEMA: &[ColumnSpec] = &[
    optional(PsmField::SpecFile, &["#SpecFile", "SpecFile"]),
    optional(PsmField::SpecIndex, &["SpecIndex", "SpecID"]),
    required(PsmField::Scan, &["Scan#", "ScanNum", "Scan"]),
    optional(PsmField::FragMethod, &["FragMethod"]),
    required(PsmField::PrecursorMz, &["Precursor", "PrecursorMZ"]),
    optional(PsmField::PrecursorErrorPpm, &["PMError(ppm)"]),
    optional(PsmField::PrecursorErrorDa, &["PMError(Da)"]),
    required(PsmField::Charge, &["Charge"]),
    required(PsmField::Peptide, &["Peptide"]),
    required(PsmField::Protein, &["Protein"]),
    optional(PsmField::DeNovoScore, &["DeNovoScore"]),
    optional(PsmField::MsgfScore, &["MSGFScore"]),
    required(PsmField::PrimaryScore, &["SpecProb"]),
    optional(PsmField::SecondaryScore, &["P-value", "PValue"]),
    optional(PsmField::QValue, &["FDR", "EFDR"]),
    optional(PsmField::PepQValue, &["PepFDR"]),
];

/// The search engine output dialect of an input file
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineVariant {
    #[default]
    MsgfPlus,
    MsgfDb,
}

impl EngineVariant {
    pub fn schema(&self) -> &'static [ColumnSpec] {
        match self {
            Self::MsgfPlus => MSGFPLUS_SCHEMA,
            Self::MsgfDb => MSGFDB_SCHEMA,
        }
    }

    /// Whether the engine writes static modification masses into its peptides
    pub fn prints_static_mod_masses(&self) -> bool {
        match self {
            Self::MsgfPlus => true,
            Self::MsgfDb => false,
        }
    }
}

impl Display for EngineVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MsgfPlus => f.write_str("MS-GF+"),
            Self::MsgfDb => f.write_str("MSGFDB"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("The input is empty, no header line was found")]
    EmptyInput,
    #[error("The header is missing required columns: {}", .0.join(", "))]
    MissingRequiredColumns(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    indices: HashMap<PsmField, usize>,
    required_width: usize,
}

impl ColumnMap {
    /// Resolve the header names of a file against `variant`'s schema, ignoring case.
    pub fn from_header<'a>(
        header: impl IntoIterator<Item = &'a str>,
        variant: EngineVariant,
    ) -> Result<Self, HeaderError> {
        let schema = variant.schema();
        let mut indices = HashMap::new();
        let mut n_columns = 0;
        for (i, name) in header.into_iter().enumerate() {
            n_columns += 1;
            let name = name.trim();
            let spec = schema
                .iter()
                .find(|spec| spec.synonyms.iter().any(|s| s.eq_ignore_ascii_case(name)));
            match spec {
                Some(spec) => {
                    indices.entry(spec.field).or_insert(i);
                }
                None if name.is_empty() => {}
                None => warn!("Ignoring unrecognized {variant} column \"{name}\""),
            }
        }
        if n_columns == 0 {
            return Err(HeaderError::EmptyInput);
        }

        let mut missing: Vec<String> = schema
            .iter()
            .filter(|spec| spec.required && !indices.contains_key(&spec.field))
            .map(|spec| spec.synonyms[0].to_string())
            .collect();
        if !indices.contains_key(&PsmField::PrecursorErrorPpm)
            && !indices.contains_key(&PsmField::PrecursorErrorDa)
        {
            let names: Vec<&str> = schema
                .iter()
                .filter(|spec| {
                    matches!(spec.field, PsmField::PrecursorErrorPpm | PsmField::PrecursorErrorDa)
                })
                .map(|spec| spec.synonyms[0])
                .collect();
            missing.push(names.join(" or "));
        }
        if !missing.is_empty() {
            return Err(HeaderError::MissingRequiredColumns(missing));
        }
        let precursor_error = indices
            .get(&PsmField::PrecursorErrorPpm)
            .or_else(|| indices.get(&PsmField::PrecursorErrorDa))
            .copied();
        let required_width = schema
            .iter()
            .filter(|spec| spec.required)
            .filter_map(|spec| indices.get(&spec.field).copied())
            .chain(precursor_error)
            .max()
            .map(|i| i + 1)
            .unwrap_or_default();
        debug!("Mapped {} of {n_columns} columns", indices.len());
        Ok(Self {
            indices,
            required_width,
        })
    }

    pub fn index(&self, field: PsmField) -> Option<usize> {
        self.indices.get(&field).copied()
    }

    pub fn has(&self, field: PsmField) -> bool {
        self.indices.contains_key(&field)
    }

    /// The trimmed value of `field` in `record`, or an empty string if the column is
    /// absent or the record is short
    pub fn get<'r>(&self, record: &'r StringRecord, field: PsmField) -> &'r str {
        self.index(field)
            .and_then(|i| record.get(i))
            .map(str::trim)
            .unwrap_or_default()
    }

    /// Like [`ColumnMap::get`], but `None` when the column does not exist in the file
    pub fn get_optional(&self, record: &StringRecord, field: PsmField) -> Option<String> {
        self.index(field)
            .map(|i| record.get(i).map(str::trim).unwrap_or_default().to_string())
    }

    /// The number of columns a record must have to hold every required field.
    /// Trailing optional columns may be missing.
    pub fn min_width(&self) -> usize {
        self.required_width
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const MSGFPLUS_HEADER: &str = "#SpecFile\tSpecID\tScanNum\tFragMethod\tPrecursor\tIsotopeError\tPrecursorError(ppm)\tCharge\tPeptide\tProtein\tDeNovoScore\tMSGFScore\tSpecEValue\tEValue\tQValue\tPepQValue";

    #[test_log::test]
    fn test_msgfplus_header() -> Result<(), HeaderError> {
        let columns = ColumnMap::from_header(MSGFPLUS_HEADER.split('\t'), EngineVariant::MsgfPlus)?;
        assert_eq!(columns.index(PsmField::Scan), Some(2));
        assert_eq!(columns.index(PsmField::PrimaryScore), Some(12));
        assert!(columns.has(PsmField::QValue));
        assert!(!columns.has(PsmField::ImsScan));
        // SpecEValue is the last required column
        assert_eq!(columns.min_width(), 13);

        let record = StringRecord::from(vec!["a.mzML", "index=5", " 1234 "]);
        assert_eq!(columns.get(&record, PsmField::Scan), "1234");
        assert_eq!(columns.get(&record, PsmField::Peptide), "");
        assert_eq!(columns.get_optional(&record, PsmField::ImsScan), None);
        assert_eq!(columns.get_optional(&record, PsmField::QValue), Some(String::new()));
        Ok(())
    }

    #[test_log::test]
    fn test_case_insensitive_and_unknown() -> Result<(), HeaderError> {
        let header = "scan#\tPRECURSOR\tpmerror(da)\tcharge\tpeptide\tprotein\tspecprob\tp-value\tSomethingElse";
        let columns = ColumnMap::from_header(header.split('\t'), EngineVariant::MsgfDb)?;
        assert_eq!(columns.index(PsmField::PrecursorErrorDa), Some(2));
        assert_eq!(columns.index(PsmField::SecondaryScore), Some(7));
        assert_eq!(columns.min_width(), 7);
        Ok(())
    }

    #[test]
    fn test_missing_columns() {
        let err = ColumnMap::from_header("ScanNum\tCharge\tPeptide".split('\t'), EngineVariant::MsgfPlus)
            .unwrap_err();
        match err {
            HeaderError::MissingRequiredColumns(names) => {
                assert!(names.contains(&"Protein".to_string()));
                assert!(names.contains(&"SpecEValue".to_string()));
                assert!(names.contains(&"PrecursorError(ppm) or PrecursorError(Da)".to_string()));
            }
            other => panic!("Unexpected error {other:?}"),
        }
        let err = ColumnMap::from_header(std::iter::empty(), EngineVariant::MsgfPlus).unwrap_err();
        assert_eq!(err, HeaderError::EmptyInput);
    }
}
