use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::amino_acid::SequenceMassError;
use crate::columns::HeaderError;
use crate::modification::ModificationCatalogError;
use crate::scan_group::ScanGroupError;

/// Failures that stop a whole run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to read input {}: {source}", .path.display())]
    InputRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to create output {}: {source}", .path.display())]
    OutputCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed modification definition: {0}")]
    MalformedModificationDefinition(#[from] ModificationCatalogError),
    #[error("Invalid custom residue: {0}")]
    InvalidCustomResidue(#[from] SequenceMassError),
    #[error("{} is missing required columns: {}", .path.display(), .columns.join(", "))]
    MissingRequiredColumns { path: PathBuf, columns: Vec<String> },
    #[error("{} is empty", .0.display())]
    EmptyInput(PathBuf),
    #[error("Processing was aborted after {0} lines")]
    Aborted(usize),
}

impl PipelineError {
    pub(crate) fn from_header(path: PathBuf, err: HeaderError) -> Self {
        match err {
            HeaderError::EmptyInput => Self::EmptyInput(path),
            HeaderError::MissingRequiredColumns(columns) => {
                Self::MissingRequiredColumns { path, columns }
            }
        }
    }
}

/// Failures that only discard the line they occur on
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LineError {
    #[error("expected at least {expected} columns, found {found}")]
    TooFewColumns { expected: usize, found: usize },
    #[error("no peptide")]
    EmptyPeptide,
    #[error("peptide {0} contains characters outside of ASCII")]
    NonAsciiPeptide(String),
    #[error(transparent)]
    SequenceMass(#[from] SequenceMassError),
    #[error(transparent)]
    ScanGroup(#[from] ScanGroupError),
    #[error("{0}")]
    Malformed(String),
}

/// Collects per-line error messages up to a character budget.
///
/// Once a message does not fit, it and every later message are only counted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundedErrorLog {
    budget: usize,
    used: usize,
    messages: Vec<String>,
    dropped: usize,
}

impl BoundedErrorLog {
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            ..Default::default()
        }
    }

    /// Record a message, returning whether it was kept
    pub fn push(&mut self, message: impl Into<String>) -> bool {
        let message = message.into();
        if self.dropped > 0 || self.used + message.len() > self.budget {
            self.dropped += 1;
            return false;
        }
        self.used += message.len();
        self.messages.push(message);
        true
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.messages.len() + self.dropped
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_budget() {
        let mut log = BoundedErrorLog::new(20);
        assert!(log.push("0123456789"));
        assert!(log.push("0123456789"));
        assert!(!log.push("x"));
        assert!(!log.push("y"));
        assert_eq!(log.messages().len(), 2);
        assert_eq!(log.dropped(), 2);
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn test_budget_stays_closed() {
        let mut log = BoundedErrorLog::new(15);
        assert!(log.push("0123456789"));
        assert!(!log.push("0123456789"));
        // would fit in the remaining budget, but the log is already full
        assert!(!log.push("abc"));
        assert_eq!(log.messages().len(), 1);
        assert_eq!(log.dropped(), 2);
    }

    #[test]
    fn test_header_error_conversion() {
        let err = PipelineError::from_header(
            "a.tsv".into(),
            HeaderError::MissingRequiredColumns(vec!["Peptide".into()]),
        );
        assert_eq!(err.to_string(), "a.tsv is missing required columns: Peptide");
        assert!(matches!(
            PipelineError::from_header("a.tsv".into(), HeaderError::EmptyInput),
            PipelineError::EmptyInput(_)
        ));
    }
}
