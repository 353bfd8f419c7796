/*! Tab-delimited writers for the output views and auxiliary files */
use std::io;
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, WriterBuilder};

use crate::columns::{ColumnMap, PsmField};
use crate::modification::{ModificationCatalog, ModificationUsage};
use crate::scan_group::ScanGroupEntry;
use crate::search_result::SearchResult;

pub const CORE_COLUMNS: &[&str] = &[
    "ResultID",
    "Scan",
    "FragMethod",
    "SpecIndex",
    "Charge",
    "PrecursorMZ",
    "DelM",
    "DelM_PPM",
    "MH",
    "Peptide",
    "Protein",
    "NTT",
    "SpecEValue",
    "EValue",
    "Rank_SpecEValue",
];

/// Columns that are written only when the input file had them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionalColumn {
    QValue,
    PepQValue,
    ImsScan,
    ImsDriftTime,
    IsotopeError,
}

impl OptionalColumn {
    pub const ALL: [Self; 5] = [
        Self::QValue,
        Self::PepQValue,
        Self::ImsScan,
        Self::ImsDriftTime,
        Self::IsotopeError,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            Self::QValue => "QValue",
            Self::PepQValue => "PepQValue",
            Self::ImsScan => "IMS_Scan",
            Self::ImsDriftTime => "IMS_Drift_Time",
            Self::IsotopeError => "IsotopeError",
        }
    }

    pub fn source_field(&self) -> PsmField {
        match self {
            Self::QValue => PsmField::QValue,
            Self::PepQValue => PsmField::PepQValue,
            Self::ImsScan => PsmField::ImsScan,
            Self::ImsDriftTime => PsmField::ImsDriftTime,
            Self::IsotopeError => PsmField::IsotopeError,
        }
    }

    fn value<'a>(&self, result: &'a SearchResult) -> &'a str {
        let value = match self {
            Self::QValue => &result.q_value,
            Self::PepQValue => &result.pep_q_value,
            Self::ImsScan => &result.ims_scan,
            Self::ImsDriftTime => &result.ims_drift_time,
            Self::IsotopeError => &result.isotope_error,
        };
        value.as_deref().unwrap_or_default()
    }
}

/// The column layout of the result files, fixed for a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputColumns {
    optional: Vec<OptionalColumn>,
}

impl OutputColumns {
    pub fn from_columns(columns: &ColumnMap) -> Self {
        Self {
            optional: OptionalColumn::ALL
                .into_iter()
                .filter(|c| columns.has(c.source_field()))
                .collect(),
        }
    }

    pub fn header(&self) -> Vec<&'static str> {
        CORE_COLUMNS
            .iter()
            .copied()
            .chain(self.optional.iter().map(|c| c.header()))
            .collect()
    }

    fn record(&self, result: &SearchResult) -> Vec<String> {
        let mut record = vec![
            result.result_id.to_string(),
            result.scan.to_string(),
            result.frag_method.clone(),
            result.spectrum_index.clone(),
            result.charge.to_string(),
            format!("{:.5}", result.precursor_mz),
            format!("{:.5}", result.delta_mass.da),
            format!("{:.4}", result.delta_mass.ppm),
            format!("{:.6}", result.mh),
            result.peptide.clone(),
            result.protein.clone(),
            result.ntt().to_string(),
            score_text(&result.primary_score_text, result.primary_score),
            score_text(&result.secondary_score_text, result.secondary_score),
            result.rank.to_string(),
        ];
        record.extend(self.optional.iter().map(|c| c.value(result).to_string()));
        record
    }
}

fn score_text(text: &str, value: f64) -> String {
    if text.is_empty() {
        value.to_string()
    } else {
        text.to_string()
    }
}

fn tsv_writer<W: io::Write>(inner: W) -> csv::Writer<W> {
    WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Never)
        .from_writer(inner)
}

pub struct ResultsWriter<W: io::Write> {
    writer: csv::Writer<W>,
    columns: OutputColumns,
}

impl<W: io::Write> ResultsWriter<W> {
    pub fn new(inner: W, columns: OutputColumns) -> Self {
        Self {
            writer: tsv_writer(inner),
            columns,
        }
    }

    pub fn write_header(&mut self) -> io::Result<()> {
        self.writer.write_record(self.columns.header())?;
        Ok(())
    }

    pub fn write_result(&mut self, result: &SearchResult) -> io::Result<()> {
        self.writer.write_record(self.columns.record(result))?;
        Ok(())
    }

    /// Write the header and every result, then flush
    pub fn write_all(&mut self, results: &[SearchResult]) -> io::Result<()> {
        self.write_header()?;
        for result in results {
            self.write_result(result)?;
        }
        self.writer.flush()
    }
}

pub fn write_scan_groups<W: io::Write>(inner: W, entries: &[ScanGroupEntry]) -> io::Result<()> {
    let mut writer = tsv_writer(inner);
    writer.write_record(["Scan_Group_ID", "Charge", "Scan"])?;
    for entry in entries {
        writer.write_record([
            entry.group_id.to_string(),
            entry.charge.to_string(),
            entry.scan.to_string(),
        ])?;
    }
    writer.flush()
}

pub fn write_modification_summary<W: io::Write>(
    inner: W,
    catalog: &ModificationCatalog,
    usage: &ModificationUsage,
) -> io::Result<()> {
    let mut writer = tsv_writer(inner);
    writer.write_record([
        "Modification_Symbol",
        "Modification_Mass",
        "Target_Residues",
        "Modification_Type",
        "Occurrence_Count",
    ])?;
    for (i, def) in catalog.iter().enumerate() {
        writer.write_record([
            def.visible_symbol().unwrap_or('-').to_string(),
            format!("{:.6}", def.mass),
            def.target_residues.clone(),
            def.class.code().to_string(),
            usage.count(i).to_string(),
        ])?;
    }
    writer.flush()
}

/// The file name of `path` without `.gz` and one further extension
pub fn input_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    match name.rfind('.') {
        Some(i) if i > 0 => name[..i].to_string(),
        _ => name.to_string(),
    }
}

/// Where the outputs for one input file are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub synopsis: PathBuf,
    pub first_hits: PathBuf,
    pub scan_groups: PathBuf,
    pub modification_summary: PathBuf,
}

impl OutputPaths {
    pub fn new(input: &Path, output_directory: &Path) -> Self {
        let stem = input_stem(input);
        Self {
            synopsis: output_directory.join(format!("{stem}_syn.txt")),
            first_hits: output_directory.join(format!("{stem}_fht.txt")),
            scan_groups: output_directory.join(format!("{stem}_ScanGroupInfo.txt")),
            modification_summary: output_directory.join(format!("{stem}_ModSummary.txt")),
        }
    }
}
