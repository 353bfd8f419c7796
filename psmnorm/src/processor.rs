/*!
The two-pass normalization pipeline.

The first pass reads every line of a result file, expanding merged scans and
multi-protein lines, rewriting peptide annotations, computing masses and
reconciling precursor errors. The second pass ranks the accumulated matches
per spectrum and writes the output views.
*/
use std::fs;
use std::io::{self, prelude::*};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use csv::{ReaderBuilder, StringRecord};
use flate2::read::MultiGzDecoder;
use tracing::{debug, info, warn};

use crate::amino_acid::{mh_from_neutral, AminoAcidMassTable, IsotopicModification};
use crate::annotation::PeptideAnnotationRewriter;
use crate::columns::{ColumnMap, PsmField};
use crate::delta_mass::{DeltaMassCorrector, PrecursorError};
use crate::errors::{BoundedErrorLog, LineError, PipelineError};
use crate::mass_shift::MassShiftSymbolResolver;
use crate::modification::{ModificationCatalog, ModificationUsage};
use crate::params::ProcessingParams;
use crate::progress::ProcessingSummary;
use crate::ranking::{FilteredResults, RankAndFilterEngine};
use crate::scan_group::{ScanGroupEntry, ScanGroupResolver};
use crate::search_result::{split_protein_list, SearchResult};
use crate::writer::{
    write_modification_summary, write_scan_groups, OutputColumns, OutputPaths, ResultsWriter,
};

fn parse_or_default<T: std::str::FromStr + Default>(text: &str) -> T {
    text.trim().parse().unwrap_or_default()
}

/// Open a file for reading, decompressing it if its name ends with `.gz`
pub fn open_input(path: &Path) -> Result<Box<dyn Read>, PipelineError> {
    let handle = fs::File::open(path).map_err(|source| PipelineError::InputRead {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = io::BufReader::new(handle);
    let is_gzip = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));
    if is_gzip {
        Ok(Box::new(MultiGzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

fn create_output(path: &Path) -> Result<io::BufWriter<fs::File>, PipelineError> {
    fs::File::create(path)
        .map(io::BufWriter::new)
        .map_err(|source| PipelineError::OutputCreation {
            path: path.to_path_buf(),
            source,
        })
}

/// Everything the first pass produces
#[derive(Debug)]
pub struct ParsedResults {
    pub results: Vec<SearchResult>,
    pub columns: ColumnMap,
    pub scan_groups: Vec<ScanGroupEntry>,
    pub errors: BoundedErrorLog,
    pub summary: ProcessingSummary,
}

/// The mutable state threaded through the first pass
struct LineParser<'a> {
    columns: &'a ColumnMap,
    mass_table: &'a AminoAcidMassTable,
    isotopic: Vec<IsotopicModification>,
    rewriter: PeptideAnnotationRewriter<'a>,
    corrector: DeltaMassCorrector,
    scan_groups: ScanGroupResolver,
    params: &'a ProcessingParams,
    unresolved_mass_shifts: usize,
}

impl<'a> LineParser<'a> {
    fn parse(&mut self, record: &StringRecord) -> Result<Vec<SearchResult>, LineError> {
        let columns = self.columns;
        let min_width = columns.min_width();
        if record.len() < min_width {
            return Err(LineError::TooFewColumns {
                expected: min_width,
                found: record.len(),
            });
        }
        let raw_peptide = columns.get(record, PsmField::Peptide);
        if raw_peptide.is_empty() {
            return Err(LineError::EmptyPeptide);
        }
        if !raw_peptide.is_ascii() {
            return Err(LineError::NonAsciiPeptide(raw_peptide.to_string()));
        }

        let charge: i32 = parse_or_default(columns.get(record, PsmField::Charge));
        let precursor_mz: f64 = parse_or_default(columns.get(record, PsmField::PrecursorMz));
        let primary_score_text = columns.get(record, PsmField::PrimaryScore);
        let secondary_score_text = columns.get(record, PsmField::SecondaryScore);

        let rewritten = self.rewriter.rewrite(raw_peptide);
        if rewritten.clean_sequence.is_empty() {
            return Err(LineError::Malformed(format!(
                "peptide {raw_peptide} has no residues"
            )));
        }
        self.unresolved_mass_shifts += rewritten.unresolved_tokens;
        let monoisotopic_mass = self.mass_table.compute_sequence_mass_with_mods(
            &rewritten.clean_sequence,
            &[],
            &self.isotopic,
        )? + rewritten.modification_mass;

        let reported = if columns.has(PsmField::PrecursorErrorPpm) {
            PrecursorError::Ppm(parse_or_default(columns.get(record, PsmField::PrecursorErrorPpm)))
        } else {
            PrecursorError::Da(parse_or_default(columns.get(record, PsmField::PrecursorErrorDa)))
        };

        let scan_entries = self.scan_groups.expand(
            columns.get(record, PsmField::Scan),
            columns.get(record, PsmField::SpecIndex),
            columns.get(record, PsmField::FragMethod),
            charge,
        )?;
        let first_scan = scan_entries.first().map(|e| e.scan).unwrap_or_default();
        let delta_mass =
            self.corrector
                .correct(first_scan, reported, precursor_mz, charge, monoisotopic_mass);

        let template = SearchResult {
            charge,
            precursor_mz,
            raw_peptide: raw_peptide.to_string(),
            peptide_core: rewritten.annotated.clone(),
            clean_sequence: rewritten.clean_sequence.clone(),
            primary_score: parse_or_default(primary_score_text),
            primary_score_text: primary_score_text.to_string(),
            secondary_score: parse_or_default(secondary_score_text),
            secondary_score_text: secondary_score_text.to_string(),
            monoisotopic_mass,
            mh: mh_from_neutral(monoisotopic_mass),
            delta_mass,
            q_value: columns.get_optional(record, PsmField::QValue),
            pep_q_value: columns.get_optional(record, PsmField::PepQValue),
            ims_scan: columns.get_optional(record, PsmField::ImsScan),
            ims_drift_time: columns.get_optional(record, PsmField::ImsDriftTime),
            isotope_error: columns.get_optional(record, PsmField::IsotopeError),
            modifications: rewritten.modifications.clone(),
            ..Default::default()
        };

        let proteins = split_protein_list(columns.get(record, PsmField::Protein));
        let mut results = Vec::with_capacity(scan_entries.len() * proteins.len());
        for protein in proteins.iter() {
            let flanked = rewritten.with_flanking(
                protein.prefix.or(rewritten.prefix),
                protein.suffix.or(rewritten.suffix),
            );
            let cleavage_state = self.params.cleavage_rule.cleavage_state(
                flanked.prefix,
                &flanked.clean_sequence,
                flanked.suffix,
            );
            let peptide = flanked.full_sequence();
            for entry in scan_entries.iter() {
                results.push(SearchResult {
                    scan: entry.scan,
                    spectrum_index: entry.spectrum_index.clone(),
                    frag_method: entry.frag_method.clone(),
                    peptide: peptide.clone(),
                    protein: protein.name.clone(),
                    cleavage_state,
                    ..template.clone()
                });
            }
        }
        Ok(results)
    }
}

/// Normalizes result files according to a set of [`ProcessingParams`]
#[derive(Debug)]
pub struct ResultsProcessor {
    params: ProcessingParams,
    catalog: ModificationCatalog,
    mass_table: AminoAcidMassTable,
    abort: Arc<AtomicBool>,
}

impl ResultsProcessor {
    pub fn new(params: ProcessingParams) -> Result<Self, PipelineError> {
        let catalog = params.build_catalog()?;
        let mass_table = params.build_mass_table()?;
        for def in catalog.iter() {
            debug!(
                "Modification {} {:.6} on {} ({}) as {:?}",
                def.name, def.mass, def.target_residues, def.class, def.visible_symbol()
            );
        }
        Ok(Self {
            params,
            catalog,
            mass_table,
            abort: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn params(&self) -> &ProcessingParams {
        &self.params
    }

    pub fn catalog(&self) -> &ModificationCatalog {
        &self.catalog
    }

    /// A flag that stops processing at the next line once set
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    /// Read and normalize every line of `reader`. `source` names the input in errors.
    pub fn read_results<R: Read>(
        &self,
        reader: R,
        source: &Path,
    ) -> Result<ParsedResults, PipelineError> {
        let read_error = |source_err: csv::Error| PipelineError::InputRead {
            path: source.to_path_buf(),
            source: source_err.into(),
        };
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(reader);
        let mut records = reader.records();

        let header = match records.next() {
            Some(header) => header.map_err(read_error)?,
            None => return Err(PipelineError::EmptyInput(source.to_path_buf())),
        };
        let columns = ColumnMap::from_header(header.iter(), self.params.engine)
            .map_err(|e| PipelineError::from_header(source.to_path_buf(), e))?;

        let resolver = MassShiftSymbolResolver::new(
            &self.catalog,
            self.params.mass_match_tolerance,
            self.params.tie_break,
        );
        let mut parser = LineParser {
            columns: &columns,
            mass_table: &self.mass_table,
            isotopic: self.catalog.isotopic_modifications(),
            rewriter: PeptideAnnotationRewriter::new(
                resolver,
                !self.params.engine.prints_static_mod_masses(),
            ),
            corrector: self.params.delta_mass_corrector(),
            scan_groups: ScanGroupResolver::new(),
            params: &self.params,
            unresolved_mass_shifts: 0,
        };

        let mut errors = BoundedErrorLog::new(self.params.error_log_budget);
        let mut summary = ProcessingSummary::default();
        let mut results = Vec::new();
        for record in records {
            if self.abort.load(Ordering::Relaxed) {
                return Err(PipelineError::Aborted(summary.lines_read));
            }
            let record = match record {
                Ok(record) => record,
                Err(e) if e.is_io_error() => return Err(read_error(e)),
                Err(e) => {
                    summary.lines_read += 1;
                    summary.lines_skipped += 1;
                    errors.push(format!("Line {}: {e}", summary.lines_read + 1));
                    continue;
                }
            };
            summary.lines_read += 1;
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            let line_number = record
                .position()
                .map(|p| p.line())
                .unwrap_or(summary.lines_read as u64 + 1);
            match parser.parse(&record) {
                Ok(parsed) => {
                    summary.results_parsed += parsed.len();
                    results.extend(parsed);
                }
                Err(e) => {
                    summary.lines_skipped += 1;
                    if !errors.push(format!("Line {line_number}: {e}")) {
                        debug!("Line {line_number} skipped: {e}");
                    }
                }
            }
        }

        summary.unresolved_mass_shifts = parser.unresolved_mass_shifts;
        summary.ppm_recomputed = parser.corrector.recomputed_count();
        let suppressed = parser.corrector.suppressed_warnings();
        if suppressed > 0 {
            warn!("{suppressed} further implausible precursor errors were recomputed without a warning");
        }
        let scan_groups = parser.scan_groups.entries();
        summary.scan_groups = parser.scan_groups.group_count();
        Ok(ParsedResults {
            results,
            columns,
            scan_groups,
            errors,
            summary,
        })
    }

    /// Rank the parsed matches and build the output views
    pub fn rank_and_filter(&self, results: Vec<SearchResult>) -> FilteredResults {
        let engine = RankAndFilterEngine::new(self.params.thresholds(), self.params.protein_ordering());
        engine.rank_and_filter(results)
    }

    /// Normalize `input`, writing the output files into `output_directory`
    pub fn process_file(
        &self,
        input: &Path,
        output_directory: &Path,
    ) -> Result<ProcessingSummary, PipelineError> {
        let start = Instant::now();
        let reader = open_input(input)?;
        let parsed = self.read_results(reader, input)?;
        for message in parsed.errors.messages() {
            warn!("{message}");
        }
        if parsed.errors.dropped() > 0 {
            warn!(
                "{} further line errors were not recorded",
                parsed.errors.dropped()
            );
        }
        let output_columns = OutputColumns::from_columns(&parsed.columns);
        let mut summary = parsed.summary;
        let filtered = self.rank_and_filter(parsed.results);
        summary += ProcessingSummary {
            synopsis_results: filtered.synopsis.len(),
            first_hits_results: filtered.first_hits.len(),
            ..Default::default()
        };

        fs::create_dir_all(output_directory).map_err(|source| PipelineError::OutputCreation {
            path: output_directory.to_path_buf(),
            source,
        })?;
        let paths = OutputPaths::new(input, output_directory);
        if self.params.create_synopsis {
            self.write_results(&paths.synopsis, &filtered.synopsis, &output_columns)?;
        }
        if self.params.create_first_hits {
            self.write_results(&paths.first_hits, &filtered.first_hits, &output_columns)?;
        }
        if !parsed.scan_groups.is_empty() {
            let handle = create_output(&paths.scan_groups)?;
            write_scan_groups(handle, &parsed.scan_groups)
                .map_err(|e| output_error(&paths.scan_groups, e))?;
        }
        if self.params.create_modification_summary && !self.catalog.is_empty() {
            let mut usage = ModificationUsage::new(&self.catalog);
            for index in filtered.synopsis.iter().flat_map(|r| r.modifications.iter()) {
                usage.record(*index);
            }
            let handle = create_output(&paths.modification_summary)?;
            write_modification_summary(handle, &self.catalog, &usage)
                .map_err(|e| output_error(&paths.modification_summary, e))?;
        }
        info!(
            "Processed {} in {:0.3?}",
            input.display(),
            Instant::now() - start
        );
        Ok(summary)
    }

    fn write_results(
        &self,
        path: &Path,
        results: &[SearchResult],
        columns: &OutputColumns,
    ) -> Result<(), PipelineError> {
        debug!("Writing {} results to {}", results.len(), path.display());
        let handle = create_output(path)?;
        ResultsWriter::new(handle, columns.clone())
            .write_all(results)
            .map_err(|e| output_error(path, e))
    }
}

fn output_error(path: &Path, source: io::Error) -> PipelineError {
    PipelineError::OutputCreation {
        path: PathBuf::from(path),
        source,
    }
}
