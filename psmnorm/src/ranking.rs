/*!
Per-spectrum ranking and the first-hits and synopsis views of a result set.
*/
use std::cmp::Ordering;

use tracing::debug;

use crate::search_result::SearchResult;

/// Decides which protein represents a peptide shared by several proteins
pub trait ProteinOrdering {
    fn compare(&self, a: &str, b: &str) -> Ordering;
}

impl<F: Fn(&str, &str) -> Ordering> ProteinOrdering for F {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        self(a, b)
    }
}

/// Orders forward proteins before decoys, then by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoyAwareProteinOrdering {
    decoy_prefixes: Vec<String>,
}

impl Default for DecoyAwareProteinOrdering {
    fn default() -> Self {
        Self::new(["XXX_", "REV_", "DECOY_", "Reversed_"])
    }
}

impl DecoyAwareProteinOrdering {
    pub fn new<S: Into<String>>(decoy_prefixes: impl IntoIterator<Item = S>) -> Self {
        Self {
            decoy_prefixes: decoy_prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_decoy(&self, protein: &str) -> bool {
        self.decoy_prefixes.iter().any(|prefix| {
            protein
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        })
    }
}

impl ProteinOrdering for DecoyAwareProteinOrdering {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        self.is_decoy(a)
            .cmp(&self.is_decoy(b))
            .then_with(|| a.cmp(b))
    }
}

/// A match is kept in the synopsis if it passes either threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreThresholds {
    pub primary: f64,
    pub secondary: f64,
}

impl Default for ScoreThresholds {
    fn default() -> Self {
        Self {
            primary: 5e-7,
            secondary: 0.75,
        }
    }
}

/// The two output views of a result set, each sorted and numbered
#[derive(Debug, Clone, Default)]
pub struct FilteredResults {
    pub first_hits: Vec<SearchResult>,
    pub synopsis: Vec<SearchResult>,
}

/// Assign ranks to a group of matches to the same spectrum that is already sorted by primary score.
///
/// Matches whose scores differ by no more than [`f64::EPSILON`] share a rank.
pub fn assign_ranks(group: &mut [SearchResult]) {
    let mut rank = 0;
    let mut last_score = f64::NAN;
    for result in group.iter_mut() {
        if rank == 0 || (result.primary_score - last_score).abs() > f64::EPSILON {
            rank += 1;
        }
        last_score = result.primary_score;
        result.rank = rank;
    }
}

/// Sort by primary score, scan, charge, peptide then protein
pub fn final_sort(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        a.primary_score
            .total_cmp(&b.primary_score)
            .then_with(|| a.scan.cmp(&b.scan))
            .then_with(|| a.charge.cmp(&b.charge))
            .then_with(|| a.peptide.cmp(&b.peptide))
            .then_with(|| a.protein.cmp(&b.protein))
    });
}

fn number_results(results: &mut [SearchResult]) {
    for (i, result) in results.iter_mut().enumerate() {
        result.result_id = i as u32 + 1;
    }
}

#[derive(Debug, Clone, Default)]
pub struct RankAndFilterEngine<O: ProteinOrdering> {
    thresholds: ScoreThresholds,
    ordering: O,
}

impl<O: ProteinOrdering> RankAndFilterEngine<O> {
    pub fn new(thresholds: ScoreThresholds, ordering: O) -> Self {
        Self {
            thresholds,
            ordering,
        }
    }

    pub fn passes_synopsis(&self, result: &SearchResult) -> bool {
        result.primary_score <= self.thresholds.primary
            || result.secondary_score <= self.thresholds.secondary
    }

    /// The rank 1 matches of a ranked group, keeping only the preferred protein for each peptide
    pub fn first_hits(&self, group: &[SearchResult]) -> Vec<SearchResult> {
        let mut hits: Vec<SearchResult> = group.iter().filter(|r| r.rank == 1).cloned().collect();
        hits.sort_by(|a, b| {
            a.peptide_core
                .cmp(&b.peptide_core)
                .then_with(|| self.ordering.compare(&a.protein, &b.protein))
        });
        hits.dedup_by(|later, kept| later.peptide_core == kept.peptide_core);
        hits
    }

    /// Rank every spectrum's matches and build both output views
    pub fn rank_and_filter(&self, mut results: Vec<SearchResult>) -> FilteredResults {
        results.sort_by(|a, b| {
            a.scan
                .cmp(&b.scan)
                .then_with(|| a.charge.cmp(&b.charge))
                .then_with(|| a.primary_score.total_cmp(&b.primary_score))
        });

        let mut filtered = FilteredResults::default();
        let mut n_groups = 0usize;
        for group in results.chunk_by_mut(|a, b| a.same_spectrum(b)) {
            n_groups += 1;
            assign_ranks(group);
            filtered.first_hits.extend(self.first_hits(group));
        }
        filtered.synopsis = results
            .into_iter()
            .filter(|r| self.passes_synopsis(r))
            .collect();
        debug!(
            "Ranked {n_groups} spectra, {} first hits and {} synopsis matches",
            filtered.first_hits.len(),
            filtered.synopsis.len()
        );

        final_sort(&mut filtered.first_hits);
        final_sort(&mut filtered.synopsis);
        number_results(&mut filtered.first_hits);
        number_results(&mut filtered.synopsis);
        filtered
    }
}
