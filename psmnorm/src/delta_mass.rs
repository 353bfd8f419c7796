/*! Precursor mass error reconciliation and isotope selection correction */
use tracing::warn;

use crate::amino_acid::convolute;

/// The mass difference between the first two isotopic peaks of a peptide, C13 - C12
pub const NEUTRON_SHIFT: f64 = 1.0033548378;

/// Reported ppm errors beyond this multiple of the precursor tolerance are not trusted
pub const PPM_PLAUSIBILITY_FACTOR: f64 = 1.5;

pub const DEFAULT_MAX_ISOTOPE_SHIFT: i32 = 3;

pub fn da_to_ppm(delta_da: f64, mass: f64) -> f64 {
    if mass == 0.0 {
        0.0
    } else {
        delta_da / mass * 1e6
    }
}

pub fn ppm_to_da(ppm: f64, mass: f64) -> f64 {
    ppm * mass / 1e6
}

/// A precursor mass error as written by the search engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrecursorError {
    Da(f64),
    Ppm(f64),
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeltaMass {
    /// The observed minus theoretical mass, without isotope correction
    pub da: f64,
    /// The isotope corrected error in parts-per-million
    pub ppm: f64,
    /// The number of neutron spacings removed from `da` before computing `ppm`
    pub isotope_shift: i32,
    /// Whether the engine's error was discarded and recomputed from the precursor m/z
    pub recomputed: bool,
}

/// Reconciles engine precursor errors, tracking how many had to be recomputed
#[derive(Debug, Clone)]
pub struct DeltaMassCorrector {
    precursor_tolerance_ppm: f64,
    max_isotope_shift: i32,
    warning_limit: usize,
    recomputed: usize,
}

impl Default for DeltaMassCorrector {
    fn default() -> Self {
        Self::new(20.0, DEFAULT_MAX_ISOTOPE_SHIFT, 10)
    }
}

impl DeltaMassCorrector {
    pub fn new(precursor_tolerance_ppm: f64, max_isotope_shift: i32, warning_limit: usize) -> Self {
        Self {
            precursor_tolerance_ppm,
            max_isotope_shift: max_isotope_shift.abs(),
            warning_limit,
            recomputed: 0,
        }
    }

    pub fn recomputed_count(&self) -> usize {
        self.recomputed
    }

    /// How many implausible error warnings were not emitted
    pub fn suppressed_warnings(&self) -> usize {
        self.recomputed.saturating_sub(self.warning_limit)
    }

    fn is_implausible(&self, ppm: f64) -> bool {
        self.precursor_tolerance_ppm > 0.0
            && ppm.abs() > PPM_PLAUSIBILITY_FACTOR * self.precursor_tolerance_ppm
    }

    /// Find the whole number of neutron spacings that, removed from `delta_da`, leaves
    /// the smallest error. Returns that shift and the remaining error in ppm.
    pub fn isotope_correct(&self, delta_da: f64, peptide_mass: f64) -> (i32, f64) {
        let mut best_shift = 0;
        let mut best_error = delta_da.abs();
        for magnitude in 1..=self.max_isotope_shift {
            for shift in [magnitude, -magnitude] {
                let error = (delta_da - shift as f64 * NEUTRON_SHIFT).abs();
                if error < best_error {
                    best_error = error;
                    best_shift = shift;
                }
            }
        }
        let corrected = delta_da - best_shift as f64 * NEUTRON_SHIFT;
        (best_shift, da_to_ppm(corrected, peptide_mass))
    }

    /// Compute both representations of the precursor error of a match.
    ///
    /// `peptide_mass` is the neutral theoretical mass of the peptide and `scan` is
    /// only used to describe the match in warnings. When the precursor m/z is known the
    /// Da error is always taken from it, so it keeps any isotope offset the engine
    /// already removed from its ppm error.
    pub fn correct(
        &mut self,
        scan: u32,
        reported: PrecursorError,
        precursor_mz: f64,
        charge: i32,
        peptide_mass: f64,
    ) -> DeltaMass {
        let observed_delta = (precursor_mz > 0.0 && charge != 0)
            .then(|| convolute(precursor_mz, charge, 0) - peptide_mass);
        match reported {
            PrecursorError::Da(da) => self.delta_from_da(da, peptide_mass, false),
            PrecursorError::Ppm(ppm) if self.is_implausible(ppm) => {
                self.recomputed += 1;
                let da = observed_delta.unwrap_or_else(|| ppm_to_da(ppm, peptide_mass));
                if self.recomputed <= self.warning_limit {
                    warn!(
                        "Scan {scan} reported a precursor error of {ppm:.2} ppm, beyond {:.2} ppm; recomputed {:.5} Da from m/z {precursor_mz:.5} at charge {charge}",
                        PPM_PLAUSIBILITY_FACTOR * self.precursor_tolerance_ppm,
                        da,
                    );
                    if self.recomputed == self.warning_limit {
                        warn!("Further implausible precursor error warnings will be suppressed");
                    }
                }
                self.delta_from_da(da, peptide_mass, true)
            }
            PrecursorError::Ppm(ppm) => match observed_delta {
                Some(da) => DeltaMass {
                    da,
                    ppm,
                    isotope_shift: self.isotope_correct(da, peptide_mass).0,
                    recomputed: false,
                },
                None => self.delta_from_da(ppm_to_da(ppm, peptide_mass), peptide_mass, false),
            },
        }
    }

    fn delta_from_da(&self, da: f64, peptide_mass: f64, recomputed: bool) -> DeltaMass {
        let (isotope_shift, ppm) = self.isotope_correct(da, peptide_mass);
        DeltaMass {
            da,
            ppm,
            isotope_shift,
            recomputed,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const MASS: f64 = 1225.576124;

    #[test]
    fn test_ppm_round_trip() {
        for da in [0.0012, -0.0457, 2.5, 1e-5] {
            let back = ppm_to_da(da_to_ppm(da, MASS), MASS);
            assert!(((back - da) / da).abs() < 1e-6, "{da} -> {back}");
        }
        assert_eq!(da_to_ppm(1.0, 0.0), 0.0);
    }

    #[test]
    fn test_isotope_correction() {
        let corrector = DeltaMassCorrector::default();
        let (shift, ppm) = corrector.isotope_correct(NEUTRON_SHIFT + 0.001, MASS);
        assert_eq!(shift, 1);
        assert!((ppm - da_to_ppm(0.001, MASS)).abs() < 1e-6);

        let (shift, _) = corrector.isotope_correct(-2.0 * NEUTRON_SHIFT, MASS);
        assert_eq!(shift, -2);

        // exactly half way between 0 and 1 spacing, the smaller shift wins
        let (shift, _) = corrector.isotope_correct(NEUTRON_SHIFT / 2.0, MASS);
        assert_eq!(shift, 0);

        // shifts beyond the limit are not considered
        let (shift, _) = corrector.isotope_correct(5.0 * NEUTRON_SHIFT, MASS);
        assert_eq!(shift, 3);
    }

    #[test]
    fn test_da_reported() {
        let mut corrector = DeltaMassCorrector::default();
        let delta = corrector.correct(10, PrecursorError::Da(NEUTRON_SHIFT + 0.002), 613.8, 2, MASS);
        assert!((delta.da - (NEUTRON_SHIFT + 0.002)).abs() < 1e-12);
        assert_eq!(delta.isotope_shift, 1);
        assert!((delta.ppm - da_to_ppm(0.002, MASS)).abs() < 1e-6);
        assert!(!delta.recomputed);
    }

    #[test]
    fn test_ppm_reported() {
        let mut corrector = DeltaMassCorrector::default();
        let mz = convolute(MASS + ppm_to_da(4.0, MASS), 0, 2);
        let delta = corrector.correct(10, PrecursorError::Ppm(4.0), mz, 2, MASS);
        assert!((delta.ppm - 4.0).abs() < 1e-9);
        assert!((delta.da - ppm_to_da(4.0, MASS)).abs() < 1e-9);
        assert_eq!(delta.isotope_shift, 0);
        assert_eq!(corrector.recomputed_count(), 0);

        // without a precursor m/z the Da error comes from the ppm error
        let delta = corrector.correct(10, PrecursorError::Ppm(4.0), 0.0, 2, MASS);
        assert!((delta.da - ppm_to_da(4.0, MASS)).abs() < 1e-12);
    }

    #[test]
    fn test_ppm_reported_keeps_isotope_offset() {
        let mut corrector = DeltaMassCorrector::default();
        let peptide_mass = 926.4861;
        let observed = peptide_mass + NEUTRON_SHIFT + ppm_to_da(0.54, peptide_mass);
        let mz = convolute(observed, 0, 2);
        // the engine reports the error after removing the isotope offset
        let delta = corrector.correct(10, PrecursorError::Ppm(0.54), mz, 2, peptide_mass);
        assert!((delta.da - (observed - peptide_mass)).abs() < 1e-9);
        assert!(delta.da > 1.0);
        assert_eq!(delta.isotope_shift, 1);
        assert!((delta.ppm - 0.54).abs() < 1e-9);
        assert!(!delta.recomputed);
    }

    #[test_log::test]
    fn test_implausible_ppm_recomputed() {
        let mut corrector = DeltaMassCorrector::new(20.0, 3, 1);
        let mz = convolute(MASS + 0.003, 0, 2);
        let delta = corrector.correct(10, PrecursorError::Ppm(5000.0), mz, 2, MASS);
        assert!(delta.recomputed);
        assert!((delta.da - 0.003).abs() < 1e-9);
        assert!((delta.ppm - da_to_ppm(0.003, MASS)).abs() < 1e-6);

        corrector.correct(11, PrecursorError::Ppm(-900.0), mz, 2, MASS);
        assert_eq!(corrector.recomputed_count(), 2);
        assert_eq!(corrector.suppressed_warnings(), 1);
    }
}
