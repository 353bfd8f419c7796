use std::ops::{Add, AddAssign};

/// Counts accumulated over a run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingSummary {
    pub lines_read: usize,
    pub lines_skipped: usize,
    pub results_parsed: usize,
    pub unresolved_mass_shifts: usize,
    pub ppm_recomputed: usize,
    pub scan_groups: usize,
    pub synopsis_results: usize,
    pub first_hits_results: usize,
}

impl Add for ProcessingSummary {
    type Output = ProcessingSummary;

    fn add(self, rhs: Self) -> Self::Output {
        let mut dup = self;
        dup += rhs;
        dup
    }
}

impl AddAssign for ProcessingSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.lines_read += rhs.lines_read;
        self.lines_skipped += rhs.lines_skipped;
        self.results_parsed += rhs.results_parsed;
        self.unresolved_mass_shifts += rhs.unresolved_mass_shifts;
        self.ppm_recomputed += rhs.ppm_recomputed;
        self.scan_groups += rhs.scan_groups;
        self.synopsis_results += rhs.synopsis_results;
        self.first_hits_results += rhs.first_hits_results;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_accumulate() {
        let mut summary = ProcessingSummary {
            lines_read: 5,
            lines_skipped: 1,
            ..Default::default()
        };
        summary += ProcessingSummary {
            synopsis_results: 3,
            ..Default::default()
        };
        let total = summary + ProcessingSummary { lines_read: 2, ..Default::default() };
        assert_eq!(total.lines_read, 7);
        assert_eq!(total.lines_skipped, 1);
        assert_eq!(total.synopsis_results, 3);
    }
}
