/*! Expansion of merged-spectrum records into one entry per physical scan */
use std::collections::{HashMap, HashSet};

use itertools::izip;
use thiserror::Error;

pub const SCAN_GROUP_DELIMITER: char = '/';

/// One physical scan of a possibly merged record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub scan: u32,
    pub spectrum_index: String,
    pub frag_method: String,
    /// Set when the scan came from a composite record
    pub group_id: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScanGroupEntry {
    pub group_id: u32,
    pub charge: i32,
    pub scan: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanGroupError {
    #[error("Composite scan lists {scans} scans but its {field} lists {count} values")]
    MismatchedFieldCounts {
        scans: usize,
        field: &'static str,
        count: usize,
    },
}

fn parse_scan(text: &str) -> u32 {
    text.trim().parse().unwrap_or_default()
}

fn split_in_step<'a>(
    text: &'a str,
    scans: usize,
    field: &'static str,
) -> Result<Vec<&'a str>, ScanGroupError> {
    let parts: Vec<&str> = text.split(SCAN_GROUP_DELIMITER).map(str::trim).collect();
    match parts.len() {
        n if n == scans => Ok(parts),
        1 => Ok(vec![parts[0]; scans]),
        count => Err(ScanGroupError::MismatchedFieldCounts {
            scans,
            field,
            count,
        }),
    }
}

/// Assigns scan group ids across a whole file
#[derive(Debug, Clone)]
pub struct ScanGroupResolver {
    next_group_id: u32,
    groups: HashMap<(i32, String), u32>,
    entries: HashSet<ScanGroupEntry>,
}

impl Default for ScanGroupResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanGroupResolver {
    pub fn new() -> Self {
        Self {
            next_group_id: 1,
            groups: HashMap::new(),
            entries: HashSet::new(),
        }
    }

    pub fn is_composite(scan_text: &str) -> bool {
        scan_text.contains(SCAN_GROUP_DELIMITER)
    }

    /// Split a record's scan, spectrum index and fragmentation method fields into one
    /// [`ScanEntry`] per scan. Records with a single scan yield one entry without a group.
    pub fn expand(
        &mut self,
        scan_text: &str,
        spectrum_index: &str,
        frag_method: &str,
        charge: i32,
    ) -> Result<Vec<ScanEntry>, ScanGroupError> {
        if !Self::is_composite(scan_text) {
            return Ok(vec![ScanEntry {
                scan: parse_scan(scan_text),
                spectrum_index: spectrum_index.trim().to_string(),
                frag_method: frag_method.trim().to_string(),
                group_id: None,
            }]);
        }
        let scans: Vec<&str> = scan_text.split(SCAN_GROUP_DELIMITER).map(str::trim).collect();
        let indices = split_in_step(spectrum_index, scans.len(), "spectrum index")?;
        let methods = split_in_step(frag_method, scans.len(), "fragmentation method")?;

        let key = (charge, scan_text.trim().to_string());
        let group_id = match self.groups.get(&key) {
            Some(id) => *id,
            None => {
                let id = self.next_group_id;
                self.next_group_id += 1;
                self.groups.insert(key, id);
                id
            }
        };

        let entries = izip!(scans, indices, methods)
            .map(|(scan, index, method)| {
                let scan = parse_scan(scan);
                self.entries.insert(ScanGroupEntry {
                    group_id,
                    charge,
                    scan,
                });
                ScanEntry {
                    scan,
                    spectrum_index: index.to_string(),
                    frag_method: method.to_string(),
                    group_id: Some(group_id),
                }
            })
            .collect();
        Ok(entries)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// The entries of every group with at least two distinct scans, sorted by group, charge then scan
    pub fn entries(&self) -> Vec<ScanGroupEntry> {
        let mut members: HashMap<u32, HashSet<u32>> = HashMap::new();
        for entry in self.entries.iter() {
            members.entry(entry.group_id).or_default().insert(entry.scan);
        }
        let mut entries: Vec<ScanGroupEntry> = self
            .entries
            .iter()
            .filter(|e| members.get(&e.group_id).is_some_and(|m| m.len() >= 2))
            .copied()
            .collect();
        entries.sort();
        entries
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_expand_composite() -> Result<(), ScanGroupError> {
        let mut resolver = ScanGroupResolver::new();
        let entries = resolver.expand("100/101/102", "5/6/7", "CID", 2)?;
        assert_eq!(entries.len(), 3);
        assert_eq!(entries.iter().map(|e| e.scan).collect::<Vec<_>>(), vec![100, 101, 102]);
        assert_eq!(
            entries.iter().map(|e| e.spectrum_index.as_str()).collect::<Vec<_>>(),
            vec!["5", "6", "7"]
        );
        assert!(entries.iter().all(|e| e.group_id == Some(1) && e.frag_method == "CID"));

        // seeing the same composite again reuses its group
        let again = resolver.expand("100/101/102", "5/6/7", "CID", 2)?;
        assert_eq!(again[0].group_id, Some(1));
        let other_charge = resolver.expand("100/101/102", "5/6/7", "CID", 3)?;
        assert_eq!(other_charge[0].group_id, Some(2));

        let written = resolver.entries();
        assert_eq!(written.len(), 6);
        assert_eq!(written[0], ScanGroupEntry { group_id: 1, charge: 2, scan: 100 });
        Ok(())
    }

    #[test]
    fn test_single_scan() -> Result<(), ScanGroupError> {
        let mut resolver = ScanGroupResolver::new();
        let entries = resolver.expand("1234", "index=5", "HCD", 2)?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].group_id, None);
        assert_eq!(entries[0].scan, 1234);
        assert!(resolver.entries().is_empty());

        let bad = resolver.expand("12a", "", "", 2)?;
        assert_eq!(bad[0].scan, 0);
        Ok(())
    }

    #[test]
    fn test_mismatch_and_degenerate() {
        let mut resolver = ScanGroupResolver::new();
        let err = resolver.expand("100/101/102", "5/6", "CID", 2).unwrap_err();
        assert_eq!(
            err,
            ScanGroupError::MismatchedFieldCounts { scans: 3, field: "spectrum index", count: 2 }
        );
        // a group whose members are all the same scan is not worth writing
        resolver.expand("100/100", "5", "CID", 2).unwrap();
        assert!(resolver.entries().is_empty());
        assert_eq!(resolver.group_count(), 1);
    }
}
