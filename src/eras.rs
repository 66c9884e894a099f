// 🗓 Representation orders - the "era" timeline
//
// Federal electoral boundaries are redrawn periodically. Each redraw produces
// a representation order (RO), in effect for a closed date interval. The
// table below partitions 1867-01-01 .. 2024-12-31 with no gaps or overlaps,
// so every valid election date lands in exactly one era.

use crate::errors::{ReconcileError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One representation order: boundary configuration in effect for
/// the closed interval [start, end]. `id` is the RO's starting year,
/// which is also how per-era dataset files are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Era {
    pub id: u16,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Era {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

// (id, start ymd, end ymd) - source reference table, never mutated at runtime
const ERA_RANGES: [(u16, (i32, u32, u32), (i32, u32, u32)); 18] = [
    (1867, (1867, 1, 1), (1872, 7, 19)),
    (1872, (1872, 7, 20), (1882, 6, 19)),
    (1882, (1882, 6, 20), (1896, 6, 22)),
    (1892, (1896, 6, 23), (1904, 11, 2)),
    (1903, (1904, 11, 3), (1908, 10, 25)),
    (1905, (1908, 10, 26), (1917, 12, 16)),
    (1914, (1917, 12, 17), (1925, 10, 28)),
    (1924, (1925, 10, 29), (1935, 10, 13)),
    (1933, (1935, 10, 14), (1949, 6, 26)),
    (1947, (1949, 6, 27), (1953, 8, 9)),
    (1952, (1953, 8, 10), (1968, 6, 24)),
    (1966, (1968, 6, 25), (1979, 5, 21)),
    (1976, (1979, 5, 22), (1988, 11, 20)),
    (1987, (1988, 11, 21), (1997, 6, 1)),
    (1996, (1997, 6, 2), (2000, 11, 26)),
    (1999, (2000, 11, 27), (2004, 6, 27)),
    (2003, (2004, 6, 28), (2015, 10, 18)),
    (2013, (2015, 10, 19), (2024, 12, 31)),
];

/// Immutable lookup table for date -> era resolution.
/// Built once at startup, shared by reference afterwards.
pub struct EraTable {
    eras: Vec<Era>,
}

impl EraTable {
    pub fn new() -> Self {
        let eras = ERA_RANGES
            .iter()
            .map(|&(id, (sy, sm, sd), (ey, em, ed))| Era {
                id,
                start: NaiveDate::from_ymd_opt(sy, sm, sd).unwrap(),
                end: NaiveDate::from_ymd_opt(ey, em, ed).unwrap(),
            })
            .collect();
        EraTable { eras }
    }

    /// Resolve an election date to the era active at that date.
    ///
    /// The table partitions the timeline, so first-match is the only match.
    /// A date outside the historical range is an error - silently assigning
    /// a default era would misfile every candidate from that election.
    pub fn resolve(&self, date: NaiveDate) -> Result<&Era> {
        self.eras
            .iter()
            .find(|era| era.contains(date))
            .ok_or(ReconcileError::NoEraFound(date))
    }

    /// Look up an era by id (dataset files are named by era id).
    pub fn by_id(&self, id: u16) -> Option<&Era> {
        self.eras.iter().find(|era| era.id == id)
    }

    pub fn eras(&self) -> &[Era] {
        &self.eras
    }
}

impl Default for EraTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a candidate province code (0..=12) to the 2-character prefix of
/// federal electoral district ids in that province/territory.
pub fn province_prefix(code: u8) -> Result<&'static str> {
    let prefix = match code {
        0 => "48",
        1 => "59",
        2 => "46",
        3 => "13",
        4 => "10",
        5 => "61",
        6 => "12",
        7 => "62",
        8 => "35",
        9 => "11",
        10 => "24",
        11 => "47",
        12 => "60",
        other => return Err(ReconcileError::UnknownProvince(other)),
    };
    Ok(prefix)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_resolve_known_date() {
        let table = EraTable::new();
        let era = table.resolve(date(1979, 5, 22)).unwrap();
        assert_eq!(era.id, 1976);
        assert!(era.contains(date(1979, 5, 22)));
    }

    #[test]
    fn test_resolve_interval_endpoints() {
        let table = EraTable::new();
        // Closed intervals: both endpoints belong to the era
        assert_eq!(table.resolve(date(1988, 11, 20)).unwrap().id, 1976);
        assert_eq!(table.resolve(date(1988, 11, 21)).unwrap().id, 1987);
    }

    #[test]
    fn test_resolve_outside_range_fails() {
        let table = EraTable::new();
        let err = table.resolve(date(1850, 1, 1)).unwrap_err();
        assert!(matches!(err, ReconcileError::NoEraFound(_)));
        assert!(table.resolve(date(2025, 1, 1)).is_err());
    }

    #[test]
    fn test_timeline_partition_no_gaps_no_overlaps() {
        let table = EraTable::new();
        let mut day = date(1867, 1, 1);
        let last = date(2024, 12, 31);
        // Walk interval boundaries: for every era, the day after its end
        // must belong to exactly the next era.
        for window in table.eras().windows(2) {
            assert_eq!(
                window[0].end.checked_add_days(Days::new(1)).unwrap(),
                window[1].start
            );
        }
        // Spot-check uniqueness across the whole range, sampled weekly
        while day <= last {
            let hits = table.eras().iter().filter(|e| e.contains(day)).count();
            assert_eq!(hits, 1, "date {day} matched {hits} eras");
            day = day.checked_add_days(Days::new(7)).unwrap();
        }
    }

    #[test]
    fn test_province_prefix() {
        assert_eq!(province_prefix(4).unwrap(), "10");
        assert_eq!(province_prefix(8).unwrap(), "35");
        assert_eq!(province_prefix(12).unwrap(), "60");
        assert!(matches!(
            province_prefix(13),
            Err(ReconcileError::UnknownProvince(13))
        ));
    }

    #[test]
    fn test_by_id() {
        let table = EraTable::new();
        assert_eq!(table.by_id(2003).unwrap().start, date(2004, 6, 28));
        assert!(table.by_id(1900).is_none());
    }
}
