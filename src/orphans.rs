// Orphan analysis - which keys/names exist on only one side of an era
//
// Pure set algebra over the candidate and boundary key universes, plus the
// line-oriented per-era diagnostic block. Orphan sets double as the input
// universe for the fuzzy reconciliation pass.

use crate::eras::Era;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

// ============================================================================
// ORPHAN SETS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanSets {
    /// Keys present on both sides.
    pub overlap: BTreeSet<String>,
    /// Candidate keys with no boundary counterpart.
    pub orphaned_candidates: BTreeSet<String>,
    /// Boundary keys with no candidate counterpart.
    pub orphaned_boundaries: BTreeSet<String>,
}

/// Intersection and the two asymmetric differences. By construction:
/// overlap ∪ orphaned_candidates = candidates,
/// overlap ∪ orphaned_boundaries = boundaries.
pub fn analyze(candidates: &BTreeSet<String>, boundaries: &BTreeSet<String>) -> OrphanSets {
    OrphanSets {
        overlap: candidates.intersection(boundaries).cloned().collect(),
        orphaned_candidates: candidates.difference(boundaries).cloned().collect(),
        orphaned_boundaries: boundaries.difference(candidates).cloned().collect(),
    }
}

// ============================================================================
// PER-ERA DIAGNOSTIC REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EraOrphanReport {
    pub era: Era,
    pub candidate_count: usize,
    pub boundary_count: usize,
    pub sets: OrphanSets,
}

impl EraOrphanReport {
    pub fn new(
        era: Era,
        candidates: &BTreeSet<String>,
        boundaries: &BTreeSet<String>,
    ) -> Self {
        EraOrphanReport {
            era,
            candidate_count: candidates.len(),
            boundary_count: boundaries.len(),
            sets: analyze(candidates, boundaries),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{}-{}: {} candidate FEDs, {} RO FEDs",
            self.era.start, self.era.end, self.candidate_count, self.boundary_count
        )
    }

    /// The full diagnostic block: era id, date range, counts, and the
    /// literal orphaned listings.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n", self.era.id));
        out.push_str(&format!("{}\n", self.summary()));
        out.push_str(&format!("  Overlap: {} FEDs\n", self.sets.overlap.len()));
        out.push_str(&format!(
            "  Candidates with no matching FED: {}\n",
            self.sets.orphaned_candidates.len()
        ));
        out.push_str(&format!("  {:?}\n", self.sets.orphaned_candidates));
        out.push_str(&format!(
            "  RO FEDs with no matching candidates: {}\n",
            self.sets.orphaned_boundaries.len()
        ));
        out.push_str(&format!("  {:?}\n", self.sets.orphaned_boundaries));
        out
    }
}

// ============================================================================
// REPORT LOG
// ============================================================================

/// Line-oriented report file with optional console mirroring.
pub struct ReportLog {
    file: File,
    verbose: bool,
}

impl ReportLog {
    pub fn create(path: &Path, verbose: bool) -> io::Result<Self> {
        Ok(ReportLog {
            file: File::create(path)?,
            verbose,
        })
    }

    pub fn write_report(&mut self, report: &EraOrphanReport) -> io::Result<()> {
        let block = report.render();
        writeln!(self.file, "{}", block)?;
        if self.verbose {
            println!("{}", report.era.id);
            println!("{}", report.summary());
            println!("  Overlap: {} FEDs", report.sets.overlap.len());
            println!(
                "  Candidates with no matching FED: {}",
                report.sets.orphaned_candidates.len()
            );
            println!(
                "  RO FEDs with no matching candidates: {}",
                report.sets.orphaned_boundaries.len()
            );
        }
        Ok(())
    }

}

// ============================================================================
// TESTS
// ============================================================================
