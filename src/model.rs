// Core record types: candidate rows, per-era boundary datasets, and the
// GeoJSON-shaped geometry they carry.

use crate::eras::EraTable;
use crate::errors::{ReconcileError, Result};
use crate::keys;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// CANDIDATE RECORDS
// ============================================================================

/// One candidate row from the cleaned election dataset.
///
/// Core columns come straight from the CSV; `era_id` and `fed_key` are
/// derived once during era assignment. `fed_id` is the pipeline's output:
/// None means "unresolved", never a placeholder value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    #[serde(rename = "candidate")]
    pub candidate: String,

    #[serde(rename = "party")]
    pub party: String,

    #[serde(rename = "riding")]
    pub riding: String,

    /// Province/territory code, 0..=12
    #[serde(rename = "province")]
    pub province: u8,

    /// Election date as it appears in the source file
    #[serde(rename = "edate")]
    pub edate: String,

    /// Era active at the election date (derived)
    #[serde(rename = "ro", default)]
    pub era_id: Option<u16>,

    /// Composite matching key (derived, not persisted)
    #[serde(skip)]
    pub fed_key: String,

    /// Resolved boundary id; empty cell on output when unresolved
    #[serde(rename = "fed_id", default)]
    pub fed_id: Option<String>,
}

impl CandidateRecord {
    /// Parse the election date. Source files use day-first dates; ISO dates
    /// are accepted as a fallback for re-processed outputs.
    pub fn election_date(&self) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(&self.edate, "%d/%m/%Y")
            .or_else(|_| NaiveDate::parse_from_str(&self.edate, "%Y-%m-%d"))
            .map_err(|_| ReconcileError::BadDate(self.edate.clone()))
    }

    /// Compute and cache the era and composite key for this record.
    /// Fails when the date falls outside every era or the province code is
    /// unknown - both are structural data problems, not per-row noise.
    pub fn assign_era(&mut self, table: &EraTable) -> Result<()> {
        let date = self.election_date()?;
        let era = table.resolve(date)?;
        self.era_id = Some(era.id);
        self.fed_key = keys::candidate_key(&self.riding, self.province)?;
        Ok(())
    }
}

// ============================================================================
// GEOMETRY (GeoJSON shapes)
// ============================================================================

/// District geometry, limited to the two shapes boundary files contain.
/// Positions are `[x, y]` in the dataset's source CRS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Polygon(Vec<Vec<[f64; 2]>>),
    MultiPolygon(Vec<Vec<Vec<[f64; 2]>>>),
}

impl Geometry {
    /// Apply a coordinate transform to every position, preserving structure.
    pub fn map_positions<F>(&self, mut f: F) -> Geometry
    where
        F: FnMut([f64; 2]) -> [f64; 2],
    {
        match self {
            Geometry::Polygon(rings) => Geometry::Polygon(
                rings
                    .iter()
                    .map(|ring| ring.iter().map(|&p| f(p)).collect())
                    .collect(),
            ),
            Geometry::MultiPolygon(polys) => Geometry::MultiPolygon(
                polys
                    .iter()
                    .map(|rings| {
                        rings
                            .iter()
                            .map(|ring| ring.iter().map(|&p| f(p)).collect())
                            .collect()
                    })
                    .collect(),
            ),
        }
    }
}

// ============================================================================
// BOUNDARY RECORDS
// ============================================================================

/// One district from a representation order's boundary file.
///
/// `fedname` may be rewritten by the reconciliation pass; `id` never changes
/// and is the value copied onto resolved candidates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryRecord {
    pub fedname: String,
    pub id: String,
    pub geometry: Geometry,
}

impl BoundaryRecord {
    pub fn key(&self) -> String {
        keys::boundary_key(&self.fedname, &self.id)
    }
}

/// A full per-era boundary dataset, as loaded from one file.
#[derive(Debug, Clone)]
pub struct BoundaryDataset {
    pub era_id: u16,
    /// CRS name as declared by the source file, e.g. "EPSG:4326".
    /// None when the file carries no CRS information.
    pub source_crs: Option<String>,
    pub records: Vec<BoundaryRecord>,
}

impl BoundaryDataset {
    /// Uppercase every district name in place. Boundary files mix title case
    /// and upper case across decades; candidate ridings are already upper.
    pub fn uppercase_names(&mut self) {
        for record in &mut self.records {
            record.fedname = record.fedname.to_uppercase();
        }
    }

    /// Distinct district names in this dataset.
    pub fn names(&self) -> std::collections::BTreeSet<String> {
        self.records.iter().map(|r| r.fedname.clone()).collect()
    }

    /// Distinct composite keys in this dataset.
    pub fn keys(&self) -> std::collections::BTreeSet<String> {
        self.records.iter().map(|r| r.key()).collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
