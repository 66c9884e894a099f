// 🌐 Per-era dataset export - reproject to EPSG:4326 and write GeoJSON
//
// Runs over boundary datasets only; names and ids pass through untouched.
// Real projection math lives behind the CrsTransform seam - this crate
// ships the identity case and reports everything else as an unsupported
// CRS rather than guessing at coordinates.

use crate::errors::{ReconcileError, Result};
use crate::io;
use crate::model::BoundaryDataset;
use std::path::{Path, PathBuf};

/// Output coordinate reference for all exported datasets.
pub const TARGET_CRS: &str = "EPSG:4326";

/// Collapse the CRS spellings that GIS exports use for the same system,
/// e.g. "urn:ogc:def:crs:EPSG::4326" and "OGC:CRS84" both mean EPSG:4326.
pub fn normalize_crs_name(name: &str) -> String {
    let trimmed = name.trim();
    if let Some(code) = trimmed.strip_prefix("urn:ogc:def:crs:EPSG::") {
        return format!("EPSG:{code}");
    }
    match trimmed {
        "urn:ogc:def:crs:OGC:1.3:CRS84" | "OGC:CRS84" | "CRS84" => TARGET_CRS.to_string(),
        other => other.to_string(),
    }
}

// ============================================================================
// CRS TRANSFORM SEAM
// ============================================================================

/// Coordinate reprojection capability. Implementations receive normalized
/// CRS names (see `normalize_crs_name`).
pub trait CrsTransform {
    fn supports(&self, source: &str, target: &str) -> bool;
    fn reproject(&self, source: &str, target: &str, position: [f64; 2]) -> [f64; 2];
}

/// The built-in transform: data already in the target CRS passes through.
/// Anything else needs an external transformer wired in.
pub struct IdentityTransform;

impl CrsTransform for IdentityTransform {
    fn supports(&self, source: &str, target: &str) -> bool {
        source == target
    }

    fn reproject(&self, _source: &str, _target: &str, position: [f64; 2]) -> [f64; 2] {
        position
    }
}

// ============================================================================
// EXPORTER
// ============================================================================

pub struct Exporter<'a> {
    transform: &'a dyn CrsTransform,
}

impl<'a> Exporter<'a> {
    pub fn new(transform: &'a dyn CrsTransform) -> Self {
        Exporter { transform }
    }

    /// Reproject `dataset` to EPSG:4326 and write it to
    /// `<out_dir>/ro_<era_id>.geojson`. Returns the written path.
    ///
    /// A missing or unsupported source CRS fails this era's export only;
    /// the caller moves on to the next era.
    pub fn export(&self, dataset: &BoundaryDataset, out_dir: &Path) -> Result<PathBuf> {
        let source = match &dataset.source_crs {
            Some(name) => normalize_crs_name(name),
            None => {
                return Err(ReconcileError::UnsupportedCrs {
                    era: dataset.era_id,
                    detail: "dataset declares no CRS".to_string(),
                })
            }
        };
        if !self.transform.supports(&source, TARGET_CRS) {
            return Err(ReconcileError::UnsupportedCrs {
                era: dataset.era_id,
                detail: format!("no transform from {source} to {TARGET_CRS}"),
            });
        }

        let mut reprojected = dataset.clone();
        for record in &mut reprojected.records {
            record.geometry = record
                .geometry
                .map_positions(|p| self.transform.reproject(&source, TARGET_CRS, p));
        }
        reprojected.source_crs = Some(TARGET_CRS.to_string());

        let out_path = out_dir.join(format!("ro_{}.geojson", dataset.era_id));
        io::save_boundary_dataset(&reprojected, &out_path, Some(TARGET_CRS))?;
        Ok(out_path)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoundaryRecord, Geometry};
    use tempfile::TempDir;

    fn dataset(era_id: u16, crs: Option<&str>) -> BoundaryDataset {
        BoundaryDataset {
            era_id,
            source_crs: crs.map(str::to_string),
            records: vec![BoundaryRecord {
                fedname: "EXAMPLE".to_string(),
                id: "1007654".to_string(),
                geometry: Geometry::Polygon(vec![vec![
                    [-63.0, 46.0],
                    [-62.0, 46.0],
                    [-62.5, 47.0],
                    [-63.0, 46.0],
                ]]),
            }],
        }
    }

    /// Fake planar transform for exercising the reprojection path.
    struct ShiftTransform;
    impl CrsTransform for ShiftTransform {
        fn supports(&self, source: &str, _target: &str) -> bool {
            source == "EPSG:3347"
        }
        fn reproject(&self, _s: &str, _t: &str, [x, y]: [f64; 2]) -> [f64; 2] {
            [x / 2.0, y / 2.0]
        }
    }

    #[test]
    fn test_normalize_crs_name() {
        assert_eq!(normalize_crs_name("urn:ogc:def:crs:EPSG::3347"), "EPSG:3347");
        assert_eq!(normalize_crs_name("urn:ogc:def:crs:OGC:1.3:CRS84"), "EPSG:4326");
        assert_eq!(normalize_crs_name("EPSG:4326"), "EPSG:4326");
    }

    #[test]
    fn test_export_identity_names_file_by_era() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(&IdentityTransform);
        let path = exporter.export(&dataset(1976, Some("EPSG:4326")), dir.path()).unwrap();
        assert!(path.ends_with("ro_1976.geojson"));

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["crs"]["properties"]["name"], "EPSG:4326");
        assert_eq!(value["features"][0]["properties"]["fedname"], "EXAMPLE");
        assert_eq!(value["features"][0]["properties"]["id"], "1007654");
    }

    #[test]
    fn test_export_reprojects_positions() {
        let dir = TempDir::new().unwrap();
        let mut ds = dataset(1987, Some("urn:ogc:def:crs:EPSG::3347"));
        ds.records[0].geometry = Geometry::Polygon(vec![vec![[10.0, 20.0], [30.0, 40.0]]]);

        let exporter = Exporter::new(&ShiftTransform);
        let path = exporter.export(&ds, dir.path()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["features"][0]["geometry"]["coordinates"][0][0][0], 5.0);
        assert_eq!(value["features"][0]["geometry"]["coordinates"][0][1][1], 20.0);
    }

    #[test]
    fn test_missing_crs_fails_that_era() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(&IdentityTransform);
        let err = exporter.export(&dataset(1976, None), dir.path()).unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::UnsupportedCrs { era: 1976, .. }
        ));
    }

    #[test]
    fn test_unknown_crs_fails_that_era() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(&IdentityTransform);
        let err = exporter
            .export(&dataset(1987, Some("EPSG:3347")), dir.path())
            .unwrap_err();
        assert!(matches!(err, ReconcileError::UnsupportedCrs { era: 1987, .. }));
    }

    #[test]
    fn test_export_does_not_mutate_names_or_ids() {
        let dir = TempDir::new().unwrap();
        let ds = dataset(1976, Some("EPSG:4326"));
        let exporter = Exporter::new(&IdentityTransform);
        exporter.export(&ds, dir.path()).unwrap();
        assert_eq!(ds.records[0].fedname, "EXAMPLE");
        assert_eq!(ds.records[0].id, "1007654");
    }
}
