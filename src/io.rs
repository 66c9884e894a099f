// File I/O seam: candidate CSV in/out, per-era boundary GeoJSON in/out.
//
// Shapefile decoding stays outside this crate; boundary inputs arrive as
// GeoJSON FeatureCollections (one file per representation order, era year
// embedded in the file name, e.g. FED_RO1976.geojson).

use crate::errors::{ReconcileError, Result};
use crate::model::{BoundaryDataset, BoundaryRecord, CandidateRecord, Geometry};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// GEOJSON WIRE TYPES
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<CrsSpec>,
    pub features: Vec<Feature>,
}

/// Old-style GeoJSON named CRS member, as emitted by GIS exports.
#[derive(Debug, Serialize, Deserialize)]
pub struct CrsSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: CrsProperties,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CrsProperties {
    pub name: String,
}

impl CrsSpec {
    pub fn named(name: &str) -> Self {
        CrsSpec {
            kind: "name".to_string(),
            properties: CrsProperties {
                name: name.to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: FedProperties,
    pub geometry: Geometry,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FedProperties {
    pub fedname: String,
    /// Some exports carry numeric ids; normalize to string on the way in.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "id must be string or number, got {other}"
        ))),
    }
}

// ============================================================================
// BOUNDARY DATASETS
// ============================================================================

/// Era year from a dataset file name, at the fixed offset the source files
/// use: `FED_RO1976.geojson` -> 1976.
pub fn era_year_from_path(path: &Path) -> Result<u16> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    name.get(6..10)
        .and_then(|year| year.parse::<u16>().ok())
        .ok_or_else(|| ReconcileError::BadDatasetName(name.to_string()))
}

pub fn load_boundary_dataset(path: &Path) -> Result<BoundaryDataset> {
    let era_id = era_year_from_path(path)?;
    let text = fs::read_to_string(path)?;
    let collection: FeatureCollection = serde_json::from_str(&text)?;

    let records = collection
        .features
        .into_iter()
        .map(|feature| BoundaryRecord {
            fedname: feature.properties.fedname,
            id: feature.properties.id,
            geometry: feature.geometry,
        })
        .collect();

    Ok(BoundaryDataset {
        era_id,
        source_crs: collection.crs.map(|crs| crs.properties.name),
        records,
    })
}

/// Serialize a dataset back to a FeatureCollection, atomically
/// (temp file + rename), declaring `crs_name` when given.
pub fn save_boundary_dataset(
    dataset: &BoundaryDataset,
    path: &Path,
    crs_name: Option<&str>,
) -> Result<()> {
    let collection = FeatureCollection {
        kind: "FeatureCollection".to_string(),
        crs: crs_name.map(CrsSpec::named),
        features: dataset
            .records
            .iter()
            .map(|record| Feature {
                kind: "Feature".to_string(),
                properties: FedProperties {
                    fedname: record.fedname.clone(),
                    id: record.id.clone(),
                },
                geometry: record.geometry.clone(),
            })
            .collect(),
    };

    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, serde_json::to_string(&collection)?)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// All boundary dataset files in a directory, sorted by name (which sorts
/// by era year, given the fixed naming scheme).
pub fn scan_dataset_dir(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file() && path.extension().map(|e| e == extension).unwrap_or(false)
        })
        .collect();
    paths.sort();
    Ok(paths)
}

// ============================================================================
// CANDIDATE CSV
// ============================================================================

pub fn load_candidates(path: &Path) -> Result<Vec<CandidateRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut candidates = Vec::new();
    for row in reader.deserialize() {
        let candidate: CandidateRecord = row?;
        candidates.push(candidate);
    }
    Ok(candidates)
}

/// Write candidates with their resolution results. Unresolved rows keep an
/// empty `fed_id` cell rather than a placeholder.
pub fn write_candidates(path: &Path, candidates: &[CandidateRecord]) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp_path)?;
        for candidate in candidates {
            writer.serialize(candidate)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
