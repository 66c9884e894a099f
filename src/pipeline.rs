// Pipeline orchestration: era assignment, exact-match pass, orphan
// diagnostics, fuzzy reconciliation, and per-era export.
//
// Eras are processed as independent units, sequentially. An era whose
// boundary file is missing or broken is reported and skipped; the run
// continues with the next era.

use crate::cache::SubstitutionCache;
use crate::eras::EraTable;
use crate::export::{CrsTransform, Exporter};
use crate::fuzzy::{DecisionProvider, FuzzyResolver, ReconcileStats};
use crate::io;
use crate::matcher::{DatasetIndex, MatchOutcome, Matcher, MatchStats};
use crate::model::CandidateRecord;
use crate::orphans::{EraOrphanReport, ReportLog};
use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

pub struct Pipeline {
    eras: EraTable,
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline {
            eras: EraTable::new(),
        }
    }

    pub fn eras(&self) -> &EraTable {
        &self.eras
    }

    /// Compute era and composite key for every candidate. A date outside
    /// all eras or an unknown province code is structural and fatal here.
    pub fn assign_eras(&self, candidates: &mut [CandidateRecord]) -> Result<()> {
        for candidate in candidates.iter_mut() {
            candidate
                .assign_era(&self.eras)
                .with_context(|| format!("candidate '{}'", candidate.candidate))?;
        }
        Ok(())
    }

    /// Candidate indices grouped by era id, preserving input order within
    /// each group. Call after `assign_eras`.
    pub fn group_by_era(candidates: &[CandidateRecord]) -> BTreeMap<u16, Vec<usize>> {
        let mut groups: BTreeMap<u16, Vec<usize>> = BTreeMap::new();
        for (i, candidate) in candidates.iter().enumerate() {
            if let Some(era_id) = candidate.era_id {
                groups.entry(era_id).or_default().push(i);
            }
        }
        groups
    }

    /// Boundary dataset files keyed by era year.
    fn dataset_paths(feds_dir: &Path) -> Result<BTreeMap<u16, PathBuf>> {
        let mut by_era = BTreeMap::new();
        for path in io::scan_dataset_dir(feds_dir, "geojson")
            .with_context(|| format!("scanning {}", feds_dir.display()))?
        {
            let era_id = io::era_year_from_path(&path)?;
            by_era.insert(era_id, path);
        }
        Ok(by_era)
    }

    /// Exact-match pass: resolve every candidate against its era's boundary
    /// set, writing `fed_id` in place. Candidates of an era with no usable
    /// dataset stay unresolved and are counted.
    pub fn match_pass(
        &self,
        candidates: &mut [CandidateRecord],
        feds_dir: &Path,
        cache: &SubstitutionCache,
    ) -> Result<MatchStats> {
        let datasets = Self::dataset_paths(feds_dir)?;
        let groups = Self::group_by_era(candidates);
        let mut stats = MatchStats::default();

        for (era_id, indices) in groups {
            let Some(path) = datasets.get(&era_id) else {
                eprintln!(
                    "era {era_id}: no boundary dataset, {} candidates left unresolved",
                    indices.len()
                );
                for &i in &indices {
                    stats.record(&MatchOutcome::Unresolved {
                        fed_key: candidates[i].fed_key.clone(),
                    });
                }
                continue;
            };

            let mut dataset = match io::load_boundary_dataset(path) {
                Ok(dataset) => dataset,
                Err(err) => {
                    eprintln!("era {era_id}: skipping ({err})");
                    for &i in &indices {
                        stats.record(&MatchOutcome::Unresolved {
                            fed_key: candidates[i].fed_key.clone(),
                        });
                    }
                    continue;
                }
            };
            dataset.uppercase_names();

            let index = DatasetIndex::build(&dataset);
            for (key, kept, dropped) in index.collisions() {
                eprintln!("era {era_id}: key collision {key}: keeping {kept}, ignoring {dropped}");
            }

            let matcher = Matcher::new(&index, cache);
            for &i in &indices {
                let outcome = matcher.resolve(&candidates[i]);
                stats.record(&outcome);
                if let MatchOutcome::Matched { fed_id, .. } = outcome {
                    candidates[i].fed_id = Some(fed_id);
                }
            }
        }

        Ok(stats)
    }

    /// Per-era orphan diagnostics over composite keys, written to `log`.
    pub fn orphan_report(
        &self,
        candidates: &[CandidateRecord],
        feds_dir: &Path,
        log: &mut ReportLog,
    ) -> Result<Vec<EraOrphanReport>> {
        let datasets = Self::dataset_paths(feds_dir)?;
        let groups = Self::group_by_era(candidates);
        let mut reports = Vec::new();

        for (era_id, path) in &datasets {
            let Some(era) = self.eras.by_id(*era_id) else {
                eprintln!("dataset {} names unknown era {era_id}", path.display());
                continue;
            };
            let mut dataset = match io::load_boundary_dataset(path) {
                Ok(dataset) => dataset,
                Err(err) => {
                    eprintln!("era {era_id}: skipping ({err})");
                    continue;
                }
            };
            dataset.uppercase_names();

            let candidate_keys: BTreeSet<String> = groups
                .get(era_id)
                .map(|indices| {
                    indices
                        .iter()
                        .map(|&i| candidates[i].fed_key.clone())
                        .collect()
                })
                .unwrap_or_default();

            let report = EraOrphanReport::new(*era, &candidate_keys, &dataset.keys());
            log.write_report(&report)?;
            reports.push(report);
        }

        Ok(reports)
    }

    /// Offline reconciliation pass: fuzzy-rename orphaned boundary names
    /// era by era, writing corrected datasets to `processed_dir`. The
    /// updated cache is the caller's to persist.
    pub fn reconcile_pass(
        &self,
        candidates: &[CandidateRecord],
        feds_dir: &Path,
        processed_dir: &Path,
        cache: &mut SubstitutionCache,
        resolver: &FuzzyResolver,
        provider: &mut dyn DecisionProvider,
    ) -> Result<Vec<(u16, ReconcileStats)>> {
        std::fs::create_dir_all(processed_dir)?;
        let datasets = Self::dataset_paths(feds_dir)?;
        let groups = Self::group_by_era(candidates);
        let mut all_stats = Vec::new();

        for (era_id, path) in &datasets {
            let mut dataset = match io::load_boundary_dataset(path) {
                Ok(dataset) => dataset,
                Err(err) => {
                    eprintln!("era {era_id}: skipping ({err})");
                    continue;
                }
            };
            dataset.uppercase_names();

            let candidate_names: BTreeSet<String> = groups
                .get(era_id)
                .map(|indices| {
                    indices
                        .iter()
                        .map(|&i| candidates[i].riding.to_uppercase())
                        .collect()
                })
                .unwrap_or_default();

            let stats = resolver.reconcile_dataset(&mut dataset, &candidate_names, cache, provider);
            for notice in &stats.evicted {
                eprintln!("era {era_id}: {notice}");
            }

            let Some(file_name) = path.file_name() else {
                continue;
            };
            let out_path = processed_dir.join(file_name);
            io::save_boundary_dataset(&dataset, &out_path, dataset.source_crs.as_deref())
                .with_context(|| format!("writing {}", out_path.display()))?;

            all_stats.push((*era_id, stats));
        }

        Ok(all_stats)
    }

    /// Export every era dataset to EPSG:4326 GeoJSON. A bad CRS fails that
    /// era only.
    pub fn export_pass(
        &self,
        feds_dir: &Path,
        out_dir: &Path,
        transform: &dyn CrsTransform,
    ) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(out_dir)?;
        let exporter = Exporter::new(transform);
        let mut written = Vec::new();

        for (era_id, path) in Self::dataset_paths(feds_dir)? {
            let dataset = match io::load_boundary_dataset(&path) {
                Ok(dataset) => dataset,
                Err(err) => {
                    eprintln!("era {era_id}: skipping ({err})");
                    continue;
                }
            };
            match exporter.export(&dataset, out_dir) {
                Ok(out_path) => {
                    println!("Saved GIS file: {}", out_path.display());
                    written.push(out_path);
                }
                Err(err) => eprintln!("era {era_id}: export failed ({err})"),
            }
        }

        Ok(written)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
