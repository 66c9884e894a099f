// 🔎 Exact matcher - three-tier resolution of candidates to boundary ids
//
// Tier 1: composite-key lookup (the clean case, O(1)).
// Tier 2: substitution cache - previously-seen irregular matches.
// Tier 3: name-only lookup, ignoring the province discriminator.
//
// The cascade mirrors the data: most rows match on key, a known long tail
// matches through recorded decisions, and a residue of name variants still
// matches by raw name. What's left is unresolved - an ordinary outcome,
// retained and counted, never a placeholder id.

use crate::cache::SubstitutionCache;
use crate::model::{BoundaryDataset, CandidateRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// MATCH OUTCOME
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchTier {
    /// Direct composite-key hit
    Key,
    /// Resolved through a substitution-cache alias
    Substitution,
    /// Name-only fallback, province prefix ignored
    Name,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched { fed_id: String, tier: MatchTier },
    Unresolved { fed_key: String },
}

// ============================================================================
// DATASET INDEX
// ============================================================================

/// Lookup structure over one era's boundary dataset. Built after any
/// reconciliation renames, so the matcher sees corrected names.
pub struct DatasetIndex {
    era_id: u16,
    by_key: HashMap<String, String>,
    by_name: HashMap<String, String>,
    /// Composite-key collisions found while indexing: (key, kept id,
    /// dropped id). A collision means two physical districts share an
    /// uppercased name and prefix - reported, not fatal.
    collisions: Vec<(String, String, String)>,
}

impl DatasetIndex {
    pub fn build(dataset: &BoundaryDataset) -> Self {
        let mut by_key = HashMap::new();
        let mut by_name = HashMap::new();
        let mut collisions = Vec::new();

        for record in &dataset.records {
            let key = record.key();
            if let Some(kept) = by_key.get(&key) {
                collisions.push((key, String::clone(kept), record.id.clone()));
            } else {
                by_key.insert(key, record.id.clone());
            }
            by_name
                .entry(record.fedname.to_uppercase())
                .or_insert_with(|| record.id.clone());
        }

        DatasetIndex {
            era_id: dataset.era_id,
            by_key,
            by_name,
            collisions,
        }
    }

    pub fn era_id(&self) -> u16 {
        self.era_id
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn collisions(&self) -> &[(String, String, String)] {
        &self.collisions
    }
}

// ============================================================================
// MATCH STATS
// ============================================================================

/// Per-pass tallies, accumulated across every candidate of an era (and
/// summed across eras by the pipeline).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchStats {
    pub total: usize,
    pub by_key: usize,
    pub by_substitution: usize,
    pub by_name: usize,
    pub unresolved: usize,
    /// The composite keys that failed every tier, for diagnostics.
    pub unresolved_keys: Vec<String>,
}

impl MatchStats {
    pub fn record(&mut self, outcome: &MatchOutcome) {
        self.total += 1;
        match outcome {
            MatchOutcome::Matched { tier, .. } => match tier {
                MatchTier::Key => self.by_key += 1,
                MatchTier::Substitution => self.by_substitution += 1,
                MatchTier::Name => self.by_name += 1,
            },
            MatchOutcome::Unresolved { fed_key } => {
                self.unresolved += 1;
                self.unresolved_keys.push(fed_key.clone());
            }
        }
    }

    pub fn absorb(&mut self, other: MatchStats) {
        self.total += other.total;
        self.by_key += other.by_key;
        self.by_substitution += other.by_substitution;
        self.by_name += other.by_name;
        self.unresolved += other.unresolved;
        self.unresolved_keys.extend(other.unresolved_keys);
    }

    pub fn summary(&self) -> String {
        format!(
            "{} candidates: {} by key, {} by substitution, {} by name, {} unresolved",
            self.total, self.by_key, self.by_substitution, self.by_name, self.unresolved
        )
    }
}

// ============================================================================
// MATCHER
// ============================================================================

pub struct Matcher<'a> {
    index: &'a DatasetIndex,
    cache: &'a SubstitutionCache,
}

impl<'a> Matcher<'a> {
    pub fn new(index: &'a DatasetIndex, cache: &'a SubstitutionCache) -> Self {
        Matcher { index, cache }
    }

    /// Resolve one candidate against this era's boundary set.
    /// A candidate from a different era never matches.
    pub fn resolve(&self, candidate: &CandidateRecord) -> MatchOutcome {
        if candidate.era_id != Some(self.index.era_id) {
            return MatchOutcome::Unresolved {
                fed_key: candidate.fed_key.clone(),
            };
        }

        // Tier 1: composite key
        if let Some(id) = self.index.by_key.get(&candidate.fed_key) {
            return MatchOutcome::Matched {
                fed_id: id.clone(),
                tier: MatchTier::Key,
            };
        }

        // Tier 2: substitution cache. An entry `K -> aliases` says the
        // boundary keyed K is also known by those candidate-side names.
        let riding_upper = candidate.riding.to_uppercase();
        for (source_key, entry) in self.cache.iter() {
            if !self.index.contains_key(source_key) {
                continue;
            }
            if entry
                .aliases
                .iter()
                .any(|alias| alias.to_uppercase() == riding_upper)
            {
                let id = self.index.by_key[source_key].clone();
                return MatchOutcome::Matched {
                    fed_id: id,
                    tier: MatchTier::Substitution,
                };
            }
        }

        // Tier 3: raw name, ignoring the prefix
        if let Some(id) = self.index.by_name.get(&riding_upper) {
            return MatchOutcome::Matched {
                fed_id: id.clone(),
                tier: MatchTier::Name,
            };
        }

        MatchOutcome::Unresolved {
            fed_key: candidate.fed_key.clone(),
        }
    }

    /// Resolve a whole era's candidates, writing `fed_id` in place and
    /// tallying outcomes.
    pub fn resolve_all(&self, candidates: &mut [CandidateRecord]) -> MatchStats {
        let mut stats = MatchStats::default();
        for candidate in candidates {
            let outcome = self.resolve(candidate);
            stats.record(&outcome);
            if let MatchOutcome::Matched { fed_id, .. } = &outcome {
                candidate.fed_id = Some(fed_id.clone());
            }
        }
        stats
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eras::EraTable;
    use crate::model::{BoundaryRecord, Geometry};

    fn boundary(fedname: &str, id: &str) -> BoundaryRecord {
        BoundaryRecord {
            fedname: fedname.to_string(),
            id: id.to_string(),
            geometry: Geometry::Polygon(vec![vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [0.0, 0.0]]]),
        }
    }

    fn dataset(era_id: u16, records: Vec<BoundaryRecord>) -> BoundaryDataset {
        let mut dataset = BoundaryDataset {
            era_id,
            source_crs: Some("EPSG:4326".to_string()),
            records,
        };
        dataset.uppercase_names();
        dataset
    }

    fn candidate(riding: &str, province: u8, edate: &str) -> CandidateRecord {
        let mut record = CandidateRecord {
            candidate: "Test Candidate".to_string(),
            party: "Independent".to_string(),
            riding: riding.to_string(),
            province,
            edate: edate.to_string(),
            era_id: None,
            fed_key: String::new(),
            fed_id: None,
        };
        record.assign_era(&EraTable::new()).unwrap();
        record
    }

    #[test]
    fn test_key_match_scenario() {
        // End-to-end: EXAMPLE/province 4 vs {example, 1007654} in 1976
        let ds = dataset(1976, vec![boundary("example", "1007654")]);
        let index = DatasetIndex::build(&ds);
        let cache = SubstitutionCache::new();
        let matcher = Matcher::new(&index, &cache);

        let c = candidate("EXAMPLE", 4, "22/05/1979");
        assert_eq!(c.fed_key, "EXAMPLE10");
        assert_eq!(
            matcher.resolve(&c),
            MatchOutcome::Matched {
                fed_id: "1007654".to_string(),
                tier: MatchTier::Key,
            }
        );
    }

    #[test]
    fn test_substitution_tier() {
        let ds = dataset(1976, vec![boundary("OLDNAME", "1099999")]);
        let index = DatasetIndex::build(&ds);
        let mut cache = SubstitutionCache::new();
        cache.insert_alias("OLDNAME10", "NEWNAME", true);
        let matcher = Matcher::new(&index, &cache);

        let c = candidate("NEWNAME", 4, "22/05/1979");
        assert_eq!(
            matcher.resolve(&c),
            MatchOutcome::Matched {
                fed_id: "1099999".to_string(),
                tier: MatchTier::Substitution,
            }
        );
    }

    #[test]
    fn test_name_only_fallback() {
        // Prefix disagrees (boundary id starts "24"), name still matches
        let ds = dataset(1976, vec![boundary("BERTHIER", "24001")]);
        let index = DatasetIndex::build(&ds);
        let cache = SubstitutionCache::new();
        let matcher = Matcher::new(&index, &cache);

        let c = candidate("BERTHIER", 4, "22/05/1979");
        assert_eq!(
            matcher.resolve(&c),
            MatchOutcome::Matched {
                fed_id: "24001".to_string(),
                tier: MatchTier::Name,
            }
        );
    }

    #[test]
    fn test_unresolved_records_failed_key() {
        let ds = dataset(1976, vec![boundary("SOMEWHERE", "1000001")]);
        let index = DatasetIndex::build(&ds);
        let cache = SubstitutionCache::new();
        let matcher = Matcher::new(&index, &cache);

        let mut c = vec![candidate("NOWHERE", 4, "22/05/1979")];
        let stats = matcher.resolve_all(&mut c);
        assert_eq!(stats.unresolved, 1);
        assert_eq!(stats.unresolved_keys, vec!["NOWHERE10".to_string()]);
        assert!(c[0].fed_id.is_none());
    }

    #[test]
    fn test_never_matches_across_eras() {
        let ds = dataset(1987, vec![boundary("EXAMPLE", "1007654")]);
        let index = DatasetIndex::build(&ds);
        let cache = SubstitutionCache::new();
        let matcher = Matcher::new(&index, &cache);

        // Candidate's election falls in era 1976; index is for 1987
        let c = candidate("EXAMPLE", 4, "22/05/1979");
        assert!(matches!(
            matcher.resolve(&c),
            MatchOutcome::Unresolved { .. }
        ));
    }

    #[test]
    fn test_collision_reported_first_kept() {
        let ds = dataset(
            1976,
            vec![boundary("TWIN", "1000001"), boundary("TWIN", "1000002")],
        );
        let index = DatasetIndex::build(&ds);
        assert_eq!(index.collisions().len(), 1);
        let (key, kept, dropped) = &index.collisions()[0];
        assert_eq!(key, "TWIN10");
        assert_eq!(kept, "1000001");
        assert_eq!(dropped, "1000002");
    }

    #[test]
    fn test_stats_summary() {
        let mut stats = MatchStats::default();
        stats.record(&MatchOutcome::Matched {
            fed_id: "1".to_string(),
            tier: MatchTier::Key,
        });
        stats.record(&MatchOutcome::Unresolved {
            fed_key: "X10".to_string(),
        });
        assert_eq!(
            stats.summary(),
            "2 candidates: 1 by key, 0 by substitution, 0 by name, 1 unresolved"
        );
    }
}
