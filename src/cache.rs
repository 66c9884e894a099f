// 📒 Substitution cache - persisted record of resolved name mismatches
//
// Every operator decision about an irregular district name lands here, so
// the next run (or the next boundary file sharing the key) resolves the
// same mismatch without a prompt. The on-disk format is deliberately plain:
// one line per source key,
//
//   SOURCEKEY,alias[,alias...]
//
// with a leading '!' marking a one-shot (non-recurring) entry. Aliases
// accumulate over time and are tried in order.

use crate::errors::{ReconcileError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Replacement names recorded for this key, in decision order.
    pub aliases: Vec<String>,
    /// Recurring entries auto-apply during reconciliation; one-shot entries
    /// only participate in exact-match fallback.
    pub recurring: bool,
}

/// Key -> aliases mapping, decoupled from its on-disk encoding.
/// Load tolerates a missing file; save is atomic (temp file + rename).
#[derive(Debug, Default)]
pub struct SubstitutionCache {
    entries: BTreeMap<String, CacheEntry>,
    warnings: Vec<String>,
}

impl SubstitutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the cache from `path`. A missing file is an empty cache;
    /// malformed lines are skipped and reported via `warnings()`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(err.into()),
        };

        let mut cache = SubstitutionCache::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match parse_line(line, idx + 1) {
                Ok((key, entry)) => {
                    // Later lines for the same key extend the alias list
                    cache.merge(key, entry);
                }
                Err(err) => cache.warnings.push(err.to_string()),
            }
        }
        Ok(cache)
    }

    /// Atomic replace-on-write: serialize to a sibling temp file, then
    /// rename over the target so a crash never corrupts existing entries.
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp_path = path.with_extension("tmp");
        {
            let mut tmp = fs::File::create(&tmp_path)?;
            for (key, entry) in &self.entries {
                let marker = if entry.recurring { "" } else { "!" };
                writeln!(tmp, "{}{},{}", marker, key, entry.aliases.join(","))?;
            }
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Record a decision. Existing aliases for the key are kept; the new
    /// alias is appended unless already present. A recurring decision
    /// upgrades a one-shot entry.
    pub fn insert_alias(&mut self, source_key: &str, alias: &str, recurring: bool) {
        let entry = self
            .entries
            .entry(source_key.to_string())
            .or_insert_with(|| CacheEntry {
                aliases: Vec::new(),
                recurring,
            });
        if !entry.aliases.iter().any(|a| a == alias) {
            entry.aliases.push(alias.to_string());
        }
        entry.recurring = entry.recurring || recurring;
    }

    /// Self-healing removal of a stale entry.
    pub fn evict(&mut self, source_key: &str) -> bool {
        self.entries.remove(source_key).is_some()
    }

    pub fn get(&self, source_key: &str) -> Option<&CacheEntry> {
        self.entries.get(source_key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CacheEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse warnings accumulated during load.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn merge(&mut self, key: String, incoming: CacheEntry) {
        let recurring = incoming.recurring;
        for alias in incoming.aliases {
            self.insert_alias(&key, &alias, recurring);
        }
    }
}

fn parse_line(line: &str, line_no: usize) -> Result<(String, CacheEntry)> {
    let (recurring, rest) = match line.strip_prefix('!') {
        Some(rest) => (false, rest),
        None => (true, line),
    };
    let mut fields = rest.split(',').map(str::trim);
    let key = fields.next().unwrap_or_default();
    let aliases: Vec<String> = fields
        .filter(|alias| !alias.is_empty())
        .map(str::to_string)
        .collect();

    if key.is_empty() {
        return Err(ReconcileError::CacheParse {
            line_no,
            reason: "missing source key".to_string(),
        });
    }
    if aliases.is_empty() {
        return Err(ReconcileError::CacheParse {
            line_no,
            reason: format!("no aliases for key '{}'", key),
        });
    }
    Ok((key.to_string(), CacheEntry { aliases, recurring }))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_cache() {
        let dir = TempDir::new().unwrap();
        let cache = SubstitutionCache::load(&dir.path().join("absent.txt")).unwrap();
        assert!(cache.is_empty());
        assert!(cache.warnings().is_empty());
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("subs.txt");

        let mut cache = SubstitutionCache::new();
        cache.insert_alias("OLDNAME10", "NEWNAME", true);
        cache.insert_alias("ANOTHER24", "REPLACEMENT", false);
        cache.save(&path).unwrap();

        let loaded = SubstitutionCache::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        let entry = loaded.get("OLDNAME10").unwrap();
        assert_eq!(entry.aliases, vec!["NEWNAME".to_string()]);
        assert!(entry.recurring);
        assert!(!loaded.get("ANOTHER24").unwrap().recurring);
    }

    #[test]
    fn test_malformed_lines_skipped_with_warning() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("subs.txt");
        fs::write(&path, "GOOD10,ALIAS\n,\nLONELY35\n").unwrap();

        let cache = SubstitutionCache::load(&path).unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.get("GOOD10").is_some());
        assert_eq!(cache.warnings().len(), 2);
    }

    #[test]
    fn test_append_preserves_existing_aliases() {
        let mut cache = SubstitutionCache::new();
        cache.insert_alias("KEY10", "FIRST", true);
        cache.insert_alias("KEY10", "SECOND", true);
        cache.insert_alias("KEY10", "FIRST", true); // duplicate, ignored
        assert_eq!(
            cache.get("KEY10").unwrap().aliases,
            vec!["FIRST".to_string(), "SECOND".to_string()]
        );
    }

    #[test]
    fn test_historical_alias_lines_merge_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("subs.txt");
        fs::write(&path, "KEY10,FIRST\nKEY10,SECOND,THIRD\n").unwrap();

        let cache = SubstitutionCache::load(&path).unwrap();
        assert_eq!(
            cache.get("KEY10").unwrap().aliases,
            vec!["FIRST".to_string(), "SECOND".to_string(), "THIRD".to_string()]
        );
    }

    #[test]
    fn test_evict() {
        let mut cache = SubstitutionCache::new();
        cache.insert_alias("KEY10", "NAME", true);
        assert!(cache.evict("KEY10"));
        assert!(!cache.evict("KEY10"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_save_does_not_duplicate_on_resave() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("subs.txt");

        let mut cache = SubstitutionCache::new();
        cache.insert_alias("KEY10", "NAME", true);
        cache.save(&path).unwrap();

        // Load, re-insert same decision, save again: file stays one line
        let mut again = SubstitutionCache::load(&path).unwrap();
        again.insert_alias("KEY10", "NAME", true);
        again.save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert_eq!(text.trim(), "KEY10,NAME");
    }
}
