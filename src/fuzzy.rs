// 🧩 Fuzzy reconciliation - rename orphaned boundary districts
//
// For each boundary record whose name has no candidate counterpart in its
// era, rank the orphaned candidate names by string similarity and ask a
// decision provider which one the district should be renamed to. Renames
// happen on the boundary dataset, not on candidate rows, so one decision
// fixes every candidate sharing that name. Decisions marked recurring are
// cached and auto-apply on later runs and later boundary files.

use crate::cache::SubstitutionCache;
use crate::model::BoundaryDataset;
use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};

// ============================================================================
// STRING SIMILARITY
// ============================================================================

/// Normalized similarity in 0.0..=1.0 based on Levenshtein distance:
/// 1.0 for identical strings, 0.0 for nothing in common.
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein_distance(a, b) as f64 / longest as f64
}

/// Minimum number of single-character edits (insert, delete, substitute)
/// to turn one string into the other.
fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();
    let (len1, len2) = (s1_chars.len(), s2_chars.len());

    if len1 == 0 {
        return len2;
    }
    if len2 == 0 {
        return len1;
    }

    let mut prev: Vec<usize> = (0..=len2).collect();
    let mut current = vec![0usize; len2 + 1];

    for i in 1..=len1 {
        current[0] = i;
        for j in 1..=len2 {
            let cost = if s1_chars[i - 1] == s2_chars[j - 1] { 0 } else { 1 };
            current[j] = (prev[j] + 1)
                .min(current[j - 1] + 1)
                .min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut current);
    }

    prev[len2]
}

/// Shortlist of pool names most similar to `target`, best first, capped at
/// `limit`, dropping anything below `cutoff`. The permissive default cutoff
/// works because era and province scoping already narrowed the pool.
pub fn closest_matches(
    target: &str,
    pool: &BTreeSet<String>,
    cutoff: f64,
    limit: usize,
) -> Vec<String> {
    let mut scored: Vec<(f64, &String)> = pool
        .iter()
        .map(|name| (similarity(target, name), name))
        .filter(|(score, _)| *score >= cutoff)
        .collect();
    // Stable ordering: score descending, then name, so runs are repeatable
    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored.into_iter().take(limit).map(|(_, n)| n.clone()).collect()
}

// ============================================================================
// DECISION PROVIDER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Rename to this name; `recurring` decisions are cached for auto-apply.
    Selected { name: String, recurring: bool },
    /// No selection; the boundary stays orphaned this pass.
    Declined,
}

/// What the operator (or script) is being asked about.
#[derive(Debug, Clone)]
pub struct RenamePrompt<'a> {
    pub source_key: &'a str,
    pub fed_id: &'a str,
    /// Candidate-side names on offer, best match first.
    pub choices: &'a [String],
}

/// The interaction seam. Production wiring is a console prompt; tests and
/// non-interactive runs use scripted or always-decline providers.
pub trait DecisionProvider {
    fn choose(&mut self, prompt: &RenamePrompt) -> Decision;
}

/// Interpret an operator reply against the offered choices.
///
/// Empty reply declines. `N` selects choice N (recurring). `N_once`
/// selects choice N one-shot. A reply that is not a valid index is taken
/// as a literal free-text replacement name.
fn interpret_reply(raw: &str, choices: &[String]) -> Decision {
    let raw = raw.trim();
    if raw.is_empty() {
        return Decision::Declined;
    }
    let mut parts = raw.split('_');
    let head = parts.next().unwrap_or_default();
    let recurring = parts.next().is_none();

    let name = match head.parse::<usize>() {
        Ok(index) if index < choices.len() => choices[index].clone(),
        _ => head.to_string(),
    };
    Decision::Selected { name, recurring }
}

/// Interactive stdin/stdout provider.
pub struct ConsoleDecisions;

impl DecisionProvider for ConsoleDecisions {
    fn choose(&mut self, prompt: &RenamePrompt) -> Decision {
        println!("{} {}", prompt.source_key, prompt.fed_id);
        for (i, choice) in prompt.choices.iter().enumerate() {
            println!(" {}: {}", i, choice);
        }
        print!("select a replacement option: ");
        if io::stdout().flush().is_err() {
            return Decision::Declined;
        }
        let mut reply = String::new();
        match io::stdin().lock().read_line(&mut reply) {
            Ok(_) => interpret_reply(&reply, prompt.choices),
            Err(err) => {
                eprintln!("input unavailable ({err}), declining");
                Decision::Declined
            }
        }
    }
}

/// Pre-supplied decisions, consumed in order; declines once exhausted.
pub struct ScriptedDecisions {
    replies: std::collections::VecDeque<Decision>,
}

impl ScriptedDecisions {
    pub fn new(replies: Vec<Decision>) -> Self {
        ScriptedDecisions {
            replies: replies.into(),
        }
    }
}

impl DecisionProvider for ScriptedDecisions {
    fn choose(&mut self, _prompt: &RenamePrompt) -> Decision {
        self.replies.pop_front().unwrap_or(Decision::Declined)
    }
}

/// Declines everything - for fully non-interactive runs.
pub struct DeclineAll;

impl DecisionProvider for DeclineAll {
    fn choose(&mut self, _prompt: &RenamePrompt) -> Decision {
        Decision::Declined
    }
}

// ============================================================================
// FUZZY RESOLVER
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Renames applied from the cache without a prompt.
    pub auto_applied: usize,
    /// Renames applied from fresh decisions.
    pub renamed: usize,
    /// Orphans the provider declined to rename.
    pub declined: usize,
    /// Stale cache entries removed (self-healing), with notices.
    pub evicted: Vec<String>,
}

pub struct FuzzyResolver {
    /// Minimum similarity for the shortlist (default 0.2 - permissive).
    pub cutoff: f64,
    /// Shortlist size (default 3).
    pub shortlist: usize,
}

impl FuzzyResolver {
    pub fn new() -> Self {
        FuzzyResolver {
            cutoff: 0.2,
            shortlist: 3,
        }
    }

    pub fn with_cutoff(cutoff: f64) -> Self {
        FuzzyResolver { cutoff, shortlist: 3 }
    }

    /// Reconcile one era's boundary dataset against its candidate names.
    ///
    /// `candidate_names` is the era's full set of (uppercased) riding names.
    /// Renames are applied in place; recurring decisions are written to
    /// `cache` (the caller persists it).
    pub fn reconcile_dataset(
        &self,
        dataset: &mut BoundaryDataset,
        candidate_names: &BTreeSet<String>,
        cache: &mut SubstitutionCache,
        provider: &mut dyn DecisionProvider,
    ) -> ReconcileStats {
        let boundary_names = dataset.names();
        let orphaned_boundaries: BTreeSet<String> = boundary_names
            .difference(candidate_names)
            .cloned()
            .collect();
        // The rename-target pool: candidate names with no boundary twin.
        // Chosen names leave the pool so two districts can't claim one name.
        let mut pool: BTreeSet<String> = candidate_names
            .difference(&boundary_names)
            .cloned()
            .collect();

        let mut stats = ReconcileStats::default();

        for record in &mut dataset.records {
            if !orphaned_boundaries.contains(&record.fedname) {
                continue;
            }
            let source_key = record.key();

            // Cached decision first. Only recurring entries auto-apply, but
            // any entry whose aliases all went stale is evicted - one-shot
            // entries must not linger in the cache file either.
            let cached = cache.get(&source_key).map(|entry| {
                let live = entry.aliases.iter().find(|a| pool.contains(*a)).cloned();
                (entry.recurring, live)
            });
            match cached {
                Some((true, Some(alias))) => {
                    record.fedname = alias.clone();
                    pool.remove(&alias);
                    stats.auto_applied += 1;
                    continue;
                }
                Some((_, None)) => {
                    cache.evict(&source_key);
                    stats
                        .evicted
                        .push(format!("removed stale cache entry {}", source_key));
                }
                // Live one-shot entry: kept for exact-match fallback,
                // decision still goes to the provider
                _ => {}
            }

            // Shortlist by similarity; on decline, offer the whole pool.
            let shortlist =
                closest_matches(&record.fedname, &pool, self.cutoff, self.shortlist);
            let prompt = RenamePrompt {
                source_key: &source_key,
                fed_id: &record.id,
                choices: &shortlist,
            };
            let mut decision = provider.choose(&prompt);

            if decision == Decision::Declined {
                let full_list: Vec<String> = pool.iter().cloned().collect();
                let prompt = RenamePrompt {
                    source_key: &source_key,
                    fed_id: &record.id,
                    choices: &full_list,
                };
                decision = provider.choose(&prompt);
            }

            match decision {
                Decision::Selected { name, recurring } => {
                    pool.remove(&name);
                    record.fedname = name.clone();
                    cache.insert_alias(&source_key, &name, recurring);
                    stats.renamed += 1;
                }
                Decision::Declined => {
                    stats.declined += 1;
                }
            }
        }

        stats
    }
}

impl Default for FuzzyResolver {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
