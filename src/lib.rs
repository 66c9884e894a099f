// fedmatch - reconcile historical electoral district identities
// Exposes all engine modules for use in the CLI and tests

pub mod cache;
pub mod eras;
pub mod errors;
pub mod export;
pub mod fuzzy;
pub mod io;
pub mod keys;
pub mod matcher;
pub mod model;
pub mod orphans;
pub mod pipeline;

// Re-export commonly used types
pub use cache::{CacheEntry, SubstitutionCache};
pub use eras::{province_prefix, Era, EraTable};
pub use errors::ReconcileError;
pub use export::{CrsTransform, Exporter, IdentityTransform, TARGET_CRS};
pub use fuzzy::{
    ConsoleDecisions, Decision, DecisionProvider, DeclineAll, FuzzyResolver, RenamePrompt,
    ScriptedDecisions,
};
pub use keys::{boundary_key, candidate_key};
pub use matcher::{DatasetIndex, MatchOutcome, MatchStats, MatchTier, Matcher};
pub use model::{BoundaryDataset, BoundaryRecord, CandidateRecord, Geometry};
pub use orphans::{analyze, EraOrphanReport, OrphanSets, ReportLog};
pub use pipeline::Pipeline;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
