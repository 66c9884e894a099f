use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

use fedmatch::{
    ConsoleDecisions, DeclineAll, DecisionProvider, FuzzyResolver, IdentityTransform, Pipeline,
    ReportLog, SubstitutionCache,
};

/// Directory layout under the data root.
struct Layout {
    candidates_csv: PathBuf,
    resolved_csv: PathBuf,
    feds_raw: PathBuf,
    feds_processed: PathBuf,
    feds_geojson: PathBuf,
    logs: PathBuf,
}

impl Layout {
    fn new(data_dir: &Path) -> Self {
        Layout {
            candidates_csv: data_dir.join("candidates/candidate_data_cleaned.csv"),
            resolved_csv: data_dir.join("candidates/candidates_final.csv"),
            feds_raw: data_dir.join("feds/raw"),
            feds_processed: data_dir.join("feds/processed"),
            feds_geojson: data_dir.join("feds/final/geojson_4326"),
            logs: data_dir.join("logs"),
        }
    }

    fn cache_file(&self) -> PathBuf {
        self.logs.join("mismatched_feds_name_map.txt")
    }

    fn orphan_log(&self) -> PathBuf {
        self.logs.join("orphaned_feds.txt")
    }
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let mode = args.get(1).map(String::as_str).unwrap_or("");
    let data_dir = PathBuf::from(args.get(2).map(String::as_str).unwrap_or("data"));
    let layout = Layout::new(&data_dir);

    match mode {
        "match" => run_match(&layout),
        "reconcile" => run_reconcile(&layout, false),
        "reconcile-auto" => run_reconcile(&layout, true),
        "report" => run_report(&layout),
        "export" => run_export(&layout),
        _ => {
            eprintln!("usage: fedmatch <match|reconcile|reconcile-auto|report|export> [data-dir]");
            eprintln!("  match           resolve candidates against processed boundary sets");
            eprintln!("  reconcile       interactive rename pass over orphaned boundary names");
            eprintln!("  reconcile-auto  same, applying cached decisions only (no prompts)");
            eprintln!("  report          per-era orphan diagnostics");
            eprintln!("  export          reproject boundary sets to EPSG:4326 GeoJSON");
            std::process::exit(2);
        }
    }
}

fn load_inputs(layout: &Layout, pipeline: &Pipeline) -> Result<Vec<fedmatch::CandidateRecord>> {
    println!("📂 Loading candidates...");
    let mut candidates = fedmatch::io::load_candidates(&layout.candidates_csv)
        .with_context(|| format!("loading {}", layout.candidates_csv.display()))?;
    pipeline.assign_eras(&mut candidates)?;
    println!("✓ {} candidates across eras", candidates.len());
    Ok(candidates)
}

fn load_cache(layout: &Layout) -> Result<SubstitutionCache> {
    let cache = SubstitutionCache::load(&layout.cache_file())
        .with_context(|| format!("loading {}", layout.cache_file().display()))?;
    for warning in cache.warnings() {
        eprintln!("cache: {warning}");
    }
    println!("✓ substitution cache: {} entries", cache.len());
    Ok(cache)
}

fn run_match(layout: &Layout) -> Result<()> {
    let pipeline = Pipeline::new();
    let mut candidates = load_inputs(layout, &pipeline)?;
    let cache = load_cache(layout)?;

    // Prefer reconciled boundary sets when they exist
    let feds_dir = if layout.feds_processed.is_dir() {
        &layout.feds_processed
    } else {
        &layout.feds_raw
    };

    println!("\n🔎 Matching against {}...", feds_dir.display());
    let stats = pipeline.match_pass(&mut candidates, feds_dir, &cache)?;
    println!("✓ {}", stats.summary());

    fedmatch::io::write_candidates(&layout.resolved_csv, &candidates)
        .with_context(|| format!("writing {}", layout.resolved_csv.display()))?;
    println!("✓ Wrote {}", layout.resolved_csv.display());
    Ok(())
}

fn run_reconcile(layout: &Layout, auto_only: bool) -> Result<()> {
    let pipeline = Pipeline::new();
    let candidates = load_inputs(layout, &pipeline)?;
    let mut cache = load_cache(layout)?;

    let mut console = ConsoleDecisions;
    let mut decline = DeclineAll;
    let provider: &mut dyn DecisionProvider = if auto_only { &mut decline } else { &mut console };

    println!("\n🧩 Reconciling orphaned boundary names...");
    let stats = pipeline.reconcile_pass(
        &candidates,
        &layout.feds_raw,
        &layout.feds_processed,
        &mut cache,
        &FuzzyResolver::new(),
        provider,
    )?;

    for (era_id, s) in &stats {
        println!(
            "era {era_id}: {} renamed, {} auto-applied, {} declined",
            s.renamed, s.auto_applied, s.declined
        );
    }

    std::fs::create_dir_all(&layout.logs)?;
    cache
        .save(&layout.cache_file())
        .with_context(|| format!("saving {}", layout.cache_file().display()))?;
    println!("✓ Cache saved ({} entries)", cache.len());
    Ok(())
}

fn run_report(layout: &Layout) -> Result<()> {
    let pipeline = Pipeline::new();
    let candidates = load_inputs(layout, &pipeline)?;

    std::fs::create_dir_all(&layout.logs)?;
    let mut log = ReportLog::create(&layout.orphan_log(), true)?;
    let reports = pipeline.orphan_report(&candidates, &layout.feds_raw, &mut log)?;
    println!("\n✓ {} era reports -> {}", reports.len(), layout.orphan_log().display());
    Ok(())
}

fn run_export(layout: &Layout) -> Result<()> {
    let pipeline = Pipeline::new();
    println!("🌐 Exporting boundary sets to {}...", fedmatch::TARGET_CRS);
    let written = pipeline.export_pass(&layout.feds_raw, &layout.feds_geojson, &IdentityTransform)?;
    println!("✓ {} datasets exported", written.len());
    Ok(())
}
