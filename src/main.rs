use anyhow::{bail, Context, Result};
use std::env;
use std::path::Path;
use std::sync::Arc;

use region_engine::{
    load_geometries_json, load_records_csv, AssignmentCascade, Catalog, ContaminationValidator,
    HistoricalIndex, PatternResolver, TerritoryDissolver, VERSION,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        print_usage();
        std::process::exit(1);
    }

    let catalog = Arc::new(match flag_value(&args, "--catalog") {
        Some(path) => Catalog::from_file(path)?,
        None => Catalog::standard(),
    });

    match args[1].as_str() {
        "assign" => run_assign(Path::new(&args[2]), catalog, flag_value(&args, "--patterns")),
        "validate" => run_validate(Path::new(&args[2]), catalog),
        "dissolve" => run_dissolve(Path::new(&args[2])),
        other => {
            print_usage();
            bail!("unknown command: {}", other)
        }
    }
}

fn print_usage() {
    eprintln!("region-audit {}", VERSION);
    eprintln!("Usage:");
    eprintln!("   region-audit assign <records.csv> [--catalog <catalog.json>] [--patterns <patterns.json>]");
    eprintln!("   region-audit validate <records.csv> [--catalog <catalog.json>]");
    eprintln!("   region-audit dissolve <geometries.json>");
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn run_assign(csv_path: &Path, catalog: Arc<Catalog>, patterns_path: Option<&str>) -> Result<()> {
    println!("🧭 Territory Assignment");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Load records
    println!("\n📂 Loading records...");
    let records = load_records_csv(csv_path)?;
    println!("✓ Loaded {} records", records.len());

    // 2. Historical index from records that already carry a territory
    let index = HistoricalIndex::build(records.iter().filter_map(|r| {
        match (r.name_text(), r.stored_territory()) {
            (Some(name), Some(territory)) => Some((name.to_string(), territory.to_string())),
            _ => None,
        }
    }));
    println!("✓ Historical index: {} identifiers", index.len());

    // 3. Cascade
    let cascade = match patterns_path {
        Some(path) => AssignmentCascade::with_patterns(
            catalog.clone(),
            PatternResolver::from_file(catalog, path)
                .with_context(|| format!("Failed to load patterns from {}", path))?,
        ),
        None => AssignmentCascade::new(catalog),
    };

    println!("\n🔍 Resolving...");
    let results = cascade.resolve_batch(&records, Some(&index));

    let mut assigned = 0;
    let mut errors = 0;
    for (record, result) in records.iter().zip(&results) {
        match result {
            Ok(r) => {
                if r.is_assigned() {
                    assigned += 1;
                }
                println!("   {} → {}", record.id, r.summary());
            }
            Err(e) => {
                errors += 1;
                println!("   {} ❌ {}", record.id, e);
            }
        }
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Assigned: {}", assigned);
    println!("⚠️  Unassigned: {}", records.len() - assigned - errors);
    println!("❌ Invalid: {}", errors);

    Ok(())
}

fn run_validate(csv_path: &Path, catalog: Arc<Catalog>) -> Result<()> {
    println!("🔎 Contamination Audit");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("\n📂 Loading records...");
    let records = load_records_csv(csv_path)?;
    println!("✓ Loaded {} records", records.len());

    let validator = ContaminationValidator::new(catalog);
    let results = validator.validate_batch(&records);

    for (id, result) in &results {
        match result {
            Ok(Some(finding)) if !finding.is_valid => println!("   {} ⚠️  {}", id, finding.summary()),
            Err(e) => println!("   {} ❌ {}", id, e),
            _ => {}
        }
    }

    let summary = validator.batch_summary(&results);
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📊 {}", summary.summary());

    Ok(())
}

fn run_dissolve(json_path: &Path) -> Result<()> {
    println!("🧩 Territory Dissolve");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut geometries = load_geometries_json(json_path)?;
    println!("✓ Loaded {} territories", geometries.len());

    let report = TerritoryDissolver::new().dissolve_all(&mut geometries);
    for (territory, error) in &report.failures {
        println!("   {} ❌ {}", territory, error);
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📊 {}", report.summary());
    println!("{}", serde_json::to_string_pretty(&geometries)?);

    Ok(())
}
