//! TrackMate Simulator CLI
//!
//! Runs synthetic tracking scenarios against the feature & event model.

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use trackmate_sim::scenarios::ScenarioId;
use trackmate_sim::{AnalyzerMode, ScenarioResult, ScenarioRunner};

/// TrackMate synthetic scenario CLI
#[derive(Parser, Debug)]
#[command(name = "trackmate-sim")]
#[command(about = "Run synthetic tracking scenarios against the TrackMate model", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (chains, random_walk, merge_split, churn, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of tracks per scenario
    #[arg(short, long, default_value = "10")]
    tracks: usize,

    /// Track depth (spots per track minus one)
    #[arg(short, long, default_value = "9")]
    depth: usize,

    /// Physical time between frames
    #[arg(long, default_value = "2.0")]
    time_step: f64,

    /// Feature computation mode (incremental, batch)
    #[arg(short, long, default_value = "incremental")]
    mode: AnalyzerMode,

    /// Run analyzers without rayon
    #[arg(long)]
    sequential: bool,

    /// Number of random seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export the final feature tables to a JSON file
    #[arg(long)]
    export: Option<String>,
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if !args.json {
        info!("TrackMate Simulator v0.1.0");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        match args.scenario.parse() {
            Ok(scenario) => vec![scenario],
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!("Available scenarios: chains, random_walk, merge_split, churn, all");
                std::process::exit(1);
            }
        }
    };

    if args.export.is_some() && (scenarios.len() > 1 || args.seeds > 1) {
        eprintln!("Error: --export only supports a single scenario and seed");
        std::process::exit(1);
    }

    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);

        let runner = ScenarioRunner::new(seed)
            .with_tracks(args.tracks)
            .with_depth(args.depth)
            .with_time_step(args.time_step)
            .with_analyzer_mode(args.mode)
            .with_parallel(!args.sequential);

        for scenario in &scenarios {
            let result = runner.run(*scenario);

            if !args.json {
                if result.passed {
                    info!("✓ {} (seed={}) PASSED", scenario.name(), seed);
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if !result.passed {
                failed_count += 1;
            }

            all_results.push(result);
        }
    }

    if let Some(export_path) = &args.export {
        match all_results.first().and_then(|r| r.export.as_ref()) {
            Some(export) => match export.write_to_file(export_path) {
                Ok(()) => info!(
                    "Exported {} spots, {} edges, {} tracks to {}",
                    export.spots.len(),
                    export.edges.len(),
                    export.tracks.len(),
                    export_path
                ),
                Err(e) => {
                    error!("Failed to write export: {:?}", e);
                    failed_count += 1;
                }
            },
            None => error!("Nothing to export, the run errored before building a model"),
        }
    }

    // Summary
    let total = all_results.len();
    let passed = total - failed_count.min(total);

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "mode": args.mode.to_string(),
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "events": r.metrics.events,
                    "rollbacks": r.metrics.rollbacks,
                    "spots": r.metrics.final_spots,
                    "edges": r.metrics.final_edges,
                    "tracks": r.metrics.final_tracks,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize summary: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);

            for result in &all_results {
                if !result.passed {
                    error!(
                        "  - {} seed={}: {}",
                        result.scenario.name(),
                        result.seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
