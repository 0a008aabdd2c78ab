//! ThreatMesh Simulator CLI
//!
//! Run deterministic engine scenarios, export frames for a visualizer, or
//! drive a live, wall-clock paced simulation.

use clap::Parser;
use std::time::Duration;
use threatmesh_env::TokioContext;
use threatmesh_sim::scenarios::ScenarioId;
use threatmesh_sim::{
    DriverError, ScenarioResult, ScenarioRunner, SimConfig, SimExport, SimFrame, SimWorld,
    SimulationDriver,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Runs a bootstrapped, growing world and writes one frame per tick.
fn run_with_export(config: SimConfig, ticks: u64, export_path: &str) -> bool {
    let seed = config.seed;
    let mut world = match SimWorld::new(config) {
        Ok(world) => world,
        Err(e) => {
            error!("Invalid config: {}", e);
            return false;
        }
    };

    let mut export = SimExport::new("export", seed);
    let mut passed = world.bootstrap().is_ok();

    for _ in 0..ticks {
        match world.tick() {
            Ok(report) => {
                passed &= (0.0..=1.0).contains(&report.threat);
                let frame = SimFrame::capture(&report, world.scheduler().engine().graph(), world.time());
                export.add_frame(frame);
            }
            Err(e) => {
                error!("Tick failed: {}", e);
                passed = false;
                break;
            }
        }
    }

    export.finalize(passed, Some(world.scheduler().current_threat()));

    if let Err(e) = export.write_to_file(export_path) {
        error!("Failed to write export: {:?}", e);
        return false;
    }
    info!("Exported {} frames to {}", export.frames.len(), export_path);
    passed
}

/// Paces a bootstrapped world on the wall clock until `ticks` frames have
/// been seen.
async fn run_live(mut world: SimWorld, ticks: u64, interval: Duration) -> Result<(), DriverError> {
    world.bootstrap()?;

    let handle = SimulationDriver::spawn(TokioContext::shared(), world.into_scheduler()?);
    let mut frames = handle.subscribe();
    handle.start(interval).await?;

    loop {
        match frames.recv().await {
            Ok(frame) => {
                info!(
                    "tick {:>4} | t={:>6.1}s | threat {:.3} | A/D/O {}/{}/{} | mean u {:.3}",
                    frame.tick,
                    frame.time_sec,
                    frame.threat,
                    frame.stats.attackers,
                    frame.stats.defenders,
                    frame.stats.observers,
                    frame.stats.mean_uncertainty
                );
                for event in &frame.events {
                    info!("  {}", event.message);
                }
                if frame.tick >= ticks {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => warn!("Display lagged, skipped {} frames", skipped),
            Err(RecvError::Closed) => return Err(DriverError::Closed),
        }
    }

    let snapshot = handle.snapshot().await?;
    info!(
        "Final: {} agents, {} relationships, threat {:.3}",
        snapshot.stats.agents, snapshot.stats.relationships, snapshot.threat
    );
    handle.shutdown().await
}

/// ThreatMesh deterministic simulation CLI
#[derive(Parser, Debug)]
#[command(name = "threatmesh-sim")]
#[command(about = "Run deterministic simulations of the ThreatMesh engine", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (duel, empty, chain, observer_flip, bootstrap, surge, growth, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Ticks per run
    #[arg(short, long, default_value = "100")]
    ticks: u64,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// JSON config file (engine parameters, growth, bootstrap size)
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export a bootstrapped run to a JSON file for visualization
    #[arg(long)]
    export: Option<String>,

    /// Drive a live simulation on the wall clock
    #[arg(long)]
    live: bool,

    /// Live tick interval in milliseconds
    #[arg(long, default_value = "1200")]
    interval_ms: u64,
}

fn main() {
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    if !args.json {
        info!("ThreatMesh Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let mut base_config = match &args.config {
        Some(path) => SimConfig::from_file(path).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }),
        None => SimConfig::default(),
    };

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };
    base_config.seed = base_seed;

    // Handle --live mode
    if args.live {
        let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("Error: failed to start runtime: {}", e);
            std::process::exit(1);
        });
        let world = SimWorld::new(base_config).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });
        let interval = Duration::from_millis(args.interval_ms);
        if let Err(e) = runtime.block_on(run_live(world, args.ticks, interval)) {
            error!("Live simulation failed: {}", e);
            std::process::exit(1);
        }
        return;
    }

    // Handle --export mode for visualization
    if let Some(export_path) = &args.export {
        info!("Running with export to: {}", export_path);
        if run_with_export(base_config, args.ticks, export_path) {
            info!("✓ export (seed={}) PASSED - exported to {}", base_seed, export_path);
        } else {
            error!("✗ export (seed={}) FAILED", base_seed);
            std::process::exit(1);
        }
        return;
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            eprintln!("Available scenarios: duel, empty, chain, observer_flip, bootstrap, surge, growth, all");
            std::process::exit(1);
        })]
    };

    // Track results
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    // Run simulations
    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);

        let runner = ScenarioRunner::new(seed)
            .with_ticks(args.ticks)
            .with_config(base_config.clone());

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

    // Summary
    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results,
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Error: failed to encode summary: {}", e),
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
