//! DnsSim DST CLI
//!
//! Replay synthetic request timelines through the DNS resolution cache.

use clap::Parser;
use dnssim_core::DnsCacheOptions;
use dnssim_sim::scenarios::ScenarioId;
use dnssim_sim::{ScenarioResult, ScenarioRunner, SimError};
use rayon::prelude::*;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// DnsSim Deterministic Simulation Testing CLI
#[derive(Parser, Debug)]
#[command(name = "dnssim")]
#[command(about = "Replay simulated request timelines through the DNS resolution cache", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Round-trip time baseline in milliseconds
    #[arg(short, long, default_value = "100")]
    rtt: f64,

    /// JSON file with cache options (overrides --rtt)
    #[arg(long)]
    options: Option<String>,

    /// Scenario to run (cold_start, warm_cache, out_of_order, prewarmed, what_if, contended, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Requests per timeline
    #[arg(short = 'n', long, default_value = "200")]
    requests: usize,

    /// Size of the host pool
    #[arg(short, long, default_value = "12")]
    domains: usize,

    /// Mean gap between requests in milliseconds
    #[arg(long, default_value = "25")]
    mean_gap: f64,

    /// Number of consecutive seeds to run (in parallel)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Worker threads for the contended scenario
    #[arg(long, default_value = "4")]
    workers: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export per-request timings of a single scenario to a JSON file
    #[arg(long)]
    export: Option<String>,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to set tracing subscriber");
    }
}

fn load_options(args: &Args) -> Result<DnsCacheOptions, SimError> {
    let options = match &args.options {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            DnsCacheOptions::from_json(&json)?
        }
        None => DnsCacheOptions::with_rtt(args.rtt),
    };

    // Fail fast rather than once per scenario
    options.validate()?;
    Ok(options)
}

fn runner_for(args: &Args, seed: u64, options: DnsCacheOptions) -> ScenarioRunner {
    ScenarioRunner::new(seed, args.rtt)
        .with_options(options)
        .with_requests(args.requests)
        .with_domains(args.domains)
        .with_mean_gap(args.mean_gap)
        .with_workers(args.workers)
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if !args.json {
        info!("DnsSim DST v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let options = match load_options(&args) {
        Ok(options) => options,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        match args.scenario.parse() {
            Ok(scenario) => vec![scenario],
            Err(e) => {
                error!("{}", e);
                error!("Available scenarios: cold_start, warm_cache, out_of_order, prewarmed, what_if, contended, all");
                std::process::exit(1);
            }
        }
    };

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    // Handle --export mode
    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            error!("--export only supports a single scenario, not 'all'");
            std::process::exit(1);
        }

        let (result, export) = runner_for(&args, base_seed, options).run_with_export(scenarios[0]);
        if let Err(e) = export.write_to_file(export_path) {
            error!("Failed to write export to {}: {}", export_path, e);
            std::process::exit(1);
        }
        info!("Exported {} frames to {}", export.frames.len(), export_path);

        if result.passed {
            info!("✓ {} (seed={}) PASSED", scenarios[0].name(), base_seed);
        } else {
            error!(
                "✗ {} FAILED: {}",
                scenarios[0].name(),
                result.failure_reason.as_deref().unwrap_or("unknown")
            );
            std::process::exit(1);
        }
        return;
    }

    // Each seed owns its caches, so seeds can run side by side
    let all_results: Vec<ScenarioResult> = (0..args.seeds)
        .into_par_iter()
        .flat_map_iter(|seed_offset| {
            let seed = base_seed.wrapping_add(seed_offset as u64);
            let runner = runner_for(&args, seed, options);
            scenarios
                .iter()
                .map(|scenario| runner.run(*scenario))
                .collect::<Vec<_>>()
        })
        .collect();

    let failed_count = all_results.iter().filter(|r| !r.passed).count();
    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "final_time_ms": r.final_time_ms,
                    "cached_domains": r.cached_domains,
                    "metrics": r.metrics,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to serialize summary: {}", e),
        }
    } else {
        for result in &all_results {
            if result.passed {
                info!(
                    "✓ {} (seed={}) PASSED | mean DNS {:.1}ms",
                    result.scenario.name(),
                    result.seed,
                    result.metrics.mean_dns_ms()
                );
            }
        }

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
