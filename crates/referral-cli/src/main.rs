//! Referral network command-line tools.
//!
//! Provides the `referral` binary:
//! - `analyze` loads a `referrer,candidate` edge file and reports reach
//!   statistics and influencer rankings
//! - `demo` runs the same analysis over a seeded synthetic network
//! - `simulate` runs the fluid growth model
//! - `optimize` searches for the minimal referral bonus meeting a target
//!
//! All results are printed to stdout as JSON. Diagnostics go to stderr and
//! are filtered with `RUST_LOG`.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use referral_core::generate::{generate_network, NetworkShape};
use referral_core::{GraphStore, InfluencerEngine, ReferralGraph, RejectedEdge};
use referral_sim::report::optimization_report;
use referral_sim::{
    BonusOptimizer, GrowthConfig, GrowthSimulator, SaturatingAdoption, SimError,
};

/// Referral network analytics and growth planning.
#[derive(Parser)]
#[command(name = "referral", about = "Referral network analytics and growth planning")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Analyze a referral edge file.
    Analyze {
        /// File with one `referrer,candidate` pair per line.
        #[arg(short, long)]
        edges: PathBuf,

        /// Number of influencers to rank.
        #[arg(short, long, default_value_t = 5)]
        top: usize,
    },

    /// Analyze a synthetic network.
    Demo {
        #[arg(short, long, default_value_t = 50)]
        users: usize,

        #[arg(short, long, default_value_t = 42)]
        seed: u64,

        #[arg(short, long, default_value_t = 5)]
        top: usize,
    },

    /// Simulate referral growth at a fixed daily success probability.
    Simulate {
        #[arg(short, long)]
        probability: f64,

        #[arg(short, long)]
        days: u32,

        /// Also report the number of days needed to reach this total.
        #[arg(short, long)]
        target: Option<f64>,
    },

    /// Find the minimal bonus reaching a hiring target.
    Optimize {
        #[arg(short, long)]
        days: u32,

        #[arg(short, long)]
        target: f64,

        /// Bisection tolerance in currency units.
        #[arg(short, long, default_value_t = 1.0)]
        epsilon: f64,

        /// Adoption probability at zero bonus.
        #[arg(long)]
        base: Option<f64>,

        /// Adoption probability the curve saturates at.
        #[arg(long)]
        max: Option<f64>,

        /// Bonus at which ~63% of the adoption lift is reached.
        #[arg(long)]
        scale: Option<f64>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Analyze { edges, top } => run_analyze(&edges, top),
        Commands::Demo { users, seed, top } => run_demo(users, seed, top),
        Commands::Simulate {
            probability,
            days,
            target,
        } => run_simulate(probability, days, target),
        Commands::Optimize {
            days,
            target,
            epsilon,
            base,
            max,
            scale,
        } => {
            let defaults = SaturatingAdoption::default();
            let adoption = SaturatingAdoption {
                base: base.unwrap_or(defaults.base),
                max: max.unwrap_or(defaults.max),
                scale: scale.unwrap_or(defaults.scale),
            };
            run_optimize(days, target, epsilon, adoption)
        }
    };
    process::exit(exit_code);
}

/// Execute the analyze subcommand.
///
/// Returns exit code: 0 = success, 1 = malformed edge file, 3 = I/O error.
fn run_analyze(path: &Path, top: usize) -> i32 {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {}", path.display(), e);
            return 3;
        }
    };

    let edges = match parse_edges(&text) {
        Ok(edges) => edges,
        Err(msg) => {
            eprintln!("Error: {}: {}", path.display(), msg);
            return 1;
        }
    };

    let (graph, rejected) = ReferralGraph::from_edges(edges);
    tracing::info!(
        users = graph.user_count(),
        edges = graph.edge_count(),
        rejected = rejected.len(),
        "edge file loaded"
    );
    print_json(&analysis(&graph, &rejected, top));
    0
}

fn run_demo(users: usize, seed: u64, top: usize) -> i32 {
    let graph = generate_network(&NetworkShape {
        users,
        seed,
        ..Default::default()
    });
    print_json(&analysis(&graph, &[], top));
    0
}

fn run_simulate(probability: f64, days: u32, target: Option<f64>) -> i32 {
    let simulator = match simulator() {
        Ok(s) => s,
        Err(code) => return code,
    };

    let analytics = match simulator.analytics(probability, days) {
        Ok(a) => a,
        Err(e) => return sim_failure(&e),
    };

    let mut output = json!({
        "config": simulator.config(),
        "analytics": analytics,
    });
    if let Some(target) = target {
        let days_to_target = match simulator.days_to_target(probability, target) {
            Ok(days) => Some(days),
            Err(SimError::Unreachable { .. }) => None,
            Err(e) => return sim_failure(&e),
        };
        output["target"] = json!(target);
        output["days_to_target"] = json!(days_to_target);
    }
    print_json(&output);
    0
}

/// Execute the optimize subcommand.
///
/// Returns exit code: 0 = success, 1 = invalid input or infeasible target.
fn run_optimize(days: u32, target: f64, epsilon: f64, adoption: SaturatingAdoption) -> i32 {
    let simulator = match simulator() {
        Ok(s) => s,
        Err(code) => return code,
    };
    let optimizer = BonusOptimizer::new(simulator);

    match optimization_report(&optimizer, days, target, &adoption, epsilon) {
        Ok(report) => {
            print_json(&json!({
                "adoption": adoption,
                "report": report,
            }));
            0
        }
        Err(e) => sim_failure(&e),
    }
}

fn simulator() -> Result<GrowthSimulator, i32> {
    GrowthConfig::from_env()
        .and_then(GrowthSimulator::new)
        .map_err(|e| {
            eprintln!("Error: invalid growth configuration: {}", e);
            1
        })
}

fn sim_failure(err: &SimError) -> i32 {
    if err.is_infeasible() {
        eprintln!("Infeasible: {}", err);
    } else {
        eprintln!("Error: {}", err);
    }
    1
}

/// Parses `referrer,candidate` lines. Blank lines and `#` comments are
/// skipped; identifier validity is left to the graph.
fn parse_edges(text: &str) -> Result<Vec<(String, String)>, String> {
    let mut edges = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (referrer, candidate) = line.split_once(',').ok_or_else(|| {
            format!(
                "line {}: expected 'referrer,candidate', got '{}'",
                number + 1,
                line
            )
        })?;
        edges.push((referrer.trim().to_string(), candidate.trim().to_string()));
    }
    Ok(edges)
}

fn analysis(graph: &ReferralGraph, rejected: &[RejectedEdge], top: usize) -> Value {
    let engine = InfluencerEngine::new(graph);
    let rejected: Vec<Value> = rejected
        .iter()
        .map(|r| {
            json!({
                "referrer": r.referrer,
                "candidate": r.candidate,
                "reason": r.error.to_string(),
            })
        })
        .collect();

    json!({
        "users": graph.user_count(),
        "edges": graph.edge_count(),
        "roots": graph.roots(),
        "statistics": engine.analytics().statistics(),
        "comparison": engine.comparison(top),
        "rejected": rejected,
    })
}

fn print_json(value: &Value) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize result: {}\"}}", e));
    println!("{}", json);
}
