//! Benchmark and validation harness on synthetic grid networks
//!
//! Supports:
//! - Point-to-point query benchmarks through the query-time overlay
//! - Randomized cross-checks of every engine against Dijkstra
//!
//! Outputs: p50/p95/p99 times + visited-node averages

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use hdrhistogram::Histogram;
use rand::prelude::*;
use rand::rngs::StdRng;
use tracing::info;

use butterfly_search::logging::init_logging;
use butterfly_search::overlay::{LocationIndex, QueryOverlayBuilder};
use butterfly_search::search::{self, WeightedGraph};
use butterfly_search::synthetic::{random_turn_costs, GridSpec};
use butterfly_search::validate::{cross_check, ValidationResult};
use butterfly_search::weighting::FastestWeighting;
use butterfly_search::{AlgorithmKind, Graph, NodeId, SearchOptions, TraversalMode};

const PLAIN_ALGORITHMS: [AlgorithmKind; 4] = [
    AlgorithmKind::Dijkstra,
    AlgorithmKind::AStar,
    AlgorithmKind::DijkstraBi,
    AlgorithmKind::AStarBi,
];

#[derive(Parser)]
#[command(name = "butterfly-search-bench")]
#[command(about = "Benchmark and validation harness for butterfly-search")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Benchmark point-to-point queries between random coordinates
    Query {
        /// Grid rows
        #[arg(long, default_value = "60")]
        rows: usize,

        /// Grid columns
        #[arg(long, default_value = "60")]
        cols: usize,

        /// Number of random coordinate pairs
        #[arg(long, default_value = "500")]
        n_queries: usize,

        /// Algorithms to run (default: all non-CH engines)
        #[arg(long, value_delimiter = ',')]
        algorithms: Vec<AlgorithmKind>,

        /// JSON file with search options applied to every query
        #[arg(long)]
        options: Option<PathBuf>,

        /// Random seed for reproducibility
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Cross-check every engine against unidirectional Dijkstra
    Validate {
        /// Grid rows
        #[arg(long, default_value = "30")]
        rows: usize,

        /// Grid columns
        #[arg(long, default_value = "30")]
        cols: usize,

        /// Number of random node pairs per engine
        #[arg(long, default_value = "1000")]
        n_tests: usize,

        /// Random turn rules to add (switches to edge-based traversal)
        #[arg(long, default_value = "0")]
        turn_rules: usize,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Query {
            rows,
            cols,
            n_queries,
            algorithms,
            options,
            seed,
        } => run_query_bench(rows, cols, n_queries, &algorithms, options, seed),

        Commands::Validate {
            rows,
            cols,
            n_tests,
            turn_rules,
            seed,
        } => run_validation(rows, cols, n_tests, turn_rules, seed),
    }
}

fn load_options(path: Option<PathBuf>) -> anyhow::Result<SearchOptions> {
    let Some(path) = path else {
        return Ok(SearchOptions::default());
    };
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read options file {}", path.display()))?;
    SearchOptions::from_json_str(&text)
        .with_context(|| format!("invalid options in {}", path.display()))
}

fn run_query_bench(
    rows: usize,
    cols: usize,
    n_queries: usize,
    algorithms: &[AlgorithmKind],
    options: Option<PathBuf>,
    seed: u64,
) -> anyhow::Result<()> {
    let base_options = load_options(options)?;
    let algorithms = if algorithms.is_empty() {
        PLAIN_ALGORITHMS.to_vec()
    } else {
        algorithms.to_vec()
    };
    if algorithms.contains(&AlgorithmKind::Ch) {
        bail!("the query bench has no contraction hierarchy; pick from dijkstra, astar, dijkstrabi, astarbi");
    }

    println!("═══════════════════════════════════════════════════════════════");
    println!("  QUERY BENCHMARK");
    println!("═══════════════════════════════════════════════════════════════");
    println!("  Grid: {} x {}", rows, cols);
    println!("  Queries: {}", n_queries);
    println!("  Traversal: {:?}", base_options.traversal_mode);
    println!("  Seed: {}", seed);
    println!();

    println!("[1/2] Building network...");
    let build_start = Instant::now();
    let spec = GridSpec::new(rows, cols, seed);
    let graph = spec.build().context("failed to build grid network")?;
    let index = LocationIndex::build(&graph);
    let weighting = FastestWeighting::new(graph.max_speed_kmh());
    println!("  ✓ Built in {:.2}s", build_start.elapsed().as_secs_f64());
    println!("  ✓ Nodes: {}", format_number(graph.node_count() as u64));
    println!("  ✓ Edges: {}", format_number(graph.edge_count() as u64));
    println!("  ✓ Indexed segments: {}", format_number(index.len() as u64));
    println!();

    let points = spec.random_points(2 * n_queries, seed.wrapping_add(1));
    let builder = QueryOverlayBuilder::new(&graph, &index)
        .max_candidates(base_options.snap_max_candidates);

    println!("[2/2] Running {} queries per algorithm...", n_queries);
    println!();

    for algorithm in algorithms {
        let options = base_options.clone().with_algorithm(algorithm);
        let mut hist_total = Histogram::<u64>::new(3)?;
        let mut hist_search = Histogram::<u64>::new(3)?;
        let mut visited_sum = 0u64;
        let mut found = 0usize;
        let mut failed = 0usize;

        for pair in points.chunks_exact(2) {
            let total_start = Instant::now();
            let overlay = match builder.build(pair) {
                Ok(overlay) => overlay,
                Err(e) => {
                    failed += 1;
                    info!(error = %e, "skipping query");
                    continue;
                }
            };
            let (Some(from), Some(to)) = (overlay.closest_node(0), overlay.closest_node(1)) else {
                failed += 1;
                continue;
            };
            let wg = WeightedGraph::new(&overlay, &weighting);

            let search_start = Instant::now();
            let done = match search::run(&wg, &options, from, to) {
                Ok(done) => done,
                Err(e) if e.is_limit_exceeded() => {
                    failed += 1;
                    continue;
                }
                Err(e) => return Err(e).context("search failed"),
            };
            let path = done.extract_path();
            let search_time = search_start.elapsed();
            let total_time = total_start.elapsed();

            hist_total.record(total_time.as_micros() as u64)?;
            hist_search.record(search_time.as_micros() as u64)?;
            visited_sum += done.visited_nodes() as u64;
            if path.found {
                found += 1;
            }
        }

        let ran = (n_queries - failed).max(1) as u64;
        println!("═══════════════════════════════════════════════════════════════");
        println!("  {}", algorithm.as_str().to_uppercase());
        println!("═══════════════════════════════════════════════════════════════");
        print_histogram_stats("Total (snap + search)", &hist_total);
        print_histogram_stats("Search", &hist_search);
        println!("  Found:          {:>12}", format_number(found as u64));
        println!("  Failed:         {:>12}", format_number(failed as u64));
        println!("  Avg visited:    {:>12}", format_number(visited_sum / ran));
        println!();
    }

    Ok(())
}

fn run_validation(
    rows: usize,
    cols: usize,
    n_tests: usize,
    turn_rules: usize,
    seed: u64,
) -> anyhow::Result<()> {
    println!("═══════════════════════════════════════════════════════════════");
    println!("  ENGINE CROSS-CHECK");
    println!("═══════════════════════════════════════════════════════════════");

    let spec = GridSpec::new(rows, cols, seed);
    let graph = spec.build().context("failed to build grid network")?;
    let mut weighting = FastestWeighting::new(graph.max_speed_kmh());
    let mut base_options = SearchOptions::default();
    if turn_rules > 0 {
        let table = random_turn_costs(&graph, turn_rules, seed.wrapping_add(7));
        println!(
            "  Turn rules: {} at {} junctions",
            table.n_rules(),
            table.n_restricted_nodes()
        );
        weighting = weighting.with_turn_costs(table);
        base_options =
            base_options.with_traversal_mode(TraversalMode::EdgeBased { u_turns: false });
    }
    let wg = WeightedGraph::new(&graph, &weighting);
    let reference = base_options.clone().with_algorithm(AlgorithmKind::Dijkstra);

    let mut failed = Vec::new();
    for algorithm in &PLAIN_ALGORITHMS[1..] {
        println!();
        let candidate = base_options.clone().with_algorithm(*algorithm);
        let result: ValidationResult = cross_check(
            graph.node_count(),
            n_tests,
            seed,
            |s: NodeId, t: NodeId| search::calc_path(&wg, &reference, s, t),
            |s: NodeId, t: NodeId| search::calc_path(&wg, &candidate, s, t),
        );
        result.print(AlgorithmKind::Dijkstra.as_str(), algorithm.as_str());
        if !result.is_valid() {
            failed.push(*algorithm);
        }
    }

    sample_overlay_routes(&spec, &graph, &weighting, &base_options, seed)?;

    if !failed.is_empty() {
        bail!("cross-check failed for {:?}", failed);
    }
    Ok(())
}

/// Snap a few random coordinates and make sure all engines agree on the overlay too.
fn sample_overlay_routes(
    spec: &GridSpec,
    graph: &butterfly_search::BaseGraph,
    weighting: &FastestWeighting,
    options: &SearchOptions,
    seed: u64,
) -> anyhow::Result<()> {
    let index = LocationIndex::build(graph);
    let builder = QueryOverlayBuilder::new(graph, &index);
    let mut rng = StdRng::seed_from_u64(seed);
    let points = spec.random_points(20, rng.random());

    let mut mismatches = 0;
    for pair in points.chunks_exact(2) {
        let overlay = builder.build(pair)?;
        let (Some(from), Some(to)) = (overlay.closest_node(0), overlay.closest_node(1)) else {
            continue;
        };
        let wg = WeightedGraph::new(&overlay, weighting);
        let reference = search::calc_path(&wg, &options.clone().with_algorithm(AlgorithmKind::Dijkstra), from, to)?;
        for algorithm in &PLAIN_ALGORITHMS[1..] {
            let path = search::calc_path(&wg, &options.clone().with_algorithm(*algorithm), from, to)?;
            if path.found != reference.found || (path.weight - reference.weight).abs() > 1e-6 {
                mismatches += 1;
            }
        }
    }
    println!();
    println!("  Overlay routes: {} mismatches", mismatches);
    if mismatches > 0 {
        bail!("{} overlay routes disagree with dijkstra", mismatches);
    }
    Ok(())
}

fn print_histogram_stats(name: &str, hist: &Histogram<u64>) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  {} timing (μs)", name);
    println!("───────────────────────────────────────────────────────────────");
    println!("    min:    {:>10.0}", hist.min() as f64);
    println!("    p50:    {:>10.0}", hist.value_at_quantile(0.50) as f64);
    println!("    p95:    {:>10.0}", hist.value_at_quantile(0.95) as f64);
    println!("    p99:    {:>10.0}", hist.value_at_quantile(0.99) as f64);
    println!("    max:    {:>10.0}", hist.max() as f64);
    println!("    mean:   {:>10.1}", hist.mean());
}

fn format_number(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.2}K", n as f64 / 1_000.0)
    } else {
        format!("{}", n)
    }
}
