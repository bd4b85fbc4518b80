//! Command-line runner for scenario files.

use anyhow::{bail, Context, Result};
use catchment_core::analysis::topology;
use catchment_core::display::{render_report, render_tree};
use catchment_core::{NodeId, Registry, Scenario};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "catchment")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Daily rainfall routing through river and dam networks", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a scenario and print the report
    Run(RunArgs),
    /// Check a scenario without simulating it
    Validate(ScenarioArgs),
    /// Print the network feeding the scenario's root
    Tree(ScenarioArgs),
}

#[derive(Args)]
struct ScenarioArgs {
    /// Scenario file (JSON)
    scenario: PathBuf,
}

#[derive(Args)]
struct RunArgs {
    /// Scenario file (JSON)
    scenario: PathBuf,

    /// Print every touched node's series as JSON instead of tables
    #[arg(long)]
    json: bool,

    /// Print the network tree before the report
    #[arg(long)]
    tree: bool,

    /// Reuse node results shared by several downstream paths
    #[arg(long)]
    memoize: bool,
}

fn load(path: &Path) -> Result<Scenario> {
    Scenario::from_path(path).with_context(|| format!("loading scenario {}", path.display()))
}

fn run(args: RunArgs) -> Result<()> {
    let mut scenario = load(&args.scenario)?;
    scenario.memoize |= args.memoize;
    info!(days = scenario.days, nodes = scenario.nodes.len(), root = %scenario.root, "scenario loaded");

    let (network, result) = scenario.run().context("simulation failed")?;
    info!(touched = result.touched().count(), "simulation finished");

    if args.tree {
        println!("{}", render_tree(&network.registry, network.root));
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result.to_named(&network.registry))?);
    } else {
        print!("{}", render_report(&result, &network.registry, network.root, scenario.days.max(0) as usize));
    }
    Ok(())
}

/// Evaluation order of the network feeding `root`, or an error listing every cycle.
fn check_network(registry: &Registry, root: NodeId) -> Result<String> {
    let cycles = topology::find_cycles(registry);
    if !cycles.is_empty() {
        let groups: Vec<String> = cycles
            .iter()
            .map(|group| group.iter().map(|&id| registry.name(id)).collect::<Vec<_>>().join(" -> "))
            .collect();
        bail!("network contains {} cycle(s): {}", cycles.len(), groups.join("; "));
    }

    let order = topology::evaluation_order(registry, root)?;
    let names: Vec<&str> = order.iter().map(|&id| registry.name(id)).collect();
    Ok(format!("ok: {} node(s), evaluation order: {}", registry.count(), names.join(", ")))
}

fn validate(args: ScenarioArgs) -> Result<()> {
    let network = load(&args.scenario)?.build().context("invalid network")?;
    println!("{}", check_network(&network.registry, network.root)?);
    Ok(())
}

fn tree(args: ScenarioArgs) -> Result<()> {
    let network = load(&args.scenario)?.build().context("invalid network")?;
    print!("{}", render_tree(&network.registry, network.root));
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run(args) => run(args),
        Commands::Validate(args) => validate(args),
        Commands::Tree(args) => tree(args),
    }
}
