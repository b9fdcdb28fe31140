//! Data-analysis agent CLI.
//!
//! `run` plans and executes an analysis request; `validate` checks a plan
//! file without executing anything.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use analyst::core::plan::Plan;
use analyst::core::workspace::Workspace;
use analyst::executor::PlanExecutor;
use analyst::io::config::load_config;
use analyst::io::oracle::{CommandOracle, PlanOracle};
use analyst::io::plan_store::{load_cached_plan, write_plan_cache};
use analyst::logging;
use analyst::tools::default_registry;
use analyst::validate::parse_and_validate;

#[derive(Parser)]
#[command(
    name = "analyst",
    version,
    about = "Self-correcting data-analysis plan runner"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Plan and execute an analysis request.
    Run {
        /// The natural-language analysis request.
        request: String,
        /// Execute this plan file instead of consulting the planner oracle.
        #[arg(long)]
        plan: Option<PathBuf>,
        /// Reuse/write a cached plan at this path.
        #[arg(long)]
        cache: Option<PathBuf>,
        /// Config file (TOML). Missing file means defaults.
        #[arg(long, default_value = "analyst.toml")]
        config: PathBuf,
    },
    /// Generate (or load) a plan and pretty-print it without executing.
    PrintPlan {
        /// The natural-language analysis request.
        request: String,
        /// Print this plan file instead of consulting the planner oracle.
        #[arg(long)]
        plan: Option<PathBuf>,
        /// Reuse/write a cached plan at this path.
        #[arg(long)]
        cache: Option<PathBuf>,
        /// Config file (TOML). Missing file means defaults.
        #[arg(long, default_value = "analyst.toml")]
        config: PathBuf,
    },
    /// Check a plan file against the schema and invariants.
    Validate {
        plan: PathBuf,
    },
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            request,
            plan,
            cache,
            config,
        } => cmd_run(&request, plan.as_deref(), cache.as_deref(), &config),
        Command::PrintPlan {
            request,
            plan,
            cache,
            config,
        } => cmd_print_plan(&request, plan.as_deref(), cache.as_deref(), &config),
        Command::Validate { plan } => cmd_validate(&plan),
    }
}

fn cmd_print_plan(
    request: &str,
    plan_path: Option<&Path>,
    cache_path: Option<&Path>,
    config_path: &Path,
) -> Result<()> {
    let config = load_config(config_path)
        .with_context(|| format!("load config {}", config_path.display()))?;
    let oracle = CommandOracle::new(
        config.oracle.command.clone(),
        config.oracle_timeout(),
        config.output_limit_bytes,
    );
    let plan = obtain_plan(request, plan_path, cache_path, &oracle)?;
    println!("{}", plan.to_text());
    Ok(())
}

fn cmd_run(
    request: &str,
    plan_path: Option<&Path>,
    cache_path: Option<&Path>,
    config_path: &Path,
) -> Result<()> {
    let config = load_config(config_path)
        .with_context(|| format!("load config {}", config_path.display()))?;

    let oracle = CommandOracle::new(
        config.oracle.command.clone(),
        config.oracle_timeout(),
        config.output_limit_bytes,
    );
    let plan = obtain_plan(request, plan_path, cache_path, &oracle)?;

    let registry = default_registry(&config);
    let executor = PlanExecutor::new(&registry, &oracle, config.max_retries);

    let mut workspace = Workspace::new();
    let report = executor.execute(request, &plan, &mut workspace);

    if let Some(answer) = &workspace.final_answer {
        println!("Final answer:\n{answer}");
    }
    if let Some(table) = &workspace.table {
        println!("\nTable ({} rows):", table.row_count());
        print!("{}", table.preview(5));
    }
    if let Some(error) = &workspace.error_message {
        eprintln!("\nAn error occurred: {error}");
    }

    if !report.completed() {
        bail!("plan halted before completion");
    }
    Ok(())
}

fn obtain_plan(
    request: &str,
    plan_path: Option<&Path>,
    cache_path: Option<&Path>,
    oracle: &dyn PlanOracle,
) -> Result<Plan> {
    if let Some(path) = plan_path {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read plan {}", path.display()))?;
        return parse_and_validate(&raw)
            .with_context(|| format!("plan {} is invalid", path.display()));
    }

    if let Some(path) = cache_path
        && let Some(plan) = load_cached_plan(path)?
    {
        return Ok(plan);
    }

    let plan = oracle.plan(request, None).context("generate plan")?;
    if let Some(path) = cache_path {
        write_plan_cache(path, &plan)?;
    }
    Ok(plan)
}

fn cmd_validate(plan_path: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(plan_path)
        .with_context(|| format!("read plan {}", plan_path.display()))?;
    let plan = parse_and_validate(&raw)
        .with_context(|| format!("plan {} is invalid", plan_path.display()))?;
    println!("plan ok: {} steps", plan.steps.len());
    Ok(())
}
