//! `caudit` command surface.
//!
//! Two independent pipelines behind one binary:
//! - `caudit audit run` — fetch products, validate, write the defect report.
//! - `caudit orders check` — seed an in-memory ledger and run the three
//!   aggregate checks.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use catalog_audit_core::{build_report, now_utc, validate_products, write_report, DefectReport};
use catalog_audit_fetch::{FixtureProductSource, HttpProductSource, ProductSource};
use catalog_audit_store_sqlite::{
    LedgerCheckReport, LedgerExpectations, OrderLedger, DEFAULT_SEED_SCRIPT,
};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_ENDPOINT: &str = "https://fakestoreapi.com/products";

#[derive(Debug, Parser)]
#[command(name = "caudit")]
#[command(about = "Catalog audit CLI")]
pub struct Cli {
    /// Log file receiving the same lines as stdout.
    #[arg(long, default_value = "catalog_audit.log")]
    log_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Audit {
        #[command(subcommand)]
        command: AuditCommand,
    },
    Orders {
        #[command(subcommand)]
        command: OrdersCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum AuditCommand {
    Run(AuditRunArgs),
}

#[derive(Debug, Args)]
pub struct AuditRunArgs {
    /// Product listing endpoint.
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    url: String,

    /// Recorded catalog JSON array used instead of the network.
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Defect report output path (overwritten each run).
    #[arg(long, default_value = "defect_report.json")]
    report: PathBuf,

    /// Base used for per-product links; defaults to the endpoint.
    #[arg(long)]
    link_base: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum OrdersCommand {
    Check(OrdersCheckArgs),
}

#[derive(Debug, Args)]
pub struct OrdersCheckArgs {
    /// Seed SQL script (schema + rows). Defaults to the bundled fixture.
    #[arg(long)]
    seed: Option<PathBuf>,

    #[arg(long)]
    json: bool,
}

/// Runs a parsed CLI invocation to completion.
///
/// # Errors
/// Returns an error for transport/decode/SQL failures, and for the
/// intended assertion-failure outcomes: defective products found, or
/// ledger check mismatches.
pub fn run_cli(cli: Cli) -> Result<()> {
    init_logging(&cli.log_file)?;

    match cli.command {
        Command::Audit {
            command: AuditCommand::Run(args),
        } => run_audit(args),
        Command::Orders {
            command: OrdersCommand::Check(args),
        } => run_orders_check(&args),
    }
}

fn init_logging(log_file: &Path) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("failed to open log file {}", log_file.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(file)
                .with_ansi(false),
        )
        .init();

    Ok(())
}

fn run_audit(args: AuditRunArgs) -> Result<()> {
    let products = match &args.fixture {
        Some(path) => FixtureProductSource::from_json_file(path)?.fetch_products()?,
        None => HttpProductSource::new(&args.url).fetch_products()?,
    };

    let link_base = args
        .link_base
        .unwrap_or_else(|| args.url.trim_end_matches('/').to_string());

    let defects = validate_products(&products, &link_base);
    for entry in &defects {
        warn!(
            product_id = ?entry.product_id,
            defects = ?entry.defects,
            link = %entry.link,
            "defective product"
        );
    }

    let report = build_report(products.len(), defects, now_utc())?;
    write_report(&report, &args.report)?;
    info!(
        total = report.test_summary.total_products,
        defective = report.test_summary.defective_products,
        report = %args.report.display(),
        "defect report written"
    );

    println!("{}", serde_json::to_string_pretty(&report)?);

    fail_on_defects(&report, &args.report)
}

fn fail_on_defects(report: &DefectReport, report_path: &Path) -> Result<()> {
    if report.test_summary.defective_products > 0 {
        return Err(anyhow!(
            "found {} defective products out of {}; see {}",
            report.test_summary.defective_products,
            report.test_summary.total_products,
            report_path.display()
        ));
    }
    Ok(())
}

fn run_orders_check(args: &OrdersCheckArgs) -> Result<()> {
    let ledger = OrderLedger::open_in_memory()?;
    match &args.seed {
        Some(path) => ledger.seed_from_file(path)?,
        None => ledger.seed_from_script(DEFAULT_SEED_SCRIPT)?,
    }

    let report = ledger.run_checks(&LedgerExpectations::seed_baseline())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_check_report(&report);
    }

    if !report.passed {
        return Err(anyhow!(
            "order ledger checks failed: {}",
            report.mismatches().join("; ")
        ));
    }

    info!("order ledger checks passed");
    Ok(())
}

fn print_check_report(report: &LedgerCheckReport) {
    for check in &report.checks {
        let status = if check.passed { "ok" } else { "MISMATCH" };
        println!(
            "{:<32} expected={} actual={} [{status}]",
            check.name, check.expected, check.actual
        );
    }
}
