use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use fixtures::FixtureFetcher;
use portal_config::{PortalConfig, SliceDefaults};
use portal_protocol::{serialize_json_pretty, FetchIntent, FetchOutcome};
use portal_search::{ReducerRegistry, Store, StoreDriver, TableOfContents};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod fixtures;
mod replay;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "portal")]
#[command(about = "Inspect and exercise search portal state", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Default page size for perspectives that don't set one
    #[arg(long, global = true)]
    page_size: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a portal configuration and list the store keys it produces
    Check(CheckArgs),

    /// Print the initial state of every slice
    Snapshot(ConfigArgs),

    /// Apply an action script offline and report each transition
    Replay(ReplayArgs),

    /// Run the store against canned backend data
    Simulate(SimulateArgs),

    /// Print JSON schemas of the fetch protocol
    Schema,

    /// Find the table-of-contents part playing at a given time
    Toc(TocArgs),
}

#[derive(Args)]
struct ConfigArgs {
    /// Directory holding portalConfig.json
    #[arg(default_value = "configs")]
    configs: PathBuf,
}

#[derive(Args)]
struct CheckArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Output JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ReplayArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Action script (JSON array or one action per line); `-` reads stdin
    #[arg(long, short = 's')]
    script: PathBuf,
}

#[derive(Args)]
struct SimulateArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Backend data keyed by perspective id
    #[arg(long, short = 'f')]
    fixtures: PathBuf,

    /// Actions to send after the initial load
    #[arg(long, short = 's')]
    script: Option<PathBuf>,
}

#[derive(Args)]
struct TocArgs {
    /// JSON file with one part or an array of parts
    file: PathBuf,

    /// Playback position in seconds
    #[arg(long)]
    at: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckPerspective {
    id: String,
    mode: String,
    keys: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckReport {
    portal_id: String,
    perspectives: Vec<CheckPerspective>,
    keys: Vec<String>,
}

fn load_store(configs: &Path, defaults: SliceDefaults) -> Result<(PortalConfig, Store)> {
    let portal = PortalConfig::load_dir(configs)
        .with_context(|| format!("Failed to load portal config from {}", configs.display()))?;
    let store = ReducerRegistry::new(defaults)
        .build(&portal)
        .context("Failed to assemble store")?;
    Ok((portal, store))
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // Commands that print JSON keep stderr quiet unless asked otherwise
    let json_output = match &cli.command {
        Commands::Check(args) => args.json,
        Commands::Schema | Commands::Toc(_) => true,
        Commands::Snapshot(_) | Commands::Replay(_) | Commands::Simulate(_) => false,
    };
    if json_output && !cli.verbose {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let defaults = cli
        .page_size
        .map(SliceDefaults::with_page_size)
        .unwrap_or_default();

    match cli.command {
        Commands::Check(args) => run_check(args, defaults)?,
        Commands::Snapshot(args) => run_snapshot(args, defaults)?,
        Commands::Replay(args) => run_replay(args, defaults)?,
        Commands::Simulate(args) => run_simulate(args, defaults).await?,
        Commands::Schema => run_schema()?,
        Commands::Toc(args) => run_toc(args)?,
    }

    Ok(())
}

fn run_check(args: CheckArgs, defaults: SliceDefaults) -> Result<()> {
    let (portal, store) = load_store(&args.config.configs, defaults)?;
    let perspectives: Vec<CheckPerspective> = portal
        .perspectives()
        .filter_map(|config| {
            let slices = store.perspective(&config.id)?;
            let mode = config
                .search_mode
                .map_or_else(|| "instance-page".to_string(), |mode| mode.to_string());
            Some(CheckPerspective {
                id: config.id.clone(),
                mode,
                keys: slices.keys(),
            })
        })
        .collect();

    let report = CheckReport {
        portal_id: portal.portal_id.clone(),
        perspectives,
        keys: store.keys(),
    };

    if args.json {
        return print_stdout(&serialize_json_pretty(&report)?);
    }
    print_stdout(&format!(
        "Portal '{}': {} perspectives, {} keys",
        report.portal_id,
        report.perspectives.len(),
        report.keys.len()
    ))?;
    for perspective in &report.perspectives {
        print_stdout(&format!(
            "  {:<24} {:<18} {}",
            perspective.id,
            perspective.mode,
            perspective.keys.join(", ")
        ))?;
    }
    Ok(())
}

fn run_snapshot(args: ConfigArgs, defaults: SliceDefaults) -> Result<()> {
    let (_, store) = load_store(&args.configs, defaults)?;
    print_stdout(&serialize_json_pretty(&store.snapshot())?)
}

fn run_replay(args: ReplayArgs, defaults: SliceDefaults) -> Result<()> {
    let (_, mut store) = load_store(&args.config.configs, defaults)?;
    let actions = replay::read_script(&args.script)?;
    let report = replay::replay(&mut store, &actions);
    let rejected = report
        .steps
        .iter()
        .filter(|step| step.outcome == replay::StepOutcome::Rejected)
        .count();
    if rejected > 0 {
        log::warn!("{rejected} of {} action(s) rejected", report.steps.len());
    }
    print_stdout(&serialize_json_pretty(&report)?)
}

async fn run_simulate(args: SimulateArgs, defaults: SliceDefaults) -> Result<()> {
    let (_, store) = load_store(&args.config.configs, defaults)?;
    let fetcher = Arc::new(FixtureFetcher::load(&args.fixtures)?);
    let actions = match &args.script {
        Some(path) => replay::read_script(path)?,
        None => Vec::new(),
    };

    let driver = StoreDriver::start(store, fetcher);
    let started = driver.bootstrap().await?;
    log::info!("Initial load issued {started} fetch(es)");
    driver.settled().await?;

    for action in actions {
        if let Err(err) = driver.send(action).await {
            log::warn!("Action rejected: {err}");
        }
        driver.settled().await?;
    }

    let snapshot = driver.settled().await?;
    driver.shutdown().await?;
    print_stdout(&serialize_json_pretty(snapshot.root.as_ref())?)
}

fn run_schema() -> Result<()> {
    let intent = schemars::schema_for!(FetchIntent);
    let outcome = schemars::schema_for!(FetchOutcome);
    let schemas = serde_json::json!({
        "fetchIntent": intent,
        "fetchOutcome": outcome,
    });
    print_stdout(&serialize_json_pretty(&schemas)?)
}

fn run_toc(args: TocArgs) -> Result<()> {
    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid JSON in {}", args.file.display()))?;
    let toc = TableOfContents::from_value(value).context("Invalid table of contents")?;
    for (a, b) in toc.overlaps() {
        log::warn!(
            "Parts '{}' and '{}' overlap; the first one wins",
            toc.parts()[a].id,
            toc.parts()[b].id
        );
    }
    print_stdout(&serialize_json_pretty(&toc.part_at(args.at))?)
}
