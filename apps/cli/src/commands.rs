//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use skillsync_core::{ProgressReporter, SyncConfig, SyncResult};
use skillsync_shared::{AppConfig, init_config, load_config, load_config_from};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// skillsync: keep a partitioned skills registry in sync with its catalogs.
#[derive(Parser)]
#[command(
    name = "skillsync",
    version,
    about = "Sync skill and connector catalogs into a partitioned registry.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.skillsync/skillsync.toml).
    #[arg(long, global = true, env = "SKILLSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Options for `sync`. Anything left unset falls back to the config file.
#[derive(clap::Args, Debug)]
pub(crate) struct SyncArgs {
    /// Compute everything, write nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Check every source URL and drop unreachable records.
    #[arg(long)]
    pub validate: bool,

    /// Registry directory.
    #[arg(long)]
    pub registry_dir: Option<PathBuf>,

    /// Maximum in-flight link checks.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Per-attempt link check timeout in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Owners with fewer records share the overflow file.
    #[arg(long)]
    pub min_records: Option<usize>,

    /// Merge into existing partition files instead of replacing them.
    #[arg(long)]
    pub merge: bool,

    /// Do not rebuild all.json.
    #[arg(long)]
    pub skip_index: bool,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch the catalogs and rewrite the registry.
    Sync(SyncArgs),

    /// Rebuild all.json from the partitions listed in the manifest.
    BuildIndex {
        /// Registry directory.
        #[arg(long)]
        registry_dir: Option<PathBuf>,

        /// Report without writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "skillsync=info",
        1 => "skillsync=debug",
        _ => "skillsync=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Sync(args) => cmd_sync(config_path, args).await,
        Command::BuildIndex {
            registry_dir,
            dry_run,
        } => cmd_build_index(config_path, registry_dir, dry_run),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Layer CLI flags over the file configuration.
fn sync_config(app: &AppConfig, args: &SyncArgs) -> Result<SyncConfig> {
    let mut app = app.clone();
    if let Some(concurrency) = args.concurrency {
        app.validation.concurrency = concurrency;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        app.validation.timeout_ms = timeout_ms;
    }
    if let Some(min) = args.min_records {
        if min == 0 {
            return Err(eyre!("--min-records must be at least 1"));
        }
        app.registry.min_records_per_file = min;
    }
    if args.merge {
        app.registry.merge_existing = true;
    }

    let mut config = SyncConfig::from_app(&app)?;
    if let Some(dir) = &args.registry_dir {
        config.registry_dir = dir.clone();
    }
    config.validator.enabled = args.validate;
    config.partition.dry_run = args.dry_run;
    config.build_index = !args.skip_index;
    Ok(config)
}

async fn cmd_sync(config_path: Option<&Path>, args: SyncArgs) -> Result<()> {
    let app = resolve_config(config_path)?;
    let config = sync_config(&app, &args)?;

    info!(
        registry = %config.registry_dir.display(),
        validate = config.validator.enabled,
        dry_run = config.partition.dry_run,
        merge = config.partition.merge_existing,
        "starting sync"
    );

    let reporter = CliProgress::new();
    let result = skillsync_core::sync(&config, &reporter).await?;

    print_summary(&result);
    Ok(())
}

fn print_summary(result: &SyncResult) {
    println!();
    if result.dry_run {
        println!("  Dry run: nothing was written.");
    } else {
        println!("  Registry synced!");
    }
    for kind in &result.kinds {
        println!(
            "  {:<11} fetched {}, duplicates {}, unreachable {}, already registered {}, written {} in {} file(s), stale {}",
            format!("{}:", kind.kind),
            kind.fetched,
            kind.duplicates,
            kind.unreachable,
            kind.already_registered,
            kind.written.total_records,
            kind.written.files.len(),
            kind.stale.len(),
        );
    }
    println!("  Manifest:   +{} / -{} file(s)", result.added.len(), result.pruned.len());
    println!("  Total:      {}", result.total_records);
    if let Some(index) = &result.index {
        println!("  Index:      {} skills from {} file(s)", index.skills, index.files_read);
    }
    println!("  Time:       {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

fn cmd_build_index(
    config_path: Option<&Path>,
    registry_dir: Option<PathBuf>,
    dry_run: bool,
) -> Result<()> {
    let registry_dir = match registry_dir {
        Some(dir) => dir,
        None => PathBuf::from(resolve_config(config_path)?.registry.dir),
    };

    info!(registry = %registry_dir.display(), dry_run, "building search index");
    let report = skillsync_core::rebuild_index(&registry_dir, dry_run)?;

    println!(
        "  Index: {} skills from {} file(s), {} bytes{}",
        report.skills,
        report.files_read,
        report.bytes,
        if dry_run { " (dry run)" } else { "" }
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn link_checked(&self, id: &str, reachable: bool, done: usize, total: usize) {
        let mark = if reachable { "ok" } else { "broken" };
        self.spinner
            .set_message(format!("Checking links [{done}/{total}] {id} ({mark})"));
    }

    fn done(&self, _result: &SyncResult) {
        self.spinner.finish_and_clear();
    }
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
