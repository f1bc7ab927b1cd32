//! worklog - CLI entry point.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use worklog::config::{CommitTarget, Config, Overrides, TrackingMode};
use worklog::driver::{CycleOutcome, Scheduler, Session, Trigger};
use worklog::message::{GeminiClient, MessageGenerator};
use worklog::tracker::{ChangedFiles, IgnoreRules, WorkspaceTracker, WorkspaceWatcher};
use worklog::vcs::{GitRepository, Vcs};

/// Journal workspace changes into git with generated commit messages.
#[derive(Parser, Debug)]
#[command(name = "worklog")]
#[command(about = "Journal workspace changes into git with generated commit messages")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch workspaces and commit changes on an interval
    Run {
        /// Workspace roots to journal
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,

        /// Seconds between commit cycles
        #[arg(long)]
        interval: Option<u64>,

        #[command(flatten)]
        mode: ModeArgs,
    },

    /// Commit pending changes once and exit
    Commit {
        /// Workspace roots to journal
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        mode: ModeArgs,
    },

    /// Show the changes the next cycle would commit
    Status {
        /// Workspace root
        #[arg(default_value = ".")]
        path: PathBuf,

        #[command(flatten)]
        mode: ModeArgs,
    },

    /// Show recent journal commits
    Log {
        /// Workspace root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Number of commits to show
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,

        /// Print one JSON object per commit
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        mode: ModeArgs,
    },
}

#[derive(Args, Debug, Default)]
struct ModeArgs {
    /// How changes are tracked: watch or status
    #[arg(long)]
    tracking: Option<TrackingMode>,

    /// Where commits go: shadow or in-place
    #[arg(long)]
    target: Option<CommitTarget>,

    /// Send per-file diffs to the generator instead of file names
    #[arg(long)]
    diffs: bool,
}

impl ModeArgs {
    fn overrides(&self, interval_secs: Option<u64>) -> Overrides {
        Overrides {
            interval_secs,
            tracking: self.tracking,
            target: self.target,
            use_diffs: self.diffs,
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Command::Run {
            paths,
            interval,
            mode,
        } => run(&paths, &mode.overrides(interval)).await,
        Command::Commit { paths, mode } => commit_once(&paths, &mode.overrides(None)).await,
        Command::Status { path, mode } => status(&path, &mode.overrides(None)),
        Command::Log {
            path,
            limit,
            json,
            mode,
        } => log(&path, limit, json, &mode.overrides(None)),
    }
}

fn canonical_root(path: &Path) -> Result<PathBuf> {
    let root = path
        .canonicalize()
        .with_context(|| format!("Workspace {} does not exist", path.display()))?;
    if !root.is_dir() {
        anyhow::bail!("Workspace {} is not a directory", root.display());
    }
    Ok(root)
}

type Journal = Scheduler<GitRepository, GeminiClient>;

/// Load configuration and open a session for every root.
///
/// Returns the scheduler plus each root's configuration, in order.
fn open_sessions(paths: &[PathBuf], overrides: &Overrides) -> Result<(Journal, Vec<Config>)> {
    let mut sessions = Vec::with_capacity(paths.len());
    let mut configs = Vec::with_capacity(paths.len());

    for path in paths {
        let root = canonical_root(path)?;
        let config = Config::load(&root, overrides)
            .with_context(|| format!("Failed to load configuration for {}", root.display()))?;

        let client = GeminiClient::new(&config.generator)
            .context("Failed to create text-generation client")?;
        if !client.has_api_key() {
            warn!(
                root = %root.display(),
                "No API key configured, commits will use the fallback message"
            );
        }
        let generator = Arc::new(MessageGenerator::new(client));

        let session = Session::open(&root, &config, generator)
            .with_context(|| format!("Failed to open journal for {}", root.display()))?;
        sessions.push(session);
        configs.push(config);
    }

    // One timer drives every root
    let interval = configs
        .iter()
        .map(Config::interval)
        .min()
        .unwrap_or(Duration::from_secs(worklog::config::DEFAULT_INTERVAL_SECS));

    Ok((Scheduler::new(sessions, interval), configs))
}

async fn run(paths: &[PathBuf], overrides: &Overrides) -> Result<()> {
    let (mut scheduler, configs) = open_sessions(paths, overrides)?;

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let mut watchers: Vec<WorkspaceWatcher> = Vec::new();
    for (session, config) in scheduler.sessions().iter().zip(&configs) {
        if config.tracking != TrackingMode::Watch {
            continue;
        }
        let watcher = WorkspaceWatcher::start(
            session.tracker.rules().clone(),
            config.debounce(),
            event_tx.clone(),
        )
        .with_context(|| format!("Failed to watch {}", session.root().display()))?;
        watchers.push(watcher);
    }
    drop(event_tx);

    let (manual_tx, manual_rx) = mpsc::unbounded_channel();
    spawn_manual_trigger(manual_tx);

    info!("Press Ctrl+C to stop");
    scheduler.run(event_rx, manual_rx, shutdown_signal()).await;

    drop(watchers);
    Ok(())
}

/// Forward SIGUSR1 as a manual commit request.
#[cfg(unix)]
fn spawn_manual_trigger(tx: mpsc::UnboundedSender<()>) {
    use signal::unix::{SignalKind, signal};

    match signal(SignalKind::user_defined1()) {
        Ok(mut usr1) => {
            tokio::spawn(async move {
                while usr1.recv().await.is_some() {
                    if tx.send(()).is_err() {
                        break;
                    }
                }
            });
            info!(pid = std::process::id(), "Send SIGUSR1 to commit immediately");
        }
        Err(e) => warn!("Manual trigger unavailable: {}", e),
    }
}

#[cfg(not(unix))]
fn spawn_manual_trigger(_tx: mpsc::UnboundedSender<()>) {}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

async fn commit_once(paths: &[PathBuf], overrides: &Overrides) -> Result<()> {
    let (mut scheduler, _) = open_sessions(paths, overrides)?;
    scheduler.scan();

    let roots: Vec<PathBuf> = scheduler
        .sessions()
        .iter()
        .map(|s| s.root().to_path_buf())
        .collect();
    let outcomes = scheduler.flush_all(Trigger::Manual).await;

    for (root, outcome) in roots.iter().zip(outcomes) {
        match outcome {
            CycleOutcome::Committed(record) => {
                println!(
                    "✓ {} {} ({} files)",
                    record.id.get(..7).unwrap_or(&record.id),
                    record.message,
                    record.files.len()
                );
            }
            CycleOutcome::Idle => println!("Nothing to commit in {}", root.display()),
        }
    }
    Ok(())
}

fn status(path: &Path, overrides: &Overrides) -> Result<()> {
    let root = canonical_root(path)?;
    let config = Config::load(&root, overrides)
        .with_context(|| format!("Failed to load configuration for {}", root.display()))?;

    let rules = IgnoreRules::new(&root, Some(config.shadow_dir.as_str()), &config.ignore)
        .context("Invalid ignore patterns")?;
    let shadow_root = match config.target {
        CommitTarget::Shadow => Some(config.shadow_root(&root)),
        CommitTarget::InPlace => None,
    };
    let tracker = WorkspaceTracker::new(config.tracking, rules, shadow_root);

    let mut changed = ChangedFiles::new();
    tracker
        .scan(&mut changed)
        .context("Failed to collect pending changes")?;

    let pending = changed.pending(&root);
    if pending.is_empty() {
        println!("No pending changes in {}", root.display());
        return Ok(());
    }

    println!(
        "{} pending change(s) in {} ({} tracking, {} target):",
        pending.len(),
        root.display(),
        config.tracking,
        config.target
    );
    for file in pending {
        let shown = file.strip_prefix(&root).unwrap_or(&file);
        let marker = if file.exists() { "M" } else { "D" };
        println!("  {} {}", marker, shown.display());
    }
    Ok(())
}

fn log(path: &Path, limit: usize, json: bool, overrides: &Overrides) -> Result<()> {
    let root = canonical_root(path)?;
    let config = Config::load(&root, overrides)
        .with_context(|| format!("Failed to load configuration for {}", root.display()))?;

    let repo = match config.target {
        CommitTarget::Shadow => {
            let shadow_root = config.shadow_root(&root);
            if !shadow_root.join(".git").exists() {
                println!("No journal in {} yet", shadow_root.display());
                return Ok(());
            }
            GitRepository::open_or_init(&shadow_root)
        }
        CommitTarget::InPlace => GitRepository::discover(&root),
    }
    .context("Failed to open journal repository")?;

    let entries = repo.recent(limit).context("Failed to read journal")?;
    if json {
        for entry in &entries {
            println!(
                "{}",
                serde_json::to_string(entry).context("Failed to serialize journal entry")?
            );
        }
        return Ok(());
    }
    if entries.is_empty() {
        println!("No journal commits yet");
        return Ok(());
    }
    for entry in entries {
        println!("{} {}", entry.short_id(), entry.message);
    }
    Ok(())
}
