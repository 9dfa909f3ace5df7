use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use treewatch::RootStore;
use treewatch::config::EngineConfig;
use treewatch::git::{PathClassifier, SystemGit};
use treewatch::status::{Aggregator, StatusCache, TrackedRoot};
use treewatch::styling::{
    eprintln, error_message, hint_message, println, render_nodes, success_message,
    warning_message,
};

#[derive(Parser)]
#[command(name = "treewatch")]
#[command(about = "Status of many git repositories and their worktrees at a glance", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: <config dir>/treewatch/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Roots resolved concurrently (overrides max-concurrent)
    #[arg(short, long, global = true, value_name = "N")]
    jobs: Option<usize>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh and print every tracked root (default)
    Status,
    /// Start tracking a repository
    Add {
        path: PathBuf,
        /// Display name (default: directory name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Stop tracking a repository
    Remove { path: PathBuf },
    /// List tracked roots
    Roots,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{}", error_message(format!("{e:#}")));
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = EngineConfig::load(cli.config.as_deref()).context("failed to load config")?;
    if let Some(jobs) = cli.jobs {
        config.max_concurrent = jobs;
    }
    log::debug!("{config:?}");

    let roots_path = config
        .roots_file_path()
        .context("could not determine where to keep the roots file")?;
    let store = RootStore::load(&roots_path)?;

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Status => status(&config, &store),
        Commands::Add { path, name } => add(&config, &store, &path, name),
        Commands::Remove { path } => remove(&store, &path),
        Commands::Roots => {
            for root in store.list() {
                println!("{}\t{}", root.name, root.path.display());
            }
            Ok(())
        }
    }
}

fn system_git(config: &EngineConfig) -> Arc<SystemGit> {
    Arc::new(SystemGit::new(
        config.git_program.clone(),
        config.command_timeout(),
    ))
}

fn status(config: &EngineConfig, store: &RootStore) -> anyhow::Result<()> {
    if store.list().is_empty() {
        println!(
            "{}",
            hint_message("No tracked roots. Add one with `treewatch add <PATH>`.")
        );
        return Ok(());
    }

    let cache = StatusCache::new(system_git(config), config.freshness(), config.refresh_policy);
    let aggregator = Aggregator::new(cache, config.max_concurrent);
    let nodes = aggregator.refresh(store)?;
    println!("{}", render_nodes(&nodes).trim_end());
    Ok(())
}

fn add(
    config: &EngineConfig,
    store: &RootStore,
    path: &Path,
    name: Option<String>,
) -> anyhow::Result<()> {
    if !path.is_dir() {
        anyhow::bail!("{} is not a directory", path.display());
    }

    let mut root = TrackedRoot::from_path(path);
    if let Some(name) = name {
        root.name = name;
    }

    let kind = PathClassifier::new(system_git(config))
        .classify(&root.path)
        .with_context(|| format!("could not inspect {}", root.path.display()))?;
    if !kind.is_repository() {
        eprintln!(
            "{}",
            warning_message(format!("{} is not a git repository", root.path.display()))
        );
    }

    let display = format!("{} ({kind}) {}", root.name, root.path.display());
    if !store.add(root) {
        println!("{}", hint_message(format!("Already tracked: {display}")));
        return Ok(());
    }
    store.save()?;
    println!("{}", success_message(format!("Tracking {display}")));
    Ok(())
}

fn remove(store: &RootStore, path: &Path) -> anyhow::Result<()> {
    if !store.remove(path) {
        anyhow::bail!("{} is not tracked", path.display());
    }
    store.save()?;
    println!(
        "{}",
        success_message(format!("Stopped tracking {}", path.display()))
    );
    Ok(())
}
