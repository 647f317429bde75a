use crate::{
    config::{obfuscate, Config},
    cookies::SessionStore,
    http::HttpSession,
    jobs,
    orchestrator::{RunContext, Settings},
    provider::SessionKeyProvider,
    runner::Runner,
    util::ensure_dir,
};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "daily-checkin")]
#[command(about = "Claims the daily check-in reward, logging in through the identity provider when needed")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. Defaults to ./daily-checkin.toml.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in if needed and check in for every configured job.
    Run {},
    /// Show login and check-in state without changing anything.
    Status {},
    /// Print the obfuscated form of a credential for the config file.
    Encode { value: String },
}

pub fn dispatch(args: Args) -> Result<()> {
    if let Command::Encode { value } = &args.cmd {
        println!("{}", obfuscate(value));
        return Ok(());
    }

    let cfg_path = resolve_config_path(args.config.as_deref());
    let cfg = Config::load(&cfg_path)?;
    let _guard = init_logging(&args, &cfg)?;
    info!("using config {}", cfg_path.display());

    match &args.cmd {
        Command::Run {} => run(&cfg),
        Command::Status {} => status(&cfg),
        Command::Encode { .. } => Ok(()),
    }
}

fn resolve_config_path(user: Option<&Path>) -> PathBuf {
    user.map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("daily-checkin.toml"))
}

fn init_logging(args: &Args, cfg: &Config) -> Result<Option<WorkerGuard>> {
    let level = match args.log_level.as_deref() {
        Some(l) => l,
        None if cfg.global.debug => "debug",
        None => cfg.logging.level.as_str(),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .boxed()
    };

    let file_path = resolve_log_path(cfg);
    let (file_layer, guard) = if let Some(path) = file_path.as_deref() {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    let session = Path::new(&cfg.paths.session_file);
    let dir = session.parent().unwrap_or_else(|| Path::new("."));
    Some(dir.join("daily-checkin.log"))
}

fn run(cfg: &Config) -> Result<()> {
    let credentials = cfg.credentials()?;
    let job_list = jobs::from_names(&cfg.global.jobs)?;
    let settings = Settings::from_config(cfg);

    let store = SessionStore::new(&cfg.paths.session_file);
    let jar = Arc::new(store.load());
    let session = HttpSession::new(cfg, Arc::clone(&jar))?;
    let provider = SessionKeyProvider::new(cfg);

    let runner = Runner::new(RunContext {
        session: &session,
        provider: &provider,
        credentials: &credentials,
        settings: &settings,
    });
    let summary = runner.run_all(&job_list);

    if cfg.global.print_summary {
        if cfg.global.summary_json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!("{}", summary.render_text());
        }
    }

    if let Err(err) = store.save(session.jar()) {
        warn!("could not persist session: {:#}", err);
    }

    Ok(())
}

fn status(cfg: &Config) -> Result<()> {
    let credentials = cfg.credentials()?;
    let job_list = jobs::from_names(&cfg.global.jobs)?;
    let settings = Settings::from_config(cfg);

    let store = SessionStore::new(&cfg.paths.session_file);
    let session = HttpSession::new(cfg, Arc::new(store.load()))?;
    let provider = SessionKeyProvider::new(cfg);

    let runner = Runner::new(RunContext {
        session: &session,
        provider: &provider,
        credentials: &credentials,
        settings: &settings,
    });
    let probes = runner.probe_all(&job_list);
    println!("{}", serde_json::to_string_pretty(&probes)?);
    Ok(())
}
