mod cache;
mod config;
mod http;
mod net;
mod proxy;
mod worker;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::Method;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use url::Url;

use cache::{CacheStorage, MemoryStorage, SqliteStorage};
use config::Config;
use http::{Request, RequestMode};
use net::{Fetcher, HttpFetcher};
use worker::{Clients, ControlledClients, Worker, WorkerContext};

#[derive(Parser, Debug)]
#[command(name = "pwacache")]
#[command(about = "An offline-first caching proxy for small web apps")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/pwacache/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Deployed app version, overriding the config file
  #[arg(long)]
  app_version: Option<String>,

  /// Scope URL, overriding the config file
  #[arg(long)]
  scope: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Provision the core assets into the current generation
  Install,
  /// Install, then delete every other generation
  Activate,
  /// Answer one request through the active generation
  Fetch {
    /// Absolute URL, or a path relative to the scope
    url: String,
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,
    /// Send as a top-level navigation
    #[arg(long)]
    navigate: bool,
    /// Accept header value
    #[arg(long)]
    accept: Option<String>,
  },
  /// List stored generations and their entries
  Status,
  /// Install, activate and run the local proxy. Falls back to the
  /// previously activated generation if installing fails.
  Serve {
    /// Listen address, overriding the config file
    #[arg(long)]
    listen: Option<SocketAddr>,
  },
}

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr, and also to a daily rolling file when a log directory
/// is configured. The returned guard must live until exit to flush the file.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
  // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let stderr = fmt::layer().with_writer(io::stderr);

  match log_dir {
    Some(dir) => {
      let appender = tracing_appender::rolling::daily(dir, "pwacache.log");
      let (writer, guard) = tracing_appender::non_blocking(appender);
      tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();
      Some(guard)
    }
    None => {
      tracing_subscriber::registry().with(filter).with(stderr).init();
      None
    }
  }
}

fn open_storage(config: &Config) -> Result<Arc<dyn CacheStorage>> {
  if config.storage.in_memory {
    return Ok(Arc::new(MemoryStorage::new()));
  }

  let path = match config.storage.path {
    Some(ref path) => path.clone(),
    None => SqliteStorage::default_path()?,
  };
  Ok(Arc::new(SqliteStorage::open(&path)?))
}

fn worker_context(
  config: &Config,
  storage: Arc<dyn CacheStorage>,
  clients: Arc<dyn Clients>,
) -> Result<WorkerContext<dyn CacheStorage, dyn Fetcher>> {
  let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(config.request_timeout())?);

  Ok(WorkerContext {
    storage,
    fetcher,
    clients,
    generation: config.generation(),
    scope: config.scope_url()?,
    manifest: config.manifest(),
  })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = Config::load(args.config.as_deref())?;

  // Override version and scope if specified on command line
  if let Some(version) = args.app_version {
    config.version = version;
  }
  if let Some(scope) = args.scope {
    config.scope = scope;
  }

  let _guard = init_tracing(config.log_dir.as_deref());
  let storage = open_storage(&config)?;
  let clients = Arc::new(ControlledClients::new());

  match args.command {
    Command::Install => {
      let mut worker = Worker::new(worker_context(&config, storage, clients)?)?;
      let outcome = worker.install().await?;
      println!("Installed {} ({} assets)", outcome.generation, outcome.assets);
    }
    Command::Activate => {
      let mut worker = Worker::new(worker_context(&config, storage, clients)?)?;
      worker.install().await?;
      let report = worker.activate().await?;

      println!("Activated {}", worker.generation());
      for name in &report.deleted {
        println!("  deleted {}", name);
      }
      for (name, reason) in &report.failed {
        println!("  kept {} (delete failed: {})", name, reason);
      }
    }
    Command::Fetch {
      url,
      method,
      navigate,
      accept,
    } => {
      let worker = Worker::resume(worker_context(&config, storage, clients)?).await?;

      let url = match Url::parse(&url) {
        Ok(url) => url,
        Err(_) => config.scope_url()?.join(&url)?,
      };
      let method = Method::from_bytes(method.to_uppercase().as_bytes())
        .map_err(|e| eyre!("Invalid method {}: {}", method, e))?;

      let mut request = Request::new(method, url);
      if navigate {
        request = request.with_mode(RequestMode::Navigate);
      }
      if let Some(accept) = accept {
        request = request.with_header(ACCEPT, HeaderValue::from_str(&accept)?);
      }

      let retrieved = worker.handle_fetch(request).await?;
      worker.settle().await;

      match retrieved.cached_at {
        Some(cached_at) => eprintln!(
          "{} ({}, cached {})",
          retrieved.response.status,
          retrieved.source.as_str(),
          cached_at.format("%Y-%m-%d %H:%M:%S")
        ),
        None => eprintln!(
          "{} ({})",
          retrieved.response.status,
          retrieved.source.as_str()
        ),
      }
      io::stdout().write_all(&retrieved.response.body)?;
    }
    Command::Status => {
      let active = storage.activated().await?;
      for name in storage.keys().await? {
        let marker = if active.as_deref() == Some(name.as_str()) { "*" } else { " " };
        let entries = storage.entries(&name).await?;
        println!("{} {} ({} entries)", marker, name, entries.len());
        for entry in entries {
          println!(
            "    {} {} {} {}B {} {}",
            entry.method,
            entry.url,
            entry.status,
            entry.size,
            &entry.digest[..12],
            entry.cached_at.format("%Y-%m-%d %H:%M:%S")
          );
        }
      }
    }
    Command::Serve { listen } => {
      let worker = Worker::launch(worker_context(&config, storage, clients.clone())?).await?;
      info!(generation = %worker.generation(), state = %worker.state(), "Starting proxy");
      let state = proxy::ProxyState {
        worker: Arc::new(worker),
        clients,
        scope: config.scope_url()?,
      };
      proxy::serve(listen.unwrap_or(config.listen), state).await?;
    }
  }

  Ok(())
}
