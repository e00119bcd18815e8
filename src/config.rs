use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::cache::GenerationName;
use crate::worker::{Manifest, CORE_ASSETS};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// Prefix of every cache generation name
  pub app_name: String,
  /// Deployed version; a new value means a new generation
  pub version: String,
  /// Origin URL the app is served from (e.g. "https://diary.example/app/")
  pub scope: String,
  #[serde(default = "default_listen")]
  pub listen: SocketAddr,
  /// Core assets relative to the scope (defaults to the built-in list)
  #[serde(default = "default_manifest")]
  pub manifest: Vec<String>,
  #[serde(default)]
  pub storage: StorageConfig,
  /// Network timeout; unset means the transport's own limits apply
  pub request_timeout_secs: Option<u64>,
  /// Directory for daily rolling log files
  pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
  /// SQLite database path (default: $XDG_DATA_HOME/pwacache/cache.db)
  pub path: Option<PathBuf>,
  /// Keep the cache in memory only; nothing survives a restart
  #[serde(default)]
  pub in_memory: bool,
}

fn default_listen() -> SocketAddr {
  SocketAddr::from(([127, 0, 0, 1], 8787))
}

fn default_manifest() -> Vec<String> {
  CORE_ASSETS.iter().map(|p| p.to_string()).collect()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./pwacache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/pwacache/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/pwacache/config.yaml\n\
                 See pwacache.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("pwacache.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("pwacache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    config.scope_url()?;
    Ok(config)
  }

  /// The scope as a directory URL, so relative manifest paths resolve beneath it.
  pub fn scope_url(&self) -> Result<Url> {
    let mut url =
      Url::parse(&self.scope).map_err(|e| eyre!("Invalid scope URL {}: {}", self.scope, e))?;
    if !url.path().ends_with('/') {
      let path = format!("{}/", url.path());
      url.set_path(&path);
    }
    Ok(url)
  }

  pub fn generation(&self) -> GenerationName {
    GenerationName::new(&self.app_name, &self.version)
  }

  pub fn manifest(&self) -> Manifest {
    Manifest::new(self.manifest.clone())
  }

  pub fn request_timeout(&self) -> Option<Duration> {
    self.request_timeout_secs.map(Duration::from_secs)
  }
}
