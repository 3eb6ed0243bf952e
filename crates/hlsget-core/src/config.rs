use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Output container tag. Selecting a container only fixes the artifact's
/// file extension; segment bytes are concatenated verbatim, never remuxed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    #[default]
    Ts,
    Mp4,
}

impl Container {
    /// File extension for this container, without the dot.
    pub fn ext(&self) -> &'static str {
        match self {
            Container::Ts => "ts",
            Container::Mp4 => "mp4",
        }
    }
}

impl FromStr for Container {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ts" => Ok(Container::Ts),
            "mp4" => Ok(Container::Mp4),
            other => anyhow::bail!("unknown container '{}' (expected 'ts' or 'mp4')", other),
        }
    }
}

/// Global defaults loaded from `~/.config/hlsget/config.toml`.
/// CLI flags override anything set here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HlsgetConfig {
    /// Worker pool size. `None` means one worker per host core.
    #[serde(default)]
    pub workers: Option<usize>,
    /// Application-level retries per segment (attempts = retries + 1).
    pub max_retries: u32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// HTTP handle pool size. `None` means same as the worker count.
    #[serde(default)]
    pub pool_size: Option<usize>,
    /// Remove temporary segment files after a successful assembly.
    pub cleanup: bool,
}

impl Default for HlsgetConfig {
    fn default() -> Self {
        Self {
            workers: None,
            max_retries: 3,
            timeout_secs: 30,
            pool_size: None,
            cleanup: true,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("hlsget")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<HlsgetConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = HlsgetConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: HlsgetConfig = toml::from_str(&data)?;
    Ok(cfg)
}

/// Number of workers to use when the user did not pick one.
///
/// One worker per host core. (Earlier docs advertised cores x 2; the
/// implemented and documented default is the unmultiplied core count.)
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Fully resolved options for one pipeline run.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Directory that receives the final artifact (and `temp_segments/`).
    pub output_dir: PathBuf,
    /// Artifact filename; extension is corrected to match `container`.
    pub output_filename: String,
    /// Worker pool size.
    pub workers: usize,
    /// Application-level retries per segment (attempts = retries + 1).
    pub max_retries: u32,
    /// Per-request timeout.
    pub timeout: Duration,
    /// HTTP handle pool size; defaults to the worker count so concurrent
    /// jobs do not starve each other of connections.
    pub pool_size: usize,
    /// Output container tag.
    pub container: Container,
    /// Remove temporary segment files after a successful assembly.
    pub cleanup: bool,
}

impl DownloadOptions {
    /// Options with built-in defaults for the given output location.
    pub fn new(output_dir: impl Into<PathBuf>, output_filename: impl Into<String>) -> Self {
        let workers = default_workers();
        Self {
            output_dir: output_dir.into(),
            output_filename: output_filename.into(),
            workers,
            max_retries: 3,
            timeout: Duration::from_secs(30),
            pool_size: workers,
            container: Container::Ts,
            cleanup: true,
        }
    }

    /// Overlay file-level defaults from `cfg`. CLI callers apply their own
    /// flag overrides on top of the result.
    pub fn apply_config(&mut self, cfg: &HlsgetConfig) {
        if let Some(w) = cfg.workers {
            self.workers = w;
        }
        self.max_retries = cfg.max_retries;
        self.timeout = Duration::from_secs(cfg.timeout_secs);
        self.pool_size = cfg.pool_size.unwrap_or(self.workers);
        self.cleanup = cfg.cleanup;
    }
}
