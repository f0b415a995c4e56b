use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Global configuration loaded from `~/.config/bulkdl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Root directory for materialized files
    /// (`<root>/<source_id>/<sanitized_name>/<filename>`).
    pub download_root: PathBuf,
    /// Process-wide cap on simultaneous transfers, shared by all jobs.
    pub max_concurrent_transfers: usize,
    /// Number of tasks submitted per execution group. Smaller groups let a
    /// cancel request take effect sooner.
    pub batch_size: usize,
    /// Half-width of the id window scanned around a grouped item when
    /// expanding multi-part posts. Heuristic, not a correctness guarantee;
    /// widen it if a source is known to spread groups over more ids.
    pub group_window: i64,
    /// Seconds between discovery passes for monitor jobs.
    pub monitor_interval_secs: u64,
    /// Minimum seconds between progress snapshot emissions. Terminal task
    /// outcomes bypass the throttle.
    pub snapshot_interval_secs: f64,
    /// Number of most-recent task lines shown in a snapshot.
    pub snapshot_lines: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            download_root: PathBuf::from("download"),
            max_concurrent_transfers: 10,
            batch_size: 5,
            group_window: 10,
            monitor_interval_secs: 3600,
            snapshot_interval_secs: 4.0,
            snapshot_lines: 12,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("bulkdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<EngineConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = EngineConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: EngineConfig = toml::from_str(&data)?;
    Ok(cfg)
}
