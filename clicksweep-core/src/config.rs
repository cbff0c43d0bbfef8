// Sweep configuration: one JSON file instead of a script per site

use crate::report::ReportLayout;
use anyhow::{Context, Result};
use clicksweep_scanner::{
    DEFAULT_HEURISTICS, InteractabilityGate, PolicyConfig, RecoveryStrategy, VolumeScope,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_CONFIG_PATH: &str = "~/.config/clicksweep/config.json";

/// The configuration written by `clicksweep init`.
pub const DEFAULT_CONFIG: &str = include_str!("../defaults/config.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub scroll_step: u64,
    pub scroll_settle_ms: u64,
    pub settle_ms: u64,
    pub click_timeout_ms: u64,
    pub quiescence_timeout_ms: u64,
    pub heuristics: Vec<String>,
    pub nav_selector: Option<String>,
    pub footer_selector: Option<String>,
    /// Sweep one level below the start page.
    pub descend: bool,
    pub recovery: RecoveryStrategy,
    pub gate: InteractabilityGate,
    pub volume_scope: VolumeScope,
    pub headless: bool,
    pub report_path: PathBuf,
    pub report_layout: ReportLayout,
    pub policy: PolicyConfig,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            scroll_step: 800,
            scroll_settle_ms: 1000,
            settle_ms: 1500,
            click_timeout_ms: 3000,
            quiescence_timeout_ms: 15000,
            heuristics: DEFAULT_HEURISTICS.iter().map(|h| h.to_string()).collect(),
            nav_selector: None,
            footer_selector: None,
            descend: false,
            recovery: RecoveryStrategy::Reset,
            gate: InteractabilityGate::VisibleEnabled,
            volume_scope: VolumeScope::Global,
            headless: true,
            report_path: PathBuf::from("clicksweep_report.csv"),
            report_layout: ReportLayout::Scoped,
            policy: PolicyConfig::default(),
        }
    }
}

impl SweepConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Explicit path if given, else the user's default file if present,
    /// else built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let default_path = expand_path(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            debug!("Loading config from {}", default_path.display());
            return Self::load(&default_path);
        }

        debug!("No config file found, using built-in defaults");
        Ok(Self::default())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write config file {}", path.display()))
    }

    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn click_timeout(&self) -> Duration {
        Duration::from_millis(self.click_timeout_ms)
    }

    pub fn quiescence_timeout(&self) -> Duration {
        Duration::from_millis(self.quiescence_timeout_ms)
    }
}

/// Expand a leading `~` the way the CLI path arguments expect.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}
