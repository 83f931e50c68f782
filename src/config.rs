use crate::hours::{HourTable, SlotDef};
use crate::schedule::MINUTES_PER_DAY;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_ENV: &str = "TERMD_CONFIG";
pub const DEFAULT_GRACE_MINUTES: i64 = 10;
pub const DEFAULT_PASS_MARK: f64 = 10.5;

fn default_grace() -> i64 {
    DEFAULT_GRACE_MINUTES
}

fn default_pass_mark() -> f64 {
    DEFAULT_PASS_MARK
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default)]
    pub hours: Option<Vec<SlotDef>>,
    #[serde(default = "default_grace")]
    pub grace_minutes: i64,
    #[serde(default = "default_pass_mark")]
    pub pass_mark: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hours: None,
            grace_minutes: DEFAULT_GRACE_MINUTES,
            pass_mark: DEFAULT_PASS_MARK,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.to_string_lossy()))?;
        let cfg: EngineConfig = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.to_string_lossy()))?;
        if !(0..=MINUTES_PER_DAY).contains(&cfg.grace_minutes) {
            anyhow::bail!("graceMinutes must be between 0 and {}", MINUTES_PER_DAY);
        }
        Ok(cfg)
    }

    pub fn hour_table(&self) -> anyhow::Result<HourTable> {
        match &self.hours {
            Some(defs) => HourTable::from_defs(defs).context("invalid hours table"),
            None => Ok(HourTable::standard().clone()),
        }
    }
}
