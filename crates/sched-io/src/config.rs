use std::fs;
use std::path::Path;

use sched_core::ScheduleResult;
use serde::{Deserialize, Serialize};

fn default_time_limit() -> u64 {
    120
}
fn default_min_run_hours() -> i64 {
    4
}
fn default_max_lines_per_order() -> usize {
    3
}
fn default_planning_start_date() -> String {
    "2026-01-01 00:00:00".to_string()
}
fn default_validate() -> bool {
    false
}
fn default_use_sku_rates() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSection {
    #[serde(default = "default_time_limit")]
    pub time_limit: u64,
    #[serde(default = "default_min_run_hours")]
    pub min_run_hours: i64,
    #[serde(default = "default_max_lines_per_order")]
    pub max_lines_per_order: usize,
    #[serde(default = "default_planning_start_date")]
    pub planning_start_date: String,
    #[serde(default = "default_validate")]
    pub validate: bool,
    #[serde(default = "default_use_sku_rates")]
    pub use_sku_rates: bool,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        SchedulerSection {
            time_limit: default_time_limit(),
            min_run_hours: default_min_run_hours(),
            max_lines_per_order: default_max_lines_per_order(),
            planning_start_date: default_planning_start_date(),
            validate: default_validate(),
            use_sku_rates: default_use_sku_rates(),
        }
    }
}

fn default_cip_interval_h() -> i64 {
    120
}
fn default_cip_duration_h() -> i64 {
    6
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CipSection {
    #[serde(default = "default_cip_interval_h")]
    pub interval_h: i64,
    #[serde(default = "default_cip_duration_h")]
    pub duration_h: i64,
}

impl Default for CipSection {
    fn default() -> Self {
        CipSection {
            interval_h: default_cip_interval_h(),
            duration_h: default_cip_duration_h(),
        }
    }
}

fn default_weight_1() -> f64 {
    1.0
}
fn default_changeover_weight() -> f64 {
    100.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectiveSection {
    #[serde(default = "default_weight_1")]
    pub makespan_weight: f64,
    #[serde(default = "default_changeover_weight")]
    pub changeover_weight: f64,
    #[serde(default = "default_weight_1")]
    pub cip_defer_weight: f64,
    #[serde(default)]
    pub idle_weight: f64,
    #[serde(default = "default_weight_1")]
    pub co_conv_org_weight: f64,
    #[serde(default = "default_weight_1")]
    pub co_cinn_weight: f64,
    #[serde(default = "default_weight_1")]
    pub co_flavor_weight: f64,
}

impl Default for ObjectiveSection {
    fn default() -> Self {
        ObjectiveSection {
            makespan_weight: default_weight_1(),
            changeover_weight: default_changeover_weight(),
            cip_defer_weight: default_weight_1(),
            idle_weight: 0.0,
            co_conv_org_weight: default_weight_1(),
            co_cinn_weight: default_weight_1(),
            co_flavor_weight: default_weight_1(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeoverSection {
    #[serde(default = "default_weight_1")]
    pub base_changeover_weight: f64,
    #[serde(default = "default_weight_1")]
    pub topload_weight: f64,
    #[serde(default = "default_weight_1")]
    pub ttp_weight: f64,
    #[serde(default = "default_weight_1")]
    pub ffs_weight: f64,
    #[serde(default = "default_weight_1")]
    pub casepacker_weight: f64,
}

impl Default for ChangeoverSection {
    fn default() -> Self {
        ChangeoverSection {
            base_changeover_weight: default_weight_1(),
            topload_weight: default_weight_1(),
            ttp_weight: default_weight_1(),
            ffs_weight: default_weight_1(),
            casepacker_weight: default_weight_1(),
        }
    }
}

/// Mirrors the `[scheduler]`/`[cip]`/`[objective]`/`[changeover]` TOML
/// sections. CLI flags override individual
/// fields after this is loaded — never whole-section replacement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub scheduler: SchedulerSection,
    #[serde(default)]
    pub cip: CipSection,
    #[serde(default)]
    pub objective: ObjectiveSection,
    #[serde(default)]
    pub changeover: ChangeoverSection,
}

pub fn load_config(path: &Path) -> ScheduleResult<SchedulerConfig> {
    let text = fs::read_to_string(path)?;
    let config: SchedulerConfig = toml::from_str(&text)?;
    Ok(config)
}

pub fn save_config(path: &Path, config: &SchedulerConfig) -> ScheduleResult<()> {
    let text = toml::to_string_pretty(config)
        .map_err(|e| sched_core::ScheduleError::Other(e.to_string()))?;
    fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_numbers() {
        let config = SchedulerConfig::default();
        assert_eq!(config.scheduler.time_limit, 120);
        assert_eq!(config.cip.interval_h, 120);
        assert_eq!(config.cip.duration_h, 6);
        assert_eq!(config.objective.changeover_weight, 100.0);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[scheduler]\ntime_limit = 300\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.scheduler.time_limit, 300);
        assert_eq!(config.scheduler.max_lines_per_order, 3);
        assert_eq!(config.cip.interval_h, 120);
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = SchedulerConfig::default();
        config.objective.idle_weight = 5.0;
        save_config(&path, &config).unwrap();
        let reloaded = load_config(&path).unwrap();
        assert_eq!(reloaded.objective.idle_weight, 5.0);
    }
}
