//! Game configuration (city, effects, LOD, timing). Loaded from gorillas.ron at startup.

use crate::lod::LodConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "gorillas.ron";

/// Initial and maximum size of one effect pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSize {
    pub initial: usize,
    pub max: usize,
}

impl PoolSize {
    pub const fn new(initial: usize, max: usize) -> Self {
        Self { initial, max }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_debris_pool")]
    pub debris: PoolSize,
    #[serde(default = "default_spark_pool")]
    pub sparks: PoolSize,
    #[serde(default = "default_smoke_pool")]
    pub smoke: PoolSize,
    #[serde(default = "default_trail_pool")]
    pub trails: PoolSize,
    #[serde(default = "default_light_pool")]
    pub lights: PoolSize,
}

fn default_debris_pool() -> PoolSize {
    PoolSize::new(50, 200)
}
fn default_spark_pool() -> PoolSize {
    PoolSize::new(30, 150)
}
fn default_smoke_pool() -> PoolSize {
    PoolSize::new(20, 100)
}
fn default_trail_pool() -> PoolSize {
    PoolSize::new(40, 200)
}
fn default_light_pool() -> PoolSize {
    PoolSize::new(5, 20)
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            debris: default_debris_pool(),
            sparks: default_spark_pool(),
            smoke: default_smoke_pool(),
            trails: default_trail_pool(),
            lights: default_light_pool(),
        }
    }
}

/// Persistent game settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Fixed RNG seed. `None` seeds from the OS.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_city_size")]
    pub city_rows: usize,
    #[serde(default = "default_city_size")]
    pub city_cols: usize,
    #[serde(default)]
    pub lod: LodConfig,
    #[serde(default)]
    pub pools: PoolConfig,
    /// Drive explosions through the rigid-body world as well.
    #[serde(default = "default_true")]
    pub advanced_physics: bool,
    /// Particle hint passed to every explosion.
    #[serde(default = "default_explosion_particles")]
    pub explosion_particles: usize,
    /// Points needed to win a match.
    #[serde(default = "default_max_score")]
    pub max_score: u32,
    /// Simulation ticks per second.
    #[serde(default = "default_fixed_rate")]
    pub fixed_rate_hz: f32,
    /// How long the headless runner simulates.
    #[serde(default = "default_headless_seconds")]
    pub headless_seconds: f32,
    /// Directory holding `<cue>.wav` / `<cue>.ogg` files.
    #[serde(default)]
    pub sound_dir: Option<PathBuf>,
    /// Linear master volume, 0.0 to 1.0.
    #[serde(default = "default_master_volume")]
    pub master_volume: f32,
}

fn default_city_size() -> usize {
    7
}
fn default_true() -> bool {
    true
}
fn default_explosion_particles() -> usize {
    50
}
fn default_max_score() -> u32 {
    3
}
fn default_fixed_rate() -> f32 {
    60.0
}
fn default_headless_seconds() -> f32 {
    60.0
}
fn default_master_volume() -> f32 {
    1.0
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: None,
            city_rows: default_city_size(),
            city_cols: default_city_size(),
            lod: LodConfig::default(),
            pools: PoolConfig::default(),
            advanced_physics: default_true(),
            explosion_particles: default_explosion_particles(),
            max_score: default_max_score(),
            fixed_rate_hz: default_fixed_rate(),
            headless_seconds: default_headless_seconds(),
            sound_dir: None,
            master_volume: default_master_volume(),
        }
    }
}

impl GameConfig {
    /// Load config from `gorillas.ron`. If the file is missing or invalid, returns default config.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(data) => match ron::from_str(&data) {
                Ok(c) => return c,
                Err(e) => log::warn!("Invalid config at {:?}: {}, using defaults", path, e),
            },
            Err(e) => log::debug!("No config at {:?} ({}), using defaults", path, e),
        }
        Self::default()
    }

    /// Save current config to `gorillas.ron`. Logs on error.
    pub fn save(&self) {
        self.save_to(&config_path());
    }

    pub fn save_to(&self, path: &Path) {
        match ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()) {
            Ok(s) => {
                if let Err(e) = std::fs::write(path, s) {
                    log::warn!("Could not write config to {:?}: {}", path, e);
                }
            }
            Err(e) => log::warn!("Could not serialize config: {}", e),
        }
    }

    /// Seconds per simulation tick.
    pub fn tick_dt(&self) -> f32 {
        1.0 / self.fixed_rate_hz.max(1.0)
    }
}

fn config_path() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join(CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lod::Tier;

    #[test]
    fn partial_file_fills_defaults() {
        let c: GameConfig = ron::from_str("(seed: Some(7), lod: (initial_tier: Low))").unwrap();
        assert_eq!(c.seed, Some(7));
        assert_eq!(c.city_rows, 7);
        assert_eq!(c.lod.initial_tier, Tier::Low);
        assert_eq!(c.lod.window, 60);
        assert_eq!(c.pools.debris, PoolSize::new(50, 200));
        assert!(c.advanced_physics);
        assert_eq!(c.master_volume, 1.0);
    }

    #[test]
    fn save_then_load() {
        let path = std::env::temp_dir().join(format!("gorillas-config-{}.ron", std::process::id()));
        let mut c = GameConfig::default();
        c.max_score = 5;
        c.pools.lights = PoolSize::new(1, 2);
        c.save_to(&path);
        let loaded = GameConfig::load_from(&path);
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded.max_score, 5);
        assert_eq!(loaded.pools.lights, PoolSize::new(1, 2));
    }

    #[test]
    fn invalid_file_falls_back() {
        let path = std::env::temp_dir().join(format!("gorillas-bad-{}.ron", std::process::id()));
        std::fs::write(&path, "(city_rows: \"many\")").unwrap();
        let c = GameConfig::load_from(&path);
        let _ = std::fs::remove_file(&path);
        assert_eq!(c.city_rows, 7);
        assert!((c.tick_dt() - 1.0 / 60.0).abs() < 1e-6);
    }
}
