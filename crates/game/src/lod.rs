//! Frame-time driven level of detail for visual effects.
//!
//! The controller keeps a rolling window of frame durations and, once per
//! check interval, steps the quality tier down when the game is slow or up
//! after several consecutive fast intervals.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Quality tier, ordered from cheapest to richest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    Low,
    Medium,
    High,
    Ultra,
}

impl Tier {
    pub fn lower(self) -> Self {
        match self {
            Tier::Low | Tier::Medium => Tier::Low,
            Tier::High => Tier::Medium,
            Tier::Ultra => Tier::High,
        }
    }

    pub fn higher(self) -> Self {
        match self {
            Tier::Low => Tier::Medium,
            Tier::Medium => Tier::High,
            Tier::High | Tier::Ultra => Tier::Ultra,
        }
    }

    pub fn settings(self) -> &'static TierSettings {
        match self {
            Tier::Low => &LOW,
            Tier::Medium => &MEDIUM,
            Tier::High => &HIGH,
            Tier::Ultra => &ULTRA,
        }
    }
}

/// Effect budgets for one tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierSettings {
    pub max_explosion_particles: usize,
    pub max_smoke_particles: usize,
    pub max_fragments: usize,
    /// Seconds.
    pub effect_duration: f32,
    pub use_shaders: bool,
    pub light_radius: f32,
    pub max_lights: usize,
    pub max_trails: usize,
}

const LOW: TierSettings = TierSettings {
    max_explosion_particles: 20,
    max_smoke_particles: 5,
    max_fragments: 10,
    effect_duration: 0.8,
    use_shaders: false,
    light_radius: 25.0,
    max_lights: 1,
    max_trails: 5,
};

const MEDIUM: TierSettings = TierSettings {
    max_explosion_particles: 40,
    max_smoke_particles: 10,
    max_fragments: 20,
    effect_duration: 1.5,
    use_shaders: true,
    light_radius: 50.0,
    max_lights: 2,
    max_trails: 10,
};

const HIGH: TierSettings = TierSettings {
    max_explosion_particles: 80,
    max_smoke_particles: 20,
    max_fragments: 40,
    effect_duration: 2.5,
    use_shaders: true,
    light_radius: 75.0,
    max_lights: 3,
    max_trails: 20,
};

const ULTRA: TierSettings = TierSettings {
    max_explosion_particles: 150,
    max_smoke_particles: 30,
    max_fragments: 80,
    effect_duration: 4.0,
    use_shaders: true,
    light_radius: 100.0,
    max_lights: 5,
    max_trails: 40,
};

/// Tunables for [`LodController`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LodConfig {
    #[serde(default = "default_window")]
    pub window: usize,
    #[serde(default = "default_low_fps")]
    pub low_fps: f32,
    #[serde(default = "default_high_fps")]
    pub high_fps: f32,
    /// Seconds between checks.
    #[serde(default = "default_check_interval")]
    pub check_interval: f32,
    /// Consecutive fast checks needed before an upgrade.
    #[serde(default = "default_upgrade_checks")]
    pub upgrade_checks: u32,
    #[serde(default = "default_initial_tier")]
    pub initial_tier: Tier,
}

fn default_window() -> usize {
    60
}
fn default_low_fps() -> f32 {
    30.0
}
fn default_high_fps() -> f32 {
    55.0
}
fn default_check_interval() -> f32 {
    5.0
}
fn default_upgrade_checks() -> u32 {
    3
}
fn default_initial_tier() -> Tier {
    Tier::High
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            low_fps: default_low_fps(),
            high_fps: default_high_fps(),
            check_interval: default_check_interval(),
            upgrade_checks: default_upgrade_checks(),
            initial_tier: default_initial_tier(),
        }
    }
}

/// A tier transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierChange {
    pub old: Tier,
    pub new: Tier,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LodStats {
    pub fps: f32,
    /// Rough load estimate in percent.
    pub cpu_load: f32,
    pub samples: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

pub type TierCallback = Box<dyn FnMut(Tier, Tier, &TierSettings)>;

pub struct LodController {
    tier: Tier,
    config: LodConfig,
    samples: VecDeque<f32>,
    fps: f32,
    clock: f32,
    last_check: f32,
    stable_checks: u32,
    callbacks: Vec<(CallbackId, TierCallback)>,
    next_callback: u64,
}

impl Default for LodController {
    fn default() -> Self {
        Self::new(LodConfig::default())
    }
}

impl LodController {
    pub fn new(config: LodConfig) -> Self {
        let window = config.window.max(1);
        Self {
            tier: config.initial_tier,
            samples: VecDeque::with_capacity(window),
            config: LodConfig { window, ..config },
            fps: 60.0,
            clock: 0.0,
            last_check: 0.0,
            stable_checks: 0,
            callbacks: Vec::new(),
            next_callback: 0,
        }
    }

    /// Record one frame and run the periodic check. Returns the tier change, if any.
    pub fn sample(&mut self, frame_dt: f32) -> Option<TierChange> {
        if frame_dt > 0.0 {
            self.clock += frame_dt;
            self.samples.push_back(frame_dt);
            while self.samples.len() > self.config.window {
                self.samples.pop_front();
            }
        }
        self.fps = self.average_fps();

        if self.clock - self.last_check < self.config.check_interval {
            return None;
        }
        self.last_check = self.clock;

        if self.fps < self.config.low_fps {
            self.stable_checks = 0;
            let target = self.tier.lower();
            log::debug!("LOD check: {:.1} fps is below {}", self.fps, self.config.low_fps);
            self.change_tier(target)
        } else if self.fps > self.config.high_fps {
            self.stable_checks += 1;
            if self.stable_checks >= self.config.upgrade_checks {
                self.stable_checks = 0;
                let target = self.tier.higher();
                self.change_tier(target)
            } else {
                None
            }
        } else {
            None
        }
    }

    fn average_fps(&self) -> f32 {
        if self.samples.is_empty() {
            return 60.0;
        }
        let mean = self.samples.iter().sum::<f32>() / self.samples.len() as f32;
        if mean > 0.0 {
            1.0 / mean
        } else {
            60.0
        }
    }

    fn change_tier(&mut self, new: Tier) -> Option<TierChange> {
        if new == self.tier {
            return None;
        }
        let old = self.tier;
        self.tier = new;
        log::info!("Effect quality {:?} -> {:?} ({:.1} fps)", old, new, self.fps);
        let settings = new.settings();
        for (_, callback) in &mut self.callbacks {
            callback(old, new, settings);
        }
        Some(TierChange { old, new })
    }

    /// Force a tier. Callbacks fire only when it differs from the current one.
    pub fn set_tier(&mut self, tier: Tier) -> Option<TierChange> {
        self.change_tier(tier)
    }

    pub fn register_callback(&mut self, callback: TierCallback) -> CallbackId {
        let id = CallbackId(self.next_callback);
        self.next_callback += 1;
        self.callbacks.push((id, callback));
        id
    }

    pub fn unregister_callback(&mut self, id: CallbackId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(cid, _)| *cid != id);
        self.callbacks.len() != before
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn settings(&self) -> &'static TierSettings {
        self.tier.settings()
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn stats(&self) -> LodStats {
        LodStats {
            fps: self.fps,
            cpu_load: (60.0 / self.fps.max(1.0) * 50.0).min(100.0),
            samples: self.samples.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn run(lod: &mut LodController, fps: f32, seconds: f32) -> Vec<TierChange> {
        let dt = 1.0 / fps;
        let frames = (seconds * fps).round() as usize;
        (0..frames).filter_map(|_| lod.sample(dt)).collect()
    }

    #[test]
    fn slow_frames_step_down_once_per_interval() {
        let mut lod = LodController::default();
        assert_eq!(lod.tier(), Tier::High);

        let changes = run(&mut lod, 20.0, 5.2);
        assert_eq!(changes, vec![TierChange { old: Tier::High, new: Tier::Medium }]);

        run(&mut lod, 20.0, 5.0);
        assert_eq!(lod.tier(), Tier::Low);

        // Floor.
        let changes = run(&mut lod, 20.0, 20.0);
        assert!(changes.is_empty());
        assert_eq!(lod.tier(), Tier::Low);
    }

    #[test]
    fn upgrade_needs_three_fast_checks() {
        let mut lod = LodController::default();
        run(&mut lod, 120.0, 10.1);
        assert_eq!(lod.tier(), Tier::High);
        run(&mut lod, 120.0, 5.0);
        assert_eq!(lod.tier(), Tier::Ultra);

        // Ceiling.
        run(&mut lod, 120.0, 30.0);
        assert_eq!(lod.tier(), Tier::Ultra);
    }

    #[test]
    fn drop_between_fast_checks_blocks_upgrade() {
        let mut lod = LodController::default();
        run(&mut lod, 120.0, 10.1);
        // One slow interval: enough frames to pull the window average down.
        run(&mut lod, 20.0, 5.0);
        assert_eq!(lod.tier(), Tier::Medium);
        // Two fast checks only.
        run(&mut lod, 120.0, 9.0);
        assert_eq!(lod.tier(), Tier::Medium);
    }

    #[test]
    fn mid_range_fps_keeps_counter() {
        let mut lod = LodController::default();
        run(&mut lod, 120.0, 10.1);
        run(&mut lod, 45.0, 5.0);
        assert_eq!(lod.tier(), Tier::High);
        run(&mut lod, 120.0, 5.0);
        assert_eq!(lod.tier(), Tier::Ultra);
    }

    #[test]
    fn interval_restarts_at_every_check() {
        let mut lod = LodController::default();
        // A check with no change still restarts the interval.
        run(&mut lod, 45.0, 5.1);
        assert_eq!(lod.tier(), Tier::High);
        run(&mut lod, 20.0, 4.0);
        assert_eq!(lod.tier(), Tier::High);
        run(&mut lod, 20.0, 1.2);
        assert_eq!(lod.tier(), Tier::Medium);
    }

    #[test]
    fn callbacks_see_every_change() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut lod = LodController::default();
        let sink = Rc::clone(&seen);
        let id = lod.register_callback(Box::new(move |old, new, settings| {
            sink.borrow_mut().push((old, new, settings.max_lights));
        }));

        assert!(lod.set_tier(Tier::High).is_none());
        lod.set_tier(Tier::Low);
        assert_eq!(*seen.borrow(), vec![(Tier::High, Tier::Low, 1)]);

        assert!(lod.unregister_callback(id));
        lod.set_tier(Tier::Ultra);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn stats_estimate_load() {
        let mut lod = LodController::default();
        assert_eq!(lod.stats().fps, 60.0);
        lod.sample(0.0);
        lod.sample(-1.0);
        assert_eq!(lod.stats().samples, 0);
        lod.sample(1.0 / 30.0);
        let stats = lod.stats();
        assert!((stats.fps - 30.0).abs() < 0.01);
        assert!((stats.cpu_load - 100.0).abs() < 0.1);
    }
}
