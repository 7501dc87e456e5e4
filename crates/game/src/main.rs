//! Gorillas 3D War - headless match runner.
//!
//! Plays a computer-vs-computer match on the in-memory scene graph in real
//! time: wall-clock frames feed the LOD controller, the match itself runs on
//! a fixed timestep.

use anyhow::Result;
use audio::{AudioSystem, NullSink, SoundSink};
use engine_core::{Scene, SceneGraph, Time};
use game::{GameConfig, GameWorld, MatchState};
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

/// Degrees / force units of random error added to each computer throw.
const AIM_JITTER: f32 = 4.0;

fn open_audio(config: &GameConfig) -> Box<dyn SoundSink> {
    match AudioSystem::new() {
        Ok(mut audio) => {
            audio.set_master_volume(config.master_volume);
            if let Some(dir) = &config.sound_dir {
                let loaded = audio.load_cues(dir);
                log::info!("Loaded {loaded} sound cues from {}", dir.display());
            }
            Box::new(audio)
        }
        Err(e) => {
            log::warn!("Audio unavailable ({e}), running muted");
            Box::new(NullSink)
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("╔══════════════════════════════════════╗");
    println!("║          Gorillas 3D War             ║");
    println!("║   headless computer-vs-computer run  ║");
    println!("╚══════════════════════════════════════╝");

    let config = GameConfig::load();
    let dt = config.tick_dt();
    let run_seconds = config.headless_seconds.max(0.0);
    let mut aim_rng = rand::rngs::StdRng::seed_from_u64(config.seed.unwrap_or(0) ^ 0x9e37);

    let audio = open_audio(&config);
    let mut world = GameWorld::new(config, SceneGraph::new(), audio);
    let mut time = Time::new();
    time.set_fixed_rate(1.0 / dt as f64);
    let frame_budget = Duration::from_secs_f32(dt);

    let mut throws = 0u32;
    while time.elapsed_seconds() < run_seconds {
        // Frame time drives effect quality; the simulation only sees fixed steps.
        let frame_start = Instant::now();
        time.update();
        world.sample_frame(time.delta_seconds());
        while time.should_fixed_update() {
            if world.projectiles().is_empty() && world.state() == MatchState::Playing {
                if let Some(aim) = world.suggest_aim() {
                    let angle_h = aim.angle_h + aim_rng.gen_range(-AIM_JITTER..=AIM_JITTER);
                    let force = aim.force + aim_rng.gen_range(-AIM_JITTER..=AIM_JITTER);
                    match world.throw(angle_h, aim.angle_v, force) {
                        Ok(()) => throws += 1,
                        Err(e) => log::warn!("Throw rejected: {e}"),
                    }
                }
            }
            world.update_tick(time.fixed_timestep_seconds());
        }

        if let MatchState::GameOver { winner } = world.state() {
            if world.effects().active_explosions() == 0 {
                log::info!("Player {winner} won after {throws} throws");
                break;
            }
        }

        let spent = frame_start.elapsed();
        if let Some(rest) = frame_budget.checked_sub(spent) {
            std::thread::sleep(rest);
        }
    }

    let scores = world.scores();
    log::info!(
        "Finished at {:.1}s: score {} - {}, {} buildings standing, {} demolished, {} scene nodes",
        time.elapsed_seconds(),
        scores[0],
        scores[1],
        world.city().len(),
        world.destruction().demolitions(),
        world.scene().node_count()
    );
    let stats = world.effects().stats();
    log::info!(
        "Effects: {} explosions, {} particles, {} physics fragments (tier {:?})",
        stats.explosions,
        stats.particles,
        stats.fragments,
        world.lod().tier()
    );
    Ok(())
}
