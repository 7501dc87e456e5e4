//! Sound cues for the game, with a Kira-backed spatial player.
//!
//! Game code only knows the [`SoundSink`] trait: cues are fire-and-forget and
//! a missing sound is never an error for the caller.

use anyhow::Result;
use engine_core::Vec3;
use kira::{
    manager::{backend::DefaultBackend, AudioManager, AudioManagerSettings},
    sound::static_sound::{StaticSoundData, StaticSoundHandle, StaticSoundSettings},
    spatial::{
        emitter::{EmitterHandle, EmitterSettings},
        listener::{ListenerHandle, ListenerSettings},
        scene::{SpatialSceneHandle, SpatialSceneSettings},
    },
    tween::Tween,
};
use std::collections::HashMap;
use std::path::Path;

/// Named sound events raised by the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    Explosion,
    BuildingImpact,
    GorillaImpact,
    Launch,
    Victory,
}

impl SoundCue {
    pub const ALL: [SoundCue; 5] = [
        SoundCue::Explosion,
        SoundCue::BuildingImpact,
        SoundCue::GorillaImpact,
        SoundCue::Launch,
        SoundCue::Victory,
    ];

    /// File stem of the sound asset.
    pub fn name(self) -> &'static str {
        match self {
            SoundCue::Explosion => "explosion",
            SoundCue::BuildingImpact => "building_impact",
            SoundCue::GorillaImpact => "gorilla_impact",
            SoundCue::Launch => "launch",
            SoundCue::Victory => "victory",
        }
    }
}

/// Anything that can play a cue at a world position.
pub trait SoundSink {
    /// `volume` is linear, 0.0 to 1.0.
    fn play_cue(&mut self, cue: SoundCue, position: Vec3, volume: f32);

    /// Move the listener. Z is up.
    fn set_listener(&mut self, _position: Vec3, _forward: Vec3) {}

    /// Cut every sound still playing.
    fn stop_all(&mut self) {}
}

/// Sink that drops every cue (headless runs, machines without audio).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl SoundSink for NullSink {
    fn play_cue(&mut self, cue: SoundCue, _position: Vec3, _volume: f32) {
        log::trace!("Muted cue {}", cue.name());
    }
}

fn to_mint(v: Vec3) -> mint::Vector3<f32> {
    mint::Vector3 {
        x: v.x,
        y: v.y,
        z: v.z,
    }
}

/// Main audio system managing sounds and spatial audio.
pub struct AudioSystem {
    manager: AudioManager,
    spatial_scene: SpatialSceneHandle,
    listener: ListenerHandle,
    cues: HashMap<SoundCue, StaticSoundData>,
    // Emitters must outlive the sounds routed through them.
    active_sounds: Vec<(StaticSoundHandle, EmitterHandle)>,
}

impl AudioSystem {
    /// Create a new audio system.
    pub fn new() -> Result<Self> {
        let mut manager = AudioManager::<DefaultBackend>::new(AudioManagerSettings::default())?;
        let mut spatial_scene = manager.add_spatial_scene(SpatialSceneSettings::default())?;
        let listener = spatial_scene.add_listener(
            to_mint(Vec3::ZERO),
            mint::Quaternion {
                v: to_mint(Vec3::ZERO),
                s: 1.0,
            },
            ListenerSettings::default(),
        )?;

        Ok(Self {
            manager,
            spatial_scene,
            listener,
            cues: HashMap::new(),
            active_sounds: Vec::new(),
        })
    }

    /// Load every cue found in `dir` as `<name>.wav` or `<name>.ogg`.
    /// Returns how many were loaded; missing files are logged and skipped.
    pub fn load_cues(&mut self, dir: &Path) -> usize {
        for cue in SoundCue::ALL {
            let found = ["wav", "ogg"]
                .iter()
                .map(|ext| dir.join(format!("{}.{ext}", cue.name())))
                .find(|p| p.exists());
            let Some(path) = found else {
                log::warn!("No sound file for cue '{}' in {}", cue.name(), dir.display());
                continue;
            };
            if let Err(e) = self.load_cue(cue, &path) {
                log::warn!("Failed to load {}: {e}", path.display());
            }
        }
        self.cues.len()
    }

    /// Load a single cue from a file.
    pub fn load_cue(&mut self, cue: SoundCue, path: &Path) -> Result<()> {
        let sound_data = StaticSoundData::from_file(path)?;
        self.cues.insert(cue, sound_data);
        Ok(())
    }

    /// Play a cue at a 3D position.
    pub fn play_at_position(&mut self, cue: SoundCue, position: Vec3, volume: f32) -> Result<()> {
        let Some(sound_data) = self.cues.get(&cue).cloned() else {
            return Ok(());
        };
        let emitter = self
            .spatial_scene
            .add_emitter(to_mint(position), EmitterSettings::default())?;
        let settings = StaticSoundSettings::new()
            .volume(volume.clamp(0.0, 1.0) as f64)
            .output_destination(&emitter);
        let handle = self.manager.play(sound_data.with_settings(settings))?;
        self.active_sounds.push((handle, emitter));
        Ok(())
    }

    /// Clean up finished sounds.
    pub fn cleanup(&mut self) {
        self.active_sounds
            .retain(|(handle, _)| handle.state() != kira::sound::PlaybackState::Stopped);
    }

    /// Set master volume (0.0 to 1.0).
    pub fn set_master_volume(&mut self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0) as f64;
        let _ = self.manager.main_track().set_volume(volume, Tween::default());
    }
}

impl SoundSink for AudioSystem {
    fn play_cue(&mut self, cue: SoundCue, position: Vec3, volume: f32) {
        self.cleanup();
        if let Err(e) = self.play_at_position(cue, position, volume) {
            log::warn!("Could not play cue '{}': {e}", cue.name());
        }
    }

    fn set_listener(&mut self, position: Vec3, forward: Vec3) {
        let forward = forward.normalize_or(Vec3::Y);
        let right = forward.cross(Vec3::Z).normalize_or(Vec3::X);
        let corrected_up = right.cross(forward).normalize_or(Vec3::Z);
        let rotation = glam::Mat3::from_cols(right, corrected_up, -forward);
        let quat = glam::Quat::from_mat3(&rotation);

        self.listener
            .set_position(to_mint(position), Tween::default());
        self.listener.set_orientation(
            mint::Quaternion {
                v: mint::Vector3 {
                    x: quat.x,
                    y: quat.y,
                    z: quat.z,
                },
                s: quat.w,
            },
            Tween::default(),
        );
    }

    fn stop_all(&mut self) {
        for (handle, _) in &mut self.active_sounds {
            let _ = handle.stop(Tween::default());
        }
        self.active_sounds.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cue_names_are_unique() {
        let mut names: Vec<_> = SoundCue::ALL.iter().map(|c| c.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), SoundCue::ALL.len());
    }

    #[test]
    fn null_sink_accepts_cues() {
        let mut sink = NullSink;
        sink.play_cue(SoundCue::Victory, Vec3::ZERO, 1.0);
    }
}
