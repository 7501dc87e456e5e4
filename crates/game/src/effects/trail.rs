//! Glowing motes left behind a banana in flight.

use engine_core::{Lifetime, NodeId, Scene};

pub const TRAIL_LIFETIME: f32 = 0.5;
pub const TRAIL_SCALE: f32 = 0.1;
pub const TRAIL_ALPHA: f32 = 0.7;
/// Chance per tick that a flying banana drops a mote.
pub const TRAIL_CHANCE: f64 = 0.3;
pub const TRAIL_COLOR: [f32; 4] = [1.0, 1.0, 0.0, TRAIL_ALPHA];

#[derive(Debug, Clone, Copy)]
pub struct TrailMote {
    pub node: NodeId,
    pub life: Lifetime,
}

impl TrailMote {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            life: Lifetime::new(TRAIL_LIFETIME),
        }
    }

    /// Grows to one and a half times its size while fading out.
    pub fn scale(&self) -> f32 {
        TRAIL_SCALE * (1.0 + (1.0 - self.life.ratio()) * 0.5)
    }

    pub fn alpha(&self) -> f32 {
        self.life.ratio() * TRAIL_ALPHA
    }

    pub fn advance(&mut self, dt: f32) -> bool {
        !self.life.update(dt)
    }

    pub fn sync<S: Scene>(&self, scene: &mut S) {
        scene.set_uniform_scale(self.node, self.scale());
        scene.set_alpha(self.node, self.alpha());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mote_grows_and_fades() {
        let mut mote = TrailMote::new(hecs::Entity::DANGLING);
        assert_eq!(mote.scale(), TRAIL_SCALE);
        assert_eq!(mote.alpha(), TRAIL_ALPHA);
        assert!(mote.advance(0.25));
        assert!((mote.scale() - 0.125).abs() < 1e-6);
        assert!((mote.alpha() - 0.35).abs() < 1e-6);
        assert!(!mote.advance(0.25));
    }
}
