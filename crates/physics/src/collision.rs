//! Collision groups and filtering.

use rapier3d::prelude::*;

/// Collision groups for the things that live in the city.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionGroup {
    /// Ground plane
    Terrain = 1 << 0,
    /// City buildings
    Building = 1 << 1,
    /// The two gorillas
    Gorilla = 1 << 2,
    /// Bananas in flight
    Projectile = 1 << 3,
    /// Explosion fragments
    Debris = 1 << 4,
}

impl CollisionGroup {
    fn bits(self) -> u32 {
        self as u32
    }

    /// Groups this group is allowed to touch.
    pub fn filter(self) -> Group {
        use CollisionGroup::*;
        let bits = match self {
            Terrain | Building => {
                Building.bits() | Gorilla.bits() | Projectile.bits() | Debris.bits()
            }
            Gorilla => Terrain.bits() | Building.bits() | Projectile.bits(),
            Projectile => Terrain.bits() | Building.bits() | Gorilla.bits(),
            Debris => Terrain.bits() | Building.bits() | Debris.bits(),
        };
        Group::from_bits_retain(bits)
    }

    pub fn membership(self) -> Group {
        Group::from_bits_retain(self.bits())
    }

    pub fn interaction_groups(self) -> InteractionGroups {
        InteractionGroups::new(self.membership(), self.filter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debris_ignores_gorillas_and_bananas() {
        let debris = CollisionGroup::Debris.interaction_groups();
        assert!(debris.test(CollisionGroup::Building.interaction_groups()));
        assert!(debris.test(CollisionGroup::Debris.interaction_groups()));
        assert!(!debris.test(CollisionGroup::Gorilla.interaction_groups()));
        assert!(!debris.test(CollisionGroup::Projectile.interaction_groups()));
    }
}
