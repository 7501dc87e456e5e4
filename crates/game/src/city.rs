//! City layout: a grid of box buildings separated by streets, and the two
//! gorillas standing on their roofs.

use engine_core::{NodeDesc, NodeId, Scene, Vec3, MODEL_CUBE, MODEL_SPHERE};
use rand::Rng;
use std::collections::VecDeque;

/// Footprint pitch of one grid cell.
pub const BUILDING_SPACING: f32 = 12.0;
pub const STREET_WIDTH: f32 = 6.0;
/// Radius of the sphere a banana must enter to hit a gorilla.
pub const GORILLA_HIT_RADIUS: f32 = 1.5;

pub type BuildingId = u32;

#[derive(Debug, Clone)]
pub struct Building {
    pub id: BuildingId,
    /// Minimum corner, on the ground.
    pub origin: Vec3,
    pub width: f32,
    pub depth: f32,
    pub height: f32,
    pub color: [f32; 4],
    pub node: Option<NodeId>,
    /// Absent until the building is first hit.
    pub damage: Option<f32>,
    /// Oldest first.
    pub craters: VecDeque<NodeId>,
}

impl Building {
    pub fn new(id: BuildingId, origin: Vec3, width: f32, depth: f32, height: f32) -> Self {
        Self {
            id,
            origin,
            width,
            depth,
            height,
            color: [0.4, 0.4, 0.45, 1.0],
            node: None,
            damage: None,
            craters: VecDeque::new(),
        }
    }

    pub fn size(&self) -> Vec3 {
        Vec3::new(self.width, self.depth, self.height)
    }

    pub fn max(&self) -> Vec3 {
        self.origin + self.size()
    }

    pub fn center(&self) -> Vec3 {
        self.origin + self.size() * 0.5
    }

    /// Closest point of the building's box to `p`.
    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        p.clamp(self.origin, self.max())
    }

    /// Random point on the roof, away from the edges.
    pub fn roof_point<R: Rng>(&self, rng: &mut R) -> Vec3 {
        Vec3::new(
            self.origin.x + rng.gen_range(0.2..=0.8) * self.width,
            self.origin.y + rng.gen_range(0.2..=0.8) * self.depth,
            self.origin.z + self.height,
        )
    }

    pub fn damage(&self) -> f32 {
        self.damage.unwrap_or(0.0)
    }
}

#[derive(Debug, Default)]
pub struct City {
    buildings: Vec<Building>,
}

impl City {
    /// Lay out `rows * cols` buildings centered on the origin.
    pub fn generate<R: Rng>(rng: &mut R, rows: usize, cols: usize) -> Self {
        let pitch = BUILDING_SPACING + STREET_WIDTH;
        let total_w = cols as f32 * BUILDING_SPACING + cols.saturating_sub(1) as f32 * STREET_WIDTH;
        let total_d = rows as f32 * BUILDING_SPACING + rows.saturating_sub(1) as f32 * STREET_WIDTH;
        let (start_x, start_y) = (-total_w / 2.0, -total_d / 2.0);

        let mut buildings = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                let origin = Vec3::new(start_x + col as f32 * pitch, start_y + row as f32 * pitch, 0.0);
                let mut b = Building::new(
                    buildings.len() as BuildingId,
                    origin,
                    rng.gen_range(3.0..=7.0),
                    rng.gen_range(3.0..=7.0),
                    rng.gen_range(10.0..=30.0),
                );
                b.color = [
                    rng.gen_range(0.3..=0.5),
                    rng.gen_range(0.3..=0.5),
                    rng.gen_range(0.3..=0.6),
                    1.0,
                ];
                buildings.push(b);
            }
        }
        log::info!("Generated city: {} buildings ({rows}x{cols})", buildings.len());
        Self { buildings }
    }

    /// Create a scene node for every building that lacks one.
    pub fn spawn_nodes<S: Scene>(&mut self, scene: &mut S) {
        for b in &mut self.buildings {
            if b.node.is_some() {
                continue;
            }
            let mut desc = NodeDesc::model(MODEL_CUBE).at(b.center()).colored(b.color);
            desc.transform.scale = b.size();
            match scene.spawn(desc) {
                Ok(node) => b.node = Some(node),
                Err(e) => log::warn!("Building {} has no visual: {e}", b.id),
            }
        }
    }

    /// Despawn every building node and crater, then forget all buildings.
    pub fn clear<S: Scene>(&mut self, scene: &mut S) {
        for b in self.buildings.drain(..) {
            despawn_building(scene, b);
        }
    }

    pub fn get(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.iter().find(|b| b.id == id)
    }

    pub fn get_mut(&mut self, id: BuildingId) -> Option<&mut Building> {
        self.buildings.iter_mut().find(|b| b.id == id)
    }

    pub fn remove(&mut self, id: BuildingId) -> Option<Building> {
        let index = self.buildings.iter().position(|b| b.id == id)?;
        Some(self.buildings.remove(index))
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }
}

/// Remove a building's visuals from the scene.
pub fn despawn_building<S: Scene>(scene: &mut S, building: Building) {
    if let Some(node) = building.node {
        scene.despawn(node);
    }
    for crater in building.craters {
        scene.despawn(crater);
    }
}

#[derive(Debug, Clone)]
pub struct Gorilla {
    pub player: usize,
    pub position: Vec3,
    pub building: BuildingId,
    pub node: Option<NodeId>,
}

impl Gorilla {
    pub fn hit_by(&self, point: Vec3) -> bool {
        self.position.distance(point) < GORILLA_HIT_RADIUS
    }
}

/// Put one gorilla per player on two distinct random rooftops.
pub fn place_gorillas<S: Scene, R: Rng>(scene: &mut S, city: &City, rng: &mut R) -> Vec<Gorilla> {
    let n = city.len();
    if n == 0 {
        return Vec::new();
    }
    let first = rng.gen_range(0..n);
    let second = if n == 1 {
        first
    } else {
        let offset = rng.gen_range(1..n);
        (first + offset) % n
    };

    [first, second]
        .iter()
        .enumerate()
        .map(|(player, &index)| {
            let building = &city.buildings()[index];
            let position = building.roof_point(rng);
            let color = if player == 0 {
                [0.6, 0.4, 0.2, 1.0]
            } else {
                [0.4, 0.25, 0.1, 1.0]
            };
            let node = scene
                .spawn(NodeDesc::model(MODEL_SPHERE).at(position).colored(color))
                .map_err(|e| log::warn!("Gorilla {player} has no visual: {e}"))
                .ok();
            Gorilla {
                player,
                position,
                building: building.id,
                node,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::SceneGraph;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn generated_buildings_respect_ranges() {
        let mut rng = StdRng::seed_from_u64(5);
        let city = City::generate(&mut rng, 7, 7);
        assert_eq!(city.len(), 49);
        for b in city.buildings() {
            assert!((3.0..=7.0).contains(&b.width));
            assert!((3.0..=7.0).contains(&b.depth));
            assert!((10.0..=30.0).contains(&b.height));
            assert_eq!(b.origin.z, 0.0);
            assert!(b.damage.is_none());
        }
        // Neighbours never overlap.
        let a = &city.buildings()[0];
        let b = &city.buildings()[1];
        assert!(a.max().x < b.origin.x);
    }

    #[test]
    fn gorillas_stand_on_distinct_roofs() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut scene = SceneGraph::new();
        let mut city = City::generate(&mut rng, 3, 3);
        city.spawn_nodes(&mut scene);
        let gorillas = place_gorillas(&mut scene, &city, &mut rng);
        assert_eq!(gorillas.len(), 2);
        assert_ne!(gorillas[0].building, gorillas[1].building);
        for g in &gorillas {
            let b = city.get(g.building).unwrap();
            assert_eq!(g.position.z, b.height);
            assert!(g.node.is_some());
        }
        assert_eq!(scene.node_count(), 11);

        city.clear(&mut scene);
        assert_eq!(scene.node_count(), 2);
    }

    #[test]
    fn closest_point_clamps_to_box() {
        let b = Building::new(0, Vec3::ZERO, 4.0, 4.0, 10.0);
        assert_eq!(b.closest_point(Vec3::new(-3.0, 2.0, 20.0)), Vec3::new(0.0, 2.0, 10.0));
        assert_eq!(b.closest_point(Vec3::new(1.0, 1.0, 1.0)), Vec3::new(1.0, 1.0, 1.0));
    }
}
