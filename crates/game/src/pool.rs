//! Object pools for short-lived effect objects.
//!
//! [`ObjectPool`] does the bookkeeping: every object it built is either
//! available or checked out, never both. The factory and reset hooks take a
//! context (`&mut C`) so pooled scene nodes can be built and hidden through
//! the scene that owns them. [`NodePool`] is the scene-node flavour used by
//! the effects engine.

use engine_core::{NodeDesc, NodeId, Scene, SceneError};
use std::collections::HashSet;
use std::hash::Hash;

pub type Factory<T, C> = Box<dyn FnMut(&mut C) -> Result<T, SceneError>>;
pub type Reset<T, C> = Box<dyn FnMut(&mut C, &T)>;

/// Result of handing an object back to its pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Release<T> {
    /// The object was not checked out from this pool; nothing happened.
    NotCheckedOut,
    /// Reset and stored for reuse.
    Recycled,
    /// The pool is full; the caller owns the object again and must destroy it.
    Discarded(T),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub available: usize,
    pub in_use: usize,
    pub total: usize,
    pub constructed: usize,
    pub discarded: usize,
}

pub struct ObjectPool<T, C = ()> {
    available: Vec<T>,
    in_use: HashSet<T>,
    factory: Factory<T, C>,
    reset: Option<Reset<T, C>>,
    max_size: usize,
    constructed: usize,
    discarded: usize,
    cleared: usize,
}

impl<T: Clone + Eq + Hash, C> ObjectPool<T, C> {
    pub fn new(factory: Factory<T, C>, reset: Option<Reset<T, C>>, max_size: usize) -> Self {
        Self {
            available: Vec::new(),
            in_use: HashSet::new(),
            factory,
            reset,
            max_size,
            constructed: 0,
            discarded: 0,
            cleared: 0,
        }
    }

    /// Pre-build up to `count` objects (bounded by `max_size`).
    pub fn prefill(&mut self, ctx: &mut C, count: usize) -> Result<(), SceneError> {
        let target = count.min(self.max_size);
        while self.available.len() < target {
            let obj = (self.factory)(ctx)?;
            self.constructed += 1;
            self.available.push(obj);
        }
        Ok(())
    }

    /// Check out an object, building a new one when none is available.
    pub fn acquire(&mut self, ctx: &mut C) -> Result<T, SceneError> {
        let obj = match self.available.pop() {
            Some(obj) => obj,
            None => {
                let obj = (self.factory)(ctx)?;
                self.constructed += 1;
                obj
            }
        };
        self.in_use.insert(obj.clone());
        Ok(obj)
    }

    pub fn release(&mut self, ctx: &mut C, obj: T) -> Release<T> {
        if !self.in_use.remove(&obj) {
            return Release::NotCheckedOut;
        }
        if let Some(reset) = self.reset.as_mut() {
            reset(ctx, &obj);
        }
        if self.available.len() < self.max_size {
            self.available.push(obj);
            Release::Recycled
        } else {
            self.discarded += 1;
            Release::Discarded(obj)
        }
    }

    /// Release every checked-out object. Returns those that did not fit.
    pub fn release_all(&mut self, ctx: &mut C) -> Vec<T> {
        let out: Vec<T> = self.in_use.iter().cloned().collect();
        out.into_iter()
            .filter_map(|obj| match self.release(ctx, obj) {
                Release::Discarded(obj) => Some(obj),
                _ => None,
            })
            .collect()
    }

    /// Forget every object, available or not, and hand them all back for teardown.
    pub fn clear(&mut self) -> Vec<T> {
        let mut all: Vec<T> = self.available.drain(..).collect();
        all.extend(self.in_use.drain());
        self.cleared += all.len();
        all
    }

    pub fn is_in_use(&self, obj: &T) -> bool {
        self.in_use.contains(obj)
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            available: self.available.len(),
            in_use: self.in_use.len(),
            total: self.available.len() + self.in_use.len(),
            constructed: self.constructed,
            discarded: self.discarded,
        }
    }

    /// Objects the pool has forgotten through [`ObjectPool::clear`].
    pub fn cleared(&self) -> usize {
        self.cleared
    }
}

/// Pool of scene nodes built from a template.
///
/// Acquired nodes are shown; released nodes are hidden and put back to the
/// template's transform and color. Nodes that do not fit are despawned.
pub struct NodePool<S: Scene> {
    name: &'static str,
    pool: ObjectPool<NodeId, S>,
}

impl<S: Scene + 'static> NodePool<S> {
    pub fn new(name: &'static str, scene: &mut S, template: NodeDesc, initial: usize, max: usize) -> Self {
        let max = max.max(1);
        let build = template.clone().hidden();
        let factory: Factory<NodeId, S> = Box::new(move |scene: &mut S| scene.spawn(build.clone()));
        let reset: Reset<NodeId, S> = Box::new(move |scene: &mut S, node: &NodeId| {
            scene.set_visible(*node, false);
            scene.set_transform(*node, template.transform);
            scene.set_color(*node, template.color);
        });
        let mut pool = ObjectPool::new(factory, Some(reset), max);
        if let Err(e) = pool.prefill(scene, initial) {
            log::warn!("Could not prefill {name} pool: {e}");
        }
        Self { name, pool }
    }

    pub fn acquire(&mut self, scene: &mut S) -> Result<NodeId, SceneError> {
        let node = self.pool.acquire(scene)?;
        scene.set_visible(node, true);
        Ok(node)
    }

    pub fn release(&mut self, scene: &mut S, node: NodeId) {
        match self.pool.release(scene, node) {
            Release::Discarded(node) => {
                scene.despawn(node);
            }
            Release::NotCheckedOut => {
                log::trace!("{} pool: node {:?} was not checked out", self.name, node);
            }
            Release::Recycled => {}
        }
    }

    pub fn release_all(&mut self, scene: &mut S) {
        for node in self.pool.release_all(scene) {
            scene.despawn(node);
        }
    }

    /// Despawn every node the pool knows about.
    pub fn clear(&mut self, scene: &mut S) {
        for node in self.pool.clear() {
            scene.despawn(node);
        }
    }

    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{Colorable, SceneGraph, Visible, MODEL_SPHERE};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn counter_pool(max: usize) -> ObjectPool<u32> {
        let mut next = 0;
        ObjectPool::new(
            Box::new(move |_: &mut ()| {
                next += 1;
                Ok(next)
            }),
            None,
            max,
        )
    }

    fn check_invariant(pool: &ObjectPool<u32>) {
        let s = pool.stats();
        assert_eq!(s.available + s.in_use, s.constructed - s.discarded - pool.cleared());
    }

    #[test]
    fn acquire_reuses_released_objects() {
        let mut pool = counter_pool(4);
        let a = pool.acquire(&mut ()).unwrap();
        assert_eq!(pool.release(&mut (), a), Release::Recycled);
        let b = pool.acquire(&mut ()).unwrap();
        assert_eq!(a, b);
        assert_eq!(pool.stats().constructed, 1);
    }

    #[test]
    fn release_of_foreign_object_is_a_no_op() {
        let mut pool = counter_pool(4);
        assert_eq!(pool.release(&mut (), 99), Release::NotCheckedOut);
        let a = pool.acquire(&mut ()).unwrap();
        pool.release(&mut (), a);
        assert_eq!(pool.release(&mut (), a), Release::NotCheckedOut);
        assert_eq!(pool.stats().available, 1);
    }

    #[test]
    fn full_pool_discards() {
        let mut pool = counter_pool(1);
        let a = pool.acquire(&mut ()).unwrap();
        let b = pool.acquire(&mut ()).unwrap();
        assert_eq!(pool.release(&mut (), a), Release::Recycled);
        assert_eq!(pool.release(&mut (), b), Release::Discarded(b));
        check_invariant(&pool);
    }

    #[test]
    fn invariant_holds_under_random_traffic() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut pool = counter_pool(8);
        let mut held = Vec::new();
        for step in 0..2000 {
            match rng.gen_range(0..10) {
                0..=4 => held.push(pool.acquire(&mut ()).unwrap()),
                5..=7 if !held.is_empty() => {
                    let i = rng.gen_range(0..held.len());
                    pool.release(&mut (), held.swap_remove(i));
                }
                8 => {
                    pool.release(&mut (), 10_000 + step);
                }
                _ => {}
            }
            if step % 500 == 499 {
                pool.release_all(&mut ());
                held.clear();
            }
            check_invariant(&pool);
            assert_eq!(pool.stats().in_use, held.len());
        }
        pool.clear();
        check_invariant(&pool);
        assert_eq!(pool.stats().total, 0);
    }

    #[test]
    fn node_pool_hides_and_despawns() {
        let mut scene = SceneGraph::new();
        let template = NodeDesc::model(MODEL_SPHERE).colored([1.0, 0.0, 0.0, 1.0]);
        let mut pool = NodePool::new("test", &mut scene, template, 2, 2);
        assert_eq!(scene.node_count(), 2);
        assert_eq!(scene.visible_count(), 0);

        let nodes: Vec<_> = (0..3).map(|_| pool.acquire(&mut scene).unwrap()).collect();
        assert_eq!(scene.visible_count(), 3);
        scene.set_alpha(nodes[0], 0.1);

        for node in &nodes {
            pool.release(&mut scene, *node);
        }
        assert_eq!(scene.visible_count(), 0);
        assert_eq!(scene.node_count(), 2);
        assert_eq!(scene.color(nodes[0]), Some([1.0, 0.0, 0.0, 1.0]));
        assert!(!scene.is_visible(nodes[0]));

        pool.clear(&mut scene);
        assert_eq!(scene.node_count(), 0);
    }

    #[test]
    fn node_pool_surfaces_missing_model() {
        let mut scene = SceneGraph::new();
        let mut pool = NodePool::new("broken", &mut scene, NodeDesc::model("models/nope"), 3, 0);
        assert_eq!(pool.stats().constructed, 0);
        assert!(matches!(
            pool.acquire(&mut scene),
            Err(SceneError::MissingAsset(_))
        ));
    }
}
