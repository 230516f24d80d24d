//! R*-tree broadphase over live entities.
//!
//! Built once per combat pass with `bulk_load`. Queries expand the envelope by
//! the largest indexed radius and then filter with an exact circle test.

use crystal_siege_core::{circles_overlap, EnemyId, Vec2};
use rstar::{RTree, RTreeObject, AABB};

use crate::enemy::Enemy;

/// Position-only snapshot of an entity stored in the tree.
#[derive(Clone, Debug)]
pub struct EnemyLocation {
    /// Identifier of the indexed entity.
    pub id: EnemyId,
    position: [f32; 2],
    radius: f32,
}

impl RTreeObject for EnemyLocation {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

/// Broadphase over a snapshot of entity positions.
#[derive(Debug)]
pub struct SpatialIndex {
    tree: RTree<EnemyLocation>,
    max_radius: f32,
}

impl SpatialIndex {
    /// Indexes every live entity yielded by `enemies`.
    pub fn build<'a>(enemies: impl Iterator<Item = &'a Enemy>) -> Self {
        let locations: Vec<EnemyLocation> = enemies
            .filter(|enemy| enemy.is_alive())
            .map(|enemy| EnemyLocation {
                id: enemy.id(),
                position: enemy.position().to_array(),
                radius: enemy.radius(),
            })
            .collect();
        let max_radius = locations
            .iter()
            .map(|location| location.radius)
            .fold(0.0, f32::max);
        Self {
            tree: RTree::bulk_load(locations),
            max_radius,
        }
    }

    /// Number of indexed entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Reports whether nothing was indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Identifiers of indexed entities whose circle overlaps the query
    /// circle, sorted ascending.
    #[must_use]
    pub fn overlapping(&self, center: Vec2, radius: f32) -> Vec<EnemyId> {
        let reach = radius + self.max_radius;
        let envelope = AABB::from_corners(
            [center.x - reach, center.y - reach],
            [center.x + reach, center.y + reach],
        );
        let mut hits: Vec<EnemyId> = self
            .tree
            .locate_in_envelope(&envelope)
            .filter(|location| {
                circles_overlap(
                    Vec2::from_array(location.position),
                    location.radius,
                    center,
                    radius,
                )
            })
            .map(|location| location.id)
            .collect();
        hits.sort_unstable();
        hits
    }

    /// Identifiers of indexed entities whose circle overlaps the annulus
    /// between `inner` and `outer` around `center`, sorted ascending.
    #[must_use]
    pub fn overlapping_ring(&self, center: Vec2, inner: f32, outer: f32) -> Vec<EnemyId> {
        let reach = outer + self.max_radius;
        let envelope = AABB::from_corners(
            [center.x - reach, center.y - reach],
            [center.x + reach, center.y + reach],
        );
        let mut hits: Vec<EnemyId> = self
            .tree
            .locate_in_envelope(&envelope)
            .filter(|location| {
                let distance = Vec2::from_array(location.position).distance(center);
                distance + location.radius > inner && distance - location.radius < outer
            })
            .map(|location| location.id)
            .collect();
        hits.sort_unstable();
        hits
    }
}
