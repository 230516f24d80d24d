//! Orbit-count trigger that fuses builders into a champion.

use crystal_siege_core::{EnemyId, PickupId, ResourceKind, Vec2};

use crate::{collection::EnemyCollection, enemy::Enemy, pickups::PickupField};

/// Number of orbiters that fuse into one champion.
pub const FUSION_THRESHOLD: usize = 5;

/// Entities consumed and created by a fusion.
#[derive(Clone, Debug, PartialEq)]
pub struct FusionOutcome {
    /// Identifier of the new champion.
    pub champion: EnemyId,
    /// Tier of the new champion.
    pub tier: ResourceKind,
    /// Position the champion appeared at.
    pub position: Vec2,
    /// Orbiters removed by the fusion, in id order.
    pub consumed: Vec<EnemyId>,
}

/// Live entities currently orbiting `pickup`, in id order.
#[must_use]
pub fn orbiters_of(collection: &EnemyCollection, pickup: PickupId) -> Vec<EnemyId> {
    let mut orbiters: Vec<EnemyId> = collection
        .alive()
        .filter(|enemy| enemy.orbit_anchor() == Some(pickup))
        .map(Enemy::id)
        .collect();
    orbiters.sort_unstable();
    orbiters
}

/// Fuses the orbiters of `pickup` once enough of them have gathered.
///
/// Removes exactly [`FUSION_THRESHOLD`] orbiters and the pickup, then inserts
/// one champion with id `champion` whose tier is the pickup's category.
/// Returns `None` and changes nothing below the threshold or when the pickup
/// no longer exists.
pub fn fuse_orbiters(
    collection: &mut EnemyCollection,
    pickups: &mut PickupField,
    pickup: PickupId,
    champion: EnemyId,
) -> Option<FusionOutcome> {
    let orbiters = orbiters_of(collection, pickup);
    if orbiters.len() < FUSION_THRESHOLD || collection.contains(champion) {
        return None;
    }
    let anchor = pickups.take(pickup)?;
    let consumed: Vec<EnemyId> = orbiters.into_iter().take(FUSION_THRESHOLD).collect();
    for id in &consumed {
        let _ = collection.remove(*id);
    }
    for straggler in collection
        .iter_mut()
        .filter(|enemy| enemy.orbit_anchor() == Some(pickup))
    {
        straggler.clear_orbit();
    }
    let fused = Enemy::champion(champion, anchor.position(), anchor.kind());
    if !collection.add(fused) {
        return None;
    }
    Some(FusionOutcome {
        champion,
        tier: anchor.kind(),
        position: anchor.position(),
        consumed,
    })
}
