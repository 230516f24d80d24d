//! Single authoritative store for every live entity.
//!
//! Entities live in one dense vector in insertion order. A slot map resolves
//! identifiers to positions and a per-kind ordered id set answers type
//! queries. Every mutation keeps the three in step; `is_index_consistent`
//! checks that they agree.

use std::collections::{BTreeSet, HashMap};

use crystal_siege_core::{circles_overlap, EnemyId, EnemyKind, Player, TrailDescriptor, Vec2};
use rand::Rng;

use crate::{
    archetypes::{ArchetypeContext, Neighbor},
    enemy::Enemy,
    pickups::ResourcePickup,
};

const KIND_COUNT: usize = EnemyKind::ALL.len();

/// World state entities read during their update beyond the collection itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct UpdateContext<'a> {
    /// Resource pickups lying in the world.
    pub pickups: &'a [ResourcePickup],
}

/// Capacity-bounded entity store with a per-kind secondary index.
#[derive(Debug)]
pub struct EnemyCollection {
    enemies: Vec<Enemy>,
    slots: HashMap<EnemyId, usize>,
    by_kind: [BTreeSet<EnemyId>; KIND_COUNT],
    capacity: usize,
    kind_caps: [Option<usize>; KIND_COUNT],
}

impl EnemyCollection {
    /// Creates an empty collection holding at most `capacity` entities.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            enemies: Vec::new(),
            slots: HashMap::new(),
            by_kind: Default::default(),
            capacity,
            kind_caps: [None; KIND_COUNT],
        }
    }

    /// Limits how many entities of `kind` may be stored at once.
    #[must_use]
    pub fn with_kind_cap(mut self, kind: EnemyKind, cap: usize) -> Self {
        self.kind_caps[kind.index()] = Some(cap);
        self
    }

    /// Inserts an entity. Returns `false` without side effects when the id is
    /// already present or a capacity limit is reached.
    pub fn add(&mut self, enemy: Enemy) -> bool {
        if self.is_at_capacity() || self.slots.contains_key(&enemy.id()) {
            return false;
        }
        let kind = enemy.kind();
        if let Some(cap) = self.kind_caps[kind.index()] {
            if self.by_kind[kind.index()].len() >= cap {
                return false;
            }
        }
        let _ = self.slots.insert(enemy.id(), self.enemies.len());
        let _ = self.by_kind[kind.index()].insert(enemy.id());
        self.enemies.push(enemy);
        true
    }

    /// Inserts entities in order until capacity runs out. Returns how many
    /// were inserted.
    pub fn add_many(&mut self, enemies: impl IntoIterator<Item = Enemy>) -> usize {
        enemies
            .into_iter()
            .map(|enemy| self.add(enemy))
            .filter(|inserted| *inserted)
            .count()
    }

    /// Removes and returns the entity with `id`.
    pub fn take(&mut self, id: EnemyId) -> Option<Enemy> {
        let slot = self.slots.remove(&id)?;
        let enemy = self.enemies.remove(slot);
        let _ = self.by_kind[enemy.kind().index()].remove(&id);
        for (index, shifted) in self.enemies.iter().enumerate().skip(slot) {
            let _ = self.slots.insert(shifted.id(), index);
        }
        Some(enemy)
    }

    /// Removes the entity with `id`. Returns `false` when it is absent.
    pub fn remove(&mut self, id: EnemyId) -> bool {
        self.take(id).is_some()
    }

    /// Flags the entity for the next dead sweep. Returns `false` when it is
    /// absent or already flagged.
    pub fn mark_dead(&mut self, id: EnemyId) -> bool {
        self.get_mut(id).is_some_and(Enemy::mark_dead)
    }

    /// Removes every flagged entity in one pass. Returns how many went.
    pub fn remove_dead_enemies(&mut self) -> usize {
        let before = self.enemies.len();
        let by_kind = &mut self.by_kind;
        self.enemies.retain(|enemy| {
            if enemy.is_marked_dead() {
                let _ = by_kind[enemy.kind().index()].remove(&enemy.id());
                false
            } else {
                true
            }
        });
        let removed = before - self.enemies.len();
        if removed > 0 {
            self.rebuild_slots();
        }
        removed
    }

    fn rebuild_slots(&mut self) {
        self.slots.clear();
        self.slots.extend(
            self.enemies
                .iter()
                .enumerate()
                .map(|(index, enemy)| (enemy.id(), index)),
        );
    }

    /// Looks up an entity by identifier.
    #[must_use]
    pub fn get(&self, id: EnemyId) -> Option<&Enemy> {
        self.slots
            .get(&id)
            .and_then(|slot| self.enemies.get(*slot))
    }

    /// Looks up an entity by identifier for mutation.
    pub fn get_mut(&mut self, id: EnemyId) -> Option<&mut Enemy> {
        let slot = *self.slots.get(&id)?;
        self.enemies.get_mut(slot)
    }

    /// Reports whether an entity with `id` is stored.
    #[must_use]
    pub fn contains(&self, id: EnemyId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Entities of `kind` in id order, including flagged ones.
    pub fn by_type(&self, kind: EnemyKind) -> impl Iterator<Item = &Enemy> + '_ {
        self.by_kind[kind.index()]
            .iter()
            .filter_map(move |id| self.get(*id))
    }

    /// Number of stored entities of `kind`, including flagged ones.
    #[must_use]
    pub fn count_by_type(&self, kind: EnemyKind) -> usize {
        self.by_kind[kind.index()].len()
    }

    /// Every stored entity in insertion order, optionally skipping dead ones.
    pub fn all(&self, include_dead: bool) -> impl Iterator<Item = &Enemy> + '_ {
        self.enemies
            .iter()
            .filter(move |enemy| include_dead || enemy.is_alive())
    }

    /// Every live entity in insertion order.
    pub fn alive(&self) -> impl Iterator<Item = &Enemy> + '_ {
        self.all(false)
    }

    /// Mutable access to every stored entity in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Enemy> + '_ {
        self.enemies.iter_mut()
    }

    /// Number of stored entities, including flagged ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.enemies.len()
    }

    /// Reports whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.enemies.is_empty()
    }

    /// Maximum number of stored entities.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Reports whether no further entity fits.
    #[must_use]
    pub fn is_at_capacity(&self) -> bool {
        self.enemies.len() >= self.capacity
    }

    /// Number of entities that still fit.
    #[must_use]
    pub fn remaining_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.enemies.len())
    }

    /// Advances every live entity by one tick and collects the trail markers
    /// they dropped.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        dt: f32,
        player: Vec2,
        context: &UpdateContext<'_>,
        rng: &mut R,
    ) -> Vec<TrailDescriptor> {
        let structures = self.neighbors(EnemyKind::SpawnStructure);
        let gravitational = self.neighbors(EnemyKind::Gravitational);
        let for_builders = ArchetypeContext {
            pickups: context.pickups,
            structures: &structures,
            siblings: &[],
        };
        let for_fighters = ArchetypeContext {
            structures: &structures,
            ..ArchetypeContext::default()
        };
        let for_gravitational = ArchetypeContext {
            siblings: &gravitational,
            ..ArchetypeContext::default()
        };
        let unaware = ArchetypeContext::default();

        let mut trails = Vec::new();
        for enemy in self.enemies.iter_mut().filter(|enemy| enemy.is_alive()) {
            let archetype_context = match enemy.kind() {
                EnemyKind::Builder => &for_builders,
                EnemyKind::Fighter => &for_fighters,
                EnemyKind::Gravitational => &for_gravitational,
                _ => &unaware,
            };
            trails.extend(enemy.update(dt, player, archetype_context, rng));
        }
        trails
    }

    fn neighbors(&self, kind: EnemyKind) -> Vec<Neighbor> {
        self.by_type(kind)
            .filter(|enemy| enemy.is_alive())
            .map(|enemy| Neighbor {
                id: enemy.id(),
                position: enemy.position(),
            })
            .collect()
    }

    /// Applies contact damage from every live entity overlapping the player.
    ///
    /// `on_hit` runs for each hit the player accepted. Returns the number of
    /// such hits.
    pub fn check_player_collisions<P: Player + ?Sized>(
        &self,
        player: &mut P,
        mut on_hit: impl FnMut(&Enemy, f32),
    ) -> usize {
        let mut hits = 0;
        for enemy in self.alive().filter(|enemy| enemy.damage() > 0.0) {
            if !circles_overlap(
                enemy.position(),
                enemy.radius(),
                player.position(),
                player.radius(),
            ) {
                continue;
            }
            if player.take_damage(enemy.damage()) {
                on_hit(enemy, enemy.damage());
                hits += 1;
            }
        }
        hits
    }

    /// Removes mobile entities strictly farther than `radius` from `origin`.
    /// Structures are never despawned. Returns how many were removed.
    pub fn despawn_far_enemies(&mut self, origin: Vec2, radius: f32) -> usize {
        let limit = radius * radius;
        let before = self.enemies.len();
        let by_kind = &mut self.by_kind;
        self.enemies.retain(|enemy| {
            let far = !enemy.kind().is_structure()
                && enemy.position().distance_squared(origin) > limit;
            if far {
                let _ = by_kind[enemy.kind().index()].remove(&enemy.id());
            }
            !far
        });
        let removed = before - self.enemies.len();
        if removed > 0 {
            self.rebuild_slots();
        }
        removed
    }

    /// Applies burning damage to every live panicking entity.
    ///
    /// Entities killed here are flagged dead and handed to `on_kill` exactly
    /// once. Returns the number of kills.
    pub fn apply_burning_damage(
        &mut self,
        dt: f32,
        damage_per_second: f32,
        mut on_kill: impl FnMut(&Enemy),
    ) -> usize {
        let mut kills = 0;
        for enemy in self
            .enemies
            .iter_mut()
            .filter(|enemy| enemy.is_alive() && enemy.status().is_panicking())
        {
            if enemy.take_damage(damage_per_second * dt) && enemy.mark_dead() {
                on_kill(enemy);
                kills += 1;
            }
        }
        kills
    }

    /// Verifies that the slot map and the per-kind index agree with storage.
    #[must_use]
    pub fn is_index_consistent(&self) -> bool {
        let slots_match = self.slots.len() == self.enemies.len()
            && self
                .enemies
                .iter()
                .enumerate()
                .all(|(index, enemy)| self.slots.get(&enemy.id()) == Some(&index));
        let indexed: usize = self.by_kind.iter().map(BTreeSet::len).sum();
        let kinds_match = indexed == self.enemies.len()
            && self
                .enemies
                .iter()
                .all(|enemy| self.by_kind[enemy.kind().index()].contains(&enemy.id()));
        slots_match && kinds_match
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crystal_siege_core::{ResourceKind, StatScaling, StatusPayload};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn enemy(rng: &mut ChaCha8Rng, id: u32, kind: EnemyKind, position: Vec2) -> Enemy {
        Enemy::new(EnemyId::new(id), kind, position, StatScaling::UNIT, rng).unwrap()
    }

    struct Dummy {
        position: Vec2,
        hits: Vec<f32>,
        accepts: bool,
    }

    impl Player for Dummy {
        fn position(&self) -> Vec2 {
            self.position
        }

        fn radius(&self) -> f32 {
            10.0
        }

        fn take_damage(&mut self, amount: f32) -> bool {
            if self.accepts {
                self.hits.push(amount);
            }
            self.accepts
        }

        fn add_xp(&mut self, _amount: u32) {}
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut collection = EnemyCollection::new(10);
        assert!(collection.add(enemy(&mut rng, 1, EnemyKind::Fighter, Vec2::ZERO)));
        assert!(!collection.add(enemy(&mut rng, 1, EnemyKind::Fiery, Vec2::ZERO)));
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.count_by_type(EnemyKind::Fiery), 0);
        assert!(collection.is_index_consistent());
    }

    #[test]
    fn kind_caps_reject_silently() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut collection =
            EnemyCollection::new(10).with_kind_cap(EnemyKind::Gravitational, 1);
        assert!(collection.add(enemy(&mut rng, 1, EnemyKind::Gravitational, Vec2::ZERO)));
        assert!(!collection.add(enemy(&mut rng, 2, EnemyKind::Gravitational, Vec2::ZERO)));
        assert!(collection.add(enemy(&mut rng, 3, EnemyKind::Fighter, Vec2::ZERO)));
    }

    #[test]
    fn removal_preserves_insertion_order() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut collection = EnemyCollection::new(10);
        for id in 0..5 {
            assert!(collection.add(enemy(&mut rng, id, EnemyKind::FastChaser, Vec2::ZERO)));
        }
        assert!(collection.remove(EnemyId::new(1)));
        assert!(!collection.remove(EnemyId::new(1)));
        let order: Vec<u32> = collection.all(true).map(|enemy| enemy.id().get()).collect();
        assert_eq!(order, vec![0, 2, 3, 4]);
        assert!(collection.is_index_consistent());
    }

    #[test]
    fn lookups_miss_after_removal_and_sweep() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut collection = EnemyCollection::new(10);
        for id in 0..3 {
            assert!(collection.add(enemy(&mut rng, id, EnemyKind::Fighter, Vec2::ZERO)));
        }
        assert!(collection.remove(EnemyId::new(2)));
        assert!(collection.get(EnemyId::new(2)).is_none());
        assert!(collection.get_mut(EnemyId::new(2)).is_none());
        assert!(collection.mark_dead(EnemyId::new(0)));
        assert_eq!(collection.remove_dead_enemies(), 1);
        assert!(collection.get(EnemyId::new(0)).is_none());
        assert_eq!(
            collection.get(EnemyId::new(1)).map(Enemy::id),
            Some(EnemyId::new(1))
        );
    }

    #[test]
    fn mark_dead_then_sweep_removes_once() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut collection = EnemyCollection::new(10);
        for id in 0..4 {
            assert!(collection.add(enemy(&mut rng, id, EnemyKind::Builder, Vec2::ZERO)));
        }
        assert!(collection.mark_dead(EnemyId::new(2)));
        assert!(!collection.mark_dead(EnemyId::new(2)));
        assert!(!collection.mark_dead(EnemyId::new(99)));
        assert_eq!(collection.alive().count(), 3);
        assert_eq!(collection.all(true).count(), 4);
        assert_eq!(collection.remove_dead_enemies(), 1);
        assert_eq!(collection.remove_dead_enemies(), 0);
        assert_eq!(collection.count_by_type(EnemyKind::Builder), 3);
        assert!(collection.is_index_consistent());
    }

    #[test]
    fn only_accepted_hits_are_reported() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut collection = EnemyCollection::new(10);
        assert!(collection.add(enemy(&mut rng, 1, EnemyKind::Fighter, Vec2::new(5.0, 0.0))));
        assert!(collection.add(enemy(&mut rng, 2, EnemyKind::Builder, Vec2::new(5.0, 0.0))));
        assert!(collection.add(enemy(&mut rng, 3, EnemyKind::Fiery, Vec2::new(500.0, 0.0))));

        let mut player = Dummy {
            position: Vec2::ZERO,
            hits: Vec::new(),
            accepts: true,
        };
        let mut seen = Vec::new();
        let hits = collection.check_player_collisions(&mut player, |enemy, _| seen.push(enemy.id()));
        assert_eq!(hits, 1);
        assert_eq!(seen, vec![EnemyId::new(1)]);

        player.accepts = false;
        assert_eq!(collection.check_player_collisions(&mut player, |_, _| {}), 0);
    }

    #[test]
    fn despawn_boundary_is_strict_and_spares_structures() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut collection = EnemyCollection::new(10);
        assert!(collection.add(enemy(&mut rng, 1, EnemyKind::Fighter, Vec2::new(100.0, 0.0))));
        assert!(collection.add(enemy(&mut rng, 2, EnemyKind::Fighter, Vec2::new(100.5, 0.0))));
        assert!(collection.add(Enemy::structure(
            EnemyId::new(3),
            Vec2::new(1000.0, 0.0),
            ResourceKind::Heat,
        )));
        assert_eq!(collection.despawn_far_enemies(Vec2::ZERO, 100.0), 1);
        assert!(collection.contains(EnemyId::new(1)));
        assert!(!collection.contains(EnemyId::new(2)));
        assert!(collection.contains(EnemyId::new(3)));
        assert!(collection.is_index_consistent());
    }

    #[test]
    fn burning_kills_are_reported_once() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut collection = EnemyCollection::new(10);
        let mut builder = enemy(&mut rng, 1, EnemyKind::Builder, Vec2::ZERO);
        builder.apply_status(StatusPayload::BurningPanic { duration: 5.0 }, Vec2::X, &mut rng);
        assert!(collection.add(builder));
        assert!(collection.add(enemy(&mut rng, 2, EnemyKind::Builder, Vec2::ZERO)));

        let mut killed = Vec::new();
        assert_eq!(collection.apply_burning_damage(1.0, 25.0, |enemy| killed.push(enemy.id())), 1);
        assert_eq!(collection.apply_burning_damage(1.0, 25.0, |enemy| killed.push(enemy.id())), 0);
        assert_eq!(killed, vec![EnemyId::new(1)]);
        assert_eq!(collection.remove_dead_enemies(), 1);
    }

    #[test]
    fn structures_attract_builders_during_update() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut collection = EnemyCollection::new(10);
        assert!(collection.add(enemy(&mut rng, 1, EnemyKind::Builder, Vec2::new(1000.0, 0.0))));
        assert!(collection.add(Enemy::structure(
            EnemyId::new(2),
            Vec2::new(1000.0, 400.0),
            ResourceKind::Void,
        )));
        let trails = collection.update(0.1, Vec2::ZERO, &UpdateContext::default(), &mut rng);
        assert!(trails.is_empty());
        let builder = collection.get(EnemyId::new(1)).unwrap();
        assert!(builder.position().y > 0.0);
    }
}
