#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Crystal Siege.

pub mod archetypes;
pub mod collection;
pub mod effects;
pub mod enemy;
pub mod fusion;
pub mod pickups;
pub mod player;
pub mod spatial;
pub mod status;
pub mod structure;

use std::time::Duration;

use crystal_siege_core::{
    circles_overlap, Command, ConfigError, EnemyId, EnemyKind, Event, PickupId, Player, Vec2,
    WaveDescriptor, MAX_TICK,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    collection::{EnemyCollection, UpdateContext},
    effects::EffectStore,
    enemy::Enemy,
    pickups::PickupField,
    player::PlayerState,
};

/// Experience a builder feeds into a structure on contact.
pub const BUILDER_FEED_XP: u32 = 5;

const WAVE_SCATTER_RADIUS: f32 = 40.0;

/// Tuning of the authoritative world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Maximum number of stored entities.
    pub capacity: usize,
    /// Maximum number of gravitational enemies, bounding their pairwise pass.
    pub gravitational_cap: usize,
    /// Maximum number of spawn structures.
    pub structure_cap: usize,
    /// Despawn radius as a multiple of the visible half-diagonal.
    pub despawn_factor: f32,
    /// Seed of the world's random number generator.
    pub seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            capacity: 20_000,
            gravitational_cap: 400,
            structure_cap: 12,
            despawn_factor: 3.0,
            seed: 0x5eed_c0de_2024_0001,
        }
    }
}

impl WorldConfig {
    /// Rejects values the world cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "capacity",
                reason: "must be positive",
            });
        }
        if self.structure_cap == 0 {
            return Err(ConfigError::InvalidValue {
                field: "structure_cap",
                reason: "must be positive",
            });
        }
        if !(self.despawn_factor.is_finite() && self.despawn_factor > 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "despawn_factor",
                reason: "must be finite and greater than one",
            });
        }
        Ok(())
    }
}

/// Represents the authoritative Crystal Siege world state.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    rng: ChaCha8Rng,
    next_enemy_id: u32,
    enemies: EnemyCollection,
    pickups: PickupField,
    effects: EffectStore,
    player: PlayerState,
    pending_waves: Vec<WaveDescriptor>,
    despawn_radius: Option<f32>,
    elapsed: Duration,
    tick_index: u64,
}

/// Disjoint mutable borrows of the world handed to the combat pipeline.
#[derive(Debug)]
pub struct WorldParts<'a> {
    /// Entity store.
    pub enemies: &'a mut EnemyCollection,
    /// Resource pickups.
    pub pickups: &'a mut PickupField,
    /// Damage sources.
    pub effects: &'a mut EffectStore,
    /// Player state.
    pub player: &'a mut PlayerState,
    /// World random number generator.
    pub rng: &'a mut ChaCha8Rng,
}

impl World {
    /// Creates an empty world with the player at the origin.
    pub fn new(config: WorldConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let enemies = EnemyCollection::new(config.capacity)
            .with_kind_cap(EnemyKind::Gravitational, config.gravitational_cap)
            .with_kind_cap(EnemyKind::SpawnStructure, config.structure_cap);
        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            next_enemy_id: 0,
            enemies,
            pickups: PickupField::new(),
            effects: EffectStore::new(),
            player: PlayerState::new(Vec2::ZERO),
            pending_waves: Vec::new(),
            despawn_radius: None,
            elapsed: Duration::ZERO,
            tick_index: 0,
        })
    }

    /// Borrows the parts the combat pipeline mutates.
    pub fn parts_mut(&mut self) -> WorldParts<'_> {
        WorldParts {
            enemies: &mut self.enemies,
            pickups: &mut self.pickups,
            effects: &mut self.effects,
            player: &mut self.player,
            rng: &mut self.rng,
        }
    }

    fn allocate_enemy_id(&mut self) -> EnemyId {
        let id = EnemyId::new(self.next_enemy_id);
        self.next_enemy_id = self.next_enemy_id.saturating_add(1);
        id
    }

    fn insert(&mut self, enemy: Enemy, out_events: &mut Vec<Event>) -> bool {
        let (id, kind) = (enemy.id(), enemy.kind());
        if self.enemies.add(enemy) {
            out_events.push(Event::EnemySpawned { id, kind });
            true
        } else {
            warn!(kind = %kind, population = self.enemies.len(), "spawn rejected");
            out_events.push(Event::SpawnRejected { kind });
            false
        }
    }

    fn release_pending_waves(&mut self, out_events: &mut Vec<Event>) -> Result<(), ConfigError> {
        for wave in std::mem::take(&mut self.pending_waves) {
            for _ in 0..wave.count {
                let offset = Vec2::from_angle(self.rng.gen_range(0.0..std::f32::consts::TAU))
                    * self.rng.gen_range(0.0..WAVE_SCATTER_RADIUS);
                let id = self.allocate_enemy_id();
                let enemy = Enemy::new(
                    id,
                    wave.archetype,
                    wave.origin + offset,
                    wave.scaling,
                    &mut self.rng,
                )?;
                if !self.insert(enemy, out_events) {
                    break;
                }
            }
        }
        Ok(())
    }

    fn resolve_builder_contacts(&mut self, out_events: &mut Vec<Event>) {
        let builders: Vec<(EnemyId, Vec2, f32, Option<PickupId>)> = self
            .enemies
            .by_type(EnemyKind::Builder)
            .filter(|builder| builder.is_alive())
            .map(|builder| {
                (
                    builder.id(),
                    builder.position(),
                    builder.radius(),
                    builder.orbit_anchor(),
                )
            })
            .collect();

        for (builder, position, radius, anchor) in builders {
            if !self.enemies.get(builder).is_some_and(Enemy::is_alive) {
                continue;
            }
            if let Some(structure) = self.touching_structure(position, radius) {
                self.feed_structure(structure, builder, out_events);
                continue;
            }
            if anchor.is_some() {
                continue;
            }
            let Some(pickup) = self.pickups.first_overlapping(position, radius) else {
                continue;
            };
            if self.enemies.count_by_type(EnemyKind::SpawnStructure) < self.config.structure_cap {
                self.found_structure(builder, pickup.id(), out_events);
            } else {
                self.join_orbit(builder, pickup.id(), pickup.position(), out_events);
            }
        }
    }

    fn touching_structure(&self, position: Vec2, radius: f32) -> Option<EnemyId> {
        self.enemies
            .by_type(EnemyKind::SpawnStructure)
            .filter(|structure| structure.is_alive())
            .find(|structure| {
                circles_overlap(position, radius, structure.position(), structure.radius())
            })
            .map(Enemy::id)
    }

    fn feed_structure(&mut self, structure: EnemyId, builder: EnemyId, out_events: &mut Vec<Event>) {
        let _ = self.enemies.mark_dead(builder);
        let Some(report) = self
            .enemies
            .get_mut(structure)
            .and_then(|target| target.add_structure_xp(BUILDER_FEED_XP))
        else {
            return;
        };
        out_events.push(Event::StructureFed {
            id: structure,
            xp: BUILDER_FEED_XP,
        });
        if report.gained() > 0 {
            debug!(structure = structure.get(), level = report.to, "structure levelled up");
            out_events.push(Event::StructureLeveled {
                id: structure,
                level: report.to,
            });
        }
    }

    fn found_structure(&mut self, builder: EnemyId, pickup: PickupId, out_events: &mut Vec<Event>) {
        if self.enemies.is_at_capacity() {
            debug!(builder = builder.get(), "collection full, crystal left in place");
            return;
        }
        let Some(crystal) = self.pickups.take(pickup) else {
            return;
        };
        let _ = self.enemies.mark_dead(builder);
        for orbiter in self
            .enemies
            .iter_mut()
            .filter(|enemy| enemy.orbit_anchor() == Some(pickup))
        {
            orbiter.clear_orbit();
        }
        let id = self.allocate_enemy_id();
        let structure = Enemy::structure(id, crystal.position(), crystal.kind());
        if self.insert(structure, out_events) {
            debug!(structure = id.get(), resource = %crystal.kind(), "structure created");
            out_events.push(Event::StructureCreated {
                id,
                resource: crystal.kind(),
                position: crystal.position(),
            });
        }
    }

    fn join_orbit(
        &mut self,
        builder: EnemyId,
        pickup: PickupId,
        center: Vec2,
        out_events: &mut Vec<Event>,
    ) {
        if let Some(orbiter) = self.enemies.get_mut(builder) {
            orbiter.start_orbit(pickup, center);
        }
        let champion = EnemyId::new(self.next_enemy_id);
        let fused = fusion::fuse_orbiters(&mut self.enemies, &mut self.pickups, pickup, champion);
        if let Some(outcome) = fused {
            let _ = self.allocate_enemy_id();
            info!(
                champion = outcome.champion.get(),
                tier = %outcome.tier,
                "orbiters fused into a champion"
            );
            out_events.push(Event::ChampionFused {
                id: outcome.champion,
                tier: outcome.tier,
                consumed: outcome.consumed,
            });
        }
    }

    fn resolve_fighter_intrusions(&mut self, out_events: &mut Vec<Event>) {
        let fighters: Vec<(Vec2, f32)> = self
            .enemies
            .by_type(EnemyKind::Fighter)
            .filter(|fighter| fighter.is_alive())
            .map(|fighter| (fighter.position(), fighter.radius()))
            .collect();
        for (position, radius) in fighters {
            let Some(structure) = self.touching_structure(position, radius) else {
                continue;
            };
            let Some(target) = self.enemies.get_mut(structure) else {
                continue;
            };
            let origin = target.position();
            let Some(wave) = target
                .as_structure_mut()
                .and_then(|state| state.try_trigger_spawn(origin))
            else {
                continue;
            };
            info!(
                structure = structure.get(),
                archetype = %wave.archetype,
                count = wave.count,
                level = wave.scaling.level,
                "wave triggered"
            );
            self.pending_waves.push(wave);
            out_events.push(Event::WaveTriggered { structure, wave });
        }
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) -> Result<(), ConfigError> {
        let dt = dt.min(MAX_TICK);
        self.tick_index = self.tick_index.saturating_add(1);
        self.elapsed = self.elapsed.saturating_add(dt);
        out_events.push(Event::TimeAdvanced { dt });

        self.release_pending_waves(out_events)?;

        let seconds = dt.as_secs_f32();
        self.player.tick(seconds);
        let player_position = self.player.position();
        self.effects.advance(seconds, player_position);

        let context = UpdateContext {
            pickups: self.pickups.as_slice(),
        };
        let trails = self
            .enemies
            .update(seconds, player_position, &context, &mut self.rng);
        for trail in trails {
            let _ = self.effects.spawn_trail(trail);
        }

        self.resolve_builder_contacts(out_events);
        self.resolve_fighter_intrusions(out_events);

        let _ = self
            .enemies
            .check_player_collisions(&mut self.player, |enemy, amount| {
                out_events.push(Event::PlayerDamaged {
                    by: enemy.id(),
                    amount,
                });
            });

        if let Some(radius) = self.despawn_radius {
            let count = self.enemies.despawn_far_enemies(player_position, radius);
            if count > 0 {
                out_events.push(Event::EnemiesDespawned { count });
            }
        }
        Ok(())
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Fails only when a command names an archetype that cannot be built from a
/// tag alone.
pub fn apply(
    world: &mut World,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), ConfigError> {
    match command {
        Command::ConfigureViewport { bounds } => {
            world.despawn_radius = Some(bounds.half_diagonal() * world.config.despawn_factor);
        }
        Command::MovePlayer { position } => world.player.set_position(position),
        Command::Tick { dt } => world.tick(dt, out_events)?,
        Command::SpawnEnemy {
            kind,
            position,
            scaling,
        } => {
            let id = world.allocate_enemy_id();
            let enemy = Enemy::new(id, kind, position, scaling, &mut world.rng)?;
            let _ = world.insert(enemy, out_events);
        }
        Command::PlacePickup { kind, position } => {
            let id = world.pickups.place(kind, position);
            out_events.push(Event::PickupPlaced { id, kind });
        }
        Command::CastAbility {
            ability,
            origin,
            direction,
        } => {
            let _ = world.effects.cast(ability, origin, direction);
        }
        Command::SweepDead => {
            let count = world.enemies.remove_dead_enemies();
            let _ = world.effects.expire();
            if count > 0 {
                out_events.push(Event::EnemiesSwept { count });
            }
        }
    }
    Ok(())
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use crystal_siege_core::{EnemyKind, Player, Vec2};

    use super::World;
    use crate::{
        collection::EnemyCollection, effects::EffectStore, pickups::PickupField,
        player::PlayerState,
    };

    /// Provides read-only access to the entity store.
    #[must_use]
    pub fn enemies(world: &World) -> &EnemyCollection {
        &world.enemies
    }

    /// Provides read-only access to the resource pickups.
    #[must_use]
    pub fn pickups(world: &World) -> &PickupField {
        &world.pickups
    }

    /// Provides read-only access to the active damage sources.
    #[must_use]
    pub fn effects(world: &World) -> &EffectStore {
        &world.effects
    }

    /// Provides read-only access to the player.
    #[must_use]
    pub fn player(world: &World) -> &PlayerState {
        &world.player
    }

    /// Current player position.
    #[must_use]
    pub fn player_position(world: &World) -> Vec2 {
        world.player.position()
    }

    /// Simulated time since the world was created.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.elapsed
    }

    /// Number of ticks processed so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Number of waves queued for insertion on the next tick.
    #[must_use]
    pub fn pending_wave_count(world: &World) -> usize {
        world.pending_waves.len()
    }

    /// Radius beyond which mobile entities are despawned, once a viewport is
    /// configured.
    #[must_use]
    pub fn despawn_radius(world: &World) -> Option<f32> {
        world.despawn_radius
    }

    /// Live population of every kind, in tag order.
    #[must_use]
    pub fn population(world: &World) -> Vec<(EnemyKind, usize)> {
        EnemyKind::ALL
            .into_iter()
            .map(|kind| {
                let alive = world
                    .enemies
                    .by_type(kind)
                    .filter(|enemy| enemy.is_alive())
                    .count();
                (kind, alive)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crystal_siege_core::{ResourceKind, StatScaling, VisibleBounds};

    fn world() -> World {
        World::new(WorldConfig::default()).unwrap()
    }

    fn run(world: &mut World, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        apply(world, command, &mut events).unwrap();
        events
    }

    fn spawn(world: &mut World, kind: EnemyKind, position: Vec2) -> EnemyId {
        let events = run(
            world,
            Command::SpawnEnemy {
                kind,
                position,
                scaling: StatScaling::UNIT,
            },
        );
        match events.as_slice() {
            [Event::EnemySpawned { id, .. }] => *id,
            other => panic!("unexpected events {other:?}"),
        }
    }

    fn tick(world: &mut World, millis: u64) -> Vec<Event> {
        run(
            world,
            Command::Tick {
                dt: Duration::from_millis(millis),
            },
        )
    }

    #[test]
    fn tick_clamps_long_frames() {
        let mut world = world();
        let events = tick(&mut world, 500);
        assert_eq!(events[0], Event::TimeAdvanced { dt: MAX_TICK });
        assert_eq!(query::elapsed(&world), MAX_TICK);
    }

    #[test]
    fn spawning_a_structure_by_tag_fails_fast() {
        let mut world = world();
        let mut events = Vec::new();
        let result = apply(
            &mut world,
            Command::SpawnEnemy {
                kind: EnemyKind::SpawnStructure,
                position: Vec2::ZERO,
                scaling: StatScaling::UNIT,
            },
            &mut events,
        );
        assert_eq!(
            result,
            Err(ConfigError::UnknownArchetype("spawnStructure".to_owned()))
        );
        assert!(events.is_empty());

        let result = apply(
            &mut world,
            Command::SpawnEnemy {
                kind: EnemyKind::Champion,
                position: Vec2::ZERO,
                scaling: StatScaling::UNIT,
            },
            &mut events,
        );
        assert!(matches!(result, Err(ConfigError::UnknownArchetype(_))));
        assert!(events.is_empty());
    }

    #[test]
    fn full_collection_leaves_the_crystal_and_builder_untouched() {
        let mut world = World::new(WorldConfig {
            capacity: 1,
            ..WorldConfig::default()
        })
        .unwrap();
        let position = Vec2::new(1000.0, 0.0);
        let _ = run(
            &mut world,
            Command::PlacePickup {
                kind: ResourceKind::Heat,
                position,
            },
        );
        let builder = spawn(&mut world, EnemyKind::Builder, position);

        let events = tick(&mut world, 16);

        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::StructureCreated { .. } | Event::SpawnRejected { .. })));
        assert_eq!(query::pickups(&world).len(), 1);
        assert_eq!(query::enemies(&world).count_by_type(EnemyKind::SpawnStructure), 0);
        assert!(query::enemies(&world).get(builder).is_some_and(Enemy::is_alive));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = WorldConfig {
            capacity: 0,
            ..WorldConfig::default()
        };
        assert!(World::new(config).is_err());
    }

    #[test]
    fn builder_on_pickup_founds_a_structure() {
        let mut world = world();
        let position = Vec2::new(1000.0, 0.0);
        let _ = run(
            &mut world,
            Command::PlacePickup {
                kind: ResourceKind::Cold,
                position,
            },
        );
        let builder = spawn(&mut world, EnemyKind::Builder, position);
        let events = tick(&mut world, 16);
        assert!(events.iter().any(|event| matches!(
            event,
            Event::StructureCreated {
                resource: ResourceKind::Cold,
                ..
            }
        )));
        assert!(query::pickups(&world).is_empty());
        assert!(query::enemies(&world).get(builder).is_some_and(|b| !b.is_alive()));

        let swept = run(&mut world, Command::SweepDead);
        assert_eq!(swept, vec![Event::EnemiesSwept { count: 1 }]);
        assert_eq!(query::enemies(&world).count_by_type(EnemyKind::SpawnStructure), 1);
    }

    #[test]
    fn fighter_intrusion_queues_a_wave_for_the_next_tick() {
        let mut world = world();
        let position = Vec2::new(1000.0, 0.0);
        let _ = run(
            &mut world,
            Command::PlacePickup {
                kind: ResourceKind::Heat,
                position,
            },
        );
        let _ = spawn(&mut world, EnemyKind::Builder, position);
        let _ = tick(&mut world, 16);
        let _ = spawn(&mut world, EnemyKind::Fighter, position);

        let events = tick(&mut world, 16);
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::WaveTriggered { .. })));
        assert_eq!(query::pending_wave_count(&world), 1);
        assert_eq!(query::enemies(&world).count_by_type(EnemyKind::Fiery), 0);

        let events = tick(&mut world, 16);
        let spawned = events
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    Event::EnemySpawned {
                        kind: EnemyKind::Fiery,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(spawned, 3);
        assert_eq!(query::pending_wave_count(&world), 0);
    }

    #[test]
    fn far_enemies_despawn_once_a_viewport_is_known() {
        let mut world = world();
        let _ = spawn(&mut world, EnemyKind::FastChaser, Vec2::new(5000.0, 0.0));
        let _ = tick(&mut world, 16);
        assert_eq!(query::enemies(&world).len(), 1);

        let _ = run(
            &mut world,
            Command::ConfigureViewport {
                bounds: VisibleBounds {
                    left: -300.0,
                    right: 300.0,
                    top: -400.0,
                    bottom: 400.0,
                },
            },
        );
        assert_eq!(query::despawn_radius(&world), Some(1500.0));
        let events = tick(&mut world, 16);
        assert!(events.contains(&Event::EnemiesDespawned { count: 1 }));
        assert!(query::enemies(&world).is_empty());
    }

    #[test]
    fn contact_damage_respects_invulnerability_frames() {
        let mut world = world();
        let _ = spawn(&mut world, EnemyKind::Fighter, Vec2::new(5.0, 0.0));
        let _ = spawn(&mut world, EnemyKind::Fighter, Vec2::new(-5.0, 0.0));
        let events = tick(&mut world, 16);
        let hits = events
            .iter()
            .filter(|event| matches!(event, Event::PlayerDamaged { .. }))
            .count();
        assert_eq!(hits, 1);
    }
}
