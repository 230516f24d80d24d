//! The single entity type stored by the collection manager.

use crystal_siege_core::{
    ConfigError, EnemyId, EnemyKind, PickupId, ResourceKind, StatScaling, StatusPayload,
    TrailDescriptor, Vec2,
};
use rand::Rng;

use crate::{
    archetypes::{base_stats, ArchetypeContext, Behavior, Mover, Steering},
    status::{DeliriumPhase, MovementMode, StatusEffects},
    structure::{self, LevelReport, SpawnStructure},
};

/// Angular speed of an entity circling a pickup, in radians per second.
pub const ORBIT_ANGULAR_SPEED: f32 = 1.5;
/// Distance kept from the orbited pickup.
pub const ORBIT_RADIUS: f32 = 40.0;

const DELIRIUM_CHASE_EFFICIENCY: f32 = 0.5;
const PANIC_TRAIL_RADIUS: f32 = 14.0;
const PANIC_TRAIL_DAMAGE: f32 = 5.0;
const PANIC_TRAIL_DURATION: f32 = 1.5;

/// Circular holding pattern around a pickup awaiting fusion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Orbit {
    anchor: PickupId,
    center: Vec2,
    angle: f32,
}

impl Orbit {
    /// Pickup being orbited.
    #[must_use]
    pub const fn anchor(&self) -> PickupId {
        self.anchor
    }
}

/// Enemy, structure or champion living in the world.
#[derive(Clone, Debug)]
pub struct Enemy {
    id: EnemyId,
    kind: EnemyKind,
    position: Vec2,
    radius: f32,
    facing: f32,
    health: f32,
    max_health: f32,
    damage: f32,
    xp_value: u32,
    base_speed: f32,
    panic_speed: f32,
    status: StatusEffects,
    orbit: Option<Orbit>,
    marked_dead: bool,
    behavior: Behavior,
}

impl Enemy {
    /// Builds a mobile archetype with its base stats scaled by `scaling`.
    ///
    /// Structures and champions carry extra state and are rejected here; use
    /// [`Enemy::structure`] and [`Enemy::champion`] instead.
    pub fn new<R: Rng + ?Sized>(
        id: EnemyId,
        kind: EnemyKind,
        position: Vec2,
        scaling: StatScaling,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        let behavior = Behavior::for_mobile(kind, rng)
            .ok_or_else(|| ConfigError::UnknownArchetype(kind.as_str().to_owned()))?;
        let base = base_stats(kind);
        let health = base.health * scaling.health;
        Ok(Self {
            id,
            kind,
            position,
            radius: base.radius * scaling.radius,
            facing: 0.0,
            health,
            max_health: health,
            damage: base.damage * scaling.damage,
            xp_value: base.xp,
            base_speed: base.speed * scaling.speed,
            panic_speed: base.panic_speed * scaling.speed,
            status: StatusEffects::new(),
            orbit: None,
            marked_dead: false,
            behavior,
        })
    }

    /// Builds a level one spawn structure seeded from `resource`.
    #[must_use]
    pub fn structure(id: EnemyId, position: Vec2, resource: ResourceKind) -> Self {
        let health = structure::max_health_for(1);
        Self {
            id,
            kind: EnemyKind::SpawnStructure,
            position,
            radius: structure::radius_for(1),
            facing: 0.0,
            health,
            max_health: health,
            damage: 0.0,
            xp_value: structure::reward_xp_for(1),
            base_speed: 0.0,
            panic_speed: 0.0,
            status: StatusEffects::immune(),
            orbit: None,
            marked_dead: false,
            behavior: Behavior::Structure(SpawnStructure::new(resource)),
        }
    }

    /// Builds a champion of the given resource tier.
    #[must_use]
    pub fn champion(id: EnemyId, position: Vec2, tier: ResourceKind) -> Self {
        let base = base_stats(EnemyKind::Champion);
        Self {
            id,
            kind: EnemyKind::Champion,
            position,
            radius: base.radius,
            facing: 0.0,
            health: base.health,
            max_health: base.health,
            damage: base.damage,
            xp_value: base.xp,
            base_speed: base.speed,
            panic_speed: base.panic_speed,
            status: StatusEffects::new(),
            orbit: None,
            marked_dead: false,
            behavior: Behavior::Champion { tier },
        }
    }

    /// Identifier of the entity.
    #[must_use]
    pub const fn id(&self) -> EnemyId {
        self.id
    }

    /// Type tag of the entity.
    #[must_use]
    pub const fn kind(&self) -> EnemyKind {
        self.kind
    }

    /// Current world position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Moves the entity without running any AI.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Collision radius.
    #[must_use]
    pub const fn radius(&self) -> f32 {
        self.radius
    }

    /// Facing angle in radians, derived from the last movement.
    #[must_use]
    pub const fn facing(&self) -> f32 {
        self.facing
    }

    /// Remaining health.
    #[must_use]
    pub const fn health(&self) -> f32 {
        self.health
    }

    /// Maximum health.
    #[must_use]
    pub const fn max_health(&self) -> f32 {
        self.max_health
    }

    /// Contact damage dealt to the player.
    #[must_use]
    pub const fn damage(&self) -> f32 {
        self.damage
    }

    /// Experience awarded when killed.
    #[must_use]
    pub const fn xp_value(&self) -> u32 {
        self.xp_value
    }

    /// Base movement speed after scaling.
    #[must_use]
    pub const fn base_speed(&self) -> f32 {
        self.base_speed
    }

    /// Status state.
    #[must_use]
    pub const fn status(&self) -> &StatusEffects {
        &self.status
    }

    /// Mutable status state.
    pub fn status_mut(&mut self) -> &mut StatusEffects {
        &mut self.status
    }

    /// AI state of the entity.
    #[must_use]
    pub const fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    /// Structure state when the entity is a spawn structure.
    #[must_use]
    pub fn as_structure(&self) -> Option<&SpawnStructure> {
        match &self.behavior {
            Behavior::Structure(structure) => Some(structure),
            _ => None,
        }
    }

    /// Mutable structure state when the entity is a spawn structure.
    pub fn as_structure_mut(&mut self) -> Option<&mut SpawnStructure> {
        match &mut self.behavior {
            Behavior::Structure(structure) => Some(structure),
            _ => None,
        }
    }

    /// Resource tier when the entity is a champion.
    #[must_use]
    pub fn champion_tier(&self) -> Option<ResourceKind> {
        match self.behavior {
            Behavior::Champion { tier } => Some(tier),
            _ => None,
        }
    }

    /// Reports whether the entity still takes part in the simulation.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.marked_dead && self.health > 0.0
    }

    /// Reports whether the entity awaits the dead sweep.
    #[must_use]
    pub const fn is_marked_dead(&self) -> bool {
        self.marked_dead
    }

    /// Flags the entity for the dead sweep. Returns `false` if already flagged.
    pub fn mark_dead(&mut self) -> bool {
        !std::mem::replace(&mut self.marked_dead, true)
    }

    /// Applies damage and reports whether health dropped to zero or below.
    ///
    /// Encased entities ignore the hit and report `false`.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if self.status.is_invulnerable() {
            return false;
        }
        self.health -= amount;
        self.status.flash();
        self.health <= 0.0
    }

    /// Applies a status payload delivered from `source`.
    pub fn apply_status<R: Rng + ?Sized>(&mut self, payload: StatusPayload, source: Vec2, rng: &mut R) {
        match payload {
            StatusPayload::Slow { amount, duration } => self.status.apply_slow(amount, duration),
            StatusPayload::Knockback { force } => {
                self.status.apply_knockback(self.position - source, force);
            }
            StatusPayload::Immobilize { duration } => self.status.apply_immobilize(duration),
            StatusPayload::PermanentFreeze => self.status.apply_permanent_freeze(),
            StatusPayload::Delirium { duration } => self.status.apply_delirious(duration, rng),
            StatusPayload::BurningPanic { duration } => {
                self.status.apply_burning_panic(duration, rng);
            }
            StatusPayload::Cryostasis { duration } => self.status.apply_cryostasis(duration),
        }
    }

    /// Feeds experience into a structure, levelling it up and healing it by
    /// the exact growth of its maximum health. Returns `None` for any other
    /// kind.
    pub fn add_structure_xp(&mut self, amount: u32) -> Option<LevelReport> {
        let report = self.as_structure_mut()?.absorb_xp(amount);
        if report.gained() > 0 {
            let grown = structure::max_health_for(report.to);
            let delta = grown - self.max_health;
            self.max_health = grown;
            self.health = (self.health + delta).min(self.max_health);
            self.radius = structure::radius_for(report.to);
            self.xp_value = structure::reward_xp_for(report.to);
            self.status.flash();
        }
        Some(report)
    }

    /// Starts circling `anchor` at `center`.
    pub fn start_orbit(&mut self, anchor: PickupId, center: Vec2) {
        let offset = self.position - center;
        self.orbit = Some(Orbit {
            anchor,
            center,
            angle: offset.y.atan2(offset.x),
        });
    }

    /// Pickup being orbited, if any.
    #[must_use]
    pub fn orbit_anchor(&self) -> Option<PickupId> {
        self.orbit.map(|orbit| orbit.anchor)
    }

    /// Stops circling.
    pub fn clear_orbit(&mut self) {
        self.orbit = None;
    }

    /// Advances the entity by one tick.
    ///
    /// Status effects decide which branch governs movement; knockback is
    /// layered on top regardless. Returns the trail marker the entity dropped,
    /// if any.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        dt: f32,
        player: Vec2,
        context: &ArchetypeContext<'_>,
        rng: &mut R,
    ) -> Option<TrailDescriptor> {
        if self.marked_dead {
            return None;
        }
        if let Some(structure) = self.as_structure_mut() {
            structure.tick(dt);
            return None;
        }

        self.status.begin_tick();
        let speed = self.base_speed * self.status.speed_multiplier();
        let steering = match self.status.movement_mode() {
            MovementMode::Blocked => Steering::default(),
            MovementMode::Panic => {
                let step = self.status.panic_step(dt, rng);
                Steering {
                    displacement: step.heading
                        * self.panic_speed
                        * self.status.speed_multiplier()
                        * dt,
                    trail: step.emit_trail.then(|| self.panic_trail()),
                }
            }
            MovementMode::Delirious(_) => {
                let heading = self.status.delirium_step(dt, rng);
                let direction = match self.status.delirium_phase() {
                    DeliriumPhase::Chase => {
                        (player - self.position).normalize_or_zero() * DELIRIUM_CHASE_EFFICIENCY
                    }
                    DeliriumPhase::Wander => heading,
                };
                Steering {
                    displacement: direction * speed * dt,
                    trail: None,
                }
            }
            MovementMode::Normal => match self.orbit.as_mut() {
                Some(orbit) => {
                    orbit.angle += ORBIT_ANGULAR_SPEED * dt;
                    let target = orbit.center + Vec2::from_angle(orbit.angle) * ORBIT_RADIUS;
                    Steering {
                        displacement: target - self.position,
                        trail: None,
                    }
                }
                None => self.behavior.steer(
                    Mover {
                        id: self.id,
                        position: self.position,
                        speed,
                    },
                    dt,
                    player,
                    context,
                    rng,
                ),
            },
        };

        self.position += steering.displacement + self.status.knockback_step(dt);
        self.status.end_tick(dt);
        if steering.displacement.length_squared() > f32::EPSILON {
            self.facing = steering.displacement.y.atan2(steering.displacement.x);
        }
        steering.trail
    }

    fn panic_trail(&self) -> TrailDescriptor {
        TrailDescriptor {
            creator: self.id,
            position: self.position,
            radius: PANIC_TRAIL_RADIUS,
            damage: PANIC_TRAIL_DAMAGE,
            duration: PANIC_TRAIL_DURATION,
            hurts_player: false,
            hurts_enemies: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn fighter(rng: &mut ChaCha8Rng) -> Enemy {
        Enemy::new(
            EnemyId::new(1),
            EnemyKind::Fighter,
            Vec2::ZERO,
            StatScaling::UNIT,
            rng,
        )
        .unwrap()
    }

    #[test]
    fn damage_kill_boundary() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut enemy = fighter(&mut rng);
        let health = enemy.health();
        assert!(!enemy.take_damage(health - 1.0));
        assert!(enemy.health() > 0.0);

        let mut enemy = fighter(&mut rng);
        assert!(enemy.take_damage(health + 1.0));
        assert!(enemy.health() <= 0.0);
        assert!(!enemy.is_alive());
    }

    #[test]
    fn cryostasis_blocks_all_damage() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut enemy = fighter(&mut rng);
        enemy.status_mut().set_cryostasis(true);
        for amount in [1.0, 59.0, 1_000_000.0] {
            assert!(!enemy.take_damage(amount));
        }
        assert_eq!(enemy.health(), enemy.max_health());
    }

    #[test]
    fn scaling_multiplies_base_stats() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let scaling = StatScaling::for_structure_level(3);
        let enemy = Enemy::new(EnemyId::new(2), EnemyKind::Fiery, Vec2::ZERO, scaling, &mut rng).unwrap();
        let base = base_stats(EnemyKind::Fiery);
        assert!((enemy.max_health() - base.health * scaling.health).abs() < 1e-4);
        assert!((enemy.base_speed() - base.speed * scaling.speed).abs() < 1e-4);
        assert!((enemy.damage() - base.damage * scaling.damage).abs() < 1e-4);
        assert!((enemy.radius() - base.radius * scaling.radius).abs() < 1e-4);
    }

    #[test]
    fn structures_need_their_own_constructor() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let result = Enemy::new(
            EnemyId::new(3),
            EnemyKind::SpawnStructure,
            Vec2::ZERO,
            StatScaling::UNIT,
            &mut rng,
        );
        assert!(matches!(
            result,
            Err(ConfigError::UnknownArchetype(ref tag)) if tag == "spawnStructure"
        ));
    }

    #[test]
    fn structure_levelling_heals_by_delta_only() {
        let mut structure = Enemy::structure(EnemyId::new(5), Vec2::ZERO, ResourceKind::Heat);
        assert!(!structure.take_damage(50.0));
        let report = structure.add_structure_xp(20).unwrap();
        assert_eq!(report.to, 2);
        assert_eq!(structure.max_health(), 300.0);
        assert_eq!(structure.health(), 250.0);
        assert_eq!(structure.xp_value(), 75);
    }

    #[test]
    fn double_level_up_matches_formula() {
        let mut structure = Enemy::structure(EnemyId::new(6), Vec2::ZERO, ResourceKind::Void);
        let report = structure.add_structure_xp(50).unwrap();
        assert_eq!(report.gained(), 2);
        assert_eq!(structure.max_health(), structure::max_health_for(3));
        assert_eq!(structure.health(), structure.max_health());
        assert_eq!(structure.radius(), structure::radius_for(3));
    }

    #[test]
    fn structures_ignore_status_payloads() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut structure = Enemy::structure(EnemyId::new(7), Vec2::ZERO, ResourceKind::Cold);
        structure.apply_status(StatusPayload::Knockback { force: 50.0 }, Vec2::X, &mut rng);
        structure.apply_status(StatusPayload::PermanentFreeze, Vec2::X, &mut rng);
        let _ = structure.update(0.1, Vec2::ZERO, &ArchetypeContext::default(), &mut rng);
        assert_eq!(structure.position(), Vec2::ZERO);
        assert!(!structure.status().is_frozen());
    }

    #[test]
    fn frozen_entity_only_moves_by_knockback() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut enemy = fighter(&mut rng);
        enemy.apply_status(StatusPayload::PermanentFreeze, Vec2::ZERO, &mut rng);
        let _ = enemy.update(0.1, Vec2::new(100.0, 0.0), &ArchetypeContext::default(), &mut rng);
        assert_eq!(enemy.position(), Vec2::ZERO);

        enemy.set_position(Vec2::new(10.0, 0.0));
        enemy.apply_status(StatusPayload::Knockback { force: 5.0 }, Vec2::ZERO, &mut rng);
        let _ = enemy.update(0.1, Vec2::new(100.0, 0.0), &ArchetypeContext::default(), &mut rng);
        assert!((enemy.position().x - 15.0).abs() < 1e-4);
    }

    #[test]
    fn mark_dead_reports_first_transition_only() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut enemy = fighter(&mut rng);
        assert!(enemy.mark_dead());
        assert!(!enemy.mark_dead());
        assert!(enemy.update(0.1, Vec2::ZERO, &ArchetypeContext::default(), &mut rng).is_none());
    }
}
