//! Damage sources produced by player abilities and entity trails.
//!
//! The store only moves sources and runs their clocks. Deciding who gets hit
//! belongs to the combat pipeline, which reads the sources through the
//! accessors below and records hits back into them.

use std::collections::{BTreeSet, HashMap};

use crystal_siege_core::{Ability, EffectId, EnemyId, StatusPayload, TrailDescriptor, Vec2};

const PROJECTILE_LIFETIME: f32 = 2.0;
const TRAIL_TICK_INTERVAL: f32 = 0.5;

/// Secondary blast spawned when an explosive projectile kills.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Explosion {
    /// Blast radius.
    pub radius: f32,
    /// Damage dealt to everything inside the blast.
    pub damage: f32,
}

/// Travelling projectile.
#[derive(Clone, Debug)]
pub struct Projectile {
    id: EffectId,
    position: Vec2,
    velocity: Vec2,
    radius: f32,
    damage: f32,
    piercing: bool,
    explosive: Option<Explosion>,
    payload: Option<StatusPayload>,
    lifetime: f32,
    hit: BTreeSet<EnemyId>,
    spent: bool,
}

impl Projectile {
    /// Identifier of the projectile.
    #[must_use]
    pub const fn id(&self) -> EffectId {
        self.id
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Collision radius.
    #[must_use]
    pub const fn radius(&self) -> f32 {
        self.radius
    }

    /// Damage per hit.
    #[must_use]
    pub const fn damage(&self) -> f32 {
        self.damage
    }

    /// Reports whether the projectile survives hits.
    #[must_use]
    pub const fn is_piercing(&self) -> bool {
        self.piercing
    }

    /// Blast spawned on kill, if the projectile is explosive.
    #[must_use]
    pub const fn explosive(&self) -> Option<Explosion> {
        self.explosive
    }

    /// Status applied on hit.
    #[must_use]
    pub const fn payload(&self) -> Option<StatusPayload> {
        self.payload
    }

    /// Reports whether the projectile has been consumed.
    #[must_use]
    pub const fn is_spent(&self) -> bool {
        self.spent
    }

    /// Reports whether `target` may still be hit by this projectile.
    #[must_use]
    pub fn can_hit(&self, target: EnemyId) -> bool {
        !self.spent && !self.hit.contains(&target)
    }

    /// Records a hit on `target`, consuming non-piercing projectiles.
    pub fn record_hit(&mut self, target: EnemyId) {
        let _ = self.hit.insert(target);
        if !self.piercing {
            self.spent = true;
        }
    }
}

/// Circular zone dealing damage either once or on a fixed interval.
#[derive(Clone, Debug)]
pub struct AreaEffect {
    id: EffectId,
    creator: Option<EnemyId>,
    position: Vec2,
    radius: f32,
    damage: f32,
    hurts_player: bool,
    hurts_enemies: bool,
    tick_interval: Option<f32>,
    tick_timer: f32,
    remaining: f32,
    payload: Option<StatusPayload>,
    due: bool,
    fired: bool,
}

impl AreaEffect {
    /// Identifier of the effect.
    #[must_use]
    pub const fn id(&self) -> EffectId {
        self.id
    }

    /// Entity that emitted the effect; never damaged by it.
    #[must_use]
    pub const fn creator(&self) -> Option<EnemyId> {
        self.creator
    }

    /// Centre of the zone.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Radius of the zone.
    #[must_use]
    pub const fn radius(&self) -> f32 {
        self.radius
    }

    /// Damage per damage tick.
    #[must_use]
    pub const fn damage(&self) -> f32 {
        self.damage
    }

    /// Whether the zone damages the player.
    #[must_use]
    pub const fn hurts_player(&self) -> bool {
        self.hurts_player
    }

    /// Whether the zone damages entities other than its creator.
    #[must_use]
    pub const fn hurts_enemies(&self) -> bool {
        self.hurts_enemies
    }

    /// Status applied on hit.
    #[must_use]
    pub const fn payload(&self) -> Option<StatusPayload> {
        self.payload
    }

    /// Reports whether a damage tick falls into the current frame.
    #[must_use]
    pub const fn is_due(&self) -> bool {
        self.due
    }

    fn advance(&mut self, dt: f32) {
        self.due = false;
        match self.tick_interval {
            None => {
                self.due = !self.fired;
                self.fired = true;
            }
            Some(interval) => {
                self.remaining -= dt;
                self.tick_timer += dt;
                if self.tick_timer >= interval {
                    self.tick_timer -= interval;
                    self.due = true;
                }
            }
        }
    }

    fn is_finished(&self) -> bool {
        match self.tick_interval {
            None => self.fired && !self.due,
            Some(_) => self.remaining <= 0.0,
        }
    }
}

/// Expanding ring that hits every target once as its edge passes.
#[derive(Clone, Debug)]
pub struct RingEffect {
    id: EffectId,
    center: Vec2,
    radius: f32,
    max_radius: f32,
    speed: f32,
    thickness: f32,
    damage: f32,
    payload: Option<StatusPayload>,
    hit: BTreeSet<EnemyId>,
}

impl RingEffect {
    /// Identifier of the ring.
    #[must_use]
    pub const fn id(&self) -> EffectId {
        self.id
    }

    /// Centre of the ring.
    #[must_use]
    pub const fn center(&self) -> Vec2 {
        self.center
    }

    /// Inner edge of the band swept this tick.
    #[must_use]
    pub fn inner(&self) -> f32 {
        (self.radius - self.thickness * 0.5).max(0.0)
    }

    /// Outer edge of the band swept this tick.
    #[must_use]
    pub fn outer(&self) -> f32 {
        self.radius + self.thickness * 0.5
    }

    /// Damage per hit.
    #[must_use]
    pub const fn damage(&self) -> f32 {
        self.damage
    }

    /// Status applied on hit.
    #[must_use]
    pub const fn payload(&self) -> Option<StatusPayload> {
        self.payload
    }

    /// Records a hit. Returns `false` when `target` was already hit.
    pub fn record_hit(&mut self, target: EnemyId) -> bool {
        self.hit.insert(target)
    }
}

/// Orbs circling the player, each target on its own hit cooldown.
#[derive(Clone, Debug)]
pub struct OrbitalShield {
    id: EffectId,
    center: Vec2,
    orbs: u32,
    orbit_radius: f32,
    angular_speed: f32,
    angle: f32,
    orb_radius: f32,
    damage: f32,
    hit_cooldown: f32,
    cooldowns: HashMap<EnemyId, f32>,
    remaining: f32,
}

impl OrbitalShield {
    /// Identifier of the shield.
    #[must_use]
    pub const fn id(&self) -> EffectId {
        self.id
    }

    /// Current orb centres.
    #[must_use]
    pub fn orb_positions(&self) -> Vec<Vec2> {
        let step = std::f32::consts::TAU / self.orbs.max(1) as f32;
        (0..self.orbs)
            .map(|orb| {
                self.center + Vec2::from_angle(self.angle + step * orb as f32) * self.orbit_radius
            })
            .collect()
    }

    /// Radius of each orb.
    #[must_use]
    pub const fn orb_radius(&self) -> f32 {
        self.orb_radius
    }

    /// Damage per hit.
    #[must_use]
    pub const fn damage(&self) -> f32 {
        self.damage
    }

    /// Reports whether `target` is off cooldown.
    #[must_use]
    pub fn is_ready(&self, target: EnemyId) -> bool {
        !self.cooldowns.contains_key(&target)
    }

    /// Starts the per-target cooldown.
    pub fn record_hit(&mut self, target: EnemyId) {
        let _ = self.cooldowns.insert(target, self.hit_cooldown);
    }
}

/// Instantaneous melee arc resolved in the combat pass after the cast.
#[derive(Clone, Debug)]
pub struct MeleeStrike {
    id: EffectId,
    position: Vec2,
    radius: f32,
    damage: f32,
    payload: Option<StatusPayload>,
    resolved: bool,
}

impl MeleeStrike {
    /// Identifier of the strike.
    #[must_use]
    pub const fn id(&self) -> EffectId {
        self.id
    }

    /// Centre of the strike.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Reach of the strike.
    #[must_use]
    pub const fn radius(&self) -> f32 {
        self.radius
    }

    /// Damage per hit.
    #[must_use]
    pub const fn damage(&self) -> f32 {
        self.damage
    }

    /// Status applied on hit.
    #[must_use]
    pub const fn payload(&self) -> Option<StatusPayload> {
        self.payload
    }

    /// Reports whether the strike already landed.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Marks the strike as landed.
    pub fn resolve(&mut self) {
        self.resolved = true;
    }
}

/// Every active damage source, grouped by kind.
#[derive(Debug, Default)]
pub struct EffectStore {
    next_id: u32,
    projectiles: Vec<Projectile>,
    areas: Vec<AreaEffect>,
    rings: Vec<RingEffect>,
    orbitals: Vec<OrbitalShield>,
    melee: Vec<MeleeStrike>,
}

/// Mutable views over every source kind, borrowed together.
#[derive(Debug)]
pub struct SourcesMut<'a> {
    /// Travelling projectiles.
    pub projectiles: &'a mut [Projectile],
    /// Area pulses and trails.
    pub areas: &'a mut [AreaEffect],
    /// Expanding rings.
    pub rings: &'a mut [RingEffect],
    /// Melee strikes.
    pub melee: &'a mut [MeleeStrike],
    /// Orbital shields.
    pub orbitals: &'a mut [OrbitalShield],
}

impl EffectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> EffectId {
        let id = EffectId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    /// Materialises `ability` into damage sources at `origin`.
    pub fn cast(&mut self, ability: Ability, origin: Vec2, direction: Vec2) -> EffectId {
        let id = self.allocate();
        let aim = direction.try_normalize().unwrap_or(Vec2::X);
        match ability {
            Ability::Bolt => self.projectiles.push(projectile(id, origin, aim * 520.0, 5.0, 15.0)),
            Ability::Lance => self.projectiles.push(Projectile {
                piercing: true,
                ..projectile(id, origin, aim * 640.0, 6.0, 12.0)
            }),
            Ability::Fireball => self.projectiles.push(Projectile {
                explosive: Some(Explosion {
                    radius: 60.0,
                    damage: 15.0,
                }),
                ..projectile(id, origin, aim * 420.0, 8.0, 20.0)
            }),
            Ability::FrostNova => self.rings.push(RingEffect {
                id,
                center: origin,
                radius: 0.0,
                max_radius: 220.0,
                speed: 400.0,
                thickness: 14.0,
                damage: 8.0,
                payload: Some(StatusPayload::Slow {
                    amount: 0.5,
                    duration: 2.5,
                }),
                hit: BTreeSet::new(),
            }),
            Ability::EmberField => self.areas.push(AreaEffect {
                tick_interval: Some(0.5),
                remaining: 4.0,
                payload: Some(StatusPayload::BurningPanic { duration: 3.0 }),
                ..pulse(id, origin, 70.0, 6.0)
            }),
            Ability::Shockwave => self.melee.push(MeleeStrike {
                id,
                position: origin,
                radius: 55.0,
                damage: 10.0,
                payload: Some(StatusPayload::Knockback { force: 40.0 }),
                resolved: false,
            }),
            Ability::OrbitalShield => self.orbitals.push(OrbitalShield {
                id,
                center: origin,
                orbs: 3,
                orbit_radius: 60.0,
                angular_speed: 3.0,
                angle: 0.0,
                orb_radius: 10.0,
                damage: 8.0,
                hit_cooldown: 0.5,
                cooldowns: HashMap::new(),
                remaining: 10.0,
            }),
            Ability::Hex => self.areas.push(AreaEffect {
                payload: Some(StatusPayload::Delirium { duration: 4.0 }),
                ..pulse(id, origin, 120.0, 0.0)
            }),
            Ability::Glaciate => self.areas.push(AreaEffect {
                payload: Some(StatusPayload::PermanentFreeze),
                ..pulse(id, origin, 90.0, 5.0)
            }),
            Ability::IceTomb => self.areas.push(AreaEffect {
                payload: Some(StatusPayload::Cryostasis { duration: 3.0 }),
                ..pulse(id, origin, 80.0, 0.0)
            }),
        }
        id
    }

    /// Turns a trail marker into a lingering area effect.
    pub fn spawn_trail(&mut self, trail: TrailDescriptor) -> EffectId {
        let id = self.allocate();
        self.areas.push(AreaEffect {
            creator: Some(trail.creator),
            hurts_player: trail.hurts_player,
            hurts_enemies: trail.hurts_enemies,
            tick_interval: Some(TRAIL_TICK_INTERVAL),
            remaining: trail.duration,
            ..pulse(id, trail.position, trail.radius, trail.damage)
        });
        id
    }

    /// Spawns a one-shot blast at `position`.
    pub fn spawn_explosion(&mut self, position: Vec2, explosion: Explosion) -> EffectId {
        let id = self.allocate();
        self.areas
            .push(pulse(id, position, explosion.radius, explosion.damage));
        id
    }

    /// Moves every source and runs its clocks for one tick.
    pub fn advance(&mut self, dt: f32, player: Vec2) {
        for projectile in &mut self.projectiles {
            projectile.position += projectile.velocity * dt;
            projectile.lifetime -= dt;
        }
        for area in &mut self.areas {
            area.advance(dt);
        }
        for ring in &mut self.rings {
            ring.radius = (ring.radius + ring.speed * dt).min(ring.max_radius);
        }
        for shield in &mut self.orbitals {
            shield.center = player;
            shield.angle += shield.angular_speed * dt;
            shield.remaining -= dt;
            shield.cooldowns.retain(|_, left| {
                *left -= dt;
                *left > 0.0
            });
        }
    }

    /// Drops every source that has run its course. Returns how many went.
    pub fn expire(&mut self) -> usize {
        let before = self.len();
        self.projectiles
            .retain(|projectile| !projectile.spent && projectile.lifetime > 0.0);
        self.areas.retain(|area| !area.is_finished());
        self.rings.retain(|ring| ring.radius < ring.max_radius);
        self.orbitals.retain(|shield| shield.remaining > 0.0);
        self.melee.retain(|strike| !strike.resolved);
        before - self.len()
    }

    /// Borrows every source kind mutably at once.
    pub fn sources_mut(&mut self) -> SourcesMut<'_> {
        SourcesMut {
            projectiles: &mut self.projectiles,
            areas: &mut self.areas,
            rings: &mut self.rings,
            melee: &mut self.melee,
            orbitals: &mut self.orbitals,
        }
    }

    /// Active projectiles.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Active area effects.
    #[must_use]
    pub fn areas(&self) -> &[AreaEffect] {
        &self.areas
    }

    /// Active rings.
    #[must_use]
    pub fn rings(&self) -> &[RingEffect] {
        &self.rings
    }

    /// Active orbital shields.
    #[must_use]
    pub fn orbitals(&self) -> &[OrbitalShield] {
        &self.orbitals
    }

    /// Number of active sources of every kind.
    #[must_use]
    pub fn len(&self) -> usize {
        self.projectiles.len()
            + self.areas.len()
            + self.rings.len()
            + self.orbitals.len()
            + self.melee.len()
    }

    /// Reports whether no source is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn projectile(id: EffectId, origin: Vec2, velocity: Vec2, radius: f32, damage: f32) -> Projectile {
    Projectile {
        id,
        position: origin,
        velocity,
        radius,
        damage,
        piercing: false,
        explosive: None,
        payload: None,
        lifetime: PROJECTILE_LIFETIME,
        hit: BTreeSet::new(),
        spent: false,
    }
}

fn pulse(id: EffectId, position: Vec2, radius: f32, damage: f32) -> AreaEffect {
    AreaEffect {
        id,
        creator: None,
        position,
        radius,
        damage,
        hurts_player: false,
        hurts_enemies: true,
        tick_interval: None,
        tick_timer: 0.0,
        remaining: 0.0,
        payload: None,
        due: false,
        fired: false,
    }
}
