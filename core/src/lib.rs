#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Crystal Siege simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! that systems and adapters react to. The collaborator traits [`Viewport`]
//! and [`Player`] describe the narrow boundary the core consumes from the
//! surrounding application.

use std::{fmt, str::FromStr, time::Duration};

pub use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound applied to a single simulation step.
pub const MAX_TICK: Duration = Duration::from_millis(100);

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Tells the world which area is visible so it can derive its despawn radius.
    ConfigureViewport {
        /// World-space rectangle currently visible.
        bounds: VisibleBounds,
    },
    /// Moves the player to a new position.
    MovePlayer {
        /// New world position of the player.
        position: Vec2,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that a new enemy be constructed and inserted into the world.
    SpawnEnemy {
        /// Archetype of the enemy to construct.
        kind: EnemyKind,
        /// World position the enemy appears at.
        position: Vec2,
        /// Multipliers applied to the archetype's base stats.
        scaling: StatScaling,
    },
    /// Requests that a resource pickup be placed into the world.
    PlacePickup {
        /// Category of the pickup.
        kind: ResourceKind,
        /// World position of the pickup.
        position: Vec2,
    },
    /// Requests that the player cast an ability from the provided origin.
    CastAbility {
        /// Ability being cast.
        ability: Ability,
        /// World position the ability originates from.
        origin: Vec2,
        /// Normalised aim direction, ignored by untargeted abilities.
        direction: Vec2,
    },
    /// Removes every enemy marked dead and expires finished damage sources.
    SweepDead,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick after clamping.
        dt: Duration,
    },
    /// Confirms that an enemy entered the world.
    EnemySpawned {
        /// Identifier allocated to the enemy.
        id: EnemyId,
        /// Archetype of the enemy.
        kind: EnemyKind,
    },
    /// Reports that an enemy could not be inserted because a cap was reached.
    SpawnRejected {
        /// Archetype that was rejected.
        kind: EnemyKind,
    },
    /// Confirms that a resource pickup was placed.
    PickupPlaced {
        /// Identifier allocated to the pickup.
        id: PickupId,
        /// Category of the pickup.
        kind: ResourceKind,
    },
    /// Reports that an enemy was killed and credited to the player.
    EnemyKilled {
        /// Identifier of the killed enemy.
        id: EnemyId,
        /// Archetype of the killed enemy.
        kind: EnemyKind,
        /// Position at which the enemy died.
        position: Vec2,
        /// Experience awarded to the player for the kill.
        xp: u32,
    },
    /// Reports that an enemy dealt contact damage to the player.
    PlayerDamaged {
        /// Identifier of the enemy that hit the player.
        by: EnemyId,
        /// Amount of damage dealt.
        amount: f32,
    },
    /// Reports that a builder converted a pickup into a spawn structure.
    StructureCreated {
        /// Identifier of the new structure.
        id: EnemyId,
        /// Resource category the structure was seeded from.
        resource: ResourceKind,
        /// Position of the structure.
        position: Vec2,
    },
    /// Reports that a builder fed experience into a structure.
    StructureFed {
        /// Identifier of the structure.
        id: EnemyId,
        /// Experience fed into the structure.
        xp: u32,
    },
    /// Reports that a structure reached a new level.
    StructureLeveled {
        /// Identifier of the structure.
        id: EnemyId,
        /// Level reached.
        level: u32,
    },
    /// Reports that a structure was destroyed and dropped a fresh pickup.
    StructureDestroyed {
        /// Identifier of the destroyed structure.
        id: EnemyId,
        /// Pickup dropped at the structure's position.
        pickup: PickupId,
    },
    /// Reports that an intruding fighter triggered a structure wave.
    WaveTriggered {
        /// Structure that emitted the wave.
        structure: EnemyId,
        /// Descriptor of the offspring queued for the next tick.
        wave: WaveDescriptor,
    },
    /// Reports that orbiting entities fused into a champion.
    ChampionFused {
        /// Identifier of the new champion.
        id: EnemyId,
        /// Tier inherited from the orbited pickup.
        tier: ResourceKind,
        /// Entities consumed by the fusion.
        consumed: Vec<EnemyId>,
    },
    /// Reports how many enemies were removed for straying too far.
    EnemiesDespawned {
        /// Number of enemies removed.
        count: usize,
    },
    /// Reports how many dead enemies were swept from the collection.
    EnemiesSwept {
        /// Number of enemies removed.
        count: usize,
    },
}

/// Unique identifier assigned to an enemy or structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a resource pickup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PickupId(u32);

impl PickupId {
    /// Creates a new pickup identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a damage source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u32);

impl EffectId {
    /// Creates a new effect identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Closed set of entity type tags tracked by the collection manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EnemyKind {
    /// Harmless seeker that turns resource pickups into spawn structures.
    Builder,
    /// Aggressive melee enemy that hunts structures before the player.
    Fighter,
    /// Erratic enemy that leaves burning trails behind it.
    Fiery,
    /// Player seeker attracted to its own kind.
    Gravitational,
    /// Fast direct pursuer.
    FastChaser,
    /// Stationary levelling structure that emits waves.
    SpawnStructure,
    /// Higher-tier entity created by fusing orbiting builders.
    Champion,
}

impl EnemyKind {
    /// Every tag in declaration order.
    pub const ALL: [EnemyKind; 7] = [
        Self::Builder,
        Self::Fighter,
        Self::Fiery,
        Self::Gravitational,
        Self::FastChaser,
        Self::SpawnStructure,
        Self::Champion,
    ];

    /// Canonical textual tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Builder => "builder",
            Self::Fighter => "fighter",
            Self::Fiery => "fiery",
            Self::Gravitational => "gravitational",
            Self::FastChaser => "fastChaser",
            Self::SpawnStructure => "spawnStructure",
            Self::Champion => "champion",
        }
    }

    /// Reports whether the tag denotes a stationary structure.
    #[must_use]
    pub const fn is_structure(self) -> bool {
        matches!(self, Self::SpawnStructure)
    }

    /// Dense index used by per-kind tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for EnemyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnemyKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| ConfigError::UnknownArchetype(value.to_owned()))
    }
}

impl TryFrom<String> for EnemyKind {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EnemyKind> for String {
    fn from(kind: EnemyKind) -> Self {
        kind.as_str().to_owned()
    }
}

/// Category of a collectible resource pickup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResourceKind {
    /// Heat crystal; structures seeded from it emit fiery waves.
    Heat,
    /// Cold crystal; structures seeded from it emit fast chasers.
    Cold,
    /// Void crystal; structures seeded from it emit gravitational enemies.
    Void,
}

impl ResourceKind {
    /// Every category in declaration order.
    pub const ALL: [ResourceKind; 3] = [Self::Heat, Self::Cold, Self::Void];

    /// Canonical textual tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Heat => "heat",
            Self::Cold => "cold",
            Self::Void => "void",
        }
    }

    /// Archetype and head count of the wave a structure of this category emits.
    #[must_use]
    pub const fn offspring(self) -> (EnemyKind, u32) {
        match self {
            Self::Heat => (EnemyKind::Fiery, 3),
            Self::Cold => (EnemyKind::FastChaser, 4),
            Self::Void => (EnemyKind::Gravitational, 2),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| ConfigError::UnknownResource(value.to_owned()))
    }
}

impl TryFrom<String> for ResourceKind {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourceKind> for String {
    fn from(kind: ResourceKind) -> Self {
        kind.as_str().to_owned()
    }
}

/// Multipliers applied to an archetype's base stats at construction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatScaling {
    /// Movement speed multiplier.
    pub speed: f32,
    /// Health multiplier.
    pub health: f32,
    /// Contact damage multiplier.
    pub damage: f32,
    /// Collision radius multiplier.
    pub radius: f32,
    /// Level of the structure the entity was spawned from.
    pub level: u32,
}

impl StatScaling {
    /// Identity scaling used for unscaled construction.
    pub const UNIT: StatScaling = StatScaling {
        speed: 1.0,
        health: 1.0,
        damage: 1.0,
        radius: 1.0,
        level: 1,
    };

    /// Derives the offspring scaling bundle for a structure at `level`.
    ///
    /// Speed grows 15 % per level capped at double, health 30 % uncapped,
    /// damage 20 % uncapped and radius 8 % capped at one and a half.
    #[must_use]
    pub fn for_structure_level(level: u32) -> Self {
        let steps = level.saturating_sub(1) as f32;
        Self {
            speed: (1.0 + 0.15 * steps).min(2.0),
            health: 1.0 + 0.3 * steps,
            damage: 1.0 + 0.2 * steps,
            radius: (1.0 + 0.08 * steps).min(1.5),
            level: level.max(1),
        }
    }
}

impl Default for StatScaling {
    fn default() -> Self {
        Self::UNIT
    }
}

/// Wave emitted by a structure when a fighter intrudes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaveDescriptor {
    /// Number of offspring to construct.
    pub count: u32,
    /// Archetype of every offspring.
    pub archetype: EnemyKind,
    /// Position offspring are spawned around.
    pub origin: Vec2,
    /// Stat multipliers applied to every offspring.
    pub scaling: StatScaling,
}

/// Damaging ground marker emitted by an entity during its update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrailDescriptor {
    /// Entity that emitted the marker; never damaged by it.
    pub creator: EnemyId,
    /// Centre of the marker.
    pub position: Vec2,
    /// Radius of the marker.
    pub radius: f32,
    /// Damage applied on every damage tick of the marker.
    pub damage: f32,
    /// Lifetime of the marker in seconds.
    pub duration: f32,
    /// Whether the marker damages the player.
    pub hurts_player: bool,
    /// Whether the marker damages enemies other than its creator.
    pub hurts_enemies: bool,
}

/// Status effect carried by a damage source and applied on hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StatusPayload {
    /// Slows movement by `amount` for `duration` seconds.
    Slow {
        /// Fraction of speed removed, in `[0, 1]`.
        amount: f32,
        /// Duration in seconds.
        duration: f32,
    },
    /// Pushes the target away from the source with the given force.
    Knockback {
        /// Impulse magnitude.
        force: f32,
    },
    /// Prevents movement for `duration` seconds.
    Immobilize {
        /// Duration in seconds.
        duration: f32,
    },
    /// Freezes the target permanently.
    PermanentFreeze,
    /// Confuses the target for `duration` seconds.
    Delirium {
        /// Duration in seconds.
        duration: f32,
    },
    /// Sets the target on fire, making it panic for `duration` seconds.
    BurningPanic {
        /// Duration in seconds.
        duration: f32,
    },
    /// Encases the target in ice that blocks damage and movement.
    Cryostasis {
        /// Duration in seconds.
        duration: f32,
    },
}

/// Player abilities the world knows how to materialise into damage sources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ability {
    /// Single-target bolt consumed by its first hit.
    Bolt,
    /// Piercing lance that passes through several enemies.
    Lance,
    /// Bolt that explodes when it kills.
    Fireball,
    /// Expanding ring that slows everything it crosses.
    FrostNova,
    /// Lingering field that sets enemies ablaze.
    EmberField,
    /// Short-range melee shockwave that knocks enemies back.
    Shockwave,
    /// Orbs circling the player.
    OrbitalShield,
    /// Pulse that confuses nearby enemies.
    Hex,
    /// Pulse that freezes nearby enemies permanently.
    Glaciate,
    /// Pulse that encases nearby enemies in invulnerable ice.
    IceTomb,
}

/// Axis-aligned world rectangle currently visible through the camera.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisibleBounds {
    /// Smallest visible x coordinate.
    pub left: f32,
    /// Largest visible x coordinate.
    pub right: f32,
    /// Smallest visible y coordinate.
    pub top: f32,
    /// Largest visible y coordinate.
    pub bottom: f32,
}

impl VisibleBounds {
    /// Width of the visible area in world units.
    #[must_use]
    pub fn width(&self) -> f32 {
        (self.right - self.left).abs()
    }

    /// Height of the visible area in world units.
    #[must_use]
    pub fn height(&self) -> f32 {
        (self.bottom - self.top).abs()
    }

    /// Half of the visible area's diagonal; the distance from the centre to a corner.
    #[must_use]
    pub fn half_diagonal(&self) -> f32 {
        self.width().hypot(self.height()) * 0.5
    }
}

/// Camera collaborator consulted for gameplay-relevant distance scaling.
///
/// The simulation never renders; it only derives spawn and despawn radii from
/// the visible area so enemies always appear just off-screen regardless of
/// zoom.
pub trait Viewport {
    /// Projects a world position onto the screen.
    fn world_to_screen(&self, world: Vec2) -> Vec2;

    /// Reports whether a circle at `(x, y)` intersects the visible area.
    fn is_visible(&self, x: f32, y: f32, radius: f32) -> bool;

    /// Current zoom factor.
    fn zoom(&self) -> f32;

    /// World-space rectangle currently visible.
    fn visible_bounds(&self) -> VisibleBounds;
}

/// Player collaborator the combat pipeline and collision checks call into.
pub trait Player {
    /// Current world position.
    fn position(&self) -> Vec2;

    /// Collision radius.
    fn radius(&self) -> f32;

    /// Applies damage, returning whether the hit landed.
    fn take_damage(&mut self, amount: f32) -> bool;

    /// Credits experience to the player's levelling accumulator.
    fn add_xp(&mut self, amount: u32);
}

/// Reports whether two circles overlap.
#[must_use]
pub fn circles_overlap(a: Vec2, a_radius: f32, b: Vec2, b_radius: f32) -> bool {
    let reach = a_radius + b_radius;
    a.distance_squared(b) < reach * reach
}

/// Configuration failures detected while constructing simulation state.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigError {
    /// An archetype tag did not name a known archetype.
    #[error("unknown archetype tag `{0}`")]
    UnknownArchetype(String),
    /// A resource tag did not name a known resource category.
    #[error("unknown resource tag `{0}`")]
    UnknownResource(String),
    /// A tuning value was outside its permitted range.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Name of the offending field.
        field: &'static str,
        /// Human readable description of the constraint.
        reason: &'static str,
    },
}
