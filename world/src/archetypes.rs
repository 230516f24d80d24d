//! Archetype stat tables and the per-archetype movement AI.
//!
//! Behaviour is a closed enum composed into [`crate::enemy::Enemy`]; every
//! variant owns only the state its AI needs. Movement is computed as a
//! displacement for the current tick and never applied here, so the enemy can
//! layer status effects and knockback on top.

use std::f32::consts::FRAC_PI_3;

use crystal_siege_core::{EnemyId, EnemyKind, ResourceKind, TrailDescriptor, Vec2};
use rand::Rng;

use crate::{pickups::ResourcePickup, status::random_heading, structure::SpawnStructure};

/// Distance under which a builder runs from the player.
pub const BUILDER_FLEE_RADIUS: f32 = 180.0;
/// Distance within which a builder notices pickups and structures.
pub const BUILDER_SEEK_RANGE: f32 = 900.0;
/// Distance within which a fighter notices structures and the player.
pub const FIGHTER_AGGRO_RADIUS: f32 = 2500.0;
/// Distance within which gravitational enemies attract each other.
pub const GRAVITY_RANGE: f32 = 400.0;
/// Strength of the pairwise attraction between gravitational enemies.
pub const GRAVITY_STRENGTH: f32 = 2000.0;
/// Per-tick decay applied to accumulated gravitational velocity.
pub const GRAVITY_VELOCITY_DECAY: f32 = 0.95;

const WANDER_INTERVAL: f32 = 2.0;
const WANDER_SPEED_FACTOR: f32 = 0.5;
const ZIGZAG_MIN_INTERVAL: f32 = 0.5;
const ZIGZAG_MAX_INTERVAL: f32 = 1.0;
const FIERY_TRAIL_INTERVAL: f32 = 0.4;
const FIERY_TRAIL_RADIUS: f32 = 18.0;
const FIERY_TRAIL_DAMAGE: f32 = 4.0;
const FIERY_TRAIL_DURATION: f32 = 2.0;
const MIN_GRAVITY_DISTANCE: f32 = 1.0;

/// Unscaled stats of an archetype.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BaseStats {
    /// Starting and maximum health.
    pub health: f32,
    /// Movement speed in world units per second.
    pub speed: f32,
    /// Contact damage dealt to the player.
    pub damage: f32,
    /// Collision radius.
    pub radius: f32,
    /// Experience awarded on kill.
    pub xp: u32,
    /// Speed while in burning panic.
    pub panic_speed: f32,
}

/// Looks up the unscaled stats of `kind`.
#[must_use]
pub const fn base_stats(kind: EnemyKind) -> BaseStats {
    let (health, speed, damage, radius, xp, panic_speed) = match kind {
        EnemyKind::Builder => (20.0, 70.0, 0.0, 10.0, 3, 140.0),
        EnemyKind::Fighter => (60.0, 85.0, 12.0, 14.0, 8, 160.0),
        EnemyKind::Fiery => (35.0, 95.0, 8.0, 12.0, 6, 180.0),
        EnemyKind::Gravitational => (80.0, 60.0, 10.0, 16.0, 10, 120.0),
        EnemyKind::FastChaser => (25.0, 170.0, 6.0, 9.0, 5, 220.0),
        EnemyKind::SpawnStructure => (200.0, 0.0, 0.0, 30.0, 50, 0.0),
        EnemyKind::Champion => (400.0, 90.0, 25.0, 26.0, 60, 150.0),
    };
    BaseStats {
        health,
        speed,
        damage,
        radius,
        xp,
        panic_speed,
    }
}

/// Position of another entity an archetype reacts to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    /// Identifier of the neighbour.
    pub id: EnemyId,
    /// World position of the neighbour.
    pub position: Vec2,
}

/// Read-only surroundings handed to an archetype for one tick.
///
/// Builders read pickups and structures, fighters read structures and
/// gravitational enemies read their siblings. The other slices are empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct ArchetypeContext<'a> {
    /// Resource pickups lying in the world.
    pub pickups: &'a [ResourcePickup],
    /// Live spawn structures.
    pub structures: &'a [Neighbor],
    /// Live entities of the updating entity's own kind.
    pub siblings: &'a [Neighbor],
}

/// Result of running an archetype's AI for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Steering {
    /// Displacement to apply this tick.
    pub displacement: Vec2,
    /// Trail marker the archetype wants materialised.
    pub trail: Option<TrailDescriptor>,
}

/// Self state needed by the archetype AI.
#[derive(Clone, Copy, Debug)]
pub struct Mover {
    /// Identifier of the updating entity.
    pub id: EnemyId,
    /// Current position.
    pub position: Vec2,
    /// Effective speed after slows.
    pub speed: f32,
}

/// Roaming heading re-rolled on a fixed interval.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Wander {
    heading: Vec2,
    timer: f32,
}

impl Wander {
    fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            heading: random_heading(rng),
            timer: WANDER_INTERVAL,
        }
    }

    fn step<R: Rng + ?Sized>(&mut self, dt: f32, rng: &mut R) -> Vec2 {
        self.timer -= dt;
        if self.timer <= 0.0 {
            self.heading = random_heading(rng);
            self.timer = WANDER_INTERVAL;
        }
        self.heading
    }
}

/// Archetype-specific AI state.
#[derive(Clone, Debug, PartialEq)]
pub enum Behavior {
    /// Seeks pickups and structures, flees the player.
    Builder(Wander),
    /// Hunts structures first and the player second.
    Fighter(Wander),
    /// Zig-zags toward the player leaving burning trails.
    Fiery {
        /// Current zig-zag heading.
        heading: Vec2,
        /// Seconds until the heading is re-rolled.
        zigzag_timer: f32,
        /// Seconds accumulated toward the next trail marker.
        trail_timer: f32,
    },
    /// Seeks the player while attracted to its siblings.
    Gravitational {
        /// Velocity accumulated from sibling attraction.
        velocity: Vec2,
    },
    /// Pursues the player directly.
    FastChaser,
    /// Stationary levelling structure.
    Structure(SpawnStructure),
    /// Fused entity pursuing the player directly.
    Champion {
        /// Resource tier inherited from the fused pickup.
        tier: ResourceKind,
    },
}

impl Behavior {
    /// Fresh AI state for a mobile archetype. Structures and champions carry
    /// payloads and are built through their own constructors.
    pub fn for_mobile<R: Rng + ?Sized>(kind: EnemyKind, rng: &mut R) -> Option<Self> {
        let behavior = match kind {
            EnemyKind::Builder => Self::Builder(Wander::new(rng)),
            EnemyKind::Fighter => Self::Fighter(Wander::new(rng)),
            EnemyKind::Fiery => Self::Fiery {
                heading: random_heading(rng),
                zigzag_timer: 0.0,
                trail_timer: 0.0,
            },
            EnemyKind::Gravitational => Self::Gravitational {
                velocity: Vec2::ZERO,
            },
            EnemyKind::FastChaser => Self::FastChaser,
            EnemyKind::SpawnStructure | EnemyKind::Champion => return None,
        };
        Some(behavior)
    }

    /// Runs the archetype AI for one tick.
    pub fn steer<R: Rng + ?Sized>(
        &mut self,
        mover: Mover,
        dt: f32,
        player: Vec2,
        context: &ArchetypeContext<'_>,
        rng: &mut R,
    ) -> Steering {
        let towards_player = (player - mover.position).normalize_or_zero();
        match self {
            Self::Builder(wander) => {
                let direction = builder_direction(mover.position, player, context)
                    .unwrap_or_else(|| wander.step(dt, rng) * WANDER_SPEED_FACTOR);
                moving(direction * mover.speed * dt)
            }
            Self::Fighter(wander) => {
                let direction = fighter_direction(mover.position, player, context)
                    .unwrap_or_else(|| wander.step(dt, rng) * WANDER_SPEED_FACTOR);
                moving(direction * mover.speed * dt)
            }
            Self::Fiery {
                heading,
                zigzag_timer,
                trail_timer,
            } => {
                *zigzag_timer -= dt;
                if *zigzag_timer <= 0.0 {
                    let offset = rng.gen_range(-FRAC_PI_3..FRAC_PI_3);
                    *heading = Vec2::from_angle(offset).rotate(towards_player);
                    *zigzag_timer = rng.gen_range(ZIGZAG_MIN_INTERVAL..ZIGZAG_MAX_INTERVAL);
                }
                *trail_timer += dt;
                let trail = if *trail_timer >= FIERY_TRAIL_INTERVAL {
                    *trail_timer -= FIERY_TRAIL_INTERVAL;
                    Some(TrailDescriptor {
                        creator: mover.id,
                        position: mover.position,
                        radius: FIERY_TRAIL_RADIUS,
                        damage: FIERY_TRAIL_DAMAGE,
                        duration: FIERY_TRAIL_DURATION,
                        hurts_player: true,
                        hurts_enemies: false,
                    })
                } else {
                    None
                };
                Steering {
                    displacement: *heading * mover.speed * dt,
                    trail,
                }
            }
            Self::Gravitational { velocity } => {
                *velocity += sibling_pull(mover, context.siblings) * dt;
                *velocity *= GRAVITY_VELOCITY_DECAY;
                moving((towards_player * mover.speed + *velocity) * dt)
            }
            Self::FastChaser | Self::Champion { .. } => {
                moving(towards_player * mover.speed * dt)
            }
            Self::Structure(_) => Steering::default(),
        }
    }
}

fn moving(displacement: Vec2) -> Steering {
    Steering {
        displacement,
        trail: None,
    }
}

fn nearest_within(origin: Vec2, range: f32, points: impl Iterator<Item = Vec2>) -> Option<(Vec2, f32)> {
    points
        .map(|point| (point, origin.distance(point)))
        .filter(|(_, distance)| *distance <= range)
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

fn builder_direction(position: Vec2, player: Vec2, context: &ArchetypeContext<'_>) -> Option<Vec2> {
    if position.distance(player) < BUILDER_FLEE_RADIUS {
        return Some((position - player).normalize_or_zero());
    }
    let pickup = nearest_within(
        position,
        BUILDER_SEEK_RANGE,
        context.pickups.iter().map(ResourcePickup::position),
    );
    let structure = nearest_within(
        position,
        BUILDER_SEEK_RANGE,
        context.structures.iter().map(|neighbor| neighbor.position),
    );
    let target = match (pickup, structure) {
        (Some(a), Some(b)) => Some(if a.1 <= b.1 { a.0 } else { b.0 }),
        (Some(a), None) | (None, Some(a)) => Some(a.0),
        (None, None) => None,
    }?;
    Some((target - position).normalize_or_zero())
}

fn fighter_direction(position: Vec2, player: Vec2, context: &ArchetypeContext<'_>) -> Option<Vec2> {
    let structure = nearest_within(
        position,
        FIGHTER_AGGRO_RADIUS,
        context.structures.iter().map(|neighbor| neighbor.position),
    );
    if let Some((target, _)) = structure {
        return Some((target - position).normalize_or_zero());
    }
    if position.distance(player) <= FIGHTER_AGGRO_RADIUS {
        return Some((player - position).normalize_or_zero());
    }
    None
}

fn sibling_pull(mover: Mover, siblings: &[Neighbor]) -> Vec2 {
    siblings
        .iter()
        .filter(|sibling| sibling.id != mover.id)
        .filter_map(|sibling| {
            let offset = sibling.position - mover.position;
            let distance = offset.length();
            (distance <= GRAVITY_RANGE).then(|| {
                offset / distance.max(MIN_GRAVITY_DISTANCE) * GRAVITY_STRENGTH
                    / distance.max(MIN_GRAVITY_DISTANCE)
            })
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crystal_siege_core::PickupId;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn mover(x: f32, y: f32) -> Mover {
        Mover {
            id: EnemyId::new(1),
            position: Vec2::new(x, y),
            speed: 100.0,
        }
    }

    #[test]
    fn builder_flees_a_close_player() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut behavior = Behavior::for_mobile(EnemyKind::Builder, &mut rng).unwrap();
        let steering = behavior.steer(
            mover(100.0, 0.0),
            0.1,
            Vec2::ZERO,
            &ArchetypeContext::default(),
            &mut rng,
        );
        assert!(steering.displacement.x > 0.0);
    }

    #[test]
    fn builder_prefers_the_nearer_target() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut behavior = Behavior::for_mobile(EnemyKind::Builder, &mut rng).unwrap();
        let pickups = [ResourcePickup::new(
            PickupId::new(0),
            ResourceKind::Heat,
            Vec2::new(1000.0, 300.0),
        )];
        let structures = [Neighbor {
            id: EnemyId::new(9),
            position: Vec2::new(1000.0, -500.0),
        }];
        let context = ArchetypeContext {
            pickups: &pickups,
            structures: &structures,
            siblings: &[],
        };
        let steering = behavior.steer(mover(1000.0, 0.0), 0.1, Vec2::ZERO, &context, &mut rng);
        assert!(steering.displacement.y > 0.0);
        assert!(steering.displacement.x.abs() < 1e-3);
    }

    #[test]
    fn fighter_targets_structures_before_the_player() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut behavior = Behavior::for_mobile(EnemyKind::Fighter, &mut rng).unwrap();
        let structures = [Neighbor {
            id: EnemyId::new(4),
            position: Vec2::new(0.0, 500.0),
        }];
        let context = ArchetypeContext {
            structures: &structures,
            ..ArchetypeContext::default()
        };
        let steering = behavior.steer(mover(0.0, 0.0), 0.1, Vec2::new(50.0, 0.0), &context, &mut rng);
        assert!(steering.displacement.y > 0.0);
        assert!(steering.displacement.x.abs() < 1e-3);
    }

    #[test]
    fn fighter_chases_the_player_without_structures_in_range() {
        let far_structure = [Neighbor {
            id: EnemyId::new(4),
            position: Vec2::new(0.0, FIGHTER_AGGRO_RADIUS + 10.0),
        }];
        let context = ArchetypeContext {
            structures: &far_structure,
            ..ArchetypeContext::default()
        };
        let direction = fighter_direction(Vec2::ZERO, Vec2::new(300.0, 0.0), &context);
        assert_eq!(direction, Some(Vec2::X));
    }

    #[test]
    fn fighter_has_no_target_beyond_aggro_range() {
        let player = Vec2::new(FIGHTER_AGGRO_RADIUS + 1.0, 0.0);
        assert_eq!(
            fighter_direction(Vec2::ZERO, player, &ArchetypeContext::default()),
            None
        );
    }

    fn wander_heading(behavior: &Behavior) -> Vec2 {
        match behavior {
            Behavior::Builder(wander) | Behavior::Fighter(wander) => wander.heading,
            other => panic!("no wander state in {other:?}"),
        }
    }

    #[test]
    fn fighter_wanders_with_nothing_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut behavior = Behavior::for_mobile(EnemyKind::Fighter, &mut rng).unwrap();
        let heading = wander_heading(&behavior);
        let player = Vec2::new(FIGHTER_AGGRO_RADIUS * 2.0, 0.0);
        let steering = behavior.steer(mover(0.0, 0.0), 0.1, player, &ArchetypeContext::default(), &mut rng);
        let expected = heading * WANDER_SPEED_FACTOR * 100.0 * 0.1;
        assert!(steering.displacement.distance(expected) < 1e-4);
    }

    #[test]
    fn builder_wanders_with_nothing_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut behavior = Behavior::for_mobile(EnemyKind::Builder, &mut rng).unwrap();
        let heading = wander_heading(&behavior);
        let pickups = [ResourcePickup::new(
            PickupId::new(0),
            ResourceKind::Void,
            Vec2::new(BUILDER_SEEK_RANGE + 50.0, 0.0),
        )];
        let context = ArchetypeContext {
            pickups: &pickups,
            ..ArchetypeContext::default()
        };
        assert_eq!(builder_direction(Vec2::ZERO, Vec2::new(0.0, 5000.0), &context), None);
        let steering = behavior.steer(mover(0.0, 0.0), 0.1, Vec2::new(0.0, 5000.0), &context, &mut rng);
        let expected = heading * WANDER_SPEED_FACTOR * 100.0 * 0.1;
        assert!(steering.displacement.distance(expected) < 1e-4);
    }

    #[test]
    fn fiery_drops_trails_carrying_its_own_id() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut behavior = Behavior::for_mobile(EnemyKind::Fiery, &mut rng).unwrap();
        let trails: Vec<TrailDescriptor> = (0..10)
            .filter_map(|_| {
                behavior
                    .steer(
                        mover(0.0, 0.0),
                        0.1,
                        Vec2::new(500.0, 0.0),
                        &ArchetypeContext::default(),
                        &mut rng,
                    )
                    .trail
            })
            .collect();
        assert_eq!(trails.len(), 2);
        assert!(trails.iter().all(|trail| trail.creator == EnemyId::new(1)));
    }

    #[test]
    fn gravitational_siblings_pull_each_other() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut behavior = Behavior::for_mobile(EnemyKind::Gravitational, &mut rng).unwrap();
        let siblings = [
            Neighbor {
                id: EnemyId::new(1),
                position: Vec2::ZERO,
            },
            Neighbor {
                id: EnemyId::new(2),
                position: Vec2::new(0.0, 100.0),
            },
        ];
        let context = ArchetypeContext {
            siblings: &siblings,
            ..ArchetypeContext::default()
        };
        let steering = behavior.steer(mover(0.0, 0.0), 0.1, Vec2::new(1000.0, 0.0), &context, &mut rng);
        assert!(steering.displacement.y > 0.0);
    }

    #[test]
    fn structures_and_champions_have_no_mobile_state() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        assert!(Behavior::for_mobile(EnemyKind::SpawnStructure, &mut rng).is_none());
        assert!(Behavior::for_mobile(EnemyKind::Champion, &mut rng).is_none());
    }
}
