#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system resolving every damage source against every live entity.
//!
//! The resolver runs once per tick after the world advanced. It reads the
//! sources through [`crystal_siege_world::effects::SourcesMut`], applies
//! damage and status payloads to the entity collection, and credits each
//! kill exactly once by flagging the victim dead before reporting it. The
//! dead sweep itself stays with the world.

use std::time::Duration;

use crystal_siege_core::{
    circles_overlap, EnemyId, EnemyKind, Event, Player, ResourceKind, StatusPayload, Vec2,
};
use crystal_siege_world::{
    collection::EnemyCollection,
    effects::{Explosion, SourcesMut},
    enemy::Enemy,
    pickups::PickupField,
    spatial::SpatialIndex,
    WorldParts,
};
use rand::Rng;
use tracing::debug;

/// Damage per second dealt to entities in burning panic.
pub const BURN_DAMAGE_PER_SECOND: f32 = 6.0;

/// Combat system that turns damage sources into kills.
#[derive(Debug)]
pub struct CombatResolver {
    burn_dps: f32,
    kills: Vec<Kill>,
    explosions: Vec<(Vec2, Explosion)>,
}

impl Default for CombatResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of an entity taken at the moment it died.
#[derive(Clone, Copy, Debug)]
struct Kill {
    id: EnemyId,
    kind: EnemyKind,
    position: Vec2,
    xp: u32,
    drop: Option<ResourceKind>,
}

impl Kill {
    fn of(enemy: &Enemy) -> Self {
        Self {
            id: enemy.id(),
            kind: enemy.kind(),
            position: enemy.position(),
            xp: enemy.xp_value(),
            drop: enemy.as_structure().map(|structure| structure.resource()),
        }
    }
}

enum Strike {
    Missed,
    Hit,
    Killed(Kill),
}

impl CombatResolver {
    /// Creates a resolver with the default burning damage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            burn_dps: BURN_DAMAGE_PER_SECOND,
            kills: Vec::new(),
            explosions: Vec::new(),
        }
    }

    /// Resolves one combat pass for every tick reported in `events`.
    ///
    /// Does nothing when no time advanced, so instantaneous sources never
    /// land twice.
    pub fn handle(&mut self, events: &[Event], parts: WorldParts<'_>, out: &mut Vec<Event>) {
        let elapsed: Duration = events
            .iter()
            .filter_map(|event| match event {
                Event::TimeAdvanced { dt } => Some(*dt),
                _ => None,
            })
            .sum();
        if elapsed.is_zero() {
            return;
        }
        let dt = elapsed.as_secs_f32();

        let WorldParts {
            enemies,
            pickups,
            effects,
            player,
            rng,
        } = parts;

        let index = SpatialIndex::build(enemies.alive());
        let SourcesMut {
            projectiles,
            areas,
            rings,
            melee,
            orbitals,
        } = effects.sources_mut();

        for projectile in projectiles.iter_mut() {
            if projectile.is_spent() {
                continue;
            }
            for id in index.overlapping(projectile.position(), projectile.radius()) {
                if !projectile.can_hit(id) {
                    continue;
                }
                let strike = hit(
                    enemies,
                    id,
                    projectile.damage(),
                    projectile.payload(),
                    projectile.position(),
                    rng,
                );
                match strike {
                    Strike::Missed => {}
                    Strike::Hit => projectile.record_hit(id),
                    Strike::Killed(kill) => {
                        projectile.record_hit(id);
                        if let Some(explosion) = projectile.explosive() {
                            self.explosions.push((kill.position, explosion));
                        }
                        self.kills.push(kill);
                    }
                }
            }
        }

        for area in areas.iter().filter(|area| area.is_due()) {
            if area.hurts_player()
                && circles_overlap(
                    area.position(),
                    area.radius(),
                    player.position(),
                    player.radius(),
                )
                && player.take_damage(area.damage())
            {
                if let Some(by) = area.creator() {
                    out.push(Event::PlayerDamaged {
                        by,
                        amount: area.damage(),
                    });
                }
            }
            if !area.hurts_enemies() {
                continue;
            }
            for id in index.overlapping(area.position(), area.radius()) {
                if area.creator() == Some(id) {
                    continue;
                }
                let strike = hit(
                    enemies,
                    id,
                    area.damage(),
                    area.payload(),
                    area.position(),
                    rng,
                );
                if let Strike::Killed(kill) = strike {
                    self.kills.push(kill);
                }
            }
        }

        for ring in rings.iter_mut() {
            for id in index.overlapping_ring(ring.center(), ring.inner(), ring.outer()) {
                if !is_live(enemies, id) || !ring.record_hit(id) {
                    continue;
                }
                let strike = hit(
                    enemies,
                    id,
                    ring.damage(),
                    ring.payload(),
                    ring.center(),
                    rng,
                );
                if let Strike::Killed(kill) = strike {
                    self.kills.push(kill);
                }
            }
        }

        for strike in melee.iter_mut().filter(|strike| !strike.is_resolved()) {
            for id in index.overlapping(strike.position(), strike.radius()) {
                let outcome = hit(
                    enemies,
                    id,
                    strike.damage(),
                    strike.payload(),
                    strike.position(),
                    rng,
                );
                if let Strike::Killed(kill) = outcome {
                    self.kills.push(kill);
                }
            }
            strike.resolve();
        }

        for shield in orbitals.iter_mut() {
            for orb in shield.orb_positions() {
                for id in index.overlapping(orb, shield.orb_radius()) {
                    if !shield.is_ready(id) {
                        continue;
                    }
                    match hit(enemies, id, shield.damage(), None, orb, rng) {
                        Strike::Missed => {}
                        Strike::Hit => shield.record_hit(id),
                        Strike::Killed(kill) => {
                            shield.record_hit(id);
                            self.kills.push(kill);
                        }
                    }
                }
            }
        }

        let kills = &mut self.kills;
        let _ = enemies.apply_burning_damage(dt, self.burn_dps, |enemy| {
            kills.push(Kill::of(enemy));
        });

        for kill in self.kills.drain(..) {
            credit(kill, player, pickups, out);
        }
        for (position, explosion) in self.explosions.drain(..) {
            let _ = effects.spawn_explosion(position, explosion);
        }
    }
}

fn is_live(enemies: &EnemyCollection, id: EnemyId) -> bool {
    enemies.get(id).is_some_and(Enemy::is_alive)
}

fn hit<R: Rng + ?Sized>(
    enemies: &mut EnemyCollection,
    id: EnemyId,
    damage: f32,
    payload: Option<StatusPayload>,
    source: Vec2,
    rng: &mut R,
) -> Strike {
    let Some(enemy) = enemies.get_mut(id) else {
        return Strike::Missed;
    };
    if !enemy.is_alive() {
        return Strike::Missed;
    }
    if enemy.take_damage(damage) {
        if enemy.mark_dead() {
            return Strike::Killed(Kill::of(enemy));
        }
        return Strike::Missed;
    }
    if let Some(payload) = payload {
        enemy.apply_status(payload, source, rng);
    }
    Strike::Hit
}

fn credit<P: Player + ?Sized>(
    kill: Kill,
    player: &mut P,
    pickups: &mut PickupField,
    out: &mut Vec<Event>,
) {
    debug!(id = kill.id.get(), kind = kill.kind.as_str(), xp = kill.xp, "enemy killed");
    player.add_xp(kill.xp);
    out.push(Event::EnemyKilled {
        id: kill.id,
        kind: kill.kind,
        position: kill.position,
        xp: kill.xp,
    });
    if let Some(resource) = kill.drop {
        let pickup = pickups.place(resource, kill.position);
        debug!(id = kill.id.get(), resource = resource.as_str(), "structure destroyed");
        out.push(Event::StructureDestroyed { id: kill.id, pickup });
    }
}
