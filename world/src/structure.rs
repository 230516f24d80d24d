//! Levelling state machine of spawn structures.
//!
//! Every derived stat is a pure function of the level so that levelling up
//! twice in one call and levelling up twice in two calls land on the same
//! numbers.

use crystal_siege_core::{ResourceKind, StatScaling, Vec2, WaveDescriptor};

/// Base health of a level one structure.
pub const STRUCTURE_BASE_HEALTH: f32 = 200.0;
/// Base radius of a level one structure.
pub const STRUCTURE_BASE_RADIUS: f32 = 30.0;
/// Experience a level one structure awards when destroyed.
pub const STRUCTURE_BASE_REWARD_XP: u32 = 50;
/// Seconds between intrusion-triggered waves.
pub const STRUCTURE_SPAWN_COOLDOWN: f32 = 3.0;

const XP_THRESHOLD_BASE: f32 = 20.0;
const XP_THRESHOLD_GROWTH: f32 = 1.5;
const LEVEL_UP_FLASH: f32 = 0.5;

/// Maximum health of a structure at `level`.
#[must_use]
pub fn max_health_for(level: u32) -> f32 {
    let steps = level.saturating_sub(1) as f32;
    (STRUCTURE_BASE_HEALTH * (1.0 + steps * 0.5)).floor()
}

/// Collision radius of a structure at `level`.
#[must_use]
pub fn radius_for(level: u32) -> f32 {
    let steps = level.saturating_sub(1) as f32;
    STRUCTURE_BASE_RADIUS * (1.0 + 0.1 * steps).min(2.0)
}

/// Experience awarded for destroying a structure at `level`.
#[must_use]
pub fn reward_xp_for(level: u32) -> u32 {
    STRUCTURE_BASE_REWARD_XP.saturating_add(level.saturating_sub(1).saturating_mul(25))
}

/// Experience required to leave `level`.
#[must_use]
pub fn xp_threshold_for(level: u32) -> u32 {
    let exponent = i32::try_from(level.saturating_sub(1)).unwrap_or(i32::MAX);
    (XP_THRESHOLD_BASE * XP_THRESHOLD_GROWTH.powi(exponent)).floor() as u32
}

/// Summary of the level-ups caused by one [`SpawnStructure::absorb_xp`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelReport {
    /// Level before the call.
    pub from: u32,
    /// Level after the call.
    pub to: u32,
}

impl LevelReport {
    /// Number of levels gained.
    #[must_use]
    pub const fn gained(&self) -> u32 {
        self.to - self.from
    }
}

/// Stationary entity that levels up from builder contact and emits waves.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnStructure {
    resource: ResourceKind,
    level: u32,
    accumulated_xp: u32,
    xp_to_next_level: u32,
    level_flash: f32,
    spawn_cooldown: f32,
}

impl SpawnStructure {
    /// Creates a level one structure seeded from `resource`.
    #[must_use]
    pub fn new(resource: ResourceKind) -> Self {
        Self {
            resource,
            level: 1,
            accumulated_xp: 0,
            xp_to_next_level: xp_threshold_for(1),
            level_flash: 0.0,
            spawn_cooldown: 0.0,
        }
    }

    /// Resource category the structure was seeded from.
    #[must_use]
    pub const fn resource(&self) -> ResourceKind {
        self.resource
    }

    /// Current level.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Experience accumulated toward the next level.
    #[must_use]
    pub const fn accumulated_xp(&self) -> u32 {
        self.accumulated_xp
    }

    /// Experience required to reach the next level.
    #[must_use]
    pub const fn xp_to_next_level(&self) -> u32 {
        self.xp_to_next_level
    }

    /// Reports whether the level-up flash is showing.
    #[must_use]
    pub fn is_flashing(&self) -> bool {
        self.level_flash > 0.0
    }

    /// Adds experience, levelling up as many times as the total allows.
    pub fn absorb_xp(&mut self, amount: u32) -> LevelReport {
        let from = self.level;
        self.accumulated_xp = self.accumulated_xp.saturating_add(amount);
        while self.xp_to_next_level > 0 && self.accumulated_xp >= self.xp_to_next_level {
            self.accumulated_xp -= self.xp_to_next_level;
            self.level = self.level.saturating_add(1);
            self.xp_to_next_level = xp_threshold_for(self.level);
        }
        if self.level > from {
            self.level_flash = LEVEL_UP_FLASH;
        }
        LevelReport {
            from,
            to: self.level,
        }
    }

    /// Describes the wave this structure emits at its current level.
    #[must_use]
    pub fn trigger_spawn(&self, origin: Vec2) -> WaveDescriptor {
        let (archetype, count) = self.resource.offspring();
        WaveDescriptor {
            count,
            archetype,
            origin,
            scaling: StatScaling::for_structure_level(self.level),
        }
    }

    /// Emits a wave unless one was emitted within the cooldown window.
    pub fn try_trigger_spawn(&mut self, origin: Vec2) -> Option<WaveDescriptor> {
        if self.spawn_cooldown > 0.0 {
            return None;
        }
        self.spawn_cooldown = STRUCTURE_SPAWN_COOLDOWN;
        Some(self.trigger_spawn(origin))
    }

    /// Counts the flash and wave cooldown timers down.
    pub fn tick(&mut self, dt: f32) {
        self.level_flash = (self.level_flash - dt).max(0.0);
        self.spawn_cooldown = (self.spawn_cooldown - dt).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crystal_siege_core::EnemyKind;

    #[test]
    fn thresholds_grow_geometrically_and_floor() {
        assert_eq!(xp_threshold_for(1), 20);
        assert_eq!(xp_threshold_for(2), 30);
        assert_eq!(xp_threshold_for(3), 45);
        assert_eq!(xp_threshold_for(4), 67);
    }

    #[test]
    fn derived_stats_follow_level() {
        for level in 1..12 {
            let expected = (STRUCTURE_BASE_HEALTH * (1.0 + (level - 1) as f32 * 0.5)).floor();
            assert_eq!(max_health_for(level), expected);
        }
        assert_eq!(radius_for(1), STRUCTURE_BASE_RADIUS);
        assert_eq!(radius_for(50), STRUCTURE_BASE_RADIUS * 2.0);
        assert_eq!(reward_xp_for(3), 100);
    }

    #[test]
    fn large_xp_crosses_several_thresholds() {
        let mut structure = SpawnStructure::new(ResourceKind::Heat);
        let report = structure.absorb_xp(20 + 30 + 5);
        assert_eq!(report, LevelReport { from: 1, to: 3 });
        assert_eq!(report.gained(), 2);
        assert_eq!(structure.accumulated_xp(), 5);
        assert_eq!(structure.xp_to_next_level(), 45);
        assert!(structure.is_flashing());
    }

    #[test]
    fn wave_matches_resource_and_level() {
        let mut structure = SpawnStructure::new(ResourceKind::Cold);
        let _ = structure.absorb_xp(20);
        let wave = structure.trigger_spawn(Vec2::new(5.0, 6.0));
        assert_eq!(wave.archetype, EnemyKind::FastChaser);
        assert_eq!(wave.count, 4);
        assert_eq!(wave.origin, Vec2::new(5.0, 6.0));
        assert_eq!(wave.scaling, StatScaling::for_structure_level(2));
    }

    #[test]
    fn intrusion_waves_respect_cooldown() {
        let mut structure = SpawnStructure::new(ResourceKind::Void);
        assert!(structure.try_trigger_spawn(Vec2::ZERO).is_some());
        assert!(structure.try_trigger_spawn(Vec2::ZERO).is_none());
        structure.tick(STRUCTURE_SPAWN_COOLDOWN);
        assert!(structure.try_trigger_spawn(Vec2::ZERO).is_some());
    }
}
