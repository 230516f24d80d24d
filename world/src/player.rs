//! Player state owned by the world.

use crystal_siege_core::{Player, Vec2};

/// Seconds of invulnerability granted after a landed hit.
pub const INVULNERABILITY_WINDOW: f32 = 0.5;

const PLAYER_RADIUS: f32 = 16.0;
const PLAYER_MAX_HEALTH: f32 = 100.0;
const LEVEL_XP_BASE: u32 = 10;

/// Position, health and experience of the player.
#[derive(Clone, Debug)]
pub struct PlayerState {
    position: Vec2,
    radius: f32,
    health: f32,
    max_health: f32,
    invulnerable_for: f32,
    xp: u32,
    level: u32,
    xp_into_level: u32,
}

impl PlayerState {
    /// Creates a full-health level one player at `position`.
    #[must_use]
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            radius: PLAYER_RADIUS,
            health: PLAYER_MAX_HEALTH,
            max_health: PLAYER_MAX_HEALTH,
            invulnerable_for: 0.0,
            xp: 0,
            level: 1,
            xp_into_level: 0,
        }
    }

    /// Moves the player.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Remaining health.
    #[must_use]
    pub fn health(&self) -> f32 {
        self.health
    }

    /// Maximum health.
    #[must_use]
    pub fn max_health(&self) -> f32 {
        self.max_health
    }

    /// Reports whether the player has run out of health.
    #[must_use]
    pub fn is_defeated(&self) -> bool {
        self.health <= 0.0
    }

    /// Total experience collected.
    #[must_use]
    pub fn xp(&self) -> u32 {
        self.xp
    }

    /// Current level.
    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Counts the invulnerability window down.
    pub fn tick(&mut self, dt: f32) {
        self.invulnerable_for = (self.invulnerable_for - dt).max(0.0);
    }

    fn xp_for_next_level(&self) -> u32 {
        LEVEL_XP_BASE.saturating_mul(self.level)
    }
}

impl Player for PlayerState {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn radius(&self) -> f32 {
        self.radius
    }

    fn take_damage(&mut self, amount: f32) -> bool {
        if self.invulnerable_for > 0.0 || self.is_defeated() {
            return false;
        }
        self.health = (self.health - amount).max(0.0);
        self.invulnerable_for = INVULNERABILITY_WINDOW;
        true
    }

    fn add_xp(&mut self, amount: u32) {
        self.xp = self.xp.saturating_add(amount);
        self.xp_into_level = self.xp_into_level.saturating_add(amount);
        while self.xp_into_level >= self.xp_for_next_level() {
            self.xp_into_level -= self.xp_for_next_level();
            self.level = self.level.saturating_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hits_inside_the_window_are_ignored() {
        let mut player = PlayerState::new(Vec2::ZERO);
        assert!(player.take_damage(10.0));
        assert!(!player.take_damage(10.0));
        player.tick(INVULNERABILITY_WINDOW);
        assert!(player.take_damage(10.0));
        assert_eq!(player.health(), 80.0);
    }

    #[test]
    fn experience_levels_the_player() {
        let mut player = PlayerState::new(Vec2::ZERO);
        player.add_xp(35);
        assert_eq!(player.xp(), 35);
        assert_eq!(player.level(), 3);
    }
}
