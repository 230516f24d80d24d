//! Timed status effects shared by every archetype.
//!
//! [`StatusEffects`] is composed into each enemy. It owns the timers and the
//! accumulation rules; the enemy consults [`StatusEffects::movement_mode`] once
//! per tick to learn which branch governs its motion. Structures carry an
//! immune instance on which every setter is a no-op.

use std::f32::consts::{FRAC_PI_2, TAU};

use crystal_siege_core::Vec2;
use rand::Rng;

/// Seconds between chase and wander flips while delirious.
pub const DELIRIUM_PHASE_DURATION: f32 = 0.8;
/// Seconds between trail markers dropped by a panicking entity.
pub const PANIC_TRAIL_INTERVAL: f32 = 0.25;

const KNOCKBACK_SCALE: f32 = 10.0;
const KNOCKBACK_DECAY: f32 = 0.9;
const HURT_FLASH_DURATION: f32 = 0.1;
const PANIC_TURN_CHANCE: f64 = 0.05;

/// Half of a delirium cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeliriumPhase {
    /// Inefficient pursuit of the player.
    #[default]
    Chase,
    /// Drifting along a fixed heading.
    Wander,
}

impl DeliriumPhase {
    fn flipped(self) -> Self {
        match self {
            Self::Chase => Self::Wander,
            Self::Wander => Self::Chase,
        }
    }
}

/// Branch that governs an entity's movement for the current tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MovementMode {
    /// Burning panic: run along a jittering heading.
    Panic,
    /// Frozen, encased or immobilized: no voluntary movement.
    Blocked,
    /// Confused: alternate between chasing and wandering.
    Delirious(DeliriumPhase),
    /// Archetype-specific AI.
    Normal,
}

/// Outcome of advancing the panic branch by one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanicStep {
    /// Heading to run along this tick.
    pub heading: Vec2,
    /// Whether a trail marker is due.
    pub emit_trail: bool,
}

/// Status state composed into every entity.
#[derive(Clone, Debug, Default)]
pub struct StatusEffects {
    immune: bool,
    slow_amount: f32,
    slow_time: f32,
    knockback: Vec2,
    immobilized_time: f32,
    permanently_frozen: bool,
    delirious_time: f32,
    delirium_phase: DeliriumPhase,
    delirium_phase_timer: f32,
    delirium_heading: Vec2,
    panic_time: f32,
    panic_heading: Vec2,
    panic_trail_timer: f32,
    hurt_flash: f32,
    cryostasis_time: f32,
    cryostasis_held: bool,
}

impl StatusEffects {
    /// Creates a status block that accepts every effect.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a status block on which every setter is a no-op.
    #[must_use]
    pub fn immune() -> Self {
        Self {
            immune: true,
            ..Self::default()
        }
    }

    /// Slows the entity. Both fields only ever grow while the slow is active.
    pub fn apply_slow(&mut self, amount: f32, duration: f32) {
        if self.immune {
            return;
        }
        self.slow_amount = self.slow_amount.max(amount.clamp(0.0, 1.0));
        self.slow_time = self.slow_time.max(duration);
    }

    /// Accumulates a knockback impulse along `direction`.
    pub fn apply_knockback(&mut self, direction: Vec2, force: f32) {
        if self.immune {
            return;
        }
        self.knockback += direction.normalize_or_zero() * force;
    }

    /// Sets or extends the cannot-move timer.
    pub fn apply_immobilize(&mut self, duration: f32) {
        if self.immune || self.permanently_frozen {
            return;
        }
        self.immobilized_time = self.immobilized_time.max(duration);
    }

    /// Freezes the entity for good. Idempotent.
    pub fn apply_permanent_freeze(&mut self) {
        if self.immune {
            return;
        }
        self.permanently_frozen = true;
        self.immobilized_time = 0.0;
    }

    /// Confuses the entity. A fresh application rolls the initial phase; a
    /// reapplication while active only extends the timer.
    pub fn apply_delirious<R: Rng + ?Sized>(&mut self, duration: f32, rng: &mut R) {
        if self.immune {
            return;
        }
        if self.delirious_time <= 0.0 {
            self.delirium_phase = if rng.gen_bool(0.5) {
                DeliriumPhase::Chase
            } else {
                DeliriumPhase::Wander
            };
            self.delirium_phase_timer = 0.0;
            self.delirium_heading = random_heading(rng);
        }
        self.delirious_time = self.delirious_time.max(duration);
    }

    /// Sets the entity ablaze. Ignored once permanently frozen.
    pub fn apply_burning_panic<R: Rng + ?Sized>(&mut self, duration: f32, rng: &mut R) {
        if self.immune || self.permanently_frozen {
            return;
        }
        self.panic_time = self.panic_time.max(duration);
        self.panic_heading = random_heading(rng);
        self.immobilized_time = 0.0;
    }

    /// Encases the entity in ice that blocks damage for `duration` seconds.
    pub fn apply_cryostasis(&mut self, duration: f32) {
        if self.immune {
            return;
        }
        self.cryostasis_time = self.cryostasis_time.max(duration);
    }

    /// Holds or releases the encasement independently of any timer.
    pub fn set_cryostasis(&mut self, held: bool) {
        if self.immune {
            return;
        }
        self.cryostasis_held = held;
    }

    /// Starts the brief hurt flash shown after taking damage.
    pub fn flash(&mut self) {
        self.hurt_flash = HURT_FLASH_DURATION;
    }

    /// Reports whether incoming damage is currently ignored.
    #[must_use]
    pub fn is_invulnerable(&self) -> bool {
        self.cryostasis_held || self.cryostasis_time > 0.0
    }

    /// Reports whether the entity may move voluntarily.
    #[must_use]
    pub fn can_move(&self) -> bool {
        !self.permanently_frozen && self.immobilized_time <= 0.0 && !self.is_invulnerable()
    }

    /// Reports whether the entity is permanently frozen.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.permanently_frozen
    }

    /// Reports whether the entity is in burning panic.
    #[must_use]
    pub fn is_panicking(&self) -> bool {
        self.panic_time > 0.0
    }

    /// Reports whether the entity is delirious.
    #[must_use]
    pub fn is_delirious(&self) -> bool {
        self.delirious_time > 0.0
    }

    /// Reports whether the hurt flash is showing.
    #[must_use]
    pub fn is_flashing(&self) -> bool {
        self.hurt_flash > 0.0
    }

    /// Current slow fraction.
    #[must_use]
    pub fn slow_amount(&self) -> f32 {
        self.slow_amount
    }

    /// Remaining slow duration.
    #[must_use]
    pub fn slow_time(&self) -> f32 {
        self.slow_time
    }

    /// Current delirium phase.
    #[must_use]
    pub fn delirium_phase(&self) -> DeliriumPhase {
        self.delirium_phase
    }

    /// Pending knockback impulse.
    #[must_use]
    pub fn knockback(&self) -> Vec2 {
        self.knockback
    }

    /// Multiplier applied to base speed this tick.
    #[must_use]
    pub fn speed_multiplier(&self) -> f32 {
        1.0 - self.slow_amount
    }

    /// Resolves which branch governs movement, in priority order.
    #[must_use]
    pub fn movement_mode(&self) -> MovementMode {
        if self.permanently_frozen || self.is_invulnerable() {
            MovementMode::Blocked
        } else if self.panic_time > 0.0 {
            MovementMode::Panic
        } else if !self.can_move() {
            MovementMode::Blocked
        } else if self.delirious_time > 0.0 {
            MovementMode::Delirious(self.delirium_phase)
        } else {
            MovementMode::Normal
        }
    }

    /// Clears a slow whose timer ran out during the previous tick.
    pub fn begin_tick(&mut self) {
        if self.slow_time <= 0.0 {
            self.slow_amount = 0.0;
            self.slow_time = 0.0;
        }
    }

    /// Advances the panic branch, jittering the heading now and then.
    pub fn panic_step<R: Rng + ?Sized>(&mut self, dt: f32, rng: &mut R) -> PanicStep {
        if rng.gen_bool(PANIC_TURN_CHANCE) {
            let angle = self.panic_heading.y.atan2(self.panic_heading.x)
                + rng.gen_range(-FRAC_PI_2..FRAC_PI_2);
            self.panic_heading = Vec2::new(angle.cos(), angle.sin());
        }
        self.panic_trail_timer += dt;
        let emit_trail = self.panic_trail_timer >= PANIC_TRAIL_INTERVAL;
        if emit_trail {
            self.panic_trail_timer -= PANIC_TRAIL_INTERVAL;
        }
        PanicStep {
            heading: self.panic_heading,
            emit_trail,
        }
    }

    /// Advances the delirium phase clock and returns the wander heading.
    pub fn delirium_step<R: Rng + ?Sized>(&mut self, dt: f32, rng: &mut R) -> Vec2 {
        self.delirium_phase_timer += dt;
        while self.delirium_phase_timer >= DELIRIUM_PHASE_DURATION {
            self.delirium_phase_timer -= DELIRIUM_PHASE_DURATION;
            self.delirium_phase = self.delirium_phase.flipped();
            if self.delirium_phase == DeliriumPhase::Wander {
                self.delirium_heading = random_heading(rng);
            }
        }
        self.delirium_heading
    }

    /// Returns this tick's knockback displacement and decays the impulse.
    pub fn knockback_step(&mut self, dt: f32) -> Vec2 {
        let displacement = self.knockback * dt * KNOCKBACK_SCALE;
        self.knockback *= KNOCKBACK_DECAY;
        if self.knockback.length_squared() < 1e-6 {
            self.knockback = Vec2::ZERO;
        }
        displacement
    }

    /// Counts every timer down by `dt`.
    pub fn end_tick(&mut self, dt: f32) {
        if self.slow_time > 0.0 {
            self.slow_time -= dt;
        }
        self.immobilized_time = (self.immobilized_time - dt).max(0.0);
        self.delirious_time = (self.delirious_time - dt).max(0.0);
        self.panic_time = (self.panic_time - dt).max(0.0);
        self.hurt_flash = (self.hurt_flash - dt).max(0.0);
        self.cryostasis_time = (self.cryostasis_time - dt).max(0.0);
        if self.panic_time <= 0.0 {
            self.panic_trail_timer = 0.0;
        }
    }
}

/// Uniformly random unit vector.
pub fn random_heading<R: Rng + ?Sized>(rng: &mut R) -> Vec2 {
    let angle = rng.gen_range(0.0..TAU);
    Vec2::new(angle.cos(), angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn slow_stacking_keeps_strongest_fields() {
        let mut status = StatusEffects::new();
        let applications = [(0.3, 2.0), (0.6, 1.0), (0.2, 5.0), (0.5, 0.5)];
        for (amount, duration) in applications {
            status.apply_slow(amount, duration);
        }
        assert!((status.slow_amount() - 0.6).abs() < f32::EPSILON);
        assert!((status.slow_time() - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn slow_expiry_lags_one_tick() {
        let mut status = StatusEffects::new();
        status.apply_slow(0.5, 0.1);

        status.begin_tick();
        assert!((status.speed_multiplier() - 0.5).abs() < f32::EPSILON);
        status.end_tick(0.15);

        status.begin_tick();
        assert!((status.speed_multiplier() - 1.0).abs() < f32::EPSILON);
        assert_eq!(status.slow_time(), 0.0);
    }

    #[test]
    fn permanent_freeze_is_terminal() {
        let mut rng = rng();
        let mut status = StatusEffects::new();
        status.apply_immobilize(3.0);
        status.apply_permanent_freeze();
        status.apply_permanent_freeze();
        status.apply_immobilize(1.0);
        status.apply_burning_panic(4.0, &mut rng);
        status.apply_delirious(4.0, &mut rng);

        for _ in 0..200 {
            status.begin_tick();
            assert!(!status.can_move());
            assert_eq!(status.movement_mode(), MovementMode::Blocked);
            status.end_tick(0.05);
        }
    }

    #[test]
    fn panic_overrides_immobilize_and_clears_it() {
        let mut rng = rng();
        let mut status = StatusEffects::new();
        status.apply_immobilize(5.0);
        assert_eq!(status.movement_mode(), MovementMode::Blocked);
        status.apply_burning_panic(1.0, &mut rng);
        assert!(status.can_move());
        assert_eq!(status.movement_mode(), MovementMode::Panic);
    }

    #[test]
    fn delirium_reapplication_preserves_phase_progress() {
        let mut rng = rng();
        let mut status = StatusEffects::new();
        status.apply_delirious(2.0, &mut rng);
        let phase = status.delirium_phase();
        let _ = status.delirium_step(0.5, &mut rng);
        status.apply_delirious(6.0, &mut rng);
        let _ = status.delirium_step(0.2, &mut rng);
        assert_eq!(status.delirium_phase(), phase);
        let _ = status.delirium_step(0.2, &mut rng);
        assert_ne!(status.delirium_phase(), phase);
    }

    #[test]
    fn knockback_applies_while_immobilized_and_decays() {
        let mut status = StatusEffects::new();
        status.apply_immobilize(2.0);
        status.apply_knockback(Vec2::new(2.0, 0.0), 10.0);
        let first = status.knockback_step(0.1);
        assert!((first.x - 10.0).abs() < 1e-4);
        let second = status.knockback_step(0.1);
        assert!((second.x - 9.0).abs() < 1e-4);
    }

    #[test]
    fn immune_status_ignores_everything() {
        let mut rng = rng();
        let mut status = StatusEffects::immune();
        status.apply_slow(0.9, 9.0);
        status.apply_knockback(Vec2::X, 50.0);
        status.apply_immobilize(9.0);
        status.apply_permanent_freeze();
        status.apply_delirious(9.0, &mut rng);
        status.apply_burning_panic(9.0, &mut rng);
        status.apply_cryostasis(9.0);
        status.set_cryostasis(true);
        assert_eq!(status.movement_mode(), MovementMode::Normal);
        assert_eq!(status.knockback(), Vec2::ZERO);
        assert!(!status.is_invulnerable());
    }

    #[test]
    fn panic_emits_trail_on_interval() {
        let mut rng = rng();
        let mut status = StatusEffects::new();
        status.apply_burning_panic(2.0, &mut rng);
        let emitted = (0..10)
            .filter(|_| status.panic_step(0.125, &mut rng).emit_trail)
            .count();
        assert_eq!(emitted, 5);
    }
}
