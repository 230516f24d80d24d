#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Time-driven director emitting enemy and crystal spawn commands.
//!
//! The director never touches the world. It accumulates simulated time from
//! [`Event::TimeAdvanced`], derives the current difficulty from elapsed time,
//! and emits [`Command::SpawnEnemy`] and [`Command::PlacePickup`] at positions
//! just outside the visible area. Capacity is enforced by the world.

use std::{f32::consts::TAU, time::Duration};

use crystal_siege_core::{
    Command, ConfigError, EnemyKind, Event, ResourceKind, StatScaling, Vec2, Viewport,
    VisibleBounds,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Tuning constants of every spawn track.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorTuning {
    /// Seconds between difficulty steps.
    pub difficulty_period: f32,
    /// Difficulty added per step.
    pub difficulty_increment: f32,
    /// Builder interval at difficulty one.
    pub builder_base_interval: f32,
    /// Builder interval removed per difficulty point.
    pub builder_interval_decrement: f32,
    /// Shortest builder interval.
    pub builder_min_interval: f32,
    /// Largest builder batch.
    pub builder_max_batch: u32,
    /// Seconds before the first fighter appears.
    pub fighter_delay: f32,
    /// Seconds between fighter difficulty steps.
    pub fighter_period: f32,
    /// Fighter difficulty added per step.
    pub fighter_increment: f32,
    /// Fighter interval at fighter difficulty one.
    pub fighter_base_interval: f32,
    /// Shortest fighter interval.
    pub fighter_min_interval: f32,
    /// Largest fighter batch.
    pub fighter_max_batch: u32,
    /// Seconds between crystal placements.
    pub crystal_interval: f32,
    /// Crystal count above which no crystal is placed.
    pub max_pickups: usize,
    /// Inner annulus radius as a multiple of the visible half-diagonal.
    pub inner_factor: f32,
    /// Outer annulus radius as a multiple of the visible half-diagonal.
    pub outer_factor: f32,
    /// Seed of the director's random number generator.
    pub seed: u64,
}

impl Default for DirectorTuning {
    fn default() -> Self {
        Self {
            difficulty_period: 30.0,
            difficulty_increment: 0.5,
            builder_base_interval: 3.0,
            builder_interval_decrement: 0.4,
            builder_min_interval: 0.6,
            builder_max_batch: 6,
            fighter_delay: 60.0,
            fighter_period: 45.0,
            fighter_increment: 0.25,
            fighter_base_interval: 10.0,
            fighter_min_interval: 2.5,
            fighter_max_batch: 3,
            crystal_interval: 8.0,
            max_pickups: 24,
            inner_factor: 1.1,
            outer_factor: 1.5,
            seed: 0x4d59_5df4_d0f3_3173,
        }
    }
}

impl DirectorTuning {
    /// Rejects tunings that would stall or spin a track.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("difficulty_period", self.difficulty_period),
            ("builder_min_interval", self.builder_min_interval),
            ("fighter_period", self.fighter_period),
            ("fighter_min_interval", self.fighter_min_interval),
            ("crystal_interval", self.crystal_interval),
            ("inner_factor", self.inner_factor),
        ];
        if let Some((field, _)) = positive
            .into_iter()
            .find(|(_, value)| !(value.is_finite() && *value > 0.0))
        {
            return Err(ConfigError::InvalidValue {
                field,
                reason: "must be positive and finite",
            });
        }
        if self.outer_factor < self.inner_factor {
            return Err(ConfigError::InvalidValue {
                field: "outer_factor",
                reason: "must not be smaller than inner_factor",
            });
        }
        if self.builder_max_batch == 0 || self.fighter_max_batch == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_batch",
                reason: "must be positive",
            });
        }
        Ok(())
    }

    /// Global difficulty after `elapsed` seconds; a monotone step function.
    #[must_use]
    pub fn difficulty(&self, elapsed: f32) -> f32 {
        1.0 + self.difficulty_increment * (elapsed / self.difficulty_period).floor()
    }

    /// Seconds between builder batches at `difficulty`.
    #[must_use]
    pub fn builder_interval(&self, difficulty: f32) -> f32 {
        (self.builder_base_interval - self.builder_interval_decrement * (difficulty - 1.0))
            .max(self.builder_min_interval)
    }

    /// Builders per batch at `difficulty`.
    #[must_use]
    pub fn builder_batch(&self, difficulty: f32) -> u32 {
        let batch = 1.0 + (difficulty - 1.0).floor();
        (batch as u32).min(self.builder_max_batch)
    }

    /// Fighter difficulty after `elapsed` seconds, or `None` before the delay.
    #[must_use]
    pub fn fighter_difficulty(&self, elapsed: f32) -> Option<f32> {
        (elapsed >= self.fighter_delay).then(|| {
            let steps = ((elapsed - self.fighter_delay) / self.fighter_period).floor();
            1.0 + self.fighter_increment * steps
        })
    }

    /// Seconds between fighter batches at fighter difficulty `difficulty`.
    #[must_use]
    pub fn fighter_interval(&self, difficulty: f32) -> f32 {
        (self.fighter_base_interval - (difficulty - 1.0)).max(self.fighter_min_interval)
    }

    /// Fighters per batch at fighter difficulty `difficulty`.
    #[must_use]
    pub fn fighter_batch(&self, difficulty: f32) -> u32 {
        let batch = 1.0 + ((difficulty - 1.0) / 2.0).floor();
        (batch as u32).min(self.fighter_max_batch)
    }

    /// Inner and outer spawn radii around the centre of `bounds`.
    #[must_use]
    pub fn annulus(&self, bounds: &VisibleBounds) -> (f32, f32) {
        let half_diagonal = bounds.half_diagonal();
        (
            self.inner_factor * half_diagonal,
            self.outer_factor * half_diagonal,
        )
    }
}

/// World facts the director reads each frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectorView {
    /// Number of resource pickups currently lying in the world.
    pub pickup_count: usize,
    /// Player position; the spawn annulus is centred on it.
    pub player: Vec2,
}

/// Pure system that ramps difficulty and emits spawn commands.
#[derive(Debug)]
pub struct Director {
    tuning: DirectorTuning,
    rng: ChaCha8Rng,
    elapsed: Duration,
    builder_timer: f32,
    fighter_timer: f32,
    crystal_timer: f32,
    announced_difficulty: f32,
}

impl Director {
    /// Creates a director after validating `tuning`.
    pub fn new(tuning: DirectorTuning) -> Result<Self, ConfigError> {
        tuning.validate()?;
        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(tuning.seed),
            tuning,
            elapsed: Duration::ZERO,
            builder_timer: 0.0,
            fighter_timer: 0.0,
            crystal_timer: 0.0,
            announced_difficulty: 1.0,
        })
    }

    /// Simulated time the director has observed.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Difficulty at the director's current time.
    #[must_use]
    pub fn difficulty(&self) -> f32 {
        self.tuning.difficulty(self.elapsed.as_secs_f32())
    }

    /// Consumes events and the viewport to emit spawn commands.
    pub fn handle(
        &mut self,
        events: &[Event],
        viewport: &dyn Viewport,
        view: DirectorView,
        out: &mut Vec<Command>,
    ) {
        let accumulated = events
            .iter()
            .filter_map(|event| match event {
                Event::TimeAdvanced { dt } => Some(*dt),
                _ => None,
            })
            .fold(Duration::ZERO, Duration::saturating_add);
        if accumulated.is_zero() {
            return;
        }
        self.elapsed = self.elapsed.saturating_add(accumulated);
        let elapsed = self.elapsed.as_secs_f32();
        let dt = accumulated.as_secs_f32();

        let difficulty = self.tuning.difficulty(elapsed);
        if difficulty > self.announced_difficulty {
            self.announced_difficulty = difficulty;
            info!(difficulty, elapsed, "difficulty increased");
        }

        let bounds = viewport.visible_bounds();
        let center = view.player;
        let (inner, outer) = self.tuning.annulus(&bounds);

        self.builder_timer += dt;
        let interval = self.tuning.builder_interval(difficulty);
        while self.builder_timer >= interval {
            self.builder_timer -= interval;
            let batch = self.tuning.builder_batch(difficulty);
            self.emit_enemies(EnemyKind::Builder, batch, center, inner, outer, out);
        }

        if let Some(fighter_difficulty) = self.tuning.fighter_difficulty(elapsed) {
            self.fighter_timer += dt.min(elapsed - self.tuning.fighter_delay);
            let interval = self.tuning.fighter_interval(fighter_difficulty);
            while self.fighter_timer >= interval {
                self.fighter_timer -= interval;
                let batch = self.tuning.fighter_batch(fighter_difficulty);
                self.emit_enemies(EnemyKind::Fighter, batch, center, inner, outer, out);
            }
        }

        self.crystal_timer += dt;
        let mut pickups = view.pickup_count;
        while self.crystal_timer >= self.tuning.crystal_interval {
            self.crystal_timer -= self.tuning.crystal_interval;
            if pickups >= self.tuning.max_pickups {
                continue;
            }
            let kind = ResourceKind::ALL[self.rng.gen_range(0..ResourceKind::ALL.len())];
            let position = self.annulus_point(center, inner, outer);
            debug!(resource = %kind, x = position.x, y = position.y, "placing crystal");
            out.push(Command::PlacePickup { kind, position });
            pickups += 1;
        }
    }

    fn emit_enemies(
        &mut self,
        kind: EnemyKind,
        batch: u32,
        center: Vec2,
        inner: f32,
        outer: f32,
        out: &mut Vec<Command>,
    ) {
        for _ in 0..batch {
            let position = self.annulus_point(center, inner, outer);
            out.push(Command::SpawnEnemy {
                kind,
                position,
                scaling: StatScaling::UNIT,
            });
        }
    }

    fn annulus_point(&mut self, center: Vec2, inner: f32, outer: f32) -> Vec2 {
        let angle = self.rng.gen_range(0.0..TAU);
        let radius = if outer > inner {
            self.rng.gen_range(inner..=outer)
        } else {
            inner
        };
        center + Vec2::from_angle(angle) * radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_steps_every_period() {
        let tuning = DirectorTuning::default();
        assert_eq!(tuning.difficulty(0.0), 1.0);
        assert_eq!(tuning.difficulty(29.9), 1.0);
        assert_eq!(tuning.difficulty(30.0), 1.5);
        assert_eq!(tuning.difficulty(95.0), 2.5);
    }

    #[test]
    fn builder_track_tightens_and_saturates() {
        let tuning = DirectorTuning::default();
        assert!((tuning.builder_interval(1.0) - 3.0).abs() < 1e-6);
        assert!((tuning.builder_interval(3.0) - 2.2).abs() < 1e-6);
        assert!((tuning.builder_interval(20.0) - 0.6).abs() < 1e-6);
        assert_eq!(tuning.builder_batch(1.0), 1);
        assert_eq!(tuning.builder_batch(2.5), 2);
        assert_eq!(tuning.builder_batch(40.0), 6);
    }

    #[test]
    fn fighter_track_waits_for_its_delay() {
        let tuning = DirectorTuning::default();
        assert_eq!(tuning.fighter_difficulty(59.0), None);
        assert_eq!(tuning.fighter_difficulty(60.0), Some(1.0));
        assert_eq!(tuning.fighter_difficulty(150.0), Some(1.5));
        assert!((tuning.fighter_interval(1.0) - 10.0).abs() < 1e-6);
        assert!((tuning.fighter_interval(30.0) - 2.5).abs() < 1e-6);
        assert_eq!(tuning.fighter_batch(2.75), 1);
        assert_eq!(tuning.fighter_batch(3.0), 2);
        assert_eq!(tuning.fighter_batch(30.0), 3);
    }

    #[test]
    fn inverted_annulus_is_rejected() {
        let tuning = DirectorTuning {
            inner_factor: 2.0,
            outer_factor: 1.0,
            ..DirectorTuning::default()
        };
        assert!(matches!(
            Director::new(tuning),
            Err(ConfigError::InvalidValue {
                field: "outer_factor",
                ..
            })
        ));
    }
}
