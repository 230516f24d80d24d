//! Headless frame loop wiring the world to its systems.

use std::fmt;

use anyhow::{Context, Result};
use crystal_siege_core::{Ability, Command, EnemyKind, Event, Vec2, Viewport, VisibleBounds};
use crystal_siege_system_combat::CombatResolver;
use crystal_siege_system_spawning::{Director, DirectorView};
use crystal_siege_world::{self as world, query, World};
use tracing::{debug, info};

use crate::config::SessionConfig;

const CAST_INTERVAL: f32 = 0.3;
const PATROL_RADIUS: f32 = 150.0;
const PATROL_ANGULAR_SPEED: f32 = 0.25;

const ROTATION: [Ability; 11] = [
    Ability::Bolt,
    Ability::Fireball,
    Ability::Lance,
    Ability::FrostNova,
    Ability::Bolt,
    Ability::EmberField,
    Ability::Shockwave,
    Ability::Hex,
    Ability::Glaciate,
    Ability::IceTomb,
    Ability::OrbitalShield,
];

/// Camera that follows the player without drawing anything.
#[derive(Clone, Copy, Debug)]
pub(crate) struct HeadlessCamera {
    center: Vec2,
    half_width: f32,
    half_height: f32,
}

impl HeadlessCamera {
    pub(crate) fn new(width: f32, height: f32) -> Self {
        Self {
            center: Vec2::ZERO,
            half_width: width * 0.5,
            half_height: height * 0.5,
        }
    }

    fn follow(&mut self, target: Vec2) {
        self.center = target;
    }
}

impl Viewport for HeadlessCamera {
    fn world_to_screen(&self, world: Vec2) -> Vec2 {
        world - self.center + Vec2::new(self.half_width, self.half_height)
    }

    fn is_visible(&self, x: f32, y: f32, radius: f32) -> bool {
        (x - self.center.x).abs() <= self.half_width + radius
            && (y - self.center.y).abs() <= self.half_height + radius
    }

    fn zoom(&self) -> f32 {
        1.0
    }

    fn visible_bounds(&self) -> VisibleBounds {
        VisibleBounds {
            left: self.center.x - self.half_width,
            right: self.center.x + self.half_width,
            top: self.center.y - self.half_height,
            bottom: self.center.y + self.half_height,
        }
    }
}

/// Stand-in for keyboard input: patrols a circle and casts in rotation at
/// the nearest live enemy.
#[derive(Debug, Default)]
struct Autopilot {
    angle: f32,
    cast_timer: f32,
    next: usize,
}

impl Autopilot {
    fn steer(&mut self, dt: f32) -> Vec2 {
        self.angle += PATROL_ANGULAR_SPEED * dt;
        Vec2::from_angle(self.angle) * PATROL_RADIUS
    }

    fn cast(&mut self, dt: f32, world: &World, out: &mut Vec<Command>) {
        self.cast_timer += dt;
        if self.cast_timer < CAST_INTERVAL {
            return;
        }
        let origin = query::player_position(world);
        let Some(target) = query::enemies(world)
            .alive()
            .map(|enemy| enemy.position())
            .min_by(|a, b| a.distance_squared(origin).total_cmp(&b.distance_squared(origin)))
        else {
            return;
        };
        self.cast_timer = 0.0;
        let ability = ROTATION[self.next % ROTATION.len()];
        self.next = self.next.wrapping_add(1);
        out.push(Command::CastAbility {
            ability,
            origin,
            direction: (target - origin).normalize_or_zero(),
        });
    }
}

/// Tallies of what happened during a run.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct SessionSummary {
    pub(crate) frames: u64,
    pub(crate) spawned: usize,
    pub(crate) killed: usize,
    pub(crate) structures_created: usize,
    pub(crate) structures_destroyed: usize,
    pub(crate) waves: usize,
    pub(crate) champions: usize,
    pub(crate) player_hits: usize,
    pub(crate) player_level: u32,
    pub(crate) player_health: f32,
    pub(crate) population: usize,
}

impl SessionSummary {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::EnemySpawned { .. } => self.spawned += 1,
                Event::EnemyKilled { .. } => self.killed += 1,
                Event::StructureCreated { .. } => self.structures_created += 1,
                Event::StructureDestroyed { .. } => self.structures_destroyed += 1,
                Event::WaveTriggered { .. } => self.waves += 1,
                Event::ChampionFused { .. } => self.champions += 1,
                Event::PlayerDamaged { .. } => self.player_hits += 1,
                _ => {}
            }
        }
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frames={} spawned={} killed={} structures={}/{} waves={} champions={} \
             hits={} level={} health={:.1} population={}",
            self.frames,
            self.spawned,
            self.killed,
            self.structures_created,
            self.structures_destroyed,
            self.waves,
            self.champions,
            self.player_hits,
            self.player_level,
            self.player_health,
            self.population,
        )
    }
}

/// Owns the world and every system for one headless run.
#[derive(Debug)]
pub(crate) struct Session {
    world: World,
    director: Director,
    combat: CombatResolver,
    camera: HeadlessCamera,
    autopilot: Autopilot,
    config: SessionConfig,
    last_events: Vec<Event>,
    summary: SessionSummary,
}

impl Session {
    pub(crate) fn new(config: SessionConfig) -> Result<Self> {
        config.validate().context("invalid session config")?;
        let world = World::new(config.world.clone()).context("failed to build world")?;
        let director =
            Director::new(config.director.clone()).context("failed to build spawn director")?;
        let camera = HeadlessCamera::new(config.viewport.width, config.viewport.height);
        Ok(Self {
            world,
            director,
            combat: CombatResolver::new(),
            camera,
            autopilot: Autopilot::default(),
            config,
            last_events: Vec::new(),
            summary: SessionSummary::default(),
        })
    }

    /// Runs one frame: director, world tick, combat, dead sweep.
    pub(crate) fn step(&mut self) -> Result<()> {
        let dt = self.config.frame();
        let seconds = dt.as_secs_f32();
        let mut commands = Vec::new();

        let position = self.autopilot.steer(seconds);
        self.camera.follow(position);
        commands.push(Command::MovePlayer { position });
        commands.push(Command::ConfigureViewport {
            bounds: self.camera.visible_bounds(),
        });

        let view = DirectorView {
            pickup_count: query::pickups(&self.world).len(),
            player: position,
        };
        self.director
            .handle(&self.last_events, &self.camera, view, &mut commands);
        self.autopilot.cast(seconds, &self.world, &mut commands);

        let mut events = Vec::new();
        for command in commands {
            world::apply(&mut self.world, command, &mut events)
                .context("world rejected a system command")?;
        }

        let mut tick_events = Vec::new();
        world::apply(&mut self.world, Command::Tick { dt }, &mut tick_events)
            .context("world tick failed")?;
        let mut combat_events = Vec::new();
        self.combat
            .handle(&tick_events, self.world.parts_mut(), &mut combat_events);
        events.append(&mut tick_events);
        events.append(&mut combat_events);
        world::apply(&mut self.world, Command::SweepDead, &mut events)
            .context("dead sweep failed")?;

        self.summary.record(&events);
        self.summary.frames += 1;
        self.last_events = events;
        Ok(())
    }

    /// Runs every configured frame, stopping early if the player falls.
    pub(crate) fn run(mut self) -> Result<SessionSummary> {
        let frames = self.config.frame_count();
        info!(frames, seed = self.config.world.seed, "session started");
        for _ in 0..frames {
            self.step()?;
            if query::player(&self.world).is_defeated() {
                info!(frame = self.summary.frames, "player defeated");
                break;
            }
            if self.summary.frames % 600 == 0 {
                debug!(
                    frame = self.summary.frames,
                    population = query::enemies(&self.world).len(),
                    "session progress"
                );
            }
        }
        Ok(self.finish())
    }

    fn finish(mut self) -> SessionSummary {
        let player = query::player(&self.world);
        self.summary.player_level = player.level();
        self.summary.player_health = player.health();
        self.summary.population = query::enemies(&self.world).len();
        for (kind, count) in query::population(&self.world) {
            if count > 0 && kind != EnemyKind::Builder {
                debug!(kind = kind.as_str(), count, "final population");
            }
        }
        self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short(seconds: f32) -> SessionConfig {
        let mut config = SessionConfig::default();
        config.session.seconds = seconds;
        config
    }

    #[test]
    fn camera_bounds_follow_the_player() {
        let mut camera = HeadlessCamera::new(200.0, 100.0);
        camera.follow(Vec2::new(10.0, 20.0));
        let bounds = camera.visible_bounds();
        assert_eq!(bounds.left, -90.0);
        assert_eq!(bounds.right, 110.0);
        assert_eq!(bounds.top, -30.0);
        assert_eq!(bounds.bottom, 70.0);
        assert!(camera.is_visible(105.0, 20.0, 0.0));
        assert!(!camera.is_visible(200.0, 20.0, 10.0));
        assert_eq!(camera.world_to_screen(Vec2::new(10.0, 20.0)), Vec2::new(100.0, 50.0));
    }

    #[test]
    fn autopilot_waits_for_a_target() {
        let world = World::new(Default::default()).expect("valid config");
        let mut autopilot = Autopilot::default();
        let mut commands = Vec::new();
        autopilot.cast(1.0, &world, &mut commands);
        assert!(commands.is_empty());
    }

    #[test]
    fn short_run_spawns_and_fights() {
        let session = Session::new(short(20.0)).expect("valid session");
        let summary = session.run().expect("run succeeds");
        assert_eq!(summary.frames, 1250);
        assert!(summary.spawned > 0);
    }

    #[test]
    fn same_seed_replays_identically() {
        let first = Session::new(short(15.0)).expect("valid").run().expect("run");
        let second = Session::new(short(15.0)).expect("valid").run().expect("run");
        assert_eq!(first, second);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = short(5.0);
        config.world.capacity = 0;
        assert!(Session::new(config).is_err());
    }
}
