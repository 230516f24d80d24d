use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use crystal_siege_core::ConfigError;
use crystal_siege_system_spawning::DirectorTuning;
use crystal_siege_world::WorldConfig;
use serde::Deserialize;

/// Size of the headless camera in world units.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct ViewportSize {
    /// Visible width.
    pub(crate) width: f32,
    /// Visible height.
    pub(crate) height: f32,
}

impl Default for ViewportSize {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// Everything a headless session needs, loadable from TOML.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct SessionConfig {
    /// Authoritative world tuning.
    pub(crate) world: WorldConfig,
    /// Spawn director tuning.
    pub(crate) director: DirectorTuning,
    /// Camera size used for spawn placement and despawning.
    pub(crate) viewport: ViewportSize,
    /// Frame pacing.
    pub(crate) session: SessionPacing,
}

/// Length and granularity of the simulated run.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct SessionPacing {
    /// Simulated seconds to run.
    pub(crate) seconds: f32,
    /// Milliseconds per frame.
    pub(crate) tick_ms: u64,
}

impl Default for SessionPacing {
    fn default() -> Self {
        Self {
            seconds: 120.0,
            tick_ms: 16,
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Overrides {
    pub(crate) seconds: Option<f32>,
    pub(crate) tick_ms: Option<u64>,
    pub(crate) seed: Option<u64>,
}

impl SessionConfig {
    /// Reads the configuration from `path`, or the defaults when absent.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read session config {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse session config {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("invalid session config toml")?;
        Ok(config)
    }

    /// Applies command-line overrides. A seed reseeds both generators.
    pub(crate) fn apply(&mut self, overrides: Overrides) {
        if let Some(seconds) = overrides.seconds {
            self.session.seconds = seconds;
        }
        if let Some(tick_ms) = overrides.tick_ms {
            self.session.tick_ms = tick_ms;
        }
        if let Some(seed) = overrides.seed {
            self.world.seed = seed;
            self.director.seed = seed.wrapping_add(1);
        }
    }

    /// Rejects values no session can run with.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        self.world.validate()?;
        self.director.validate()?;
        if !(self.viewport.width > 0.0 && self.viewport.height > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "viewport",
                reason: "width and height must be positive",
            });
        }
        if !(self.session.seconds.is_finite() && self.session.seconds > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "seconds",
                reason: "must be positive and finite",
            });
        }
        if self.session.tick_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tick_ms",
                reason: "must be at least one millisecond",
            });
        }
        Ok(())
    }

    /// Duration of one frame.
    pub(crate) fn frame(&self) -> Duration {
        Duration::from_millis(self.session.tick_ms)
    }

    /// Number of frames covering the configured run.
    pub(crate) fn frame_count(&self) -> u64 {
        let millis = f64::from(self.session.seconds) * 1000.0;
        (millis / self.session.tick_ms as f64).ceil() as u64
    }
}
