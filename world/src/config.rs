//! Tuning knobs for the physics and the game rules.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;

/// Errors produced while loading a [`WorldConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The configuration was not valid TOML for the expected schema.
    #[error("failed to parse world config")]
    Parse(#[from] toml::de::Error),
    /// A value was outside its permitted range.
    #[error("invalid world config: {0}")]
    Invalid(String),
}

/// Complete world configuration. Missing sections fall back to defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    /// Tank handling.
    pub tank: TankConfig,
    /// Projectile ballistics.
    pub projectile: ProjectileConfig,
    /// Flag, respawn and box rules.
    pub rules: RuleConfig,
}

impl WorldConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses the TOML configuration at the provided path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("tank.acceleration", self.tank.acceleration),
            ("tank.max_speed", self.tank.max_speed),
            ("tank.flag_max_speed", self.tank.flag_max_speed),
            ("tank.rotation_speed", self.tank.rotation_speed),
            ("tank.radius", self.tank.radius),
            ("projectile.speed", self.projectile.speed),
            ("projectile.radius", self.projectile.radius),
            ("rules.grab_radius", self.rules.grab_radius),
            ("rules.home_radius", self.rules.home_radius),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }

        if self.tank.radius >= 0.5 {
            return Err(ConfigError::Invalid(format!(
                "tank.radius must be below half a cell, got {}",
                self.tank.radius
            )));
        }

        Ok(())
    }
}

/// Tank handling parameters.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TankConfig {
    /// Change of speed per second while accelerating, in units per second squared.
    pub acceleration: f32,
    /// Top speed in units per second.
    pub max_speed: f32,
    /// Top speed while carrying the flag.
    pub flag_max_speed: f32,
    /// Turning rate in radians per second.
    pub rotation_speed: f32,
    /// Radius of the tank body.
    pub radius: f32,
    /// Hits a fresh tank absorbs before the next one destroys it.
    pub hit_points: u32,
    /// Minimum time between two shots, in milliseconds.
    pub fire_cooldown_ms: u64,
}

impl TankConfig {
    /// Minimum time between two shots.
    #[must_use]
    pub const fn fire_cooldown(&self) -> Duration {
        Duration::from_millis(self.fire_cooldown_ms)
    }
}

impl Default for TankConfig {
    fn default() -> Self {
        Self {
            acceleration: 4.0,
            max_speed: 2.0,
            flag_max_speed: 1.0,
            rotation_speed: 3.0,
            radius: 0.3,
            hit_points: 2,
            fire_cooldown_ms: 1000,
        }
    }
}

/// Projectile ballistics.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectileConfig {
    /// Speed in units per second.
    pub speed: f32,
    /// Radius of the projectile body.
    pub radius: f32,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            speed: 5.0,
            radius: 0.1,
        }
    }
}

/// Flag, respawn and box rules.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleConfig {
    /// Distance within which a tank picks up the free flag.
    pub grab_radius: f32,
    /// Distance to the start position within which a carrier scores.
    pub home_radius: f32,
    /// Ticks of damage immunity after a respawn.
    pub respawn_ticks: u32,
    /// Ticks an explosion stays registered.
    pub explosion_ticks: u32,
    /// Hits a wooden box absorbs before the next one destroys it.
    pub wood_box_hit_points: u32,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            grab_radius: 0.5,
            home_radius: 0.2,
            respawn_ticks: 300,
            explosion_ticks: 2,
            wood_box_hit_points: 2,
        }
    }
}
