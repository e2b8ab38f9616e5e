use std::path::Path;

use serde::Deserialize;

use simulation::SchedulerConfig;
use spatial::{RegionTemplate, WorldBounds};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetSection {
    pub listen_addr: String,
    pub max_frame_len: u32,
}

impl Default for NetSection {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:4200".to_string(),
            max_frame_len: netgate::DEFAULT_MAX_FRAME_LEN,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FrameSection {
    /// Frames per second of the simulation loop.
    pub fps: u32,
    pub batch_size: usize,
    pub budget_ms: u64,
    pub report_interval_ms: u64,
}

impl Default for FrameSection {
    fn default() -> Self {
        Self {
            fps: 20,
            batch_size: 10,
            budget_ms: 5,
            report_interval_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorldSection {
    pub sector_count_x: u32,
    pub sector_count_z: u32,
    pub origin_x: f32,
    pub origin_z: f32,
    pub sector_width: f32,
    pub spawn_x: f32,
    pub spawn_z: f32,
    /// Drops despawn this long after hitting the ground.
    pub drop_lifetime_ms: u64,
    /// Window during which only the drop's owner may pick it up.
    pub ownership_window_ms: u64,
}

impl Default for WorldSection {
    fn default() -> Self {
        Self {
            sector_count_x: 64,
            sector_count_z: 64,
            origin_x: 0.0,
            origin_z: 0.0,
            sector_width: 6400.0,
            spawn_x: 3200.0,
            spawn_z: 3200.0,
            drop_lifetime_ms: 300_000,
            ownership_window_ms: 30_000,
        }
    }
}

/// A region definition: identity plus the world-space rectangle it paints.
#[derive(Debug, Clone, Deserialize)]
pub struct RegionSpec {
    #[serde(flatten)]
    pub template: RegionTemplate,
    pub min_x: f32,
    pub min_z: f32,
    pub max_x: f32,
    pub max_z: f32,
}

/// A static npc anchored to whatever region covers its position.
#[derive(Debug, Clone, Deserialize)]
pub struct NpcSpec {
    pub name: String,
    pub x: f32,
    pub z: f32,
}

/// A patrolling monster spawn.
#[derive(Debug, Clone, Deserialize)]
pub struct MonsterSpec {
    pub name: String,
    pub x: f32,
    pub z: f32,
}

/// Top-level world server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub net: NetSection,
    pub frame: FrameSection,
    pub world: WorldSection,
    #[serde(rename = "region")]
    pub regions: Vec<RegionSpec>,
    #[serde(rename = "npc")]
    pub npcs: Vec<NpcSpec>,
    #[serde(rename = "monster")]
    pub monsters: Vec<MonsterSpec>,
}

impl ServerConfig {
    /// Load configuration from an optional TOML file path. A missing file
    /// yields the defaults; an unreadable or unparsable one is fatal.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        match config_path {
            Some(path) if Path::new(path).exists() => {
                let content = std::fs::read_to_string(path)?;
                Ok(toml::from_str(&content)?)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn to_bounds(&self) -> WorldBounds {
        WorldBounds {
            sector_count_x: self.world.sector_count_x,
            sector_count_z: self.world.sector_count_z,
            origin_x: self.world.origin_x,
            origin_z: self.world.origin_z,
            sector_width: self.world.sector_width,
        }
    }

    pub fn to_scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            batch_size: self.frame.batch_size,
            frame_budget_ms: self.frame.budget_ms,
            report_interval_ms: self.frame.report_interval_ms,
        }
    }
}

/// Parse CLI arguments and load config.
/// Supports: --config <path>
pub fn parse_cli_args() -> ServerConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<&str> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                if let Some(val) = args.get(i + 1) {
                    config_path = Some(val.as_str());
                    i += 2;
                } else {
                    eprintln!("--config requires a path argument");
                    std::process::exit(1);
                }
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                std::process::exit(1);
            }
        }
    }

    match ServerConfig::load(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    }
}
