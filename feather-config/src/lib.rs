use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// --- Error Type ---
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

// --- Enums for Choices ---
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SerializerType {
    #[default]
    Json,
    Binary,
    None,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    #[default]
    Stdio,
    File,
    None,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepModeSetting {
    #[default]
    Sequential,
    Parallel,
}

// --- Configuration Sections ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ArenaSettings {
    pub width: f32,
    pub height: f32,
}

impl Default for ArenaSettings {
    fn default() -> Self {
        Self {
            width: 900.0,
            height: 900.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GridSettings {
    #[serde(default = "default_cell_size")]
    pub cell_size: f32,
}

fn default_cell_size() -> f32 {
    64.0
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            cell_size: default_cell_size(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PopulationSettings {
    #[serde(default = "default_population")]
    pub count: usize,
    /// Clearance kept from obstacles and arena edges when spawning.
    #[serde(default = "default_spawn_padding")]
    pub spawn_padding: f32,
    /// Fixed seed for reproducible runs; random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_population() -> usize {
    100
}
fn default_spawn_padding() -> f32 {
    25.0
}

impl Default for PopulationSettings {
    fn default() -> Self {
        Self {
            count: default_population(),
            spawn_padding: default_spawn_padding(),
            seed: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ObstacleSettings {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// Per-species force and perception limits. Missing fields keep their defaults.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TuningSettings {
    pub max_force: f32,
    pub speed_cap: f32,
    pub sensing_range: f32,
    pub min_distance: f32,
}

impl Default for TuningSettings {
    fn default() -> Self {
        Self {
            max_force: 60.0,
            speed_cap: 100.0,
            sensing_range: 256.0,
            min_distance: 48.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SpeciesSettings {
    pub red: TuningSettings,
    pub green: TuningSettings,
    pub blue: TuningSettings,
}

impl SpeciesSettings {
    /// Tuning in red, green, blue order.
    pub fn all(&self) -> [(&'static str, &TuningSettings); 3] {
        [("red", &self.red), ("green", &self.green), ("blue", &self.blue)]
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ConversionSettings {
    pub enabled: bool,
    pub distance: f32,
    pub heading_dot: f32,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            distance: 16.0,
            heading_dot: -0.6,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TransportSettings {
    #[serde(default)]
    pub serializer: SerializerType,
    #[serde(default)]
    pub sender: SenderType,
    /// Output file for the `file` sender.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Publish every Nth frame.
    #[serde(default = "default_output_frequency")]
    pub output_frequency: u32,
}

fn default_output_frequency() -> u32 {
    1
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            serializer: SerializerType::default(),
            sender: SenderType::default(),
            path: None,
            output_frequency: default_output_frequency(),
        }
    }
}

// --- Top-Level Config Struct ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_framerate")]
    pub framerate: u32,
    /// Stop after this many frames; run until interrupted when absent.
    #[serde(default)]
    pub max_frames: Option<u64>,
    #[serde(default)]
    pub arena: ArenaSettings,
    #[serde(default)]
    pub grid: GridSettings,
    #[serde(default)]
    pub population: PopulationSettings,
    /// Static obstacles. A single obstacle at the arena center when omitted;
    /// an explicit empty list means none.
    #[serde(default)]
    pub obstacles: Option<Vec<ObstacleSettings>>,
    #[serde(default)]
    pub species: SpeciesSettings,
    #[serde(default)]
    pub conversion: ConversionSettings,
    #[serde(default)]
    pub step_mode: StepModeSetting,
    #[serde(default)]
    pub transport: TransportSettings,
}

fn default_framerate() -> u32 {
    60
}

/// Radius of the obstacle placed at the arena center when none are configured.
pub const DEFAULT_OBSTACLE_RADIUS: f32 = 96.0;

/// Largest `columns * rows` a grid may have; matches the simulation grid.
pub const MAX_GRID_CELLS: usize = 1 << 20;

impl Default for Config {
    fn default() -> Self {
        Self {
            framerate: default_framerate(),
            max_frames: None,
            arena: ArenaSettings::default(),
            grid: GridSettings::default(),
            population: PopulationSettings::default(),
            obstacles: None,
            species: SpeciesSettings::default(),
            conversion: ConversionSettings::default(),
            step_mode: StepModeSetting::default(),
            transport: TransportSettings::default(),
        }
    }
}

// --- Helper Methods ---

impl Config {
    /// Obstacles with the default applied.
    pub fn obstacles(&self) -> Vec<ObstacleSettings> {
        match &self.obstacles {
            Some(obstacles) => obstacles.clone(),
            None => vec![ObstacleSettings {
                x: self.arena.width / 2.0,
                y: self.arena.height / 2.0,
                radius: DEFAULT_OBSTACLE_RADIUS,
            }],
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |v: f32| v.is_finite() && v > 0.0;

        if self.framerate == 0 {
            return Err(invalid("Framerate cannot be zero"));
        }
        if !positive(self.arena.width) || !positive(self.arena.height) {
            return Err(invalid(format!(
                "Arena dimensions must be positive, got {}x{}",
                self.arena.width, self.arena.height
            )));
        }
        if !positive(self.grid.cell_size) {
            return Err(invalid(format!(
                "Cell size must be positive, got {}",
                self.grid.cell_size
            )));
        }
        let cols = (self.arena.width as f64 / self.grid.cell_size as f64).ceil();
        let rows = (self.arena.height as f64 / self.grid.cell_size as f64).ceil();
        if cols * rows > MAX_GRID_CELLS as f64 {
            return Err(invalid(format!(
                "Cell size {} yields {cols}x{rows} cells, more than {MAX_GRID_CELLS}",
                self.grid.cell_size
            )));
        }
        if self.population.count == 0 {
            return Err(invalid("Population count must be greater than 0"));
        }
        if !(self.population.spawn_padding.is_finite() && self.population.spawn_padding >= 0.0) {
            return Err(invalid("Spawn padding cannot be negative"));
        }

        for (name, tuning) in self.species.all() {
            let fields = [
                ("max_force", tuning.max_force),
                ("speed_cap", tuning.speed_cap),
                ("sensing_range", tuning.sensing_range),
                ("min_distance", tuning.min_distance),
            ];
            for (field, value) in fields {
                if !positive(value) {
                    return Err(invalid(format!(
                        "species.{name}.{field} must be positive, got {value}"
                    )));
                }
            }
        }

        let obstacles = self.obstacles();
        for obstacle in &obstacles {
            if !positive(obstacle.radius) {
                return Err(invalid(format!(
                    "Obstacle radius must be positive, got {}",
                    obstacle.radius
                )));
            }
            let inside = (0.0..self.arena.width).contains(&obstacle.x)
                && (0.0..self.arena.height).contains(&obstacle.y);
            if !inside {
                return Err(invalid(format!(
                    "Obstacle center ({}, {}) lies outside the arena",
                    obstacle.x, obstacle.y
                )));
            }
        }

        // Spawn offsets are whole numbers in ceil(inner)..=floor(outer) per axis
        let padding = self.population.spawn_padding;
        let largest_radius = obstacles.iter().map(|o| o.radius).fold(0.0, f32::max);
        let inner = (largest_radius + padding).ceil();
        let outer_x = spawn_outer(self.arena.width, padding).floor();
        let outer_y = spawn_outer(self.arena.height, padding).floor();
        if inner > outer_x.min(outer_y) {
            return Err(invalid(format!(
                "Spawn boxes are empty: inner {inner} exceeds outer ({outer_x}, {outer_y})"
            )));
        }

        if self.transport.sender == SenderType::File && self.transport.path.is_none() {
            return Err(invalid("The file sender requires transport.path"));
        }
        if self.transport.output_frequency == 0 {
            return Err(invalid("Output frequency must be greater than 0"));
        }

        Ok(())
    }
}

/// Outer spawn offset along an axis of length `extent`, measured from its
/// midpoint and kept strictly inside the arena.
fn spawn_outer(extent: f32, padding: f32) -> f32 {
    let center = extent / 2.0;
    let edge = ((extent - center).ceil() - 1.0).min(center.floor());
    (center - padding).min(edge)
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation(message.into())
}

// --- Loading Function ---

/// Reads, parses and validates a configuration file. Files ending in `.toml`
/// are parsed as TOML, everything else as JSON.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    let is_toml = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("toml"));

    let config = if is_toml {
        Config::from_toml_str(&content)?
    } else {
        Config::from_json_str(&content)?
    };
    config.validate()?;

    debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    fn write_temp(content: &str, suffix: &str) -> NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn load_full_json_config() {
        let content = r#"{
          "framerate": 30,
          "max_frames": 600,
          "arena": { "width": 800.0, "height": 600.0 },
          "grid": { "cell_size": 50.0 },
          "population": { "count": 60, "spawn_padding": 20.0, "seed": 7 },
          "obstacles": [ { "x": 400.0, "y": 300.0, "radius": 50.0 } ],
          "species": { "blue": { "speed_cap": 120.0 } },
          "conversion": { "enabled": false },
          "step_mode": "parallel",
          "transport": {
            "serializer": "binary",
            "sender": "file",
            "path": "out.bin",
            "output_frequency": 2
          }
        }"#;
        let file = write_temp(content, ".json");
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.framerate, 30);
        assert_eq!(config.max_frames, Some(600));
        assert_eq!(config.arena.width, 800.0);
        assert_eq!(config.grid.cell_size, 50.0);
        assert_eq!(config.population.count, 60);
        assert_eq!(config.population.seed, Some(7));
        assert_eq!(config.obstacles().len(), 1);
        assert_eq!(config.species.blue.speed_cap, 120.0);
        assert_eq!(config.species.blue.max_force, 60.0);
        assert_eq!(config.species.red, TuningSettings::default());
        assert!(!config.conversion.enabled);
        assert_eq!(config.conversion.distance, 16.0);
        assert_eq!(config.step_mode, StepModeSetting::Parallel);
        assert_eq!(config.transport.serializer, SerializerType::Binary);
        assert_eq!(config.transport.sender, SenderType::File);
        assert_eq!(config.transport.path, Some(PathBuf::from("out.bin")));
        assert_eq!(config.transport.output_frequency, 2);
    }

    #[test]
    fn empty_config_is_canonical() {
        let file = write_temp("{}", ".json");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config, Config::default());

        assert_eq!(config.framerate, 60);
        assert_eq!(config.population.count, 100);
        assert_eq!(config.grid.cell_size, 64.0);
        let obstacles = config.obstacles();
        assert_eq!(obstacles.len(), 1);
        assert_eq!((obstacles[0].x, obstacles[0].y, obstacles[0].radius), (450.0, 450.0, 96.0));
    }

    #[test]
    fn explicit_empty_obstacle_list_means_none() {
        let config = Config::from_json_str(r#"{ "obstacles": [] }"#).unwrap();
        assert!(config.obstacles().is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn toml_is_chosen_by_extension() {
        let content = r#"
framerate = 120
step_mode = "parallel"

[population]
count = 30
seed = 99

[species.red]
max_force = 80.0

[transport]
serializer = "none"
sender = "none"
"#;
        let file = write_temp(content, ".toml");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.framerate, 120);
        assert_eq!(config.population.count, 30);
        assert_eq!(config.population.seed, Some(99));
        assert_eq!(config.species.red.max_force, 80.0);
        assert_eq!(config.transport.sender, SenderType::None);
        assert_eq!(config.step_mode, StepModeSetting::Parallel);
    }

    #[test]
    fn malformed_files_report_their_format() {
        let json = write_temp("{ not json", ".json");
        assert!(matches!(load_config(json.path()), Err(ConfigError::Json(_))));

        let toml = write_temp("framerate = = 3", ".toml");
        assert!(matches!(load_config(toml.path()), Err(ConfigError::Toml(_))));

        assert!(matches!(
            load_config(Path::new("/definitely/not/here.json")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn load_invalid_framerate() {
        let file = write_temp(r#"{ "framerate": 0 }"#, ".json");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let cases = [
            r#"{ "arena": { "width": 0.0, "height": 900.0 } }"#,
            r#"{ "grid": { "cell_size": -1.0 } }"#,
            r#"{ "population": { "count": 0 } }"#,
            r#"{ "species": { "green": { "min_distance": 0.0 } } }"#,
            r#"{ "obstacles": [ { "x": 10.0, "y": 10.0, "radius": 0.0 } ] }"#,
            r#"{ "obstacles": [ { "x": 950.0, "y": 10.0, "radius": 10.0 } ] }"#,
            r#"{ "obstacles": [ { "x": 450.0, "y": 450.0, "radius": 420.0 } ] }"#,
            r#"{ "transport": { "sender": "file" } }"#,
            r#"{ "transport": { "output_frequency": 0 } }"#,
        ];
        for case in cases {
            let config = Config::from_json_str(case).unwrap();
            assert!(
                matches!(config.validate(), Err(ConfigError::Validation(_))),
                "accepted {case}"
            );
        }
    }

    #[test]
    fn grid_cell_count_is_bounded() {
        let config = Config::from_json_str(r#"{ "grid": { "cell_size": 0.01 } }"#).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        // 900 x 900 cells is within the limit
        let config = Config::from_json_str(r#"{ "grid": { "cell_size": 1.0 } }"#).unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn spawn_check_uses_whole_offsets() {
        // Zero padding on a 900 wide arena leaves offsets up to 449
        let fits = r#"{ "population": { "spawn_padding": 0.0 },
                        "obstacles": [ { "x": 450.0, "y": 450.0, "radius": 449.0 } ] }"#;
        Config::from_json_str(fits).unwrap().validate().unwrap();

        let cases = [
            r#"{ "population": { "spawn_padding": 0.0 },
                 "obstacles": [ { "x": 450.0, "y": 450.0, "radius": 449.5 } ] }"#,
            // 448.7 + 0.5 rounds up to 450, past the outer offset of 449
            r#"{ "population": { "spawn_padding": 0.5 },
                 "obstacles": [ { "x": 450.0, "y": 450.0, "radius": 448.7 } ] }"#,
        ];
        for case in cases {
            let config = Config::from_json_str(case).unwrap();
            assert!(
                matches!(config.validate(), Err(ConfigError::Validation(_))),
                "accepted {case}"
            );
        }
    }

    #[test]
    fn unknown_serializer_is_a_parse_error() {
        let result = Config::from_json_str(r#"{ "transport": { "serializer": "xml" } }"#);
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }
}
