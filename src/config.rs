//! Configuration for the story and the explorer.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::DataSource;

/// Public TopoJSON with 110m country boundaries.
pub const WORLD_ATLAS_URL: &str = "https://cdn.jsdelivr.net/npm/world-atlas@2/countries-110m.json";

/// Configuration parameters. Every field has a default, so a config file
/// only needs the keys it changes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryConfig {
    /// Path or URL of the conflict JSON.
    pub data_source: String,

    /// Where the map view fetches world boundaries. `None` skips the fetch.
    pub world_geometry_url: Option<String>,

    /// Narrative canvas size in scene units.
    pub canvas_width: f64,
    pub canvas_height: f64,

    /// Seed for every random draw in the narrative.
    pub seed: u64,

    /// Full slider window.
    pub slider_start: i32,
    pub slider_end: i32,

    /// Year window of the zoom step.
    pub modern_start: i32,
    pub modern_end: i32,

    /// Deaths represented by one particle before clamping.
    pub deaths_per_particle: u64,
    pub min_particles: usize,
    pub max_particles: usize,

    /// Relaxation passes of the circle layout.
    pub layout_iterations: usize,

    /// Bars in the deadliest-conflicts chart.
    pub bar_chart_top_n: usize,

    /// Redraw interval of the terminal front end.
    pub frame_millis: u64,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            data_source: "data/wars_data.json".to_string(),
            world_geometry_url: Some(WORLD_ATLAS_URL.to_string()),
            canvas_width: 1200.0,
            canvas_height: 800.0,
            seed: 42,
            slider_start: 700,
            slider_end: 2025,
            modern_start: 1800,
            modern_end: 1970,
            deaths_per_particle: 200_000,
            min_particles: 10,
            max_particles: 150,
            layout_iterations: 300,
            bar_chart_top_n: 15,
            frame_millis: 33,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {field} minimum {min} exceeds maximum {max}")]
    InvertedBounds { field: &'static str, min: i64, max: i64 },
}

impl StoryConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: StoryConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject min/max pairs that are the wrong way round.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pairs = [
            ("particles", self.min_particles as i64, self.max_particles as i64),
            ("slider", self.slider_start as i64, self.slider_end as i64),
            ("modern era", self.modern_start as i64, self.modern_end as i64),
        ];
        for (field, min, max) in pairs {
            if min > max {
                return Err(ConfigError::InvertedBounds { field, min, max });
            }
        }
        Ok(())
    }

    pub fn data_source(&self) -> DataSource {
        DataSource::parse(&self.data_source)
    }

    /// Particle count for a conflict: compressed and clamped so huge wars
    /// stay drawable.
    pub fn particle_count(&self, total_deaths: u64) -> usize {
        let raw = (total_deaths / self.deaths_per_particle.max(1)) as usize;
        // Inverted bounds collapse to the minimum rather than panic.
        raw.max(self.min_particles).min(self.max_particles.max(self.min_particles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoryConfig::default();
        assert_eq!(config.slider_start, 700);
        assert_eq!(config.slider_end, 2025);
        assert_eq!(config.deaths_per_particle, 200_000);
    }

    #[test]
    fn test_particle_count_clamps() {
        let config = StoryConfig::default();
        assert_eq!(config.particle_count(0), 10);
        assert_eq!(config.particle_count(5_000_000), 25);
        assert_eq!(config.particle_count(70_000_000), 150);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: StoryConfig = serde_json::from_str(r#"{"seed": 7, "world_geometry_url": null}"#).unwrap();
        assert_eq!(config.seed, 7);
        assert!(config.world_geometry_url.is_none());
        assert_eq!(config.bar_chart_top_n, 15);
    }

    #[test]
    fn test_inverted_particle_bounds_do_not_panic() {
        let config: StoryConfig = serde_json::from_str(r#"{"min_particles": 200}"#).unwrap();
        assert_eq!(config.particle_count(1_000_000), 200);
        assert_eq!(config.particle_count(0), 200);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvertedBounds { field: "particles", min: 200, max: 150 })
        ));
    }

    #[test]
    fn test_from_file_rejects_inverted_bounds() {
        let dir = std::env::temp_dir().join(format!("war_story_config_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("inverted.json");
        std::fs::write(&path, r#"{"modern_start": 1990, "modern_end": 1900}"#).unwrap();
        let err = StoryConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvertedBounds { field: "modern era", .. }));
        assert!(StoryConfig::default().validate().is_ok());
    }
}
