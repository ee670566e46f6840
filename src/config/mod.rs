//! Configuration types for the glider pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the science/navigation dataset merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Drop a `depth` coordinate reintroduced by axis alignment
    #[serde(default = "default_drop_depth")]
    pub drop_depth_coordinate: bool,
}

fn default_drop_depth() -> bool {
    true
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            drop_depth_coordinate: default_drop_depth(),
        }
    }
}

/// Configuration for waypoint mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaypointConfig {
    /// Extend the last waypoint's target past the end of the log;
    /// when false, samples after the last waypoint stay unassigned (NaN)
    #[serde(default = "default_forward_fill")]
    pub forward_fill: bool,
}

fn default_forward_fill() -> bool {
    true
}

impl Default for WaypointConfig {
    fn default() -> Self {
        Self {
            forward_fill: default_forward_fill(),
        }
    }
}

/// Configuration for profile segmentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilesConfig {
    /// Depth change between consecutive samples marking a dive boundary, in meters
    #[serde(default = "default_depth_threshold")]
    pub depth_threshold: f64,

    /// Nominal sampling interval of the depth record, in seconds
    #[serde(default = "default_nominal_interval")]
    pub nominal_interval_s: f64,
}

fn default_depth_threshold() -> f64 {
    2.0
}

fn default_nominal_interval() -> f64 {
    4.0
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            depth_threshold: default_depth_threshold(),
            nominal_interval_s: default_nominal_interval(),
        }
    }
}

/// Configuration for track map rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotConfig {
    /// Output image width in pixels
    #[serde(default = "default_plot_size")]
    pub width: u32,

    /// Output image height in pixels
    #[serde(default = "default_plot_size")]
    pub height: u32,

    /// Maximum number of track points to plot (subsamples if exceeded)
    #[serde(default = "default_plot_max_points")]
    pub max_points: usize,

    /// Channel holding the platform latitude
    #[serde(default = "default_lat_channel")]
    pub lat_channel: String,

    /// Channel holding the platform longitude
    #[serde(default = "default_lon_channel")]
    pub lon_channel: String,
}

fn default_plot_size() -> u32 {
    1200
}

fn default_plot_max_points() -> usize {
    1_000_000
}

fn default_lat_channel() -> String {
    "latitude".to_string()
}

fn default_lon_channel() -> String {
    "longitude".to_string()
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: default_plot_size(),
            height: default_plot_size(),
            max_points: default_plot_max_points(),
            lat_channel: default_lat_channel(),
            lon_channel: default_lon_channel(),
        }
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub merge: MergeConfig,

    #[serde(default)]
    pub waypoints: WaypointConfig,

    #[serde(default)]
    pub profiles: ProfilesConfig,

    #[serde(default)]
    pub plot: PlotConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profiles_config() {
        let config = ProfilesConfig::default();
        assert_eq!(config.depth_threshold, 2.0);
        assert_eq!(config.nominal_interval_s, 4.0);
    }

    #[test]
    fn test_default_pipeline_config() {
        let config = PipelineConfig::default();
        assert!(config.merge.drop_depth_coordinate);
        assert!(config.waypoints.forward_fill);
        assert_eq!(config.plot.lat_channel, "latitude");
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "profiles:\n  depth_threshold: 3.5\n";
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.profiles.depth_threshold, 3.5);
        assert_eq!(config.profiles.nominal_interval_s, 4.0);
        assert!(config.waypoints.forward_fill);
    }
}
