//! Glider sensor data preparation pipeline.
//!
//! This crate provides tools for:
//! - Classifying science dataset channels by originating instrument
//! - Interpolating each instrument's native sampling onto the navigation
//!   time base and merging under instrument-prefixed names
//! - Mapping commanded-waypoint logs onto the dense time base
//! - Segmenting the depth record into numbered dive profiles
//! - Rendering glider track maps
//!
//! # Example
//!
//! ```no_run
//! use glider_pipeline::config::PipelineConfig;
//! use glider_pipeline::core::loaders::{load_nav_csv, load_science_csv};
//! use glider_pipeline::processors::{add_profiles, merge_datasets};
//!
//! let config = PipelineConfig::default();
//! let nav = load_nav_csv("dvl.csv").unwrap();
//! let science = load_science_csv("gdac.csv", "gdac_attrs.yaml").unwrap();
//! let merged = merge_datasets(nav, &science, &config.merge).unwrap();
//! let labeled = add_profiles(merged, &config.profiles).unwrap();
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;
pub mod visualization;

pub use crate::config::{MergeConfig, PipelineConfig, PlotConfig, ProfilesConfig, WaypointConfig};
pub use crate::core::dataset::{Channel, Dataset, InstrumentKind, Provenance};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
