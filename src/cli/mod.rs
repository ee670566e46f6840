//! Command-line interface for the glider pipeline.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{PipelineConfig, ProfilesConfig};
use crate::core::dataset::Dataset;
use crate::core::loaders;
use crate::core::writers::write_dataset_csv;
use crate::processors::merge::merge_datasets;
use crate::processors::profiles::add_profiles;
use crate::processors::waypoints::{map_waypoints, WaypointError};
use crate::visualization::{self, GeoBounds};

/// Mission input file names expected by the batch runner.
const NAV_FILE: &str = "dvl.csv";
const SCIENCE_FILE: &str = "gdac.csv";
const SCIENCE_ATTRS_FILE: &str = "gdac_attrs.yaml";
const WAYPOINT_FILE: &str = "waypoints.csv";

#[derive(Parser)]
#[command(name = "glider-pipeline")]
#[command(about = "Glider sensor data preparation pipeline", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a science dataset onto the navigation time base
    Merge {
        /// Navigation (DVL) dataset CSV
        nav_csv: PathBuf,
        /// Science (GDAC) dataset CSV
        science_csv: PathBuf,
        /// YAML attribute sidecar for the science dataset
        science_attrs: PathBuf,
        /// Output CSV file
        output: PathBuf,
    },

    /// Map a commanded-waypoint log onto a dataset's time base
    Waypoints {
        /// Dataset CSV to augment
        dataset_csv: PathBuf,
        /// Waypoint log CSV (time, c_wpt_lat, c_wpt_lon)
        waypoints_csv: PathBuf,
        /// Output CSV file
        output: PathBuf,
        /// Leave samples after the last waypoint unassigned
        #[arg(long)]
        no_forward_fill: bool,
    },

    /// Segment a dataset's depth record into numbered dive profiles
    Profiles {
        /// Dataset CSV with a depth_from_pressure channel
        dataset_csv: PathBuf,
        /// Output CSV file
        output: PathBuf,
        /// Depth-delta threshold in meters marking a dive boundary
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Run the full pipeline (merge, waypoints, profiles) for one mission
    Run {
        /// Navigation (DVL) dataset CSV
        nav_csv: PathBuf,
        /// Science (GDAC) dataset CSV
        science_csv: PathBuf,
        /// YAML attribute sidecar for the science dataset
        science_attrs: PathBuf,
        /// Output CSV file
        output: PathBuf,
        /// Optional waypoint log CSV
        #[arg(short, long)]
        waypoints_csv: Option<PathBuf>,
    },

    /// Process a directory of mission subdirectories in parallel
    Batch {
        /// Directory with one subdirectory per mission (dvl.csv, gdac.csv,
        /// gdac_attrs.yaml, optional waypoints.csv)
        missions_dir: PathBuf,
        /// Output directory for merged CSVs
        output_dir: PathBuf,
        /// Limit number of missions to process
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Render a glider track map as PNG
    Plot {
        /// Dataset CSV with latitude/longitude channels
        dataset_csv: PathBuf,
        /// Output PNG file path (defaults to the dataset name with .png)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Optional bathymetry point grid CSV (lon, lat, depth)
        #[arg(long)]
        bathymetry: Option<PathBuf>,
        /// Geographic bounds: lon_min lon_max lat_min lat_max
        #[arg(long, num_args = 4, allow_negative_numbers = true)]
        bounds: Option<Vec<f64>>,
        /// Title for the plot
        #[arg(long)]
        title: Option<String>,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.len() > 39 {
            format!("{}...", &value[..36])
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}, using defaults",
                    path.display(),
                    e
                );
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    };

    // Dispatch to subcommands
    match cli.command {
        Commands::Merge {
            nav_csv,
            science_csv,
            science_attrs,
            output,
        } => {
            cmd_merge(&nav_csv, &science_csv, &science_attrs, &output, &config);
        }
        Commands::Waypoints {
            dataset_csv,
            waypoints_csv,
            output,
            no_forward_fill,
        } => {
            cmd_waypoints(&dataset_csv, &waypoints_csv, &output, no_forward_fill, &config);
        }
        Commands::Profiles {
            dataset_csv,
            output,
            threshold,
        } => {
            cmd_profiles(&dataset_csv, &output, threshold, &config);
        }
        Commands::Run {
            nav_csv,
            science_csv,
            science_attrs,
            output,
            waypoints_csv,
        } => {
            cmd_run(
                &nav_csv,
                &science_csv,
                &science_attrs,
                waypoints_csv.as_deref(),
                &output,
                &config,
            );
        }
        Commands::Batch {
            missions_dir,
            output_dir,
            limit,
        } => {
            cmd_batch(&missions_dir, &output_dir, limit, &config);
        }
        Commands::Plot {
            dataset_csv,
            output,
            bathymetry,
            bounds,
            title,
        } => {
            cmd_plot(&dataset_csv, output, bathymetry, bounds, title, &config);
        }
    }
}

fn cmd_merge(
    nav_csv: &Path,
    science_csv: &Path,
    science_attrs: &Path,
    output: &Path,
    config: &PipelineConfig,
) {
    let start = Instant::now();

    println!("Merging science data onto the navigation time base...");
    println!("Navigation: {}", nav_csv.display());
    println!("Science: {}", science_csv.display());

    let spinner = create_spinner("Classifying, interpolating, and merging...");

    let result = (|| -> Result<Dataset> {
        let nav = loaders::load_nav_csv(nav_csv)
            .with_context(|| format!("loading navigation dataset {}", nav_csv.display()))?;
        let science = loaders::load_science_csv(science_csv, science_attrs)
            .with_context(|| format!("loading science dataset {}", science_csv.display()))?;
        let merged = merge_datasets(nav, &science, &config.merge)?;
        write_dataset_csv(output, &merged)?;
        Ok(merged)
    })();

    spinner.finish_and_clear();

    match result {
        Ok(merged) => {
            print_summary(
                "Merge Complete",
                &[
                    ("Navigation file", nav_csv.display().to_string()),
                    ("Science file", science_csv.display().to_string()),
                    ("Output file", output.display().to_string()),
                    ("Samples", merged.len().to_string()),
                    ("Channels", merged.num_channels().to_string()),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            error!("Merge failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_waypoints(
    dataset_csv: &Path,
    waypoints_csv: &Path,
    output: &Path,
    no_forward_fill: bool,
    config: &PipelineConfig,
) {
    let start = Instant::now();

    println!("Mapping waypoints onto the dataset time base...");
    println!("Dataset: {}", dataset_csv.display());
    println!("Waypoints: {}", waypoints_csv.display());

    let spinner = create_spinner("Collapsing and mapping waypoints...");

    let mut waypoint_config = config.waypoints.clone();
    if no_forward_fill {
        waypoint_config.forward_fill = false;
    }

    let result = (|| -> Result<(Dataset, usize)> {
        let dataset = loaders::load_nav_csv(dataset_csv)
            .with_context(|| format!("loading dataset {}", dataset_csv.display()))?;
        let waypoints = loaders::load_waypoint_csv(waypoints_csv)
            .with_context(|| format!("loading waypoint log {}", waypoints_csv.display()))?;
        let num_raw = waypoints.len();
        let mapped = map_waypoints(dataset, &waypoints, &waypoint_config)?;
        write_dataset_csv(output, &mapped)?;
        Ok((mapped, num_raw))
    })();

    spinner.finish_and_clear();

    match result {
        Ok((mapped, num_raw)) => {
            print_summary(
                "Waypoint Mapping Complete",
                &[
                    ("Dataset file", dataset_csv.display().to_string()),
                    ("Waypoint file", waypoints_csv.display().to_string()),
                    ("Output file", output.display().to_string()),
                    ("Raw waypoints", num_raw.to_string()),
                    ("Samples", mapped.len().to_string()),
                    ("Forward fill", waypoint_config.forward_fill.to_string()),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            error!("Waypoint mapping failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_profiles(
    dataset_csv: &Path,
    output: &Path,
    threshold: Option<f64>,
    config: &PipelineConfig,
) {
    let start = Instant::now();

    let profiles_config = ProfilesConfig {
        depth_threshold: threshold.unwrap_or(config.profiles.depth_threshold),
        ..config.profiles.clone()
    };

    println!("Segmenting depth record into dive profiles...");
    println!("Dataset: {}", dataset_csv.display());
    println!("Depth threshold: {} m", profiles_config.depth_threshold);

    let spinner = create_spinner("Detecting dive boundaries...");

    let result = (|| -> Result<Dataset> {
        let dataset = loaders::load_nav_csv(dataset_csv)
            .with_context(|| format!("loading dataset {}", dataset_csv.display()))?;
        let labeled = add_profiles(dataset, &profiles_config)?;
        write_dataset_csv(output, &labeled)?;
        Ok(labeled)
    })();

    spinner.finish_and_clear();

    match result {
        Ok(labeled) => {
            let ids = labeled
                .channel("profile_id")
                .map(|ch| ch.values.as_slice())
                .unwrap_or(&[]);
            let num_profiles = ids
                .iter()
                .filter(|v| v.is_finite() && **v >= 0.0)
                .fold(-1.0f64, |acc, &v| acc.max(v))
                + 1.0;
            let unassigned = ids.iter().filter(|&&v| v < 0.0).count();

            print_summary(
                "Profile Segmentation Complete",
                &[
                    ("Dataset file", dataset_csv.display().to_string()),
                    ("Output file", output.display().to_string()),
                    ("Samples", labeled.len().to_string()),
                    ("Profiles found", (num_profiles as i64).to_string()),
                    ("Unassigned samples", unassigned.to_string()),
                    ("Threshold (m)", profiles_config.depth_threshold.to_string()),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            error!("Profile segmentation failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Run the full pipeline for one mission: merge, then waypoints, then
/// profile segmentation.
///
/// An empty waypoint log is a degenerate input, not a failure: the stage
/// is skipped with a warning and the rest of the pipeline proceeds.
fn run_mission(
    nav_csv: &Path,
    science_csv: &Path,
    science_attrs: &Path,
    waypoints_csv: Option<&Path>,
    config: &PipelineConfig,
) -> Result<Dataset> {
    let nav = loaders::load_nav_csv(nav_csv)
        .with_context(|| format!("loading navigation dataset {}", nav_csv.display()))?;
    let science = loaders::load_science_csv(science_csv, science_attrs)
        .with_context(|| format!("loading science dataset {}", science_csv.display()))?;

    let mut dataset = merge_datasets(nav, &science, &config.merge)?;

    if let Some(waypoints_path) = waypoints_csv {
        let waypoints = loaders::load_waypoint_csv(waypoints_path)
            .with_context(|| format!("loading waypoint log {}", waypoints_path.display()))?;
        dataset = match map_waypoints(dataset.clone(), &waypoints, &config.waypoints) {
            Ok(mapped) => mapped,
            Err(WaypointError::EmptyLog) => {
                warn!(
                    "waypoint log {} has no usable rows, skipping waypoint mapping",
                    waypoints_path.display()
                );
                dataset
            }
            Err(e) => return Err(e.into()),
        };
    }

    let labeled = add_profiles(dataset, &config.profiles)?;
    Ok(labeled)
}

fn cmd_run(
    nav_csv: &Path,
    science_csv: &Path,
    science_attrs: &Path,
    waypoints_csv: Option<&Path>,
    output: &Path,
    config: &PipelineConfig,
) {
    let start = Instant::now();

    println!("Running full pipeline...");
    println!("Navigation: {}", nav_csv.display());
    println!("Science: {}", science_csv.display());
    if let Some(w) = waypoints_csv {
        println!("Waypoints: {}", w.display());
    }

    let spinner = create_spinner("Merging, mapping, segmenting...");

    let result = run_mission(nav_csv, science_csv, science_attrs, waypoints_csv, config)
        .and_then(|dataset| {
            write_dataset_csv(output, &dataset)?;
            Ok(dataset)
        });

    spinner.finish_and_clear();

    match result {
        Ok(dataset) => {
            print_summary(
                "Pipeline Complete",
                &[
                    ("Navigation file", nav_csv.display().to_string()),
                    ("Science file", science_csv.display().to_string()),
                    ("Output file", output.display().to_string()),
                    ("Samples", dataset.len().to_string()),
                    ("Channels", dataset.num_channels().to_string()),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            error!("Pipeline failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_batch(
    missions_dir: &Path,
    output_dir: &Path,
    limit: Option<usize>,
    config: &PipelineConfig,
) {
    let start = Instant::now();

    println!("Processing missions in batch mode...");
    println!("Missions directory: {}", missions_dir.display());
    println!("Output directory: {}", output_dir.display());

    let mut missions: Vec<PathBuf> = match fs::read_dir(missions_dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir() && path.join(NAV_FILE).exists())
            .collect(),
        Err(e) => {
            error!("Failed to read {}: {}", missions_dir.display(), e);
            std::process::exit(1);
        }
    };
    missions.sort();
    missions.truncate(limit.unwrap_or(usize::MAX));

    if missions.is_empty() {
        error!(
            "No mission directories with a {} file found in {}",
            NAV_FILE,
            missions_dir.display()
        );
        std::process::exit(1);
    }

    // Missions are independent, so each one is a parallel work item.
    let outcomes: Vec<bool> = missions
        .par_iter()
        .map(|mission| {
            let name = mission
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "mission".to_string());
            let waypoints_path = mission.join(WAYPOINT_FILE);
            let waypoints = waypoints_path.exists().then_some(waypoints_path);

            let result = run_mission(
                &mission.join(NAV_FILE),
                &mission.join(SCIENCE_FILE),
                &mission.join(SCIENCE_ATTRS_FILE),
                waypoints.as_deref(),
                config,
            )
            .and_then(|dataset| {
                let out = output_dir.join(format!("{}_merged.csv", name));
                write_dataset_csv(&out, &dataset)?;
                Ok((dataset, out))
            });

            match result {
                Ok((dataset, out)) => {
                    println!(
                        "[{}] {} samples, {} channels -> {}",
                        name,
                        dataset.len(),
                        dataset.num_channels(),
                        out.display()
                    );
                    true
                }
                Err(e) => {
                    eprintln!("[{}] Failed: {:#}", name, e);
                    false
                }
            }
        })
        .collect();

    let succeeded = outcomes.iter().filter(|&&ok| ok).count();

    print_summary(
        "Batch Complete",
        &[
            ("Missions directory", missions_dir.display().to_string()),
            ("Output directory", output_dir.display().to_string()),
            ("Missions processed", outcomes.len().to_string()),
            ("Succeeded", succeeded.to_string()),
            ("Failed", (outcomes.len() - succeeded).to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
}

fn cmd_plot(
    dataset_csv: &Path,
    output: Option<PathBuf>,
    bathymetry: Option<PathBuf>,
    bounds: Option<Vec<f64>>,
    title: Option<String>,
    config: &PipelineConfig,
) {
    let start = Instant::now();

    // Determine output path (default to the dataset name with .png)
    let output_path = output.unwrap_or_else(|| {
        let mut path = dataset_csv.to_path_buf();
        path.set_extension("png");
        path
    });

    let plot_title = title.unwrap_or_else(|| {
        dataset_csv
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Glider Track".to_string())
    });

    let geo_bounds = bounds.map(|b| GeoBounds {
        lon_min: b[0],
        lon_max: b[1],
        lat_min: b[2],
        lat_max: b[3],
    });

    println!("Rendering glider track map...");
    println!("Dataset: {}", dataset_csv.display());
    println!("Output: {}", output_path.display());

    let spinner = create_spinner("Loading track data...");

    let result = (|| -> Result<Dataset> {
        let dataset = loaders::load_nav_csv(dataset_csv)
            .with_context(|| format!("loading dataset {}", dataset_csv.display()))?;
        let grid = match &bathymetry {
            Some(path) => Some(loaders::load_bathymetry_csv(path).with_context(|| {
                format!("loading bathymetry grid {}", path.display())
            })?),
            None => None,
        };

        spinner.set_message("Generating map...");
        visualization::plot_glider_track(
            &output_path,
            &dataset,
            &plot_title,
            geo_bounds,
            grid.as_ref(),
            &config.plot,
        )?;
        Ok(dataset)
    })();

    spinner.finish_and_clear();

    match result {
        Ok(dataset) => {
            print_summary(
                "Track Map Complete",
                &[
                    ("Dataset file", dataset_csv.display().to_string()),
                    ("Output PNG", output_path.display().to_string()),
                    ("Track samples", dataset.len().to_string()),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            error!("Track map failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
