//! Track map rendering for glider missions.
//!
//! This module plots the glider's lat/lon track as a 2D scatter using the
//! plotters library, colored by profile id when the dataset carries one,
//! over an optional bathymetry point underlay.

use std::path::Path;

use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;
use thiserror::Error;

use crate::config::PlotConfig;
use crate::core::dataset::Dataset;
use crate::core::loaders::BathymetryGrid;

/// Errors that can occur during visualization.
#[derive(Error, Debug)]
pub enum VisualizationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Plotting error: {0}")]
    PlottingError(String),

    #[error("dataset has no '{0}' channel")]
    MissingChannel(String),

    #[error("no track points to plot")]
    EmptyTrack,
}

/// Result type for visualization operations.
pub type Result<T> = std::result::Result<T, VisualizationError>;

/// Color palette for profile visualization.
const PROFILE_COLORS: &[(u8, u8, u8)] = &[
    (228, 26, 28),   // Red
    (55, 126, 184),  // Blue
    (77, 175, 74),   // Green
    (152, 78, 163),  // Purple
    (255, 127, 0),   // Orange
    (255, 255, 51),  // Yellow
    (166, 86, 40),   // Brown
    (247, 129, 191), // Pink
    (153, 153, 153), // Gray
    (0, 206, 209),   // Turquoise
    (138, 43, 226),  // Blue Violet
    (50, 205, 50),   // Lime Green
    (255, 20, 147),  // Deep Pink
    (0, 191, 255),   // Deep Sky Blue
    (255, 215, 0),   // Gold
];

/// Track color when no profile ids are available (cornflower blue).
const TRACK_COLOR: (u8, u8, u8) = (100, 149, 237);

/// Color for samples outside every profile (gray).
const NO_PROFILE_COLOR: (u8, u8, u8) = (128, 128, 128);

/// A geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

/// Plot the glider track over optional bathymetry and save as PNG.
///
/// Track points are read from the configured lat/lon channels and colored
/// by `profile_id` when present. Rows where either coordinate is missing
/// are skipped. The title is accepted for interface parity but not drawn
/// (text rendering needs fonts unavailable on headless hosts).
pub fn plot_glider_track(
    output_path: &Path,
    dataset: &Dataset,
    _title: &str,
    bounds: Option<GeoBounds>,
    bathymetry: Option<&BathymetryGrid>,
    config: &PlotConfig,
) -> Result<()> {
    let lat = dataset
        .channel(&config.lat_channel)
        .ok_or_else(|| VisualizationError::MissingChannel(config.lat_channel.clone()))?;
    let lon = dataset
        .channel(&config.lon_channel)
        .ok_or_else(|| VisualizationError::MissingChannel(config.lon_channel.clone()))?;
    let profile_ids = dataset.channel("profile_id");

    let n = dataset.len();
    let step = if n > config.max_points {
        n / config.max_points
    } else {
        1
    };

    let mut points: Vec<(f64, f64, RGBColor)> = Vec::with_capacity(n.min(config.max_points));
    for i in (0..n).step_by(step.max(1)) {
        let (x, y) = (lon.values[i], lat.values[i]);
        if !x.is_finite() || !y.is_finite() {
            continue;
        }
        let color = match profile_ids {
            Some(ch) => {
                let id = ch.values[i];
                if id < 0.0 || !id.is_finite() {
                    RGBColor(NO_PROFILE_COLOR.0, NO_PROFILE_COLOR.1, NO_PROFILE_COLOR.2)
                } else {
                    let c = PROFILE_COLORS[(id as usize) % PROFILE_COLORS.len()];
                    RGBColor(c.0, c.1, c.2)
                }
            }
            None => RGBColor(TRACK_COLOR.0, TRACK_COLOR.1, TRACK_COLOR.2),
        };
        points.push((x, y, color));
    }

    if points.is_empty() {
        return Err(VisualizationError::EmptyTrack);
    }

    let (x_range, y_range) = match bounds {
        Some(b) => (b.lon_min..b.lon_max, b.lat_min..b.lat_max),
        None => {
            let (x_min, x_max, y_min, y_max) = compute_bounds(&points, bathymetry);
            let x_pad = (x_max - x_min) * 0.05;
            let y_pad = (y_max - y_min) * 0.05;
            ((x_min - x_pad)..(x_max + x_pad), (y_min - y_pad)..(y_max + y_pad))
        }
    };

    let root =
        BitMapBackend::new(output_path, (config.width, config.height)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .build_cartesian_2d(x_range, y_range)
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .draw()
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    if let Some(grid) = bathymetry {
        let (d_min, d_max) = depth_range(&grid.depth);
        chart
            .draw_series((0..grid.len()).map(|i| {
                let shade = depth_shade(grid.depth[i], d_min, d_max);
                Circle::new(
                    (grid.lon[i], grid.lat[i]),
                    3,
                    RGBColor(shade, shade, shade).filled(),
                )
            }))
            .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;
    }

    chart
        .draw_series(
            points
                .iter()
                .map(|(x, y, color)| Circle::new((*x, *y), 2, color.filled())),
        )
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    root.present()
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    Ok(())
}

/// Compute the bounds (min/max) covering the track and any bathymetry.
fn compute_bounds(
    points: &[(f64, f64, RGBColor)],
    bathymetry: Option<&BathymetryGrid>,
) -> (f64, f64, f64, f64) {
    let mut x_min = f64::MAX;
    let mut x_max = f64::MIN;
    let mut y_min = f64::MAX;
    let mut y_max = f64::MIN;

    let mut update = |x: f64, y: f64| {
        if x < x_min {
            x_min = x;
        }
        if x > x_max {
            x_max = x;
        }
        if y < y_min {
            y_min = y;
        }
        if y > y_max {
            y_max = y;
        }
    };

    for (x, y, _) in points {
        update(*x, *y);
    }
    if let Some(grid) = bathymetry {
        for i in 0..grid.len() {
            update(grid.lon[i], grid.lat[i]);
        }
    }

    if (x_max - x_min).abs() < f64::EPSILON {
        x_min -= 0.01;
        x_max += 0.01;
    }
    if (y_max - y_min).abs() < f64::EPSILON {
        y_min -= 0.01;
        y_max += 0.01;
    }

    (x_min, x_max, y_min, y_max)
}

fn depth_range(depth: &[f64]) -> (f64, f64) {
    let mut min = f64::MAX;
    let mut max = f64::MIN;
    for &d in depth {
        if d < min {
            min = d;
        }
        if d > max {
            max = d;
        }
    }
    (min, max)
}

/// Map a depth to a grayscale shade: deeper water renders darker.
fn depth_shade(depth: f64, min: f64, max: f64) -> u8 {
    if (max - min).abs() < f64::EPSILON {
        return 200;
    }
    let frac = (depth - min) / (max - min);
    (120.0 + frac * 115.0).clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dataset::Channel;
    use tempfile::TempDir;

    #[test]
    fn test_compute_bounds_covers_track_and_bathymetry() {
        let points = vec![
            (-70.0, 40.0, RGBColor(0, 0, 0)),
            (-70.2, 40.2, RGBColor(0, 0, 0)),
        ];
        let grid = BathymetryGrid {
            lon: vec![-70.5],
            lat: vec![39.5],
            depth: vec![-100.0],
        };
        let (x_min, x_max, y_min, y_max) = compute_bounds(&points, Some(&grid));
        assert_eq!(x_min, -70.5);
        assert_eq!(x_max, -70.0);
        assert_eq!(y_min, 39.5);
        assert_eq!(y_max, 40.2);
    }

    #[test]
    fn test_compute_bounds_degenerate_point() {
        let points = vec![(-70.0, 40.0, RGBColor(0, 0, 0))];
        let (x_min, x_max, y_min, y_max) = compute_bounds(&points, None);
        assert!(x_max > x_min);
        assert!(y_max > y_min);
    }

    #[test]
    fn test_depth_shade_darker_when_deeper() {
        let shallow = depth_shade(-10.0, -200.0, -10.0);
        let deep = depth_shade(-200.0, -200.0, -10.0);
        assert!(deep < shallow);
    }

    #[test]
    fn test_plot_missing_channels() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("track.png");
        let ds = Dataset::new(vec![0.0]);

        let result =
            plot_glider_track(&path, &ds, "mission", None, None, &PlotConfig::default());
        assert!(matches!(
            result,
            Err(VisualizationError::MissingChannel(_))
        ));
    }

    #[test]
    fn test_plot_empty_track() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("track.png");

        let mut ds = Dataset::new(vec![0.0]);
        ds.add_channel("latitude", Channel::new(vec![f64::NAN]))
            .unwrap();
        ds.add_channel("longitude", Channel::new(vec![f64::NAN]))
            .unwrap();

        let result =
            plot_glider_track(&path, &ds, "mission", None, None, &PlotConfig::default());
        assert!(matches!(result, Err(VisualizationError::EmptyTrack)));
    }
}
