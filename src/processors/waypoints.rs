//! Mapping the commanded-waypoint log onto the navigation time base.
//!
//! The glider engineering log records the commanded target latitude and
//! longitude as sparse, event-based updates. Each reference sample is
//! assigned the most recent target as of its timestamp.

use log::info;
use thiserror::Error;

use crate::config::WaypointConfig;
use crate::core::dataset::{Channel, ChannelAttrs, Dataset, DatasetError};

/// A commanded navigation target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    /// Unix seconds.
    pub time: f64,
    /// Target latitude in degrees.
    pub lat: f64,
    /// Target longitude in degrees.
    pub lon: f64,
}

/// Errors that can occur during waypoint mapping.
#[derive(Debug, Error)]
pub enum WaypointError {
    #[error("no usable waypoints after cleaning the log")]
    EmptyLog,

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// Result type for waypoint operations.
pub type Result<T> = std::result::Result<T, WaypointError>;

/// Clean and collapse a waypoint log.
///
/// Rows with any non-finite field are dropped and the log is sorted by
/// time rather than trusting caller order. Consecutive rows whose latitude
/// and longitude deltas are both exactly zero are redundant (the target
/// has not changed) and are discarded; the first row is always retained.
pub fn collapse_waypoints(waypoints: &[Waypoint]) -> Vec<Waypoint> {
    let mut cleaned: Vec<Waypoint> = waypoints
        .iter()
        .filter(|w| w.time.is_finite() && w.lat.is_finite() && w.lon.is_finite())
        .copied()
        .collect();
    cleaned.sort_by(|a, b| a.time.total_cmp(&b.time));

    let mut collapsed = Vec::with_capacity(cleaned.len());
    for (i, w) in cleaned.iter().enumerate() {
        if i > 0 {
            let prev = cleaned[i - 1];
            if w.lat - prev.lat == 0.0 && w.lon - prev.lon == 0.0 {
                continue;
            }
        }
        collapsed.push(*w);
    }
    collapsed
}

/// Map the waypoint log onto the dataset's time base.
///
/// Strict interval semantics: the first waypoint covers every reference
/// timestamp up to and including its own; each subsequent waypoint covers
/// the open-closed interval from the previous waypoint's timestamp to its
/// own. Reference timestamps past the last waypoint inherit its target
/// when `forward_fill` is set, and stay unassigned (NaN) otherwise.
///
/// Adds `waypoint_lat` and `waypoint_lon` channels to the dataset. An
/// empty log after cleaning yields [`WaypointError::EmptyLog`]: missions
/// with incomplete engineering telemetry are a degenerate input, not a
/// crash.
pub fn map_waypoints(
    mut dataset: Dataset,
    waypoints: &[Waypoint],
    config: &WaypointConfig,
) -> Result<Dataset> {
    let collapsed = collapse_waypoints(waypoints);
    if collapsed.is_empty() {
        return Err(WaypointError::EmptyLog);
    }
    info!(
        "mapping {} waypoints ({} redundant rows collapsed) onto {} samples",
        collapsed.len(),
        waypoints.len().saturating_sub(collapsed.len()),
        dataset.len()
    );

    let time = dataset.time();
    let mut lat = vec![f64::NAN; time.len()];
    let mut lon = vec![f64::NAN; time.len()];

    let mut start = 0usize;
    for (n, w) in collapsed.iter().enumerate() {
        let end = time.partition_point(|&t| t <= w.time);
        let lo = if n == 0 { 0 } else { start };
        for i in lo..end {
            lat[i] = w.lat;
            lon[i] = w.lon;
        }
        start = end;
    }

    if config.forward_fill {
        if let Some(last) = collapsed.last() {
            for i in start..time.len() {
                lat[i] = last.lat;
                lon[i] = last.lon;
            }
        }
    }

    dataset.add_channel(
        "waypoint_lat",
        Channel::new(lat).with_attrs(ChannelAttrs {
            long_name: Some("Glider Waypoint Latitude".to_string()),
            comment: Some("The target waypoint latitude for the glider.".to_string()),
            units: Some("degrees".to_string()),
        }),
    )?;
    dataset.add_channel(
        "waypoint_lon",
        Channel::new(lon).with_attrs(ChannelAttrs {
            long_name: Some("Glider Waypoint Longitude".to_string()),
            comment: Some("The target waypoint longitude for the glider.".to_string()),
            units: Some("degrees".to_string()),
        }),
    )?;

    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wpt(time: f64, lat: f64, lon: f64) -> Waypoint {
        Waypoint { time, lat, lon }
    }

    #[test]
    fn test_collapse_drops_duplicate_runs() {
        let log = vec![
            wpt(0.0, 10.0, -70.0),
            wpt(0.0, 10.0, -70.0),
            wpt(100.0, 10.5, -70.2),
        ];
        let collapsed = collapse_waypoints(&log);
        assert_eq!(
            collapsed,
            vec![wpt(0.0, 10.0, -70.0), wpt(100.0, 10.5, -70.2)]
        );
    }

    #[test]
    fn test_collapse_is_idempotent() {
        let log = vec![
            wpt(0.0, 10.0, -70.0),
            wpt(50.0, 10.0, -70.0),
            wpt(50.0, 10.0, -70.1),
            wpt(100.0, 10.0, -70.1),
        ];
        let once = collapse_waypoints(&log);
        let twice = collapse_waypoints(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_collapse_drops_missing_fields_and_sorts() {
        let log = vec![
            wpt(100.0, 10.5, -70.2),
            wpt(50.0, f64::NAN, -70.0),
            wpt(0.0, 10.0, -70.0),
        ];
        let collapsed = collapse_waypoints(&log);
        assert_eq!(
            collapsed,
            vec![wpt(0.0, 10.0, -70.0), wpt(100.0, 10.5, -70.2)]
        );
    }

    #[test]
    fn test_map_strict_interval_semantics() {
        // Reference timestamps straddling two waypoints at t=10 and t=20.
        let ds = Dataset::new(vec![0.0, 10.0, 15.0, 20.0, 25.0]);
        let log = vec![
            wpt(10.0, 10.0, -70.0),
            wpt(10.0, 10.0, -70.0),
            wpt(20.0, 10.5, -70.2),
        ];
        let mapped = map_waypoints(ds, &log, &WaypointConfig::default()).unwrap();

        let lat = &mapped.channel("waypoint_lat").unwrap().values;
        let lon = &mapped.channel("waypoint_lon").unwrap().values;

        // t <= 10 takes the first waypoint, (10, 20] takes the second.
        assert_eq!(lat[0], 10.0);
        assert_eq!(lat[1], 10.0);
        assert_eq!(lat[2], 10.5);
        assert_eq!(lat[3], 10.5);
        assert_eq!(lon[0], -70.0);
        assert_eq!(lon[2], -70.2);

        // Past the last waypoint: forward fill by default.
        assert_eq!(lat[4], 10.5);
        assert_eq!(lon[4], -70.2);
    }

    #[test]
    fn test_map_without_forward_fill() {
        let ds = Dataset::new(vec![0.0, 10.0, 25.0]);
        let log = vec![wpt(10.0, 10.0, -70.0)];
        let config = WaypointConfig {
            forward_fill: false,
        };
        let mapped = map_waypoints(ds, &log, &config).unwrap();

        let lat = &mapped.channel("waypoint_lat").unwrap().values;
        assert_eq!(lat[0], 10.0);
        assert_eq!(lat[1], 10.0);
        assert!(lat[2].is_nan());
    }

    #[test]
    fn test_map_empty_log() {
        let ds = Dataset::new(vec![0.0, 1.0]);
        let log = vec![wpt(0.0, f64::NAN, -70.0)];
        let result = map_waypoints(ds, &log, &WaypointConfig::default());
        assert!(matches!(result, Err(WaypointError::EmptyLog)));
    }

    #[test]
    fn test_output_channel_attrs() {
        let ds = Dataset::new(vec![0.0]);
        let mapped =
            map_waypoints(ds, &[wpt(0.0, 1.0, 2.0)], &WaypointConfig::default()).unwrap();
        let attrs = &mapped.channel("waypoint_lat").unwrap().attrs;
        assert_eq!(attrs.units.as_deref(), Some("degrees"));
        assert!(attrs.long_name.as_deref().unwrap().contains("Latitude"));
    }
}
