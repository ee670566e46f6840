//! Loaders for the three external inputs of the pipeline.
//!
//! These are thin boundary wrappers, not part of the alignment core:
//! - navigation (DVL) CSV: the reference time base plus per-sample channels
//! - science (GDAC) CSV plus a YAML attribute sidecar carrying per-channel
//!   origin annotations, validated into [`Provenance`] at ingestion
//! - waypoint log CSV with `time`, `c_wpt_lat`, `c_wpt_lon` columns

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime};
use csv::ReaderBuilder;
use log::debug;
use serde::Deserialize;
use thiserror::Error;

use crate::core::dataset::{
    Channel, ChannelAttrs, ChannelDim, Dataset, DatasetError, InstrumentKind, Provenance,
};
use crate::processors::waypoints::Waypoint;

/// A sparse bathymetry point grid (lon, lat, depth triplets).
#[derive(Debug, Clone, Default)]
pub struct BathymetryGrid {
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
    pub depth: Vec<f64>,
}

impl BathymetryGrid {
    /// Number of grid points.
    #[inline]
    pub fn len(&self) -> usize {
        self.lon.len()
    }

    /// Returns true if the grid has no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lon.is_empty()
    }
}

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Empty file: {0}")]
    EmptyFile(PathBuf),

    #[error("Missing required columns: {0}")]
    MissingColumns(String),

    #[error("Unparseable timestamp: '{0}'")]
    Timestamp(String),

    #[error("Attribute sidecar error: {0}")]
    Sidecar(#[from] serde_yaml::Error),

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Per-channel annotation entry of the science attribute sidecar.
///
/// Mirrors the source dataset's per-variable attributes: an `instrument`
/// identifier, a `source_sensor` marker for channels native to the glider
/// platform, the leading dimension, and optional descriptive metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelAnnotation {
    pub instrument: Option<String>,
    pub source_sensor: Option<String>,
    #[serde(default)]
    pub dims: Vec<String>,
    #[serde(default)]
    pub coordinate: bool,
    pub long_name: Option<String>,
    pub comment: Option<String>,
    pub units: Option<String>,
}

impl ChannelAnnotation {
    fn provenance(&self) -> Provenance {
        if let Some(instrument) = &self.instrument {
            match InstrumentKind::from_annotation(instrument) {
                Some(kind) => Provenance::Instrument(kind),
                None => Provenance::UnknownInstrument(instrument.clone()),
            }
        } else if self.source_sensor.is_some() {
            Provenance::SourceSensor
        } else {
            Provenance::Unannotated
        }
    }

    fn dim(&self) -> ChannelDim {
        if self.dims.first().map(String::as_str) == Some("profile") {
            ChannelDim::Profile
        } else {
            ChannelDim::Time
        }
    }

    fn attrs(&self) -> ChannelAttrs {
        ChannelAttrs {
            long_name: self.long_name.clone(),
            comment: self.comment.clone(),
            units: self.units.clone(),
        }
    }
}

/// Parse a timestamp to Unix seconds.
///
/// Accepts RFC 3339 (`2019-05-14T12:00:00Z`), a space-separated variant
/// (`2019-05-14 12:00:00`, taken as UTC), or a raw epoch-seconds float.
pub fn parse_timestamp(value: &str) -> Result<f64> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_micros()) / 1e6);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(naive.and_utc().timestamp() as f64
            + f64::from(naive.and_utc().timestamp_subsec_micros()) / 1e6);
    }
    if let Ok(epoch) = trimmed.parse::<f64>() {
        return Ok(epoch);
    }
    Err(LoaderError::Timestamp(trimmed.to_string()))
}

fn header_index(headers: &csv::StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim().to_lowercase(), i))
        .collect()
}

fn parse_field(record: &csv::StringRecord, idx: usize) -> f64 {
    record
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
        .unwrap_or(f64::NAN)
}

/// Load a navigation (DVL) dataset from a CSV file.
///
/// The file must have a header row with a `time` column; every other
/// column becomes an unannotated channel with NaN for blank or
/// unparseable fields.
pub fn load_nav_csv<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let path = path.as_ref();
    let (time, columns) = read_table(path)?;

    let mut dataset = Dataset::new(time);
    for (name, values) in columns {
        dataset.add_channel(&name, Channel::new(values))?;
    }
    Ok(dataset)
}

/// Load a science (GDAC) dataset from a CSV file and its attribute sidecar.
///
/// The sidecar is a YAML map from channel name to [`ChannelAnnotation`].
/// Raw annotations are resolved into [`Provenance`] here, once, so
/// downstream stages dispatch on a closed set. Channels with a `profile`
/// leading dimension keep only their finite values (the CSV pads them to
/// the time axis).
pub fn load_science_csv<P: AsRef<Path>>(data_path: P, attrs_path: P) -> Result<Dataset> {
    let data_path = data_path.as_ref();
    let attrs_path = attrs_path.as_ref();

    let sidecar: BTreeMap<String, ChannelAnnotation> =
        serde_yaml::from_reader(BufReader::new(File::open(attrs_path)?))?;

    let (time, columns) = read_table(data_path)?;

    let mut dataset = Dataset::new(time);
    for (name, values) in columns {
        let annotation = sidecar.get(&name).cloned().unwrap_or_default();
        let dim = annotation.dim();
        let values = match dim {
            ChannelDim::Time => values,
            ChannelDim::Profile => values.into_iter().filter(|v| v.is_finite()).collect(),
        };
        let channel = Channel {
            values,
            dim,
            provenance: annotation.provenance(),
            coordinate: annotation.coordinate,
            attrs: annotation.attrs(),
        };
        dataset.add_channel(&name, channel)?;
    }
    debug!(
        "loaded science dataset: {} channels, {} samples",
        dataset.num_channels(),
        dataset.len()
    );
    Ok(dataset)
}

/// Load a waypoint log from a CSV file.
///
/// Requires `time`, `c_wpt_lat`, and `c_wpt_lon` columns. Rows with any
/// missing or unparseable field are dropped, matching the mapper's
/// cleaning contract. Row order in the file is irrelevant; the mapper
/// sorts by time.
pub fn load_waypoint_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Waypoint>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let headers = header_index(reader.headers()?);
    let time_idx = *headers
        .get("time")
        .ok_or_else(|| LoaderError::MissingColumns("time".to_string()))?;
    let lat_idx = *headers
        .get("c_wpt_lat")
        .ok_or_else(|| LoaderError::MissingColumns("c_wpt_lat".to_string()))?;
    let lon_idx = *headers
        .get("c_wpt_lon")
        .ok_or_else(|| LoaderError::MissingColumns("c_wpt_lon".to_string()))?;

    let mut waypoints = Vec::new();
    for result in reader.records() {
        let record = result?;
        let time = match record.get(time_idx).map(str::trim) {
            Some(s) if !s.is_empty() => match parse_timestamp(s) {
                Ok(t) => t,
                Err(_) => continue,
            },
            _ => continue,
        };
        let lat = parse_field(&record, lat_idx);
        let lon = parse_field(&record, lon_idx);
        if !lat.is_finite() || !lon.is_finite() {
            continue;
        }
        waypoints.push(Waypoint { time, lat, lon });
    }
    Ok(waypoints)
}

/// Load a bathymetry point grid from a CSV file with longitude, latitude,
/// and depth columns (`lon`/`longitude`, `lat`/`latitude`, `depth`).
pub fn load_bathymetry_csv<P: AsRef<Path>>(path: P) -> Result<BathymetryGrid> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let headers = header_index(reader.headers()?);
    let pick = |names: &[&str]| -> Result<usize> {
        names
            .iter()
            .find_map(|n| headers.get(*n).copied())
            .ok_or_else(|| LoaderError::MissingColumns(names.join("/")))
    };
    let lon_idx = pick(&["lon", "longitude"])?;
    let lat_idx = pick(&["lat", "latitude"])?;
    let depth_idx = pick(&["depth", "elevation"])?;

    let mut grid = BathymetryGrid::default();
    for result in reader.records() {
        let record = result?;
        let lon = parse_field(&record, lon_idx);
        let lat = parse_field(&record, lat_idx);
        let depth = parse_field(&record, depth_idx);
        if lon.is_finite() && lat.is_finite() && depth.is_finite() {
            grid.lon.push(lon);
            grid.lat.push(lat);
            grid.depth.push(depth);
        }
    }

    if grid.lon.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }
    Ok(grid)
}

/// Read a time-indexed CSV table: the `time` column plus every other
/// column as (name, values) in file order.
fn read_table(path: &Path) -> Result<(Vec<f64>, Vec<(String, Vec<f64>)>)> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let headers = reader.headers()?.clone();
    let index = header_index(&headers);
    let time_idx = *index
        .get("time")
        .ok_or_else(|| LoaderError::MissingColumns("time".to_string()))?;

    let mut time = Vec::new();
    let mut columns: Vec<(String, Vec<f64>)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != time_idx)
        .map(|(_, name)| (name.trim().to_string(), Vec::new()))
        .collect();
    let column_indices: Vec<usize> = (0..headers.len()).filter(|&i| i != time_idx).collect();

    for result in reader.records() {
        let record = result?;
        let raw = record
            .get(time_idx)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| LoaderError::Timestamp(String::new()))?;
        time.push(parse_timestamp(raw)?);

        for (slot, &idx) in columns.iter_mut().zip(&column_indices) {
            slot.1.push(parse_field(&record, idx));
        }
    }

    if time.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }
    Ok((time, columns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(parse_timestamp("100.5").unwrap(), 100.5);
        assert_eq!(
            parse_timestamp("1970-01-01T00:01:00Z").unwrap(),
            60.0
        );
        assert_eq!(parse_timestamp("1970-01-01 00:01:00").unwrap(), 60.0);
        assert!(parse_timestamp("not a time").is_err());
    }

    #[test]
    fn test_load_nav_csv() -> Result<()> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "time,depth_from_pressure,latitude").unwrap();
        writeln!(file, "0,1.5,45.0").unwrap();
        writeln!(file, "4,,45.1").unwrap();
        writeln!(file, "8,3.5,45.2").unwrap();
        file.flush().unwrap();

        let ds = load_nav_csv(file.path())?;
        assert_eq!(ds.time(), &[0.0, 4.0, 8.0]);
        let depth = &ds.channel("depth_from_pressure").unwrap().values;
        assert_eq!(depth[0], 1.5);
        assert!(depth[1].is_nan());

        Ok(())
    }

    #[test]
    fn test_load_nav_csv_missing_time() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "depth,latitude").unwrap();
        writeln!(file, "1.5,45.0").unwrap();
        file.flush().unwrap();

        let result = load_nav_csv(file.path());
        assert!(matches!(result, Err(LoaderError::MissingColumns(_))));
    }

    #[test]
    fn test_load_nav_csv_empty() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "time,depth").unwrap();
        file.flush().unwrap();

        let result = load_nav_csv(file.path());
        assert!(matches!(result, Err(LoaderError::EmptyFile(_))));
    }

    #[test]
    fn test_load_science_csv_with_sidecar() -> Result<()> {
        let mut data = NamedTempFile::new().unwrap();
        writeln!(data, "time,sci_water_temp,latitude,profile_mean,unlisted").unwrap();
        writeln!(data, "0,10.0,45.0,11.5,1").unwrap();
        writeln!(data, "4,,45.1,,2").unwrap();
        data.flush().unwrap();

        let mut attrs = NamedTempFile::new().unwrap();
        writeln!(attrs, "sci_water_temp:").unwrap();
        writeln!(attrs, "  instrument: instrument_ctd").unwrap();
        writeln!(attrs, "  units: degC").unwrap();
        writeln!(attrs, "latitude:").unwrap();
        writeln!(attrs, "  source_sensor: m_gps_lat").unwrap();
        writeln!(attrs, "profile_mean:").unwrap();
        writeln!(attrs, "  dims: [profile]").unwrap();
        attrs.flush().unwrap();

        let ds = load_science_csv(data.path(), attrs.path())?;

        let temp = ds.channel("sci_water_temp").unwrap();
        assert_eq!(
            temp.provenance,
            Provenance::Instrument(InstrumentKind::Ctd)
        );
        assert_eq!(temp.attrs.units.as_deref(), Some("degC"));

        let lat = ds.channel("latitude").unwrap();
        assert_eq!(lat.provenance, Provenance::SourceSensor);

        let per_profile = ds.channel("profile_mean").unwrap();
        assert_eq!(per_profile.dim, ChannelDim::Profile);
        assert_eq!(per_profile.values, vec![11.5]);

        let unlisted = ds.channel("unlisted").unwrap();
        assert_eq!(unlisted.provenance, Provenance::Unannotated);

        Ok(())
    }

    #[test]
    fn test_unknown_instrument_annotation() -> Result<()> {
        let mut data = NamedTempFile::new().unwrap();
        writeln!(data, "time,mystery").unwrap();
        writeln!(data, "0,1.0").unwrap();
        data.flush().unwrap();

        let mut attrs = NamedTempFile::new().unwrap();
        writeln!(attrs, "mystery:").unwrap();
        writeln!(attrs, "  instrument: instrument_adcp").unwrap();
        attrs.flush().unwrap();

        let ds = load_science_csv(data.path(), attrs.path())?;
        assert_eq!(
            ds.channel("mystery").unwrap().provenance,
            Provenance::UnknownInstrument("instrument_adcp".to_string())
        );
        Ok(())
    }

    #[test]
    fn test_load_waypoint_csv() -> Result<()> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "time,c_wpt_lat,c_wpt_lon").unwrap();
        writeln!(file, "0,10.0,-70.0").unwrap();
        writeln!(file, "100,,-70.2").unwrap();
        writeln!(file, "200,10.5,-70.2").unwrap();
        file.flush().unwrap();

        let waypoints = load_waypoint_csv(file.path())?;
        assert_eq!(waypoints.len(), 2);
        assert_eq!(waypoints[0].lat, 10.0);
        assert_eq!(waypoints[1].time, 200.0);

        Ok(())
    }

    #[test]
    fn test_load_waypoint_csv_missing_column() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "time,c_wpt_lat").unwrap();
        writeln!(file, "0,10.0").unwrap();
        file.flush().unwrap();

        let result = load_waypoint_csv(file.path());
        assert!(matches!(result, Err(LoaderError::MissingColumns(_))));
    }

    #[test]
    fn test_load_bathymetry_csv() -> Result<()> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "lon,lat,depth").unwrap();
        writeln!(file, "-70.0,40.0,-120.0").unwrap();
        writeln!(file, "-70.1,40.1,-140.0").unwrap();
        file.flush().unwrap();

        let grid = load_bathymetry_csv(file.path())?;
        assert_eq!(grid.lon.len(), 2);
        assert_eq!(grid.depth[1], -140.0);

        Ok(())
    }
}
