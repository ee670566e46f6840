//! CSV output for augmented datasets.

use std::fs;
use std::path::Path;

use log::debug;
use thiserror::Error;

use crate::core::dataset::{ChannelDim, Dataset};

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Write a dataset to a CSV file.
///
/// The first column is `time` (Unix seconds), followed by every
/// time-dimensioned channel in sorted name order. NaN samples are written
/// as empty fields, round-tripping with the loaders. Profile-dimensioned
/// channels have a different length and are skipped.
pub fn write_dataset_csv(path: &Path, dataset: &Dataset) -> Result<()> {
    ensure_parent_dirs(path)?;

    let wrap = |source: csv::Error| WriteError::CsvError {
        path: path.display().to_string(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(wrap)?;

    let names: Vec<&str> = dataset
        .channels()
        .filter(|(name, ch)| {
            if ch.dim == ChannelDim::Profile {
                debug!("skipping profile-dimensioned channel '{}' in CSV output", name);
                false
            } else {
                true
            }
        })
        .map(|(name, _)| name)
        .collect();

    let mut header = Vec::with_capacity(names.len() + 1);
    header.push("time");
    header.extend(names.iter().copied());
    writer.write_record(&header).map_err(wrap)?;

    let mut row: Vec<String> = Vec::with_capacity(header.len());
    for (i, &t) in dataset.time().iter().enumerate() {
        row.clear();
        row.push(format_value(t));
        for name in &names {
            let value = dataset
                .channel(name)
                .map(|ch| ch.values[i])
                .unwrap_or(f64::NAN);
            row.push(format_value(value));
        }
        writer.write_record(&row).map_err(wrap)?;
    }

    writer.flush().map_err(|e| WriteError::CsvError {
        path: path.display().to_string(),
        source: csv::Error::from(e),
    })?;
    Ok(())
}

fn format_value(value: f64) -> String {
    if value.is_finite() {
        format!("{}", value)
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dataset::Channel;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_write_dataset_csv() {
        let mut ds = Dataset::new(vec![0.0, 4.0]);
        ds.add_channel("depth_from_pressure", Channel::new(vec![1.5, f64::NAN]))
            .unwrap();
        ds.add_channel(
            "per_profile",
            Channel::new(vec![9.0]).with_dim(ChannelDim::Profile),
        )
        .unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        write_dataset_csv(&path, &ds).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "time,depth_from_pressure");
        assert_eq!(lines[1], "0,1.5");
        assert_eq!(lines[2], "4,");
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let mut ds = Dataset::new(vec![0.0]);
        ds.add_channel("a", Channel::new(vec![1.0])).unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        write_dataset_csv(&path, &ds).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_roundtrip_with_loader() {
        let mut ds = Dataset::new(vec![0.0, 4.0, 8.0]);
        ds.add_channel("depth_from_pressure", Channel::new(vec![1.0, 2.0, f64::NAN]))
            .unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("roundtrip.csv");
        write_dataset_csv(&path, &ds).unwrap();

        let loaded = crate::core::loaders::load_nav_csv(&path).unwrap();
        assert_eq!(loaded.time(), ds.time());
        let values = &loaded.channel("depth_from_pressure").unwrap().values;
        assert_eq!(values[0], 1.0);
        assert!(values[2].is_nan());
    }
}
