//! Merging the multi-instrument science dataset onto the navigation time base.
//!
//! Each instrument group is split out of the science dataset at its native
//! sampling, interpolated onto the navigation dataset's time axis, renamed
//! with a source-instrument prefix, and merged in. Linear extrapolation at
//! the edges trades physically implausible values just outside an
//! instrument's active window for full reference-timebase coverage.

use log::{debug, info};
use thiserror::Error;

use crate::config::MergeConfig;
use crate::core::dataset::{Channel, ChannelDim, Dataset, DatasetError};
use crate::processors::classify::classify;

/// Errors that can occur while splitting and merging sensor data.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("channel '{name}' not found in the science dataset")]
    MissingChannel { name: String },

    #[error("merged channel name collision on '{name}' while merging the {group} group")]
    Collision { name: String, group: &'static str },

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// Result type for merge operations.
pub type Result<T> = std::result::Result<T, MergeError>;

/// Split the named channels out of a dataset at their native sampling.
///
/// Selects exactly the given channel names, then removes every row where
/// all of them are simultaneously missing. Rows with partial missingness
/// are retained: channels in the same instrument group may sample at a
/// slight phase offset, and each channel is later interpolated from its
/// own finite samples.
pub fn split_channels(dataset: &Dataset, names: &[String]) -> Result<Dataset> {
    let mut selected = Vec::with_capacity(names.len());
    for name in names {
        let channel = dataset
            .channel(name)
            .ok_or_else(|| MergeError::MissingChannel { name: name.clone() })?;
        selected.push(channel);
    }

    let mask: Vec<bool> = (0..dataset.len())
        .map(|i| {
            selected
                .iter()
                .any(|ch| ch.dim == ChannelDim::Time && ch.values[i].is_finite())
        })
        .collect();

    let sub = dataset.select(names)?.retain_rows(&mask);
    Ok(sub)
}

/// Piecewise-linear interpolation of `(time, values)` onto `query` times.
///
/// Only finite (time, value) pairs participate, so NaN-padded samples in a
/// partially-missing channel do not poison their neighbors. Query times
/// outside the sample range extrapolate linearly from the nearest edge
/// segment. A channel with one finite sample extrapolates as a constant;
/// with none, the result is all NaN.
pub fn interp_onto(time: &[f64], values: &[f64], query: &[f64]) -> Vec<f64> {
    let mut points: Vec<(f64, f64)> = time
        .iter()
        .zip(values)
        .filter(|(t, v)| t.is_finite() && v.is_finite())
        .map(|(&t, &v)| (t, v))
        .collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    points.dedup_by(|a, b| a.0 == b.0);

    match points.len() {
        0 => vec![f64::NAN; query.len()],
        1 => vec![points[0].1; query.len()],
        _ => query.iter().map(|&t| lerp_at(&points, t)).collect(),
    }
}

fn lerp_at(points: &[(f64, f64)], t: f64) -> f64 {
    let n = points.len();
    let idx = points.partition_point(|p| p.0 < t);

    // An exact hit reproduces the sample value bit-for-bit.
    if idx < n && points[idx].0 == t {
        return points[idx].1;
    }

    let seg = if idx == 0 {
        0
    } else if idx >= n {
        n - 2
    } else {
        idx - 1
    };
    let (x0, y0) = points[seg];
    let (x1, y1) = points[seg + 1];
    y0 + (t - x0) * (y1 - y0) / (x1 - x0)
}

/// Merge the science dataset into the navigation reference dataset.
///
/// For each non-empty instrument group, in the fixed merge order: split the
/// group's channels at their native sampling, rename them to
/// `"{group}_{name}"` (coordinates keep their name), interpolate onto the
/// reference time axis with edge extrapolation, and merge. A `depth`
/// coordinate reintroduced by the axis alignment is dropped. Any output
/// name collision is a fatal integrity violation: it indicates a
/// classification or prefixing bug and aborts the full merge rather than
/// silently overwriting.
pub fn merge_datasets(
    mut reference: Dataset,
    science: &Dataset,
    config: &MergeConfig,
) -> Result<Dataset> {
    let groups = classify(science);

    for (kind, names) in groups.merge_groups() {
        if names.is_empty() {
            continue;
        }
        let sub = split_channels(science, names)?;
        info!(
            "merging {} group: {} channels over {} native samples",
            kind.label(),
            names.len(),
            sub.len()
        );

        for (name, channel) in sub.channels() {
            if channel.dim == ChannelDim::Profile {
                continue;
            }

            let out_name = if channel.coordinate {
                if name == "depth" && config.drop_depth_coordinate {
                    debug!("dropping depth coordinate from {} group", kind.label());
                    continue;
                }
                name.to_string()
            } else {
                format!("{}_{}", kind.label(), name)
            };

            if reference.has_channel(&out_name) {
                return Err(MergeError::Collision {
                    name: out_name,
                    group: kind.label(),
                });
            }

            let interpolated = interp_onto(sub.time(), &channel.values, reference.time());
            let merged = Channel {
                values: interpolated,
                dim: ChannelDim::Time,
                provenance: channel.provenance.clone(),
                coordinate: false,
                attrs: channel.attrs.clone(),
            };
            reference.add_channel(&out_name, merged)?;
        }
    }

    Ok(reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dataset::{InstrumentKind, Provenance};

    fn channel_of(kind: InstrumentKind, values: Vec<f64>) -> Channel {
        Channel::new(values).with_provenance(Provenance::Instrument(kind))
    }

    #[test]
    fn test_split_drops_all_missing_rows() {
        let mut ds = Dataset::new(vec![0.0, 1.0, 2.0, 3.0]);
        ds.add_channel("a", Channel::new(vec![1.0, f64::NAN, f64::NAN, 4.0]))
            .unwrap();
        ds.add_channel("b", Channel::new(vec![f64::NAN, 2.0, f64::NAN, 5.0]))
            .unwrap();

        let sub = split_channels(&ds, &["a".to_string(), "b".to_string()]).unwrap();

        // Row 2 is all-missing; rows 0 and 1 are partially missing and kept.
        assert_eq!(sub.time(), &[0.0, 1.0, 3.0]);
        assert!(sub.channel("b").unwrap().values[0].is_nan());
        assert_eq!(sub.channel("a").unwrap().values[2], 4.0);
    }

    #[test]
    fn test_split_never_increases_rows() {
        let mut ds = Dataset::new(vec![0.0, 1.0, 2.0]);
        ds.add_channel("a", Channel::new(vec![1.0, 2.0, 3.0]))
            .unwrap();
        let sub = split_channels(&ds, &["a".to_string()]).unwrap();
        assert!(sub.len() <= ds.len());
        assert_eq!(sub.len(), 3);
    }

    #[test]
    fn test_split_missing_name() {
        let ds = Dataset::new(vec![0.0]);
        let result = split_channels(&ds, &["ghost".to_string()]);
        match result {
            Err(MergeError::MissingChannel { name }) => assert_eq!(name, "ghost"),
            other => panic!("expected MissingChannel, got {:?}", other),
        }
    }

    #[test]
    fn test_interp_identity_at_sample_points() {
        let time = vec![0.0, 10.0, 20.0];
        let values = vec![1.0, 5.0, 3.0];
        let out = interp_onto(&time, &values, &[10.0]);
        assert_eq!(out[0], 5.0);
    }

    #[test]
    fn test_interp_linear_between_points() {
        let out = interp_onto(&[0.0, 10.0], &[0.0, 10.0], &[2.5, 7.5]);
        assert!((out[0] - 2.5).abs() < 1e-12);
        assert!((out[1] - 7.5).abs() < 1e-12);
    }

    #[test]
    fn test_interp_extrapolates_at_edges() {
        let time = vec![10.0, 20.0];
        let values = vec![100.0, 200.0];
        let out = interp_onto(&time, &values, &[0.0, 30.0]);
        assert!((out[0] - 0.0).abs() < 1e-9);
        assert!((out[1] - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_interp_skips_nan_samples() {
        let time = vec![0.0, 5.0, 10.0];
        let values = vec![0.0, f64::NAN, 10.0];
        let out = interp_onto(&time, &values, &[5.0]);
        assert!((out[0] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_interp_degenerate_inputs() {
        let out = interp_onto(&[], &[], &[1.0, 2.0]);
        assert!(out.iter().all(|v| v.is_nan()));

        let out = interp_onto(&[3.0], &[7.0], &[0.0, 100.0]);
        assert_eq!(out, vec![7.0, 7.0]);
    }

    #[test]
    fn test_merge_prefixes_and_interpolates() {
        let mut reference = Dataset::new(vec![0.0, 5.0, 10.0]);
        reference
            .add_channel("depth_from_pressure", Channel::new(vec![1.0, 2.0, 3.0]))
            .unwrap();

        let mut science = Dataset::new(vec![0.0, 10.0]);
        science
            .add_channel(
                "sci_water_temp",
                channel_of(InstrumentKind::Ctd, vec![10.0, 20.0]),
            )
            .unwrap();

        let merged =
            merge_datasets(reference, &science, &MergeConfig::default()).unwrap();

        assert!(merged.has_channel("ctd_sci_water_temp"));
        let values = &merged.channel("ctd_sci_water_temp").unwrap().values;
        assert_eq!(values[0], 10.0);
        assert!((values[1] - 15.0).abs() < 1e-12);
        assert_eq!(values[2], 20.0);
    }

    #[test]
    fn test_merge_overlapping_raw_names_do_not_collide() {
        let reference = Dataset::new(vec![0.0, 1.0]);

        let mut science = Dataset::new(vec![0.0, 1.0]);
        science
            .add_channel(
                "ctd_temperature",
                channel_of(InstrumentKind::Ctd, vec![1.0, 2.0]),
            )
            .unwrap();
        // Same raw name cannot recur within one dataset, so the overlap is
        // expressed through the prefix: distinct groups stay distinct.
        science
            .add_channel(
                "temperature",
                channel_of(InstrumentKind::Oxy, vec![3.0, 4.0]),
            )
            .unwrap();

        let merged =
            merge_datasets(reference, &science, &MergeConfig::default()).unwrap();
        assert!(merged.has_channel("ctd_ctd_temperature"));
        assert!(merged.has_channel("oxy_temperature"));
    }

    #[test]
    fn test_merge_collision_is_fatal() {
        let mut reference = Dataset::new(vec![0.0, 1.0]);
        reference
            .add_channel("ctd_temperature", Channel::new(vec![0.0, 0.0]))
            .unwrap();

        let mut science = Dataset::new(vec![0.0, 1.0]);
        science
            .add_channel(
                "temperature",
                channel_of(InstrumentKind::Ctd, vec![1.0, 2.0]),
            )
            .unwrap();

        let result = merge_datasets(reference, &science, &MergeConfig::default());
        match result {
            Err(MergeError::Collision { name, group }) => {
                assert_eq!(name, "ctd_temperature");
                assert_eq!(group, "ctd");
            }
            other => panic!("expected Collision, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_drops_depth_coordinate() {
        let reference = Dataset::new(vec![0.0, 1.0]);

        let mut science = Dataset::new(vec![0.0, 1.0]);
        science
            .add_channel(
                "sci_water_temp",
                channel_of(InstrumentKind::Ctd, vec![1.0, 2.0]),
            )
            .unwrap();
        science
            .add_channel("depth", Channel::new(vec![5.0, 6.0]).as_coordinate())
            .unwrap();

        let merged =
            merge_datasets(reference, &science, &MergeConfig::default()).unwrap();
        assert!(!merged.has_channel("depth"));
        assert!(!merged.has_channel("ctd_depth"));
        assert!(merged.has_channel("ctd_sci_water_temp"));
    }

    #[test]
    fn test_merge_skips_profile_group() {
        let reference = Dataset::new(vec![0.0, 1.0]);

        let mut science = Dataset::new(vec![0.0, 1.0]);
        science
            .add_channel(
                "profile_mean_temp",
                Channel::new(vec![11.0])
                    .with_dim(ChannelDim::Profile)
                    .with_provenance(Provenance::Instrument(InstrumentKind::Ctd)),
            )
            .unwrap();

        let merged =
            merge_datasets(reference, &science, &MergeConfig::default()).unwrap();
        assert_eq!(merged.num_channels(), 0);
    }
}
