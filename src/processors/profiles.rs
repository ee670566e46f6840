//! Segmentation of the depth record into discrete dive profiles.
//!
//! The glider's acoustic instrument only runs during the dive portion of
//! each profile, so a new dive shows up as a jump in depth between
//! consecutive samples. Steps exceeding the configured threshold become
//! profile boundaries; every sample is then labeled with its profile id.
//!
//! This is a heuristic, not a physical model: a noise spike larger than
//! the threshold over one sample interval reads as a dive boundary, and no
//! smoothing or hysteresis is applied.

use log::warn;
use thiserror::Error;

use crate::config::ProfilesConfig;
use crate::core::dataset::{Channel, ChannelAttrs, Dataset, DatasetError};

/// Channel the segmenter reads depth from.
pub const DEPTH_CHANNEL: &str = "depth_from_pressure";

/// Profile id assigned to samples outside every detected interval.
pub const NO_PROFILE: i32 = -1;

/// Errors that can occur during profile segmentation.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("dataset has no 'depth_from_pressure' channel")]
    MissingDepthChannel,

    #[error("depth record is empty, nothing to segment")]
    EmptyDepth,

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// Result type for profile operations.
pub type Result<T> = std::result::Result<T, ProfileError>;

/// Identify the sample indices belonging to each dive profile.
///
/// Successive absolute depth differences exceeding the threshold mark
/// inflection points; each inflection is stamped with the timestamp of the
/// earlier sample of the step. The inflection timestamps, bracketed by the
/// dataset's first and last timestamps, bound the profiles: each profile
/// owns the samples with `pstart < t <= pend`. Intervals with no
/// qualifying samples are skipped, not emitted as empty profiles.
pub fn identify_profiles(
    dataset: &Dataset,
    config: &ProfilesConfig,
) -> Result<Vec<Vec<usize>>> {
    let depth = dataset
        .channel(DEPTH_CHANNEL)
        .ok_or(ProfileError::MissingDepthChannel)?;
    let time = dataset.time();
    if time.is_empty() {
        return Err(ProfileError::EmptyDepth);
    }

    check_sampling_cadence(time, config);

    let mut brackets = Vec::with_capacity(time.len() / 2 + 2);
    brackets.push(time[0]);
    for i in 0..time.len() - 1 {
        let dz = (depth.values[i + 1] - depth.values[i]).abs();
        if dz > config.depth_threshold {
            brackets.push(time[i]);
        }
    }
    brackets.push(time[time.len() - 1]);

    let mut profiles = Vec::new();
    for pair in brackets.windows(2) {
        let (pstart, pend) = (pair[0], pair[1]);
        let members: Vec<usize> = time
            .iter()
            .enumerate()
            .filter(|(_, &t)| t > pstart && t <= pend)
            .map(|(i, _)| i)
            .collect();
        if members.is_empty() {
            continue;
        }
        profiles.push(members);
    }

    Ok(profiles)
}

/// Per-sample profile ids, numbered from 0 in chronological order.
///
/// Samples belonging to no detected interval carry [`NO_PROFILE`], keeping
/// "unassigned" distinct from the first real profile.
pub fn profile_ids(dataset: &Dataset, config: &ProfilesConfig) -> Result<Vec<i32>> {
    let profiles = identify_profiles(dataset, config)?;
    let mut ids = vec![NO_PROFILE; dataset.len()];
    for (n, members) in profiles.iter().enumerate() {
        for &i in members {
            ids[i] = n as i32;
        }
    }
    Ok(ids)
}

/// Attach a `profile_id` channel to the dataset.
pub fn add_profiles(mut dataset: Dataset, config: &ProfilesConfig) -> Result<Dataset> {
    let ids = profile_ids(&dataset, config)?;
    let values: Vec<f64> = ids.iter().map(|&id| id as f64).collect();

    dataset.add_channel(
        "profile_id",
        Channel::new(values).with_attrs(ChannelAttrs {
            long_name: Some("Profile ID".to_string()),
            comment: Some(
                "The id of each profile in the dataset counting sequentially \
                 from the first profile; -1 marks samples outside every \
                 detected profile."
                    .to_string(),
            ),
            units: None,
        }),
    )?;

    Ok(dataset)
}

fn check_sampling_cadence(time: &[f64], config: &ProfilesConfig) {
    if time.len() < 2 || config.nominal_interval_s <= 0.0 {
        return;
    }
    let mut deltas: Vec<f64> = time.windows(2).map(|w| w[1] - w[0]).collect();
    deltas.sort_by(f64::total_cmp);
    let median = deltas[deltas.len() / 2];
    if median > 2.0 * config.nominal_interval_s || median < 0.5 * config.nominal_interval_s {
        warn!(
            "median sampling interval {:.1}s differs from the nominal {:.1}s; \
             the depth-delta threshold is tuned per sample interval",
            median, config.nominal_interval_s
        );
    }
}
