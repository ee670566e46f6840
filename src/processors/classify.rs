//! Classification of science dataset channels by originating instrument.
//!
//! The science dataset carries every instrument's channels on one nominal
//! time axis even though the instruments sample at different rates, so most
//! channels are heavily NaN-padded. Splitting the channel names out by
//! source instrument is the required first step before each instrument's
//! native sampling can be isolated and interpolated.

use log::{debug, warn};

use crate::core::dataset::{ChannelDim, Dataset, InstrumentKind, Provenance};

/// Channel name reserved for platform metadata; never classified.
pub const PLATFORM_META: &str = "platform_meta";

/// Channel names partitioned by source instrument.
///
/// Groups are pairwise disjoint and their union is a subset of the
/// dataset's channel names; channels with no usable provenance are absent
/// from every group. Empty groups are valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorGroups {
    pub ctd: Vec<String>,
    pub oxy: Vec<String>,
    pub flbbcd: Vec<String>,
    pub par: Vec<String>,
    pub glider: Vec<String>,
    pub profile: Vec<String>,
}

impl SensorGroups {
    /// The channel names belonging to one instrument class.
    pub fn group(&self, kind: InstrumentKind) -> &[String] {
        match kind {
            InstrumentKind::Ctd => &self.ctd,
            InstrumentKind::Oxy => &self.oxy,
            InstrumentKind::Flbbcd => &self.flbbcd,
            InstrumentKind::Par => &self.par,
            InstrumentKind::Glider => &self.glider,
            InstrumentKind::Profile => &self.profile,
        }
    }

    fn group_mut(&mut self, kind: InstrumentKind) -> &mut Vec<String> {
        match kind {
            InstrumentKind::Ctd => &mut self.ctd,
            InstrumentKind::Oxy => &mut self.oxy,
            InstrumentKind::Flbbcd => &mut self.flbbcd,
            InstrumentKind::Par => &mut self.par,
            InstrumentKind::Glider => &mut self.glider,
            InstrumentKind::Profile => &mut self.profile,
        }
    }

    /// Iterates the interpolatable groups in the fixed merge order.
    ///
    /// The profile group is excluded; its channels are one-value-per-dive
    /// and must never be interpolated onto the time axis.
    pub fn merge_groups(&self) -> impl Iterator<Item = (InstrumentKind, &[String])> {
        InstrumentKind::MERGE_ORDER
            .iter()
            .map(move |&kind| (kind, self.group(kind)))
    }

    /// Total number of classified channels across all groups.
    pub fn num_classified(&self) -> usize {
        InstrumentKind::MERGE_ORDER
            .iter()
            .map(|&kind| self.group(kind).len())
            .sum::<usize>()
            + self.profile.len()
    }
}

/// Partition a science dataset's channel names by source instrument.
///
/// Per channel, in deterministic name order:
/// - profile-dimensioned channels go to the profile group regardless of
///   any other annotation;
/// - instrument-annotated channels go to their matching class, except the
///   `platform_meta` sentinel which is skipped entirely; an annotation
///   matching no known class leaves the channel unclassified (logged, not
///   raised, so one malformed channel cannot halt a multi-channel merge);
/// - source-sensor channels with no instrument annotation go to the glider
///   group;
/// - everything else is left unclassified and excluded from all output.
pub fn classify(dataset: &Dataset) -> SensorGroups {
    let mut groups = SensorGroups::default();

    for (name, channel) in dataset.channels() {
        if channel.dim == ChannelDim::Profile {
            groups.profile.push(name.to_string());
            continue;
        }
        match &channel.provenance {
            Provenance::Instrument(kind) => {
                if name == PLATFORM_META {
                    continue;
                }
                groups.group_mut(*kind).push(name.to_string());
            }
            Provenance::UnknownInstrument(annotation) => {
                if name == PLATFORM_META {
                    continue;
                }
                warn!(
                    "channel '{}' has unrecognized instrument annotation '{}', leaving unclassified",
                    name, annotation
                );
            }
            Provenance::SourceSensor => groups.glider.push(name.to_string()),
            Provenance::Unannotated => {
                debug!("channel '{}' has no origin annotation, skipping", name);
            }
        }
    }

    groups
}
