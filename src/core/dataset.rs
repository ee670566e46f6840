//! In-memory time-indexed dataset model for glider missions.
//!
//! A [`Dataset`] holds a shared time axis (Unix seconds) and a set of named
//! channels. Channels are floating point with NaN marking missing samples,
//! which is how the source datasets encode the different native sampling
//! rates of the attached instruments.

use std::collections::BTreeMap;

use thiserror::Error;

/// Errors raised by dataset operations.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error("channel '{name}' has {values} values but the time axis has {times} samples")]
    LengthMismatch {
        name: String,
        values: usize,
        times: usize,
    },

    #[error("channel already exists: {0}")]
    DuplicateChannel(String),
}

/// Result type for dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;

/// The known instrument classes a science channel can originate from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InstrumentKind {
    /// Conductivity/temperature/depth package.
    Ctd,
    /// Dissolved oxygen optode.
    Oxy,
    /// Combined fluorometer/backscatter/CDOM puck.
    Flbbcd,
    /// Photosynthetically active radiation sensor.
    Par,
    /// Channels native to the glider platform itself.
    Glider,
    /// Per-profile scalars, one value per dive rather than per sample.
    Profile,
}

impl InstrumentKind {
    /// The fixed order in which instrument groups are merged.
    ///
    /// The profile group is never interpolated and is excluded here.
    pub const MERGE_ORDER: [InstrumentKind; 5] = [
        InstrumentKind::Ctd,
        InstrumentKind::Oxy,
        InstrumentKind::Flbbcd,
        InstrumentKind::Par,
        InstrumentKind::Glider,
    ];

    /// Short label used to prefix merged channel names.
    pub fn label(&self) -> &'static str {
        match self {
            InstrumentKind::Ctd => "ctd",
            InstrumentKind::Oxy => "oxy",
            InstrumentKind::Flbbcd => "flbbcd",
            InstrumentKind::Par => "par",
            InstrumentKind::Glider => "glider",
            InstrumentKind::Profile => "profile",
        }
    }

    /// Match a raw `instrument` annotation string to a known class.
    ///
    /// Annotations are free-form identifiers such as `instrument_ctd`; the
    /// known token may appear anywhere in the string. Returns `None` for
    /// annotations matching no known instrument.
    pub fn from_annotation(annotation: &str) -> Option<Self> {
        if annotation.contains("ctd") {
            Some(InstrumentKind::Ctd)
        } else if annotation.contains("oxy") {
            Some(InstrumentKind::Oxy)
        } else if annotation.contains("par") {
            Some(InstrumentKind::Par)
        } else if annotation.contains("flbbcd") {
            Some(InstrumentKind::Flbbcd)
        } else {
            None
        }
    }
}

/// Channel provenance, resolved once when a dataset is loaded.
///
/// Loaders validate the raw per-channel annotations into this closed set so
/// downstream stages never re-inspect free-form attribute strings.
#[derive(Debug, Clone, PartialEq)]
pub enum Provenance {
    /// Annotated with a recognized instrument class.
    Instrument(InstrumentKind),
    /// Annotated with an instrument string matching no known class.
    UnknownInstrument(String),
    /// Annotated as native to the glider platform, with no instrument.
    SourceSensor,
    /// No origin annotation at all.
    Unannotated,
}

/// Leading dimension of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelDim {
    /// One value per sample on the time axis.
    Time,
    /// One value per dive profile; never interpolated.
    Profile,
}

/// Human-readable channel metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelAttrs {
    pub long_name: Option<String>,
    pub comment: Option<String>,
    pub units: Option<String>,
}

/// A single named data channel.
#[derive(Debug, Clone)]
pub struct Channel {
    /// Sample values; NaN marks a missing sample.
    pub values: Vec<f64>,
    /// Leading dimension, time or profile.
    pub dim: ChannelDim,
    /// Origin of the channel, fixed at load time.
    pub provenance: Provenance,
    /// Auxiliary coordinate marker (e.g. a depth coordinate riding along
    /// with science channels); coordinates keep their name through merges.
    pub coordinate: bool,
    /// Descriptive metadata.
    pub attrs: ChannelAttrs,
}

impl Channel {
    /// Creates a time-dimensioned, unannotated data channel.
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            dim: ChannelDim::Time,
            provenance: Provenance::Unannotated,
            coordinate: false,
            attrs: ChannelAttrs::default(),
        }
    }

    /// Sets the provenance.
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// Sets the leading dimension.
    pub fn with_dim(mut self, dim: ChannelDim) -> Self {
        self.dim = dim;
        self
    }

    /// Marks the channel as an auxiliary coordinate.
    pub fn as_coordinate(mut self) -> Self {
        self.coordinate = true;
        self
    }

    /// Sets the descriptive metadata.
    pub fn with_attrs(mut self, attrs: ChannelAttrs) -> Self {
        self.attrs = attrs;
        self
    }
}

/// A time-indexed dataset: one time axis plus named channels.
///
/// Channel iteration order is deterministic (sorted by name), which keeps
/// every derived artifact reproducible across runs.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    time: Vec<f64>,
    channels: BTreeMap<String, Channel>,
}

impl Dataset {
    /// Creates a dataset with the given time axis and no channels.
    ///
    /// Timestamps are Unix seconds and are expected in chronological order.
    pub fn new(time: Vec<f64>) -> Self {
        Self {
            time,
            channels: BTreeMap::new(),
        }
    }

    /// The time axis.
    #[inline]
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// Number of samples on the time axis.
    #[inline]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Returns true if the time axis is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Number of channels.
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Looks up a channel by name.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    /// Returns true if a channel with this name exists.
    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    /// Channel names in sorted order.
    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    /// (name, channel) pairs in sorted name order.
    pub fn channels(&self) -> impl Iterator<Item = (&str, &Channel)> {
        self.channels.iter().map(|(name, ch)| (name.as_str(), ch))
    }

    /// Adds a channel, validating its length against the time axis.
    ///
    /// Time-dimensioned channels must match the time axis sample count;
    /// profile-dimensioned channels may be any length. Adding a channel
    /// under an existing name is an error, never a silent overwrite.
    pub fn add_channel(&mut self, name: &str, channel: Channel) -> Result<()> {
        if self.channels.contains_key(name) {
            return Err(DatasetError::DuplicateChannel(name.to_string()));
        }
        if channel.dim == ChannelDim::Time && channel.values.len() != self.time.len() {
            return Err(DatasetError::LengthMismatch {
                name: name.to_string(),
                values: channel.values.len(),
                times: self.time.len(),
            });
        }
        self.channels.insert(name.to_string(), channel);
        Ok(())
    }

    /// Removes a channel, returning it if present.
    pub fn remove_channel(&mut self, name: &str) -> Option<Channel> {
        self.channels.remove(name)
    }

    /// Selects the named channels into a new dataset sharing this time axis.
    ///
    /// Auxiliary coordinate channels ride along with any selection. Fails
    /// with [`DatasetError::ChannelNotFound`] if a requested name is absent.
    pub fn select(&self, names: &[String]) -> Result<Dataset> {
        let mut out = Dataset::new(self.time.clone());
        for name in names {
            let channel = self
                .channel(name)
                .ok_or_else(|| DatasetError::ChannelNotFound(name.clone()))?;
            out.add_channel(name, channel.clone())?;
        }
        for (name, channel) in &self.channels {
            if channel.coordinate && !out.has_channel(name) {
                out.add_channel(name, channel.clone())?;
            }
        }
        Ok(out)
    }

    /// Keeps only the rows where `mask` is true.
    ///
    /// Filters the time axis and every time-dimensioned channel; profile
    /// channels are carried through unchanged. `mask` must have one entry
    /// per sample.
    pub fn retain_rows(&self, mask: &[bool]) -> Dataset {
        debug_assert_eq!(mask.len(), self.time.len());

        let filter = |values: &[f64]| -> Vec<f64> {
            values
                .iter()
                .zip(mask)
                .filter_map(|(&v, &keep)| keep.then_some(v))
                .collect()
        };

        let time = filter(&self.time);
        let mut out = Dataset::new(time);
        for (name, channel) in &self.channels {
            let filtered = match channel.dim {
                ChannelDim::Time => Channel {
                    values: filter(&channel.values),
                    ..channel.clone()
                },
                ChannelDim::Profile => channel.clone(),
            };
            // Lengths were validated on the way in, so this cannot fail.
            let _ = out.add_channel(name, filtered);
        }
        out
    }
}
