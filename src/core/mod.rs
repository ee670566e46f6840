//! Core data types and I/O operations.

pub mod dataset;
pub mod loaders;
pub mod writers;

pub use dataset::{
    Channel, ChannelAttrs, ChannelDim, Dataset, DatasetError, InstrumentKind, Provenance,
};
pub use loaders::{
    load_bathymetry_csv, load_nav_csv, load_science_csv, load_waypoint_csv, BathymetryGrid,
    LoaderError,
};
pub use writers::{write_dataset_csv, WriteError};
