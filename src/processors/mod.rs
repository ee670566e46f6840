//! Data processing modules.

pub mod classify;
pub mod merge;
pub mod profiles;
pub mod waypoints;

// Re-export key types for convenience
pub use classify::{classify, SensorGroups, PLATFORM_META};
pub use merge::{interp_onto, merge_datasets, split_channels, MergeError};
pub use profiles::{
    add_profiles, identify_profiles, profile_ids, ProfileError, DEPTH_CHANNEL, NO_PROFILE,
};
pub use waypoints::{collapse_waypoints, map_waypoints, Waypoint, WaypointError};
