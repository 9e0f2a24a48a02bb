//! Partner Map - locates a user, selects the directory partners near them and
//! links partners that share a collaboration.
//!
//! The core is pure: coordinate normalization, haversine distance, the
//! visibility filter and the collaboration graph. Location providers, the
//! directory store and the HTTP surface live in `services` and `routes`.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{
    build_edges, compute_visible, haversine_distance, normalize_coordinates, DistanceUnit,
    EligibilityMode, GeoPoint, LocationResolver, MapBuilder, RegionPolicy,
};
pub use models::{Collaboration, DirectorySnapshot, Edge, MapSnapshot, Membership, Partner, ReferencePoint};
