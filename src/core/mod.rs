// Core algorithm exports
pub mod distance;
pub mod graph;
pub mod map;
pub mod normalize;
pub mod resolver;
pub mod session;
pub mod visibility;

pub use distance::{haversine_distance, DistanceUnit, GeoPoint};
pub use graph::{build_edges, edge_id, EligibilityMode, GraphOptions};
pub use map::MapBuilder;
pub use normalize::{normalize_coordinates, normalize_point, CoordinateError, Hemisphere, NormalizedCoordinates, RegionPolicy};
pub use resolver::{DeviceFailure, DeviceLocator, DeviceOptions, Geocoder, IpLocator, LocationError, LocationRequest, LocationResolver, ProviderError, RawCoordinates};
pub use session::{ResolutionTicket, Session, SessionContext};
pub use visibility::{compute_visible, is_displayable};
