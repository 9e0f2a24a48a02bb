// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{Partner, Collaboration, CollaborationStatus, Membership, DirectorySnapshot, LocationTier, ReferencePoint, VisiblePartner, Edge, EdgePayload, MapSnapshot};
pub use requests::{CreateSessionRequest, NormalizeRequest, AddressLocationRequest, DeviceReportRequest, IpFallbackRequest, RadiusRequest};
pub use responses::{SessionResponse, NormalizeResponse, LocationResponse, HealthResponse, ErrorResponse};
