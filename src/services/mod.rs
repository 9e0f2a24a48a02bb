// Service exports
pub mod device;
pub mod directory;
pub mod geocoder;
pub mod ip_locator;
pub mod sessions;

pub use device::ReportedPosition;
pub use directory::{CachedDirectory, DirectoryError, DirectorySource, PostgresDirectory, StaticDirectory};
pub use geocoder::NominatimGeocoder;
pub use ip_locator::HttpIpLocator;
pub use sessions::SessionStore;
