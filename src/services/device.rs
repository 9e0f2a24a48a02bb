use crate::core::resolver::{DeviceFailure, DeviceLocator, DeviceOptions, RawCoordinates};
use async_trait::async_trait;

/// Device reading taken by the client and posted to the service
///
/// The browser runs the platform request with the options from
/// `/location/device-options`; this adapter replays its outcome.
#[derive(Debug, Clone)]
pub struct ReportedPosition {
    outcome: Result<RawCoordinates, DeviceFailure>,
}

impl ReportedPosition {
    pub fn position(latitude: f64, longitude: f64) -> Self {
        Self {
            outcome: Ok(RawCoordinates::from_numbers(latitude, longitude)),
        }
    }

    pub fn failure(code: u16, message: Option<String>) -> Self {
        Self {
            outcome: Err(DeviceFailure { code, message }),
        }
    }
}

#[async_trait]
impl DeviceLocator for ReportedPosition {
    async fn current_position(&self, _options: &DeviceOptions) -> Result<RawCoordinates, DeviceFailure> {
        self.outcome.clone()
    }
}
