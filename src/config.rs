use std::time::Duration;

use uuid::Uuid;

use crate::common::{characteristics, services};

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Service the device discovery is filtered by.
    pub(crate) service: Uuid,
    /// Characteristic subscribed to within the service.
    pub(crate) characteristic: Uuid,
    /// Upper bound on how long a stop request goes unnoticed while monitoring.
    pub(crate) poll_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            service: services::HEART_RATE,
            characteristic: characteristics::HEART_RATE_MEASUREMENT,
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl MonitorConfig {
    /// Service used to discover and connect to the device
    pub fn service(mut self, uuid: Uuid) -> Self {
        self.service = uuid;
        self
    }

    /// Characteristic that delivers the measurements
    pub fn characteristic(mut self, uuid: Uuid) -> Self {
        self.characteristic = uuid;
        self
    }

    /// How often a running session checks for a stop request
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_heart_rate_profile() {
        let config = MonitorConfig::default();
        assert_eq!(config.service, services::HEART_RATE);
        assert_eq!(config.characteristic, characteristics::HEART_RATE_MEASUREMENT);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
    }

    #[test]
    fn builder_overrides() {
        let custom = Uuid::from_u128(0x1234);
        let config = MonitorConfig::default()
            .characteristic(custom)
            .poll_interval(Duration::from_millis(20));
        assert_eq!(config.characteristic, custom);
        assert_eq!(config.poll_interval, Duration::from_millis(20));
        assert_eq!(config.service, services::HEART_RATE);
    }
}
