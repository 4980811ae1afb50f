use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use btleplug::api::{BDAddr, Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::StreamExt;
use tokio::time::{timeout_at, Instant};
use uuid::Uuid;

use crate::ProviderError;

pub struct ScanConfig {
    /// Index of the Bluetooth adapter to use. The first found adapter is used by default.
    adapter_index: usize,
    /// Filters the found devices based on device address.
    address_filter: Option<Box<dyn Fn(BDAddr) -> bool + Send + Sync>>,
    /// Filters the found devices based on local name.
    name_filter: Option<Box<dyn Fn(&str) -> bool + Send + Sync>>,
    /// Maximum results before the scan is stopped.
    max_results: usize,
    /// The scan is stopped when timeout duration is reached.
    timeout: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            adapter_index: 0,
            address_filter: None,
            name_filter: None,
            max_results: 1,
            timeout: Duration::from_secs(10),
        }
    }
}

impl ScanConfig {
    /// Index of bluetooth adapter to use
    pub fn adapter_index(mut self, index: usize) -> Self {
        self.adapter_index = index;
        self
    }

    /// Filter scanned devices based on the device address
    pub fn filter_by_address(
        mut self,
        func: impl Fn(BDAddr) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.address_filter = Some(Box::new(func));
        self
    }

    /// Filter scanned devices based on the device name
    pub fn filter_by_name(mut self, func: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.name_filter = Some(Box::new(func));
        self
    }

    /// Stop the scan after given number of matches
    pub fn stop_after_matches(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    /// Stop the scan after the first match
    pub fn stop_after_first_match(self) -> Self {
        self.stop_after_matches(1)
    }

    /// Stop the scan after given duration
    pub fn stop_after_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub(crate) struct Session {
    pub(crate) _manager: Manager,
    pub(crate) adapter: Adapter,
}

/// A peripheral that advertised the requested service.
#[derive(Clone)]
pub struct BtleDeviceRef {
    pub(crate) session: Arc<Session>,
    pub(crate) peripheral: Peripheral,
}

impl BtleDeviceRef {
    #[inline]
    pub fn address(&self) -> BDAddr {
        self.peripheral.address()
    }
}

impl fmt::Debug for BtleDeviceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BtleDeviceRef")
            .field("address", &self.peripheral.address())
            .field("id", &self.peripheral.id())
            .finish()
    }
}

/// Scan until the configured number of devices advertising `service` is
/// found or the timeout passes.
pub(crate) async fn scan(
    config: &ScanConfig,
    service: Uuid,
) -> Result<Vec<BtleDeviceRef>, ProviderError> {
    let manager = Manager::new().await?;
    let mut adapters = manager.adapters().await?;

    if config.adapter_index >= adapters.len() {
        return Err(ProviderError::Rejected(format!(
            "no Bluetooth adapter at index {}",
            config.adapter_index
        )));
    }

    let adapter = adapters.swap_remove(config.adapter_index);

    log::trace!("Using adapter: {:?}", adapter);

    let session = Arc::new(Session {
        _manager: manager,
        adapter,
    });

    let mut events = session.adapter.events().await?;

    log::info!("Starting the scan");

    session
        .adapter
        .start_scan(ScanFilter {
            services: vec![service],
        })
        .await?;

    let mut ctx = ScanContext {
        session: session.clone(),
        config,
        service,
        filtered: HashSet::new(),
        found: Vec::new(),
    };

    // Devices the OS already knows about, e.g. ones that are still connected.
    for peripheral in session.adapter.peripherals().await? {
        if ctx.done() {
            break;
        }
        ctx.apply_filter(peripheral).await;
    }

    let deadline = Instant::now() + config.timeout;

    while !ctx.done() {
        match timeout_at(deadline, events.next()).await {
            Ok(Some(
                CentralEvent::DeviceDiscovered(peripheral_id)
                | CentralEvent::DeviceUpdated(peripheral_id),
            )) => ctx.on_device(peripheral_id).await,
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(_) => {
                log::info!("Scanner stop condition reached.");
                break;
            }
        }
    }

    if let Err(e) = session.adapter.stop_scan().await {
        log::warn!("Could not stop the scan: {:?}", e);
    }

    log::info!("Scanner was stopped with {} match(es).", ctx.found.len());

    Ok(ctx.found)
}

struct ScanContext<'a> {
    /// Reference to the bluetooth session instance
    session: Arc<Session>,
    /// Configurations for the scan, such as filters and stop conditions
    config: &'a ScanConfig,
    /// Service a device must advertise
    service: Uuid,
    /// Set of devices that have been filtered and will be ignored
    filtered: HashSet<PeripheralId>,
    /// Devices that matched the filters, in discovery order
    found: Vec<BtleDeviceRef>,
}

impl ScanContext<'_> {
    fn done(&self) -> bool {
        self.found.len() >= self.config.max_results
    }

    async fn on_device(&mut self, peripheral_id: PeripheralId) {
        if let Ok(peripheral) = self.session.adapter.peripheral(&peripheral_id).await {
            log::trace!("Device discovered: {:?}", peripheral);

            self.apply_filter(peripheral).await;
        }
    }

    async fn apply_filter(&mut self, peripheral: Peripheral) {
        if self.filtered.contains(&peripheral.id()) {
            // The device has already been filtered.
            return;
        }

        match self.passes_filters(&peripheral).await {
            Some(true) => {
                self.filtered.insert(peripheral.id());

                log::info!("Found device: {:?}", peripheral);

                self.found.push(BtleDeviceRef {
                    session: self.session.clone(),
                    peripheral,
                });
            }
            Some(false) => {
                self.filtered.insert(peripheral.id());
            }
            None => {
                // Advertisement data is incomplete, wait for an update.
            }
        }
    }

    async fn passes_filters(&self, peripheral: &Peripheral) -> Option<bool> {
        let props = match peripheral.properties().await {
            Ok(Some(props)) => props,
            _ => return None,
        };

        let mut passed = props.services.contains(&self.service);

        if let Some(filter_by_addr) = self.config.address_filter.as_ref() {
            passed &= filter_by_addr(peripheral.address());
        }

        if let Some(filter_by_name) = self.config.name_filter.as_ref() {
            passed &= props.local_name.map(|name| filter_by_name(&name))?;
        }

        Some(passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stops_after_first_match() {
        let config = ScanConfig::default();
        assert_eq!(config.adapter_index, 0);
        assert_eq!(config.max_results, 1);
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn builder_overrides() {
        let config = ScanConfig::default()
            .adapter_index(1)
            .stop_after_matches(0)
            .stop_after_timeout(Duration::from_secs(3))
            .filter_by_name(|name| name.starts_with("Polar"));

        assert_eq!(config.adapter_index, 1);
        assert_eq!(config.max_results, 1);
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert!(config.name_filter.as_ref().is_some_and(|f| f("Polar H10")));
    }
}
