use std::sync::Arc;

use btleplug::api::{BDAddr, Central, CentralEvent, Peripheral as _};
use btleplug::platform::Peripheral;
use futures::StreamExt;
use stream_cancel::{Trigger, Valved};
use uuid::Uuid;

use super::scanner::{BtleDeviceRef, Session};
use super::BtleService;
use crate::provider::{ConnectionObserver, ConnectionStatus};
use crate::ProviderError;

pub struct BtleDevice {
    pub(self) session: Arc<Session>,
    pub(crate) peripheral: Peripheral,
}

impl BtleDevice {
    pub(crate) async fn connect(device: &BtleDeviceRef) -> Result<Self, ProviderError> {
        let peripheral = device.peripheral.clone();

        if !peripheral.is_connected().await? {
            log::debug!("Connecting to device {}", peripheral.address());
            peripheral.connect().await?;
        }

        Ok(Self {
            session: device.session.clone(),
            peripheral,
        })
    }

    #[inline]
    pub fn address(&self) -> BDAddr {
        self.peripheral.address()
    }

    /// Local name of the device
    pub async fn local_name(&self) -> Option<String> {
        self.peripheral
            .properties()
            .await
            .ok()
            .flatten()
            .and_then(|props| props.local_name)
    }

    pub(crate) async fn connection_status(&self) -> ConnectionStatus {
        match self.peripheral.is_connected().await {
            Ok(true) => ConnectionStatus::Connected,
            _ => ConnectionStatus::Disconnected,
        }
    }

    /// Forward connect and disconnect events of this device to `observer`
    /// until the returned trigger is dropped.
    pub(crate) async fn watch(&self, observer: ConnectionObserver) -> Result<Trigger, ProviderError> {
        let (trigger, mut events) = Valved::new(self.session.adapter.events().await?);
        let id = self.peripheral.id();

        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                match event {
                    CentralEvent::DeviceDisconnected(peripheral_id) if peripheral_id == id => {
                        log::trace!("Device disconnected: {:?}", peripheral_id);
                        observer(ConnectionStatus::Disconnected);
                    }
                    CentralEvent::DeviceConnected(peripheral_id) if peripheral_id == id => {
                        log::trace!("Device connected: {:?}", peripheral_id);
                        observer(ConnectionStatus::Connected);
                    }
                    _ => {}
                }
            }

            log::trace!("Connection watch was stopped.");
        });

        Ok(trigger)
    }

    /// Get service by UUID
    pub(crate) async fn service(&self, uuid: Uuid) -> Result<BtleService, ProviderError> {
        let mut services = self.peripheral.services();
        if services.is_empty() {
            log::debug!("Discovering services for {}", self.peripheral.address());
            self.peripheral.discover_services().await?;
            services = self.peripheral.services();
        }

        services
            .into_iter()
            .find(|service| service.uuid == uuid)
            .map(|service| BtleService {
                peripheral: self.peripheral.clone(),
                service,
            })
            .ok_or(ProviderError::NotFound(uuid))
    }

    /// Disconnect from the device
    #[inline]
    pub(crate) async fn disconnect(&self) -> Result<(), ProviderError> {
        Ok(self.peripheral.disconnect().await?)
    }
}
