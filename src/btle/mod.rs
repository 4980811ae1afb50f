//! [`GattProvider`] backed by the platform Bluetooth stack through `btleplug`.

use async_trait::async_trait;
use stream_cancel::Trigger;
use uuid::Uuid;

use crate::provider::{ClientConfig, ConnectionObserver, ConnectionStatus, GattProvider, ValueHandler};
use crate::ProviderError;

pub use characteristic::BtleCharacteristic;
pub use device::BtleDevice;
pub use scanner::{BtleDeviceRef, ScanConfig};
pub use service::BtleService;

mod characteristic;
mod device;
mod scanner;
mod service;

#[derive(Default)]
pub struct BtleProvider {
    config: ScanConfig,
}

impl BtleProvider {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl GattProvider for BtleProvider {
    type DeviceRef = BtleDeviceRef;
    type Device = BtleDevice;
    type Service = BtleService;
    type Characteristic = BtleCharacteristic;
    type Subscription = Trigger;
    type Watch = Trigger;

    async fn find_devices(&self, service: Uuid) -> Result<Vec<BtleDeviceRef>, ProviderError> {
        scanner::scan(&self.config, service).await
    }

    async fn connect(&self, device: &BtleDeviceRef) -> Result<BtleDevice, ProviderError> {
        BtleDevice::connect(device).await
    }

    async fn connection_status(&self, device: &BtleDevice) -> ConnectionStatus {
        device.connection_status().await
    }

    async fn watch_connection(
        &self,
        device: &BtleDevice,
        observer: ConnectionObserver,
    ) -> Result<Trigger, ProviderError> {
        device.watch(observer).await
    }

    async fn unwatch_connection(
        &self,
        _device: &BtleDevice,
        watch: Trigger,
    ) -> Result<(), ProviderError> {
        watch.cancel();
        Ok(())
    }

    async fn discover_service(
        &self,
        device: &BtleDevice,
        service: Uuid,
    ) -> Result<BtleService, ProviderError> {
        device.service(service).await
    }

    async fn discover_characteristic(
        &self,
        service: &BtleService,
        characteristic: Uuid,
    ) -> Result<BtleCharacteristic, ProviderError> {
        service.characteristic(characteristic)
    }

    async fn write_client_config(
        &self,
        characteristic: &BtleCharacteristic,
        value: ClientConfig,
    ) -> Result<(), ProviderError> {
        characteristic.configure(value).await
    }

    async fn subscribe(
        &self,
        characteristic: &BtleCharacteristic,
        on_value: ValueHandler,
    ) -> Result<Trigger, ProviderError> {
        characteristic.listen(on_value).await
    }

    async fn unsubscribe(
        &self,
        _characteristic: &BtleCharacteristic,
        subscription: Trigger,
    ) -> Result<(), ProviderError> {
        subscription.cancel();
        Ok(())
    }

    async fn close(&self, device: BtleDevice) -> Result<(), ProviderError> {
        log::debug!("Closing device {}", device.address());
        device.disconnect().await
    }
}
