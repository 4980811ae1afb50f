use async_trait::async_trait;
use uuid::Uuid;

use crate::ProviderError;

/// Invoked with the raw value of every notification. May run on any thread.
pub type ValueHandler = Box<dyn Fn(&[u8]) + Send + Sync>;

/// Invoked whenever the link state of a connected device changes. May run on any thread.
pub type ConnectionObserver = Box<dyn Fn(ConnectionStatus) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// Value written to the Client Characteristic Configuration descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientConfig {
    Notify,
    None,
}

/// Asynchronous GATT client the session drives.
///
/// Every handle is created and released by the session on its worker, and
/// every call is awaited there in order.
#[async_trait]
pub trait GattProvider: Send + Sync + 'static {
    /// A discovered, not yet connected, device.
    type DeviceRef: Send + Sync + std::fmt::Debug;
    type Device: Send + Sync;
    type Service: Send + Sync;
    type Characteristic: Send + Sync;
    /// Keeps a notification handler registered until passed back to `unsubscribe`.
    type Subscription: Send + Sync;
    /// Keeps a connection observer registered until passed back to `unwatch_connection`.
    type Watch: Send + Sync;

    async fn find_devices(&self, service: Uuid) -> Result<Vec<Self::DeviceRef>, ProviderError>;

    async fn connect(&self, device: &Self::DeviceRef) -> Result<Self::Device, ProviderError>;

    async fn connection_status(&self, device: &Self::Device) -> ConnectionStatus;

    async fn watch_connection(
        &self,
        device: &Self::Device,
        observer: ConnectionObserver,
    ) -> Result<Self::Watch, ProviderError>;

    async fn unwatch_connection(
        &self,
        device: &Self::Device,
        watch: Self::Watch,
    ) -> Result<(), ProviderError>;

    async fn discover_service(
        &self,
        device: &Self::Device,
        service: Uuid,
    ) -> Result<Self::Service, ProviderError>;

    async fn discover_characteristic(
        &self,
        service: &Self::Service,
        characteristic: Uuid,
    ) -> Result<Self::Characteristic, ProviderError>;

    async fn write_client_config(
        &self,
        characteristic: &Self::Characteristic,
        value: ClientConfig,
    ) -> Result<(), ProviderError>;

    async fn subscribe(
        &self,
        characteristic: &Self::Characteristic,
        on_value: ValueHandler,
    ) -> Result<Self::Subscription, ProviderError>;

    async fn unsubscribe(
        &self,
        characteristic: &Self::Characteristic,
        subscription: Self::Subscription,
    ) -> Result<(), ProviderError>;

    async fn close(&self, device: Self::Device) -> Result<(), ProviderError>;
}
