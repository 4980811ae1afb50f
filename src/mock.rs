//! Scripted in-memory provider for exercising sessions without a radio.
//!
//! Clones share state, so a test can keep one clone to inspect what the
//! session did with the other.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use crate::provider::{
    ClientConfig, ConnectionObserver, ConnectionStatus, GattProvider, ValueHandler,
};
use crate::ProviderError;

/// Provider call that can be made to panic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockStep {
    FindDevices,
    Connect,
    DiscoverService,
    DiscoverCharacteristic,
    WriteClientConfig,
    Subscribe,
    Unsubscribe,
    Unwatch,
    Close,
}

/// Delivered in order as soon as the session subscribes.
#[derive(Clone, Debug)]
pub enum MockEvent {
    Notify(Vec<u8>),
    Disconnect,
    Reconnect,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockDeviceRef {
    pub id: String,
}

#[derive(Debug)]
pub struct MockDevice {
    id: String,
}

#[derive(Debug)]
pub struct MockService {
    uuid: Uuid,
}

#[derive(Debug)]
pub struct MockCharacteristic {
    uuid: Uuid,
}

#[derive(Debug)]
pub struct MockToken(u32);

/// Handles still held against the provider.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OpenHandles {
    pub devices: usize,
    pub watches: usize,
    pub subscriptions: usize,
    pub notifying: bool,
}

impl OpenHandles {
    pub fn is_empty(&self) -> bool {
        *self == OpenHandles::default()
    }
}

#[derive(Default)]
struct MockState {
    devices: Vec<MockDeviceRef>,
    connect_fails: bool,
    service_missing: bool,
    characteristic_missing: bool,
    subscribe_fails: bool,
    cleanup_fails: bool,
    panic_at: Option<MockStep>,
    script: Vec<MockEvent>,

    next_token: u32,
    open: OpenHandles,
    observers: Vec<(u32, ConnectionObserver)>,
    handlers: Vec<(u32, ValueHandler)>,
    calls: Vec<String>,
}

#[derive(Clone, Default)]
pub struct MockProvider {
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// A provider that finds no devices.
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider with one heart rate sensor that behaves.
    pub fn with_sample_device() -> Self {
        Self::new().with_device("hrm-1")
    }

    pub fn with_device(self, id: &str) -> Self {
        self.lock().devices.push(MockDeviceRef { id: id.to_string() });
        self
    }

    pub fn fail_connect(self) -> Self {
        self.lock().connect_fails = true;
        self
    }

    pub fn without_service(self) -> Self {
        self.lock().service_missing = true;
        self
    }

    pub fn without_characteristic(self) -> Self {
        self.lock().characteristic_missing = true;
        self
    }

    pub fn fail_subscribe(self) -> Self {
        self.lock().subscribe_fails = true;
        self
    }

    /// Every release call fails, but still releases the handle.
    pub fn fail_cleanup(self) -> Self {
        self.lock().cleanup_fails = true;
        self
    }

    pub fn panic_at(self, step: MockStep) -> Self {
        self.lock().panic_at = Some(step);
        self
    }

    pub fn with_events(self, events: impl IntoIterator<Item = MockEvent>) -> Self {
        self.lock().script.extend(events);
        self
    }

    /// Push a notification to every subscribed handler.
    pub fn notify(&self, value: &[u8]) {
        let state = self.lock();
        for (_, handler) in &state.handlers {
            handler(value);
        }
    }

    /// Report a link change to every connection observer.
    pub fn set_connection(&self, status: ConnectionStatus) {
        let state = self.lock();
        for (_, observer) in &state.observers {
            observer(status);
        }
    }

    pub fn open_handles(&self) -> OpenHandles {
        self.lock().open.clone()
    }

    /// Names of the provider calls made so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the call, then panics if the script says so.
    fn enter(&self, step: MockStep, call: &str) -> MutexGuard<'_, MockState> {
        let mut state = self.lock();
        state.calls.push(call.to_string());
        if state.panic_at == Some(step) {
            drop(state);
            panic!("mock provider panicked in {}", call);
        }
        state
    }
}

#[async_trait]
impl GattProvider for MockProvider {
    type DeviceRef = MockDeviceRef;
    type Device = MockDevice;
    type Service = MockService;
    type Characteristic = MockCharacteristic;
    type Subscription = MockToken;
    type Watch = MockToken;

    async fn find_devices(&self, _service: Uuid) -> Result<Vec<MockDeviceRef>, ProviderError> {
        let state = self.enter(MockStep::FindDevices, "find_devices");
        Ok(state.devices.clone())
    }

    async fn connect(&self, device: &MockDeviceRef) -> Result<MockDevice, ProviderError> {
        let mut state = self.enter(MockStep::Connect, "connect");
        if state.connect_fails {
            return Err(ProviderError::Unreachable);
        }
        state.open.devices += 1;
        Ok(MockDevice {
            id: device.id.clone(),
        })
    }

    async fn connection_status(&self, _device: &MockDevice) -> ConnectionStatus {
        ConnectionStatus::Connected
    }

    async fn watch_connection(
        &self,
        _device: &MockDevice,
        observer: ConnectionObserver,
    ) -> Result<MockToken, ProviderError> {
        let mut state = self.lock();
        state.calls.push("watch_connection".to_string());
        state.next_token += 1;
        let token = state.next_token;
        state.observers.push((token, observer));
        state.open.watches += 1;
        Ok(MockToken(token))
    }

    async fn unwatch_connection(
        &self,
        _device: &MockDevice,
        watch: MockToken,
    ) -> Result<(), ProviderError> {
        let mut state = self.enter(MockStep::Unwatch, "unwatch_connection");
        state.observers.retain(|(token, _)| *token != watch.0);
        state.open.watches -= 1;
        if state.cleanup_fails {
            return Err(ProviderError::Rejected("unwatch".to_string()));
        }
        Ok(())
    }

    async fn discover_service(
        &self,
        device: &MockDevice,
        service: Uuid,
    ) -> Result<MockService, ProviderError> {
        let state = self.enter(MockStep::DiscoverService, "discover_service");
        if state.service_missing {
            return Err(ProviderError::NotFound(service));
        }
        log::trace!("Mock service {} on {}", service, device.id);
        Ok(MockService { uuid: service })
    }

    async fn discover_characteristic(
        &self,
        service: &MockService,
        characteristic: Uuid,
    ) -> Result<MockCharacteristic, ProviderError> {
        let state = self.enter(MockStep::DiscoverCharacteristic, "discover_characteristic");
        if state.characteristic_missing {
            return Err(ProviderError::NotFound(characteristic));
        }
        log::trace!("Mock characteristic {} in {}", characteristic, service.uuid);
        Ok(MockCharacteristic {
            uuid: characteristic,
        })
    }

    async fn write_client_config(
        &self,
        characteristic: &MockCharacteristic,
        value: ClientConfig,
    ) -> Result<(), ProviderError> {
        let call = format!("write_client_config({:?})", value);
        let mut state = self.enter(MockStep::WriteClientConfig, &call);
        log::trace!("Mock CCCD write {:?} on {}", value, characteristic.uuid);
        match value {
            ClientConfig::Notify if state.subscribe_fails => {
                Err(ProviderError::Rejected("write not permitted".to_string()))
            }
            ClientConfig::Notify => {
                state.open.notifying = true;
                Ok(())
            }
            ClientConfig::None => {
                state.open.notifying = false;
                if state.cleanup_fails {
                    return Err(ProviderError::Rejected("disable notify".to_string()));
                }
                Ok(())
            }
        }
    }

    async fn subscribe(
        &self,
        _characteristic: &MockCharacteristic,
        on_value: ValueHandler,
    ) -> Result<MockToken, ProviderError> {
        let (token, script) = {
            let mut state = self.enter(MockStep::Subscribe, "subscribe");
            state.next_token += 1;
            let token = state.next_token;
            state.handlers.push((token, on_value));
            state.open.subscriptions += 1;
            (token, std::mem::take(&mut state.script))
        };

        for event in script {
            match event {
                MockEvent::Notify(value) => self.notify(&value),
                MockEvent::Disconnect => self.set_connection(ConnectionStatus::Disconnected),
                MockEvent::Reconnect => self.set_connection(ConnectionStatus::Connected),
            }
        }

        Ok(MockToken(token))
    }

    async fn unsubscribe(
        &self,
        _characteristic: &MockCharacteristic,
        subscription: MockToken,
    ) -> Result<(), ProviderError> {
        let mut state = self.enter(MockStep::Unsubscribe, "unsubscribe");
        state.handlers.retain(|(token, _)| *token != subscription.0);
        state.open.subscriptions -= 1;
        if state.cleanup_fails {
            return Err(ProviderError::Rejected("unsubscribe".to_string()));
        }
        Ok(())
    }

    async fn close(&self, device: MockDevice) -> Result<(), ProviderError> {
        let mut state = self.enter(MockStep::Close, "close");
        log::trace!("Mock close {}", device.id);
        state.open.devices -= 1;
        if state.cleanup_fails {
            return Err(ProviderError::Rejected("close".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tracks_handles() {
        let mock = MockProvider::with_sample_device();
        let devices = mock.find_devices(Uuid::nil()).await.unwrap();
        let device = mock.connect(&devices[0]).await.unwrap();
        let watch = mock
            .watch_connection(&device, Box::new(|_: ConnectionStatus| {}))
            .await
            .unwrap();

        assert_eq!(mock.open_handles().devices, 1);
        assert_eq!(mock.open_handles().watches, 1);

        mock.unwatch_connection(&device, watch).await.unwrap();
        mock.close(device).await.unwrap();
        assert!(mock.open_handles().is_empty());
        assert_eq!(
            mock.calls(),
            vec!["find_devices", "connect", "watch_connection", "unwatch_connection", "close"]
        );
    }

    #[tokio::test]
    async fn replays_script_on_subscribe() {
        let mock = MockProvider::with_sample_device()
            .with_events([MockEvent::Notify(vec![0x00, 0x3C]), MockEvent::Disconnect]);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let device = mock
            .connect(&MockDeviceRef { id: "hrm-1".into() })
            .await
            .unwrap();
        let sink = seen.clone();
        mock.watch_connection(
            &device,
            Box::new(move |status: ConnectionStatus| {
                sink.lock().unwrap().push(format!("{:?}", status))
            }),
        )
        .await
        .unwrap();
        let sink = seen.clone();
        mock.subscribe(
            &MockCharacteristic { uuid: Uuid::nil() },
            Box::new(move |value: &[u8]| sink.lock().unwrap().push(format!("{:?}", value))),
        )
        .await
        .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["[0, 60]", "Disconnected"]);
    }
}
