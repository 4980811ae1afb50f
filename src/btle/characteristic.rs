use std::pin::Pin;

use btleplug::api::{Characteristic, Peripheral as _};
use btleplug::platform::Peripheral;
use futures::{Stream, StreamExt};
use stream_cancel::{Trigger, Valved};
use uuid::Uuid;

use crate::provider::{ClientConfig, ValueHandler};
use crate::ProviderError;

#[derive(Clone)]
pub struct BtleCharacteristic {
    pub(crate) peripheral: Peripheral,
    pub(crate) characteristic: Characteristic,
}

impl BtleCharacteristic {
    /// Write the client configuration descriptor.
    pub(crate) async fn configure(&self, value: ClientConfig) -> Result<(), ProviderError> {
        match value {
            ClientConfig::Notify => self.peripheral.subscribe(&self.characteristic).await?,
            ClientConfig::None => self.peripheral.unsubscribe(&self.characteristic).await?,
        }
        Ok(())
    }

    /// Call `on_value` for each notification of this characteristic until the
    /// returned trigger is dropped.
    pub(crate) async fn listen(&self, on_value: ValueHandler) -> Result<Trigger, ProviderError> {
        let stream = self.peripheral.notifications().await?;
        let uuid = self.characteristic.uuid;

        let values: Pin<Box<dyn Stream<Item = Vec<u8>> + Send>> =
            Box::pin(stream.filter_map(move |n| async move {
                if n.uuid == uuid {
                    Some(n.value)
                } else {
                    None
                }
            }));
        let (trigger, mut values) = Valved::new(values);

        tokio::spawn(async move {
            while let Some(value) = values.next().await {
                on_value(&value);
            }

            log::trace!("Notifications for {} were stopped.", uuid);
        });

        Ok(trigger)
    }

    pub fn uuid(&self) -> Uuid {
        self.characteristic.uuid
    }
}
