use btleplug::api::Service;
use btleplug::platform::Peripheral;
use uuid::Uuid;

use super::BtleCharacteristic;
use crate::ProviderError;

pub struct BtleService {
    pub(crate) peripheral: Peripheral,
    pub(crate) service: Service,
}

impl BtleService {
    pub(crate) fn characteristic(&self, uuid: Uuid) -> Result<BtleCharacteristic, ProviderError> {
        self.service
            .characteristics
            .iter()
            .find(|characteristic| characteristic.uuid == uuid)
            .map(|characteristic| BtleCharacteristic {
                peripheral: self.peripheral.clone(),
                characteristic: characteristic.clone(),
            })
            .ok_or(ProviderError::NotFound(uuid))
    }

    pub fn uuid(&self) -> Uuid {
        self.service.uuid
    }
}
