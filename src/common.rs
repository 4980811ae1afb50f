//! Assigned numbers used by the heart rate profile.

pub mod services {
    use btleplug::api::bleuuid::uuid_from_u16;
    use uuid::Uuid;

    pub const HEART_RATE: Uuid = uuid_from_u16(0x180D);
}

pub mod characteristics {
    use btleplug::api::bleuuid::uuid_from_u16;
    use uuid::Uuid;

    pub const HEART_RATE_MEASUREMENT: Uuid = uuid_from_u16(0x2A37);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuids_expand_to_bluetooth_base() {
        assert_eq!(
            services::HEART_RATE.to_string(),
            "0000180d-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            characteristics::HEART_RATE_MEASUREMENT.to_string(),
            "00002a37-0000-1000-8000-00805f9b34fb"
        );
    }
}
