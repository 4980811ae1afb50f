//! Heart Rate Measurement (0x2A37) payload decoding.
//!
//! Only the heart rate value is read. Energy expended and RR-intervals
//! that may follow it are ignored.

use crate::Error;

/// Flags bit 0: heart rate value is a little-endian `u16` instead of a `u8`.
const RATE_U16: u8 = 1 << 0;

/// Decode the beats-per-minute value of a measurement notification.
pub fn decode(value: &[u8]) -> Result<u16, Error> {
    let Some(&flags) = value.first() else {
        return Err(Error::MalformedPayload {
            required: 1,
            actual: 0,
        });
    };

    if flags & RATE_U16 != 0 {
        match value.get(1..3) {
            Some(&[lo, hi]) => Ok(u16::from_le_bytes([lo, hi])),
            _ => Err(Error::MalformedPayload {
                required: 3,
                actual: value.len(),
            }),
        }
    } else {
        value
            .get(1)
            .map(|&rate| u16::from(rate))
            .ok_or(Error::MalformedPayload {
                required: 2,
                actual: value.len(),
            })
    }
}
