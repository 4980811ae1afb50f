use std::fmt;

/// Point in the session lifecycle, as surfaced to the host.
///
/// The discriminants are the codes passed to the status callback and
/// returned by `GetCurrentStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum Status {
    /// No session is running. Also the idle state before the first start.
    #[default]
    Stopped = 0,
    Scanning = 1,
    Connecting = 2,
    Discovering = 3,
    Subscribing = 4,
    Disconnected = 5,
    Monitoring = 10,
    Stopping = 11,
    CleanupError = 98,
    UnknownError = 99,
}

impl Status {
    pub const IDLE: Status = Status::Stopped;

    #[inline]
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Status> {
        let status = match code {
            0 => Status::Stopped,
            1 => Status::Scanning,
            2 => Status::Connecting,
            3 => Status::Discovering,
            4 => Status::Subscribing,
            5 => Status::Disconnected,
            10 => Status::Monitoring,
            11 => Status::Stopping,
            98 => Status::CleanupError,
            99 => Status::UnknownError,
            _ => return None,
        };
        Some(status)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for status in [
            Status::Stopped,
            Status::Scanning,
            Status::Connecting,
            Status::Discovering,
            Status::Subscribing,
            Status::Disconnected,
            Status::Monitoring,
            Status::Stopping,
            Status::CleanupError,
            Status::UnknownError,
        ] {
            assert_eq!(Status::from_code(status.code()), Some(status));
        }
    }

    #[test]
    fn fixed_codes() {
        assert_eq!(Status::IDLE.code(), 0);
        assert_eq!(Status::Monitoring.code(), 10);
        assert_eq!(Status::UnknownError.code(), 99);
        assert_eq!(Status::from_code(6), None);
        assert_eq!(Status::Stopping.to_string(), "Stopping (11)");
    }
}
