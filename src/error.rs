use thiserror::Error;
use uuid::Uuid;

/// Failure reported by a [`GattProvider`](crate::GattProvider) call.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    #[error("no attribute with uuid {0}")]
    NotFound(Uuid),

    #[error("device handle could not be obtained")]
    Unreachable,

    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Reasons a monitoring session ends or reports a non-fatal problem.
#[derive(Error, Debug)]
pub enum Error {
    #[error("No HR device found.")]
    NoDeviceFound,

    #[error("Failed to connect: {0}")]
    ConnectFailed(#[source] ProviderError),

    #[error("HR service not found: {0}")]
    ServiceNotFound(#[source] ProviderError),

    #[error("HR measurement characteristic not found: {0}")]
    CharacteristicNotFound(#[source] ProviderError),

    #[error("Failed to subscribe to HR notifications: {0}")]
    SubscribeFailed(#[source] ProviderError),

    #[error("HR read error: payload of {actual} bytes, {required} required")]
    MalformedPayload { required: usize, actual: usize },

    #[error("Device disconnected")]
    RemoteDisconnected,

    #[error("Cleanup error: {0}")]
    CleanupError(#[source] ProviderError),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Rejections from the lifecycle controller.
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("monitoring is already running")]
    AlreadyRunning,

    #[error("monitoring is not running")]
    NotRunning,

    #[error("failed to spawn session worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("session worker panicked")]
    Join,

    #[error("cannot wait for the session from its own worker thread")]
    StopFromWorker,
}

impl ControlError {
    /// Result code returned across the C surface.
    pub fn code(&self) -> i32 {
        match self {
            ControlError::AlreadyRunning | ControlError::NotRunning => -1,
            ControlError::Spawn(_) | ControlError::Join | ControlError::StopFromWorker => -2,
        }
    }
}
