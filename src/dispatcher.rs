use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::Status;

pub type StatusHandler = Box<dyn Fn(Status, &str) + Send>;
pub type HeartRateHandler = Box<dyn Fn(u16) + Send>;

#[derive(Default)]
struct Handlers {
    status: Option<StatusHandler>,
    heart_rate: Option<HeartRateHandler>,
}

/// Delivers status and heart rate events to the registered handlers.
///
/// Registration and delivery share one lock, so a handler is never called
/// while it is being replaced, and once `None` is registered the previous
/// handler receives nothing more. Handlers run on the reporting thread with
/// the lock held and must not register handlers themselves.
#[derive(Default)]
pub struct Dispatcher {
    handlers: Mutex<Handlers>,
    last_status: AtomicI32,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status_handler(&self, handler: Option<StatusHandler>) {
        self.lock().status = handler;
    }

    pub fn set_heart_rate_handler(&self, handler: Option<HeartRateHandler>) {
        self.lock().heart_rate = handler;
    }

    pub fn report_status(&self, status: Status, message: &str) {
        log::info!("Status {}: {}", status, message);

        self.last_status.store(status.code(), Ordering::SeqCst);

        if let Some(handler) = self.lock().status.as_ref() {
            handler(status, message);
        }
    }

    pub fn report_heart_rate(&self, bpm: u16) {
        log::trace!("Heart rate: {}", bpm);

        if let Some(handler) = self.lock().heart_rate.as_ref() {
            handler(bpm);
        }
    }

    /// Last status passed to [`report_status`](Self::report_status). Never blocks.
    pub fn last_status(&self) -> Status {
        Status::from_code(self.last_status.load(Ordering::SeqCst)).unwrap_or_default()
    }

    pub fn reset_status(&self) {
        self.last_status.store(Status::IDLE.code(), Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Handlers> {
        // A panicking handler must not disable delivery for good.
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
