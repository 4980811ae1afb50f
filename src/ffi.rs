//! C entry points exported by the `cdylib` build.
//!
//! All calls act on one process-wide controller driving the platform
//! Bluetooth stack. Every function returns `0` on success and a negative
//! code otherwise, except `GetCurrentStatus` which returns a status code.

#![allow(non_snake_case)]

use std::ffi::{c_char, CString};
use std::sync::LazyLock;

use crate::btle::BtleProvider;
use crate::{Controller, MonitorConfig};

/// `void (*)(int status, const char* message)`, stdcall on 32-bit Windows.
pub type StatusCallback = extern "system" fn(status: i32, message: *const c_char);

/// `void (*)(int bpm)`, stdcall on 32-bit Windows.
pub type HeartRateCallback = extern "system" fn(bpm: i32);

static PLUGIN: LazyLock<Controller<BtleProvider>> =
    LazyLock::new(|| Controller::new(BtleProvider::default(), MonitorConfig::default()));

/// Reset the reported status to idle. Safe to call more than once.
#[no_mangle]
pub extern "C" fn InitializePlugin() -> i32 {
    PLUGIN.dispatcher().reset_status();
    0
}

/// Register, replace or (with null) clear the status callback.
///
/// The message pointer is only valid for the duration of the call.
#[no_mangle]
pub extern "C" fn RegisterStatusCallback(callback: Option<StatusCallback>) -> i32 {
    PLUGIN
        .dispatcher()
        .set_status_handler(callback.map(|callback| {
            Box::new(move |status: crate::Status, message: &str| {
                let message = CString::new(message.replace('\0', " ")).unwrap_or_default();
                callback(status.code(), message.as_ptr());
            }) as crate::StatusHandler
        }));
    0
}

/// Register, replace or (with null) clear the heart rate callback.
#[no_mangle]
pub extern "C" fn RegisterHeartRateCallback(callback: Option<HeartRateCallback>) -> i32 {
    PLUGIN
        .dispatcher()
        .set_heart_rate_handler(callback.map(|callback| {
            Box::new(move |bpm: u16| callback(i32::from(bpm))) as crate::HeartRateHandler
        }));
    0
}

/// Start monitoring on a background thread. `-1` if already running,
/// `-2` if the thread could not be created.
#[no_mangle]
pub extern "C" fn StartHrMonitoring() -> i32 {
    match PLUGIN.start() {
        Ok(()) => 0,
        Err(e) => {
            log::warn!("StartHrMonitoring: {}", e);
            e.code()
        }
    }
}

/// Stop monitoring and block until the device has been released. `-1` if
/// not running, `-2` if the worker could not be joined.
#[no_mangle]
pub extern "C" fn StopHrMonitoring() -> i32 {
    match PLUGIN.stop() {
        Ok(outcome) => {
            log::debug!("Session ended: {:?}", outcome);
            0
        }
        Err(e) => {
            log::warn!("StopHrMonitoring: {}", e);
            e.code()
        }
    }
}

/// Last reported status code. Never blocks.
#[no_mangle]
pub extern "C" fn GetCurrentStatus() -> i32 {
    PLUGIN.status().code()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Status;
    use std::ffi::CStr;
    use std::sync::{Mutex, MutexGuard, PoisonError};

    // Every test drives the one process-wide controller.
    static SERIAL: Mutex<()> = Mutex::new(());
    static STATUSES: Mutex<Vec<(i32, String)>> = Mutex::new(Vec::new());
    static HEART_RATES: Mutex<Vec<i32>> = Mutex::new(Vec::new());

    fn serial() -> MutexGuard<'static, ()> {
        SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
    }

    extern "system" fn on_status(status: i32, message: *const c_char) {
        let message = unsafe { CStr::from_ptr(message) }
            .to_string_lossy()
            .into_owned();
        STATUSES.lock().unwrap().push((status, message));
    }

    extern "system" fn on_heart_rate(bpm: i32) {
        HEART_RATES.lock().unwrap().push(bpm);
    }

    #[test]
    fn stop_without_session_returns_minus_one() {
        let _serial = serial();
        assert_eq!(InitializePlugin(), 0);
        assert_eq!(StopHrMonitoring(), -1);
        assert_eq!(StopHrMonitoring(), -1);
    }

    #[test]
    fn status_callback_receives_code_and_message() {
        let _serial = serial();
        STATUSES.lock().unwrap().clear();

        assert_eq!(RegisterStatusCallback(Some(on_status)), 0);
        PLUGIN
            .dispatcher()
            .report_status(Status::Monitoring, "Connected and monitoring");
        PLUGIN.dispatcher().report_status(Status::UnknownError, "bad\0name");

        assert_eq!(RegisterStatusCallback(None), 0);
        PLUGIN.dispatcher().report_status(Status::Stopped, "Stopped");

        assert_eq!(
            *STATUSES.lock().unwrap(),
            vec![
                (10, "Connected and monitoring".to_string()),
                (99, "bad name".to_string())
            ]
        );
        assert_eq!(GetCurrentStatus(), 0);
    }

    #[test]
    fn heart_rate_callback_widens_bpm() {
        let _serial = serial();
        HEART_RATES.lock().unwrap().clear();

        assert_eq!(RegisterHeartRateCallback(Some(on_heart_rate)), 0);
        PLUGIN.dispatcher().report_heart_rate(72);
        PLUGIN.dispatcher().report_heart_rate(u16::MAX);
        assert_eq!(RegisterHeartRateCallback(None), 0);
        PLUGIN.dispatcher().report_heart_rate(80);

        assert_eq!(*HEART_RATES.lock().unwrap(), vec![72, 65535]);
    }

    #[test]
    fn initialize_resets_current_status() {
        let _serial = serial();

        PLUGIN.dispatcher().report_status(Status::Monitoring, "up");
        assert_eq!(GetCurrentStatus(), 10);

        assert_eq!(InitializePlugin(), 0);
        assert_eq!(GetCurrentStatus(), 0);
        assert_eq!(InitializePlugin(), 0);
        assert_eq!(GetCurrentStatus(), 0);
    }
}
