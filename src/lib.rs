//! Heart rate monitoring over BLE, packaged as a loadable component.
//!
//! A session finds the first device advertising the Heart Rate service,
//! connects, subscribes to Heart Rate Measurement notifications and reports
//! every decoded BPM value until it is stopped or the device goes away.
//! Sessions run one at a time on their own thread and report progress
//! through callbacks.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hrlink::btle::{BtleProvider, ScanConfig};
//! use hrlink::{Controller, MonitorConfig};
//! use std::time::Duration;
//!
//! fn main() -> Result<(), hrlink::ControlError> {
//!     pretty_env_logger::init();
//!
//!     let provider = BtleProvider::new(ScanConfig::default().stop_after_timeout(Duration::from_secs(15)));
//!     let controller = Controller::new(provider, MonitorConfig::default());
//!
//!     controller
//!         .dispatcher()
//!         .set_status_handler(Some(Box::new(|status, message| println!("{}: {}", status, message))));
//!     controller
//!         .dispatcher()
//!         .set_heart_rate_handler(Some(Box::new(|bpm| println!("{} BPM", bpm))));
//!
//!     controller.start()?;
//!     std::thread::sleep(Duration::from_secs(30));
//!     controller.stop()?;
//!
//!     Ok(())
//! }
//!```
//!
//! Hosts that load the `cdylib` use the functions in [`ffi`] instead.

#![warn(clippy::all, future_incompatible, nonstandard_style, rust_2018_idioms)]

pub use config::MonitorConfig;
pub use controller::Controller;
pub use dispatcher::{Dispatcher, HeartRateHandler, StatusHandler};
pub use error::{ControlError, Error, ProviderError};
pub use provider::{ClientConfig, ConnectionObserver, ConnectionStatus, GattProvider, ValueHandler};
pub use session::{Outcome, Session};
pub use status::Status;

mod config;
mod controller;
mod dispatcher;
mod error;
mod provider;
mod session;
mod status;

pub mod btle;
pub mod common;
pub mod ffi;
pub mod measurement;
pub mod mock;
