//! This example finds the first BLE device that advertises the heart rate service,
//! connects to it and prints heart rate values until Enter is pressed.

use std::io::BufRead;
use std::time::Duration;

use hrlink::btle::{BtleProvider, ScanConfig};
use hrlink::{ControlError, Controller, MonitorConfig};

fn main() -> Result<(), ControlError> {
    pretty_env_logger::init();

    let provider =
        BtleProvider::new(ScanConfig::default().stop_after_timeout(Duration::from_secs(15)));
    let controller = Controller::new(provider, MonitorConfig::default());

    controller
        .dispatcher()
        .set_status_handler(Some(Box::new(|status, message| {
            println!("[{}] {}", status, message)
        })));
    controller
        .dispatcher()
        .set_heart_rate_handler(Some(Box::new(|bpm| println!("{} BPM", bpm))));

    controller.start()?;

    println!("Press Enter to stop");
    std::io::stdin().lock().lines().next();

    match controller.stop() {
        Ok(outcome) => println!("Session ended: {:?}", outcome),
        Err(ControlError::NotRunning) => println!("Session had already ended"),
        Err(e) => return Err(e),
    }

    Ok(())
}
