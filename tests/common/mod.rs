#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use hrlink::{Dispatcher, MonitorConfig, Status};

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Status(Status, String),
    HeartRate(u16),
}

#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn attach(dispatcher: &Dispatcher) -> Self {
        let recorder = Recorder::default();

        let events = recorder.events.clone();
        dispatcher.set_status_handler(Some(Box::new(move |status, message| {
            events
                .lock()
                .unwrap()
                .push(Event::Status(status, message.to_string()));
        })));
        let events = recorder.events.clone();
        dispatcher.set_heart_rate_handler(Some(Box::new(move |bpm| {
            events.lock().unwrap().push(Event::HeartRate(bpm));
        })));

        recorder
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<Status> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Status(status, _) => Some(status),
                Event::HeartRate(_) => None,
            })
            .collect()
    }

    pub fn heart_rates(&self) -> Vec<u16> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::HeartRate(bpm) => Some(bpm),
                Event::Status(..) => None,
            })
            .collect()
    }

    pub fn last_message(&self) -> Option<String> {
        self.events().into_iter().rev().find_map(|event| match event {
            Event::Status(_, message) => Some(message),
            Event::HeartRate(_) => None,
        })
    }
}

pub fn config() -> MonitorConfig {
    MonitorConfig::default().poll_interval(Duration::from_millis(10))
}

pub fn init_logger() {
    let _ = pretty_env_logger::try_init();
}

/// Block until `condition` holds, failing the test after a few seconds.
pub fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for condition");
        thread::sleep(Duration::from_millis(5));
    }
}

pub const FULL_RUN: [Status; 7] = [
    Status::Scanning,
    Status::Connecting,
    Status::Discovering,
    Status::Subscribing,
    Status::Monitoring,
    Status::Stopping,
    Status::Stopped,
];
