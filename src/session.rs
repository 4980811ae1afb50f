use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

use crate::provider::{ClientConfig, ConnectionStatus, GattProvider};
use crate::{measurement, Dispatcher, Error, MonitorConfig, ProviderError, Status};

/// How a session ended.
#[derive(Debug)]
pub enum Outcome {
    /// A stop was requested.
    Stopped,
    /// The remote device dropped the connection.
    Disconnected,
    Failed(Error),
}

/// Provider callbacks, funnelled to the session so that it alone talks to
/// the dispatcher.
#[derive(Debug)]
enum SessionEvent {
    Value(Vec<u8>),
    Connection(ConnectionStatus),
}

enum Exit {
    Cancelled,
    Disconnected,
}

/// One run from scan to teardown against a single device.
///
/// The session owns every handle it acquires and releases them in
/// [`run`](Self::run) no matter how the run ends.
pub struct Session<P: GattProvider> {
    provider: Arc<P>,
    dispatcher: Arc<Dispatcher>,
    config: MonitorConfig,
    cancel: CancellationToken,
    device: Option<P::Device>,
    watch: Option<P::Watch>,
    characteristic: Option<P::Characteristic>,
    notifying: bool,
    subscription: Option<P::Subscription>,
}

impl<P: GattProvider> Session<P> {
    pub fn new(
        provider: Arc<P>,
        dispatcher: Arc<Dispatcher>,
        config: MonitorConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            config,
            cancel,
            device: None,
            watch: None,
            characteristic: None,
            notifying: false,
            subscription: None,
        }
    }

    /// Drive the session to completion. The last status reported is always
    /// [`Status::Stopped`].
    pub async fn run(mut self) -> Outcome {
        let (sender, mut receiver) = mpsc::unbounded_channel();

        let exit = AssertUnwindSafe(self.drive(sender, &mut receiver))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(Error::Unknown(panic_message(panic.as_ref()))));

        let outcome = match exit {
            Ok(Exit::Cancelled) => Outcome::Stopped,
            Ok(Exit::Disconnected) => Outcome::Disconnected,
            Err(e) => {
                log::error!("Session failed: {}", e);
                if matches!(e, Error::Unknown(_)) {
                    self.dispatcher.report_status(Status::UnknownError, &e.to_string());
                }
                Outcome::Failed(e)
            }
        };

        // Provider callbacks that still fire before teardown finishes are dropped.
        drop(receiver);

        if self.holds_handles() {
            let message = match &outcome {
                Outcome::Failed(e) => e.to_string(),
                _ => "Stopping...".to_string(),
            };
            self.dispatcher.report_status(Status::Stopping, &message);
            self.teardown().await;
        }

        let message = match &outcome {
            Outcome::Failed(e) => e.to_string(),
            _ => "Stopped".to_string(),
        };
        self.dispatcher.report_status(Status::Stopped, &message);

        outcome
    }

    async fn drive(
        &mut self,
        sender: UnboundedSender<SessionEvent>,
        receiver: &mut UnboundedReceiver<SessionEvent>,
    ) -> Result<Exit, Error> {
        let provider = self.provider.clone();
        let dispatcher = self.dispatcher.clone();

        dispatcher.report_status(Status::Scanning, "Starting scan...");
        let devices = provider
            .find_devices(self.config.service)
            .await
            .map_err(|e| Error::Unknown(format!("scan failed: {}", e)))?;
        // First match wins; candidates are not ranked.
        let Some(candidate) = devices.into_iter().next() else {
            return Err(Error::NoDeviceFound);
        };
        log::info!("Using device {:?}", candidate);

        if self.cancel.is_cancelled() {
            return Ok(Exit::Cancelled);
        }

        dispatcher.report_status(Status::Connecting, "Connecting...");
        let device = self.device.insert(
            provider
                .connect(&candidate)
                .await
                .map_err(Error::ConnectFailed)?,
        );

        let events = sender.clone();
        let observer = Box::new(move |status| {
            events.send(SessionEvent::Connection(status)).ok();
        });
        self.watch = Some(
            provider
                .watch_connection(device, observer)
                .await
                .map_err(Error::ConnectFailed)?,
        );

        if provider.connection_status(device).await != ConnectionStatus::Connected {
            log::debug!("Device not connected yet, continuing with discovery");
        }

        if self.cancel.is_cancelled() {
            return Ok(Exit::Cancelled);
        }

        dispatcher.report_status(Status::Discovering, "Discovering services...");
        let service = provider
            .discover_service(device, self.config.service)
            .await
            .map_err(Error::ServiceNotFound)?;
        let characteristic = self.characteristic.insert(
            provider
                .discover_characteristic(&service, self.config.characteristic)
                .await
                .map_err(Error::CharacteristicNotFound)?,
        );

        if self.cancel.is_cancelled() {
            return Ok(Exit::Cancelled);
        }

        dispatcher.report_status(Status::Subscribing, "Subscribing...");
        provider
            .write_client_config(characteristic, ClientConfig::Notify)
            .await
            .map_err(Error::SubscribeFailed)?;
        self.notifying = true;

        let events = sender.clone();
        let on_value = Box::new(move |value: &[u8]| {
            events.send(SessionEvent::Value(value.to_vec())).ok();
        });
        self.subscription = Some(
            provider
                .subscribe(characteristic, on_value)
                .await
                .map_err(Error::SubscribeFailed)?,
        );

        dispatcher.report_status(Status::Monitoring, "Connected and monitoring");

        self.monitor(receiver).await
    }

    async fn monitor(
        &mut self,
        receiver: &mut UnboundedReceiver<SessionEvent>,
    ) -> Result<Exit, Error> {
        loop {
            if self.cancel.is_cancelled() {
                return Ok(Exit::Cancelled);
            }

            tokio::select! {
                biased;

                event = receiver.recv() => match event {
                    Some(SessionEvent::Value(value)) => self.on_value(&value),
                    Some(SessionEvent::Connection(ConnectionStatus::Disconnected)) => {
                        let message = Error::RemoteDisconnected.to_string();
                        self.dispatcher.report_status(Status::Disconnected, &message);
                        self.cancel.cancel();
                        return Ok(Exit::Disconnected);
                    }
                    Some(SessionEvent::Connection(ConnectionStatus::Connected)) => {
                        log::debug!("Device reported connected");
                    }
                    None => return Err(Error::Unknown("event channel closed".to_string())),
                },
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }

    fn on_value(&self, value: &[u8]) {
        match measurement::decode(value) {
            Ok(bpm) => self.dispatcher.report_heart_rate(bpm),
            Err(e) => {
                log::warn!("Dropping measurement {:02x?}: {}", value, e);
                self.dispatcher.report_status(Status::UnknownError, &e.to_string());
            }
        }
    }

    fn holds_handles(&self) -> bool {
        self.device.is_some() || self.characteristic.is_some()
    }

    /// Release everything acquired so far. Notifications are stopped before
    /// the device is closed. Each step is attempted even if an earlier one
    /// failed or panicked.
    async fn teardown(&mut self) {
        let provider = self.provider.clone();

        if let Some(characteristic) = self.characteristic.take() {
            if let Some(subscription) = self.subscription.take() {
                self.release(provider.unsubscribe(&characteristic, subscription)).await;
            }
            if std::mem::take(&mut self.notifying) {
                self.release(provider.write_client_config(&characteristic, ClientConfig::None))
                    .await;
            }
        }

        if let Some(device) = self.device.take() {
            if let Some(watch) = self.watch.take() {
                self.release(provider.unwatch_connection(&device, watch)).await;
            }
            self.release(provider.close(device)).await;
        }
    }

    /// Run one release call, reporting a failure or panic as a cleanup error.
    async fn release(&self, call: impl Future<Output = Result<(), ProviderError>>) {
        let message = match AssertUnwindSafe(call).catch_unwind().await {
            Ok(Ok(())) => return,
            Ok(Err(e)) => Error::CleanupError(e).to_string(),
            Err(panic) => format!("Cleanup error: {}", panic_message(panic.as_ref())),
        };
        log::warn!("{}", message);
        self.dispatcher.report_status(Status::CleanupError, &message);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "Unknown error occurred.".to_string()
    }
}
