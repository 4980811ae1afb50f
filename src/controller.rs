use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tokio_util::sync::CancellationToken;

use crate::provider::GattProvider;
use crate::session::{Outcome, Session};
use crate::{ControlError, Dispatcher, Error, MonitorConfig, Status};

struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<Outcome>,
}

/// Starts and stops monitoring sessions, at most one at a time.
pub struct Controller<P: GattProvider> {
    provider: Arc<P>,
    config: MonitorConfig,
    dispatcher: Arc<Dispatcher>,
    worker: Mutex<Option<Worker>>,
}

impl<P: GattProvider> Controller<P> {
    pub fn new(provider: P, config: MonitorConfig) -> Self {
        Self {
            provider: Arc::new(provider),
            config,
            dispatcher: Arc::new(Dispatcher::new()),
            worker: Mutex::new(None),
        }
    }

    /// Where status and heart rate events are delivered.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn status(&self) -> Status {
        self.dispatcher.last_status()
    }

    pub fn is_running(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    /// Spawn a session on a dedicated thread. Returns as soon as the thread
    /// is running.
    pub fn start(&self) -> Result<(), ControlError> {
        let mut worker = self.lock();

        if let Some(running) = worker.take() {
            if !running.handle.is_finished() {
                log::info!("Monitoring is already running.");
                *worker = Some(running);
                return Err(ControlError::AlreadyRunning);
            }
            reap(running);
        }

        let cancel = CancellationToken::new();
        let session = Session::new(
            self.provider.clone(),
            self.dispatcher.clone(),
            self.config.clone(),
            cancel.clone(),
        );
        let dispatcher = self.dispatcher.clone();

        let handle = thread::Builder::new()
            .name("hr-session".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let e = Error::Unknown(format!("failed to start runtime: {}", e));
                        log::error!("{}", e);
                        dispatcher.report_status(Status::UnknownError, &e.to_string());
                        dispatcher.report_status(Status::Stopped, "Stopped");
                        return Outcome::Failed(e);
                    }
                };
                runtime.block_on(session.run())
            })
            .map_err(|e| {
                self.dispatcher.report_status(Status::UnknownError, &e.to_string());
                ControlError::Spawn(e)
            })?;

        log::debug!("Session worker started");
        *worker = Some(Worker { cancel, handle });

        Ok(())
    }

    /// Request the running session to stop and wait until it has released
    /// everything.
    ///
    /// The session notices the request within its poll interval, or once the
    /// provider call in flight returns. Called from the session's own thread,
    /// e.g. by a status handler, the request is made but not waited for.
    pub fn stop(&self) -> Result<Outcome, ControlError> {
        let mut worker = self.lock();

        let Some(running) = worker.take() else {
            log::info!("Monitoring is not running.");
            return Err(ControlError::NotRunning);
        };

        if running.handle.is_finished() {
            reap(running);
            log::info!("Monitoring is not running.");
            return Err(ControlError::NotRunning);
        }

        running.cancel.cancel();

        if running.handle.thread().id() == thread::current().id() {
            log::warn!("Stop requested from the session worker, not waiting for it");
            // Reaped by the next start or stop.
            *worker = Some(running);
            return Err(ControlError::StopFromWorker);
        }

        running.handle.join().map_err(|_| {
            self.dispatcher.report_status(Status::CleanupError, "Session worker panicked");
            ControlError::Join
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P: GattProvider> Drop for Controller<P> {
    fn drop(&mut self) {
        if self.is_running() {
            self.stop().ok();
        }
    }
}

/// Join a worker that has already finished on its own.
fn reap(worker: Worker) {
    match worker.handle.join() {
        Ok(outcome) => log::debug!("Previous session ended: {:?}", outcome),
        Err(_) => log::warn!("Previous session worker panicked"),
    }
}
