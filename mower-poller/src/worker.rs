//! Background worker thread owning the poller
//!
//! The host thread never talks to the API itself. It sends heartbeats and
//! commands over a channel; the worker runs them one at a time, so API calls
//! never overlap, and forwards the resulting [`PollEvent`]s back.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use automower_api::MowerApi;
use chrono::{DateTime, FixedOffset};

use crate::commands::MowerCommand;
use crate::events::PollEvent;
use crate::poller::MowerPoller;
use crate::{PollerError, Result};

/// Messages sent from the host to the worker
#[derive(Debug)]
pub enum WorkerCommand {
    /// Host heartbeat; polls when the interval has elapsed
    Heartbeat(DateTime<FixedOffset>),
    /// Send a command to a mower
    Execute {
        command: MowerCommand,
        now: DateTime<FixedOffset>,
    },
    /// Stop the worker
    Shutdown,
}

/// Spawns the background poller thread
pub fn spawn_poller_worker<A>(
    poller: MowerPoller<A>,
    command_rx: mpsc::Receiver<WorkerCommand>,
    event_tx: mpsc::Sender<PollEvent>,
) -> std::io::Result<JoinHandle<()>>
where
    A: MowerApi + 'static,
{
    thread::Builder::new()
        .name("mower-poller".to_string())
        .spawn(move || run_worker_loop(poller, command_rx, event_tx))
}

fn run_worker_loop<A: MowerApi>(
    mut poller: MowerPoller<A>,
    command_rx: mpsc::Receiver<WorkerCommand>,
    event_tx: mpsc::Sender<PollEvent>,
) {
    tracing::info!("Poller worker started");

    while let Ok(command) = command_rx.recv() {
        match command {
            WorkerCommand::Heartbeat(now) => {
                poller.poll_if_due(now);
            }
            WorkerCommand::Execute { command, now } => {
                tracing::debug!("Worker: executing {} for {}", command.kind, command.mower_id);
                // Failures are reported through the event queue.
                let _ = poller.execute(command, now);
            }
            WorkerCommand::Shutdown => {
                tracing::info!("Worker received shutdown command");
                break;
            }
        }

        for event in poller.take_events() {
            if event_tx.send(event).is_err() {
                tracing::debug!("Event receiver dropped, shutting down worker");
                return;
            }
        }
    }

    tracing::info!("Poller worker shut down");
}

/// Host-side handle to a running poller worker
pub struct PollerHandle {
    command_tx: mpsc::Sender<WorkerCommand>,
    event_rx: mpsc::Receiver<PollEvent>,
    worker: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Move `poller` onto its own thread
    pub fn spawn<A: MowerApi + 'static>(poller: MowerPoller<A>) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let worker = spawn_poller_worker(poller, command_rx, event_tx)?;

        Ok(Self {
            command_tx,
            event_rx,
            worker: Some(worker),
        })
    }

    pub fn heartbeat(&self, now: DateTime<FixedOffset>) -> Result<()> {
        self.send(WorkerCommand::Heartbeat(now))
    }

    pub fn execute(&self, command: MowerCommand, now: DateTime<FixedOffset>) -> Result<()> {
        self.send(WorkerCommand::Execute { command, now })
    }

    fn send(&self, command: WorkerCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| PollerError::WorkerStopped)
    }

    /// Events produced since the previous call, without blocking
    pub fn drain_events(&self) -> Vec<PollEvent> {
        self.event_rx.try_iter().collect()
    }

    /// Wait up to `timeout` for the next event
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<PollEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().map(|w| !w.is_finished()).unwrap_or(false)
    }

    /// Ask the worker to stop and wait up to `timeout` for it
    ///
    /// Returns true when the worker finished in time. A worker blocked in a
    /// slow API call is left to finish on its own.
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        let Some(worker) = self.worker.take() else {
            return true;
        };
        let _ = self.command_tx.send(WorkerCommand::Shutdown);

        let deadline = Instant::now() + timeout;
        while !worker.is_finished() {
            if Instant::now() >= deadline {
                tracing::warn!("Poller worker did not stop within {:?}", timeout);
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }

        if worker.join().is_err() {
            tracing::error!("Poller worker panicked");
        }
        true
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.command_tx.send(WorkerCommand::Shutdown);
        }
    }
}
