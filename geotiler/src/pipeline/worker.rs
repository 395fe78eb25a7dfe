//! Worker thread and event queue for pipeline runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::warn;

use super::run::{run, PipelineEvent, PipelineReport};
use super::{PipelineError, PipelineResult};
use crate::config::PipelineConfig;
use crate::engine::RasterEngine;

/// Launches pipeline runs on a dedicated worker thread.
///
/// At most one run is active per worker; a second start while one is in
/// flight is rejected outright rather than queued. Runs are not
/// cancellable: the external tools execute to completion or failure.
pub struct PipelineWorker {
    active: Arc<AtomicBool>,
}

impl Default for PipelineWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineWorker {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a run is currently in flight.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Start a run on the worker thread.
    ///
    /// Returns the handle for draining progress events and collecting the
    /// final result, or [`PipelineError::AlreadyRunning`] when a run is
    /// still in flight.
    pub fn start(
        &self,
        engine: Arc<dyn RasterEngine>,
        config: PipelineConfig,
    ) -> PipelineResult<PipelineRun> {
        if self.active.swap(true, Ordering::SeqCst) {
            warn!("pipeline start rejected: a run is already active");
            return Err(PipelineError::AlreadyRunning);
        }

        let (sender, events) = mpsc::channel();
        let active = ActiveUntilDropped(Arc::clone(&self.active));
        let handle = std::thread::spawn(move || {
            let _active = active;
            // A dropped receiver only means nobody is listening; the run
            // itself must not care.
            let emit = move |event: PipelineEvent| {
                let _ = sender.send(event);
            };
            run(engine.as_ref(), &config, &emit)
        });

        Ok(PipelineRun { events, handle })
    }
}

/// Clears the worker's active flag when the run ends, even by panic.
struct ActiveUntilDropped(Arc<AtomicBool>);

impl Drop for ActiveUntilDropped {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Handle to one in-flight pipeline run.
///
/// Progress events arrive in the order the worker produced them. The
/// controlling thread is expected to drain them on a fixed polling
/// interval; draining never blocks.
pub struct PipelineRun {
    events: Receiver<PipelineEvent>,
    handle: JoinHandle<PipelineResult<PipelineReport>>,
}

impl PipelineRun {
    /// Take the next pending event without blocking.
    pub fn try_next_event(&self) -> Option<PipelineEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Whether the worker has finished (successfully or not).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker and return its result.
    ///
    /// Events still queued can be drained with [`try_next_event`] before
    /// calling this; afterwards the queue is gone.
    ///
    /// [`try_next_event`]: PipelineRun::try_next_event
    pub fn wait(self) -> PipelineResult<PipelineReport> {
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => Err(PipelineError::WorkerPanicked),
        }
    }
}
