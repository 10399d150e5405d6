use crate::{
    config::AnalysisConfig,
    error::Result,
    session::{run_pipeline, AnalysisResult, AnalysisSession},
    signal::Signal,
};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::thread::JoinHandle;

enum Job {
    Run {
        generation: u64,
        raw: Arc<Signal>,
        config: AnalysisConfig,
    },
    Shutdown,
}

struct Completed {
    generation: u64,
    raw: Arc<Signal>,
    outcome: Result<AnalysisResult>,
}

/// Runs pipelines off the caller's thread. Only the most recently submitted run is ever
/// published; older ones are skipped or dropped when they finish.
pub struct AnalysisWorker {
    job_tx: Sender<Job>,
    done_rx: Receiver<Completed>,
    latest: Arc<AtomicU64>,
    submitted: u64,
    collected: u64,
    handle: Option<JoinHandle<()>>,
}

impl AnalysisWorker {
    pub fn new() -> Self {
        let (job_tx, job_rx) = bounded(32);
        // Holds only the newest finished run; the worker replaces anything left uncollected.
        let (done_tx, done_rx) = bounded(1);
        let latest = Arc::new(AtomicU64::new(0));
        let worker_latest = Arc::clone(&latest);
        let uncollected = done_rx.clone();
        let handle =
            std::thread::spawn(move || run_jobs(job_rx, done_tx, uncollected, worker_latest));
        Self {
            job_tx,
            done_rx,
            latest,
            submitted: 0,
            collected: 0,
            handle: Some(handle),
        }
    }

    /// Queue a full run over `raw`. Returns the run's generation.
    pub fn submit(&mut self, raw: Arc<Signal>, config: AnalysisConfig) -> u64 {
        self.submitted += 1;
        let generation = self.submitted;
        self.latest.store(generation, Ordering::SeqCst);
        if self
            .job_tx
            .send(Job::Run {
                generation,
                raw,
                config,
            })
            .is_err()
        {
            log::error!("analysis worker is gone; run {generation} dropped");
        }
        generation
    }

    /// True while the latest submission has not been collected.
    pub fn is_pending(&self) -> bool {
        self.collected < self.submitted
    }

    /// Publish the latest run if it has finished, without blocking.
    ///
    /// `None` when nothing new is available; otherwise the run's generation, or its error
    /// (the session keeps its previous result in that case).
    pub fn try_collect(&mut self, session: &mut AnalysisSession) -> Option<Result<u64>> {
        let mut outcome = None;
        while let Ok(done) = self.done_rx.try_recv() {
            if let Some(collected) = self.accept(done, session) {
                outcome = Some(collected);
            }
        }
        outcome
    }

    /// Block until the latest submitted run finishes, then publish it like `try_collect`.
    pub fn wait(&mut self, session: &mut AnalysisSession) -> Option<Result<u64>> {
        while self.is_pending() {
            match self.done_rx.recv() {
                Ok(done) => {
                    if let Some(collected) = self.accept(done, session) {
                        return Some(collected);
                    }
                }
                Err(_) => {
                    log::error!("analysis worker stopped before finishing run {}", self.submitted);
                    return None;
                }
            }
        }
        None
    }

    fn accept(&mut self, done: Completed, session: &mut AnalysisSession) -> Option<Result<u64>> {
        if done.generation != self.submitted {
            log::warn!(
                "discarding stale run {} (latest is {})",
                done.generation,
                self.submitted
            );
            return None;
        }
        self.collected = done.generation;
        match done.outcome {
            Ok(result) => {
                if session.publish(&done.raw, result) {
                    Some(Ok(done.generation))
                } else {
                    None
                }
            }
            Err(e) => {
                log::warn!("run {} failed: {e}", done.generation);
                Some(Err(e))
            }
        }
    }
}

impl Default for AnalysisWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        let _ = self.job_tx.send(Job::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_jobs(
    job_rx: Receiver<Job>,
    done_tx: Sender<Completed>,
    uncollected: Receiver<Completed>,
    latest: Arc<AtomicU64>,
) {
    while let Ok(job) = job_rx.recv() {
        let (generation, raw, config) = match job {
            Job::Run {
                generation,
                raw,
                config,
            } => (generation, raw, config),
            Job::Shutdown => break,
        };
        if generation < latest.load(Ordering::SeqCst) {
            log::debug!("skipping superseded run {generation}");
            continue;
        }
        let outcome = run_pipeline(&raw, &config);
        if generation < latest.load(Ordering::SeqCst) {
            log::warn!("run {generation} finished after being superseded; dropped");
            continue;
        }
        let done = Completed {
            generation,
            raw,
            outcome,
        };
        if !deliver(&done_tx, &uncollected, done) {
            break;
        }
    }
}

/// Hand a finished run to the caller without ever blocking on it.
fn deliver(
    done_tx: &Sender<Completed>,
    uncollected: &Receiver<Completed>,
    mut done: Completed,
) -> bool {
    loop {
        match done_tx.try_send(done) {
            Ok(()) => return true,
            Err(TrySendError::Full(back)) => {
                if let Ok(old) = uncollected.try_recv() {
                    log::debug!(
                        "replacing uncollected run {} with {}",
                        old.generation,
                        back.generation
                    );
                }
                done = back;
            }
            Err(TrySendError::Disconnected(_)) => return false,
        }
    }
}
