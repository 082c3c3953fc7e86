use std::{future::Future, sync::Arc, time::Duration};

use chrono::Utc;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time,
};

use crate::error::PersistError;
use crate::{log_debug, log_info, log_warn};

use super::state::{SaveEffect, SaveEvent, SaveMachine, SaveSnapshot};

const ENABLE_LOGS: bool = true;

pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_millis(1000);

/// Writes one full content snapshot to wherever the current target lives.
pub trait Persist: Send + Sync + 'static {
    fn save(&self, content: String) -> impl Future<Output = Result<(), PersistError>> + Send;
}

struct Inner<P> {
    machine: SaveMachine,
    persist: Option<Arc<P>>,
    timer: Option<JoinHandle<()>>,
    timer_seq: u64,
    /// Bumped on every target switch; saves started under an older value
    /// are discarded when they finish.
    generation: u64,
    /// Persist calls still running, whatever generation started them.
    in_flight: usize,
    busy_tx: watch::Sender<bool>,
}

impl<P> Inner<P> {
    fn cancel_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
    }

    fn publish_busy(&self) {
        self.busy_tx.send_replace(self.in_flight > 0);
    }
}

struct SaveJob<P> {
    persist: Arc<P>,
    content: String,
    generation: u64,
}

/// Debounced auto-save for a single editable target.
///
/// Each edit restarts the delay; when it elapses with unsaved changes the
/// latest content is persisted. At most one save is in flight.
pub struct AutoSaveCoordinator<P: Persist> {
    inner: Arc<Mutex<Inner<P>>>,
    delay: Duration,
}

impl<P: Persist> Clone for AutoSaveCoordinator<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            delay: self.delay,
        }
    }
}

impl<P: Persist> Default for AutoSaveCoordinator<P> {
    fn default() -> Self {
        Self::new(DEFAULT_AUTOSAVE_DELAY)
    }
}

impl<P: Persist> AutoSaveCoordinator<P> {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                machine: SaveMachine::new(),
                persist: None,
                timer: None,
                timer_seq: 0,
                generation: 0,
                in_flight: 0,
                busy_tx: watch::channel(false).0,
            })),
            delay,
        }
    }

    pub async fn get_snapshot(&self) -> SaveSnapshot {
        self.inner.lock().await.machine.snapshot()
    }

    pub async fn current_content(&self) -> String {
        self.inner.lock().await.machine.current_content().to_string()
    }

    /// Point the coordinator at a new target. Any pending timer is dropped,
    /// and a save still running for the old target will not touch this state.
    pub async fn switch_target(&self, persist: Option<P>, content: String) {
        let mut inner = self.inner.lock().await;
        inner.cancel_timer();
        inner.generation += 1;
        inner.persist = persist.map(Arc::new);
        let has_target = inner.persist.is_some();
        inner.machine.reset(has_target, content);
    }

    pub async fn content_changed(&self, content: String) {
        let mut inner = self.inner.lock().await;
        let effect = inner.machine.handle(SaveEvent::Edit(content));
        self.apply(&mut inner, effect);
    }

    /// Persist right away if there is anything to save and no save running.
    /// Resolves after that save finished.
    pub async fn save_now(&self) -> SaveSnapshot {
        let job = {
            let mut inner = self.inner.lock().await;
            match inner.machine.handle(SaveEvent::SaveNowRequested) {
                SaveEffect::Persist(content) => {
                    inner.cancel_timer();
                    self.job_for(&mut inner, content)
                }
                _ => None,
            }
        };

        if let Some(job) = job {
            // Spawned so the machine settles even if the caller stops waiting.
            let this = self.clone();
            if let Err(err) = tokio::spawn(async move { this.run_save(job).await }).await {
                log_warn!("Save task ended abnormally: {}", err);
            }
        }
        self.get_snapshot().await
    }

    /// Replace the content with `update(current)` in one step. Used for
    /// derived edits, so a concurrent edit is never overwritten with stale text.
    pub async fn update_content<F>(&self, update: F)
    where
        F: FnOnce(&str) -> String,
    {
        let mut inner = self.inner.lock().await;
        let content = update(inner.machine.current_content());
        let effect = inner.machine.handle(SaveEvent::Edit(content));
        self.apply(&mut inner, effect);
    }

    /// Resolves once no persist call is running, including calls started
    /// for a target that has since been switched away.
    pub async fn wait_idle(&self) {
        let mut busy = self.inner.lock().await.busy_tx.subscribe();
        // `self` keeps the sender alive, so the channel cannot close here
        let _ = busy.wait_for(|busy| !*busy).await;
    }

    /// Let any running save finish, then save what is still unsaved.
    pub async fn flush(&self) -> SaveSnapshot {
        loop {
            self.wait_idle().await;
            let snapshot = self.save_now().await;
            if !snapshot.is_saving {
                return snapshot;
            }
        }
    }

    fn apply(&self, inner: &mut Inner<P>, effect: SaveEffect) {
        match effect {
            SaveEffect::Nothing => {}
            SaveEffect::ArmTimer => self.arm_timer(inner),
            SaveEffect::Persist(content) => {
                if let Some(job) = self.job_for(inner, content) {
                    let this = self.clone();
                    tokio::spawn(async move { this.run_save(job).await });
                }
            }
        }
    }

    fn job_for(&self, inner: &mut Inner<P>, content: String) -> Option<SaveJob<P>> {
        match inner.persist.clone() {
            Some(persist) => {
                inner.in_flight += 1;
                inner.publish_busy();
                Some(SaveJob {
                    persist,
                    content,
                    generation: inner.generation,
                })
            }
            None => {
                // machine and persist slot disagree; settle the machine
                inner.machine.handle(SaveEvent::SaveCompleted {
                    content,
                    result: Err(PersistError::new("no save target selected")),
                    at: Utc::now(),
                });
                None
            }
        }
    }

    fn arm_timer(&self, inner: &mut Inner<P>) {
        inner.cancel_timer();
        inner.timer_seq += 1;

        let seq = inner.timer_seq;
        let generation = inner.generation;
        let delay = self.delay;
        let this = self.clone();

        inner.timer = Some(tokio::spawn(async move {
            time::sleep(delay).await;
            this.on_timer_fired(generation, seq).await;
        }));
    }

    async fn on_timer_fired(&self, generation: u64, seq: u64) {
        let job = {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation || inner.timer_seq != seq {
                return;
            }
            // Detach: a later edit must not abort the save this task runs.
            inner.timer = None;
            log_debug!("Auto-save timer fired");

            match inner.machine.handle(SaveEvent::TimerFired) {
                SaveEffect::Persist(content) => self.job_for(&mut inner, content),
                _ => None,
            }
        };

        if let Some(job) = job {
            self.run_save(job).await;
        }
    }

    async fn run_save(&self, job: SaveJob<P>) {
        let SaveJob {
            persist,
            content,
            generation,
        } = job;

        let result = persist.save(content.clone()).await;

        let mut inner = self.inner.lock().await;
        inner.in_flight -= 1;
        inner.publish_busy();
        if inner.generation != generation {
            log_info!("Discarding save result for a target that is no longer selected");
            return;
        }

        match &result {
            Ok(()) => log_info!("Auto-saved {} bytes", content.len()),
            Err(err) => log_warn!("Auto-save failed: {}", err),
        }

        let effect = inner.machine.handle(SaveEvent::SaveCompleted {
            content,
            result,
            at: Utc::now(),
        });
        self.apply(&mut inner, effect);
    }
}
