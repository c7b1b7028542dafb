//! Dynamic slot sizing and the slot timer.
//!
//! Slot length shrinks linearly with reputation:
//!
//! ```text
//! t_slot = t_min + (t_max - t_min) * (1 - clamp(rep, 0, 1))
//! ```
//!
//! truncated to whole seconds, so a fully trusted node is audited every
//! `t_min` seconds and an untrusted one every `t_max` seconds.
//!
//! [`SlotTimer`] drives slots on a tokio task. The current reputation is
//! published through a single-writer watch channel and read once at the
//! start of each wait.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::ReputationParams;
use crate::error::ProtocolError;

/// Clamps a reputation into `[0, 1]`; NaN is treated as 0.
pub fn clamp_unit(rep: f64) -> f64 {
    if rep.is_nan() { 0.0 } else { rep.clamp(0.0, 1.0) }
}

/// Slot-length bounds taken from [`ReputationParams`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotSchedule {
    pub t_min: u32,
    pub t_max: u32,
}

impl SlotSchedule {
    pub fn new(t_min: u32, t_max: u32) -> Self {
        Self { t_min, t_max }
    }

    pub fn from_params(params: &ReputationParams) -> Self {
        Self::new(params.t_min, params.t_max)
    }

    /// Rejects a zero `t_min` and `t_min > t_max`.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.t_min == 0 {
            return Err(ProtocolError::InvalidConfig(
                "t_min must be at least one second".to_string(),
            ));
        }
        if self.t_min > self.t_max {
            return Err(ProtocolError::InvalidConfig(
                "t_min exceeds t_max".to_string(),
            ));
        }
        Ok(())
    }

    /// Slot length in whole seconds for reputation `rep`.
    pub fn slot_length(&self, rep: f64) -> u32 {
        let span = f64::from(self.t_max.saturating_sub(self.t_min));
        let extra = (span * (1.0 - clamp_unit(rep))) as u32;
        self.t_min.saturating_add(extra)
    }
}

impl Default for SlotSchedule {
    fn default() -> Self {
        Self::from_params(&ReputationParams::default())
    }
}

#[derive(Debug)]
struct SlotState {
    slot_id: AtomicU64,
    slot_length: AtomicU32,
}

/// Handle to a running slot timer task.
///
/// Dropping the handle without calling [`SlotTimer::stop`] closes the
/// stop channel, which ends the task immediately.
#[derive(Debug)]
pub struct SlotTimer {
    state: Arc<SlotState>,
    rep_tx: watch::Sender<f64>,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SlotTimer {
    /// Spawns the timer on the current tokio runtime.
    ///
    /// `on_slot` is called with `(slot_id, slot_length)` when each slot
    /// elapses; slot ids start at 0. Fails if `schedule` does not validate.
    pub fn spawn<F>(
        schedule: SlotSchedule,
        initial_rep: f64,
        mut on_slot: F,
    ) -> Result<Self, ProtocolError>
    where
        F: FnMut(u64, u32) + Send + 'static,
    {
        schedule.validate()?;
        let state = Arc::new(SlotState {
            slot_id: AtomicU64::new(0),
            slot_length: AtomicU32::new(schedule.slot_length(initial_rep)),
        });
        let (rep_tx, mut rep_rx) = watch::channel(initial_rep);
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task_state = Arc::clone(&state);
        let task = tokio::spawn(async move {
            loop {
                let rep = *rep_rx.borrow_and_update();
                let length = schedule.slot_length(rep);
                task_state.slot_length.store(length, Ordering::SeqCst);

                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = tokio::time::sleep(Duration::from_secs(u64::from(length))) => {
                        let slot_id = task_state.slot_id.load(Ordering::SeqCst);
                        tracing::debug!(slot_id, length, "slot elapsed");
                        on_slot(slot_id, length);
                        task_state.slot_id.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
        });

        Ok(Self {
            state,
            rep_tx,
            stop_tx,
            task,
        })
    }

    /// Publishes a new reputation; it takes effect at the next wait.
    pub fn update_reputation(&self, rep: f64) {
        self.rep_tx.send_replace(rep);
    }

    /// Id of the slot currently being waited on.
    pub fn current_slot_id(&self) -> u64 {
        self.state.slot_id.load(Ordering::SeqCst)
    }

    /// Length of the slot currently being waited on, in seconds.
    pub fn current_slot_length(&self) -> u32 {
        self.state.slot_length.load(Ordering::SeqCst)
    }

    /// Interrupts the current wait and waits for the task to finish.
    pub async fn stop(self) {
        self.stop_tx.send_replace(true);
        if let Err(e) = self.task.await {
            tracing::warn!("slot timer task ended abnormally: {e}");
        }
    }
}
