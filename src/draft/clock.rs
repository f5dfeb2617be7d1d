// Per-pick countdown clock.
//
// Each armed period is a spawned task that ticks down once per second and
// emits exactly one `Expired` at the deadline unless the clock is cancelled
// or re-armed first. Re-arming bumps the epoch; the consumer discards any
// expiry whose epoch is stale, which makes a reset safe against an expiry
// already in flight.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Events emitted by an armed clock into the session's event channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// Countdown broadcast: every 10 seconds, then each of the last 10.
    Tick { seconds_remaining: u64 },
    /// The armed period ran out. Only valid if `epoch` is still current.
    Expired { epoch: u64 },
}

pub struct DraftClock {
    events: mpsc::Sender<ClockEvent>,
    task: Option<JoinHandle<()>>,
    epoch: u64,
}

impl DraftClock {
    /// Create an unarmed clock that reports into `events`.
    pub fn new(events: mpsc::Sender<ClockEvent>) -> Self {
        DraftClock {
            events,
            task: None,
            epoch: 0,
        }
    }

    /// Arm (or re-arm) the clock for one pick window. Any previous period
    /// is cancelled. Returns the epoch of the new period.
    pub fn arm(&mut self, window: Duration) -> u64 {
        self.cancel();
        self.epoch += 1;
        let epoch = self.epoch;
        let tx = self.events.clone();
        self.task = Some(tokio::spawn(run_countdown(window, epoch, tx)));
        epoch
    }

    /// Cancel the armed period, if any. The cancelled period emits nothing
    /// further; an expiry already queued carries a stale epoch.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Epoch of the most recently armed period.
    pub fn current_epoch(&self) -> u64 {
        self.epoch
    }
}

impl Drop for DraftClock {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_countdown(window: Duration, epoch: u64, tx: mpsc::Sender<ClockEvent>) {
    let whole_seconds = window.as_secs();
    let mut remaining = whole_seconds;

    while remaining > 0 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        remaining -= 1;
        if remaining > 0 && (remaining % 10 == 0 || remaining <= 10) {
            if tx
                .send(ClockEvent::Tick {
                    seconds_remaining: remaining,
                })
                .await
                .is_err()
            {
                return;
            }
        }
    }

    // Sub-second remainder of the window (short windows in tests).
    let fraction = window.saturating_sub(Duration::from_secs(whole_seconds));
    if !fraction.is_zero() {
        tokio::time::sleep(fraction).await;
    }

    let _ = tx.send(ClockEvent::Expired { epoch }).await;
}
