//! Countdown timers for duration-based exercises
//!
//! Each exercise index owns an independent state machine driven by its own
//! tokio ticker (one tick per second). The bank owning the timers aborts every
//! ticker when it is dropped, so a closed session never leaves tasks behind.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::debug;

const TICK: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
/// Timer State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
#[derive(Default)]
pub enum TimerState {
    /// Not started, or reset; full duration remaining
    #[default]
    Idle,
    Running { remaining_secs: u32 },
    Paused { remaining_secs: u32 },
    /// Counted down to zero
    Expired,
}

impl TimerState {
    /// Begin or resume counting. No-op when already running or expired.
    pub fn start(self, full_secs: u32) -> Self {
        match self {
            TimerState::Idle if full_secs == 0 => TimerState::Expired,
            TimerState::Idle => TimerState::Running {
                remaining_secs: full_secs,
            },
            TimerState::Paused { remaining_secs } => TimerState::Running { remaining_secs },
            other => other,
        }
    }

    /// Freeze the countdown. No-op unless running.
    pub fn pause(self) -> Self {
        match self {
            TimerState::Running { remaining_secs } => TimerState::Paused { remaining_secs },
            other => other,
        }
    }

    /// One second elapsed
    pub fn tick(self) -> Self {
        match self {
            TimerState::Running { remaining_secs } if remaining_secs <= 1 => TimerState::Expired,
            TimerState::Running { remaining_secs } => TimerState::Running {
                remaining_secs: remaining_secs - 1,
            },
            other => other,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, TimerState::Running { .. })
    }

    pub fn remaining_secs(&self, full_secs: u32) -> u32 {
        match self {
            TimerState::Idle => full_secs,
            TimerState::Running { remaining_secs } | TimerState::Paused { remaining_secs } => {
                *remaining_secs
            }
            TimerState::Expired => 0,
        }
    }
}

/// Progress notifications for whoever renders the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TimerEvent {
    Tick { index: usize, remaining_secs: u32 },
    Expired { index: usize },
}

// ---------------------------------------------------------------------------
/// Timer Bank
// ---------------------------------------------------------------------------

struct TimerSlot {
    full_secs: u32,
    state: Arc<Mutex<TimerState>>,
    ticker: Option<JoinHandle<()>>,
}

impl TimerSlot {
    fn halt(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}

/// Current subscriber, read by every ticker on each tick
type EventSink = Arc<Mutex<Option<UnboundedSender<TimerEvent>>>>;

/// Per-exercise timers keyed by exercise index
#[derive(Default)]
pub struct ExerciseTimers {
    slots: HashMap<usize, TimerSlot>,
    events: EventSink,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ExerciseTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive tick/expiry events. A new subscription replaces the previous
    /// one, including for timers that are already running.
    pub fn subscribe(&mut self) -> UnboundedReceiver<TimerEvent> {
        let (tx, rx) = unbounded_channel();
        *lock(&self.events) = Some(tx);
        rx
    }

    /// Start or resume the countdown for `index`. Must be called inside a
    /// tokio runtime. `full_secs` is the exercise's current full duration.
    pub fn start(&mut self, index: usize, full_secs: u32) -> TimerState {
        let slot = self.slots.entry(index).or_insert_with(|| TimerSlot {
            full_secs,
            state: Arc::new(Mutex::new(TimerState::Idle)),
            ticker: None,
        });
        slot.full_secs = full_secs;

        let next = {
            let mut state = lock(&slot.state);
            *state = state.start(slot.full_secs);
            *state
        };

        let ticking = slot.ticker.as_ref().is_some_and(|h| !h.is_finished());
        if next.is_running() && !ticking {
            debug!(index, remaining = next.remaining_secs(slot.full_secs), "timer started");
            slot.ticker = Some(tokio::spawn(run_ticker(
                index,
                Arc::clone(&slot.state),
                Arc::clone(&self.events),
            )));
        }

        next
    }

    pub fn pause(&mut self, index: usize) -> TimerState {
        match self.slots.get_mut(&index) {
            Some(slot) => {
                slot.halt();
                let mut state = lock(&slot.state);
                *state = state.pause();
                *state
            }
            None => TimerState::Idle,
        }
    }

    /// Back to `full_secs`, not running
    pub fn reset(&mut self, index: usize, full_secs: u32) -> TimerState {
        if let Some(slot) = self.slots.get_mut(&index) {
            slot.halt();
            slot.full_secs = full_secs;
            *lock(&slot.state) = TimerState::Idle;
        }
        TimerState::Idle
    }

    /// Halt the ticker for `index` (the exercise was marked)
    pub fn stop(&mut self, index: usize) {
        self.pause(index);
    }

    pub fn stop_all(&mut self) {
        for slot in self.slots.values_mut() {
            slot.halt();
            let mut state = lock(&slot.state);
            *state = state.pause();
        }
    }

    /// Halt and forget every timer (the exercise list changed)
    pub fn clear(&mut self) {
        for slot in self.slots.values_mut() {
            slot.halt();
        }
        self.slots.clear();
    }

    pub fn state(&self, index: usize) -> Option<TimerState> {
        self.slots.get(&index).map(|slot| *lock(&slot.state))
    }

    pub fn remaining_secs(&self, index: usize) -> Option<u32> {
        self.slots
            .get(&index)
            .map(|slot| lock(&slot.state).remaining_secs(slot.full_secs))
    }

    pub fn running_count(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| lock(&slot.state).is_running())
            .count()
    }
}

impl Drop for ExerciseTimers {
    fn drop(&mut self) {
        for slot in self.slots.values_mut() {
            slot.halt();
        }
    }
}

async fn run_ticker(
    index: usize,
    state: Arc<Mutex<TimerState>>,
    events: EventSink,
) {
    let mut interval = interval_at(Instant::now() + TICK, TICK);
    loop {
        interval.tick().await;

        let next = {
            let mut guard = lock(&state);
            *guard = guard.tick();
            *guard
        };

        let event = match next {
            TimerState::Running { remaining_secs } => TimerEvent::Tick {
                index,
                remaining_secs,
            },
            TimerState::Expired => TimerEvent::Expired { index },
            TimerState::Idle | TimerState::Paused { .. } => break,
        };

        if let Some(tx) = lock(&events).as_ref() {
            // Receiver gone just means nobody is watching
            let _ = tx.send(event);
        }

        if next == TimerState::Expired {
            debug!(index, "timer expired");
            break;
        }
    }
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
