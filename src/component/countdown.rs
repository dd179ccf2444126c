use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant};
use tracing::{debug, info};

use super::{errors::ComponentError, id::ComponentId};

/// Seconds on the clock after connect or reset
pub const COUNTDOWN_START: u32 = 10;

/// Remaining seconds at which the card starts its farewell
pub const FAREWELL_AT: u32 = 3;

const TICK: Duration = Duration::from_secs(1);
const REMOVAL_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug)]
struct CountdownState {
    remaining: u32,
    removed: bool,
}

/// A card that counts down and removes itself when the clock hits zero
///
/// Two timers run while connected: the countdown itself, restarted by
/// `reset`, and a once-a-second heartbeat. Both stop on disconnect, on
/// drop, or when the card removes itself.
pub struct CleanupCountdown {
    id: ComponentId,
    state: Arc<Mutex<CountdownState>>,
    runtime: Option<Handle>,
    countdown: Option<JoinHandle<()>>,
    heartbeat: Option<JoinHandle<()>>,
}

impl CleanupCountdown {
    pub fn new() -> Self {
        Self {
            id: ComponentId::random(),
            state: Arc::new(Mutex::new(CountdownState {
                remaining: COUNTDOWN_START,
                removed: false,
            })),
            runtime: None,
            countdown: None,
            heartbeat: None,
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn remaining(&self) -> u32 {
        self.lock_state().remaining
    }

    /// Whether the card is in its last few seconds
    pub fn is_farewell(&self) -> bool {
        self.remaining() <= FAREWELL_AT
    }

    /// Whether the countdown ran out and the card removed itself
    pub fn is_removed(&self) -> bool {
        self.lock_state().removed
    }

    pub fn is_connected(&self) -> bool {
        self.runtime.is_some() && !self.is_removed()
    }

    /// Starts the countdown and heartbeat on the current Tokio runtime
    pub fn connect(&mut self) -> Result<(), ComponentError> {
        if self.runtime.is_some() {
            return Ok(());
        }
        let runtime = Handle::try_current()?;
        info!(component = "cleanup", id = %self.id, "Starting my farewell tour");

        let id = self.id;
        let state = self.state.clone();
        let start = Instant::now() + TICK;
        self.heartbeat = Some(runtime.spawn(async move {
            let mut ticker = interval_at(start, TICK);
            loop {
                ticker.tick().await;
                let (remaining, removed) = {
                    let state = state.lock().unwrap_or_else(PoisonError::into_inner);
                    (state.remaining, state.removed)
                };
                if removed {
                    break;
                }
                info!(
                    component = "cleanup",
                    id = %id,
                    remaining = remaining,
                    "Still here"
                );
            }
        }));

        self.countdown = Some(self.spawn_countdown(&runtime));
        self.runtime = Some(runtime);
        Ok(())
    }

    /// Puts the clock back to the start and restarts the countdown
    pub fn reset(&mut self) -> Result<(), ComponentError> {
        let Some(runtime) = self.runtime.clone().filter(|_| !self.is_removed()) else {
            return Err(ComponentError::NotConnected(format!("cleanup {}", self.id)));
        };

        if let Some(countdown) = self.countdown.take() {
            countdown.abort();
        }
        self.lock_state().remaining = COUNTDOWN_START;
        info!(
            component = "cleanup",
            id = %self.id,
            seconds = COUNTDOWN_START,
            "Timer reset"
        );

        self.countdown = Some(self.spawn_countdown(&runtime));
        Ok(())
    }

    /// Stops both timers
    pub fn disconnect(&mut self) {
        let countdown = self.countdown.take();
        let heartbeat = self.heartbeat.take();
        if countdown.is_none() && heartbeat.is_none() {
            return;
        }
        for task in countdown.into_iter().chain(heartbeat) {
            task.abort();
        }
        self.runtime = None;
        info!(
            component = "cleanup",
            id = %self.id,
            "It's been a pleasure serving you, cleaning up"
        );
    }

    fn spawn_countdown(&self, runtime: &Handle) -> JoinHandle<()> {
        let id = self.id;
        let state = self.state.clone();
        let start = Instant::now() + TICK;
        runtime.spawn(async move {
            let mut ticker = interval_at(start, TICK);
            loop {
                ticker.tick().await;
                let remaining = {
                    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
                    state.remaining = state.remaining.saturating_sub(1);
                    state.remaining
                };
                debug!(component = "cleanup", id = %id, remaining = remaining, "Tick");
                if remaining == 0 {
                    break;
                }
            }

            info!(component = "cleanup", id = %id, "Time's up! Initiating self-destruction");
            sleep(REMOVAL_DELAY).await;
            state.lock().unwrap_or_else(PoisonError::into_inner).removed = true;
            info!(component = "cleanup", id = %id, "Removed");
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, CountdownState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CleanupCountdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CleanupCountdown {
    fn drop(&mut self) {
        self.disconnect();
    }
}
