use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::info;

use super::{errors::ComponentError, id::ComponentId};

/// How often a connected birthday card reports that it is still celebrating
pub const CELEBRATION_PERIOD: Duration = Duration::from_secs(5);

const COLORS: [&str; 16] = [
    "#FF5252", "#FF4081", "#E040FB", "#7C4DFF", "#536DFE", "#448AFF", "#40C4FF", "#18FFFF",
    "#64FFDA", "#69F0AE", "#B2FF59", "#EEFF41", "#FFFF00", "#FFD740", "#FFAB40", "#FF6E40",
];

/// A card that celebrates in the background for as long as it is connected
pub struct BirthdayCard {
    id: ComponentId,
    born_at: DateTime<Utc>,
    color: &'static str,
    celebrations: u32,
    activity_ticks: Arc<AtomicU32>,
    activity: Option<JoinHandle<()>>,
}

impl BirthdayCard {
    pub fn new() -> Self {
        Self {
            id: ComponentId::random(),
            born_at: Utc::now(),
            color: random_color(),
            celebrations: 0,
            activity_ticks: Arc::new(AtomicU32::new(0)),
            activity: None,
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn born_at(&self) -> DateTime<Utc> {
        self.born_at
    }

    pub fn color(&self) -> &'static str {
        self.color
    }

    pub fn celebrations(&self) -> u32 {
        self.celebrations
    }

    /// Periodic activity reports since the card was created
    pub fn activity_ticks(&self) -> u32 {
        self.activity_ticks.load(Ordering::Relaxed)
    }

    pub fn is_connected(&self) -> bool {
        self.activity.is_some()
    }

    /// Starts the periodic activity on the current Tokio runtime
    pub fn connect(&mut self) -> Result<(), ComponentError> {
        if self.activity.is_some() {
            return Ok(());
        }
        let runtime = Handle::try_current()?;
        info!(component = "birthday", id = %self.id, "I'm alive, time to party");

        let id = self.id;
        let ticks = self.activity_ticks.clone();
        let start = Instant::now() + CELEBRATION_PERIOD;
        self.activity = Some(runtime.spawn(async move {
            let mut ticker = interval_at(start, CELEBRATION_PERIOD);
            loop {
                ticker.tick().await;
                ticks.fetch_add(1, Ordering::Relaxed);
                info!(
                    component = "birthday",
                    id = %id,
                    at = %Utc::now().format("%H:%M:%S"),
                    "Still celebrating"
                );
            }
        }));
        Ok(())
    }

    /// Extra celebration: repaints the card, returns the new colour
    pub fn celebrate(&mut self) -> &'static str {
        self.celebrations += 1;
        self.color = random_color();
        info!(
            component = "birthday",
            id = %self.id,
            color = self.color,
            "Woohoo! Extra celebration"
        );
        self.color
    }

    /// Stops the periodic activity
    pub fn disconnect(&mut self) {
        if let Some(activity) = self.activity.take() {
            activity.abort();
            info!(
                component = "birthday",
                id = %self.id,
                "It's been a pleasure serving you, cleaning up"
            );
        }
    }
}

impl Default for BirthdayCard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BirthdayCard {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn random_color() -> &'static str {
    COLORS[rand::rng().random_range(0..COLORS.len())]
}
