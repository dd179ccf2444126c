use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use tracing::info;

use super::{bound::BoundField, id::ComponentId};

/// Moods a ring knows how to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
    Angry,
    Confused,
    Neutral,
}

impl Mood {
    /// Parses a mood attribute, unknown values show as neutral
    pub fn from_attribute(value: &str) -> Self {
        value.parse().unwrap_or(Mood::Neutral)
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Mood::Happy => "😀",
            Mood::Sad => "😢",
            Mood::Angry => "😠",
            Mood::Confused => "🤔",
            Mood::Neutral => "😐",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Mood::Happy => "#FFC107",
            Mood::Sad => "#2196F3",
            Mood::Angry => "#F44336",
            Mood::Confused => "#9C27B0",
            Mood::Neutral => "#607D8B",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Mood::Happy => "I feel great today! Everything is awesome!",
            Mood::Sad => "Feeling blue... could use a hug.",
            Mood::Angry => "Grrr! Something's really bothering me!",
            Mood::Confused => "Wait, what? I'm not sure what's happening...",
            Mood::Neutral => "Just another day, nothing special.",
        }
    }
}

/// A card that re-renders whenever its `mood` attribute is written
///
/// The attribute is free text. Anything that is not a known mood renders
/// as neutral, but the raw value is kept and logged.
pub struct MoodRing {
    id: ComponentId,
    mood: BoundField<Option<String>>,
    changes: Arc<AtomicU32>,
    connected: bool,
}

impl MoodRing {
    pub fn new() -> Self {
        let id = ComponentId::random();
        let changes = Arc::new(AtomicU32::new(0));
        let counter = changes.clone();
        let mood = BoundField::new("mood", None).with_hook(
            move |old: &Option<String>, new: &Option<String>| {
                let Some(new) = new.as_deref().filter(|m| !m.is_empty()) else {
                    return;
                };
                counter.fetch_add(1, Ordering::Relaxed);
                info!(
                    component = "mood-ring",
                    id = %id,
                    from = old.as_deref().unwrap_or("unset"),
                    to = new,
                    "Mood changing"
                );
            },
        );
        Self {
            id,
            mood,
            changes,
            connected: false,
        }
    }

    /// Creates a ring whose attribute is already set before it connects
    pub fn with_mood(mood: impl Into<String>) -> Self {
        let mut ring = Self::new();
        ring.set_mood(mood);
        ring
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Defaults the mood to neutral if nothing was set yet
    pub fn connect(&mut self) {
        if self.connected {
            return;
        }
        info!(component = "mood-ring", id = %self.id, "Ready to express my feelings");
        if self.mood.get().is_none() {
            self.set_mood(Mood::Neutral.as_ref());
        }
        self.connected = true;
    }

    pub fn set_mood(&mut self, mood: impl Into<String>) {
        self.mood.set(Some(mood.into()));
    }

    /// Raw attribute value, if any
    pub fn mood_attribute(&self) -> Option<&str> {
        self.mood.get().as_deref()
    }

    /// Mood the card currently shows
    pub fn mood(&self) -> Mood {
        self.mood_attribute()
            .map(Mood::from_attribute)
            .unwrap_or(Mood::Neutral)
    }

    /// Number of non-empty mood writes seen by the change hook
    pub fn changes(&self) -> u32 {
        self.changes.load(Ordering::Relaxed)
    }

    /// What the card says under the emoji
    pub fn status_text(&self) -> String {
        format!("I'm feeling {}!", self.mood())
    }

    pub fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        info!(
            component = "mood-ring",
            id = %self.id,
            final_mood = self.mood_attribute().unwrap_or("unset"),
            "Goodbye"
        );
        self.connected = false;
    }
}

impl Default for MoodRing {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MoodRing {
    fn drop(&mut self) {
        self.disconnect();
    }
}
