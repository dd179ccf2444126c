// Library crate for the component communication demo
// This file exposes the public API for integration tests and the server binary

pub mod component;
pub mod config;
pub mod event;
pub mod global;
pub mod shared;

// Re-export commonly used types for easier access in tests
pub use component::{
    AdoptedPet, BirthdayCard, BoundField, ChildReply, CleanupCountdown, ComponentError,
    ComponentId, GlobalListener, GlobalSender, Mood, MoodRing, ParentComponent,
    SiblingContainer, Theme,
};
pub use config::{AppConfig, ConfigError};
pub use event::{
    Envelope, EventBus, KnownTopic, PublishReport, RouterError, ScopedRelay, Subscriber,
    SubscriberError, SubscriptionHandle, Topic, TopicRouter,
};
pub use shared::{AppError, AppState};
