// Demo components - the callers of the event routing layer
//
// Each component is headless: it keeps the state a card would render and
// logs its lifecycle. Three communication patterns are covered:
// - family:  parent writes the child's field, child answers on a relay
// - sibling: senders and receivers talk through their container's relay
// - global:  senders and listeners anywhere share the process-wide bus
//
// The lifecycle cards (mood ring, adopted pet, birthday, cleanup countdown)
// talk to nobody; they show attribute hooks, timers and teardown.

// Public API - what other modules can use
pub use birthday::{BirthdayCard, CELEBRATION_PERIOD};
pub use bound::BoundField;
pub use countdown::{CleanupCountdown, COUNTDOWN_START, FAREWELL_AT};
pub use errors::ComponentError;
pub use family::{ChildComponent, ChildReply, ParentComponent};
pub use global::{
    EntryKind, GlobalListener, GlobalPayload, GlobalSender, ListenerEntry, Theme,
    DEFAULT_LISTENER_HISTORY,
};
pub use id::ComponentId;
pub use mood::{Mood, MoodRing};
pub use pet::{AdoptedPet, PetLocation};
pub use sibling::{
    receiver_name, ReceivedMessage, SiblingContainer, SiblingReceiver, SiblingSender,
    RECEIVER_HISTORY,
};

// Internal modules
mod birthday;
mod bound;
mod countdown;
mod errors;
mod family;
mod global;
mod id;
mod mood;
mod pet;
mod sibling;
