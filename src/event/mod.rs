// Event routing components
//
// One topic router design, used at two delivery scopes: the process-wide
// event bus and the per-container scoped relay.

// Public API - what other modules can use
pub use bus::EventBus;
pub use envelope::Envelope;
pub use handler::{FnSubscriber, NoOpSubscriber, Subscriber, SubscriberError};
pub use relay::ScopedRelay;
pub use router::{
    DeliveryFailure, DeliveryScope, OwnerId, PublishReport, RouterError, SubscriptionHandle,
    SubscriptionId, TopicRouter,
};
pub use topic::{KnownTopic, Topic};

// Internal modules
mod bus;
mod envelope;
mod handler;
mod relay;
mod router;
mod topic;
