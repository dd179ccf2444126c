use std::ops::Deref;
use std::sync::Arc;
use tracing::info;

use super::router::{DeliveryScope, TopicRouter};

/// Process-wide event bus shared by every component
///
/// Built once at startup and handed to consumers explicitly (through
/// `AppState` or constructor arguments), never looked up globally, so each
/// test can build its own isolated bus. Clones share the same router.
#[derive(Debug, Clone)]
pub struct EventBus {
    router: Arc<TopicRouter>,
}

impl EventBus {
    pub fn new() -> Self {
        info!("Creating global event bus");
        Self {
            router: Arc::new(TopicRouter::new(DeliveryScope::Global)),
        }
    }

    /// Whether two handles point at the same bus
    pub fn same_bus(&self, other: &EventBus) -> bool {
        Arc::ptr_eq(&self.router, &other.router)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for EventBus {
    type Target = TopicRouter;

    fn deref(&self) -> &Self::Target {
        &self.router
    }
}
