use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::types::ListenerResponse;
use crate::component::{ComponentError, ComponentId, GlobalListener};
use crate::event::EventBus;

/// Default cap on listeners open at once
pub const DEFAULT_MAX_LISTENERS: usize = 100;

/// Random draws tried before scanning for a free id
const RANDOM_ID_ATTEMPTS: usize = 32;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Listener limit reached: {0} open")]
    Full(usize),

    #[error(transparent)]
    Component(#[from] ComponentError),
}

/// Listener cards opened through the HTTP API, keyed by component id
///
/// At most `capacity` listeners are open at once, and never more than
/// there are component ids.
#[derive(Clone)]
pub struct ListenerRegistry {
    listeners: Arc<Mutex<BTreeMap<ComponentId, GlobalListener>>>,
    capacity: usize,
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_LISTENERS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            listeners: Arc::new(Mutex::new(BTreeMap::new())),
            capacity: capacity.clamp(1, ComponentId::MAX as usize),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates and connects a listener with a fresh id
    pub fn open(
        &self,
        bus: &EventBus,
        history: usize,
    ) -> Result<ListenerResponse, RegistryError> {
        let mut listeners = self.lock();

        if listeners.len() >= self.capacity {
            warn!(open = listeners.len(), "Listener limit reached");
            return Err(RegistryError::Full(listeners.len()));
        }

        let id = free_id(&listeners).ok_or(RegistryError::Full(listeners.len()))?;
        let mut listener = GlobalListener::with_id(bus.clone(), id, history);
        listener.connect()?;
        let view = view_of(&listener);
        info!(id = %listener.id(), "Listener opened");
        listeners.insert(listener.id(), listener);
        Ok(view)
    }

    pub fn get(&self, id: ComponentId) -> Option<ListenerResponse> {
        self.lock().get(&id).map(view_of)
    }

    pub fn list(&self) -> Vec<ListenerResponse> {
        self.lock().values().map(view_of).collect()
    }

    /// Toggles the listener's subscription; `None` if it doesn't exist
    pub fn toggle(&self, id: ComponentId) -> Result<Option<ListenerResponse>, ComponentError> {
        let mut listeners = self.lock();
        let Some(listener) = listeners.get_mut(&id) else {
            return Ok(None);
        };
        listener.toggle_subscription()?;
        Ok(Some(view_of(listener)))
    }

    pub fn clear_messages(&self, id: ComponentId) -> Option<ListenerResponse> {
        let listeners = self.lock();
        let listener = listeners.get(&id)?;
        listener.clear_messages();
        Some(view_of(listener))
    }

    /// Disconnects and forgets a listener; false if it doesn't exist
    pub fn close(&self, id: ComponentId) -> bool {
        let removed = self.lock().remove(&id);
        match removed {
            Some(mut listener) => {
                listener.disconnect();
                info!(id = %id, "Listener closed");
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<ComponentId, GlobalListener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Picks an unused id: random first, then the lowest free one
fn free_id(listeners: &BTreeMap<ComponentId, GlobalListener>) -> Option<ComponentId> {
    for _ in 0..RANDOM_ID_ATTEMPTS {
        let id = ComponentId::random();
        if !listeners.contains_key(&id) {
            return Some(id);
        }
        debug!(id = %id, "Listener id taken, drawing again");
    }
    ComponentId::all().find(|id| !listeners.contains_key(id))
}

fn view_of(listener: &GlobalListener) -> ListenerResponse {
    ListenerResponse {
        id: listener.id(),
        subscribed: listener.is_subscribed(),
        theme: listener.theme(),
        messages: listener.messages(),
    }
}
