use std::fmt;
use std::mem;

type ChangeHook<T> = Box<dyn FnMut(&T, &T) + Send>;

/// A value whose every write triggers an on-change hook
///
/// This is the attribute pattern of the demo components: a parent writes a
/// field on its child and the child re-projects itself from the hook. The
/// hook receives `(old, new)` and runs on every `set`, including writes of
/// an equal value.
pub struct BoundField<T> {
    name: &'static str,
    value: T,
    on_change: Option<ChangeHook<T>>,
}

impl<T> BoundField<T> {
    pub fn new(name: &'static str, initial: T) -> Self {
        Self {
            name,
            value: initial,
            on_change: None,
        }
    }

    /// Installs the hook, replacing any previous one
    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&T, &T) + Send + 'static,
    {
        self.on_change = Some(Box::new(hook));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Stores `value`, runs the hook and returns the previous value
    pub fn set(&mut self, value: T) -> T {
        let old = mem::replace(&mut self.value, value);
        if let Some(hook) = self.on_change.as_mut() {
            hook(&old, &self.value);
        }
        old
    }
}

impl<T: fmt::Debug> fmt::Debug for BoundField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundField")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("hooked", &self.on_change.is_some())
            .finish()
    }
}
