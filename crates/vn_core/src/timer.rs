//! One-shot auto-clearing display slot.
//!
//! Every `set` creates a new instance with its own deadline and replaces the
//! previous instance outright, deadline included. A clear can therefore only
//! ever remove the value it was scheduled for: an older instance's deadline
//! never touches a newer one.

#[derive(Debug, Clone)]
struct Timed<T> {
    value: T,
    clear_at_ms: u64,
}

#[derive(Debug, Clone)]
pub struct TimedSlot<T> {
    current: Option<Timed<T>>,
}

impl<T> TimedSlot<T> {
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Publish `value` until `now_ms + ttl_ms`.
    pub fn set(&mut self, value: T, now_ms: u64, ttl_ms: u64) {
        self.current = Some(Timed {
            value,
            clear_at_ms: now_ms.saturating_add(ttl_ms),
        });
    }

    pub fn get(&self) -> Option<&T> {
        self.current.as_ref().map(|timed| &timed.value)
    }

    /// Clears the slot if the live instance's deadline has passed. Returns
    /// whether anything was cleared.
    pub fn expire(&mut self, now_ms: u64) -> bool {
        match &self.current {
            Some(timed) if now_ms >= timed.clear_at_ms => {
                self.current = None;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

impl<T> Default for TimedSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
