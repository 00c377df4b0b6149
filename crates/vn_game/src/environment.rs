//! Host capabilities the session depends on: viewport bounds, a millisecond
//! clock, and frame scheduling.
//!
//! `HeadlessEnvironment` is the in-process implementation used by the binary
//! and by tests. A windowed host would implement the trait over its own event
//! loop.

use std::collections::VecDeque;
use vn_core::time::FrameClock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

pub trait Environment {
    /// Current viewport height in world units. Re-read every tick.
    fn viewport_height(&self) -> f32;

    fn now_ms(&self) -> u64;

    /// Ask for one callback on the next frame.
    fn request_frame(&mut self) -> FrameHandle;

    /// Withdraw a previously requested frame. Unknown handles are ignored.
    fn cancel_frame(&mut self, handle: FrameHandle);
}

#[derive(Debug, Clone)]
pub struct HeadlessEnvironment {
    pub viewport_height: f32,
    pub clock: FrameClock,
    next_handle: u64,
    pending: VecDeque<FrameHandle>,
}

impl HeadlessEnvironment {
    pub fn new(viewport_height: f32) -> Self {
        Self {
            viewport_height,
            clock: FrameClock::new(),
            next_handle: 0,
            pending: VecDeque::new(),
        }
    }

    /// Advance the clock one frame and hand out the oldest requested frame,
    /// if any.
    pub fn next_frame(&mut self) -> Option<FrameHandle> {
        self.clock.advance();
        self.pending.pop_front()
    }

    pub fn pending_frames(&self) -> usize {
        self.pending.len()
    }
}

impl Environment for HeadlessEnvironment {
    fn viewport_height(&self) -> f32 {
        self.viewport_height
    }

    fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    fn request_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next_handle);
        self.next_handle += 1;
        self.pending.push_back(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.pending.retain(|pending| *pending != handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_delivered_in_request_order() {
        let mut env = HeadlessEnvironment::new(800.0);
        let a = env.request_frame();
        let b = env.request_frame();
        assert_ne!(a, b);
        assert_eq!(env.next_frame(), Some(a));
        assert_eq!(env.next_frame(), Some(b));
        assert_eq!(env.next_frame(), None);
        assert_eq!(env.clock.frame_count, 3);
    }

    #[test]
    fn cancelled_frame_is_never_delivered() {
        let mut env = HeadlessEnvironment::new(800.0);
        let handle = env.request_frame();
        env.cancel_frame(handle);
        assert_eq!(env.pending_frames(), 0);
        assert_eq!(env.next_frame(), None);
    }
}
