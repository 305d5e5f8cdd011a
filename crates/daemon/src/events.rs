//! Event queue bridging engine notifications to the output stream
//!
//! Engine-driven events (call state transitions, statistics updates,
//! received DTMF) are rendered into [`Response`] objects as they happen
//! and queued here in emission order. The queue has two non-blocking
//! consumers, selected by transport mode at the call site: the
//! `pop-event` command, and the interactive iteration tick's best-effort
//! automatic drain. Each event is consumed exactly once, FIFO.

use std::collections::VecDeque;

use crate::protocol::Response;

/// Unbounded FIFO of pending event responses.
#[derive(Debug, Default)]
pub struct EventQueue {
    queue: VecDeque<Response>,
}

impl EventQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue an event in emission order.
    pub fn push(&mut self, event: Response) {
        self.queue.push_back(event);
    }

    /// Remove and return the oldest pending event, if any, together with
    /// the remaining queue depth (surfaced to controllers as `Size: N`).
    pub fn try_pop(&mut self) -> (Option<Response>, usize) {
        let event = self.queue.pop_front();
        (event, self.queue.len())
    }

    /// Current queue depth.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether no events are pending.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_pop_in_push_order() {
        let mut queue = EventQueue::new();
        queue.push(Response::ok().with_body("e1"));
        queue.push(Response::ok().with_body("e2"));
        queue.push(Response::ok().with_body("e3"));

        let (first, remaining) = queue.try_pop();
        assert_eq!(first.unwrap().body(), Some("e1"));
        assert_eq!(remaining, 2);

        let (second, remaining) = queue.try_pop();
        assert_eq!(second.unwrap().body(), Some("e2"));
        assert_eq!(remaining, 1);

        let (third, remaining) = queue.try_pop();
        assert_eq!(third.unwrap().body(), Some("e3"));
        assert_eq!(remaining, 0);
    }

    #[test]
    fn popping_empty_queue_reports_size_zero() {
        let mut queue = EventQueue::new();
        let (event, remaining) = queue.try_pop();
        assert!(event.is_none());
        assert_eq!(remaining, 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn length_tracks_pushes_minus_pops() {
        let mut queue = EventQueue::new();
        for i in 0..5 {
            queue.push(Response::ok().with_body(format!("e{i}")));
        }
        assert_eq!(queue.len(), 5);
        queue.try_pop();
        queue.try_pop();
        assert_eq!(queue.len(), 3);
    }
}
