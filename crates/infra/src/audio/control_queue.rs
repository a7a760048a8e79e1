//! Lock-free control channel between the control thread and the render thread
//!
//! Two bounded `ArrayQueue`s, allocated once:
//! - commands toward the render thread
//! - events (`Ready`) back to the control thread
//!
//! Neither side ever blocks or takes a lock. A full command queue hands the
//! message back to the caller; a full event queue drops the event and bumps a
//! counter, since the render thread cannot wait.

use cadence_core::domain::control::{ControlError, ControlEvent, ControlMessage, Result};
use crossbeam::queue::ArrayQueue;
use crossbeam::utils::CachePadded;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

struct Shared {
    commands: ArrayQueue<ControlMessage>,
    events: ArrayQueue<ControlEvent>,
    /// Events lost to a full event queue (cache-padded, written by the render thread)
    dropped_events: CachePadded<AtomicUsize>,
}

/// Control-thread end: posts messages, collects events
pub struct ControlSender {
    shared: Arc<Shared>,
}

/// Render-thread end: drains messages, publishes events
pub struct ControlReceiver {
    shared: Arc<Shared>,
}

/// Create a connected sender/receiver pair
///
/// `capacity` bounds both queues; a zero capacity is raised to one.
pub fn control_channel(capacity: usize) -> (ControlSender, ControlReceiver) {
    let capacity = capacity.max(1);
    let shared = Arc::new(Shared {
        commands: ArrayQueue::new(capacity),
        events: ArrayQueue::new(capacity),
        dropped_events: CachePadded::new(AtomicUsize::new(0)),
    });
    (
        ControlSender {
            shared: Arc::clone(&shared),
        },
        ControlReceiver { shared },
    )
}

impl ControlSender {
    /// Post a message without blocking
    ///
    /// When the queue is full the message comes back in
    /// [`ControlError::QueueFull`].
    pub fn send(&self, message: ControlMessage) -> Result<()> {
        self.shared.commands.push(message).map_err(|message| {
            warn!(?message, "Control queue full, message dropped");
            ControlError::QueueFull(message)
        })?;
        debug!(?message, "Control message queued");
        Ok(())
    }

    /// Parse a JSON message and post it
    pub fn send_json(&self, json: &str) -> Result<()> {
        self.send(ControlMessage::from_json(json)?)
    }

    /// Take the oldest pending event, if any
    pub fn try_recv_event(&self) -> Option<ControlEvent> {
        self.shared.events.pop()
    }

    /// Messages not yet picked up by the render thread
    pub fn pending(&self) -> usize {
        self.shared.commands.len()
    }

    pub fn capacity(&self) -> usize {
        self.shared.commands.capacity()
    }

    /// Events the render thread could not deliver
    pub fn dropped_events(&self) -> usize {
        self.shared.dropped_events.load(Ordering::Relaxed)
    }
}

impl ControlReceiver {
    /// Take the oldest pending message, if any
    #[inline]
    pub fn try_recv(&self) -> Option<ControlMessage> {
        self.shared.commands.pop()
    }

    /// Publish an event; never blocks
    pub fn publish(&self, event: ControlEvent) {
        if self.shared.events.push(event).is_err() {
            self.shared.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.shared.commands.is_empty()
    }
}
