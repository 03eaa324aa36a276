//! Cross-context event queue
//!
//! Transport threads never touch coordinator state. They enqueue
//! [`ControlEvent`]s through an [`EventSender`]; the [`EventPump`] task drains
//! the queue on the coordinator's runtime and applies events one at a time,
//! in enqueue order.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::coordinator::ControlCoordinator;

/// Event produced by the inbound transport
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// Intensity update for a channel tag
    Intensity { path: String, value: f32 },
    /// Open or close the global control gate
    SetEnabled(bool),
}

/// Thread-safe producer side of the event queue
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<ControlEvent>,
}

impl EventSender {
    /// Enqueue an event. Safe to call from any thread, never blocks.
    ///
    /// Returns `false` once the pump has shut down.
    pub fn send(&self, event: ControlEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(e) => {
                warn!(event = ?e.0, "Event pump closed, dropping event");
                false
            }
        }
    }

    pub fn intensity(&self, path: impl Into<String>, value: f32) -> bool {
        self.send(ControlEvent::Intensity {
            path: path.into(),
            value,
        })
    }

    pub fn set_enabled(&self, enabled: bool) -> bool {
        self.send(ControlEvent::SetEnabled(enabled))
    }
}

/// Consumer side of the event queue
pub type EventReceiver = mpsc::UnboundedReceiver<ControlEvent>;

/// Create a connected sender/receiver pair
pub fn event_channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, rx)
}

/// Applies queued events to the coordinator
pub struct EventPump {
    coordinator: Arc<ControlCoordinator>,
    receiver: EventReceiver,
}

impl EventPump {
    pub fn new(coordinator: Arc<ControlCoordinator>, receiver: EventReceiver) -> Self {
        Self {
            coordinator,
            receiver,
        }
    }

    /// Drain the queue until every sender has been dropped
    pub async fn run(mut self) {
        info!("Event pump started");
        while let Some(event) = self.receiver.recv().await {
            self.apply(event).await;
        }
        info!("Event pump stopped");
    }

    /// Run the pump on the current runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn apply(&self, event: ControlEvent) {
        match event {
            ControlEvent::Intensity { path, value } => {
                let outcome = self.coordinator.handle_update(&path, value).await;
                debug!(path = %path, value, outcome = ?outcome, "Applied intensity event");
            }
            ControlEvent::SetEnabled(enabled) => self.coordinator.set_enabled(enabled),
        }
    }
}
