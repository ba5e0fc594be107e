//! Monitor event stream for observability.
//!
//! The poll loop broadcasts what it sees and does (samples, status edges,
//! dispatched actions, failures) so front ends can render state without
//! hooking into the loop itself. Events never gate any decision.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use nutmon_types::PowerStatus;

/// Events emitted by the poll loop.
///
/// All events are serializable for logging and IPC.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum MonitorEvent {
    /// The UPS this session will monitor has been selected.
    UpsSelected { name: String },
    /// One poll tick's readings.
    Sample {
        status: PowerStatus,
        charge: Option<f64>,
    },
    /// Classified status changed between two consecutive ticks.
    StatusChanged {
        from: PowerStatus,
        to: PowerStatus,
    },
    /// The suspend-load pair (pause print, heater off) was dispatched.
    LoadSuspended,
    /// Mains power returned; resuming is allowed once charge suffices.
    ResumeAllowed { charge: Option<f64> },
    /// The resume-load pair (heater on, resume print) was dispatched.
    LoadResumed,
    /// A full variable snapshot was refreshed.
    VariablesRefreshed { count: usize },
    /// A poll tick failed.
    TickFailed { error: String },
    /// A reconnection attempt is starting.
    ReconnectStarted { attempt: u32 },
    /// Reconnection succeeded after the given number of attempts.
    ReconnectSucceeded { attempts: u32 },
}

/// Sender for monitor events.
pub type EventSender = broadcast::Sender<MonitorEvent>;

/// Receiver for monitor events.
pub type EventReceiver = broadcast::Receiver<MonitorEvent>;

/// Event dispatcher fanning events out to any number of receivers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl EventDispatcher {
    /// Create a new event dispatcher with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event.
    pub fn send(&self, event: MonitorEvent) {
        // Ignore error if no receivers
        let _ = self.sender.send(event);
    }

    /// Number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(100)
    }
}
