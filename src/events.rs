//! Console events - side-effects requested from the UI layer

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::debug;

use crate::wake::WakeVia;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ConsoleEvent {
    PendingConfirmation {
        intent: String,
        payload: Option<Map<String, Value>>,
        description: String,
    },
    Confirmed {
        intent: String,
        payload: Option<Map<String, Value>>,
    },
    Cancelled {
        intent: String,
        payload: Option<Map<String, Value>>,
        description: String,
    },
    OpenMenu {
        menu: String,
    },
    CreateOrder {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },
    UpdateOrder {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },
    DeleteOrder {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<i64>,
    },
    ShowCapabilities,
    OpenTelemetry,
    ToggleExplain {
        enabled: bool,
    },
    ConnectGateway,
    ListResources,
    ListTools,
    WakeDetected {
        via: WakeVia,
        wake_word: String,
        confidence: f32,
    },
}

impl ConsoleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ConsoleEvent::PendingConfirmation { .. } => "pending-confirmation",
            ConsoleEvent::Confirmed { .. } => "confirmed",
            ConsoleEvent::Cancelled { .. } => "cancelled",
            ConsoleEvent::OpenMenu { .. } => "open-menu",
            ConsoleEvent::CreateOrder { .. } => "create-order",
            ConsoleEvent::UpdateOrder { .. } => "update-order",
            ConsoleEvent::DeleteOrder { .. } => "delete-order",
            ConsoleEvent::ShowCapabilities => "show-capabilities",
            ConsoleEvent::OpenTelemetry => "open-telemetry",
            ConsoleEvent::ToggleExplain { .. } => "toggle-explain",
            ConsoleEvent::ConnectGateway => "connect-gateway",
            ConsoleEvent::ListResources => "list-resources",
            ConsoleEvent::ListTools => "list-tools",
            ConsoleEvent::WakeDetected { .. } => "wake-detected",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoggedEvent {
    pub at: DateTime<Utc>,
    pub event: ConsoleEvent,
}

/// Most recent events, oldest evicted first
#[derive(Debug)]
pub struct EventLog {
    entries: VecDeque<LoggedEvent>,
    capacity: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

impl EventLog {
    pub const DEFAULT_CAPACITY: usize = 120;

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(Self::DEFAULT_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, event: ConsoleEvent) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LoggedEvent {
            at: Utc::now(),
            event,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoggedEvent> {
        self.entries.iter()
    }

    /// Up to `n` newest events, oldest of them first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &LoggedEvent> {
        self.entries.iter().skip(self.entries.len().saturating_sub(n))
    }
}

/// Fans events out to the log and an optional channel
#[derive(Debug, Default)]
pub struct EventBus {
    log: EventLog,
    tx: Option<mpsc::UnboundedSender<ConsoleEvent>>,
}

impl EventBus {
    pub fn new(tx: Option<mpsc::UnboundedSender<ConsoleEvent>>) -> Self {
        Self {
            log: EventLog::default(),
            tx,
        }
    }

    pub fn emit(&mut self, event: ConsoleEvent) {
        debug!(event = event.name(), "console event");
        if let Some(tx) = &self.tx {
            // Receiver gone just means nobody is listening anymore
            let _ = tx.send(event.clone());
        }
        self.log.push(event);
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }
}
