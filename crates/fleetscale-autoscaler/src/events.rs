//! Event recording.
//!
//! [`EventRecorder`] is the sink for cluster events. [`LogEventRecorder`]
//! batches autoscaler log messages and, when status writing is enabled,
//! flushes them as events on the status object.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{info, warn};

/// Name of the object autoscaler status events are attached to.
pub const STATUS_OBJECT_NAME: &str = "fleetscale-status";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventType {
    Normal,
    Warning,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Normal => f.write_str("Normal"),
            EventType::Warning => f.write_str("Warning"),
        }
    }
}

/// The object an event is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectReference {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ObjectReference {
    pub fn new(kind: &str, namespace: &str, name: &str) -> Self {
        Self {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// The autoscaler status object in `namespace`.
    pub fn status(namespace: &str) -> Self {
        Self::new("ConfigMap", namespace, STATUS_OBJECT_NAME)
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
    }
}

/// Sink for cluster events.
pub trait EventRecorder: Send + Sync + fmt::Debug {
    fn event(&self, object: &ObjectReference, event_type: EventType, reason: &str, message: &str);
}

/// Emits events as structured log lines.
#[derive(Debug, Default)]
pub struct TracingEventRecorder;

impl EventRecorder for TracingEventRecorder {
    fn event(&self, object: &ObjectReference, event_type: EventType, reason: &str, message: &str) {
        match event_type {
            EventType::Normal => info!(object = %object, %reason, %message, "event"),
            EventType::Warning => warn!(object = %object, %reason, %message, "event"),
        }
    }
}

/// An event captured by [`MemoryEventRecorder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedEvent {
    pub object: ObjectReference,
    pub event_type: EventType,
    pub reason: String,
    pub message: String,
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryEventRecorder {
    events: Mutex<Vec<RecordedEvent>>,
}

impl MemoryEventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl EventRecorder for MemoryEventRecorder {
    fn event(&self, object: &ObjectReference, event_type: EventType, reason: &str, message: &str) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedEvent {
                object: object.clone(),
                event_type,
                reason: reason.to_string(),
                message: message.to_string(),
            });
    }
}

#[derive(Debug, Clone)]
struct LogMessage {
    event_type: EventType,
    reason: String,
    message: String,
}

/// Collects log messages to expose as events on the status object.
///
/// An inactive recorder drops every message.
#[derive(Debug)]
pub struct LogEventRecorder {
    recorder: Arc<dyn EventRecorder>,
    status_object: ObjectReference,
    active: bool,
    messages: Mutex<Vec<LogMessage>>,
}

impl LogEventRecorder {
    pub fn new(
        recorder: Arc<dyn EventRecorder>,
        status_object: ObjectReference,
        active: bool,
    ) -> Self {
        Self {
            recorder,
            status_object,
            active,
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Recorder attached to the status object in `namespace`.
    pub fn for_status(recorder: Arc<dyn EventRecorder>, namespace: &str, active: bool) -> Self {
        Self::new(recorder, ObjectReference::status(namespace), active)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogMessage>> {
        self.messages.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn push(&self, event_type: EventType, reason: &str, message: &str) {
        if !self.active {
            return;
        }
        self.lock().push(LogMessage {
            event_type,
            reason: reason.to_string(),
            message: message.to_string(),
        });
    }

    pub fn info(&self, reason: &str, message: &str) {
        self.push(EventType::Normal, reason, message);
    }

    pub fn warning(&self, reason: &str, message: &str) {
        self.push(EventType::Warning, reason, message);
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn status_object(&self) -> &ObjectReference {
        &self.status_object
    }

    /// Messages waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Send pending messages to the event recorder and clear them.
    /// Returns how many were sent.
    pub fn flush(&self) -> usize {
        let messages = std::mem::take(&mut *self.lock());
        for msg in &messages {
            self.recorder
                .event(&self.status_object, msg.event_type, &msg.reason, &msg.message);
        }
        messages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flush_forwards_to_status_object() {
        let events = Arc::new(MemoryEventRecorder::new());
        let log = LogEventRecorder::for_status(events.clone(), "kube-system", true);

        log.info("ScaledUpGroup", "pool-a 1->3");
        log.warning("ScaleDownFailed", "node n1 has local storage");
        assert_eq!(log.pending(), 2);

        assert_eq!(log.flush(), 2);
        assert_eq!(log.pending(), 0);

        let recorded = events.events();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].object, ObjectReference::status("kube-system"));
        assert_eq!(recorded[0].event_type, EventType::Normal);
        assert_eq!(recorded[1].event_type, EventType::Warning);
        assert_eq!(recorded[1].reason, "ScaleDownFailed");

        // Nothing left to send.
        assert_eq!(log.flush(), 0);
        assert_eq!(events.events().len(), 2);
    }

    #[test]
    fn inactive_recorder_drops_messages() {
        let events = Arc::new(MemoryEventRecorder::new());
        let log = LogEventRecorder::for_status(events.clone(), "kube-system", false);

        log.info("ScaledUpGroup", "pool-a 1->3");
        assert_eq!(log.flush(), 0);
        assert!(events.events().is_empty());
    }

    #[test]
    fn object_reference_display() {
        assert_eq!(
            ObjectReference::status("kube-system").to_string(),
            "ConfigMap/kube-system/fleetscale-status"
        );
    }
}
