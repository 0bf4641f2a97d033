use log::info;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::monitor::types::ActivitySample;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Events the agent pushes toward whatever shell is attached (a desktop
/// window, a test harness, or nobody at all in headless runs).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload")]
pub enum MonitorEvent {
    #[serde(rename = "activity-update")]
    ActivityUpdate(ActivitySample),
    #[serde(rename = "proactive-advice")]
    ProactiveAdvice(String),
    #[serde(rename = "contextual-advice")]
    ContextualAdvice(String),
    #[serde(rename = "notification")]
    Notification { title: String, body: String },
}

/// Broadcast fan-out decoupling the sampling cadence from rendering. Emitting
/// with no subscribers is fine; slow subscribers drop old events rather than
/// backpressure the loop.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MonitorEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: MonitorEvent) {
        let _ = self.tx.send(event);
    }

    /// User-facing notifications are never blocking: in headless runs they
    /// become log lines, and any attached shell sees them on the bus.
    pub fn notify(&self, title: &str, body: &str) {
        info!("[notification] {title}: {body}");
        self.emit(MonitorEvent::Notification {
            title: title.to_string(),
            body: body.to_string(),
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_emitted_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(MonitorEvent::ProactiveAdvice("take a break".into()));

        match rx.recv().await.unwrap() {
            MonitorEvent::ProactiveAdvice(advice) => assert_eq!(advice, "take a break"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn emit_without_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.notify("title", "body");
    }

    #[test]
    fn events_serialize_with_channel_names() {
        let event = MonitorEvent::ContextualAdvice("tip".into());
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("contextual-advice"));
    }
}
