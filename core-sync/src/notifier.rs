//! Statistics notifier publishing to the [`EventBus`]
//!
//! Hosts that already listen to core events can pick up refresh requests
//! there instead of implementing [`StatisticsNotifier`] themselves.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{NotificationPriority, StatisticsNotifier};
use core_runtime::events::{CoreEvent, EventBus, RecordingEvent};
use tracing::trace;

/// Emits [`RecordingEvent::StatisticsRefreshRequested`] for every request
#[derive(Debug, Clone)]
pub struct EventBusNotifier {
    event_bus: EventBus,
}

impl EventBusNotifier {
    pub fn new(event_bus: EventBus) -> Self {
        Self { event_bus }
    }
}

#[async_trait]
impl StatisticsNotifier for EventBusNotifier {
    async fn request_statistics_refresh(
        &self,
        meeting_id: &str,
        priority: NotificationPriority,
    ) -> BridgeResult<()> {
        let delivered = self
            .event_bus
            .emit(CoreEvent::Recording(
                RecordingEvent::StatisticsRefreshRequested {
                    meeting_id: meeting_id.to_string(),
                    priority: priority.as_str().to_string(),
                },
            ))
            .unwrap_or(0);

        trace!(meeting_id, delivered, "Published statistics refresh request");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emits_refresh_event() {
        let bus = EventBus::new(4);
        let mut events = bus.subscribe();
        let notifier = EventBusNotifier::new(bus);

        notifier
            .request_statistics_refresh("local-1", NotificationPriority::High)
            .await
            .unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Recording(RecordingEvent::StatisticsRefreshRequested {
                meeting_id: "local-1".to_string(),
                priority: "high".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_without_subscribers_is_ok() {
        let notifier = EventBusNotifier::new(EventBus::new(4));
        assert!(notifier
            .request_statistics_refresh("local-1", NotificationPriority::Low)
            .await
            .is_ok());
    }
}
