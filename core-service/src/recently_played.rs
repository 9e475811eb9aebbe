//! Feeds the user's "recently played" list from `track_play` events.

use bridge_traits::UserSession;
use core_runtime::events::{EventBus, EventType, Subscription};
use std::sync::Arc;
use tracing::trace;

/// Calls [`UserSession::add_to_recently_played`] whenever a track starts.
///
/// Resuming a paused track is not a new play and is skipped.
pub struct RecentlyPlayedRecorder {
    subscription: Subscription,
}

impl RecentlyPlayedRecorder {
    pub fn attach(bus: &EventBus, session: Arc<dyn UserSession>) -> Self {
        let subscription = bus.subscribe_to_type(EventType::TrackPlay, move |event| {
            if event.str_property("source") == Some("resume") {
                return;
            }
            if let Some(track_id) = event.str_property("track_id") {
                trace!(track_id, "Recording recently played");
                session.add_to_recently_played(track_id);
            }
        });

        Self { subscription }
    }

    /// Stop recording. Returns `false` if the bus is already gone.
    pub fn detach(self) -> bool {
        self.subscription.unsubscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_runtime::events::into_properties;
    use mockall::mock;
    use mockall::predicate::eq;
    use serde_json::json;

    mock! {
        Account {}

        impl UserSession for Account {
            fn current_user_id(&self) -> Option<String>;
            fn add_to_recently_played(&self, track_id: &str);
        }
    }

    fn play(bus: &EventBus, track_id: &str, source: &str) {
        bus.publish(
            EventType::TrackPlay,
            into_properties(json!({ "track_id": track_id, "source": source })),
        );
    }

    #[test]
    fn test_records_new_plays_only() {
        let mut account = MockAccount::new();
        account
            .expect_add_to_recently_played()
            .with(eq("t1"))
            .times(1)
            .return_const(());
        account
            .expect_add_to_recently_played()
            .with(eq("t2"))
            .times(1)
            .return_const(());

        let bus = EventBus::new();
        let _recorder = RecentlyPlayedRecorder::attach(&bus, Arc::new(account));

        play(&bus, "t1", "direct");
        play(&bus, "t1", "resume");
        play(&bus, "t2", "queue");
        bus.publish(
            EventType::TrackPause,
            into_properties(json!({ "track_id": "t2" })),
        );
    }

    #[test]
    fn test_detach_stops_recording() {
        let mut account = MockAccount::new();
        account.expect_add_to_recently_played().never();

        let bus = EventBus::new();
        let recorder = RecentlyPlayedRecorder::attach(&bus, Arc::new(account));
        assert!(recorder.detach());

        play(&bus, "t1", "direct");
        assert_eq!(bus.subscriber_count(), 0);
    }
}
