//! # User-Facing Notifications
//!
//! Derives notifications from player events: one for each uploaded track
//! and one whenever a track reaches a play-count milestone.
//!
//! The center only observes the event bus; nothing in the playback core
//! calls it directly.

use chrono::{DateTime, Utc};
use core_runtime::events::{AnalyticsEvent, EventBus, EventType, Subscription};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

/// Play counts that produce a notification
pub const PLAY_MILESTONES: [u32; 4] = [10, 25, 50, 100];

/// Oldest notifications are dropped beyond this many
pub const MAX_NOTIFICATIONS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Upload,
    Milestone,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub track_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

#[derive(Default)]
struct State {
    /// Newest first
    notifications: Vec<Notification>,
    play_counts: HashMap<String, u32>,
}

/// Shared notification inbox fed from the event bus.
#[derive(Clone, Default)]
pub struct NotificationCenter {
    state: Arc<Mutex<State>>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe this center to every event on `bus`.
    pub fn attach(&self, bus: &EventBus) -> Subscription {
        let center = self.clone();
        bus.subscribe(move |event| center.handle_event(event))
    }

    /// Derive notifications from a single event.
    pub fn handle_event(&self, event: &AnalyticsEvent) {
        match event.event_type {
            EventType::TrackUploaded => self.on_upload(event),
            EventType::TrackPlay if event.str_property("source") != Some("resume") => {
                self.on_play(event)
            }
            _ => {}
        }
    }

    /// All notifications, newest first
    pub fn notifications(&self) -> Vec<Notification> {
        self.state().notifications.clone()
    }

    pub fn unread_count(&self) -> usize {
        self.state()
            .notifications
            .iter()
            .filter(|n| !n.read)
            .count()
    }

    /// Mark one notification read. Returns `false` for unknown ids.
    pub fn mark_read(&self, id: Uuid) -> bool {
        let mut state = self.state();
        match state.notifications.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.read = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_read(&self) {
        for notification in self.state().notifications.iter_mut() {
            notification.read = true;
        }
    }

    /// Drop every notification. Play counts are kept.
    pub fn clear(&self) {
        self.state().notifications.clear();
    }

    /// Plays seen for `track_id` since start-up
    pub fn play_count(&self, track_id: &str) -> u32 {
        self.state().play_counts.get(track_id).copied().unwrap_or(0)
    }

    fn on_upload(&self, event: &AnalyticsEvent) {
        let title = event.str_property("title").unwrap_or("Untitled");
        self.push(Notification {
            id: Uuid::new_v4(),
            kind: NotificationKind::Upload,
            title: "Upload complete".to_string(),
            message: format!("\"{}\" was added to your library", title),
            track_id: event.str_property("track_id").map(str::to_string),
            created_at: event.timestamp,
            read: false,
        });
    }

    fn on_play(&self, event: &AnalyticsEvent) {
        let Some(track_id) = event.str_property("track_id") else {
            return;
        };

        let count = {
            let mut state = self.state();
            let count = state.play_counts.entry(track_id.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        if !PLAY_MILESTONES.contains(&count) {
            return;
        }

        let title = event.str_property("title").unwrap_or(track_id);
        self.push(Notification {
            id: Uuid::new_v4(),
            kind: NotificationKind::Milestone,
            title: format!("{} plays", count),
            message: format!("You've played \"{}\" {} times", title, count),
            track_id: Some(track_id.to_string()),
            created_at: event.timestamp,
            read: false,
        });
    }

    fn push(&self, notification: Notification) {
        debug!(kind = ?notification.kind, track_id = ?notification.track_id, "New notification");
        let mut state = self.state();
        state.notifications.insert(0, notification);
        state.notifications.truncate(MAX_NOTIFICATIONS);
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for NotificationCenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("NotificationCenter")
            .field("notifications", &state.notifications.len())
            .field("tracked_tracks", &state.play_counts.len())
            .finish()
    }
}
