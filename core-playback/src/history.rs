//! Playback history tracking
//!
//! Maintains a bounded history of played tracks for "previous" navigation
//! and for refilling playback when `repeat = all` runs out of queue.

use crate::types::Track;
use std::collections::VecDeque;

/// Default number of tracks kept in history
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Playback history with bounded size
///
/// Most recent track is at index 0. Pushing onto a full history evicts the
/// oldest entry.
#[derive(Debug, Clone)]
pub struct PlayHistory {
    tracks: VecDeque<Track>,
    limit: usize,
}

impl PlayHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            tracks: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Record a track as the most recently played one
    pub fn push(&mut self, track: Track) {
        if self.limit == 0 {
            return;
        }
        self.tracks.push_front(track);
        self.tracks.truncate(self.limit);
    }

    /// Remove and return the most recent track
    pub fn pop_recent(&mut self) -> Option<Track> {
        self.tracks.pop_front()
    }

    /// Remove and return the oldest track
    pub fn pop_oldest(&mut self) -> Option<Track> {
        self.tracks.pop_back()
    }

    /// Remove the track at `index` (0 = most recent)
    pub fn take(&mut self, index: usize) -> Option<Track> {
        self.tracks.remove(index)
    }

    pub fn recent(&self) -> Option<&Track> {
        self.tracks.front()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Iterate from most recent to oldest
    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Snapshot of the history, most recent first
    pub fn to_vec(&self) -> Vec<Track> {
        self.tracks.iter().cloned().collect()
    }
}

impl Default for PlayHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str) -> Track {
        Track::new(id, format!("Song {}", id), "Test Artist").with_duration(180.0)
    }

    fn ids(history: &PlayHistory) -> Vec<&str> {
        history.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_most_recent_first() {
        let mut history = PlayHistory::default();
        history.push(track("1"));
        history.push(track("2"));
        history.push(track("3"));

        assert_eq!(ids(&history), vec!["3", "2", "1"]);
        assert_eq!(history.recent().map(|t| t.id.as_str()), Some("3"));
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let mut history = PlayHistory::new(3);
        for i in 1..=5 {
            history.push(track(&i.to_string()));
        }

        assert_eq!(history.len(), 3);
        assert_eq!(ids(&history), vec!["5", "4", "3"]);
    }

    #[test]
    fn test_default_limit_is_twenty() {
        let mut history = PlayHistory::default();
        for i in 0..25 {
            history.push(track(&i.to_string()));
        }
        assert_eq!(history.len(), DEFAULT_HISTORY_LIMIT);
        assert_eq!(history.get(19).map(|t| t.id.as_str()), Some("5"));
    }

    #[test]
    fn test_pop_both_ends() {
        let mut history = PlayHistory::default();
        history.push(track("1"));
        history.push(track("2"));
        history.push(track("3"));

        assert_eq!(history.pop_recent().map(|t| t.id), Some("3".to_string()));
        assert_eq!(history.pop_oldest().map(|t| t.id), Some("1".to_string()));
        assert_eq!(ids(&history), vec!["2"]);
    }

    #[test]
    fn test_take_out_of_range() {
        let mut history = PlayHistory::default();
        history.push(track("1"));

        assert!(history.take(5).is_none());
        assert_eq!(history.take(0).map(|t| t.id), Some("1".to_string()));
        assert!(history.is_empty());
    }

    #[test]
    fn test_zero_limit_keeps_nothing() {
        let mut history = PlayHistory::new(0);
        history.push(track("1"));
        assert!(history.is_empty());
    }
}
