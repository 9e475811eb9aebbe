//! Play-next queue
//!
//! Ordered list of tracks waiting to play. The front of the queue plays
//! next unless shuffle picks another index.

use crate::types::Track;

#[derive(Debug, Clone, Default)]
pub struct PlayQueue {
    tracks: Vec<Track>,
}

impl PlayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the end of the queue
    pub fn push(&mut self, track: Track) {
        self.tracks.push(track);
    }

    /// Insert so the track plays next
    pub fn push_front(&mut self, track: Track) {
        self.tracks.insert(0, track);
    }

    /// Replace the whole queue
    pub fn replace(&mut self, tracks: Vec<Track>) {
        self.tracks = tracks;
    }

    /// Remove the track at `index`, `None` when out of range
    pub fn remove(&mut self, index: usize) -> Option<Track> {
        if index < self.tracks.len() {
            Some(self.tracks.remove(index))
        } else {
            None
        }
    }

    /// Move a track from one position to another
    ///
    /// Returns `false` and leaves the queue untouched if either index is out
    /// of range.
    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        let len = self.tracks.len();
        if from >= len || to >= len {
            return false;
        }
        if from != to {
            let track = self.tracks.remove(from);
            self.tracks.insert(to, track);
        }
        true
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub fn as_slice(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str) -> Track {
        Track::new(id, format!("Song {}", id), "Test Artist")
    }

    fn ids(queue: &PlayQueue) -> Vec<&str> {
        queue.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_push_and_push_front() {
        let mut queue = PlayQueue::new();
        queue.push(track("b"));
        queue.push(track("c"));
        queue.push_front(track("a"));

        assert_eq!(ids(&queue), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_remove_out_of_range_is_none() {
        let mut queue = PlayQueue::new();
        queue.push(track("a"));

        assert!(queue.remove(1).is_none());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.remove(0).map(|t| t.id), Some("a".to_string()));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_move_item() {
        let mut queue = PlayQueue::new();
        queue.replace(vec![track("a"), track("b"), track("c"), track("d")]);

        assert!(queue.move_item(0, 2));
        assert_eq!(ids(&queue), vec!["b", "c", "a", "d"]);

        assert!(queue.move_item(3, 0));
        assert_eq!(ids(&queue), vec!["d", "b", "c", "a"]);

        assert!(!queue.move_item(0, 4));
        assert_eq!(ids(&queue), vec!["d", "b", "c", "a"]);
    }
}
