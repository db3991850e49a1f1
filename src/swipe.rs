//! Swipe deck: walk a list of tracks one at a time, recording verdicts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Anything that can be swiped on
pub trait SwipeItem {
    /// Stable identifier recorded in the liked/disliked lists
    fn id(&self) -> &str;
}

impl SwipeItem for Value {
    fn id(&self) -> &str {
        self.get("id").and_then(Value::as_str).unwrap_or_default()
    }
}

/// What the user did with an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Like,
    Dislike,
    Skip,
}

/// One recorded swipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwipeRecord {
    pub item_id: String,
    pub verdict: Verdict,
    pub at: DateTime<Utc>,
}

/// Linear deck over a fixed list of items
#[derive(Debug, Clone)]
pub struct SwipeDeck<T> {
    items: Vec<T>,
    index: usize,
    liked: Vec<String>,
    disliked: Vec<String>,
    history: Vec<SwipeRecord>,
}

impl<T: SwipeItem> SwipeDeck<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            index: 0,
            liked: Vec::new(),
            disliked: Vec::new(),
            history: Vec::new(),
        }
    }

    /// The item waiting for a verdict
    pub fn current(&self) -> Option<&T> {
        self.items.get(self.index)
    }

    pub fn has_more(&self) -> bool {
        self.index < self.items.len()
    }

    /// Fraction of the deck already swiped, in `0.0..=1.0`
    pub fn progress(&self) -> f32 {
        if self.items.is_empty() {
            0.0
        } else {
            self.index as f32 / self.items.len() as f32
        }
    }

    pub fn position(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn liked(&self) -> &[String] {
        &self.liked
    }

    pub fn disliked(&self) -> &[String] {
        &self.disliked
    }

    pub fn history(&self) -> &[SwipeRecord] {
        &self.history
    }

    /// Like the current item and advance; no-op once exhausted
    pub fn like(&mut self) -> Option<&T> {
        self.advance(Verdict::Like)
    }

    /// Dislike the current item and advance; no-op once exhausted
    pub fn dislike(&mut self) -> Option<&T> {
        self.advance(Verdict::Dislike)
    }

    /// Advance without recording a preference; no-op once exhausted
    pub fn skip(&mut self) -> Option<&T> {
        self.advance(Verdict::Skip)
    }

    /// Start over with the same items
    pub fn reset(&mut self) {
        self.index = 0;
        self.liked.clear();
        self.disliked.clear();
        self.history.clear();
    }

    /// Returns the next current item
    fn advance(&mut self, verdict: Verdict) -> Option<&T> {
        let item_id = self.current()?.id().to_string();
        match verdict {
            Verdict::Like => self.liked.push(item_id.clone()),
            Verdict::Dislike => self.disliked.push(item_id.clone()),
            Verdict::Skip => {}
        }
        self.history.push(SwipeRecord {
            item_id,
            verdict,
            at: Utc::now(),
        });
        self.index += 1;
        self.current()
    }
}

/// Extract the tracks of a catalog playlist document.
///
/// Entries without a track object (removed or local files) are dropped.
pub fn playlist_tracks(playlist: &Value) -> Vec<Value> {
    playlist
        .pointer("/tracks/items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|entry| entry.get("track"))
                .filter(|track| track.is_object() && !track.id().is_empty())
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}
