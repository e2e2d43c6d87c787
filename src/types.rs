//! Common types used throughout the image arena service

use serde::{Deserialize, Serialize};

/// Unique identifier for a rateable item, assigned by the store
pub type ItemId = i64;

/// A rateable image as persisted by the rating store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    /// Filename (discovered images) or URL (submitted images)
    pub reference: String,
    pub label: String,
    pub rating: f64,
    pub matches_played: u64,
}

impl Item {
    /// Resolve the reference into the URL a browser should load.
    ///
    /// URLs and absolute paths pass through untouched; bare filenames are
    /// served from `url_prefix`.
    pub fn public_url(&self, url_prefix: &str) -> String {
        if self.reference.contains("://") || self.reference.starts_with('/') {
            self.reference.clone()
        } else {
            format!("{}/{}", url_prefix.trim_end_matches('/'), self.reference)
        }
    }
}

/// One side of a matchup as sent to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupItem {
    pub id: ItemId,
    pub url: String,
    pub label: String,
}

impl MatchupItem {
    pub fn from_item(item: &Item, url_prefix: &str) -> Self {
        Self {
            id: item.id,
            url: item.public_url(url_prefix),
            label: item.label.clone(),
        }
    }
}

/// Body of `POST /vote`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub winner_id: ItemId,
    pub loser_id: ItemId,
}

/// Body of `POST /submit`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub url: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Result of a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub status: String,
    pub id: ItemId,
    /// False when an item with the same reference already existed
    pub created: bool,
}

/// One leaderboard row, rating rounded half to even for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub label: String,
    pub url: String,
    pub rating: i64,
}

impl LeaderboardEntry {
    pub fn from_item(item: &Item, url_prefix: &str) -> Self {
        Self {
            label: item.label.clone(),
            url: item.public_url(url_prefix),
            rating: item.rating.round_ties_even() as i64,
        }
    }
}
