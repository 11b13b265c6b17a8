//! Seed track acquisition
//!
//! The recommender never talks to a music catalog service directly. It asks a
//! `TrackSource` for the raw attributes of a track matching a query and
//! validates the answer at the boundary. Retries, rate limiting and timeouts
//! are the source's business.

use std::fmt::Display;

use crate::{
    error::{AppError, AppResult},
    models::RawTrackInput,
};

pub mod spotify;

pub use spotify::SpotifyProvider;

/// What the user asked for: a title, optionally narrowed by artist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackQuery {
    pub title: String,
    pub artist: Option<String>,
}

impl TrackQuery {
    pub fn new(title: impl Into<String>, artist: Option<String>) -> AppResult<Self> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(AppError::InvalidArgument(
                "Track title cannot be empty".to_string(),
            ));
        }

        let artist = artist
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        Ok(Self { title, artist })
    }
}

impl Display for TrackQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.artist {
            Some(artist) => write!(f, "track:{} artist:{}", self.title, artist),
            None => write!(f, "track:{}", self.title),
        }
    }
}

/// External search collaborator that resolves a query to raw track attributes
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TrackSource: Send + Sync {
    /// Finds the best match for `query` and returns its raw attributes
    async fn find_track(&self, query: &TrackQuery) -> AppResult<RawTrackInput>;

    /// Source name for logging and debugging
    fn name(&self) -> &'static str;
}
