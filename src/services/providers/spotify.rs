//! Spotify Web API track source
//!
//! Flow:
//! 1. Token: POST /api/token (client credentials) → bearer token, reused until expiry
//! 2. Search: GET /v1/search?type=track&limit=1 → best matching track
//! 3. Features: GET /v1/audio-features/{id} → audio descriptors for that track
//!
//! The two payloads are merged into a single `RawTrackInput`.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{RawTrackInput, Truthy, YearValue},
    services::providers::{TrackQuery, TrackSource},
};

const LOOKUP_CACHE_TTL: u64 = 86400; // 1 day

/// Tokens are refreshed this long before Spotify says they expire
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 30;

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: TrackPage,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    items: Vec<SpotifyTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub album: Option<SpotifyAlbum>,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
    #[serde(default)]
    pub track_number: Option<u32>,
    #[serde(default)]
    pub disc_number: Option<u32>,
    #[serde(default)]
    pub explicit: Option<bool>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub duration_ms: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyAlbum {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpotifyAudioFeatures {
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub key: Option<f64>,
    pub loudness: Option<f64>,
    pub mode: Option<f64>,
    pub speechiness: Option<f64>,
    pub acousticness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub liveness: Option<f64>,
    pub valence: Option<f64>,
    pub tempo: Option<f64>,
    pub duration_ms: Option<f64>,
    pub time_signature: Option<f64>,
}

/// Merges a search hit and its audio features into one collaborator record
pub fn merge_track(track: SpotifyTrack, features: SpotifyAudioFeatures) -> RawTrackInput {
    let release_date = track.album.as_ref().and_then(|a| a.release_date.clone());
    let year = release_date
        .as_deref()
        .and_then(|date| date.split('-').next())
        .filter(|year| !year.is_empty())
        .map(|year| YearValue::Text(year.to_string()));

    RawTrackInput {
        id: Some(track.id),
        name: Some(track.name),
        album: track.album.as_ref().map(|a| a.name.clone()),
        album_id: track.album.as_ref().map(|a| a.id.clone()),
        artists: track.artists.iter().map(|a| a.name.clone()).collect(),
        artist_ids: track.artists.iter().map(|a| a.id.clone()).collect(),
        track_number: track.track_number,
        disc_number: track.disc_number,
        explicit: track.explicit.map(Truthy::Bool),
        danceability: features.danceability,
        energy: features.energy,
        key: features.key,
        loudness: features.loudness,
        mode: features.mode,
        speechiness: features.speechiness,
        acousticness: features.acousticness,
        instrumentalness: features.instrumentalness,
        liveness: features.liveness,
        valence: features.valence,
        tempo: features.tempo,
        duration_ms: features.duration_ms.or(track.duration_ms),
        time_signature: features.time_signature,
        year,
        release_date,
        popularity: track.popularity,
    }
}

#[derive(Clone)]
pub struct SpotifyProvider {
    http_client: HttpClient,
    client_id: String,
    client_secret: String,
    api_url: String,
    auth_url: String,
    cache: Option<Cache>,
    token: Arc<Mutex<Option<AccessToken>>>,
}

impl SpotifyProvider {
    pub fn new(
        client_id: String,
        client_secret: String,
        api_url: String,
        auth_url: String,
        cache: Option<Cache>,
    ) -> Self {
        Self {
            http_client: HttpClient::new(),
            client_id,
            client_secret,
            api_url: api_url.trim_end_matches('/').to_string(),
            auth_url: auth_url.trim_end_matches('/').to_string(),
            cache,
            token: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns a valid bearer token, requesting a new one when needed
    async fn access_token(&self) -> AppResult<String> {
        let mut token = self.token.lock().await;
        let now = Utc::now();

        if let Some(current) = token.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(current.value.clone());
        }

        let response = self
            .http_client
            .post(format!("{}/api/token", self.auth_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let response = check_status(response, "token").await?;
        let body: TokenResponse = response.json().await?;

        tracing::debug!(expires_in = body.expires_in, "Obtained Spotify access token");

        let fresh = AccessToken {
            value: body.access_token,
            expires_at: now + Duration::seconds(body.expires_in),
        };
        let value = fresh.value.clone();
        *token = Some(fresh);
        Ok(value)
    }

    async fn search_track(&self, query: &TrackQuery) -> AppResult<SpotifyTrack> {
        let token = self.access_token().await?;
        let q = query.to_string();

        let response = self
            .http_client
            .get(format!("{}/v1/search", self.api_url))
            .bearer_auth(token)
            .query(&[("q", q.as_str()), ("type", "track"), ("limit", "1")])
            .send()
            .await?;
        let response = check_status(response, "search").await?;
        let results: SearchResponse = response.json().await?;

        results.tracks.items.into_iter().next().ok_or_else(|| {
            AppError::SourceUnavailable(format!("No track found for query `{}`", q))
        })
    }

    async fn audio_features(&self, track_id: &str) -> AppResult<SpotifyAudioFeatures> {
        let token = self.access_token().await?;

        let response = self
            .http_client
            .get(format!("{}/v1/audio-features/{}", self.api_url, track_id))
            .bearer_auth(token)
            .send()
            .await?;
        let response = check_status(response, "audio-features").await?;
        Ok(response.json().await?)
    }

    async fn fetch(&self, query: &TrackQuery) -> AppResult<RawTrackInput> {
        let track = self.search_track(query).await?;
        let features = self.audio_features(&track.id).await?;

        tracing::info!(
            query = %query,
            track_id = %track.id,
            provider = "spotify",
            "Track features fetched"
        );

        Ok(merge_track(track, features))
    }
}

/// Turns any non-success status into `SourceUnavailable`
async fn check_status(response: Response, endpoint: &str) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        return Err(AppError::SourceUnavailable(format!(
            "Spotify {} rate limited, retry after {}s",
            endpoint, retry_after
        )));
    }

    let body = response.text().await.unwrap_or_default();
    Err(AppError::SourceUnavailable(format!(
        "Spotify {} returned status {}: {}",
        endpoint, status, body
    )))
}

#[async_trait::async_trait]
impl TrackSource for SpotifyProvider {
    async fn find_track(&self, query: &TrackQuery) -> AppResult<RawTrackInput> {
        match &self.cache {
            Some(cache) => cached!(
                cache,
                CacheKey::TrackLookup(query.to_string()),
                LOOKUP_CACHE_TTL,
                self.fetch(query)
            ),
            None => self.fetch(query).await,
        }
    }

    fn name(&self) -> &'static str {
        "spotify"
    }
}
