use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Fitted-model bundle (column transformer + k-means centroids)
    #[serde(default = "default_model_path")]
    pub model_path: String,

    /// Preprocessed catalog snapshot, one JSON object per line
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of tracks returned when a request does not ask for a count
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Whether the seed's own catalog entry may appear in its recommendations
    #[serde(default)]
    pub include_seed_track: bool,

    /// Redis connection URL; lookups are not cached when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Spotify client credentials; query lookups are disabled when unset
    #[serde(default)]
    pub spotify_client_id: Option<String>,

    #[serde(default)]
    pub spotify_client_secret: Option<String>,

    /// Spotify Web API base URL
    #[serde(default = "default_spotify_api_url")]
    pub spotify_api_url: String,

    /// Spotify accounts service base URL
    #[serde(default = "default_spotify_auth_url")]
    pub spotify_auth_url: String,
}

fn default_model_path() -> String {
    "models/k_means.json".to_string()
}

fn default_catalog_path() -> String {
    "data/catalog.jsonl".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_top_k() -> usize {
    5
}

fn default_spotify_api_url() -> String {
    "https://api.spotify.com".to_string()
}

fn default_spotify_auth_url() -> String {
    "https://accounts.spotify.com".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.default_top_k == 0 {
            anyhow::bail!("DEFAULT_TOP_K must be positive");
        }
        Ok(())
    }

    /// Returns the Spotify credentials pair when both halves are configured
    pub fn spotify_credentials(&self) -> Option<(String, String)> {
        match (&self.spotify_client_id, &self.spotify_client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some((id.clone(), secret.clone()))
            }
            _ => None,
        }
    }
}
