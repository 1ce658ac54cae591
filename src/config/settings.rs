//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::audio::VoiceId;
use crate::playback::clamp_rate;

// ---------------------------------------------------------------------------
// RemoteConfig
// ---------------------------------------------------------------------------

/// Connection settings for the generative text and speech service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the `generateContent` API.
    pub base_url: String,
    /// API key.  `None` in the file means "read `GEMINI_API_KEY` / `API_KEY`
    /// from the environment at load time".
    pub api_key: Option<String>,
    /// Model used for chapter text, reflections and the daily verse.
    pub text_model: String,
    /// Model used for speech synthesis.
    pub speech_model: String,
    /// Maximum seconds to wait for a single response.
    pub timeout_secs: u64,
    /// Set when `api_key` came from the environment; such keys are never saved.
    #[serde(skip)]
    pub key_from_env: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".into(),
            api_key: None,
            text_model: "gemini-3-flash-preview".into(),
            speech_model: "gemini-2.5-flash-preview-tts".into(),
            timeout_secs: 60,
            key_from_env: false,
        }
    }
}

// ---------------------------------------------------------------------------
// FetchConfig
// ---------------------------------------------------------------------------

/// Retry and pacing policy for chapter fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Total attempts per chapter fetch (first try included).
    pub max_retries: u32,
    /// Backoff unit in milliseconds; attempt `i` failing waits `2^i` units.
    pub base_backoff_ms: u64,
    /// Pause between remote fetches during a whole-book download.
    pub download_pacing_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff_ms: 1_000,
            download_pacing_ms: 400,
        }
    }
}

// ---------------------------------------------------------------------------
// PlaybackConfig
// ---------------------------------------------------------------------------

/// Narration defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Narrator voice used for new synthesis requests.
    pub voice: VoiceId,
    /// Playback speed multiplier (0.75, 1.0, 1.25 are offered by the UI).
    pub playback_rate: f32,
    /// Number of verses ahead of the playing verse to prefetch.
    pub lookahead: usize,
    /// Number of verses prefetched as soon as a chapter opens.
    pub initial_prefetch: usize,
    /// Sample rate of the synthesized PCM stream.
    pub sample_rate: u32,
    /// Channel count of the synthesized PCM stream.
    pub channels: u16,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            voice: VoiceId::default(),
            playback_rate: 1.0,
            lookahead: 5,
            initial_prefetch: 3,
            sample_rate: 24_000,
            channels: 1,
        }
    }
}

impl PlaybackConfig {
    /// Store `rate` as the engine will apply it.  Returns the stored value,
    /// or `None` (leaving the setting untouched) for an unusable rate.
    pub fn set_rate(&mut self, rate: f32) -> Option<f32> {
        let rate = clamp_rate(rate)?;
        self.playback_rate = rate;
        Some(rate)
    }
}

// ---------------------------------------------------------------------------
// StorageConfig
// ---------------------------------------------------------------------------

/// Location of the offline content store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Overrides [`AppPaths::cache_dir`] when set.
    pub cache_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// The directory the content store should open.
    pub fn resolve_cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| AppPaths::new().cache_dir)
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use achik_bible::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Generation/speech service settings.
    pub remote: RemoteConfig,
    /// Chapter fetch retry policy.
    pub fetch: FetchConfig,
    /// Narration defaults.
    pub playback: PlaybackConfig,
    /// Offline store location.
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns the defaults when the file does not exist yet, then fills a
    /// missing API key from the environment.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&AppPaths::new().settings_file)?;
        config.apply_env();
        Ok(config)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = if self.remote.key_from_env {
            let mut stored = self.clone();
            stored.remote.api_key = None;
            stored.remote.key_from_env = false;
            toml::to_string_pretty(&stored)?
        } else {
            toml::to_string_pretty(self)?
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    fn apply_env(&mut self) {
        let has_key = self
            .remote
            .api_key
            .as_deref()
            .is_some_and(|k| !k.is_empty());
        if has_key {
            return;
        }
        self.remote.api_key = ["GEMINI_API_KEY", "API_KEY"]
            .iter()
            .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()));
        self.remote.key_from_env = self.remote.api_key.is_some();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
