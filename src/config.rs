//! Configuration types for stego-client

use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

use crate::error::{Error, Result};
use crate::types::{Mode, Operation};

/// Environment variable holding the service origin
pub const ENV_API_URL: &str = "STEGO_API_URL";
/// Environment variable overriding the download directory
pub const ENV_DOWNLOAD_DIR: &str = "STEGO_DOWNLOAD_DIR";
/// Environment variable overriding the storage-upload failure signature
pub const ENV_STORAGE_FAILURE_SIGNATURE: &str = "STEGO_STORAGE_FAILURE_SIGNATURE";

/// Longest budget any timeout may be set to (24 hours)
pub const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Per-operation timeout budgets
///
/// Durations are serialized as integer seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Encode with image or audio carriers (default: 120 seconds)
    #[serde(default = "default_encode_timeout", with = "duration_serde")]
    pub encode: Duration,

    /// Decode with image or audio carriers (default: 60 seconds)
    #[serde(default = "default_decode_timeout", with = "duration_serde")]
    pub decode: Duration,

    /// Encode with video carriers (default: 180 seconds)
    #[serde(default = "default_video_encode_timeout", with = "duration_serde")]
    pub video_encode: Duration,

    /// Decode with video carriers (default: 120 seconds)
    #[serde(default = "default_video_decode_timeout", with = "duration_serde")]
    pub video_decode: Duration,

    /// Secondary fetch of a reference result (default: 60 seconds)
    #[serde(default = "default_download_timeout", with = "duration_serde")]
    pub download: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            encode: default_encode_timeout(),
            decode: default_decode_timeout(),
            video_encode: default_video_encode_timeout(),
            video_decode: default_video_decode_timeout(),
            download: default_download_timeout(),
        }
    }
}

impl TimeoutConfig {
    /// Budget for one attempt of `operation` in `mode`
    pub fn budget(&self, mode: Mode, operation: Operation) -> Duration {
        match (mode, operation) {
            (Mode::Video, Operation::Encode) => self.video_encode,
            (Mode::Video, Operation::Decode) => self.video_decode,
            (_, Operation::Encode) => self.encode,
            (_, Operation::Decode) => self.decode,
        }
    }
}

/// Where and how artifacts are written
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Download directory (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// File collision handling
    #[serde(default)]
    pub file_collision: FileCollisionAction,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            file_collision: FileCollisionAction::default(),
        }
    }
}

/// File collision handling strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCollisionAction {
    /// Append (1), (2), etc. to filename (default)
    #[default]
    Rename,
    /// Overwrite existing file
    Overwrite,
    /// Skip the file, keep existing
    Skip,
}

/// Main configuration
///
/// Read once at startup; the orchestrator and sink share it behind an `Arc`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Base origin of the steganography service (e.g., "https://stego.example.com")
    pub api_url: String,

    /// Timeout budgets
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Artifact download settings
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// Substring of an error `detail` that marks a remote-storage upload failure
    ///
    /// Matching free text is fragile; keep this in sync with the service's
    /// error messages.
    #[serde(default = "default_storage_failure_signature")]
    pub storage_failure_signature: String,

    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeouts: TimeoutConfig::default(),
            download: DownloadConfig::default(),
            storage_failure_signature: default_storage_failure_signature(),
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    /// Build a configuration for `api_url` with defaults elsewhere
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Default::default()
        }
    }

    /// Load configuration from the process environment
    ///
    /// `STEGO_API_URL` is required; `STEGO_DOWNLOAD_DIR` and
    /// `STEGO_STORAGE_FAILURE_SIGNATURE` are optional overrides.
    pub fn from_env() -> Result<Self> {
        let api_url = std::env::var(ENV_API_URL)
            .map_err(|_| Error::config("api_url", format!("{} is not set", ENV_API_URL)))?;

        let mut config = Self::new(api_url);
        if let Ok(dir) = std::env::var(ENV_DOWNLOAD_DIR) {
            config.download.download_dir = PathBuf::from(dir);
        }
        if let Ok(signature) = std::env::var(ENV_STORAGE_FAILURE_SIGNATURE) {
            config.storage_failure_signature = signature;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values that cannot work
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.api_url).map_err(|e| {
            Error::config("api_url", format!("invalid URL {:?}: {}", self.api_url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::config(
                "api_url",
                format!("unsupported scheme {:?}", parsed.scheme()),
            ));
        }

        let budgets = [
            ("timeouts.encode", self.timeouts.encode),
            ("timeouts.decode", self.timeouts.decode),
            ("timeouts.video_encode", self.timeouts.video_encode),
            ("timeouts.video_decode", self.timeouts.video_decode),
            ("timeouts.download", self.timeouts.download),
        ];
        for (key, budget) in budgets {
            if budget.is_zero() {
                return Err(Error::config(key, "timeout must be greater than zero"));
            }
            if budget > MAX_TIMEOUT {
                return Err(Error::config(
                    key,
                    format!(
                        "timeout of {}s exceeds the {}s maximum",
                        budget.as_secs(),
                        MAX_TIMEOUT.as_secs()
                    ),
                ));
            }
        }

        if self.storage_failure_signature.is_empty() {
            return Err(Error::config(
                "storage_failure_signature",
                "signature must not be empty",
            ));
        }
        Ok(())
    }

    /// Full URL for an endpoint path
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), path)
    }

    /// Download directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_encode_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_decode_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_video_encode_timeout() -> Duration {
    Duration::from_secs(180)
}

fn default_video_decode_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_download_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_storage_failure_signature() -> String {
    "Error uploading to S3".to_string()
}

fn default_user_agent() -> String {
    concat!("stego-client/", env!("CARGO_PKG_VERSION")).to_string()
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
