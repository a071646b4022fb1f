use std::env;
use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upstream fetch timeout in seconds (standard image path only).
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Number of encoded images kept in the in-memory cache tier.
    #[serde(default = "default_memory_cache_capacity")]
    pub memory_cache_capacity: usize,
    /// Disk tier toggle. The production profile disables it for read-only or
    /// ephemeral filesystems.
    #[serde(default = "default_disk_cache_enabled")]
    pub disk_cache_enabled: bool,
    /// Disk cache directory. Defaults to `auraah-image-cache` under the OS
    /// temp directory.
    #[serde(default)]
    pub image_cache_dir: Option<String>,
    /// WebP encoder effort (0-6) for the standard image path.
    #[serde(default = "default_encode_effort")]
    pub encode_effort: i32,
    /// Max number of concurrent decode/encode operations per process.
    #[serde(default = "default_transform_concurrency")]
    pub transform_concurrency: usize,
    /// Hosts the image proxy may fetch from. Unset means any host, which is
    /// logged as a warning at startup.
    #[serde(default)]
    pub image_host_allowlist: Option<Vec<String>>,
    /// Aura profile cache duration in days.
    #[serde(default = "default_aura_cache_duration")]
    pub aura_cache_duration: u64,
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default)]
    pub groq_api_key: Option<String>,
    #[serde(default)]
    pub unsplash_access_key: Option<String>,
    #[serde(default)]
    pub tavily_api_key: Option<String>,
}

impl AppConfig {
    pub fn image_cache_dir(&self) -> PathBuf {
        match &self.image_cache_dir {
            Some(dir) => PathBuf::from(dir),
            None => env::temp_dir().join("auraah-image-cache"),
        }
    }
}

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_timeout() -> u64 {
    5
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

fn default_memory_cache_capacity() -> usize {
    200
}

fn default_disk_cache_enabled() -> bool {
    true
}

fn default_encode_effort() -> i32 {
    3
}

fn default_transform_concurrency() -> usize {
    2
}

fn default_aura_cache_duration() -> u64 {
    7
}
