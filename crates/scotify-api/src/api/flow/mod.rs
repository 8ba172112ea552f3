pub mod pkce;

pub use pkce::{CodeChallenge, Flow as Pkce};

#[cfg(feature = "caching")]
use std::path::{Path, PathBuf};

pub static API_BASE_URL: &str = "https://api.spotify.com/v1";
pub static ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";

/// Shortest and longest verifier allowed by RFC 7636
pub const VERIFIER_LENGTH_RANGE: std::ops::RangeInclusive<usize> = 43..=128;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL while making spotify requests
    pub api_base_url: String,
    /// Base URL of the authorization server (`/authorize` and `/api/token`)
    pub accounts_base_url: String,
    /// Directory where the pkce verifier is kept between login and redirect
    #[cfg(feature = "caching")]
    pub cache_path: PathBuf,
    /// Number of characters in generated pkce verifiers
    pub verifier_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: API_BASE_URL.to_string(),
            accounts_base_url: ACCOUNTS_BASE_URL.to_string(),
            #[cfg(feature = "caching")]
            cache_path: dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("scotify"),
            verifier_length: *VERIFIER_LENGTH_RANGE.end(),
        }
    }
}

impl Config {
    pub fn api_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    pub fn accounts_url(&self) -> &str {
        self.accounts_base_url.trim_end_matches('/')
    }

    #[cfg(feature = "caching")]
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    pub fn with_api_url<S: Into<String>>(mut self, url: S) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_accounts_url<S: Into<String>>(mut self, url: S) -> Self {
        self.accounts_base_url = url.into();
        self
    }

    /// Lengths outside of `43..=128` are clamped into that range
    pub fn with_verifier_length(mut self, length: usize) -> Self {
        self.verifier_length =
            length.clamp(*VERIFIER_LENGTH_RANGE.start(), *VERIFIER_LENGTH_RANGE.end());
        self
    }
}
