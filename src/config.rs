use std::{path::PathBuf, time::Duration};

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};

use scotify_api::{api::scopes, OAuth};

pub static DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";

/// Settings read from `scotify.yml`, `SCOTIFY_*` variables and the command line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub client_id: Option<String>,
    pub redirect_uri: String,
    /// Space delimited
    pub scopes: String,
    pub poll_interval_ms: u64,
    pub verifier_length: usize,
    pub status_timeout_ms: u64,
    pub accounts_url: Option<String>,
    pub api_url: Option<String>,
    /// Write logs here instead of stderr
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: None,
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            scopes: scopes::DEFAULT.join(" "),
            poll_interval_ms: crate::poller::DEFAULT_INTERVAL.as_millis() as u64,
            verifier_length: 128,
            status_timeout_ms: crate::status::DEFAULT_TIMEOUT.as_millis() as u64,
            accounts_url: None,
            api_url: None,
            log_file: None,
        }
    }
}

/// Every field optional so that only the variables present override the file
#[derive(Debug, Default, Deserialize)]
struct Overrides {
    client_id: Option<String>,
    redirect_uri: Option<String>,
    scopes: Option<String>,
    poll_interval_ms: Option<u64>,
    verifier_length: Option<usize>,
    status_timeout_ms: Option<u64>,
    accounts_url: Option<String>,
    api_url: Option<String>,
    log_file: Option<PathBuf>,
}

impl Config {
    /// Load the first config file that exists, falling back to the defaults
    pub fn load_with_fallback<const N: usize>(paths: [&str; N]) -> Result<Self> {
        match paths.iter().map(PathBuf::from).find(|path| path.exists()) {
            Some(path) => {
                log::debug!("Loading config from {}", path.display());
                let config_file = std::fs::read_to_string(&path)?;
                Self::from_yaml(&config_file)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_yaml(source: &str) -> Result<Self> {
        // An empty file deserializes to unit
        if source.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(source)?)
    }

    /// Apply `SCOTIFY_*` variables, including those from a `.env` file
    pub fn with_env(self) -> Result<Self> {
        dotenvy::dotenv().ok();
        self.with_vars(std::env::vars())
    }

    pub fn with_vars<I>(mut self, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let overrides: Overrides = envy::prefixed("SCOTIFY_").from_iter(vars)?;

        macro_rules! apply {
            ($($field: ident),*) => {
                $(
                    if let Some(value) = overrides.$field {
                        self.$field = value;
                    }
                )*
            };
        }
        apply!(redirect_uri, scopes, poll_interval_ms, verifier_length, status_timeout_ms);

        if overrides.client_id.is_some() {
            self.client_id = overrides.client_id;
        }
        if overrides.accounts_url.is_some() {
            self.accounts_url = overrides.accounts_url;
        }
        if overrides.api_url.is_some() {
            self.api_url = overrides.api_url;
        }
        if overrides.log_file.is_some() {
            self.log_file = overrides.log_file;
        }
        Ok(self)
    }

    pub fn client_id(&self) -> Result<&str> {
        self.client_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                eyre!("Missing spotify client id; set `client_id` in scotify.yml, SCOTIFY_CLIENT_ID or --client-id")
            })
    }

    pub fn oauth(&self) -> Result<OAuth> {
        Ok(OAuth::new(
            self.client_id()?,
            self.redirect_uri.as_str(),
            [self.scopes.as_str()],
        ))
    }

    /// Settings for the pkce flow and the web api
    pub fn api_config(&self) -> scotify_api::Config {
        let mut config = scotify_api::Config::default().with_verifier_length(self.verifier_length);
        if let Some(url) = &self.accounts_url {
            config = config.with_accounts_url(url);
        }
        if let Some(url) = &self.api_url {
            config = config.with_api_url(url);
        }
        config
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use indoc::indoc;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.redirect_uri, "http://127.0.0.1:8888/callback");
        assert_eq!(
            config.scopes,
            "user-read-private user-read-email user-read-currently-playing user-read-playback-state"
        );
        assert_eq!(config.poll_interval(), Duration::from_millis(5000));
        assert_eq!(config.status_timeout(), Duration::from_millis(3000));
        assert_eq!(config.verifier_length, 128);
        assert!(config.client_id().is_err());
    }

    #[test]
    fn yaml_overrides_defaults() {
        let config = Config::from_yaml(indoc! {"
            client_id: abc
            poll_interval_ms: 1000
            api_url: http://localhost:9000/v1
        "})
        .unwrap();
        assert_eq!(config.client_id().unwrap(), "abc");
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.api_config().api_url(), "http://localhost:9000/v1");
        assert_eq!(config.redirect_uri, DEFAULT_REDIRECT_URI);
    }

    #[test]
    fn env_overrides_yaml() {
        let config = Config::from_yaml("client_id: abc\nverifier_length: 64")
            .unwrap()
            .with_vars(vars(&[
                ("SCOTIFY_CLIENT_ID", "xyz"),
                ("SCOTIFY_POLL_INTERVAL_MS", "250"),
                ("UNRELATED", "1"),
            ]))
            .unwrap();
        assert_eq!(config.client_id().unwrap(), "xyz");
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.verifier_length, 64);
    }

    #[test]
    fn verifier_length_is_clamped() {
        let config = Config {
            verifier_length: 500,
            ..Default::default()
        };
        assert_eq!(config.api_config().verifier_length, 128);

        let config = Config {
            verifier_length: 8,
            ..Default::default()
        };
        assert_eq!(config.api_config().verifier_length, 43);
    }

    #[test]
    fn oauth_uses_configured_scopes() {
        let config = Config {
            client_id: Some("abc".into()),
            scopes: "user-read-private  user-read-email".into(),
            ..Default::default()
        };
        assert_eq!(config.oauth().unwrap().scope(), "user-read-private user-read-email");
    }
}
