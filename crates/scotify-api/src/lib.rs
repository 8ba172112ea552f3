use std::{
    fmt::{Debug, Display},
    sync::{Arc, Mutex},
};

pub mod api;

pub use api::{
    auth::{OAuth, Session, TokenPair},
    flow::{Config, Pkce},
    response::{CurrentlyPlaying, Playback, Profile},
    store::{FileStore, MemoryStore, VerifierStore},
    TokenProvider, UserApi,
};

pub type Shared<T> = Arc<T>;
pub type Locked<T> = Mutex<T>;

#[derive(Debug)]
pub enum Error {
    /// No pkce verifier was persisted for the authorization code being exchanged.
    MissingVerifier,
    /// The token endpoint rejected the authorization code exchange.
    TokenExchangeFailed { status: u16, body: String },
    /// A refresh was requested but the session holds no refresh token.
    NoRefreshToken,
    /// Spotify answered with a non success status.
    Request { code: u16, message: String },
    Http(reqwest::Error),
    Json(String),
    Io(std::io::Error),
    Url(serde_urlencoded::ser::Error),
    Custom(String),
}

impl Error {
    pub fn custom<S: Display>(message: S) -> Self {
        Self::Custom(message.to_string())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingVerifier => write!(
                f,
                "no pkce verifier found for this authorization code; start the login again"
            ),
            Self::TokenExchangeFailed { status, body } => {
                write!(f, "token exchange failed [{status}]: {body}")
            }
            Self::NoRefreshToken => write!(f, "no refresh token available"),
            Self::Request { code, message } => write!(f, "[{code}] {message}"),
            Self::Http(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "failed to parse response: {err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::Url(err) => write!(f, "{err}"),
            Self::Custom(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Url(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value.to_string())
    }
}

impl<E: std::error::Error> From<serde_path_to_error::Error<E>> for Error {
    fn from(value: serde_path_to_error::Error<E>) -> Self {
        Self::Json(value.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_urlencoded::ser::Error> for Error {
    fn from(value: serde_urlencoded::ser::Error) -> Self {
        Self::Url(value)
    }
}

impl From<getrandom::Error> for Error {
    fn from(value: getrandom::Error) -> Self {
        Self::Custom(value.to_string())
    }
}
