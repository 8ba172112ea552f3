pub mod auth;
pub mod flow;
pub mod response;
pub mod store;
mod user;

use std::{collections::HashMap, future::Future};

use reqwest::{
    header::{HeaderName, HeaderValue},
    Method, StatusCode,
};

pub use user::UserApi;

use crate::Error;

pub type DefaultResponse = HashMap<String, serde_json::Value>;

/// Anything that can hand out the current access token and renew it when the
/// api rejects it.
pub trait TokenProvider: Send + Sync {
    /// Access token that is currently held, if any.
    fn access_token(&self) -> Option<String>;

    /// Renew the access token with the held refresh token.
    ///
    /// `Err(Error::NoRefreshToken)` when nothing can be refreshed, `Ok(None)` when the
    /// refresh was attempted and failed, otherwise the new access token.
    fn refresh(&self) -> impl Future<Output = Result<Option<String>, Error>> + Send;
}

/// Wrapper to build and send spotify requests using `reqwest`
pub(crate) struct SpotifyRequest {
    pub method: Method,
    pub url: String,
    pub headers: HashMap<HeaderName, String>,
    pub body: Option<String>,
}

/// Status and raw body of a spotify response.
///
/// Unlike `reqwest::Response::error_for_status` nothing is treated as an error here,
/// callers decide what a `204` or `401` means for them.
#[derive(Debug)]
pub struct SpotifyResponse {
    pub status: StatusCode,
    pub body: String,
}

impl SpotifyResponse {
    pub(crate) async fn from_response(response: reqwest::Response) -> Result<Self, Error> {
        let status = response.status();
        let body = String::from_utf8(response.bytes().await?.to_vec()).map_err(Error::custom)?;
        Ok(Self { status, body })
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Convert any non success status into [`Error::Request`] using the message in the
    /// body when spotify sent one.
    pub fn into_result(self) -> Result<Self, Error> {
        if self.status.is_success() {
            return Ok(self);
        }

        Err(Error::Request {
            code: self.status.as_u16(),
            message: error_message(&self.body)
                .unwrap_or_else(|| "Failed to make spotify request".to_owned()),
        })
    }

    /// Deserialize the body, reporting the path of the offending field on failure.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, Error> {
        let body = if self.body.trim().is_empty() { "null" } else { self.body.as_str() };
        let jd = &mut serde_json::Deserializer::from_str(body);
        Ok(serde_path_to_error::deserialize(jd)?)
    }
}

/// Pull a readable message out of either error shape spotify uses.
///
/// Auth endpoints answer `{"error": "...", "error_description": "..."}` while the web api
/// answers `{"error": {"status": 401, "message": "..."}}`.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let body: DefaultResponse = serde_json::from_str(body).ok()?;
    if let Some(description) = body.get("error_description").and_then(|v| v.as_str()) {
        return Some(description.to_owned());
    }

    match body.get("error")? {
        serde_json::Value::String(error) => Some(error.clone()),
        serde_json::Value::Object(error) => error
            .get("message")
            .and_then(|v| v.as_str())
            .map(str::to_owned),
        _ => None,
    }
}

impl SpotifyRequest {
    pub fn new<S: AsRef<str>>(method: Method, url: S) -> Self {
        Self {
            method,
            url: url.as_ref().to_string(),
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn get<S: AsRef<str>>(url: S) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post<S: AsRef<str>>(url: S) -> Self {
        Self::new(Method::POST, url)
    }

    /// Set the body of the request to an urlencoded form
    pub fn form<K: AsRef<str>, V: AsRef<str>>(mut self, form: &[(K, V)]) -> Result<Self, Error> {
        let pairs = form
            .iter()
            .map(|(k, v)| (k.as_ref(), v.as_ref()))
            .collect::<Vec<_>>();
        self.headers.insert(
            reqwest::header::CONTENT_TYPE,
            "application/x-www-form-urlencoded".to_string(),
        );
        self.body = Some(serde_urlencoded::to_string(pairs)?);
        Ok(self)
    }

    /// Send the request as is, authorizing it with `token` when one is given.
    pub async fn send(
        self,
        client: &reqwest::Client,
        token: Option<&str>,
    ) -> Result<SpotifyResponse, Error> {
        let mut request = client.request(self.method, self.url);
        for (key, value) in self.headers {
            let value = HeaderValue::from_str(&value).map_err(Error::custom)?;
            request = request.header(key, value);
        }

        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        if let Some(body) = self.body {
            request = request.body(body);
        }

        SpotifyResponse::from_response(request.send().await?).await
    }
}

pub mod alphabet {
    pub static PKCE: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-._~";
}

/// Random string of `length` characters drawn from `alphabet` using the os rng.
pub fn uuid(length: usize, alphabet: &[u8]) -> Result<String, getrandom::Error> {
    // Bytes at or above this bound would bias the modulo towards the start of the alphabet
    let bound = 256 - (256 % alphabet.len());

    let mut result = String::with_capacity(length);
    let mut buf = [0u8; 64];
    while result.len() < length {
        getrandom::getrandom(&mut buf)?;
        for b in buf.iter().filter(|b| (**b as usize) < bound) {
            if result.len() == length {
                break;
            }
            result.push(alphabet[*b as usize % alphabet.len()] as char);
        }
    }
    Ok(result)
}

pub mod scopes {
    pub static USER_READ_EMAIL: &str = "user-read-email";
    pub static USER_READ_PRIVATE: &str = "user-read-private";
    pub static USER_READ_CURRENTLY_PLAYING: &str = "user-read-currently-playing";
    pub static USER_READ_PLAYBACK_STATE: &str = "user-read-playback-state";

    /// Everything needed to show the profile and the current playback.
    pub static DEFAULT: [&str; 4] = [
        USER_READ_PRIVATE,
        USER_READ_EMAIL,
        USER_READ_CURRENTLY_PLAYING,
        USER_READ_PLAYBACK_STATE,
    ];
}
