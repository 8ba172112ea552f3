use chrono::{DateTime, Local, TimeDelta};
use serde::Deserialize;
use std::sync::{MutexGuard, PoisonError};

use crate::{Locked, Shared};

/// OAuth2 settings for the authorization code flow
#[derive(Debug, Clone)]
pub struct OAuth {
    pub client_id: String,
    pub redirect: String,
    /// Requested scopes in the order they are sent to spotify
    pub scopes: Vec<String>,
}

pub trait IntoScopes {
    fn into_scopes(self) -> Vec<String>;
}

impl IntoScopes for () {
    fn into_scopes(self) -> Vec<String> {
        Vec::new()
    }
}

impl<A: AsRef<str>, const N: usize> IntoScopes for [A; N] {
    fn into_scopes(self) -> Vec<String> {
        collect_scopes(self.iter())
    }
}

impl<A: AsRef<str>> IntoScopes for &[A] {
    fn into_scopes(self) -> Vec<String> {
        collect_scopes(self.iter())
    }
}

impl<A: AsRef<str>> IntoScopes for Vec<A> {
    fn into_scopes(self) -> Vec<String> {
        collect_scopes(self.iter())
    }
}

/// Keep the first occurrence of every scope, also splitting space delimited entries.
fn collect_scopes<'a, A: AsRef<str> + 'a, I: Iterator<Item = &'a A>>(scopes: I) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    for scope in scopes.flat_map(|s| s.as_ref().split_whitespace()) {
        if !result.iter().any(|s| s == scope) {
            result.push(scope.to_string());
        }
    }
    result
}

impl OAuth {
    pub fn new<C: Into<String>, R: Into<String>, S: IntoScopes>(
        client_id: C,
        redirect: R,
        scopes: S,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            redirect: redirect.into(),
            scopes: scopes.into_scopes(),
        }
    }

    /// Space delimited scope list as sent in the authorization request
    pub fn scope(&self) -> String {
        self.scopes.join(" ")
    }
}

/// Access/refresh token pair returned by the token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds. Only recorded, renewal happens when the
    /// api answers `401`.
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(skip, default = "Local::now")]
    pub obtained: DateTime<Local>,
}

impl TokenPair {
    pub fn new<S: Into<String>>(access_token: S, refresh_token: Option<String>, expires_in: u64) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_in,
            scope: None,
            obtained: Local::now(),
        }
    }

    pub fn access(&self) -> &str {
        &self.access_token
    }

    /// `None` when `expires_in` is too large to be a point in time
    pub fn expires(&self) -> Option<DateTime<Local>> {
        let lifetime = TimeDelta::try_seconds(i64::try_from(self.expires_in).ok()?)?;
        self.obtained.checked_add_signed(lifetime)
    }

    pub fn is_expired(&self) -> bool {
        self.expires().is_some_and(|expires| expires <= Local::now())
    }
}

/// Single in memory token slot shared between the auth flow and whatever makes api calls.
///
/// Cloning the session clones the handle, not the tokens.
#[derive(Debug, Clone, Default)]
pub struct Session {
    tokens: Shared<Locked<Option<TokenPair>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<TokenPair>> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn access_token(&self) -> Option<String> {
        self.slot().as_ref().map(|t| t.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.slot().as_ref().and_then(|t| t.refresh_token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.slot().is_some()
    }

    pub fn set(&self, token: TokenPair) {
        *self.slot() = Some(token);
    }

    /// Apply a refresh response and return the new access token.
    ///
    /// The refresh token is only replaced when the response carries a new one since
    /// spotify does not always rotate it. A session cleared while the refresh was in flight
    /// stays cleared and `None` is returned.
    pub fn apply_refresh(&self, refreshed: TokenPair) -> Option<String> {
        let mut slot = self.slot();
        let current = slot.as_mut()?;

        current.access_token = refreshed.access_token;
        current.expires_in = refreshed.expires_in;
        current.obtained = refreshed.obtained;
        if refreshed.scope.is_some() {
            current.scope = refreshed.scope;
        }
        if refreshed.refresh_token.is_some() {
            current.refresh_token = refreshed.refresh_token;
        }
        Some(current.access_token.clone())
    }

    pub fn clear(&self) {
        *self.slot() = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scopes_keep_order_and_dedup() {
        let oauth = OAuth::new(
            "id",
            "http://127.0.0.1:8888/callback",
            ["user-read-private user-read-email", "user-read-private", "user-read-playback-state"],
        );
        assert_eq!(oauth.scope(), "user-read-private user-read-email user-read-playback-state");
    }

    #[test]
    fn refresh_keeps_old_refresh_token_when_not_rotated() {
        let session = Session::new();
        session.set(TokenPair::new("AT1", Some("RT1".into()), 3600));

        let access = session.apply_refresh(TokenPair::new("AT2", None, 3600));
        assert_eq!(access.as_deref(), Some("AT2"));
        assert_eq!(session.access_token().as_deref(), Some("AT2"));
        assert_eq!(session.refresh_token().as_deref(), Some("RT1"));
    }

    #[test]
    fn refresh_replaces_rotated_refresh_token() {
        let session = Session::new();
        session.set(TokenPair::new("AT1", Some("RT1".into()), 3600));

        session.apply_refresh(TokenPair::new("AT2", Some("RT2".into()), 3600));
        assert_eq!(session.access_token().as_deref(), Some("AT2"));
        assert_eq!(session.refresh_token().as_deref(), Some("RT2"));
    }

    #[test]
    fn refresh_does_not_revive_a_cleared_session() {
        let session = Session::new();
        assert_eq!(session.apply_refresh(TokenPair::new("AT2", Some("RT2".into()), 3600)), None);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn huge_lifetime_has_no_expiry() {
        let token = TokenPair::new("AT", None, 10_000_000_000_000_000);
        assert_eq!(token.expires(), None);
        assert!(!token.is_expired());

        let token = TokenPair::new("AT", None, u64::MAX);
        assert_eq!(token.expires(), None);
        assert!(!token.is_expired());

        let token = TokenPair::new("AT", None, 0);
        assert!(token.expires().is_some());
        assert!(token.is_expired());
    }

    #[test]
    fn clones_share_the_same_slot() {
        let session = Session::new();
        let other = session.clone();
        other.set(TokenPair::new("AT1", None, 0));
        assert!(session.is_authenticated());
        session.clear();
        assert!(!other.is_authenticated());
    }

    #[test]
    fn token_pair_parses_without_refresh_token() {
        let token: TokenPair =
            serde_json::from_str(r#"{"access_token":"AT","token_type":"Bearer","expires_in":3600}"#).unwrap();
        assert_eq!(token.access(), "AT");
        assert_eq!(token.refresh_token, None);
        assert!(!token.is_expired());
    }
}
