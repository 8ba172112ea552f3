use base64::Engine;
use sha2::{Digest, Sha256};
use std::fmt::Debug;

use super::Config;

#[cfg(feature = "caching")]
use crate::api::store::FileStore;
#[cfg(not(feature = "caching"))]
use crate::api::store::MemoryStore;

use crate::{
    api::{
        alphabet,
        auth::{OAuth, Session, TokenPair},
        error_message,
        store::VerifierStore,
        uuid, SpotifyRequest, TokenProvider, UserApi,
    },
    Error, Shared,
};

#[derive(Debug, Clone)]
pub struct CodeChallenge {
    pub(crate) challenge: String,
    pub(crate) verifier: String,
}

impl CodeChallenge {
    fn sha256<S: AsRef<[u8]>>(value: S) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(value);
        hasher.finalize().to_vec()
    }

    fn base64encode<S: AsRef<[u8]>>(value: S) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(value)
    }

    /// Fresh random verifier of `length` characters and its S256 challenge
    pub fn new(length: usize) -> Result<Self, Error> {
        Ok(Self::from_verifier(uuid(length, alphabet::PKCE)?))
    }

    pub fn from_verifier<S: Into<String>>(verifier: S) -> Self {
        let verifier = verifier.into();
        let challenge = Self::base64encode(Self::sha256(&verifier));
        Self {
            verifier,
            challenge,
        }
    }

    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    pub fn challenge(&self) -> &str {
        &self.challenge
    }
}

/// Authorization code flow with pkce.
///
/// Owns the login handshake and token refresh. Tokens live in the [`Session`] the flow was
/// created with so other parts of the app can share them.
#[derive(Debug, Clone)]
pub struct Flow {
    pub oauth: OAuth,
    pub(crate) config: Config,
    pub(crate) session: Session,
    pub(crate) store: Shared<dyn VerifierStore>,
    pub(crate) client: reqwest::Client,
}

impl Flow {
    pub fn new(oauth: OAuth, config: Config, session: Session) -> Self {
        #[cfg(feature = "caching")]
        let store: Shared<dyn VerifierStore> = Shared::new(FileStore::new(config.cache_path()));
        #[cfg(not(feature = "caching"))]
        let store: Shared<dyn VerifierStore> = Shared::new(MemoryStore::new());

        Self {
            oauth,
            config,
            session,
            store,
            client: reqwest::Client::new(),
        }
    }

    /// Replace where the verifier is kept between `begin_login` and `complete_login`
    pub fn with_store<S: VerifierStore + 'static>(mut self, store: S) -> Self {
        self.store = Shared::new(store);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn store(&self) -> &dyn VerifierStore {
        self.store.as_ref()
    }

    /// Start a new login.
    ///
    /// A new verifier replaces any verifier left over from a previous attempt. The returned
    /// url is where the user has to be sent to grant access.
    pub fn begin_login(&self) -> Result<String, Error> {
        let code = CodeChallenge::new(self.config.verifier_length)?;
        self.store.save(code.verifier())?;
        log::debug!("Stored pkce verifier for a new login");
        self.authorization_url(&code)
    }

    pub fn authorization_url(&self, code: &CodeChallenge) -> Result<String, Error> {
        Ok(format!(
            "{}/authorize?{}",
            self.config.accounts_url(),
            serde_urlencoded::to_string([
                ("client_id", self.oauth.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.oauth.redirect.as_str()),
                ("scope", self.oauth.scope().as_str()),
                ("code_challenge_method", "S256"),
                ("code_challenge", code.challenge()),
            ])?
        ))
    }

    /// Exchange the authorization code from the redirect for a token pair.
    ///
    /// Fails with [`Error::MissingVerifier`] before making any request when no login was
    /// started. The verifier is only cleared once the exchange succeeds.
    pub async fn complete_login(&self, auth_code: &str) -> Result<TokenPair, Error> {
        let verifier = self.store.load()?.ok_or(Error::MissingVerifier)?;

        let response = SpotifyRequest::post(format!("{}/api/token", self.config.accounts_url()))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", auth_code),
                ("redirect_uri", self.oauth.redirect.as_str()),
                ("client_id", self.oauth.client_id.as_str()),
                ("code_verifier", verifier.as_str()),
            ])?
            .send(&self.client, None)
            .await?;

        if !response.is_success() {
            log::error!(
                "Token exchange failed [{}]: {}",
                response.status,
                error_message(&response.body).unwrap_or_else(|| response.body.clone())
            );
            return Err(Error::TokenExchangeFailed {
                status: response.status.as_u16(),
                body: response.body,
            });
        }

        let token: TokenPair = response.json()?;
        self.session.set(token.clone());
        self.store.clear()?;
        match token.expires() {
            Some(expires) => log::info!("Logged in, access token expires at {}", expires.format("%H:%M:%S")),
            None => log::info!("Logged in"),
        }
        Ok(token)
    }

    async fn request_refresh(&self, refresh_token: &str) -> Result<TokenPair, Error> {
        SpotifyRequest::post(format!("{}/api/token", self.config.accounts_url()))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.oauth.client_id.as_str()),
            ])?
            .send(&self.client, None)
            .await?
            .into_result()?
            .json()
    }

    /// Drop the tokens and any pending verifier. Safe to call when already logged out.
    pub fn logout(&self) -> Result<(), Error> {
        self.session.clear();
        self.store.clear()?;
        log::info!("Logged out");
        Ok(())
    }
}

impl TokenProvider for Flow {
    fn access_token(&self) -> Option<String> {
        self.session.access_token()
    }

    async fn refresh(&self) -> Result<Option<String>, Error> {
        let refresh_token = self.session.refresh_token().ok_or(Error::NoRefreshToken)?;

        log::info!("Refreshing access token");
        match self.request_refresh(&refresh_token).await {
            Ok(token) => {
                let access = self.session.apply_refresh(token);
                if access.is_none() {
                    log::info!("Logged out while refreshing, dropping the new access token");
                }
                Ok(access)
            }
            Err(err) => {
                log::warn!("Failed to refresh access token: {err}");
                Ok(None)
            }
        }
    }
}

impl UserApi for Flow {
    fn config(&self) -> &Config {
        &self.config
    }

    fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::store::MemoryStore;

    fn flow() -> Flow {
        Flow::new(
            OAuth::new("client", "http://127.0.0.1:8888/callback", ["user-read-private", "user-read-email"]),
            Config::default().with_accounts_url("https://accounts.example.com"),
            Session::new(),
        )
        .with_store(MemoryStore::new())
    }

    #[test]
    fn challenge_is_deterministic_and_url_safe() {
        let a = CodeChallenge::from_verifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        let b = CodeChallenge::from_verifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        // RFC 7636 appendix B
        assert_eq!(a.challenge(), "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
        assert_eq!(a.challenge(), b.challenge());

        for _ in 0..32 {
            let code = CodeChallenge::new(128).unwrap();
            assert!(!code.challenge().contains(['+', '/', '=']), "{}", code.challenge());
            assert_eq!(code.challenge(), CodeChallenge::from_verifier(code.verifier()).challenge());
        }
    }

    #[test]
    fn verifier_uses_unreserved_characters() {
        for length in 43..=128 {
            let code = CodeChallenge::new(length).unwrap();
            assert_eq!(code.verifier().len(), length);
            assert!(code
                .verifier()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')));
        }
    }

    #[test]
    fn begin_login_stores_verifier_and_builds_url() {
        let flow = flow();
        let url = flow.begin_login().unwrap();
        let verifier = flow.store().load().unwrap().unwrap();
        assert_eq!(verifier.len(), 128);

        let challenge = CodeChallenge::from_verifier(verifier);
        assert!(url.starts_with("https://accounts.example.com/authorize?"));
        assert!(url.contains("client_id=client"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8888%2Fcallback"));
        assert!(url.contains("scope=user-read-private+user-read-email"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains(&format!("code_challenge={}", challenge.challenge())));
    }

    #[test]
    fn begin_login_overwrites_previous_verifier() {
        let flow = flow();
        flow.begin_login().unwrap();
        let first = flow.store().load().unwrap();
        flow.begin_login().unwrap();
        assert_ne!(flow.store().load().unwrap(), first);
    }

    #[test]
    fn logout_is_idempotent() {
        let flow = flow();
        flow.begin_login().unwrap();
        flow.session().set(TokenPair::new("AT", Some("RT".into()), 3600));

        flow.logout().unwrap();
        flow.logout().unwrap();
        assert!(!flow.session().is_authenticated());
        assert_eq!(flow.store().load().unwrap(), None);
    }
}
