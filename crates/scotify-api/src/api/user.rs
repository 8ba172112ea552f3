use std::future::Future;

use reqwest::StatusCode;

use crate::Error;

use super::{
    flow::Config,
    response::{CurrentlyPlaying, Profile},
    SpotifyRequest,
};

pub trait UserApi: Sync {
    fn config(&self) -> &Config;
    fn client(&self) -> &reqwest::Client;

    /// Get detailed profile information about the current user (including the current user's username).
    ///
    /// # Scopes
    /// - `user-read-private` [optional]: Access to the `product`, `explicit_content`, and `country` fields
    /// - `user-read-email` [optional]: Access to the `email` field
    fn current_user_profile(&self, token: &str) -> impl Future<Output = Result<Profile, Error>> + Send {
        async move {
            SpotifyRequest::get(format!("{}/me", self.config().api_url()))
                .send(self.client(), Some(token))
                .await?
                .into_result()?
                .json()
        }
    }

    /// Get the object currently being played on the user's Spotify account.
    ///
    /// `204`, `401` and bodies without a track are not errors, see [`CurrentlyPlaying`].
    /// Any other non success status is returned as [`Error::Request`].
    ///
    /// # Scopes
    /// - `user-read-currently-playing`
    fn currently_playing(&self, token: &str) -> impl Future<Output = Result<CurrentlyPlaying, Error>> + Send {
        async move {
            let response =
                SpotifyRequest::get(format!("{}/me/player/currently-playing", self.config().api_url()))
                    .send(self.client(), Some(token))
                    .await?;

            match response.status {
                StatusCode::NO_CONTENT => Ok(CurrentlyPlaying::Nothing),
                StatusCode::UNAUTHORIZED => Ok(CurrentlyPlaying::Unauthorized),
                status if status.is_success() => Ok(CurrentlyPlaying::from_body(&response.body)),
                _ => response.into_result().map(|_| CurrentlyPlaying::Nothing),
            }
        }
    }
}
