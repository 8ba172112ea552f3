#![allow(dead_code)]

use std::sync::Mutex;

use scotify::render::{PlaybackView, ProfileView, Renderer};
use scotify_api::{api::scopes, Config, MemoryStore, OAuth, Pkce, Session, TokenPair};
use serde_json::{json, Value};
use wiremock::MockServer;

pub const REDIRECT: &str = "http://127.0.0.1:8888/callback";

/// Keeps everything it was asked to render
#[derive(Default)]
pub struct Recorder {
    pub profiles: Mutex<Vec<Option<ProfileView>>>,
    pub playback: Mutex<Vec<PlaybackView>>,
    pub statuses: Mutex<Vec<Option<String>>>,
}

impl Recorder {
    pub fn last_playback(&self) -> Option<PlaybackView> {
        self.playback.lock().unwrap().last().cloned()
    }

    pub fn playback_count(&self) -> usize {
        self.playback.lock().unwrap().len()
    }

    pub fn statuses(&self) -> Vec<Option<String>> {
        self.statuses.lock().unwrap().clone()
    }
}

impl Renderer for Recorder {
    fn render_profile(&self, profile: Option<&ProfileView>) {
        self.profiles.lock().unwrap().push(profile.cloned());
    }

    fn render_playback(&self, playback: &PlaybackView) {
        self.playback.lock().unwrap().push(playback.clone());
    }

    fn render_status(&self, status: Option<&str>) {
        self.statuses.lock().unwrap().push(status.map(str::to_string));
    }
}

pub fn api_config(server: &MockServer) -> Config {
    Config::default()
        .with_accounts_url(server.uri())
        .with_api_url(format!("{}/v1", server.uri()))
}

pub fn flow(server: &MockServer) -> Pkce {
    Pkce::new(
        OAuth::new("client-id", REDIRECT, scopes::DEFAULT),
        api_config(server),
        Session::new(),
    )
    .with_store(MemoryStore::new())
}

/// A flow that already holds `AT1` and, if given, a refresh token
pub fn logged_in(server: &MockServer, refresh: Option<&str>) -> Pkce {
    let flow = flow(server);
    flow.session()
        .set(TokenPair::new("AT1", refresh.map(str::to_string), 3600));
    flow
}

pub fn song_a() -> Value {
    json!({
        "item": {
            "name": "Song A",
            "artists": [{"name": "Artist1"}, {"name": "Artist2"}],
            "album": {"name": "Album1", "images": [{"url": "u"}]},
            "duration_ms": 200000
        },
        "progress_ms": 50000,
        "is_playing": true,
        "device": {"name": "Phone", "type": "Smartphone"}
    })
}
