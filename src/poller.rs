use std::{
    fmt::Display,
    sync::{
        atomic::{AtomicBool, Ordering},
        MutexGuard, PoisonError,
    },
    time::Duration,
};

use scotify_api::{CurrentlyPlaying, Error, TokenProvider, UserApi};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    render::{NowPlaying, PlaybackView, Renderer},
    status::StatusLine,
    Locked, Shared,
};

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    /// Waiting for the next tick
    Polling,
    Fetching,
    Refreshing,
    Rendering,
}

/// Why a cycle ended without playback
#[derive(Debug)]
pub enum CycleError {
    NotAuthenticated,
    NoRefreshToken,
    RefreshFailed,
    /// The refreshed token was rejected as well
    Unauthorized,
    PlaybackFetchFailed(Error),
}

impl Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAuthenticated => write!(f, "Not logged in"),
            Self::NoRefreshToken => write!(f, "Session expired, please log in again"),
            Self::RefreshFailed => write!(f, "Failed to refresh access token"),
            Self::Unauthorized => write!(f, "Spotify rejected the refreshed access token"),
            Self::PlaybackFetchFailed(err) => write!(f, "Failed to fetch current playback: {err}"),
        }
    }
}

impl std::error::Error for CycleError {}

/// Result of one fetch and render cycle
#[derive(Debug)]
pub enum Cycle {
    Track(NowPlaying),
    /// Nothing playing, including payloads without a track
    Empty,
    Failed(CycleError),
    /// Another cycle was still running
    Skipped,
}

struct Inner<A> {
    api: Shared<A>,
    renderer: Shared<dyn Renderer>,
    status: StatusLine,
    state: Locked<PollerState>,
    running: AtomicBool,
    in_flight: tokio::sync::Mutex<()>,
    /// Held while presenting a cycle so `stop` can wait out a render in progress
    gate: Locked<()>,
}

impl<A> Inner<A>
where
    A: UserApi + TokenProvider + 'static,
{
    fn set_state(&self, state: PollerState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn settle(&self) {
        self.set_state(match self.running.load(Ordering::SeqCst) {
            true => PollerState::Polling,
            false => PollerState::Idle,
        });
    }

    /// Run a cycle unless one is already in flight.
    ///
    /// Cycles started by a timer pass its token and render nothing once it is cancelled.
    async fn tick(&self, cancel: Option<&CancellationToken>) -> Cycle {
        let Ok(_guard) = self.in_flight.try_lock() else {
            log::debug!("Previous playback cycle still running, skipping tick");
            return Cycle::Skipped;
        };
        self.cycle(cancel).await
    }

    async fn cycle(&self, cancel: Option<&CancellationToken>) -> Cycle {
        let fetched = self.fetch().await;

        self.set_state(PollerState::Rendering);
        let cycle = match fetched {
            Ok(CurrentlyPlaying::Track(playback)) => Cycle::Track(NowPlaying::from(&playback)),
            Ok(CurrentlyPlaying::Nothing) => {
                log::debug!("Nothing is playing");
                Cycle::Empty
            }
            Ok(CurrentlyPlaying::Malformed(reason)) => {
                log::debug!("Ignoring currently playing payload: {reason}");
                Cycle::Empty
            }
            Ok(CurrentlyPlaying::Unauthorized) => Cycle::Failed(CycleError::Unauthorized),
            Err(err) => Cycle::Failed(err),
        };
        self.present(cancel, &cycle);
        self.settle();
        cycle
    }

    fn present(&self, cancel: Option<&CancellationToken>, cycle: &Cycle) {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            log::debug!("Polling stopped, dropping playback cycle");
            return;
        }

        match cycle {
            Cycle::Track(now) => self.renderer.render_playback(&PlaybackView::Track(now.clone())),
            Cycle::Failed(err) => {
                log::warn!("Playback cycle failed: {err}");
                self.renderer.render_playback(&PlaybackView::Empty);
                self.status.notify(err.to_string());
            }
            Cycle::Empty | Cycle::Skipped => self.renderer.render_playback(&PlaybackView::Empty),
        }
    }

    /// Fetch the playback, refreshing the token and retrying once on `401`
    async fn fetch(&self) -> Result<CurrentlyPlaying, CycleError> {
        let token = self.api.access_token().ok_or(CycleError::NotAuthenticated)?;

        match self.fetch_with(&token).await? {
            CurrentlyPlaying::Unauthorized => {
                log::info!("Access token expired, attempting refresh");
                self.set_state(PollerState::Refreshing);
                let token = match self.api.refresh().await {
                    Ok(Some(token)) => token,
                    Err(Error::NoRefreshToken) => return Err(CycleError::NoRefreshToken),
                    Ok(None) | Err(_) => return Err(CycleError::RefreshFailed),
                };

                match self.fetch_with(&token).await? {
                    CurrentlyPlaying::Unauthorized => Err(CycleError::Unauthorized),
                    other => Ok(other),
                }
            }
            other => Ok(other),
        }
    }

    async fn fetch_with(&self, token: &str) -> Result<CurrentlyPlaying, CycleError> {
        self.set_state(PollerState::Fetching);
        self.api
            .currently_playing(token)
            .await
            .map_err(CycleError::PlaybackFetchFailed)
    }
}

struct Task {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Fetches the current playback on a fixed interval and hands it to a [`Renderer`].
///
/// Only one timer exists per poller and cycles never overlap: a tick that fires while a
/// cycle (including its refresh and retry) is still running is skipped.
pub struct Poller<A> {
    inner: Shared<Inner<A>>,
    task: Locked<Option<Task>>,
}

impl<A> Poller<A>
where
    A: UserApi + TokenProvider + 'static,
{
    pub fn new(api: Shared<A>, renderer: Shared<dyn Renderer>, status: StatusLine) -> Self {
        Self {
            inner: Shared::new(Inner {
                api,
                renderer,
                status,
                state: Locked::new(PollerState::Idle),
                running: AtomicBool::new(false),
                in_flight: tokio::sync::Mutex::new(()),
                gate: Locked::new(()),
            }),
            task: Locked::new(None),
        }
    }

    fn task(&self) -> MutexGuard<'_, Option<Task>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> PollerState {
        *self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Run a cycle now and then every `interval`, replacing any running timer.
    pub fn start(&self, interval: Duration) {
        self.stop();

        let interval = interval.max(Duration::from_millis(1));
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let inner = self.inner.clone();

        inner.running.store(true, Ordering::SeqCst);
        inner.set_state(PollerState::Polling);

        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = timer.tick() => {}
                }

                tokio::select! {
                    _ = token.cancelled() => break,
                    cycle = inner.tick(Some(&token)) => log::debug!("Playback cycle finished: {cycle:?}"),
                }
            }
        });

        log::debug!("Polling playback every {}ms", interval.as_millis());
        *self.task() = Some(Task { handle, cancel });
    }

    /// Stop the timer and drop the cycle in flight, if any. Safe to call when not running.
    pub fn stop(&self) {
        if let Some(task) = self.task().take() {
            task.cancel.cancel();
            // A render that already passed the cancellation check finishes before this returns
            drop(self.inner.gate.lock().unwrap_or_else(PoisonError::into_inner));
            task.handle.abort();
            log::debug!("Stopped polling playback");
        }
        self.inner.running.store(false, Ordering::SeqCst);
        self.inner.set_state(PollerState::Idle);
    }

    /// Run one cycle outside of the timer
    pub async fn poll_now(&self) -> Cycle {
        self.inner.tick(None).await
    }
}

impl<A> Drop for Poller<A> {
    fn drop(&mut self) {
        if let Some(task) = self
            .task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.cancel.cancel();
            task.handle.abort();
        }
    }
}
