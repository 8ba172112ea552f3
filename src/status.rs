use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        PoisonError,
    },
    time::Duration,
};

use crate::{render::Renderer, Locked, Shared};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);

/// Transient status message that clears itself after a delay.
///
/// A newer message resets the delay, an older pending clear never removes it.
#[derive(Clone)]
pub struct StatusLine {
    renderer: Shared<dyn Renderer>,
    timeout: Duration,
    generation: Shared<AtomicU64>,
    current: Shared<Locked<Option<String>>>,
}

impl StatusLine {
    pub fn new(renderer: Shared<dyn Renderer>, timeout: Duration) -> Self {
        Self {
            renderer,
            timeout,
            generation: Shared::new(AtomicU64::new(0)),
            current: Shared::new(Locked::new(None)),
        }
    }

    pub fn current(&self) -> Option<String> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Show `message` and schedule its removal. Must be called inside a tokio runtime.
    pub fn notify<S: Into<String>>(&self, message: S) {
        let message = message.into();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(message.clone());
        self.renderer.render_status(Some(&message));

        let status = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(status.timeout).await;
            if status.generation.load(Ordering::SeqCst) == generation {
                status.clear();
            }
        });
    }

    pub fn clear(&self) {
        let previous = self.current.lock().unwrap_or_else(PoisonError::into_inner).take();
        if previous.is_some() {
            self.renderer.render_status(None);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::render::{PlaybackView, ProfileView};

    #[derive(Default)]
    struct Recorder(Locked<Vec<Option<String>>>);

    impl Renderer for Recorder {
        fn render_profile(&self, _: Option<&ProfileView>) {}
        fn render_playback(&self, _: &PlaybackView) {}
        fn render_status(&self, status: Option<&str>) {
            self.0.lock().unwrap().push(status.map(str::to_string));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn message_clears_after_timeout() {
        let recorder = Shared::new(Recorder::default());
        let status = StatusLine::new(recorder.clone(), Duration::from_secs(3));

        status.notify("Failed to refresh access token");
        assert_eq!(status.current().as_deref(), Some("Failed to refresh access token"));

        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert!(status.current().is_some());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(status.current(), None);
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![Some("Failed to refresh access token".to_string()), None]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn newer_message_is_not_cleared_by_older_timer() {
        let recorder = Shared::new(Recorder::default());
        let status = StatusLine::new(recorder.clone(), Duration::from_secs(3));

        status.notify("first");
        tokio::time::sleep(Duration::from_secs(2)).await;
        status.notify("second");

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(status.current().as_deref(), Some("second"));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(status.current(), None);
    }
}
