use std::io::Write;

use scotify_api::{Playback, Profile};

/// Display ready fields of the playing track
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub track: String,
    /// Artist names joined with `, `
    pub artists: String,
    pub album: String,
    pub album_image: Option<String>,
    /// Always within `0..=100`
    pub progress_percent: f64,
    /// `elapsed / total` as `m:ss / m:ss`
    pub time: String,
    /// `Playing on {name} ({type})` when spotify reports a device
    pub device: Option<String>,
    pub is_playing: bool,
}

impl From<&Playback> for NowPlaying {
    fn from(playback: &Playback) -> Self {
        let item = &playback.item;
        Self {
            track: item.name.clone(),
            artists: item
                .artists
                .iter()
                .map(|artist| artist.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            album: item.album.name.clone(),
            album_image: item.album.images.first().map(|image| image.url.clone()),
            progress_percent: progress_percent(playback.progress_ms, item.duration_ms),
            time: format!(
                "{} / {}",
                format_duration(playback.progress_ms),
                format_duration(item.duration_ms)
            ),
            device: playback
                .device
                .as_ref()
                .map(|device| format!("Playing on {} ({})", device.name, device.device_type)),
            is_playing: playback.is_playing,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackView {
    Track(NowPlaying),
    /// Nothing is playing or the playback could not be read
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileView {
    pub name: String,
    pub avatar: Option<String>,
}

impl From<&Profile> for ProfileView {
    fn from(profile: &Profile) -> Self {
        Self {
            name: profile.name().to_string(),
            avatar: profile.avatar().map(str::to_string),
        }
    }
}

/// Where profile, playback and status updates end up
pub trait Renderer: Send + Sync {
    /// `None` clears the profile after a logout
    fn render_profile(&self, profile: Option<&ProfileView>);
    fn render_playback(&self, playback: &PlaybackView);
    /// `None` clears the transient status message
    fn render_status(&self, status: Option<&str>);
}

/// Percentage of the track that has been played, clamped to `0..=100`
pub fn progress_percent(progress_ms: u64, duration_ms: u64) -> f64 {
    if duration_ms == 0 {
        return 0.0;
    }
    (progress_ms as f64 / duration_ms as f64 * 100.0).clamp(0.0, 100.0)
}

/// `m:ss` with minutes unbounded
pub fn format_duration(ms: u64) -> String {
    let seconds = ms / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Plain line based output for a terminal
#[derive(Debug, Default)]
pub struct TerminalRenderer;

impl TerminalRenderer {
    const BAR_WIDTH: usize = 30;

    fn bar(percent: f64) -> String {
        let filled = ((percent / 100.0) * Self::BAR_WIDTH as f64).round() as usize;
        format!(
            "[{}{}]",
            "#".repeat(filled),
            "-".repeat(Self::BAR_WIDTH.saturating_sub(filled))
        )
    }

    fn print(lines: &[String]) {
        let mut stdout = std::io::stdout().lock();
        for line in lines {
            let _ = writeln!(stdout, "{line}");
        }
        let _ = stdout.flush();
    }
}

impl Renderer for TerminalRenderer {
    fn render_profile(&self, profile: Option<&ProfileView>) {
        match profile {
            Some(profile) => {
                let mut lines = vec![format!("Logged in as {}", profile.name)];
                if let Some(avatar) = &profile.avatar {
                    lines.push(format!("  avatar: {avatar}"));
                }
                Self::print(&lines);
            }
            None => Self::print(&["Logged out".to_string()]),
        }
    }

    fn render_playback(&self, playback: &PlaybackView) {
        match playback {
            PlaybackView::Empty => Self::print(&["No track currently playing".to_string()]),
            PlaybackView::Track(now) => {
                let mut lines = vec![
                    format!("{} - {}", now.track, now.artists),
                    format!("  {}", now.album),
                    format!("  {} {}", Self::bar(now.progress_percent), now.time),
                ];
                if let Some(device) = &now.device {
                    lines.push(format!("  {device}"));
                }
                if let Some(image) = &now.album_image {
                    lines.push(format!("  cover: {image}"));
                }
                Self::print(&lines);
            }
        }
    }

    fn render_status(&self, status: Option<&str>) {
        if let Some(status) = status {
            Self::print(&[format!("! {status}")]);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn playback(progress_ms: u64, duration_ms: u64) -> Playback {
        serde_json::from_value(serde_json::json!({
            "item": {
                "name": "Song A",
                "artists": [{"name": "Artist1"}, {"name": "Artist2"}],
                "album": {"name": "Album1", "images": [{"url": "u"}]},
                "duration_ms": duration_ms
            },
            "progress_ms": progress_ms,
            "device": {"name": "Phone", "type": "Smartphone"}
        }))
        .unwrap()
    }

    #[test]
    fn derives_display_fields() {
        let now = NowPlaying::from(&playback(50_000, 200_000));
        assert_eq!(now.track, "Song A");
        assert_eq!(now.artists, "Artist1, Artist2");
        assert_eq!(now.album, "Album1");
        assert_eq!(now.album_image.as_deref(), Some("u"));
        assert_eq!(now.progress_percent, 25.0);
        assert_eq!(now.time, "0:50 / 3:20");
        assert_eq!(now.device.as_deref(), Some("Playing on Phone (Smartphone)"));
    }

    #[test]
    fn device_type_is_shown_as_sent() {
        let mut playback = playback(0, 1000);
        playback.device.as_mut().unwrap().device_type = "computer".to_string();
        assert_eq!(
            NowPlaying::from(&playback).device.as_deref(),
            Some("Playing on Phone (computer)")
        );
    }

    #[test]
    fn progress_is_clamped() {
        assert_eq!(progress_percent(300_000, 200_000), 100.0);
        assert_eq!(progress_percent(0, 200_000), 0.0);
        assert_eq!(progress_percent(10, 0), 0.0);
        assert_eq!(NowPlaying::from(&playback(250_000, 200_000)).progress_percent, 100.0);
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(9_999), "0:09");
        assert_eq!(format_duration(61_000), "1:01");
        assert_eq!(format_duration(3_723_000), "62:03");
    }

    #[test]
    fn progress_bar_width_is_stable() {
        assert_eq!(TerminalRenderer::bar(0.0).len(), TerminalRenderer::BAR_WIDTH + 2);
        assert_eq!(TerminalRenderer::bar(100.0), format!("[{}]", "#".repeat(30)));
    }
}
