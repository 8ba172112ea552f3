use serde::Deserialize;

use super::{deserialize_null_vec, Image};

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Device {
    /// A human-readable name for the device. Some devices have a name that the user can configure (e.g. "Loudest speaker") and some devices have a generic name associated with the manufacturer or device model.
    pub name: String,
    /// Device type, such as "Computer", "Smartphone" or "Speaker", exactly as sent
    #[serde(rename = "type")]
    pub device_type: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SimplifiedArtist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SimplifiedAlbum {
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_null_vec")]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Track {
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_null_vec")]
    pub artists: Vec<SimplifiedArtist>,
    pub album: SimplifiedAlbum,
    pub duration_ms: u64,
}

/// Snapshot of what is currently playing
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Playback {
    pub item: Track,
    #[serde(default)]
    pub progress_ms: u64,
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub device: Option<Device>,
}

/// Outcome of asking for the currently playing track
#[derive(Debug, Clone, PartialEq)]
pub enum CurrentlyPlaying {
    Track(Playback),
    /// `204`, nothing is playing
    Nothing,
    /// `200` whose body is not a playing track, e.g. no `item` or an ad/episode shape
    Malformed(String),
    /// `401`, the access token was rejected
    Unauthorized,
}

impl CurrentlyPlaying {
    /// Interpret the body of a `200` response.
    pub fn from_body(body: &str) -> Self {
        let value: serde_json::Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(err) => return Self::Malformed(err.to_string()),
        };

        match value.get("item") {
            None | Some(serde_json::Value::Null) => {
                return Self::Malformed("missing `item` field".to_string())
            }
            _ => {}
        }

        match serde_path_to_error::deserialize::<_, Playback>(value) {
            Ok(playback) => Self::Track(playback),
            Err(err) => Self::Malformed(err.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_playing_track() {
        let result = CurrentlyPlaying::from_body(
            r#"{
                "item": {
                    "name": "Song A",
                    "artists": [{"name": "Artist1"}, {"name": "Artist2"}],
                    "album": {"name": "Album1", "images": [{"url": "u"}]},
                    "duration_ms": 200000
                },
                "progress_ms": 50000,
                "device": {"name": "Phone", "type": "Smartphone"}
            }"#,
        );

        let CurrentlyPlaying::Track(playback) = result else {
            panic!("expected a track, got {result:?}");
        };
        assert_eq!(playback.item.name, "Song A");
        assert_eq!(playback.item.artists.len(), 2);
        assert_eq!(playback.progress_ms, 50000);
        let device = playback.device.unwrap();
        assert_eq!(device.device_type, "Smartphone");
    }

    #[test]
    fn missing_item_is_malformed() {
        assert!(matches!(
            CurrentlyPlaying::from_body(r#"{"progress_ms": 10, "item": null}"#),
            CurrentlyPlaying::Malformed(_)
        ));
        assert!(matches!(
            CurrentlyPlaying::from_body(r#"{"progress_ms": 10}"#),
            CurrentlyPlaying::Malformed(_)
        ));
        assert!(matches!(CurrentlyPlaying::from_body(""), CurrentlyPlaying::Malformed(_)));
    }

    #[test]
    fn device_type_is_kept_as_sent() {
        let device: Device = serde_json::from_str(r#"{"name":"Car","type":"Automobile"}"#).unwrap();
        assert_eq!(device.device_type, "Automobile");

        let device: Device = serde_json::from_str(r#"{"name":"Laptop","type":"computer"}"#).unwrap();
        assert_eq!(device.device_type, "computer");
    }
}
