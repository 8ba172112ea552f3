mod player;
mod user;

pub use player::*;
pub use user::*;

use serde::{Deserialize, Deserializer};

fn deserialize_optional_usize<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<usize>::deserialize(deserializer)?.unwrap_or_default())
}

/// `null` and missing lists both become empty
pub(crate) fn deserialize_null_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// External URLs
///
/// Usually just the Spotify URL
#[derive(Default, Debug, Clone, Deserialize, PartialEq)]
pub struct ExternalUrls {
    /// The Spotify URL for the object.
    #[serde(default)]
    pub spotify: Option<String>,
}

/// Spofiy Image
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Image {
    /// The source URL of the image
    pub url: String,
    /// The image height in pixels.
    #[serde(default, deserialize_with = "deserialize_optional_usize")]
    pub height: usize,
    /// The image width in pixels.
    #[serde(default, deserialize_with = "deserialize_optional_usize")]
    pub width: usize,
}
