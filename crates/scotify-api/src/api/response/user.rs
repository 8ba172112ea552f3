use serde::Deserialize;

use super::{deserialize_null_vec, ExternalUrls, Image};

/// Profile of the current user.
///
/// Everything except the display name depends on granted scopes, so every field may be
/// missing.
#[derive(Default, Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Profile {
    pub id: String,
    pub display_name: Option<String>,
    /// Requires the `user-read-email` scope
    pub email: Option<String>,
    pub uri: String,
    pub href: String,
    pub external_urls: ExternalUrls,
    #[serde(deserialize_with = "deserialize_null_vec")]
    pub images: Vec<Image>,
}

impl Profile {
    /// Display name, falling back to the user id
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(self.id.as_str())
    }

    pub fn avatar(&self) -> Option<&str> {
        self.images.first().map(|image| image.url.as_str())
    }
}
