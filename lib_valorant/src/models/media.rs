//! Media asset URLs served from `media.valorant-api.com`.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::ValorantError;

/// Host that serves every icon and portrait.
pub const MEDIA_HOST: &str = "media.valorant-api.com";

/// A parsed media URL such as
/// `https://media.valorant-api.com/agents/<uuid>/displayicon.png`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Icon {
    url: String,
    kind: String,
    uuid: String,
    filename: String,
    format: String,
}

impl Icon {
    /// Parses a media URL.
    ///
    /// # Errors
    /// [`ValorantError::Decode`] when the URL is not on the media host or
    /// lacks an owning UUID or a `<name>.<ext>` file.
    pub fn from_url(raw: &str) -> Result<Self, ValorantError> {
        let invalid = |why: &str| ValorantError::Decode {
            kind: "icon",
            source: serde::de::Error::custom(format!("invalid media url '{}': {}", raw, why)),
        };

        let url = Url::parse(raw).map_err(|_| invalid("not an absolute url"))?;
        if url.host_str() != Some(MEDIA_HOST) {
            return Err(invalid("unexpected host"));
        }
        let segments: Vec<&str> = url.path_segments().map(|s| s.collect()).unwrap_or_default();

        let uuid_at = segments
            .iter()
            .position(|s| looks_like_uuid(s))
            .ok_or_else(|| invalid("no uuid segment"))?;
        if uuid_at == 0 {
            return Err(invalid("no asset kind before the uuid"));
        }
        let file = segments.last().filter(|_| segments.len() > uuid_at + 1).ok_or_else(|| invalid("no file name"))?;
        let (filename, format) = file.rsplit_once('.').ok_or_else(|| invalid("no file extension"))?;

        Ok(Self {
            url: raw.to_string(),
            kind: segments[..uuid_at].join("/"),
            uuid: segments[uuid_at].to_string(),
            filename: filename.to_string(),
            format: format.to_string(),
        })
    }

    /// The complete URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Asset family, e.g. `agents` or `buddylevels`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// UUID of the entity that owns the asset.
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// File stem, e.g. `displayicon`.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// File extension, e.g. `png`.
    pub fn format(&self) -> &str {
        &self.format
    }
}

fn looks_like_uuid(s: &str) -> bool {
    let groups: Vec<&str> = s.split('-').collect();
    let lengths = [8, 4, 4, 4, 12];
    groups.len() == lengths.len()
        && groups
            .iter()
            .zip(lengths)
            .all(|(g, len)| g.len() == len && g.chars().all(|c| c.is_ascii_hexdigit()))
}

impl fmt::Display for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

impl TryFrom<String> for Icon {
    type Error = ValorantError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Icon::from_url(&value)
    }
}

impl From<Icon> for String {
    fn from(icon: Icon) -> Self {
        icon.url
    }
}
