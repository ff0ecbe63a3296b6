use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::identified;
use super::media::Icon;

/// One upgrade level of a gun buddy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuddyLevel {
    pub uuid: String,
    pub charm_level: u32,
    pub display_name: String,
    pub display_icon: Icon,
    pub asset_path: String,
}

identified!(BuddyLevel, "buddy level", uuid);

/// A gun buddy. Its levels are shared with the buddy-level cache, so a level
/// reached through a buddy is the same allocation as one fetched directly.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Buddy {
    pub uuid: String,
    pub display_name: String,
    pub is_hidden_if_not_owned: bool,
    pub theme_uuid: Option<String>,
    pub display_icon: Icon,
    pub asset_path: String,
    pub levels: Vec<Arc<BuddyLevel>>,
}

identified!(Buddy, "buddy", uuid);

/// Wire form of [`Buddy`] before its levels are resolved.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BuddyPayload {
    uuid: String,
    display_name: String,
    #[serde(default)]
    is_hidden_if_not_owned: bool,
    #[serde(default)]
    theme_uuid: Option<String>,
    display_icon: Icon,
    asset_path: String,
    #[serde(default)]
    levels: Vec<BuddyLevel>,
}

impl BuddyPayload {
    /// Builds the buddy, swapping each decoded level for whatever `resolve`
    /// hands back.
    pub(crate) fn into_buddy<F>(self, mut resolve: F) -> Buddy
    where
        F: FnMut(BuddyLevel) -> Arc<BuddyLevel>,
    {
        Buddy {
            uuid: self.uuid,
            display_name: self.display_name,
            is_hidden_if_not_owned: self.is_hidden_if_not_owned,
            theme_uuid: self.theme_uuid,
            display_icon: self.display_icon,
            asset_path: self.asset_path,
            levels: self.levels.into_iter().map(&mut resolve).collect(),
        }
    }
}

impl Buddy {
    /// The level with the given charm level, if the buddy has one.
    pub fn level(&self, charm_level: u32) -> Option<&Arc<BuddyLevel>> {
        self.levels.iter().find(|l| l.charm_level == charm_level)
    }
}
