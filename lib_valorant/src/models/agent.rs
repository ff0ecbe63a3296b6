use serde::{Deserialize, Serialize};

use super::identified;
use super::media::Icon;

/// A playable (or formerly playable) character.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub uuid: String,
    pub display_name: String,
    pub description: String,
    pub developer_name: String,
    #[serde(default)]
    pub character_tags: Option<Vec<String>>,
    pub display_icon: Icon,
    #[serde(default)]
    pub display_icon_small: Option<Icon>,
    #[serde(default)]
    pub bust_portrait: Option<Icon>,
    #[serde(default)]
    pub full_portrait: Option<Icon>,
    #[serde(default)]
    pub full_portrait_v2: Option<Icon>,
    #[serde(rename = "killfeedPortrait", default)]
    pub kill_feed_portrait: Option<Icon>,
    #[serde(default)]
    pub background: Option<Icon>,
    #[serde(default)]
    pub background_gradient_colors: Vec<String>,
    pub asset_path: String,
    #[serde(default)]
    pub is_full_portrait_right_facing: bool,
    pub is_playable_character: bool,
    #[serde(default)]
    pub is_available_for_test: bool,
    #[serde(default)]
    pub is_base_content: bool,
    #[serde(default)]
    pub role: Option<AgentRole>,
    #[serde(default)]
    pub abilities: Vec<AgentAbility>,
    #[serde(default)]
    pub voice_line: Option<AgentVoiceLine>,
}

identified!(Agent, "agent", uuid);

impl Agent {
    /// The ability bound to `slot` (`Ability1`, `Grenade`, `Ultimate`, ...).
    pub fn ability(&self, slot: &str) -> Option<&AgentAbility> {
        self.abilities.iter().find(|a| a.slot.eq_ignore_ascii_case(slot))
    }
}

/// Duelist, Initiator, Controller or Sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRole {
    pub uuid: String,
    pub display_name: String,
    pub description: String,
    pub display_icon: Icon,
    pub asset_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentAbility {
    pub slot: String,
    pub display_name: String,
    pub description: String,
    /// Passives have no icon.
    #[serde(default)]
    pub display_icon: Option<Icon>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentVoiceLine {
    pub min_duration: f64,
    pub max_duration: f64,
    #[serde(default)]
    pub media_list: Vec<AgentMedia>,
}

/// One audio clip of a voice line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMedia {
    pub id: u64,
    pub wwise: String,
    pub wave: String,
}
