use serde::{Deserialize, Serialize};

use super::identified;

/// A Riot account, as returned by `riot/account/v1/accounts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub puuid: String,
    /// Absent when the account has never set a Riot ID.
    #[serde(default)]
    pub game_name: Option<String>,
    #[serde(default)]
    pub tag_line: Option<String>,
}

identified!(Account, "account", puuid);

impl Account {
    /// `gameName#tagLine`, when both parts are known.
    pub fn riot_id(&self) -> Option<String> {
        match (&self.game_name, &self.tag_line) {
            (Some(name), Some(tag)) => Some(format!("{}#{}", name, tag)),
            _ => None,
        }
    }
}
