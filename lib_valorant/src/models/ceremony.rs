use serde::{Deserialize, Serialize};

use super::identified;

/// A round-end ceremony such as ACE or CLUTCH.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ceremony {
    pub uuid: String,
    pub display_name: String,
    pub asset_path: String,
}

identified!(Ceremony, "ceremony", uuid);
