//! # Entity Models
//!
//! Typed views over API payloads. Entities with a natural key implement
//! [`Identified`]; their equality and hashing are defined by that key alone,
//! so two snapshots of the same remote entity compare equal whatever their
//! field contents.

use std::hash::{Hash, Hasher};

/// Agents and their nested role, ability and voice-line data.
pub mod agent;
/// Riot accounts.
pub mod account;
/// Gun buddies and their levels.
pub mod buddy;
/// Ceremonies.
pub mod ceremony;
/// API locales.
pub mod language;
/// Media asset URLs.
pub mod media;

pub use account::Account;
pub use agent::{Agent, AgentAbility, AgentMedia, AgentRole, AgentVoiceLine};
pub use buddy::{Buddy, BuddyLevel};
pub use ceremony::Ceremony;
pub use language::Language;
pub use media::Icon;

/// An entity uniquely identified by a stable natural key.
pub trait Identified: Send + Sync + 'static {
    /// Entity kind, used in logs and errors.
    const KIND: &'static str;
    /// Name of the payload field holding the key.
    const KEY_FIELD: &'static str;

    /// The natural key.
    fn id(&self) -> &str;
}

/// Implements [`Identified`] plus key-only `PartialEq`, `Eq` and `Hash`.
macro_rules! identified {
    ($ty:ty, $kind:literal, $field:ident) => {
        impl $crate::models::Identified for $ty {
            const KIND: &'static str = $kind;
            const KEY_FIELD: &'static str = stringify!($field);

            fn id(&self) -> &str {
                &self.$field
            }
        }

        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                $crate::models::Identified::id(self) == $crate::models::Identified::id(other)
            }
        }

        impl Eq for $ty {}

        impl std::hash::Hash for $ty {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                $crate::models::hash_key(self, state)
            }
        }
    };
}
pub(crate) use identified;

pub(crate) fn hash_key<T: Identified, H: Hasher>(entity: &T, state: &mut H) {
    entity.id().hash(state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn equality_and_hash_ignore_field_contents() {
        let old: Ceremony = serde_json::from_value(json!({
            "uuid": "1e71c55c-476e-24ac-0687-e48b07ef2c9c",
            "displayName": "ACE",
            "assetPath": "ShooterGame/Content/Ceremonies/Ace"
        }))
        .unwrap();
        let renamed: Ceremony = serde_json::from_value(json!({
            "uuid": "1e71c55c-476e-24ac-0687-e48b07ef2c9c",
            "displayName": "ACE!",
            "assetPath": "elsewhere"
        }))
        .unwrap();

        assert_eq!(old, renamed);
        let set: HashSet<Ceremony> = [old, renamed].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn key_field_names_match_the_payload() {
        assert_eq!(Agent::KEY_FIELD, "uuid");
        assert_eq!(Account::KEY_FIELD, "puuid");
        assert_eq!(BuddyLevel::KIND, "buddy level");
    }
}
