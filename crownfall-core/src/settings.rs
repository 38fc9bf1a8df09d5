//! Per-kingdom rule toggles and upkeep cost parameters.

use serde::{Deserialize, Serialize};

/// Kingdom-wide rules. The booleans are enforced by the host's event
/// layer through [`crate::query`]; the upkeep numbers drive the daily
/// treasury debit.
///
/// Missing fields in older save documents fall back to these defaults
/// (additive schema evolution).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub mob_spawning: bool,
    pub fire_spread: bool,
    pub tnt_explosion: bool,
    pub pvp: bool,
    pub mob_griefing: bool,
    pub friendly_fire: bool,
    pub public_access: bool,
    pub animal_spawning: bool,

    /// Daily base upkeep cost in bronze.
    pub base_upkeep: i64,
    /// Daily upkeep cost per claimed region in bronze.
    pub claim_upkeep: i64,
    pub upkeep_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mob_spawning: true,
            fire_spread: true,
            tnt_explosion: true,
            pvp: false,
            mob_griefing: true,
            friendly_fire: false,
            public_access: false,
            animal_spawning: true,
            base_upkeep: 1000,
            claim_upkeep: 100,
            upkeep_enabled: true,
        }
    }
}

impl Settings {
    /// Toggle lookup by name, for the host's settings command.
    pub fn get(&self, key: &str) -> Option<bool> {
        match key {
            "mobSpawning" => Some(self.mob_spawning),
            "fireSpread" => Some(self.fire_spread),
            "tntExplosion" => Some(self.tnt_explosion),
            "pvp" => Some(self.pvp),
            "mobGriefing" => Some(self.mob_griefing),
            "friendlyFire" => Some(self.friendly_fire),
            "publicAccess" => Some(self.public_access),
            "animalSpawning" => Some(self.animal_spawning),
            _ => None,
        }
    }

    /// Returns false for unknown keys, true when the toggle was set.
    pub fn set(&mut self, key: &str, value: bool) -> bool {
        match key {
            "mobSpawning" => self.mob_spawning = value,
            "fireSpread" => self.fire_spread = value,
            "tntExplosion" => self.tnt_explosion = value,
            "pvp" => self.pvp = value,
            "mobGriefing" => self.mob_griefing = value,
            "friendlyFire" => self.friendly_fire = value,
            "publicAccess" => self.public_access = value,
            "animalSpawning" => self.animal_spawning = value,
            _ => return false,
        }
        true
    }

    pub const TOGGLE_KEYS: [&'static str; 8] = [
        "mobSpawning",
        "fireSpread",
        "tntExplosion",
        "pvp",
        "mobGriefing",
        "friendlyFire",
        "publicAccess",
        "animalSpawning",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert!(s.mob_spawning);
        assert!(s.fire_spread);
        assert!(s.tnt_explosion);
        assert!(!s.pvp);
        assert!(s.mob_griefing);
        assert!(!s.friendly_fire);
        assert!(!s.public_access);
        assert!(s.animal_spawning);
        assert_eq!(s.base_upkeep, 1000);
        assert_eq!(s.claim_upkeep, 100);
        assert!(s.upkeep_enabled);
    }

    #[test]
    fn test_get_set_by_key() {
        let mut s = Settings::default();
        assert_eq!(s.get("pvp"), Some(false));
        assert!(s.set("pvp", true));
        assert_eq!(s.get("pvp"), Some(true));
        assert!(!s.set("noSuchSetting", true));
        assert_eq!(s.get("noSuchSetting"), None);
    }

    #[test]
    fn test_missing_fields_default_on_load() {
        // An older document that predates the upkeep settings
        let json = r#"{"pvp": true, "fireSpread": false}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert!(s.pvp);
        assert!(!s.fire_spread);
        assert_eq!(s.base_upkeep, 1000);
        assert!(s.upkeep_enabled);
    }
}
