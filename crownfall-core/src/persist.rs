//! Versioned JSON persistence.
//!
//! The live state is not serialized directly: regions key several maps,
//! and JSON object keys must be strings. Instead the state is flattened
//! into document structs, every field defaulted so older documents keep
//! loading, and normalized back into invariant-holding state on restore.
//! Pending invites and deletion confirmations are ephemeral and are not
//! saved.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::kingdom::Kingdom;
use crate::rank::Rank;
use crate::registry::TerritoryRegistry;
use crate::settings::Settings;
use crate::state::{
    CaptureProgress, FallingState, KingdomName, PersonalClaim, PlayerId, Region, UnixMillis, War,
    WarId,
};
use crate::war::WarEngine;

pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct SaveFile {
    pub version: u32,
    #[serde(default)]
    pub kingdoms: Vec<KingdomDoc>,
    #[serde(default)]
    pub wars: Vec<War>,
    #[serde(default)]
    pub captures: Vec<CaptureDoc>,
    #[serde(default)]
    pub next_war_id: WarId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KingdomDoc {
    pub name: KingdomName,
    pub owner: PlayerId,
    pub home: Region,
    #[serde(default)]
    pub members: HashMap<PlayerId, Rank>,
    #[serde(default)]
    pub claims: Vec<Region>,
    #[serde(default)]
    pub personal_claims: Vec<PersonalClaim>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub treasury: i64,
    #[serde(default)]
    pub tax_contributions: HashMap<PlayerId, i64>,
    #[serde(default)]
    pub allies: Vec<KingdomName>,
    #[serde(default)]
    pub enemies: Vec<KingdomName>,
    #[serde(default)]
    pub falling: Option<FallingState>,
    #[serde(default)]
    pub last_upkeep_collection: UnixMillis,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CaptureDoc {
    pub war: WarId,
    pub progress: CaptureProgress,
}

impl KingdomDoc {
    fn from_kingdom(kingdom: &Kingdom) -> Self {
        Self {
            name: kingdom.name.clone(),
            owner: kingdom.owner.clone(),
            home: kingdom.home,
            members: kingdom.members.clone(),
            claims: kingdom.claims.clone(),
            personal_claims: kingdom.personal_claims.values().cloned().collect(),
            settings: kingdom.settings.clone(),
            treasury: kingdom.treasury,
            tax_contributions: kingdom.tax_contributions.clone(),
            allies: kingdom.allies.iter().cloned().collect(),
            enemies: kingdom.enemies.iter().cloned().collect(),
            falling: kingdom.falling.clone(),
            last_upkeep_collection: kingdom.last_upkeep_collection,
        }
    }

    /// Rebuilds the aggregate, repairing documents that violate its
    /// invariants rather than rejecting them.
    fn into_kingdom(self) -> Kingdom {
        let mut kingdom = Kingdom::new(self.name, self.owner.clone(), self.home, 0);
        kingdom.members = self.members;
        // The owner always holds the leader rank
        kingdom.members.insert(self.owner, Rank::Leader);

        kingdom.claims.clear();
        for region in self.claims {
            kingdom.add_claim(region);
        }

        for claim in self.personal_claims {
            if !kingdom.owns_region(claim.region) {
                log::warn!(
                    "[LOAD] dropping personal claim on unowned region {} in {}",
                    claim.region,
                    kingdom.name
                );
                continue;
            }
            if !kingdom.is_member(&claim.owner) {
                log::warn!(
                    "[LOAD] dropping personal claim of non-member {} in {}",
                    claim.owner,
                    kingdom.name
                );
                continue;
            }
            kingdom.personal_claims.insert(claim.region, claim);
        }

        kingdom.settings = self.settings;
        kingdom.treasury = self.treasury;
        kingdom.tax_contributions = self.tax_contributions;
        kingdom.allies = self.allies.into_iter().collect();
        kingdom.enemies = self.enemies.into_iter().collect();
        // The sets must stay disjoint; enemy status wins
        for enemy in kingdom.enemies.clone() {
            kingdom.allies.remove(&enemy);
        }
        kingdom.falling = self.falling;
        kingdom.last_upkeep_collection = self.last_upkeep_collection;
        kingdom
    }
}

pub fn snapshot(registry: &TerritoryRegistry, wars: &WarEngine) -> SaveFile {
    let mut kingdoms: Vec<KingdomDoc> = registry.kingdoms.values().map(KingdomDoc::from_kingdom).collect();
    kingdoms.sort_by(|a, b| a.name.cmp(&b.name));
    let mut war_list: Vec<War> = wars.wars.values().cloned().collect();
    war_list.sort_by_key(|w| w.id);
    let mut captures: Vec<CaptureDoc> = wars
        .captures
        .iter()
        .map(|(&(war, _), progress)| CaptureDoc {
            war,
            progress: progress.clone(),
        })
        .collect();
    captures.sort_by_key(|c| (c.war, c.progress.region.x, c.progress.region.z));
    SaveFile {
        version: SAVE_VERSION,
        kingdoms,
        wars: war_list,
        captures,
        next_war_id: wars.next_war_id,
    }
}

pub fn restore(save: SaveFile) -> Result<(TerritoryRegistry, WarEngine), StorageError> {
    if save.version > SAVE_VERSION {
        return Err(StorageError::UnsupportedVersion(save.version));
    }

    let mut registry = TerritoryRegistry::new();
    for doc in save.kingdoms {
        let mut kingdom = doc.into_kingdom();
        // Claim exclusivity: first loaded kingdom wins a disputed region
        kingdom.claims.retain(|&region| {
            if registry.claimed.contains_key(&region) {
                log::warn!(
                    "[LOAD] region {} claimed twice; dropping from {}",
                    region,
                    kingdom.name
                );
                false
            } else {
                registry.claimed.insert(region, kingdom.name.clone());
                true
            }
        });
        let retained: Vec<Region> = kingdom.claims.clone();
        kingdom
            .personal_claims
            .retain(|region, _| retained.contains(region));
        registry.kingdoms.insert(kingdom.name.clone(), kingdom);
    }

    let mut wars = WarEngine::new();
    let mut max_id = 0;
    for war in save.wars {
        // Wars referencing dissolved kingdoms are dead records
        if !registry.kingdoms.contains_key(&war.attacker)
            || !registry.kingdoms.contains_key(&war.defender)
        {
            log::warn!("[LOAD] dropping war {} with a missing side", war.id);
            continue;
        }
        max_id = max_id.max(war.id);
        wars.wars.insert(war.id, war);
    }
    for doc in save.captures {
        if wars.wars.contains_key(&doc.war) {
            wars.captures.insert((doc.war, doc.progress.region), doc.progress);
        }
    }
    wars.next_war_id = save.next_war_id.max(max_id + 1).max(1);

    // Regions captured in an unsettled war are in limbo and stay out of
    // the index.
    let mut limbo: Vec<Region> = Vec::new();
    for war in wars.wars.values() {
        if war.active || war.attacker_victory {
            limbo.extend(war.captured_claims.iter().copied());
        }
    }
    // A kingdom normally claims its home; documents that lost it are
    // repaired unless the home is captured or owned elsewhere.
    let names: Vec<KingdomName> = registry.kingdoms.keys().cloned().collect();
    for name in names {
        let home = registry.kingdoms[&name].home;
        if registry.kingdoms[&name].owns_region(home)
            || registry.claimed.contains_key(&home)
            || limbo.contains(&home)
        {
            continue;
        }
        log::warn!("[LOAD] re-adding missing home {} to {}", home, name);
        if let Some(kingdom) = registry.kingdoms.get_mut(&name) {
            kingdom.add_claim(home);
        }
        registry.claimed.insert(home, name.clone());
    }
    Ok((registry, wars))
}

/// Atomic save: write to a sibling temp file, then rename over the
/// target.
pub fn save_to_path(
    path: &Path,
    registry: &TerritoryRegistry,
    wars: &WarEngine,
) -> Result<(), StorageError> {
    let save = snapshot(registry, wars);
    let json = serde_json::to_string_pretty(&save)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    log::debug!("[SAVE] wrote {} kingdoms, {} wars to {}", save.kingdoms.len(), save.wars.len(), path.display());
    Ok(())
}

pub fn load_from_path(path: &Path) -> Result<(TerritoryRegistry, WarEngine), StorageError> {
    let json = fs::read_to_string(path)?;
    let save: SaveFile = serde_json::from_str(&json)?;
    restore(save)
}
