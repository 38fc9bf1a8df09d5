//! Read-only protection queries.
//!
//! The host's event layer calls these on every block edit, interaction,
//! and damage event, so they allocate nothing and never mutate.
//! Wilderness (unclaimed regions) is always unprotected.

use crate::kingdom::Kingdom;
use crate::rank::{Permission, Rank};
use crate::registry::TerritoryRegistry;
use crate::state::Region;
use crate::war::WarEngine;

/// The rank a player holds from the point of view of the kingdom owning
/// a region: their real rank if a member, `Ally` if their own kingdom is
/// allied, `Outsider` otherwise.
pub fn effective_rank(registry: &TerritoryRegistry, kingdom: &Kingdom, player: &str) -> Rank {
    if kingdom.is_member(player) {
        return kingdom.rank_of(player);
    }
    match registry.kingdom_of_player(player) {
        Some(own) if kingdom.is_ally(&own.name) => Rank::Ally,
        _ => Rank::Outsider,
    }
}

/// Whether `player` may place or break blocks in `region`.
///
/// A personal claim overrides rank: inside one, only the claim holder
/// and the kingdom owner may build, regardless of rank.
pub fn can_build(registry: &TerritoryRegistry, player: &str, region: Region) -> bool {
    let Some(kingdom) = registry.owner_of(region) else {
        return true;
    };
    if kingdom.personal_claims.contains_key(&region) {
        return kingdom.has_personal_claim_access(player, region);
    }
    effective_rank(registry, kingdom, player).allows(Permission::Build)
}

/// Whether `player` may use a switch, container, or door in `region`.
/// `permission` must be one of the three interaction permissions.
pub fn can_interact(
    registry: &TerritoryRegistry,
    player: &str,
    region: Region,
    permission: Permission,
) -> bool {
    let Some(kingdom) = registry.owner_of(region) else {
        return true;
    };
    if kingdom.personal_claims.contains_key(&region)
        && kingdom.has_personal_claim_access(player, region)
    {
        return true;
    }
    if kingdom.settings.public_access {
        return true;
    }
    effective_rank(registry, kingdom, player).allows(permission)
}

/// Whether `attacker` may damage `victim` at `region`.
///
/// Same-kingdom damage is the kingdom's friendly-fire toggle; an active
/// war between the two kingdoms overrides the territorial pvp toggle.
pub fn pvp_allowed(
    registry: &TerritoryRegistry,
    wars: &WarEngine,
    attacker: &str,
    victim: &str,
    region: Region,
) -> bool {
    let attacker_kingdom = registry.kingdom_of_player(attacker);
    let victim_kingdom = registry.kingdom_of_player(victim);

    if let (Some(a), Some(v)) = (&attacker_kingdom, &victim_kingdom) {
        if a.name == v.name {
            return a.settings.friendly_fire;
        }
        if wars.active_war_between(&a.name, &v.name).is_some() {
            return true;
        }
    }
    match registry.owner_of(region) {
        Some(kingdom) => kingdom.settings.pvp,
        None => true,
    }
}

pub fn mob_spawning_allowed(registry: &TerritoryRegistry, region: Region) -> bool {
    registry.owner_of(region).map_or(true, |k| k.settings.mob_spawning)
}

pub fn animal_spawning_allowed(registry: &TerritoryRegistry, region: Region) -> bool {
    registry.owner_of(region).map_or(true, |k| k.settings.animal_spawning)
}

pub fn fire_spread_allowed(registry: &TerritoryRegistry, region: Region) -> bool {
    registry.owner_of(region).map_or(true, |k| k.settings.fire_spread)
}

pub fn explosion_allowed(registry: &TerritoryRegistry, region: Region) -> bool {
    registry.owner_of(region).map_or(true, |k| k.settings.tnt_explosion)
}

pub fn mob_griefing_allowed(registry: &TerritoryRegistry, region: Region) -> bool {
    registry.owner_of(region).map_or(true, |k| k.settings.mob_griefing)
}
