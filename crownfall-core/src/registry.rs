//! Global territory registry: the single source of truth for claim
//! exclusivity, kingdom lookup, and the invitation/deletion queues.
//!
//! One instance is constructed at startup and passed by reference; there
//! is no process-global state, so tests (and multiple worlds) stay
//! isolated.

use std::collections::HashMap;

use rustc_hash::FxHashMap;

use crate::defines;
use crate::error::ActionError;
use crate::kingdom::Kingdom;
use crate::ledger::{charge_exact, CurrencyLedger};
use crate::notify::Notifier;
use crate::rank::{Permission, Rank};
use crate::state::{
    KingdomName, PendingDeletion, PendingInvite, PlayerId, Region, UnixMillis,
};

#[derive(Debug, Default)]
pub struct TerritoryRegistry {
    pub kingdoms: HashMap<KingdomName, Kingdom>,
    /// Region -> owning kingdom. Hot path for protection queries.
    pub claimed: FxHashMap<Region, KingdomName>,
    /// Keyed by the invited player.
    pub invites: HashMap<PlayerId, PendingInvite>,
    /// Keyed by the owner who requested deletion.
    pub deletions: HashMap<PlayerId, PendingDeletion>,
}

impl TerritoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    pub fn is_claimed(&self, region: Region) -> bool {
        self.claimed.contains_key(&region)
    }

    pub fn owner_name_of(&self, region: Region) -> Option<&KingdomName> {
        self.claimed.get(&region)
    }

    pub fn owner_of(&self, region: Region) -> Option<&Kingdom> {
        self.claimed.get(&region).and_then(|n| self.kingdoms.get(n))
    }

    pub fn kingdom(&self, name: &str) -> Result<&Kingdom, ActionError> {
        self.kingdoms
            .get(name)
            .ok_or_else(|| ActionError::NoSuchKingdom(name.to_string()))
    }

    pub fn kingdom_mut(&mut self, name: &str) -> Result<&mut Kingdom, ActionError> {
        self.kingdoms
            .get_mut(name)
            .ok_or_else(|| ActionError::NoSuchKingdom(name.to_string()))
    }

    pub fn kingdom_of_player(&self, player: &str) -> Option<&Kingdom> {
        self.kingdoms.values().find(|k| k.is_member(player))
    }

    pub fn kingdom_name_of_player(&self, player: &str) -> Option<KingdomName> {
        self.kingdom_of_player(player).map(|k| k.name.clone())
    }

    // ========================================================================
    // Kingdom lifecycle
    // ========================================================================

    /// Founds a kingdom at the founder's current region. The founding
    /// claim is free and becomes home; the creation fee is charged from
    /// the founder's own balance before any state changes.
    pub fn create_kingdom(
        &mut self,
        founder: &str,
        name: &str,
        at: Region,
        cost: i64,
        ledger: &mut dyn CurrencyLedger,
        now: UnixMillis,
    ) -> Result<(), ActionError> {
        if let Some(existing) = self.kingdom_of_player(founder) {
            return Err(ActionError::AlreadyInKingdom(existing.name.clone()));
        }
        if self.kingdoms.contains_key(name) {
            return Err(ActionError::DuplicateName(name.to_string()));
        }
        if self.is_claimed(at) {
            return Err(ActionError::AlreadyClaimed(at));
        }
        charge_exact(ledger, founder, cost)?;

        let kingdom = Kingdom::new(name.to_string(), founder.to_string(), at, now);
        self.claimed.insert(at, name.to_string());
        self.kingdoms.insert(name.to_string(), kingdom);
        log::info!("Kingdom {} founded by {} at {}", name, founder, at);
        Ok(())
    }

    /// First phase of deletion: a 30-second confirmation window for the
    /// owner. Nothing is deleted yet.
    pub fn request_delete(&mut self, player: &str, now: UnixMillis) -> Result<(), ActionError> {
        let kingdom = self
            .kingdom_of_player(player)
            .ok_or_else(|| ActionError::NotAMember(player.to_string()))?;
        if !kingdom.is_owner(player) {
            return Err(ActionError::OwnerOnly);
        }
        self.deletions.insert(
            player.to_string(),
            PendingDeletion {
                kingdom: kingdom.name.clone(),
                expires_at: now + defines::DELETION_TTL_MS,
            },
        );
        Ok(())
    }

    /// Second phase: irreversible removal. Returns the deleted kingdom's
    /// name so the caller can purge dependent state (wars).
    pub fn confirm_delete(
        &mut self,
        player: &str,
        notifier: &mut dyn Notifier,
        now: UnixMillis,
    ) -> Result<KingdomName, ActionError> {
        let pending = self
            .deletions
            .get(player)
            .ok_or(ActionError::NoPendingDeletion)?
            .clone();
        if pending.is_expired(now) {
            self.deletions.remove(player);
            return Err(ActionError::DeletionExpired);
        }
        let kingdom = self.kingdom(&pending.kingdom)?;
        if !kingdom.is_owner(player) {
            return Err(ActionError::OwnerOnly);
        }
        self.deletions.remove(player);
        self.dissolve_kingdom(&pending.kingdom, notifier);
        Ok(pending.kingdom)
    }

    /// Frees all claims, detaches all members, and removes the kingdom.
    /// Used by confirmed deletion, upkeep dissolution, and conquest.
    pub fn dissolve_kingdom(&mut self, name: &str, notifier: &mut dyn Notifier) {
        let Some(kingdom) = self.kingdoms.remove(name) else {
            return;
        };
        for region in &kingdom.claims {
            self.claimed.remove(region);
        }
        self.invites.retain(|_, invite| invite.kingdom != name);
        self.deletions.retain(|_, pending| pending.kingdom != name);
        log::info!(
            "Kingdom {} dissolved ({} claims freed, {} members detached)",
            name,
            kingdom.claims.len(),
            kingdom.members.len()
        );
        notifier.broadcast(&format!("The kingdom of {} is no more.", name));
    }

    // ========================================================================
    // Claiming
    // ========================================================================

    /// Claims `region` for `kingdom_name` on behalf of `claimant`.
    ///
    /// Validation order: membership, permission, global exclusivity,
    /// claim cap, adjacency; only then is the fee charged (first claim
    /// free, flat fee after) and the region registered.
    pub fn claim(
        &mut self,
        kingdom_name: &str,
        claimant: &str,
        region: Region,
        ledger: &mut dyn CurrencyLedger,
    ) -> Result<(), ActionError> {
        let kingdom = self.kingdom(kingdom_name)?;
        if !kingdom.is_member(claimant) {
            return Err(ActionError::NotAMember(claimant.to_string()));
        }
        if !kingdom.has_permission(claimant, Permission::Claim) {
            return Err(ActionError::PermissionDenied(Permission::Claim.name()));
        }
        if self.is_claimed(region) {
            return Err(ActionError::AlreadyClaimed(region));
        }
        if kingdom.claim_count() >= defines::MAX_CLAIMS {
            return Err(ActionError::LimitExceeded(defines::MAX_CLAIMS));
        }
        let first_claim = kingdom.claims.is_empty();
        if !first_claim && !kingdom.is_adjacent_to_territory(region) {
            return Err(ActionError::NotAdjacent(region));
        }

        let cost = if first_claim { 0 } else { defines::CLAIM_COST };
        charge_exact(ledger, claimant, cost)?;

        self.claimed.insert(region, kingdom_name.to_string());
        let kingdom = self.kingdom_mut(kingdom_name)?;
        kingdom.add_claim(region);
        log::info!(
            "{} claimed {} for {} (cost {})",
            claimant,
            region,
            kingdom_name,
            cost
        );
        Ok(())
    }

    /// Permissioned voluntary unclaim. The home region is never
    /// unclaimable; wars and upkeep shrinkage use
    /// [`admin_remove_claim`](Self::admin_remove_claim) instead.
    pub fn unclaim(
        &mut self,
        kingdom_name: &str,
        actor: &str,
        region: Region,
    ) -> Result<(), ActionError> {
        let kingdom = self.kingdom(kingdom_name)?;
        if !kingdom.has_permission(actor, Permission::Unclaim) {
            return Err(ActionError::PermissionDenied(Permission::Unclaim.name()));
        }
        if !kingdom.owns_region(region) {
            return Err(ActionError::RegionNotOwned(region));
        }
        if kingdom.home == region {
            return Err(ActionError::HomeRegion(region));
        }
        self.kingdom_mut(kingdom_name)?.remove_claim(region);
        self.claimed.remove(&region);
        Ok(())
    }

    /// Unconditional removal used by war capture and upkeep shrinkage.
    /// Returns the previous owner, if any.
    pub fn admin_remove_claim(&mut self, region: Region) -> Option<KingdomName> {
        let owner = self.claimed.remove(&region)?;
        if let Some(kingdom) = self.kingdoms.get_mut(&owner) {
            kingdom.remove_claim(region);
        }
        Some(owner)
    }

    /// Registers a region for a kingdom bypassing fees and adjacency.
    /// Used by conquest transfer. Fails on a globally claimed region.
    pub fn admin_add_claim(&mut self, kingdom_name: &str, region: Region) -> Result<(), ActionError> {
        if self.is_claimed(region) {
            return Err(ActionError::AlreadyClaimed(region));
        }
        self.kingdom_mut(kingdom_name)?.add_claim(region);
        self.claimed.insert(region, kingdom_name.to_string());
        Ok(())
    }

    // ========================================================================
    // Membership flow
    // ========================================================================

    /// Invites `target` to the actor's kingdom; 5-minute expiry. A newer
    /// invite replaces any older one for the same player.
    pub fn invite(
        &mut self,
        actor: &str,
        target: &str,
        now: UnixMillis,
    ) -> Result<KingdomName, ActionError> {
        let kingdom = self
            .kingdom_of_player(actor)
            .ok_or_else(|| ActionError::NotAMember(actor.to_string()))?;
        if !kingdom.has_permission(actor, Permission::Invite) {
            return Err(ActionError::PermissionDenied(Permission::Invite.name()));
        }
        if kingdom.is_member(target) {
            return Err(ActionError::AlreadyMember(target.to_string()));
        }
        let name = kingdom.name.clone();
        self.invites.insert(
            target.to_string(),
            PendingInvite {
                kingdom: name.clone(),
                invited_by: actor.to_string(),
                expires_at: now + defines::INVITE_TTL_MS,
            },
        );
        Ok(name)
    }

    /// Consumes an unexpired invite and joins at Member rank.
    pub fn accept_invite(
        &mut self,
        player: &str,
        now: UnixMillis,
    ) -> Result<KingdomName, ActionError> {
        let invite = self
            .invites
            .get(player)
            .ok_or(ActionError::NoPendingInvite)?
            .clone();
        if invite.is_expired(now) {
            self.invites.remove(player);
            return Err(ActionError::InviteExpired);
        }
        if let Some(existing) = self.kingdom_of_player(player) {
            return Err(ActionError::AlreadyInKingdom(existing.name.clone()));
        }
        // The kingdom may have dissolved while the invite was pending
        if !self.kingdoms.contains_key(&invite.kingdom) {
            self.invites.remove(player);
            return Err(ActionError::NoSuchKingdom(invite.kingdom));
        }
        self.invites.remove(player);
        self.kingdom_mut(&invite.kingdom)?
            .add_member(player.to_string(), Rank::Member)?;
        Ok(invite.kingdom)
    }

    /// Discards a pending invite with no other side effects.
    pub fn decline_invite(&mut self, player: &str) -> Result<KingdomName, ActionError> {
        self.invites
            .remove(player)
            .map(|invite| invite.kingdom)
            .ok_or(ActionError::NoPendingInvite)
    }

    /// Any member but the owner may leave.
    pub fn leave(&mut self, player: &str) -> Result<KingdomName, ActionError> {
        let kingdom = self
            .kingdom_of_player(player)
            .ok_or_else(|| ActionError::NotAMember(player.to_string()))?;
        if kingdom.is_owner(player) {
            return Err(ActionError::OwnerCannotLeave);
        }
        let name = kingdom.name.clone();
        self.kingdom_mut(&name)?.remove_member(player);
        Ok(name)
    }

    /// Removes a strictly lower-ranked member from the actor's kingdom.
    pub fn kick(&mut self, actor: &str, target: &str) -> Result<KingdomName, ActionError> {
        let kingdom = self
            .kingdom_of_player(actor)
            .ok_or_else(|| ActionError::NotAMember(actor.to_string()))?;
        if !kingdom.has_permission(actor, Permission::Kick) {
            return Err(ActionError::PermissionDenied(Permission::Kick.name()));
        }
        if !kingdom.is_member(target) {
            return Err(ActionError::NotAMember(target.to_string()));
        }
        if kingdom.rank_of(target).power() >= kingdom.rank_of(actor).power() {
            return Err(ActionError::RankTooHigh);
        }
        let name = kingdom.name.clone();
        self.kingdom_mut(&name)?.remove_member(target);
        Ok(name)
    }

    // ========================================================================
    // Cleanup sweep
    // ========================================================================

    /// Drops expired invites, expired deletion confirmations, and expired
    /// personal claims. Invoked by the host's periodic maintenance tick.
    pub fn cleanup_expired(&mut self, now: UnixMillis) {
        let before = self.invites.len() + self.deletions.len();
        self.invites.retain(|_, invite| !invite.is_expired(now));
        self.deletions.retain(|_, pending| !pending.is_expired(now));
        let dropped = before - (self.invites.len() + self.deletions.len());
        if dropped > 0 {
            log::debug!("Cleanup dropped {} expired invites/deletions", dropped);
        }
        for kingdom in self.kingdoms.values_mut() {
            kingdom.cleanup_expired_personal_claims(now);
        }
    }
}
