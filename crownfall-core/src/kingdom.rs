//! The kingdom aggregate: membership, ranks, claims, personal claims,
//! treasury, the falling sub-state-machine, and diplomacy sets.
//!
//! Global concerns (claim exclusivity, the region index, invitations)
//! live in [`crate::registry::TerritoryRegistry`]; everything here is
//! internal to a single kingdom.

use std::collections::{BTreeSet, HashMap};

use crate::defines;
use crate::error::ActionError;
use crate::ledger::{charge_exact, CurrencyLedger};
use crate::rank::{Permission, Rank};
use crate::settings::Settings;
use crate::state::{FallingCause, FallingState, KingdomName, PersonalClaim, PlayerId, Region, UnixMillis};

/// How one kingdom relates to another, from its own point of view.
/// Relations are independently stored per kingdom; there is no mirroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Own,
    Ally,
    Enemy,
    Neutral,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Kingdom {
    pub name: KingdomName,
    pub owner: PlayerId,
    pub home: Region,
    pub members: HashMap<PlayerId, Rank>,
    /// Insertion-ordered, duplicate-free. Never empty after creation.
    pub claims: Vec<Region>,
    /// Keys are always a subset of `claims`.
    pub personal_claims: HashMap<Region, PersonalClaim>,
    pub settings: Settings,
    pub treasury: i64,
    pub tax_contributions: HashMap<PlayerId, i64>,
    pub allies: BTreeSet<KingdomName>,
    pub enemies: BTreeSet<KingdomName>,
    pub falling: Option<FallingState>,
    pub last_upkeep_collection: UnixMillis,
}

impl Kingdom {
    pub fn new(name: KingdomName, owner: PlayerId, home: Region, now: UnixMillis) -> Self {
        let mut members = HashMap::new();
        members.insert(owner.clone(), Rank::Leader);
        Self {
            name,
            owner,
            home,
            members,
            claims: vec![home],
            personal_claims: HashMap::new(),
            settings: Settings::default(),
            treasury: 0,
            tax_contributions: HashMap::new(),
            allies: BTreeSet::new(),
            enemies: BTreeSet::new(),
            falling: None,
            last_upkeep_collection: now,
        }
    }

    // ========================================================================
    // Members & ranks
    // ========================================================================

    pub fn is_member(&self, player: &str) -> bool {
        self.members.contains_key(player)
    }

    pub fn is_owner(&self, player: &str) -> bool {
        self.owner == player
    }

    /// Non-members are outsiders.
    pub fn rank_of(&self, player: &str) -> Rank {
        self.members.get(player).copied().unwrap_or(Rank::Outsider)
    }

    pub fn has_permission(&self, player: &str, permission: Permission) -> bool {
        self.rank_of(player).allows(permission)
    }

    pub fn add_member(&mut self, player: PlayerId, rank: Rank) -> Result<(), ActionError> {
        if self.members.contains_key(&player) {
            return Err(ActionError::AlreadyMember(player));
        }
        self.members.insert(player, rank);
        Ok(())
    }

    /// Removes a member along with every personal claim they hold.
    pub fn remove_member(&mut self, player: &str) -> bool {
        if self.members.remove(player).is_none() {
            return false;
        }
        self.personal_claims.retain(|_, claim| claim.owner != player);
        true
    }

    /// Rank assignment with the anti-escalation rule: only the owner or
    /// an assistant may assign ranks, and never a rank above their own.
    pub fn set_rank(&mut self, actor: &str, target: &str, rank: Rank) -> Result<(), ActionError> {
        let actor_rank = self.rank_of(actor);
        if !self.is_owner(actor) && actor_rank != Rank::Assistant {
            return Err(ActionError::PermissionDenied(Permission::ManageRanks.name()));
        }
        if !self.members.contains_key(target) {
            return Err(ActionError::NotAMember(target.to_string()));
        }
        if rank.power() > actor_rank.power() {
            return Err(ActionError::RankTooHigh);
        }
        self.members.insert(target.to_string(), rank);
        Ok(())
    }

    /// Owner-only handover. The successor must already be a member.
    pub fn transfer_ownership(&mut self, actor: &str, successor: &str) -> Result<(), ActionError> {
        if !self.is_owner(actor) {
            return Err(ActionError::OwnerOnly);
        }
        if !self.members.contains_key(successor) {
            return Err(ActionError::NotAMember(successor.to_string()));
        }
        self.members.insert(actor.to_string(), Rank::Assistant);
        self.members.insert(successor.to_string(), Rank::Leader);
        self.owner = successor.to_string();
        Ok(())
    }

    // ========================================================================
    // Claims & adjacency
    // ========================================================================

    pub fn claim_count(&self) -> usize {
        self.claims.len()
    }

    pub fn owns_region(&self, region: Region) -> bool {
        self.claims.contains(&region)
    }

    /// True when `region` borders any claimed region (N/S/E/W).
    pub fn is_adjacent_to_territory(&self, region: Region) -> bool {
        self.claims.iter().any(|c| c.is_adjacent(region))
    }

    /// Unchecked insert; exclusivity and adjacency are the registry's job.
    pub fn add_claim(&mut self, region: Region) {
        if !self.claims.contains(&region) {
            self.claims.push(region);
        }
    }

    /// Drops a region and any personal claim on it. Returns false if the
    /// region was not claimed.
    pub fn remove_claim(&mut self, region: Region) -> bool {
        let Some(idx) = self.claims.iter().position(|&c| c == region) else {
            return false;
        };
        self.claims.remove(idx);
        self.personal_claims.remove(&region);
        true
    }

    /// The claim farthest from home by Manhattan distance; the earliest
    /// claimed wins ties. Home itself is never offered up.
    pub fn farthest_claim_from_home(&self) -> Option<Region> {
        let mut best: Option<(Region, u32)> = None;
        for &region in &self.claims {
            if region == self.home {
                continue;
            }
            let dist = region.manhattan_distance(self.home);
            if best.map_or(true, |(_, d)| dist > d) {
                best = Some((region, dist));
            }
        }
        best.map(|(region, _)| region)
    }

    pub fn set_home(&mut self, actor: &str, region: Region) -> Result<(), ActionError> {
        if !self.has_permission(actor, Permission::SetHome) {
            return Err(ActionError::PermissionDenied(Permission::SetHome.name()));
        }
        if !self.owns_region(region) {
            return Err(ActionError::RegionNotOwned(region));
        }
        self.home = region;
        Ok(())
    }

    // ========================================================================
    // Personal claims
    // ========================================================================

    pub fn personal_claim_count(&self, player: &str) -> usize {
        self.personal_claims
            .values()
            .filter(|c| c.owner == player)
            .count()
    }

    /// True when `player` may act inside the personally claimed region:
    /// the claim owner, or the kingdom owner's override.
    pub fn has_personal_claim_access(&self, player: &str, region: Region) -> bool {
        match self.personal_claims.get(&region) {
            Some(claim) => claim.owner == player || self.is_owner(player),
            None => false,
        }
    }

    pub fn add_personal_claim(
        &mut self,
        player: &str,
        region: Region,
        now: UnixMillis,
        duration_ms: Option<i64>,
    ) -> Result<(), ActionError> {
        if !self.is_member(player) {
            return Err(ActionError::NotAMember(player.to_string()));
        }
        if !self.owns_region(region) {
            return Err(ActionError::RegionNotOwned(region));
        }
        if self.personal_claims.contains_key(&region) {
            return Err(ActionError::AlreadyPersonallyClaimed(region));
        }
        let mut claim = PersonalClaim::new(player.to_string(), region, now);
        claim.expires_at = duration_ms.map(|d| now + d);
        self.personal_claims.insert(region, claim);
        Ok(())
    }

    pub fn remove_personal_claim(&mut self, actor: &str, region: Region) -> Result<(), ActionError> {
        let Some(claim) = self.personal_claims.get(&region) else {
            return Err(ActionError::NoPersonalClaim(region));
        };
        if !self.can_administer_personal_claim(actor, claim) {
            return Err(ActionError::NotPersonalClaimOwner);
        }
        self.personal_claims.remove(&region);
        Ok(())
    }

    pub fn transfer_personal_claim(
        &mut self,
        actor: &str,
        region: Region,
        to: &str,
    ) -> Result<(), ActionError> {
        if !self.is_member(to) {
            return Err(ActionError::NotAMember(to.to_string()));
        }
        let Some(claim) = self.personal_claims.get(&region) else {
            return Err(ActionError::NoPersonalClaim(region));
        };
        if !self.can_administer_personal_claim(actor, claim) {
            return Err(ActionError::NotPersonalClaimOwner);
        }
        if let Some(claim) = self.personal_claims.get_mut(&region) {
            claim.owner = to.to_string();
        }
        Ok(())
    }

    fn can_administer_personal_claim(&self, actor: &str, claim: &PersonalClaim) -> bool {
        claim.owner == actor || self.is_owner(actor) || self.rank_of(actor) >= Rank::Assistant
    }

    pub fn cleanup_expired_personal_claims(&mut self, now: UnixMillis) {
        self.personal_claims.retain(|_, claim| !claim.is_expired(now));
    }

    // ========================================================================
    // Treasury & upkeep
    // ========================================================================

    /// Deposit into the shared treasury. Member deposits are recorded as
    /// tax contributions.
    pub fn deposit(&mut self, contributor: Option<&str>, amount: i64) -> Result<(), ActionError> {
        if amount <= 0 {
            return Err(ActionError::InvalidAmount(amount));
        }
        self.treasury += amount;
        if let Some(player) = contributor {
            if self.is_member(player) {
                *self
                    .tax_contributions
                    .entry(player.to_string())
                    .or_insert(0) += amount;
            }
        }
        Ok(())
    }

    pub fn withdraw(&mut self, amount: i64) -> Result<(), ActionError> {
        if amount <= 0 {
            return Err(ActionError::InvalidAmount(amount));
        }
        if self.treasury < amount {
            return Err(ActionError::InsufficientTreasury {
                required: amount,
                available: self.treasury,
            });
        }
        self.treasury -= amount;
        Ok(())
    }

    pub fn daily_upkeep(&self) -> i64 {
        if !self.settings.upkeep_enabled {
            return 0;
        }
        self.settings.base_upkeep + self.settings.claim_upkeep * self.claims.len() as i64
    }

    /// Attempts the daily debit. Failure leaves the treasury untouched;
    /// the caller decides the consequence (falling or shrinkage).
    pub fn process_upkeep(&mut self, now: UnixMillis) -> Result<i64, ActionError> {
        let cost = self.daily_upkeep();
        if cost > 0 {
            self.withdraw(cost)?;
        }
        self.last_upkeep_collection = now;
        Ok(cost)
    }

    // ========================================================================
    // Falling state machine
    // ========================================================================

    pub fn is_falling(&self) -> bool {
        self.falling.is_some()
    }

    pub fn enter_falling(&mut self, cause: FallingCause, now: UnixMillis) {
        if self.falling.is_none() {
            log::info!("[FALL] Kingdom {} is falling ({:?})", self.name, cause);
            self.falling = Some(FallingState {
                started_at: now,
                cause,
                reclaimed_by: None,
            });
        }
    }

    /// Reclaim eligibility: first 12 h owner only, 12-24 h any member,
    /// nothing after 24 h.
    pub fn can_reclaim(&self, player: &str, now: UnixMillis) -> bool {
        let Some(falling) = &self.falling else {
            return false;
        };
        let elapsed = now - falling.started_at;
        if elapsed >= defines::FALLING_DISSOLVE_MS {
            return false;
        }
        if elapsed < defines::FALLING_OWNER_WINDOW_MS {
            self.is_owner(player)
        } else {
            self.is_member(player)
        }
    }

    /// Pays the current daily upkeep from the reclaimer's own balance and
    /// returns the kingdom to stable. Returns the cost paid.
    pub fn reclaim(
        &mut self,
        player: &str,
        ledger: &mut dyn CurrencyLedger,
        now: UnixMillis,
    ) -> Result<i64, ActionError> {
        if self.falling.is_none() {
            return Err(ActionError::NotFalling);
        }
        if !self.can_reclaim(player, now) {
            return Err(ActionError::ReclaimWindowClosed);
        }
        let cost = self.daily_upkeep();
        charge_exact(ledger, player, cost)?;
        log::info!("[FALL] Kingdom {} reclaimed by {}", self.name, player);
        self.falling = None;
        Ok(cost)
    }

    // ========================================================================
    // Diplomacy
    // ========================================================================

    pub fn is_enemy(&self, other: &str) -> bool {
        self.enemies.contains(other)
    }

    pub fn is_ally(&self, other: &str) -> bool {
        self.allies.contains(other)
    }

    pub fn relation_to(&self, other: &str) -> Relation {
        if self.name == other {
            Relation::Own
        } else if self.allies.contains(other) {
            Relation::Ally
        } else if self.enemies.contains(other) {
            Relation::Enemy
        } else {
            Relation::Neutral
        }
    }

    /// Idempotent; removes the target from the enemy set so the two sets
    /// stay disjoint.
    pub fn add_ally(&mut self, actor: &str, other: KingdomName) -> Result<(), ActionError> {
        self.require_diplomat(actor)?;
        self.enemies.remove(&other);
        self.allies.insert(other);
        Ok(())
    }

    pub fn remove_ally(&mut self, actor: &str, other: &str) -> Result<(), ActionError> {
        self.require_diplomat(actor)?;
        self.allies.remove(other);
        Ok(())
    }

    /// Idempotent; no consent from the target is needed and nothing is
    /// mirrored on their side.
    pub fn add_enemy(&mut self, actor: &str, other: KingdomName) -> Result<(), ActionError> {
        self.require_diplomat(actor)?;
        self.allies.remove(&other);
        self.enemies.insert(other);
        Ok(())
    }

    pub fn remove_enemy(&mut self, actor: &str, other: &str) -> Result<(), ActionError> {
        self.require_diplomat(actor)?;
        self.enemies.remove(other);
        Ok(())
    }

    fn require_diplomat(&self, actor: &str) -> Result<(), ActionError> {
        if self.is_owner(actor) || self.rank_of(actor) == Rank::Assistant {
            Ok(())
        } else {
            Err(ActionError::PermissionDenied("manage_relations"))
        }
    }
}
