//! War lifecycle: declaration, the capture ledger, early peace,
//! surrender, and conquest settlement.
//!
//! The real-time advance of capture progress lives in
//! [`crate::systems::capture`]; this module owns the records and the
//! state transitions.

use std::collections::HashMap;

use crate::defines;
use crate::error::ActionError;
use crate::notify::Notifier;
use crate::rank::Rank;
use crate::registry::TerritoryRegistry;
use crate::state::{CaptureProgress, FallingCause, Region, UnixMillis, War, WarId};

#[derive(Debug, Default)]
pub struct WarEngine {
    pub wars: HashMap<WarId, War>,
    pub next_war_id: WarId,
    /// Contested regions, keyed by war. An entry exists only while the
    /// region is actively contested or paused, never after capture.
    pub captures: HashMap<(WarId, Region), CaptureProgress>,
}

impl WarEngine {
    pub fn new() -> Self {
        Self {
            next_war_id: 1,
            ..Self::default()
        }
    }

    pub fn war(&self, id: WarId) -> Result<&War, ActionError> {
        self.wars.get(&id).ok_or(ActionError::NoSuchWar(id))
    }

    pub fn war_mut(&mut self, id: WarId) -> Result<&mut War, ActionError> {
        self.wars.get_mut(&id).ok_or(ActionError::NoSuchWar(id))
    }

    /// The active war between two kingdoms, if any. At most one exists
    /// per pair by construction.
    pub fn active_war_between(&self, a: &str, b: &str) -> Option<&War> {
        self.wars.values().find(|w| w.active && w.involves(a, b))
    }

    pub fn active_wars_involving<'a>(&'a self, kingdom: &'a str) -> impl Iterator<Item = &'a War> {
        self.wars
            .values()
            .filter(move |w| w.active && (w.attacker == kingdom || w.defender == kingdom))
    }

    // ========================================================================
    // Declaration
    // ========================================================================

    /// Declares war on `defender`. The target must already be marked as
    /// an enemy, the cost comes out of the attacker treasury, and the
    /// 48-hour grace period starts immediately.
    pub fn declare_war(
        &mut self,
        registry: &mut TerritoryRegistry,
        actor: &str,
        defender: &str,
        cost: i64,
        notifier: &mut dyn Notifier,
        now: UnixMillis,
    ) -> Result<WarId, ActionError> {
        let attacker = registry
            .kingdom_of_player(actor)
            .ok_or_else(|| ActionError::NotAMember(actor.to_string()))?;
        require_war_authority(attacker, actor)?;
        let attacker_name = attacker.name.clone();

        let defender_home = registry.kingdom(defender)?.home;
        if !registry.kingdom(&attacker_name)?.is_enemy(defender) {
            return Err(ActionError::NotAnEnemy(defender.to_string()));
        }
        if self.active_war_between(&attacker_name, defender).is_some() {
            return Err(ActionError::AlreadyAtWar(defender.to_string()));
        }
        registry.kingdom_mut(&attacker_name)?.withdraw(cost)?;

        let id = self.next_war_id;
        self.next_war_id += 1;
        let war = War::new(id, attacker_name.clone(), defender.to_string(), defender_home, now);
        log::info!(
            "[WAR] {} declared war on {} (war {}, grace until {})",
            attacker_name,
            defender,
            id,
            war.grace_period_end
        );
        self.wars.insert(id, war);
        notifier.broadcast(&format!(
            "{} has declared war on {}! Hostilities begin in 48 hours.",
            attacker_name, defender
        ));
        Ok(id)
    }

    // ========================================================================
    // Capture ledger
    // ========================================================================

    /// Whether `region` may currently be contested in this war: the war
    /// is live and out of grace, the region still belongs to the
    /// defender, and it touches the attacker's front (their own
    /// territory or a prior capture in this war).
    pub fn can_contest(
        &self,
        registry: &TerritoryRegistry,
        war_id: WarId,
        region: Region,
        now: UnixMillis,
    ) -> Result<(), ActionError> {
        let war = self.war(war_id)?;
        if !war.active {
            return Err(ActionError::NotAtWar(war.defender.clone()));
        }
        if war.in_grace_period(now) {
            return Err(ActionError::GracePeriodActive);
        }
        if war.captured_claims.contains(&region) {
            return Err(ActionError::AlreadyCaptured(region));
        }
        if registry.owner_name_of(region) != Some(&war.defender) {
            return Err(ActionError::RegionNotOwned(region));
        }
        let attacker = registry.kingdom(&war.attacker)?;
        let on_front = attacker.is_adjacent_to_territory(region)
            || war.captured_claims.iter().any(|c| c.is_adjacent(region));
        if !on_front {
            return Err(ActionError::NotAdjacent(region));
        }
        Ok(())
    }

    /// Get-or-create the progress entry for a contested region.
    pub fn progress_entry(
        &mut self,
        war_id: WarId,
        region: Region,
        now: UnixMillis,
    ) -> &mut CaptureProgress {
        let attacker = self
            .wars
            .get(&war_id)
            .map(|w| w.attacker.clone())
            .unwrap_or_default();
        self.captures
            .entry((war_id, region))
            .or_insert_with(|| CaptureProgress::new(region, attacker, now))
    }

    pub fn progress_for(&self, war_id: WarId, region: Region) -> Option<&CaptureProgress> {
        self.captures.get(&(war_id, region))
    }

    /// Finalizes a completed capture: the region leaves the defender's
    /// claim set and the global index and sits in `captured_claims`
    /// until the war settles. Taking the defender's home wins the war
    /// and sends the defender into the falling state.
    pub fn complete_capture(
        &mut self,
        registry: &mut TerritoryRegistry,
        war_id: WarId,
        region: Region,
        notifier: &mut dyn Notifier,
        now: UnixMillis,
    ) -> Result<(), ActionError> {
        self.captures.remove(&(war_id, region));
        let war = self.war_mut(war_id)?;
        if war.captured_claims.contains(&region) {
            return Err(ActionError::AlreadyCaptured(region));
        }
        war.captured_claims.push(region);
        let attacker = war.attacker.clone();
        let defender = war.defender.clone();
        let is_home = region == war.defender_home;

        registry.admin_remove_claim(region);
        log::info!("[WAR] {} captured {} from {} (war {})", attacker, region, defender, war_id);
        notifier.broadcast(&format!("{} has captured {} from {}!", attacker, region, defender));

        if is_home {
            let war = self.war_mut(war_id)?;
            war.active = false;
            war.attacker_victory = true;
            registry
                .kingdom_mut(&defender)?
                .enter_falling(FallingCause::Conquest { war: war_id }, now);
            log::info!("[WAR] {} won war {}: {} home captured", attacker, war_id, defender);
            notifier.broadcast(&format!(
                "{} has taken the home of {}! The kingdom is falling.",
                attacker, defender
            ));
        }
        Ok(())
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Attacker-side white peace: no territory changes hands. Captured
    /// regions return to the defender, in-flight progress is dropped,
    /// and the deactivated record is kept for history.
    pub fn end_war_early(
        &mut self,
        registry: &mut TerritoryRegistry,
        actor: &str,
        war_id: WarId,
        notifier: &mut dyn Notifier,
    ) -> Result<(), ActionError> {
        let war = self.war(war_id)?;
        if !war.active {
            return Err(ActionError::NotAtWar(war.defender.clone()));
        }
        let attacker = registry.kingdom(&war.attacker)?;
        if !attacker.is_member(actor) {
            return Err(ActionError::NotAMember(actor.to_string()));
        }
        require_war_authority(attacker, actor)?;
        let (attacker, defender) = (war.attacker.clone(), war.defender.clone());
        let returned = war.captured_claims.clone();

        self.war_mut(war_id)?.active = false;
        self.captures.retain(|(id, _), _| *id != war_id);
        grant_regions(registry, &defender, &returned);
        log::info!("[WAR] war {} ended early by {}; white peace", war_id, actor);
        notifier.broadcast(&format!("The war between {} and {} is over.", attacker, defender));
        Ok(())
    }

    /// Defender capitulation, owner only. Counts as an attacker victory
    /// and sends the defender falling immediately.
    pub fn surrender(
        &mut self,
        registry: &mut TerritoryRegistry,
        actor: &str,
        war_id: WarId,
        notifier: &mut dyn Notifier,
        now: UnixMillis,
    ) -> Result<(), ActionError> {
        let war = self.war(war_id)?;
        let defender = registry.kingdom(&war.defender)?;
        if !defender.is_owner(actor) {
            return Err(ActionError::OwnerOnly);
        }
        let defender_name = war.defender.clone();
        let attacker_name = war.attacker.clone();

        let war = self.war_mut(war_id)?;
        war.active = false;
        war.attacker_victory = true;
        war.defender_surrendered = true;
        self.captures.retain(|(id, _), _| *id != war_id);

        registry
            .kingdom_mut(&defender_name)?
            .enter_falling(FallingCause::Conquest { war: war_id }, now);
        log::info!("[WAR] {} surrendered to {} (war {})", defender_name, attacker_name, war_id);
        notifier.broadcast(&format!("{} has surrendered to {}!", defender_name, attacker_name));
        Ok(())
    }

    /// Conquest settlement by the victorious attacker: every captured
    /// region transfers over (ignoring the claim cap), half the fallen
    /// treasury moves with it, the defender returns to stable with
    /// whatever territory remains, and a defender with no claims left is
    /// dissolved. The war record is retired.
    pub fn claim_fallen_kingdom(
        &mut self,
        registry: &mut TerritoryRegistry,
        actor: &str,
        war_id: WarId,
        notifier: &mut dyn Notifier,
    ) -> Result<(), ActionError> {
        let war = self.war(war_id)?;
        if !war.attacker_victory {
            return Err(ActionError::NotFalling);
        }
        let attacker = registry.kingdom(&war.attacker)?;
        if !attacker.is_member(actor) {
            return Err(ActionError::NotAMember(actor.to_string()));
        }
        require_war_authority(attacker, actor)?;
        let attacker_name = war.attacker.clone();
        let defender_name = war.defender.clone();
        let captured = war.captured_claims.clone();

        let defender = registry.kingdom_mut(&defender_name)?;
        match &defender.falling {
            Some(state) if state.cause == (FallingCause::Conquest { war: war_id }) => {}
            _ => return Err(ActionError::NotFalling),
        }
        let spoils = defender.treasury * defines::CONQUEST_TREASURY_PERCENT / 100;
        defender.treasury -= spoils;
        defender.falling = None;
        let defender_empty = defender.claims.is_empty();

        grant_regions(registry, &attacker_name, &captured);
        registry.kingdom_mut(&attacker_name)?.treasury += spoils;
        log::info!(
            "[WAR] {} claimed the fallen {} (war {}, spoils {})",
            attacker_name,
            defender_name,
            war_id,
            spoils
        );
        notifier.broadcast(&format!(
            "{} has claimed the spoils of the fallen kingdom of {}.",
            attacker_name, defender_name
        ));
        if defender_empty {
            registry.dissolve_kingdom(&defender_name, notifier);
        }
        self.remove_war(war_id);
        Ok(())
    }

    /// Retires a war whose conquest was never claimed: the defender
    /// returns to stable, captured regions included, and the attacker
    /// gets nothing.
    pub fn lapse_conquest(
        &mut self,
        registry: &mut TerritoryRegistry,
        war_id: WarId,
    ) -> Result<(), ActionError> {
        let war = self.war(war_id)?;
        let defender_name = war.defender.clone();
        let captured = war.captured_claims.clone();
        if let Ok(defender) = registry.kingdom_mut(&defender_name) {
            if matches!(
                &defender.falling,
                Some(state) if state.cause == (FallingCause::Conquest { war: war_id })
            ) {
                defender.falling = None;
            }
        }
        grant_regions(registry, &defender_name, &captured);
        self.remove_war(war_id);
        log::info!("[WAR] war {} lapsed unclaimed; {} returns to stable", war_id, defender_name);
        Ok(())
    }

    fn remove_war(&mut self, war_id: WarId) {
        self.wars.remove(&war_id);
        self.captures.retain(|(id, _), _| *id != war_id);
    }

    /// Drops every war and capture record involving a dissolved kingdom.
    pub fn purge_kingdom(&mut self, name: &str) {
        let dead: Vec<WarId> = self
            .wars
            .values()
            .filter(|w| w.attacker == name || w.defender == name)
            .map(|w| w.id)
            .collect();
        for id in dead {
            self.remove_war(id);
        }
    }
}

/// Moves limbo regions into a kingdom, bypassing fees, adjacency, and
/// the claim cap. A region claimed by someone else in the meantime is
/// left alone.
fn grant_regions(registry: &mut TerritoryRegistry, kingdom: &str, regions: &[Region]) {
    for &region in regions {
        if registry.is_claimed(region) {
            continue;
        }
        if registry.admin_add_claim(kingdom, region).is_err() {
            log::warn!("[WAR] could not grant {} to {}", region, kingdom);
        }
    }
}

fn require_war_authority(kingdom: &crate::kingdom::Kingdom, actor: &str) -> Result<(), ActionError> {
    if kingdom.is_owner(actor) || kingdom.rank_of(actor) == Rank::Assistant {
        Ok(())
    } else {
        Err(ActionError::PermissionDenied("declare_war"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;
    use crate::notify::{NullNotifier, RecordingNotifier};

    const WAR_COST: i64 = 50_000;

    /// Two bordering kingdoms, mutual enemies, attacker treasury funded.
    fn battlefield() -> (TerritoryRegistry, WarEngine) {
        let mut registry = TerritoryRegistry::new();
        let mut ledger = MemoryLedger::new()
            .with_balance("alice", 100_000)
            .with_balance("bob", 100_000);
        registry
            .create_kingdom("alice", "Avalon", Region::new(0, 0), 10_000, &mut ledger, 0)
            .unwrap();
        registry
            .create_kingdom("bob", "Britannia", Region::new(2, 0), 10_000, &mut ledger, 0)
            .unwrap();
        registry
            .claim("Avalon", "alice", Region::new(1, 0), &mut ledger)
            .unwrap();
        registry
            .claim("Britannia", "bob", Region::new(3, 0), &mut ledger)
            .unwrap();
        let avalon = registry.kingdom_mut("Avalon").unwrap();
        avalon.add_enemy("alice", "Britannia".into()).unwrap();
        avalon.treasury = 100_000;
        (registry, WarEngine::new())
    }

    fn declared() -> (TerritoryRegistry, WarEngine, WarId) {
        let (mut registry, mut wars) = battlefield();
        let id = wars
            .declare_war(&mut registry, "alice", "Britannia", WAR_COST, &mut NullNotifier, 0)
            .unwrap();
        (registry, wars, id)
    }

    #[test]
    fn test_declare_war_debits_treasury_and_starts_grace() {
        let (registry, wars, id) = declared();
        assert_eq!(registry.kingdom("Avalon").unwrap().treasury, 50_000);
        let war = wars.war(id).unwrap();
        assert!(war.active);
        assert!(war.in_grace_period(defines::WAR_GRACE_PERIOD_MS - 1));
        assert_eq!(war.defender_home, Region::new(2, 0));
    }

    #[test]
    fn test_declare_war_requires_enemy_status() {
        let (mut registry, mut wars) = battlefield();
        registry
            .kingdom_mut("Avalon")
            .unwrap()
            .remove_enemy("alice", "Britannia")
            .unwrap();
        assert_eq!(
            wars.declare_war(&mut registry, "alice", "Britannia", WAR_COST, &mut NullNotifier, 0),
            Err(ActionError::NotAnEnemy("Britannia".into()))
        );
    }

    #[test]
    fn test_declare_war_rejects_duplicates_and_poverty() {
        let (mut registry, mut wars, _) = declared();
        assert_eq!(
            wars.declare_war(&mut registry, "alice", "Britannia", WAR_COST, &mut NullNotifier, 0),
            Err(ActionError::AlreadyAtWar("Britannia".into()))
        );

        // Unknown defender
        assert_eq!(
            wars.declare_war(&mut registry, "alice", "Camelot", WAR_COST, &mut NullNotifier, 0),
            Err(ActionError::NoSuchKingdom("Camelot".into()))
        );

        // A second war against a real target fails on the treasury
        let mut ledger = MemoryLedger::new().with_balance("carol", 100_000);
        registry
            .create_kingdom("carol", "Camelot", Region::new(0, 2), 10_000, &mut ledger, 0)
            .unwrap();
        registry
            .kingdom_mut("Avalon")
            .unwrap()
            .add_enemy("alice", "Camelot".into())
            .unwrap();
        registry.kingdom_mut("Avalon").unwrap().treasury = 10;
        assert!(matches!(
            wars.declare_war(&mut registry, "alice", "Camelot", WAR_COST, &mut NullNotifier, 0),
            Err(ActionError::InsufficientTreasury { .. })
        ));
    }

    #[test]
    fn test_declare_war_requires_leadership() {
        let (mut registry, mut wars) = battlefield();
        registry
            .kingdom_mut("Avalon")
            .unwrap()
            .add_member("carol".into(), Rank::Officer)
            .unwrap();
        assert_eq!(
            wars.declare_war(&mut registry, "carol", "Britannia", WAR_COST, &mut NullNotifier, 0),
            Err(ActionError::PermissionDenied("declare_war"))
        );
    }

    #[test]
    fn test_contest_gating() {
        let (registry, wars, id) = declared();
        let border = Region::new(2, 0);

        // Grace period blocks everything
        assert_eq!(
            wars.can_contest(&registry, id, border, 0),
            Err(ActionError::GracePeriodActive)
        );

        let t = defines::WAR_GRACE_PERIOD_MS;
        // Border region is contestable once grace ends
        assert!(wars.can_contest(&registry, id, border, t).is_ok());
        // Region behind the front is not
        assert_eq!(
            wars.can_contest(&registry, id, Region::new(3, 0), t),
            Err(ActionError::NotAdjacent(Region::new(3, 0)))
        );
        // Regions outside the defender are not contestable
        assert_eq!(
            wars.can_contest(&registry, id, Region::new(1, 0), t),
            Err(ActionError::RegionNotOwned(Region::new(1, 0)))
        );
    }

    #[test]
    fn test_front_advances_with_captures() {
        // Defender with its home two regions deep: (2,0) -> (3,0) -> home (4,0)
        let mut registry = TerritoryRegistry::new();
        let mut ledger = MemoryLedger::new()
            .with_balance("alice", 100_000)
            .with_balance("bob", 100_000);
        registry
            .create_kingdom("alice", "Avalon", Region::new(0, 0), 10_000, &mut ledger, 0)
            .unwrap();
        registry
            .claim("Avalon", "alice", Region::new(1, 0), &mut ledger)
            .unwrap();
        registry
            .create_kingdom("bob", "Britannia", Region::new(4, 0), 10_000, &mut ledger, 0)
            .unwrap();
        registry
            .claim("Britannia", "bob", Region::new(3, 0), &mut ledger)
            .unwrap();
        registry
            .claim("Britannia", "bob", Region::new(2, 0), &mut ledger)
            .unwrap();
        let avalon = registry.kingdom_mut("Avalon").unwrap();
        avalon.add_enemy("alice", "Britannia".into()).unwrap();
        avalon.treasury = 100_000;
        let mut wars = WarEngine::new();
        let id = wars
            .declare_war(&mut registry, "alice", "Britannia", WAR_COST, &mut NullNotifier, 0)
            .unwrap();

        let t = defines::WAR_GRACE_PERIOD_MS;
        // (3,0) starts behind the front
        assert_eq!(
            wars.can_contest(&registry, id, Region::new(3, 0), t),
            Err(ActionError::NotAdjacent(Region::new(3, 0)))
        );
        wars.complete_capture(&mut registry, id, Region::new(2, 0), &mut NullNotifier, t)
            .unwrap();
        // Capturing (2,0) opens (3,0); the war is still live
        assert!(wars.war(id).unwrap().active);
        assert!(wars.can_contest(&registry, id, Region::new(3, 0), t).is_ok());
        // A captured region cannot be contested again
        assert_eq!(
            wars.can_contest(&registry, id, Region::new(2, 0), t),
            Err(ActionError::AlreadyCaptured(Region::new(2, 0)))
        );
    }

    #[test]
    fn test_capturing_home_wins_war_and_fells_defender() {
        let (mut registry, mut wars, id) = declared();
        let t = defines::WAR_GRACE_PERIOD_MS;
        let mut notifier = RecordingNotifier::default();

        wars.complete_capture(&mut registry, id, Region::new(2, 0), &mut notifier, t)
            .unwrap();

        let war = wars.war(id).unwrap();
        assert!(!war.active);
        assert!(war.attacker_victory);
        // The home sits in limbo until settlement
        assert_eq!(registry.owner_name_of(Region::new(2, 0)), None);
        let defender = registry.kingdom("Britannia").unwrap();
        assert!(!defender.owns_region(Region::new(2, 0)));
        assert!(defender.is_falling());
        assert_eq!(
            defender.falling.as_ref().unwrap().cause,
            FallingCause::Conquest { war: id }
        );
        assert!(!notifier.broadcasts.is_empty());
    }

    #[test]
    fn test_captured_region_is_unowned_until_settlement() {
        let (mut registry, mut wars, id) = declared();
        let t = defines::WAR_GRACE_PERIOD_MS;
        wars.complete_capture(&mut registry, id, Region::new(2, 0), &mut NullNotifier, t)
            .unwrap();

        // Neither side owns the region while the war awaits settlement
        assert_eq!(registry.owner_name_of(Region::new(2, 0)), None);
        assert!(!registry.kingdom("Avalon").unwrap().owns_region(Region::new(2, 0)));
        assert!(!registry.kingdom("Britannia").unwrap().owns_region(Region::new(2, 0)));
        assert!(wars.war(id).unwrap().captured_claims.contains(&Region::new(2, 0)));

        wars.claim_fallen_kingdom(&mut registry, "alice", id, &mut NullNotifier)
            .unwrap();
        assert_eq!(registry.owner_name_of(Region::new(2, 0)), Some(&"Avalon".to_string()));
        assert!(registry.kingdom("Avalon").unwrap().owns_region(Region::new(2, 0)));
    }

    #[test]
    fn test_conquest_transfer_ignores_claim_cap() {
        let (mut registry, mut wars, id) = declared();
        // Attacker pinned at the cap
        let avalon = registry.kingdom_mut("Avalon").unwrap();
        for x in 0..23 {
            avalon.add_claim(Region::new(-1 - x, 0));
        }
        assert_eq!(avalon.claim_count(), defines::MAX_CLAIMS);

        let t = defines::WAR_GRACE_PERIOD_MS;
        wars.complete_capture(&mut registry, id, Region::new(2, 0), &mut NullNotifier, t)
            .unwrap();
        wars.claim_fallen_kingdom(&mut registry, "alice", id, &mut NullNotifier)
            .unwrap();
        assert_eq!(
            registry.kingdom("Avalon").unwrap().claim_count(),
            defines::MAX_CLAIMS + 1
        );
    }

    #[test]
    fn test_surrender_is_owner_only_and_fells_defender() {
        let (mut registry, mut wars, id) = declared();
        registry
            .kingdom_mut("Britannia")
            .unwrap()
            .add_member("dave".into(), Rank::Assistant)
            .unwrap();
        assert_eq!(
            wars.surrender(&mut registry, "dave", id, &mut NullNotifier, 0),
            Err(ActionError::OwnerOnly)
        );

        wars.surrender(&mut registry, "bob", id, &mut NullNotifier, 0).unwrap();
        let war = wars.war(id).unwrap();
        assert!(war.defender_surrendered && war.attacker_victory);
        assert!(registry.kingdom("Britannia").unwrap().is_falling());
    }

    #[test]
    fn test_claim_fallen_kingdom_splits_treasury() {
        let (mut registry, mut wars, id) = declared();
        registry.kingdom_mut("Britannia").unwrap().treasury = 8_000;
        wars.surrender(&mut registry, "bob", id, &mut NullNotifier, 0).unwrap();

        wars.claim_fallen_kingdom(&mut registry, "alice", id, &mut NullNotifier)
            .unwrap();
        assert_eq!(registry.kingdom("Avalon").unwrap().treasury, 54_000);
        let britannia = registry.kingdom("Britannia").unwrap();
        assert_eq!(britannia.treasury, 4_000);
        assert!(!britannia.is_falling());
        // War record is retired
        assert_eq!(wars.war(id), Err(ActionError::NoSuchWar(id)));
    }

    #[test]
    fn test_claim_fallen_requires_victory() {
        let (mut registry, mut wars, id) = declared();
        assert_eq!(
            wars.claim_fallen_kingdom(&mut registry, "alice", id, &mut NullNotifier),
            Err(ActionError::NotFalling)
        );
    }

    #[test]
    fn test_claim_fallen_dissolves_landless_defender() {
        let (mut registry, mut wars, id) = declared();
        let t = defines::WAR_GRACE_PERIOD_MS;
        wars.complete_capture(&mut registry, id, Region::new(2, 0), &mut NullNotifier, t)
            .unwrap();
        wars.complete_capture(&mut registry, id, Region::new(3, 0), &mut NullNotifier, t)
            .unwrap();
        assert!(registry.kingdom("Britannia").unwrap().claims.is_empty());

        wars.claim_fallen_kingdom(&mut registry, "alice", id, &mut NullNotifier)
            .unwrap();
        assert_eq!(
            registry.kingdom("Britannia"),
            Err(ActionError::NoSuchKingdom("Britannia".into()))
        );
        let avalon = registry.kingdom("Avalon").unwrap();
        assert!(avalon.owns_region(Region::new(2, 0)));
        assert!(avalon.owns_region(Region::new(3, 0)));
    }

    #[test]
    fn test_lapse_conquest_restores_defender_without_transfer() {
        let (mut registry, mut wars, id) = declared();
        registry.kingdom_mut("Britannia").unwrap().treasury = 8_000;
        let t = defines::WAR_GRACE_PERIOD_MS;
        wars.complete_capture(&mut registry, id, Region::new(2, 0), &mut NullNotifier, t)
            .unwrap();

        wars.lapse_conquest(&mut registry, id).unwrap();
        let britannia = registry.kingdom("Britannia").unwrap();
        assert!(!britannia.is_falling());
        assert_eq!(britannia.treasury, 8_000);
        // The captured home comes back; the attacker gets nothing
        assert!(britannia.owns_region(Region::new(2, 0)));
        assert_eq!(registry.owner_name_of(Region::new(2, 0)), Some(&"Britannia".to_string()));
        assert!(!registry.kingdom("Avalon").unwrap().owns_region(Region::new(2, 0)));
        assert!(wars.wars.is_empty());
    }

    #[test]
    fn test_end_war_early_is_white_peace() {
        let (mut registry, mut wars, id) = declared();
        let t = defines::WAR_GRACE_PERIOD_MS;
        wars.complete_capture(&mut registry, id, Region::new(3, 0), &mut NullNotifier, t)
            .unwrap();

        wars.end_war_early(&mut registry, "alice", id, &mut NullNotifier).unwrap();
        // No territory change: the captured region goes back to the defender
        assert_eq!(registry.owner_name_of(Region::new(3, 0)), Some(&"Britannia".to_string()));
        assert!(registry.kingdom("Britannia").unwrap().owns_region(Region::new(3, 0)));
        assert!(!registry.kingdom("Avalon").unwrap().owns_region(Region::new(3, 0)));
        // The deactivated record is kept; progress is gone
        let war = wars.war(id).unwrap();
        assert!(!war.active && !war.attacker_victory);
        assert!(wars.captures.is_empty());
        // A concluded war cannot be ended again
        assert_eq!(
            wars.end_war_early(&mut registry, "alice", id, &mut NullNotifier),
            Err(ActionError::NotAtWar("Britannia".into()))
        );
    }

    #[test]
    fn test_purge_kingdom_drops_its_wars() {
        let (mut registry, mut wars, id) = declared();
        let t = defines::WAR_GRACE_PERIOD_MS + 1;
        let _ = wars.progress_entry(id, Region::new(2, 0), t);
        wars.purge_kingdom("Britannia");
        assert!(wars.wars.is_empty());
        assert!(wars.captures.is_empty());
        let _ = registry;
    }
}
