//! Real-time capture advancement.
//!
//! The host samples player positions and feeds them in as [`Occupant`]
//! records; this pass turns presence into capture progress. Progress
//! only ever accumulates or holds still; it never decays.

use std::collections::{HashMap, HashSet};

use crate::notify::Notifier;
use crate::registry::TerritoryRegistry;
use crate::state::{KingdomName, PlayerId, Region, UnixMillis, WarId};
use crate::war::WarEngine;

/// One sampled player position.
#[derive(Debug, Clone)]
pub struct Occupant {
    pub player: PlayerId,
    pub region: Region,
}

/// Advances every contested region by the time since its last tick.
///
/// A region advances when a member of the attacking kingdom stands in it
/// with no defender present; it pauses (holding its accumulated time)
/// otherwise. Entries whose war ended or whose region changed hands are
/// discarded.
#[tracing::instrument(skip_all, fields(occupants = occupants.len()))]
pub fn run_capture_tick(
    registry: &mut TerritoryRegistry,
    wars: &mut WarEngine,
    occupants: &[Occupant],
    notifier: &mut dyn Notifier,
    now: UnixMillis,
) {
    drop_stale_entries(registry, wars);

    // Which kingdoms have a member standing in each region.
    let mut presence: HashMap<Region, Vec<KingdomName>> = HashMap::new();
    for occupant in occupants {
        if let Some(name) = registry.kingdom_name_of_player(&occupant.player) {
            presence.entry(occupant.region).or_default().push(name);
        }
    }

    let mut advancing: HashSet<(WarId, Region)> = HashSet::new();
    for war in wars.wars.values().filter(|w| w.active) {
        if war.in_grace_period(now) {
            continue;
        }
        for (&region, kingdoms) in &presence {
            let attacker_present = kingdoms.iter().any(|k| *k == war.attacker);
            let defender_present = kingdoms.iter().any(|k| *k == war.defender);
            if attacker_present
                && !defender_present
                && wars.can_contest(registry, war.id, region, now).is_ok()
            {
                advancing.insert((war.id, region));
            }
        }
    }

    // Paused entries still move their clock forward so a later advance
    // does not credit the idle gap.
    let existing: Vec<(WarId, Region)> = wars.captures.keys().copied().collect();
    for key in existing {
        if !advancing.contains(&key) {
            if let Some(progress) = wars.captures.get_mut(&key) {
                progress.last_advance = now;
            }
        }
    }

    for &(war_id, region) in &advancing {
        let progress = wars.progress_entry(war_id, region, now);
        let elapsed = (now - progress.last_advance).max(0);
        progress.accumulated_ms += elapsed;
        progress.last_advance = now;
        log::trace!(
            "[CAPTURE] war {} region {} at {:.0}%",
            war_id,
            region,
            progress.percentage() * 100.0
        );
    }

    let complete: Vec<(WarId, Region)> = wars
        .captures
        .iter()
        .filter(|(_, progress)| progress.is_complete())
        .map(|(&key, _)| key)
        .collect();
    for (war_id, region) in complete {
        if let Err(err) = wars.complete_capture(registry, war_id, region, notifier, now) {
            log::warn!("[CAPTURE] completing {} in war {} failed: {}", region, war_id, err);
        }
    }
}

fn drop_stale_entries(registry: &TerritoryRegistry, wars: &mut WarEngine) {
    let stale: Vec<(WarId, Region)> = wars
        .captures
        .keys()
        .filter(|(war_id, region)| match wars.wars.get(war_id) {
            Some(war) => {
                !war.active || registry.owner_name_of(*region) != Some(&war.defender)
            }
            None => true,
        })
        .copied()
        .collect();
    for key in stale {
        wars.captures.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defines;
    use crate::ledger::MemoryLedger;
    use crate::notify::{NullNotifier, RecordingNotifier};
    use crate::state::FallingCause;
    use proptest::prelude::*;

    const WAR_COST: i64 = 50_000;
    const T0: UnixMillis = defines::WAR_GRACE_PERIOD_MS;

    fn at(player: &str, x: i32, z: i32) -> Occupant {
        Occupant {
            player: player.to_string(),
            region: Region::new(x, z),
        }
    }

    /// Avalon (alice) at (0,0)-(1,0) vs Britannia (bob) home (3,0) with
    /// border claim (2,0). War already declared, grace elapsed at T0.
    fn battlefield() -> (TerritoryRegistry, WarEngine, WarId) {
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
            .create_kingdom("bob", "Britannia", Region::new(3, 0), 10_000, &mut ledger, 0)
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
        (registry, wars, id)
    }

    #[test]
    fn test_presence_accumulates_between_ticks() {
        let (mut registry, mut wars, id) = battlefield();
        let border = [at("alice", 2, 0)];

        run_capture_tick(&mut registry, &mut wars, &border, &mut NullNotifier, T0);
        assert_eq!(wars.progress_for(id, Region::new(2, 0)).unwrap().accumulated_ms, 0);

        run_capture_tick(&mut registry, &mut wars, &border, &mut NullNotifier, T0 + 5_000);
        assert_eq!(
            wars.progress_for(id, Region::new(2, 0)).unwrap().accumulated_ms,
            5_000
        );
    }

    #[test]
    fn test_no_progress_during_grace() {
        let (mut registry, mut wars, id) = battlefield();
        let border = [at("alice", 2, 0)];
        run_capture_tick(&mut registry, &mut wars, &border, &mut NullNotifier, 1_000);
        run_capture_tick(&mut registry, &mut wars, &border, &mut NullNotifier, 2_000);
        assert!(wars.progress_for(id, Region::new(2, 0)).is_none());
    }

    #[test]
    fn test_absence_pauses_without_decay() {
        let (mut registry, mut wars, id) = battlefield();
        let border = [at("alice", 2, 0)];

        run_capture_tick(&mut registry, &mut wars, &border, &mut NullNotifier, T0);
        run_capture_tick(&mut registry, &mut wars, &border, &mut NullNotifier, T0 + 10_000);
        // Attacker leaves for a long stretch
        run_capture_tick(&mut registry, &mut wars, &[], &mut NullNotifier, T0 + 60_000);
        let progress = wars.progress_for(id, Region::new(2, 0)).unwrap();
        assert_eq!(progress.accumulated_ms, 10_000);

        // Returning resumes from where it stopped; the idle gap is not credited
        run_capture_tick(&mut registry, &mut wars, &border, &mut NullNotifier, T0 + 65_000);
        assert_eq!(
            wars.progress_for(id, Region::new(2, 0)).unwrap().accumulated_ms,
            15_000
        );
    }

    #[test]
    fn test_defender_presence_blocks_progress() {
        let (mut registry, mut wars, id) = battlefield();
        let contested = [at("alice", 2, 0), at("bob", 2, 0)];
        run_capture_tick(&mut registry, &mut wars, &contested, &mut NullNotifier, T0);
        run_capture_tick(&mut registry, &mut wars, &contested, &mut NullNotifier, T0 + 30_000);
        assert!(wars
            .progress_for(id, Region::new(2, 0))
            .map_or(true, |p| p.accumulated_ms == 0));
    }

    #[test]
    fn test_completion_moves_region_into_limbo() {
        let (mut registry, mut wars, id) = battlefield();
        let border = [at("alice", 2, 0)];

        run_capture_tick(&mut registry, &mut wars, &border, &mut NullNotifier, T0);
        run_capture_tick(
            &mut registry,
            &mut wars,
            &border,
            &mut NullNotifier,
            T0 + defines::CAPTURE_THRESHOLD_MS,
        );

        // Held in the war's captured list, owned by nobody until settlement
        assert_eq!(registry.owner_name_of(Region::new(2, 0)), None);
        assert!(!registry.kingdom("Britannia").unwrap().owns_region(Region::new(2, 0)));
        assert!(wars.war(id).unwrap().captured_claims.contains(&Region::new(2, 0)));
        assert!(wars.progress_for(id, Region::new(2, 0)).is_none());
        assert!(wars.war(id).unwrap().active);
    }

    #[test]
    fn test_home_capture_ends_war() {
        let (mut registry, mut wars, id) = battlefield();
        let mut notifier = RecordingNotifier::default();
        // Take the border first
        run_capture_tick(&mut registry, &mut wars, &[at("alice", 2, 0)], &mut notifier, T0);
        run_capture_tick(
            &mut registry,
            &mut wars,
            &[at("alice", 2, 0)],
            &mut notifier,
            T0 + defines::CAPTURE_THRESHOLD_MS,
        );
        // Then the home
        let t1 = T0 + defines::CAPTURE_THRESHOLD_MS;
        run_capture_tick(&mut registry, &mut wars, &[at("alice", 3, 0)], &mut notifier, t1);
        run_capture_tick(
            &mut registry,
            &mut wars,
            &[at("alice", 3, 0)],
            &mut notifier,
            t1 + defines::CAPTURE_THRESHOLD_MS,
        );

        let war = wars.war(id).unwrap();
        assert!(war.attacker_victory);
        assert!(!war.active);
        let britannia = registry.kingdom("Britannia").unwrap();
        assert_eq!(
            britannia.falling.as_ref().map(|f| f.cause),
            Some(FallingCause::Conquest { war: id })
        );
    }

    #[test]
    fn test_non_adjacent_region_never_contested() {
        let (mut registry, mut wars, id) = battlefield();
        // Standing directly in the defender home, past the front
        let deep = [at("alice", 3, 0)];
        run_capture_tick(&mut registry, &mut wars, &deep, &mut NullNotifier, T0);
        run_capture_tick(&mut registry, &mut wars, &deep, &mut NullNotifier, T0 + 30_000);
        assert!(wars.progress_for(id, Region::new(3, 0)).is_none());
    }

    proptest! {
        /// Accumulated capture time never decreases, whatever the mix of
        /// presence and absence between ticks.
        #[test]
        fn prop_capture_progress_is_monotonic(
            steps in prop::collection::vec((1i64..30_000, any::<bool>()), 1..40)
        ) {
            let (mut registry, mut wars, id) = battlefield();
            let mut t = T0;
            let mut last = 0i64;
            for (dt, present) in steps {
                t += dt;
                let occupants = if present {
                    vec![at("alice", 2, 0)]
                } else {
                    vec![]
                };
                run_capture_tick(&mut registry, &mut wars, &occupants, &mut NullNotifier, t);
                let current = wars
                    .progress_for(id, Region::new(2, 0))
                    .map(|p| p.accumulated_ms)
                    .unwrap_or(last);
                prop_assert!(current >= last);
                last = current;
                if !wars.war(id).map(|w| w.active).unwrap_or(false) {
                    break;
                }
            }
        }
    }

    #[test]
    fn test_bystanders_do_not_capture() {
        let (mut registry, mut wars, id) = battlefield();
        // A player from no kingdom stands on the border
        let strangers = [at("mallory", 2, 0)];
        run_capture_tick(&mut registry, &mut wars, &strangers, &mut NullNotifier, T0);
        run_capture_tick(&mut registry, &mut wars, &strangers, &mut NullNotifier, T0 + 30_000);
        assert!(wars.progress_for(id, Region::new(2, 0)).is_none());
    }
}
