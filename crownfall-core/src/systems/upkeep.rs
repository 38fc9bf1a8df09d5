//! Daily upkeep collection and falling-state resolution.

use crate::config::{EngineConfig, UpkeepPolicy};
use crate::defines;
use crate::notify::Notifier;
use crate::registry::TerritoryRegistry;
use crate::state::{FallingCause, KingdomName, UnixMillis, WarId};
use crate::war::WarEngine;

/// One pass of the upkeep system.
///
/// First resolves falling states that have run their 24-hour course:
/// upkeep falls dissolve the kingdom, unclaimed conquests lapse back to
/// stable. Then collects upkeep from every stable kingdom whose interval
/// has elapsed; a kingdom that cannot pay either starts falling or
/// sheds outlying claims, per [`EngineConfig::upkeep_policy`]. Upkeep is
/// suspended while a kingdom is falling.
#[tracing::instrument(skip_all)]
pub fn run_upkeep_tick(
    registry: &mut TerritoryRegistry,
    wars: &mut WarEngine,
    config: &EngineConfig,
    notifier: &mut dyn Notifier,
    now: UnixMillis,
) {
    resolve_expired_falls(registry, wars, notifier, now);

    let due: Vec<KingdomName> = registry
        .kingdoms
        .values()
        .filter(|k| !k.is_falling())
        .filter(|k| now - k.last_upkeep_collection >= defines::UPKEEP_INTERVAL_MS)
        .map(|k| k.name.clone())
        .collect();

    for name in due {
        collect_from(registry, config, notifier, &name, now);
    }
}

fn resolve_expired_falls(
    registry: &mut TerritoryRegistry,
    wars: &mut WarEngine,
    notifier: &mut dyn Notifier,
    now: UnixMillis,
) {
    let expired: Vec<(KingdomName, FallingCause)> = registry
        .kingdoms
        .values()
        .filter_map(|k| {
            let falling = k.falling.as_ref()?;
            (now - falling.started_at >= defines::FALLING_DISSOLVE_MS)
                .then(|| (k.name.clone(), falling.cause))
        })
        .collect();

    for (name, cause) in expired {
        match cause {
            FallingCause::UnpaidUpkeep => {
                log::info!("[FALL] {} was never reclaimed; dissolving", name);
                registry.dissolve_kingdom(&name, notifier);
                wars.purge_kingdom(&name);
            }
            FallingCause::Conquest { war } => {
                lapse(registry, wars, war, notifier);
            }
        }
    }
}

fn lapse(registry: &mut TerritoryRegistry, wars: &mut WarEngine, war: WarId, notifier: &mut dyn Notifier) {
    match wars.lapse_conquest(registry, war) {
        Ok(()) => notifier.broadcast("An unclaimed conquest has lapsed."),
        Err(err) => log::warn!("[FALL] lapsing war {} failed: {}", war, err),
    }
}

fn collect_from(
    registry: &mut TerritoryRegistry,
    config: &EngineConfig,
    notifier: &mut dyn Notifier,
    name: &str,
    now: UnixMillis,
) {
    let outcome = match registry.kingdom_mut(name) {
        Ok(kingdom) => kingdom.process_upkeep(now),
        Err(_) => return,
    };
    match outcome {
        Ok(cost) => {
            log::debug!("[UPKEEP] {} paid {}", name, cost);
        }
        Err(_) => match config.upkeep_policy {
            UpkeepPolicy::Falling => {
                if let Ok(kingdom) = registry.kingdom_mut(name) {
                    kingdom.enter_falling(FallingCause::UnpaidUpkeep, now);
                }
                notifier.broadcast(&format!(
                    "The kingdom of {} can no longer pay its upkeep and is falling!",
                    name
                ));
            }
            UpkeepPolicy::Shrink => {
                if !shrink_until_affordable(registry, name, notifier, now) {
                    if let Ok(kingdom) = registry.kingdom_mut(name) {
                        kingdom.enter_falling(FallingCause::UnpaidUpkeep, now);
                    }
                    notifier.broadcast(&format!(
                        "The kingdom of {} can no longer pay its upkeep and is falling!",
                        name
                    ));
                }
            }
        },
    }
}

/// Sheds claims farthest from home until the remaining upkeep clears.
/// Returns false when the kingdom is down to its home region and still
/// cannot pay.
fn shrink_until_affordable(
    registry: &mut TerritoryRegistry,
    name: &str,
    notifier: &mut dyn Notifier,
    now: UnixMillis,
) -> bool {
    loop {
        let victim = {
            let Ok(kingdom) = registry.kingdom_mut(name) else {
                return false;
            };
            match kingdom.process_upkeep(now) {
                Ok(cost) => {
                    log::debug!("[UPKEEP] {} paid {} after shrinking", name, cost);
                    return true;
                }
                Err(_) => match kingdom.farthest_claim_from_home() {
                    Some(region) => region,
                    None => return false,
                },
            }
        };
        registry.admin_remove_claim(victim);
        log::info!("[UPKEEP] {} shed claim {} to cover upkeep", name, victim);
        notifier.broadcast(&format!("{} has abandoned {} to cover its upkeep.", name, victim));
    }
}
