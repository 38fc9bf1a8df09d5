//! The engine facade: one mutable owner of all state, fed from a single
//! authority thread.
//!
//! Commands and timer ticks arrive as [`EngineTask`]s over a channel;
//! [`Engine::run_task`] is the only place state is mutated, so no
//! operation ever observes a half-applied change. Errors returned from
//! [`Engine::execute_command`] guarantee the state was left untouched.

use std::path::PathBuf;
use std::sync::mpsc::Sender;

use crate::config::EngineConfig;
use crate::defines;
use crate::error::ActionError;
use crate::input::{Command, Reply};
use crate::ledger::{charge_exact, CurrencyLedger};
use crate::notify::Notifier;
use crate::persist;
use crate::query;
use crate::rank::Rank;
use crate::registry::TerritoryRegistry;
use crate::state::{KingdomName, PlayerId, Region, UnixMillis};
use crate::systems::{self, Occupant};
use crate::war::WarEngine;

pub struct Engine {
    pub registry: TerritoryRegistry,
    pub wars: WarEngine,
    pub config: EngineConfig,
}

/// One unit of work for the authority thread.
#[derive(Debug)]
pub enum EngineTask {
    Apply {
        actor: PlayerId,
        at: Region,
        command: Command,
        now: UnixMillis,
        reply: Sender<Result<Reply, ActionError>>,
    },
    CaptureTick {
        occupants: Vec<Occupant>,
        now: UnixMillis,
    },
    UpkeepTick {
        now: UnixMillis,
    },
    CleanupTick {
        now: UnixMillis,
    },
    Save {
        path: PathBuf,
    },
    Shutdown,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            registry: TerritoryRegistry::new(),
            wars: WarEngine::new(),
            config,
        }
    }

    pub fn from_parts(registry: TerritoryRegistry, wars: WarEngine, config: EngineConfig) -> Self {
        Self {
            registry,
            wars,
            config,
        }
    }

    /// Runs one task. Returns false when the engine should stop.
    pub fn run_task(
        &mut self,
        task: EngineTask,
        ledger: &mut dyn CurrencyLedger,
        notifier: &mut dyn Notifier,
    ) -> bool {
        match task {
            EngineTask::Apply {
                actor,
                at,
                command,
                now,
                reply,
            } => {
                let result = self.execute_command(&actor, at, command, ledger, notifier, now);
                if let Err(err) = &result {
                    log::debug!("command from {} rejected: {}", actor, err);
                }
                // A dropped receiver just means the issuer went away
                let _ = reply.send(result);
            }
            EngineTask::CaptureTick { occupants, now } => {
                systems::run_capture_tick(
                    &mut self.registry,
                    &mut self.wars,
                    &occupants,
                    notifier,
                    now,
                );
            }
            EngineTask::UpkeepTick { now } => {
                systems::run_upkeep_tick(
                    &mut self.registry,
                    &mut self.wars,
                    &self.config,
                    notifier,
                    now,
                );
            }
            EngineTask::CleanupTick { now } => {
                self.registry.cleanup_expired(now);
            }
            EngineTask::Save { path } => {
                if let Err(err) = persist::save_to_path(&path, &self.registry, &self.wars) {
                    log::error!("save to {} failed: {}", path.display(), err);
                }
            }
            EngineTask::Shutdown => return false,
        }
        true
    }

    /// Applies one player command at the actor's current region.
    #[tracing::instrument(skip_all, fields(actor = %actor, at = %at))]
    pub fn execute_command(
        &mut self,
        actor: &str,
        at: Region,
        command: Command,
        ledger: &mut dyn CurrencyLedger,
        notifier: &mut dyn Notifier,
        now: UnixMillis,
    ) -> Result<Reply, ActionError> {
        match command {
            Command::CreateKingdom { name } => {
                self.registry
                    .create_kingdom(actor, &name, at, self.config.creation_cost, ledger, now)?;
                notifier.broadcast(&format!("The kingdom of {} has been founded!", name));
                Ok(Reply::message(format!(
                    "{} founded. Your home region is {}.",
                    name, at
                )))
            }
            Command::RequestDelete => {
                self.registry.request_delete(actor, now)?;
                Ok(Reply::message(
                    "Confirm the deletion within 30 seconds. This cannot be undone.",
                ))
            }
            Command::ConfirmDelete => {
                let name = self.registry.confirm_delete(actor, notifier, now)?;
                self.wars.purge_kingdom(&name);
                Ok(Reply::message(format!("The kingdom of {} has been deleted.", name)))
            }

            Command::Claim => {
                let name = self.actor_kingdom_name(actor)?;
                self.registry.claim(&name, actor, at, ledger)?;
                Ok(Reply::message(format!("Region {} claimed.", at)))
            }
            Command::Unclaim => {
                let name = self.actor_kingdom_name(actor)?;
                self.registry.unclaim(&name, actor, at)?;
                Ok(Reply::message(format!("Region {} unclaimed.", at)))
            }
            Command::SetHome => {
                let name = self.actor_kingdom_name(actor)?;
                self.registry.kingdom_mut(&name)?.set_home(actor, at)?;
                Ok(Reply::message(format!("Home region set to {}.", at)))
            }

            Command::Invite { player } => {
                let name = self.registry.invite(actor, &player, now)?;
                notifier.notify(
                    &player,
                    &format!("{} invited you to join {}. You have 5 minutes to accept.", actor, name),
                );
                Ok(Reply::message(format!("{} invited to {}.", player, name)))
            }
            Command::AcceptInvite => {
                let name = self.registry.accept_invite(actor, now)?;
                notifier.broadcast(&format!("{} has joined {}!", actor, name));
                Ok(Reply::message(format!("Welcome to {}.", name)))
            }
            Command::DeclineInvite => {
                let name = self.registry.decline_invite(actor)?;
                Ok(Reply::message(format!("Invitation from {} declined.", name)))
            }
            Command::Leave => {
                let name = self.registry.leave(actor)?;
                Ok(Reply::message(format!("You have left {}.", name)))
            }
            Command::Kick { player } => {
                let name = self.registry.kick(actor, &player)?;
                notifier.notify(&player, &format!("You were removed from {}.", name));
                Ok(Reply::message(format!("{} removed from {}.", player, name)))
            }
            Command::SetRank { player, rank } => {
                let name = self.actor_kingdom_name(actor)?;
                self.registry.kingdom_mut(&name)?.set_rank(actor, &player, rank)?;
                Ok(Reply::message(format!("{} is now {}.", player, rank)))
            }
            Command::TransferOwnership { player } => {
                let name = self.actor_kingdom_name(actor)?;
                self.registry
                    .kingdom_mut(&name)?
                    .transfer_ownership(actor, &player)?;
                notifier.broadcast(&format!("{} now rules {}!", player, name));
                Ok(Reply::Done)
            }

            Command::Deposit { amount } => {
                if amount <= 0 {
                    return Err(ActionError::InvalidAmount(amount));
                }
                let name = self.actor_kingdom_name(actor)?;
                charge_exact(ledger, actor, amount)?;
                self.registry.kingdom_mut(&name)?.deposit(Some(actor), amount)?;
                let balance = self.registry.kingdom(&name)?.treasury;
                Ok(Reply::message(format!(
                    "Deposited {}. Treasury now holds {}.",
                    amount, balance
                )))
            }
            Command::Withdraw { amount } => {
                let name = self.actor_kingdom_name(actor)?;
                let kingdom = self.registry.kingdom(&name)?;
                if !kingdom.is_owner(actor) && kingdom.rank_of(actor) != Rank::Assistant {
                    return Err(ActionError::PermissionDenied("withdraw"));
                }
                self.registry.kingdom_mut(&name)?.withdraw(amount)?;
                ledger.deposit(actor, amount);
                Ok(Reply::message(format!("Withdrew {} from the treasury.", amount)))
            }

            Command::PersonalClaim => {
                let name = self.actor_kingdom_name(actor)?;
                let duration = self.config.personal_claim_duration_ms();
                let cost = self.config.personal_claim_cost;
                let kingdom = self.registry.kingdom(&name)?;
                if !kingdom.owns_region(at) {
                    return Err(ActionError::RegionNotOwned(at));
                }
                if kingdom.personal_claims.contains_key(&at) {
                    return Err(ActionError::AlreadyPersonallyClaimed(at));
                }
                if kingdom.personal_claim_count(actor) >= self.config.max_personal_claims {
                    return Err(ActionError::PersonalClaimLimit(self.config.max_personal_claims));
                }
                charge_exact(ledger, actor, cost)?;
                self.registry
                    .kingdom_mut(&name)?
                    .add_personal_claim(actor, at, now, duration)?;
                Ok(Reply::message(format!("Region {} is now personally yours.", at)))
            }
            Command::PersonalUnclaim => {
                let name = self.actor_kingdom_name(actor)?;
                self.registry
                    .kingdom_mut(&name)?
                    .remove_personal_claim(actor, at)?;
                Ok(Reply::message(format!("Personal claim on {} removed.", at)))
            }
            Command::PersonalTransfer { to } => {
                let name = self.actor_kingdom_name(actor)?;
                self.registry
                    .kingdom_mut(&name)?
                    .transfer_personal_claim(actor, at, &to)?;
                Ok(Reply::message(format!("Personal claim on {} given to {}.", at, to)))
            }

            Command::SetSetting { key, value } => {
                let name = self.actor_kingdom_name(actor)?;
                let kingdom = self.registry.kingdom_mut(&name)?;
                if !kingdom.is_owner(actor) && kingdom.rank_of(actor) != Rank::Assistant {
                    return Err(ActionError::PermissionDenied("settings"));
                }
                if !kingdom.settings.set(&key, value) {
                    return Err(ActionError::UnknownSetting(key));
                }
                Ok(Reply::message(format!("Setting {} is now {}.", key, value)))
            }

            Command::AddAlly { kingdom } => self.relation(actor, kingdom, RelationChange::AddAlly),
            Command::RemoveAlly { kingdom } => {
                self.relation(actor, kingdom, RelationChange::RemoveAlly)
            }
            Command::AddEnemy { kingdom } => {
                self.relation(actor, kingdom, RelationChange::AddEnemy)
            }
            Command::RemoveEnemy { kingdom } => {
                self.relation(actor, kingdom, RelationChange::RemoveEnemy)
            }

            Command::DeclareWar { kingdom } => {
                let id = self.wars.declare_war(
                    &mut self.registry,
                    actor,
                    &kingdom,
                    self.config.war_declaration_cost,
                    notifier,
                    now,
                )?;
                Ok(Reply::message(format!(
                    "War {} declared on {}. Hostilities begin in 48 hours.",
                    id, kingdom
                )))
            }
            Command::EndWar { war } => {
                self.wars.end_war_early(&mut self.registry, actor, war, notifier)?;
                Ok(Reply::message("The war is over."))
            }
            Command::Surrender { war } => {
                self.wars
                    .surrender(&mut self.registry, actor, war, notifier, now)?;
                Ok(Reply::message("You have surrendered."))
            }
            Command::ClaimFallen { war } => {
                self.wars
                    .claim_fallen_kingdom(&mut self.registry, actor, war, notifier)?;
                Ok(Reply::message("The fallen kingdom's spoils are yours."))
            }
            Command::Reclaim => {
                let name = self.actor_kingdom_name(actor)?;
                let cost = self.registry.kingdom_mut(&name)?.reclaim(actor, ledger, now)?;
                notifier.broadcast(&format!("{} has been reclaimed and stands once more!", name));
                Ok(Reply::message(format!("{} reclaimed for {}.", name, cost)))
            }

            Command::Info { kingdom } => {
                let name = match kingdom {
                    Some(name) => name,
                    None => self.actor_kingdom_name(actor)?,
                };
                Ok(Reply::Lines(self.describe_kingdom(&name)?))
            }
            Command::Here => Ok(Reply::Lines(self.describe_region(actor, at))),
            Command::ListWars => Ok(Reply::Lines(self.describe_wars(now))),
        }
    }

    fn relation(
        &mut self,
        actor: &str,
        other: KingdomName,
        change: RelationChange,
    ) -> Result<Reply, ActionError> {
        let name = self.actor_kingdom_name(actor)?;
        if name == other {
            return Err(ActionError::SelfRelation);
        }
        // The target must exist, except when severing a relation with a
        // kingdom that has since dissolved
        let severing = matches!(change, RelationChange::RemoveAlly | RelationChange::RemoveEnemy);
        if !severing {
            self.registry.kingdom(&other)?;
        }
        let kingdom = self.registry.kingdom_mut(&name)?;
        let text = match change {
            RelationChange::AddAlly => {
                kingdom.add_ally(actor, other.clone())?;
                format!("{} is now an ally.", other)
            }
            RelationChange::RemoveAlly => {
                kingdom.remove_ally(actor, &other)?;
                format!("{} is no longer an ally.", other)
            }
            RelationChange::AddEnemy => {
                kingdom.add_enemy(actor, other.clone())?;
                format!("{} is now an enemy.", other)
            }
            RelationChange::RemoveEnemy => {
                kingdom.remove_enemy(actor, &other)?;
                format!("{} is no longer an enemy.", other)
            }
        };
        Ok(Reply::Message(text))
    }

    fn actor_kingdom_name(&self, actor: &str) -> Result<KingdomName, ActionError> {
        self.registry
            .kingdom_name_of_player(actor)
            .ok_or_else(|| ActionError::NotAMember(actor.to_string()))
    }

    // ========================================================================
    // Query rendering
    // ========================================================================

    fn describe_kingdom(&self, name: &str) -> Result<Vec<String>, ActionError> {
        let kingdom = self.registry.kingdom(name)?;
        let mut lines = vec![
            format!("=== {} ===", kingdom.name),
            format!("Owner: {}", kingdom.owner),
            format!("Members: {}", kingdom.members.len()),
            format!(
                "Claims: {}/{} (home {})",
                kingdom.claim_count(),
                defines::MAX_CLAIMS,
                kingdom.home
            ),
            format!("Treasury: {}", kingdom.treasury),
            format!("Daily upkeep: {}", kingdom.daily_upkeep()),
        ];
        if !kingdom.allies.is_empty() {
            lines.push(format!(
                "Allies: {}",
                kingdom.allies.iter().cloned().collect::<Vec<_>>().join(", ")
            ));
        }
        if !kingdom.enemies.is_empty() {
            lines.push(format!(
                "Enemies: {}",
                kingdom.enemies.iter().cloned().collect::<Vec<_>>().join(", ")
            ));
        }
        if let Some(falling) = &kingdom.falling {
            lines.push(format!("FALLING since {} ({:?})", falling.started_at, falling.cause));
        }
        Ok(lines)
    }

    fn describe_region(&self, actor: &str, at: Region) -> Vec<String> {
        let mut lines = vec![format!("Region {}", at)];
        match self.registry.owner_of(at) {
            Some(kingdom) => {
                lines.push(format!("Claimed by {}", kingdom.name));
                lines.push(format!(
                    "Your standing: {}",
                    query::effective_rank(&self.registry, kingdom, actor)
                ));
                if let Some(claim) = kingdom.personal_claims.get(&at) {
                    lines.push(format!("Personally claimed by {}", claim.owner));
                }
            }
            None => lines.push("Wilderness".to_string()),
        }
        for ((war_id, region), progress) in &self.wars.captures {
            if *region == at {
                lines.push(format!(
                    "Contested in war {}: {:.0}% captured by {}",
                    war_id,
                    progress.percentage() * 100.0,
                    progress.capturing_kingdom
                ));
            }
        }
        lines
    }

    fn describe_wars(&self, now: UnixMillis) -> Vec<String> {
        let mut wars: Vec<_> = self.wars.wars.values().collect();
        wars.sort_by_key(|w| w.id);
        if wars.is_empty() {
            return vec!["The realm is at peace.".to_string()];
        }
        wars.iter()
            .map(|war| {
                let phase = if !war.active {
                    if war.attacker_victory {
                        "awaiting settlement"
                    } else {
                        "concluded"
                    }
                } else if war.in_grace_period(now) {
                    "grace period"
                } else {
                    "active"
                };
                format!(
                    "War {}: {} vs {} ({}, {} regions captured)",
                    war.id,
                    war.attacker,
                    war.defender,
                    phase,
                    war.captured_claims.len()
                )
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum RelationChange {
    AddAlly,
    RemoveAlly,
    AddEnemy,
    RemoveEnemy,
}
