//! Builders for tests that need a populated world without walking
//! through the full command flow.

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::kingdom::Kingdom;
use crate::rank::Rank;
use crate::registry::TerritoryRegistry;
use crate::state::{Region, UnixMillis};
use crate::war::WarEngine;

pub struct WorldBuilder {
    registry: TerritoryRegistry,
    wars: WarEngine,
    config: EngineConfig,
}

impl WorldBuilder {
    pub fn new() -> Self {
        Self {
            registry: TerritoryRegistry::new(),
            wars: WarEngine::new(),
            config: EngineConfig::default(),
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds a kingdom with its home claimed, bypassing fees.
    pub fn with_kingdom(mut self, name: &str, owner: &str, home: Region) -> Self {
        let kingdom = Kingdom::new(name.to_string(), owner.to_string(), home, 0);
        self.registry.claimed.insert(home, name.to_string());
        self.registry.kingdoms.insert(name.to_string(), kingdom);
        self
    }

    /// Adds a claim directly, bypassing fees and adjacency.
    pub fn with_claim(mut self, kingdom: &str, region: Region) -> Self {
        self.registry.claimed.insert(region, kingdom.to_string());
        if let Some(k) = self.registry.kingdoms.get_mut(kingdom) {
            k.add_claim(region);
        }
        self
    }

    pub fn with_member(mut self, kingdom: &str, player: &str, rank: Rank) -> Self {
        if let Some(k) = self.registry.kingdoms.get_mut(kingdom) {
            k.members.insert(player.to_string(), rank);
        }
        self
    }

    pub fn with_treasury(mut self, kingdom: &str, amount: i64) -> Self {
        if let Some(k) = self.registry.kingdoms.get_mut(kingdom) {
            k.treasury = amount;
        }
        self
    }

    /// Marks `enemy` as an enemy of `kingdom` (one-sided, like the real
    /// operation).
    pub fn with_enemy(mut self, kingdom: &str, enemy: &str) -> Self {
        if let Some(k) = self.registry.kingdoms.get_mut(kingdom) {
            k.enemies.insert(enemy.to_string());
        }
        self
    }

    /// Starts a war directly, skipping the enemy check and treasury fee.
    pub fn with_war(mut self, attacker: &str, defender: &str, declared_at: UnixMillis) -> Self {
        let home = self
            .registry
            .kingdoms
            .get(defender)
            .map(|k| k.home)
            .unwrap_or(Region::new(0, 0));
        let id = self.wars.next_war_id;
        self.wars.next_war_id += 1;
        self.wars.wars.insert(
            id,
            crate::state::War::new(id, attacker.to_string(), defender.to_string(), home, declared_at),
        );
        self
    }

    pub fn build(self) -> (TerritoryRegistry, WarEngine) {
        (self.registry, self.wars)
    }

    pub fn build_engine(self) -> Engine {
        Engine::from_parts(self.registry, self.wars, self.config)
    }
}

impl Default for WorldBuilder {
    fn default() -> Self {
        Self::new()
    }
}
