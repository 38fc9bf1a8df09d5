//! # Crownfall Core
//!
//! Territory ownership and inter-kingdom conflict engine.
//!
//! Players found kingdoms, claim contiguous regions of a gridded world,
//! pool money in a shared treasury that pays daily upkeep, and fight
//! real-time wars in which standing on enemy ground long enough
//! captures it. A kingdom that loses its home, surrenders, or cannot
//! pay its upkeep enters a falling state with a timed path to either
//! reclamation or dissolution.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ Host (cmds,  │────▶│  EngineTask  │────▶│ Engine        │
//! │ timers)      │     │  (channel)   │     │ (single owner)│
//! └──────────────┘     └──────────────┘     └───────┬───────┘
//!                                                   │
//!                      ┌──────────────┐     ┌───────▼───────┐
//!                      │  Notifier    │◀────│ Registry +    │
//!                      │  (side fx)   │     │ WarEngine     │
//!                      └──────────────┘     └───────────────┘
//! ```
//!
//! All mutation funnels through one authority thread draining
//! [`EngineTask`]s; the engine itself never reads the wall clock, every
//! timed operation takes `now` explicitly.
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Engine`] | Facade owning all state, drains [`EngineTask`]s |
//! | [`TerritoryRegistry`] | Kingdoms, the region index, invites |
//! | [`Kingdom`] | One kingdom: members, claims, treasury, diplomacy |
//! | [`WarEngine`] | Wars and capture progress |
//! | [`Command`] | Player actions (claim, invite, declare war, ...) |
//! | [`CurrencyLedger`] | Host-provided player balance backend |
//! | [`Notifier`] | Host-provided message sink |
//!
//! Protection decisions (build, interact, pvp, world toggles) are pure
//! reads in [`query`]; the periodic passes (capture advancement, upkeep)
//! live in [`systems`].

pub mod config;
pub mod defines;
pub mod engine;
pub mod error;
pub mod input;
pub mod kingdom;
pub mod ledger;
pub mod notify;
pub mod persist;
pub mod query;
pub mod rank;
pub mod registry;
pub mod settings;
pub mod state;
pub mod systems;
pub mod testing;
pub mod war;

pub use config::{EngineConfig, UpkeepPolicy};
pub use engine::{Engine, EngineTask};
pub use error::{ActionError, ErrorCategory, StorageError};
pub use input::{Command, Reply};
pub use kingdom::{Kingdom, Relation};
pub use ledger::{charge_exact, CurrencyLedger, MemoryLedger};
pub use notify::{Notifier, NullNotifier, RecordingNotifier};
pub use persist::{load_from_path, save_to_path, SaveFile};
pub use rank::{Permission, Rank};
pub use registry::TerritoryRegistry;
pub use settings::Settings;
pub use state::{
    CaptureProgress, FallingCause, FallingState, KingdomName, PendingDeletion, PendingInvite,
    PersonalClaim, PlayerId, Region, UnixMillis, War, WarId,
};
pub use systems::{run_capture_tick, run_upkeep_tick, Occupant};
pub use war::WarEngine;
