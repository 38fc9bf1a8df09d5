//! Player-issued commands and their replies.
//!
//! A command is always executed for an actor standing in a concrete
//! region; operations that act "here" (claiming, personal claims, home)
//! use that region. Parsing text into commands is the host's job.

use serde::{Deserialize, Serialize};

use crate::rank::Rank;
use crate::state::{KingdomName, PlayerId, WarId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    // Lifecycle
    CreateKingdom { name: KingdomName },
    RequestDelete,
    ConfirmDelete,

    // Territory, acting on the actor's current region
    Claim,
    Unclaim,
    SetHome,

    // Membership
    Invite { player: PlayerId },
    AcceptInvite,
    DeclineInvite,
    Leave,
    Kick { player: PlayerId },
    SetRank { player: PlayerId, rank: Rank },
    TransferOwnership { player: PlayerId },

    // Treasury
    Deposit { amount: i64 },
    Withdraw { amount: i64 },

    // Personal claims, acting on the actor's current region
    PersonalClaim,
    PersonalUnclaim,
    PersonalTransfer { to: PlayerId },

    // Settings
    SetSetting { key: String, value: bool },

    // Diplomacy
    AddAlly { kingdom: KingdomName },
    RemoveAlly { kingdom: KingdomName },
    AddEnemy { kingdom: KingdomName },
    RemoveEnemy { kingdom: KingdomName },

    // War
    DeclareWar { kingdom: KingdomName },
    EndWar { war: WarId },
    Surrender { war: WarId },
    ClaimFallen { war: WarId },
    Reclaim,

    // Queries
    Info { kingdom: Option<KingdomName> },
    Here,
    ListWars,
}

/// Successful command outcome, rendered by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Done,
    Message(String),
    Lines(Vec<String>),
}

impl Reply {
    pub fn message(text: impl Into<String>) -> Self {
        Reply::Message(text.into())
    }
}
