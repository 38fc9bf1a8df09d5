//! Rank hierarchy and the static rank -> permission matrix.
//!
//! Ranks form a fixed total order; the matrix is compiled in and not
//! configurable per kingdom. Leaders implicitly hold every permission.

use serde::{Deserialize, Serialize};

use crate::error::ActionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Outsider,
    Ally,
    Member,
    Officer,
    Assistant,
    Leader,
}

/// Actions gated by rank. Build/interact permissions are consumed by the
/// host's protection layer through [`crate::query`]; the rest gate engine
/// operations directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Build,
    Destroy,
    Switch,
    Container,
    Door,
    Claim,
    Unclaim,
    Invite,
    Kick,
    SetHome,
    ManageRanks,
    Promote,
}

impl Rank {
    /// Numeric authority level; higher outranks lower.
    pub fn power(self) -> u8 {
        match self {
            Rank::Leader => 5,
            Rank::Assistant => 4,
            Rank::Officer => 3,
            Rank::Member => 2,
            Rank::Ally => 1,
            Rank::Outsider => 0,
        }
    }

    pub fn allows(self, permission: Permission) -> bool {
        use Permission::*;
        match self {
            Rank::Leader => true,
            Rank::Assistant => matches!(
                permission,
                Build
                    | Destroy
                    | Switch
                    | Container
                    | Door
                    | Claim
                    | Unclaim
                    | Invite
                    | Kick
                    | SetHome
                    | ManageRanks
                    | Promote
            ),
            Rank::Officer => matches!(
                permission,
                Build | Destroy | Switch | Container | Door | Claim | Invite | Kick
            ),
            Rank::Member => matches!(permission, Switch | Container | Door),
            Rank::Ally => matches!(permission, Switch | Door),
            Rank::Outsider => false,
        }
    }

    pub fn all() -> [Rank; 6] {
        [
            Rank::Leader,
            Rank::Assistant,
            Rank::Officer,
            Rank::Member,
            Rank::Ally,
            Rank::Outsider,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            Rank::Leader => "leader",
            Rank::Assistant => "assistant",
            Rank::Officer => "officer",
            Rank::Member => "member",
            Rank::Ally => "ally",
            Rank::Outsider => "outsider",
        }
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Rank {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "leader" => Ok(Rank::Leader),
            "assistant" => Ok(Rank::Assistant),
            "officer" => Ok(Rank::Officer),
            "member" => Ok(Rank::Member),
            "ally" => Ok(Rank::Ally),
            "outsider" => Ok(Rank::Outsider),
            other => Err(ActionError::InvalidRank(other.to_string())),
        }
    }
}

impl Permission {
    pub fn name(self) -> &'static str {
        use Permission::*;
        match self {
            Build => "build",
            Destroy => "destroy",
            Switch => "switch",
            Container => "container",
            Door => "door",
            Claim => "claim",
            Unclaim => "unclaim",
            Invite => "invite",
            Kick => "kick",
            SetHome => "set_home",
            ManageRanks => "manage_ranks",
            Promote => "promote",
        }
    }
}
