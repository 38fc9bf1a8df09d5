use crate::state::Region;
use thiserror::Error;

/// Broad failure classes for host-side reporting.
///
/// Every [`ActionError`] maps to exactly one category; the engine
/// guarantees that a returned error left state unmutated (persistence
/// I/O is the one documented exception, see [`StorageError`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Authorization,
    Conflict,
    Resource,
    State,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    // Validation
    #[error("amount must be positive, got {0}")]
    InvalidAmount(i64),
    #[error("unknown rank '{0}'")]
    InvalidRank(String),
    #[error("no kingdom named '{0}'")]
    NoSuchKingdom(String),
    #[error("no war with id {0}")]
    NoSuchWar(u64),
    #[error("{0} is not a member of the kingdom")]
    NotAMember(String),
    #[error("no setting named '{0}'")]
    UnknownSetting(String),
    #[error("a kingdom cannot hold a relation with itself")]
    SelfRelation,

    // Authorization
    #[error("missing permission '{0}'")]
    PermissionDenied(&'static str),
    #[error("only the kingdom owner may do this")]
    OwnerOnly,
    #[error("cannot assign a rank higher than your own")]
    RankTooHigh,
    #[error("only the personal claim owner or kingdom leadership may do this")]
    NotPersonalClaimOwner,
    #[error("the owner cannot leave; delete the kingdom or transfer ownership")]
    OwnerCannotLeave,

    // Conflict
    #[error("region {0} is not adjacent to your territory")]
    NotAdjacent(Region),
    #[error("region {0} is already claimed")]
    AlreadyClaimed(Region),
    #[error("a kingdom named '{0}' already exists")]
    DuplicateName(String),
    #[error("{0} is already in a kingdom")]
    AlreadyInKingdom(String),
    #[error("{0} is already a member")]
    AlreadyMember(String),
    #[error("already at war with {0}")]
    AlreadyAtWar(String),
    #[error("region {0} already has a personal claim")]
    AlreadyPersonallyClaimed(Region),

    // Resource
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: i64, available: i64 },
    #[error("insufficient treasury: required {required}, available {available}")]
    InsufficientTreasury { required: i64, available: i64 },
    #[error("claim limit of {0} reached")]
    LimitExceeded(usize),
    #[error("personal claim limit of {0} reached")]
    PersonalClaimLimit(usize),

    // State
    #[error("region {0} is not owned by your kingdom")]
    RegionNotOwned(Region),
    #[error("region {0} has no personal claim")]
    NoPersonalClaim(Region),
    #[error("the home region {0} cannot be unclaimed")]
    HomeRegion(Region),
    #[error("no pending invitation")]
    NoPendingInvite,
    #[error("invitation has expired")]
    InviteExpired,
    #[error("no kingdom deletion pending")]
    NoPendingDeletion,
    #[error("deletion confirmation has expired")]
    DeletionExpired,
    #[error("{0} is not an enemy; declare them an enemy first")]
    NotAnEnemy(String),
    #[error("not at war with {0}")]
    NotAtWar(String),
    #[error("the war grace period is still active")]
    GracePeriodActive,
    #[error("region {0} has already been captured in this war")]
    AlreadyCaptured(Region),
    #[error("kingdom is not in the falling state")]
    NotFalling,
    #[error("the falling kingdom cannot be reclaimed by you yet")]
    ReclaimWindowClosed,
}

impl ActionError {
    pub fn category(&self) -> ErrorCategory {
        use ActionError::*;
        match self {
            InvalidAmount(_) | InvalidRank(_) | NoSuchKingdom(_) | NoSuchWar(_)
            | NotAMember(_) | UnknownSetting(_) | SelfRelation => ErrorCategory::Validation,
            PermissionDenied(_) | OwnerOnly | RankTooHigh | NotPersonalClaimOwner
            | OwnerCannotLeave => ErrorCategory::Authorization,
            NotAdjacent(_) | AlreadyClaimed(_) | DuplicateName(_) | AlreadyInKingdom(_)
            | AlreadyMember(_) | AlreadyAtWar(_) | AlreadyPersonallyClaimed(_) => {
                ErrorCategory::Conflict
            }
            InsufficientFunds { .. }
            | InsufficientTreasury { .. }
            | LimitExceeded(_)
            | PersonalClaimLimit(_) => ErrorCategory::Resource,
            RegionNotOwned(_) | NoPersonalClaim(_) | HomeRegion(_)
            | NoPendingInvite | InviteExpired
            | NoPendingDeletion | DeletionExpired | NotAnEnemy(_) | NotAtWar(_)
            | GracePeriodActive | AlreadyCaptured(_) | NotFalling | ReclaimWindowClosed => {
                ErrorCategory::State
            }
        }
    }
}

/// Persistence failures. Reported to the caller but never rolled back:
/// in-memory state stays authoritative and the host's save cycle retries.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed save document: {0}")]
    Format(#[from] serde_json::Error),
    #[error("unsupported save version {0}")]
    UnsupportedVersion(u32),
}
