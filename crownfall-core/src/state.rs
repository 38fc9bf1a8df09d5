use serde::{Deserialize, Serialize};

use crate::defines;

/// Stable opaque player identity. Resolution to a display name or live
/// session is the host's concern.
pub type PlayerId = String;

/// Kingdom primary key.
pub type KingdomName = String;

pub type WarId = u64;

/// UNIX epoch milliseconds. The engine never reads the wall clock;
/// every timed operation takes `now` explicitly.
pub type UnixMillis = i64;

/// A fixed-size world cell, the atomic unit of ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub z: i32,
}

impl Region {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn manhattan_distance(&self, other: Region) -> u32 {
        self.x.abs_diff(other.x) + self.z.abs_diff(other.z)
    }

    /// Direct N/S/E/W neighbour check; diagonals do not count.
    pub fn is_adjacent(&self, other: Region) -> bool {
        self.manhattan_distance(other) == 1
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// A member-level ownership annotation on a region the kingdom already
/// owns. Grants the owner exclusive build rights inside that region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalClaim {
    pub owner: PlayerId,
    pub region: Region,
    pub created_at: UnixMillis,
    /// `None` for permanent claims.
    #[serde(default)]
    pub expires_at: Option<UnixMillis>,
}

impl PersonalClaim {
    pub fn new(owner: PlayerId, region: Region, created_at: UnixMillis) -> Self {
        Self {
            owner,
            region,
            created_at,
            expires_at: None,
        }
    }

    pub fn is_expired(&self, now: UnixMillis) -> bool {
        matches!(self.expires_at, Some(t) if now > t)
    }
}

/// Why a kingdom entered the falling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallingCause {
    /// Upkeep could not be paid; dissolves if never reclaimed.
    UnpaidUpkeep,
    /// Home region captured or surrender; awaits the victor's claim.
    Conquest { war: WarId },
}

/// Active falling record. Cleared on reclaim, dissolution, or conquest
/// transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallingState {
    pub started_at: UnixMillis,
    pub cause: FallingCause,
    #[serde(default)]
    pub reclaimed_by: Option<PlayerId>,
}

/// A timed conflict record between two kingdoms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct War {
    pub id: WarId,
    pub attacker: KingdomName,
    pub defender: KingdomName,
    pub declared_at: UnixMillis,
    pub grace_period_end: UnixMillis,
    pub active: bool,
    /// Regions taken from the defender so far, in capture order.
    pub captured_claims: Vec<Region>,
    /// Defender home snapshotted at declaration; captures are judged
    /// against this even if the defender later moves home.
    pub defender_home: Region,
    #[serde(default)]
    pub attacker_victory: bool,
    #[serde(default)]
    pub defender_surrendered: bool,
}

impl War {
    pub fn new(
        id: WarId,
        attacker: KingdomName,
        defender: KingdomName,
        defender_home: Region,
        now: UnixMillis,
    ) -> Self {
        Self {
            id,
            attacker,
            defender,
            declared_at: now,
            grace_period_end: now + defines::WAR_GRACE_PERIOD_MS,
            active: true,
            captured_claims: Vec::new(),
            defender_home,
            attacker_victory: false,
            defender_surrendered: false,
        }
    }

    pub fn in_grace_period(&self, now: UnixMillis) -> bool {
        now < self.grace_period_end
    }

    pub fn involves(&self, a: &str, b: &str) -> bool {
        (self.attacker == a && self.defender == b) || (self.attacker == b && self.defender == a)
    }

    pub fn home_captured(&self) -> bool {
        self.captured_claims.contains(&self.defender_home)
    }
}

/// Real-time contest accumulator for one region in one war. Exists only
/// while the region is contested; progress pauses (never decays) when no
/// eligible occupant is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureProgress {
    pub region: Region,
    pub capturing_kingdom: KingdomName,
    pub started_at: UnixMillis,
    pub accumulated_ms: i64,
    /// Timestamp of the last tick that advanced or paused this entry.
    pub last_advance: UnixMillis,
}

impl CaptureProgress {
    pub fn new(region: Region, capturing_kingdom: KingdomName, now: UnixMillis) -> Self {
        Self {
            region,
            capturing_kingdom,
            started_at: now,
            accumulated_ms: 0,
            last_advance: now,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.accumulated_ms >= defines::CAPTURE_THRESHOLD_MS
    }

    /// Fraction in `0.0..=1.0` for progress display.
    pub fn percentage(&self) -> f64 {
        (self.accumulated_ms as f64 / defines::CAPTURE_THRESHOLD_MS as f64).min(1.0)
    }
}

/// Ephemeral invitation, keyed by the invited player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingInvite {
    pub kingdom: KingdomName,
    pub invited_by: PlayerId,
    pub expires_at: UnixMillis,
}

impl PendingInvite {
    pub fn is_expired(&self, now: UnixMillis) -> bool {
        now > self.expires_at
    }
}

/// Ephemeral deletion confirmation, keyed by the requesting owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingDeletion {
    pub kingdom: KingdomName,
    pub expires_at: UnixMillis,
}

impl PendingDeletion {
    pub fn is_expired(&self, now: UnixMillis) -> bool {
        now > self.expires_at
    }
}
