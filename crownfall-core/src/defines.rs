//! Fixed engine constants.
//!
//! Values a server operator is expected to tune live in
//! [`EngineConfig`](crate::config::EngineConfig) instead.

/// Maximum number of regions a kingdom may claim.
pub const MAX_CLAIMS: usize = 25;

/// Flat fee (bronze) for every claim after a kingdom's first.
pub const CLAIM_COST: i64 = 1000;

/// Accumulated contest time required to capture a region.
pub const CAPTURE_THRESHOLD_MS: i64 = 120_000;

/// Delay between war declaration and the first permitted capture.
pub const WAR_GRACE_PERIOD_MS: i64 = 48 * 60 * 60 * 1000;

/// Lifetime of a pending membership invitation.
pub const INVITE_TTL_MS: i64 = 5 * 60 * 1000;

/// Window in which a kingdom deletion must be confirmed.
pub const DELETION_TTL_MS: i64 = 30 * 1000;

/// While falling, only the owner may reclaim during this initial window.
pub const FALLING_OWNER_WINDOW_MS: i64 = 12 * 60 * 60 * 1000;

/// A kingdom still falling this long after entry is dissolved (upkeep
/// falls) or the conquest lapses (war falls).
pub const FALLING_DISSOLVE_MS: i64 = 24 * 60 * 60 * 1000;

/// Share of the defender treasury transferred on conquest, in percent.
pub const CONQUEST_TREASURY_PERCENT: i64 = 50;

/// Time between upkeep collections for a kingdom.
pub const UPKEEP_INTERVAL_MS: i64 = 24 * 60 * 60 * 1000;
