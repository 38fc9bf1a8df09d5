//! Currency ledger capability interface.
//!
//! The engine treats all amounts as integers in a single base unit
//! ("bronze"). A production host bridges this trait to whatever economy
//! system is present; [`MemoryLedger`] is the stub adapter used by tests
//! and the standalone host.

use std::collections::HashMap;

use crate::error::ActionError;
use crate::state::PlayerId;

pub trait CurrencyLedger {
    fn balance(&self, player: &str) -> i64;

    /// Removes up to `amount`, returning what was actually removed.
    /// Implementations backed by physical denominations may over-remove;
    /// callers use [`charge_exact`] to settle change.
    fn withdraw(&mut self, player: &str, amount: i64) -> i64;

    fn deposit(&mut self, player: &str, amount: i64);
}

/// Charges exactly `amount` from `player`, or changes nothing.
///
/// Overpayment is refunded in full; a shortfall is returned to the
/// player and reported as `InsufficientFunds`.
pub fn charge_exact(
    ledger: &mut dyn CurrencyLedger,
    player: &str,
    amount: i64,
) -> Result<(), ActionError> {
    if amount == 0 {
        return Ok(());
    }
    let available = ledger.balance(player);
    if available < amount {
        return Err(ActionError::InsufficientFunds {
            required: amount,
            available,
        });
    }

    let taken = ledger.withdraw(player, amount);
    if taken > amount {
        ledger.deposit(player, taken - amount);
    } else if taken < amount {
        // Balance changed under us or the backend shorted the payment;
        // give back what was taken and fail cleanly.
        ledger.deposit(player, taken);
        return Err(ActionError::InsufficientFunds {
            required: amount,
            available: taken,
        });
    }
    Ok(())
}

/// In-memory ledger for tests and the standalone host.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    balances: HashMap<PlayerId, i64>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(mut self, player: &str, amount: i64) -> Self {
        self.balances.insert(player.to_string(), amount);
        self
    }
}

impl CurrencyLedger for MemoryLedger {
    fn balance(&self, player: &str) -> i64 {
        self.balances.get(player).copied().unwrap_or(0)
    }

    fn withdraw(&mut self, player: &str, amount: i64) -> i64 {
        let balance = self.balances.entry(player.to_string()).or_insert(0);
        let taken = amount.min(*balance).max(0);
        *balance -= taken;
        taken
    }

    fn deposit(&mut self, player: &str, amount: i64) {
        if amount > 0 {
            *self.balances.entry(player.to_string()).or_insert(0) += amount;
        }
    }
}
