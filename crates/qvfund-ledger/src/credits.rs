//! Capped fungible credit ledger.
//!
//! Every credit is owned by exactly one identity. Owned credits sit either in
//! the holder's wallet (free) or in custody (locked by staking). Custody is
//! still counted in the holder's balance and in the total supply.

use std::collections::HashMap;

use qvfund_types::{Address, Credits};

use crate::error::LedgerError;

/// Credit ledger state.
#[derive(Debug, Clone)]
pub struct CreditLedger {
    /// Immutable supply cap
    max_credits: Credits,
    /// Sum of all wallet and custody balances
    total_supply: Credits,
    /// Free balances (O(1) lookup)
    wallets: HashMap<Address, Credits>,
    /// Credits held in custody on behalf of their owner
    custody: HashMap<Address, Credits>,
}

impl CreditLedger {
    /// Create an empty ledger with the given supply cap.
    pub fn new(max_credits: Credits) -> Self {
        Self {
            max_credits,
            total_supply: 0,
            wallets: HashMap::new(),
            custody: HashMap::new(),
        }
    }

    pub fn max_credits(&self) -> Credits {
        self.max_credits
    }

    pub fn total_supply(&self) -> Credits {
        self.total_supply
    }

    /// Credits that can still be minted before hitting the cap.
    pub fn available_supply(&self) -> Credits {
        self.max_credits.saturating_sub(self.total_supply)
    }

    /// Total credits owned by `address`, free and locked.
    pub fn balance_of(&self, address: &Address) -> Credits {
        self.free_balance_of(address) + self.locked_balance_of(address)
    }

    pub fn free_balance_of(&self, address: &Address) -> Credits {
        self.wallets.get(address).copied().unwrap_or(0)
    }

    pub fn locked_balance_of(&self, address: &Address) -> Credits {
        self.custody.get(address).copied().unwrap_or(0)
    }

    /// Sum over every holder. Equals `total_supply` at all times.
    pub fn sum_of_balances(&self) -> Credits {
        self.wallets.values().chain(self.custody.values()).sum()
    }

    /// Check that `amount` more credits fit under the cap.
    pub fn ensure_mintable(&self, amount: Credits) -> Result<Credits, LedgerError> {
        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        if new_supply > self.max_credits {
            return Err(LedgerError::CapExceeded {
                requested: amount,
                available: self.available_supply(),
            });
        }
        Ok(new_supply)
    }

    /// Mint new credits into the free balance of `address`.
    pub fn mint(&mut self, address: Address, amount: Credits) -> Result<(), LedgerError> {
        let new_supply = self.ensure_mintable(amount)?;
        let new_balance = self
            .free_balance_of(&address)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        Self::update(&mut self.wallets, address, new_balance);
        self.total_supply = new_supply;
        Ok(())
    }

    /// Destroy credits from the free balance of `address`.
    pub fn burn(&mut self, address: Address, amount: Credits) -> Result<(), LedgerError> {
        let free = self.free_balance_of(&address);
        if free < amount {
            return Err(LedgerError::InsufficientBalance { have: free, need: amount });
        }

        Self::update(&mut self.wallets, address, free - amount);
        self.total_supply -= amount;
        Ok(())
    }

    /// Move credits from the holder's wallet into custody.
    pub fn transfer_to_custody(&mut self, address: Address, amount: Credits) -> Result<(), LedgerError> {
        let free = self.free_balance_of(&address);
        if free < amount {
            return Err(LedgerError::InsufficientBalance { have: free, need: amount });
        }
        let locked = self
            .locked_balance_of(&address)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        Self::update(&mut self.wallets, address, free - amount);
        Self::update(&mut self.custody, address, locked);
        Ok(())
    }

    /// Return credits from custody to the holder's wallet.
    pub fn transfer_from_custody(&mut self, address: Address, amount: Credits) -> Result<(), LedgerError> {
        let locked = self.locked_balance_of(&address);
        if locked < amount {
            return Err(LedgerError::InsufficientLocked { have: locked, need: amount });
        }
        let free = self
            .free_balance_of(&address)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        Self::update(&mut self.custody, address, locked - amount);
        Self::update(&mut self.wallets, address, free);
        Ok(())
    }

    // Zero balances are dropped so the maps only hold live holders.
    fn update(map: &mut HashMap<Address, Credits>, address: Address, value: Credits) {
        if value == 0 {
            map.remove(&address);
        } else {
            map.insert(address, value);
        }
    }
}
