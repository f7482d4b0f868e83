//! Participant registry.
//!
//! Credits are bought and sold at a fixed price, so every credit a participant
//! holds maps to exactly `credit_price` of deposited currency and refunds are
//! lossless:
//!
//! `deposited == balance_of(participant) * credit_price`

use std::collections::HashMap;

use qvfund_types::{credits_for, currency_for, Address, Credits, Currency};
use serde::{Deserialize, Serialize};

use crate::credits::CreditLedger;
use crate::error::LedgerError;

/// Registry record of a participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Currency paid for the credits currently held
    pub deposited: Currency,
}

/// Read-only view of a participant and its credit split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub address: Address,
    pub free: Credits,
    pub locked: Credits,
    pub deposited: Currency,
}

/// Outcome of a credit purchase (registration or top-up).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    /// Credits minted to the buyer
    pub credits_minted: Credits,
    /// Unspent currency the caller must refund
    pub refund: Currency,
}

/// Outcome of a credit redemption (sale or deregistration).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redemption {
    /// Credits burned
    pub credits_burned: Credits,
    /// Currency owed to the seller
    pub payout: Currency,
}

/// Tracks registered identities on top of the credit ledger.
#[derive(Debug, Clone)]
pub struct ParticipantRegistry {
    credit_price: Currency,
    ledger: CreditLedger,
    participants: HashMap<Address, Participant>,
}

impl ParticipantRegistry {
    /// `credit_price` must be non-zero; callers validate their config first.
    pub fn new(credit_price: Currency, max_credits: Credits) -> Self {
        Self {
            credit_price,
            ledger: CreditLedger::new(max_credits),
            participants: HashMap::new(),
        }
    }

    pub fn credit_price(&self) -> Currency {
        self.credit_price
    }

    pub fn ledger(&self) -> &CreditLedger {
        &self.ledger
    }

    pub fn count(&self) -> usize {
        self.participants.len()
    }

    pub fn is_participant(&self, address: &Address) -> bool {
        self.participants.contains_key(address)
    }

    pub fn get(&self, address: &Address) -> Option<ParticipantInfo> {
        self.participants.get(address).map(|p| ParticipantInfo {
            address: *address,
            free: self.ledger.free_balance_of(address),
            locked: self.ledger.locked_balance_of(address),
            deposited: p.deposited,
        })
    }

    pub fn free_balance(&self, address: &Address) -> Result<Credits, LedgerError> {
        self.ensure_participant(address)?;
        Ok(self.ledger.free_balance_of(address))
    }

    pub fn locked_balance(&self, address: &Address) -> Result<Credits, LedgerError> {
        self.ensure_participant(address)?;
        Ok(self.ledger.locked_balance_of(address))
    }

    /// Register `address`, buying as many credits as `paid` covers.
    pub fn register(&mut self, address: Address, paid: Currency) -> Result<Purchase, LedgerError> {
        if self.is_participant(&address) {
            return Err(LedgerError::AlreadyRegistered(address));
        }

        let (credits, refund, cost) = self.quote(paid)?;
        self.ledger.mint(address, credits)?;
        self.participants.insert(address, Participant { deposited: cost });

        tracing::debug!("Registered {} with {} credits", address, credits);
        Ok(Purchase { credits_minted: credits, refund })
    }

    /// Remove `address`, burning its credits and returning its full deposit.
    pub fn deregister(&mut self, address: Address) -> Result<Redemption, LedgerError> {
        let deposited = self.participant(&address)?.deposited;
        let locked = self.ledger.locked_balance_of(&address);
        if locked > 0 {
            return Err(LedgerError::CreditsLocked(locked));
        }

        let credits = self.ledger.free_balance_of(&address);
        self.ledger.burn(address, credits)?;
        self.participants.remove(&address);

        tracing::debug!("Deregistered {}, burned {} credits", address, credits);
        Ok(Redemption { credits_burned: credits, payout: deposited })
    }

    /// Buy more credits for an existing participant.
    pub fn buy_more(&mut self, address: Address, paid: Currency) -> Result<Purchase, LedgerError> {
        let deposited = self.participant(&address)?.deposited;

        let (credits, refund, cost) = self.quote(paid)?;
        let deposited = deposited.checked_add(cost).ok_or(LedgerError::Overflow)?;
        self.ledger.mint(address, credits)?;
        self.participant_mut(&address)?.deposited = deposited;

        Ok(Purchase { credits_minted: credits, refund })
    }

    /// Sell `amount` free credits back at the fixed price.
    pub fn sell(&mut self, address: Address, amount: Credits) -> Result<Redemption, LedgerError> {
        let deposited = self.participant(&address)?.deposited;
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let free = self.ledger.free_balance_of(&address);
        if amount > free {
            return Err(LedgerError::LockedCreditsExceeded { free, requested: amount });
        }

        let payout = currency_for(amount, self.credit_price).ok_or(LedgerError::Overflow)?;
        // Deposit tracks balance * price, so it always covers the payout.
        let deposited = deposited.checked_sub(payout).ok_or(LedgerError::Overflow)?;
        self.ledger.burn(address, amount)?;
        self.participant_mut(&address)?.deposited = deposited;

        Ok(Redemption { credits_burned: amount, payout })
    }

    /// Move free credits of a participant into custody.
    pub fn lock(&mut self, address: Address, amount: Credits) -> Result<(), LedgerError> {
        self.ensure_participant(&address)?;
        self.ledger.transfer_to_custody(address, amount)
    }

    /// Release credits of a participant from custody.
    pub fn unlock(&mut self, address: Address, amount: Credits) -> Result<(), LedgerError> {
        self.ensure_participant(&address)?;
        self.ledger.transfer_from_custody(address, amount)
    }

    /// Price a payment: `(credits, refund, cost)` with `cost + refund == paid`.
    fn quote(&self, paid: Currency) -> Result<(Credits, Currency, Currency), LedgerError> {
        let (credits, refund) = credits_for(paid, self.credit_price).ok_or(LedgerError::Overflow)?;
        if credits == 0 {
            return Err(LedgerError::InsufficientPayment { paid, price: self.credit_price });
        }
        let cost = currency_for(credits, self.credit_price).ok_or(LedgerError::Overflow)?;
        self.ledger.ensure_mintable(credits)?;
        Ok((credits, refund, cost))
    }

    fn ensure_participant(&self, address: &Address) -> Result<(), LedgerError> {
        self.participant(address).map(|_| ())
    }

    fn participant(&self, address: &Address) -> Result<&Participant, LedgerError> {
        self.participants
            .get(address)
            .ok_or(LedgerError::NotAParticipant(*address))
    }

    fn participant_mut(&mut self, address: &Address) -> Result<&mut Participant, LedgerError> {
        self.participants
            .get_mut(address)
            .ok_or(LedgerError::NotAParticipant(*address))
    }
}
