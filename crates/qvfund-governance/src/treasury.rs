//! Treasury management for round budgets.
//!
//! Currency sent with `open_voting` is kept here, apart from the deposits
//! backing participant credits. Closing a round earmarks the funded amount;
//! the rest stays unallocated.

use qvfund_types::Currency;
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;

/// State of the voting round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingRound {
    /// Round number, 0 before the first round opens
    pub number: u64,
    /// Whether stakes are accepted
    pub is_open: bool,
    /// Currency allocated to the round
    pub budget: Currency,
}

/// Type of treasury transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    /// Round funding received
    Deposit,
    /// Funds earmarked for funded proposals
    Commit,
}

/// Treasury transaction record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryTransaction {
    /// Transaction type
    pub tx_type: TransactionType,
    /// Amount
    pub amount: Currency,
    /// Round the transaction belongs to
    pub round: u64,
}

/// Treasury balance and the current round.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Treasury {
    /// Total currency held
    pub balance: Currency,
    /// Earmarked for funded proposals, awaiting disbursement
    pub committed: Currency,
    /// Current or last round
    pub round: VotingRound,
    /// Transaction history
    pub transactions: Vec<TreasuryTransaction>,
}

impl Treasury {
    /// Create an empty treasury.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.round.is_open
    }

    /// Get available balance (not committed).
    pub fn available_balance(&self) -> Currency {
        self.balance - self.committed
    }

    /// Open a new round funded with `amount`.
    pub fn open_round(&mut self, amount: Currency) -> Result<&VotingRound, GovernanceError> {
        if amount == 0 {
            return Err(GovernanceError::FundingRequired);
        }
        if self.round.is_open {
            return Err(GovernanceError::AlreadyOpen);
        }
        let balance = self.balance.checked_add(amount).ok_or(GovernanceError::Overflow)?;

        self.balance = balance;
        self.round = VotingRound {
            number: self.round.number + 1,
            is_open: true,
            budget: amount,
        };
        self.transactions.push(TreasuryTransaction {
            tx_type: TransactionType::Deposit,
            amount,
            round: self.round.number,
        });
        Ok(&self.round)
    }

    /// Close the open round, earmarking `committed`. Returns the unspent budget.
    pub fn close_round(&mut self, committed: Currency) -> Result<Currency, GovernanceError> {
        if !self.round.is_open {
            return Err(GovernanceError::VotingNotOpen);
        }
        if committed > self.round.budget {
            return Err(GovernanceError::InvalidAllocation(format!(
                "committed {} exceeds budget {}",
                committed, self.round.budget
            )));
        }

        self.committed += committed;
        self.round.is_open = false;
        if committed > 0 {
            self.transactions.push(TreasuryTransaction {
                tx_type: TransactionType::Commit,
                amount: committed,
                round: self.round.number,
            });
        }
        Ok(self.round.budget - committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_round() {
        let mut treasury = Treasury::new();
        let round = *treasury.open_round(1_000).unwrap();

        assert_eq!(round, VotingRound { number: 1, is_open: true, budget: 1_000 });
        assert_eq!(treasury.balance, 1_000);
        assert_eq!(treasury.transactions.len(), 1);
    }

    #[test]
    fn test_open_requires_funding() {
        let mut treasury = Treasury::new();
        assert_eq!(treasury.open_round(0).unwrap_err(), GovernanceError::FundingRequired);
        assert!(!treasury.is_open());
    }

    #[test]
    fn test_open_twice_keeps_first_budget() {
        let mut treasury = Treasury::new();
        treasury.open_round(1_000).unwrap();

        assert_eq!(treasury.open_round(500).unwrap_err(), GovernanceError::AlreadyOpen);
        assert_eq!(treasury.round.budget, 1_000);
        assert_eq!(treasury.balance, 1_000);
    }

    #[test]
    fn test_close_round() {
        let mut treasury = Treasury::new();
        treasury.open_round(1_000).unwrap();

        let leftover = treasury.close_round(300).unwrap();
        assert_eq!(leftover, 700);
        assert_eq!(treasury.committed, 300);
        assert_eq!(treasury.available_balance(), 700);
        assert!(!treasury.is_open());
    }

    #[test]
    fn test_close_round_errors() {
        let mut treasury = Treasury::new();
        assert_eq!(treasury.close_round(0).unwrap_err(), GovernanceError::VotingNotOpen);

        treasury.open_round(100).unwrap();
        assert!(matches!(
            treasury.close_round(101).unwrap_err(),
            GovernanceError::InvalidAllocation(_)
        ));
        assert!(treasury.is_open());
    }

    #[test]
    fn test_reopen_after_close() {
        let mut treasury = Treasury::new();
        treasury.open_round(100).unwrap();
        treasury.close_round(0).unwrap();

        let round = *treasury.open_round(50).unwrap();
        assert_eq!(round.number, 2);
        assert_eq!(round.budget, 50);
        assert_eq!(treasury.balance, 150);
    }
}
