//! Quadratic vote pricing and the stake book.
//!
//! Staking `v` votes in one call costs `v^2` credits. Each call is priced on
//! its own and recorded as a lot; withdrawals consume the newest lot first.

use std::collections::HashMap;

use qvfund_types::{Address, Credits, ProposalId};

use crate::error::GovernanceError;

/// Vote count.
pub type Votes = u128;

/// Calculate cost for quadratic voting.
///
/// In quadratic voting, cost = votes^2 (not linear).
/// This ensures that expressing strong preferences is more expensive.
pub fn quadratic_cost(votes: Votes) -> Option<Credits> {
    votes.checked_mul(votes)
}

/// Integer square root using Newton's method.
/// Returns floor(sqrt(n)).
pub fn integer_sqrt(n: u128) -> u128 {
    if n <= 1 {
        return n;
    }

    let mut x = n;
    let mut y = x / 2 + 1;

    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }

    x
}

/// Calculate maximum votes a single stake can buy with `budget` credits.
///
/// Returns floor(sqrt(budget)).
pub fn max_votes_from_budget(budget: Credits) -> Votes {
    integer_sqrt(budget)
}

/// Credits returned when `k` votes are withdrawn from a lot of `n` votes.
fn partial_refund(n: Votes, k: Votes) -> Credits {
    let keep = n - k;
    n * n - keep * keep
}

/// One priced stake call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakeLot {
    pub votes: Votes,
    pub cost: Credits,
}

impl StakeLot {
    pub fn new(votes: Votes) -> Result<Self, GovernanceError> {
        let cost = quadratic_cost(votes).ok_or(GovernanceError::Overflow)?;
        Ok(Self { votes, cost })
    }
}

/// Released position of one voter, used when a proposal is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleasedStake {
    pub voter: Address,
    pub votes: Votes,
    pub credits: Credits,
}

/// Stake lots per (voter, proposal).
#[derive(Debug, Default, Clone)]
pub struct StakeBook {
    positions: HashMap<(Address, ProposalId), Vec<StakeLot>>,
}

impl StakeBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new lot.
    pub fn push(&mut self, voter: Address, proposal: ProposalId, lot: StakeLot) {
        self.positions.entry((voter, proposal)).or_default().push(lot);
    }

    /// Votes `voter` currently has staked on `proposal`.
    pub fn staked_votes(&self, voter: &Address, proposal: ProposalId) -> Votes {
        self.lots(voter, proposal).iter().map(|lot| lot.votes).sum()
    }

    /// Credits `voter` currently has locked on `proposal`.
    pub fn locked_credits(&self, voter: &Address, proposal: ProposalId) -> Credits {
        self.lots(voter, proposal).iter().map(|lot| lot.cost).sum()
    }

    /// Total credits locked by `voter` across all proposals.
    pub fn total_locked(&self, voter: &Address) -> Credits {
        self.positions
            .iter()
            .filter(|((addr, _), _)| addr == voter)
            .flat_map(|(_, lots)| lots.iter())
            .map(|lot| lot.cost)
            .sum()
    }

    /// Credits that withdrawing `votes` would release, without mutating.
    pub fn withdrawal_refund(
        &self,
        voter: &Address,
        proposal: ProposalId,
        votes: Votes,
    ) -> Result<Credits, GovernanceError> {
        let lots = self.lots(voter, proposal);
        let staked: Votes = lots.iter().map(|lot| lot.votes).sum();
        if votes > staked {
            return Err(GovernanceError::InsufficientVotes { staked, requested: votes });
        }

        let mut remaining = votes;
        let mut refund = 0;
        for lot in lots.iter().rev() {
            if remaining == 0 {
                break;
            }
            let taken = remaining.min(lot.votes);
            refund += if taken == lot.votes {
                lot.cost
            } else {
                partial_refund(lot.votes, taken)
            };
            remaining -= taken;
        }
        Ok(refund)
    }

    /// Withdraw `votes`, newest lot first. Returns the released credits.
    pub fn withdraw(
        &mut self,
        voter: Address,
        proposal: ProposalId,
        votes: Votes,
    ) -> Result<Credits, GovernanceError> {
        let refund = self.withdrawal_refund(&voter, proposal, votes)?;

        let key = (voter, proposal);
        if let Some(lots) = self.positions.get_mut(&key) {
            let mut remaining = votes;
            while remaining > 0 {
                let Some(lot) = lots.last_mut() else { break };
                if remaining >= lot.votes {
                    remaining -= lot.votes;
                    lots.pop();
                } else {
                    lot.votes -= remaining;
                    lot.cost = lot.votes * lot.votes;
                    remaining = 0;
                }
            }
            if lots.is_empty() {
                self.positions.remove(&key);
            }
        }

        Ok(refund)
    }

    /// Drop every position on `proposal`, reporting what each voter gets back.
    pub fn release_proposal(&mut self, proposal: ProposalId) -> Vec<ReleasedStake> {
        let keys: Vec<_> = self
            .positions
            .keys()
            .filter(|(_, id)| *id == proposal)
            .copied()
            .collect();

        let mut released: Vec<ReleasedStake> = keys
            .into_iter()
            .filter_map(|key| {
                self.positions.remove(&key).map(|lots| ReleasedStake {
                    voter: key.0,
                    votes: lots.iter().map(|lot| lot.votes).sum(),
                    credits: lots.iter().map(|lot| lot.cost).sum(),
                })
            })
            .collect();
        released.sort_by_key(|r| r.voter);
        released
    }

    fn lots(&self, voter: &Address, proposal: ProposalId) -> &[StakeLot] {
        self.positions
            .get(&(*voter, proposal))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
