//! Voting engine.
//!
//! Single entry point for every state change. All ledger state sits behind
//! one mutex; an operation locks it once, validates, then mutates, so checks
//! such as the supply cap and the free/locked split never see a stale read.
//! A failed operation leaves the state untouched.

use std::collections::HashSet;

use parking_lot::Mutex;
use qvfund_ledger::{ParticipantInfo, ParticipantRegistry, Purchase, Redemption};
use qvfund_types::{Address, Credits, Currency, LedgerConfig, ProposalId};
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;
use crate::funding::{FundingCandidate, FundingPolicy, RankedBudgetPolicy, RoundSettlement};
use crate::proposal::{FundingState, Proposal, ProposalRegistry};
use crate::treasury::{Treasury, VotingRound};
use crate::voting::{max_votes_from_budget, StakeBook, StakeLot, Votes};

/// Result of a successful stake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeReceipt {
    pub proposal: ProposalId,
    pub votes: Votes,
    /// Credits moved from free to locked
    pub cost: Credits,
    /// Proposal tally after the stake
    pub total_votes: Votes,
}

/// Result of a successful unstake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnstakeReceipt {
    pub proposal: ProposalId,
    pub votes: Votes,
    /// Credits moved from locked back to free
    pub refund: Credits,
    /// Proposal tally after the unstake
    pub total_votes: Votes,
}

/// Mutable ledger state guarded by the engine lock.
#[derive(Debug)]
struct EngineState {
    participants: ParticipantRegistry,
    proposals: ProposalRegistry,
    stakes: StakeBook,
    treasury: Treasury,
}

impl EngineState {
    fn stake(
        &mut self,
        caller: Address,
        id: ProposalId,
        votes: Votes,
    ) -> Result<StakeReceipt, GovernanceError> {
        let free = self.participants.free_balance(&caller)?;
        if votes == 0 {
            return Err(GovernanceError::ZeroAmount);
        }
        if !self.treasury.is_open() {
            return Err(GovernanceError::VotingNotOpen);
        }
        let proposal = self
            .proposals
            .get_mut(id)
            .ok_or(GovernanceError::UnknownProposal(id))?;
        if !proposal.state.accepts_votes() {
            return Err(GovernanceError::ProposalClosed(id));
        }

        let lot = StakeLot::new(votes)?;
        if lot.cost > free {
            return Err(GovernanceError::InsufficientFreeBalance { free, cost: lot.cost });
        }
        proposal.ensure_can_add(&caller, votes)?;

        self.participants.lock(caller, lot.cost)?;
        proposal.add_votes(caller, votes)?;
        self.stakes.push(caller, id, lot);

        Ok(StakeReceipt {
            proposal: id,
            votes,
            cost: lot.cost,
            total_votes: proposal.total_votes(),
        })
    }

    fn unstake(
        &mut self,
        caller: Address,
        id: ProposalId,
        votes: Votes,
    ) -> Result<UnstakeReceipt, GovernanceError> {
        let locked = self.participants.locked_balance(&caller)?;
        if votes == 0 {
            return Err(GovernanceError::ZeroAmount);
        }
        let proposal = self
            .proposals
            .get_mut(id)
            .ok_or(GovernanceError::UnknownProposal(id))?;

        let staked = proposal.votes_of(&caller);
        if staked < votes {
            return Err(GovernanceError::InsufficientVotes { staked, requested: votes });
        }
        let refund = self.stakes.withdrawal_refund(&caller, id, votes)?;
        if refund > locked {
            return Err(GovernanceError::Ledger(qvfund_ledger::LedgerError::InsufficientLocked {
                have: locked,
                need: refund,
            }));
        }

        self.stakes.withdraw(caller, id, votes)?;
        self.participants.unlock(caller, refund)?;
        proposal.remove_votes(caller, votes)?;

        Ok(UnstakeReceipt {
            proposal: id,
            votes,
            refund,
            total_votes: proposal.total_votes(),
        })
    }

    fn cancel_proposal(&mut self, caller: Address, id: ProposalId) -> Result<Credits, GovernanceError> {
        let proposal = self
            .proposals
            .get_mut(id)
            .ok_or(GovernanceError::UnknownProposal(id))?;
        if caller != proposal.proposer {
            return Err(GovernanceError::NotProposer);
        }
        if !proposal.state.accepts_votes() {
            return Err(GovernanceError::ProposalClosed(id));
        }

        let released = self.stakes.release_proposal(id);
        let mut total: Credits = 0;
        for stake in &released {
            self.participants.unlock(stake.voter, stake.credits)?;
            total += stake.credits;
        }
        proposal.cancel(caller)?;
        Ok(total)
    }

    fn close_round<P: FundingPolicy>(&mut self, policy: &P) -> Result<RoundSettlement, GovernanceError> {
        if !self.treasury.is_open() {
            return Err(GovernanceError::VotingNotOpen);
        }
        let budget = self.treasury.round.budget;
        let candidates: Vec<FundingCandidate> = self
            .proposals
            .pending_funding()
            .map(|p| FundingCandidate {
                id: p.id,
                requested_budget: p.requested_budget,
                total_votes: p.total_votes(),
            })
            .collect();

        let funded = policy.allocate(budget, &candidates);
        let committed = Self::check_allocation(budget, &candidates, &funded)?;

        let funded_set: HashSet<_> = funded.iter().copied().collect();
        let mut rejected = Vec::new();
        for candidate in &candidates {
            if let Some(proposal) = self.proposals.get_mut(candidate.id) {
                if funded_set.contains(&candidate.id) {
                    proposal.state = FundingState::Funded;
                } else {
                    proposal.state = FundingState::Rejected;
                    rejected.push(candidate.id);
                }
            }
        }
        let leftover = self.treasury.close_round(committed)?;

        Ok(RoundSettlement {
            round: self.treasury.round.number,
            funded,
            rejected,
            committed,
            leftover,
        })
    }

    /// Validate a policy's choice and return the currency it commits.
    fn check_allocation(
        budget: Currency,
        candidates: &[FundingCandidate],
        funded: &[ProposalId],
    ) -> Result<Currency, GovernanceError> {
        let mut seen = HashSet::new();
        let mut committed: Currency = 0;
        for id in funded {
            if !seen.insert(*id) {
                return Err(GovernanceError::InvalidAllocation(format!("proposal {} funded twice", id)));
            }
            let candidate = candidates
                .iter()
                .find(|c| c.id == *id)
                .ok_or_else(|| GovernanceError::InvalidAllocation(format!("proposal {} is not pending", id)))?;
            committed = committed
                .checked_add(candidate.requested_budget)
                .ok_or(GovernanceError::Overflow)?;
        }
        if committed > budget {
            return Err(GovernanceError::InvalidAllocation(format!(
                "committed {} exceeds budget {}",
                committed, budget
            )));
        }
        Ok(committed)
    }
}

/// Quadratic voting engine: treasury, staking and the registries it drives.
pub struct VotingEngine<P: FundingPolicy = RankedBudgetPolicy> {
    config: LedgerConfig,
    policy: P,
    state: Mutex<EngineState>,
}

impl VotingEngine<RankedBudgetPolicy> {
    /// Create an engine with the reference funding policy.
    pub fn new(config: LedgerConfig) -> Result<Self, GovernanceError> {
        Self::with_policy(config, RankedBudgetPolicy)
    }
}

impl<P: FundingPolicy> VotingEngine<P> {
    /// Create an engine with a custom funding policy.
    pub fn with_policy(config: LedgerConfig, policy: P) -> Result<Self, GovernanceError> {
        config
            .validate()
            .map_err(|e| GovernanceError::InvalidConfig(e.to_string()))?;

        let state = EngineState {
            participants: ParticipantRegistry::new(config.credit_price, config.max_credits),
            proposals: ProposalRegistry::new(),
            stakes: StakeBook::new(),
            treasury: Treasury::new(),
        };

        tracing::info!(
            "Voting engine created: credit price {}, max credits {}, owner {}",
            config.credit_price,
            config.max_credits,
            config.owner
        );

        Ok(Self {
            config,
            policy,
            state: Mutex::new(state),
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn owner(&self) -> Address {
        self.config.owner
    }

    pub fn credit_price(&self) -> Currency {
        self.config.credit_price
    }

    pub fn max_credits(&self) -> Credits {
        self.config.max_credits
    }

    // Participants

    /// Register `caller`, buying credits with `paid`. The refund is owed back.
    pub fn register(&self, caller: Address, paid: Currency) -> Result<Purchase, GovernanceError> {
        let mut state = self.state.lock();
        let purchase = state
            .participants
            .register(caller, paid)
            .map_err(|e| rejected("register", &caller, e.into()))?;

        tracing::info!(
            "Participant {} registered with {} credits, refund {}",
            caller,
            purchase.credits_minted,
            purchase.refund
        );
        Ok(purchase)
    }

    /// Deregister `caller`. The payout is its full deposit.
    pub fn deregister(&self, caller: Address) -> Result<Redemption, GovernanceError> {
        let mut state = self.state.lock();
        let redemption = state
            .participants
            .deregister(caller)
            .map_err(|e| rejected("deregister", &caller, e.into()))?;

        tracing::info!(
            "Participant {} deregistered, {} credits burned, payout {}",
            caller,
            redemption.credits_burned,
            redemption.payout
        );
        Ok(redemption)
    }

    /// Buy more credits for a registered `caller`.
    pub fn buy_more(&self, caller: Address, paid: Currency) -> Result<Purchase, GovernanceError> {
        let mut state = self.state.lock();
        let purchase = state
            .participants
            .buy_more(caller, paid)
            .map_err(|e| rejected("buy_more", &caller, e.into()))?;

        tracing::info!("Participant {} bought {} credits", caller, purchase.credits_minted);
        Ok(purchase)
    }

    /// Sell `amount` free credits back at the credit price.
    pub fn sell(&self, caller: Address, amount: Credits) -> Result<Redemption, GovernanceError> {
        let mut state = self.state.lock();
        let redemption = state
            .participants
            .sell(caller, amount)
            .map_err(|e| rejected("sell", &caller, e.into()))?;

        tracing::info!("Participant {} sold {} credits for {}", caller, amount, redemption.payout);
        Ok(redemption)
    }

    // Rounds

    /// Open a voting round funded with `amount`. Owner only.
    pub fn open_voting(&self, caller: Address, amount: Currency) -> Result<VotingRound, GovernanceError> {
        if caller != self.config.owner {
            return Err(rejected("open_voting", &caller, GovernanceError::NotOwner));
        }
        let mut state = self.state.lock();
        let round = *state
            .treasury
            .open_round(amount)
            .map_err(|e| rejected("open_voting", &caller, e))?;

        tracing::info!("Voting round {} opened with budget {}", round.number, round.budget);
        Ok(round)
    }

    /// Close the open round and settle pending proposals. Owner only.
    pub fn close_voting(&self, caller: Address) -> Result<RoundSettlement, GovernanceError> {
        if caller != self.config.owner {
            return Err(rejected("close_voting", &caller, GovernanceError::NotOwner));
        }
        let mut state = self.state.lock();
        let settlement = state
            .close_round(&self.policy)
            .map_err(|e| rejected("close_voting", &caller, e))?;

        tracing::info!(
            "Voting round {} closed: {} funded, {} rejected, committed {}, leftover {}",
            settlement.round,
            settlement.funded.len(),
            settlement.rejected.len(),
            settlement.committed,
            settlement.leftover
        );
        Ok(settlement)
    }

    // Proposals

    /// Submit a proposal. A zero `requested_budget` makes it a signaling proposal.
    pub fn create_proposal(
        &self,
        caller: Address,
        title: impl Into<String>,
        description: impl Into<String>,
        requested_budget: Currency,
        target: Address,
    ) -> Result<ProposalId, GovernanceError> {
        let mut state = self.state.lock();
        if !state.participants.is_participant(&caller) {
            let err = qvfund_ledger::LedgerError::NotAParticipant(caller).into();
            return Err(rejected("create_proposal", &caller, err));
        }

        let id = state
            .proposals
            .create(caller, title.into(), description.into(), requested_budget, target);

        tracing::info!("Proposal {} created by {}, requested budget {}", id, caller, requested_budget);
        Ok(id)
    }

    /// Cancel a proposal and release every stake on it. Proposer only.
    pub fn cancel_proposal(&self, caller: Address, id: ProposalId) -> Result<Credits, GovernanceError> {
        let mut state = self.state.lock();
        let released = state
            .cancel_proposal(caller, id)
            .map_err(|e| rejected("cancel_proposal", &caller, e))?;

        tracing::info!("Proposal {} cancelled, {} credits released", id, released);
        Ok(released)
    }

    /// Funding proposals still pending, in creation order.
    pub fn list_pending_funding(&self) -> Vec<Proposal> {
        self.state.lock().proposals.pending_funding().cloned().collect()
    }

    /// Signaling proposals that have not been cancelled, in creation order.
    pub fn signaling_proposals(&self) -> Vec<Proposal> {
        self.state.lock().proposals.signaling().cloned().collect()
    }

    /// Proposals funded by closed rounds, in creation order.
    pub fn funded_proposals(&self) -> Vec<Proposal> {
        self.state
            .lock()
            .proposals
            .by_state(FundingState::Funded)
            .cloned()
            .collect()
    }

    pub fn proposal(&self, id: ProposalId) -> Option<Proposal> {
        self.state.lock().proposals.get(id).cloned()
    }

    /// Every proposal ever created, in creation order.
    pub fn all_proposals(&self) -> Vec<Proposal> {
        self.state.lock().proposals.all().cloned().collect()
    }

    pub fn proposal_count(&self) -> usize {
        self.state.lock().proposals.len()
    }

    // Staking

    /// Stake `votes` on a proposal for `votes^2` credits.
    pub fn stake(&self, caller: Address, id: ProposalId, votes: Votes) -> Result<StakeReceipt, GovernanceError> {
        let mut state = self.state.lock();
        let receipt = state
            .stake(caller, id, votes)
            .map_err(|e| rejected("stake", &caller, e))?;

        tracing::info!(
            "{} staked {} votes on proposal {} for {} credits",
            caller,
            votes,
            id,
            receipt.cost
        );
        Ok(receipt)
    }

    /// Withdraw `votes` from a proposal, newest stake first.
    pub fn unstake(&self, caller: Address, id: ProposalId, votes: Votes) -> Result<UnstakeReceipt, GovernanceError> {
        let mut state = self.state.lock();
        let receipt = state
            .unstake(caller, id, votes)
            .map_err(|e| rejected("unstake", &caller, e))?;

        tracing::info!(
            "{} withdrew {} votes from proposal {}, {} credits unlocked",
            caller,
            votes,
            id,
            receipt.refund
        );
        Ok(receipt)
    }

    /// Votes `voter` holds on proposal `id`.
    pub fn votes_of(&self, voter: &Address, id: ProposalId) -> Votes {
        self.state.lock().stakes.staked_votes(voter, id)
    }

    /// Credits `voter` has locked across every stake it still holds.
    pub fn staked_credits(&self, voter: &Address) -> Credits {
        self.state.lock().stakes.total_locked(voter)
    }

    /// Largest single stake `voter` can currently afford.
    pub fn max_affordable_votes(&self, voter: &Address) -> Votes {
        let free = self.state.lock().participants.ledger().free_balance_of(voter);
        let votes = max_votes_from_budget(free);
        tracing::debug!("{} can afford {} votes with {} free credits", voter, votes, free);
        votes
    }

    // Reads

    pub fn total_supply(&self) -> Credits {
        self.state.lock().participants.ledger().total_supply()
    }

    pub fn free_balance(&self, address: &Address) -> Credits {
        self.state.lock().participants.ledger().free_balance_of(address)
    }

    pub fn locked_balance(&self, address: &Address) -> Credits {
        self.state.lock().participants.ledger().locked_balance_of(address)
    }

    pub fn balance_of(&self, address: &Address) -> Credits {
        self.state.lock().participants.ledger().balance_of(address)
    }

    pub fn participant(&self, address: &Address) -> Option<ParticipantInfo> {
        self.state.lock().participants.get(address)
    }

    pub fn is_participant(&self, address: &Address) -> bool {
        self.state.lock().participants.is_participant(address)
    }

    pub fn participant_count(&self) -> usize {
        self.state.lock().participants.count()
    }

    pub fn is_voting_open(&self) -> bool {
        self.state.lock().treasury.is_open()
    }

    pub fn voting_budget(&self) -> Currency {
        self.state.lock().treasury.round.budget
    }

    /// Snapshot of the treasury.
    pub fn treasury(&self) -> Treasury {
        self.state.lock().treasury.clone()
    }
}

fn rejected(op: &str, caller: &Address, err: GovernanceError) -> GovernanceError {
    tracing::warn!("{} rejected for {}: {}", op, caller, err);
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use qvfund_ledger::LedgerError;
    use qvfund_types::CURRENCY_UNIT;

    const PRICE: Currency = CURRENCY_UNIT / 10;

    fn owner() -> Address {
        Address::from_bytes([0xaa; 20])
    }

    fn alice() -> Address {
        Address::from_bytes([1u8; 20])
    }

    fn bob() -> Address {
        Address::from_bytes([2u8; 20])
    }

    fn target() -> Address {
        Address::from_bytes([0xee; 20])
    }

    fn engine() -> VotingEngine {
        VotingEngine::new(LedgerConfig::new(PRICE, 1_000_000, owner())).unwrap()
    }

    fn open_engine() -> VotingEngine {
        let engine = engine();
        engine.open_voting(owner(), CURRENCY_UNIT).unwrap();
        engine
    }

    #[test]
    fn test_invalid_config() {
        let result = VotingEngine::new(LedgerConfig::new(0, 10, owner()));
        assert!(matches!(result, Err(GovernanceError::InvalidConfig(_))));
    }

    #[test]
    fn test_accessors() {
        let engine = engine();
        assert_eq!(engine.credit_price(), PRICE);
        assert_eq!(engine.max_credits(), 1_000_000);
        assert_eq!(engine.owner(), owner());
        assert_eq!(engine.total_supply(), 0);
        assert!(!engine.is_voting_open());
    }

    #[test]
    fn test_open_voting() {
        let engine = engine();
        let round = engine.open_voting(owner(), CURRENCY_UNIT).unwrap();

        assert!(round.is_open);
        assert!(engine.is_voting_open());
        assert_eq!(engine.voting_budget(), CURRENCY_UNIT);
        assert_eq!(engine.treasury().balance, CURRENCY_UNIT);
    }

    #[test]
    fn test_open_voting_not_owner() {
        let engine = engine();
        assert_eq!(
            engine.open_voting(alice(), CURRENCY_UNIT).unwrap_err(),
            GovernanceError::NotOwner
        );
        assert!(!engine.is_voting_open());
    }

    #[test]
    fn test_open_voting_requires_funding() {
        let engine = engine();
        assert_eq!(engine.open_voting(owner(), 0).unwrap_err(), GovernanceError::FundingRequired);
    }

    #[test]
    fn test_open_voting_twice() {
        let engine = open_engine();
        assert_eq!(
            engine.open_voting(owner(), CURRENCY_UNIT * 2).unwrap_err(),
            GovernanceError::AlreadyOpen
        );
        assert_eq!(engine.voting_budget(), CURRENCY_UNIT);
    }

    #[test]
    fn test_participant_count() {
        let engine = engine();
        assert_eq!(engine.participant_count(), 0);
        engine.register(alice(), PRICE).unwrap();
        engine.register(bob(), PRICE).unwrap();
        assert_eq!(engine.participant_count(), 2);
    }

    #[test]
    fn test_create_proposal_requires_participant() {
        let engine = engine();
        let err = engine.create_proposal(alice(), "P", "d", 0, target()).unwrap_err();
        assert_eq!(err, GovernanceError::Ledger(LedgerError::NotAParticipant(alice())));
        assert_eq!(engine.proposal_count(), 0);
    }

    #[test]
    fn test_pending_funding_count() {
        let engine = open_engine();
        engine.register(alice(), PRICE).unwrap();
        engine.register(bob(), PRICE).unwrap();

        engine
            .create_proposal(alice(), "Fund Me", "Give me currency", PRICE * 2, target())
            .unwrap();
        engine
            .create_proposal(alice(), "Just a Signal", "No budget", 0, target())
            .unwrap();

        assert_eq!(engine.list_pending_funding().len(), 1);
        assert_eq!(engine.signaling_proposals().len(), 1);
    }

    #[test]
    fn test_stake_costs_square() {
        let engine = open_engine();
        engine.register(alice(), PRICE * 5).unwrap();
        let id = engine.create_proposal(alice(), "Sig", "signal", 0, target()).unwrap();

        let receipt = engine.stake(alice(), id, 2).unwrap();
        assert_eq!(receipt.cost, 4);
        assert_eq!(receipt.total_votes, 2);
        assert_eq!(engine.free_balance(&alice()), 1);
        assert_eq!(engine.locked_balance(&alice()), 4);
        assert_eq!(engine.balance_of(&alice()), 5);
        assert_eq!(engine.total_supply(), 5);
    }

    #[test]
    fn test_stake_prices_each_call() {
        let engine = open_engine();
        engine.register(alice(), PRICE * 10).unwrap();
        let id = engine.create_proposal(alice(), "P", "d", 0, target()).unwrap();

        assert_eq!(engine.stake(alice(), id, 2).unwrap().cost, 4);
        assert_eq!(engine.stake(alice(), id, 1).unwrap().cost, 1);
        assert_eq!(engine.locked_balance(&alice()), 5);
        assert_eq!(engine.staked_credits(&alice()), 5);
        assert_eq!(engine.votes_of(&alice(), id), 3);
    }

    #[test]
    fn test_stake_errors() {
        let engine = engine();
        engine.register(alice(), PRICE * 3).unwrap();
        let id = engine.create_proposal(alice(), "P", "d", 0, target()).unwrap();

        assert_eq!(engine.stake(alice(), id, 1).unwrap_err(), GovernanceError::VotingNotOpen);

        engine.open_voting(owner(), CURRENCY_UNIT).unwrap();
        assert_eq!(
            engine.stake(bob(), id, 1).unwrap_err(),
            GovernanceError::Ledger(LedgerError::NotAParticipant(bob()))
        );
        assert_eq!(engine.stake(alice(), 99, 1).unwrap_err(), GovernanceError::UnknownProposal(99));
        assert_eq!(engine.stake(alice(), id, 0).unwrap_err(), GovernanceError::ZeroAmount);
        assert_eq!(
            engine.stake(alice(), id, 2).unwrap_err(),
            GovernanceError::InsufficientFreeBalance { free: 3, cost: 4 }
        );
        assert_eq!(engine.locked_balance(&alice()), 0);
        assert_eq!(engine.proposal(id).unwrap().total_votes(), 0);
    }

    #[test]
    fn test_unstake_roundtrip() {
        let engine = open_engine();
        engine.register(alice(), PRICE * 10).unwrap();
        let id = engine.create_proposal(alice(), "P", "d", PRICE, target()).unwrap();

        engine.stake(alice(), id, 3).unwrap();
        let receipt = engine.unstake(alice(), id, 3).unwrap();

        assert_eq!(receipt.refund, 9);
        assert_eq!(receipt.total_votes, 0);
        assert_eq!(engine.free_balance(&alice()), 10);
        assert_eq!(engine.locked_balance(&alice()), 0);
    }

    #[test]
    fn test_unstake_more_than_staked() {
        let engine = open_engine();
        engine.register(alice(), PRICE * 10).unwrap();
        let id = engine.create_proposal(alice(), "P", "d", 0, target()).unwrap();
        engine.stake(alice(), id, 1).unwrap();

        assert_eq!(
            engine.unstake(alice(), id, 2).unwrap_err(),
            GovernanceError::InsufficientVotes { staked: 1, requested: 2 }
        );
        assert_eq!(engine.locked_balance(&alice()), 1);
    }

    #[test]
    fn test_deregister_after_unstake() {
        let engine = open_engine();
        engine.register(alice(), PRICE * 3).unwrap();
        let id = engine.create_proposal(alice(), "P1", "desc", 0, target()).unwrap();
        engine.stake(alice(), id, 1).unwrap();

        assert_eq!(
            engine.deregister(alice()).unwrap_err(),
            GovernanceError::Ledger(LedgerError::CreditsLocked(1))
        );

        engine.unstake(alice(), id, 1).unwrap();
        let redemption = engine.deregister(alice()).unwrap();
        assert_eq!(redemption.payout, PRICE * 3);
        assert_eq!(engine.participant_count(), 0);
    }

    #[test]
    fn test_cancel_proposal_releases_stakes() {
        let engine = open_engine();
        engine.register(alice(), PRICE * 10).unwrap();
        engine.register(bob(), PRICE * 10).unwrap();
        let id = engine.create_proposal(alice(), "P", "d", PRICE, target()).unwrap();
        engine.stake(alice(), id, 2).unwrap();
        engine.stake(bob(), id, 3).unwrap();

        assert_eq!(engine.cancel_proposal(bob(), id).unwrap_err(), GovernanceError::NotProposer);

        assert_eq!(engine.cancel_proposal(alice(), id).unwrap(), 13);
        assert_eq!(engine.locked_balance(&alice()), 0);
        assert_eq!(engine.locked_balance(&bob()), 0);
        assert_eq!(engine.staked_credits(&bob()), 0);
        assert_eq!(engine.proposal(id).unwrap().state, FundingState::Cancelled);
        assert!(engine.list_pending_funding().is_empty());
        assert_eq!(engine.stake(bob(), id, 1).unwrap_err(), GovernanceError::ProposalClosed(id));
    }

    #[test]
    fn test_close_voting_funds_by_rank() {
        let engine = open_engine();
        engine.register(alice(), PRICE * 20).unwrap();
        let a = engine.create_proposal(alice(), "A", "", PRICE * 6, target()).unwrap();
        let b = engine.create_proposal(alice(), "B", "", PRICE * 3, target()).unwrap();
        let c = engine.create_proposal(alice(), "C", "", PRICE * 6, target()).unwrap();
        engine.stake(alice(), a, 3).unwrap();
        engine.stake(alice(), b, 2).unwrap();
        engine.stake(alice(), c, 1).unwrap();

        let settlement = engine.close_voting(owner()).unwrap();
        assert_eq!(settlement.funded, vec![a, b]);
        assert_eq!(settlement.rejected, vec![c]);
        assert_eq!(settlement.committed, PRICE * 9);
        assert_eq!(settlement.leftover, PRICE);
        assert!(!engine.is_voting_open());
        assert_eq!(engine.funded_proposals().len(), 2);

        // Locked credits stay locked until withdrawn
        assert_eq!(engine.locked_balance(&alice()), 14);
        engine.unstake(alice(), a, 3).unwrap();
        assert_eq!(engine.locked_balance(&alice()), 5);
    }

    #[test]
    fn test_close_voting_errors() {
        let engine = engine();
        assert_eq!(engine.close_voting(owner()).unwrap_err(), GovernanceError::VotingNotOpen);
        engine.open_voting(owner(), 10).unwrap();
        assert_eq!(engine.close_voting(alice()).unwrap_err(), GovernanceError::NotOwner);
    }

    #[test]
    fn test_overspending_policy_rejected() {
        let greedy = |_: Currency, c: &[FundingCandidate]| -> Vec<ProposalId> {
            c.iter().map(|c| c.id).collect()
        };
        let engine =
            VotingEngine::with_policy(LedgerConfig::new(PRICE, 1_000, owner()), greedy).unwrap();
        engine.register(alice(), PRICE).unwrap();
        let id = engine.create_proposal(alice(), "Big", "", PRICE * 100, target()).unwrap();
        engine.open_voting(owner(), PRICE).unwrap();

        assert!(matches!(
            engine.close_voting(owner()).unwrap_err(),
            GovernanceError::InvalidAllocation(_)
        ));
        assert!(engine.is_voting_open());
        assert_eq!(engine.proposal(id).unwrap().state, FundingState::Pending);
    }

    #[test]
    fn test_max_affordable_votes() {
        let engine = engine();
        engine.register(alice(), PRICE * 50).unwrap();
        assert_eq!(engine.max_affordable_votes(&alice()), 7);
        assert_eq!(engine.max_affordable_votes(&bob()), 0);
    }
}
