//! Proposal lifecycle management.
//!
//! Funding proposals go through: Pending -> Funded/Rejected.
//! Signaling proposals (zero requested budget) stay NonFunding for good.
//! Either kind can be Cancelled by its proposer while still open.

use std::collections::{BTreeMap, HashMap};

use qvfund_types::{Address, Currency, ProposalId};
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;
use crate::voting::Votes;

/// Funding state of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FundingState {
    /// Signaling proposal, never considered for funding
    NonFunding,
    /// Waiting for the round to close
    Pending,
    /// Selected for funding when the round closed
    Funded,
    /// Not selected when the round closed
    Rejected,
    /// Withdrawn by its proposer
    Cancelled,
}

impl FundingState {
    /// Check if the proposal can still receive stakes.
    pub fn accepts_votes(&self) -> bool {
        matches!(self, FundingState::NonFunding | FundingState::Pending)
    }
}

/// A proposal submitted by a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Unique proposal ID
    pub id: ProposalId,
    /// Proposer address
    pub proposer: Address,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Currency requested from the round budget, zero for signaling
    pub requested_budget: Currency,
    /// Action to run if funded; stored, never invoked here
    pub target: Address,
    /// Votes bought by each voter
    votes_for: HashMap<Address, Votes>,
    /// Sum of `votes_for`
    total_votes: Votes,
    /// Current funding state
    pub state: FundingState,
}

impl Proposal {
    /// Create a new proposal.
    pub fn new(
        id: ProposalId,
        proposer: Address,
        title: String,
        description: String,
        requested_budget: Currency,
        target: Address,
    ) -> Self {
        let state = if requested_budget > 0 {
            FundingState::Pending
        } else {
            FundingState::NonFunding
        };

        Self {
            id,
            proposer,
            title,
            description,
            requested_budget,
            target,
            votes_for: HashMap::new(),
            total_votes: 0,
            state,
        }
    }

    pub fn is_signaling(&self) -> bool {
        self.requested_budget == 0
    }

    pub fn is_pending_funding(&self) -> bool {
        self.requested_budget > 0 && self.state == FundingState::Pending
    }

    pub fn total_votes(&self) -> Votes {
        self.total_votes
    }

    pub fn votes_of(&self, voter: &Address) -> Votes {
        self.votes_for.get(voter).copied().unwrap_or(0)
    }

    /// Check that `votes` more can be tallied without overflow.
    pub fn ensure_can_add(&self, voter: &Address, votes: Votes) -> Result<(), GovernanceError> {
        self.total_votes
            .checked_add(votes)
            .and(self.votes_of(voter).checked_add(votes))
            .map(|_| ())
            .ok_or(GovernanceError::Overflow)
    }

    /// Tally `votes` for `voter`.
    pub fn add_votes(&mut self, voter: Address, votes: Votes) -> Result<(), GovernanceError> {
        if !self.state.accepts_votes() {
            return Err(GovernanceError::ProposalClosed(self.id));
        }
        self.ensure_can_add(&voter, votes)?;

        *self.votes_for.entry(voter).or_insert(0) += votes;
        self.total_votes += votes;
        Ok(())
    }

    /// Remove `votes` previously tallied for `voter`.
    pub fn remove_votes(&mut self, voter: Address, votes: Votes) -> Result<(), GovernanceError> {
        let staked = self.votes_of(&voter);
        if staked < votes {
            return Err(GovernanceError::InsufficientVotes { staked, requested: votes });
        }

        if staked == votes {
            self.votes_for.remove(&voter);
        } else {
            self.votes_for.insert(voter, staked - votes);
        }
        self.total_votes -= votes;
        Ok(())
    }

    /// Cancel proposal (only by proposer, only while open).
    pub fn cancel(&mut self, caller: Address) -> Result<(), GovernanceError> {
        if caller != self.proposer {
            return Err(GovernanceError::NotProposer);
        }
        if !self.state.accepts_votes() {
            return Err(GovernanceError::ProposalClosed(self.id));
        }

        self.votes_for.clear();
        self.total_votes = 0;
        self.state = FundingState::Cancelled;
        Ok(())
    }
}

/// Proposal registry managing all proposals, in creation order.
#[derive(Debug, Clone)]
pub struct ProposalRegistry {
    proposals: BTreeMap<ProposalId, Proposal>,
    next_id: ProposalId,
}

impl ProposalRegistry {
    /// Create a new registry. The first proposal gets ID 1.
    pub fn new() -> Self {
        Self {
            proposals: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Create a new proposal and return its ID.
    pub fn create(
        &mut self,
        proposer: Address,
        title: String,
        description: String,
        requested_budget: Currency,
        target: Address,
    ) -> ProposalId {
        let id = self.next_id;
        self.next_id += 1;

        let proposal = Proposal::new(id, proposer, title, description, requested_budget, target);
        self.proposals.insert(id, proposal);
        id
    }

    /// Get a proposal.
    pub fn get(&self, id: ProposalId) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    /// Get a proposal mutably.
    pub fn get_mut(&mut self, id: ProposalId) -> Option<&mut Proposal> {
        self.proposals.get_mut(&id)
    }

    /// Number of proposals ever created.
    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    /// All proposals in creation order.
    pub fn all(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.values()
    }

    /// Funding proposals still awaiting a decision, in creation order.
    pub fn pending_funding(&self) -> impl Iterator<Item = &Proposal> {
        self.all().filter(|p| p.is_pending_funding())
    }

    /// Signaling proposals that have not been cancelled.
    pub fn signaling(&self) -> impl Iterator<Item = &Proposal> {
        self.all()
            .filter(|p| p.is_signaling() && p.state != FundingState::Cancelled)
    }

    /// Get proposals by state.
    pub fn by_state(&self, state: FundingState) -> impl Iterator<Item = &Proposal> {
        self.all().filter(move |p| p.state == state)
    }
}

impl Default for ProposalRegistry {
    fn default() -> Self {
        Self::new()
    }
}
