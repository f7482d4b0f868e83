use qvfund_ledger::LedgerError;
use qvfund_types::{Credits, ProposalId};
use thiserror::Error;

use crate::voting::Votes;

/// Errors that can occur in governance operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    #[error("Not the owner")]
    NotOwner,

    #[error("Voting already open")]
    AlreadyOpen,

    #[error("Initial funding required")]
    FundingRequired,

    #[error("Voting is not open")]
    VotingNotOpen,

    #[error("Unknown proposal: {0}")]
    UnknownProposal(ProposalId),

    #[error("Proposal {0} no longer accepts votes")]
    ProposalClosed(ProposalId),

    #[error("Only the proposer can do this")]
    NotProposer,

    #[error("Insufficient free balance: free {free}, cost {cost}")]
    InsufficientFreeBalance { free: Credits, cost: Credits },

    #[error("Insufficient staked votes: staked {staked}, requested {requested}")]
    InsufficientVotes { staked: Votes, requested: Votes },

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Invalid funding allocation: {0}")]
    InvalidAllocation(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Arithmetic overflow")]
    Overflow,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl GovernanceError {
    /// Stable name of the rejection, for reports. Ledger errors report their own kind.
    pub fn kind(&self) -> &'static str {
        match self {
            GovernanceError::NotOwner => "NotOwner",
            GovernanceError::AlreadyOpen => "AlreadyOpen",
            GovernanceError::FundingRequired => "FundingRequired",
            GovernanceError::VotingNotOpen => "VotingNotOpen",
            GovernanceError::UnknownProposal(_) => "UnknownProposal",
            GovernanceError::ProposalClosed(_) => "ProposalClosed",
            GovernanceError::NotProposer => "NotProposer",
            GovernanceError::InsufficientFreeBalance { .. } => "InsufficientFreeBalance",
            GovernanceError::InsufficientVotes { .. } => "InsufficientVotes",
            GovernanceError::ZeroAmount => "ZeroAmount",
            GovernanceError::InvalidAllocation(_) => "InvalidAllocation",
            GovernanceError::InvalidConfig(_) => "InvalidConfig",
            GovernanceError::Overflow => "Overflow",
            GovernanceError::Ledger(inner) => inner.kind(),
        }
    }
}
