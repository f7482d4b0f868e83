//! QVFund Governance - quadratic voting and funding rounds.
//!
//! This crate provides:
//! - Proposal lifecycle management
//! - Quadratic vote pricing with per-stake lots
//! - Treasury and voting rounds
//! - Pluggable round settlement
//! - The [`VotingEngine`] tying them to the credit ledger

pub mod engine;
pub mod error;
pub mod funding;
pub mod proposal;
pub mod treasury;
pub mod voting;

pub use engine::{StakeReceipt, UnstakeReceipt, VotingEngine};
pub use error::GovernanceError;
pub use funding::{FundingCandidate, FundingPolicy, RankedBudgetPolicy, RoundSettlement};
pub use proposal::{FundingState, Proposal, ProposalRegistry};
pub use treasury::{Treasury, VotingRound};
pub use voting::{integer_sqrt, max_votes_from_budget, quadratic_cost, Votes};
