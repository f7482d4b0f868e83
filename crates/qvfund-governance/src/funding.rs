//! Round settlement policy.
//!
//! Deciding which pending proposals a closed round funds is kept behind the
//! [`FundingPolicy`] trait so the rule can be swapped without touching the
//! engine.

use qvfund_types::{Currency, ProposalId};
use serde::{Deserialize, Serialize};

use crate::voting::Votes;

/// A pending funding proposal as seen by a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FundingCandidate {
    pub id: ProposalId,
    pub requested_budget: Currency,
    pub total_votes: Votes,
}

/// Outcome of a closed round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSettlement {
    /// Round number
    pub round: u64,
    /// Funded proposal IDs, in funding order
    pub funded: Vec<ProposalId>,
    /// Rejected proposal IDs, in creation order
    pub rejected: Vec<ProposalId>,
    /// Currency earmarked for funded proposals
    pub committed: Currency,
    /// Unallocated budget
    pub leftover: Currency,
}

/// Chooses which candidates a round budget funds.
///
/// Implementations return the funded IDs; every other candidate is rejected.
/// The engine refuses allocations that name unknown IDs, repeat an ID or
/// overspend the budget.
pub trait FundingPolicy: Send + Sync {
    fn allocate(&self, budget: Currency, candidates: &[FundingCandidate]) -> Vec<ProposalId>;
}

/// Rank by votes (ties to the older proposal) and fund down the list until
/// the next one no longer fits. Proposals without votes are never funded.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankedBudgetPolicy;

impl FundingPolicy for RankedBudgetPolicy {
    fn allocate(&self, budget: Currency, candidates: &[FundingCandidate]) -> Vec<ProposalId> {
        let mut ranked: Vec<_> = candidates.iter().filter(|c| c.total_votes > 0).collect();
        ranked.sort_by(|a, b| b.total_votes.cmp(&a.total_votes).then(a.id.cmp(&b.id)));

        let mut spent: Currency = 0;
        let mut funded = Vec::new();
        for candidate in ranked {
            match spent.checked_add(candidate.requested_budget) {
                Some(total) if total <= budget => {
                    spent = total;
                    funded.push(candidate.id);
                }
                _ => break,
            }
        }
        funded
    }
}

impl<F> FundingPolicy for F
where
    F: Fn(Currency, &[FundingCandidate]) -> Vec<ProposalId> + Send + Sync,
{
    fn allocate(&self, budget: Currency, candidates: &[FundingCandidate]) -> Vec<ProposalId> {
        self(budget, candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: ProposalId, requested_budget: Currency, total_votes: Votes) -> FundingCandidate {
        FundingCandidate { id, requested_budget, total_votes }
    }

    #[test]
    fn test_ranked_by_votes() {
        let candidates = [candidate(1, 40, 2), candidate(2, 40, 5), candidate(3, 40, 3)];
        assert_eq!(RankedBudgetPolicy.allocate(100, &candidates), vec![2, 3]);
    }

    #[test]
    fn test_stops_at_first_misfit() {
        let candidates = [candidate(1, 80, 9), candidate(2, 30, 5), candidate(3, 10, 1)];
        // 80 fits, 80 + 30 does not, so 3 is not reached either
        assert_eq!(RankedBudgetPolicy.allocate(100, &candidates), vec![1]);
    }

    #[test]
    fn test_ties_go_to_older_proposal() {
        let candidates = [candidate(4, 60, 3), candidate(2, 60, 3)];
        assert_eq!(RankedBudgetPolicy.allocate(100, &candidates), vec![2]);
    }

    #[test]
    fn test_unvoted_never_funded() {
        let candidates = [candidate(1, 10, 0)];
        assert!(RankedBudgetPolicy.allocate(100, &candidates).is_empty());
    }

    #[test]
    fn test_closure_policy() {
        let fund_all = |_: Currency, c: &[FundingCandidate]| -> Vec<ProposalId> {
            c.iter().map(|c| c.id).collect()
        };
        let candidates = [candidate(1, 10, 0), candidate(2, 10, 0)];
        assert_eq!(fund_all.allocate(100, &candidates), vec![1, 2]);
    }
}
