//! Operation scripts.
//!
//! A script is a JSON list of engine calls. Each step runs against the same
//! engine in order; a rejected step is recorded and the run continues, since
//! a failed operation leaves the ledger unchanged.

use std::collections::BTreeSet;
use std::path::Path;

use qvfund_governance::{
    GovernanceError, Proposal, RoundSettlement, StakeReceipt, Treasury, UnstakeReceipt, VotingEngine,
    VotingRound,
};
use qvfund_ledger::{ParticipantInfo, Purchase, Redemption};
use qvfund_types::{
    amount_serde, format_currency, parse_currency, Address, Credits, Currency, ProposalId, CURRENCY_UNIT,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::check_path;

/// Currency written as a decimal string (`"0.1"`) or a whole number of units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CurrencyAmount(pub Currency);

impl<'de> Deserialize<'de> for CurrencyAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Whole(u64),
            Decimal(String),
        }

        let units = match Repr::deserialize(deserializer)? {
            Repr::Whole(n) => (n as u128)
                .checked_mul(CURRENCY_UNIT)
                .ok_or_else(|| serde::de::Error::custom("currency amount overflows"))?,
            Repr::Decimal(s) => parse_currency(&s).map_err(serde::de::Error::custom)?,
        };
        Ok(CurrencyAmount(units))
    }
}

/// One engine call.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Register {
        caller: Address,
        paid: CurrencyAmount,
    },
    Deregister {
        caller: Address,
    },
    BuyMore {
        caller: Address,
        paid: CurrencyAmount,
    },
    Sell {
        caller: Address,
        #[serde(with = "amount_serde")]
        amount: Credits,
    },
    OpenVoting {
        caller: Address,
        amount: CurrencyAmount,
    },
    CloseVoting {
        caller: Address,
    },
    CreateProposal {
        caller: Address,
        title: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        requested_budget: CurrencyAmount,
        #[serde(default)]
        target: Address,
    },
    CancelProposal {
        caller: Address,
        proposal: ProposalId,
    },
    Stake {
        caller: Address,
        proposal: ProposalId,
        #[serde(with = "amount_serde")]
        votes: u128,
    },
    Unstake {
        caller: Address,
        proposal: ProposalId,
        #[serde(with = "amount_serde")]
        votes: u128,
    },
    ListPendingFunding,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Register { .. } => "register",
            Step::Deregister { .. } => "deregister",
            Step::BuyMore { .. } => "buy_more",
            Step::Sell { .. } => "sell",
            Step::OpenVoting { .. } => "open_voting",
            Step::CloseVoting { .. } => "close_voting",
            Step::CreateProposal { .. } => "create_proposal",
            Step::CancelProposal { .. } => "cancel_proposal",
            Step::Stake { .. } => "stake",
            Step::Unstake { .. } => "unstake",
            Step::ListPendingFunding => "list_pending_funding",
        }
    }

    pub fn caller(&self) -> Option<Address> {
        match self {
            Step::Register { caller, .. }
            | Step::Deregister { caller }
            | Step::BuyMore { caller, .. }
            | Step::Sell { caller, .. }
            | Step::OpenVoting { caller, .. }
            | Step::CloseVoting { caller }
            | Step::CreateProposal { caller, .. }
            | Step::CancelProposal { caller, .. }
            | Step::Stake { caller, .. }
            | Step::Unstake { caller, .. } => Some(*caller),
            Step::ListPendingFunding => None,
        }
    }
}

/// A sequence of steps.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Script {
    /// Load a script from a JSON file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        check_path(path)?;

        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read script '{}': {}", path.display(), e))?;
        Self::from_json(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse script '{}': {}", path.display(), e))
    }

    pub fn from_json(contents: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Every address that appears as a caller, sorted.
    pub fn callers(&self) -> BTreeSet<Address> {
        self.steps.iter().filter_map(Step::caller).collect()
    }
}

/// Value returned by a successful step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StepResult {
    Purchase(Purchase),
    Redemption(Redemption),
    Round(VotingRound),
    Settlement(RoundSettlement),
    Created { proposal: ProposalId },
    Cancelled { proposal: ProposalId, released_credits: Credits },
    Stake(StakeReceipt),
    Unstake(UnstakeReceipt),
    Pending { pending: Vec<ProposalId> },
}

/// Outcome of one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub op: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<StepResult>,
    /// Rejection kind, e.g. `AlreadyOpen`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Engine state after a run.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub credit_price: String,
    pub max_credits: Credits,
    pub total_supply: Credits,
    pub participant_count: usize,
    pub voting_open: bool,
    pub voting_budget: String,
    /// Treasury currency not earmarked for funded proposals
    pub treasury_available: String,
    pub participants: Vec<ParticipantInfo>,
    pub proposals: Vec<Proposal>,
    pub treasury: Treasury,
}

/// Full run report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub name: String,
    pub steps: Vec<StepOutcome>,
    pub summary: Summary,
}

impl Report {
    pub fn failed_steps(&self) -> usize {
        self.steps.iter().filter(|s| !s.ok).count()
    }
}

/// Run every step of `script` against `engine`.
pub fn run_script(name: &str, engine: &VotingEngine, script: &Script) -> Report {
    let mut steps = Vec::with_capacity(script.steps.len());

    for (index, step) in script.steps.iter().enumerate() {
        let outcome = match apply(engine, step) {
            Ok(result) => StepOutcome {
                index,
                op: step.name(),
                ok: true,
                result: Some(result),
                error_kind: None,
                error: None,
            },
            Err(err) => {
                tracing::debug!("Step {} ({}) failed: {}", index, step.name(), err);
                StepOutcome {
                    index,
                    op: step.name(),
                    ok: false,
                    result: None,
                    error_kind: Some(err.kind().to_string()),
                    error: Some(err.to_string()),
                }
            }
        };
        steps.push(outcome);
    }

    let report = Report {
        name: name.to_string(),
        steps,
        summary: summarize(engine, &script.callers()),
    };
    tracing::info!(
        "Script finished: {} steps, {} rejected",
        report.steps.len(),
        report.failed_steps()
    );
    report
}

fn apply(engine: &VotingEngine, step: &Step) -> Result<StepResult, GovernanceError> {
    let result = match step {
        Step::Register { caller, paid } => StepResult::Purchase(engine.register(*caller, paid.0)?),
        Step::Deregister { caller } => StepResult::Redemption(engine.deregister(*caller)?),
        Step::BuyMore { caller, paid } => StepResult::Purchase(engine.buy_more(*caller, paid.0)?),
        Step::Sell { caller, amount } => StepResult::Redemption(engine.sell(*caller, *amount)?),
        Step::OpenVoting { caller, amount } => StepResult::Round(engine.open_voting(*caller, amount.0)?),
        Step::CloseVoting { caller } => StepResult::Settlement(engine.close_voting(*caller)?),
        Step::CreateProposal {
            caller,
            title,
            description,
            requested_budget,
            target,
        } => {
            let proposal = engine.create_proposal(
                *caller,
                title.as_str(),
                description.as_str(),
                requested_budget.0,
                *target,
            )?;
            StepResult::Created { proposal }
        }
        Step::CancelProposal { caller, proposal } => {
            let released_credits = engine.cancel_proposal(*caller, *proposal)?;
            StepResult::Cancelled {
                proposal: *proposal,
                released_credits,
            }
        }
        Step::Stake { caller, proposal, votes } => StepResult::Stake(engine.stake(*caller, *proposal, *votes)?),
        Step::Unstake { caller, proposal, votes } => {
            StepResult::Unstake(engine.unstake(*caller, *proposal, *votes)?)
        }
        Step::ListPendingFunding => StepResult::Pending {
            pending: engine.list_pending_funding().iter().map(|p| p.id).collect(),
        },
    };
    Ok(result)
}

fn summarize(engine: &VotingEngine, addresses: &BTreeSet<Address>) -> Summary {
    Summary {
        credit_price: format_currency(engine.credit_price()),
        max_credits: engine.max_credits(),
        total_supply: engine.total_supply(),
        participant_count: engine.participant_count(),
        voting_open: engine.is_voting_open(),
        voting_budget: format_currency(engine.voting_budget()),
        treasury_available: format_currency(engine.treasury().available_balance()),
        participants: addresses.iter().filter_map(|a| engine.participant(a)).collect(),
        proposals: engine.all_proposals(),
        treasury: engine.treasury(),
    }
}
