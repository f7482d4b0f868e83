//! QVFund Ledger - credit accounting for quadratic voting.
//!
//! This crate provides:
//! - A capped fungible credit ledger with free/custody balances
//! - The participant registry: fixed-price buy, sell and refund of credits

pub mod credits;
pub mod error;
pub mod participants;

pub use credits::CreditLedger;
pub use error::LedgerError;
pub use participants::{Participant, ParticipantInfo, ParticipantRegistry, Purchase, Redemption};
