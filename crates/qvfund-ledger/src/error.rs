use qvfund_types::{Address, Credits, Currency};
use thiserror::Error;

/// Errors raised by the credit ledger and the participant registry.
///
/// A returned error always means nothing was mutated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Credit cap exceeded: requested {requested}, available {available}")]
    CapExceeded { requested: Credits, available: Credits },

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Credits, need: Credits },

    #[error("Insufficient locked credits: have {have}, need {need}")]
    InsufficientLocked { have: Credits, need: Credits },

    #[error("Not a participant: {0}")]
    NotAParticipant(Address),

    #[error("Already registered: {0}")]
    AlreadyRegistered(Address),

    #[error("Insufficient payment: paid {paid}, credit price {price}")]
    InsufficientPayment { paid: Currency, price: Currency },

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Cannot sell locked credits: free {free}, requested {requested}")]
    LockedCreditsExceeded { free: Credits, requested: Credits },

    #[error("Must withdraw all votes first: {0} credits locked")]
    CreditsLocked(Credits),

    #[error("Arithmetic overflow")]
    Overflow,
}

impl LedgerError {
    /// Stable name of the rejection, for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::CapExceeded { .. } => "CapExceeded",
            LedgerError::InsufficientBalance { .. } => "InsufficientBalance",
            LedgerError::InsufficientLocked { .. } => "InsufficientLocked",
            LedgerError::NotAParticipant(_) => "NotAParticipant",
            LedgerError::AlreadyRegistered(_) => "AlreadyRegistered",
            LedgerError::InsufficientPayment { .. } => "InsufficientPayment",
            LedgerError::ZeroAmount => "ZeroAmount",
            LedgerError::LockedCreditsExceeded { .. } => "LockedCreditsExceeded",
            LedgerError::CreditsLocked(_) => "CreditsLocked",
            LedgerError::Overflow => "Overflow",
        }
    }
}
