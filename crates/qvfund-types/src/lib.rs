//! QVFund Types - Core type definitions for the quadratic voting ledger.
//!
//! - Addresses (20-byte, Bech32m encoded) identifying callers
//! - Integer currency and credit amounts
//! - Ledger configuration (credit price, supply cap, owner)

pub mod address;
pub mod amount;
pub mod config;
pub mod error;
mod serialization;

pub use address::Address;
pub use amount::{credits_for, currency_for, format_currency, parse_currency, Credits, Currency, ProposalId, CURRENCY_UNIT};
pub use config::LedgerConfig;
pub use error::TypesError;
pub use serialization::amount as amount_serde;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Address, Credits, Currency, LedgerConfig, ProposalId, TypesError};
}
