//! Ledger-level configuration.
//!
//! Fixed at construction: the credit price, the global credit cap and the
//! privileged owner identity. None of it changes afterwards.

use crate::amount::{Credits, Currency, CURRENCY_UNIT};
use crate::error::TypesError;
use crate::serialization::amount;
use crate::Address;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Currency base units paid per credit
    #[serde(with = "amount")]
    pub credit_price: Currency,
    /// Hard cap on total credit supply
    #[serde(with = "amount")]
    pub max_credits: Credits,
    /// Only identity allowed to open and close voting rounds
    pub owner: Address,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            credit_price: CURRENCY_UNIT / 10,
            max_credits: 1_000_000,
            owner: Address::ZERO,
        }
    }
}

impl LedgerConfig {
    pub fn new(credit_price: Currency, max_credits: Credits, owner: Address) -> Self {
        Self {
            credit_price,
            max_credits,
            owner,
        }
    }

    /// Reject configurations the ledger cannot operate under.
    pub fn validate(&self) -> Result<(), TypesError> {
        if self.credit_price == 0 {
            return Err(TypesError::InvalidConfig("credit_price must be > 0".into()));
        }
        if self.max_credits == 0 {
            return Err(TypesError::InvalidConfig("max_credits must be > 0".into()));
        }
        if self.max_credits.checked_mul(self.credit_price).is_none() {
            return Err(TypesError::InvalidConfig(
                "max_credits * credit_price overflows".into(),
            ));
        }
        Ok(())
    }
}
