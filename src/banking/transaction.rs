//! Deposit / withdrawal entry.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::{Rejection, format_amount, parse_amount};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
}

impl TransactionKind {
    /// Capitalised name used in the confirmation message.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Deposit => "Deposit",
            Self::Withdraw => "Withdraw",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
        }
    }

    /// Prompt appended once the kind is chosen.
    pub fn amount_prompt(&self) -> String {
        format!("How much would you like to {}?", self.as_str())
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Self::Deposit),
            "withdraw" => Ok(Self::Withdraw),
            _ => Err(format!("Unknown transaction kind: {}", s)),
        }
    }
}

/// Steps of the transaction wizard, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStep {
    SelectKind,
    Amount,
}

impl TransactionStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelectKind => "select_kind",
            Self::Amount => "amount",
        }
    }
}

/// Transaction fields collected so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionDraft {
    pub kind: Option<TransactionKind>,
}

impl TransactionDraft {
    pub fn step(&self) -> TransactionStep {
        match self.kind {
            None => TransactionStep::SelectKind,
            Some(_) => TransactionStep::Amount,
        }
    }
}

/// Raw amount form, as posted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AmountForm {
    #[serde(default)]
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    pub kind: TransactionKind,
    pub amount: Decimal,
}

impl TransactionRecord {
    pub fn summary(&self) -> String {
        format!(
            "Transaction successful! 🎉\nType: {}\nAmount: ${}",
            self.kind.title(),
            format_amount(self.amount)
        )
    }
}

pub fn check_amount(raw: &str) -> Result<Decimal, Rejection> {
    let amount = parse_amount(raw);
    if amount > Decimal::ZERO {
        Ok(amount)
    } else {
        Err(Rejection {
            field: "amount",
            reason: "Amount must be greater than zero.",
        })
    }
}
