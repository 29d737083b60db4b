use crate::error::SubmitError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A positive amount in minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(u64);

impl Amount {
    pub fn new(value: u64) -> Result<Self, SubmitError> {
        if value > 0 {
            Ok(Self(value))
        } else {
            Err(SubmitError::InvalidAmount)
        }
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One payment attempt.
///
/// `requester_id` is a copy of the session identity taken at submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub amount: Amount,
    pub requester_id: String,
    /// Only set once the payment succeeded.
    pub reference: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn start(amount: Amount, requester_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            amount,
            requester_id: requester_id.into(),
            reference: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    pub fn succeed(mut self, reference: String) -> Self {
        self.reference = Some(reference);
        self.ended_at = Some(Utc::now());
        self
    }

    pub fn fail(mut self) -> Self {
        self.ended_at = Some(Utc::now());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionState {
    Idle,
    Processing,
    Succeeded,
    Failed,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionState::Idle => "idle",
            TransactionState::Processing => "processing",
            TransactionState::Succeeded => "succeeded",
            TransactionState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// What the UI shows for the payment flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum TransactionStatus {
    Idle,
    Processing { transaction: Transaction },
    Succeeded { transaction: Transaction },
    Failed { transaction: Transaction, message: String },
}

impl TransactionStatus {
    pub fn state(&self) -> TransactionState {
        match self {
            TransactionStatus::Idle => TransactionState::Idle,
            TransactionStatus::Processing { .. } => TransactionState::Processing,
            TransactionStatus::Succeeded { .. } => TransactionState::Succeeded,
            TransactionStatus::Failed { .. } => TransactionState::Failed,
        }
    }

    pub fn transaction(&self) -> Option<&Transaction> {
        match self {
            TransactionStatus::Idle => None,
            TransactionStatus::Processing { transaction }
            | TransactionStatus::Succeeded { transaction }
            | TransactionStatus::Failed { transaction, .. } => Some(transaction),
        }
    }

    /// User-facing failure text, present only in the failed state.
    pub fn message(&self) -> Option<&str> {
        match self {
            TransactionStatus::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Succeeded { .. } | TransactionStatus::Failed { .. }
        )
    }
}
