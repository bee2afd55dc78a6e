use std::fmt;

use thiserror::Error;

/// External boundary a transport failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Wallet,
    Query,
    Broadcast,
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Boundary::Wallet => write!(f, "wallet"),
            Boundary::Query => write!(f, "query"),
            Boundary::Broadcast => write!(f, "broadcast"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no wallet provider available")]
    WalletUnavailable,

    #[error("wallet returned no accounts")]
    NoAccounts,

    #[error("wallet not connected")]
    NotConnected,

    #[error("event description cannot be empty")]
    EmptyDescription,

    #[error("missing event: {0}")]
    MissingEvent(String),

    #[error("invalid stake: {0}")]
    InvalidStake(String),

    #[error("invalid odds: {0}")]
    InvalidOdds(String),

    #[error("invalid resolution deadline: {0}")]
    InvalidDeadline(String),

    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("transaction {tx_hash} rejected with code {code}: {raw_log}")]
    TransactionRejected {
        code: u32,
        tx_hash: String,
        raw_log: String,
    },

    #[error("client misconfigured: {0} is required")]
    MisconfiguredClient(&'static str),

    #[error("{boundary} network failure: {message}")]
    NetworkFailure { boundary: Boundary, message: String },
}

impl ClientError {
    pub fn network(boundary: Boundary, err: impl fmt::Display) -> Self {
        ClientError::NetworkFailure {
            boundary,
            message: err.to_string(),
        }
    }

    /// True when a transaction may have reached the ledger despite the error.
    ///
    /// Everything else is detected before any side effect, so the caller can
    /// treat it as "nothing happened".
    pub fn may_have_submitted(&self) -> bool {
        matches!(
            self,
            ClientError::TransactionRejected { .. }
                | ClientError::NetworkFailure {
                    boundary: Boundary::Broadcast,
                    ..
                }
        )
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_not_submitted() {
        assert!(!ClientError::NotConnected.may_have_submitted());
        assert!(!ClientError::InvalidStake("zero".into()).may_have_submitted());
        assert!(!ClientError::MisconfiguredClient("contract.address").may_have_submitted());
        assert!(!ClientError::network(Boundary::Query, "timeout").may_have_submitted());
        assert!(!ClientError::network(Boundary::Wallet, "refused").may_have_submitted());
    }

    #[test]
    fn test_broadcast_failures_may_be_submitted() {
        assert!(ClientError::network(Boundary::Broadcast, "connection reset").may_have_submitted());

        let rejected = ClientError::TransactionRejected {
            code: 5,
            tx_hash: "ABC".into(),
            raw_log: "insufficient funds".into(),
        };
        assert!(rejected.may_have_submitted());
        assert_eq!(
            rejected.to_string(),
            "transaction ABC rejected with code 5: insufficient funds"
        );
    }
}
