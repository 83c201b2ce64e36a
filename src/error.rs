use thiserror::Error;

/// Rejections raised by the ledger at call time.
///
/// Every failure aborts the whole call with no state change; there is no
/// partial effect to roll back.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LedgerError {
    #[error("caller {0} is not the owner")]
    Unauthorized(String),
    #[error("no product in slot {0}")]
    NotFound(u32),
    #[error("insufficient funds: required {required}, paid {paid}")]
    InsufficientFunds { required: u64, paid: u64 },
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u32, available: u32 },
    #[error("actor communication error: {0}")]
    ActorCommunicationError(String),
}

/// Failures the storefront surfaces on top of ledger rejections.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StorefrontError {
    #[error("another action is still awaiting confirmation")]
    ActionInFlight,
    #[error("slot {0} is not in the current listing")]
    UnknownSlot(u32),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
