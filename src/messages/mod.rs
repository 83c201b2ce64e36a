use tokio::sync::oneshot;

use crate::domain::{Product, PurchaseReceipt};
use crate::error::LedgerError;

/// Generic type aliases for service communication
pub type ServiceResult<T, E> = std::result::Result<T, E>;
pub type ServiceResponse<T, E> = oneshot::Sender<ServiceResult<T, E>>;

/// Typed messages for the ledger actor. Each variant carries its parameters
/// and a oneshot channel for the reply; mutating variants also carry the
/// caller identity so the handler can enforce ownership.
#[derive(Debug)]
pub enum LedgerRequest {
    AddProduct {
        caller: String,
        name: String,
        quantity: u32,
        unit_price: u64,
        respond_to: ServiceResponse<u32, LedgerError>,
    },
    RestockProduct {
        caller: String,
        slot: u32,
        extra: u32,
        respond_to: ServiceResponse<(), LedgerError>,
    },
    PurchaseProduct {
        caller: String,
        slot: u32,
        count: u32,
        paid: u64,
        respond_to: ServiceResponse<PurchaseReceipt, LedgerError>,
    },
    WithdrawFunds {
        caller: String,
        respond_to: ServiceResponse<u64, LedgerError>,
    },
    GetProduct {
        slot: u32,
        respond_to: ServiceResponse<Option<Product>, LedgerError>,
    },
    GetOwner {
        respond_to: ServiceResponse<String, LedgerError>,
    },
    Shutdown,
    #[cfg(test)]
    GetBalance {
        respond_to: ServiceResponse<u64, LedgerError>,
    },
}
