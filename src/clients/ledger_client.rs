use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument};

use crate::domain::{Product, PurchaseReceipt};
use crate::error::LedgerError;
use crate::messages::LedgerRequest;

/// Generate client methods with oneshot channel boilerplate and automatic
/// tracing. Channel failures surface as `ActorCommunicationError`, distinct
/// from the ledger's own rejections.
macro_rules! client_method {
    ($client:ty => fn $method:ident($($param:ident: $param_type:ty),*) -> $return_type:ty as $request:ident::$variant:ident) => {
        impl $client {
            #[instrument(skip(self))]
            pub async fn $method(&self, $($param: $param_type),*) -> Result<$return_type, LedgerError> {
                debug!("Sending request");
                let (respond_to, response) = oneshot::channel();
                self.sender.send($request::$variant {
                    $($param,)*
                    respond_to,
                }).await.map_err(|_| LedgerError::ActorCommunicationError("Ledger actor closed".to_string()))?;

                response
                    .await
                    .map_err(|_| LedgerError::ActorCommunicationError("Ledger actor dropped".to_string()))?
            }
        }
    };
}

/// Handle for talking to the ledger actor. Cheap to clone; every holder
/// shares the same underlying request channel.
#[derive(Clone)]
pub struct LedgerClient {
    sender: mpsc::Sender<LedgerRequest>,
}

impl LedgerClient {
    pub fn new(sender: mpsc::Sender<LedgerRequest>) -> Self {
        Self { sender }
    }

    /// Manual method for the one request that takes no response channel.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<(), LedgerError> {
        debug!("Sending shutdown request");
        self.sender
            .send(LedgerRequest::Shutdown)
            .await
            .map_err(|_| LedgerError::ActorCommunicationError("Ledger actor closed".to_string()))
    }
}

// Generate ledger client methods
client_method!(LedgerClient => fn add_product(caller: String, name: String, quantity: u32, unit_price: u64) -> u32 as LedgerRequest::AddProduct);
client_method!(LedgerClient => fn restock_product(caller: String, slot: u32, extra: u32) -> () as LedgerRequest::RestockProduct);
client_method!(LedgerClient => fn purchase_product(caller: String, slot: u32, count: u32, paid: u64) -> PurchaseReceipt as LedgerRequest::PurchaseProduct);
client_method!(LedgerClient => fn withdraw_funds(caller: String) -> u64 as LedgerRequest::WithdrawFunds);
client_method!(LedgerClient => fn get_product(slot: u32) -> Option<Product> as LedgerRequest::GetProduct);
client_method!(LedgerClient => fn owner() -> String as LedgerRequest::GetOwner);

// Test-only method for internal state inspection
#[cfg(test)]
client_method!(LedgerClient => fn balance() -> u64 as LedgerRequest::GetBalance);
