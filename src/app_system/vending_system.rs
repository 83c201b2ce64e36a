use tracing::{error, info};

use crate::clients::LedgerClient;
use crate::ledger::{LedgerService, DEFAULT_BUFFER_SIZE};
use crate::storefront::Storefront;

/// Owns the ledger actor's lifecycle and hands out client handles.
pub struct VendingSystem {
    pub ledger_client: LedgerClient,
    handle: tokio::task::JoinHandle<()>,
}

impl VendingSystem {
    /// Starts the ledger actor with `owner` as its fixed owner identity.
    pub fn new(owner: impl Into<String>) -> Self {
        let (service, ledger_client) = LedgerService::new(owner, DEFAULT_BUFFER_SIZE);
        let handle = tokio::spawn(service.run());

        info!("Vending system started");

        Self {
            ledger_client,
            handle,
        }
    }

    /// Builds a reconciler bound to `account`, sharing this system's ledger.
    pub fn storefront(&self, account: impl Into<String>) -> Storefront {
        Storefront::new(self.ledger_client.clone(), account)
    }

    /// Stops the ledger actor and waits for it to finish.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down vending system");

        let _ = self.ledger_client.shutdown().await;

        if let Err(e) = self.handle.await {
            error!(error = ?e, "Ledger task failed");
            return Err(format!("Ledger task failed: {:?}", e));
        }

        info!("Vending system shutdown complete");
        Ok(())
    }
}
