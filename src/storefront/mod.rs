//! Client-side projection of the ledger: a polled product listing plus
//! submission of mutating intents.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, instrument, warn};

use crate::clients::LedgerClient;
use crate::domain::{Product, PurchaseReceipt};
use crate::error::StorefrontError;

/// Highest slot id the reconciler polls. A client-side constant, not a
/// ledger bound: the ledger itself allows unbounded slot ids.
pub const DEFAULT_SCAN_RANGE: u32 = 10;

/// One account's view of the vending machine.
///
/// Holds a local projection of the ledger's populated slots and forwards
/// mutating intents, refreshing the projection after each confirmed
/// mutation. No optimistic updates: a rejected call leaves the projection
/// exactly as it was.
pub struct Storefront {
    client: LedgerClient,
    account: String,
    scan_range: u32,
    listings: Mutex<Vec<Product>>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when the submission completes, on every exit
/// path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Storefront {
    pub fn new(client: LedgerClient, account: impl Into<String>) -> Self {
        Self::with_scan_range(client, account, DEFAULT_SCAN_RANGE)
    }

    pub fn with_scan_range(client: LedgerClient, account: impl Into<String>, scan_range: u32) -> Self {
        Self {
            client,
            account: account.into(),
            scan_range,
            listings: Mutex::new(Vec::new()),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether this storefront's account controls the ledger.
    pub async fn is_owner(&self) -> Result<bool, StorefrontError> {
        Ok(self.client.owner().await? == self.account)
    }

    /// Current projection of the ledger's populated slots.
    pub fn listings(&self) -> Vec<Product> {
        self.listings_lock().clone()
    }

    /// Buyer-facing view: only products with stock left.
    pub fn in_stock(&self) -> Vec<Product> {
        self.listings_lock()
            .iter()
            .filter(|p| p.quantity > 0)
            .cloned()
            .collect()
    }

    /// Re-reads the scan range and replaces the local listing wholesale.
    ///
    /// Read failures are soft: the previous projection is kept and the
    /// failure is logged, not surfaced.
    #[instrument(fields(account = %self.account), skip(self))]
    pub async fn refresh(&self) {
        debug!("Refreshing product listing");

        let mut fresh = Vec::new();
        for slot in 1..=self.scan_range {
            match self.client.get_product(slot).await {
                Ok(Some(product)) if product.is_populated() => fresh.push(product),
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, slot, "Failed to load product listing");
                    return;
                }
            }
        }

        info!(listed = fresh.len(), "Product listing refreshed");
        *self.listings_lock() = fresh;
    }

    /// Lists a new product on the ledger; owner-only on the ledger side.
    #[instrument(fields(account = %self.account, product_name = %name), skip(self, name))]
    pub async fn submit_add(
        &self,
        name: String,
        quantity: u32,
        unit_price: u64,
    ) -> Result<u32, StorefrontError> {
        let _guard = self.begin_action()?;

        let slot = self
            .client
            .add_product(self.account.clone(), name, quantity, unit_price)
            .await?;
        info!(slot, "Product listed");
        self.refresh().await;
        Ok(slot)
    }

    /// Tops up an existing slot; owner-only on the ledger side.
    #[instrument(fields(account = %self.account), skip(self))]
    pub async fn submit_restock(&self, slot: u32, extra: u32) -> Result<(), StorefrontError> {
        let _guard = self.begin_action()?;

        self.client
            .restock_product(self.account.clone(), slot, extra)
            .await?;
        info!("Restock confirmed");
        self.refresh().await;
        Ok(())
    }

    /// Buys `count` units from `slot`, paying the listed unit price times
    /// the count as computed from the local projection at call time. Any
    /// excess comes back with the receipt as the ledger's refund.
    #[instrument(fields(account = %self.account), skip(self))]
    pub async fn submit_purchase(&self, slot: u32, count: u32) -> Result<PurchaseReceipt, StorefrontError> {
        let _guard = self.begin_action()?;

        let unit_price = self
            .listings_lock()
            .iter()
            .find(|p| p.slot == slot)
            .map(|p| p.unit_price)
            .ok_or(StorefrontError::UnknownSlot(slot))?;

        let payment = unit_price.saturating_mul(u64::from(count));
        let receipt = self
            .client
            .purchase_product(self.account.clone(), slot, count, payment)
            .await?;
        info!(
            charged = receipt.charged,
            refunded = receipt.refunded,
            "Purchase confirmed"
        );
        self.refresh().await;
        Ok(receipt)
    }

    /// Sweeps the ledger's collected balance to the owner account.
    #[instrument(fields(account = %self.account), skip(self))]
    pub async fn submit_withdraw(&self) -> Result<u64, StorefrontError> {
        let _guard = self.begin_action()?;

        let swept = self.client.withdraw_funds(self.account.clone()).await?;
        info!(swept, "Withdrawal confirmed");
        Ok(swept)
    }

    /// Rejects a submission while an earlier one is still awaiting
    /// confirmation (the double-click case).
    fn begin_action(&self) -> Result<InFlightGuard<'_>, StorefrontError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Acquire)
            .is_err()
        {
            warn!("Submission rejected: another action is in flight");
            return Err(StorefrontError::ActionInFlight);
        }
        Ok(InFlightGuard(&self.in_flight))
    }

    fn listings_lock(&self) -> MutexGuard<'_, Vec<Product>> {
        // A poisoned lock still holds a valid list.
        self.listings.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::LedgerError;
    use crate::mock_framework::{create_mock_client, expect_get_product, expect_purchase, expect_withdraw};

    fn storefront(scan_range: u32) -> (Arc<Storefront>, tokio::sync::mpsc::Receiver<crate::messages::LedgerRequest>) {
        let (client, receiver) = create_mock_client(10);
        (
            Arc::new(Storefront::with_scan_range(client, "buyer", scan_range)),
            receiver,
        )
    }

    #[tokio::test]
    async fn refresh_keeps_only_populated_slots() {
        let (storefront, mut receiver) = storefront(3);

        let task = {
            let storefront = storefront.clone();
            tokio::spawn(async move { storefront.refresh().await })
        };

        let (slot, responder) = expect_get_product(&mut receiver).await.expect("Expected GetProduct");
        assert_eq!(slot, 1);
        responder.send(Ok(Some(Product::new(1, "Soda", 3, 1)))).unwrap();

        let (_, responder) = expect_get_product(&mut receiver).await.expect("Expected GetProduct");
        responder.send(Ok(None)).unwrap();

        // An unpopulated record (empty name) is filtered like an empty slot.
        let (_, responder) = expect_get_product(&mut receiver).await.expect("Expected GetProduct");
        responder.send(Ok(Some(Product::new(3, "", 0, 0)))).unwrap();

        task.await.unwrap();
        assert_eq!(storefront.listings(), vec![Product::new(1, "Soda", 3, 1)]);
    }

    #[tokio::test]
    async fn refresh_failure_keeps_previous_projection() {
        let (storefront, mut receiver) = storefront(1);

        let task = {
            let storefront = storefront.clone();
            tokio::spawn(async move { storefront.refresh().await })
        };
        let (_, responder) = expect_get_product(&mut receiver).await.expect("Expected GetProduct");
        responder.send(Ok(Some(Product::new(1, "Soda", 3, 1)))).unwrap();
        task.await.unwrap();

        let task = {
            let storefront = storefront.clone();
            tokio::spawn(async move { storefront.refresh().await })
        };
        let (_, responder) = expect_get_product(&mut receiver).await.expect("Expected GetProduct");
        responder
            .send(Err(LedgerError::ActorCommunicationError("gone".to_string())))
            .unwrap();
        task.await.unwrap();

        assert_eq!(storefront.listings(), vec![Product::new(1, "Soda", 3, 1)]);
    }

    #[tokio::test]
    async fn in_stock_filters_sold_out_products() {
        let (storefront, mut receiver) = storefront(2);

        let task = {
            let storefront = storefront.clone();
            tokio::spawn(async move { storefront.refresh().await })
        };
        let (_, responder) = expect_get_product(&mut receiver).await.expect("Expected GetProduct");
        responder.send(Ok(Some(Product::new(1, "Soda", 0, 1)))).unwrap();
        let (_, responder) = expect_get_product(&mut receiver).await.expect("Expected GetProduct");
        responder.send(Ok(Some(Product::new(2, "Gum", 4, 2)))).unwrap();
        task.await.unwrap();

        assert_eq!(storefront.listings().len(), 2);
        assert_eq!(storefront.in_stock(), vec![Product::new(2, "Gum", 4, 2)]);
    }

    #[tokio::test]
    async fn purchase_sends_listed_price_times_count() {
        let (storefront, mut receiver) = storefront(1);

        let task = {
            let storefront = storefront.clone();
            tokio::spawn(async move { storefront.refresh().await })
        };
        let (_, responder) = expect_get_product(&mut receiver).await.expect("Expected GetProduct");
        responder.send(Ok(Some(Product::new(1, "Soda", 9, 7)))).unwrap();
        task.await.unwrap();

        let task = {
            let storefront = storefront.clone();
            tokio::spawn(async move { storefront.submit_purchase(1, 3).await })
        };

        let (caller, slot, count, paid, responder) =
            expect_purchase(&mut receiver).await.expect("Expected PurchaseProduct");
        assert_eq!(caller, "buyer");
        assert_eq!(slot, 1);
        assert_eq!(count, 3);
        assert_eq!(paid, 21);
        responder
            .send(Ok(PurchaseReceipt { charged: 21, refunded: 0 }))
            .unwrap();

        // Confirmation triggers a refresh of the projection.
        let (_, responder) = expect_get_product(&mut receiver).await.expect("Expected GetProduct");
        responder.send(Ok(Some(Product::new(1, "Soda", 6, 7)))).unwrap();

        let receipt = task.await.unwrap().unwrap();
        assert_eq!(receipt, PurchaseReceipt { charged: 21, refunded: 0 });
        assert_eq!(storefront.listings(), vec![Product::new(1, "Soda", 6, 7)]);
    }

    #[tokio::test]
    async fn purchase_of_unlisted_slot_sends_nothing() {
        let (storefront, mut receiver) = storefront(1);

        let err = storefront.submit_purchase(5, 1).await.unwrap_err();
        assert_eq!(err, StorefrontError::UnknownSlot(5));
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn second_submission_while_one_is_in_flight_is_rejected() {
        let (storefront, mut receiver) = storefront(1);

        let task = {
            let storefront = storefront.clone();
            tokio::spawn(async move { storefront.submit_withdraw().await })
        };
        let (caller, responder) = expect_withdraw(&mut receiver).await.expect("Expected WithdrawFunds");
        assert_eq!(caller, "buyer");

        // First withdrawal is still awaiting confirmation.
        let err = storefront.submit_withdraw().await.unwrap_err();
        assert_eq!(err, StorefrontError::ActionInFlight);
        assert!(receiver.try_recv().is_err());

        responder.send(Ok(0)).unwrap();
        assert_eq!(task.await.unwrap().unwrap(), 0);

        // The guard is released once the action resolves.
        let task = {
            let storefront = storefront.clone();
            tokio::spawn(async move { storefront.submit_withdraw().await })
        };
        let (_, responder) = expect_withdraw(&mut receiver).await.expect("Expected WithdrawFunds");
        responder.send(Ok(0)).unwrap();
        assert_eq!(task.await.unwrap().unwrap(), 0);
    }
}
