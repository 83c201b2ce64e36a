mod app_system;
mod clients;
mod domain;
mod error;
mod ledger;
mod messages;
mod storefront;

#[cfg(test)]
mod mock_framework;

use tracing::{error, info, Instrument};

use crate::app_system::{setup_tracing, VendingSystem};

#[tokio::main]
async fn main() -> Result<(), String> {
    // Setup tracing once for the entire application
    setup_tracing();

    info!("Starting vending machine demo");

    let system = VendingSystem::new("vendor");
    let vendor = system.storefront("vendor");
    let buyer = system.storefront("buyer");

    let span = tracing::info_span!("stocking");
    async {
        if vendor.is_owner().await.map_err(|e| e.to_string())? {
            info!("Vendor storefront controls the ledger");
        }

        info!("Listing initial products");
        vendor
            .submit_add("Soda".to_string(), 3, 1)
            .await
            .map_err(|e| e.to_string())?;
        vendor
            .submit_add("Gum".to_string(), 1, 2)
            .await
            .map_err(|e| e.to_string())?;

        info!("Topping up the Soda slot");
        vendor.submit_restock(1, 2).await.map_err(|e| e.to_string())?;

        for product in vendor.listings() {
            info!(
                slot = product.slot,
                name = %product.name,
                quantity = product.quantity,
                "Stocked"
            );
        }
        Ok::<(), String>(())
    }
    .instrument(span)
    .await?;

    let span = tracing::info_span!("shopping");
    async {
        buyer.refresh().await;
        for product in buyer.in_stock() {
            info!(
                slot = product.slot,
                name = %product.name,
                quantity = product.quantity,
                unit_price = product.unit_price,
                "On offer"
            );
        }

        info!("Buying one Soda");
        match buyer.submit_purchase(1, 1).await {
            Ok(receipt) => info!(
                charged = receipt.charged,
                refunded = receipt.refunded,
                "Purchase complete"
            ),
            Err(e) => error!(error = %e, "Purchase failed"),
        }

        info!("Trying to buy two Gums with one in stock");
        if let Err(e) = buyer.submit_purchase(2, 2).await {
            error!(error = %e, "Purchase rejected");
        }
    }
    .instrument(span)
    .await;

    let span = tracing::info_span!("settlement");
    async {
        match vendor.submit_withdraw().await {
            Ok(swept) => info!(swept, "Balance swept to owner"),
            Err(e) => error!(error = %e, "Withdrawal failed"),
        }
    }
    .instrument(span)
    .await;

    system.shutdown().await?;

    info!("Demo completed");
    Ok(())
}
