//! # Mock Framework
//!
//! Utilities for testing the storefront in isolation.
//!
//! [`create_mock_client`] yields a client plus the receiving end of its
//! channel, so a test can play the ledger's role deterministically:
//! inspect each request as it arrives and script the reply (success,
//! rejection, or silence) without spinning up a real `LedgerService`.

use tokio::sync::{mpsc, oneshot};

use crate::clients::LedgerClient;
use crate::domain::{Product, PurchaseReceipt};
use crate::error::LedgerError;
use crate::messages::LedgerRequest;

/// Creates a mock client and a receiver for asserting requests.
pub fn create_mock_client(buffer_size: usize) -> (LedgerClient, mpsc::Receiver<LedgerRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (LedgerClient::new(sender), receiver)
}

/// Helper to verify that the next message is a GetProduct request
pub async fn expect_get_product(
    receiver: &mut mpsc::Receiver<LedgerRequest>,
) -> Option<(u32, oneshot::Sender<Result<Option<Product>, LedgerError>>)> {
    match receiver.recv().await {
        Some(LedgerRequest::GetProduct { slot, respond_to }) => Some((slot, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a PurchaseProduct request
pub async fn expect_purchase(
    receiver: &mut mpsc::Receiver<LedgerRequest>,
) -> Option<(
    String,
    u32,
    u32,
    u64,
    oneshot::Sender<Result<PurchaseReceipt, LedgerError>>,
)> {
    match receiver.recv().await {
        Some(LedgerRequest::PurchaseProduct {
            caller,
            slot,
            count,
            paid,
            respond_to,
        }) => Some((caller, slot, count, paid, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a WithdrawFunds request
pub async fn expect_withdraw(
    receiver: &mut mpsc::Receiver<LedgerRequest>,
) -> Option<(String, oneshot::Sender<Result<u64, LedgerError>>)> {
    match receiver.recv().await {
        Some(LedgerRequest::WithdrawFunds { caller, respond_to }) => Some((caller, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_client() {
        let (client, mut receiver) = create_mock_client(10);

        let read_task = tokio::spawn(async move { client.get_product(4).await });

        let (slot, responder) = expect_get_product(&mut receiver).await.expect("Expected GetProduct request");
        assert_eq!(slot, 4);
        responder.send(Ok(Some(Product::new(4, "Soda", 3, 1)))).unwrap();

        let result = read_task.await.unwrap();
        assert_eq!(result, Ok(Some(Product::new(4, "Soda", 3, 1))));
    }
}
