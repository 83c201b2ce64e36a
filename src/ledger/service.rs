use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

use crate::clients::LedgerClient;
use crate::domain::{Product, PurchaseReceipt};
use crate::error::LedgerError;
use crate::messages::{LedgerRequest, ServiceResponse};

/// Default capacity of the ledger's request channel.
pub const DEFAULT_BUFFER_SIZE: usize = 32;

/// Macro for clean error response handling
macro_rules! send_error {
    ($respond_to:expr, $error:expr) => {{
        let _ = $respond_to.send(Err($error));
        return;
    }};
}

/// The vending-machine state machine.
///
/// All mutation flows through this actor's channel one request at a time, so
/// every handler observes and commits a fully consistent state. The channel
/// is the single-writer discipline that stands in for a hosted ledger's
/// global call ordering: no interleaving, no partial visibility.
pub struct LedgerService {
    receiver: mpsc::Receiver<LedgerRequest>,
    owner: String,
    products: HashMap<u32, Product>,
    product_count: u32,
    balance: u64,
}

impl LedgerService {
    pub fn new(owner: impl Into<String>, buffer_size: usize) -> (Self, LedgerClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let service = Self {
            receiver,
            owner: owner.into(),
            products: HashMap::new(),
            product_count: 0,
            balance: 0,
        };
        let client = LedgerClient::new(sender);
        (service, client)
    }

    /// Main actor loop. Each message is handled to completion before the
    /// next is received.
    #[instrument(name = "ledger_service", skip(self))]
    pub async fn run(mut self) {
        info!(owner = %self.owner, "LedgerService starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                LedgerRequest::AddProduct {
                    caller,
                    name,
                    quantity,
                    unit_price,
                    respond_to,
                } => {
                    self.handle_add_product(caller, name, quantity, unit_price, respond_to);
                }
                LedgerRequest::RestockProduct {
                    caller,
                    slot,
                    extra,
                    respond_to,
                } => {
                    self.handle_restock_product(caller, slot, extra, respond_to);
                }
                LedgerRequest::PurchaseProduct {
                    caller,
                    slot,
                    count,
                    paid,
                    respond_to,
                } => {
                    self.handle_purchase_product(caller, slot, count, paid, respond_to);
                }
                LedgerRequest::WithdrawFunds { caller, respond_to } => {
                    self.handle_withdraw_funds(caller, respond_to);
                }
                LedgerRequest::GetProduct { slot, respond_to } => {
                    self.handle_get_product(slot, respond_to);
                }
                LedgerRequest::GetOwner { respond_to } => {
                    let _ = respond_to.send(Ok(self.owner.clone()));
                }
                LedgerRequest::Shutdown => {
                    info!("LedgerService shutting down");
                    break;
                }
                #[cfg(test)]
                LedgerRequest::GetBalance { respond_to } => {
                    let _ = respond_to.send(Ok(self.balance));
                }
            }
        }

        info!("LedgerService stopped");
    }

    /// Stores a new record in the next sequential slot. Zero quantity and
    /// zero price are accepted.
    #[instrument(fields(caller = %caller, product_name = %name), skip(self, caller, name, respond_to))]
    fn handle_add_product(
        &mut self,
        caller: String,
        name: String,
        quantity: u32,
        unit_price: u64,
        respond_to: ServiceResponse<u32, LedgerError>,
    ) {
        debug!("Processing add_product request");

        let result = if caller != self.owner {
            error!("Caller is not the owner");
            Err(LedgerError::Unauthorized(caller))
        } else {
            let slot = self.product_count + 1;
            self.product_count = slot;
            self.products
                .insert(slot, Product::new(slot, name, quantity, unit_price));
            info!(slot, "Product added");
            Ok(slot)
        };

        let _ = respond_to.send(result);
    }

    /// Increases a slot's quantity; name and unit price are untouched.
    #[instrument(fields(caller = %caller), skip(self, caller, respond_to))]
    fn handle_restock_product(
        &mut self,
        caller: String,
        slot: u32,
        extra: u32,
        respond_to: ServiceResponse<(), LedgerError>,
    ) {
        debug!("Processing restock_product request");

        let result = if caller != self.owner {
            error!("Caller is not the owner");
            Err(LedgerError::Unauthorized(caller))
        } else {
            match self.products.get_mut(&slot) {
                Some(product) => {
                    product.quantity += extra;
                    info!(new_quantity = product.quantity, "Product restocked");
                    Ok(())
                }
                None => {
                    error!("No product in slot");
                    Err(LedgerError::NotFound(slot))
                }
            }
        };

        let _ = respond_to.send(result);
    }

    /// Settles a purchase from any caller.
    ///
    /// Funds are checked before stock; which rejection a doubly-invalid
    /// purchase reports depends on this order. Nothing is mutated until
    /// every check has passed.
    #[instrument(fields(caller = %caller), skip(self, caller, respond_to))]
    fn handle_purchase_product(
        &mut self,
        caller: String,
        slot: u32,
        count: u32,
        paid: u64,
        respond_to: ServiceResponse<PurchaseReceipt, LedgerError>,
    ) {
        debug!("Processing purchase_product request");

        let Some(product) = self.products.get_mut(&slot) else {
            error!("No product in slot");
            send_error!(respond_to, LedgerError::NotFound(slot));
        };

        // The widened product cannot overflow, so the comparison stays exact
        // for any u64 price.
        let required = u128::from(product.unit_price) * u128::from(count);
        if u128::from(paid) < required {
            error!(%required, "Payment below required total");
            send_error!(
                respond_to,
                LedgerError::InsufficientFunds {
                    required: u64::try_from(required).unwrap_or(u64::MAX),
                    paid,
                }
            );
        }
        // paid covered it, so the total fits in u64.
        let required = required as u64;

        if product.quantity < count {
            error!(available = product.quantity, "Insufficient stock");
            send_error!(
                respond_to,
                LedgerError::InsufficientStock {
                    requested: count,
                    available: product.quantity,
                }
            );
        }

        product.quantity -= count;
        self.balance += required;
        let receipt = PurchaseReceipt {
            charged: required,
            refunded: paid - required,
        };

        info!(
            charged = receipt.charged,
            refunded = receipt.refunded,
            remaining = product.quantity,
            "Purchase settled"
        );
        let _ = respond_to.send(Ok(receipt));
    }

    /// Sweeps the entire collected balance to the owner. Withdrawing with
    /// nothing collected is a no-op that transfers 0.
    #[instrument(fields(caller = %caller), skip(self, caller, respond_to))]
    fn handle_withdraw_funds(&mut self, caller: String, respond_to: ServiceResponse<u64, LedgerError>) {
        debug!("Processing withdraw_funds request");

        let result = if caller != self.owner {
            error!("Caller is not the owner");
            Err(LedgerError::Unauthorized(caller))
        } else {
            let swept = self.balance;
            self.balance = 0;
            info!(swept, "Funds withdrawn");
            Ok(swept)
        };

        let _ = respond_to.send(result);
    }

    /// Read-only slot lookup. A never-created slot reads as `None`.
    #[instrument(skip(self, respond_to))]
    fn handle_get_product(&self, slot: u32, respond_to: ServiceResponse<Option<Product>, LedgerError>) {
        debug!("Processing get_product request");

        let product = self.products.get(&slot).cloned();

        match &product {
            Some(product) => debug!(product_name = %product.name, quantity = product.quantity, "Product found"),
            None => debug!("Slot is empty"),
        }

        let _ = respond_to.send(Ok(product));
    }
}
