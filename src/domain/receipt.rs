/// Settlement of a successful purchase: the amount the ledger retained and
/// the overpayment returned to the buyer.
///
/// `charged + refunded` always equals the payment that accompanied the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseReceipt {
    pub charged: u64,
    pub refunded: u64,
}
