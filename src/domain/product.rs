/// A product record stored in one vending slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub slot: u32,
    pub name: String,
    pub quantity: u32,
    pub unit_price: u64,
}

impl Product {
    pub fn new(slot: u32, name: impl Into<String>, quantity: u32, unit_price: u64) -> Self {
        Self {
            slot,
            name: name.into(),
            quantity,
            unit_price,
        }
    }

    /// A slot counts as populated once it carries a non-empty name.
    pub fn is_populated(&self) -> bool {
        !self.name.is_empty()
    }
}
