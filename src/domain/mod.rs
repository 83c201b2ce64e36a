pub mod product;
pub mod receipt;

pub use product::*;
pub use receipt::*;
