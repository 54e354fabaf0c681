pub mod availability;
pub mod preset;
pub mod product;
pub(crate) mod wire;
